//! Mappings from raw state variables to atomic predicate robustness.
//!
//! When a trace folder holds raw game/system state rather than robustness
//! values, each configured mapping turns one row of state into the robustness
//! of one atomic predicate. The predicate names produced here become the
//! atoms of the search.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A function from a state snapshot to a robustness value in [-1, 1].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StateMapping {
    /// The variable already holds a robustness value.
    Identity { variable: String },
    /// Robustness of `variable < threshold`, scaled linearly so that
    /// `lower_bound` maps to +1 and `upper_bound` maps to -1.
    LessThan {
        variable: String,
        threshold: f32,
        lower_bound: f32,
        upper_bound: f32,
    },
}

/// Robustness reported when a mapped variable is absent from the state.
const MISSING_VARIABLE_ROBUSTNESS: f32 = -1.0;

impl StateMapping {
    /// Identifier-safe atom name for this mapping.
    ///
    /// Starts with the variable name and only contains alphanumerics, so it
    /// can be used verbatim inside predicate strings.
    pub fn predicate_name(&self) -> String {
        match self {
            Self::Identity { variable } => variable.clone(),
            Self::LessThan {
                variable,
                threshold,
                ..
            } => {
                let threshold = format!("{:?}", threshold)
                    .replace('.', "p")
                    .replace('-', "m");
                format!("{}LT{}", variable, threshold)
            }
        }
    }

    /// Robustness of this mapping over one state snapshot.
    pub fn robustness(&self, state: &HashMap<String, f32>) -> f32 {
        match self {
            Self::Identity { variable } => state
                .get(variable)
                .copied()
                .unwrap_or(MISSING_VARIABLE_ROBUSTNESS),
            Self::LessThan {
                variable,
                threshold,
                lower_bound,
                upper_bound,
            } => {
                let Some(&value) = state.get(variable) else {
                    return MISSING_VARIABLE_ROBUSTNESS;
                };
                let c = *threshold;
                let robustness = if value > c {
                    (value - c) / (c - upper_bound)
                } else {
                    (value - c) / (lower_bound - c)
                };
                robustness.clamp(-1.0, 1.0)
            }
        }
    }

    /// Check that the mapping is well formed.
    pub fn validate(&self) -> Result<(), MappingError> {
        match self {
            Self::Identity { variable } if variable.is_empty() => Err(MappingError::EmptyVariable),
            Self::Identity { .. } => Ok(()),
            Self::LessThan {
                variable,
                threshold,
                lower_bound,
                upper_bound,
            } => {
                if variable.is_empty() {
                    return Err(MappingError::EmptyVariable);
                }
                if !(lower_bound < threshold && threshold < upper_bound) {
                    return Err(MappingError::InvalidBounds {
                        variable: variable.clone(),
                        lower: *lower_bound,
                        threshold: *threshold,
                        upper: *upper_bound,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Mapping validation errors.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Mapped variable name must not be empty")]
    EmptyVariable,
    #[error("Mapping for '{variable}' needs lower ({lower}) < threshold ({threshold}) < upper ({upper})")]
    InvalidBounds {
        variable: String,
        lower: f32,
        threshold: f32,
        upper: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn wood_lt(threshold: f32) -> StateMapping {
        StateMapping::LessThan {
            variable: "wood".to_string(),
            threshold,
            lower_bound: 0.0,
            upper_bound: 5.0,
        }
    }

    #[test]
    fn test_predicate_names() {
        let identity = StateMapping::Identity {
            variable: "hasAxe".to_string(),
        };
        assert_eq!(identity.predicate_name(), "hasAxe");
        assert_eq!(wood_lt(1.0).predicate_name(), "woodLT1p0");
        assert_eq!(wood_lt(2.5).predicate_name(), "woodLT2p5");
    }

    #[test]
    fn test_less_than_scaling() {
        let mapping = wood_lt(2.0);

        // At the bounds the robustness saturates
        assert!((mapping.robustness(&state(&[("wood", 0.0)])) - 1.0).abs() < 1e-6);
        assert!((mapping.robustness(&state(&[("wood", 5.0)])) + 1.0).abs() < 1e-6);

        // At the threshold the predicate is on the fence
        assert!(mapping.robustness(&state(&[("wood", 2.0)])).abs() < 1e-6);

        // Beyond the bounds values are clamped
        assert_eq!(mapping.robustness(&state(&[("wood", 50.0)])), -1.0);
        assert_eq!(mapping.robustness(&state(&[("wood", -3.0)])), 1.0);
    }

    #[test]
    fn test_missing_variable() {
        let mapping = wood_lt(2.0);
        assert_eq!(mapping.robustness(&state(&[("iron", 1.0)])), -1.0);

        let identity = StateMapping::Identity {
            variable: "near".to_string(),
        };
        assert_eq!(identity.robustness(&state(&[])), -1.0);
        assert_eq!(identity.robustness(&state(&[("near", 0.25)])), 0.25);
    }

    #[test]
    fn test_validate() {
        assert!(wood_lt(2.0).validate().is_ok());
        assert!(wood_lt(0.0).validate().is_err());
        assert!(wood_lt(5.0).validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = r#"{"type":"LessThan","variable":"iron","threshold":3.0,"lower_bound":0.0,"upper_bound":5.0}"#;
        let mapping: StateMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.predicate_name(), "ironLT3p0");
    }
}
