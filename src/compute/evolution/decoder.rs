//! Genotype to phenotype mapping through a grammar.
//!
//! Decoding walks the same bounded derivation as the production tree but picks
//! a single alternative per non-terminal. A codon is read only at choice
//! points, rules that offer more than one non-empty alternative, and the
//! chosen alternative is `codon % alternatives`.

use crate::schema::{Grammar, Production, Symbol};

/// A decoded genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    /// Concatenated terminal text.
    pub phenotype: String,
    /// Alternative index taken at each choice point, in derivation order.
    pub choices: Vec<u32>,
}

/// Wrapping grammar-evolution decoder.
#[derive(Debug, Clone)]
pub struct GrammarDecoder {
    grammar: Grammar,
    max_depth: usize,
    max_wraps: usize,
}

impl GrammarDecoder {
    pub fn new(grammar: Grammar, max_depth: usize, max_wraps: usize) -> Self {
        Self {
            grammar,
            max_depth,
            max_wraps,
        }
    }

    fn alternatives(&self, name: &str) -> Option<Vec<&Production>> {
        let rule = self.grammar.rule(name)?;
        let viable: Vec<_> = rule
            .productions
            .iter()
            .filter(|p| !p.symbols.is_empty())
            .collect();
        if viable.is_empty() { None } else { Some(viable) }
    }

    fn root(&self) -> Option<Symbol> {
        self.grammar
            .root()
            .map(|rule| Symbol::non_terminal(rule.name.clone()))
    }

    /// Leftmost derivation driven by `codons`.
    ///
    /// Returns `None` when a non-terminal would be expanded past the depth
    /// bound, a rule is undefined, or the genome runs out after `max_wraps`
    /// wraps.
    pub fn decode(&self, codons: &[u32]) -> Option<Derivation> {
        let root = self.root()?;
        let mut stack: Vec<(&Symbol, usize)> = vec![(&root, 0)];
        let mut phenotype = String::new();
        let mut choices = Vec::new();
        let mut position = 0;
        let mut wraps = 0;

        while let Some((symbol, depth)) = stack.pop() {
            let name = match symbol {
                Symbol::Terminal(text) => {
                    phenotype.push_str(text);
                    continue;
                }
                Symbol::NonTerminal(name) => name,
            };
            if depth > self.max_depth {
                return None;
            }
            let alternatives = self.alternatives(name)?;

            let choice = if alternatives.len() == 1 {
                0
            } else {
                if codons.is_empty() {
                    return None;
                }
                if position == codons.len() {
                    wraps += 1;
                    if wraps > self.max_wraps {
                        return None;
                    }
                    position = 0;
                }
                let choice = codons[position] % alternatives.len() as u32;
                position += 1;
                choices.push(choice);
                choice as usize
            };

            let production = alternatives[choice];
            for child in production.symbols.iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        Some(Derivation { phenotype, choices })
    }

    /// Choice sequence of the first leftmost derivation of `phenotype`
    /// within the depth bound, found by backtracking.
    pub fn encode(&self, phenotype: &str) -> Option<Vec<u32>> {
        let root = self.root()?;
        let mut stack = vec![(&root, 0)];
        let mut choices = Vec::new();
        if self.derive(&mut stack, phenotype, 0, &mut choices) {
            Some(choices)
        } else {
            None
        }
    }

    fn derive<'g>(
        &'g self,
        stack: &mut Vec<(&'g Symbol, usize)>,
        text: &str,
        position: usize,
        choices: &mut Vec<u32>,
    ) -> bool {
        let Some((symbol, depth)) = stack.pop() else {
            return position == text.len();
        };

        let found = match symbol {
            Symbol::Terminal(t) => {
                text[position..].starts_with(t.as_str())
                    && self.derive(stack, text, position + t.len(), choices)
            }
            Symbol::NonTerminal(name) => {
                self.expand(name, depth, stack, text, position, choices)
            }
        };

        if !found {
            stack.push((symbol, depth));
        }
        found
    }

    fn expand<'g>(
        &'g self,
        name: &str,
        depth: usize,
        stack: &mut Vec<(&'g Symbol, usize)>,
        text: &str,
        position: usize,
        choices: &mut Vec<u32>,
    ) -> bool {
        if depth > self.max_depth {
            return false;
        }
        let Some(alternatives) = self.alternatives(name) else {
            return false;
        };
        let is_choice = alternatives.len() > 1;

        for (index, production) in alternatives.into_iter().enumerate() {
            let base = stack.len();
            for child in production.symbols.iter().rev() {
                stack.push((child, depth + 1));
            }
            if is_choice {
                choices.push(index as u32);
            }
            if self.derive(stack, text, position, choices) {
                return true;
            }
            if is_choice {
                choices.pop();
            }
            stack.truncate(base);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::CodonRng;
    use crate::schema::GenomeConfig;

    const GRAMMAR: &str = "\
<predicate> ::= <literal> | \"F\" <predicate> | \"(\" <predicate> \"&\" <predicate> \")\"
<literal> ::= a | b | c
";

    fn decoder(max_depth: usize) -> GrammarDecoder {
        GrammarDecoder::new(Grammar::parse(GRAMMAR).unwrap(), max_depth, 2)
    }

    #[test]
    fn test_decode_picks_alternatives() {
        let d = decoder(6);
        // literal, then b
        assert_eq!(d.decode(&[0, 1]).unwrap().phenotype, "b");
        // F, literal, c
        let derivation = d.decode(&[1, 0, 2]).unwrap();
        assert_eq!(derivation.phenotype, "Fc");
        assert_eq!(derivation.choices, vec![1, 0, 2]);
        // Codons wrap modulo the number of alternatives
        assert_eq!(d.decode(&[3, 4]).unwrap().phenotype, "b");
    }

    #[test]
    fn test_decode_wraps_genome() {
        let d = decoder(6);
        // Five choices read from a two-codon genome: 2 0 | 2 0 | 2
        let derivation = d.decode(&[2, 0]).unwrap();
        assert_eq!(derivation.phenotype, "(c&c)");
        assert_eq!(derivation.choices.len(), 5);

        let no_wraps = GrammarDecoder::new(Grammar::parse(GRAMMAR).unwrap(), 6, 0);
        assert!(no_wraps.decode(&[2, 0]).is_none());
    }

    #[test]
    fn test_decode_respects_depth() {
        // Always F: recursion runs into the depth bound
        let unbounded_wraps = GrammarDecoder::new(Grammar::parse(GRAMMAR).unwrap(), 6, 100);
        assert!(unbounded_wraps.decode(&[1]).is_none());
        assert!(decoder(6).decode(&[]).is_none());
        // F F a needs <literal> at depth 3
        assert!(decoder(2).decode(&[1, 1, 0, 0]).is_none());
        assert_eq!(decoder(3).decode(&[1, 1, 0, 0]).unwrap().phenotype, "FFa");
    }

    #[test]
    fn test_single_alternative_consumes_nothing() {
        let grammar = Grammar::parse("<S> ::= <L> \"!\"\n<L> ::= x").unwrap();
        let d = GrammarDecoder::new(grammar, 4, 0);
        let derivation = d.decode(&[]).unwrap();
        assert_eq!(derivation.phenotype, "x!");
        assert!(derivation.choices.is_empty());
    }

    #[test]
    fn test_undefined_rule() {
        let grammar = Grammar::parse("<S> ::= <missing> | a").unwrap();
        let d = GrammarDecoder::new(grammar, 4, 0);
        assert!(d.decode(&[0]).is_none());
        assert_eq!(d.decode(&[1]).unwrap().phenotype, "a");
    }

    #[test]
    fn test_encode() {
        let d = decoder(6);
        assert_eq!(d.encode("Fc"), Some(vec![1, 0, 2]));
        assert_eq!(d.encode("(a&Fb)"), Some(vec![2, 0, 0, 1, 0, 1]));
        assert_eq!(d.encode("Fd"), None);
        assert_eq!(d.encode("F"), None);
    }

    #[test]
    fn test_round_trip() {
        let d = decoder(5);
        let mut rng = CodonRng::new(42);
        let config = GenomeConfig {
            length: 12,
            codon_max: 16,
        };

        let mut decoded = 0;
        for _ in 0..200 {
            let genome = rng.random_genome(&config);
            let Some(derivation) = d.decode(&genome) else {
                continue;
            };
            decoded += 1;
            let codons = d.encode(&derivation.phenotype).unwrap();
            assert_eq!(d.decode(&codons).unwrap().phenotype, derivation.phenotype);
        }
        assert!(decoded > 0);
    }
}
