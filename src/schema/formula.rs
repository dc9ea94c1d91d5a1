//! Temporal formulas over atomic predicates.
//!
//! Used both for candidate predicates (parsed from grammar-derived strings)
//! and for automaton edge guards (purely propositional formulas).

use std::fmt;

use super::trace::{AtomId, AtomTable};

/// LTL-style formula over atom ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Formula {
    Const(bool),
    Literal { atom: AtomId, negated: bool },
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Next(Box<Formula>),
    Finally(Box<Formula>),
    Globally(Box<Formula>),
    Until(Box<Formula>, Box<Formula>),
    Release(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn atom(atom: AtomId) -> Self {
        Self::Literal {
            atom,
            negated: false,
        }
    }

    pub fn negated_atom(atom: AtomId) -> Self {
        Self::Literal {
            atom,
            negated: true,
        }
    }

    pub fn not(f: Formula) -> Self {
        Self::Not(Box::new(f))
    }

    pub fn and(a: Formula, b: Formula) -> Self {
        Self::And(Box::new(a), Box::new(b))
    }

    pub fn or(a: Formula, b: Formula) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }

    pub fn next(f: Formula) -> Self {
        Self::Next(Box::new(f))
    }

    pub fn finally(f: Formula) -> Self {
        Self::Finally(Box::new(f))
    }

    pub fn globally(f: Formula) -> Self {
        Self::Globally(Box::new(f))
    }

    pub fn until(a: Formula, b: Formula) -> Self {
        Self::Until(Box::new(a), Box::new(b))
    }

    pub fn release(a: Formula, b: Formula) -> Self {
        Self::Release(Box::new(a), Box::new(b))
    }

    /// Left-nested conjunction, `true` when empty.
    pub fn and_all(items: impl IntoIterator<Item = Formula>) -> Self {
        items
            .into_iter()
            .reduce(Formula::and)
            .unwrap_or(Formula::Const(true))
    }

    /// Left-nested disjunction, `false` when empty.
    pub fn or_all(items: impl IntoIterator<Item = Formula>) -> Self {
        items
            .into_iter()
            .reduce(Formula::or)
            .unwrap_or(Formula::Const(false))
    }

    /// Parse a predicate string. `SSEQ[...]` macros are expanded first.
    pub fn parse(text: &str, atoms: &AtomTable) -> Result<Self, FormulaError> {
        let expanded = expand_sequences(text)?;
        let tokens = lex(&expanded, atoms)?;
        let mut parser = Parser { tokens, pos: 0 };
        let formula = parser.implication()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(formula),
            Some(token) => Err(FormulaError::UnexpectedToken(format!("{:?}", token))),
        }
    }

    /// Atoms referenced anywhere in the formula, sorted and deduplicated.
    pub fn atoms(&self) -> Vec<AtomId> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn collect_atoms(&self, out: &mut Vec<AtomId>) {
        match self {
            Self::Const(_) => {}
            Self::Literal { atom, .. } => out.push(*atom),
            Self::Not(f) | Self::Next(f) | Self::Finally(f) | Self::Globally(f) => {
                f.collect_atoms(out)
            }
            Self::And(a, b) | Self::Or(a, b) | Self::Until(a, b) | Self::Release(a, b) => {
                a.collect_atoms(out);
                b.collect_atoms(out);
            }
        }
    }

    /// Render with atom names from `atoms`.
    pub fn display<'a>(&'a self, atoms: &'a AtomTable) -> FormulaDisplay<'a> {
        FormulaDisplay {
            formula: self,
            atoms,
        }
    }
}

/// [`Formula`] paired with the atom names needed to print it.
pub struct FormulaDisplay<'a> {
    formula: &'a Formula,
    atoms: &'a AtomTable,
}

impl FormulaDisplay<'_> {
    fn child<'b>(&'b self, formula: &'b Formula) -> FormulaDisplay<'b> {
        FormulaDisplay {
            formula,
            atoms: self.atoms,
        }
    }
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.formula {
            Formula::Const(true) => write!(f, "true"),
            Formula::Const(false) => write!(f, "false"),
            Formula::Literal { atom, negated } => {
                if *negated {
                    write!(f, "!")?;
                }
                match self.atoms.name(*atom) {
                    Some(name) => write!(f, "{}", name),
                    None => write!(f, "#{}", atom),
                }
            }
            Formula::Not(a) => write!(f, "!({})", self.child(a)),
            Formula::And(a, b) => write!(f, "({} & {})", self.child(a), self.child(b)),
            Formula::Or(a, b) => write!(f, "({} | {})", self.child(a), self.child(b)),
            Formula::Next(a) => write!(f, "X({})", self.child(a)),
            Formula::Finally(a) => write!(f, "F({})", self.child(a)),
            Formula::Globally(a) => write!(f, "G({})", self.child(a)),
            Formula::Until(a, b) => write!(f, "({} U {})", self.child(a), self.child(b)),
            Formula::Release(a, b) => write!(f, "({} R {})", self.child(a), self.child(b)),
        }
    }
}

const SEQUENCE_MACRO: &str = "SSEQ[";

/// Rewrite every `SSEQ[p1,...,pn]` into plain temporal operators.
///
/// The result requires `p1`, ..., `pn` to happen in that order: eventually
/// `p1`, and strictly afterwards eventually `p2`, and so on, with `p(i+1)`
/// not holding before `p(i)` has.
pub fn expand_sequences(text: &str) -> Result<String, FormulaError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(SEQUENCE_MACRO) {
        out.push_str(&rest[..start]);
        let body_start = start + SEQUENCE_MACRO.len();
        let body_len = rest[body_start..]
            .find(']')
            .ok_or(FormulaError::UnterminatedSequence)?;
        let args: Vec<&str> = rest[body_start..body_start + body_len]
            .split(',')
            .map(str::trim)
            .collect();
        if args.iter().any(|arg| arg.is_empty()) {
            return Err(FormulaError::EmptySequenceItem);
        }

        let last = args.len() - 1;
        let mut sequence = format!("F({})", args[last]);
        let mut order = Vec::with_capacity(last);
        for i in (0..last).rev() {
            sequence = format!("F(({}) & X({}))", args[i], sequence);
            order.push(format!("(!({}) U ({}))", args[i + 1], args[i]));
        }
        if order.is_empty() {
            out.push_str(&sequence);
        } else {
            out.push_str(&format!("({} & {})", sequence, order.join(" & ")));
        }
        rest = &rest[body_start + body_len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(AtomId),
    Const(bool),
    Not,
    And,
    Or,
    Implies,
    Next,
    Finally,
    Globally,
    Until,
    Release,
    LParen,
    RParen,
}

fn lex(text: &str, atoms: &AtomTable) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        let (token, len) = match c {
            c if c.is_whitespace() => {
                rest = &rest[c.len_utf8()..];
                continue;
            }
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '!' | '~' => (Token::Not, 1),
            '&' if rest.starts_with("&&") => (Token::And, 2),
            '&' => (Token::And, 1),
            '|' if rest.starts_with("||") => (Token::Or, 2),
            '|' => (Token::Or, 1),
            '-' if rest.starts_with("->") => (Token::Implies, 2),
            c if c.is_alphanumeric() || c == '_' => lex_word(rest, atoms)?,
            c => return Err(FormulaError::UnexpectedChar(c)),
        };
        tokens.push(token);
        rest = &rest[len..];
    }
    Ok(tokens)
}

/// Lex one token from the start of an identifier-like run.
///
/// Atom names win (longest match), then boolean constants, then single-letter
/// temporal operators, so that glued text such as `GFa` or `aUb` splits into
/// operators and atoms.
fn lex_word(rest: &str, atoms: &AtomTable) -> Result<(Token, usize), FormulaError> {
    let best_atom = atoms
        .iter()
        .filter(|(_, name)| !name.is_empty() && rest.starts_with(name))
        .max_by_key(|(_, name)| name.len());
    if let Some((id, name)) = best_atom {
        return Ok((Token::Atom(id), name.len()));
    }
    for (word, value) in [("true", true), ("false", false), ("1", true), ("0", false)] {
        if rest.starts_with(word) {
            return Ok((Token::Const(value), word.len()));
        }
    }
    let token = match rest.as_bytes()[0] {
        b'X' => Token::Next,
        b'F' => Token::Finally,
        b'G' => Token::Globally,
        b'U' => Token::Until,
        b'R' => Token::Release,
        _ => {
            let word: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            return Err(FormulaError::UnknownAtom(word));
        }
    };
    Ok((token, 1))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn implication(&mut self) -> Result<Formula, FormulaError> {
        let lhs = self.disjunction()?;
        if self.eat(&Token::Implies) {
            let rhs = self.implication()?;
            return Ok(Formula::or(Formula::not(lhs), rhs));
        }
        Ok(lhs)
    }

    fn disjunction(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.conjunction()?;
        while self.eat(&Token::Or) {
            lhs = Formula::or(lhs, self.conjunction()?);
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> Result<Formula, FormulaError> {
        let mut lhs = self.binary_temporal()?;
        while self.eat(&Token::And) {
            lhs = Formula::and(lhs, self.binary_temporal()?);
        }
        Ok(lhs)
    }

    fn binary_temporal(&mut self) -> Result<Formula, FormulaError> {
        let lhs = self.unary()?;
        if self.eat(&Token::Until) {
            return Ok(Formula::until(lhs, self.binary_temporal()?));
        }
        if self.eat(&Token::Release) {
            return Ok(Formula::release(lhs, self.binary_temporal()?));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Formula, FormulaError> {
        let Some(token) = self.peek().cloned() else {
            return Err(FormulaError::UnexpectedEnd);
        };
        self.pos += 1;
        match token {
            Token::Not => Ok(match self.unary()? {
                Formula::Literal { atom, negated } => Formula::Literal {
                    atom,
                    negated: !negated,
                },
                other => Formula::not(other),
            }),
            Token::Next => Ok(Formula::next(self.unary()?)),
            Token::Finally => Ok(Formula::finally(self.unary()?)),
            Token::Globally => Ok(Formula::globally(self.unary()?)),
            Token::Atom(atom) => Ok(Formula::atom(atom)),
            Token::Const(value) => Ok(Formula::Const(value)),
            Token::LParen => {
                let inner = self.implication()?;
                if !self.eat(&Token::RParen) {
                    return Err(FormulaError::UnbalancedParentheses);
                }
                Ok(inner)
            }
            other => Err(FormulaError::UnexpectedToken(format!("{:?}", other))),
        }
    }
}

/// Predicate string errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("Unknown atomic predicate '{0}'")]
    UnknownAtom(String),
    #[error("Unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("Unexpected token {0}")]
    UnexpectedToken(String),
    #[error("Predicate ended unexpectedly")]
    UnexpectedEnd,
    #[error("Unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("SSEQ[ is missing its closing ']'")]
    UnterminatedSequence,
    #[error("SSEQ[...] contains an empty item")]
    EmptySequenceItem,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[&str]) -> AtomTable {
        let mut atoms = AtomTable::new();
        for name in names {
            atoms.intern(name);
        }
        atoms
    }

    #[test]
    fn test_precedence() {
        let atoms = table(&["a", "b", "c"]);
        let f = Formula::parse("a | b & c", &atoms).unwrap();
        assert_eq!(
            f,
            Formula::or(Formula::atom(0), Formula::and(Formula::atom(1), Formula::atom(2)))
        );

        let f = Formula::parse("a -> b -> c", &atoms).unwrap();
        assert_eq!(
            f,
            Formula::or(
                Formula::not(Formula::atom(0)),
                Formula::or(Formula::not(Formula::atom(1)), Formula::atom(2))
            )
        );

        let f = Formula::parse("a U b & c", &atoms).unwrap();
        assert_eq!(
            f,
            Formula::and(Formula::until(Formula::atom(0), Formula::atom(1)), Formula::atom(2))
        );
    }

    #[test]
    fn test_glued_operators() {
        let atoms = table(&["a", "b", "Fire"]);
        assert_eq!(
            Formula::parse("GFa", &atoms).unwrap(),
            Formula::globally(Formula::finally(Formula::atom(0)))
        );
        assert_eq!(
            Formula::parse("aUb", &atoms).unwrap(),
            Formula::until(Formula::atom(0), Formula::atom(1))
        );
        // Atom names beat operator letters
        assert_eq!(Formula::parse("Fire", &atoms).unwrap(), Formula::atom(2));
        assert_eq!(
            Formula::parse("F(!a&1)", &atoms).unwrap(),
            Formula::finally(Formula::and(Formula::negated_atom(0), Formula::Const(true)))
        );
    }

    #[test]
    fn test_parse_errors() {
        let atoms = table(&["a"]);
        assert_eq!(
            Formula::parse("a & zz", &atoms),
            Err(FormulaError::UnknownAtom("zz".to_string()))
        );
        assert_eq!(
            Formula::parse("(a", &atoms),
            Err(FormulaError::UnbalancedParentheses)
        );
        assert_eq!(Formula::parse("a &", &atoms), Err(FormulaError::UnexpectedEnd));
        assert!(matches!(
            Formula::parse("a a", &atoms),
            Err(FormulaError::UnexpectedToken(_))
        ));
        assert_eq!(Formula::parse("a $", &atoms), Err(FormulaError::UnexpectedChar('$')));
    }

    #[test]
    fn test_expand_sequences() {
        assert_eq!(expand_sequences("SSEQ[a]").unwrap(), "F(a)");
        assert_eq!(
            expand_sequences("G(b) & SSEQ[a, b]").unwrap(),
            "G(b) & (F((a) & X(F(b))) & (!(b) U (a)))"
        );
        assert_eq!(
            expand_sequences("SSEQ[a,b,c]").unwrap(),
            "(F((a) & X(F((b) & X(F(c))))) & (!(c) U (b)) & (!(b) U (a)))"
        );
        assert_eq!(
            expand_sequences("SSEQ[a"),
            Err(FormulaError::UnterminatedSequence)
        );
        assert_eq!(
            expand_sequences("SSEQ[a,]"),
            Err(FormulaError::EmptySequenceItem)
        );
    }

    #[test]
    fn test_sequence_parses() {
        let atoms = table(&["a", "b"]);
        let f = Formula::parse("SSEQ[a,b]", &atoms).unwrap();
        assert_eq!(f.atoms(), vec![0, 1]);
    }

    #[test]
    fn test_display() {
        let atoms = table(&["a", "b"]);
        let f = Formula::parse("!a U X b", &atoms).unwrap();
        assert_eq!(f.display(&atoms).to_string(), "(!a U X(b))");
    }
}
