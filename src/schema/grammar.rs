//! Context-free grammars describing the predicate search space.
//!
//! Grammars are written in a small BNF dialect:
//!
//! ```text
//! // comments start with two slashes
//! <expr>   ::= <literal> | "F(" <expr> ")" | <expr> "&" <expr>
//! <binary> ::= "&"
//!            | "|"
//! ```
//!
//! The first rule is the root. Terminals are quoted (single or double quotes)
//! or bare whitespace-delimited tokens. Derived strings are the plain
//! concatenation of their terminals.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

/// Name of the rule synthesized from the trace atoms.
pub const LITERAL_RULE: &str = "literal";

/// A grammar symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(String),
    NonTerminal(String),
}

impl Symbol {
    pub fn terminal(text: impl Into<String>) -> Self {
        Self::Terminal(text.into())
    }

    pub fn non_terminal(name: impl Into<String>) -> Self {
        Self::NonTerminal(name.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Terminal text or rule name.
    pub fn text(&self) -> &str {
        match self {
            Self::Terminal(text) | Self::NonTerminal(text) => text,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(text) => write!(f, "{:?}", text),
            Self::NonTerminal(name) => write!(f, "<{}>", name),
        }
    }
}

/// One right-hand side of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Production {
    pub symbols: Vec<Symbol>,
}

impl Production {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Self { symbols }
    }
}

/// A non-terminal and its alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub productions: Vec<Production>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            productions: Vec::new(),
        }
    }

    pub fn with_production(mut self, symbols: Vec<Symbol>) -> Self {
        self.productions.push(Production::new(symbols));
        self
    }
}

/// How trace atoms are offered to the grammar through `<literal>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralMode {
    /// `<literal> ::= a | b | ...`
    #[default]
    Plain,
    /// `<literal> ::= <maybe-a> & <maybe-b> ...`, each atom holding, not
    /// holding, or not mattering.
    Block,
}

/// A set of rules; the first one is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse BNF text. Repeated definitions of a rule add alternatives.
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        let tokens = tokenize(text)?;
        let mut grammar = Self::new();
        let mut current: Option<Rule> = None;
        let mut production = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            let (line, token) = &tokens[i];
            match token {
                Token::NonTerminal(name)
                    if matches!(tokens.get(i + 1), Some((_, Token::Define))) =>
                {
                    if let Some(mut rule) = current.take() {
                        rule.productions.push(Production::new(std::mem::take(&mut production)));
                        grammar.merge_rule(rule);
                    }
                    current = Some(Rule::new(name.clone()));
                    i += 2;
                    continue;
                }
                Token::Define => {
                    return Err(GrammarError::Syntax {
                        line: *line,
                        message: "'::=' must follow a rule name".to_string(),
                    });
                }
                _ if current.is_none() => {
                    return Err(GrammarError::Syntax {
                        line: *line,
                        message: "expected a rule definition '<name> ::='".to_string(),
                    });
                }
                Token::Pipe => {
                    if let Some(rule) = current.as_mut() {
                        rule.productions.push(Production::new(std::mem::take(&mut production)));
                    }
                }
                Token::NonTerminal(name) => production.push(Symbol::non_terminal(name.clone())),
                Token::Terminal(text) => production.push(Symbol::terminal(text.clone())),
            }
            i += 1;
        }
        if let Some(mut rule) = current.take() {
            rule.productions.push(Production::new(production));
            grammar.merge_rule(rule);
        }

        if grammar.rules.is_empty() {
            return Err(GrammarError::Empty);
        }
        Ok(grammar)
    }

    pub fn from_file(path: &Path) -> Result<Self, GrammarError> {
        let text = std::fs::read_to_string(path).map_err(|source| GrammarError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn root(&self) -> Option<&Rule> {
        self.rules.first()
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Add a rule, replacing any existing rule of the same name.
    pub fn add_rule(&mut self, rule: Rule) {
        match self.index.get(&rule.name) {
            Some(&i) => {
                warn!("Replacing grammar rule <{}>", rule.name);
                self.rules[i] = rule;
            }
            None => {
                self.index.insert(rule.name.clone(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    fn merge_rule(&mut self, rule: Rule) {
        match self.index.get(&rule.name) {
            Some(&i) => self.rules[i].productions.extend(rule.productions),
            None => {
                self.index.insert(rule.name.clone(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    /// Synthesize the `<literal>` rule from the given atom names.
    pub fn inject_literals(&mut self, atoms: &[&str], mode: LiteralMode) {
        let mut literal = Rule::new(LITERAL_RULE);
        match mode {
            LiteralMode::Plain => {
                for atom in atoms {
                    literal.productions.push(Production::new(vec![Symbol::terminal(*atom)]));
                }
            }
            LiteralMode::Block => {
                let mut block = Vec::new();
                for (i, atom) in atoms.iter().enumerate() {
                    let name = format!("maybe-{}", atom);
                    self.add_rule(
                        Rule::new(name.clone())
                            .with_production(vec![Symbol::terminal(*atom)])
                            .with_production(vec![Symbol::terminal("!"), Symbol::terminal(*atom)])
                            .with_production(vec![Symbol::terminal("1")]),
                    );
                    if i > 0 {
                        block.push(Symbol::terminal("&"));
                    }
                    block.push(Symbol::non_terminal(name));
                }
                literal.productions.push(Production::new(block));
            }
        }
        self.add_rule(literal);
    }

    /// Check that every referenced non-terminal is defined.
    pub fn validate(&self) -> Result<(), GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::Empty);
        }
        for rule in &self.rules {
            if rule.productions.is_empty() {
                return Err(GrammarError::NoProductions(rule.name.clone()));
            }
            for production in &rule.productions {
                for symbol in &production.symbols {
                    if let Symbol::NonTerminal(name) = symbol
                        && !self.index.contains_key(name)
                    {
                        return Err(GrammarError::UndefinedRule {
                            rule: rule.name.clone(),
                            missing: name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "<{}> ::=", rule.name)?;
            for (i, production) in rule.productions.iter().enumerate() {
                if i > 0 {
                    write!(f, " |")?;
                }
                for symbol in &production.symbols {
                    write!(f, " {}", symbol)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    NonTerminal(String),
    Terminal(String),
    Define,
    Pipe,
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, GrammarError> {
    let mut tokens = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        if line.trim_start().starts_with("//") {
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
            } else if line_has(&chars, i, "::=") {
                tokens.push((number, Token::Define));
                i += 3;
            } else if c == '|' {
                tokens.push((number, Token::Pipe));
                i += 1;
            } else if c == '<' {
                let end = find(&chars, i + 1, '>').ok_or_else(|| GrammarError::Syntax {
                    line: number,
                    message: "unterminated '<'".to_string(),
                })?;
                let name: String = chars[i + 1..end].iter().collect();
                if name.trim().is_empty() {
                    return Err(GrammarError::Syntax {
                        line: number,
                        message: "empty rule name".to_string(),
                    });
                }
                tokens.push((number, Token::NonTerminal(name.trim().to_string())));
                i = end + 1;
            } else if c == '"' || c == '\'' {
                let end = find(&chars, i + 1, c).ok_or_else(|| GrammarError::Syntax {
                    line: number,
                    message: format!("unterminated {} quote", c),
                })?;
                tokens.push((number, Token::Terminal(chars[i + 1..end].iter().collect())));
                i = end + 1;
            } else {
                let start = i;
                while i < chars.len()
                    && !chars[i].is_whitespace()
                    && chars[i] != '|'
                    && chars[i] != '<'
                {
                    i += 1;
                }
                tokens.push((number, Token::Terminal(chars[start..i].iter().collect())));
            }
        }
    }
    Ok(tokens)
}

fn line_has(chars: &[char], at: usize, pattern: &str) -> bool {
    pattern
        .chars()
        .enumerate()
        .all(|(offset, p)| chars.get(at + offset) == Some(&p))
}

fn find(chars: &[char], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&i| chars[i] == target)
}

/// Grammar loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("Failed to read grammar {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Grammar syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Grammar defines no rules")]
    Empty,
    #[error("Rule <{0}> has no productions")]
    NoProductions(String),
    #[error("Rule <{rule}> references undefined rule <{missing}>")]
    UndefinedRule { rule: String, missing: String },
}
