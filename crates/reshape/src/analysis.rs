//! Static analysis of grammars: start symbols and the checks that must pass
//! before any parse table is generated.

use crate::{
    grammar::{Grammar, MatchElement, Position},
    types::{Map, Set},
};
use reshape_runtime::definition::Terminal;
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("{}: undefined variable `{}'", position, name)]
    UndefinedVariable { position: Position, name: String },

    #[error("{}: invalid regular expression /{}/: {}", position, pattern, message)]
    InvalidRegex {
        position: Position,
        pattern: String,
        message: String,
    },

    #[error(
        "{}: capture group ${} of `{}' is out of range (the rule matches {} element(s))",
        position,
        index,
        rule,
        arity
    )]
    CaptureOutOfRange {
        position: Position,
        rule: String,
        index: usize,
        arity: usize,
    },
}

/// The list of errors found in a grammar, reported one per line.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisErrors {
    errors: Vec<AnalysisError>,
}

impl AnalysisErrors {
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisError> + '_ {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AnalysisErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AnalysisErrors {}

/// The result of analyzing a grammar.
#[derive(Debug)]
pub struct Analysis<'g> {
    start_symbols: Vec<&'g str>,
    terminals: Map<&'g str, Terminal>,
    errors: Vec<AnalysisError>,
}

impl<'g> Analysis<'g> {
    pub fn analyze(g: &'g Grammar) -> Self {
        let start_symbols = start_symbols(g);
        tracing::debug!("start symbols: {:?}", start_symbols);

        let mut errors = undefined_variables(g);
        let terminals = compile_terminals(g, &mut errors);
        errors.extend(capture_errors(g));

        Self {
            start_symbols,
            terminals,
            errors,
        }
    }

    /// The nonterminals that no other rule refers to, in declaration order.
    pub fn start_symbols(&self) -> &[&'g str] {
        &self.start_symbols
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    /// Return the errors found in the grammar, if any.
    pub fn check(&self) -> Result<(), AnalysisErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AnalysisErrors {
                errors: self.errors.clone(),
            })
        }
    }

    /// Iterate over the compiled terminals in the order of their matching priority,
    /// that is, the order of their first appearance in the grammar.
    pub fn terminals(&self) -> impl Iterator<Item = (&'g str, &Terminal)> + '_ {
        self.terminals.iter().map(|(pattern, t)| (*pattern, t))
    }
}

/// Discover the nonterminals eligible as start symbols.
///
/// A nonterminal is eligible iff no alternative of another nonterminal refers to it.
pub fn start_symbols(g: &Grammar) -> Vec<&str> {
    let mut referenced = Set::default();
    for rule in g.rules() {
        for element in rule.matches() {
            if let MatchElement::Identifier { name, .. } = element {
                if name != rule.name() {
                    referenced.insert(name.as_str());
                }
            }
        }
    }
    g.nonterminals()
        .filter(|name| !referenced.contains(name))
        .collect()
}

/// Report every reference to a nonterminal without alternatives.
pub fn undefined_variables(g: &Grammar) -> Vec<AnalysisError> {
    let mut errors = vec![];
    for rule in g.rules() {
        for element in rule.matches() {
            if let MatchElement::Identifier { name, position } = element {
                if !g.is_defined(name) {
                    errors.push(AnalysisError::UndefinedVariable {
                        position: *position,
                        name: name.clone(),
                    });
                }
            }
        }
    }
    errors
}

fn compile_terminals<'g>(
    g: &'g Grammar,
    errors: &mut Vec<AnalysisError>,
) -> Map<&'g str, Terminal> {
    let mut terminals = Map::default();
    let mut invalid = Set::default();
    for rule in g.rules() {
        for element in rule.matches() {
            let (pattern, position) = match element {
                MatchElement::RegexLiteral { pattern, position } => (pattern.as_str(), *position),
                MatchElement::Identifier { .. } => continue,
            };
            if terminals.contains_key(pattern) || invalid.contains(pattern) {
                continue;
            }
            match Terminal::new(pattern) {
                Ok(terminal) => {
                    terminals.insert(pattern, terminal);
                }
                Err(err) => {
                    invalid.insert(pattern);
                    errors.push(AnalysisError::InvalidRegex {
                        position,
                        pattern: pattern.to_owned(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
    terminals
}

fn capture_errors(g: &Grammar) -> Vec<AnalysisError> {
    let mut errors = vec![];
    for rule in g.rules() {
        let arity = rule.matches().len();
        for element in rule.replaces() {
            if let Some(index) = element.max_capture().filter(|&index| index >= arity) {
                errors.push(AnalysisError::CaptureOutOfRange {
                    position: rule.position(),
                    rule: rule.name().to_owned(),
                    index,
                    arity,
                });
            }
        }
    }
    errors
}
