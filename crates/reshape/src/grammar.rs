//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{fmt, marker::PhantomData};

pub use reshape_runtime::{position::Position, template::ReplaceElement};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// Reserved for the augmented rule `$accept := <start symbol>`,
    /// synthesized for each parse table.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}

/// An element of the match sequence of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchElement {
    /// A reference to a nonterminal symbol.
    Identifier { name: String, position: Position },

    /// A terminal symbol matched by a regular expression.
    RegexLiteral { pattern: String, position: Position },
}

impl MatchElement {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier {
            name: name.into(),
            position: Position::default(),
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::RegexLiteral {
            pattern: pattern.into(),
            position: Position::default(),
        }
    }

    /// Replace the source position of this element.
    pub fn at(mut self, new_position: Position) -> Self {
        match &mut self {
            Self::Identifier { position, .. } | Self::RegexLiteral { position, .. } => {
                *position = new_position;
            }
        }
        self
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Identifier { position, .. } | Self::RegexLiteral { position, .. } => *position,
        }
    }

    /// Compare the symbols of two elements, ignoring their positions.
    fn same_symbol(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Identifier { name: a, .. }, Self::Identifier { name: b, .. }) => a == b,
            (Self::RegexLiteral { pattern: a, .. }, Self::RegexLiteral { pattern: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Display for MatchElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier { name, .. } => f.write_str(name),
            Self::RegexLiteral { pattern, .. } => write!(f, "/{}/", pattern),
        }
    }
}

/// An alternative of a nonterminal symbol.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    name: String,
    matches: Vec<MatchElement>,
    replaces: Vec<ReplaceElement>,
    position: Position,
}

impl Rule {
    pub(crate) fn accept(start_symbol: &str) -> Self {
        Self {
            id: RuleID::ACCEPT,
            name: "$accept".into(),
            matches: vec![MatchElement::ident(start_symbol)],
            replaces: vec![ReplaceElement::CaptureGroup(0)],
            position: Position::default(),
        }
    }

    pub fn id(&self) -> RuleID {
        self.id
    }

    /// The name of the nonterminal this rule is an alternative of.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self) -> &[MatchElement] {
        &self.matches
    }

    /// The replace template. An empty template joins the captures with spaces.
    pub fn replaces(&self) -> &[ReplaceElement] {
        &self.replaces
    }

    /// The declaration order of this rule, used to resolve conflicts
    /// between reductions (earlier wins).
    pub fn order(&self) -> u16 {
        self.id.raw
    }

    pub fn position(&self) -> Position {
        self.position
    }

    // `"name := e1 e2 => r1 r2"`
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            write!(f, "{} :=", self.name)?;
            if self.matches.is_empty() {
                f.write_str(" @empty")?;
            }
            for element in &self.matches {
                write!(f, " {}", element)?;
            }
            if !self.replaces.is_empty() {
                f.write_str(" =>")?;
                for element in &self.replaces {
                    write!(f, " {}", element)?;
                }
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parse tables.
#[derive(Debug)]
pub struct Grammar {
    rules: Map<RuleID, Rule>,
    nonterminals: Map<String, Vec<RuleID>>,
    search_mode: bool,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "- {}", rule.display())?;
        }
        if self.search_mode {
            writeln!(f, "\n## search mode")?;
        }
        Ok(())
    }
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            rules: Map::default(),
            nonterminals: Map::default(),
            search_mode: false,
            next_rule_id: RuleID::OFFSET,
            _marker: PhantomData,
        };

        f(&mut def)?;

        Ok(Grammar {
            rules: def.rules,
            nonterminals: def.nonterminals,
            search_mode: def.search_mode,
        })
    }

    /// Iterate over all rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.values()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// Iterate over the names of the nonterminals in the order of their first definition.
    pub fn nonterminals(&self) -> impl Iterator<Item = &str> + '_ {
        self.nonterminals.keys().map(|name| name.as_str())
    }

    /// Return the alternatives of a nonterminal in declaration order,
    /// or an empty slice if it is not defined.
    pub fn alternatives(&self, name: &str) -> &[RuleID] {
        self.nonterminals.get(name).map_or(&[][..], |ids| &ids[..])
    }

    pub fn is_defined(&self, name: &str) -> bool {
        !self.alternatives(name).is_empty()
    }

    /// Whether the documents are scanned for matches instead of being parsed as a whole.
    pub fn search_mode(&self) -> bool {
        self.search_mode
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    rules: Map<RuleID, Rule>,
    nonterminals: Map<String, Vec<RuleID>>,
    search_mode: bool,
    next_rule_id: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Add an alternative to the nonterminal `name`.
    pub fn rule<M, R>(
        &mut self,
        name: &str,
        matches: M,
        replaces: R,
    ) -> Result<RuleID, GrammarDefError>
    where
        M: IntoIterator<Item = MatchElement>,
        R: IntoIterator<Item = ReplaceElement>,
    {
        self.rule_at(Position::default(), name, matches, replaces)
    }

    /// Add an alternative to the nonterminal `name`, declared at `position`.
    pub fn rule_at<M, R>(
        &mut self,
        position: Position,
        name: &str,
        matches: M,
        replaces: R,
    ) -> Result<RuleID, GrammarDefError>
    where
        M: IntoIterator<Item = MatchElement>,
        R: IntoIterator<Item = ReplaceElement>,
    {
        if !verify_ident(name) {
            return Err(GrammarDefError::InvalidName {
                position,
                name: name.to_owned(),
            });
        }

        let matches: Vec<_> = matches.into_iter().collect();
        if matches.len() > usize::from(u16::MAX) {
            return Err(GrammarDefError::RuleTooLong {
                position,
                name: name.to_owned(),
            });
        }
        for element in &matches {
            if let MatchElement::Identifier { name, position } = element {
                if !verify_ident(name) {
                    return Err(GrammarDefError::InvalidName {
                        position: *position,
                        name: name.clone(),
                    });
                }
            }
        }

        let alternatives = self.nonterminals.get(name).map_or(&[][..], |ids| &ids[..]);
        for id in alternatives {
            let rule = &self.rules[id];
            if rule.matches.len() == matches.len()
                && rule
                    .matches
                    .iter()
                    .zip(&matches)
                    .all(|(a, b)| a.same_symbol(b))
            {
                return Err(GrammarDefError::DuplicateRule {
                    position,
                    name: name.to_owned(),
                });
            }
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id = self
            .next_rule_id
            .checked_add(1)
            .ok_or(GrammarDefError::TooManyRules)?;

        self.rules.insert(
            id,
            Rule {
                id,
                name: name.to_owned(),
                matches,
                replaces: replaces.into_iter().collect(),
                position,
            },
        );
        self.nonterminals.entry(name.to_owned()).or_default().push(id);

        Ok(id)
    }

    /// Declare the document-level search mode flag.
    pub fn search_mode(&mut self, enabled: bool) {
        self.search_mode = enabled;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("{}: invalid symbol name `{}'", position, name)]
    InvalidName { position: Position, name: String },

    #[error("{}: duplicate alternative of `{}'", position, name)]
    DuplicateRule { position: Position, name: String },

    #[error("too many rules")]
    TooManyRules,

    #[error("{}: too many elements in an alternative of `{}'", position, name)]
    RuleTooLong { position: Position, name: String },

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(ch) => ch,
        // The identifier must not be empty.
        None => return false,
    };
    if !is_ident_start(first) {
        // The identifier must be started with XID-Start.
        return false;
    }
    // The identifier must be continued with XID-Continue.
    chars.all(is_ident_continue)
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}
