//! Parse table definition.

use crate::{
    template::{self, ReplaceElement, TemplateError},
    types::Map,
};
use regex::Regex;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID(u32);

impl StateID {
    /// The state the automaton starts from.
    pub const INITIAL: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

/// The index of a terminal in the priority-ordered terminal list of a table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID(u16);

impl TerminalID {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ReductionID(u16);

impl ReductionID {
    /// Reserved for the augmented rule `$accept := <start symbol>`.
    pub const ACCEPT: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A terminal symbol, matched by a regular expression anchored at the cursor.
#[derive(Debug, Clone)]
pub struct Terminal {
    pattern: String,
    regex: Regex,
}

impl Terminal {
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        // A pattern with unbalanced groups could otherwise escape the anchor.
        Regex::new(&pattern)?;
        let regex = Regex::new(&format!(r"\A(?:{})", pattern))?;
        Ok(Self { pattern, regex })
    }

    /// The source pattern, which also serves as the title of this terminal.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Return the length of the match at the beginning of `input`.
    ///
    /// Empty matches are not considered as a match.
    pub fn match_len(&self, input: &str) -> Option<usize> {
        self.regex
            .find(input)
            .map(|m| m.end())
            .filter(|&len| len > 0)
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.pattern)
    }
}

/// The information required to reduce a production rule.
#[derive(Debug, Clone)]
pub struct Reduction {
    name: String,
    arity: usize,
    template: Vec<ReplaceElement>,
}

impl Reduction {
    pub fn new(name: impl Into<String>, arity: usize, template: Vec<ReplaceElement>) -> Self {
        Self {
            name: name.into(),
            arity,
            template,
        }
    }

    /// The reduction of the augmented rule, which passes its only capture through.
    pub fn accept() -> Self {
        Self::new("$accept", 1, vec![ReplaceElement::CaptureGroup(0)])
    }

    /// The name of the nonterminal symbol produced by this reduction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of stack elements consumed by this reduction.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn template(&self) -> &[ReplaceElement] {
        &self.template
    }

    pub fn render(&self, captures: &[&str]) -> Result<String, TemplateError> {
        template::render(&self.template, captures)
    }
}

/// The action that the automaton in a state performs on a matched terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Consume the terminal and transition to the specified state.
    Shift(StateID),

    /// Reduce with the specified rule without consuming input.
    Reduce(ReductionID),
}

#[derive(Debug, Clone, Default)]
pub struct State {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<String, StateID>,

    /// The reduction applied when none of the terminals can be used.
    pub eoi_reduce: Option<ReductionID>,
}

impl State {
    pub fn action(&self, terminal: TerminalID) -> Option<Action> {
        self.actions.get(&terminal).copied()
    }

    pub fn goto(&self, name: &str) -> Option<StateID> {
        self.gotos.get(name).copied()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("the parse table has no states")]
    EmptyStates,

    #[error("the first reduction must be the accepting one")]
    MissingAccept,

    #[error("{:?} refers to the unknown state {:?}", from, to)]
    UnknownState { from: StateID, to: StateID },

    #[error("{:?} refers to the unknown reduction #{}", from, reduction.into_raw())]
    UnknownReduction {
        from: StateID,
        reduction: ReductionID,
    },

    #[error("{:?} refers to the unknown terminal #{}", from, terminal.into_raw())]
    UnknownTerminal { from: StateID, terminal: TerminalID },
}

/// The parse table for a single start symbol.
///
/// A table is immutable once constructed, and can be shared between
/// any number of concurrent format invocations.
#[derive(Debug, Clone)]
pub struct ParseTable {
    start_symbol: String,
    terminals: Vec<Terminal>,
    reductions: Vec<Reduction>,
    states: Vec<State>,
}

impl ParseTable {
    /// Assemble a parse table, checking that every reference between its parts is valid.
    pub fn new(
        start_symbol: impl Into<String>,
        terminals: Vec<Terminal>,
        reductions: Vec<Reduction>,
        states: Vec<State>,
    ) -> Result<Self, DefinitionError> {
        if states.is_empty() {
            return Err(DefinitionError::EmptyStates);
        }
        match reductions.first() {
            Some(accept) if accept.arity() == 1 => (),
            _ => return Err(DefinitionError::MissingAccept),
        }

        for (i, state) in states.iter().enumerate() {
            let from = StateID(i as u32);
            let check_state = |to: StateID| {
                if to.index() < states.len() {
                    Ok(())
                } else {
                    Err(DefinitionError::UnknownState { from, to })
                }
            };
            let check_reduction = |reduction: ReductionID| {
                if reduction.index() < reductions.len() {
                    Ok(())
                } else {
                    Err(DefinitionError::UnknownReduction { from, reduction })
                }
            };

            for (&terminal, action) in &state.actions {
                if terminal.index() >= terminals.len() {
                    return Err(DefinitionError::UnknownTerminal { from, terminal });
                }
                match *action {
                    Action::Shift(to) => check_state(to)?,
                    Action::Reduce(reduction) => check_reduction(reduction)?,
                }
            }
            for &to in state.gotos.values() {
                check_state(to)?;
            }
            if let Some(reduction) = state.eoi_reduce {
                check_reduction(reduction)?;
            }
        }

        Ok(Self {
            start_symbol: start_symbol.into(),
            terminals,
            reductions,
            states,
        })
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// Iterate over the terminals in the order of their matching priority.
    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &Terminal)> + '_ {
        self.terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (TerminalID(i as u16), t))
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[id.index()]
    }

    pub fn reductions(&self) -> impl Iterator<Item = (ReductionID, &Reduction)> + '_ {
        self.reductions
            .iter()
            .enumerate()
            .map(|(i, r)| (ReductionID(i as u16), r))
    }

    pub fn reduction(&self, id: ReductionID) -> &Reduction {
        &self.reductions[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateID(i as u32), s))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

impl fmt::Display for ParseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## start symbol: {}", self.start_symbol)?;
        for (id, state) in self.states() {
            writeln!(f)?;
            writeln!(f, "#### State {:?}", id)?;
            if !state.actions.is_empty() {
                writeln!(f, "## actions")?;
                for (terminal, action) in &state.actions {
                    let terminal = self.terminal(*terminal);
                    match action {
                        Action::Shift(next) => writeln!(f, "- {} => shift({:?})", terminal, next)?,
                        Action::Reduce(reduce) => {
                            let reduce = self.reduction(*reduce);
                            writeln!(
                                f,
                                "- {} => reduce({}/{})",
                                terminal, reduce.name, reduce.arity
                            )?
                        }
                    }
                }
            }
            if !state.gotos.is_empty() {
                writeln!(f, "## gotos")?;
                for (symbol, next) in &state.gotos {
                    writeln!(f, "- {} => goto({:?})", symbol, next)?;
                }
            }
            if let Some(reduce) = state.eoi_reduce {
                let reduce = self.reduction(reduce);
                writeln!(f, "## otherwise => reduce({}/{})", reduce.name, reduce.arity)?;
            }
        }
        Ok(())
    }
}
