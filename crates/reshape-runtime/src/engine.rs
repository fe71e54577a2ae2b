//! The shift-reduce engine that drives a parse table over the input text.

use crate::{
    definition::{Action, ParseTable, ReductionID, StateID, TerminalID},
    template::TemplateError,
};

/// An element of the parse stack, tagged with the state it was pushed under.
#[derive(Debug)]
pub struct StackElement<'t, 'i> {
    pub state: StateID,
    pub value: StackValue<'t, 'i>,
}

#[derive(Debug)]
pub enum StackValue<'t, 'i> {
    /// A raw terminal match.
    Token(&'i str),

    /// The rendered text of a reduced nonterminal.
    Reduced { name: &'t str, text: String },
}

impl StackValue<'_, '_> {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Token(text) => text,
            Self::Reduced { text, .. } => text,
        }
    }
}

/// A successful parse of the input span `start..end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub output: String,
}

impl Match {
    /// The number of bytes consumed from the input.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("syntax error at byte {}", offset)]
    Syntax { offset: usize },

    #[error("reductions at byte {} do not make progress", offset)]
    Stalled { offset: usize },

    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Inconsistencies of a parse table, as opposed to errors in the input text.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("no goto on `{}' from {:?}", symbol, state)]
    MissingGoto { state: StateID, symbol: String },

    #[error("the parse stack underflowed while reducing `{}'", symbol)]
    StackUnderflow { symbol: String },

    #[error("failed to render `{}'", symbol)]
    Template {
        symbol: String,
        #[source]
        source: TemplateError,
    },

    #[error("accepted with {} element(s) left on the stack", remaining)]
    UnbalancedAccept { remaining: usize },
}

/// Try to parse a prefix of `input[start..]` with the specified table.
///
/// On success, the returned match holds the consumed span and the text
/// rendered by the templates of the reduced rules.
pub fn parse_at(table: &ParseTable, input: &str, start: usize) -> Result<Match, AttemptError> {
    let span = tracing::trace_span!("parse_at", start_symbol = table.start_symbol(), start);
    let _entered = span.enter();

    if !input.is_char_boundary(start) {
        return Err(AttemptError::Syntax { offset: start });
    }

    let mut attempt = Attempt {
        table,
        input,
        cursor: start,
        state: StateID::INITIAL,
        stack: vec![],
        idle_reductions: 0,
        idle_limit: 0,
    };
    attempt.reset_idle();

    let output = attempt.run()?;
    Ok(Match {
        start,
        end: attempt.cursor,
        output,
    })
}

struct Attempt<'t, 'i> {
    table: &'t ParseTable,
    input: &'i str,
    cursor: usize,
    state: StateID,
    stack: Vec<StackElement<'t, 'i>>,
    idle_reductions: usize,
    idle_limit: usize,
}

impl<'t, 'i> Attempt<'t, 'i> {
    fn run(&mut self) -> Result<String, AttemptError> {
        loop {
            let reduction = match self.next_action() {
                Some((terminal, Action::Shift(next), len)) => {
                    self.shift(terminal, next, len);
                    continue;
                }
                Some((_, Action::Reduce(reduction), _)) => reduction,
                None => match self.table.state(self.state).eoi_reduce {
                    Some(reduction) => reduction,
                    None => {
                        tracing::trace!("no usable terminal in {:?}", self.state);
                        return Err(AttemptError::Syntax {
                            offset: self.cursor,
                        });
                    }
                },
            };

            if let Some(output) = self.reduce(reduction)? {
                return Ok(output);
            }
        }
    }

    /// Find the action for the input at the cursor.
    ///
    /// The first matching terminal in priority order that can be shifted wins.
    /// A reduction is triggered only if none of the shiftable terminals matches.
    fn next_action(&self) -> Option<(TerminalID, Action, usize)> {
        let state = self.table.state(self.state);
        let rest = &self.input[self.cursor..];
        let mut reduce = None;
        for (id, terminal) in self.table.terminals() {
            let action = match state.action(id) {
                Some(action) => action,
                None => continue,
            };
            if reduce.is_some() && matches!(action, Action::Reduce(..)) {
                continue;
            }
            let len = match terminal.match_len(rest) {
                Some(len) => len,
                None => continue,
            };
            match action {
                Action::Shift(..) => return Some((id, action, len)),
                Action::Reduce(..) => reduce = Some((id, action, len)),
            }
        }
        reduce
    }

    fn shift(&mut self, terminal: TerminalID, next: StateID, len: usize) {
        let end = self.cursor + len;
        let text = &self.input[self.cursor..end];
        tracing::trace!(
            "shift {} {:?}: {:?} -> {:?}",
            self.table.terminal(terminal),
            text,
            self.state,
            next
        );
        self.stack.push(StackElement {
            state: self.state,
            value: StackValue::Token(text),
        });
        self.cursor = end;
        self.state = next;
        self.reset_idle();
    }

    /// Apply the reduction, and return the rendered text if it was the accepting one.
    fn reduce(&mut self, id: ReductionID) -> Result<Option<String>, AttemptError> {
        self.idle_reductions += 1;
        if self.idle_reductions > self.idle_limit {
            tracing::warn!(
                "giving up after {} reductions without consuming input at byte {}",
                self.idle_limit,
                self.cursor
            );
            return Err(AttemptError::Stalled {
                offset: self.cursor,
            });
        }

        let table = self.table;
        let reduction = table.reduction(id);
        let arity = reduction.arity();
        if self.stack.len() < arity {
            return Err(InternalError::StackUnderflow {
                symbol: reduction.name().to_owned(),
            }
            .into());
        }

        let args = self.stack.split_off(self.stack.len() - arity);
        let exposed = args.first().map_or(self.state, |arg| arg.state);
        let captures: Vec<&str> = args.iter().map(|arg| arg.value.as_str()).collect();
        let text = reduction
            .render(&captures)
            .map_err(|source| InternalError::Template {
                symbol: reduction.name().to_owned(),
                source,
            })?;
        tracing::trace!("reduce {} {:?} => {:?}", reduction.name(), captures, text);

        if id == ReductionID::ACCEPT {
            if !self.stack.is_empty() {
                return Err(InternalError::UnbalancedAccept {
                    remaining: self.stack.len(),
                }
                .into());
            }
            return Ok(Some(text));
        }

        let next = table
            .state(exposed)
            .goto(reduction.name())
            .ok_or_else(|| InternalError::MissingGoto {
                state: exposed,
                symbol: reduction.name().to_owned(),
            })?;
        self.stack.push(StackElement {
            state: exposed,
            value: StackValue::Reduced {
                name: reduction.name(),
                text,
            },
        });
        self.state = next;
        Ok(None)
    }

    fn reset_idle(&mut self) {
        self.idle_reductions = 0;
        self.idle_limit = (self.stack.len() + 1) * (self.table.num_states() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        definition::{Reduction, State, Terminal},
        template::ReplaceElement,
    };
    use tracing::Level;

    // $accept := S ; S := /b/
    fn table_b() -> ParseTable {
        let b = TerminalID::from_raw(0);
        let s = ReductionID::from_raw(1);

        let mut s0 = State::default();
        s0.actions.insert(b, Action::Shift(StateID::from_raw(1)));
        s0.gotos.insert("S".into(), StateID::from_raw(2));

        let mut s1 = State::default();
        s1.actions.insert(b, Action::Reduce(s));
        s1.eoi_reduce = Some(s);

        let mut s2 = State::default();
        s2.actions.insert(b, Action::Reduce(ReductionID::ACCEPT));
        s2.eoi_reduce = Some(ReductionID::ACCEPT);

        ParseTable::new(
            "S",
            vec![Terminal::new("b").unwrap()],
            vec![
                Reduction::accept(),
                Reduction::new(
                    "S",
                    1,
                    vec![
                        ReplaceElement::literal("<"),
                        ReplaceElement::capture(0),
                        ReplaceElement::literal(">"),
                    ],
                ),
            ],
            vec![s0, s1, s2],
        )
        .unwrap()
    }

    #[test]
    fn accepts_prefix() {
        let table = table_b();
        let m = parse_at(&table, "bb", 0).unwrap();
        assert_eq!(
            m,
            Match {
                start: 0,
                end: 1,
                output: "<b>".into()
            }
        );
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn parses_from_offset() {
        let table = table_b();
        let m = parse_at(&table, "ab", 1).unwrap();
        assert_eq!((m.start, m.end), (1, 2));
        assert_eq!(m.output, "<b>");
    }

    #[test]
    fn syntax_error_at_cursor() {
        let table = table_b();
        let err = parse_at(&table, "ab", 0).unwrap_err();
        assert!(matches!(err, AttemptError::Syntax { offset: 0 }));
    }

    #[test]
    fn shift_wins_over_higher_priority_reduce() {
        // $accept := S ; S := /x/ W /[ y]+/ ; W := / / | (empty)
        let x = TerminalID::from_raw(0);
        let ys = TerminalID::from_raw(1);
        let sp = TerminalID::from_raw(2);
        let s = ReductionID::from_raw(1);
        let w_space = ReductionID::from_raw(2);
        let w_empty = ReductionID::from_raw(3);

        let mut s0 = State::default();
        s0.actions.insert(x, Action::Shift(StateID::from_raw(1)));
        s0.gotos.insert("S".into(), StateID::from_raw(5));

        let mut s1 = State::default();
        s1.actions.insert(ys, Action::Reduce(w_empty));
        s1.actions.insert(sp, Action::Shift(StateID::from_raw(2)));
        s1.gotos.insert("W".into(), StateID::from_raw(3));
        s1.eoi_reduce = Some(w_empty);

        let mut s2 = State::default();
        s2.eoi_reduce = Some(w_space);

        let mut s3 = State::default();
        s3.actions.insert(ys, Action::Shift(StateID::from_raw(4)));

        let mut s4 = State::default();
        s4.eoi_reduce = Some(s);

        let mut s5 = State::default();
        s5.eoi_reduce = Some(ReductionID::ACCEPT);

        let table = ParseTable::new(
            "S",
            vec![
                Terminal::new("x").unwrap(),
                Terminal::new("[ y]+").unwrap(),
                Terminal::new(" ").unwrap(),
            ],
            vec![
                Reduction::accept(),
                Reduction::new(
                    "S",
                    3,
                    vec![
                        ReplaceElement::literal("<"),
                        ReplaceElement::capture(1),
                        ReplaceElement::literal(">"),
                        ReplaceElement::capture(2),
                    ],
                ),
                Reduction::new("W", 1, vec![ReplaceElement::literal("_")]),
                Reduction::new("W", 0, vec![]),
            ],
            vec![s0, s1, s2, s3, s4, s5],
        )
        .unwrap();

        let m = parse_at(&table, "x y", 0).unwrap();
        assert_eq!(m.output, "<_>y");
        assert_eq!(m.end, 3);

        let m = parse_at(&table, "xy", 0).unwrap();
        assert_eq!(m.output, "<>y");
    }

    #[test]
    fn rejects_non_boundary_start() {
        let table = table_b();
        let err = parse_at(&table, "éb", 1).unwrap_err();
        assert!(matches!(err, AttemptError::Syntax { offset: 1 }));
    }

    #[test]
    fn missing_goto_is_internal() {
        let b = TerminalID::from_raw(0);
        let mut s0 = State::default();
        s0.actions.insert(b, Action::Shift(StateID::from_raw(1)));
        let mut s1 = State::default();
        s1.eoi_reduce = Some(ReductionID::from_raw(1));
        let table = ParseTable::new(
            "S",
            vec![Terminal::new("b").unwrap()],
            vec![Reduction::accept(), Reduction::new("S", 1, vec![])],
            vec![s0, s1],
        )
        .unwrap();

        let err = parse_at(&table, "b", 0).unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Internal(InternalError::MissingGoto { .. })
        ));
    }

    #[test]
    fn stalls_on_reduction_cycle() {
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .with_test_writer()
            .try_init();

        // $accept := S ; S := S E ; E := (empty), with the empty rule preferred.
        let mut s0 = State::default();
        s0.gotos.insert("S".into(), StateID::from_raw(1));
        s0.eoi_reduce = Some(ReductionID::from_raw(2));
        s0.gotos.insert("E".into(), StateID::from_raw(1));
        let mut s1 = State::default();
        s1.gotos.insert("E".into(), StateID::from_raw(1));
        s1.eoi_reduce = Some(ReductionID::from_raw(2));
        let table = ParseTable::new(
            "S",
            vec![],
            vec![
                Reduction::accept(),
                Reduction::new("S", 2, vec![]),
                Reduction::new("E", 0, vec![]),
            ],
            vec![s0, s1],
        )
        .unwrap();

        let err = parse_at(&table, "", 0).unwrap_err();
        assert!(matches!(err, AttemptError::Stalled { offset: 0 }));
    }
}
