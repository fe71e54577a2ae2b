//! Parse table generation, with conflicts resolved by declaration order.

use crate::{
    analysis::{Analysis, AnalysisErrors},
    grammar::{Grammar, RuleID},
    lr0::{self, Augmented},
    types::{Map, Set},
};
use reshape_runtime::definition::{
    Action, DefinitionError, ParseTable, Reduction, ReductionID, State, TerminalID,
};
use std::iter;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("the grammar has errors:\n{}", .0)]
    Analysis(#[from] AnalysisErrors),

    #[error("unknown start symbol `{}'", .0)]
    UnknownStartSymbol(String),

    #[error("too many terminal symbols")]
    TooManyTerminals,

    #[error("inconsistent parse table")]
    Definition(
        #[from]
        #[source]
        DefinitionError,
    ),
}

/// Generate the parse table for the specified start symbol.
///
/// The table is not generated if the analysis reported any error.
/// Wherever several rules are ready to be reduced, the one declared first
/// wins, and a terminal that can be shifted is always shifted.
#[tracing::instrument(skip(g, analysis))]
pub fn generate(
    g: &Grammar,
    analysis: &Analysis<'_>,
    start_symbol: &str,
) -> Result<ParseTable, TableError> {
    analysis.check()?;
    if !g.is_defined(start_symbol) {
        return Err(TableError::UnknownStartSymbol(start_symbol.to_owned()));
    }

    let augmented = Augmented::new(g, start_symbol);
    let automaton = lr0::lr0(&augmented);
    tracing::trace!("automaton:\n{}", automaton.display(&augmented));

    // Only the terminals shifted somewhere in this automaton take part in the
    // table, keeping their global priority.
    let reachable: Set<&str> = automaton
        .states
        .values()
        .flat_map(|state| state.shifts.keys().copied())
        .collect();
    let mut terminals = vec![];
    let mut terminal_ids = Map::<&str, TerminalID>::default();
    for (pattern, terminal) in analysis.terminals() {
        if !reachable.contains(pattern) {
            continue;
        }
        let raw = u16::try_from(terminals.len()).map_err(|_| TableError::TooManyTerminals)?;
        terminal_ids.insert(pattern, TerminalID::from_raw(raw));
        terminals.push(terminal.clone());
    }

    let reductions: Vec<_> = iter::once(Reduction::accept())
        .chain(g.rules().enumerate().map(|(i, rule)| {
            debug_assert_eq!(usize::from(rule.order()), i + 1);
            Reduction::new(rule.name(), rule.matches().len(), rule.replaces().to_vec())
        }))
        .collect();

    let mut states = Vec::with_capacity(automaton.states.len());
    for (id, lr0_state) in &automaton.states {
        debug_assert_eq!(id.into_raw() as usize, states.len());

        let winner = lr0_state
            .reduces
            .iter()
            .copied()
            .min_by_key(|rule| augmented.rule(*rule).order());
        if let Some(winner) = winner {
            if lr0_state.reduces.len() > 1 || !lr0_state.shifts.is_empty() {
                tracing::debug!(
                    "{:?}: conflict resolved in favor of `{}'",
                    id,
                    augmented.rule(winner).display()
                );
            }
        }
        let winner = winner.map(reduction_id);

        let mut state = State::default();
        for (&pattern, &terminal) in &terminal_ids {
            if let Some(&next) = lr0_state.shifts.get(pattern) {
                state.actions.insert(terminal, Action::Shift(next));
            } else if let Some(reduce) = winner {
                state.actions.insert(terminal, Action::Reduce(reduce));
            }
        }
        state.gotos = lr0_state
            .gotos
            .iter()
            .map(|(name, next)| (name.to_string(), *next))
            .collect();
        state.eoi_reduce = winner;

        states.push(state);
    }

    let table = ParseTable::new(start_symbol, terminals, reductions, states)?;
    tracing::debug!("{} states", table.num_states());
    Ok(table)
}

fn reduction_id(rule: RuleID) -> ReductionID {
    ReductionID::from_raw(rule.into_raw())
}
