//! Document-level scanning over a list of parse tables.

use crate::{
    definition::ParseTable,
    engine::{self, AttemptError, InternalError, Match},
    position::Position,
};

/// The scanning behavior of [`format`] and [`scan`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    search_mode: bool,
    keep_unmatched: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            search_mode: false,
            keep_unmatched: false,
        }
    }

    /// Look for matches anywhere in the input instead of requiring the
    /// whole document to be consumed.
    pub fn search_mode(&mut self, enabled: bool) -> &mut Self {
        self.search_mode = enabled;
        self
    }

    /// Copy the characters skipped in search mode to the output verbatim.
    ///
    /// By default, they are dropped.
    pub fn keep_unmatched(&mut self, enabled: bool) -> &mut Self {
        self.keep_unmatched = enabled;
        self
    }

    pub fn is_search_mode(&self) -> bool {
        self.search_mode
    }

    pub fn keeps_unmatched(&self) -> bool {
        self.keep_unmatched
    }
}

/// A span of the scanned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A span consumed by the table at index `table`.
    Matched { table: usize, matched: Match },

    /// A span skipped in search mode.
    Unmatched { start: usize, end: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{}: unexpected input", position)]
    UnexpectedInput { position: Position },

    #[error("inconsistent parse table for `{}'", start_symbol)]
    Internal {
        start_symbol: String,
        #[source]
        source: InternalError,
    },
}

/// Split the input into matched and skipped spans.
pub fn scan(
    input: &str,
    tables: &[ParseTable],
    config: &Config,
) -> Result<Vec<Segment>, FormatError> {
    let span = tracing::debug_span!("scan", search_mode = config.search_mode);
    let _entered = span.enter();

    let mut segments = vec![];
    let mut cursor = 0;
    while cursor < input.len() {
        if let Some((table, matched)) = attempt_tables(input, tables, cursor)? {
            tracing::trace!(
                "matched {}..{} with `{}'",
                matched.start,
                matched.end,
                tables[table].start_symbol()
            );
            cursor = matched.end;
            segments.push(Segment::Matched { table, matched });
            continue;
        }

        if !config.search_mode {
            return Err(FormatError::UnexpectedInput {
                position: Position::locate(input, cursor),
            });
        }

        let skipped = input[cursor..].chars().next().map_or(1, char::len_utf8);
        match segments.last_mut() {
            Some(Segment::Unmatched { end, .. }) => *end += skipped,
            _ => segments.push(Segment::Unmatched {
                start: cursor,
                end: cursor + skipped,
            }),
        }
        cursor += skipped;
    }

    Ok(segments)
}

/// Reformat the input text with the specified parse tables, tried in order at each position.
pub fn format(input: &str, tables: &[ParseTable], config: &Config) -> Result<String, FormatError> {
    let segments = scan(input, tables, config)?;

    let mut output = String::with_capacity(input.len());
    for segment in &segments {
        match segment {
            Segment::Matched { matched, .. } => output.push_str(&matched.output),
            Segment::Unmatched { start, end } => {
                if config.keep_unmatched {
                    output.push_str(&input[*start..*end]);
                }
            }
        }
    }
    Ok(output)
}

fn attempt_tables(
    input: &str,
    tables: &[ParseTable],
    cursor: usize,
) -> Result<Option<(usize, Match)>, FormatError> {
    for (i, table) in tables.iter().enumerate() {
        match engine::parse_at(table, input, cursor) {
            Ok(matched) if !matched.is_empty() => return Ok(Some((i, matched))),
            Ok(..) => {
                tracing::trace!("`{}' matched nothing at {}", table.start_symbol(), cursor);
            }
            Err(AttemptError::Internal(source)) => {
                return Err(FormatError::Internal {
                    start_symbol: table.start_symbol().to_owned(),
                    source,
                });
            }
            Err(err) => {
                tracing::trace!("`{}' failed: {}", table.start_symbol(), err);
            }
        }
    }
    Ok(None)
}
