//! Compilation of grammars into reusable formatters.

use crate::{
    analysis::{Analysis, AnalysisErrors},
    grammar::Grammar,
    table::{self, TableError},
};
use reshape_runtime::{
    format::{self, Config, FormatError, Segment},
    ParseTable,
};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("the grammar has errors:\n{}", .0)]
    Analysis(#[from] AnalysisErrors),

    #[error("the grammar has no start symbol")]
    NoStartSymbol,

    #[error("failed to generate the parse table")]
    Table(
        #[from]
        #[source]
        TableError,
    ),
}

/// A compiled grammar: one parse table per start symbol, tried in order.
///
/// A formatter is never mutated by formatting, so it can be reused for any
/// number of documents and shared between threads.
#[derive(Debug, Clone)]
pub struct Formatter {
    tables: Vec<ParseTable>,
    config: Config,
}

impl Formatter {
    /// Compile the grammar using the start symbols discovered by the analysis.
    pub fn new(g: &Grammar) -> Result<Self, CompileError> {
        let analysis = Analysis::analyze(g);
        analysis.check()?;
        Self::build(g, &analysis, analysis.start_symbols())
    }

    /// Compile the grammar using the specified start symbols, tried in the given order.
    pub fn with_start_symbols(g: &Grammar, start_symbols: &[&str]) -> Result<Self, CompileError> {
        let analysis = Analysis::analyze(g);
        analysis.check()?;
        Self::build(g, &analysis, start_symbols)
    }

    fn build(
        g: &Grammar,
        analysis: &Analysis<'_>,
        start_symbols: &[&str],
    ) -> Result<Self, CompileError> {
        if start_symbols.is_empty() {
            return Err(CompileError::NoStartSymbol);
        }

        let tables = start_symbols
            .iter()
            .map(|start_symbol| table::generate(g, analysis, start_symbol))
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = Config::new();
        config.search_mode(g.search_mode());

        Ok(Self { tables, config })
    }

    /// Reformat the document.
    pub fn format(&self, input: &str) -> Result<String, FormatError> {
        format::format(input, &self.tables, &self.config)
    }

    /// Split the document into matched and skipped spans without joining the output.
    pub fn scan(&self, input: &str) -> Result<Vec<Segment>, FormatError> {
        format::scan(input, &self.tables, &self.config)
    }

    pub fn tables(&self) -> &[ParseTable] {
        &self.tables
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}
