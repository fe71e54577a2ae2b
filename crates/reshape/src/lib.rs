//! Grammar-driven text reformatter.
//!
//! A [`Grammar`] is a list of rules, each matching a sequence of regular
//! expressions and nonterminals and rendering the match through a replace
//! template. [`Formatter`] compiles the grammar into one parse table per
//! start symbol and rewrites documents with them.

pub mod analysis;
pub mod formatter;
pub mod grammar;
pub mod lr0;
pub mod table;
pub mod types;
pub mod util;

pub use crate::{
    formatter::{CompileError, Formatter},
    grammar::{Grammar, GrammarDef, GrammarDefError},
};
pub use reshape_runtime as runtime;
