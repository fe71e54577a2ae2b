//! Grammar definition for integration tests.

use reshape::grammar::{GrammarDef, GrammarDefError, MatchElement as M, ReplaceElement as R};

/// Reproduces the input as is.
pub fn g_identity(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    g.rule("doc", [M::ident("doc"), M::ident("item")], [R::capture(0), R::capture(1)])?;
    g.rule("doc", [M::ident("item")], [R::capture(0)])?;
    g.rule("item", [M::regex(r"[^\s]+")], [R::capture(0)])?;
    g.rule("item", [M::regex(r"\s+")], [R::capture(0)])?;
    Ok(())
}

/// Wraps every `b` in angle brackets, ignoring everything else.
pub fn g_search_b(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    g.rule("b", [M::regex("b")], [R::literal("<"), R::capture(0), R::literal(">")])?;
    g.search_mode(true);
    Ok(())
}

/// Normalizes the spacing around the binary operators.
pub fn g_arithmetic(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    g.rule(
        "expr",
        [M::ident("expr"), M::ident("op"), M::ident("term")],
        [
            R::capture(0),
            R::literal(" "),
            R::capture(1),
            R::literal(" "),
            R::capture(2),
        ],
    )?;
    g.rule("expr", [M::ident("term")], [R::capture(0)])?;
    g.rule("term", [M::regex("[0-9]+"), M::ident("w")], [R::capture(0)])?;
    g.rule("op", [M::regex("[+-]"), M::ident("w")], [R::capture(0)])?;
    g.rule("w", [M::regex(r"[ \t]+")], [R::literal("")])?;
    g.rule("w", [], [])?;
    Ok(())
}

/// Fits the underline of a setext-style heading to the length of its title.
pub fn g_heading(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    g.rule(
        "heading",
        [M::regex(r"[^\n=][^\n]*"), M::regex(r"\n"), M::regex("=+")],
        [
            R::capture(0),
            R::capture(1),
            R::len(R::literal("="), R::capture(0)),
        ],
    )?;
    Ok(())
}

/// Two alternatives matching the same text, distinguished only by declaration order.
pub fn g_ambiguous(g: &mut GrammarDef<'_>) -> Result<(), GrammarDefError> {
    g.rule("s", [M::ident("upper")], [R::capture(0)])?;
    g.rule("s", [M::ident("lower")], [R::capture(0)])?;
    g.rule("upper", [M::regex("[a-z]+")], [R::literal("UPPER")])?;
    g.rule("lower", [M::regex("[a-z]+")], [R::literal("lower")])?;
    Ok(())
}
