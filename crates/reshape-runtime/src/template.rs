//! The text-reconstruction templates evaluated on each reduction.

use std::fmt;

/// An element of a replace template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplaceElement {
    /// Appends the literal text.
    StringLiteral(String),

    /// Appends the rendered text of the i-th matched element (0-based).
    CaptureGroup(usize),

    /// Appends the rendering of the first element once for every character
    /// in the rendering of the second one.
    Len(Box<ReplaceElement>, Box<ReplaceElement>),
}

impl ReplaceElement {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::StringLiteral(text.into())
    }

    pub const fn capture(index: usize) -> Self {
        Self::CaptureGroup(index)
    }

    pub fn len(first: ReplaceElement, second: ReplaceElement) -> Self {
        Self::Len(Box::new(first), Box::new(second))
    }

    /// Return the largest capture index referenced by this element.
    pub fn max_capture(&self) -> Option<usize> {
        match self {
            Self::StringLiteral(..) => None,
            Self::CaptureGroup(i) => Some(*i),
            Self::Len(first, second) => first.max_capture().max(second.max_capture()),
        }
    }

    fn render_into(&self, captures: &[&str], out: &mut String) -> Result<(), TemplateError> {
        match self {
            Self::StringLiteral(text) => out.push_str(text),
            Self::CaptureGroup(index) => {
                let capture = captures
                    .get(*index)
                    .ok_or(TemplateError::CaptureOutOfRange {
                        index: *index,
                        arity: captures.len(),
                    })?;
                out.push_str(capture);
            }
            Self::Len(first, second) => {
                let mut counted = String::new();
                second.render_into(captures, &mut counted)?;
                let count = counted.chars().count();
                if count > 0 {
                    let mut unit = String::new();
                    first.render_into(captures, &mut unit)?;
                    out.reserve(unit.len() * count);
                    for _ in 0..count {
                        out.push_str(&unit);
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for ReplaceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StringLiteral(text) => write!(f, "{:?}", text),
            Self::CaptureGroup(index) => write!(f, "${}", index),
            Self::Len(first, second) => write!(f, "len({}, {})", first, second),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("capture group ${} is out of range (the rule matches {} element(s))", index, arity)]
    CaptureOutOfRange { index: usize, arity: usize },
}

/// Render a replace template against the captured texts of a reduction.
///
/// An empty template renders the captures joined by a single space.
pub fn render(template: &[ReplaceElement], captures: &[&str]) -> Result<String, TemplateError> {
    if template.is_empty() {
        return Ok(captures.join(" "));
    }
    let mut out = String::new();
    for element in template {
        element.render_into(captures, &mut out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReplaceElement as R;

    #[test]
    fn len_repeats_per_character() {
        let template = [R::len(R::literal("x"), R::literal("abc"))];
        assert_eq!(render(&template, &[]).unwrap(), "xxx");

        let template = [R::len(R::literal("x"), R::literal(""))];
        assert_eq!(render(&template, &[]).unwrap(), "");
    }

    #[test]
    fn len_counts_characters_not_bytes() {
        let template = [R::len(R::literal("-"), R::capture(0))];
        assert_eq!(render(&template, &["日本"]).unwrap(), "--");
    }

    #[test]
    fn captures_and_literals() {
        let template = [
            R::capture(1),
            R::literal(" = "),
            R::capture(0),
            R::literal(";"),
        ];
        assert_eq!(render(&template, &["x", "y"]).unwrap(), "y = x;");
    }

    #[test]
    fn empty_template_joins_with_space() {
        assert_eq!(render(&[], &["a", "b", "c"]).unwrap(), "a b c");
        assert_eq!(render(&[], &[]).unwrap(), "");
    }

    #[test]
    fn capture_out_of_range() {
        let err = render(&[R::capture(2)], &["a"]).unwrap_err();
        assert_eq!(err, TemplateError::CaptureOutOfRange { index: 2, arity: 1 });
    }

    #[test]
    fn max_capture() {
        assert_eq!(R::literal("a").max_capture(), None);
        assert_eq!(
            R::len(R::capture(3), R::capture(1)).max_capture(),
            Some(3)
        );
    }

    #[test]
    fn display() {
        let e = R::len(R::literal("="), R::capture(0));
        assert_eq!(e.to_string(), "len(\"=\", $0)");
    }
}
