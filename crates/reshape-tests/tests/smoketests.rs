use reshape::{
    analysis::{Analysis, AnalysisError},
    grammar::{
        Grammar, GrammarDef, GrammarDefError, MatchElement as M, Position, ReplaceElement as R,
    },
    runtime::{format::Segment, FormatError},
    Formatter,
};
use reshape_tests::grammars;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn compile(f: impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>) -> Formatter {
    init_tracing();
    let grammar = Grammar::define(f).unwrap();
    eprintln!("grammar:\n{}", grammar);
    let formatter = Formatter::new(&grammar).unwrap();
    for table in formatter.tables() {
        eprintln!("parse table:\n---\n{}", table);
    }
    formatter
}

#[test]
fn smoketest_identity() {
    let formatter = compile(grammars::g_identity);
    for input in ["a", "foo bar\n  baz\t", "  leading and trailing  \n\n"] {
        assert_eq!(formatter.format(input).unwrap(), input);
    }
}

#[test]
fn single_terminal_identity() {
    let formatter = compile(|g| {
        g.rule("all", [M::regex(r"(?s).+")], [R::capture(0)])?;
        Ok(())
    });
    for input in ["x", "line 1\nline 2\n", "tab\tand é"] {
        assert_eq!(formatter.format(input).unwrap(), input);
    }
}

#[test]
fn smoketest_search_b() {
    let formatter = compile(grammars::g_search_b);
    assert_eq!(formatter.format("ab").unwrap(), "<b>");

    let segments = formatter.scan("ab").unwrap();
    match &segments[..] {
        [Segment::Unmatched { start: 0, end: 1 }, Segment::Matched { matched, .. }] => {
            assert_eq!((matched.start, matched.end), (1, 2));
        }
        segments => panic!("unexpected segments: {:?}", segments),
    }
}

#[test]
fn smoketest_arithmetic() {
    let formatter = compile(grammars::g_arithmetic);
    assert_eq!(formatter.format("1+  2 -3").unwrap(), "1 + 2 - 3");
    assert_eq!(formatter.format("42").unwrap(), "42");
}

#[test]
fn smoketest_heading() {
    let formatter = compile(grammars::g_heading);
    assert_eq!(formatter.format("Title\n===").unwrap(), "Title\n=====");
    assert_eq!(formatter.format("Hi\n=======").unwrap(), "Hi\n==");
}

#[test]
fn declaration_order_breaks_ties() {
    let formatter = compile(grammars::g_ambiguous);
    assert_eq!(formatter.format("abc").unwrap(), "UPPER");
}

#[test]
fn full_document_rejects_leftover() {
    let formatter = compile(grammars::g_arithmetic);
    let err = formatter.format("1 + 2\nx").unwrap_err();
    match err {
        FormatError::UnexpectedInput { position } => {
            assert_eq!(position, Position::new(1, 6, 5));
        }
        err => panic!("unexpected error: {}", err),
    }

    let err = formatter.format("x").unwrap_err();
    assert_eq!(err.to_string(), "1:1: unexpected input");
}

#[test]
fn start_symbols_are_discovered() {
    let grammar = Grammar::define(grammars::g_arithmetic).unwrap();
    let analysis = Analysis::analyze(&grammar);
    assert_eq!(analysis.start_symbols(), ["expr"]);
}

#[test]
fn undefined_variable_is_reported_with_position() {
    let grammar = Grammar::define(|g| {
        g.rule("doc", [M::regex("a"), M::ident("X").at(Position::new(1, 12, 11))], [])?;
        Ok(())
    })
    .unwrap();
    let analysis = Analysis::analyze(&grammar);
    assert_eq!(
        analysis.errors(),
        [AnalysisError::UndefinedVariable {
            position: Position::new(1, 12, 11),
            name: "X".into(),
        }]
    );
    assert!(Formatter::new(&grammar).is_err());
}

#[test]
fn formatter_is_reusable() {
    let formatter = compile(grammars::g_arithmetic);
    let tables_before: Vec<_> = formatter.tables().iter().map(|t| t.to_string()).collect();

    let first = formatter.format("1+2").unwrap();
    assert!(formatter.format("1+").is_err());
    let second = formatter.format("1+2").unwrap();
    assert_eq!(first, second);

    let tables_after: Vec<_> = formatter.tables().iter().map(|t| t.to_string()).collect();
    assert_eq!(tables_before, tables_after);
}

#[test]
fn formatter_is_shared_between_threads() {
    let formatter = compile(grammars::g_arithmetic);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let formatter = &formatter;
                s.spawn(move || formatter.format(&format!("{}+{}", i, i)))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let output = handle.join().unwrap().unwrap();
            assert_eq!(output, format!("{} + {}", i, i));
        }
    });
}
