use runfilter::{QueryParser, QueryParserConfig, SyntaxErrorKind};

fn parser() -> QueryParser {
    let config = QueryParserConfig::default()
        .with_dialect("sqlite")
        .with_default_expression("run.archived", "not run.archived")
        .with_table("experiments", "Experiment");
    QueryParser::new(config).unwrap()
}

fn error_kind(query: &str) -> SyntaxErrorKind {
    match parser().parse(query) {
        Ok(compiled) => panic!("expected an error for {:?}, got {}", query, compiled.to_sql()),
        Err(err) => err.kind(),
    }
}

#[test]
fn test_nested_context_key_rejected() {
    assert_eq!(
        error_kind("metric.context.parent.nested == 'value1'"),
        SyntaxErrorKind::ContextDepth
    );
}

#[test]
fn test_bare_context_rejected() {
    assert_eq!(
        error_kind("metric.context == 'value1'"),
        SyntaxErrorKind::ContextDepth
    );
}

#[test]
fn test_subscript_tuple_wrong_order() {
    assert_eq!(
        error_kind(r#"run.metrics[{"key1": "value1"}, "my_metric"].last < -1"#),
        SyntaxErrorKind::InvalidSubscript
    );
}

#[test]
fn test_subscript_map_only() {
    assert_eq!(
        error_kind(r#"run.metrics[{"key1": "value1"}].last < -1"#),
        SyntaxErrorKind::InvalidSubscript
    );
}

#[test]
fn test_subscript_non_string_name() {
    assert_eq!(
        error_kind("run.metrics[1].last < -1"),
        SyntaxErrorKind::InvalidSubscript
    );
}

#[test]
fn test_unknown_root() {
    assert_eq!(
        error_kind("job.name == 'x'"),
        SyntaxErrorKind::UnresolvedSymbol
    );
}

#[test]
fn test_unknown_attribute() {
    assert_eq!(
        error_kind("run.colour == 'red'"),
        SyntaxErrorKind::UnknownAttribute
    );
    assert_eq!(
        error_kind(r#"run.metrics["loss"].first < 1"#),
        SyntaxErrorKind::UnknownAttribute
    );
}

#[test]
fn test_lexical_error_has_span() {
    let err = parser().parse("run.name == 'x' ; drop").unwrap_err();
    assert_eq!(err.kind(), SyntaxErrorKind::Lexical);
    assert_eq!(err.span().map(|s| s.start), Some(16));
}

#[test]
fn test_unterminated_string() {
    assert_eq!(error_kind("run.name == 'x"), SyntaxErrorKind::Lexical);
}

#[test]
fn test_grammar_errors() {
    assert_eq!(error_kind("run.name =="), SyntaxErrorKind::Grammar);
    assert_eq!(error_kind("(run.name == 'x'"), SyntaxErrorKind::Grammar);
    assert_eq!(error_kind("run.name == 'x' run.name"), SyntaxErrorKind::Grammar);
}

#[test]
fn test_unsupported_constructs() {
    assert_eq!(error_kind("1 < run.metrics['a'].last < 2"), SyntaxErrorKind::Unsupported);
    assert_eq!(error_kind("run.name.upper()"), SyntaxErrorKind::Unsupported);
    assert_eq!(error_kind("run.name"), SyntaxErrorKind::Unsupported);
    assert_eq!(error_kind("1 == 1"), SyntaxErrorKind::Unsupported);
    assert_eq!(error_kind("run.archived > True"), SyntaxErrorKind::Unsupported);
    assert_eq!(error_kind("run.name in []"), SyntaxErrorKind::Unsupported);
}

#[test]
fn test_tags_reject_context_tuple() {
    assert_eq!(
        error_kind(r#"run.tags["team", {"a": 1}] == "x""#),
        SyntaxErrorKind::InvalidSubscript
    );
}

#[test]
fn test_errors_display_message() {
    let err = parser().parse("job.name == 'x'").unwrap_err();
    assert!(err.to_string().contains("job"), "{}", err);
}

#[test]
fn test_deep_nesting_is_an_error() {
    let n = 10_000;
    let groups = format!("{}run.name == 'a'{}", "(".repeat(n), ")".repeat(n));
    let negations = format!("{}run.archived", "not ".repeat(n));
    let lists = format!("run.hash in {}{}", "[".repeat(n), "]".repeat(n));
    let regexes = format!(
        "{}run.name{}",
        "re.match('a', ".repeat(n),
        ")".repeat(n)
    );

    for query in [groups, negations, lists, regexes] {
        let err = parser().parse(&query).unwrap_err();
        assert_eq!(err.kind(), SyntaxErrorKind::Unsupported);
        assert!(err.message().contains("nested too deeply"), "{}", err);
    }
}

#[test]
fn test_moderate_nesting_compiles() {
    let query = format!("{}run.name == 'a'{}", "(".repeat(100), ")".repeat(100));
    let compiled = parser().parse(&query).unwrap();
    assert_eq!(compiled.params()[0], runfilter::Literal::from("a"));
}

#[test]
fn test_dotted_context_key_rejected_in_every_dialect() {
    for dialect in ["postgres", "sqlite"] {
        let parser = QueryParser::new(QueryParserConfig::default().with_dialect(dialect)).unwrap();
        for key in ["$.a.b", "a.b"] {
            let query = format!(r#"run.metrics["loss", {{"{}": "v"}}].last < 1"#, key);
            let err = parser.parse(&query).unwrap_err();
            assert_eq!(err.kind(), SyntaxErrorKind::InvalidSubscript, "{} {}", dialect, key);
        }
    }
}
