use runfilter::filter::{
    self, BoolOp, CompareOp, Expression, Literal, RegexMode, SubscriptKey,
};

fn parse(query: &str) -> Expression {
    filter::parse(query).unwrap_or_else(|e| panic!("{:?} failed: {}", query, e))
}

fn attribute(expr: &Expression) -> String {
    match expr {
        Expression::Attribute(path) => path.to_string(),
        other => panic!("expected attribute, got {:?}", other),
    }
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse("run.active or run.archived and run.active");
    let Expression::BooleanOp { op, operands } = expr else {
        panic!("expected a boolean op");
    };
    assert_eq!(op, BoolOp::Or);
    assert_eq!(operands.len(), 2);
    assert!(matches!(
        &operands[1],
        Expression::BooleanOp {
            op: BoolOp::And,
            ..
        }
    ));
}

#[test]
fn test_same_connective_collects_operands() {
    let Expression::BooleanOp { op, operands } =
        parse("run.active and run.archived and run.active")
    else {
        panic!("expected a boolean op");
    };
    assert_eq!(op, BoolOp::And);
    assert_eq!(operands.len(), 3);
}

#[test]
fn test_not_binds_looser_than_comparison() {
    let Expression::Negation(inner) = parse("not run.name == 'a'") else {
        panic!("expected negation");
    };
    assert!(matches!(
        *inner,
        Expression::Comparison {
            op: CompareOp::Eq,
            ..
        }
    ));
}

#[test]
fn test_not_folds_into_regex() {
    let expr = parse("not re.search('a.*', run.name)");
    let Expression::RegexMatch {
        negated,
        mode,
        pattern,
        target,
    } = expr
    else {
        panic!("expected regex match");
    };
    assert!(negated);
    assert_eq!(mode, RegexMode::Search);
    assert_eq!(pattern, "a.*");
    assert_eq!(attribute(&target), "run.name");

    // Double negation folds back
    assert!(matches!(
        parse("not not re.match('a', run.name)"),
        Expression::RegexMatch { negated: false, .. }
    ));
}

#[test]
fn test_membership() {
    let Expression::Membership {
        negated,
        needle,
        haystack,
    } = parse("'bert' not in run.name")
    else {
        panic!("expected membership");
    };
    assert!(negated);
    assert_eq!(*needle, Expression::Literal(Literal::from("bert")));
    assert_eq!(attribute(&haystack), "run.name");
}

#[test]
fn test_string_methods() {
    match parse("run.name.startswith('base')") {
        Expression::PrefixMatch { target, literal } => {
            assert_eq!(attribute(&target), "run.name");
            assert_eq!(literal, Literal::from("base"));
        }
        other => panic!("expected prefix match, got {:?}", other),
    }
    assert!(matches!(
        parse("run.name.endswith('v2')"),
        Expression::SuffixMatch { .. }
    ));
}

#[test]
fn test_subscript_forms() {
    let Expression::Comparison { left, .. } = parse(r#"run.metrics["loss"].last < 1"#) else {
        panic!("expected comparison");
    };
    let Expression::Subscript(access) = *left else {
        panic!("expected subscript");
    };
    assert_eq!(access.base.to_string(), "run.metrics");
    assert_eq!(access.key, SubscriptKey::Name("loss".into()));
    assert_eq!(access.field.as_deref(), Some("last"));

    for query in [
        r#"run.metrics["loss", {"subset": "val"}].last < 1"#,
        r#"run.metrics[("loss", {"subset": "val"})].last < 1"#,
    ] {
        let Expression::Comparison { left, .. } = parse(query) else {
            panic!("expected comparison");
        };
        let Expression::Subscript(access) = *left else {
            panic!("expected subscript");
        };
        assert_eq!(
            access.key,
            SubscriptKey::NameWithContext(
                "loss".into(),
                vec![("subset".into(), Literal::from("val"))]
            )
        );
    }
}

#[test]
fn test_literals() {
    let right = |query: &str| match parse(query) {
        Expression::Comparison { right, .. } => *right,
        other => panic!("expected comparison, got {:?}", other),
    };

    assert_eq!(right("run.name == -3"), Expression::Literal(Literal::Int(-3)));
    assert_eq!(
        right("run.name == 2.5e-3"),
        Expression::Literal(Literal::Float(0.0025))
    );
    assert_eq!(
        right("run.name == True"),
        Expression::Literal(Literal::Bool(true))
    );
    assert_eq!(
        right(r#"run.name == "a\"b""#),
        Expression::Literal(Literal::from("a\"b"))
    );
    assert_eq!(
        right(r#"run.name == [1, "x", [False]]"#),
        Expression::Literal(Literal::List(vec![
            Literal::Int(1),
            Literal::from("x"),
            Literal::List(vec![Literal::Bool(false)]),
        ]))
    );
    assert_eq!(
        right(r#"run.name == {"b": 1, "a": {"c": 2.0}}"#),
        Expression::Literal(Literal::Map(vec![
            ("b".into(), Literal::Int(1)),
            (
                "a".into(),
                Literal::Map(vec![("c".into(), Literal::Float(2.0))])
            ),
        ]))
    );
}

#[test]
fn test_spans_cover_attribute() {
    let Expression::Comparison { left, .. } = parse("  run.name == 'x'") else {
        panic!("expected comparison");
    };
    let Expression::Attribute(path) = *left else {
        panic!("expected attribute");
    };
    assert_eq!(path.span, 2..10);
}

#[test]
fn test_literal_display() {
    let lit = Literal::Map(vec![
        ("k".into(), Literal::List(vec![Literal::Float(1.5), Literal::Bool(true)])),
    ]);
    insta::assert_snapshot!(lit.to_string(), @r#"{"k": [1.5, True]}"#);
}
