use runfilter::compile::JoinKind;
use runfilter::{Literal, QueryParser, QueryParserConfig};

fn parser() -> QueryParser {
    QueryParser::new(QueryParserConfig::default()).unwrap()
}

fn aliases(query: &str) -> Vec<String> {
    parser()
        .parse(query)
        .unwrap()
        .joins()
        .iter()
        .map(|j| j.alias().to_string())
        .collect()
}

#[test]
fn test_no_default_no_parens() {
    let compiled = parser().parse(r#"run.name == "a""#).unwrap();
    assert_eq!(compiled.to_sql(), r#"WHERE "runs"."name" = $1"#);
}

#[test]
fn test_same_slice_shares_join() {
    let compiled = parser()
        .parse(r#"run.metrics["loss"].last < 1 and run.metrics["loss"].last_step > 100"#)
        .unwrap();
    assert_eq!(compiled.joins().len(), 1);
    assert_eq!(
        compiled.to_sql(),
        r#"LEFT JOIN latest_metrics metrics_0 ON runs.run_uuid = metrics_0.run_uuid AND metrics_0.key = $1 WHERE "metrics_0"."value" < $2 AND "metrics_0"."last_iter" > $3"#
    );
}

#[test]
fn test_aliases_follow_first_appearance() {
    assert_eq!(
        aliases(
            r#"run.tags["team"] == "nlp" or (run.metrics["acc"].last > 0.9 and run.metrics["loss", {"subset": "val"}].last < 1)"#
        ),
        vec!["tags_0", "metrics_1", "metrics_2", "contexts_3"]
    );
}

#[test]
fn test_distinct_contexts_get_distinct_joins() {
    let compiled = parser()
        .parse(
            r#"run.metrics["loss", {"subset": "train"}].last < 1 and run.metrics["loss", {"subset": "val"}].last < 2"#,
        )
        .unwrap();
    let kinds: Vec<JoinKind> = compiled.joins().iter().map(|j| j.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            JoinKind::Metric,
            JoinKind::Context,
            JoinKind::Metric,
            JoinKind::Context
        ]
    );
    insta::assert_snapshot!(compiled.where_text(), @r##""contexts_1"."json"#>>$1 = $2 AND "contexts_3"."json"#>>$3 = $4 AND ("metrics_0"."value" < $5 AND "metrics_2"."value" < $6)"##);
    assert_eq!(
        compiled.params(),
        &[
            Literal::from("{subset}"),
            Literal::from("train"),
            Literal::from("{subset}"),
            Literal::from("val"),
            Literal::Int(1),
            Literal::Int(2),
        ]
    );
}

#[test]
fn test_context_with_several_keys() {
    let compiled = parser()
        .parse(r#"run.metrics["loss", {"subset": "val", "fold": 3}].last < 1"#)
        .unwrap();
    assert_eq!(
        compiled.where_text(),
        r##""contexts_1"."json"#>>$1 = $2 AND "contexts_1"."json"#>>$3 = $4 AND "metrics_0"."value" < $5"##
    );
    assert_eq!(compiled.params()[3], Literal::Int(3));
}

#[test]
fn test_empty_context_map_means_no_context_join() {
    assert_eq!(
        aliases(r#"run.metrics["loss", {}].last < 1"#),
        vec!["metrics_0"]
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let query = r#"run.metrics["b", {"x": 1}].last < 1 or run.tags["t"] == "v" or run.metrics["a"].last > 0"#;
    let first = parser().parse(query).unwrap();
    for _ in 0..10 {
        let again = parser().parse(query).unwrap();
        assert_eq!(again.to_sql(), first.to_sql());
        assert_eq!(again.bound_values(), first.bound_values());
    }
}

#[test]
fn test_auxiliary_table_override() {
    let config = QueryParserConfig::default()
        .with_table("latest_metrics", "metric_heads")
        .with_table("runs", "run_table");
    let parser = QueryParser::new(config).unwrap();
    let compiled = parser.parse(r#"run.metrics["loss"].last < 1"#).unwrap();
    assert_eq!(
        compiled.to_sql(),
        r#"LEFT JOIN metric_heads metric_heads_0 ON run_table.run_uuid = metric_heads_0.run_uuid AND metric_heads_0.key = $1 WHERE "metric_heads_0"."value" < $2"#
    );
}

#[test]
fn test_summary_lists_joins() {
    let compiled = parser()
        .parse(r#"run.metrics["loss", {"subset": "val"}].last < 1"#)
        .unwrap();
    let summary = serde_json::to_value(compiled.summary()).unwrap();
    assert_eq!(summary["joins"][0]["kind"], "metric");
    assert_eq!(summary["joins"][1]["kind"], "context");
    assert_eq!(summary["joins"][1]["alias"], "contexts_1");
    assert_eq!(
        summary["joins"][1]["on_clause"],
        "metrics_0.context_id = contexts_1.id"
    );
    assert_eq!(summary["bound_values"][0], "loss");
}
