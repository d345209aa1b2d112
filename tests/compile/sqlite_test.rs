use runfilter::query::LIFECYCLE_STAGE_DELETED;
use runfilter::{Dialect, Literal, QueryParser, QueryParserConfig};

fn parser() -> QueryParser {
    let config = QueryParserConfig::default()
        .with_dialect("sqlite")
        .with_default_expression("run.archived", "not run.archived")
        .with_table("experiments", "Experiment");
    QueryParser::new(config).unwrap()
}

fn compile(query: &str) -> (String, Vec<Literal>) {
    let compiled = parser().parse(query).unwrap();
    (compiled.to_sql(), compiled.bound_values())
}

fn s(value: &str) -> Literal {
    Literal::from(value)
}

fn deleted() -> Literal {
    Literal::from(LIFECYCLE_STAGE_DELETED)
}

#[test]
fn test_dialect_selected() {
    assert_eq!(parser().dialect(), Dialect::Sqlite);
    assert_eq!(parser().parse("").unwrap().dialect(), Dialect::Sqlite);
}

#[test]
fn test_like_matches_postgres_shape() {
    let (sql, vars) = compile("('run' in run.name)");
    assert_eq!(
        sql,
        r#"WHERE "runs"."name" LIKE $1 AND "runs"."lifecycle_stage" <> $2"#
    );
    assert_eq!(vars, vec![s("%run%"), deleted()]);

    let (sql, _) = compile("('run' not in run.name)");
    assert_eq!(
        sql,
        r#"WHERE "runs"."name" NOT LIKE $1 AND "runs"."lifecycle_stage" <> $2"#
    );
}

#[test]
fn test_regex_uses_ifnull_regexp() {
    let (sql, vars) = compile("(re.match('run', run.name))");
    assert_eq!(
        sql,
        r#"WHERE IFNULL("runs"."name", '') REGEXP $1 AND "runs"."lifecycle_stage" <> $2"#
    );
    assert_eq!(vars, vec![s("^run"), deleted()]);

    let (sql, vars) = compile("(re.search('run', run.name))");
    assert_eq!(
        sql,
        r#"WHERE IFNULL("runs"."name", '') REGEXP $1 AND "runs"."lifecycle_stage" <> $2"#
    );
    assert_eq!(vars, vec![s("run"), deleted()]);
}

#[test]
fn test_negated_regex() {
    for (query, pattern) in [
        ("not (re.match('run', run.name))", "^run"),
        ("not (re.search('run', run.name))", "run"),
    ] {
        let (sql, vars) = compile(query);
        assert_eq!(
            sql,
            r#"WHERE IFNULL("runs"."name", '') NOT REGEXP $1 AND "runs"."lifecycle_stage" <> $2"#
        );
        assert_eq!(vars, vec![s(pattern), deleted()]);
    }
}

#[test]
fn test_metric_key_slice() {
    let (sql, vars) = compile(r#"run.metrics["key1"].last < -1"#);
    insta::assert_snapshot!(sql, @r#"LEFT JOIN latest_metrics metrics_0 ON runs.run_uuid = metrics_0.run_uuid AND metrics_0.key = $1 WHERE "metrics_0"."value" < $2 AND "runs"."lifecycle_stage" <> $3"#);
    assert_eq!(vars, vec![s("key1"), Literal::Int(-1), deleted()]);
}

#[test]
fn test_metric_context_key() {
    let (sql, vars) = compile("metric.context.key1 == 'value1'");
    assert_eq!(
        sql,
        r#"WHERE IFNULL("contexts"."json", JSON('{}'))->>$1 = $2 AND "runs"."lifecycle_stage" <> $3"#
    );
    assert_eq!(vars, vec![s("$.key1"), s("value1"), deleted()]);

    let (sql, _) = compile("metric.context.key1 != 'value1'");
    assert_eq!(
        sql,
        r#"WHERE IFNULL("contexts"."json", JSON('{}'))->>$1 <> $2 AND "runs"."lifecycle_stage" <> $3"#
    );
}

#[test]
fn test_metric_context_slice_tuple() {
    for query in [
        r#"run.metrics["my_metric", {"key1": "value1"}].last < -1"#,
        r#"run.metrics["my_metric", {"$.key1": "value1"}].last < -1"#,
    ] {
        let (sql, vars) = compile(query);
        assert_eq!(
            sql,
            r#"LEFT JOIN latest_metrics metrics_0 ON runs.run_uuid = metrics_0.run_uuid AND metrics_0.key = $1 LEFT JOIN contexts contexts_1 ON metrics_0.context_id = contexts_1.id WHERE IFNULL("contexts_1"."json", JSON('{}'))->>$2 = $3 AND ("metrics_0"."value" < $4 AND "runs"."lifecycle_stage" <> $5)"#,
            "query: {}",
            query
        );
        assert_eq!(
            vars,
            vec![
                s("my_metric"),
                s("$.key1"),
                s("value1"),
                Literal::Int(-1),
                deleted()
            ]
        );
    }
}

#[test]
fn test_metric_compound() {
    let (sql, vars) =
        compile(r#"run.metrics["my_metric"].last < -1 and metric.context.key1 == "value1""#);
    insta::assert_snapshot!(sql, @r#"LEFT JOIN latest_metrics metrics_0 ON runs.run_uuid = metrics_0.run_uuid AND metrics_0.key = $1 WHERE ("metrics_0"."value" < $2 AND IFNULL("contexts"."json", JSON('{}'))->>$3 = $4) AND "runs"."lifecycle_stage" <> $5"#);
    assert_eq!(
        vars,
        vec![
            s("my_metric"),
            Literal::Int(-1),
            s("$.key1"),
            s("value1"),
            deleted()
        ]
    );
}

#[test]
fn test_context_collections_are_inlined_compact() {
    let (sql, vars) = compile("metric.context.key1 == [1,2,3]");
    assert_eq!(
        sql,
        r#"WHERE IFNULL("contexts"."json", JSON('{}'))->>$1 = '[1,2,3]' AND "runs"."lifecycle_stage" <> $2"#
    );
    assert_eq!(vars, vec![s("$.key1"), deleted()]);

    let (sql, _) = compile(r#"metric.context.key1 == {"subkey": "val"}"#);
    assert_eq!(
        sql,
        r#"WHERE IFNULL("contexts"."json", JSON('{}'))->>$1 = '{"subkey":"val"}' AND "runs"."lifecycle_stage" <> $2"#
    );

    let (sql, _) = compile(r#"metric.context.key1 == {"subkey": "val", "subkey2": "val"}"#);
    assert_eq!(
        sql,
        r#"WHERE IFNULL("contexts"."json", JSON('{}'))->>$1 = '{"subkey":"val","subkey2":"val"}' AND "runs"."lifecycle_stage" <> $2"#
    );
}

#[test]
fn test_context_string_matches() {
    let cases = [
        (r#""val1" in metric.context.key1"#, "LIKE", "%val1%"),
        (r#""val1" not in metric.context.key1"#, "NOT LIKE", "%val1%"),
        (r#"metric.context.key1.startswith("va")"#, "LIKE", "va%"),
        (r#"metric.context.key1.endswith("va")"#, "LIKE", "%va"),
    ];
    for (query, op, pattern) in cases {
        let (sql, vars) = compile(query);
        assert_eq!(
            sql,
            format!(
                r#"WHERE IFNULL("contexts"."json", JSON('{{}}'))->>$1 {} $2 AND "runs"."lifecycle_stage" <> $3"#,
                op
            ),
            "query: {}",
            query
        );
        assert_eq!(vars, vec![s("$.key1"), s(pattern), deleted()]);
    }
}

#[test]
fn test_inline_string_is_quoted_for_sqlite() {
    let (sql, _) = compile(r#"metric.context.key1 == ["it's"]"#);
    assert_eq!(
        sql,
        r#"WHERE IFNULL("contexts"."json", JSON('{}'))->>$1 = '["it''s"]' AND "runs"."lifecycle_stage" <> $2"#
    );
}
