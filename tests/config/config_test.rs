use std::fs;

use runfilter::{ConfigError, Dialect, QueryParser, QueryParserConfig};

const CONFIG: &str = r#"
dialect = "sqlite"

[default_expression]
contains = "run.archived"
expression = "not run.archived"

[tables]
runs = "runs"
experiments = "Experiment"
metrics = "metrics"
"#;

#[test]
fn test_parse_full_config() {
    let config = QueryParserConfig::from_toml_str(CONFIG).unwrap();
    assert_eq!(config.dialect, "sqlite");
    assert_eq!(config.default_expression.contains, "run.archived");
    assert_eq!(config.tables["experiments"], "Experiment");

    let parser = QueryParser::new(config).unwrap();
    assert_eq!(parser.dialect(), Dialect::Sqlite);
    assert_eq!(
        parser.parse("").unwrap().where_text(),
        r#""runs"."lifecycle_stage" <> $1"#
    );
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = QueryParserConfig::from_toml_str(r#"dialect = "sqlite3""#).unwrap();
    assert!(config.default_expression.expression.is_empty());
    assert_eq!(config.tables["runs"], "runs");

    let parser = QueryParser::new(config).unwrap();
    assert_eq!(parser.dialect(), Dialect::Sqlite);
    assert!(parser.parse("").unwrap().is_empty());
}

#[test]
fn test_from_file() {
    let path = std::env::temp_dir().join(format!("runfilter-config-{}.toml", std::process::id()));
    fs::write(&path, CONFIG).unwrap();
    let config = QueryParserConfig::from_file(&path);
    fs::remove_file(&path).unwrap();
    assert_eq!(config.unwrap().dialect, "sqlite");
}

#[test]
fn test_missing_file() {
    let result = QueryParserConfig::from_file("/nonexistent/runfilter.toml");
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn test_malformed_toml() {
    let result = QueryParserConfig::from_toml_str("dialect = ");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_env_var_expansion_in_tables() {
    std::env::set_var("RUNFILTER_TEST_METRICS_TABLE", "metric_heads");
    let config = QueryParserConfig::from_toml_str(
        r#"
[tables]
runs = "runs"
latest_metrics = "${RUNFILTER_TEST_METRICS_TABLE}"
"#,
    )
    .unwrap();
    assert_eq!(config.tables["latest_metrics"], "metric_heads");

    let result = QueryParserConfig::from_toml_str(
        r#"
[tables]
runs = "$RUNFILTER_TEST_UNSET_VARIABLE"
"#,
    );
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "RUNFILTER_TEST_UNSET_VARIABLE"));
}

#[test]
fn test_unknown_dialect() {
    let result = QueryParser::new(QueryParserConfig::default().with_dialect("mysql"));
    match result {
        Err(err @ ConfigError::UnknownDialect(_)) => {
            assert_eq!(err.to_string(), "Unknown dialect: mysql")
        }
        other => panic!("expected UnknownDialect, got {:?}", other.map(|p| p.dialect())),
    }
}

#[test]
fn test_dialect_names_are_case_insensitive() {
    for name in ["Postgres", "POSTGRESQL", "postgres"] {
        let parser = QueryParser::new(QueryParserConfig::default().with_dialect(name)).unwrap();
        assert_eq!(parser.dialect(), Dialect::Postgres);
    }
}

#[test]
fn test_table_names_must_be_identifiers() {
    let result = QueryParser::new(
        QueryParserConfig::default().with_table("runs", "runs r JOIN secrets"),
    );
    assert!(matches!(
        result,
        Err(ConfigError::InvalidTableName { entity, .. }) if entity == "runs"
    ));
}

#[test]
fn test_default_expression_must_parse() {
    let result = QueryParser::new(
        QueryParserConfig::default().with_default_expression("run.archived", "not run.archived ==="),
    );
    assert!(matches!(result, Err(ConfigError::InvalidDefaultExpression(_))));
}
