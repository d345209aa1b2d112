//! runfilter CLI - Compile filter queries to SQL fragments
//!
//! Usage:
//!   runfilter compile "<query>" [--dialect <dialect>] [--config <file.toml>] [--output json]
//!   runfilter parse "<query>"
//!
//! Examples:
//!   runfilter compile 'run.metrics["loss"].last < 0.5' --dialect sqlite
//!   runfilter compile 're.match("bert", run.name)' --config runfilter.toml --output json
//!   runfilter parse 'run.name.startswith("base") or not run.archived'

use ariadne::{Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use runfilter::filter;
use runfilter::{QueryParser, QueryParserConfig, SyntaxError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "runfilter")]
#[command(about = "Compile run search queries to parameterized SQL")]
#[command(version)]
struct Cli {
    /// Log compilation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a query to JOIN and WHERE fragments
    Compile {
        /// The filter query
        query: String,

        /// SQL dialect to generate (overrides the config file)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Path to a runfilter.toml (default search path if not specified)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip the configured default expression
        #[arg(long)]
        no_default: bool,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// Parse a query and print its syntax tree
    Parse {
        /// The filter query
        query: String,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Sqlite,
}

impl DialectArg {
    fn name(&self) -> &'static str {
        match self {
            DialectArg::Postgres => "postgres",
            DialectArg::Sqlite => "sqlite",
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output the SQL fragment and bound values
    Sql,
    /// Output joins, WHERE text and parameters as JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            query,
            dialect,
            config,
            no_default,
            output,
        } => cmd_compile(&query, dialect, config, no_default, output),
        Commands::Parse { query } => cmd_parse(&query),
    }
}

fn cmd_compile(
    query: &str,
    dialect: Option<DialectArg>,
    config: Option<PathBuf>,
    no_default: bool,
    output: OutputFormat,
) -> ExitCode {
    let settings = match config {
        Some(path) => QueryParserConfig::from_file(&path),
        None => QueryParserConfig::load(),
    };
    let mut settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dialect) = dialect {
        settings.dialect = dialect.name().to_string();
    }
    if no_default {
        settings.default_expression.expression.clear();
    }

    let parser = match QueryParser::new(settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let compiled = match parser.parse(query) {
        Ok(c) => c,
        Err(e) => {
            report_error(query, &e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Sql => {
            println!("{}", compiled.to_sql());
            for (i, value) in compiled.bound_values().iter().enumerate() {
                println!("-- ${} = {}", i + 1, value);
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&compiled.summary()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error encoding JSON: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

fn cmd_parse(query: &str) -> ExitCode {
    match filter::parse(query) {
        Ok(expr) => {
            println!("{:#?}", expr);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(query, &e);
            ExitCode::FAILURE
        }
    }
}

/// Print a syntax error, pointing into the query when the span is known.
fn report_error(query: &str, err: &SyntaxError) {
    let Some(span) = err.span() else {
        eprintln!("{}", err);
        return;
    };

    let report = Report::build(ReportKind::Error, span.clone())
        .with_message(err.kind().to_string())
        .with_label(Label::new(span.clone()).with_message(err.message()))
        .finish();
    if report.eprint(Source::from(query)).is_err() {
        eprintln!("{}", err);
    }
}
