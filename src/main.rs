//! `spf-inspect` command-line front end.
//!
//! Thin wrapper around the library: argument parsing, logger setup and
//! rendering of the report. All SPF logic lives in the library crate.

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spf_inspect::spf::{CheckerConfig, EdgeKind, SpfChecker, SpfReport};
use spf_inspect::{DnsResolver, DohResolver, HickoryResolver};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    /// DNS-over-HTTPS JSON API
    Doh,
    /// The operating system's resolver configuration
    System,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

/// Inspect a domain's SPF record and its DNS-lookup cost.
#[derive(Debug, Parser)]
#[command(name = "spf-inspect", version, about)]
struct Cli {
    /// Domain to check, e.g. example.com
    domain: String,

    /// DNS-over-HTTPS endpoint
    #[arg(long, env = "SPF_INSPECT_RESOLVER_URL", default_value = DohResolver::DEFAULT_ENDPOINT)]
    resolver_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "SPF_INSPECT_TIMEOUT_SECS", default_value_t = 5)]
    timeout_secs: u64,

    /// Lookup count above which the record is reported as over budget
    #[arg(long, env = "SPF_INSPECT_LOOKUP_LIMIT", default_value_t = spf_inspect::spf::RFC_LOOKUP_LIMIT)]
    lookup_limit: usize,

    /// Resolver backend
    #[arg(long, env = "SPF_INSPECT_BACKEND", value_enum, default_value_t = Backend::Doh)]
    backend: Backend,

    /// Also show the SPF record of these domains
    #[arg(long = "drill", value_name = "DOMAIN", env = "SPF_INSPECT_DRILL", value_delimiter = ',')]
    drill: Vec<String>,

    /// Print the report as JSON
    #[arg(long, env = "SPF_INSPECT_JSON")]
    json: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "SPF_INSPECT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, env = "SPF_INSPECT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,
}

impl Cli {
    fn checker_config(&self) -> CheckerConfig {
        CheckerConfig {
            resolver_url: self.resolver_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            lookup_limit: self.lookup_limit,
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    report: &'a SpfReport,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    drill: BTreeMap<String, String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format).context("failed to initialize logging")?;

    let config = cli.checker_config();
    match cli.backend {
        Backend::Doh => {
            let checker = SpfChecker::from_config(&config).context("failed to build DoH client")?;
            run(&cli, checker).await
        }
        Backend::System => {
            let checker = SpfChecker::new(HickoryResolver::new()).lookup_limit(config.lookup_limit);
            run(&cli, checker).await
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Plain => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}

async fn run<R: DnsResolver>(cli: &Cli, checker: SpfChecker<R>) -> Result<ExitCode> {
    let report = match checker.check(&cli.domain).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("  {}", e.detail());
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut drill = BTreeMap::new();
    for domain in &cli.drill {
        drill.insert(domain.clone(), checker.fetch_first_or_message(domain).await);
    }

    if cli.json {
        let out = JsonOutput {
            report: &report,
            drill,
        };
        println!("{}", serde_json::to_string_pretty(&out).context("failed to encode report")?);
    } else {
        print!("{}", render(&report));
        for (domain, record) in &drill {
            println!("\n{domain}\n  {record}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn render(report: &SpfReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("SPF record for {}\n  {}\n", report.domain, report.record));
    if report.multiple_records {
        out.push_str(&format!(
            "  warning: {} SPF records published; receivers treat this as a permanent error\n",
            report.records.len()
        ));
    }

    out.push_str("\nMechanisms\n");
    let width = report
        .mechanisms
        .iter()
        .map(|m| m.text.len())
        .max()
        .unwrap_or(0);
    for span in &report.mechanisms {
        let marker = if span.is_known() { ' ' } else { '?' };
        out.push_str(&format!("{marker} {:<width$}  {}\n", span.text, span.explanation));
    }

    if !report.edges.is_empty() {
        out.push_str("\nReferences\n");
        for edge in &report.edges {
            let kind = match edge.kind {
                EdgeKind::Include => "include ",
                EdgeKind::Redirect => "redirect",
            };
            out.push_str(&format!("  {kind}  {}\n", edge.domain));
        }
    }
    for unresolved in &report.unresolved_includes {
        out.push_str(&format!(
            "  not counted: {} ({})\n",
            unresolved.domain, unresolved.reason
        ));
    }

    out.push_str(&format!(
        "\nDNS lookups: {} of {}{}\n",
        report.lookup_count,
        report.lookup_limit,
        if report.exceeds_limit() {
            " (over the limit; receivers may return permerror)"
        } else {
            ""
        }
    ));
    if report.depth_limited {
        out.push_str("  includes nested deeper than 10 levels were not counted\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use spf_inspect::MockResolver;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["spf-inspect", "example.com"]);
        assert_eq!(cli.domain, "example.com");
        assert_eq!(cli.lookup_limit, 10);
        assert!(matches!(cli.backend, Backend::Doh));
        assert!(cli.drill.is_empty());
        assert_eq!(cli.checker_config().timeout, Duration::from_secs(5));
    }

    #[test]
    fn cli_repeated_drill() {
        let cli = Cli::parse_from([
            "spf-inspect",
            "example.com",
            "--drill",
            "a.example.com",
            "--drill",
            "b.example.com",
            "--lookup-limit",
            "8",
        ]);
        assert_eq!(cli.drill, vec!["a.example.com", "b.example.com"]);
        assert_eq!(cli.checker_config().lookup_limit, 8);
    }

    #[test]
    fn cli_drill_accepts_comma_list() {
        let cli = Cli::parse_from(["spf-inspect", "example.com", "--drill", "a.example.com,b.example.com"]);
        assert_eq!(cli.drill, vec!["a.example.com", "b.example.com"]);
    }

    #[tokio::test]
    async fn render_lists_mechanisms_and_budget() {
        let resolver = MockResolver::new();
        resolver.add_spf(
            "example.com",
            "v=spf1 include:_spf.example.net foo=bar redirect=r.example.net -all",
        );
        let report = SpfChecker::new(resolver).check("example.com").await.unwrap();

        let text = render(&report);
        assert!(text.contains("SPF record for example.com"));
        assert!(text.contains("include   _spf.example.net"));
        assert!(text.contains("redirect  r.example.net"));
        assert!(text.contains("not counted: _spf.example.net (no SPF record)"));
        assert!(text.contains("DNS lookups: 2 of 10\n"));
        assert!(text.contains("? foo=bar"));
        assert!(text.contains("  -all"));
        assert!(!text.contains("? -all"));
    }
}
