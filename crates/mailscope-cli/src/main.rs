//! Mailscope CLI
//!
//! The `mailscope` command runs domain and email reconnaissance.
//!
//! ## Commands
//!
//! - `analyze`: MX, technology-stack and account probes merged into one report
//! - `patterns`: candidate email addresses for a name pair

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, Level};

use mailscope_core::{patterns, AnalysisRequest, Orchestrator};

mod render;
mod settings;
mod validate;

use settings::ProbeSettings;

const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

#[derive(Parser)]
#[command(name = "mailscope")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Domain and email reconnaissance for security awareness work", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a domain and, optionally, a person at that domain
    Analyze {
        /// Target domain (taken from --email when omitted)
        #[arg(short, long)]
        domain: Option<String>,

        /// Target email address
        #[arg(short, long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Per-probe timeout in seconds
        #[arg(short, long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
        timeout: u64,

        /// Report format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,

        #[command(flatten)]
        settings: ProbeSettings,
    },

    /// Print candidate email addresses for a name
    Patterns {
        /// At least one of --first-name and --last-name is required
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(short, long)]
        domain: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is normal.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    mailscope_core::init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Analyze {
            domain,
            email,
            first_name,
            last_name,
            timeout,
            output,
            settings,
        } => {
            let request = build_request(domain, email, first_name, last_name, timeout)?;
            cmd_analyze(request, output, &settings).await
        }
        Commands::Patterns {
            first_name,
            last_name,
            domain,
            json,
        } => cmd_patterns(
            first_name.as_deref(),
            last_name.as_deref(),
            domain.as_deref(),
            json,
        ),
    }
}

/// Validate raw arguments and assemble the request.
fn build_request(
    domain: Option<String>,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    timeout: u64,
) -> Result<AnalysisRequest> {
    let domain = domain.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
    let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());

    if domain.is_none() && email.is_none() {
        bail!("provide --domain or --email");
    }
    if let Some(domain) = domain.as_deref() {
        if !validate::is_valid_domain(domain) {
            bail!("invalid domain format: {domain}");
        }
    }
    if let Some(email) = email.as_deref() {
        if !validate::is_valid_email(email) {
            bail!("invalid email format: {email}");
        }
    }
    if timeout == 0 {
        bail!("--timeout must be at least 1 second");
    }

    let mut request = AnalysisRequest::empty()
        .with_names(first_name, last_name)
        .with_timeout_seconds(timeout);
    if let Some(domain) = domain {
        request = request.with_domain(domain);
    }
    if let Some(email) = email {
        request = request.with_email(email);
    }
    Ok(request)
}

async fn cmd_analyze(
    request: AnalysisRequest,
    output: OutputFormat,
    settings: &ProbeSettings,
) -> Result<()> {
    let config = settings.recon_config();
    debug!(
        max_workers = config.max_workers,
        pattern_check_cap = config.pattern_check_cap,
        techstack = config.techstack_key().is_some(),
        mailbox_probe = config.mailbox_probe.active_sender().is_some(),
        send = config.transport.is_some(),
        "resolved configuration"
    );

    let probes = mailscope_probes::default_probe_set(&settings.probe_options())
        .context("Failed to initialise probes")?;
    let orchestrator = Orchestrator::new(config, probes);

    let report = orchestrator
        .analyze(request)
        .await
        .context("Analysis could not start")?;
    info!(
        domain = %report.resolved_domain,
        errors = report.meta.errors.len(),
        "analysis complete"
    );

    let rendered = match output {
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            json.push('\n');
            json
        }
        OutputFormat::Text => render::report_text(&report),
    };
    write_stdout(&rendered)
}

fn cmd_patterns(
    first_name: Option<&str>,
    last_name: Option<&str>,
    domain: Option<&str>,
    json: bool,
) -> Result<()> {
    let first_name = first_name.map(str::trim).unwrap_or_default();
    let last_name = last_name.map(str::trim).unwrap_or_default();
    if first_name.is_empty() && last_name.is_empty() {
        bail!("provide --first-name or --last-name");
    }

    let domain = domain.map(str::trim).filter(|d| !d.is_empty());
    if let Some(domain) = domain {
        if !validate::is_valid_domain(domain) {
            bail!("invalid domain format: {domain}");
        }
    }

    let generated = patterns::generate(first_name, last_name, domain);
    let rendered = if json {
        let mut out =
            serde_json::to_string_pretty(&generated).context("Failed to serialize patterns")?;
        out.push('\n');
        out
    } else {
        render::patterns_text(&generated)
    };
    write_stdout(&rendered)
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write to stdout")
}
