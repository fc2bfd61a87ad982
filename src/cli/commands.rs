//! CLI command definitions for webgauge.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use clap::Parser;
use tracing::info;

use crate::api::{ApiServer, AppState, ServerConfig};
use crate::capability::{AutomationConfig, RemoteCapability};
use crate::eval::{compare_data_uris, EvalSpec};
use crate::metrics::init_metrics;
use crate::runner::{
    AgentDirectedRun, FindFlightRun, RunConfig, RunStrategy, TaskRequest, TaskRunner,
};
use crate::session::{BrowserSettings, SessionClient};

/// Browser automation task runner and evaluator.
#[derive(Parser)]
#[command(name = "webgauge")]
#[command(about = "Run, capture and score AI-agent web automation tasks")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve(ServeArgs),

    /// Run an agent-directed task and print the result as JSON.
    Run(RunArgs),

    /// Run the scripted flight-lookup workflow.
    Flight(FlightArgs),

    /// Compare two screenshot files.
    Compare(CompareArgs),
}

/// Arguments for `webgauge serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1", env = "WEBGAUGE_HOST")]
    pub host: String,

    /// Port to bind.
    #[arg(long, default_value = "8080", env = "WEBGAUGE_PORT")]
    pub port: u16,
}

/// Arguments for `webgauge run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Page the run starts on.
    #[arg(long)]
    pub url: String,

    /// Natural-language instruction for the agent.
    #[arg(long)]
    pub instruction: String,

    /// Path to a JSON file with the evaluation spec
    /// (field name to {type, expectedValue, operator}).
    #[arg(long)]
    pub eval_spec: Option<PathBuf>,

    /// Model to drive the browser with.
    #[arg(long, env = "AUTOMATION_MODEL")]
    pub model: Option<String>,

    /// Per-step timeout in seconds.
    #[arg(long, default_value = "300")]
    pub step_timeout: u64,

    /// Route through the provider's proxy pool.
    #[arg(long)]
    pub proxies: bool,

    /// Enable the provider's advanced stealth mode.
    #[arg(long)]
    pub advanced_stealth: bool,
}

/// Arguments for `webgauge flight`.
#[derive(Parser, Debug)]
pub struct FlightArgs {
    /// Airline lookup page.
    #[arg(long)]
    pub url: String,

    /// Booking confirmation number.
    #[arg(long)]
    pub confirmation_number: String,

    /// Passenger last name.
    #[arg(long)]
    pub last_name: String,

    /// Per-step timeout in seconds.
    #[arg(long, default_value = "300")]
    pub step_timeout: u64,
}

/// Arguments for `webgauge compare`.
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// Baseline screenshot file.
    pub baseline: PathBuf,

    /// Candidate screenshot file.
    pub candidate: PathBuf,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the CLI with already-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Run(args) => run_agent_task(args).await,
        Commands::Flight(args) => run_flight_task(args).await,
        Commands::Compare(args) => compare_files(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    init_metrics()?;

    let provider = SessionClient::from_env()?;
    let automation = AutomationConfig::from_env()?;
    let state = Arc::new(AppState::new(provider, automation, RunConfig::new()));

    let server = ApiServer::new(ServerConfig::new(args.host, args.port), state);
    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {}", e))
}

async fn run_agent_task(args: RunArgs) -> anyhow::Result<()> {
    let eval_spec = load_eval_spec(args.eval_spec.as_deref())?;
    let task = TaskRequest::new(&args.url, &args.instruction)
        .with_eval_spec(eval_spec)
        .validate()?;

    let strategy = AgentDirectedRun::new(&args.instruction);
    execute(
        &task,
        &strategy,
        args.model,
        args.step_timeout,
        BrowserSettings {
            proxies: args.proxies,
            advanced_stealth: args.advanced_stealth,
            ..Default::default()
        },
    )
    .await
}

async fn run_flight_task(args: FlightArgs) -> anyhow::Result<()> {
    let task = TaskRequest::new(&args.url, "").validate_scripted()?;
    let strategy = FindFlightRun::new(&args.confirmation_number, &args.last_name);
    execute(
        &task,
        &strategy,
        None,
        args.step_timeout,
        BrowserSettings::default(),
    )
    .await
}

async fn execute(
    task: &crate::runner::TaskSpec,
    strategy: &dyn RunStrategy,
    model: Option<String>,
    step_timeout: u64,
    settings: BrowserSettings,
) -> anyhow::Result<()> {
    let mut automation = AutomationConfig::from_env()?;
    if let Some(model) = model {
        automation.model = model;
    }

    let capability = RemoteCapability::start(&automation, &settings).await?;
    info!(session_id = capability.session_id(), "Session started");

    let runner = TaskRunner::new(
        RunConfig::new().with_step_timeout(Duration::from_secs(step_timeout)),
    );
    let result = runner.run(task, strategy, Box::new(capability)).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_eval_spec(path: Option<&std::path::Path>) -> anyhow::Result<EvalSpec> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        None => Ok(EvalSpec::new()),
    }
}

fn compare_files(args: CompareArgs) -> anyhow::Result<()> {
    let baseline = read_as_data_uri(&args.baseline)?;
    let candidate = read_as_data_uri(&args.candidate)?;

    let outcome = compare_data_uris(&baseline, &candidate);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn read_as_data_uri(path: &std::path::Path) -> anyhow::Result<String> {
    let bytes = fs::read(path)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:image/png;base64,{}", encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from(["webgauge", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, 9000),
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_cli_parses_run_with_eval_spec() {
        let cli = Cli::try_parse_from([
            "webgauge",
            "run",
            "--url",
            "https://example.com",
            "--instruction",
            "buy the mug",
            "--eval-spec",
            "spec.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.url, "https://example.com");
                assert_eq!(args.eval_spec, Some(PathBuf::from("spec.json")));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_load_eval_spec_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"title":{{"type":"string","expectedValue":"welcome"}}}}"#
        )
        .unwrap();

        let spec = load_eval_spec(Some(file.path())).unwrap();
        assert_eq!(spec.len(), 1);
        assert!(spec.contains_key("title"));
    }

    #[test]
    fn test_load_eval_spec_default_empty() {
        let spec = load_eval_spec(None).unwrap();
        assert!(spec.is_empty());
    }
}
