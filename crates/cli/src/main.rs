//! Scriptguard CLI - evaluate one guard command on this node
//!
//! Exit status: 0 = action runs, 1 = action skipped, 2 = guard could not be evaluated.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scriptguard_core::application::{Guard, GuardKind, GuardRuntime, GuardStrategyResolver};
use scriptguard_core::domain::{
    parse_env_entry, Architecture, ExecutionOptions, GuardStrategyId, HasArchitecture, Node,
    ParentResource,
};
use scriptguard_core::port::time_provider::SystemTimeProvider;
use scriptguard_core::port::NodeProbe;
use scriptguard_infra_system::{default_registry, SubprocessRunner, SysinfoNodeProbe};

const DEFAULT_RESOURCE_NAME: &str = "cli";
const EXIT_RUN: i32 = 0;
const EXIT_SKIP: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[cfg(windows)]
const DEFAULT_INTERPRETER: &str = "powershell_script";
#[cfg(not(windows))]
const DEFAULT_INTERPRETER: &str = "script";

#[derive(Clone, Copy, ValueEnum)]
enum ArchArg {
    #[value(name = "i386")]
    I386,
    #[value(name = "x86_64")]
    X86_64,
}

impl From<ArchArg> for Architecture {
    fn from(arg: ArchArg) -> Self {
        match arg {
            ArchArg::I386 => Architecture::I386,
            ArchArg::X86_64 => Architecture::X86_64,
        }
    }
}

#[derive(Parser)]
#[command(name = "scriptguard")]
#[command(about = "Evaluate a guard command and report whether the guarded action runs", long_about = None)]
#[command(version)]
struct Cli {
    /// Guard command text
    command: String,

    /// Interpreter identifier (script, bash, powershell_script, batch)
    #[arg(short, long, env = "SCRIPTGUARD_INTERPRETER", default_value = DEFAULT_INTERPRETER)]
    interpreter: String,

    /// Node descriptor JSON file (default: probe the local machine)
    #[arg(long, env = "SCRIPTGUARD_NODE")]
    node: Option<String>,

    /// Name of the resource the guard belongs to
    #[arg(long, default_value = DEFAULT_RESOURCE_NAME)]
    resource: String,

    /// Word size to evaluate the guard under
    #[arg(long, value_enum)]
    architecture: Option<ArchArg>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    group: Option<String>,

    /// Working directory of the guard command
    #[arg(long)]
    cwd: Option<String>,

    /// Extra environment variable (KEY=VALUE), repeatable
    #[arg(short, long = "env")]
    env: Vec<String>,

    /// Timeout in seconds
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Treat the command as not_if instead of only_if
    #[arg(long)]
    not_if: bool,

    /// Only pass these inherited variables to the guard (comma separated)
    #[arg(long, env = "SCRIPTGUARD_ENV_ALLOWLIST", value_delimiter = ',')]
    env_allowlist: Option<Vec<String>>,

    /// Print the decision as JSON
    #[arg(long)]
    json: bool,
}

/// The resource a command-line guard is attached to
struct CliResource {
    name: String,
    node: Node,
    architecture: Option<Architecture>,
}

impl HasArchitecture for CliResource {
    fn architecture(&self) -> Option<Architecture> {
        self.architecture
    }
}

impl ParentResource for CliResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn node(&self) -> &Node {
        &self.node
    }

    fn as_has_architecture(&self) -> Option<&dyn HasArchitecture> {
        Some(self)
    }
}

#[derive(Serialize)]
struct Decision<'a> {
    resource: &'a str,
    interpreter: &'a str,
    unit: String,
    kind: &'static str,
    condition: bool,
    skip: bool,
}

fn init_logging() -> Result<()> {
    // Logs go to stderr; stdout is reserved for --json output
    let log_format =
        std::env::var("SCRIPTGUARD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("scriptguard=info"))
        .context("Failed to create env filter")?;

    match log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

fn load_node(path: Option<&str>) -> Result<Node> {
    match path {
        Some(path) => {
            let path = shellexpand::tilde(path).into_owned();
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read node descriptor {}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid node descriptor {}", path))
        }
        None => Ok(SysinfoNodeProbe::new().describe()),
    }
}

fn build_options(cli: &Cli) -> Result<ExecutionOptions> {
    let mut options = ExecutionOptions::new();
    if let Some(user) = &cli.user {
        options = options.with_user(user.clone());
    }
    if let Some(group) = &cli.group {
        options = options.with_group(group.clone());
    }
    if let Some(cwd) = &cli.cwd {
        options = options.with_cwd(shellexpand::tilde(cwd).into_owned());
    }
    if !cli.env.is_empty() {
        let environment = cli
            .env
            .iter()
            .map(|entry| parse_env_entry(entry))
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        options = options.with_environment(environment);
    }
    if let Some(secs) = cli.timeout_secs {
        let timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid timeout {}", secs))?;
        options = options.with_timeout(timeout);
    }
    Ok(options)
}

async fn evaluate(cli: Cli) -> Result<bool> {
    let resource = CliResource {
        name: cli.resource.clone(),
        node: load_node(cli.node.as_deref())?,
        architecture: cli.architecture.map(Architecture::from),
    };
    let options = build_options(&cli)?;

    // DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let mut runner = SubprocessRunner::new(time_provider.clone());
    if let Some(allowlist) = cli.env_allowlist.clone() {
        runner = runner.with_env_allowlist(allowlist);
    }
    let resolver = GuardStrategyResolver::new(Arc::new(default_registry()));
    let runtime = GuardRuntime::new(resolver, Arc::new(runner)).with_time_provider(time_provider);

    let identifier = GuardStrategyId::new(cli.interpreter.clone());
    let executor = runtime
        .declare(&resource, &identifier, Some(cli.command.as_str()))?
        .context("Guard declaration produced no executor")?;
    let unit = executor.unit_name();

    let kind = if cli.not_if {
        GuardKind::NotIf
    } else {
        GuardKind::OnlyIf
    };
    let mut guard = match kind {
        GuardKind::OnlyIf => Guard::only_if(executor, options),
        GuardKind::NotIf => Guard::not_if(executor, options),
    };

    let condition = guard.evaluate().await?;
    let skip = kind.skips_on(condition);

    info!(unit = %unit, condition = condition, skip = skip, "Guard decision");

    if cli.json {
        let decision = Decision {
            resource: &resource.name,
            interpreter: identifier.as_str(),
            unit,
            kind: match kind {
                GuardKind::OnlyIf => "only_if",
                GuardKind::NotIf => "not_if",
            },
            condition,
            skip,
        };
        println!("{}", serde_json::to_string(&decision)?);
    }

    Ok(skip)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("scriptguard: {:#}", e);
        std::process::exit(EXIT_ERROR);
    }

    let code = match evaluate(cli).await {
        Ok(false) => EXIT_RUN,
        Ok(true) => EXIT_SKIP,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Guard evaluation failed");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
