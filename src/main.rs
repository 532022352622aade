use anyhow::Result;
use apigwctl::aws::ApiGatewayClient;
use apigwctl::gateway::Gateway;
use apigwctl::modules::{
    api_key::{ApiKeyModule, ApiKeyParams},
    authorizer::{AuthorizerModule, AuthorizerParams},
    base_path_mapping::{BasePathMappingModule, BasePathMappingParams},
    domain_name::{DomainNameModule, DomainNameParams},
    model::{ModelModule, ModelParams},
    reconcile,
    resource::{ResourceParams, ResourcePathModule},
    stage::{StageModule, StageParams},
    usage_plan::{UsagePlanModule, UsagePlanParams},
    usage_plan_key::{UsagePlanKeyModule, UsagePlanKeyParams},
    ResourceModule,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::Level;

/// Version injected at compile time via APIGWCTL_VERSION env var (set by
/// CI/CD), or "dev" for local builds.
pub const VERSION: &str = match option_env!("APIGWCTL_VERSION") {
    Some(v) => v,
    None => "dev",
};

/// Declarative management of AWS API Gateway resources
#[derive(Parser, Debug)]
#[command(name = "apigwctl", version = VERSION, about, long_about = None)]
struct Cli {
    /// AWS region; falls back to the shared config chain
    #[arg(long, global = true)]
    region: Option<String>,

    /// Endpoint URL override, e.g. for localstack
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Compute and report changes without issuing mutating calls
    #[arg(long, global = true)]
    check: bool,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage an API key
    ApiKey(ApiKeyParams),
    /// Manage a custom authorizer
    Authorizer(AuthorizerParams),
    /// Manage a request/response model
    Model(ModelParams),
    /// Manage a deployment stage
    Stage(StageParams),
    /// Manage a path resource
    Resource(ResourceParams),
    /// Manage a usage plan
    UsagePlan(UsagePlanParams),
    /// Manage a usage plan / API key association
    UsagePlanKey(UsagePlanKeyParams),
    /// Manage a custom domain base path mapping
    BasePathMapping(BasePathMappingParams),
    /// Manage a custom domain name
    DomainName(DomainNameParams),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) {
    let Some(tracing_level) = level.to_tracing_level() else {
        return;
    };

    // Diagnostics go to stderr so stdout stays clean JSON.
    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("apigwctl started with log level: {:?}", level);
}

async fn run_module(
    module: &dyn ResourceModule,
    gw: &dyn Gateway,
    check_mode: bool,
) -> Result<Value> {
    let outcome = reconcile(module, gw, check_mode).await?;
    Ok(outcome.into_json(module.kind()))
}

async fn dispatch(command: &Command, gw: &dyn Gateway, check_mode: bool) -> Result<Value> {
    match command {
        Command::ApiKey(params) => run_module(&ApiKeyModule::new(params), gw, check_mode).await,
        Command::Authorizer(params) => {
            run_module(&AuthorizerModule::new(params), gw, check_mode).await
        }
        Command::Model(params) => run_module(&ModelModule::new(params), gw, check_mode).await,
        Command::Stage(params) => run_module(&StageModule::new(params), gw, check_mode).await,
        Command::Resource(params) => {
            run_module(&ResourcePathModule::new(params), gw, check_mode).await
        }
        Command::UsagePlan(params) => {
            run_module(&UsagePlanModule::new(params), gw, check_mode).await
        }
        Command::UsagePlanKey(params) => {
            run_module(&UsagePlanKeyModule::new(params), gw, check_mode).await
        }
        Command::BasePathMapping(params) => {
            run_module(&BasePathMappingModule::new(params), gw, check_mode).await
        }
        Command::DomainName(params) => {
            run_module(&DomainNameModule::new(params), gw, check_mode).await
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let gw = ApiGatewayClient::new(cli.region.as_deref(), cli.endpoint_url.as_deref()).await?;
    let output = dispatch(&cli.command, &gw, cli.check).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
