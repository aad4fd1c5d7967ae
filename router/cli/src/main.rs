//! Model Router CLI - Inspect Routing Decisions
//!
//! Dry-runs the routing pipeline against a request file without contacting
//! any backend.
//!
//! # Usage
//!
//! ```bash
//! # Score a request
//! model-router analyze request.json
//!
//! # Show which backend would be chosen, and the fallback chain
//! model-router select request.json --tier economy --max-latency 1500
//!
//! # Print the effective configuration
//! model-router --config ./router.toml config --models
//!
//! # Verbose logging
//! RUST_LOG=debug model-router select request.json
//! ```
//!
//! Request files are JSON-encoded `Request` values; every field is optional.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use router_core::config::{default_config_path, load_config_from_path, ConfigSource, RouterSettings};
use router_core::routing::config::{FallbackStrategy, SelectionMode};
use router_core::{
    ComplexityAnalyzer, GenerationOutput, GenerationPrimitive, GenerationRequest, ModelRouter,
    ModelTier, Request, RoutingConstraints, StreamEvent,
};

/// Model Router - complexity-aware LLM backend routing
#[derive(Parser, Debug)]
#[command(name = "model-router")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "MODEL_ROUTER_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "MODEL_ROUTER_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a request's complexity
    Analyze {
        /// JSON request file
        request: PathBuf,
    },

    /// Show the backend and fallback chain a request would be routed to
    Select {
        /// JSON request file
        request: PathBuf,

        /// Selection strategy (scored, rule-based)
        #[arg(long, value_name = "MODE")]
        strategy: Option<SelectionMode>,

        /// Fallback ordering (performance, cost, reliability)
        #[arg(long, value_name = "STRATEGY")]
        fallback: Option<FallbackStrategy>,

        /// Only consider backends that can stream
        #[arg(long)]
        streaming: bool,

        /// Reject backends slower than this on average (ms)
        #[arg(long, value_name = "MS")]
        max_latency: Option<u64>,

        /// Reject backends more expensive than this per token (USD)
        #[arg(long, value_name = "USD")]
        max_cost: Option<f64>,

        /// Prefer backends of this tier
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
    },

    /// Print the effective configuration
    Config {
        /// Also list the backend capability table
        #[arg(long)]
        models: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierArg {
    Economy,
    Standard,
    Premium,
}

impl From<TierArg> for ModelTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Economy => Self::Economy,
            TierArg::Standard => Self::Standard,
            TierArg::Premium => Self::Premium,
        }
    }
}

// =============================================================================
// Dry-Run Primitive
// =============================================================================

/// Primitive that refuses to dispatch; only planning is possible
struct DryRunPrimitive;

#[async_trait]
impl GenerationPrimitive for DryRunPrimitive {
    async fn generate(
        &self,
        _chain: &[String],
        _request: &GenerationRequest,
    ) -> Result<GenerationOutput> {
        anyhow::bail!("dry run: no backend transport configured")
    }

    async fn stream(
        &self,
        _chain: &[String],
        _request: &GenerationRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        anyhow::bail!("dry run: no backend transport configured")
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("router_cli={level},router_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(path: &Path) -> Result<Request> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path.display()))?;
    let request: Request = serde_json::from_str(&content)
        .with_context(|| format!("Invalid request JSON in {}", path.display()))?;
    debug!(request_id = %request.request_id, messages = request.messages.len(), "Request loaded");
    Ok(request)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn analyze(request: &Path) -> Result<()> {
    let request = read_request(request)?;
    let complexity = ComplexityAnalyzer::new().analyze(&request);
    print_json(&complexity)
}

fn select(
    mut settings: RouterSettings,
    request: &Path,
    strategy: Option<SelectionMode>,
    fallback: Option<FallbackStrategy>,
    constraints: RoutingConstraints,
) -> Result<()> {
    let request = read_request(request)?;

    if let Some(mode) = strategy {
        settings.router.selection = mode;
        settings.set_source(ConfigSource::Cli);
    }
    if let Some(ordering) = fallback {
        settings.router.fallback.strategy = ordering;
        settings.set_source(ConfigSource::Cli);
    }

    let router = ModelRouter::new(
        settings.router.clone(),
        Arc::new(settings.registry()),
        Arc::new(DryRunPrimitive),
    );
    let plan = router.plan(&request, &constraints)?;
    info!(primary = %plan.chain.primary, "Routing plan computed");
    print_json(&plan)
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    source: String,
    config_file: Option<String>,
    router: &'a router_core::RouterConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    models: Option<Vec<router_core::ModelCapabilities>>,
}

fn show_config(settings: &RouterSettings, models: bool) -> Result<()> {
    let report = ConfigReport {
        source: settings.source().to_string(),
        config_file: settings
            .config_file_path
            .as_ref()
            .map(|p| p.display().to_string()),
        router: &settings.router,
        models: models.then(|| settings.registry().all().to_vec()),
    };
    print_json(&report)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(default_config_path);
    let settings = load_config_from_path(config_path).context("Failed to load configuration")?;
    debug!(source = %settings.source(), "Configuration loaded");

    match args.command {
        Command::Analyze { request } => analyze(&request),
        Command::Select {
            request,
            strategy,
            fallback,
            streaming,
            max_latency,
            max_cost,
            tier,
        } => {
            let constraints = RoutingConstraints {
                context: "cli".to_string(),
                requires_streaming: streaming,
                max_latency_ms: max_latency,
                max_cost_per_token: max_cost,
                preferred_tier: tier.map(ModelTier::from),
                max_tokens: None,
            };
            select(settings, &request, strategy, fallback, constraints)
        }
        Command::Config { models } => show_config(&settings, models),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_parse_select() {
        let args = Args::parse_from([
            "model-router",
            "select",
            "req.json",
            "--strategy",
            "rule-based",
            "--tier",
            "economy",
            "--max-latency",
            "1500",
        ]);
        let Command::Select {
            strategy,
            tier,
            max_latency,
            ..
        } = args.command
        else {
            panic!("expected select");
        };
        assert_eq!(strategy, Some(SelectionMode::RuleBased));
        assert!(matches!(tier, Some(TierArg::Economy)));
        assert_eq!(max_latency, Some(1500));
    }

    #[test]
    fn test_read_request_defaults_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"messages": [{"role": "user", "content": "hi"}]}"#)
            .unwrap();

        let request = read_request(file.path()).unwrap();
        assert_eq!(request.messages.len(), 1);
        assert!(request.attachments.is_empty());
        assert!(!request.request_id.is_empty());
    }

    #[test]
    fn test_dry_run_plan() {
        let router = ModelRouter::new(
            RouterSettings::default().router,
            Arc::new(RouterSettings::default().registry()),
            Arc::new(DryRunPrimitive),
        );
        let plan = router
            .plan(&Request::new("hi"), &RoutingConstraints::default())
            .unwrap();
        assert!(plan.chain.depth() >= 1);
    }
}
