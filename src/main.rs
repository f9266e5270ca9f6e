use clap::Parser;
use tracing::Level;

use olm_gateway::config::GatewayConfig;
use olm_gateway::observability::{init_logging, LoggingConfig};
use olm_gateway::server;

#[derive(Parser, Debug)]
#[command(name = "olm-gateway", about = "Streaming gateway for Ollama models")]
struct Args {
    /// Address to bind.
    #[arg(long, env = "OLM_GATEWAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "OLM_GATEWAY_PORT", default_value_t = 8000)]
    port: u16,

    /// Base URL of the Ollama instance.
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Maximum generations running at once; further requests queue.
    #[arg(long, env = "OLM_GATEWAY_MAX_CONCURRENT", default_value_t = 2)]
    max_concurrent: usize,

    /// Upstream request timeout in seconds.
    #[arg(long, env = "OLM_GATEWAY_TIMEOUT_SECS", default_value_t = 300)]
    timeout_secs: u64,

    /// Emit logs as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,

    /// Enable debug logging for the gateway.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        level: if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        },
        json_format: args.log_json,
        colorize: !args.log_json,
    });

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        ollama_url: args.ollama_url,
        max_concurrent_generations: args.max_concurrent,
        request_timeout_secs: args.timeout_secs,
        ..GatewayConfig::default()
    };

    server::startup(config).await
}
