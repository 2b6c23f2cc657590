use clap::Parser;
use cavern_server::{ServerApp, ServerConfig};
use cavern_turn::TurnPolicy;
use tracing_subscriber::EnvFilter;

/// Cavern game server.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = 8765)]
    port: u16,
    /// World width in tiles
    #[arg(long, default_value_t = 32)]
    width: u32,
    /// World height in tiles
    #[arg(long, default_value_t = 32)]
    height: u32,
    /// Ticks per second
    #[arg(short, long, default_value_t = 30)]
    tick_rate: u32,
    /// Keep the turn with its holder until it sends EndTurn
    #[arg(long)]
    manual_turns: bool,
    /// Name the server introduces itself with
    #[arg(short, long, default_value = "cavern")]
    name: String,
    /// Seed for world generation
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let policy = if args.manual_turns {
        TurnPolicy::Manual
    } else {
        TurnPolicy::AutoAdvance
    };
    let mut config = ServerConfig::default()
        .bind(&format!("{}:{}", args.host, args.port))
        .world_size(args.width, args.height)
        .tick_rate(args.tick_rate)
        .turn_policy(policy)
        .name(&args.name);
    config.seed = args.seed;

    let app = ServerApp::bind(config).await?;

    tokio::select! {
        _ = app.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
