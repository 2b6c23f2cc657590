use cavern_client::{ClientApp, ClientConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Headless Cavern client.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[arg(short, long, default_value_t = 8765)]
    port: u16,
    /// Name to introduce ourselves with
    #[arg(short, long, default_value = "caveman")]
    name: String,
    /// Ticks per second
    #[arg(short, long, default_value_t = 30)]
    tick_rate: u32,
    /// Only watch, never submit turns
    #[arg(long)]
    no_play: bool,
    /// Leave after this many accepted turns
    #[arg(long)]
    max_turns: Option<u32>,
    /// Pass the turn on after each accepted turn (for --manual-turns servers)
    #[arg(long)]
    end_turns: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::default()
        .url(&format!("ws://{}:{}", args.host, args.port))
        .name(&args.name)
        .tick_rate(args.tick_rate)
        .auto_play(!args.no_play)
        .end_turns(args.end_turns);
    config.max_turns = args.max_turns;

    let app = ClientApp::connect(config)?;

    tokio::select! {
        result = app.run() => {
            let state = result?;
            tracing::info!(turns = state.turns_played, "session over");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
