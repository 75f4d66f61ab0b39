//! Lockstep terminal client with reconnection support.
//!
//! Creates or joins a room, prints every state update and, as host, sends
//! play / pause / seek / load commands typed at the prompt.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lockstep-client -- --name Alice --create https://example.com/movie.mp4
//! cargo run --bin lockstep-client -- -n Bob --join room_0123456789abcdef
//! ```

use clap::{ArgGroup, Parser};

use lockstep_client::{ClientConfig, JoinMode, run_client};
use lockstep_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "lockstep-client")]
#[command(about = "Terminal client for shared video playback rooms", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["create", "join"])))]
struct Args {
    /// Display name shown to other participants
    #[arg(short = 'n', long)]
    name: String,

    /// Server HTTP URL
    #[arg(
        short = 's',
        long,
        env = "LOCKSTEP_SERVER",
        default_value = "http://127.0.0.1:8080"
    )]
    server: String,

    /// Create a room playing this video and become its host
    #[arg(long, value_name = "VIDEO_URL")]
    create: Option<String>,

    /// Join an existing room as guest
    #[arg(long, value_name = "ROOM_ID")]
    join: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let mode = match (args.create, args.join) {
        (Some(video_url), _) => JoinMode::Create(video_url),
        (None, Some(room_id)) => JoinMode::Join(room_id),
        (None, None) => {
            eprintln!("one of --create or --join is required");
            std::process::exit(2);
        }
    };

    // Run the client
    let config = ClientConfig {
        server: args.server,
        display_name: args.name,
        mode,
    };
    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
