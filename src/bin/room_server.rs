use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use holdem_room_engine::server::{run_server, ServerConfig};
use holdem_room_engine::store::{InMemoryRoomStore, DEFAULT_ROOM_TTL_SECS};

const DEFAULT_BIND: &str = "127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "room_server")]
#[command(about = "Launch the holdem room runtime's WebSocket/HTTP server", long_about = None)]
struct Args {
    /// Address to bind the HTTP/WebSocket server to (host:port).
    #[arg(long, env = "ROOM_SERVER_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Room Store TTL in seconds, refreshed on every write (§4.5 / §6.3).
    #[arg(long, env = "ROOM_STORE_TTL_SECS", default_value_t = DEFAULT_ROOM_TTL_SECS)]
    room_ttl_secs: u64,

    /// Soft per-client chat cooldown in milliseconds (§6.1, §9(b)).
    #[arg(long, env = "ROOM_CHAT_RATE_LIMIT_MS", default_value_t = holdem_room_engine::runtime::DEFAULT_CHAT_RATE_LIMIT_MS)]
    chat_rate_limit_ms: i64,

    /// Toggle structured (JSON) logs.
    #[arg(long, env = "ROOM_SERVER_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;

    let store = Arc::new(InMemoryRoomStore::new(Duration::from_secs(args.room_ttl_secs)));
    let config = ServerConfig {
        bind: args.bind,
        chat_rate_limit_ms: args.chat_rate_limit_ms,
    };
    run_server(config, store).await.context("server exited with error")
}

fn load_dotenv() {
    let manifest_env_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
