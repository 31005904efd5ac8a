//! CLI for psipc
//!
//! Subcommands:
//! - `server`: run the WebSocket control-surface service
//! - `client`: create a topic, subscribe this process and print the listing

use std::sync::Arc;

use clap::Parser;
use psipc::broker::{ControlSurfaceRouter, TopicRegistry};
use psipc::config::load_config;
use psipc::transport::websocket::start_websocket_server;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "psipc")]
enum Command {
    /// Start the WebSocket server
    Server,
    /// Run the demo client (create topic, subscribe own pid, list)
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Topic to create and subscribe to
        #[arg(long, default_value = "demo")]
        topic: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server().await {
                error!("Server failed: {}", e);
            }
        }
        Command::Client { url, topic } => {
            psipc::utils::logging::init("info");
            if let Err(e) = run_client(&url, &topic).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    psipc::utils::logging::init(&config.logging.level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let registry = Arc::new(TopicRegistry::new(&config.registry));
    let router = Arc::new(ControlSurfaceRouter::new(registry.clone(), &config.registry));

    tokio::select! {
        res = start_websocket_server(&addr, router) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    let destroyed = registry.destroy_all();
    info!("released {destroyed} topic(s)");

    Ok(())
}

async fn run_client(url: &str, topic: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    let requests = [
        json!({ "type": "create_topic", "name": topic }),
        json!({ "type": "subscribe", "topic": topic, "pid": std::process::id().to_string() }),
        json!({ "type": "list_subscribers", "topic": topic }),
    ];

    for request in requests {
        ws_stream
            .send(WsMessage::Text(request.to_string().into()))
            .await?;
        if let Some(Ok(WsMessage::Text(reply))) = ws_stream.next().await {
            println!("{reply}");
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
