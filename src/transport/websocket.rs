//! WebSocket transport
//!
//! Accepts WebSocket connections and translates JSON protocol messages into
//! control-surface operations. Each connection gets a `Session`; replies go
//! through the session's channel and a spawned send loop so the receive loop
//! never waits on the socket while holding registry state.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::Arc;

use crate::broker::{ControlSurfaceRouter, Receipt, SurfaceId, SurfaceKind};
use crate::client::Session;
use crate::transport::message::{ClientMessage, ErrorBody, ServerMessage};
use crate::utils::error::RegistryError;

/// Binds `addr` and serves connections until the listener fails.
pub async fn start_websocket_server(
    addr: &str,
    router: Arc<ControlSurfaceRouter>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, router).await;
    Ok(())
}

pub async fn serve(listener: TcpListener, router: Arc<ControlSurfaceRouter>) {
    while let Ok((stream, _)) = listener.accept().await {
        spawn(handle_connection(stream, router.clone()));
    }
    error!("listener stopped accepting connections");
}

async fn handle_connection(stream: TcpStream, router: Arc<ControlSurfaceRouter>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut session = Session::new(tx);
    let session_id = session.id.clone();
    info!("{session_id} connected");

    {
        let session_id = session_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!("failed to send message to {session_id}: {e}");
                    break;
                }
            }
            debug!("send loop closed for {session_id}");
        });
    }

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let response = match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => handle_client_message(&router, &mut session, request),
            Err(err) => {
                warn!(
                    "invalid client message from {session_id}: {err} | {}",
                    text.chars().take(100).collect::<String>()
                );
                ServerMessage::Error {
                    code: "invalid_message".to_string(),
                    message: err.to_string(),
                }
            }
        };
        send(&session, &response);
    }

    if session.close_listing() {
        debug!("{session_id} left a listing open; closed it");
    }
    info!("{session_id} disconnected");
}

fn send(session: &Session, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            if let Err(e) = session.sender.send(WsMessage::text(json)) {
                warn!("failed to queue reply for {}: {e}", session.id);
            }
        }
        Err(e) => error!("failed to serialize reply: {e}"),
    }
}

fn written(surface: SurfaceId, receipt: Receipt) -> ServerMessage {
    ServerMessage::Written {
        surface,
        received: receipt.received,
        error: receipt.outcome.as_ref().err().map(ErrorBody::from),
    }
}

/// Executes one client request and builds the reply.
pub fn handle_client_message(
    router: &ControlSurfaceRouter,
    session: &mut Session,
    msg: ClientMessage,
) -> ServerMessage {
    match msg {
        ClientMessage::CreateTopic { name } => match router.create_topic(name.as_bytes()) {
            Ok(handles) => {
                info!("{} created topic {}", session.id, handles.topic());
                ServerMessage::TopicCreated {
                    topic: handles.topic().to_string(),
                    path: format!("{}{}", router.registry().prefix(), handles.topic()),
                    surfaces: (&handles).into(),
                }
            }
            Err(err) => err.into(),
        },

        ClientMessage::Subscribe { topic, pid } => {
            match router.surface(&topic, SurfaceKind::Subscribe) {
                Ok(surface) => written(surface.id, router.subscribe(&surface, pid.as_bytes())),
                Err(err) => err.into(),
            }
        }

        ClientMessage::Write { surface, data } => match router.resolve(surface) {
            Ok(handle) => written(handle.id, router.write(&handle, data.as_bytes())),
            Err(err) => err.into(),
        },

        ClientMessage::ListSubscribers { topic } => {
            match router
                .surface(&topic, SurfaceKind::SubscribersList)
                .and_then(|surface| router.list_subscribers(&surface))
            {
                Ok(data) => ServerMessage::Listing { topic, data },
                Err(err) => err.into(),
            }
        }

        ClientMessage::OpenListing { topic } => {
            if session.has_listing() {
                return RegistryError::Busy("subscribers_list").into();
            }
            match router
                .surface(&topic, SurfaceKind::SubscribersList)
                .and_then(|surface| router.open_listing(&surface))
            {
                Ok(reader) => {
                    session.set_listing(reader);
                    ServerMessage::ListingOpened { topic }
                }
                Err(err) => err.into(),
            }
        }

        ClientMessage::ReadListing { max_len } => {
            let max_len = max_len.unwrap_or(router.list_chunk_len());
            let Some(reader) = session.listing_mut() else {
                return ServerMessage::Error {
                    code: "listing_not_open".to_string(),
                    message: "no subscribers listing is open".to_string(),
                };
            };
            match reader.read(max_len) {
                Ok(chunk) => ServerMessage::ListingChunk {
                    topic: reader.topic().to_string(),
                    eof: chunk.is_empty() && reader.is_exhausted(),
                    data: String::from_utf8_lossy(&chunk).into_owned(),
                },
                Err(err) => err.into(),
            }
        }

        ClientMessage::CloseListing {} => {
            session.close_listing();
            ServerMessage::ListingClosed {}
        }

        ClientMessage::ConfigureSignal { topic, value } => {
            match router.surface(&topic, SurfaceKind::SignalNr) {
                Ok(surface) => written(
                    surface.id,
                    router.configure_signal(&surface, value.as_bytes()),
                ),
                Err(err) => err.into(),
            }
        }

        ClientMessage::Publish { topic, payload } => {
            match router.surface(&topic, SurfaceKind::Endpoint) {
                Ok(surface) => written(surface.id, router.publish(&surface, payload.as_bytes())),
                Err(err) => err.into(),
            }
        }

        ClientMessage::ListTopics {} => ServerMessage::Topics {
            topics: router.registry().topics(),
        },
    }
}
