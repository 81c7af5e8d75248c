//! WebSocket transport: the accept loop and the per-connection message
//! dispatcher that bridges sockets to the room registry.

use crate::registry::RegistryHandle;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use shared::{ClientMessage, ServerMessage};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

pub struct WsServer {
    listener: TcpListener,
    registry: RegistryHandle,
}

impl WsServer {
    /// Binds the listener. The registry is the single instance constructed
    /// at startup; every connection task gets a clone of its handle.
    pub async fn new(addr: &str, registry: RegistryHandle) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one task per socket.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let registry = self.registry.clone();
            tokio::spawn(async move {
                handle_connection(stream, peer, registry).await;
            });
        }
    }
}

/// Drives one socket: inbound frames are parsed and dispatched, outbound
/// messages are drained from the room's fire-and-forget channel. Ends on
/// close or transport error, which tears the bound room down.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, registry: RegistryHandle) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("Handshake with {} failed: {}", peer, e);
            return;
        }
    };
    debug!("Client connected from {}", peer);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Room binding for this connection, set at most once for its lifetime.
    let mut binding: Option<(String, usize)> = None;

    loop {
        tokio::select! {
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        // Malformed JSON and unknown types are dropped with
                        // no reply.
                        if let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) {
                            dispatch(msg, &mut binding, &outbound_tx, &registry).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("Socket error from {}: {}", peer, e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            outbound = outbound_rx.recv() => {
                // The channel cannot close while outbound_tx lives above,
                // so recv only yields messages here.
                if let Some(msg) = outbound {
                    if let Ok(payload) = serde_json::to_string(&msg) {
                        if ws_sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    if let Some((code, player)) = binding {
        registry.handle_disconnect(&code, player).await;
    }
    debug!("Client {} disconnected", peer);
}

async fn dispatch(
    msg: ClientMessage,
    binding: &mut Option<(String, usize)>,
    outbound: &mpsc::UnboundedSender<ServerMessage>,
    registry: &RegistryHandle,
) {
    match msg {
        ClientMessage::CreateRoom => {
            // A connection bound to a room ignores further create/join.
            if binding.is_some() {
                return;
            }
            let code = registry.create_room(outbound.clone()).await;
            *binding = Some((code, 0));
        }
        ClientMessage::JoinRoom { code } => {
            if binding.is_some() {
                return;
            }
            match registry.join_room(&code, outbound.clone()).await {
                Ok(code) => *binding = Some((code, 1)),
                Err(err) => {
                    let _ = outbound.send(ServerMessage::Error {
                        message: err.to_string(),
                    });
                }
            }
        }
        ClientMessage::Direction { dir } => {
            if let Some((code, player)) = binding {
                registry.set_direction(code, *player, dir).await;
            }
        }
        ClientMessage::Teleport => {
            if let Some((code, player)) = binding {
                registry.teleport(code, *player).await;
            }
        }
        ClientMessage::Rematch => {
            if let Some((code, player)) = binding {
                registry.rematch(code, *player).await;
            }
        }
    }
}
