//! Line-oriented TCP chat front end.
//!
//! A client connects, sends its nickname as the first line and then one
//! command per line.  Replies to a command go back to the connection that
//! sent it; messages addressed to the channel reach every connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use mediabot_core::processor::CommandProcessor;
use mediabot_core::transport::{MessageTarget, Transport, User};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
struct Outbound {
    text: String,
    target: MessageTarget,
}

impl Outbound {
    fn is_for(&self, identity: &str) -> bool {
        match &self.target {
            MessageTarget::User(user) => user.identity == identity,
            MessageTarget::Channel | MessageTarget::Broadcast => true,
        }
    }
}

/// The bot's presence on the line server.
pub struct LineTransport {
    outbound: broadcast::Sender<Outbound>,
    nickname: StdMutex<String>,
    status: StdMutex<String>,
    voice: AtomicBool,
}

impl LineTransport {
    pub fn new(nickname: &str) -> Self {
        let (outbound, _) = broadcast::channel(256);
        Self {
            outbound,
            nickname: StdMutex::new(nickname.to_string()),
            status: StdMutex::new(String::new()),
            voice: AtomicBool::new(false),
        }
    }

    pub fn nickname(&self) -> String {
        self.nickname.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn status(&self) -> String {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound.subscribe()
    }
}

impl Transport for LineTransport {
    fn send_message(&self, text: &str, target: MessageTarget) {
        // no connected clients is fine
        let _ = self.outbound.send(Outbound {
            text: text.to_string(),
            target,
        });
    }

    fn change_nickname(&self, nickname: &str) {
        info!("Nickname changed to {:?}", nickname);
        if let Ok(mut current) = self.nickname.lock() {
            *current = nickname.to_string();
        }
    }

    fn change_status_text(&self, text: &str) {
        debug!("Status text: {:?}", text);
        if let Ok(mut status) = self.status.lock() {
            *status = text.to_string();
        }
    }

    fn enable_voice_transmission(&self) {
        info!("Voice transmission enabled");
        self.voice.store(true, Ordering::SeqCst);
    }

    fn disable_voice_transmission(&self) {
        info!("Voice transmission disabled");
        self.voice.store(false, Ordering::SeqCst);
    }

    fn is_voice_transmission_enabled(&self) -> bool {
        self.voice.load(Ordering::SeqCst)
    }
}

pub fn start_server(
    bind_address: String,
    port: u16,
    processor: Arc<CommandProcessor>,
    transport: Arc<LineTransport>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind TCP socket {}: {}", addr, e);
                cancel.cancel();
                return;
            }
        };
        info!("Line server listening at {}", addr);

        let mut client_id = 0usize;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        client_id += 1;
                        info!("Client {} connected from {}", client_id, peer);
                        tokio::spawn(handle_client(
                            stream,
                            client_id,
                            Arc::clone(&processor),
                            Arc::clone(&transport),
                            cancel.child_token(),
                        ));
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }
        info!("Line server stopped");
    })
}

async fn handle_client(
    stream: TcpStream,
    client_id: usize,
    processor: Arc<CommandProcessor>,
    transport: Arc<LineTransport>,
    cancel: CancellationToken,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let greeting = format!("{}: send your nickname\n", transport.nickname());
    if write_half.write_all(greeting.as_bytes()).await.is_err() {
        return;
    }
    let nickname = match lines.next_line().await {
        Ok(Some(line)) if !line.trim().is_empty() => line.trim().to_string(),
        _ => {
            info!("Client {} left before sending a nickname", client_id);
            return;
        }
    };
    let identity = nickname.clone();
    info!("Client {} is {:?}", client_id, nickname);

    let (reply_tx, reply_rx) = mpsc::channel::<String>(64);
    // ends once every in-flight dispatch has delivered its reply
    tokio::spawn(writer_task(
        write_half,
        reply_rx,
        transport.subscribe(),
        identity.clone(),
        client_id,
    ));

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let message = match line {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(e) => {
                warn!("Read error from client {}: {}", client_id, e);
                break;
            }
        };

        let processor = Arc::clone(&processor);
        let reply_tx = reply_tx.clone();
        let mut user = User::new(nickname.clone(), identity.clone());
        tokio::spawn(async move {
            user.is_admin = processor.context().config.is_admin(&user.identity).await;
            if let Some(reply) = processor.dispatch(&message, &user).await {
                let _ = reply_tx.send(reply).await;
            }
        });
    }

    drop(reply_tx);
    info!("Client {} disconnected", client_id);
}

async fn writer_task(
    mut writer: tokio::net::tcp::OwnedWriteHalf,
    mut replies: mpsc::Receiver<String>,
    mut outbound: broadcast::Receiver<Outbound>,
    identity: String,
    client_id: usize,
) {
    loop {
        let text = tokio::select! {
            reply = replies.recv() => match reply {
                Some(text) => text,
                None => break,
            },
            message = outbound.recv() => match message {
                Ok(message) if message.is_for(&identity) => message.text,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Client {} missed {} messages", client_id, n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        let mut text = text;
        text.push('\n');
        if writer.write_all(text.as_bytes()).await.is_err() {
            break;
        }
    }
}
