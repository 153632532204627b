//! mpv as the audio backend, driven over its JSON IPC socket.
//!
//! ```text
//!   MpvBackend ──PlayerCommand──▶ command_task ──▶ MpvHandle ──▶ writer_task ──▶ socket
//!                                                                reader_task ◀── socket
//!                                                                  ├── responses → pending oneshots
//!                                                                  └── events    → event_task
//!                                                                                   ├── time-pos / duration → Progress
//!                                                                                   └── end-file (eof)      → track_end
//! ```
//!
//! `Backend` calls never wait on mpv: they enqueue a [`PlayerCommand`] and
//! return.  The command task turns them into IPC requests and logs failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use mediabot_core::platform;
use mediabot_core::player::Backend;
use mediabot_core::track::Track;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

const OBS_TIME_POS: u64 = 1;
const OBS_DURATION: u64 = 2;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct IpcRequest {
    id: u64,
    line: String,
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// Cloneable sender for raw IPC commands.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<IpcRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let id = NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&json!({ "command": command, "request_id": id }))?;
        line.push('\n');

        let (reply, response) = oneshot::channel();
        self.tx
            .send(IpcRequest { id, line, reply })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(REPLY_TIMEOUT, response)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for request {}", id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped for request {}", id))?
    }

    async fn set_property(&self, name: &str, value: Value) -> anyhow::Result<()> {
        self.send(json!(["set_property", name, value])).await?;
        Ok(())
    }
}

/// Requests queued by [`MpvBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Load(String),
    Pause(bool),
    Stop,
    /// 0.0..=1.0
    Volume(f32),
    Speed(f64),
    /// 0.0..=1.0 of the track
    Seek(f64),
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    time_pos: Option<f64>,
    duration: Option<f64>,
}

impl Progress {
    fn fraction(&self) -> Option<f64> {
        match (self.time_pos, self.duration) {
            (Some(pos), Some(duration)) if duration > 0.0 => Some((pos / duration).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}

pub struct MpvBackend {
    commands: mpsc::Sender<PlayerCommand>,
    progress: Arc<StdMutex<Progress>>,
}

impl MpvBackend {
    fn queue(&self, command: PlayerCommand) {
        if let Err(e) = self.commands.try_send(command) {
            warn!("mpv: dropping command: {}", e);
        }
    }
}

impl Backend for MpvBackend {
    fn play(&self, track: &Track) {
        if let Ok(mut progress) = self.progress.lock() {
            *progress = Progress::default();
        }
        self.queue(PlayerCommand::Load(track.url.clone()));
    }

    fn pause(&self) {
        self.queue(PlayerCommand::Pause(true));
    }

    fn resume(&self) {
        self.queue(PlayerCommand::Pause(false));
    }

    fn stop(&self) {
        self.queue(PlayerCommand::Stop);
    }

    fn set_volume(&self, level: f32) {
        self.queue(PlayerCommand::Volume(level));
    }

    fn set_rate(&self, rate: f64) {
        self.queue(PlayerCommand::Speed(rate));
    }

    fn position(&self) -> Option<f64> {
        self.progress.lock().ok().and_then(|p| p.fraction())
    }

    fn set_position(&self, fraction: f64) {
        self.queue(PlayerCommand::Seek(fraction));
    }
}

/// The running mpv child.  Killed on drop.
pub struct MpvProcess {
    child: Child,
}

impl MpvProcess {
    pub async fn shutdown(mut self) {
        info!("mpv: shutting down");
        if let Err(e) = self.child.kill().await {
            warn!("mpv: kill failed: {}", e);
        }
    }
}

/// Start mpv, connect to its IPC socket and wire up the backend.
/// `track_end` receives one message per track that played to its end.
pub async fn launch(track_end: mpsc::Sender<()>) -> anyhow::Result<(MpvProcess, MpvBackend)> {
    let binary = platform::find_mpv_binary()
        .ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
    let socket_name = platform::mpv_socket_name();

    #[cfg(unix)]
    let _ = tokio::fs::remove_file(&socket_name).await;

    info!("mpv: spawning {:?}", binary);
    let child = tokio::process::Command::new(binary)
        .arg("--no-video")
        .arg("--idle=yes")
        .arg("--quiet")
        .arg(platform::mpv_socket_arg())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let (event_tx, event_rx) = mpsc::channel::<Value>(256);
    let handle = connect(&socket_name, event_tx).await?;
    for (id, name) in [(OBS_TIME_POS, "time-pos"), (OBS_DURATION, "duration")] {
        if let Err(e) = handle.send(json!(["observe_property", id, name])).await {
            warn!("mpv: observe_property {} failed: {}", name, e);
        }
    }

    let progress = Arc::new(StdMutex::new(Progress::default()));
    let (command_tx, command_rx) = mpsc::channel(64);
    tokio::spawn(command_task(handle, command_rx));
    tokio::spawn(event_task(event_rx, Arc::clone(&progress), track_end));

    Ok((
        MpvProcess { child },
        MpvBackend {
            commands: command_tx,
            progress,
        },
    ))
}

#[cfg(unix)]
async fn connect(socket_name: &str, event_tx: mpsc::Sender<Value>) -> anyhow::Result<MpvHandle> {
    let path = std::path::Path::new(socket_name);
    for _ in 0..50 {
        if path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    if !path.exists() {
        anyhow::bail!("mpv IPC socket did not appear");
    }
    let stream = tokio::net::UnixStream::connect(path).await?;
    info!("mpv: connected to {}", socket_name);
    Ok(start_io(stream, event_tx))
}

#[cfg(windows)]
async fn connect(socket_name: &str, event_tx: mpsc::Sender<Value>) -> anyhow::Result<MpvHandle> {
    use tokio::net::windows::named_pipe::ClientOptions;

    let pipe = format!(r"\\.\pipe\{}", socket_name);
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(client) = ClientOptions::new().open(&pipe) {
            info!("mpv: connected to {}", pipe);
            return Ok(start_io(client, event_tx));
        }
    }
    anyhow::bail!("mpv named pipe did not appear")
}

fn start_io<S>(stream: S, event_tx: mpsc::Sender<Value>) -> MpvHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(writer_task(write_half, rx, Arc::clone(&pending)));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));
    MpvHandle { tx }
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    for (_, reply) in pending.lock().await.drain() {
        let _ = reply.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<Value>)
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let Ok(value) = serde_json::from_str::<Value>(line.trim()) else {
                    continue;
                };
                let Some(id) = value.get("request_id").and_then(Value::as_u64) else {
                    if event_tx.send(value).await.is_err() {
                        break;
                    }
                    continue;
                };
                let Some(reply) = pending.lock().await.remove(&id) else {
                    debug!("mpv reader: response for unknown request {}", id);
                    continue;
                };
                let result = match value["error"].as_str() {
                    Some("success") => Ok(value),
                    other => Err(anyhow::anyhow!("mpv error: {}", other.unwrap_or("unknown error"))),
                };
                let _ = reply.send(result);
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<IpcRequest>, pending: PendingMap)
where
    W: AsyncWrite + Unpin,
{
    while let Some(request) = rx.recv().await {
        pending.lock().await.insert(request.id, request.reply);
        if let Err(e) = writer.write_all(request.line.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(reply) = pending.lock().await.remove(&request.id) {
                let _ = reply.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

async fn command_task(handle: MpvHandle, mut commands: mpsc::Receiver<PlayerCommand>) {
    while let Some(command) = commands.recv().await {
        debug!("mpv: {:?}", command);
        let result = match &command {
            PlayerCommand::Load(url) => match handle.send(json!(["loadfile", url, "replace"])).await {
                Ok(_) => handle.set_property("pause", json!(false)).await,
                Err(e) => Err(e),
            },
            PlayerCommand::Pause(paused) => handle.set_property("pause", json!(paused)).await,
            PlayerCommand::Stop => handle.send(json!(["stop"])).await.map(|_| ()),
            PlayerCommand::Volume(level) => {
                let percent = (level * 100.0).clamp(0.0, 100.0);
                handle.set_property("volume", json!(percent)).await
            }
            PlayerCommand::Speed(rate) => handle.set_property("speed", json!(rate)).await,
            PlayerCommand::Seek(fraction) => handle
                .send(json!(["seek", fraction * 100.0, "absolute-percent"]))
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            warn!("mpv: {:?} failed: {}", command, e);
        }
    }
}

async fn event_task(
    mut events: mpsc::Receiver<Value>,
    progress: Arc<StdMutex<Progress>>,
    track_end: mpsc::Sender<()>,
) {
    while let Some(event) = events.recv().await {
        match event.get("event").and_then(Value::as_str) {
            Some("property-change") => {
                let value = event.get("data").and_then(Value::as_f64);
                if let Ok(mut progress) = progress.lock() {
                    match event.get("id").and_then(Value::as_u64) {
                        Some(OBS_TIME_POS) => progress.time_pos = value,
                        Some(OBS_DURATION) => progress.duration = value,
                        _ => {}
                    }
                }
            }
            Some("end-file") if is_natural_end(&event) => {
                debug!("mpv: track finished");
                if track_end.send(()).await.is_err() {
                    break;
                }
            }
            _ => {}
        }
    }
}

/// `end-file` fires for replaced and stopped files too; only `eof` means the
/// track ran out.
fn is_natural_end(event: &Value) -> bool {
    event.get("reason").and_then(Value::as_str) == Some("eof")
}
