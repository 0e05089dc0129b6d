//! mpv IPC driver with separated reader/writer tasks.
//!
//! ```text
//!   MpvDriver::spawn_and_connect()
//!         │
//!         ├── writer_task   ← receives PendingRequest via mpsc, serialises → socket
//!         └── reader_task   ← reads JSON lines from socket
//!                                ├── response (has request_id) → matched oneshot::Sender
//!                                └── event / log-message       → event_tx channel
//! ```
//!
//! mpv runs with a video window and `--idle`, so one process serves every
//! channel the user plays.  Unix uses a domain socket, Windows a named pipe
//! `\\.\pipe\<name>`.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use tv_proto::config::EngineConfig;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<anyhow::Result<Value>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<anyhow::Result<Value>>,
}

/// An mpv event that arrived unsolicited (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Event name, e.g. "end-file", "start-file", "file-loaded", "log-message".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key)?.as_str()
    }

    /// `end-file` only: "eof", "stop", "quit", "error" or "redirect".
    pub fn reason(&self) -> Option<&str> {
        self.str_field("reason")
    }

    /// `end-file` with reason "error" only.
    pub fn file_error(&self) -> Option<&str> {
        self.str_field("file_error")
    }

    /// `log-message` only.
    pub fn log_level(&self) -> Option<&str> {
        self.str_field("level")
    }

    pub fn log_prefix(&self) -> Option<&str> {
        self.str_field("prefix")
    }

    pub fn log_text(&self) -> Option<&str> {
        self.str_field("text").map(str::trim_end)
    }

    /// `start-file` and `end-file` only: the playlist entry the event is about.
    pub fn playlist_entry_id(&self) -> Option<u64> {
        self.raw.get("playlist_entry_id")?.as_u64()
    }
}

/// Cloneable handle to the mpv writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> anyhow::Result<Value> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg)?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow::anyhow!("mpv writer task gone"))?;

        tokio::time::timeout(tokio::time::Duration::from_secs(5), reply_rx)
            .await
            .map_err(|_| anyhow::anyhow!("mpv IPC timeout for req={}", req_id))?
            .map_err(|_| anyhow::anyhow!("mpv reply channel dropped req={}", req_id))?
    }

    /// True once the writer task has exited (socket closed or write failed).
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns the mpv child process.
pub struct MpvDriver {
    pub socket_name: String,
    binary: PathBuf,
    process: Option<tokio::process::Child>,
}

impl MpvDriver {
    pub fn new(binary: PathBuf) -> Self {
        Self {
            socket_name: tv_proto::platform::mpv_socket_name(),
            binary,
            process: None,
        }
    }

    /// Locate mpv beside the executable or on PATH.
    pub fn discover() -> Option<Self> {
        tv_proto::platform::find_mpv_binary().map(Self::new)
    }

    pub fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    if let Some(code) = status.code() {
                        warn!("mpv process exited with code: {}", code);
                    } else {
                        warn!("mpv process terminated by signal");
                    }
                    false
                }
                Err(e) => {
                    warn!("mpv process_alive check failed: {}", e);
                    false
                }
            }
        } else {
            false
        }
    }

    pub async fn kill(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let stderr_path = tv_proto::platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;
        info!("mpv: logging stderr to {:?}", stderr_path);

        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--title=tvdeck")
            .arg("--keep-open=no")
            .arg(tv_proto::platform::mpv_socket_arg())
            .arg("--quiet")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true);
        Ok(cmd)
    }

    #[cfg(unix)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        let socket_path = PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning {}", self.binary.display());
        let child = self.command()?.spawn()?;
        info!("mpv: spawned process with pid {:?}", child.id());
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let stream = UnixStream::connect(&socket_path).await?;
        info!("mpv: connected to IPC socket");
        let (read_half, write_half) = stream.into_split();
        Ok(start_io_tasks(read_half, write_half, event_tx))
    }

    #[cfg(windows)]
    pub async fn spawn_and_connect(
        &mut self,
        event_tx: mpsc::Sender<MpvEvent>,
    ) -> anyhow::Result<MpvHandle> {
        self.kill().await;

        info!("mpv: spawning {}", self.binary.display());
        let child = self.command()?.spawn()?;
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            match ClientOptions::new().open(&pipe_path) {
                Ok(client) => {
                    info!("mpv: connected to named pipe");
                    let (read_half, write_half) = tokio::io::split(client);
                    return Ok(start_io_tasks(read_half, write_half, event_tx));
                }
                Err(_) => continue,
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }
}

pub(crate) fn start_io_tasks<R, W>(
    read_half: R,
    write_half: W,
    event_tx: mpsc::Sender<MpvEvent>,
) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    // req_id → reply channel, inserted by the writer and resolved by the reader.
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(anyhow::anyhow!("{}", reason)));
    }
}

async fn reader_task<R>(
    mut reader: BufReader<R>,
    pending: PendingMap,
    event_tx: mpsc::Sender<MpvEvent>,
) where
    R: tokio::io::AsyncRead + Unpin,
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
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            debug!("mpv reader: response req={} ok", req_id);
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error").to_string();
                            debug!("mpv reader: response req={} err={}", req_id, err);
                            Err(anyhow::anyhow!("mpv error: {}", err))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                    }
                } else {
                    debug!("mpv reader: event {}", trimmed);
                    if event_tx.send(MpvEvent::new(val)).await.is_err() {
                        debug!("mpv reader: event receiver gone");
                        break;
                    }
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, &format!("mpv IPC read error: {}", e)).await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register before writing so the reader can match the reply.
        pending.lock().await.insert(req.req_id, req.reply);
        debug!(
            "mpv writer: send req={} payload={}",
            req.req_id,
            req.payload.trim()
        );
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(anyhow::anyhow!("mpv write error: {}", e)));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

// ── convenience wrappers ─────────────────────────────────────────────────────

impl MpvHandle {
    /// Replace whatever is playing with `url`.  Returns the playlist entry id
    /// mpv assigned, which its later events for this file carry.
    pub async fn load_stream(&self, url: &str) -> anyhow::Result<u64> {
        debug!("mpv: sending loadfile command for url={}", url);
        let reply = self.send(json!(["loadfile", url, "replace"])).await?;
        if let Some(id) = reply
            .pointer("/data/playlist_entry_id")
            .and_then(Value::as_u64)
        {
            return Ok(id);
        }
        // mpv before 0.38 does not report the entry; after `replace` it is the
        // only one in the playlist.
        let reply = self.send(json!(["get_property", "playlist/0/id"])).await?;
        reply
            .get("data")
            .and_then(Value::as_u64)
            .ok_or_else(|| anyhow::anyhow!("mpv reported no playlist entry for {}", url))
    }

    /// True when mpv has no file loaded.
    pub async fn is_idle(&self) -> anyhow::Result<bool> {
        let reply = self.send(json!(["get_property", "idle-active"])).await?;
        reply
            .get("data")
            .and_then(Value::as_bool)
            .ok_or_else(|| anyhow::anyhow!("mpv idle-active is not a bool"))
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(json!(["stop"])).await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> anyhow::Result<()> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }

    /// Flush the demuxer and decoder state without dropping the source.
    pub async fn drop_buffers(&self) -> anyhow::Result<()> {
        self.send(json!(["drop-buffers"])).await?;
        Ok(())
    }

    /// Apply per-session tuning.  Options that fail to apply are logged and
    /// skipped.
    pub async fn apply_tuning(&self, config: &EngineConfig) {
        if config.low_latency {
            if let Err(e) = self.send(json!(["apply-profile", "low-latency"])).await {
                warn!("mpv: low-latency profile failed: {}", e);
            }
        }
        let bitrate = config
            .initial_bandwidth_estimate
            .map(|bps| bps.to_string())
            .unwrap_or_else(|| "max".to_string());
        if let Err(e) = self
            .send(json!(["set_property", "hls-bitrate", bitrate]))
            .await
        {
            warn!("mpv: hls-bitrate={} failed: {}", bitrate, e);
        }
    }

    /// Ask mpv to forward its own log lines at `level` and above.
    pub async fn request_log_messages(&self, level: &str) {
        match self.send(json!(["request_log_messages", level])).await {
            Ok(_) => debug!("mpv: log messages at {} requested", level),
            Err(e) => warn!("mpv: request_log_messages failed: {}", e),
        }
    }
}
