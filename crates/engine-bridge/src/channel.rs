//! Channel to one external UCI engine process (async I/O).
//!
//! The engine speaks a line protocol with no request identifiers, so
//! responses are correlated purely by arrival order: incoming lines are
//! handed to registered listeners in FIFO order, one line per listener,
//! and a listener that has not seen its terminating line re-queues
//! itself. Callers above the channel keep requests serialized.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// What a listener wants the channel to do with it after a line.
pub enum Listen {
    /// The listener saw its terminating line; drop it.
    Done,
    /// The line was not terminal; keep the listener queued.
    Again,
}

/// One-shot line listener. Invoked with each arriving output line until
/// it returns [`Listen::Done`].
pub type LineListener = Box<dyn FnMut(&str) -> Listen + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelStatus {
    Uninitialized,
    Ready,
    Crashed,
}

struct ChannelState {
    status: ChannelStatus,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    listeners: VecDeque<LineListener>,
    /// Bumped on every spawn/teardown so stale reader tasks ignore the
    /// state of a later incarnation.
    generation: u64,
}

/// Owns the lifecycle of one engine process: spawn, handshake, command
/// writes, line dispatch, crash detection, teardown.
pub struct EngineChannel {
    config: EngineConfig,
    state: Arc<Mutex<ChannelState>>,
}

impl EngineChannel {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(ChannelState {
                status: ChannelStatus::Uninitialized,
                child: None,
                stdin: None,
                listeners: VecDeque::new(),
                generation: 0,
            })),
        }
    }

    /// Spawn the engine process (unless already ready) and run the UCI
    /// handshake. On `uciok` the channel becomes ready and a
    /// `ucinewgame` reset is issued. No-op when already ready.
    pub async fn start(&self) -> Result<(), EngineError> {
        let handshake = {
            let mut state = self.state.lock().await;
            if state.status == ChannelStatus::Ready && state.child.is_some() {
                return Ok(());
            }
            // A process left over from a failed handshake or crash is stale.
            if state.child.is_some() {
                teardown(&mut state, ChannelStatus::Uninitialized);
            }

            let mut child = Command::new(&self.config.engine_path)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| EngineError::SpawnFailed(e.to_string()))?;

            let stdin = child.stdin.take().unwrap();
            let stdout = child.stdout.take().unwrap();

            state.generation += 1;
            state.status = ChannelStatus::Uninitialized;
            state.child = Some(child);
            state.stdin = Some(stdin);
            spawn_reader(Arc::clone(&self.state), stdout, state.generation);

            let (tx, rx) = oneshot::channel();
            let mut tx = Some(tx);
            state.listeners.push_back(Box::new(move |line| {
                if line == "uciok" {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                    Listen::Done
                } else {
                    Listen::Again
                }
            }));
            rx
        };

        self.send("uci").await;

        match timeout(self.config.startup_timeout, handshake).await {
            Ok(Ok(())) => Ok(()),
            // Listener dropped without firing: the process died mid-handshake.
            Ok(Err(_)) => Err(EngineError::Crashed),
            Err(_) => {
                warn!("engine handshake timed out, channel left not ready");
                Err(EngineError::StartupTimeout)
            }
        }
    }

    /// Write one command line to the engine. Warns and does nothing when
    /// no process is attached; a failed write counts as a crash.
    pub async fn send(&self, cmd: &str) {
        let mut state = self.state.lock().await;
        if state.stdin.is_none() {
            warn!(cmd, "no engine process to send command to");
            return;
        }
        if !write_line(&mut state, cmd).await {
            warn!(cmd, "failed to write to engine, tearing down");
            teardown(&mut state, ChannelStatus::Crashed);
        }
    }

    /// Register a listener for upcoming output lines.
    pub async fn listen(&self, listener: LineListener) {
        self.state.lock().await.listeners.push_back(listener);
    }

    /// Convenience: a one-shot receiver for the next output line. The
    /// receiver fails if the engine crashes before a line arrives.
    pub async fn next_message(&self) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        self.listen(Box::new(move |line| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(line.to_string());
            }
            Listen::Done
        }))
        .await;
        rx
    }

    pub async fn status(&self) -> ChannelStatus {
        self.state.lock().await.status
    }

    pub async fn is_ready(&self) -> bool {
        self.status().await == ChannelStatus::Ready
    }

    /// Tear down the process and all pending listeners. Safe to call
    /// when already stopped.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        teardown(&mut state, ChannelStatus::Uninitialized);
    }
}

/// Write one line + flush to the engine's stdin. Returns false on I/O failure.
async fn write_line(state: &mut ChannelState, cmd: &str) -> bool {
    let Some(stdin) = state.stdin.as_mut() else {
        return false;
    };
    debug!(cmd, "engine <");
    let write = stdin.write_all(format!("{cmd}\n").as_bytes()).await;
    write.is_ok() && stdin.flush().await.is_ok()
}

/// Hand one line to the front listener, re-queuing it if not done.
fn dispatch(state: &mut ChannelState, line: &str) {
    if let Some(mut listener) = state.listeners.pop_front() {
        if matches!(listener(line), Listen::Again) {
            state.listeners.push_back(listener);
        }
    }
}

/// Kill and forget the process, drop every pending listener without
/// invoking it, and move to the given status.
fn teardown(state: &mut ChannelState, status: ChannelStatus) {
    if let Some(mut child) = state.child.take() {
        let _ = child.start_kill();
    }
    state.stdin = None;
    state.listeners.clear();
    state.status = status;
    state.generation += 1;
}

/// Background task reading engine output lines until EOF or error.
fn spawn_reader(state: Arc<Mutex<ChannelState>>, stdout: ChildStdout, generation: u64) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break, // EOF: process exited
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let mut st = state.lock().await;
                    if st.generation != generation {
                        return; // channel was restarted underneath us
                    }
                    debug!(line = trimmed, "engine >");
                    if trimmed == "uciok" && st.status != ChannelStatus::Ready {
                        st.status = ChannelStatus::Ready;
                        if !write_line(&mut st, "ucinewgame").await {
                            teardown(&mut st, ChannelStatus::Crashed);
                            return;
                        }
                    }
                    dispatch(&mut st, trimmed);
                }
                Err(e) => {
                    warn!(error = %e, "failed to read from engine");
                    break;
                }
            }
        }
        let mut st = state.lock().await;
        if st.generation == generation {
            warn!("engine process terminated unexpectedly");
            teardown(&mut st, ChannelStatus::Crashed);
        }
    });
}

impl Drop for EngineChannel {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        if let Ok(mut state) = self.state.try_lock() {
            if let Some(child) = state.child.as_mut() {
                let _ = child.start_kill();
            }
        }
    }
}
