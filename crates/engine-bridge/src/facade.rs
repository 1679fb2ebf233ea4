//! Request/response operations on top of the raw engine channel.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channel::{EngineChannel, Listen};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Sentinel magnitude for forced-mate evaluations, in pawn units.
pub const MATE_SCORE: f64 = 100.0;

/// The two semantic operations the rest of the system needs from an
/// engine, plus lifecycle and strength control. Implemented by
/// [`EngineFacade`]; tests substitute stubs.
#[allow(async_fn_in_trait)]
pub trait ChessEngine {
    /// Start the engine if it is not running yet.
    async fn ensure_ready(&self) -> Result<(), EngineError>;

    /// Best move for a position in UCI notation; None when the engine
    /// is unavailable, finds no move, or the search times out.
    async fn best_move(&self, fen: &str, depth: u32) -> Option<String>;

    /// Evaluation in pawn units from the side to move's perspective.
    /// Never fails: a stalled or unready engine yields a neutral score.
    async fn evaluate(&self, fen: &str, depth: u32) -> f64;

    /// Clamp a playing-strength level to 1..=20 and apply it; returns
    /// the level in effect.
    async fn set_difficulty(&self, level: u8) -> u8;
}

impl<T: ChessEngine> ChessEngine for std::sync::Arc<T> {
    async fn ensure_ready(&self) -> Result<(), EngineError> {
        (**self).ensure_ready().await
    }

    async fn best_move(&self, fen: &str, depth: u32) -> Option<String> {
        (**self).best_move(fen, depth).await
    }

    async fn evaluate(&self, fen: &str, depth: u32) -> f64 {
        (**self).evaluate(fen, depth).await
    }

    async fn set_difficulty(&self, level: u8) -> u8 {
        (**self).set_difficulty(level).await
    }
}

/// Serialized best-move / evaluation requests over one [`EngineChannel`].
pub struct EngineFacade {
    channel: EngineChannel,
    config: EngineConfig,
    difficulty: StdMutex<Option<u8>>,
    /// One outstanding engine request at a time: the line protocol has
    /// no request identifiers, so interleaved searches would have their
    /// responses misattributed.
    gate: Mutex<()>,
}

impl EngineFacade {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            channel: EngineChannel::new(config.clone()),
            config,
            difficulty: StdMutex::new(None),
            gate: Mutex::new(()),
        }
    }

    /// The underlying channel, mainly for lifecycle inspection.
    pub fn channel(&self) -> &EngineChannel {
        &self.channel
    }

    async fn send_difficulty(&self, level: u8) {
        self.channel
            .send(&format!("setoption name Skill Level value {level}"))
            .await;
        // Below level 15 also widen the intentional error margin so low
        // levels play weaker and less deterministically.
        if level < 15 {
            let err = 100 - u32::from(level) * 4;
            self.channel
                .send(&format!("setoption name Skill Level Maximum Error value {err}"))
                .await;
        }
    }
}

impl ChessEngine for EngineFacade {
    async fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.channel.is_ready().await {
            return Ok(());
        }
        self.channel.start().await?;
        // Difficulty is remembered across restarts and re-applied here.
        let remembered = *self.difficulty.lock().unwrap();
        if let Some(level) = remembered {
            self.send_difficulty(level).await;
        }
        Ok(())
    }

    async fn best_move(&self, fen: &str, depth: u32) -> Option<String> {
        if !self.channel.is_ready().await {
            if let Err(e) = self.ensure_ready().await {
                warn!(error = %e, "engine unavailable, skipping best-move search");
                return None;
            }
        }

        let _turn = self.gate.lock().await;

        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        self.channel
            .listen(Box::new(move |line| {
                let Some(rest) = line.strip_prefix("bestmove") else {
                    return Listen::Again;
                };
                let mv = rest.split_whitespace().next().map(str::to_string);
                if let Some(tx) = tx.take() {
                    let _ = tx.send(mv);
                }
                Listen::Done
            }))
            .await;

        self.channel.send("ucinewgame").await;
        self.channel.send(&format!("position fen {fen}")).await;
        self.channel.send(&format!("go depth {depth}")).await;

        match timeout(self.config.best_move_timeout, rx).await {
            Ok(Ok(Some(mv))) if mv != "(none)" => Some(mv),
            Ok(Ok(_)) => None,
            // The crash teardown dropped our listener.
            Ok(Err(_)) => None,
            Err(_) => {
                // Stop the search; the listener stays queued and will
                // swallow the trailing bestmove instead of desyncing
                // the next request.
                warn!("best-move search timed out, forcing stop");
                self.channel.send("stop").await;
                None
            }
        }
    }

    async fn evaluate(&self, fen: &str, depth: u32) -> f64 {
        if !self.channel.is_ready().await {
            warn!("engine not ready, skipping evaluation");
            return 0.0;
        }

        let _turn = self.gate.lock().await;

        let score = Arc::new(StdMutex::new(0.0f64));
        let seen = Arc::clone(&score);
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        self.channel
            .listen(Box::new(move |line| {
                if line.starts_with("info") {
                    if let Some(cp) = parse_cp(line) {
                        *seen.lock().unwrap() = f64::from(cp) / 100.0;
                    } else if let Some(mate) = parse_mate(line) {
                        *seen.lock().unwrap() = if mate > 0 { MATE_SCORE } else { -MATE_SCORE };
                    }
                }
                if line.starts_with("bestmove") {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(*seen.lock().unwrap());
                    }
                    Listen::Done
                } else {
                    Listen::Again
                }
            }))
            .await;

        self.channel.send(&format!("position fen {fen}")).await;
        self.channel.send(&format!("go depth {depth}")).await;

        match timeout(self.config.eval_timeout, rx).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => *score.lock().unwrap(),
            Err(_) => {
                debug!("evaluation timed out, returning best score seen");
                self.channel.send("stop").await;
                *score.lock().unwrap()
            }
        }
    }

    async fn set_difficulty(&self, level: u8) -> u8 {
        let level = level.clamp(1, 20);
        *self.difficulty.lock().unwrap() = Some(level);
        if self.channel.is_ready().await {
            self.send_difficulty(level).await;
        }
        info!(level, "difficulty set");
        level
    }
}

/// Parse centipawn score from an info line
fn parse_cp(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "cp" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse mate score from an info line
fn parse_mate(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "mate" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}
