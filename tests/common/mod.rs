#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use engine_bridge::{ChessEngine, EngineConfig, EngineError};

/// Generate a unique suffix based on timestamp to avoid collisions.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

// ---------------------------------------------------------------------------
// Scripted fake UCI engine
// ---------------------------------------------------------------------------

/// Case-statement body for an engine that handshakes and answers every
/// search with a fixed cp score and best move. `die` makes it exit.
pub const RESPONSIVE: &str = r#"    uci) echo "id name fakefish"; echo "uciok" ;;
    go*) echo "info depth 15 score cp 23 pv e2e4"; echo "bestmove e2e4" ;;
    die) exit 1 ;;"#;

/// Handshakes, then stays silent on every search.
pub const SILENT_SEARCH: &str = r#"    uci) echo "uciok" ;;"#;

/// Never says anything at all.
pub const MUTE: &str = r#"    noop) : ;;"#;

/// Handshakes, reports a forced mate for the side to move.
pub const MATE_FOR: &str = r#"    uci) echo "uciok" ;;
    go*) echo "info depth 15 score mate 3 pv h5f7"; echo "bestmove h5f7" ;;"#;

/// Handshakes, reports a forced mate against the side to move.
pub const MATE_AGAINST: &str = r#"    uci) echo "uciok" ;;
    go*) echo "info depth 15 score mate -3 pv e8e7"; echo "bestmove e8e7" ;;"#;

/// Handshakes, finds no move.
pub const NO_MOVE: &str = r#"    uci) echo "uciok" ;;
    go*) echo "bestmove (none)" ;;"#;

/// Handshakes, emits one score line and then hangs without bestmove.
pub const EVAL_THEN_HANG: &str = r#"    uci) echo "uciok" ;;
    go*) echo "info depth 15 score cp 55 pv e2e4" ;;"#;

/// A fake UCI engine: a shell script that logs every received command
/// and answers according to a case body.
pub struct FakeEngine {
    pub script_path: PathBuf,
    pub log_path: PathBuf,
}

impl FakeEngine {
    pub fn create(name: &str, cases: &str) -> Self {
        let dir = std::env::temp_dir();
        let suffix = unique_suffix();
        let script_path = dir.join(format!("fake-engine-{name}-{suffix}.sh"));
        let log_path = dir.join(format!("fake-engine-{name}-{suffix}.log"));

        let script = format!(
            "#!/bin/sh\nlog=\"{log}\"\nwhile IFS= read -r cmd; do\n  printf '%s\\n' \"$cmd\" >> \"$log\"\n  case \"$cmd\" in\n{cases}\n  esac\ndone\n",
            log = log_path.display(),
        );
        fs::write(&script_path, script).expect("write fake engine script");
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))
            .expect("chmod fake engine script");

        Self {
            script_path,
            log_path,
        }
    }

    /// Config pointing at this fake engine, with timeouts short enough
    /// for tests.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            engine_path: self.script_path.display().to_string(),
            startup_timeout: Duration::from_secs(5),
            best_move_timeout: Duration::from_secs(5),
            eval_timeout: Duration::from_secs(5),
        }
    }

    /// Every command the engine has received so far.
    pub fn commands(&self) -> Vec<String> {
        fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.script_path);
        let _ = fs::remove_file(&self.log_path);
    }
}

// ---------------------------------------------------------------------------
// Stub engine for pipeline/session tests
// ---------------------------------------------------------------------------

/// Scriptable in-process engine: fixed or queued evaluations, queued
/// best-move replies, and full call recording.
#[derive(Default)]
pub struct StubEngine {
    /// Evaluation returned once `evals` runs out.
    pub eval: f64,
    pub evals: Mutex<VecDeque<f64>>,
    /// Best-move replies, served in order; empty queue falls back to
    /// `fixed_best`.
    pub replies: Mutex<VecDeque<String>>,
    pub fixed_best: Option<String>,
    pub best_calls: Mutex<Vec<String>>,
    pub eval_calls: Mutex<Vec<String>>,
    pub difficulty: Mutex<Option<u8>>,
}

impl StubEngine {
    pub fn with_eval(eval: f64) -> Self {
        Self {
            eval,
            fixed_best: Some("e2e4".to_string()),
            ..Self::default()
        }
    }

    pub fn with_eval_sequence(seq: &[f64]) -> Self {
        Self {
            eval: *seq.last().unwrap_or(&0.0),
            evals: Mutex::new(seq.iter().copied().collect()),
            fixed_best: Some("e2e4".to_string()),
            ..Self::default()
        }
    }

    pub fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Self::default()
        }
    }
}

impl ChessEngine for StubEngine {
    async fn ensure_ready(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn best_move(&self, fen: &str, _depth: u32) -> Option<String> {
        self.best_calls.lock().unwrap().push(fen.to_string());
        let queued = self.replies.lock().unwrap().pop_front();
        queued.or_else(|| self.fixed_best.clone())
    }

    async fn evaluate(&self, fen: &str, _depth: u32) -> f64 {
        self.eval_calls.lock().unwrap().push(fen.to_string());
        self.evals.lock().unwrap().pop_front().unwrap_or(self.eval)
    }

    async fn set_difficulty(&self, level: u8) -> u8 {
        let level = level.clamp(1, 20);
        *self.difficulty.lock().unwrap() = Some(level);
        level
    }
}
