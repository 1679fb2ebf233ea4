//! Integration tests for the engine channel: process lifecycle,
//! handshake, FIFO line dispatch, crash handling.

mod common;

use std::time::{Duration, Instant};

use engine_bridge::{ChannelStatus, EngineChannel, EngineConfig, EngineError};

use common::{FakeEngine, MUTE, RESPONSIVE};

/// Give the fake engine a moment to process commands already written.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_start_handshake_marks_ready_and_resets_session() {
    let fake = FakeEngine::create("handshake", RESPONSIVE);
    let channel = EngineChannel::new(fake.config());

    channel.start().await.expect("handshake should succeed");
    assert!(channel.is_ready().await);
    assert_eq!(channel.status().await, ChannelStatus::Ready);

    settle().await;
    let commands = fake.commands();
    assert_eq!(commands[0], "uci");
    assert!(commands.contains(&"ucinewgame".to_string()));
}

#[tokio::test]
async fn test_start_is_idempotent_when_ready() {
    let fake = FakeEngine::create("idempotent", RESPONSIVE);
    let channel = EngineChannel::new(fake.config());

    channel.start().await.unwrap();
    channel.start().await.unwrap();
    settle().await;

    // Only one handshake took place.
    let uci_count = fake.commands().iter().filter(|c| *c == "uci").count();
    assert_eq!(uci_count, 1);
}

#[tokio::test]
async fn test_spawn_failure() {
    let config = EngineConfig {
        engine_path: "/nonexistent/engine-binary".to_string(),
        ..EngineConfig::default()
    };
    let channel = EngineChannel::new(config);
    assert!(matches!(
        channel.start().await,
        Err(EngineError::SpawnFailed(_))
    ));
    assert!(!channel.is_ready().await);
}

#[tokio::test]
async fn test_startup_timeout_on_silent_engine() {
    let fake = FakeEngine::create("silent", MUTE);
    let mut config = fake.config();
    config.startup_timeout = Duration::from_millis(300);
    let channel = EngineChannel::new(config);

    let began = Instant::now();
    let result = channel.start().await;
    let elapsed = began.elapsed();

    assert!(matches!(result, Err(EngineError::StartupTimeout)));
    assert!(!channel.is_ready().await);
    // Not before the deadline, and nowhere near hanging forever.
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn test_listeners_fire_in_fifo_order() {
    let fake = FakeEngine::create("fifo", RESPONSIVE);
    let channel = EngineChannel::new(fake.config());
    channel.start().await.unwrap();

    // Two listeners registered before the lines arrive: the first must
    // get the first line, the second the second line.
    let first = channel.next_message().await;
    let second = channel.next_message().await;
    channel.send("go depth 1").await;

    let line1 = first.await.unwrap();
    let line2 = second.await.unwrap();
    assert!(line1.starts_with("info"), "got: {line1}");
    assert!(line2.starts_with("bestmove"), "got: {line2}");
}

#[tokio::test]
async fn test_crash_discards_listeners_without_invoking_them() {
    let fake = FakeEngine::create("crash", RESPONSIVE);
    let channel = EngineChannel::new(fake.config());
    channel.start().await.unwrap();

    let pending = channel.next_message().await;
    channel.send("die").await;

    // The listener is dropped, not resolved.
    assert!(pending.await.is_err());
    assert_eq!(channel.status().await, ChannelStatus::Crashed);
}

#[tokio::test]
async fn test_restart_after_crash() {
    let fake = FakeEngine::create("restart", RESPONSIVE);
    let channel = EngineChannel::new(fake.config());
    channel.start().await.unwrap();

    channel.send("die").await;
    settle().await;
    assert_eq!(channel.status().await, ChannelStatus::Crashed);

    // No automatic restart: the next caller starts explicitly.
    channel.start().await.expect("restart should succeed");
    assert!(channel.is_ready().await);
}

#[tokio::test]
async fn test_stop_is_safe_and_send_becomes_noop() {
    let fake = FakeEngine::create("stop", RESPONSIVE);
    let channel = EngineChannel::new(fake.config());
    channel.start().await.unwrap();

    channel.stop().await;
    assert_eq!(channel.status().await, ChannelStatus::Uninitialized);
    channel.stop().await; // already stopped

    // Sending without a process warns and does nothing.
    channel.send("go depth 1").await;
    assert_eq!(channel.status().await, ChannelStatus::Uninitialized);
}
