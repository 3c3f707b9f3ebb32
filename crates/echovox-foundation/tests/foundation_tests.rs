//! Foundation crate tests
//!
//! Tests cover:
//! - Error types (AppError, AudioError, SessionError) and recovery mapping
//! - Session state machine transitions

use echovox_foundation::error::{AppError, AudioError, RecoveryStrategy, SessionError};
use echovox_foundation::state::{SessionState, StateManager};

// ─── Error Type Tests ───────────────────────────────────────────────

#[test]
fn audio_error_device_not_found() {
    let err = AudioError::DeviceNotFound {
        name: Some("pipewire_mic".to_string()),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("pipewire_mic"));
}

#[test]
fn audio_error_capture_overflow() {
    let err = AudioError::CaptureOverflow { count: 2048 };
    let msg = format!("{}", err);
    assert!(msg.contains("2048"));
}

#[test]
fn session_error_malformed_payload() {
    let err = SessionError::MalformedPayload("invalid base64".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("invalid base64"));
}

#[test]
fn app_error_from_audio_error() {
    let err: AppError = AudioError::DeviceDisconnected.into();
    assert!(matches!(err, AppError::Audio(_)));
}

#[test]
fn app_error_from_session_error() {
    let err: AppError = SessionError::TransportClosed.into();
    assert!(matches!(err, AppError::Session(_)));
}

#[test]
fn malformed_payload_is_ignored_not_fatal() {
    let err: AppError = SessionError::MalformedPayload("short read".to_string()).into();
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Ignore));
}

#[test]
fn device_disconnect_retries() {
    let err: AppError = AudioError::DeviceDisconnected.into();
    match err.recovery_strategy() {
        RecoveryStrategy::Retry { max_attempts, .. } => assert_eq!(max_attempts, 5),
        other => panic!("expected Retry, got {:?}", other),
    }
}

#[test]
fn shutdown_is_fatal() {
    assert!(matches!(
        AppError::ShutdownRequested.recovery_strategy(),
        RecoveryStrategy::Fatal
    ));
}

// ─── State Machine Tests ────────────────────────────────────────────

#[test]
fn full_session_lifecycle() {
    let mgr = StateManager::new();
    assert_eq!(mgr.current(), SessionState::Initializing);

    mgr.transition(SessionState::Connecting).unwrap();
    mgr.transition(SessionState::Streaming).unwrap();
    mgr.transition(SessionState::Stopping).unwrap();
    mgr.transition(SessionState::Stopped).unwrap();
    assert_eq!(mgr.current(), SessionState::Stopped);
}

#[test]
fn recovery_loops_back_to_connecting() {
    let mgr = StateManager::new();
    mgr.transition(SessionState::Connecting).unwrap();
    mgr.transition(SessionState::Streaming).unwrap();
    mgr.transition(SessionState::Recovering {
        from_error: "transport closed".into(),
    })
    .unwrap();
    mgr.transition(SessionState::Connecting).unwrap();
    assert_eq!(mgr.current(), SessionState::Connecting);
}

#[test]
fn invalid_transition_rejected() {
    let mgr = StateManager::new();
    let err = mgr.transition(SessionState::Stopped);
    assert!(err.is_err());
    assert_eq!(mgr.current(), SessionState::Initializing);
}

#[test]
fn subscribers_observe_transitions() {
    let mgr = StateManager::new();
    let rx = mgr.subscribe();
    mgr.transition(SessionState::Connecting).unwrap();
    mgr.transition(SessionState::Streaming).unwrap();
    assert_eq!(rx.try_recv().unwrap(), SessionState::Connecting);
    assert_eq!(rx.try_recv().unwrap(), SessionState::Streaming);
}
