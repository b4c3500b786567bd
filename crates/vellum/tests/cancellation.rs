//! Superseded and released sessions never leak into the current status.

mod helpers;

use helpers::manual_loader;
use std::time::Duration;
use vellum::{LoadError, LoadRequest, SessionEvent, StatusKind};

#[tokio::test]
async fn test_superseded_session_is_destroyed_and_ignored() {
    let (mut loader, engine) = manual_loader();
    let token_a = loader.load(LoadRequest::new("a.pdf"));
    let session_a = engine.latest();

    session_a.report_progress(40, 100);
    loader.step().await;

    let token_b = loader.load(LoadRequest::new("b.pdf"));
    assert_ne!(token_a, token_b);
    assert!(session_a.is_destroyed());
    tokio::time::timeout(Duration::from_secs(1), session_a.destroyed())
        .await
        .expect("old session should be released");

    let mut receiver = loader.subscribe();
    session_a.resolve("A".to_string());
    session_a.reject(LoadError::new("X", "late failure"));
    assert!(!loader.apply(token_a, SessionEvent::Resolved("A".to_string())));
    assert!(!loader.apply(token_a, SessionEvent::Rejected(LoadError::new("X", "late"))));

    assert_eq!(loader.status().percentages(), Some(0.0));
    assert!(!receiver.has_changed().unwrap());

    let session_b = engine.latest();
    session_b.report_progress(100, 100);
    session_b.resolve("B".to_string());
    loader.settle().await;
    assert_eq!(loader.document().map(String::as_str), Some("B"));
}

#[tokio::test]
async fn test_only_latest_of_many_requests_survives() {
    let (mut loader, engine) = manual_loader();
    for name in ["a.pdf", "b.pdf", "c.pdf", "d.pdf"] {
        loader.load(LoadRequest::new(name));
    }

    assert_eq!(engine.sessions_created(), 4);
    for index in 0..3 {
        assert!(engine.session(index).is_destroyed(), "session {} should be released", index);
    }
    assert!(!engine.session(3).is_destroyed());
}

#[tokio::test]
async fn test_unmount_releases_session_and_ignores_events() {
    let (mut loader, engine) = manual_loader();
    let token = loader.load(LoadRequest::new("a.pdf"));
    let handle = engine.latest();

    loader.unmount();
    assert!(!loader.is_mounted());
    assert!(handle.is_destroyed());

    handle.report_progress(100, 100);
    handle.resolve("A".to_string());
    assert!(!loader.apply(token, SessionEvent::Resolved("A".to_string())));
    assert!(!loader.step().await);
    assert_eq!(loader.status().kind(), StatusKind::Loading);
}

#[tokio::test]
async fn test_rejection_after_unmount_is_suppressed() {
    let (mut loader, engine) = manual_loader();
    let token = loader.load(LoadRequest::new("a.pdf"));
    let handle = engine.latest();

    loader.unmount();
    handle.reject(LoadError::new("UnknownErrorException", "Worker was destroyed"));

    assert!(!loader.apply(token, SessionEvent::Rejected(LoadError::new("X", "destroyed"))));
    assert_ne!(loader.status().kind(), StatusKind::Failed);
}

#[tokio::test]
async fn test_reload_after_unmount_mounts_again() {
    let (mut loader, engine) = manual_loader();
    loader.load(LoadRequest::new("a.pdf"));
    loader.unmount();

    loader.load(LoadRequest::new("a.pdf"));
    assert!(loader.is_mounted());

    let handle = engine.latest();
    handle.report_progress(100, 100);
    handle.resolve("again".to_string());
    loader.settle().await;
    assert_eq!(loader.status().kind(), StatusKind::Completed);
}

#[tokio::test]
async fn test_dropping_loader_releases_session() {
    let (mut loader, engine) = manual_loader();
    loader.load(LoadRequest::new("a.pdf"));
    let handle = engine.latest();

    drop(loader);
    assert!(handle.is_destroyed());
}

#[tokio::test]
async fn test_engine_worker_is_aborted_on_supersede() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use vellum::plugins::Plugin;
    use vellum::{DocumentEngine, DocumentLoader, EngineSession, Result};

    struct SlowEngine {
        finished: Arc<AtomicBool>,
    }

    impl Plugin for SlowEngine {
        fn name(&self) -> &str {
            "slow"
        }

        fn version(&self) -> String {
            "0.0.0".to_string()
        }
    }

    impl DocumentEngine for SlowEngine {
        type Document = ();

        fn create_session(&self, _request: &LoadRequest) -> Result<EngineSession<()>> {
            let (session, handle) = EngineSession::channel("slow");
            let finished = Arc::clone(&self.finished);
            let worker = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                finished.store(true, Ordering::SeqCst);
                handle.resolve(());
            });
            Ok(session.with_worker(worker))
        }
    }

    let finished = Arc::new(AtomicBool::new(false));
    let mut loader = DocumentLoader::new(Arc::new(SlowEngine {
        finished: Arc::clone(&finished),
    }));

    loader.load(LoadRequest::new("a.pdf"));
    loader.unmount();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}
