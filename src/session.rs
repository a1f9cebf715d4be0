//! Completion session: last-request-wins over an engine.
//!
//! Each keystroke starts a new request. Starting one aborts whatever request
//! is still in flight (its generator subprocess is killed on drop), and a
//! request that finishes after a newer one started reports `None` instead of
//! stale suggestions.

use crate::engine::CompletionEngine;
use crate::slog_debug;
use crate::suggestion::Suggestion;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;

/// The newest request: its ticket and a handle to abort it
struct InFlight {
    ticket: u64,
    handle: AbortHandle,
}

pub struct CompletionSession {
    engine: Arc<CompletionEngine>,
    generation: AtomicU64,
    // Tickets are issued while this lock is held, so the slot only ever
    // moves forward to newer requests.
    in_flight: Mutex<Option<InFlight>>,
}

impl CompletionSession {
    pub fn new(engine: Arc<CompletionEngine>) -> Self {
        Self {
            engine,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Complete `line` at `cursor_pos`. Returns `None` when a newer request
    /// superseded this one.
    pub async fn request(&self, line: &str, cursor_pos: usize) -> Option<Vec<Suggestion>> {
        let engine = Arc::clone(&self.engine);
        let line = line.to_string();

        let (ticket, handle) = {
            let mut slot = self.in_flight.lock().ok()?;
            let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let handle = tokio::spawn(async move { engine.complete(&line, cursor_pos).await });
            if let Some(previous) = slot.replace(InFlight {
                ticket,
                handle: handle.abort_handle(),
            }) {
                previous.handle.abort();
            }
            (ticket, handle)
        };

        let result = handle.await;

        if let Ok(mut slot) = self.in_flight.lock() {
            if slot.as_ref().is_some_and(|current| current.ticket == ticket) {
                slot.take();
            }
        }

        if self.generation.load(Ordering::SeqCst) != ticket {
            slog_debug!("SESSION", "stale_result_dropped", json!({ "ticket": ticket }));
            return None;
        }
        result.ok()
    }

    /// Abandon the in-flight request, if any
    pub fn cancel(&self) {
        if let Ok(mut slot) = self.in_flight.lock() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(previous) = slot.take() {
                previous.handle.abort();
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::generator::{Generator, PostProcess};
    use crate::spec_model::{ArgSpec, CompletionSpec};
    use std::time::Duration;

    fn slow_engine() -> Arc<CompletionEngine> {
        let mut config = EngineConfig::default();
        config.cache_ttl_ms = 0;
        let mut engine = CompletionEngine::empty(config);
        engine.register(
            CompletionSpec::new("tool", "tool").arg(
                ArgSpec::new("item").generator(Generator::new("sleep 0.3; echo item", PostProcess::Lines)),
            ),
        );
        Arc::new(engine)
    }

    #[tokio::test]
    async fn test_single_request_completes() {
        let session = CompletionSession::new(slow_engine());
        let items = session.request("tool ", 5).await.unwrap();
        assert_eq!(items[0].name, "item");
    }

    #[tokio::test]
    async fn test_newer_request_wins() {
        let session = Arc::new(CompletionSession::new(slow_engine()));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.request("tool ", 5).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = session.request("tool i", 6).await;

        assert_eq!(first.await.unwrap(), None);
        let second = second.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "item");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_simultaneous_requests_keep_the_newest() {
        let mut config = EngineConfig::default();
        config.cache_ttl_ms = 0;
        let mut engine = CompletionEngine::empty(config);
        engine.register(
            CompletionSpec::new("tool", "tool")
                .arg(ArgSpec::new("item").generator(Generator::new("echo item", PostProcess::Lines))),
        );
        let session = Arc::new(CompletionSession::new(Arc::new(engine)));

        for _ in 0..50 {
            let barrier = Arc::new(tokio::sync::Barrier::new(2));
            let racers: Vec<_> = (0..2)
                .map(|_| {
                    let session = Arc::clone(&session);
                    let barrier = Arc::clone(&barrier);
                    tokio::spawn(async move {
                        barrier.wait().await;
                        session.request("tool ", 5).await
                    })
                })
                .collect();

            let mut answered = 0;
            for racer in racers {
                if racer.await.unwrap().is_some() {
                    answered += 1;
                }
            }
            assert!(answered >= 1, "the newest request must always be answered");
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight() {
        let session = Arc::new(CompletionSession::new(slow_engine()));
        let pending = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.request("tool ", 5).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.cancel();
        assert_eq!(pending.await.unwrap(), None);
    }
}
