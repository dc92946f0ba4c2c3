//! Trace channel registry.
//!
//! Binds a trace id to the live channel of the client that asked for it.
//! Progress events tagged with a trace id are pushed to that channel; when
//! nothing is bound they are dropped, there is no buffering or replay.
//!
//! The registry only keeps a weak handle to each channel. The connection
//! task owns the channel and its lifetime.
//!
//! # Usage
//!
//! ```ignore
//! let trace_id = registry.create_trace();
//!
//! // Connection task:
//! let (tx, rx) = mpsc::unbounded_channel();
//! registry.register(&trace_id, &tx);
//!
//! // Request handler:
//! registry.wait_for_channel(&trace_id, Duration::from_secs(30)).await?;
//! registry.dispatch(&trace_id, json!({"msg": "Fetching"})).ok();
//! registry.close(&trace_id);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::debug;
use uuid::Uuid;

/// Message pushed down a client channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// A log line, forwarded verbatim
    Event(serde_json::Value),
    /// The job is over; the connection should close
    Close,
}

/// Sending half of a client channel.
pub type ChannelHandle = mpsc::UnboundedSender<ChannelMessage>;

/// No live channel is registered under the trace id.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no channel registered for trace {trace_id}")]
pub struct ChannelUnavailable {
    pub trace_id: String,
}

impl ChannelUnavailable {
    fn new(trace_id: &str) -> Self {
        Self {
            trace_id: trace_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// Trace id handed out, no channel yet
    Pending,
    /// A channel is registered
    Bound,
    /// The channel disconnected
    Closed,
}

struct TraceSession {
    channel: Option<mpsc::WeakUnboundedSender<ChannelMessage>>,
    state: TraceState,
    bound: watch::Sender<bool>,
}

impl TraceSession {
    fn new() -> Self {
        Self {
            channel: None,
            state: TraceState::Pending,
            bound: watch::channel(false).0,
        }
    }

    fn live_channel(&self) -> Option<ChannelHandle> {
        self.channel.as_ref().and_then(|weak| weak.upgrade())
    }
}

/// Trace id → client channel registry.
///
/// Thread-safe, cloneable. Uses a blocking lock so the tracing layer can
/// dispatch from synchronous code; no method logs while holding it.
#[derive(Clone, Default)]
pub struct TraceRegistry {
    sessions: Arc<RwLock<HashMap<String, TraceSession>>>,
}

impl TraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh trace id.
    pub fn create_trace(&self) -> String {
        let trace_id = Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(trace_id.clone(), TraceSession::new());
        debug!(trace_id = %trace_id, "Created trace");
        trace_id
    }

    /// Bind `channel` to `trace_id`, replacing any previous binding, and
    /// release everyone waiting for it.
    pub fn register(&self, trace_id: &str, channel: &ChannelHandle) {
        {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let session = sessions
                .entry(trace_id.to_string())
                .or_insert_with(TraceSession::new);
            session.channel = Some(channel.downgrade());
            session.state = TraceState::Bound;
            session.bound.send_replace(true);
        }
        debug!(trace_id = %trace_id, "Channel registered");
    }

    /// Live channel bound to `trace_id`, if any.
    pub fn get(&self, trace_id: &str) -> Option<ChannelHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(trace_id)
            .and_then(TraceSession::live_channel)
    }

    pub fn state(&self, trace_id: &str) -> Option<TraceState> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(trace_id)
            .map(|s| s.state)
    }

    /// Forward a message to the channel bound to `trace_id`.
    pub fn dispatch(
        &self,
        trace_id: &str,
        message: serde_json::Value,
    ) -> Result<(), ChannelUnavailable> {
        self.get(trace_id)
            .ok_or_else(|| ChannelUnavailable::new(trace_id))?
            .send(ChannelMessage::Event(message))
            .map_err(|_| ChannelUnavailable::new(trace_id))
    }

    /// Block until a channel is registered under `trace_id`, at most `timeout`.
    pub async fn wait_for_channel(
        &self,
        trace_id: &str,
        timeout: Duration,
    ) -> Result<(), ChannelUnavailable> {
        let mut bound = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            sessions
                .entry(trace_id.to_string())
                .or_insert_with(TraceSession::new)
                .bound
                .subscribe()
        };

        let outcome = match tokio::time::timeout(timeout, bound.wait_for(|is_bound| *is_bound)).await {
            Ok(Ok(_)) => Ok(()),
            _ => Err(ChannelUnavailable::new(trace_id)),
        };
        outcome
    }

    /// The client behind `channel` went away. Ignored when a newer channel
    /// has taken over the trace id.
    pub fn unregister(&self, trace_id: &str, channel: &ChannelHandle) {
        let removed = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            match sessions.get_mut(trace_id) {
                Some(session)
                    if session
                        .live_channel()
                        .map_or(true, |current| current.same_channel(channel)) =>
                {
                    session.channel = None;
                    session.state = TraceState::Closed;
                    session.bound.send_replace(false);
                    true
                }
                _ => false,
            }
        };
        if removed {
            debug!(trace_id = %trace_id, "Channel unregistered");
        }
    }

    /// Signal the bound channel to close and forget the trace id.
    pub fn close(&self, trace_id: &str) {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(trace_id);

        if let Some(channel) = session.as_ref().and_then(TraceSession::live_channel) {
            let _ = channel.send(ChannelMessage::Close);
        }
        debug!(trace_id = %trace_id, "Trace closed");
    }

    /// Number of trace ids with a live channel.
    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.live_channel().is_some())
            .count()
    }

    /// Remove sessions with no live channel and nobody waiting (housekeeping).
    pub fn cleanup(&self) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, s| s.live_channel().is_some() || s.bound.receiver_count() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_reaches_registered_channel() {
        let registry = TraceRegistry::new();
        let trace_id = registry.create_trace();
        assert_eq!(registry.state(&trace_id), Some(TraceState::Pending));

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register(&trace_id, &tx);
        assert_eq!(registry.state(&trace_id), Some(TraceState::Bound));

        registry.dispatch(&trace_id, json!({"msg": "hello"})).unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ChannelMessage::Event(json!({"msg": "hello"}))
        );
    }

    #[test]
    fn test_dispatch_without_channel_is_unavailable() {
        let registry = TraceRegistry::new();
        let trace_id = registry.create_trace();
        let err = registry.dispatch(&trace_id, json!({})).unwrap_err();
        assert_eq!(err.trace_id, trace_id);
    }

    #[test]
    fn test_registry_does_not_keep_channel_alive() {
        let registry = TraceRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel::<ChannelMessage>();
        registry.register("t", &tx);
        drop(tx);
        drop(rx);

        assert!(registry.get("t").is_none());
        assert!(registry.dispatch("t", json!({})).is_err());
    }

    #[tokio::test]
    async fn test_new_registration_overwrites_old() {
        let registry = TraceRegistry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        registry.register("t", &old_tx);
        registry.register("t", &new_tx);
        registry.dispatch("t", json!(1)).unwrap();

        assert_eq!(new_rx.recv().await.unwrap(), ChannelMessage::Event(json!(1)));
        assert!(old_rx.try_recv().is_err());

        // The stale connection going away must not unbind the new one
        registry.unregister("t", &old_tx);
        assert_eq!(registry.state("t"), Some(TraceState::Bound));

        registry.unregister("t", &new_tx);
        assert_eq!(registry.state("t"), Some(TraceState::Closed));
    }

    #[tokio::test]
    async fn test_wait_is_released_by_register() {
        let registry = TraceRegistry::new();
        let trace_id = registry.create_trace();

        let waiter = {
            let registry = registry.clone();
            let trace_id = trace_id.clone();
            tokio::spawn(async move {
                registry
                    .wait_for_channel(&trace_id, Duration::from_secs(5))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(&trace_id, &tx);

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_bound() {
        let registry = TraceRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("t", &tx);

        registry
            .wait_for_channel("t", Duration::from_millis(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let registry = TraceRegistry::new();
        let trace_id = registry.create_trace();
        let err = registry
            .wait_for_channel(&trace_id, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err.trace_id, trace_id);
    }

    #[tokio::test]
    async fn test_close_signals_channel_and_forgets_trace() {
        let registry = TraceRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("t", &tx);
        assert_eq!(registry.active_count(), 1);

        registry.close("t");

        assert_eq!(rx.recv().await.unwrap(), ChannelMessage::Close);
        assert_eq!(registry.state("t"), None);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_cleanup_removes_dead_sessions() {
        let registry = TraceRegistry::new();
        registry.create_trace();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("live", &tx);

        registry.cleanup();

        assert_eq!(registry.sessions.read().unwrap().len(), 1);
        assert_eq!(registry.state("live"), Some(TraceState::Bound));
    }
}
