//! The trace channel over a real WebSocket connection.

mod common;

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use server_core::domains::epub::{run_traced_job, JobInput, JobKey};
use server_core::kernel::{TraceForwardLayer, TraceState};
use server_core::server::build_app;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing_subscriber::layer::SubscriberExt;

use crate::common::*;

/// Serve the app on an ephemeral port and return the channel endpoint.
async fn serve(harness: &TestHarness) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_app(harness.deps.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://{addr}/websockets")
}

#[tokio::test]
async fn socket_without_trace_id_is_closed_at_once() {
    let harness = TestHarness::new();
    let endpoint = serve(&harness).await;

    let (mut socket, _) = connect_async(endpoint).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), socket.next())
        .await
        .unwrap();
    assert!(
        matches!(first, Some(Ok(Message::Close(_))) | None),
        "expected a close frame, got {first:?}"
    );
    assert_eq!(harness.deps.traces.active_count(), 0);
}

#[tokio::test]
async fn socket_registers_and_receives_job_logs_then_close() {
    let harness = TestHarness::new().with_chapters(2);
    let traces = harness.deps.traces.clone();
    let endpoint = serve(&harness).await;

    let subscriber = tracing_subscriber::registry().with(TraceForwardLayer::new(traces.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let trace_id = traces.create_trace();
    let (mut socket, _) = connect_async(format!("{endpoint}?trace_id={trace_id}"))
        .await
        .unwrap();

    traces
        .wait_for_channel(&trace_id, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(traces.state(&trace_id), Some(TraceState::Bound));

    let chapters: Vec<_> = (1..=2).map(chapter_ref).collect();
    let key = JobKey::for_chapters(&chapters);
    run_traced_job(
        harness.deps.clone(),
        trace_id.clone(),
        key,
        JobInput::Chapters(chapters),
    )
    .await
    .unwrap();

    let mut states = Vec::new();
    let mut closed = false;
    while let Ok(Some(frame)) = tokio::time::timeout(Duration::from_secs(2), socket.next()).await {
        match frame.unwrap() {
            Message::Text(text) => {
                let line: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(line["trace_id"], trace_id.as_str());
                if let Some(state) = line["state"].as_str() {
                    states.push(state.to_string());
                }
            }
            Message::Close(_) => {
                closed = true;
                break;
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    assert!(closed);
    assert_eq!(
        states,
        vec!["pending", "discovering", "fetching", "assembling", "cached"]
    );
}
