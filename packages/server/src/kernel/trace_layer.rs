//! Tracing layer that forwards trace-tagged events to client channels.
//!
//! Any event emitted inside a span carrying a `trace_id` field (or carrying
//! the field itself) is turned into a JSON log line and handed to the
//! [`TraceRegistry`]. Events without a trace id, or whose trace has no
//! channel, are ignored here; the regular `fmt` layer still prints them.
//! Credential-like fields (`email`, `password`, `token`) are redacted.

use std::fmt;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::trace_registry::TraceRegistry;

const TRACE_ID_FIELD: &str = "trace_id";
const MESSAGE_FIELD: &str = "message";

/// Fields whose values never leave the process.
const REDACTED_FIELDS: &[&str] = &["email", "password", "token"];
const REDACTED: &str = "[Redacted]";

/// Trace id stored in span extensions.
struct SpanTraceId(String);

/// Forwards trace-tagged events to the registry.
pub struct TraceForwardLayer {
    registry: TraceRegistry,
}

impl TraceForwardLayer {
    pub fn new(registry: TraceRegistry) -> Self {
        Self { registry }
    }
}

impl<S> Layer<S> for TraceForwardLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);

        if let (Some(trace_id), Some(span)) = (visitor.trace_id, ctx.span(id)) {
            span.extensions_mut().insert(SpanTraceId(trace_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let trace_id = visitor.trace_id.take().or_else(|| {
            ctx.event_scope(event)?.find_map(|span| {
                let extensions = span.extensions();
                let trace_id = extensions.get::<SpanTraceId>().map(|id| id.0.clone());
                trace_id
            })
        });
        let Some(trace_id) = trace_id else {
            return;
        };

        let metadata = event.metadata();
        let mut line = visitor.fields;
        line.insert(
            "level".to_string(),
            Value::String(metadata.level().to_string().to_lowercase()),
        );
        line.insert("time".to_string(), Value::String(Utc::now().to_rfc3339()));
        line.insert("target".to_string(), Value::String(metadata.target().to_string()));
        line.insert("msg".to_string(), Value::String(visitor.message));
        line.insert(TRACE_ID_FIELD.to_string(), Value::String(trace_id.clone()));

        // No channel means nobody is listening; drop it
        let _ = self.registry.dispatch(&trace_id, Value::Object(line));
    }
}

/// Collects event fields into a JSON object.
#[derive(Default)]
struct JsonVisitor {
    message: String,
    trace_id: Option<String>,
    fields: Map<String, Value>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        match field.name() {
            MESSAGE_FIELD => {
                self.message = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                }
            }
            TRACE_ID_FIELD => {
                self.trace_id = Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
            }
            name if REDACTED_FIELDS.contains(&name) => {
                self.fields
                    .insert(name.to_string(), Value::String(REDACTED.to_string()));
            }
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }
}
