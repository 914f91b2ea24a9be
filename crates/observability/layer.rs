use std::collections::BTreeMap;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::config::AlertOrigin;
use super::notifier::{AlertDispatcher, AlertEvent};

const SENSITIVE_FRAGMENTS: [&str; 9] = [
    "token",
    "secret",
    "password",
    "authorization",
    "signature",
    "card",
    "cookie",
    "webhook",
    "api_key",
];

/// Turns events that pass the level filter into alerts.
pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    origin: AlertOrigin,
}

impl AlertLayer {
    pub(crate) fn new(dispatcher: AlertDispatcher, origin: AlertOrigin) -> Self {
        Self { dispatcher, origin }
    }
}

#[derive(Default)]
struct RedactingVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else if is_sensitive(field.name()) {
            self.fields
                .insert(field.name().to_string(), "[REDACTED]".to_string());
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();

        // Delivery failures are reported by this module; never alert on them.
        if metadata.target().starts_with(module_path!().trim_end_matches("::layer")) {
            return;
        }

        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);

        let spans = ctx
            .event_span(event)
            .map(|span| {
                span.scope()
                    .from_root()
                    .map(|s| s.metadata().name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        };

        self.dispatcher.dispatch(AlertEvent {
            level: *metadata.level(),
            at: Utc::now(),
            origin: self.origin.clone(),
            target: metadata.target().to_string(),
            location,
            message: visitor.message,
            fields: visitor.fields,
            spans,
        });
    }
}

fn is_sensitive(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| field.contains(fragment))
}
