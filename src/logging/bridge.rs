//! tracing integration
//!
//! Installs a process-wide subscriber whose layer forwards every tracing event
//! into the channel named after the event's target. Those channels propagate
//! to root, so `tracing::info!` calls anywhere in the process land on the
//! console and in `main.log` next to records emitted through channel handles.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use super::level::Level;
use super::registry::ChannelRegistry;

/// Layer dispatching tracing events into registry channels
pub struct ChannelLayer {
    registry: Arc<ChannelRegistry>,
}

impl ChannelLayer {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }
}

impl<S: Subscriber> Layer<S> for ChannelLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(*metadata.level());

        let channel = self.registry.get_or_create(metadata.target());
        if !channel.is_enabled_for(level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        channel.log(level, visitor.finish());
    }
}

/// Collects the `message` field plus any other fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}

/// Install the global subscriber forwarding into `registry`
///
/// The filter comes from `RUST_LOG` when set; otherwise everything down to
/// DEBUG reaches the layer and channel thresholds decide. Returns `false` if
/// another global subscriber was already installed.
pub fn install(registry: Arc<ChannelRegistry>) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ChannelLayer::new(registry))
        .try_init()
        .is_ok()
}
