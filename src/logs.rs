//! Logging setup, plus a registry that lets presentation layers follow the
//! log stream without the core knowing who is listening.

// {{{ Imports
use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
// }}}

/// How many recent lines late listeners can still catch up on.
pub const TAIL_LEN: usize = 500;

// {{{ Listener registry
#[derive(Default)]
struct Listeners {
	senders: Vec<mpsc::Sender<String>>,
	tail: VecDeque<String>,
}

/// Fans formatted log lines out to every registered receiver.
#[derive(Clone, Default)]
pub struct LogListeners {
	inner: Arc<Mutex<Listeners>>,
}

impl LogListeners {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts receiving every line logged from now on. Lines are dropped for
	/// this receiver while its buffer is full.
	pub fn register(&self, capacity: usize) -> mpsc::Receiver<String> {
		let (sender, receiver) = mpsc::channel(capacity.max(1));
		if let Ok(mut inner) = self.inner.lock() {
			inner.senders.push(sender);
		}
		receiver
	}

	/// The most recent lines, oldest first.
	pub fn tail(&self) -> Vec<String> {
		self.inner
			.lock()
			.map(|inner| inner.tail.iter().cloned().collect())
			.unwrap_or_default()
	}

	pub fn listener_count(&self) -> usize {
		self.inner
			.lock()
			.map(|inner| inner.senders.len())
			.unwrap_or_default()
	}

	pub fn publish(&self, line: String) {
		let Ok(mut inner) = self.inner.lock() else {
			return;
		};

		inner.senders.retain(|sender| match sender.try_send(line.clone()) {
			Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
			Err(mpsc::error::TrySendError::Closed(_)) => false,
		});

		if inner.tail.len() == TAIL_LEN {
			inner.tail.pop_front();
		}
		inner.tail.push_back(line);
	}
}
// }}}
// {{{ Tracing layer
#[derive(Default)]
struct LineVisitor {
	message: String,
	fields: String,
}

impl Visit for LineVisitor {
	fn record_str(&mut self, field: &Field, value: &str) {
		if field.name() == "message" {
			self.message.push_str(value);
		} else {
			let _ = write!(self.fields, " {}={}", field.name(), value);
		}
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			let _ = write!(self.message, "{value:?}");
		} else {
			let _ = write!(self.fields, " {}={:?}", field.name(), value);
		}
	}
}

/// Renders an event the way listeners see it: `LEVEL message key=value`.
fn format_event(event: &Event<'_>) -> String {
	let mut visitor = LineVisitor::default();
	event.record(&mut visitor);
	format!(
		"{:<5} {}{}",
		event.metadata().level().as_str(),
		visitor.message,
		visitor.fields
	)
}

impl<S: Subscriber> Layer<S> for LogListeners {
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		self.publish(format_event(event));
	}
}
// }}}
// {{{ Setup
pub fn default_filter(debug: bool) -> EnvFilter {
	EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(if debug {
			"ehbwatch=debug"
		} else {
			"ehbwatch=info"
		})
	})
}

/// Installs the global subscriber. Calling this twice is harmless.
pub fn init_logging(debug: bool, listeners: &LogListeners) {
	let _ = tracing_subscriber::registry()
		.with(default_filter(debug))
		.with(tracing_subscriber::fmt::layer())
		.with(listeners.clone())
		.try_init();
}
// }}}
