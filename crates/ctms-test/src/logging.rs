//! Captured tracing output

use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// A tracing layer that records every event as `"[LEVEL] message"`.
#[derive(Clone, Default)]
pub struct LogCapture {
	logs: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
	/// Install a capture as the default subscriber of the current thread.
	///
	/// Events are recorded until the returned guard is dropped. Use a
	/// current-thread runtime (`#[tokio::test]`) so that async code logs on
	/// the capturing thread.
	pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
		let capture = Self::default();
		let guard = tracing_subscriber::registry()
			.with(capture.clone())
			.set_default();
		(capture, guard)
	}

	pub fn lines(&self) -> Vec<String> {
		self.logs.lock().unwrap().clone()
	}

	/// Whether an event at `level` with a message containing `fragment` was
	/// recorded.
	pub fn contains(&self, level: tracing::Level, fragment: &str) -> bool {
		let prefix = format!("[{}] ", level);
		self.logs
			.lock()
			.unwrap()
			.iter()
			.any(|line| line.starts_with(&prefix) && line.contains(fragment))
	}
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
		struct MessageVisitor {
			message: String,
		}

		impl tracing::field::Visit for MessageVisitor {
			fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
				if field.name() == "message" {
					self.message = format!("{:?}", value);
				}
			}
		}

		let mut visitor = MessageVisitor {
			message: String::new(),
		};
		event.record(&mut visitor);

		self.logs
			.lock()
			.unwrap()
			.push(format!("[{}] {}", event.metadata().level(), visitor.message));
	}
}
