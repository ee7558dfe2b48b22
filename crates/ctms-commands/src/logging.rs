//! Log output for command-line use

use tracing_subscriber::EnvFilter;

/// Default filter for a `-v` count, used when `RUST_LOG` is not set.
pub fn default_directive(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	}
}

/// Install the global fmt subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbosity`. Calling this more than
/// once keeps the first subscriber.
pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

	let _ = tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(0, "warn")]
	#[case(1, "info")]
	#[case(2, "debug")]
	#[case(3, "trace")]
	#[case(9, "trace")]
	fn test_default_directive(#[case] verbosity: u8, #[case] expected: &str) {
		assert_eq!(default_directive(verbosity), expected);
	}

	#[rstest]
	fn test_init_logging_twice_is_harmless() {
		init_logging(1);
		init_logging(2);
		tracing::info!("still logging");
	}
}
