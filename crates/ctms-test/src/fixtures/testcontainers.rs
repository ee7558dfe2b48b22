//! Disposable PostgreSQL server

use rstest::*;
use testcontainers::{ImageExt, core::WaitFor, runners::AsyncRunner};

pub use testcontainers::{ContainerAsync, GenericImage};

/// Fixture: start a PostgreSQL 16 container and wait until it accepts
/// connections.
///
/// Returns the container guard (keep it alive for the duration of the
/// test) and a connection URL for the `postgres` database.
///
/// # Example
/// ```rust,ignore
/// use ctms_test::{ContainerAsync, GenericImage, postgres_container};
/// use rstest::*;
/// use sqlx::Connection;
///
/// #[rstest]
/// #[tokio::test]
/// async fn test_with_postgres(
///     #[future] postgres_container: (ContainerAsync<GenericImage>, String)
/// ) {
///     let (_container, url) = postgres_container.await;
///     let mut conn = sqlx::PgConnection::connect(&url).await.unwrap();
/// }
/// ```
#[fixture]
pub async fn postgres_container() -> (ContainerAsync<GenericImage>, String) {
	use sqlx::Connection;
	use testcontainers::core::IntoContainerPort;

	let image = GenericImage::new("postgres", "16-alpine")
		.with_exposed_port(5432.tcp())
		.with_wait_for(WaitFor::message_on_stderr(
			"database system is ready to accept connections",
		))
		.with_startup_timeout(std::time::Duration::from_secs(120))
		.with_env_var("POSTGRES_HOST_AUTH_METHOD", "trust");

	let postgres = image
		.start()
		.await
		.expect("Failed to start PostgreSQL container");

	tokio::time::sleep(std::time::Duration::from_millis(500)).await;

	let mut port_retry = 0;
	let max_port_retries = 7;
	let port = loop {
		match postgres.get_host_port_ipv4(5432).await {
			Ok(p) => break p,
			Err(e) if port_retry < max_port_retries => {
				port_retry += 1;
				let delay = std::time::Duration::from_millis(200 * 2_u64.pow(port_retry));
				eprintln!(
					"PostgreSQL port query attempt {} of {} failed: {:?}",
					port_retry, max_port_retries, e
				);
				tokio::time::sleep(delay).await;
			}
			Err(e) => {
				panic!(
					"Failed to get PostgreSQL port after {} retries: {}",
					max_port_retries, e
				);
			}
		}
	};

	let database_url = format!(
		"postgres://postgres@localhost:{}/postgres?sslmode=disable",
		port
	);

	// The server restarts once after initdb; the first "ready" message can
	// precede the final one.
	let mut retry_count = 0;
	let max_retries = 7;
	loop {
		match sqlx::PgConnection::connect(&database_url).await {
			Ok(mut conn) => match sqlx::query("SELECT 1").execute(&mut conn).await {
				Ok(_) => break,
				Err(e) if retry_count < max_retries => {
					eprintln!(
						"PostgreSQL health check attempt {} of {} failed: {:?}",
						retry_count + 1,
						max_retries,
						e
					);
				}
				Err(e) => panic!(
					"PostgreSQL health check failed after {} retries: {}",
					max_retries, e
				),
			},
			Err(e) if retry_count < max_retries => {
				eprintln!(
					"PostgreSQL connection attempt {} of {} failed: {:?}",
					retry_count + 1,
					max_retries,
					e
				);
			}
			Err(e) => panic!(
				"Failed to connect to PostgreSQL after {} retries: {}",
				max_retries, e
			),
		}
		retry_count += 1;
		tokio::time::sleep(std::time::Duration::from_millis(200 * 2_u64.pow(retry_count))).await;
	}

	(postgres, database_url)
}
