//! # CTMS Configuration
//!
//! Settings for the deployment tooling, resolved from a `.env` file, the
//! process environment and an optional TOML settings file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ctms_conf::Settings;
//!
//! let settings = Settings::load(None).unwrap();
//! println!("deploying to {}", settings.database().unwrap().redacted_url());
//! for path in settings.layout.schema_paths() {
//! 	println!("  {}", path.display());
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`settings`]: environment access, database connection settings and the
//!   on-disk layout of SQL files

pub mod settings;

pub use settings::{DatabaseConfig, DeployLayout, Env, EnvError, Settings, SettingsError};
