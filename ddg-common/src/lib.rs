//! Shared plumbing for the ddg-search crates.
//!
//! Every crate in the workspace may depend on it:
//!
//! - [`observability`]: centralised `tracing` initialisation for the binary
//!   and integration tests
//! - [`APP_NAME`]: the name used for log files, config directories and the
//!   `User-Agent` product token
//!
//! ```rust
//! use ddg_common::observability::LogConfig;
//!
//! let cfg = LogConfig::default();
//! assert_eq!(cfg.app_name, ddg_common::APP_NAME);
//! assert!(!cfg.emit_stderr);
//! ```

pub mod observability;

/// Logical application name shared by logging and configuration defaults.
pub const APP_NAME: &str = "ddg-search";
