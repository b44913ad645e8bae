//! Command-line front end for `ddg-search`.
//!
//! `cli` turns argv plus configuration into an [`cli::Invocation`], `run`
//! executes it against any [`ddg_web::SearchService`], and `format` renders
//! the aggregated response.

pub mod cli;
pub mod format;
pub mod run;

pub use cli::{Cli, CliError, Invocation, USAGE};
pub use format::OutputFormat;
