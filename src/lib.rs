//! # asana-migrate
//!
//! Moves work out of Asana: exports projects, tasks and attachments to
//! local files, and imports exported tasks into Fauna.
//!
//! ## Usage
//!
//! ```bash
//! asana-migrate export [--workspace <gid>] [--output <dir>] [--task-concurrency <n>]
//! asana-migrate import [--data-dir <dir>] [--collection <name>] [--concurrency <n>]
//! ```
//!
//! ## Modules
//!
//! - `concurrency` - Bounded-concurrency async mapper used at every fan-out point
//! - `asana` - Asana API access behind the `WorkApi` trait
//! - `export` - Writes projects, tasks, attachments and HTML pages to disk
//! - `import` - Turns exported tasks into Fauna records behind the `RecordSink` trait
//! - `config` - Layered configuration (defaults, TOML file, environment, CLI)
//! - `app` - Logging, fatal error handling and command wiring
//! - `error` - Library error type
pub mod app;
pub mod asana;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod export;
pub mod import;

pub use error::{Error, Result};
