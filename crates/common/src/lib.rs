//! Common utilities and shared types for OpenDraft.
//!
//! This crate provides foundational components used across all OpenDraft crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Text helpers**: Slug derivation and read-time estimation in [`text`]
//!
//! # Example
//!
//! ```no_run
//! use opendraft_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {} on port {}", id, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod text;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use text::{derive_slug, read_time, slugify};
