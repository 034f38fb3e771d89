//! spiral-core
//!
//! Core library for the SpiralLogic ritual interpreter.
//!
//! This crate defines the statement syntax (parser and canonical serializer), the
//! safety anchor engine, the bandwidth governor, voice and archive routing, the
//! hash-chained audit trail and the session orchestrator that sequences them.
//! Project layout and the SQLite memory archive live in `db`.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, editor integrations, etc.).

pub mod anchors;
pub mod archive;
pub mod audit;
pub mod bandwidth;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod syntax;
pub mod voice;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
