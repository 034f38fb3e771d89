//! Project layout and the SQLite-backed memory archive.
//!
//! - `ProjectLayout`: computed paths for project directories/files.
//! - `ProjectConfig`: serializable project metadata, including interpreter settings.
//! - `ArchiveDb`: a small SQLite wrapper holding memory cards, schema v2.
//! - `ProjectContext`: layout + config + open archive for a given root.

mod archive_db;
mod config;
mod context;
mod layout;
mod util;

pub use archive_db::{current_schema_version, ArchiveDb, DbError, DbResult, CURRENT_SCHEMA_VERSION};
pub use config::{DbConfig, ProjectConfig};
pub use context::ProjectContext;
pub use layout::ProjectLayout;
pub use util::{load_project_config, open_archive_db};
