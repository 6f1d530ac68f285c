//! File handling for Pagemark
//!
//! - Reading markdown sources with encoding detection
//! - Atomic writes for preview, export and settings files
//! - Watching a source document for external edits

pub mod io;
pub mod watcher;

pub use io::*;
pub use watcher::*;
