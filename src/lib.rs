//! Pagemark - paginated preview and export for markdown documents
//!
//! A document is rendered to top-level HTML blocks, each block is measured,
//! and the blocks are packed greedily into fixed-size pages. Pages are then
//! decorated from the document's frontmatter (header, date, background,
//! "Page N of M" footer) and emitted as pre-sized page containers that print
//! one sheet per container.

pub mod config;
pub mod editor;
pub mod enhance;
pub mod error;
pub mod export;
pub mod file_handler;
pub mod layout;
pub mod markdown;
pub mod session;

pub use config::{AppConfig, FontChoice, PageGeometry};
pub use error::AppError;
pub use layout::{PaginatedDocument, Paginator};
pub use session::{PreviewFrame, PreviewSession};
