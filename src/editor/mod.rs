//! Document editing for Pagemark
//!
//! Contains the text buffer the preview is rendered from. The editing surface
//! itself is out of scope; edits arrive as whole-text replacements, targeted
//! insertions (page breaks) or enhancement results.

pub mod buffer;

pub use buffer::DocumentBuffer;
