//! Intake subsystem.
//!
//! # Data Flow
//! ```text
//! multipart field "image"
//!     → naming.rs (unique id + sanitized extension)
//!     → storage.rs (stream to <upload_dir>/<id>.<ext>)
//!     → TempFile guard handed to the processing adapter
//! ```
//!
//! # Design Decisions
//! - Upload directory is an explicit value injected at construction
//! - Id source is a trait so tests get deterministic names
//! - Temp files are released on every exit path; release failures only log

pub mod naming;
pub mod storage;

pub use naming::{IdGenerator, SequentialIds, UuidIds};
pub use storage::{IntakeError, TempFile, UploadStore};
