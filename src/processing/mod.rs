//! Processing subsystem.
//!
//! # Data Flow
//! ```text
//! TempFile (stored upload)
//!     → adapter.rs (timeout, PNG check, base64, optional output copy)
//!     → remover.rs (BackgroundRemover: external command, or imgly.rs in-process)
//!     → TempFile released after the remover returns
//! ```
//!
//! # Design Decisions
//! - The model runs in-process only with the `imgly` feature; the default
//!   build shells out to a configured command
//! - Exactly one attempt per request; no retries, no circuit breaking

pub mod adapter;
#[cfg(feature = "imgly")]
pub mod imgly;
pub mod remover;

pub use adapter::{is_png, ProcessedImage, ProcessingAdapter, ProcessingError};
#[cfg(feature = "imgly")]
pub use imgly::ImglyRemover;
pub use remover::{build_remover, BackgroundRemover, CommandRemover, RemoverError};
