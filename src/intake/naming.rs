//! Collision-free names for request-scoped files.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Longest extension carried over from a client-supplied filename.
const MAX_EXTENSION_LEN: usize = 10;

/// Source of identifiers for files in the shared upload directory.
///
/// Every call must return a value never handed out before by the same
/// generator, including under concurrent calls.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Millisecond timestamp plus a random UUID.
///
/// The timestamp keeps directory listings roughly chronological; the UUID
/// makes same-millisecond uploads distinct.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }
}

/// Deterministic `<prefix><n>` identifiers.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

/// Extension of a client-supplied filename, lowercased.
///
/// Anything other than a short ASCII alphanumeric extension is dropped so the
/// client never controls more of the stored path than a few safe characters.
pub fn extension_of(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?;
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

/// `<id>.<ext>`, or just `<id>` without an extension.
pub fn file_name(id: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}
