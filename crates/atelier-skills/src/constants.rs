//! Shared constants for skill discovery.

/// File names reserved for future pack infrastructure, never loaded as skills.
pub const RESERVED_FILENAMES: &[&str] = &["manifest.json", "pack.json"];

/// Files starting with this prefix are pack metadata, not skills.
pub const METADATA_PREFIX: char = '_';

/// Quiet window for coalescing bursts of file-system events into one reload.
pub const RELOAD_DEBOUNCE_MS: u64 = 150;
