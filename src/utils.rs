//! Small shared helpers

use humansize::{BINARY, format_size};

/// Formats a byte count for humans (e.g. `1.50 MiB`)
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, BINARY)
}
