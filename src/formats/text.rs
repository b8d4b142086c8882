//! Plain text (`.txt`): passed through as-is after a permissive UTF-8 decode.

use crate::error::FileError;
use std::path::Path;

/// Read `path`, dropping any bytes that are not valid UTF-8.
pub fn convert(path: &Path) -> Result<String, FileError> {
    let bytes = std::fs::read(path).map_err(|e| FileError::conversion("txt", e))?;
    Ok(decode_utf8_dropping_invalid(&bytes))
}

/// Decode UTF-8, skipping invalid sequences instead of replacing them.
pub fn decode_utf8_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    out.push_str(valid);
                }
                // `None` means the input ends mid-sequence.
                let skip = e.error_len().unwrap_or(after.len());
                rest = &after[skip..];
            }
        }
    }
}
