//! Line-ending conversions.

/// Rewrite every carriage-return byte to a linefeed byte.
///
/// All other bytes pass through unchanged, so `"1\r"` becomes `"1\n"` and
/// `"\r\n"` becomes `"\n\n"`.
pub fn normalize_input(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .map(|&b| if b == b'\r' { b'\n' } else { b })
        .collect()
}

/// Rewrite every `\n` to `\r\n` for display in a terminal-style client.
pub fn to_crlf(text: &str) -> String {
    text.replace('\n', "\r\n")
}
