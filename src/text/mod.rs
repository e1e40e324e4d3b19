//! Text handling at the terminal boundary.
//!
//! Browser terminals send carriage returns on Enter and expect `\r\n` line
//! endings, while line-oriented programs read `\n`-terminated input. This
//! module holds the conversions between the two, plus an incremental UTF-8
//! decoder for process output that arrives in arbitrary chunks.
//!
//! # Example
//!
//! ```
//! use webterm_bridge::text::{normalize_input, to_crlf, Utf8Decoder};
//!
//! assert_eq!(normalize_input(b"echo hi\r"), b"echo hi\n");
//! assert_eq!(to_crlf("a\nb\n"), "a\r\nb\r\n");
//!
//! let mut decoder = Utf8Decoder::new();
//! let euro = "€".as_bytes();
//! assert_eq!(decoder.decode(&euro[..1]), "");
//! assert_eq!(decoder.decode(&euro[1..]), "€");
//! ```

mod newline;
mod utf8;

pub use newline::{normalize_input, to_crlf};
pub use utf8::Utf8Decoder;
