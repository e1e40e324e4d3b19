//! Human-readable failure messages shown in the browser terminal.

use crate::text::to_crlf;

/// Message sent when no interpreter candidate could be launched.
pub fn interpreter_not_found(tried: &[String]) -> String {
    let msg = format!(
        "Python 3 not found. Please install Python 3 and add it to PATH.\n\
         Tried: {}\n\
         On Windows, install from python.org and ensure \"Add python.exe to PATH\" is selected.\n",
        tried.join(", ")
    );
    to_crlf(&msg)
}

/// Message sent when the interpreter was found but could not be started.
pub fn spawn_failed(reason: &str) -> String {
    format!("Failed to start Python: {}\r\n", reason)
}
