//! Newline-delimited JSON event intake.

use std::io::BufRead;

use tracing::warn;
use wless_core_focus::Event;

use crate::RuntimeError;

/// Parse one event line. `line` is only used for the error.
pub fn parse_event(text: &str, line: usize) -> Result<Event, RuntimeError> {
    serde_json::from_str(text).map_err(|source| RuntimeError::Parse { line, source })
}

/// Read events from `reader` until EOF or until `handler` returns `false`.
///
/// Blank lines and lines starting with `#` are skipped. Malformed lines are
/// logged and skipped. Returns the number of events delivered.
pub fn read_events<R, F>(reader: R, mut handler: F) -> Result<usize, RuntimeError>
where
    R: BufRead,
    F: FnMut(Event) -> bool,
{
    let mut delivered = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        match parse_event(text, index + 1) {
            Ok(event) => {
                delivered += 1;
                if !handler(event) {
                    break;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
    Ok(delivered)
}
