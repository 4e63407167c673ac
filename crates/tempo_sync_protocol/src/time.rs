//! Epoch-millisecond timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
///
/// Every timestamp on the wire uses this unit, and the server is
/// authoritative for all of them.
pub type Millis = i64;

/// Cursor sentinel meaning "replace the server's entire dataset with this
/// upload".
///
/// An incremental sync request carrying this value bypasses merge logic on
/// the server.
pub const FORCE_OVERWRITE_CURSOR: Millis = 0;

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Millis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_positive_and_monotoneish() {
        let a = now_millis();
        let b = now_millis();
        assert!(a > 0);
        assert!(b >= a);
    }
}
