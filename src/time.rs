use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Injectable wall-clock source.
///
/// The scan engine reads time only through this so tests can pin the clock
/// at a chosen instant relative to a candle boundary.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Current wall-clock time in milliseconds since the unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_millis() as i64
}

/// The default clock backed by the system time.
pub fn system_clock() -> Clock {
    Arc::new(now_ms)
}
