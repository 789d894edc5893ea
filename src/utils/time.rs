use std::time::SystemTime;

/// Formats the current wall-clock time as an absolute `HH:MM` (UTC) string.
///
/// The timestamp is computed once at append time and stored — it is never
/// re-derived at render time.
pub fn format_timestamp_now() -> String {
    let duration = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;
    format!("{:02}:{:02}", hours, mins)
}
