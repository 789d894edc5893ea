//! Filename sanitizing for files received from the peer.
//!
//! The sender controls the name in the `file-meta` frame, so it must be
//! treated as hostile: path separators and traversal components would let
//! a peer write outside the download directory.

/// Reduce a peer-supplied filename to a single safe path component.
///
/// - Takes only the final component of any path the peer sent
/// - Drops `.` and `..`
/// - Filters characters to alphanumeric, `.`, `-`, `_`, and space
/// - Returns "file" if nothing safe remains
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .next_back()
        .map(str::to_owned)
        .unwrap_or_default();

    let safe: String = last
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' '))
        .collect();

    // A bare extension like ".bashrc" is fine; an empty or dot-only
    // result is not a usable filename.
    if safe.trim_matches(['.', ' ']).is_empty() {
        "file".to_string()
    } else {
        safe
    }
}
