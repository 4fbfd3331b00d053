//! Bounded previews of remote response bodies for diagnostic logging.

/// Upper bound on how much of a response body ends up in a log line.
pub const MAX_PREVIEW_BYTES: usize = 1024;

/// Lossily decode `body` and cut it to [`MAX_PREVIEW_BYTES`], appending `...`
/// when truncated. The cut never splits a UTF-8 character.
pub fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_PREVIEW_BYTES {
        return text.into_owned();
    }
    let mut end = MAX_PREVIEW_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
