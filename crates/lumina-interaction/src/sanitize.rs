//! Client-side symbol filtering.
//!
//! The service is instructed never to emit `* $ [ ] { }`; this strip is the
//! fallback safety net applied to every text delta before it is yielded.
//! `#` is permitted (the response format uses `###` headers).

/// Characters removed from every streamed text fragment.
const FORBIDDEN: [char; 6] = ['*', '$', '[', ']', '{', '}'];

/// Removes the forbidden symbol set from a text delta.
pub fn strip_forbidden(text: &str) -> String {
    if !text.contains(&FORBIDDEN[..]) {
        return text.to_string();
    }
    text.chars().filter(|c| !FORBIDDEN.contains(c)).collect()
}
