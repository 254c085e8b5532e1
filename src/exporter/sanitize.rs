//! Title → filename fragment.

const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const MAX_TITLE_CHARS: usize = 200;

/// Strip characters that are illegal on common filesystems from a meeting
/// title.
///
/// Runs of spaces left behind collapse to one, leading and trailing spaces
/// and periods are dropped (trailing periods break Windows paths), and the
/// result is cut to 200 characters. Case and non-ASCII text are kept.
/// Returns an empty string when nothing survives; callers fall back to the
/// meeting id.
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if UNSAFE_CHARS.contains(&ch) {
            continue;
        }
        if ch == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(ch);
    }

    let truncated: String = out
        .trim_matches(is_edge_char)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    truncated.trim_end_matches(is_edge_char).to_string()
}

fn is_edge_char(ch: char) -> bool {
    ch == ' ' || ch == '.'
}
