/// Shared character-budget truncation used everywhere text must fit a limit.
///
/// If the text already fits, it is returned unchanged. Otherwise the text is
/// cut to `limit - 3` characters; if the nearest space lies within the last
/// 20% of that cut window the cut happens at the space, else it is a hard
/// cut. Either way an ellipsis is appended. Counts characters, not bytes, so
/// multibyte text never splits a code point.
///
/// Idempotent: re-applying to output of length <= limit is a no-op.
pub fn truncate(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }

    // Degenerate budgets: no room for an ellipsis, hard cut only.
    if limit <= 3 {
        return chars[..limit].iter().collect();
    }

    let cut = limit - 3;
    let window: &[char] = &chars[..cut];

    // Prefer a word boundary, but only if it lies in the last 20% of the
    // cut window; earlier spaces would throw away too much text.
    let boundary = cut - cut / 5;
    let cut_at = window
        .iter()
        .rposition(|c| *c == ' ')
        .filter(|&i| i >= boundary)
        .unwrap_or(cut);

    let mut out: String = chars[..cut_at].iter().collect();
    out.push('…');
    out
}
