pub fn expand_template(template: &str, source: &str, playlist_name: &str) -> String {
    template.replace("${source}", source).replace("${playlist_name}", playlist_name)
}

/// Shorten an upstream error body before it goes into an error message.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut s: String = trimmed.chars().take(max_chars).collect();
    s.push('…');
    s
}
