//! Escaping for text placed in generated markup.

pub fn esc_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn esc_attr(input: &str) -> String {
    esc_html(input)
}

/// Escapes a URL for an attribute. Script and data URLs come back empty.
pub fn esc_url(url: &str) -> String {
    let url = crate::redirect::sanitize_url(url.trim());
    let scheme = url
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .filter(|scheme| scheme.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '+'));
    if matches!(scheme.as_deref(), Some("javascript" | "data" | "vbscript")) {
        return String::new();
    }
    esc_attr(&url)
}
