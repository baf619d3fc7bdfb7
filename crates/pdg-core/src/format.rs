use std::borrow::Cow;

/// Escape text for use in XML character data and attribute values.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    if !text.contains(&['&', '<', '>', '"', '\''][..]) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
