/// Collapses every whitespace run to one space, trims the ends and escapes
/// the markup-reserved characters `&`, `<` and `>`.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        push_escaped(&mut out, word);
    }
    out
}

/// Reverses the escaping done by [`clean_text`]; `&amp;` is decoded last so
/// `&amp;lt;` stays `&lt;`.
pub fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
