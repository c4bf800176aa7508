//! HTML escaping and site link helpers.

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// Escape a raw byte slice of source text.
///
/// Invalid UTF-8 is replaced rather than rejected; the byte offsets of the
/// surrounding sweep are unaffected.
pub fn escape_bytes(bytes: &[u8]) -> String {
    escape(&String::from_utf8_lossy(bytes))
}

fn clean(file: &str) -> &str {
    let mut file = file;
    while let Some(rest) = file.strip_prefix("./") {
        file = rest;
    }
    file.trim_start_matches('/')
}

/// `../` repeated once per directory level of `file`, leading from its page to the site root.
pub fn resource_prefix(file: &str) -> String {
    "../".repeat(clean(file).matches('/').count())
}

/// Site-relative location of the page rendered for `file`.
pub fn page_path(file: &str) -> String {
    format!("{}.html", clean(file))
}

/// Link from the page of `from_file` to the page of `to_file`.
pub fn page_href(from_file: &str, to_file: &str) -> String {
    format!("{}{}", resource_prefix(from_file), page_path(to_file))
}

/// Final path component, used as a file's display label.
pub fn base_name(file: &str) -> &str {
    let trimmed = file.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape(r#"a<b && "c">'d'"#), "a&lt;b &amp;&amp; &#34;c&#34;&gt;&#39;d&#39;");
        assert_eq!(escape_bytes(b"x < y"), "x &lt; y");
    }

    #[test]
    fn prefix_counts_directory_levels() {
        assert_eq!(resource_prefix("main.go"), "");
        assert_eq!(resource_prefix("./a/b/c.go"), "../../");
        assert_eq!(page_path("./a/b.go"), "a/b.go.html");
    }

    #[test]
    fn hrefs_are_relative_to_the_current_page() {
        assert_eq!(page_href("a/b.go", "c.go"), "../c.go.html");
        assert_eq!(page_href("c.go", "a/b.go"), "a/b.go.html");
        assert_eq!(base_name("a/b/c.go"), "c.go");
        assert_eq!(base_name("c.go"), "c.go");
    }
}
