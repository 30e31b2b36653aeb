use regex::Regex;
use reqwest::Url;
use std::sync::OnceLock;

fn href_pattern() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| {
        Regex::new(r#"(?i)<a\s[^>]*?href\s*=\s*["']([^"']+)["']"#).expect("valid href pattern")
    })
}

/// Extract the anchor targets of an HTML directory listing that end with `ext`
///
/// Relative links are resolved against `base`, which must be the URL of
/// the listing itself (with a trailing slash). Links that cannot be
/// resolved are dropped.
pub fn file_links(html: &str, base: &Url, ext: &str) -> Vec<String> {
    href_pattern()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|href| href.ends_with(ext))
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .collect()
}
