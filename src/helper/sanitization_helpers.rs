use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Default allow-list for rich post content: standard prose formatting only.
const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "b", "em", "i", "u", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol",
    "li", "blockquote", "code", "pre", "a", "img",
];

/// Allow-list used for post titles: inline emphasis only.
pub const TITLE_ALLOWED_TAGS: &[&str] = &["b", "i", "u", "strong", "em"];

/// Cleans `text` against an allow-list of HTML tags. Disallowed elements are
/// removed entirely (not escaped) while their text content is preserved;
/// script/style bodies are dropped altogether. Attributes are restricted per
/// element: links keep href/title, images keep src/alt/title, nothing else
/// survives. `None` selects the default prose allow-list; an empty slice
/// strips all markup (see [`strip_all_html`]).
pub fn sanitize_html(text: &str, allowed_tags: Option<&[&str]>) -> String {
    let tags = allowed_tags.unwrap_or(DEFAULT_ALLOWED_TAGS);
    if tags.is_empty() {
        return strip_all_html(text);
    }

    // ammonia refuses script-bearing tags in an allow-list; drop them
    // before they get there, whatever the caller passed.
    let safe_tags: HashSet<&str> = tags
        .iter()
        .copied()
        .filter(|t| !matches!(*t, "script" | "style"))
        .collect();

    let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    if safe_tags.contains("a") {
        tag_attributes.insert("a", ["href", "title"].into_iter().collect());
    }
    if safe_tags.contains("img") {
        tag_attributes.insert("img", ["src", "alt", "title"].into_iter().collect());
    }

    ammonia::Builder::new()
        .tags(safe_tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .link_rel(None)
        .clean(text)
        .to_string()
}

/// Strips all markup and returns the concatenated text content. Former
/// block-level boundaries become single spaces so `<p>a</p><p>b</p>`
/// reads "a b", not "ab".
pub fn strip_all_html(text: &str) -> String {
    // Closing block tags and line breaks become whitespace before the
    // strip, then runs collapse to single spaces.
    let boundary =
        Regex::new(r"(?i)</(?:p|div|h[1-6]|li|ul|ol|blockquote|pre|tr|table)>|<br\s*/?>").unwrap();
    let spaced = boundary.replace_all(text, " ");

    let stripped = ammonia::Builder::new()
        .tags(HashSet::new())
        .clean(&spaced)
        .to_string();

    let collapsed = Regex::new(r"\s+").unwrap().replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed_entirely() {
        let out = sanitize_html("<script>alert(1)</script><p>ok</p>", Some(&["p"]));
        assert_eq!(out, "<p>ok</p>");
    }

    #[test]
    fn script_in_allow_list_is_ignored() {
        let out = sanitize_html("<script>alert(1)</script><p>ok</p>", Some(&["p", "script"]));
        assert_eq!(out, "<p>ok</p>");
    }

    #[test]
    fn event_handler_attributes_are_dropped() {
        let out = sanitize_html("<p onclick=\"evil()\">hi</p>", None);
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn disallowed_tags_keep_their_text() {
        let out = sanitize_html("<p>keep <marquee>this</marquee> text</p>", Some(&["p"]));
        assert_eq!(out, "<p>keep this text</p>");
    }

    #[test]
    fn default_allow_list_restricts_attributes() {
        let out = sanitize_html(
            "<a href=\"/x\" title=\"t\" target=\"_blank\">link</a>",
            None,
        );
        assert!(out.contains("href=\"/x\""));
        assert!(out.contains("title=\"t\""));
        assert!(!out.contains("target"));

        let img = sanitize_html("<img src=\"/i.png\" alt=\"i\" onerror=\"x()\">", None);
        assert!(img.contains("src=\"/i.png\""));
        assert!(!img.contains("onerror"));
    }

    #[test]
    fn title_allow_list_keeps_only_inline_emphasis() {
        let out = sanitize_html(
            "<h1>Big</h1> <em>fine</em> <img src=\"x\">",
            Some(TITLE_ALLOWED_TAGS),
        );
        assert_eq!(out, "Big <em>fine</em> ");
    }

    #[test]
    fn empty_allow_list_strips_everything() {
        let out = sanitize_html("<p>a</p><p>b</p>", Some(&[]));
        assert_eq!(out, "a b");
    }

    #[test]
    fn strip_all_collapses_block_whitespace() {
        assert_eq!(
            strip_all_html("<h1>Head</h1>\n<p>one</p>\n\n<p>two</p>"),
            "Head one two"
        );
        assert_eq!(strip_all_html("a<br>b<br/>c"), "a b c");
        assert_eq!(strip_all_html("plain text"), "plain text");
    }
}
