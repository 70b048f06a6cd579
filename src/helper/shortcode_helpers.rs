use crate::models::WidgetKind;
use regex::{Captures, Regex};

/// Replaces every `[kind id=<int>]` directive with its widget placeholder,
/// leaving all surrounding text untouched. Grammar is fixed: kind is one of
/// quiz/chart/video/pdf and id is a run of digits. Anything else in
/// brackets passes through verbatim, so re-running on expanded output is a
/// no-op.
pub fn expand_shortcodes(content: &str) -> String {
    let re = Regex::new(r"\[(quiz|chart|video|pdf) id=(\d+)\]").unwrap();
    re.replace_all(content, |caps: &Captures| {
        // Both groups are guaranteed by the pattern; a 20-digit id that
        // overflows i64 is not a real widget reference, leave it alone.
        let kind = WidgetKind::parse(&caps[1]).unwrap_or(WidgetKind::Quiz);
        match caps[2].parse::<i64>() {
            Ok(id) => kind.placeholder(id),
            Err(_) => caps[0].to_string(),
        }
    })
    .into_owned()
}
