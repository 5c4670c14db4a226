//! Recognizes secret values that were never filled in.
//!
//! A value counts as a placeholder when it is blank, when it carries a template
//! marker such as `<TOKEN>`, `${TOKEN}` or `{{TOKEN}}` anywhere in it, when it
//! contains a conventional filler (`REPLACE`, `CHANGEME`, `YOUR-`, `TODO`...) in any
//! case, or when it is nothing but a run of `x`. Upper-case segments such as the
//! `ID/TOKEN` of a copied example URL also count.
//!
//! Fillers are matched as substrings, so a real token can occasionally trip the
//! check; `deploy --allow-placeholders` exists for that case.

const FILLER_MARKERS: &[&str] = &[
    "REPLACE",
    "CHANGE_ME",
    "CHANGE-ME",
    "CHANGEME",
    "PLACEHOLDER",
    "TODO",
    "FIXME",
    "YOUR_",
    "YOUR-",
    "INSERT",
    "DUMMY",
    "EXAMPLE",
];

// Compared case-sensitively against whole segments.
const FILLER_SEGMENTS: &[&str] = &["ID", "TOKEN", "SECRET", "TBD"];

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }

    if has_template_marker(value) {
        return true;
    }

    let upper = value.to_ascii_uppercase();
    if FILLER_MARKERS.iter().any(|marker| upper.contains(marker)) {
        return true;
    }

    if value.len() >= 3 && upper.bytes().all(|b| b == b'X') {
        return true;
    }

    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|segment| FILLER_SEGMENTS.contains(&segment))
}

fn has_template_marker(value: &str) -> bool {
    let enclosed = |open: &str, close: &str| {
        value
            .find(open)
            .map(|start| value[start + open.len()..].contains(close))
            .unwrap_or(false)
    };

    enclosed("<", ">") || enclosed("${", "}") || enclosed("{{", "}}")
}
