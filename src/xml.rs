//! Canonical markup writer for report documents.
//!
//! Report consumers compare documents textually, so the layout here is fixed:
//! a child element always starts on its own line, nested lines gain two spaces
//! of indentation per level, and leaf text has `&`, `<` and `>` replaced by
//! entities (ampersand first).

use regex::Regex;
use std::sync::LazyLock;

static LINE_START_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^( *)<").expect("regex for line-leading tags"));

/// Wrap already-rendered markup fragments in `<name>...</name>`.
pub fn element<I, S>(name: &str, children: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    wrap(name, children, false)
}

/// A leaf element whose text content is entity-escaped.
pub fn leaf(name: &str, text: &str) -> String {
    wrap(name, [text], true)
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn wrap<I, S>(name: &str, contents: I, escape_text: bool) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut innards = String::new();
    for content in contents {
        let content = content.as_ref();
        let content = if escape_text {
            escape(content)
        } else {
            content.to_string()
        };
        if content.starts_with('<') {
            innards.push('\n');
        }
        innards.push_str(&content);
    }
    let mut innards = LINE_START_TAG.replace_all(&innards, "  ${1}<").into_owned();
    if innards.ends_with(">\n") {
        innards.insert(innards.len() - 1, '\n');
    } else if innards.ends_with('>') {
        innards.push('\n');
    }
    format!("<{name}>{innards}</{name}>")
}
