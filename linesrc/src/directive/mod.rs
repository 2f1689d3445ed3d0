pub mod reference;

use std::sync::LazyLock;

use regex::Regex;

use crate::directive::reference::SubRef;

static INCLUDE_SUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*!includesub\s+(?:"([^"]+)"|'([^']+)'|([^"'\s][^"']*?))\s*$"#)
        .expect("includesub pattern compiles")
});

static START_SUB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*!startsub\s+([A-Za-z_][A-Za-z_0-9]*)").expect("startsub pattern compiles")
});

static END_SUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*!endsub(?:\s|$)").expect("endsub pattern compiles"));

/// A sub-block directive recognized on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    IncludeSub(SubRef),
    StartSub(String),
    EndSub,
}

impl Directive {
    /// Classify a line. Patterns are tried include, start, end; the first
    /// match wins. Anything else (including malformed directives) is `None`
    /// and should be treated as ordinary content.
    pub fn parse(text: &str) -> Option<Directive> {
        if let Some(caps) = INCLUDE_SUB.captures(text) {
            let reference = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))?
                .as_str()
                .trim();
            return Some(Directive::IncludeSub(SubRef::parse(reference)));
        }
        if let Some(caps) = START_SUB.captures(text) {
            return Some(Directive::StartSub(caps[1].to_string()));
        }
        if END_SUB.is_match(text) {
            return Some(Directive::EndSub);
        }
        None
    }
}
