//! Cheap heuristic for deciding whether a message should go through the
//! markdown renderer or be shown as preformatted plain text.

use regex::Regex;
use std::sync::OnceLock;

const PATTERNS: &[&str] = &[
    r"\*\*.*?\*\*",     // bold
    r"\*.*?\*",         // italic
    r"(?m)^#{1,6}\s",   // ATX header
    r"(?m)^[-*+]\s",    // unordered list
    r"(?m)^\d+\.\s",    // ordered list
    r"```[\s\S]*?```",  // fenced code
    r"`.*?`",           // inline code
    r"(?m)^>",          // blockquote
    r"\n\n",            // paragraph break
];

fn patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::error!(%pattern, error = %err, "invalid markdown pattern");
                    None
                }
            })
            .collect()
    })
}

/// Returns `true` when `content` looks like it carries markdown markup.
pub fn contains_markdown(content: Option<&str>) -> bool {
    let Some(content) = content.filter(|c| !c.is_empty()) else {
        return false;
    };
    patterns().iter().any(|re| re.is_match(content))
}
