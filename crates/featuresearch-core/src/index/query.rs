//! FTS4 match expression building.

use regex::Regex;
use std::sync::LazyLock;

/// Characters with a meaning in FTS4 query syntax.
static FTS_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[-"():^*.]"#).expect("static regex is valid"));

/// Turn a token into a prefix term.
///
/// Plain tokens get a trailing `*`. Tokens containing FTS syntax
/// characters become a quoted prefix phrase:
/// - `main` → `main*`
/// - `gpt-2` → `"gpt-2*"`
/// - `o"neil` → `"o""neil*"`
pub fn prefix_term(token: &str) -> String {
    if FTS_SPECIAL_CHARS.is_match(token) {
        let escaped = token.trim_end_matches('*').replace('"', "\"\"");
        format!("\"{}*\"", escaped)
    } else {
        format!("{}*", token)
    }
}

/// Build the MATCH expression for a query.
///
/// Empty or blank text produces an empty expression. In fuzzy mode every
/// whitespace-separated token becomes a prefix term; terms are separated by
/// spaces, which FTS4 reads as AND:
/// - `"main str"` → `main* str*`
///
/// Otherwise the text is passed through as a literal full-text expression.
pub fn build_match_expression(text: &str, fuzzy: bool) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    if !fuzzy {
        return text.to_string();
    }

    text.split_whitespace()
        .map(prefix_term)
        .collect::<Vec<_>>()
        .join(" ")
}
