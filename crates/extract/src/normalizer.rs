use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Markdown list markers a model sometimes puts in front of a line: `- `, `* `, `• `, `1. `, `2) `.
static LIST_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*•]|\d{1,3}[.)])\s+").expect("valid regex"));

/// ` and `, ` & `, `;` and `+` separate co-actors. Slashes never do.
static LIST_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:and|&)\s+|\s*;\s*|\s*\+\s*").expect("valid regex"));

/// Template placeholders a model may echo back instead of a real name.
const PLACEHOLDERS: &[&str] = &[
    "{kinase_name}",
    "{substrate}",
    "{substrate_gene}",
    "{substrate_symbol}",
];

/// Clean an entity name: strip list bullets, markdown emphasis and quotes,
/// collapse inner whitespace and drop trailing sentence punctuation.
pub fn normalize_name(name: &str) -> String {
    let unbulleted = LIST_BULLET.replace(name, "");
    let stripped = unbulleted
        .trim()
        .trim_matches(|c| matches!(c, '*' | '"' | '\'' | '`'))
        .trim()
        .trim_end_matches(['.', ';', ':'])
        .trim();

    WHITESPACE.replace_all(stripped, " ").into_owned()
}

pub fn is_placeholder(name: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| name.eq_ignore_ascii_case(p))
}

/// `N/A` in any casing.
pub fn is_not_available(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("n/a")
}

/// Split a comma-free actor clause into its member names.
pub fn split_actor_list(clause: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(clause)
        .map(normalize_name)
        .filter(|n| !n.is_empty() && !is_not_available(n))
        .collect()
}
