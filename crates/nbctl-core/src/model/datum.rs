// ── Column value text forms ──
//
// Rendering and parsing of column values for the generic database
// commands (`list`, `create`, `add`, `wait-until`). Strings render bare
// when they look like identifiers and JSON-quoted otherwise; sets render
// as `[a, b]` and maps as `{k=v}`.

use std::collections::BTreeMap;

use crate::error::CoreError;

/// Render a string the way `list` shows it.
pub fn render_str(s: &str) -> String {
    if is_bare_word(s) {
        s.to_owned()
    } else {
        quote(s)
    }
}

/// Render any sequence of already-rendered atoms as a set.
pub fn render_set<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let items: Vec<String> = items.into_iter().collect();
    format!("[{}]", items.join(", "))
}

/// Render a string→string map.
pub fn render_map(map: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{}={}", render_str(k), render_str(v)))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Render an optional scalar: absent values are the empty set.
pub fn render_optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "[]".to_owned(), |v| v.to_string())
}

/// Whether a rendered column value equals a user-supplied value.
///
/// Users may type strings bare even when `list` would quote them.
pub fn value_matches(rendered: &str, supplied: &str) -> bool {
    rendered == supplied || rendered == quote(supplied)
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Parse a single string atom, accepting bare or JSON-quoted input.
pub fn parse_string(raw: &str) -> Result<String, CoreError> {
    let raw = raw.trim();
    if raw.starts_with('"') {
        serde_json::from_str(raw)
            .map_err(|e| CoreError::invalid(format!("{raw}: invalid quoted string ({e})")))
    } else {
        Ok(raw.to_owned())
    }
}

/// Parse a set of strings: `a,b`, `[a, b]`, or `[]`.
pub fn parse_set(raw: &str) -> Result<Vec<String>, CoreError> {
    let inner = strip_brackets(raw.trim(), '[', ']');
    split_top_level(inner, ',')
        .into_iter()
        .filter(|atom| !atom.trim().is_empty())
        .map(parse_string)
        .collect()
}

/// Parse a string map: `k=v,k2=v2` or `{k=v, k2=v2}`.
pub fn parse_map(raw: &str) -> Result<BTreeMap<String, String>, CoreError> {
    let inner = strip_brackets(raw.trim(), '{', '}');
    let mut map = BTreeMap::new();
    for pair in split_top_level(inner, ',') {
        if pair.trim().is_empty() {
            continue;
        }
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CoreError::invalid(format!("{pair}: map entry must be KEY=VALUE")))?;
        map.insert(parse_string(key)?, parse_string(value)?);
    }
    Ok(map)
}

pub fn parse_bool(raw: &str) -> Result<bool, CoreError> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CoreError::invalid(format!(
            "{other}: expected \"true\" or \"false\""
        ))),
    }
}

pub fn parse_integer(raw: &str) -> Result<i64, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::invalid(format!("{raw}: expected integer")))
}

// ── Private helpers ──────────────────────────────────────────────────

fn is_bare_word(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && s != "true"
        && s != "false"
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

fn strip_brackets(s: &str, open: char, close: char) -> &str {
    s.strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .unwrap_or(s)
}

/// Split on `sep`, ignoring separators inside double quotes.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bare_words_render_unquoted() {
        assert_eq!(render_str("sw0"), "sw0");
        assert_eq!(render_str("from-lport"), "from-lport");
        assert_eq!(render_str(""), "\"\"");
        assert_eq!(render_str("true"), "\"true\"");
        assert_eq!(
            render_str("aa:bb:cc:dd:ee:ff 10.0.0.1"),
            "\"aa:bb:cc:dd:ee:ff 10.0.0.1\""
        );
    }

    #[test]
    fn set_parsing_respects_quotes() {
        let set = parse_set(r#"["a,b", c]"#).unwrap();
        assert_eq!(set, vec!["a,b".to_owned(), "c".to_owned()]);
        assert!(parse_set("[]").unwrap().is_empty());
    }

    #[test]
    fn map_parsing_accepts_braces() {
        let map = parse_map("{vlan=10, mode=trunk}").unwrap();
        assert_eq!(map.get("vlan").map(String::as_str), Some("10"));
        assert_eq!(map.get("mode").map(String::as_str), Some("trunk"));
        assert!(parse_map("novalue").is_err());
    }

    #[test]
    fn supplied_values_match_quoted_rendering() {
        assert!(value_matches("\"aa:bb:cc:dd:ee:ff\"", "aa:bb:cc:dd:ee:ff"));
        assert!(value_matches("sw0", "sw0"));
        assert!(!value_matches("sw0", "sw1"));
    }
}
