//! Text-level repair of near-JSON upstream output.
//!
//! Every fix is an independent pure function. [`repair`] chains them in a
//! fixed order; the chain is idempotent. The fixes are heuristics: they can
//! turn garbage into a wrong-but-parseable tree, which the normalizer then
//! absorbs with defaults.

use std::sync::LazyLock;

use regex::Regex;

static REPEATED_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(?:\s*,)+").expect("valid regex"));

static LEADING_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{\[])(?:\s*,)+").expect("valid regex"));

static TRAILING_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:,\s*)+([}\]])").expect("valid regex"));

static SEPARATOR_AFTER_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(?:\s*,)+").expect("valid regex"));

// `}{`, `] [`, `}[` ...
static ADJACENT_SCOPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([}\]])(\s*)([{\[])").expect("valid regex"));

// `"a" "b"`, `1 "b"`, `} "b"`. Requires whitespace so `""` is left alone.
static ADJACENT_VALUES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(["\d}\]])(\s+)""#).expect("valid regex"));

/// Run every fix in order.
///
/// Comments are stripped again after trimming: the first opener may sit
/// inside what the untrimmed text read as a string, which shifts where
/// strings begin.
pub fn repair(text: &str) -> String {
    let text = strip_comments(text);
    let text = strip_comments(trim_to_outer_scope(&text));
    let text = collapse_control_whitespace(&text);
    let text = insert_missing_separators(&text);
    let text = collapse_repeated_separators(&text);
    let text = drop_separator_after_colon(&text);
    drop_dangling_separators(&text)
}

/// Remove `//` line comments and `/* */` block comments that sit outside
/// string literals. Line comments keep their terminating newline.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Byte index of the bracket closing the one opened at `start`.
///
/// Counts `{}` and `[]` together and ignores brackets inside string
/// literals and comments. `None` when the scope never closes.
pub fn matching_close(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text[start..].char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match (c, chars.peek().map(|&(_, next)| next)) {
            ('"', _) => in_string = true,
            ('/', Some('/')) => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for (_, next) in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ('{' | '[', _) => depth += 1,
            ('}' | ']', _) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Slice from the first `{` or `[` to its balanced close. When the scope
/// never closes, the slice ends at the last matching closer instead; with
/// no closer at all it runs to the end. Text without any opener is returned
/// whole.
pub fn trim_to_outer_scope(text: &str) -> &str {
    let Some(start) = text.find(['{', '[']) else {
        return text;
    };
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = matching_close(text, start)
        .or_else(|| text.rfind(closer).filter(|&end| end > start));
    match end {
        Some(end) => &text[start..=end],
        None => &text[start..],
    }
}

/// Literal newlines and tabs become spaces; carriage returns are dropped.
pub fn collapse_control_whitespace(text: &str) -> String {
    text.chars()
        .filter(|&c| c != '\r')
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect()
}

/// `a,,, b` → `a, b`
pub fn collapse_repeated_separators(text: &str) -> String {
    REPEATED_SEPARATORS.replace_all(text, ",").into_owned()
}

/// `{ , "a"` → `{ "a"` and `1 ,]` → `1 ]`
pub fn drop_dangling_separators(text: &str) -> String {
    let text = LEADING_SEPARATORS.replace_all(text, "$1");
    TRAILING_SEPARATORS.replace_all(&text, "$1").into_owned()
}

/// `"a":, "b"` → `"a": "b"`
pub fn drop_separator_after_colon(text: &str) -> String {
    SEPARATOR_AFTER_COLON.replace_all(text, ":").into_owned()
}

/// `} {` → `}, {` and `"a" "b"` → `"a", "b"`
pub fn insert_missing_separators(text: &str) -> String {
    let text = ADJACENT_SCOPES.replace_all(text, "$1,$2$3");
    ADJACENT_VALUES.replace_all(&text, "$1,$2\"").into_owned()
}
