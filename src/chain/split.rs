//! Bracket- and quote-aware string helpers used by the normalizer and dispatcher

/// Split `text` on every top-level occurrence of `delimiter`
///
/// Occurrences inside quotes (`"..."`, `'...'`) or nested brackets
/// (`()`, `[]`, `{}`) are kept intact.
///
/// ```
/// use chimera_core::chain::split::smart_split;
///
/// assert_eq!(smart_split("a, [b, c], 'd,e'", ","), vec!["a", " [b, c]", " 'd,e'"]);
/// ```
pub fn smart_split(text: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth: usize = 0;
    let mut idx = 0;

    while idx < text.len() {
        let rest = &text[idx..];
        let Some(ch) = rest.chars().next() else {
            break;
        };

        if let Some(q) = quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            idx += ch.len_utf8();
            continue;
        }

        if depth == 0 && rest.starts_with(delimiter) {
            parts.push(std::mem::take(&mut current));
            idx += delimiter.len();
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(ch);
        idx += ch.len_utf8();
    }

    parts.push(current);
    parts
}

/// True when `text` is wrapped in matching single or double quotes
pub fn is_quoted(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
}

/// Strip one level of matching surrounding quotes
pub fn unquote(text: &str) -> &str {
    if is_quoted(text) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Wrap `text` in double quotes, escaping backslashes and double quotes
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Truncate `text` to at most `max` characters, for log lines
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
