//! String helpers that understand CSS quoting, escapes and parentheses.

/// Collapses whitespace outside strings to a single space, and drops it
/// entirely next to any character in `tight`.
pub fn minify_fragment(input: &str, tight: &[char]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space {
            let after_tight = out.chars().last().map_or(true, |last| tight.contains(&last));
            if !after_tight && !tight.contains(&c) {
                out.push(' ');
            }
            pending_space = false;
        }

        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' | '\'' => {
                out.push(c);
                while let Some(s) = chars.next() {
                    out.push(s);
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if s == c {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Splits on `sep` where it is not inside parentheses, brackets or strings.
pub fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' | '\'' => match quote {
                Some(q) if q == c => quote = None,
                None => quote = Some(c),
                _ => {}
            },
            _ if quote.is_some() => {}
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Removes one level of matching quotes.
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Byte range of the first `name(...)` function call, parentheses included.
pub fn find_function(input: &str, name: &str) -> Option<(usize, usize)> {
    let lower = input.to_ascii_lowercase();
    let needle = format!("{}(", name);
    let mut search_from = 0;

    while let Some(rel) = lower[search_from..].find(&needle) {
        let start = search_from + rel;
        // 避免把 `myurl(` 當成 `url(`
        let preceded_by_ident = input[..start]
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_');
        if preceded_by_ident {
            search_from = start + needle.len();
            continue;
        }

        let open = start + needle.len() - 1;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for (i, c) in input[open..].char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' | '\'' => match quote {
                    Some(q) if q == c => quote = None,
                    None => quote = Some(c),
                    _ => {}
                },
                _ if quote.is_some() => {}
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((start, open + i + 1));
                    }
                }
                _ => {}
            }
        }
        return None;
    }
    None
}

/// Argument of the first `name(...)` call, unquoted.
pub fn function_argument<'a>(input: &'a str, name: &str) -> Option<&'a str> {
    let (start, end) = find_function(input, name)?;
    Some(unquote(&input[start + name.len() + 1..end - 1]))
}
