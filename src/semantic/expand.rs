//! Dockerfile word expansion for the undefined-variable analysis.
//!
//! Approximates the expansion Docker applies to instruction arguments:
//! `$NAME`, `${NAME}`, `${NAME:-default}`, `${NAME-default}`, `${NAME:+alt}`,
//! `${NAME+alt}`, with `\$` escaping a literal dollar. References that
//! resolve to nothing *and* carry no default are collected as unmatched.
//! `${NAME:?err}`-style operators expand to empty and still count as plain
//! references.

/// Result of expanding one word.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expansion {
    pub expanded: String,
    /// Names referenced without a value and without a default, in order of
    /// first appearance.
    pub unmatched: Vec<String>,
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expands `input` against `lookup`, recording unmatched references.
///
/// `lookup` returns `Some` for defined names; a declared-but-valueless ARG
/// should return `Some("")` so it counts as defined.
pub fn expand_word(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Expansion {
    let mut out = Expansion::default();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.expanded.push(escaped),
                None => out.expanded.push('\\'),
            },
            '$' => match chars.peek() {
                Some('{') => {
                    chars.next();
                    let body = take_braced(&mut chars);
                    expand_braced(&body, lookup, &mut out);
                }
                Some(&c2) if is_name_start(c2) => {
                    let mut name = String::new();
                    while chars.peek().is_some_and(|&c| is_name_char(c)) {
                        name.push(chars.next().unwrap());
                    }
                    match lookup(&name) {
                        Some(value) => out.expanded.push_str(&value),
                        None => record_unmatched(&mut out, &name),
                    }
                }
                _ => out.expanded.push('$'),
            },
            _ => out.expanded.push(c),
        }
    }

    out
}

/// Consumes up to the matching `}` with nesting for defaults that
/// themselves contain `${…}`.
fn take_braced(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut body = String::new();
    let mut depth = 1usize;
    for c in chars.by_ref() {
        match c {
            '{' => {
                depth += 1;
                body.push(c);
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                body.push(c);
            }
            _ => body.push(c),
        }
    }
    body
}

fn expand_braced(body: &str, lookup: &dyn Fn(&str) -> Option<String>, out: &mut Expansion) {
    let name_end = body
        .char_indices()
        .find(|&(i, c)| !(if i == 0 { is_name_start(c) } else { is_name_char(c) }))
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let (name, rest) = body.split_at(name_end);

    if name.is_empty() {
        // `${}` or similar garbage; emit verbatim
        out.expanded.push_str("${");
        out.expanded.push_str(body);
        out.expanded.push('}');
        return;
    }

    let value = lookup(name);

    let (op, operand) = if let Some(stripped) = rest.strip_prefix(":-") {
        ("-", stripped)
    } else if let Some(stripped) = rest.strip_prefix(":+") {
        ("+", stripped)
    } else if let Some(stripped) = rest.strip_prefix('-') {
        ("-", stripped)
    } else if let Some(stripped) = rest.strip_prefix('+') {
        ("+", stripped)
    } else {
        // plain `${NAME}`, or an operator we only approximate (`:?` etc.)
        match value {
            Some(v) => out.expanded.push_str(&v),
            None => record_unmatched(out, name),
        }
        return;
    };

    match (op, value) {
        ("-", Some(v)) => out.expanded.push_str(&v),
        ("-", None) => {
            // undefined with a default present: defined enough, use default
            let inner = expand_word(operand, lookup);
            out.expanded.push_str(&inner.expanded);
            out.unmatched.extend(inner.unmatched);
        }
        ("+", Some(_)) => {
            let inner = expand_word(operand, lookup);
            out.expanded.push_str(&inner.expanded);
            out.unmatched.extend(inner.unmatched);
        }
        ("+", None) => {}
        _ => unreachable!(),
    }
}

fn record_unmatched(out: &mut Expansion, name: &str) {
    if !out.unmatched.iter().any(|n| n == name) {
        out.unmatched.push(name.to_string());
    }
}

/// Best suggestion for a misspelled name: the known name sharing the longest
/// common prefix (at least 2 characters), ties broken by declaration order.
pub fn suggest<'a>(name: &str, known: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut best: Option<(usize, &str)> = None;
    for candidate in known {
        let common = name
            .chars()
            .zip(candidate.chars())
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count();
        if common >= 2 && best.map_or(true, |(len, _)| common > len) {
            best = Some((common, candidate));
        }
    }
    best.map(|(_, candidate)| candidate.to_string())
}
