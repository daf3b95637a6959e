use std::borrow::Cow;

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";
/// Character count of the ellipsis
const ELLIPSIS_LEN: usize = 3;

/// HTML entities handled by the sanitizer, longest-match-first per prefix.
///
/// This is the fixed set emitted by the feeds we consume, not a general
/// entity table. `&amp;` decodes one layer per pass so double-encoded input
/// converges instead of skipping straight to the innermost form.
const ENTITIES: &[(&str, char)] = &[
    ("&#039;", '\''),
    ("&#x27;", '\''),
    ("&#x2F;", '/'),
    ("&quot;", '"'),
    ("&amp;", '&'),
    ("&#39;", '\''),
    ("&#47;", '/'),
    ("&lt;", '<'),
    ("&gt;", '>'),
];

/// Reduces raw feed text to plain, display-safe prose.
///
/// Applied to every title and description before an item leaves the fetch
/// layer. The transformation is, in order:
///
/// 1. decode HTML entities and strip markup tags, repeated until neither
///    pass changes the string (double-encoded input otherwise re-surfaces
///    tags on a later decode),
/// 2. collapse consecutive whitespace to single spaces,
/// 3. trim leading/trailing whitespace.
///
/// Pure and total: never fails, empty input yields an empty string, and
/// `sanitize(sanitize(x)) == sanitize(x)` for all `x`.
pub fn sanitize(s: &str) -> String {
    let mut current: String = s.to_string();
    loop {
        let next = {
            let decoded = decode_entities(&current);
            let stripped = strip_markup(&decoded);
            if stripped == current {
                None
            } else {
                Some(stripped.into_owned())
            }
        };
        match next {
            Some(changed) => current = changed,
            None => break,
        }
    }
    collapse_whitespace(&current)
}

/// Decode the fixed entity set in a single left-to-right pass.
fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        match ENTITIES.iter().find(|(pat, _)| rest.starts_with(pat)) {
            Some((pat, ch)) => {
                out.push(*ch);
                rest = &rest[pat.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Remove markup tags, keeping only their inner text.
///
/// Anything between `<` and the next `>` is dropped, including attributes
/// and comments. An unterminated `<` drops the remainder of the string,
/// mirroring how HTML sanitizers treat a truncated tag. A bare `>` is
/// ordinary text and passes through.
fn strip_markup(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => return Cow::Owned(out), // truncated tag, drop the tail
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Collapse whitespace runs to single spaces and trim the ends.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_whitespace = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(c);
            in_whitespace = false;
        }
    }
    out
}

/// Truncates a string to a character budget, appending "..." when cut.
///
/// The budget counts characters, not bytes, and includes the ellipsis: a
/// 200-char budget yields at most 197 content characters plus "...".
/// Strings within budget are returned borrowed with no allocation. Budgets
/// smaller than the ellipsis itself return a plain character slice without
/// the marker.
pub fn truncate_chars(s: &str, budget: usize) -> Cow<'_, str> {
    let count = s.chars().count();
    if count <= budget {
        return Cow::Borrowed(s);
    }

    if budget <= ELLIPSIS_LEN {
        return Cow::Owned(s.chars().take(budget).collect());
    }

    let kept: String = s.chars().take(budget - ELLIPSIS_LEN).collect();
    Cow::Owned(format!("{}{}", kept, ELLIPSIS))
}
