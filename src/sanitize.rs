//! File-name sanitizing for recognized metadata strings.
//!
//! Turns a raw title/artist/album as returned by Shazam into something that
//! is safe to use as a path component on every common filesystem and still
//! reads well in a file browser.

use deunicode::deunicode_with_tofu;

/// Substituted when nothing presentable survives sanitizing.
pub const PLACEHOLDER: &str = "Unknown song";

/// Characters rejected by at least one mainstream filesystem.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Sanitize a raw metadata string into a filesystem-safe name.
///
/// The steps run in this order:
/// 1. transliterate to ASCII (keeping the original if nothing visible remains)
/// 2. strip parenthesized segments, nested ones included
/// 3. drop `< > : " / \ | ? *`
/// 4. replace `&` with `-`
/// 5. title-case each whitespace-separated token
/// 6. fall back to [`PLACEHOLDER`] when the result is blank
///
/// [`PLACEHOLDER`] itself is returned unchanged, so `sanitize` is idempotent.
pub fn sanitize(raw: &str) -> String {
    let transliterated = transliterate(raw);
    if transliterated.trim() == PLACEHOLDER {
        return PLACEHOLDER.to_string();
    }
    let without_parens = strip_parenthesized(&transliterated);
    let legal: String = without_parens
        .chars()
        .filter(|c| !ILLEGAL_CHARS.contains(c))
        .collect();
    let dashed = legal.replace('&', "-");
    let titled = title_case(&dashed);

    if titled.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        titled
    }
}

fn transliterate(raw: &str) -> String {
    let ascii = deunicode_with_tofu(raw, "");
    if ascii.trim().is_empty() {
        raw.to_string()
    } else {
        ascii
    }
}

/// Remove every `( ... )` segment. A closing paren seen at depth zero is dropped.
fn strip_parenthesized(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
