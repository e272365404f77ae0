use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normalizes arbitrary text into a URL-safe slug (`a-z0-9-`).
///
/// Input is lowercased and decomposed (NFD) so diacritics can be dropped, and
/// letters without a decomposition are transliterated. Every run of other
/// characters becomes a single hyphen. The result has no leading, trailing or
/// repeated hyphens and is empty when nothing alphanumeric survives; callers
/// must treat an empty slug as invalid.
pub fn normalize(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut prev_dash = false;

    for ch in input.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        match transliterate(ch) {
            Some(ascii) => {
                for mapped in ascii.chars() {
                    push_char(&mut slug, &mut prev_dash, mapped);
                }
            }
            None => push_char(&mut slug, &mut prev_dash, ch),
        }
    }

    slug.trim_matches('-').to_string()
}

fn push_char(slug: &mut String, prev_dash: &mut bool, ch: char) {
    if ch.is_ascii_alphanumeric() {
        slug.push(ch);
        *prev_dash = false;
    } else if !*prev_dash {
        slug.push('-');
        *prev_dash = true;
    }
}

/// Letters that NFD leaves intact but that have an obvious ASCII spelling.
fn transliterate(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'ñ' => "n",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'ø' => "o",
        'đ' | 'ð' => "d",
        'ł' => "l",
        'þ' => "th",
        'ı' => "i",
        _ => return None,
    };
    Some(mapped)
}
