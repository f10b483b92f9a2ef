//! Slug derivation and read-time estimation for post content.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Average reading speed used for `read_time`.
pub const WORDS_PER_MINUTE: usize = 200;

/// Slug base used when a title has no ASCII-representable characters.
const FALLBACK_SLUG: &str = "post";

#[allow(clippy::unwrap_used)]
static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

#[allow(clippy::unwrap_used)]
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Map a lowercase Latin letter with diacritics to its ASCII spelling.
const fn fold_latin(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'ß' => "ss",
        'ţ' | 'ť' | 'ŧ' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ŵ' => "w",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    })
}

/// Turn a title into a URL-safe slug.
///
/// Lowercases, folds accented Latin letters to ASCII, drops every other
/// non-alphanumeric character and joins the remaining words with `-`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut folded = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        match fold_latin(c) {
            Some(ascii) => folded.push_str(ascii),
            None => folded.push(c),
        }
    }

    let stripped = DISALLOWED_RE.replace_all(&folded, "");
    WHITESPACE_RE
        .replace_all(stripped.trim(), "-")
        .into_owned()
}

/// Derive the stored slug for a post titled `title` at time `at`.
///
/// The suffix is the last six digits of the epoch milliseconds, so two
/// posts with the same title get different slugs unless they are created
/// in the same millisecond modulo 1000 seconds. The unique index on
/// `post.slug` catches that remaining case.
#[must_use]
pub fn derive_slug(title: &str, at: DateTime<Utc>) -> String {
    let mut base = slugify(title);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }
    let suffix = at.timestamp_millis().rem_euclid(1_000_000);
    format!("{base}-{suffix:06}")
}

/// Estimated reading time in minutes: `ceil(words / 200)`.
#[must_use]
pub fn read_time(content: &str) -> i32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Rust: A *Fast* Language!  "), "rust-a-fast-language");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Crème Brûlée à la Française"), "creme-brulee-a-la-francaise");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slugify_drops_punctuation_and_hyphens() {
        assert_eq!(slugify("what's new (v2.0) @home"), "whats-new-v20-home");
        assert_eq!(slugify("well-known  facts"), "wellknown-facts");
    }

    #[test]
    fn test_derive_slug_suffix() {
        let at = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();
        assert_eq!(derive_slug("Hello World", at), "hello-world-123456");

        let at = Utc.timestamp_millis_opt(1_700_000_000_042).unwrap();
        assert_eq!(derive_slug("Hello World", at), "hello-world-000042");
    }

    #[test]
    fn test_derive_slug_fallback() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_001).unwrap();
        assert_eq!(derive_slug("日本語", at), "post-000001");
    }

    #[test]
    fn test_read_time() {
        let four_hundred = vec!["word"; 400].join(" ");
        assert_eq!(read_time(&four_hundred), 2);

        let two_oh_one = vec!["word"; 201].join("\n");
        assert_eq!(read_time(&two_oh_one), 2);

        assert_eq!(read_time("just a few words here"), 1);
        assert_eq!(read_time("   "), 0);
    }
}
