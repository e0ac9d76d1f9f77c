//! Small helpers shared by the framework and handy in controllers.

use md5::{Digest, Md5};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use rand::Rng;
use serde_json::Value;

const RANDOM_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Characters left alone by `url_quote`, matching the classic `quote()` safe set.
const QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// A random string of `len` characters drawn from `A-Z0-9`.
pub fn random_str(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| RANDOM_CHARS[rng.gen_range(0..RANDOM_CHARS.len())] as char)
        .collect()
}

/// Percent-encodes `s` for use in a URL path, query value or cookie.
pub fn url_quote(s: &str) -> String {
    utf8_percent_encode(s, QUOTE_SET).to_string()
}

/// Reverses [`url_quote`]. Invalid UTF-8 sequences are replaced.
pub fn url_unquote(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Lowercase hex MD5 digest of `data`. For checksums and cache keys, never passwords.
pub fn md5sum(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", Md5::digest(data.as_ref()))
}

/// Parses an optionally negative decimal integer. Anything else, including
/// surrounding whitespace or an empty string, is `None`.
pub fn to_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Merges `source` into `target` in place.
///
/// Objects are merged key by key, recursively. Any other value in `source`
/// replaces the one in `target`.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn random_str_uses_the_expected_alphabet() {
        let s = random_str(64);
        assert_eq!(s.len(), 64);
        assert!(s.bytes().all(|b| RANDOM_CHARS.contains(&b)));
        assert_ne!(random_str(32), random_str(32));
    }

    #[test]
    fn to_int_accepts_only_plain_integers() {
        assert_eq!(to_int("42"), Some(42));
        assert_eq!(to_int("-7"), Some(-7));
        assert_eq!(to_int(""), None);
        assert_eq!(to_int("-"), None);
        assert_eq!(to_int("4.2"), None);
        assert_eq!(to_int(" 1"), None);
        assert_eq!(to_int("99999999999999999999"), None);
    }

    #[test]
    fn md5sum_is_lowercase_hex() {
        assert_eq!(md5sum(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5sum("hello"), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(md5sum(b"hello".as_slice()), md5sum("hello"));
    }

    #[test]
    fn quote_and_unquote() {
        assert_eq!(url_quote("a b/c?d=é"), "a%20b/c%3Fd%3D%C3%A9");
        assert_eq!(url_unquote("a%20b/c%3Fd%3D%C3%A9"), "a b/c?d=é");
    }

    #[test]
    fn deep_merge_recurses_into_objects() {
        let mut target = json!({
            "db": { "host": "localhost", "port": 3306 },
            "debug": false,
        });
        deep_merge(&mut target, json!({
            "db": { "port": 3307, "user": "app" },
            "debug": true,
            "extra": [1, 2],
        }));
        assert_eq!(target, json!({
            "db": { "host": "localhost", "port": 3307, "user": "app" },
            "debug": true,
            "extra": [1, 2],
        }));
    }

    #[test]
    fn deep_merge_replaces_non_objects() {
        let mut target = json!({ "db": { "host": "localhost" } });
        deep_merge(&mut target, json!({ "db": "sqlite" }));
        assert_eq!(target, json!({ "db": "sqlite" }));
    }
}
