//! Flattened attribute keys.
//!
//! A key names an attribute's position in the group hierarchy: the group
//! names and the attribute key, joined by `.`. Inside every segment `\` is
//! written as `\\` and `.` as `\.`, so an ungrouped key `a.b` flattens to
//! `a\.b` while key `b` in group `a` flattens to `a.b`.

pub const SEPARATOR: char = '.';
pub const ESCAPE: char = '\\';

fn push_escaped(out: &mut String, segment: &str) {
    for c in segment.chars() {
        if c == ESCAPE || c == SEPARATOR {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

/// Encode a group path and leaf key into a single flattened key.
pub fn encode_key<S: AsRef<str>>(groups: &[S], key: &str) -> String {
    let prefix: usize = groups.iter().map(|g| g.as_ref().len() + 1).sum();
    let mut out = String::with_capacity(prefix + key.len());
    for group in groups {
        push_escaped(&mut out, group.as_ref());
        out.push(SEPARATOR);
    }
    push_escaped(&mut out, key);
    out
}

/// Split a flattened key back into its group path and leaf key.
///
/// Returns `None` for text [`encode_key`] never produces, such as a trailing
/// escape or an escape in front of an ordinary character.
pub fn decode_key(encoded: &str) -> Option<(Vec<String>, String)> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = encoded.chars();

    while let Some(c) = chars.next() {
        if c == ESCAPE {
            match chars.next() {
                Some(next) if next == ESCAPE || next == SEPARATOR => current.push(next),
                _ => return None,
            }
        } else if c == SEPARATOR {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    Some((segments, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_segments_join_with_dots() {
        assert_eq!(encode_key::<&str>(&[], "url"), "url");
        assert_eq!(encode_key(&["request"], "url"), "request.url");
        assert_eq!(encode_key(&["webserver", "request"], "url"), "webserver.request.url");
    }

    #[test]
    fn separators_and_escapes_are_escaped() {
        assert_eq!(encode_key::<&str>(&[], "a.b"), r"a\.b");
        assert_eq!(encode_key(&["a"], "b"), "a.b");
        assert_eq!(encode_key(&[r"a\"], "b"), r"a\\.b");
        assert_eq!(encode_key::<&str>(&[], r"a\.b"), r"a\\\.b");
    }

    #[test]
    fn empty_segments_stay_distinct() {
        assert_ne!(encode_key(&[""], ""), encode_key::<&str>(&[], ""));
        assert_eq!(encode_key(&[""], ""), ".");
    }

    #[test]
    fn decode_rejects_malformed_input() {
        assert_eq!(decode_key(r"a\"), None);
        assert_eq!(decode_key(r"a\b"), None);
        assert_eq!(decode_key(r"a\..b"), Some((vec!["a.".to_string()], "b".to_string())));
    }

    fn segment() -> impl Strategy<Value = String> {
        proptest::string::string_regex(r"[a\\.b]{0,4}").unwrap()
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            groups in proptest::collection::vec(segment(), 0..4),
            key in segment(),
        ) {
            let encoded = encode_key(&groups, &key);
            prop_assert_eq!(decode_key(&encoded), Some((groups, key)));
        }

        #[test]
        fn prop_distinct_paths_never_collide(
            groups_a in proptest::collection::vec(segment(), 0..4),
            key_a in segment(),
            groups_b in proptest::collection::vec(segment(), 0..4),
            key_b in segment(),
        ) {
            prop_assume!(groups_a != groups_b || key_a != key_b);
            prop_assert_ne!(encode_key(&groups_a, &key_a), encode_key(&groups_b, &key_b));
        }
    }
}
