//! Quota reply parsing.
//!
//! A `GETQUOTAROOT` reply arrives as a tree of [`Fragment`]s. It is
//! flattened into one space-joined string and searched for the first
//! `STORAGE <used> <limit>` triple. Figures are in KiB (RFC 9208 units).

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

pub use quota_imap::Fragment;

/// Nesting depth beyond which fragments are ignored while flattening.
pub const MAX_FLATTEN_DEPTH: usize = 64;

#[allow(clippy::expect_used)]
static STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"STORAGE ([0-9]+) ([0-9]+)").expect("STORAGE pattern compiles"));

/// Storage usage reported for one quota root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSample {
    /// KiB in use.
    pub used_kb: u64,
    /// KiB allowed.
    pub limit_kb: u64,
}

impl QuotaSample {
    /// Returns usage as a percentage of the limit, or `None` when the limit
    /// is zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> Option<f64> {
        (self.limit_kb != 0).then(|| self.used_kb as f64 / self.limit_kb as f64 * 100.0)
    }
}

impl fmt::Display for QuotaSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} KB", self.used_kb, self.limit_kb)?;
        match self.percent() {
            Some(pct) => write!(f, " ({pct:.1}%)"),
            None => write!(f, " (n/a)"),
        }
    }
}

/// Extracts the storage figures from a raw quota reply.
///
/// Returns `None` when no `STORAGE <used> <limit>` token is present or the
/// numbers do not fit in `u64`.
#[must_use]
pub fn parse_quota(reply: &Fragment) -> Option<QuotaSample> {
    let text = flatten(reply);
    let captures = STORAGE.captures(&text)?;

    Some(QuotaSample {
        used_kb: captures.get(1)?.as_str().parse().ok()?,
        limit_kb: captures.get(2)?.as_str().parse().ok()?,
    })
}

/// Joins every text and binary fragment with single spaces, depth first.
///
/// Binary fragments are decoded as UTF-8, replacing invalid sequences.
/// [`Fragment::Other`] values and anything nested deeper than
/// [`MAX_FLATTEN_DEPTH`] are skipped.
#[must_use]
pub fn flatten(reply: &Fragment) -> String {
    let mut parts = Vec::new();
    collect(reply, 0, &mut parts);
    parts.join(" ")
}

fn collect(fragment: &Fragment, depth: usize, parts: &mut Vec<String>) {
    match fragment {
        Fragment::Text(s) => parts.push(s.clone()),
        Fragment::Binary(data) => parts.push(String::from_utf8_lossy(data).into_owned()),
        Fragment::Sequence(items) if depth < MAX_FLATTEN_DEPTH => {
            for item in items {
                collect(item, depth + 1, parts);
            }
        }
        Fragment::Sequence(_) | Fragment::Other => {}
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(used_kb: u64, limit_kb: u64) -> Option<QuotaSample> {
        Some(QuotaSample { used_kb, limit_kb })
    }

    #[test]
    fn test_typical_reply() {
        let reply = Fragment::Sequence(vec![
            Fragment::binary(b"\"INBOX\" \"User quota\"".to_vec()),
            Fragment::binary(b"\"User quota\" (STORAGE 1234 5678)".to_vec()),
        ]);
        assert_eq!(parse_quota(&reply), sample(1234, 5678));
    }

    #[test]
    fn test_reply_from_wire() {
        let reply = Fragment::Sequence(vec![
            Fragment::from_bytes(b"QUOTAROOT INBOX \"\"\r\n"),
            Fragment::from_bytes(b"QUOTA \"\" (STORAGE 10 512 MESSAGE 3 1000)\r\n"),
        ]);
        assert_eq!(parse_quota(&reply), sample(10, 512));
    }

    #[test]
    fn test_first_storage_wins() {
        let reply = Fragment::text("STORAGE 1 2 STORAGE 3 4");
        assert_eq!(parse_quota(&reply), sample(1, 2));
    }

    #[test]
    fn test_flatten_mixed() {
        let reply = Fragment::Sequence(vec![
            Fragment::text("a"),
            Fragment::Other,
            Fragment::Sequence(vec![Fragment::binary(b"b".to_vec()), Fragment::text("c")]),
        ]);
        assert_eq!(flatten(&reply), "a b c");
    }

    #[test]
    fn test_invalid_utf8_binary() {
        let reply = Fragment::Sequence(vec![
            Fragment::binary(vec![0xFF, 0xFE]),
            Fragment::binary(b"STORAGE 5 10".to_vec()),
        ]);
        assert_eq!(parse_quota(&reply), sample(5, 10));
    }

    #[test]
    fn test_no_storage_token() {
        let reply = Fragment::Sequence(vec![
            Fragment::text("QUOTAROOT"),
            Fragment::text("INBOX"),
            Fragment::text("MESSAGE 3 1000"),
        ]);
        assert_eq!(parse_quota(&reply), None);
        assert_eq!(parse_quota(&Fragment::Sequence(Vec::new())), None);
        assert_eq!(parse_quota(&Fragment::Other), None);
        assert_eq!(parse_quota(&Fragment::text("STORAGE 12")), None);
        assert_eq!(parse_quota(&Fragment::text("STORAGE -1 5")), None);
    }

    #[test]
    fn test_overflow_is_unparseable() {
        let reply = Fragment::text("STORAGE 99999999999999999999999 1");
        assert_eq!(parse_quota(&reply), None);
    }

    #[test]
    fn test_beyond_max_depth_is_ignored() {
        let mut reply = Fragment::text("STORAGE 1 2");
        for _ in 0..=MAX_FLATTEN_DEPTH {
            reply = Fragment::Sequence(vec![reply]);
        }
        assert_eq!(parse_quota(&reply), None);

        let mut shallow = Fragment::text("STORAGE 1 2");
        for _ in 0..MAX_FLATTEN_DEPTH {
            shallow = Fragment::Sequence(vec![shallow]);
        }
        assert_eq!(parse_quota(&shallow), sample(1, 2));
    }

    #[test]
    fn test_percent() {
        let s = QuotaSample {
            used_kb: 500,
            limit_kb: 1000,
        };
        assert_eq!(s.percent(), Some(50.0));
        assert_eq!(s.to_string(), "500/1000 KB (50.0%)");
    }

    #[test]
    fn test_zero_limit_percent() {
        let s = QuotaSample {
            used_kb: 42,
            limit_kb: 0,
        };
        assert_eq!(s.percent(), None);
        assert_eq!(s.to_string(), "42/0 KB (n/a)");
    }

    fn nest(leaf: Fragment, depth: usize, noise: &[bool]) -> Fragment {
        let mut fragment = leaf;
        for i in 0..depth {
            let mut items = vec![fragment];
            if noise.get(i).copied().unwrap_or(false) {
                items.insert(0, Fragment::text("QUOTA"));
                items.push(Fragment::Other);
            }
            fragment = Fragment::Sequence(items);
        }
        fragment
    }

    proptest! {
        #[test]
        fn test_storage_found_at_any_depth(
            depth in 0usize..MAX_FLATTEN_DEPTH,
            binary in any::<bool>(),
            split in any::<bool>(),
            noise in proptest::collection::vec(any::<bool>(), 0..MAX_FLATTEN_DEPTH),
        ) {
            let leaf = match (binary, split) {
                (true, false) => Fragment::binary(b"(STORAGE 1234 5678)".to_vec()),
                (false, false) => Fragment::text("STORAGE 1234 5678"),
                (true, true) => Fragment::Sequence(vec![
                    Fragment::binary(b"STORAGE".to_vec()),
                    Fragment::text("1234"),
                    Fragment::binary(b"5678".to_vec()),
                ]),
                (false, true) => Fragment::Sequence(vec![
                    Fragment::text("STORAGE"),
                    Fragment::text("1234"),
                    Fragment::text("5678"),
                ]),
            };
            // The split leaf adds one level of its own.
            let depth = if split { depth.saturating_sub(1) } else { depth };
            let reply = nest(leaf, depth, &noise);
            prop_assert_eq!(parse_quota(&reply), sample(1234, 5678));
        }

        #[test]
        fn test_no_storage_token_is_unparseable(
            words in proptest::collection::vec("[A-RT-Z0-9 ()]{0,12}", 0..8),
            bytes in proptest::collection::vec(any::<u8>().prop_filter("no S", |b| *b != b'S'), 0..32),
        ) {
            let mut items: Vec<Fragment> = words.iter().map(|w| Fragment::text(w.as_str())).collect();
            items.push(Fragment::binary(bytes));
            let reply = Fragment::Sequence(items);
            prop_assert_eq!(parse_quota(&reply), None);
        }
    }
}
