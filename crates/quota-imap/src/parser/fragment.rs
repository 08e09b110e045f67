//! Nested reply values.

use super::lexer::{Lexer, Token};

/// Maximum list nesting kept when building a fragment tree.
///
/// Lists nested deeper than this are dropped.
pub const MAX_NESTING: usize = 64;

/// A value from a server reply.
///
/// An untagged response becomes a [`Fragment::Sequence`] of its tokens, with
/// each parenthesized or bracketed list becoming a nested sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Atom, number or quoted string.
    Text(String),
    /// Literal payload, or raw bytes the lexer could not tokenize.
    Binary(Vec<u8>),
    /// Ordered list of fragments.
    Sequence(Vec<Fragment>),
    /// A value that carries no text, such as `NIL`.
    Other,
}

impl Fragment {
    /// Creates a text fragment.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Creates a binary fragment.
    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::Binary(data.into())
    }

    /// Builds a fragment tree from the data portion of a response line.
    ///
    /// Never fails: once the lexer rejects the input, the unconsumed bytes
    /// are kept as a single [`Fragment::Binary`].
    #[must_use]
    pub fn from_bytes(input: &[u8]) -> Self {
        let mut lexer = Lexer::new(input);
        // Open lists; the first entry is the top-level sequence.
        let mut stack: Vec<Vec<Self>> = vec![Vec::new()];
        // Opening tokens seen beyond MAX_NESTING that are still unclosed.
        let mut dropped = 0usize;

        loop {
            let start = lexer.position();
            let token = match lexer.next_token() {
                Ok(Token::Eof) => break,
                Ok(token) => token,
                Err(_) => {
                    let rest = input.get(start..).unwrap_or_default();
                    push(&mut stack, dropped, Self::Binary(rest.to_vec()));
                    break;
                }
            };

            if token.is_open() {
                if dropped > 0 || stack.len() > MAX_NESTING {
                    dropped += 1;
                } else {
                    stack.push(Vec::new());
                }
                continue;
            }

            if token.is_close() {
                if dropped > 0 {
                    dropped -= 1;
                } else if stack.len() > 1 {
                    let list = stack.pop().unwrap_or_default();
                    push(&mut stack, 0, Self::Sequence(list));
                }
                continue;
            }

            let value = match token {
                Token::Atom(s) => Self::text(s),
                Token::QuotedString(s) => Self::Text(s),
                Token::Number(n) => Self::Text(n.to_string()),
                Token::Literal(data) => Self::Binary(data),
                Token::Nil => Self::Other,
                Token::Asterisk => Self::text("*"),
                Token::Plus => Self::text("+"),
                _ => continue,
            };
            push(&mut stack, dropped, value);
        }

        // Close anything the server left open.
        while stack.len() > 1 {
            let list = stack.pop().unwrap_or_default();
            push(&mut stack, 0, Self::Sequence(list));
        }

        Self::Sequence(stack.pop().unwrap_or_default())
    }

    /// Returns the leading word of a sequence, e.g. `QUOTA` or `QUOTAROOT`.
    #[must_use]
    pub fn keyword(&self) -> Option<&str> {
        match self {
            Self::Sequence(items) => match items.first() {
                Some(Self::Text(s)) => Some(s),
                _ => None,
            },
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn push(stack: &mut [Vec<Fragment>], dropped: usize, value: Fragment) {
    if dropped > 0 {
        return;
    }
    if let Some(top) = stack.last_mut() {
        top.push(value);
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

    #[test]
    fn test_quota_line() {
        let fragment = Fragment::from_bytes(b"QUOTA \"User quota\" (STORAGE 10 512)\r\n");

        assert_eq!(
            fragment,
            Fragment::Sequence(vec![
                Fragment::text("QUOTA"),
                Fragment::text("User quota"),
                Fragment::Sequence(vec![
                    Fragment::text("STORAGE"),
                    Fragment::text("10"),
                    Fragment::text("512"),
                ]),
            ])
        );
        assert_eq!(fragment.keyword(), Some("QUOTA"));
    }

    #[test]
    fn test_literal_and_nil() {
        let fragment = Fragment::from_bytes(b"QUOTAROOT {5}\r\nINBOX NIL\r\n");

        assert_eq!(
            fragment,
            Fragment::Sequence(vec![
                Fragment::text("QUOTAROOT"),
                Fragment::binary(b"INBOX".to_vec()),
                Fragment::Other,
            ])
        );
    }

    #[test]
    fn test_unbalanced_lists_are_closed() {
        let fragment = Fragment::from_bytes(b"QUOTA x (STORAGE 1 2");

        assert_eq!(
            fragment,
            Fragment::Sequence(vec![
                Fragment::text("QUOTA"),
                Fragment::text("x"),
                Fragment::Sequence(vec![
                    Fragment::text("STORAGE"),
                    Fragment::text("1"),
                    Fragment::text("2"),
                ]),
            ])
        );

        let stray = Fragment::from_bytes(b"A) B");
        assert_eq!(
            stray,
            Fragment::Sequence(vec![Fragment::text("A"), Fragment::text("B")])
        );
    }

    #[test]
    fn test_lexer_error_keeps_rest_as_binary() {
        let fragment = Fragment::from_bytes(b"QUOTA \"broken");

        assert_eq!(
            fragment,
            Fragment::Sequence(vec![
                Fragment::text("QUOTA"),
                Fragment::binary(b"\"broken".to_vec()),
            ])
        );
    }

    #[test]
    fn test_deep_nesting_is_dropped() {
        let depth = MAX_NESTING + 10;
        let mut input = "(".repeat(depth);
        input.push_str("DEEP");
        input.push_str(&")".repeat(depth));
        input.push_str(" TAIL");

        let fragment = Fragment::from_bytes(input.as_bytes());

        let Fragment::Sequence(items) = &fragment else {
            panic!("expected sequence");
        };
        assert_eq!(items.last(), Some(&Fragment::text("TAIL")));

        fn contains_deep(f: &Fragment) -> bool {
            match f {
                Fragment::Text(s) => s == "DEEP",
                Fragment::Sequence(items) => items.iter().any(contains_deep),
                _ => false,
            }
        }
        assert!(!contains_deep(&fragment));
    }

    proptest::proptest! {
        #[test]
        fn test_from_bytes_never_panics(input in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let _ = Fragment::from_bytes(&input);
        }
    }
}
