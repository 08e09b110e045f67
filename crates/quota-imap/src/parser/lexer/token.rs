//! IMAP token types.

/// Token types produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Atom (unquoted string without special characters).
    Atom(&'a str),
    /// Quoted string.
    QuotedString(String),
    /// Literal string with size prefix {n}.
    Literal(Vec<u8>),
    /// Number. Quota figures are in KiB and can exceed `u32` on large
    /// mailboxes, so numbers are read as `u64`.
    Number(u64),
    /// Opening parenthesis.
    LParen,
    /// Closing parenthesis.
    RParen,
    /// Opening bracket.
    LBracket,
    /// Closing bracket.
    RBracket,
    /// Space character.
    Space,
    /// Asterisk (untagged response prefix).
    Asterisk,
    /// Plus (continuation response prefix).
    Plus,
    /// NIL literal.
    Nil,
    /// CRLF line ending.
    Crlf,
    /// End of input.
    Eof,
}

impl Token<'_> {
    /// Returns true for tokens that open a nested list.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::LParen | Self::LBracket)
    }

    /// Returns true for tokens that close a nested list.
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Self::RParen | Self::RBracket)
    }
}
