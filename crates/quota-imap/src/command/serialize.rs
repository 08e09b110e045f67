//! Command serialization helpers.

use crate::{Error, Result};

/// Command bytes, split after every synchronizing literal header.
///
/// Each segment but the last ends in `{n}\r\n`; the server's continuation
/// request must arrive before the next segment is sent.
#[derive(Debug, Default)]
pub struct Wire {
    segments: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl Wire {
    /// Appends raw protocol bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.current.extend_from_slice(bytes);
    }

    /// Appends an astring: a bare atom when possible, a quoted string for
    /// printable ASCII, otherwise a literal.
    ///
    /// CR, LF and NUL cannot be sent in any form and are rejected.
    pub fn astring(&mut self, s: &str) -> Result<()> {
        if s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
            return Err(Error::InvalidArgument(
                "argument contains CR, LF or NUL".to_string(),
            ));
        }

        if !s.is_ascii() {
            self.current
                .extend_from_slice(format!("{{{}}}\r\n", s.len()).as_bytes());
            self.segments.push(std::mem::take(&mut self.current));
            self.current.extend_from_slice(s.as_bytes());
        } else if s.is_empty() || s.bytes().any(needs_quoting) {
            self.current.push(b'"');
            for b in s.bytes() {
                if b == b'"' || b == b'\\' {
                    self.current.push(b'\\');
                }
                self.current.push(b);
            }
            self.current.push(b'"');
        } else {
            self.current.extend_from_slice(s.as_bytes());
        }
        Ok(())
    }

    /// Terminates the command with CRLF and returns its segments.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.current.extend_from_slice(b"\r\n");
        self.segments.push(self.current);
        self.segments
    }
}

/// Returns true if the byte cannot appear in a bare atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn astring(s: &str) -> Vec<Vec<u8>> {
        let mut wire = Wire::default();
        wire.astring(s).unwrap();
        wire.finish()
    }

    fn single(s: &str) -> String {
        let segments = astring(s);
        assert_eq!(segments.len(), 1);
        String::from_utf8(segments[0].clone()).unwrap()
    }

    #[test]
    fn test_atom_passthrough() {
        assert_eq!(single("INBOX"), "INBOX\r\n");
        assert_eq!(single("user@example.com"), "user@example.com\r\n");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(single(""), "\"\"\r\n");
        assert_eq!(single("a b"), "\"a b\"\r\n");
        assert_eq!(single("back\\slash"), "\"back\\\\slash\"\r\n");
        assert_eq!(single("50%"), "\"50%\"\r\n");
        assert_eq!(single("tab\there"), "\"tab\there\"\r\n");
    }

    #[test]
    fn test_non_ascii_is_literal() {
        let segments = astring("pässword");
        assert_eq!(segments, vec![b"{9}\r\n".to_vec(), "pässword\r\n".as_bytes().to_vec()]);
    }

    #[test]
    fn test_line_breaks_rejected() {
        for bad in ["pass\r\nA1 LOGOUT", "a\nb", "a\rb", "nul\0"] {
            let mut wire = Wire::default();
            let err = wire.astring(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }
}
