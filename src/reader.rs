//! Buffered, line/column-tracking byte reader shared by the QBF and expansion
//! parsers, with transparent gzip detection.
//!
//! The format specification is line-oriented DIMACS-family text; see
//! <https://www.qbflib.org/qdimacs.html> for the base grammar this extends.

use flate2::read::GzDecoder;
use miette::SourceSpan;
use std::io::{Bytes, Chain, Cursor, Read};
use std::iter::Peekable;
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Sniffs the first two bytes of `reader` for the gzip magic number and, if
/// found, transparently wraps the stream in a streaming gzip decoder.
/// Non-gzip input passes through unchanged; the bytes consumed while probing
/// are never lost, they are re-prepended via [`Read::chain`].
pub fn detect_and_wrap<R: Read + 'static>(mut reader: R) -> std::io::Result<Box<dyn Read>> {
    let mut probe = [0u8; 2];
    let mut read = 0;
    while read < probe.len() {
        match reader.read(&mut probe[read..])? {
            0 => break,
            n => read += n,
        }
    }
    let prefix: Chain<Cursor<Vec<u8>>, R> = Cursor::new(probe[..read].to_vec()).chain(reader);
    if read == GZIP_MAGIC.len() && probe == GZIP_MAGIC {
        Ok(Box::new(GzDecoder::new(prefix)))
    } else {
        Ok(Box::new(prefix))
    }
}

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("The underlying IO has failed")]
    IO(#[from] std::io::Error),

    #[error("Unexpected end of file")]
    UnexpectedEndOfFile { offset: usize },

    #[error("Unexpected character")]
    UnexpectedChar { offset: usize },

    #[error("Invalid integer")]
    InvalidInt { start: usize, end: usize },

    #[error("Value {val} is out of bound")]
    OutOfBound { val: i64, start: usize, end: usize },
}

impl ReaderError {
    pub fn span(&self) -> SourceSpan {
        match *self {
            ReaderError::UnexpectedEndOfFile { offset } | ReaderError::UnexpectedChar { offset } => {
                offset.into()
            }
            ReaderError::InvalidInt { start, end } | ReaderError::OutOfBound { start, end, .. } => {
                (start..end).into()
            }
            ReaderError::IO(_) => 0.into(),
        }
    }
}

/// Current position within the input, used for warnings and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A buffered byte-at-a-time reader tracking `(line, column)` and a global
/// byte offset (the latter used for `miette` source spans).
#[derive(Debug)]
pub struct Reader<R: Read> {
    bytes: Peekable<Bytes<R>>,
    offset: usize,
    line: u32,
    column: u32,
}

impl<R: Read> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self { bytes: reader.bytes().peekable(), offset: 0, line: 1, column: 1 }
    }

    pub fn position(&self) -> Position {
        Position { line: self.line, column: self.column }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn eof(&mut self) -> bool {
        self.peek_byte().is_none()
    }

    pub fn peek_byte(&mut self) -> Option<u8> {
        match self.bytes.peek() {
            Some(Ok(b)) => Some(*b),
            _ => None,
        }
    }

    /// Consumes and returns the next byte, advancing line/column bookkeeping.
    pub fn advance(&mut self) -> Result<Option<u8>, ReaderError> {
        let byte = self.bytes.next().transpose()?;
        if let Some(b) = byte {
            self.offset += 1;
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        Ok(byte)
    }

    fn expect_byte(&mut self) -> Result<u8, ReaderError> {
        self.advance()?.ok_or(ReaderError::UnexpectedEndOfFile { offset: self.offset })
    }

    /// Consumes bytes in `{' ', '\t', '\v', '\r'}`.
    pub fn skip_horizontal_ws(&mut self) -> Result<(), ReaderError> {
        while matches!(self.peek_byte(), Some(b' ' | b'\t' | 0x0b | b'\r')) {
            self.advance()?;
        }
        Ok(())
    }

    /// After [`Self::skip_horizontal_ws`], consumes a trailing `\n` if present.
    /// Returns whether a newline was consumed.
    pub fn skip_newline_if_any(&mut self) -> Result<bool, ReaderError> {
        self.skip_horizontal_ws()?;
        if self.peek_byte() == Some(b'\n') {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Skips horizontal whitespace and newlines, reporting whether any byte
    /// remains.
    pub fn skip_all_ws(&mut self) -> Result<Option<u8>, ReaderError> {
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_whitespace() {
                self.advance()?;
            } else {
                return Ok(Some(b));
            }
        }
        Ok(None)
    }

    /// Consumes bytes until (and including) `until`.
    pub fn skip_until(&mut self, until: u8) -> Result<(), ReaderError> {
        loop {
            match self.advance()? {
                None => return Ok(()),
                Some(b) if b == until => return Ok(()),
                Some(_) => {}
            }
        }
    }

    /// Consumes contiguous non-whitespace bytes, returning them.
    pub fn read_word(&mut self) -> Result<Vec<u8>, ReaderError> {
        let mut word = Vec::new();
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_whitespace() {
                break;
            }
            word.push(b);
            self.advance()?;
        }
        Ok(word)
    }

    /// Matches the exact literal byte sequence, failing on the first
    /// mismatch or premature EOF.
    pub fn expect_literal(&mut self, value: &[u8]) -> Result<(), ReaderError> {
        for &expected in value {
            let found = self.expect_byte()?;
            if found != expected {
                return Err(ReaderError::UnexpectedChar { offset: self.offset });
            }
        }
        Ok(())
    }

    /// Parses an optional leading `-` followed by one or more ASCII digits.
    pub fn read_decimal(&mut self) -> Result<i64, ReaderError> {
        let start = self.offset;
        let mut negative = false;
        let mut parsed: i64 = 0;
        let mut any_digit = false;
        if self.peek_byte() == Some(b'-') {
            negative = true;
            self.advance()?;
        }
        while let Some(b @ b'0'..=b'9') = self.peek_byte() {
            any_digit = true;
            let digit = i64::from(b - b'0');
            parsed = parsed
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(ReaderError::InvalidInt { start, end: self.offset })?;
            self.advance()?;
        }
        if !any_digit {
            return Err(ReaderError::InvalidInt { start, end: self.offset + 1 });
        }
        Ok(if negative { -parsed } else { parsed })
    }

    /// Reads a non-negative variable identifier in `[1, 2^31 - 1]`, or `0`
    /// when `allow_zero` is set (used for list terminators).
    pub fn read_variable(&mut self, allow_zero: bool) -> Result<u32, ReaderError> {
        let start = self.offset;
        let value = self.read_decimal()?;
        let lower = if allow_zero { 0 } else { 1 };
        if value < lower || value > i64::from(crate::literal::Var::MAX_DIMACS) {
            return Err(ReaderError::OutOfBound { val: value, start, end: self.offset });
        }
        Ok(value as u32)
    }

    /// Reads a signed literal, encoding it via [`crate::literal::Lit::from_dimacs`],
    /// or `0` when `allow_zero` is set.
    pub fn read_literal(&mut self, allow_zero: bool) -> Result<i32, ReaderError> {
        let start = self.offset;
        let value = self.read_decimal()?;
        let max = i64::from(crate::literal::Var::MAX_DIMACS);
        if value == 0 {
            if allow_zero {
                return Ok(0);
            }
            return Err(ReaderError::OutOfBound { val: value, start, end: self.offset });
        }
        if value.unsigned_abs() > max as u64 {
            return Err(ReaderError::OutOfBound { val: value, start, end: self.offset });
        }
        Ok(value as i32)
    }

    /// Reads a whitespace-separated list of variables terminated by a `0` or
    /// by a newline. The terminating `0` itself is not included in
    /// the returned sequence. Returns whether the list was properly
    /// terminated by a `0` (as opposed to falling off the end of the line or
    /// the file); callers are expected to warn when it is `false`.
    pub fn read_variable_list(&mut self) -> Result<(Vec<u32>, bool), ReaderError> {
        let mut vars = Vec::new();
        loop {
            self.skip_horizontal_ws()?;
            match self.peek_byte() {
                None => return Ok((vars, false)),
                Some(b'\n') => {
                    self.advance()?;
                    return Ok((vars, false));
                }
                Some(_) => {
                    let var = self.read_variable(true)?;
                    if var == 0 {
                        return Ok((vars, true));
                    }
                    vars.push(var);
                }
            }
        }
    }

    /// As [`Self::read_variable_list`], but for signed literals.
    pub fn read_literal_list(&mut self) -> Result<(Vec<i32>, bool), ReaderError> {
        let mut lits = Vec::new();
        loop {
            self.skip_horizontal_ws()?;
            match self.peek_byte() {
                None => return Ok((lits, false)),
                Some(b'\n') => {
                    self.advance()?;
                    return Ok((lits, false));
                }
                Some(_) => {
                    let lit = self.read_literal(true)?;
                    if lit == 0 {
                        return Ok((lits, true));
                    }
                    lits.push(lit);
                }
            }
        }
    }
}
