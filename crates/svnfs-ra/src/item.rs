//! Wire items of the `svn://` protocol.
//!
//! Every message is a sequence of items separated by whitespace:
//!
//! ```text
//! item   = number | string | word | list
//! number = digit+ SP
//! string = digit+ ':' bytes SP       ; length-prefixed, binary safe
//! word   = alpha (alnum | '-')* SP
//! list   = '(' SP item* ')' SP
//! ```

use std::io::{self, BufRead};

use crate::{RaError, Result};

/// Largest string the client will accept in one item (64 MiB).
pub const MAX_STRING_LEN: u64 = 64 * 1024 * 1024;

/// Deepest list nesting the client will follow.
const MAX_DEPTH: usize = 64;

/// One protocol item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Number(u64),
    String(Vec<u8>),
    Word(String),
    List(Vec<Item>),
}

impl Item {
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Item::String(bytes.into())
    }

    pub fn word(word: &str) -> Self {
        Item::Word(word.to_string())
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            Item::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Item::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// String item decoded as UTF-8 (lossy).
    pub fn as_text(&self) -> Option<String> {
        self.as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Item::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Item]> {
        match self {
            Item::List(items) => Some(items),
            _ => None,
        }
    }

    /// Append the wire form of this item (with its trailing space) to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Item::Number(n) => {
                out.extend_from_slice(n.to_string().as_bytes());
                out.push(b' ');
            }
            Item::String(bytes) => {
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(bytes);
                out.push(b' ');
            }
            Item::Word(word) => {
                out.extend_from_slice(word.as_bytes());
                out.push(b' ');
            }
            Item::List(items) => {
                out.extend_from_slice(b"( ");
                for item in items {
                    item.encode(out);
                }
                out.extend_from_slice(b") ");
            }
        }
    }
}

/// Read one complete item from `reader`, skipping leading whitespace.
pub fn read_item<R: BufRead>(reader: &mut R) -> Result<Item> {
    let first = skip_whitespace(reader)?;
    parse_item(reader, first, 0)
}

fn malformed(msg: impl Into<String>) -> RaError {
    RaError::Malformed(msg.into())
}

fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\n'
}

fn next_byte<R: BufRead>(reader: &mut R) -> Result<u8> {
    let byte = match reader.fill_buf()?.first() {
        Some(&b) => b,
        None => {
            return Err(RaError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )))
        }
    };
    reader.consume(1);
    Ok(byte)
}

/// Returns the first non-whitespace byte.
fn skip_whitespace<R: BufRead>(reader: &mut R) -> Result<u8> {
    loop {
        let b = next_byte(reader)?;
        if !is_space(b) {
            return Ok(b);
        }
    }
}

fn parse_item<R: BufRead>(reader: &mut R, first: u8, depth: usize) -> Result<Item> {
    match first {
        b'0'..=b'9' => {
            let mut value = u64::from(first - b'0');
            loop {
                match next_byte(reader)? {
                    b @ b'0'..=b'9' => {
                        value = value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(u64::from(b - b'0')))
                            .ok_or_else(|| malformed("number out of range"))?;
                    }
                    b':' => return read_string(reader, value),
                    b if is_space(b) => return Ok(Item::Number(value)),
                    other => {
                        return Err(malformed(format!(
                            "unexpected byte {other:#04x} in number"
                        )))
                    }
                }
            }
        }
        b'a'..=b'z' | b'A'..=b'Z' => {
            let mut word = String::new();
            word.push(char::from(first));
            loop {
                match next_byte(reader)? {
                    b if b.is_ascii_alphanumeric() || b == b'-' => word.push(char::from(b)),
                    b if is_space(b) => return Ok(Item::Word(word)),
                    other => {
                        return Err(malformed(format!("unexpected byte {other:#04x} in word")))
                    }
                }
            }
        }
        b'(' => {
            if depth >= MAX_DEPTH {
                return Err(malformed("lists nested too deeply"));
            }
            if !is_space(next_byte(reader)?) {
                return Err(malformed("expected whitespace after '('"));
            }
            let mut items = Vec::new();
            loop {
                let b = skip_whitespace(reader)?;
                if b == b')' {
                    if !is_space(next_byte(reader)?) {
                        return Err(malformed("expected whitespace after ')'"));
                    }
                    return Ok(Item::List(items));
                }
                items.push(parse_item(reader, b, depth + 1)?);
            }
        }
        other => Err(malformed(format!("unexpected byte {other:#04x}"))),
    }
}

fn read_string<R: BufRead>(reader: &mut R, len: u64) -> Result<Item> {
    if len > MAX_STRING_LEN {
        return Err(malformed(format!("string of {len} bytes exceeds limit")));
    }
    let len = usize::try_from(len).map_err(|_| malformed("string length overflow"))?;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    if !is_space(next_byte(reader)?) {
        return Err(malformed("expected whitespace after string"));
    }
    Ok(Item::String(bytes))
}
