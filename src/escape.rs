use std::borrow::Cow;
use std::fmt;

/// A percent-encoded sequence that could not be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EscapeError {
    /// A `%` that is not followed by two hex digits.
    InvalidEscape(String),
    /// The decoded bytes are not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEscape(escape) => write!(f, "invalid URL escape \"{}\"", escape),
            Self::InvalidUtf8 => write!(f, "decoded path is not valid UTF-8"),
        }
    }
}

impl std::error::Error for EscapeError {}

/// Decodes `%XX` sequences in a path.
///
/// Unlike query decoding, `+` is kept as is. Paths without a `%` are
/// returned without allocating.
pub fn unescape(input: &str) -> Result<Cow<'_, str>, EscapeError> {
    if !input.contains('%') {
        return Ok(Cow::Borrowed(input));
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while let Some(&c) = bytes.get(i) {
        if c != b'%' {
            out.push(c);
            i += 1;
            continue;
        }

        let decoded = match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(&hi), Some(&lo)) => hex(hi).zip(hex(lo)).map(|(hi, lo)| hi << 4 | lo),
            _ => None,
        };

        match decoded {
            Some(byte) => out.push(byte),
            // '%' is ASCII, so `i` is a char boundary
            None => {
                return Err(EscapeError::InvalidEscape(
                    input[i..].chars().take(3).collect(),
                ))
            }
        }

        i += 3;
    }

    String::from_utf8(out)
        .map(Cow::Owned)
        .map_err(|_| EscapeError::InvalidUtf8)
}

/// Percent-encodes every byte that may not appear verbatim in a URL path.
pub fn escape_path(input: &str) -> Cow<'_, str> {
    if input.bytes().all(is_path_safe) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    for byte in input.bytes() {
        if is_path_safe(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0xF) as usize] as char);
        }
    }

    Cow::Owned(out)
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

fn hex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// unreserved characters plus the sub-delims, ':', '@' and '/'
fn is_path_safe(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'-' | b'.'
                | b'_'
                | b'~'
                | b'!'
                | b'$'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b','
                | b';'
                | b'='
                | b':'
                | b'@'
                | b'/'
        )
}
