//! Common string utilities: integer parsing, hex and decimal formatting

use std::fmt::Write;

/// Integer types accepted by [`to_integer`].
pub trait ParseInt: Copy {
    const SIGNED: bool;
    fn from_i128(v: i128) -> Option<Self>;
}

macro_rules! impl_parse_int {
    ($signed:expr => $($t:ty),*) => {$(
        impl ParseInt for $t {
            const SIGNED: bool = $signed;
            fn from_i128(v: i128) -> Option<Self> { <$t>::try_from(v).ok() }
        }
    )*};
}
impl_parse_int!(false => u8, u16, u32, u64, usize);
impl_parse_int!(true => i8, i16, i32, i64, isize);

/// Parses a decimal or `0x`-prefixed hexadecimal integer.
///
/// Surrounding whitespace is ignored, as are `,` thousands separators.
/// A leading `-` is only accepted for signed types. Values that overflow
/// `T` are rejected rather than truncated.
pub fn to_integer<T: ParseInt>(text: &str) -> Option<T> {
    let mut s = text.trim();
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    } else if let Some(rest) = s.strip_prefix('-') {
        if !T::SIGNED {
            return None;
        }
        s = rest;
        negative = true;
    }

    let (digits, base) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(rest) => (rest, 16),
        None => (s, 10),
    };

    let mut value: i128 = 0;
    let mut seen = false;
    for c in digits.chars() {
        if c == ',' {
            continue;
        }
        let d = c.to_digit(base)? as i128;
        value = value.checked_mul(base as i128)?.checked_add(d)?;
        // anything wider than u64 cannot fit any ParseInt type
        if value > u64::MAX as i128 {
            return None;
        }
        seen = true;
    }
    if !seen {
        return None;
    }
    T::from_i128(if negative { -value } else { value })
}

/// `0x`-prefixed upper-case hex, zero-padded to `width` digits.
pub fn hexa<T: Into<u64>>(value: T, width: usize) -> String {
    format!("0x{:0width$X}", value.into(), width = width)
}

/// Decimal with `,` every three digits.
pub fn decimal<T: Into<u64>>(value: T) -> String {
    let digits = value.into().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Upper-case hex pairs, no separator.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(s, "{b:02X}");
    }
    s
}

/// Decodes a string of hex digits. ASCII whitespace between digits is
/// skipped; an odd number of digits or any other character is an error.
pub fn hex_decode(text: &str) -> Option<Vec<u8>> {
    decode_hex_digits(text, true)
}

/// Like [`hex_decode`] but whitespace is an error too.
pub fn hex_decode_strict(text: &str) -> Option<Vec<u8>> {
    decode_hex_digits(text, false)
}

fn decode_hex_digits(text: &str, skip_whitespace: bool) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() / 2);
    let mut high: Option<u8> = None;
    for c in text.chars() {
        if skip_whitespace && c.is_ascii_whitespace() {
            continue;
        }
        let nibble = c.to_digit(16)? as u8;
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if high.is_some() {
        return None;
    }
    Some(out)
}

/// Multi-line hex dump, `per_line` bytes per line, each line indented.
pub fn hex_dump(data: &[u8], indent: usize, per_line: usize) -> String {
    let per_line = per_line.max(1);
    let mut out = String::new();
    for chunk in data.chunks(per_line) {
        out.push_str(&" ".repeat(indent));
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer::<u16>("27137"), Some(27137));
        assert_eq!(to_integer::<u16>("0x6a01"), Some(0x6a01));
        assert_eq!(to_integer::<u16>("0X50"), Some(0x50));
        assert_eq!(to_integer::<u32>(" 1,000 "), Some(1000));
        assert_eq!(to_integer::<i32>("-12"), Some(-12));
        assert_eq!(to_integer::<u8>("-1"), None);
        assert_eq!(to_integer::<u8>("256"), None);
        assert_eq!(to_integer::<u16>(""), None);
        assert_eq!(to_integer::<u16>("0x"), None);
        assert_eq!(to_integer::<u16>("12ab"), None);
        assert_eq!(to_integer::<u64>("99999999999999999999999"), None);
    }

    #[test]
    fn test_hexa_decimal() {
        assert_eq!(hexa(0x50u16, 4), "0x0050");
        assert_eq!(hexa(0xABu8, 2), "0xAB");
        assert_eq!(decimal(1234567u32), "1,234,567");
        assert_eq!(decimal(999u16), "999");
        assert_eq!(decimal(0u8), "0");
    }

    #[test]
    fn test_hex_codec() {
        assert_eq!(hex_encode(&[0xDE, 0xAD, 0xBE, 0xEF]), "DEADBEEF");
        assert_eq!(hex_decode("deadbeef"), Some(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(hex_decode("DE AD\n BE EF"), Some(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(hex_decode(""), Some(vec![]));
        assert_eq!(hex_decode("abc"), None);
        assert_eq!(hex_decode("xyz"), None);
    }

    #[test]
    fn test_hex_decode_strict() {
        assert_eq!(hex_decode_strict("deadBEEF"), Some(vec![0xDE, 0xAD, 0xBE, 0xEF]));
        assert_eq!(hex_decode_strict(""), Some(vec![]));
        assert_eq!(hex_decode_strict("de ad"), None);
        assert_eq!(hex_decode_strict("de\tad"), None);
        assert_eq!(hex_decode_strict(" dead"), None);
    }

    #[test]
    fn test_hex_dump() {
        let dump = hex_dump(&[1, 2, 3, 4, 5], 2, 4);
        assert_eq!(dump, "  01 02 03 04\n  05\n");
    }
}
