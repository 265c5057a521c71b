//! Argument parsing - comma tokenizing into bounded signed integers

/// Token delimiter inside a payload
pub const DELIMITER: u8 = b',';

/// Outcome of parsing one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseSummary {
    /// Tokens found in the payload
    pub tokens: usize,
    /// Tokens written to the argument list
    pub stored: usize,
    /// Tokens dropped because the list was full
    pub discarded: usize,
}

/// Fixed-capacity argument list, reused in place across frames
#[derive(Debug, Clone)]
pub struct ArgumentList {
    values: Vec<i32>,
    capacity: usize,
}

impl ArgumentList {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Replace the contents with the arguments of `payload`.
    ///
    /// Tokens past the capacity are counted but not stored.
    pub fn parse_into(&mut self, payload: &[u8]) -> ParseSummary {
        self.values.clear();

        let mut tokens = 0;
        for token in tokenize(payload) {
            tokens += 1;
            if self.values.len() < self.capacity {
                self.values.push(parse_integer(token));
            }
        }

        ParseSummary {
            tokens,
            stored: self.values.len(),
            discarded: tokens - self.values.len(),
        }
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Parse a payload into at most `max` arguments
pub fn parse_arguments(payload: &[u8], max: usize) -> Vec<i32> {
    tokenize(payload).take(max).map(parse_integer).collect()
}

/// Split on commas; an empty payload has no tokens, otherwise every
/// (possibly empty) field is a token.
fn tokenize(payload: &[u8]) -> impl Iterator<Item = &[u8]> {
    let fields = if payload.is_empty() {
        None
    } else {
        Some(payload.split(|&b| b == DELIMITER))
    };
    fields.into_iter().flatten()
}

/// `atoi`-style conversion.
///
/// Skips leading whitespace, accepts one optional sign, then reads digits up
/// to the first non-digit. No digits yields 0; out-of-range values saturate.
pub fn parse_integer(token: &[u8]) -> i32 {
    let mut rest = token;
    while let [first, tail @ ..] = rest {
        if !is_c_space(*first) {
            break;
        }
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let mut magnitude: i64 = 0;
    for &b in rest.iter().take_while(|b| b.is_ascii_digit()) {
        magnitude = magnitude
            .saturating_mul(10)
            .saturating_add(i64::from(b - b'0'));
    }

    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Whitespace as C's `isspace` sees it, vertical tab included
fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_forms() {
        assert_eq!(parse_integer(b"42"), 42);
        assert_eq!(parse_integer(b"-17"), -17);
        assert_eq!(parse_integer(b"+8"), 8);
        assert_eq!(parse_integer(b"  \t12"), 12);
        assert_eq!(parse_integer(b"12abc"), 12);
        assert_eq!(parse_integer(b"3 4"), 3);
    }

    #[test]
    fn test_parse_integer_unparseable() {
        assert_eq!(parse_integer(b""), 0);
        assert_eq!(parse_integer(b"abc"), 0);
        assert_eq!(parse_integer(b"-"), 0);
        assert_eq!(parse_integer(b"+-3"), 0);
        assert_eq!(parse_integer(b"- 3"), 0);
    }

    #[test]
    fn test_parse_integer_saturates() {
        assert_eq!(parse_integer(b"2147483647"), i32::MAX);
        assert_eq!(parse_integer(b"-2147483648"), i32::MIN);
        assert_eq!(parse_integer(b"99999999999999999999999"), i32::MAX);
        assert_eq!(parse_integer(b"-99999999999"), i32::MIN);
    }

    #[test]
    fn test_list_parse() {
        let mut list = ArgumentList::new(8);
        let summary = list.parse_into(b"1,-2, 3,x");
        assert_eq!(list.as_slice(), &[1, -2, 3, 0]);
        assert_eq!(
            summary,
            ParseSummary { tokens: 4, stored: 4, discarded: 0 }
        );
    }

    #[test]
    fn test_empty_payload() {
        let mut list = ArgumentList::new(4);
        list.parse_into(b"5");
        let summary = list.parse_into(b"");
        assert!(list.is_empty());
        assert_eq!(summary.tokens, 0);
    }

    #[test]
    fn test_only_commas() {
        let mut list = ArgumentList::new(8);
        let summary = list.parse_into(b",,");
        assert_eq!(list.as_slice(), &[0, 0, 0]);
        assert_eq!(summary.tokens, 3);
    }

    #[test]
    fn test_capacity_bound() {
        let mut list = ArgumentList::new(3);
        let summary = list.parse_into(b"1,2,3,4,5");
        assert_eq!(list.as_slice(), &[1, 2, 3]);
        assert_eq!(list.len(), list.capacity());
        assert_eq!(
            summary,
            ParseSummary { tokens: 5, stored: 3, discarded: 2 }
        );
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments(b"10,20,30", 2), vec![10, 20]);
        assert!(parse_arguments(b"", 4).is_empty());
    }
}
