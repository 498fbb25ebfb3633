//! Range specifications: a `|`-separated list of `min..max` or single-value
//! terms over signed 64-bit integers.
//!
//! Bounds carry an explicit sign next to a 64-bit magnitude so a range like
//! `-0..18446744073709551615` is representable; a plain `i64` cannot hold
//! both ends of that span.

use std::cmp::Ordering;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map, map_res, opt},
    multi::separated_list1,
    sequence::{pair, separated_pair},
};

/// One bound: sign plus magnitude. `0` parses as positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeBound {
    pub negative: bool,
    pub magnitude: u64,
}

impl RangeBound {
    pub fn parse(text: &str) -> Option<RangeBound> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let magnitude = digits.parse::<u64>().ok()?;
        Some(RangeBound {
            negative,
            magnitude,
        })
    }
}

impl Ord for RangeBound {
    fn cmp(&self, other: &Self) -> Ordering {
        // -0 and 0 compare equal.
        if self.magnitude == 0 && other.magnitude == 0 {
            return Ordering::Equal;
        }
        match (self.negative, other.negative) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
        }
    }
}

impl PartialOrd for RangeBound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One accepted span. A single-value term has `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeTerm {
    pub min: RangeBound,
    pub max: RangeBound,
}

/// A parsed range attribute. A value is accepted if any term accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpec {
    pub terms: Vec<RangeTerm>,
}

fn bound(input: &str) -> IResult<&str, RangeBound> {
    map_res(
        pair(opt(alt((char('-'), char('+')))), digit1),
        |(sign, digits): (Option<char>, &str)| {
            digits.parse::<u64>().map(|magnitude| RangeBound {
                negative: sign == Some('-'),
                magnitude,
            })
        },
    )
    .parse(input)
}

fn term(input: &str) -> IResult<&str, RangeTerm> {
    alt((
        map(separated_pair(bound, tag(".."), bound), |(min, max)| {
            RangeTerm { min, max }
        }),
        map(bound, |b| RangeTerm { min: b, max: b }),
    ))
    .parse(input)
}

impl RangeSpec {
    /// Parses a range attribute such as `1..100|200..300` or `-0..255`.
    pub fn parse(input: &str) -> Result<RangeSpec, String> {
        match separated_list1(char('|'), term).parse(input.trim()) {
            Ok(("", terms)) => Ok(RangeSpec { terms }),
            Ok((rest, _)) => Err(format!("trailing input '{}' in range", rest)),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Checks a candidate string value against each term, accepting if any
    /// term matches. Non-integer candidates never match.
    pub fn contains(&self, value: &str) -> bool {
        let Some(v) = RangeBound::parse(value) else {
            return false;
        };
        self.terms.iter().any(|t| t.min <= v && v <= t.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_span() {
        let spec = RangeSpec::parse("1..100").unwrap();
        assert!(spec.contains("1"));
        assert!(spec.contains("100"));
        assert!(!spec.contains("0"));
        assert!(!spec.contains("101"));
    }

    #[test]
    fn test_alternation_accepts_any_term() {
        let spec = RangeSpec::parse("1..100|200..300").unwrap();
        assert!(spec.contains("250"));
        assert!(!spec.contains("150"));
    }

    #[test]
    fn test_single_value_term() {
        let spec = RangeSpec::parse("0|5..10").unwrap();
        assert!(spec.contains("0"));
        assert!(spec.contains("7"));
        assert!(!spec.contains("3"));
    }

    #[test]
    fn test_negative_spans() {
        let spec = RangeSpec::parse("-128..127").unwrap();
        assert!(spec.contains("-128"));
        assert!(spec.contains("-1"));
        assert!(spec.contains("127"));
        assert!(!spec.contains("-129"));
        assert!(!spec.contains("128"));
    }

    #[test]
    fn test_full_unsigned_span_with_negative_zero() {
        let spec = RangeSpec::parse("-0..18446744073709551615").unwrap();
        assert!(spec.contains("0"));
        assert!(spec.contains("18446744073709551615"));
        assert!(!spec.contains("-1"));
    }

    #[test]
    fn test_non_integer_candidate_rejected() {
        let spec = RangeSpec::parse("1..10").unwrap();
        assert!(!spec.contains("five"));
        assert!(!spec.contains("5.5"));
        assert!(!spec.contains(""));
    }

    #[test]
    fn test_malformed_range_is_an_error() {
        assert!(RangeSpec::parse("1..").is_err());
        assert!(RangeSpec::parse("a..b").is_err());
        assert!(RangeSpec::parse("1..2|").is_err());
    }

    #[test]
    fn test_zero_is_positive() {
        let zero = RangeBound::parse("0").unwrap();
        assert!(!zero.negative);
        let neg_zero = RangeBound::parse("-0").unwrap();
        assert_eq!(zero.cmp(&neg_zero), Ordering::Equal);
    }
}
