//! A `nom`-based tokenizer for the XPath 1.0 expression language.
//!
//! Conditions arrive inside XML attributes, so the XML-entity spellings of
//! the relational operators (`&lt;`, `&gt;=`, ...) are accepted alongside the
//! bare forms.

use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{map, opt, recognize},
    sequence::{delimited, pair, preceded},
};

/// One lexical token. Keyword operators (`or`, `and`, `div`, `mod`) are
/// emitted as [`Token::Name`]; the parser resolves them by position, as the
/// XPath disambiguation rules require.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Literal(String),
    Variable(String),
    Name(String),
    Slash,
    SlashSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    DotDot,
    At,
    Star,
    Pipe,
    Plus,
    Minus,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    ColonColon,
}

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))
    .parse(input)
}

/// A qualified name: `ncname` optionally followed by `:ncname`. The second
/// colon of an axis separator (`::`) never matches because an `ncname`
/// cannot start with `:`.
fn q_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), nc_name)))).parse(input)
}

/// XPath numbers: digits with an optional fraction, or a leading-dot
/// fraction. No exponents.
fn number(input: &str) -> IResult<&str, f64> {
    map(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |s: &str| s.parse::<f64>().unwrap_or(f64::NAN),
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))
    .parse(input)
}

fn operator(input: &str) -> IResult<&str, Token> {
    alt((
        map(tag("//"), |_| Token::SlashSlash),
        map(tag("/"), |_| Token::Slash),
        map(tag("::"), |_| Token::ColonColon),
        map(tag(".."), |_| Token::DotDot),
        map(tag("."), |_| Token::Dot),
        map(tag("!="), |_| Token::NotEquals),
        map(tag("<="), |_| Token::LessOrEqual),
        map(tag("&lt;="), |_| Token::LessOrEqual),
        map(tag(">="), |_| Token::GreaterOrEqual),
        map(tag("&gt;="), |_| Token::GreaterOrEqual),
        map(tag("<"), |_| Token::Less),
        map(tag("&lt;"), |_| Token::Less),
        map(tag(">"), |_| Token::Greater),
        map(tag("&gt;"), |_| Token::Greater),
        map(tag("="), |_| Token::Equals),
        map(tag("("), |_| Token::LParen),
        map(tag(")"), |_| Token::RParen),
        map(tag("["), |_| Token::LBracket),
        map(tag("]"), |_| Token::RBracket),
        map(tag(","), |_| Token::Comma),
        map(tag("@"), |_| Token::At),
    ))
    .parse(input)
}

fn operator2(input: &str) -> IResult<&str, Token> {
    alt((
        map(tag("*"), |_| Token::Star),
        map(tag("|"), |_| Token::Pipe),
        map(tag("+"), |_| Token::Plus),
        map(tag("-"), |_| Token::Minus),
    ))
    .parse(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((
        map(number, Token::Number),
        map(string_literal, |s| Token::Literal(s.to_string())),
        map(preceded(char('$'), q_name), |s| Token::Variable(s.to_string())),
        map(q_name, |s| Token::Name(s.to_string())),
        operator,
        operator2,
    ))
    .parse(input)
}

/// Tokenizes a whole expression, failing on the first unrecognized input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, XPathError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        let (r, _) = multispace0::<&str, nom::error::Error<&str>>(rest)
            .map_err(|e| XPathError::Lex {
                expression: input.to_string(),
                message: e.to_string(),
            })?;
        if r.is_empty() {
            break;
        }
        match token(r) {
            Ok((r2, t)) => {
                tokens.push(t);
                rest = r2;
            }
            Err(_) => {
                return Err(XPathError::Lex {
                    expression: input.to_string(),
                    message: format!("unrecognized input at '{}'", r),
                });
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_path() {
        let tokens = tokenize("/test/settings/priority").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Slash,
                Token::Name("test".into()),
                Token::Slash,
                Token::Name("settings".into()),
                Token::Slash,
                Token::Name("priority".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_axis_and_predicate() {
        let tokens = tokenize("child::animal[name='cat']").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Name("child".into()),
                Token::ColonColon,
                Token::Name("animal".into()),
                Token::LBracket,
                Token::Name("name".into()),
                Token::Equals,
                Token::Literal("cat".into()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("3.14").unwrap(), vec![Token::Number(3.14)]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
        // Numbers may end with a bare dot.
        assert_eq!(tokenize("1.").unwrap(), vec![Token::Number(1.0)]);
        assert_eq!(
            tokenize("../x").unwrap(),
            vec![Token::DotDot, Token::Slash, Token::Name("x".into())]
        );
    }

    #[test]
    fn test_tokenize_entity_operators() {
        assert_eq!(
            tokenize("a &lt;= b").unwrap(),
            vec![
                Token::Name("a".into()),
                Token::LessOrEqual,
                Token::Name("b".into()),
            ]
        );
    }

    #[test]
    fn test_hyphenated_name_is_one_token() {
        assert_eq!(
            tokenize("if-feature").unwrap(),
            vec![Token::Name("if-feature".into())]
        );
        assert_eq!(
            tokenize("a - b").unwrap(),
            vec![
                Token::Name("a".into()),
                Token::Minus,
                Token::Name("b".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_rejects_garbage() {
        assert!(tokenize("a ~ b").is_err());
    }
}
