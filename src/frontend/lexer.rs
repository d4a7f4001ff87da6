//! # Lexer
//!
//! Splits source text into a flat sequence of tokens. Whitespace and `;`
//! only separate tokens. Multi-character operators are matched before the
//! single-character ones, so `<<` is never read as two `<`.
use super::{Error, Span};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1, hex_digit1, one_of, satisfy},
    combinator::{not, recognize},
    error::{context, ContextError, ParseError, VerboseError},
    multi::many0_count,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

/// A token of source text, and where it was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub span: Span,
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ';'
}

fn is_bracket(c: char) -> bool {
    matches!(c, '(' | ')' | '{' | '}')
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn separator<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    take_while(is_separator)(input)
}

fn operator<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    alt((
        tag("=="),
        tag("!="),
        tag("<<"),
        tag(">>"),
        tag("<="),
        tag(">="),
        recognize(one_of("(){}=+-*/%<>")),
    ))(input)
}

/// A backslash escape: `\u{...}` or a backslash and any one character.
fn escape<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    recognize(preceded(
        char('\\'),
        alt((
            recognize(delimited(tag("u{"), hex_digit1, char('}'))),
            recognize(anychar),
        )),
    ))(input)
}

/// A `'` followed by an escape, or by everything up to the next separator
/// or bracket. Whether that is exactly one character is checked later.
fn char_literal<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    recognize(preceded(
        char('\''),
        alt((
            escape,
            take_while1(|c: char| !is_separator(c) && !is_bracket(c)),
        )),
    ))(input)
}

fn integer<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    // `12ab` is neither a number nor a name.
    terminated(digit1, not(satisfy(is_symbol_char)))(input)
}

fn identifier<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn token<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, &'a str, E> {
    alt((
        context("character literal", char_literal),
        context("operator", operator),
        context("integer", integer),
        context("identifier", identifier),
    ))(input)
}

/// Split comment-free source code into tokens.
pub fn tokenize(code: &str) -> Result<Vec<Token>, Error> {
    let lex_error = |rest: &str| Error::Lex {
        offset: code.len() - rest.len(),
        found: rest.chars().next().unwrap_or(' '),
    };

    let mut tokens = vec![];
    let mut input = code;
    loop {
        let (rest, _) = separator::<VerboseError<&str>>(input).map_err(|_| lex_error(input))?;
        if rest.is_empty() {
            return Ok(tokens);
        }

        let start = code.len() - rest.len();
        let (after, text) = token::<VerboseError<&str>>(rest).map_err(|_| lex_error(rest))?;
        tokens.push(Token {
            text: text.to_string(),
            span: start..start + text.len(),
        });
        input = after;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(code: &str) -> Vec<String> {
        tokenize(code)
            .unwrap()
            .into_iter()
            .map(|token| token.text)
            .collect()
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            texts("let x = 3; let y=x+1;<<(x == y)"),
            vec!["let", "x", "=", "3", "let", "y", "=", "x", "+", "1", "<<", "(", "x", "==", "y", ")"]
        );
    }

    #[test]
    fn test_longest_operator_first() {
        assert_eq!(texts("<< >> <= >= < > != =="), vec!["<<", ">>", "<=", ">=", "<", ">", "!=", "=="]);
        assert_eq!(texts("<<<"), vec!["<<", "<"]);
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(texts("<<('H)<<('i)"), vec!["<<", "(", "'H", ")", "<<", "(", "'i", ")"]);
        assert_eq!(texts("'\\n)"), vec!["'\\n", ")"]);
        assert_eq!(texts("'\\u{41}"), vec!["'\\u{41}"]);
        // Runs are kept whole, and rejected by the code generator.
        assert_eq!(texts("'ab;"), vec!["'ab"]);
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("  let  abc").unwrap();
        assert_eq!(tokens[0].span, 2..5);
        assert_eq!(tokens[1].span, 7..10);
    }

    #[test]
    fn test_bad_number() {
        assert_eq!(
            tokenize("x = 12ab"),
            Err(Error::Lex { offset: 4, found: '1' })
        );
    }

    #[test]
    fn test_unknown_character() {
        assert_eq!(
            tokenize("x = #"),
            Err(Error::Lex { offset: 4, found: '#' })
        );
    }
}
