//! # Frontend
//!
//! This module turns source text into the nested tree consumed by the
//! code generator. It is deliberately thin:
//!
//! 1. Comments are stripped (Rust style `//` and `/* */`).
//! 2. The [`lexer`](tokenize) splits the text into tokens on whitespace and `;`.
//! 3. The [`tree parser`](parse_tree) groups tokens at brackets, and maps
//!    keywords and operators onto [`Opcode`]s.
//!
//! There is no precedence or statement grammar here: the meaning of a
//! token's position is decided by the code generator as it walks the tree.
use core::{fmt, ops::Range};
use no_comment::{languages, IntoWithoutComments};

mod lexer;
pub use lexer::*;
mod tree;
pub use tree::*;

/// A range of byte offsets into the (comment-stripped) source.
pub type Span = Range<usize>;

/// Remove all comments from the source code.
///
/// Spans reported by the frontend and the code generator refer to the
/// text returned here.
pub fn strip_comments(code: &str) -> String {
    code.chars()
        .without_comments(languages::rust())
        .collect::<String>()
}

/// Parse comment-free source code into the tree of the program.
pub fn parse(code: &str) -> Result<Vec<Node>, Error> {
    parse_tree(tokenize(code)?)
}

/// An error in the shape of the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No token starts with this character.
    Lex { offset: usize, found: char },
    /// A bracket without a partner.
    Unbalanced(Span),
    /// A closing bracket of the wrong kind.
    Mismatched { open: Span, close: Span },
}

impl Error {
    /// The part of the source this error is about.
    pub fn span(&self) -> Span {
        match self {
            Self::Lex { offset, found } => *offset..*offset + found.len_utf8(),
            Self::Unbalanced(span) => span.clone(),
            Self::Mismatched { close, .. } => close.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Lex { found, .. } => write!(f, "unexpected character {found:?}"),
            Self::Unbalanced(_) => write!(f, "unbalanced bracket"),
            Self::Mismatched { open, .. } => write!(
                f,
                "closing bracket does not match the bracket opened at offset {}",
                open.start
            ),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let code = strip_comments("let x // the counter\n/* block */ x = 1");
        let tree = parse(&code).unwrap();
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_error_spans() {
        let code = "let x = ( 1";
        let err = parse(code).unwrap_err();
        assert_eq!(err, Error::Unbalanced(8..9));
        assert_eq!(err.span(), 8..9);

        let err = parse("x @ 1").unwrap_err();
        assert_eq!(err, Error::Lex { offset: 2, found: '@' });
        assert_eq!(err.span(), 2..3);
    }
}
