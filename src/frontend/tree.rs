//! # Tree Parser
//!
//! Groups the flat token sequence into nested [`Node`]s wherever brackets
//! occur, and maps keyword and operator tokens onto the closed set of
//! [`Opcode`]s. Literals are resolved here, once, into their final form.
use super::{Error, Span, Token};
use core::fmt;
use std::collections::HashMap;

use lazy_static::lazy_static;
use maplit::hashmap;

lazy_static! {
    /// Every keyword and operator token, and the opcode it stands for.
    static ref OPCODES: HashMap<&'static str, Opcode> = hashmap! {
        "let" => Opcode::Declare,
        "=" => Opcode::Assign,
        "+" => Opcode::Add,
        "-" => Opcode::Subtract,
        "==" => Opcode::Eq,
        "!=" => Opcode::Ne,
        "if" => Opcode::If,
        "while" => Opcode::While,
        "<<" => Opcode::Write,
        ">>" => Opcode::Read,
        // Recognized, but not wired into the code generator yet.
        "*" => Opcode::Unimplemented("*".to_string()),
        "/" => Opcode::Unimplemented("/".to_string()),
        "%" => Opcode::Unimplemented("%".to_string()),
        "<" => Opcode::Unimplemented("<".to_string()),
        ">" => Opcode::Unimplemented(">".to_string()),
        "<=" => Opcode::Unimplemented("<=".to_string()),
        ">=" => Opcode::Unimplemented(">=".to_string()),
    };
}

/// An operation of the language.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `let name`
    Declare,
    /// `= source`, assigning to the cell under the pointer.
    Assign,
    /// `+ right`
    Add,
    /// `- right`
    Subtract,
    /// `== right`
    Eq,
    /// `!= right`
    Ne,
    /// `if (head) { block }`
    If,
    /// `while (head) { block }`
    While,
    /// `<< value`
    Write,
    /// `>> variable`
    Read,
    /// An operator the code generator does not implement.
    Unimplemented(String),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Declare => write!(f, "let"),
            Self::Assign => write!(f, "="),
            Self::Add => write!(f, "+"),
            Self::Subtract => write!(f, "-"),
            Self::Eq => write!(f, "=="),
            Self::Ne => write!(f, "!="),
            Self::If => write!(f, "if"),
            Self::While => write!(f, "while"),
            Self::Write => write!(f, "<<"),
            Self::Read => write!(f, ">>"),
            Self::Unimplemented(token) => write!(f, "{token}"),
        }
    }
}

/// A position in the program tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A keyword or operator.
    Op(Opcode),
    /// A variable name.
    Name(String),
    /// A number, reduced to the machine's cell width.
    Number(u8),
    /// The text of a character literal, with escapes resolved.
    /// It is not guaranteed to be exactly one character.
    Char(String),
    /// A bracketed group of nodes.
    Block(Vec<Node>),
}

impl Node {
    /// Classify a single (non-bracket) token.
    fn leaf(token: Token) -> Self {
        let kind = if let Some(op) = OPCODES.get(token.text.as_str()) {
            NodeKind::Op(op.clone())
        } else if let Some(body) = token.text.strip_prefix('\'') {
            NodeKind::Char(
                snailquote::unescape(&format!("\"{body}\"")).unwrap_or_else(|_| body.to_string()),
            )
        } else if !token.text.is_empty() && token.text.bytes().all(|b| b.is_ascii_digit()) {
            NodeKind::Number(
                token
                    .text
                    .bytes()
                    .fold(0u8, |n, digit| n.wrapping_mul(10).wrapping_add(digit - b'0')),
            )
        } else {
            NodeKind::Name(token.text)
        };

        Self {
            kind,
            span: token.span,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            NodeKind::Op(op) => write!(f, "{op}"),
            NodeKind::Name(name) => write!(f, "{name}"),
            NodeKind::Number(n) => write!(f, "{n}"),
            NodeKind::Char(text) => write!(f, "'{}", text.escape_default()),
            NodeKind::Block(nodes) => {
                write!(f, "(")?;
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{node}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn closing(open: &str) -> &'static str {
    if open == "{" {
        "}"
    } else {
        ")"
    }
}

/// Group tokens into a tree at `(`/`)` and `{`/`}`.
pub fn parse_tree(tokens: Vec<Token>) -> Result<Vec<Node>, Error> {
    // The enclosing groups: their opening token, and the nodes
    // collected before they were opened.
    let mut groups: Vec<(Token, Vec<Node>)> = vec![];
    let mut current = vec![];

    for token in tokens {
        match token.text.as_str() {
            "(" | "{" => groups.push((token, std::mem::take(&mut current))),
            ")" | "}" => {
                let (open, parent) = groups
                    .pop()
                    .ok_or_else(|| Error::Unbalanced(token.span.clone()))?;
                if closing(&open.text) != token.text {
                    return Err(Error::Mismatched {
                        open: open.span,
                        close: token.span,
                    });
                }
                let block = std::mem::replace(&mut current, parent);
                current.push(Node {
                    kind: NodeKind::Block(block),
                    span: open.span.start..token.span.end,
                });
            }
            _ => current.push(Node::leaf(token)),
        }
    }

    match groups.pop() {
        Some((open, _)) => Err(Error::Unbalanced(open.span)),
        None => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::tokenize;

    fn tree(code: &str) -> Vec<Node> {
        parse_tree(tokenize(code).unwrap()).unwrap()
    }

    fn kinds(nodes: &[Node]) -> Vec<NodeKind> {
        nodes.iter().map(|node| node.kind.clone()).collect()
    }

    #[test]
    fn test_opcodes() {
        let expected = hashmap! {
            "let" => Opcode::Declare,
            "=" => Opcode::Assign,
            "==" => Opcode::Eq,
            "!=" => Opcode::Ne,
            "<<" => Opcode::Write,
            ">>" => Opcode::Read,
            "while" => Opcode::While,
            "*" => Opcode::Unimplemented("*".to_string()),
        };
        for (token, op) in expected {
            assert_eq!(kinds(&tree(token)), vec![NodeKind::Op(op)], "{token}");
        }
    }

    #[test]
    fn test_leaves() {
        assert_eq!(
            kinds(&tree("x 65 'A '\\n 300")),
            vec![
                NodeKind::Name("x".to_string()),
                NodeKind::Number(65),
                NodeKind::Char("A".to_string()),
                NodeKind::Char("\n".to_string()),
                NodeKind::Number(44),
            ]
        );
    }

    #[test]
    fn test_grouping() {
        let nodes = tree("while (i != 0) { i = (i - 1) }");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].kind, NodeKind::Op(Opcode::While));

        let NodeKind::Block(head) = &nodes[1].kind else {
            panic!("expected a block, got {:?}", nodes[1]);
        };
        assert_eq!(head.len(), 3);
        assert_eq!(nodes[1].span, 6..14);

        let NodeKind::Block(body) = &nodes[2].kind else {
            panic!("expected a block, got {:?}", nodes[2]);
        };
        assert_eq!(body.len(), 3);
        assert!(matches!(body[2].kind, NodeKind::Block(_)));
        assert_eq!(nodes[2].to_string(), "(i = (i - 1))");
    }

    #[test]
    fn test_unbalanced() {
        let tokens = tokenize("x = (1 + 2))").unwrap();
        assert_eq!(parse_tree(tokens), Err(Error::Unbalanced(11..12)));

        let tokens = tokenize("{ x = (1 }").unwrap();
        assert_eq!(
            parse_tree(tokens),
            Err(Error::Mismatched {
                open: 6..7,
                close: 9..10
            })
        );
    }
}
