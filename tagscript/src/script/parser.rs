//! Template parser.
//!
//! Consumes the [`Lexer`] token stream and builds a [`Node::Document`] tree.
//! Composite nodes that are still open live on an explicit stack: `FOR`
//! pushes a loop frame, `END` pops it and appends the finished loop to the
//! frame now exposed beneath it.  At end of input only the document frame
//! may remain.

use thiserror::Error;

use super::element::Element;
use super::lexer::{LexError, Lexer, Position, Token, TokenKind};
use super::node::{ForLoop, Node, NodeStats};
use super::value::{parse_number, BinOp};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("empty template")]
    EmptySource,

    #[error("{pos}: expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
        pos: Position,
    },

    #[error("{pos}: unknown tag `{name}`")]
    UnknownTag { name: String, pos: Position },

    #[error("{pos}: `END` without an open `FOR`")]
    UnmatchedEnd { pos: Position },

    #[error("{pos}: `FOR {variable}` is never closed")]
    UnclosedFor { variable: String, pos: Position },

    #[error("{pos}: `FOR` takes a variable, a start, an end and an optional step ({found} argument(s) given)")]
    ForArity { found: usize, pos: Position },

    #[error("{pos}: invalid `FOR` {what}: {found}")]
    ForArgument {
        what: &'static str,
        found: String,
        pos: Position,
    },
}

/// Parse a template into its document tree.
pub fn parse(src: &str) -> Result<Node, ParseError> {
    if src.is_empty() {
        return Err(ParseError::EmptySource);
    }
    let tree = Parser::new(Lexer::new(src)).parse_document()?;
    let stats = NodeStats::collect(&tree);
    log::debug!(
        "parsed template: {} text, {} loop, {} echo node(s), loop depth {}",
        stats.texts,
        stats.loops,
        stats.echoes,
        stats.max_loop_depth
    );
    Ok(tree)
}

/// An open composite node waiting for its children.
enum Frame {
    Document(Vec<Node>),
    Loop { node: ForLoop, pos: Position },
}

impl Frame {
    fn children_mut(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::Document(children) => children,
            Frame::Loop { node, .. } => &mut node.children,
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    stack: Vec<Frame>,
}

impl<'a> Parser<'a> {
    fn new(lexer: Lexer<'a>) -> Self {
        Parser {
            lexer,
            stack: vec![Frame::Document(Vec::new())],
        }
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        Ok(self.lexer.next_token()?)
    }

    fn append(&mut self, node: Node) {
        // The document frame is never popped, so the stack is never empty.
        if let Some(top) = self.stack.last_mut() {
            top.children_mut().push(node);
        }
    }

    fn parse_document(mut self) -> Result<Node, ParseError> {
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Text(text) => self.append(Node::Text(text)),
                TokenKind::TagOpen => self.parse_tag()?,
                other => return Err(unexpected("text or a tag", &other, tok.pos)),
            }
        }

        // Only the document frame may be left; it sits at the bottom.
        match self.stack.pop() {
            Some(Frame::Document(children)) => Ok(Node::Document(children)),
            Some(Frame::Loop { node, pos }) => Err(ParseError::UnclosedFor { variable: node.variable, pos }),
            None => Err(ParseError::EmptySource),
        }
    }

    fn parse_tag(&mut self) -> Result<(), ParseError> {
        let tok = self.next()?;
        let name = match tok.kind {
            TokenKind::TagName(name) => name,
            other => return Err(unexpected("a tag name", &other, tok.pos)),
        };
        match name.as_str() {
            "FOR" => self.parse_for(tok.pos),
            "END" => self.parse_end(tok.pos),
            "=" => self.parse_echo(),
            _ => Err(ParseError::UnknownTag { name, pos: tok.pos }),
        }
    }

    /// Collect the tokens up to `$}`.
    fn tag_args(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut args = Vec::new();
        loop {
            let tok = self.next()?;
            match tok.kind {
                TokenKind::TagClose => return Ok(args),
                // The lexer reports running out of input inside a tag itself.
                TokenKind::Eof => return Err(unexpected("`$}`", &tok.kind, tok.pos)),
                _ => args.push(tok),
            }
        }
    }

    fn parse_for(&mut self, pos: Position) -> Result<(), ParseError> {
        let args = self.tag_args()?;
        if !(3..=4).contains(&args.len()) {
            return Err(ParseError::ForArity { found: args.len(), pos });
        }
        let mut args = args.into_iter();
        let (Some(var_tok), Some(start), Some(end)) = (args.next(), args.next(), args.next()) else {
            return Err(ParseError::ForArity { found: 0, pos });
        };
        let variable = match var_tok.kind {
            TokenKind::Ident(name) => name,
            other => {
                return Err(ParseError::ForArgument {
                    what: "variable",
                    found: other.to_string(),
                    pos: var_tok.pos,
                })
            }
        };
        let node = ForLoop {
            variable,
            start: loop_bound("start", start)?,
            end: loop_bound("end", end)?,
            step: args.next().map(|t| loop_bound("step", t)).transpose()?,
            children: Vec::new(),
        };
        self.stack.push(Frame::Loop { node, pos });
        Ok(())
    }

    fn parse_end(&mut self, pos: Position) -> Result<(), ParseError> {
        if let Some(extra) = self.tag_args()?.into_iter().next() {
            return Err(unexpected("`$}`", &extra.kind, extra.pos));
        }
        match self.stack.pop() {
            Some(Frame::Loop { node, .. }) => {
                self.append(Node::ForLoop(node));
                Ok(())
            }
            Some(document) => {
                self.stack.push(document);
                Err(ParseError::UnmatchedEnd { pos })
            }
            None => Err(ParseError::UnmatchedEnd { pos }),
        }
    }

    fn parse_echo(&mut self) -> Result<(), ParseError> {
        let elements = self
            .tag_args()?
            .into_iter()
            .map(echo_element)
            .collect::<Result<Vec<_>, _>>()?;
        self.append(Node::Echo(elements));
        Ok(())
    }
}

/// `FOR` bounds: a number, a variable, or a string holding a number.
fn loop_bound(what: &'static str, tok: Token) -> Result<Element, ParseError> {
    match tok.kind {
        TokenKind::Int(n) => Ok(Element::ConstantInt(n)),
        TokenKind::Float(x) => Ok(Element::ConstantFloat(x)),
        TokenKind::Ident(name) => Ok(Element::Variable(name)),
        TokenKind::Str(s) => match parse_number(&s) {
            Ok(_) => Ok(Element::StringLiteral(s)),
            Err(_) => Err(ParseError::ForArgument {
                what,
                found: format!("string {s:?} is not a number"),
                pos: tok.pos,
            }),
        },
        other => Err(ParseError::ForArgument { what, found: other.to_string(), pos: tok.pos }),
    }
}

fn echo_element(tok: Token) -> Result<Element, ParseError> {
    Ok(match tok.kind {
        TokenKind::Int(n) => Element::ConstantInt(n),
        TokenKind::Float(x) => Element::ConstantFloat(x),
        TokenKind::Str(s) => Element::StringLiteral(s),
        TokenKind::Ident(name) => Element::Variable(name),
        TokenKind::Function(name) => Element::Function(name),
        TokenKind::Operator(c) => match BinOp::from_symbol(c) {
            Some(op) => Element::Operator(op),
            None => return Err(unexpected("an operator", &tok.kind, tok.pos)),
        },
        other => return Err(unexpected("an echo element", &other, tok.pos)),
    })
}

fn unexpected(expected: &'static str, found: &TokenKind, pos: Position) -> ParseError {
    ParseError::Unexpected { expected, found: found.to_string(), pos }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
