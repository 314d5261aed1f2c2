use fnlang_core::{FnError, Span};

use crate::ast::{Node, NodeKind};
use crate::lexer::{tokenize, SpannedToken, Token};

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| t.span)
                    .unwrap_or_else(|| Span::point(1, 1))
            })
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_node(&mut self) -> Result<Node, FnError> {
        let span = self.span();
        match self.peek() {
            None => Err(FnError::UnexpectedEof { span }),
            Some(Token::LParen) => self.parse_sequence(Token::RParen, span),
            Some(Token::LBracket) => self.parse_sequence(Token::RBracket, span),
            Some(Token::LBrace) => self.parse_sequence(Token::RBrace, span),
            Some(Token::RParen) | Some(Token::RBracket) | Some(Token::RBrace) => {
                let token = self.advance().map(|t| t.token.clone());
                Err(FnError::Reader {
                    message: format!("unexpected `{}`", token_display(&token)),
                    span,
                })
            }
            Some(_) => self.parse_leaf(),
        }
    }

    fn parse_sequence(&mut self, close: Token, open_span: Span) -> Result<Node, FnError> {
        self.advance(); // opening delimiter
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(FnError::UnexpectedEof { span: open_span }),
                Some(token) if *token == close => {
                    self.advance();
                    let kind = match close {
                        Token::RParen => NodeKind::Expression(items),
                        Token::RBracket => NodeKind::List(items),
                        _ => NodeKind::Map(items),
                    };
                    return Ok(Node::new(kind, open_span));
                }
                Some(_) => items.push(self.parse_node()?),
            }
        }
    }

    fn parse_leaf(&mut self) -> Result<Node, FnError> {
        let span = self.span();
        let token = match self.advance() {
            Some(t) => t.token.clone(),
            None => return Err(FnError::UnexpectedEof { span }),
        };
        let kind = match token {
            Token::Int(n) => NodeKind::Int(n),
            Token::Float(f) => NodeKind::Float(f),
            Token::String(s) => NodeKind::String(s),
            Token::Symbol(s) => NodeKind::Symbol(s),
            Token::Atom(s) => NodeKind::Atom(s),
            other => {
                return Err(FnError::Reader {
                    message: format!("unexpected `{}`", token_display(&Some(other))),
                    span,
                })
            }
        };
        Ok(Node::new(kind, span))
    }
}

fn token_display(token: &Option<Token>) -> String {
    match token {
        Some(Token::LParen) => "(".to_string(),
        Some(Token::RParen) => ")".to_string(),
        Some(Token::LBracket) => "[".to_string(),
        Some(Token::RBracket) => "]".to_string(),
        Some(Token::LBrace) => "{".to_string(),
        Some(Token::RBrace) => "}".to_string(),
        Some(Token::Int(n)) => n.to_string(),
        Some(Token::Float(f)) => f.to_string(),
        Some(Token::String(s)) => format!("{s:?}"),
        Some(Token::Symbol(s)) | Some(Token::Atom(s)) => s.clone(),
        None => "end of input".to_string(),
    }
}

/// Parse a whole program. All top-level forms are wrapped in a single root
/// `List` node: a program evaluates to the list of its top-level results.
pub fn parse(input: &str) -> Result<Node, FnError> {
    let tokens = tokenize(input)?;
    let root_span = tokens.first().map(|t| t.span).unwrap_or_else(|| Span::point(1, 1));
    let mut parser = Parser::new(tokens);
    let mut forms = Vec::new();
    while parser.peek().is_some() {
        forms.push(parser.parse_node()?);
    }
    Ok(Node::new(NodeKind::List(forms), root_span))
}
