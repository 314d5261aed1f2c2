use fnlang_core::{FnError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Int(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Atom(String),
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, FnError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut line = 1;
    let mut col = 1;

    while i < chars.len() {
        let ch = chars[i];
        let span = Span::point(line, col);

        match ch {
            ' ' | '\t' | '\r' => {
                col += 1;
                i += 1;
            }
            '\n' => {
                line += 1;
                col = 1;
                i += 1;
            }

            ';' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }

            '(' => {
                col += 1;
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::LParen,
                    span,
                });
            }
            ')' => {
                col += 1;
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::RParen,
                    span,
                });
            }
            '[' => {
                col += 1;
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::LBracket,
                    span,
                });
            }
            ']' => {
                col += 1;
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::RBracket,
                    span,
                });
            }
            '{' => {
                col += 1;
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::LBrace,
                    span,
                });
            }
            '}' => {
                col += 1;
                i += 1;
                tokens.push(SpannedToken {
                    token: Token::RBrace,
                    span,
                });
            }

            '"' => {
                let mut s = String::new();
                i += 1;
                col += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                        col += 1;
                        match chars[i] {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            'r' => s.push('\r'),
                            '\\' => s.push('\\'),
                            '"' => s.push('"'),
                            '0' => s.push('\0'),
                            other => {
                                s.push('\\');
                                s.push(other);
                            }
                        }
                    } else {
                        if chars[i] == '\n' {
                            line += 1;
                            col = 0;
                        }
                        s.push(chars[i]);
                    }
                    i += 1;
                    col += 1;
                }
                if i >= chars.len() {
                    // an open string is the reader asking for more input
                    return Err(FnError::UnexpectedEof { span });
                }
                i += 1; // closing quote
                col += 1;
                tokens.push(SpannedToken {
                    token: Token::String(s),
                    span,
                });
            }

            ':' => {
                let start = i;
                i += 1;
                col += 1;
                while i < chars.len() && is_symbol_char(chars[i]) {
                    i += 1;
                    col += 1;
                }
                if i == start + 1 {
                    return Err(FnError::Reader {
                        message: "expected atom name after ':'".to_string(),
                        span,
                    });
                }
                let name: String = chars[start..i].iter().collect();
                tokens.push(SpannedToken {
                    token: Token::Atom(name),
                    span,
                });
            }

            _ => {
                if ch.is_ascii_digit()
                    || (ch == '-' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit())
                {
                    let (token, len) = read_number(&chars[i..], span)?;
                    i += len;
                    col += len;
                    tokens.push(SpannedToken { token, span });
                } else if is_symbol_start(ch) {
                    let start = i;
                    while i < chars.len() && is_symbol_char(chars[i]) {
                        i += 1;
                        col += 1;
                    }
                    let name: String = chars[start..i].iter().collect();
                    tokens.push(SpannedToken {
                        token: Token::Symbol(name),
                        span,
                    });
                } else {
                    return Err(FnError::Reader {
                        message: format!("unexpected character: '{ch}'"),
                        span,
                    });
                }
            }
        }
    }

    Ok(tokens)
}

fn read_number(chars: &[char], span: Span) -> Result<(Token, usize), FnError> {
    let mut i = 0;
    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
        i += 1; // skip dot
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let s: String = chars[..i].iter().collect();
        let f: f64 = s.parse().map_err(|_| FnError::Reader {
            message: format!("invalid float: {s}"),
            span,
        })?;
        Ok((Token::Float(f), i))
    } else {
        let s: String = chars[..i].iter().collect();
        let n: i64 = s.parse().map_err(|_| FnError::Reader {
            message: format!("invalid integer: {s}"),
            span,
        })?;
        Ok((Token::Int(n), i))
    }
}

fn is_symbol_start(ch: char) -> bool {
    ch.is_alphabetic()
        || matches!(
            ch,
            '+' | '-' | '*' | '/' | '!' | '?' | '<' | '>' | '=' | '_' | '&' | '%' | '^' | '~' | '.'
        )
}

fn is_symbol_char(ch: char) -> bool {
    is_symbol_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn delimiters_and_scalars() {
        assert_eq!(
            kinds("( [ { } ] )"),
            vec![
                Token::LParen,
                Token::LBracket,
                Token::LBrace,
                Token::RBrace,
                Token::RBracket,
                Token::RParen,
            ]
        );
        assert_eq!(kinds("42"), vec![Token::Int(42)]);
        assert_eq!(kinds("-9.61"), vec![Token::Float(-9.61)]);
        assert_eq!(kinds("\"hi\""), vec![Token::String("hi".to_string())]);
    }

    #[test]
    fn atoms_and_operator_symbols() {
        assert_eq!(kinds(":true"), vec![Token::Atom(":true".to_string())]);
        assert_eq!(kinds("+"), vec![Token::Symbol("+".to_string())]);
        assert_eq!(kinds("="), vec![Token::Symbol("=".to_string())]);
        assert_eq!(kinds("foo2"), vec![Token::Symbol("foo2".to_string())]);
    }

    #[test]
    fn minus_is_a_symbol_unless_followed_by_a_digit() {
        assert_eq!(kinds("-"), vec![Token::Symbol("-".to_string())]);
        assert_eq!(kinds("-1"), vec![Token::Int(-1)]);
        assert_eq!(
            kinds("(- 1 2)"),
            vec![
                Token::LParen,
                Token::Symbol("-".to_string()),
                Token::Int(1),
                Token::Int(2),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(kinds("1 ; the rest is ignored\n2"), vec![Token::Int(1), Token::Int(2)]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\"c""#),
            vec![Token::String("a\nb\"c".to_string())]
        );
    }

    #[test]
    fn open_string_is_unexpected_eof() {
        assert!(matches!(
            tokenize("\"never closed"),
            Err(FnError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn spans_track_lines() {
        let tokens = tokenize("1\n  2").expect("tokenize");
        assert_eq!(tokens[0].span, Span::point(1, 1));
        assert_eq!(tokens[1].span, Span::point(2, 3));
    }
}
