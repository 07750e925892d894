use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Let,
    Export,
    For,
    Betting,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Equals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

impl Token {
    fn new(kind: TokenKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// Splits script source into tokens, tracking 1-based lines. `//` starts
/// a comment running to end of line.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line: u32 = 1;

    while let Some(&ch) = chars.peek() {
        match ch {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '/' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    while let Some(&c) = chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        chars.next();
                    }
                } else {
                    return Err(ScriptError::new("unexpected character '/'", line));
                }
            }
            '(' => push_single(&mut tokens, &mut chars, TokenKind::LParen, line),
            ')' => push_single(&mut tokens, &mut chars, TokenKind::RParen, line),
            '[' => push_single(&mut tokens, &mut chars, TokenKind::LBracket, line),
            ']' => push_single(&mut tokens, &mut chars, TokenKind::RBracket, line),
            '{' => push_single(&mut tokens, &mut chars, TokenKind::LBrace, line),
            '}' => push_single(&mut tokens, &mut chars, TokenKind::RBrace, line),
            ',' => push_single(&mut tokens, &mut chars, TokenKind::Comma, line),
            ':' => push_single(&mut tokens, &mut chars, TokenKind::Colon, line),
            '.' => push_single(&mut tokens, &mut chars, TokenKind::Dot, line),
            '=' => push_single(&mut tokens, &mut chars, TokenKind::Equals, line),
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') | None => {
                            return Err(ScriptError::new("unterminated string literal", line));
                        }
                        Some(c) => value.push(c),
                    }
                }
                tokens.push(Token::new(TokenKind::Str(value), line));
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                let mut is_float = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        chars.next();
                    } else if c == '.' && !is_float {
                        is_float = true;
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let kind = if is_float {
                    let value: f64 = text
                        .parse()
                        .map_err(|_| ScriptError::new(format!("invalid number '{text}'"), line))?;
                    TokenKind::Float(value)
                } else {
                    let value: i64 = text
                        .parse()
                        .map_err(|_| ScriptError::new(format!("invalid number '{text}'"), line))?;
                    TokenKind::Int(value)
                };
                tokens.push(Token::new(kind, line));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let kind = match word.as_str() {
                    "let" => TokenKind::Let,
                    "export" => TokenKind::Export,
                    "for" => TokenKind::For,
                    "betting" => TokenKind::Betting,
                    _ => TokenKind::Ident(word),
                };
                tokens.push(Token::new(kind, line));
            }
            other => {
                return Err(ScriptError::new(
                    format!("unexpected character '{other}'"),
                    line,
                ));
            }
        }
    }

    Ok(tokens)
}

fn push_single(
    tokens: &mut Vec<Token>,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    kind: TokenKind,
    line: u32,
) {
    chars.next();
    tokens.push(Token::new(kind, line));
}
