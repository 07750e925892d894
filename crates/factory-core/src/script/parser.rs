use super::lexer::{Token, TokenKind};
use super::ScriptError;
use crate::model::color::Color;
use crate::model::distribution::Distribution;

/// How a `schedule()` pair names its sack: by live binding identifier or
/// by string name. Both resolve through the export table; string names
/// may reference exports that appear later in the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SackRef {
    Binding(String),
    Name(String),
}

impl SackRef {
    pub fn name(&self) -> &str {
        match self {
            SackRef::Binding(name) | SackRef::Name(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSample {
    pub sack: SackRef,
    pub time: f64,
}

/// One parsed statement of the fixed DSL surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    LetList {
        name: String,
        line: u32,
    },
    Define {
        list: String,
        distributions: Vec<Distribution>,
        line: u32,
    },
    Permute {
        list: String,
        line: u32,
    },
    Export {
        name: String,
        list: String,
        index: i64,
        for_betting: bool,
        line: u32,
    },
    Schedule {
        samples: Vec<ScheduledSample>,
        line: u32,
    },
    Buckets {
        value: i64,
        line: u32,
    },
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();
    while !parser.at_end() {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn last_line(&self) -> u32 {
        self.tokens.last().map(|t| t.line).unwrap_or(1)
    }

    fn expect(&mut self, kind: &TokenKind, context: &str) -> Result<&'a Token, ScriptError> {
        match self.advance() {
            Some(token) if token.kind == *kind => Ok(token),
            Some(token) => Err(ScriptError::new(
                format!("expected {context}, found {:?}", token.kind),
                token.line,
            )),
            None => Err(ScriptError::new(
                format!("expected {context}, found end of script"),
                self.last_line(),
            )),
        }
    }

    fn expect_ident(&mut self, context: &str) -> Result<(String, u32), ScriptError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                line,
            }) => Ok((name.clone(), *line)),
            Some(token) => Err(ScriptError::new(
                format!("expected {context}, found {:?}", token.kind),
                token.line,
            )),
            None => Err(ScriptError::new(
                format!("expected {context}, found end of script"),
                self.last_line(),
            )),
        }
    }

    fn expect_int(&mut self, context: &str) -> Result<(i64, u32), ScriptError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Int(value),
                line,
            }) => Ok((*value, *line)),
            Some(token) => Err(ScriptError::new(
                format!("expected {context}, found {:?}", token.kind),
                token.line,
            )),
            None => Err(ScriptError::new(
                format!("expected {context}, found end of script"),
                self.last_line(),
            )),
        }
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Let) => self.let_statement(),
            Some(TokenKind::Export) => self.export_statement(),
            Some(TokenKind::Ident(name)) => match name.as_str() {
                "schedule" => self.schedule_statement(),
                "buckets" => self.buckets_statement(),
                _ => self.method_statement(),
            },
            Some(_) => {
                let token = self.advance().expect("peeked");
                Err(ScriptError::new(
                    format!("unexpected token {:?}", token.kind),
                    token.line,
                ))
            }
            None => Err(ScriptError::new(
                "unexpected end of script",
                self.last_line(),
            )),
        }
    }

    // let NAME = list()
    fn let_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        let (name, line) = self.expect_ident("a binding name after 'let'")?;
        self.expect(&TokenKind::Equals, "'='")?;
        let (callee, callee_line) = self.expect_ident("a constructor call")?;
        if callee != "list" {
            return Err(ScriptError::new(
                format!("unknown constructor '{callee}()'"),
                callee_line,
            ));
        }
        self.expect(&TokenKind::LParen, "'(' after 'list'")?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Stmt::LetList { name, line })
    }

    // NAME.define([...]) | NAME.permute()
    fn method_statement(&mut self) -> Result<Stmt, ScriptError> {
        let (list, line) = self.expect_ident("a list binding")?;
        self.expect(&TokenKind::Dot, "'.'")?;
        let (method, method_line) = self.expect_ident("a method name")?;
        self.expect(&TokenKind::LParen, "'('")?;
        match method.as_str() {
            "define" => {
                let distributions = self.distribution_array()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Stmt::Define {
                    list,
                    distributions,
                    line,
                })
            }
            "permute" => {
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(Stmt::Permute { list, line })
            }
            "select" => Err(ScriptError::new(
                "select() must be bound to a name with 'export'",
                method_line,
            )),
            other => Err(ScriptError::new(
                format!("unknown method '{other}()'"),
                method_line,
            )),
        }
    }

    // export NAME = LIST.select(INDEX) [for betting]
    fn export_statement(&mut self) -> Result<Stmt, ScriptError> {
        self.advance();
        let (name, line) = self.expect_ident("an export name")?;
        self.expect(&TokenKind::Equals, "'='")?;
        let (list, _) = self.expect_ident("a list binding")?;
        self.expect(&TokenKind::Dot, "'.'")?;
        let (method, method_line) = self.expect_ident("'select'")?;
        if method != "select" {
            return Err(ScriptError::new(
                format!("only select() can be exported, found '{method}()'"),
                method_line,
            ));
        }
        self.expect(&TokenKind::LParen, "'('")?;
        let (index, _) = self.expect_int("a selection index")?;
        self.expect(&TokenKind::RParen, "')'")?;

        let for_betting = if self.peek().map(|t| &t.kind) == Some(&TokenKind::For) {
            self.advance();
            self.expect(&TokenKind::Betting, "'betting' after 'for'")?;
            true
        } else {
            false
        };

        Ok(Stmt::Export {
            name,
            list,
            index,
            for_betting,
            line,
        })
    }

    // schedule([(REF, TIME), ...])
    fn schedule_statement(&mut self) -> Result<Stmt, ScriptError> {
        let (_, line) = self.expect_ident("'schedule'")?;
        self.expect(&TokenKind::LParen, "'('")?;
        self.expect(&TokenKind::LBracket, "'[' of schedule pairs")?;

        let mut samples = Vec::new();
        if self.peek().map(|t| &t.kind) != Some(&TokenKind::RBracket) {
            loop {
                samples.push(self.schedule_pair()?);
                match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::Comma) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }

        self.expect(&TokenKind::RBracket, "']'")?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Stmt::Schedule { samples, line })
    }

    fn schedule_pair(&mut self) -> Result<ScheduledSample, ScriptError> {
        self.expect(&TokenKind::LParen, "'(' of a schedule pair")?;
        let sack = match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => SackRef::Binding(name.clone()),
            Some(Token {
                kind: TokenKind::Str(name),
                ..
            }) => SackRef::Name(name.clone()),
            Some(token) => {
                return Err(ScriptError::new(
                    format!("expected a sack reference, found {:?}", token.kind),
                    token.line,
                ));
            }
            None => {
                return Err(ScriptError::new(
                    "expected a sack reference, found end of script",
                    self.last_line(),
                ));
            }
        };
        self.expect(&TokenKind::Comma, "',' between sack and time")?;
        let time = self.number("a sample time")?;
        self.expect(&TokenKind::RParen, "')' of a schedule pair")?;
        Ok(ScheduledSample { sack, time })
    }

    // buckets(N)
    fn buckets_statement(&mut self) -> Result<Stmt, ScriptError> {
        let (_, line) = self.expect_ident("'buckets'")?;
        self.expect(&TokenKind::LParen, "'('")?;
        let (value, _) = self.expect_int("a bucket count")?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(Stmt::Buckets { value, line })
    }

    fn number(&mut self, context: &str) -> Result<f64, ScriptError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Int(value),
                ..
            }) => Ok(*value as f64),
            Some(Token {
                kind: TokenKind::Float(value),
                ..
            }) => Ok(*value),
            Some(token) => Err(ScriptError::new(
                format!("expected {context}, found {:?}", token.kind),
                token.line,
            )),
            None => Err(ScriptError::new(
                format!("expected {context}, found end of script"),
                self.last_line(),
            )),
        }
    }

    // [{color: count, ...}, ...]
    fn distribution_array(&mut self) -> Result<Vec<Distribution>, ScriptError> {
        self.expect(&TokenKind::LBracket, "'[' of a distribution array")?;
        let mut distributions = Vec::new();
        if self.peek().map(|t| &t.kind) != Some(&TokenKind::RBracket) {
            loop {
                distributions.push(self.distribution_literal()?);
                match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::Comma) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        self.expect(&TokenKind::RBracket, "']'")?;
        Ok(distributions)
    }

    fn distribution_literal(&mut self) -> Result<Distribution, ScriptError> {
        self.expect(&TokenKind::LBrace, "'{' of a distribution")?;
        let mut distribution = Distribution::new();
        if self.peek().map(|t| &t.kind) != Some(&TokenKind::RBrace) {
            loop {
                let (color_name, color_line) = self.expect_ident("a color name")?;
                let color = Color::from_name(&color_name).ok_or_else(|| {
                    ScriptError::new(format!("unknown color '{color_name}'"), color_line)
                })?;
                self.expect(&TokenKind::Colon, "':' after a color name")?;
                let (count, count_line) = self.expect_int("an item count")?;
                let count: u32 = count.try_into().map_err(|_| {
                    ScriptError::new(format!("invalid item count {count}"), count_line)
                })?;
                distribution.set_count(color, count);
                match self.peek().map(|t| &t.kind) {
                    Some(TokenKind::Comma) => {
                        self.advance();
                    }
                    _ => break,
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, SackRef, Stmt};
    use crate::model::color::Color;
    use crate::script::lexer::tokenize;

    fn parse_source(source: &str) -> Result<Vec<Stmt>, super::ScriptError> {
        parse(&tokenize(source).unwrap())
    }

    #[test]
    fn parses_the_full_surface() {
        let source = r#"
let bag = list()
bag.define([{red: 70, blue: 30}, {red: 30, blue: 70}])
bag.permute()
export left = bag.select(0) for betting
export right = bag.select(1)
schedule([(left, 1.0), ("right", 2.5)])
buckets(4)
"#;
        let statements = parse_source(source).unwrap();
        assert_eq!(statements.len(), 7);
        match &statements[1] {
            Stmt::Define { distributions, .. } => {
                assert_eq!(distributions.len(), 2);
                assert_eq!(distributions[0].count(Color::Red), 70);
            }
            other => panic!("expected define, got {other:?}"),
        }
        match &statements[3] {
            Stmt::Export {
                name, for_betting, ..
            } => {
                assert_eq!(name, "left");
                assert!(for_betting);
            }
            other => panic!("expected export, got {other:?}"),
        }
        match &statements[5] {
            Stmt::Schedule { samples, .. } => {
                assert_eq!(samples[0].sack, SackRef::Binding("left".to_string()));
                assert_eq!(samples[1].sack, SackRef::Name("right".to_string()));
                assert_eq!(samples[1].time, 2.5);
            }
            other => panic!("expected schedule, got {other:?}"),
        }
    }

    #[test]
    fn export_without_betting_flag() {
        let statements = parse_source("export s = bag.select(0)").unwrap();
        match &statements[0] {
            Stmt::Export { for_betting, .. } => assert!(!for_betting),
            other => panic!("expected export, got {other:?}"),
        }
    }

    #[test]
    fn bare_select_is_rejected() {
        let err = parse_source("bag.select(0)").unwrap_err();
        assert!(err.message.contains("export"));
    }

    #[test]
    fn unknown_color_reports_its_line() {
        let err = parse_source("let b = list()\nb.define([{magenta: 3}])").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unknown color 'magenta'"));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = parse_source("bag.pour()").unwrap_err();
        assert!(err.message.contains("unknown method 'pour()'"));
    }

    #[test]
    fn unknown_constructor_is_rejected() {
        let err = parse_source("let b = stack()").unwrap_err();
        assert!(err.message.contains("unknown constructor 'stack()'"));
    }

    #[test]
    fn truncated_schedule_is_rejected() {
        let err = parse_source("schedule([(left, ").unwrap_err();
        assert!(err.message.contains("end of script"));
    }
}
