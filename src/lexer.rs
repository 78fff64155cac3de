//! Character stream → token stream (spec §4.1).
//!
//! Tokens are produced on demand via [`Lexer::next`]/[`Lexer::peek`] rather than all at
//! once, so the parser can look one token ahead without the lexer ever materializing the
//! whole stream up front.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ClikeError;
use crate::position::Position;
use crate::token::{Token, KEYWORDS};

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            peeked: None,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token, ClikeError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan()?);
        }
        Ok(self.peeked.clone().expect("just populated"))
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self) -> Result<Token, ClikeError> {
        if let Some(tok) = self.peeked.take() {
            return Ok(tok);
        }
        self.scan()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
                self.bump();
            }

            if self.peek_char() == Some('/') {
                let mut lookahead = self.chars.clone();
                lookahead.next();
                if lookahead.next() == Some('/') {
                    self.bump();
                    self.bump();
                    while !matches!(self.peek_char(), None | Some('\n')) {
                        self.bump();
                    }
                    continue;
                }
            }

            break;
        }
    }

    fn scan(&mut self) -> Result<Token, ClikeError> {
        self.skip_whitespace_and_comments();

        let pos = self.pos();

        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof { pos });
        };

        match c {
            'A'..='Z' | 'a'..='z' | '_' => Ok(self.scan_identifier(pos)),
            '0'..='9' => self.scan_number(pos),
            '\'' => self.scan_char(pos),
            '"' => self.scan_string(pos),
            '#' => self.scan_include(pos),
            _ => self.scan_operator(pos),
        }
    }

    fn scan_identifier(&mut self, pos: Position) -> Token {
        let mut text = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
            text.push(self.bump().expect("just peeked"));
        }

        for (keyword, make) in KEYWORDS {
            if *keyword == text {
                return make(pos);
            }
        }

        Token::Id { name: text, pos }
    }

    fn scan_number(&mut self, pos: Position) -> Result<Token, ClikeError> {
        let mut text = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().expect("just peeked"));
        }

        let is_float = self.peek_char() == Some('.') && {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            matches!(lookahead.next(), Some(c) if c.is_ascii_digit())
        };

        if is_float {
            text.push(self.bump().expect("dot"));
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().expect("just peeked"));
            }
            let value: f64 = text.parse().expect("validated digit sequence");
            return Ok(Token::FloatConst { value, pos });
        }

        let value: i64 = text.parse().expect("validated digit sequence");
        Ok(Token::IntegerConst { value, pos })
    }

    fn scan_char(&mut self, pos: Position) -> Result<Token, ClikeError> {
        self.bump();
        let Some(content) = self.bump() else {
            return Err(ClikeError::LexBadChar { pos });
        };
        if content == '\'' || !content.is_ascii() {
            return Err(ClikeError::LexBadChar { pos });
        }
        if !self.bump_if('\'') {
            return Err(ClikeError::LexBadChar { pos });
        }
        Ok(Token::CharConst { value: content as u8, pos })
    }

    fn scan_string(&mut self, pos: Position) -> Result<Token, ClikeError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::StringConst { value: text, pos }),
                Some(c) => text.push(c),
                None => return Err(ClikeError::LexUnterminatedString { pos }),
            }
        }
    }

    fn scan_include(&mut self, pos: Position) -> Result<Token, ClikeError> {
        self.bump();
        let mut directive = String::new();
        while matches!(self.peek_char(), Some(c) if c.is_alphanumeric() || c == '_') {
            directive.push(self.bump().expect("just peeked"));
        }
        if directive != "include" {
            return Err(ClikeError::LexUnexpectedChar { ch: '#', pos });
        }

        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.bump();
        }

        if self.peek_char() != Some('"') {
            return Err(ClikeError::LexUnexpectedChar {
                ch: self.peek_char().unwrap_or('\0'),
                pos: self.pos(),
            });
        }

        let Token::StringConst { value: path, .. } = self.scan_string(self.pos())? else {
            unreachable!("scan_string always returns StringConst")
        };

        Ok(Token::Include { path, pos })
    }

    fn scan_operator(&mut self, pos: Position) -> Result<Token, ClikeError> {
        let c = self.bump().expect("checked by caller");

        let tok = match c {
            '+' => Token::Plus { pos },
            '-' => Token::Minus { pos },
            '*' => Token::Star { pos },
            '/' => Token::Slash { pos },
            '(' => Token::LParen { pos },
            ')' => Token::RParen { pos },
            '{' => Token::LBrace { pos },
            '}' => Token::RBrace { pos },
            '[' => Token::LBrack { pos },
            ']' => Token::RBrack { pos },
            ',' => Token::Comma { pos },
            ';' => Token::Semi { pos },
            '=' => {
                if self.bump_if('=') {
                    Token::Eq { pos }
                } else {
                    Token::Assign { pos }
                }
            }
            '!' => {
                if self.bump_if('=') {
                    Token::Neq { pos }
                } else {
                    return Err(ClikeError::LexUnexpectedChar { ch: c, pos });
                }
            }
            '<' => {
                if self.bump_if('=') {
                    Token::Leq { pos }
                } else {
                    Token::Lt { pos }
                }
            }
            '>' => {
                if self.bump_if('=') {
                    Token::Geq { pos }
                } else {
                    Token::Gt { pos }
                }
            }
            '&' => {
                if self.bump_if('&') {
                    Token::And { pos }
                } else {
                    return Err(ClikeError::LexUnexpectedChar { ch: c, pos });
                }
            }
            '|' => {
                if self.bump_if('|') {
                    Token::Or { pos }
                } else {
                    return Err(ClikeError::LexUnexpectedChar { ch: c, pos });
                }
            }
            _ => return Err(ClikeError::LexUnexpectedChar { ch: c, pos }),
        };

        Ok(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = vec![];
        loop {
            let tok = lexer.next().expect("lex ok");
            let kind = tok.kind();
            out.push(kind);
            if kind == TokenKind::Eof {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(
            kinds("int foo"),
            vec![TokenKind::IntKw, TokenKind::Id, TokenKind::Eof]
        );
    }

    #[test]
    fn lexes_multi_char_operators_over_prefixes() {
        assert_eq!(
            kinds("<= < == = != && ||"),
            vec![
                TokenKind::Leq,
                TokenKind::Lt,
                TokenKind::Eq,
                TokenKind::Assign,
                TokenKind::Neq,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_float_vs_integer() {
        let mut lexer = Lexer::new("42 3.5 7.");
        let Token::IntegerConst { value, .. } = lexer.next().unwrap() else {
            panic!("expected integer");
        };
        assert_eq!(value, 42);

        let Token::FloatConst { value, .. } = lexer.next().unwrap() else {
            panic!("expected float");
        };
        assert_eq!(value, 3.5);

        // "7." with no trailing digit: the integer stands alone.
        let Token::IntegerConst { value, .. } = lexer.next().unwrap() else {
            panic!("expected integer");
        };
        assert_eq!(value, 7);
    }

    #[test]
    fn skips_line_comments() {
        assert_eq!(
            kinds("int x; // trailing comment\nfloat y;"),
            vec![
                TokenKind::IntKw,
                TokenKind::Id,
                TokenKind::Semi,
                TokenKind::FloatKw,
                TokenKind::Id,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let mut lexer = Lexer::new("int\n  foo");
        let first = lexer.next().unwrap();
        assert_eq!(first.position(), Position::new(1, 1));
        let second = lexer.next().unwrap();
        assert_eq!(second.position(), Position::new(2, 3));
    }

    #[test]
    fn lexes_include_directive() {
        let mut lexer = Lexer::new("#include \"utils.clike\"");
        let Token::Include { path, .. } = lexer.next().unwrap() else {
            panic!("expected include token");
        };
        assert_eq!(path, "utils.clike");
    }

    #[test]
    fn rejects_unterminated_string() {
        let mut lexer = Lexer::new("\"abc");
        assert_eq!(
            lexer.next(),
            Err(ClikeError::LexUnterminatedString { pos: Position::new(1, 1) })
        );
    }

    #[test]
    fn rejects_multi_byte_char_literal() {
        let mut lexer = Lexer::new("'ab'");
        assert!(matches!(lexer.next(), Err(ClikeError::LexBadChar { .. })));
    }

    #[test]
    fn rejects_unknown_character() {
        let mut lexer = Lexer::new("@");
        assert_eq!(
            lexer.next(),
            Err(ClikeError::LexUnexpectedChar { ch: '@', pos: Position::new(1, 1) })
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("int x");
        let peeked = lexer.peek().unwrap();
        let next = lexer.next().unwrap();
        assert_eq!(peeked.kind(), next.kind());
        assert_eq!(next.kind(), TokenKind::IntKw);
    }
}
