//! Token model for CLIKE (spec §3, §4.1).
//!
//! A [`Token`] carries its kind, an optional lexical value baked into the variant, and the
//! source position of its first character. [`TokenKind`] is the payload-free tag used by
//! the parser's `eat` primitive, so a call site can say "I expect a `Semi`" without caring
//! about any value the lexer attached.

use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    IntKw,
    FloatKw,
    CharKw,
    StringKw,
    VoidKw,
    If,
    Else,
    While,
    For,
    Return,
    Include,
    Id,
    IntegerConst,
    FloatConst,
    CharConst,
    StringConst,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    And,
    Or,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    Comma,
    Semi,
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone)]
pub enum Token {
    IntKw { pos: Position },
    FloatKw { pos: Position },
    CharKw { pos: Position },
    StringKw { pos: Position },
    VoidKw { pos: Position },
    If { pos: Position },
    Else { pos: Position },
    While { pos: Position },
    For { pos: Position },
    Return { pos: Position },
    Include { path: String, pos: Position },
    Id { name: String, pos: Position },
    IntegerConst { value: i64, pos: Position },
    FloatConst { value: f64, pos: Position },
    CharConst { value: u8, pos: Position },
    StringConst { value: String, pos: Position },
    Plus { pos: Position },
    Minus { pos: Position },
    Star { pos: Position },
    Slash { pos: Position },
    Assign { pos: Position },
    Eq { pos: Position },
    Neq { pos: Position },
    Lt { pos: Position },
    Gt { pos: Position },
    Leq { pos: Position },
    Geq { pos: Position },
    And { pos: Position },
    Or { pos: Position },
    LParen { pos: Position },
    RParen { pos: Position },
    LBrace { pos: Position },
    RBrace { pos: Position },
    LBrack { pos: Position },
    RBrack { pos: Position },
    Comma { pos: Position },
    Semi { pos: Position },
    Eof { pos: Position },
}

impl Token {
    pub fn position(&self) -> Position {
        use Token::*;
        match self {
            IntKw { pos }
            | FloatKw { pos }
            | CharKw { pos }
            | StringKw { pos }
            | VoidKw { pos }
            | If { pos }
            | Else { pos }
            | While { pos }
            | For { pos }
            | Return { pos }
            | Include { pos, .. }
            | Id { pos, .. }
            | IntegerConst { pos, .. }
            | FloatConst { pos, .. }
            | CharConst { pos, .. }
            | StringConst { pos, .. }
            | Plus { pos }
            | Minus { pos }
            | Star { pos }
            | Slash { pos }
            | Assign { pos }
            | Eq { pos }
            | Neq { pos }
            | Lt { pos }
            | Gt { pos }
            | Leq { pos }
            | Geq { pos }
            | And { pos }
            | Or { pos }
            | LParen { pos }
            | RParen { pos }
            | LBrace { pos }
            | RBrace { pos }
            | LBrack { pos }
            | RBrack { pos }
            | Comma { pos }
            | Semi { pos }
            | Eof { pos } => *pos,
        }
    }

    pub fn kind(&self) -> TokenKind {
        use Token::*;
        match self {
            IntKw { .. } => TokenKind::IntKw,
            FloatKw { .. } => TokenKind::FloatKw,
            CharKw { .. } => TokenKind::CharKw,
            StringKw { .. } => TokenKind::StringKw,
            VoidKw { .. } => TokenKind::VoidKw,
            If { .. } => TokenKind::If,
            Else { .. } => TokenKind::Else,
            While { .. } => TokenKind::While,
            For { .. } => TokenKind::For,
            Return { .. } => TokenKind::Return,
            Include { .. } => TokenKind::Include,
            Id { .. } => TokenKind::Id,
            IntegerConst { .. } => TokenKind::IntegerConst,
            FloatConst { .. } => TokenKind::FloatConst,
            CharConst { .. } => TokenKind::CharConst,
            StringConst { .. } => TokenKind::StringConst,
            Plus { .. } => TokenKind::Plus,
            Minus { .. } => TokenKind::Minus,
            Star { .. } => TokenKind::Star,
            Slash { .. } => TokenKind::Slash,
            Assign { .. } => TokenKind::Assign,
            Eq { .. } => TokenKind::Eq,
            Neq { .. } => TokenKind::Neq,
            Lt { .. } => TokenKind::Lt,
            Gt { .. } => TokenKind::Gt,
            Leq { .. } => TokenKind::Leq,
            Geq { .. } => TokenKind::Geq,
            And { .. } => TokenKind::And,
            Or { .. } => TokenKind::Or,
            LParen { .. } => TokenKind::LParen,
            RParen { .. } => TokenKind::RParen,
            LBrace { .. } => TokenKind::LBrace,
            RBrace { .. } => TokenKind::RBrace,
            LBrack { .. } => TokenKind::LBrack,
            RBrack { .. } => TokenKind::RBrack,
            Comma { .. } => TokenKind::Comma,
            Semi { .. } => TokenKind::Semi,
            Eof { .. } => TokenKind::Eof,
        }
    }

    /// A short, human-readable rendering for diagnostics (`PARSE_EXPECTED{..., got, ...}`).
    pub fn describe(&self) -> String {
        use Token::*;
        match self {
            Id { name, .. } => format!("identifier '{name}'"),
            IntegerConst { value, .. } => format!("integer '{value}'"),
            FloatConst { value, .. } => format!("float '{value}'"),
            CharConst { value, .. } => format!("char '{}'", *value as char),
            StringConst { value, .. } => format!("string \"{value}\""),
            Include { path, .. } => format!("#include \"{path}\""),
            other => other.kind().to_string(),
        }
    }
}

/// Reserved identifiers that are reclassified from `ID` to a keyword kind after lexing
/// (spec §4.1).
pub const KEYWORDS: &[(&str, fn(Position) -> Token)] = &[
    ("int", |pos| Token::IntKw { pos }),
    ("float", |pos| Token::FloatKw { pos }),
    ("char", |pos| Token::CharKw { pos }),
    ("string", |pos| Token::StringKw { pos }),
    ("void", |pos| Token::VoidKw { pos }),
    ("if", |pos| Token::If { pos }),
    ("else", |pos| Token::Else { pos }),
    ("while", |pos| Token::While { pos }),
    ("for", |pos| Token::For { pos }),
    ("return", |pos| Token::Return { pos }),
];
