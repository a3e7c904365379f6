use num_bigint::BigInt;

use crate::position::Span;

/// Every token the lexer can produce. Number literals keep the
/// integer/float distinction the source spelled out; integers that do not
/// fit in an `i64` are widened to `BigInt` at lex time.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Str(String),
    Ident(String),

    KwVar,
    KwAnd,
    KwOr,
    KwNot,
    KwIf,
    KwThen,
    KwElsif,
    KwElse,
    KwFor,
    KwTo,
    KwStep,
    KwIn,
    KwWhile,
    KwUntil,
    KwDo,
    KwFun,
    KwEnd,
    KwReturn,
    KwContinue,
    KwBreak,

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Arrow,
    Eq,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Dot,

    /// Statement separator: a literal newline or `;`.
    Newline,
    Eof,
}

impl TokenKind {
    /// Human-readable name used in syntax error details.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Int(n) => n.to_string(),
            TokenKind::BigInt(n) => n.to_string(),
            TokenKind::Float(f) => f.to_string(),
            TokenKind::Str(s) => format!("\"{}\"", s),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::KwVar => "VAR".to_string(),
            TokenKind::KwAnd => "AND".to_string(),
            TokenKind::KwOr => "OR".to_string(),
            TokenKind::KwNot => "NOT".to_string(),
            TokenKind::KwIf => "IF".to_string(),
            TokenKind::KwThen => "THEN".to_string(),
            TokenKind::KwElsif => "ELSIF".to_string(),
            TokenKind::KwElse => "ELSE".to_string(),
            TokenKind::KwFor => "FOR".to_string(),
            TokenKind::KwTo => "TO".to_string(),
            TokenKind::KwStep => "STEP".to_string(),
            TokenKind::KwIn => "IN".to_string(),
            TokenKind::KwWhile => "WHILE".to_string(),
            TokenKind::KwUntil => "UNTIL".to_string(),
            TokenKind::KwDo => "DO".to_string(),
            TokenKind::KwFun => "FUN".to_string(),
            TokenKind::KwEnd => "END".to_string(),
            TokenKind::KwReturn => "RETURN".to_string(),
            TokenKind::KwContinue => "CONTINUE".to_string(),
            TokenKind::KwBreak => "BREAK".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Caret => "'^'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Arrow => "'->'".to_string(),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::LtEq => "'<='".to_string(),
            TokenKind::GtEq => "'>='".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// Reserved words are recognized case-sensitively, exactly as spelled.
pub(crate) fn keyword_kind(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "VAR" => TokenKind::KwVar,
        "AND" => TokenKind::KwAnd,
        "OR" => TokenKind::KwOr,
        "NOT" => TokenKind::KwNot,
        "IF" => TokenKind::KwIf,
        "THEN" => TokenKind::KwThen,
        "ELSIF" => TokenKind::KwElsif,
        "ELSE" => TokenKind::KwElse,
        "FOR" => TokenKind::KwFor,
        "TO" => TokenKind::KwTo,
        "STEP" => TokenKind::KwStep,
        "IN" => TokenKind::KwIn,
        "WHILE" => TokenKind::KwWhile,
        "UNTIL" => TokenKind::KwUntil,
        "DO" => TokenKind::KwDo,
        "FUN" => TokenKind::KwFun,
        "END" => TokenKind::KwEnd,
        "RETURN" => TokenKind::KwReturn,
        "CONTINUE" => TokenKind::KwContinue,
        "BREAK" => TokenKind::KwBreak,
        _ => return None,
    };
    Some(kind)
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
