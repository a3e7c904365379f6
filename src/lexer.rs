use std::rc::Rc;

use num_bigint::BigInt;

use crate::error::Error;
use crate::position::{Pos, Source, Span};
use crate::token::{Token, TokenKind, keyword_kind};
use crate::trace::trace_log;

/// Left-to-right scanner over the source's code points. Consumed whole:
/// the first unrecognized character aborts lexing with an error, there is
/// no recovery.
pub struct Lexer {
    src: Rc<Source>,
    chars: Vec<char>,
    pos: Pos,
}

impl Lexer {
    pub fn new(src: Rc<Source>) -> Self {
        let chars = src.text.chars().collect();
        Self {
            src,
            chars,
            pos: Pos::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos.index).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.advance(ch);
        Some(ch)
    }

    fn span_from(&self, start: Pos) -> Span {
        Span::new(&self.src, start, self.pos)
    }

    /// Consume one character and emit a token for it.
    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.pos;
        self.bump();
        Token {
            kind,
            span: self.span_from(start),
        }
    }

    /// Two-character operator lookahead: assume the longer form, fall back
    /// to `short` if the second character does not match.
    fn one_or_two(&mut self, second: char, long: TokenKind, short: TokenKind) -> Token {
        let start = self.pos;
        self.bump();
        let kind = if self.peek() == Some(second) {
            self.bump();
            long
        } else {
            short
        };
        Token {
            kind,
            span: self.span_from(start),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\n' | ';' => tokens.push(self.single(TokenKind::Newline)),
                '0'..='9' => tokens.push(self.lex_number()),
                c if c.is_alphabetic() => tokens.push(self.lex_ident()),
                '"' => tokens.push(self.lex_string()?),
                '+' => tokens.push(self.single(TokenKind::Plus)),
                '-' => tokens.push(self.one_or_two('>', TokenKind::Arrow, TokenKind::Minus)),
                '*' => tokens.push(self.single(TokenKind::Star)),
                '/' => tokens.push(self.single(TokenKind::Slash)),
                '^' => tokens.push(self.single(TokenKind::Caret)),
                '(' => tokens.push(self.single(TokenKind::LParen)),
                ')' => tokens.push(self.single(TokenKind::RParen)),
                '[' => tokens.push(self.single(TokenKind::LBracket)),
                ']' => tokens.push(self.single(TokenKind::RBracket)),
                ',' => tokens.push(self.single(TokenKind::Comma)),
                '.' => tokens.push(self.single(TokenKind::Dot)),
                '=' => tokens.push(self.one_or_two('=', TokenKind::EqEq, TokenKind::Eq)),
                '<' => tokens.push(self.one_or_two('=', TokenKind::LtEq, TokenKind::Lt)),
                '>' => tokens.push(self.one_or_two('=', TokenKind::GtEq, TokenKind::Gt)),
                '!' => {
                    let start = self.pos;
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        tokens.push(Token {
                            kind: TokenKind::NotEq,
                            span: self.span_from(start),
                        });
                    } else {
                        return Err(Error::expected_char(
                            self.span_from(start),
                            "'=' (after '!')",
                        ));
                    }
                }
                other => {
                    let start = self.pos;
                    self.bump();
                    return Err(Error::illegal_char(self.span_from(start), other));
                }
            }
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: self.span_from(self.pos),
        });
        trace_log!("lex", "{}: {} tokens", self.src.name, tokens.len());
        Ok(tokens)
    }

    /// Digits with at most one `.`: a second dot ends the literal early and
    /// is left for the next token.
    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c == '.' {
                if seen_dot {
                    break;
                }
                seen_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.bump();
        }
        let kind = if seen_dot {
            TokenKind::Float(text.parse::<f64>().unwrap_or(f64::NAN))
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                // Only digits here, so the wide parse cannot fail.
                Err(_) => TokenKind::BigInt(
                    BigInt::parse_bytes(text.as_bytes(), 10).unwrap_or_default(),
                ),
            }
        };
        Token {
            kind,
            span: self.span_from(start),
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !c.is_alphanumeric() && c != '_' {
                break;
            }
            text.push(c);
            self.bump();
        }
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Ident(text));
        Token {
            kind,
            span: self.span_from(start),
        }
    }

    /// `"…"` with backslash escapes: `\n` and `\t` translate, anything else
    /// escaped passes through literally. End of input before the closing
    /// quote is an error.
    fn lex_string(&mut self) -> Result<Token, Error> {
        let start = self.pos;
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(Error::unterminated_string(self.span_from(start))),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    None => return Err(Error::unterminated_string(self.span_from(start))),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                },
                Some(other) => text.push(other),
            }
        }
        Ok(Token {
            kind: TokenKind::Str(text),
            span: self.span_from(start),
        })
    }

    /// `#` to end of line. The newline itself is not consumed, so it still
    /// separates statements.
    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(Source::new("<test>", input))
            .tokenize()
            .expect("lex")
    }

    /// Collect all non-Eof token kinds from input.
    fn token_kinds(input: &str) -> Vec<TokenKind> {
        let mut kinds: Vec<TokenKind> = tokens(input).into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds.pop(), Some(TokenKind::Eof));
        kinds
    }

    fn lex_err(input: &str) -> Error {
        Lexer::new(Source::new("<test>", input))
            .tokenize()
            .expect_err("expected a lex error")
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            token_kinds("1 + 2.5 * 3"),
            vec![
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Float(2.5),
                TokenKind::Star,
                TokenKind::Int(3),
            ]
        );
    }

    #[test]
    fn test_second_dot_ends_number() {
        // "12.3.4" is not a lex error: the literal stops at the second dot.
        assert_eq!(
            token_kinds("12.3.4"),
            vec![
                TokenKind::Float(12.3),
                TokenKind::Dot,
                TokenKind::Int(4),
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_float() {
        assert_eq!(token_kinds("12."), vec![TokenKind::Float(12.0)]);
    }

    #[test]
    fn test_big_integer_literal() {
        let kinds = token_kinds("99999999999999999999");
        assert!(matches!(kinds[0], TokenKind::BigInt(_)));
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            token_kinds("VAR x = 1"),
            vec![
                TokenKind::KwVar,
                TokenKind::Ident("x".to_string()),
                TokenKind::Eq,
                TokenKind::Int(1),
            ]
        );
        // Keywords are case-sensitive.
        assert_eq!(
            token_kinds("var"),
            vec![TokenKind::Ident("var".to_string())]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            token_kinds("== != <= >= -> < > ="),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Arrow,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eq,
            ]
        );
    }

    #[test]
    fn test_lone_bang_is_an_error() {
        let err = lex_err("1 ! 2");
        assert_eq!(err.kind, crate::error::ErrorKind::ExpectedChar);
        assert_eq!(err.details, "'=' (after '!')");
    }

    #[test]
    fn test_illegal_character() {
        let err = lex_err("1 @ 2");
        assert_eq!(err.kind, crate::error::ErrorKind::IllegalChar);
        assert_eq!(err.details, "'@'");
        assert_eq!(err.span.start.column, 2);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            token_kinds(r#""a\nb\tc\\d\"e""#),
            vec![TokenKind::Str("a\nb\tc\\d\"e".to_string())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex_err("\"abc");
        assert_eq!(err.kind, crate::error::ErrorKind::UnterminatedString);
    }

    #[test]
    fn test_newline_and_semicolon_separate() {
        assert_eq!(
            token_kinds("1;2\n3"),
            vec![
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Int(2),
                TokenKind::Newline,
                TokenKind::Int(3),
            ]
        );
    }

    #[test]
    fn test_comment_keeps_its_newline() {
        assert_eq!(
            token_kinds("1 # ignored\n2"),
            vec![TokenKind::Int(1), TokenKind::Newline, TokenKind::Int(2)]
        );
    }

    #[test]
    fn test_spans_are_exact_and_ordered() {
        let input = "VAR total = 1 + \"two\"";
        let toks = tokens(input);
        let mut last_end = 0;
        for tok in &toks {
            if matches!(tok.kind, TokenKind::Eof) {
                continue;
            }
            assert!(tok.span.start.index >= last_end, "overlapping spans");
            last_end = tok.span.end.index;
            // Re-lexing a token's slice reproduces the token.
            let slice = tok.span.slice();
            let again = Lexer::new(Source::new("<slice>", slice.clone()))
                .tokenize()
                .expect("slice lexes");
            assert_eq!(again[0].kind, tok.kind, "slice {:?} did not round-trip", slice);
        }
    }
}
