use crate::ast::{BinOp, ElseCase, IfCase, Node, NodeKind, UnaryOp};
use crate::error::Error;
use crate::position::Span;
use crate::token::{Token, TokenKind};
use crate::trace::trace_log;
use crate::value::Number;

/// Recursive-descent parser over the lexer's token stream. The stream
/// always ends in `Eof`, so `current()` never runs off the end.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_next_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    /// Consume the current token. Never advances past `Eof`.
    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current().kind == *kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(&kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(&kind) {
            Ok(self.bump())
        } else {
            Err(Error::syntax(
                self.current().span.clone(),
                format!("Expected {}", kind.describe()),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), Error> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let tok = self.bump();
                Ok((name, tok.span))
            }
            _ => Err(Error::syntax(
                self.current().span.clone(),
                "Expected identifier",
            )),
        }
    }

    fn snapshot(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, snap: usize) {
        self.pos = snap;
    }

    fn skip_newlines(&mut self) {
        while self.match_kind(TokenKind::Newline).is_some() {}
    }

    /// Parse a whole program. Anything left over after the statement list
    /// is a syntax error at the leftover token.
    pub fn parse(mut self) -> Result<Node, Error> {
        self.skip_newlines();
        if let TokenKind::Eof = self.current().kind {
            let span = self.current().span.clone();
            return Ok(Node::new(NodeKind::Statements(Vec::new()), span));
        }
        let ast = self.statements(&[])?;
        if !matches!(self.current().kind, TokenKind::Eof) {
            return Err(Error::syntax(
                self.current().span.clone(),
                "token cannot appear after previous tokens",
            ));
        }
        trace_log!("parse", "parsed {} ok", ast.span.src.name);
        Ok(ast)
    }

    /// One or more newline-separated statements. Stops (without consuming)
    /// at `Eof` or at any of `stops`; block parsers pass their closing
    /// keywords here.
    fn statements(&mut self, stops: &[TokenKind]) -> Result<Node, Error> {
        self.skip_newlines();
        let first = self.statement()?;
        let start = first.span.clone();
        let mut end = first.span.clone();
        let mut items = vec![first];
        loop {
            let mut separated = false;
            while self.match_kind(TokenKind::Newline).is_some() {
                separated = true;
            }
            if !separated
                || matches!(self.current().kind, TokenKind::Eof)
                || stops.iter().any(|s| self.check(s))
            {
                break;
            }
            let stmt = self.statement()?;
            end = stmt.span.clone();
            items.push(stmt);
        }
        let span = start.to(&end);
        Ok(Node::new(NodeKind::Statements(items), span))
    }

    fn statement(&mut self) -> Result<Node, Error> {
        if let Some(tok) = self.match_kind(TokenKind::KwReturn) {
            // RETURN's argument is optional; probe for one and back off
            // if the rest of the line is not an expression.
            let snap = self.snapshot();
            return match self.expr() {
                Ok(value) => {
                    let span = tok.span.to(&value.span);
                    Ok(Node::new(NodeKind::Return(Some(Box::new(value))), span))
                }
                Err(_) => {
                    self.restore(snap);
                    Ok(Node::new(NodeKind::Return(None), tok.span))
                }
            };
        }
        if let Some(tok) = self.match_kind(TokenKind::KwContinue) {
            return Ok(Node::new(NodeKind::Continue, tok.span));
        }
        if let Some(tok) = self.match_kind(TokenKind::KwBreak) {
            return Ok(Node::new(NodeKind::Break, tok.span));
        }
        self.expr()
    }

    fn expr(&mut self) -> Result<Node, Error> {
        if let Some(var_tok) = self.match_kind(TokenKind::KwVar) {
            let (name, _) = self.expect_ident()?;
            self.expect(TokenKind::Eq)?;
            let value = self.expr()?;
            let span = var_tok.span.to(&value.span);
            return Ok(Node::new(
                NodeKind::VarAssign {
                    name,
                    value: Box::new(value),
                },
                span,
            ));
        }
        // Bare reassignment: IDENT '=' only, one token of lookahead keeps
        // `x == y` a comparison.
        if let TokenKind::Ident(name) = &self.current().kind
            && self.peek_next_kind() == Some(&TokenKind::Eq)
        {
            let name = name.clone();
            let ident = self.bump();
            self.bump();
            let value = self.expr()?;
            let span = ident.span.to(&value.span);
            return Ok(Node::new(
                NodeKind::VarAssign {
                    name,
                    value: Box::new(value),
                },
                span,
            ));
        }
        self.binary_chain(
            &[(TokenKind::KwAnd, BinOp::And), (TokenKind::KwOr, BinOp::Or)],
            Self::comp,
        )
    }

    fn comp(&mut self) -> Result<Node, Error> {
        if let Some(tok) = self.match_kind(TokenKind::KwNot) {
            let operand = self.comp()?;
            let span = tok.span.to(&operand.span);
            return Ok(Node::new(
                NodeKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.binary_chain(
            &[
                (TokenKind::EqEq, BinOp::Eq),
                (TokenKind::NotEq, BinOp::Ne),
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::LtEq, BinOp::Le),
                (TokenKind::GtEq, BinOp::Ge),
            ],
            Self::arith,
        )
    }

    fn arith(&mut self) -> Result<Node, Error> {
        self.binary_chain(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Node, Error> {
        self.binary_chain(
            &[(TokenKind::Star, BinOp::Mul), (TokenKind::Slash, BinOp::Div)],
            Self::factor,
        )
    }

    /// Left-associative `lhs (op rhs)*` over `next`.
    fn binary_chain(
        &mut self,
        ops: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<Node, Error>,
    ) -> Result<Node, Error> {
        let mut node = next(self)?;
        'chain: loop {
            for (kind, op) in ops {
                if self.check(kind) {
                    self.bump();
                    let rhs = next(self)?;
                    let span = node.span.to(&rhs.span);
                    node = Node::new(
                        NodeKind::Binary {
                            op: *op,
                            left: Box::new(node),
                            right: Box::new(rhs),
                        },
                        span,
                    );
                    continue 'chain;
                }
            }
            break;
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<Node, Error> {
        let op = match self.current().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.bump();
            let operand = self.factor()?;
            let span = tok.span.to(&operand.span);
            return Ok(Node::new(
                NodeKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.power()
    }

    /// `^` binds tighter than unary minus on its right, so the right
    /// operand re-enters at `factor`; that also makes the operator
    /// right-associative.
    fn power(&mut self) -> Result<Node, Error> {
        let mut node = self.call()?;
        while self.match_kind(TokenKind::Caret).is_some() {
            let rhs = self.factor()?;
            let span = node.span.to(&rhs.span);
            node = Node::new(
                NodeKind::Binary {
                    op: BinOp::Pow,
                    left: Box::new(node),
                    right: Box::new(rhs),
                },
                span,
            );
        }
        Ok(node)
    }

    fn call(&mut self) -> Result<Node, Error> {
        let atom = self.atom()?;
        if self.match_kind(TokenKind::LParen).is_some() {
            let mut args = Vec::new();
            if !self.check(&TokenKind::RParen) {
                args.push(self.expr()?);
                while self.match_kind(TokenKind::Comma).is_some() {
                    args.push(self.expr()?);
                }
            }
            let rparen = self.expect(TokenKind::RParen)?;
            let span = atom.span.to(&rparen.span);
            return Ok(Node::new(
                NodeKind::Call {
                    callee: Box::new(atom),
                    args,
                },
                span,
            ));
        }
        Ok(atom)
    }

    fn atom(&mut self) -> Result<Node, Error> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Int(n) => {
                self.bump();
                Ok(Node::new(NodeKind::Number(Number::Int(n)), tok.span))
            }
            TokenKind::BigInt(b) => {
                self.bump();
                Ok(Node::new(NodeKind::Number(Number::Big(b)), tok.span))
            }
            TokenKind::Float(f) => {
                self.bump();
                Ok(Node::new(NodeKind::Number(Number::Float(f)), tok.span))
            }
            TokenKind::Str(s) => {
                self.bump();
                Ok(Node::new(NodeKind::Str(s), tok.span))
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(Node::new(NodeKind::VarAccess(name), tok.span))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.bump();
                self.list_literal(tok.span)
            }
            TokenKind::KwIf => {
                self.bump();
                self.if_expr(tok.span)
            }
            TokenKind::KwFor => {
                self.bump();
                self.for_expr(tok.span)
            }
            TokenKind::KwWhile => {
                self.bump();
                self.loop_expr(tok.span, false)
            }
            TokenKind::KwUntil => {
                self.bump();
                self.loop_expr(tok.span, true)
            }
            TokenKind::KwFun => {
                self.bump();
                self.fun_def(tok.span)
            }
            _ => Err(Error::syntax(
                tok.span,
                "Expected int, float, identifier, '+', '-', '(', '[', \
                 IF, FOR, WHILE, UNTIL or FUN",
            )),
        }
    }

    fn list_literal(&mut self, start: Span) -> Result<Node, Error> {
        let mut elems = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            elems.push(self.expr()?);
            while self.match_kind(TokenKind::Comma).is_some() {
                elems.push(self.expr()?);
            }
        }
        let rbracket = self.expect(TokenKind::RBracket)?;
        let span = start.to(&rbracket.span);
        Ok(Node::new(NodeKind::List(elems), span))
    }

    /// `IF` already consumed. Parses the arm chain; inline bodies keep
    /// their value, block bodies (newline after `THEN`) are suppressed.
    fn if_expr(&mut self, start: Span) -> Result<Node, Error> {
        let mut cases = Vec::new();
        let (else_case, end) = self.if_cases(&mut cases)?;
        let span = start.to(&end);
        Ok(Node::new(NodeKind::If { cases, else_case }, span))
    }

    /// One `cond THEN body` arm plus whatever follows it. Returns the else
    /// clause (if any) and the span end of the whole construct.
    fn if_cases(
        &mut self,
        cases: &mut Vec<IfCase>,
    ) -> Result<(Option<Box<ElseCase>>, Span), Error> {
        let cond = self.expr()?;
        self.expect(TokenKind::KwThen)?;
        if self.check(&TokenKind::Newline) {
            self.bump();
            let body = self.statements(&[TokenKind::KwElsif, TokenKind::KwElse, TokenKind::KwEnd])?;
            cases.push(IfCase {
                cond,
                body,
                suppressed: true,
            });
            if self.match_kind(TokenKind::KwElsif).is_some() {
                return self.if_cases(cases);
            }
            if self.match_kind(TokenKind::KwElse).is_some() {
                return self.else_clause();
            }
            let end = self.expect(TokenKind::KwEnd)?;
            Ok((None, end.span))
        } else {
            let body = self.statement()?;
            let end = body.span.clone();
            cases.push(IfCase {
                cond,
                body,
                suppressed: false,
            });
            if self.match_kind(TokenKind::KwElsif).is_some() {
                return self.if_cases(cases);
            }
            if self.match_kind(TokenKind::KwElse).is_some() {
                return self.else_clause();
            }
            Ok((None, end))
        }
    }

    /// `ELSE` already consumed: inline statement, or newline-opened block
    /// closed by `END`.
    fn else_clause(&mut self) -> Result<(Option<Box<ElseCase>>, Span), Error> {
        if self.check(&TokenKind::Newline) {
            self.bump();
            let body = self.statements(&[TokenKind::KwEnd])?;
            let end = self.expect(TokenKind::KwEnd)?;
            Ok((
                Some(Box::new(ElseCase {
                    body,
                    suppressed: true,
                })),
                end.span,
            ))
        } else {
            let body = self.statement()?;
            let end = body.span.clone();
            Ok((
                Some(Box::new(ElseCase {
                    body,
                    suppressed: false,
                })),
                end,
            ))
        }
    }

    /// A loop body: inline statement after the header keyword, or a
    /// newline-opened block closed by `END`.
    fn loop_body(&mut self) -> Result<(Node, bool, Span), Error> {
        if self.check(&TokenKind::Newline) {
            self.bump();
            let body = self.statements(&[TokenKind::KwEnd])?;
            let end = self.expect(TokenKind::KwEnd)?;
            Ok((body, true, end.span))
        } else {
            let body = self.statement()?;
            let span = body.span.clone();
            Ok((body, false, span))
        }
    }

    /// The keyword separating a loop header from its body. Counted loops
    /// conventionally use `THEN` and condition loops `DO`, but both are
    /// accepted everywhere.
    fn expect_body_keyword(&mut self) -> Result<(), Error> {
        if self.match_kind(TokenKind::KwThen).is_some()
            || self.match_kind(TokenKind::KwDo).is_some()
        {
            Ok(())
        } else {
            Err(Error::syntax(
                self.current().span.clone(),
                "Expected THEN or DO",
            ))
        }
    }

    /// `FOR` already consumed: either `var = start TO end (STEP step)?` or
    /// `var IN iterable`, then a body.
    fn for_expr(&mut self, start_span: Span) -> Result<Node, Error> {
        let (var, _) = self.expect_ident()?;
        if self.match_kind(TokenKind::KwIn).is_some() {
            let iterable = self.expr()?;
            self.expect_body_keyword()?;
            let (body, suppressed, end) = self.loop_body()?;
            let span = start_span.to(&end);
            return Ok(Node::new(
                NodeKind::ForEach {
                    var,
                    iterable: Box::new(iterable),
                    body: Box::new(body),
                    suppressed,
                },
                span,
            ));
        }
        self.expect(TokenKind::Eq)?;
        let start = self.expr()?;
        self.expect(TokenKind::KwTo)?;
        let end = self.expr()?;
        let step = if self.match_kind(TokenKind::KwStep).is_some() {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        self.expect_body_keyword()?;
        let (body, suppressed, end_span) = self.loop_body()?;
        let span = start_span.to(&end_span);
        Ok(Node::new(
            NodeKind::For {
                var,
                start: Box::new(start),
                end: Box::new(end),
                step,
                body: Box::new(body),
                suppressed,
            },
            span,
        ))
    }

    /// `WHILE`/`UNTIL` already consumed; `invert` selects the latter.
    fn loop_expr(&mut self, start: Span, invert: bool) -> Result<Node, Error> {
        let cond = self.expr()?;
        self.expect_body_keyword()?;
        let (body, suppressed, end) = self.loop_body()?;
        let span = start.to(&end);
        let kind = if invert {
            NodeKind::Until {
                cond: Box::new(cond),
                body: Box::new(body),
                suppressed,
            }
        } else {
            NodeKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
                suppressed,
            }
        };
        Ok(Node::new(kind, span))
    }

    /// `FUN` already consumed: optional name, parameter list, then either
    /// `-> expr` (implicit return) or a newline-opened block closed by
    /// `END`.
    fn fun_def(&mut self, start: Span) -> Result<Node, Error> {
        let name = match &self.current().kind {
            TokenKind::Ident(n) => {
                let n = n.clone();
                self.bump();
                Some(n)
            }
            _ => None,
        };
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            params.push(self.expect_ident()?.0);
            while self.match_kind(TokenKind::Comma).is_some() {
                params.push(self.expect_ident()?.0);
            }
        }
        self.expect(TokenKind::RParen)?;
        if self.match_kind(TokenKind::Arrow).is_some() {
            let body = self.expr()?;
            let span = start.to(&body.span);
            return Ok(Node::new(
                NodeKind::FunDef {
                    name,
                    params,
                    body: std::rc::Rc::new(body),
                    expr_body: true,
                },
                span,
            ));
        }
        if !self.check(&TokenKind::Newline) {
            return Err(Error::syntax(
                self.current().span.clone(),
                "Expected '->' or newline",
            ));
        }
        self.bump();
        let body = self.statements(&[TokenKind::KwEnd])?;
        let end = self.expect(TokenKind::KwEnd)?;
        let span = start.to(&end.span);
        Ok(Node::new(
            NodeKind::FunDef {
                name,
                params,
                body: std::rc::Rc::new(body),
                expr_body: false,
            },
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::position::Source;

    fn parse(input: &str) -> Result<Node, Error> {
        let tokens = Lexer::new(Source::new("<test>", input)).tokenize()?;
        Parser::new(tokens).parse()
    }

    /// Root is a statement list; unwrap a single-statement program.
    fn parse_one(input: &str) -> Node {
        let root = parse(input).expect("parse");
        match root.kind {
            NodeKind::Statements(mut items) => {
                assert_eq!(items.len(), 1);
                items.pop().unwrap()
            }
            other => panic!("root was {:?}", other),
        }
    }

    #[test]
    fn test_mul_binds_tighter_than_add() {
        let node = parse_one("2 + 3 * 4");
        let NodeKind::Binary { op, right, .. } = node.kind else {
            panic!("not a binary node");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(
            right.kind,
            NodeKind::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn test_power_is_right_associative() {
        let node = parse_one("2 ^ 3 ^ 2");
        let NodeKind::Binary { op, left, right } = node.kind else {
            panic!("not a binary node");
        };
        assert_eq!(op, BinOp::Pow);
        assert!(matches!(left.kind, NodeKind::Number(Number::Int(2))));
        assert!(matches!(
            right.kind,
            NodeKind::Binary { op: BinOp::Pow, .. }
        ));
    }

    #[test]
    fn test_unary_minus_below_power() {
        // -2 ^ 2 parses as -(2 ^ 2).
        let node = parse_one("-2 ^ 2");
        assert!(matches!(
            node.kind,
            NodeKind::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
    }

    #[test]
    fn test_var_declaration_and_reassignment() {
        assert!(matches!(
            parse_one("VAR x = 1").kind,
            NodeKind::VarAssign { .. }
        ));
        assert!(matches!(
            parse_one("x = 1").kind,
            NodeKind::VarAssign { .. }
        ));
        // One token of lookahead: `x == 1` stays a comparison.
        assert!(matches!(
            parse_one("x == 1").kind,
            NodeKind::Binary { op: BinOp::Eq, .. }
        ));
    }

    #[test]
    fn test_inline_if_vs_block_if() {
        let inline = parse_one("IF x THEN 1 ELSE 2");
        let NodeKind::If { cases, else_case } = inline.kind else {
            panic!("not an if");
        };
        assert!(!cases[0].suppressed);
        assert!(!else_case.unwrap().suppressed);

        let block = parse_one("IF x THEN\n1\nELSE\n2\nEND");
        let NodeKind::If { cases, else_case } = block.kind else {
            panic!("not an if");
        };
        assert!(cases[0].suppressed);
        assert!(else_case.unwrap().suppressed);
    }

    #[test]
    fn test_elsif_chain() {
        let node = parse_one("IF a THEN\n1\nELSIF b THEN\n2\nELSIF c THEN\n3\nEND");
        let NodeKind::If { cases, else_case } = node.kind else {
            panic!("not an if");
        };
        assert_eq!(cases.len(), 3);
        assert!(else_case.is_none());
    }

    #[test]
    fn test_for_header_forms() {
        assert!(matches!(
            parse_one("FOR i = 0 TO 3 THEN i").kind,
            NodeKind::For { step: None, .. }
        ));
        assert!(matches!(
            parse_one("FOR i = 9 TO 0 STEP -1 THEN i").kind,
            NodeKind::For { step: Some(_), .. }
        ));
        assert!(matches!(
            parse_one("FOR x IN [1, 2] THEN x").kind,
            NodeKind::ForEach { .. }
        ));
    }

    #[test]
    fn test_fun_arrow_vs_block() {
        assert!(matches!(
            parse_one("FUN f(n) -> n * n").kind,
            NodeKind::FunDef {
                expr_body: true,
                ..
            }
        ));
        assert!(matches!(
            parse_one("FUN f(n)\nRETURN n\nEND").kind,
            NodeKind::FunDef {
                expr_body: false,
                ..
            }
        ));
        // Anonymous functions are expressions.
        assert!(matches!(
            parse_one("VAR f = FUN (n) -> n").kind,
            NodeKind::VarAssign { .. }
        ));
    }

    #[test]
    fn test_call_arguments() {
        let node = parse_one("f(1, 2, 3)");
        let NodeKind::Call { args, .. } = node.kind else {
            panic!("not a call");
        };
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_trailing_tokens_are_an_error() {
        let err = parse("1 2").expect_err("should not parse");
        assert_eq!(err.details, "token cannot appear after previous tokens");
        assert_eq!(err.span.start.column, 2);
    }

    #[test]
    fn test_unfinished_block_errors_at_end_of_input() {
        // The REPL keys multi-line continuation off this distinction.
        let err = parse("IF x THEN\n").expect_err("unfinished");
        assert!(err.at_end_of_input());
        let err = parse("1 +\n2)").expect_err("bad syntax");
        assert!(!err.at_end_of_input());
    }

    #[test]
    fn test_node_spans_cover_their_tokens() {
        let node = parse_one("1 + 2 * 3");
        assert_eq!(node.span.slice(), "1 + 2 * 3");
        let NodeKind::Binary { right, .. } = node.kind else {
            panic!("not a binary node");
        };
        assert_eq!(right.span.slice(), "2 * 3");
    }

    #[test]
    fn test_return_with_and_without_value() {
        let with = parse_one("FUN f()\nRETURN 1\nEND");
        let NodeKind::FunDef { body, .. } = with.kind else {
            panic!("not a fundef");
        };
        let NodeKind::Statements(items) = &body.kind else {
            panic!("not statements");
        };
        assert!(matches!(items[0].kind, NodeKind::Return(Some(_))));

        let without = parse_one("FUN f()\nRETURN\nEND");
        let NodeKind::FunDef { body, .. } = without.kind else {
            panic!("not a fundef");
        };
        let NodeKind::Statements(items) = &body.kind else {
            panic!("not statements");
        };
        assert!(matches!(items[0].kind, NodeKind::Return(None)));
    }
}
