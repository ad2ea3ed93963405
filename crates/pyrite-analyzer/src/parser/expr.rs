//! Expression parsing (Pratt parsing)

use crate::ast::*;
use crate::parser::{describe, Parser, Precedence};
use crate::token::TokenKind;

impl Parser {
    /// Parse a `test`: conditional expression, lambda, or walrus
    pub(super) fn parse_test(&mut self) -> Result<Expr, ()> {
        if self.check(TokenKind::Name) && self.peek_at(1).kind == TokenKind::ColonEqual {
            let target = self.consume_name("a name")?;
            self.advance();
            let value = self.nested(|p| p.parse_test())?;
            let span = target.span.merge(value.span());
            return Ok(Expr::Named(NamedExpr {
                target,
                value: Box::new(value),
                span,
            }));
        }
        self.parse_precedence(Precedence::Lowest)
    }

    /// Parse expression with given precedence
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ()> {
        self.nested(|p| {
            let mut left = p.parse_prefix()?;

            let mut folds = 0;
            while precedence < p.current_precedence() {
                folds += 1;
                p.check_chain_length(folds)?;
                left = p.parse_infix(left)?;
            }

            Ok(left)
        })
    }

    /// A `test` or a `*starred` element
    pub(super) fn parse_star_or_test(&mut self) -> Result<Expr, ()> {
        if self.check(TokenKind::Star) {
            return self.parse_starred();
        }
        self.parse_test()
    }

    /// Comma-separated expressions; more than one (or a trailing comma) is a tuple
    pub(super) fn parse_star_expressions(&mut self) -> Result<Expr, ()> {
        let first = self.parse_star_or_test()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.span().start;
        let mut elements = vec![first];
        while self.match_token(TokenKind::Comma) {
            if !can_start_expression(self.peek().kind) {
                break;
            }
            elements.push(self.parse_star_or_test()?);
        }

        Ok(Expr::Tuple(SequenceExpr {
            elements,
            span: self.span_from(start),
        }))
    }

    /// Assignment target list in `for` loops and comprehensions; stops before `in`
    pub(super) fn parse_target_list(&mut self) -> Result<Expr, ()> {
        let first = self.parse_target()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.span().start;
        let mut elements = vec![first];
        while self.match_token(TokenKind::Comma) {
            if !can_start_expression(self.peek().kind) {
                break;
            }
            elements.push(self.parse_target()?);
        }

        Ok(Expr::Tuple(SequenceExpr {
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_target(&mut self) -> Result<Expr, ()> {
        if self.check(TokenKind::Star) {
            return self.parse_starred();
        }
        self.parse_precedence(Precedence::Comparison)
    }

    fn parse_starred(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span.start;
        let value = self.parse_precedence(Precedence::Comparison)?;
        Ok(Expr::Starred(StarredExpr {
            value: Box::new(value),
            double: false,
            span: self.span_from(start),
        }))
    }

    /// Parse prefix expression
    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::Not => self.parse_unary(UnaryOp::Not, Precedence::Not),
            TokenKind::Minus => self.parse_unary(UnaryOp::Neg, Precedence::Unary),
            TokenKind::Plus => self.parse_unary(UnaryOp::Pos, Precedence::Unary),
            TokenKind::Tilde => self.parse_unary(UnaryOp::Invert, Precedence::Unary),
            TokenKind::Lambda => self.parse_lambda(),
            TokenKind::Yield => self.parse_yield(),
            TokenKind::Star => self.parse_starred(),
            TokenKind::Await => {
                let start = self.advance().span.start;
                let value = self.parse_primary()?;
                Ok(Expr::Await(AwaitExpr {
                    value: Box::new(value),
                    span: self.span_from(start),
                }))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, operand_precedence: Precedence) -> Result<Expr, ()> {
        let start = self.advance().span.start;
        let operand = self.parse_precedence(operand_precedence)?;
        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            span: self.span_from(start),
        }))
    }

    /// Parse infix expression
    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::If => self.parse_conditional(left),
            TokenKind::Or => {
                self.parse_bool_op(left, BoolOp::Or, TokenKind::Or, Precedence::Or)
            }
            TokenKind::And => {
                self.parse_bool_op(left, BoolOp::And, TokenKind::And, Precedence::And)
            }
            TokenKind::Not => self.parse_comparison(left),
            TokenKind::DoubleStar => {
                self.advance();
                // right associative, and `2 ** -1` is allowed
                let right = self.parse_precedence(Precedence::Unary)?;
                Ok(binary(left, BinaryOp::Pow, right))
            }
            kind => match (binary_op(kind), comparison_start(kind)) {
                (Some((op, precedence)), _) => {
                    self.advance();
                    let right = self.parse_precedence(precedence)?;
                    Ok(binary(left, op, right))
                }
                (None, true) => self.parse_comparison(left),
                (None, false) => Ok(left),
            },
        }
    }

    /// Get current token precedence
    pub(super) fn current_precedence(&self) -> Precedence {
        let kind = self.peek().kind;
        match kind {
            TokenKind::If => Precedence::Ternary,
            TokenKind::Or => Precedence::Or,
            TokenKind::And => Precedence::And,
            TokenKind::DoubleStar => Precedence::Power,
            TokenKind::Not if self.peek_at(1).kind == TokenKind::In => Precedence::Comparison,
            TokenKind::Not => Precedence::Lowest,
            _ if comparison_start(kind) => Precedence::Comparison,
            _ => binary_op(kind).map_or(Precedence::Lowest, |(_, precedence)| precedence),
        }
    }

    fn parse_conditional(&mut self, body: Expr) -> Result<Expr, ()> {
        self.advance();
        let test = self.parse_precedence(Precedence::Ternary)?;
        self.consume(TokenKind::Else, "expected 'else' in conditional expression")?;
        let orelse = self.parse_test()?;
        let span = body.span().merge(orelse.span());
        Ok(Expr::IfExp(IfExpr {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
            span,
        }))
    }

    fn parse_bool_op(
        &mut self,
        left: Expr,
        op: BoolOp,
        kind: TokenKind,
        precedence: Precedence,
    ) -> Result<Expr, ()> {
        let start = left.span().start;
        let mut values = vec![left];
        while self.match_token(kind) {
            values.push(self.parse_precedence(precedence)?);
        }
        Ok(Expr::BoolOp(BoolOpExpr {
            op,
            values,
            span: self.span_from(start),
        }))
    }

    fn parse_comparison(&mut self, left: Expr) -> Result<Expr, ()> {
        let start = left.span().start;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();

        while let Some(op) = self.comparison_op() {
            ops.push(op);
            comparators.push(self.parse_precedence(Precedence::Comparison)?);
        }

        Ok(Expr::Compare(CompareExpr {
            left: Box::new(left),
            ops,
            comparators,
            span: self.span_from(start),
        }))
    }

    /// Consume one comparison operator, including `not in` and `is not`
    fn comparison_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek().kind {
            TokenKind::EqualEqual => CompareOp::Eq,
            TokenKind::NotEqual => CompareOp::NotEq,
            TokenKind::Less => CompareOp::Lt,
            TokenKind::LessEqual => CompareOp::LtE,
            TokenKind::Greater => CompareOp::Gt,
            TokenKind::GreaterEqual => CompareOp::GtE,
            TokenKind::In => CompareOp::In,
            TokenKind::Is => {
                self.advance();
                return Some(if self.match_token(TokenKind::Not) {
                    CompareOp::IsNot
                } else {
                    CompareOp::Is
                });
            }
            TokenKind::Not if self.peek_at(1).kind == TokenKind::In => {
                self.advance();
                self.advance();
                return Some(CompareOp::NotIn);
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_lambda(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span.start;
        let params = self.parse_params(TokenKind::Colon, false)?;
        self.consume(TokenKind::Colon, "expected ':' after lambda parameters")?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda(LambdaExpr {
            params,
            body: Box::new(body),
            span: self.span_from(start),
        }))
    }

    pub(super) fn parse_yield(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span.start;
        let (value, is_from) = if self.match_token(TokenKind::From) {
            (Some(Box::new(self.parse_test()?)), true)
        } else if can_start_expression(self.peek().kind) {
            (Some(Box::new(self.parse_star_expressions()?)), false)
        } else {
            (None, false)
        };
        Ok(Expr::Yield(YieldExpr {
            value,
            is_from,
            span: self.span_from(start),
        }))
    }

    /// Parameter list for `def` (annotations allowed) or `lambda`.
    ///
    /// Stops before `end` without consuming it.
    pub(super) fn parse_params(
        &mut self,
        end: TokenKind,
        annotations: bool,
    ) -> Result<Vec<Param>, ()> {
        let mut params: Vec<Param> = Vec::new();
        let mut keyword_only = false;

        while !self.check(end) {
            let start = self.peek().span.start;

            if self.match_token(TokenKind::Slash) {
                for param in params.iter_mut() {
                    if param.kind == ParamKind::Normal {
                        param.kind = ParamKind::PositionalOnly;
                    }
                }
            } else if self.match_token(TokenKind::Star) {
                keyword_only = true;
                if self.check(TokenKind::Name) {
                    let name = self.consume_name("a parameter name")?;
                    let annotation = self.parse_annotation(annotations)?;
                    params.push(Param {
                        name,
                        kind: ParamKind::VarArgs,
                        annotation,
                        default: None,
                        span: self.span_from(start),
                    });
                }
            } else if self.match_token(TokenKind::DoubleStar) {
                let name = self.consume_name("a parameter name")?;
                let annotation = self.parse_annotation(annotations)?;
                params.push(Param {
                    name,
                    kind: ParamKind::KwArgs,
                    annotation,
                    default: None,
                    span: self.span_from(start),
                });
            } else {
                let name = self.consume_name("a parameter name")?;
                let annotation = self.parse_annotation(annotations)?;
                let default = if self.match_token(TokenKind::Equal) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                params.push(Param {
                    name,
                    kind: if keyword_only {
                        ParamKind::KeywordOnly
                    } else {
                        ParamKind::Normal
                    },
                    annotation,
                    default,
                    span: self.span_from(start),
                });
            }

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    fn parse_annotation(&mut self, allowed: bool) -> Result<Option<Expr>, ()> {
        if allowed && self.match_token(TokenKind::Colon) {
            Ok(Some(self.parse_test()?))
        } else {
            Ok(None)
        }
    }

    // === Primaries ===

    /// Atom followed by calls, subscripts, and attribute accesses
    fn parse_primary(&mut self) -> Result<Expr, ()> {
        let mut expr = self.parse_atom()?;

        let mut trailers = 0;
        loop {
            if matches!(
                self.peek().kind,
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::Dot
            ) {
                trailers += 1;
                self.check_chain_length(trailers)?;
            }
            expr = match self.peek().kind {
                TokenKind::LeftParen => self.parse_call(expr)?,
                TokenKind::LeftBracket => self.parse_subscript(expr)?,
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.consume_name("an attribute name")?;
                    let span = expr.span().merge(attr.span);
                    Expr::Attribute(AttributeExpr {
                        value: Box::new(expr),
                        attr,
                        span,
                    })
                }
                _ => break,
            };
        }

        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, ()> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Name => {
                self.advance();
                Ok(Expr::Name(Identifier {
                    name: token.lexeme,
                    span: token.span,
                }))
            }
            TokenKind::Number => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(token.lexeme), token.span))
            }
            TokenKind::String => {
                self.advance();
                let mut span = token.span;
                // implicit concatenation: "a" "b"
                while self.check(TokenKind::String) {
                    span = span.merge(self.advance().span);
                }
                Ok(Expr::Literal(Literal::String(token.lexeme), span))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(token.kind == TokenKind::True), token.span))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::Literal(Literal::None, token.span))
            }
            TokenKind::Ellipsis => {
                self.advance();
                Ok(Expr::Literal(Literal::Ellipsis, token.span))
            }
            TokenKind::LeftParen => self.parse_paren(),
            TokenKind::LeftBracket => self.parse_list(),
            TokenKind::LeftBrace => self.parse_brace(),
            _ => {
                let message = if TokenKind::keyword(&token.lexeme).is_some() {
                    format!("expected expression, found keyword '{}'", token.lexeme)
                } else {
                    format!("expected expression, found {}", describe(&token))
                };
                self.error(&message);
                Err(())
            }
        }
    }

    /// Parenthesized expression, tuple, or generator expression
    fn parse_paren(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span.start;

        if self.match_token(TokenKind::RightParen) {
            return Ok(Expr::Tuple(SequenceExpr {
                elements: Vec::new(),
                span: self.span_from(start),
            }));
        }

        if self.check(TokenKind::Yield) {
            let value = self.parse_yield()?;
            self.consume(TokenKind::RightParen, "expected ')'")?;
            return Ok(value);
        }

        let first = self.parse_star_or_test()?;

        if self.at_comprehension() {
            let clauses = self.parse_comprehension_clauses()?;
            self.consume(TokenKind::RightParen, "expected ')' after generator expression")?;
            return Ok(Expr::Comprehension(ComprehensionExpr {
                kind: ComprehensionKind::Generator,
                element: Box::new(first),
                value: None,
                clauses,
                span: self.span_from(start),
            }));
        }

        if !self.check(TokenKind::Comma) {
            self.consume(TokenKind::RightParen, "expected ')'")?;
            return Ok(first);
        }

        let elements = self.parse_elements(first, TokenKind::RightParen)?;
        self.consume(TokenKind::RightParen, "expected ')'")?;
        Ok(Expr::Tuple(SequenceExpr {
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_list(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span.start;

        if self.match_token(TokenKind::RightBracket) {
            return Ok(Expr::List(SequenceExpr {
                elements: Vec::new(),
                span: self.span_from(start),
            }));
        }

        let first = self.parse_star_or_test()?;

        if self.at_comprehension() {
            let clauses = self.parse_comprehension_clauses()?;
            self.consume(TokenKind::RightBracket, "expected ']' after list comprehension")?;
            return Ok(Expr::Comprehension(ComprehensionExpr {
                kind: ComprehensionKind::List,
                element: Box::new(first),
                value: None,
                clauses,
                span: self.span_from(start),
            }));
        }

        let elements = self.parse_elements(first, TokenKind::RightBracket)?;
        self.consume(TokenKind::RightBracket, "expected ']'")?;
        Ok(Expr::List(SequenceExpr {
            elements,
            span: self.span_from(start),
        }))
    }

    /// Dict or set display, or their comprehensions
    fn parse_brace(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span.start;

        if self.match_token(TokenKind::RightBrace) {
            return Ok(Expr::Dict(DictExpr {
                entries: Vec::new(),
                span: self.span_from(start),
            }));
        }

        if self.check(TokenKind::DoubleStar) {
            let entry = self.parse_dict_unpack()?;
            return self.parse_dict_rest(start, entry);
        }

        let first = self.parse_star_or_test()?;

        if self.match_token(TokenKind::Colon) {
            let value = self.parse_test()?;
            if self.at_comprehension() {
                let clauses = self.parse_comprehension_clauses()?;
                self.consume(TokenKind::RightBrace, "expected '}' after dict comprehension")?;
                return Ok(Expr::Comprehension(ComprehensionExpr {
                    kind: ComprehensionKind::Dict,
                    element: Box::new(first),
                    value: Some(Box::new(value)),
                    clauses,
                    span: self.span_from(start),
                }));
            }
            return self.parse_dict_rest(start, (Some(first), value));
        }

        if self.at_comprehension() {
            let clauses = self.parse_comprehension_clauses()?;
            self.consume(TokenKind::RightBrace, "expected '}' after set comprehension")?;
            return Ok(Expr::Comprehension(ComprehensionExpr {
                kind: ComprehensionKind::Set,
                element: Box::new(first),
                value: None,
                clauses,
                span: self.span_from(start),
            }));
        }

        let elements = self.parse_elements(first, TokenKind::RightBrace)?;
        self.consume(TokenKind::RightBrace, "expected '}'")?;
        Ok(Expr::Set(SequenceExpr {
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_dict_rest(&mut self, start: usize, first: (Option<Expr>, Expr)) -> Result<Expr, ()> {
        let mut entries = vec![first];
        while self.match_token(TokenKind::Comma) {
            if self.check(TokenKind::RightBrace) {
                break;
            }
            if self.check(TokenKind::DoubleStar) {
                entries.push(self.parse_dict_unpack()?);
                continue;
            }
            let key = self.parse_test()?;
            self.consume(TokenKind::Colon, "expected ':' in dict entry")?;
            let value = self.parse_test()?;
            entries.push((Some(key), value));
        }
        self.consume(TokenKind::RightBrace, "expected '}'")?;
        Ok(Expr::Dict(DictExpr {
            entries,
            span: self.span_from(start),
        }))
    }

    fn parse_dict_unpack(&mut self) -> Result<(Option<Expr>, Expr), ()> {
        self.advance();
        let value = self.parse_precedence(Precedence::BitOr)?;
        Ok((None, value))
    }

    /// Remaining comma-separated elements after `first`, up to `close`
    fn parse_elements(&mut self, first: Expr, close: TokenKind) -> Result<Vec<Expr>, ()> {
        let mut elements = vec![first];
        while self.match_token(TokenKind::Comma) {
            if self.check(close) {
                break;
            }
            elements.push(self.parse_star_or_test()?);
        }
        Ok(elements)
    }

    fn at_comprehension(&self) -> bool {
        self.check(TokenKind::For)
            || (self.check(TokenKind::Async) && self.peek_at(1).kind == TokenKind::For)
    }

    fn parse_comprehension_clauses(&mut self) -> Result<Vec<ComprehensionClause>, ()> {
        let mut clauses = Vec::new();
        while self.at_comprehension() {
            let is_async = self.match_token(TokenKind::Async);
            self.advance();
            let target = self.parse_target_list()?;
            self.consume(TokenKind::In, "expected 'in' in comprehension")?;
            let iter = self.parse_precedence(Precedence::Ternary)?;
            let mut ifs = Vec::new();
            while self.match_token(TokenKind::If) {
                ifs.push(self.parse_precedence(Precedence::Ternary)?);
            }
            clauses.push(ComprehensionClause {
                target,
                iter,
                ifs,
                is_async,
            });
        }
        Ok(clauses)
    }

    fn parse_call(&mut self, func: Expr) -> Result<Expr, ()> {
        self.advance();
        let (args, keywords) = self.parse_arguments()?;
        self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
        let span = self.span_from(func.span().start);
        Ok(Expr::Call(CallExpr {
            func: Box::new(func),
            args,
            keywords,
            span,
        }))
    }

    /// Call arguments (also class bases); stops before `)`
    pub(super) fn parse_arguments(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), ()> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();

        while !self.check(TokenKind::RightParen) {
            let start = self.peek().span.start;

            if self.match_token(TokenKind::DoubleStar) {
                let value = self.parse_test()?;
                keywords.push(Keyword {
                    arg: None,
                    value,
                    span: self.span_from(start),
                });
            } else if self.check(TokenKind::Star) {
                args.push(self.parse_starred()?);
            } else if self.check(TokenKind::Name) && self.peek_at(1).kind == TokenKind::Equal {
                let arg = self.consume_name("a keyword argument")?;
                self.advance();
                let value = self.parse_test()?;
                keywords.push(Keyword {
                    arg: Some(arg),
                    value,
                    span: self.span_from(start),
                });
            } else {
                let value = self.parse_test()?;
                if self.at_comprehension() {
                    let clauses = self.parse_comprehension_clauses()?;
                    args.push(Expr::Comprehension(ComprehensionExpr {
                        kind: ComprehensionKind::Generator,
                        element: Box::new(value),
                        value: None,
                        clauses,
                        span: self.span_from(start),
                    }));
                } else {
                    args.push(value);
                }
            }

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        Ok((args, keywords))
    }

    fn parse_subscript(&mut self, value: Expr) -> Result<Expr, ()> {
        self.advance();

        let first = self.parse_slice_item()?;
        let index = if self.check(TokenKind::Comma) {
            let start = first.span().start;
            let mut elements = vec![first];
            while self.match_token(TokenKind::Comma) {
                if self.check(TokenKind::RightBracket) {
                    break;
                }
                elements.push(self.parse_slice_item()?);
            }
            Expr::Tuple(SequenceExpr {
                elements,
                span: self.span_from(start),
            })
        } else {
            first
        };

        self.consume(TokenKind::RightBracket, "expected ']' after subscript")?;
        let span = self.span_from(value.span().start);
        Ok(Expr::Subscript(SubscriptExpr {
            value: Box::new(value),
            index: Box::new(index),
            span,
        }))
    }

    fn parse_slice_item(&mut self) -> Result<Expr, ()> {
        let start = self.peek().span.start;

        let lower = if self.check(TokenKind::Colon) {
            None
        } else {
            let expr = self.parse_star_or_test()?;
            if !self.check(TokenKind::Colon) {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };

        self.advance();
        let upper = self.parse_optional_slice_part()?;
        let step = if self.match_token(TokenKind::Colon) {
            self.parse_optional_slice_part()?
        } else {
            None
        };

        Ok(Expr::Slice(SliceExpr {
            lower,
            upper,
            step,
            span: self.span_from(start),
        }))
    }

    fn parse_optional_slice_part(&mut self) -> Result<Option<Box<Expr>>, ()> {
        if can_start_expression(self.peek().kind) {
            Ok(Some(Box::new(self.parse_test()?)))
        } else {
            Ok(None)
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = left.span().merge(right.span());
    Expr::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span,
    })
}

/// Binary arithmetic/bitwise operator for a token, with its precedence
fn binary_op(kind: TokenKind) -> Option<(BinaryOp, Precedence)> {
    let entry = match kind {
        TokenKind::Pipe => (BinaryOp::BitOr, Precedence::BitOr),
        TokenKind::Caret => (BinaryOp::BitXor, Precedence::BitXor),
        TokenKind::Amp => (BinaryOp::BitAnd, Precedence::BitAnd),
        TokenKind::LeftShift => (BinaryOp::LShift, Precedence::Shift),
        TokenKind::RightShift => (BinaryOp::RShift, Precedence::Shift),
        TokenKind::Plus => (BinaryOp::Add, Precedence::Term),
        TokenKind::Minus => (BinaryOp::Sub, Precedence::Term),
        TokenKind::Star => (BinaryOp::Mul, Precedence::Factor),
        TokenKind::Slash => (BinaryOp::Div, Precedence::Factor),
        TokenKind::DoubleSlash => (BinaryOp::FloorDiv, Precedence::Factor),
        TokenKind::Percent => (BinaryOp::Mod, Precedence::Factor),
        TokenKind::At => (BinaryOp::MatMul, Precedence::Factor),
        _ => return None,
    };
    Some(entry)
}

fn comparison_start(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::EqualEqual
            | TokenKind::NotEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::In
            | TokenKind::Is
    )
}

/// Map an augmented assignment token to its operator
pub(super) fn augmented_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PlusEqual => BinaryOp::Add,
        TokenKind::MinusEqual => BinaryOp::Sub,
        TokenKind::StarEqual => BinaryOp::Mul,
        TokenKind::SlashEqual => BinaryOp::Div,
        TokenKind::DoubleSlashEqual => BinaryOp::FloorDiv,
        TokenKind::PercentEqual => BinaryOp::Mod,
        TokenKind::AtEqual => BinaryOp::MatMul,
        TokenKind::AmpEqual => BinaryOp::BitAnd,
        TokenKind::PipeEqual => BinaryOp::BitOr,
        TokenKind::CaretEqual => BinaryOp::BitXor,
        TokenKind::LeftShiftEqual => BinaryOp::LShift,
        TokenKind::RightShiftEqual => BinaryOp::RShift,
        TokenKind::DoubleStarEqual => BinaryOp::Pow,
        _ => return None,
    };
    Some(op)
}

/// Whether a token can begin an expression
pub(super) fn can_start_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None
            | TokenKind::Ellipsis
            | TokenKind::LeftParen
            | TokenKind::LeftBracket
            | TokenKind::LeftBrace
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Tilde
            | TokenKind::Not
            | TokenKind::Lambda
            | TokenKind::Await
            | TokenKind::Star
            | TokenKind::Yield
    )
}
