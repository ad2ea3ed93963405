//! Statement parsing

use crate::ast::*;
use crate::parser::expr::{augmented_op, can_start_expression};
use crate::parser::{Parser, Precedence};
use crate::token::TokenKind;

impl Parser {
    /// Parse one statement line or compound statement.
    ///
    /// A simple-statement line may hold several `;`-separated statements.
    pub(super) fn parse_statement(&mut self) -> Result<Vec<Stmt>, ()> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<Vec<Stmt>, ()> {
        let stmt = match self.peek().kind {
            TokenKind::Def => self.parse_function(Vec::new(), None)?,
            TokenKind::Class => self.parse_class(Vec::new(), None)?,
            TokenKind::At => self.parse_decorated()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for(None)?,
            TokenKind::Try => self.parse_try()?,
            TokenKind::With => self.parse_with(None)?,
            TokenKind::Async => self.parse_async()?,
            TokenKind::Name if self.is_match_statement() => self.parse_match()?,
            _ => return self.parse_simple_statements(),
        };
        Ok(vec![stmt])
    }

    /// `:` followed by an indented block or simple statements on the same line
    pub(super) fn parse_suite(&mut self) -> Result<Vec<Stmt>, ()> {
        self.consume(TokenKind::Colon, "expected ':'")?;

        if !self.match_token(TokenKind::Newline) {
            return self.parse_simple_statements();
        }

        if !self.check(TokenKind::Indent) {
            let span = self.tokens[self.current - 1].span;
            self.error_at(span, "expected an indented block");
            return Err(());
        }
        self.advance();
        let body = self.parse_block_body(false);
        self.match_token(TokenKind::Dedent);
        Ok(body)
    }

    // === Compound statements ===

    fn parse_async(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        match self.peek().kind {
            TokenKind::Def => self.parse_function(Vec::new(), Some(start)),
            TokenKind::For => self.parse_for(Some(start)),
            TokenKind::With => self.parse_with(Some(start)),
            _ => {
                self.error("expected 'def', 'for', or 'with' after 'async'");
                Err(())
            }
        }
    }

    fn parse_decorated(&mut self) -> Result<Stmt, ()> {
        let start = self.peek().span.start;
        let mut decorators = Vec::new();
        while self.match_token(TokenKind::At) {
            decorators.push(self.parse_test()?);
            self.consume(TokenKind::Newline, "expected end of line after decorator")?;
        }

        match self.peek().kind {
            TokenKind::Def => self.parse_function(decorators, Some(start)),
            TokenKind::Class => self.parse_class(decorators, Some(start)),
            TokenKind::Async if self.peek_at(1).kind == TokenKind::Def => {
                self.advance();
                self.parse_function_inner(decorators, start, true)
            }
            _ => {
                self.error("expected function or class definition after decorator");
                Err(())
            }
        }
    }

    /// `def`; `start` is the offset of a leading decorator or `async`
    fn parse_function(&mut self, decorators: Vec<Expr>, start: Option<usize>) -> Result<Stmt, ()> {
        let is_async = start.is_some() && self.tokens[self.current - 1].kind == TokenKind::Async;
        let start = start.unwrap_or(self.peek().span.start);
        self.parse_function_inner(decorators, start, is_async)
    }

    fn parse_function_inner(
        &mut self,
        decorators: Vec<Expr>,
        start: usize,
        is_async: bool,
    ) -> Result<Stmt, ()> {
        self.consume(TokenKind::Def, "expected 'def'")?;
        let name = self.consume_name("a function name")?;

        self.consume(TokenKind::LeftParen, "expected '(' after function name")?;
        let params = self.parse_params(TokenKind::RightParen, true)?;
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;

        let returns = if self.match_token(TokenKind::Arrow) {
            Some(self.parse_test()?)
        } else {
            None
        };

        let body = self.parse_suite()?;

        Ok(Stmt::FunctionDef(FunctionDef {
            name,
            params,
            returns,
            body,
            decorators,
            is_async,
            span: self.span_from(start),
        }))
    }

    fn parse_class(&mut self, decorators: Vec<Expr>, start: Option<usize>) -> Result<Stmt, ()> {
        let start = start.unwrap_or(self.peek().span.start);
        self.consume(TokenKind::Class, "expected 'class'")?;
        let name = self.consume_name("a class name")?;

        let (bases, keywords) = if self.match_token(TokenKind::LeftParen) {
            let arguments = self.parse_arguments()?;
            self.consume(TokenKind::RightParen, "expected ')' after base classes")?;
            arguments
        } else {
            (Vec::new(), Vec::new())
        };

        let body = self.parse_suite()?;

        Ok(Stmt::ClassDef(ClassDef {
            name,
            bases,
            keywords,
            body,
            decorators,
            span: self.span_from(start),
        }))
    }

    /// `if` with any number of `elif` clauses, collected flat
    fn parse_if(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let test = self.parse_test()?;
        let body = self.parse_suite()?;

        let mut elifs = Vec::new();
        while self.check(TokenKind::Elif) {
            let clause_start = self.advance().span.start;
            let test = self.parse_test()?;
            let body = self.parse_suite()?;
            elifs.push(ElifClause {
                test,
                body,
                span: self.span_from(clause_start),
            });
        }
        let orelse = self.parse_else_suite()?;

        Ok(Stmt::If(IfStmt {
            test,
            body,
            elifs,
            orelse,
            span: self.span_from(start),
        }))
    }

    fn parse_while(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let test = self.parse_test()?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_suite()?;

        Ok(Stmt::While(WhileStmt {
            test,
            body,
            orelse,
            span: self.span_from(start),
        }))
    }

    fn parse_for(&mut self, async_start: Option<usize>) -> Result<Stmt, ()> {
        let for_start = self.advance().span.start;
        let target = self.parse_target_list()?;
        self.consume(TokenKind::In, "expected 'in' after for-loop target")?;
        let iter = self.parse_star_expressions()?;
        let body = self.parse_suite()?;
        let orelse = self.parse_else_suite()?;

        Ok(Stmt::For(ForStmt {
            target,
            iter,
            body,
            orelse,
            is_async: async_start.is_some(),
            span: self.span_from(async_start.unwrap_or(for_start)),
        }))
    }

    fn parse_else_suite(&mut self) -> Result<Vec<Stmt>, ()> {
        if self.match_token(TokenKind::Else) {
            self.parse_suite()
        } else {
            Ok(Vec::new())
        }
    }

    fn parse_try(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let body = self.parse_suite()?;

        let mut handlers = Vec::new();
        while self.check(TokenKind::Except) {
            let handler_start = self.advance().span.start;
            // `except*` groups
            self.match_token(TokenKind::Star);

            let ty = if self.check(TokenKind::Colon) {
                None
            } else {
                Some(self.parse_test()?)
            };
            let name = if self.match_token(TokenKind::As) {
                Some(self.consume_name("an exception name")?)
            } else {
                None
            };
            let handler_body = self.parse_suite()?;

            handlers.push(ExceptHandler {
                ty,
                name,
                body: handler_body,
                span: self.span_from(handler_start),
            });
        }

        let orelse = self.parse_else_suite()?;
        let finalbody = if self.match_token(TokenKind::Finally) {
            self.parse_suite()?
        } else {
            Vec::new()
        };

        if handlers.is_empty() && finalbody.is_empty() {
            self.error("expected 'except' or 'finally' block");
            return Err(());
        }

        Ok(Stmt::Try(TryStmt {
            body,
            handlers,
            orelse,
            finalbody,
            span: self.span_from(start),
        }))
    }

    fn parse_with(&mut self, async_start: Option<usize>) -> Result<Stmt, ()> {
        let with_start = self.advance().span.start;

        let items = if self.is_parenthesized_with_items() {
            self.advance();
            let mut items = Vec::new();
            while !self.check(TokenKind::RightParen) {
                items.push(self.parse_with_item()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::RightParen, "expected ')' after with-items")?;
            items
        } else {
            let mut items = vec![self.parse_with_item()?];
            while self.match_token(TokenKind::Comma) {
                items.push(self.parse_with_item()?);
            }
            items
        };

        let body = self.parse_suite()?;

        Ok(Stmt::With(WithStmt {
            items,
            body,
            is_async: async_start.is_some(),
            span: self.span_from(async_start.unwrap_or(with_start)),
        }))
    }

    fn parse_with_item(&mut self) -> Result<WithItem, ()> {
        let context = self.parse_test()?;
        let target = if self.match_token(TokenKind::As) {
            Some(self.parse_precedence(Precedence::BitOr)?)
        } else {
            None
        };
        Ok(WithItem { context, target })
    }

    /// `with (a as b, c):` as opposed to a parenthesized context expression
    fn is_parenthesized_with_items(&self) -> bool {
        if !self.check(TokenKind::LeftParen) {
            return false;
        }

        let mut depth = 0usize;
        let mut saw_as = false;
        for (offset, token) in self.tokens[self.current..].iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth += 1,
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return saw_as && self.peek_at(offset + 1).kind == TokenKind::Colon;
                    }
                }
                TokenKind::As if depth == 1 => saw_as = true,
                TokenKind::Newline | TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// `match` is a soft keyword; it starts a statement only when the line
    /// reads `match <subject>:`
    fn is_match_statement(&self) -> bool {
        if !self.check_soft_keyword("match") {
            return false;
        }
        let next = self.peek_at(1).kind;
        if !can_start_expression(next) {
            return false;
        }

        let line_end = self.tokens[self.current..]
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
            .map(|offset| self.current + offset);
        match line_end {
            Some(end) if end > self.current + 1 => self.tokens[end - 1].kind == TokenKind::Colon,
            _ => false,
        }
    }

    fn parse_match(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let subject = self.parse_star_expressions()?;
        self.consume(TokenKind::Colon, "expected ':' after match subject")?;
        self.consume(TokenKind::Newline, "expected end of line after 'match'")?;
        if !self.check(TokenKind::Indent) {
            let span = self.tokens[self.current - 1].span;
            self.error_at(span, "expected an indented block of 'case' clauses");
            return Err(());
        }
        self.advance();

        let mut cases = Vec::new();
        loop {
            match self.peek().kind {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                    continue;
                }
                _ => {}
            }

            let case_start = self.current;
            let parsed = if self.check_soft_keyword("case") {
                self.parse_case()
            } else {
                self.error("expected 'case' clause");
                Err(())
            };
            match parsed {
                Ok(case) => cases.push(case),
                Err(()) => cases.push(self.recover_case(case_start)),
            }
        }

        Ok(Stmt::Match(MatchStmt {
            subject,
            cases,
            span: self.span_from(start),
        }))
    }

    fn parse_case(&mut self) -> Result<MatchCase, ()> {
        let start = self.advance().span.start;
        let pattern = self.parse_pattern()?;
        let alias = if self.match_token(TokenKind::As) {
            Some(self.consume_name("a capture name")?)
        } else {
            None
        };
        let guard = if self.match_token(TokenKind::If) {
            Some(self.parse_test()?)
        } else {
            None
        };
        let body = self.parse_suite()?;

        Ok(MatchCase {
            pattern,
            alias,
            guard,
            body,
            span: self.span_from(start),
        })
    }

    /// Broken `case` clause: keep its block so its names are still bound
    fn recover_case(&mut self, start: usize) -> MatchCase {
        let error = self.recover(start);
        let span = error.span();
        let body = match error {
            Stmt::Error(error) => error.body,
            _ => Vec::new(),
        };
        MatchCase {
            pattern: Expr::Error(span),
            alias: None,
            guard: None,
            body,
            span,
        }
    }

    /// Patterns reuse the expression grammar, minus conditional expressions
    /// so a trailing `if` is left for the guard
    fn parse_pattern(&mut self) -> Result<Expr, ()> {
        let first = self.parse_pattern_item()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }

        let start = first.span().start;
        let mut elements = vec![first];
        while self.match_token(TokenKind::Comma) {
            if !can_start_expression(self.peek().kind) {
                break;
            }
            elements.push(self.parse_pattern_item()?);
        }
        Ok(Expr::Tuple(SequenceExpr {
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_pattern_item(&mut self) -> Result<Expr, ()> {
        if self.check(TokenKind::Star) {
            return self.parse_star_or_test();
        }
        self.parse_precedence(Precedence::Ternary)
    }

    // === Simple statements ===

    /// `;`-separated simple statements up to the end of the logical line
    pub(super) fn parse_simple_statements(&mut self) -> Result<Vec<Stmt>, ()> {
        let mut stmts = Vec::new();
        loop {
            stmts.push(self.parse_small_statement()?);
            if !self.match_token(TokenKind::Semicolon) {
                break;
            }
            if self.check(TokenKind::Newline) || self.is_at_end() {
                break;
            }
        }
        self.expect_line_end()?;
        Ok(stmts)
    }

    fn parse_small_statement(&mut self) -> Result<Stmt, ()> {
        let token = self.peek();
        let (kind, span) = (token.kind, token.span);
        let type_alias = kind == TokenKind::Name
            && token.lexeme == "type"
            && self.peek_at(1).kind == TokenKind::Name
            && self.peek_at(2).kind == TokenKind::Equal;

        match kind {
            TokenKind::Pass => {
                self.advance();
                Ok(Stmt::Pass(span))
            }
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break(span))
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Stmt::Continue(span))
            }
            TokenKind::Return => self.parse_return(),
            TokenKind::Raise => self.parse_raise(),
            TokenKind::Global => self.parse_name_list().map(Stmt::Global),
            TokenKind::Nonlocal => self.parse_name_list().map(Stmt::Nonlocal),
            TokenKind::Del => self.parse_del(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::Import => self.parse_import(),
            TokenKind::From => self.parse_from_import(),
            TokenKind::Name if type_alias => self.parse_type_alias(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let value = if can_start_expression(self.peek().kind) {
            Some(self.parse_star_expressions()?)
        } else {
            None
        };
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: self.span_from(start),
        }))
    }

    fn parse_raise(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let mut exc = None;
        let mut cause = None;
        if can_start_expression(self.peek().kind) {
            exc = Some(self.parse_test()?);
            if self.match_token(TokenKind::From) {
                cause = Some(self.parse_test()?);
            }
        }
        Ok(Stmt::Raise(RaiseStmt {
            exc,
            cause,
            span: self.span_from(start),
        }))
    }

    fn parse_name_list(&mut self) -> Result<NameListStmt, ()> {
        let start = self.advance().span.start;
        let mut names = vec![self.consume_name("a name")?];
        while self.match_token(TokenKind::Comma) {
            names.push(self.consume_name("a name")?);
        }
        Ok(NameListStmt {
            names,
            span: self.span_from(start),
        })
    }

    fn parse_del(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let targets = match self.parse_star_expressions()? {
            Expr::Tuple(tuple) => tuple.elements,
            other => vec![other],
        };
        Ok(Stmt::Delete(DeleteStmt {
            targets,
            span: self.span_from(start),
        }))
    }

    fn parse_assert(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let test = self.parse_test()?;
        let msg = if self.match_token(TokenKind::Comma) {
            Some(self.parse_test()?)
        } else {
            None
        };
        Ok(Stmt::Assert(AssertStmt {
            test,
            msg,
            span: self.span_from(start),
        }))
    }

    fn parse_dotted_name(&mut self) -> Result<DottedName, ()> {
        let first = self.consume_name("a module name")?;
        let start = first.span.start;
        let mut parts = vec![first];
        while self.match_token(TokenKind::Dot) {
            parts.push(self.consume_name("a module name")?);
        }
        Ok(DottedName {
            parts,
            span: self.span_from(start),
        })
    }

    fn parse_optional_alias(&mut self) -> Result<Option<Identifier>, ()> {
        if self.match_token(TokenKind::As) {
            Ok(Some(self.consume_name("an alias")?))
        } else {
            Ok(None)
        }
    }

    /// `import a.b as c, d`
    fn parse_import(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let mut names = Vec::new();
        loop {
            let module = self.parse_dotted_name()?;
            let alias_start = module.span.start;
            let asname = self.parse_optional_alias()?;
            names.push(ImportAlias {
                module,
                asname,
                span: self.span_from(alias_start),
            });
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }
        Ok(Stmt::Import(ImportStmt {
            names,
            span: self.span_from(start),
        }))
    }

    /// `from .pkg import a as b`, `from . import (a, b)`, `from m import *`
    fn parse_from_import(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;

        let mut level = 0;
        loop {
            if self.match_token(TokenKind::Dot) {
                level += 1;
            } else if self.match_token(TokenKind::Ellipsis) {
                level += 3;
            } else {
                break;
            }
        }

        let module = if self.check(TokenKind::Name) || level == 0 {
            Some(self.parse_dotted_name()?)
        } else {
            None
        };

        self.consume(TokenKind::Import, "expected 'import'")?;

        let mut names = Vec::new();
        let mut is_star = false;
        if self.match_token(TokenKind::Star) {
            is_star = true;
        } else if self.match_token(TokenKind::LeftParen) {
            while !self.check(TokenKind::RightParen) {
                names.push(self.parse_from_alias()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.consume(TokenKind::RightParen, "expected ')' after imported names")?;
        } else {
            names.push(self.parse_from_alias()?);
            while self.match_token(TokenKind::Comma) {
                names.push(self.parse_from_alias()?);
            }
        }

        if !is_star && names.is_empty() {
            self.error("expected at least one imported name");
            return Err(());
        }

        Ok(Stmt::ImportFrom(ImportFromStmt {
            module,
            level,
            names,
            is_star,
            span: self.span_from(start),
        }))
    }

    fn parse_from_alias(&mut self) -> Result<ImportFromAlias, ()> {
        let name = self.consume_name("an imported name")?;
        let start = name.span.start;
        let asname = self.parse_optional_alias()?;
        Ok(ImportFromAlias {
            name,
            asname,
            span: self.span_from(start),
        })
    }

    /// `type Alias = value`, bound like an assignment
    fn parse_type_alias(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span.start;
        let name = self.consume_name("a type alias name")?;
        self.consume(TokenKind::Equal, "expected '=' in type alias")?;
        let value = self.parse_test()?;
        Ok(Stmt::Assign(AssignStmt {
            targets: vec![Expr::Name(name)],
            value,
            span: self.span_from(start),
        }))
    }

    /// Expression statement or any assignment form
    fn parse_expression_statement(&mut self) -> Result<Stmt, ()> {
        let start = self.peek().span.start;
        let first = self.parse_star_expressions()?;

        if self.check(TokenKind::Equal) {
            let mut targets = vec![first];
            let mut value = None;
            while self.match_token(TokenKind::Equal) {
                let next = if self.check(TokenKind::Yield) {
                    self.parse_yield()?
                } else {
                    self.parse_star_expressions()?
                };
                if let Some(previous) = value.replace(next) {
                    targets.push(previous);
                }
            }
            for target in &targets {
                self.check_assignable(target);
            }
            let value = value.ok_or(())?;
            return Ok(Stmt::Assign(AssignStmt {
                targets,
                value,
                span: self.span_from(start),
            }));
        }

        if let Some(op) = augmented_op(self.peek().kind) {
            self.advance();
            if !matches!(first, Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript(_)) {
                self.error_at(first.span(), "illegal target for augmented assignment");
            }
            let value = if self.check(TokenKind::Yield) {
                self.parse_yield()?
            } else {
                self.parse_star_expressions()?
            };
            return Ok(Stmt::AugAssign(AugAssignStmt {
                target: first,
                op,
                value,
                span: self.span_from(start),
            }));
        }

        if self.match_token(TokenKind::Colon) {
            if !matches!(first, Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript(_)) {
                self.error_at(first.span(), "illegal target for annotation");
            }
            let annotation = self.parse_test()?;
            let value = if self.match_token(TokenKind::Equal) {
                Some(if self.check(TokenKind::Yield) {
                    self.parse_yield()?
                } else {
                    self.parse_star_expressions()?
                })
            } else {
                None
            };
            return Ok(Stmt::AnnAssign(AnnAssignStmt {
                target: first,
                annotation,
                value,
                span: self.span_from(start),
            }));
        }

        Ok(Stmt::Expr(ExprStmt {
            value: first,
            span: self.span_from(start),
        }))
    }

    fn check_assignable(&mut self, target: &Expr) {
        if !target.is_assignable() {
            self.error_at(target.span(), "cannot assign to expression");
        }
    }
}
