use std::rc::Rc;

use crate::{
    ast::{
        BinaryOp, ClassDecl, ClassMember, ConditionalStyle, Expr, ExprKind, FunctionDecl, Literal,
        Program, PropertyDecl, Stmt, StmtKind, UnaryOp,
    },
    diagnostics::{Diagnostic, SourceSpan},
    error_code::ErrorCode,
    lexer::{Keyword, Lexer, Token, TokenKind},
    stack::ensure_sufficient_stack,
};

/// Deepest statement/expression nesting accepted before reporting E0001.
pub const MAX_NESTING: usize = 256;

/// Parse a complete program. Fails on the first malformed construct; no
/// partial tree is ever returned.
pub fn parse_program(source: &str) -> Result<Program, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(&TokenKind::Eof) {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            items.push(self.parse_statement()?);
        }
        Ok(Program { items })
    }

    fn parse_block_items(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            items.push(self.parse_statement()?);
        }
        self.consume(&TokenKind::RBrace, "`}` to close block")?;
        Ok(items)
    }

    fn parse_block(&mut self) -> Result<(Vec<Stmt>, SourceSpan), Diagnostic> {
        let lbrace = self.consume(&TokenKind::LBrace, "`{` to start block")?;
        let items = self.parse_block_items()?;
        Ok((items, lbrace.span.to(self.previous().span)))
    }

    /// Runs one level of recursive descent, refusing to go deeper than
    /// [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, Diagnostic>,
    ) -> Result<T, Diagnostic> {
        if self.depth >= MAX_NESTING {
            let token = self.peek().clone();
            return Err(self.error_at(
                &token,
                ErrorCode::E0001,
                format!("nesting exceeds {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.depth -= 1;
        result
    }

    fn parse_statement(&mut self) -> Result<Stmt, Diagnostic> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt, Diagnostic> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Let) => self.parse_let(),
            TokenKind::Keyword(Keyword::Func) => {
                let decl = self.parse_function_decl()?;
                Ok(Stmt {
                    span: decl.span,
                    kind: StmtKind::Function(decl),
                })
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class(),
            TokenKind::Keyword(Keyword::Import) => self.parse_import(),
            TokenKind::Keyword(Keyword::If) => self.parse_conditional(ConditionalStyle::Traditional),
            TokenKind::Keyword(Keyword::When) => self.parse_conditional(ConditionalStyle::Cognitive),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Repeat) => self.parse_repeat(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => {
                let token = self.advance();
                self.consume_optional_semicolon();
                Ok(Stmt {
                    kind: StmtKind::Break,
                    span: token.span,
                })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let token = self.advance();
                self.consume_optional_semicolon();
                Ok(Stmt {
                    kind: StmtKind::Continue,
                    span: token.span,
                })
            }
            TokenKind::LBrace => {
                let (items, span) = self.parse_block()?;
                Ok(Stmt {
                    kind: StmtKind::Block(items),
                    span,
                })
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Let)?.span;
        let name_token = self.consume_identifier("variable name")?;
        self.consume(&TokenKind::Assign, "`=` in let binding")?;
        let value = self.parse_expression()?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            span: start.to(value.span),
            kind: StmtKind::Let {
                name: name_token.lexeme,
                value,
            },
        })
    }

    fn parse_function_decl(&mut self) -> Result<FunctionDecl, Diagnostic> {
        let start = self.consume_keyword(Keyword::Func)?.span;
        let name_token = self.consume_identifier("function name")?;
        self.consume(&TokenKind::LParen, "`(` after function name")?;
        let params = self.parse_params()?;
        let (body, body_span) = self.parse_block()?;
        Ok(FunctionDecl {
            name: name_token.lexeme,
            params,
            body: Rc::from(body),
            span: start.to(body_span),
        })
    }

    /// Parameter names up to and including the closing `)`.
    fn parse_params(&mut self) -> Result<Vec<String>, Diagnostic> {
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let param = self.consume_identifier("parameter name")?;
                if params.contains(&param.lexeme) {
                    return Err(self.error_at(
                        &param,
                        ErrorCode::E0001,
                        format!("duplicate parameter `{}`", param.lexeme),
                    ));
                }
                params.push(param.lexeme);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen, "`)` after parameters")?;
        Ok(params)
    }

    fn parse_class(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Class)?.span;
        let name_token = self.consume_identifier("class name")?;
        let mut bases = Vec::new();
        if self.matches(&TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    let base = self.consume_identifier("base class name")?;
                    bases.push((base.lexeme, base.span));
                    if !self.matches(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.consume(&TokenKind::RParen, "`)` after base classes")?;
        }
        self.consume(&TokenKind::LBrace, "`{` to start class body")?;
        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            if self.matches(&TokenKind::Semicolon) {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        let end = self.consume(&TokenKind::RBrace, "`}` to close class body")?;
        Ok(Stmt {
            span: start.to(end.span),
            kind: StmtKind::Class(ClassDecl {
                name: name_token.lexeme,
                bases,
                members,
            }),
        })
    }

    fn parse_class_member(&mut self) -> Result<ClassMember, Diagnostic> {
        if self.check(&TokenKind::Keyword(Keyword::Func)) {
            return Ok(ClassMember::Method(self.parse_function_decl()?));
        }
        if self.check_contextual("static") {
            self.advance();
            return Ok(ClassMember::StaticMethod(self.parse_function_decl()?));
        }
        if self.check_contextual("classmethod") {
            self.advance();
            return Ok(ClassMember::ClassMethod(self.parse_function_decl()?));
        }
        if self.check_contextual("property") {
            return Ok(ClassMember::Property(self.parse_property()?));
        }
        if self.check(&TokenKind::Keyword(Keyword::Let)) {
            let stmt = self.parse_let()?;
            if let StmtKind::Let { name, value } = stmt.kind {
                return Ok(ClassMember::Field {
                    name,
                    value,
                    span: stmt.span,
                });
            }
        }
        let token = self.peek().clone();
        Err(self.unexpected(&token, "class member (`func`, `static`, `classmethod`, `property` or `let`)"))
    }

    fn parse_property(&mut self) -> Result<PropertyDecl, Diagnostic> {
        let start = self.advance().span;
        let name_token = self.consume_identifier("property name")?;
        self.consume(&TokenKind::LBrace, "`{` to start property body")?;
        let mut getter = None;
        let mut setter = None;
        while !self.check(&TokenKind::RBrace) && !self.check(&TokenKind::Eof) {
            let accessor = self.consume_identifier("`get` or `set`")?;
            self.consume(&TokenKind::LParen, "`(` after accessor")?;
            let params = self.parse_params()?;
            let (body, body_span) = self.parse_block()?;
            let decl = FunctionDecl {
                name: format!("{}.{}", name_token.lexeme, accessor.lexeme),
                params,
                body: Rc::from(body),
                span: accessor.span.to(body_span),
            };
            match accessor.lexeme.as_str() {
                "get" => getter = Some(decl),
                "set" => setter = Some(decl),
                _ => return Err(self.unexpected(&accessor, "`get` or `set`")),
            }
        }
        let end = self.consume(&TokenKind::RBrace, "`}` to close property body")?;
        Ok(PropertyDecl {
            name: name_token.lexeme,
            getter,
            setter,
            span: start.to(end.span),
        })
    }

    fn parse_import(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Import)?.span;
        let module = self.consume_identifier("module name")?;
        let mut end = module.span;
        let alias = if self.check_contextual("as") {
            self.advance();
            let alias = self.consume_identifier("alias after `as`")?;
            end = alias.span;
            Some(alias.lexeme)
        } else {
            None
        };
        self.consume_optional_semicolon();
        Ok(Stmt {
            span: start.to(end),
            kind: StmtKind::Import {
                module: module.lexeme,
                alias,
            },
        })
    }

    fn parse_conditional(&mut self, style: ConditionalStyle) -> Result<Stmt, Diagnostic> {
        let (opener, closer) = match style {
            ConditionalStyle::Traditional => (Keyword::If, Keyword::Else),
            ConditionalStyle::Cognitive => (Keyword::When, Keyword::Otherwise),
        };
        let start = self.consume_keyword(opener)?.span;
        let condition = self.parse_expression()?;
        let (then_branch, then_span) = self.parse_block()?;
        let mut end = then_span;
        let else_branch = if self.matches_keyword(closer) {
            if self.check(&TokenKind::Keyword(opener)) {
                let nested = self.nested(|parser| parser.parse_conditional(style))?;
                end = nested.span;
                Some(vec![nested])
            } else {
                let (branch, span) = self.parse_block()?;
                end = span;
                Some(branch)
            }
        } else {
            None
        };
        Ok(Stmt {
            span: start.to(end),
            kind: StmtKind::Conditional {
                style,
                condition,
                then_branch,
                else_branch,
            },
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::While)?.span;
        let condition = self.parse_expression()?;
        let (body, span) = self.parse_block()?;
        Ok(Stmt {
            span: start.to(span),
            kind: StmtKind::While { condition, body },
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::For)?.span;
        let binding = self.consume_identifier("loop variable")?.lexeme;
        if self.matches_keyword(Keyword::In) {
            let iterable = self.parse_expression()?;
            let (body, span) = self.parse_block()?;
            return Ok(Stmt {
                span: start.to(span),
                kind: StmtKind::ForEach {
                    binding,
                    iterable,
                    body,
                },
            });
        }
        if !self.check_contextual("from") {
            let token = self.peek().clone();
            return Err(self.unexpected(&token, "`in` or `from` after loop variable"));
        }
        self.advance();
        let range_start = self.parse_expression()?;
        self.consume_contextual("to")?;
        let range_end = self.parse_expression()?;
        let step = if self.check_contextual("step") {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        let (body, span) = self.parse_block()?;
        Ok(Stmt {
            span: start.to(span),
            kind: StmtKind::ForRange {
                binding,
                start: range_start,
                end: range_end,
                step,
                body,
            },
        })
    }

    fn parse_repeat(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.consume_keyword(Keyword::Repeat)?.span;
        let count = self.parse_expression()?;
        self.consume_contextual("times")?;
        let (body, span) = self.parse_block()?;
        Ok(Stmt {
            span: start.to(span),
            kind: StmtKind::Repeat { count, body },
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.consume_keyword(Keyword::Return)?;
        let expr = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.check(&TokenKind::Eof)
            || self.peek().span.line != token.span.line
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_optional_semicolon();
        let span = expr
            .as_ref()
            .map(|expr| token.span.to(expr.span))
            .unwrap_or(token.span);
        Ok(Stmt {
            span,
            kind: StmtKind::Return(expr),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let expr = self.parse_expression()?;
        self.consume_optional_semicolon();
        Ok(Stmt {
            span: expr.span,
            kind: StmtKind::Expr(expr),
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let expr = self.parse_or()?;
        if self.matches(&TokenKind::Assign) {
            let equals = self.previous().clone();
            let value = self.nested(Self::parse_assignment)?;
            return match expr.kind {
                ExprKind::Variable(_) | ExprKind::Index { .. } | ExprKind::Field { .. } => {
                    Ok(Expr {
                        span: expr.span.to(value.span),
                        kind: ExprKind::Assign {
                            target: Box::new(expr),
                            value: Box::new(value),
                        },
                    })
                }
                _ => Err(Diagnostic::new(ErrorCode::E0005, "invalid assignment target")
                    .with_span(expr.span)
                    .with_related(
                        Diagnostic::new(ErrorCode::E0005, "assignment starts here")
                            .with_span(equals.span),
                    )),
            };
        }
        Ok(expr)
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr {
            span: left.span.to(right.span),
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    fn parse_or(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_and()?;
        while self.matches(&TokenKind::DoublePipe) || self.matches_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            expr = Self::binary(BinaryOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_equality()?;
        while self.matches(&TokenKind::DoubleAmpersand) || self.matches_keyword(Keyword::And) {
            let right = self.parse_equality()?;
            expr = Self::binary(BinaryOp::And, expr, right);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_comparison()?;
        while let Some(op) = if self.matches(&TokenKind::EqualEqual) {
            Some(BinaryOp::Equal)
        } else if self.matches(&TokenKind::BangEqual) {
            Some(BinaryOp::NotEqual)
        } else {
            None
        } {
            let right = self.parse_comparison()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_term()?;
        while let Some(op) = if self.matches(&TokenKind::LessEqual) {
            Some(BinaryOp::LessEqual)
        } else if self.matches(&TokenKind::GreaterEqual) {
            Some(BinaryOp::GreaterEqual)
        } else if self.matches(&TokenKind::Less) {
            Some(BinaryOp::Less)
        } else if self.matches(&TokenKind::Greater) {
            Some(BinaryOp::Greater)
        } else {
            None
        } {
            let right = self.parse_term()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_factor()?;
        while let Some(op) = if self.matches(&TokenKind::Plus) {
            Some(BinaryOp::Add)
        } else if self.matches(&TokenKind::Minus) {
            Some(BinaryOp::Sub)
        } else {
            None
        } {
            let right = self.parse_factor()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_unary()?;
        while let Some(op) = if self.matches(&TokenKind::Star) {
            Some(BinaryOp::Mul)
        } else if self.matches(&TokenKind::Slash) {
            Some(BinaryOp::Div)
        } else if self.matches(&TokenKind::Percent) {
            Some(BinaryOp::Mod)
        } else {
            None
        } {
            let right = self.parse_unary()?;
            expr = Self::binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let op = if self.matches(&TokenKind::Minus) {
            UnaryOp::Negate
        } else if self.matches(&TokenKind::Bang) || self.matches_keyword(Keyword::Not) {
            UnaryOp::Not
        } else {
            return self.parse_call();
        };
        let operator = self.previous().span;
        let right = self.nested(Self::parse_unary)?;
        Ok(Expr {
            span: operator.to(right.span),
            kind: ExprKind::Unary {
                op,
                expr: Box::new(right),
            },
        })
    }

    fn parse_call(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.matches(&TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let paren = self.consume(&TokenKind::RParen, "`)` after arguments")?;
                expr = Expr {
                    span: expr.span.to(paren.span),
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                };
            } else if self.matches(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                let bracket = self.consume(&TokenKind::RBracket, "`]` after index")?;
                expr = Expr {
                    span: expr.span.to(bracket.span),
                    kind: ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                };
            } else if self.matches(&TokenKind::Dot) {
                let ident = self.consume_identifier("attribute name after `.`")?;
                expr = Expr {
                    span: expr.span.to(ident.span),
                    kind: ExprKind::Field {
                        target: Box::new(expr),
                        field: ident.lexeme,
                    },
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        let literal = |kind| Expr {
            span: token.span,
            kind: ExprKind::Literal(kind),
        };
        match &token.kind {
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(literal(Literal::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(literal(Literal::Bool(false)))
            }
            TokenKind::Keyword(Keyword::None) => {
                self.advance();
                Ok(literal(Literal::None))
            }
            TokenKind::Number => {
                self.advance();
                self.validate_number(&token)?;
                Ok(literal(Literal::Number(token.lexeme.clone())))
            }
            TokenKind::String => {
                self.advance();
                Ok(literal(Literal::String(token.lexeme.clone())))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr {
                    span: token.span,
                    kind: ExprKind::Variable(token.lexeme.clone()),
                })
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                self.consume(&TokenKind::LParen, "`(` after `super`")?;
                let rparen = self.consume(&TokenKind::RParen, "`)` after `super(`")?;
                Ok(Expr {
                    span: token.span.to(rparen.span),
                    kind: ExprKind::Super,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let rparen = self.consume(&TokenKind::RParen, "`)` after expression")?;
                Ok(Expr {
                    span: token.span.to(rparen.span),
                    kind: ExprKind::Group(Box::new(inner)),
                })
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_dict(),
            _ => Err(self.unexpected(&token, "expression")),
        }
    }

    fn validate_number(&self, token: &Token) -> Result<(), Diagnostic> {
        let digits = token.lexeme.replace('_', "");
        let valid = if digits.contains('.') {
            digits.parse::<f64>().is_ok()
        } else {
            digits.parse::<i64>().is_ok()
        };
        if valid {
            Ok(())
        } else {
            Err(self.error_at(
                token,
                ErrorCode::E0003,
                format!("invalid number literal `{}`", token.lexeme),
            ))
        }
    }

    fn parse_list(&mut self) -> Result<Expr, Diagnostic> {
        let lbracket = self.advance();
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        let rbracket = self.consume(&TokenKind::RBracket, "`]` after list literal")?;
        Ok(Expr {
            span: lbracket.span.to(rbracket.span),
            kind: ExprKind::ListLiteral(elements),
        })
    }

    fn parse_dict(&mut self) -> Result<Expr, Diagnostic> {
        let lbrace = self.advance();
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_expression()?;
            self.consume(&TokenKind::Colon, "`:` in dict literal")?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }
        let rbrace = self.consume(&TokenKind::RBrace, "`}` after dict literal")?;
        Ok(Expr {
            span: lbrace.span.to(rbrace.span),
            kind: ExprKind::DictLiteral(entries),
        })
    }

    fn consume_optional_semicolon(&mut self) {
        let _ = self.matches(&TokenKind::Semicolon);
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(&TokenKind::Keyword(keyword))
    }

    fn check_contextual(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier && token.lexeme == word
    }

    fn consume_contextual(&mut self, word: &str) -> Result<Token, Diagnostic> {
        if self.check_contextual(word) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.unexpected(&token, &format!("`{word}`")))
        }
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.unexpected(&token, expected))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token, Diagnostic> {
        self.consume(
            &TokenKind::Keyword(keyword),
            &format!("keyword `{}`", keyword.as_str()),
        )
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<Token, Diagnostic> {
        self.consume(&TokenKind::Identifier, expected)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// The tokenizer always terminates the stream with `Eof`, so the last
    /// token doubles as the lookahead once the cursor runs off the end.
    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.current.min(last)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn unexpected(&self, token: &Token, expected: &str) -> Diagnostic {
        if token.kind == TokenKind::Eof {
            return self.error_at(
                token,
                ErrorCode::E0004,
                format!("unexpected end of input, expected {expected}"),
            );
        }
        let found = match &token.kind {
            TokenKind::Identifier | TokenKind::Number => format!("`{}`", token.lexeme),
            TokenKind::String => format!("string \"{}\"", token.lexeme),
            other => other.describe(),
        };
        self.error_at(
            token,
            ErrorCode::E0001,
            format!("expected {expected}, found {found}"),
        )
    }

    fn error_at(&self, token: &Token, code: ErrorCode, message: String) -> Diagnostic {
        Diagnostic::new(code, message).with_span(token.span)
    }
}
