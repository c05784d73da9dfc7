//! Recursive-descent parser: token stream → tagged syntax tree.
//!
//! External collaborator per the pipeline design — it builds the tree
//! described in [`crate::ast`] and never itself enforces scoping, typing,
//! or reachability; those are the analyzer's and checker's job.

use crate::ast::*;
use crate::span::Span;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(mut self) -> PResult<Program> {
        let module = self.parse_module_decl()?;
        let mut imports = Vec::new();
        while self.check(&TokenKind::Import) {
            imports.push(self.parse_import()?);
        }
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.parse_stmt()?);
        }
        Ok(Program { module, imports, body })
    }

    // -- helpers ---------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.bump())
        } else {
            Err(ParseError {
                message: format!("Expected {what}, found {:?}", self.peek().kind),
                span: self.peek().span.clone(),
            })
        }
    }

    fn eat_semi(&mut self) {
        if self.check(&TokenKind::Semi) {
            self.bump();
        }
    }

    fn ident(&mut self) -> PResult<(String, Span)> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Ident(name) => {
                self.bump();
                Ok((name, tok.span))
            }
            _ => Err(ParseError {
                message: format!("Expected identifier, found {:?}", tok.kind),
                span: tok.span,
            }),
        }
    }

    // -- module / imports -------------------------------------------------

    fn parse_dotted_name(&mut self) -> PResult<(String, Span)> {
        let (first, mut span) = self.ident()?;
        let mut parts = vec![first];
        while self.check(&TokenKind::Dot) {
            // Lookahead: `a.{x,y}` is a named import, not a dotted segment.
            if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::LBrace)) {
                break;
            }
            self.bump();
            let (seg, seg_span) = self.ident()?;
            parts.push(seg);
            span = span.cover(&seg_span);
        }
        Ok((parts.join("."), span))
    }

    fn parse_module_decl(&mut self) -> PResult<Option<(String, Span)>> {
        if self.check(&TokenKind::Module) {
            self.bump();
            let name = self.parse_dotted_name()?;
            self.eat_semi();
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_import(&mut self) -> PResult<Import> {
        let start = self.expect(TokenKind::Import, "'import'")?.span;
        let (path, path_span) = self.parse_dotted_name()?;
        let kind = if self.check(&TokenKind::Dot) {
            self.bump();
            self.expect(TokenKind::LBrace, "'{' in named import")?;
            let mut names = Vec::new();
            while !self.check(&TokenKind::RBrace) {
                let (n, _) = self.ident()?;
                names.push(n);
                if self.check(&TokenKind::Comma) {
                    self.bump();
                }
            }
            self.expect(TokenKind::RBrace, "'}'")?;
            ImportKind::Named { names }
        } else if self.check(&TokenKind::As) {
            self.bump();
            let (alias, _) = self.ident()?;
            ImportKind::Whole { alias: Some(alias) }
        } else {
            ImportKind::Whole { alias: None }
        };
        self.eat_semi();
        Ok(Import { module_path: path, kind, span: start.cover(&path_span) })
    }

    // -- statements --------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let exported = if self.check(&TokenKind::Export) {
            self.bump();
            true
        } else {
            false
        };

        match &self.peek().kind {
            TokenKind::Let => self.parse_let(exported),
            TokenKind::Global => self.parse_global(exported),
            TokenKind::Fn => self.parse_function(exported),
            TokenKind::Struct => self.parse_struct(exported),
            TokenKind::Enum => self.parse_enum(exported),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Match => self.parse_match(),
            _ => self.parse_assign_or_expr_stmt(),
        }
    }

    fn parse_let(&mut self, exported: bool) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Let, "'let'")?.span;
        let (name, name_span) = self.ident()?;
        let ty = if self.check(&TokenKind::Colon) {
            self.bump();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let value = if self.check(&TokenKind::Assign) {
            self.bump();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.eat_semi();
        let end = value.as_ref().map(|v| v.span().clone()).unwrap_or(name_span);
        Ok(Stmt::Let { name, ty, value, exported, span: start.cover(&end) })
    }

    fn parse_global(&mut self, _exported: bool) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Global, "'global'")?.span;
        let (name, _) = self.ident()?;
        self.expect(TokenKind::Assign, "'=' in global declaration")?;
        let value = self.parse_expr()?;
        self.eat_semi();
        let end = value.span().clone();
        Ok(Stmt::Global { name, value, span: start.cover(&end) })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let (name, span) = self.ident()?;
            let ty = if self.check(&TokenKind::Colon) {
                self.bump();
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            params.push(Param { name, ty, span });
            if self.check(&TokenKind::Comma) {
                self.bump();
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_function(&mut self, exported: bool) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Fn, "'fn'")?.span;
        let (name, _) = self.ident()?;
        let params = self.parse_params()?;
        let ret = if self.check(&TokenKind::Colon) {
            self.bump();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Stmt::Function { name, params, ret, body, exported, span: start })
    }

    fn parse_struct(&mut self, exported: bool) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Struct, "'struct'")?.span;
        let (name, _) = self.ident()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let (fname, _) = self.ident()?;
            self.expect(TokenKind::Colon, "':' in struct field")?;
            let ty = self.parse_type_expr()?;
            fields.push((fname, ty));
            if self.check(&TokenKind::Comma) {
                self.bump();
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Stmt::Struct { name, fields, exported, span: start })
    }

    fn parse_enum(&mut self, exported: bool) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Enum, "'enum'")?.span;
        let (name, _) = self.ident()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let (iname, _) = self.ident()?;
            let explicit = if self.check(&TokenKind::Assign) {
                self.bump();
                let tok = self.peek().clone();
                match tok.kind {
                    TokenKind::Number(n) => {
                        self.bump();
                        Some(n as i64)
                    }
                    _ => {
                        return Err(ParseError {
                            message: "Expected integer literal for enum member value".into(),
                            span: tok.span,
                        })
                    }
                }
            } else {
                None
            };
            items.push((iname, explicit));
            if self.check(&TokenKind::Comma) {
                self.bump();
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Stmt::Enum { name, items, exported, span: start })
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::If, "'if'")?.span;
        let cond = self.parse_expr()?;
        let then_branch = self.parse_block()?;
        let mut elseifs = Vec::new();
        while self.check(&TokenKind::Elseif) {
            self.bump();
            let c = self.parse_expr()?;
            let b = self.parse_block()?;
            elseifs.push((c, b));
        }
        let else_branch = if self.check(&TokenKind::Else) {
            self.bump();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If { cond, then_branch, elseifs, else_branch, span: start })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::While, "'while'")?.span;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, span: start })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::For, "'for'")?.span;
        let (name, _) = self.ident()?;
        if self.check(&TokenKind::In) {
            self.bump();
            let iter = self.parse_expr()?;
            let body = self.parse_block()?;
            return Ok(Stmt::ForIn { name, iter, body, span: start });
        }
        self.expect(TokenKind::Assign, "'=' in numeric for")?;
        let from = self.parse_expr()?;
        self.expect(TokenKind::Comma, "',' in numeric for")?;
        let to = self.parse_expr()?;
        let step = if self.check(&TokenKind::Comma) {
            self.bump();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(Stmt::ForNum { name, start: from, stop: to, step, body, span: start })
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Return, "'return'")?.span;
        let value = if self.check(&TokenKind::Semi) || self.check(&TokenKind::RBrace) || self.at_eof() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.eat_semi();
        Ok(Stmt::Return { value, span: start })
    }

    fn parse_pattern(&mut self) -> PResult<Pattern> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::Ident(name) if name == "_" => {
                self.bump();
                Ok(Pattern::Wildcard { span: tok.span })
            }
            TokenKind::Number(n) => {
                self.bump();
                Ok(Pattern::Literal { value: Literal::Number(OrderedFloat(*n)), span: tok.span })
            }
            TokenKind::String(s) => {
                self.bump();
                Ok(Pattern::Literal { value: Literal::String(s.clone()), span: tok.span })
            }
            TokenKind::True => {
                self.bump();
                Ok(Pattern::Literal { value: Literal::Boolean(true), span: tok.span })
            }
            TokenKind::False => {
                self.bump();
                Ok(Pattern::Literal { value: Literal::Boolean(false), span: tok.span })
            }
            TokenKind::Nil => {
                self.bump();
                Ok(Pattern::Literal { value: Literal::Nil, span: tok.span })
            }
            _ => {
                let expr = self.parse_expr()?;
                let span = expr.span().clone();
                Ok(Pattern::Expr { expr, span })
            }
        }
    }

    fn parse_case_body(&mut self) -> PResult<Vec<Stmt>> {
        if self.check(&TokenKind::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_match(&mut self) -> PResult<Stmt> {
        let start = self.expect(TokenKind::Match, "'match'")?.span;
        let subject = self.parse_expr()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut cases = Vec::new();
        while self.check(&TokenKind::Case) {
            let case_start = self.bump().span;
            let pattern = self.parse_pattern()?;
            self.expect(TokenKind::FatArrow, "'=>'")?;
            let body = self.parse_case_body()?;
            cases.push(MatchCase { pattern, body, span: case_start });
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Stmt::Match { subject, cases, span: start })
    }

    fn parse_assign_or_expr_stmt(&mut self) -> PResult<Stmt> {
        let expr = self.parse_expr()?;
        if self.check(&TokenKind::Assign) {
            self.bump();
            let value = self.parse_expr()?;
            self.eat_semi();
            let span = expr.span().cover(value.span());
            return Ok(Stmt::Assign { target: expr, value, span });
        }
        self.eat_semi();
        let span = expr.span().clone();
        Ok(Stmt::ExprStmt { expr, span })
    }

    // -- types ---------------------------------------------------------

    fn parse_type_expr(&mut self) -> PResult<TypeExpr> {
        let first = self.parse_type_atom()?;
        if self.check(&TokenKind::Pipe) {
            let mut acc = first;
            while self.check(&TokenKind::Pipe) {
                self.bump();
                let rhs = self.parse_type_atom()?;
                let span = acc.span().cover(rhs.span());
                acc = TypeExpr::Union { left: Box::new(acc), right: Box::new(rhs), span };
            }
            Ok(acc)
        } else {
            Ok(first)
        }
    }

    fn parse_type_atom(&mut self) -> PResult<TypeExpr> {
        let tok = self.peek().clone();
        match &tok.kind {
            TokenKind::LBrace => {
                self.bump();
                let mut fields = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let (fname, _) = self.ident()?;
                    self.expect(TokenKind::Colon, "':' in struct type")?;
                    let ty = self.parse_type_expr()?;
                    fields.push((fname, ty));
                    if self.check(&TokenKind::Comma) {
                        self.bump();
                    }
                }
                let end = self.expect(TokenKind::RBrace, "'}'")?.span;
                Ok(TypeExpr::Struct { fields, span: tok.span.cover(&end) })
            }
            TokenKind::LParen => {
                self.bump();
                let mut params = Vec::new();
                while !self.check(&TokenKind::RParen) {
                    params.push(self.parse_type_expr()?);
                    if self.check(&TokenKind::Comma) {
                        self.bump();
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                self.expect(TokenKind::Arrow, "'->' in function type")?;
                let ret = self.parse_type_expr()?;
                let span = tok.span.cover(ret.span());
                Ok(TypeExpr::Func { params, ret: Box::new(ret), span })
            }
            TokenKind::Ident(_) => {
                let (name, span) = self.ident()?;
                Ok(TypeExpr::Name { name, span })
            }
            TokenKind::Nil => {
                self.bump();
                Ok(TypeExpr::Name { name: "nil".to_string(), span: tok.span })
            }
            _ => Err(ParseError {
                message: format!("Expected type, found {:?}", tok.kind),
                span: tok.span,
            }),
        }
    }

    // -- expressions (precedence climbing) ------------------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            self.bump();
            let rhs = self.parse_and()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Binary { op: BinaryOp::Or, left: Box::new(lhs), right: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.check(&TokenKind::And) {
            self.bump();
            let rhs = self.parse_comparison()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Binary { op: BinaryOp::And, left: Box::new(lhs), right: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Binary { op, left: Box::new(lhs), right: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Binary { op, left: Box::new(lhs), right: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Binary { op, left: Box::new(lhs), right: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        let op = match &tok.kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Hash => Some(UnaryOp::Len),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            let span = tok.span.cover(operand.span());
            Ok(Expr::Unary { op, expr: Box::new(operand), span })
        } else {
            self.parse_power()
        }
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let lhs = self.parse_postfix()?;
        if self.check(&TokenKind::Caret) {
            self.bump();
            // right-associative
            let rhs = self.parse_unary()?;
            let span = lhs.span().cover(rhs.span());
            Ok(Expr::Binary { op: BinaryOp::Pow, left: Box::new(lhs), right: Box::new(rhs), span })
        } else {
            Ok(lhs)
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match &self.peek().kind {
                TokenKind::Dot => {
                    self.bump();
                    let (name, name_span) = self.ident()?;
                    let key = Box::new(Expr::String { value: name, span: name_span.clone() });
                    let span = expr.span().cover(&name_span);
                    expr = Expr::Index { base: Box::new(expr), key, dot: true, span };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let key = self.parse_expr()?;
                    let end = self.expect(TokenKind::RBracket, "']'")?.span;
                    let span = expr.span().cover(&end);
                    expr = Expr::Index { base: Box::new(expr), key: Box::new(key), dot: false, span };
                }
                TokenKind::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    while !self.check(&TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        if self.check(&TokenKind::Comma) {
                            self.bump();
                        }
                    }
                    let end = self.expect(TokenKind::RParen, "')'")?.span;
                    let span = expr.span().cover(&end);
                    expr = Expr::Call { callee: Box::new(expr), args, span };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(n) => {
                self.bump();
                Ok(Expr::Number { value: n, span: tok.span })
            }
            TokenKind::String(s) => {
                self.bump();
                Ok(Expr::String { value: s, span: tok.span })
            }
            TokenKind::True => {
                self.bump();
                Ok(Expr::Boolean { value: true, span: tok.span })
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Boolean { value: false, span: tok.span })
            }
            TokenKind::Nil => {
                self.bump();
                Ok(Expr::Nil { span: tok.span })
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(Expr::Ident { name, span: tok.span })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_table(),
            _ => Err(ParseError {
                message: format!("Unexpected token {:?}", tok.kind),
                span: tok.span,
            }),
        }
    }

    fn parse_table(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if let TokenKind::Ident(name) = self.peek().kind.clone() {
                if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Assign)) {
                    let key_span = self.bump().span;
                    self.bump(); // =
                    let value = self.parse_expr()?;
                    fields.push(TableField::Field {
                        key_is_ident: true,
                        key: Box::new(Expr::String { value: name, span: key_span }),
                        value: Box::new(value),
                    });
                    if self.check(&TokenKind::Comma) {
                        self.bump();
                    }
                    continue;
                }
            }
            if self.check(&TokenKind::LBracket) {
                self.bump();
                let key = self.parse_expr()?;
                self.expect(TokenKind::RBracket, "']'")?;
                self.expect(TokenKind::Assign, "'=' in computed table key")?;
                let value = self.parse_expr()?;
                fields.push(TableField::Field { key_is_ident: false, key: Box::new(key), value: Box::new(value) });
                if self.check(&TokenKind::Comma) {
                    self.bump();
                }
                continue;
            }
            let value = self.parse_expr()?;
            fields.push(TableField::ArrayField { value: Box::new(value) });
            if self.check(&TokenKind::Comma) {
                self.bump();
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        Ok(Expr::Table { fields, span: start.cover(&end) })
    }
}

pub fn parse(src: &str, file: Option<std::rc::Rc<str>>) -> PResult<Program> {
    let tokens = crate::lexer::Lexer::new(src, file.clone())
        .tokenize()
        .map_err(|e| ParseError { message: e.message, span: e.span })?;
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_let_and_return() {
        let prog = parse("fn f() { let x; let y = x; return y }", None).unwrap();
        assert_eq!(prog.body.len(), 1);
    }

    #[test]
    fn parses_match_with_wildcard() {
        let prog = parse(
            "fn f(x: number) { match x { case 1 => return 1 case _ => return 0 } }",
            None,
        )
        .unwrap();
        assert_eq!(prog.body.len(), 1);
    }

    #[test]
    fn parses_module_and_imports() {
        let prog = parse("module a\nimport b\nimport c.{x, y}\n", None).unwrap();
        assert_eq!(prog.module.as_ref().unwrap().0, "a");
        assert_eq!(prog.imports.len(), 2);
    }

    #[test]
    fn parses_union_type() {
        let prog = parse("let t: {x: number} | nil = nil;", None).unwrap();
        match &prog.body[0] {
            Stmt::Let { ty: Some(TypeExpr::Union { .. }), .. } => {}
            other => panic!("expected union type, got {other:?}"),
        }
    }
}
