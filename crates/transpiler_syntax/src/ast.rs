//! Abstract syntax tree.
//!
//! Every category (statement, expression, pattern, type-expression) is a
//! tagged sum, not a class hierarchy; phases dispatch on the tag via `match`.
//! Trees are owned (`Vec`/`Box`), not arena-allocated — the optimizer
//! (`transpiler_core::optimize`) performs genuine in-place structural
//! rewriting (inserting hoisted bindings, deleting statements, substituting
//! expressions) which is far more direct against an owned tree than against
//! an arena-borrowed, lifetime-generic one.

use crate::span::Span;

#[derive(Debug, Clone)]
pub struct Program {
    pub module: Option<(String, Span)>,
    pub imports: Vec<Import>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum ImportKind {
    /// `import a.b.c` or `import a.b.c as alias`
    Whole { alias: Option<String> },
    /// `import a.b.{x, y, z}`
    Named { names: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Import {
    pub module_path: String,
    pub kind: ImportKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        name: String,
        ty: Option<TypeExpr>,
        value: Option<Expr>,
        exported: bool,
        span: Span,
    },
    Global {
        name: String,
        value: Expr,
        span: Span,
    },
    Assign {
        target: Expr,
        value: Expr,
        span: Span,
    },
    ExprStmt {
        expr: Expr,
        span: Span,
    },
    Function {
        name: String,
        params: Vec<Param>,
        ret: Option<TypeExpr>,
        body: Vec<Stmt>,
        exported: bool,
        span: Span,
    },
    Struct {
        name: String,
        fields: Vec<(String, TypeExpr)>,
        exported: bool,
        span: Span,
    },
    Enum {
        name: String,
        items: Vec<(String, Option<i64>)>,
        exported: bool,
        span: Span,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        elseifs: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
        span: Span,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    ForNum {
        name: String,
        start: Expr,
        stop: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
        span: Span,
    },
    ForIn {
        name: String,
        iter: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Match {
        subject: Expr,
        cases: Vec<MatchCase>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Let { span, .. }
            | Stmt::Global { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::ExprStmt { span, .. }
            | Stmt::Function { span, .. }
            | Stmt::Struct { span, .. }
            | Stmt::Enum { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::ForNum { span, .. }
            | Stmt::ForIn { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Match { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard { span: Span },
    Literal { value: Literal, span: Span },
    /// `case E.A`, or any other bare expression pattern (enum member access).
    Expr { expr: Expr, span: Span },
}

impl Pattern {
    pub fn span(&self) -> &Span {
        match self {
            Pattern::Wildcard { span } | Pattern::Literal { span, .. } | Pattern::Expr { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(OrderedFloat),
    String(String),
    Boolean(bool),
    Nil,
}

/// `f64` wrapper with a total order, so literal patterns can be compared for
/// duplicate-detection without relying on `PartialEq` alone over `NaN`.
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident {
        name: String,
        span: Span,
    },
    Number {
        value: f64,
        span: Span,
    },
    String {
        value: String,
        span: Span,
    },
    Boolean {
        value: bool,
        span: Span,
    },
    Nil {
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Index {
        base: Box<Expr>,
        key: Box<Expr>,
        dot: bool,
        span: Span,
    },
    Table {
        fields: Vec<TableField>,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum TableField {
    Field { key_is_ident: bool, key: Box<Expr>, value: Box<Expr> },
    ArrayField { value: Box<Expr> },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Ident { span, .. }
            | Expr::Number { span, .. }
            | Expr::String { span, .. }
            | Expr::Boolean { span, .. }
            | Expr::Nil { span }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Table { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Name { name: String, span: Span },
    Struct { fields: Vec<(String, TypeExpr)>, span: Span },
    Union { left: Box<TypeExpr>, right: Box<TypeExpr>, span: Span },
    Func { params: Vec<TypeExpr>, ret: Box<TypeExpr>, span: Span },
}

impl TypeExpr {
    pub fn span(&self) -> &Span {
        match self {
            TypeExpr::Name { span, .. }
            | TypeExpr::Struct { span, .. }
            | TypeExpr::Union { span, .. }
            | TypeExpr::Func { span, .. } => span,
        }
    }
}
