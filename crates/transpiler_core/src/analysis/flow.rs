//! Control-flow summaries and constant truthiness evaluation.
//!
//! `FlowSummary` answers "does every path through this statement return,
//! and with what shape" — the basis for function return-consistency
//! checking. `const_truthy` answers "is this condition constantly
//! true/false" over a restricted constant sub-language, used for
//! dead-code and unreachable-branch detection.

use transpiler_syntax::ast::{BinaryOp, Expr, Literal, UnaryOp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowSummary {
    pub always_returns: bool,
    pub any_with: bool,
    pub any_without: bool,
}

impl FlowSummary {
    pub fn returning(has_value: bool) -> Self {
        Self { always_returns: true, any_with: has_value, any_without: !has_value }
    }

    pub fn straight_line() -> Self {
        Self::default()
    }

    /// Sequential composition: once a prior statement always returns, later
    /// statements are unreachable and do not affect the combined summary.
    pub fn then(self, next: FlowSummary) -> FlowSummary {
        if self.always_returns {
            self
        } else {
            FlowSummary {
                always_returns: next.always_returns,
                any_with: self.any_with || next.any_with,
                any_without: self.any_without || next.any_without,
            }
        }
    }

    /// Combines parallel branches (if/elseif/else arms, match cases):
    /// `always_returns` only if every arm always returns (and there is an
    /// exhaustive set of arms — callers must check that separately for
    /// `if` without `else`); `any_with`/`any_without` are the OR across arms.
    pub fn join_all(branches: &[FlowSummary], exhaustive: bool) -> FlowSummary {
        let always_returns = exhaustive && branches.iter().all(|b| b.always_returns);
        let any_with = branches.iter().any(|b| b.any_with);
        let any_without = branches.iter().any(|b| b.any_without);
        FlowSummary { always_returns, any_with, any_without }
    }
}

/// Evaluates a condition over the constant sub-language: literals, unary
/// `not`/`-`, arithmetic on numeric literals, comparisons on numbers, and
/// short-circuit `and`/`or`. Returns `None` when the expression is not
/// constant (identifiers, calls, indexing, tables, strings in arithmetic).
pub fn const_truthy(expr: &Expr) -> Option<bool> {
    const_value(expr).map(|v| v.truthy())
}

#[derive(Debug, Clone, Copy)]
enum ConstValue {
    Number(f64),
    Boolean(bool),
    Nil,
}

impl ConstValue {
    fn truthy(self) -> bool {
        match self {
            ConstValue::Nil => false,
            ConstValue::Boolean(b) => b,
            ConstValue::Number(_) => true,
        }
    }

    fn as_number(self) -> Option<f64> {
        match self {
            ConstValue::Number(n) => Some(n),
            _ => None,
        }
    }
}

fn const_value(expr: &Expr) -> Option<ConstValue> {
    match expr {
        Expr::Number { value, .. } => Some(ConstValue::Number(*value)),
        Expr::Boolean { value, .. } => Some(ConstValue::Boolean(*value)),
        Expr::Nil { .. } => Some(ConstValue::Nil),
        Expr::Unary { op, expr, .. } => {
            let v = const_value(expr)?;
            match op {
                UnaryOp::Not => Some(ConstValue::Boolean(!v.truthy())),
                UnaryOp::Neg => v.as_number().map(|n| ConstValue::Number(-n)),
                UnaryOp::Len => None,
            }
        }
        Expr::Binary { op, left, right, .. } => {
            if matches!(op, BinaryOp::And | BinaryOp::Or) {
                let l = const_value(left)?;
                return match op {
                    BinaryOp::And => {
                        if !l.truthy() {
                            Some(l)
                        } else {
                            const_value(right)
                        }
                    }
                    BinaryOp::Or => {
                        if l.truthy() {
                            Some(l)
                        } else {
                            const_value(right)
                        }
                    }
                    _ => unreachable!(),
                };
            }
            let l = const_value(left)?.as_number()?;
            let r = const_value(right)?.as_number()?;
            match op {
                BinaryOp::Add => Some(ConstValue::Number(l + r)),
                BinaryOp::Sub => Some(ConstValue::Number(l - r)),
                BinaryOp::Mul => Some(ConstValue::Number(l * r)),
                BinaryOp::Div => Some(ConstValue::Number(l / r)),
                BinaryOp::Mod => Some(ConstValue::Number(l % r)),
                BinaryOp::Pow => Some(ConstValue::Number(l.powf(r))),
                BinaryOp::Eq => Some(ConstValue::Boolean(l == r)),
                BinaryOp::NotEq => Some(ConstValue::Boolean(l != r)),
                BinaryOp::Lt => Some(ConstValue::Boolean(l < r)),
                BinaryOp::LtEq => Some(ConstValue::Boolean(l <= r)),
                BinaryOp::Gt => Some(ConstValue::Boolean(l > r)),
                BinaryOp::GtEq => Some(ConstValue::Boolean(l >= r)),
                BinaryOp::And | BinaryOp::Or => unreachable!(),
            }
        }
        _ => None,
    }
}

/// Recognizes the literal-as-pattern forms `x == nil` and `x ~= nil` and
/// bare-identifier truthiness tests, returning the narrowed identifier name
/// and whether the positive branch implies non-nil.
pub enum NarrowForm<'a> {
    /// `name == nil`: positive branch (cond true) implies nil.
    EqNil(&'a str),
    /// `name ~= nil`: positive branch implies non-nil.
    NotEqNil(&'a str),
    /// bare `name`: positive branch implies non-nil (truthiness test).
    Truthy(&'a str),
}

pub fn narrow_form(expr: &Expr) -> Option<NarrowForm<'_>> {
    match expr {
        Expr::Ident { name, .. } => Some(NarrowForm::Truthy(name)),
        Expr::Binary { op, left, right, .. } => {
            let (ident, other) = match (&**left, &**right) {
                (Expr::Ident { name, .. }, rhs) => (name.as_str(), rhs),
                (lhs, Expr::Ident { name, .. }) => (name.as_str(), lhs),
                _ => return None,
            };
            if !matches!(other, Expr::Nil { .. }) {
                return None;
            }
            match op {
                BinaryOp::Eq => Some(NarrowForm::EqNil(ident)),
                BinaryOp::NotEq => Some(NarrowForm::NotEqNil(ident)),
                _ => None,
            }
        }
        _ => None,
    }
}
