//! P1: constant folding.
//!
//! Recursively folds `Binary`/`Unary` nodes whose operands are themselves
//! numeric or boolean literals. Never folds across an identifier — reading a
//! local's current value is the analyzer's/checker's job, not this pass's;
//! this pass only simplifies expressions that are already fully literal.

use transpiler_syntax::ast::{BinaryOp, Expr, MatchCase, Stmt, TableField, UnaryOp};

pub fn run(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().map(fold_stmt).collect()
}

fn fold_block(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts.into_iter().map(fold_stmt).collect()
}

fn fold_stmt(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::Let { name, ty, value, exported, span } => {
            Stmt::Let { name, ty, value: value.map(fold_expr), exported, span }
        }
        Stmt::Global { name, value, span } => Stmt::Global { name, value: fold_expr(value), span },
        Stmt::Assign { target, value, span } => {
            Stmt::Assign { target: fold_expr(target), value: fold_expr(value), span }
        }
        Stmt::ExprStmt { expr, span } => Stmt::ExprStmt { expr: fold_expr(expr), span },
        Stmt::Function { name, params, ret, body, exported, span } => {
            Stmt::Function { name, params, ret, body: fold_block(body), exported, span }
        }
        Stmt::Struct { .. } | Stmt::Enum { .. } => stmt,
        Stmt::If { cond, then_branch, elseifs, else_branch, span } => Stmt::If {
            cond: fold_expr(cond),
            then_branch: fold_block(then_branch),
            elseifs: elseifs.into_iter().map(|(c, b)| (fold_expr(c), fold_block(b))).collect(),
            else_branch: else_branch.map(fold_block),
            span,
        },
        Stmt::While { cond, body, span } => Stmt::While { cond: fold_expr(cond), body: fold_block(body), span },
        Stmt::ForNum { name, start, stop, step, body, span } => Stmt::ForNum {
            name,
            start: fold_expr(start),
            stop: fold_expr(stop),
            step: step.map(fold_expr),
            body: fold_block(body),
            span,
        },
        Stmt::ForIn { name, iter, body, span } => {
            Stmt::ForIn { name, iter: fold_expr(iter), body: fold_block(body), span }
        }
        Stmt::Return { value, span } => Stmt::Return { value: value.map(fold_expr), span },
        Stmt::Match { subject, cases, span } => Stmt::Match {
            subject: fold_expr(subject),
            cases: cases
                .into_iter()
                .map(|c| MatchCase { pattern: c.pattern, body: fold_block(c.body), span: c.span })
                .collect(),
            span,
        },
    }
}

fn fold_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Unary { op, expr, span } => {
            let folded = fold_expr(*expr);
            match (op, &folded) {
                (UnaryOp::Neg, Expr::Number { value, .. }) => Expr::Number { value: -value, span },
                (UnaryOp::Not, Expr::Boolean { value, .. }) => Expr::Boolean { value: !value, span },
                (UnaryOp::Not, Expr::Nil { .. }) => Expr::Boolean { value: true, span },
                _ => Expr::Unary { op, expr: Box::new(folded), span },
            }
        }
        Expr::Binary { op, left, right, span } => {
            let l = fold_expr(*left);
            let r = fold_expr(*right);
            fold_binary(op, l, r, span)
        }
        Expr::Call { callee, args, span } => {
            Expr::Call { callee: Box::new(fold_expr(*callee)), args: args.into_iter().map(fold_expr).collect(), span }
        }
        Expr::Index { base, key, dot, span } => {
            Expr::Index { base: Box::new(fold_expr(*base)), key: Box::new(fold_expr(*key)), dot, span }
        }
        Expr::Table { fields, span } => Expr::Table {
            fields: fields
                .into_iter()
                .map(|f| match f {
                    TableField::Field { key_is_ident, key, value } => {
                        TableField::Field { key_is_ident, key: Box::new(fold_expr(*key)), value: Box::new(fold_expr(*value)) }
                    }
                    TableField::ArrayField { value } => TableField::ArrayField { value: Box::new(fold_expr(*value)) },
                })
                .collect(),
            span,
        },
        other => other,
    }
}

fn fold_binary(op: BinaryOp, l: Expr, r: Expr, span: transpiler_syntax::Span) -> Expr {
    if let (Expr::Number { value: lv, .. }, Expr::Number { value: rv, .. }) = (&l, &r) {
        let (lv, rv) = (*lv, *rv);
        return match op {
            BinaryOp::Add => Expr::Number { value: lv + rv, span },
            BinaryOp::Sub => Expr::Number { value: lv - rv, span },
            BinaryOp::Mul => Expr::Number { value: lv * rv, span },
            BinaryOp::Div => Expr::Number { value: lv / rv, span },
            BinaryOp::Mod => Expr::Number { value: lv % rv, span },
            BinaryOp::Pow => Expr::Number { value: lv.powf(rv), span },
            BinaryOp::Eq => Expr::Boolean { value: lv == rv, span },
            BinaryOp::NotEq => Expr::Boolean { value: lv != rv, span },
            BinaryOp::Lt => Expr::Boolean { value: lv < rv, span },
            BinaryOp::LtEq => Expr::Boolean { value: lv <= rv, span },
            BinaryOp::Gt => Expr::Boolean { value: lv > rv, span },
            BinaryOp::GtEq => Expr::Boolean { value: lv >= rv, span },
            BinaryOp::And | BinaryOp::Or => {
                Expr::Binary { op, left: Box::new(l), right: Box::new(r), span }
            }
        };
    }
    Expr::Binary { op, left: Box::new(l), right: Box::new(r), span }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    fn fold_src(src: &str) -> Vec<Stmt> {
        let program = parse(src, None).expect("parse");
        run(program.body)
    }

    #[test]
    fn folds_numeric_arithmetic() {
        let stmts = fold_src("let x = 1 + 2\n");
        match &stmts[0] {
            Stmt::Let { value: Some(Expr::Number { value, .. }), .. } => assert_eq!(*value, 3.0),
            other => panic!("expected folded number, got {other:?}"),
        }
    }

    #[test]
    fn folds_comparison_to_boolean() {
        let stmts = fold_src("let x = 1 < 2\n");
        match &stmts[0] {
            Stmt::Let { value: Some(Expr::Boolean { value, .. }), .. } => assert!(*value),
            other => panic!("expected folded boolean, got {other:?}"),
        }
    }

    #[test]
    fn does_not_fold_across_identifiers() {
        let stmts = fold_src("let a = 1\nlet x = a + 2\n");
        match &stmts[1] {
            Stmt::Let { value: Some(Expr::Binary { .. }), .. } => {}
            other => panic!("expected unfolded binary, got {other:?}"),
        }
    }
}
