//! P6: single-use temp elimination.
//!
//! In each block, a non-exported `let x = e` where `e` is a "simple"
//! expression (identifier or literal) and `x` is referenced exactly once
//! elsewhere in the block is deleted, substituting `e` at that one use site.
//! Runs last so it can clean up the `let x = _hoisted0` shells P2 leaves
//! behind once `x` itself turns out to be single-use.

use transpiler_syntax::ast::{Expr, MatchCase, Stmt, TableField};

pub fn run(stmts: Vec<Stmt>) -> Vec<Stmt> {
    temps_block(stmts)
}

fn temps_block(mut stmts: Vec<Stmt>) -> Vec<Stmt> {
    loop {
        let mut target: Option<(usize, String, Expr)> = None;
        for (i, stmt) in stmts.iter().enumerate() {
            if let Stmt::Let { name, value: Some(v), exported: false, .. } = stmt {
                if is_simple(v) && count_ident_refs(&stmts, name) == 1 {
                    target = Some((i, name.clone(), v.clone()));
                    break;
                }
            }
        }
        match target {
            Some((i, name, value)) => {
                stmts.remove(i);
                subst_stmts(&mut stmts, &name, &value);
            }
            None => break,
        }
    }
    stmts.into_iter().map(recurse_nested).collect()
}

fn recurse_nested(stmt: Stmt) -> Stmt {
    match stmt {
        Stmt::If { cond, then_branch, elseifs, else_branch, span } => Stmt::If {
            cond,
            then_branch: temps_block(then_branch),
            elseifs: elseifs.into_iter().map(|(c, b)| (c, temps_block(b))).collect(),
            else_branch: else_branch.map(temps_block),
            span,
        },
        Stmt::While { cond, body, span } => Stmt::While { cond, body: temps_block(body), span },
        Stmt::ForNum { name, start, stop, step, body, span } => {
            Stmt::ForNum { name, start, stop, step, body: temps_block(body), span }
        }
        Stmt::ForIn { name, iter, body, span } => Stmt::ForIn { name, iter, body: temps_block(body), span },
        Stmt::Function { name, params, ret, body, exported, span } => {
            Stmt::Function { name, params, ret, body: temps_block(body), exported, span }
        }
        Stmt::Match { subject, cases, span } => Stmt::Match {
            subject,
            cases: cases
                .into_iter()
                .map(|c| MatchCase { pattern: c.pattern, body: temps_block(c.body), span: c.span })
                .collect(),
            span,
        },
        other => other,
    }
}

fn is_simple(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident { .. } | Expr::Number { .. } | Expr::String { .. } | Expr::Boolean { .. } | Expr::Nil { .. }
    )
}

fn count_ident_refs(stmts: &[Stmt], name: &str) -> usize {
    let mut count = 0;
    visit_stmts(stmts, &mut |e| count_expr(e, name, &mut count));
    count
}

fn count_expr(expr: &Expr, name: &str, count: &mut usize) {
    if let Expr::Ident { name: n, .. } = expr {
        if n == name {
            *count += 1;
        }
    }
    walk_children(expr, &mut |child| count_expr(child, name, count));
}

fn subst_stmts(stmts: &mut [Stmt], name: &str, value: &Expr) {
    visit_stmts_mut(stmts, &mut |e| subst_expr(e, name, value));
}

fn subst_expr(expr: &mut Expr, name: &str, value: &Expr) {
    if let Expr::Ident { name: n, .. } = expr {
        if n == name {
            *expr = value.clone();
            return;
        }
    }
    walk_children_mut(expr, &mut |child| subst_expr(child, name, value));
}

/// Visits every expression reachable from `stmts`, including those nested in
/// `if`/`while`/`for`/`match`/`fn` bodies — unlike the block-local field
/// passes, temp elimination needs to see single uses wherever they occur in
/// the enclosing block.
fn visit_stmts(stmts: &[Stmt], f: &mut impl FnMut(&Expr)) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { value: Some(v), .. } => f(v),
            Stmt::Let { value: None, .. } => {}
            Stmt::Global { value, .. } => f(value),
            Stmt::Assign { target, value, .. } => {
                f(target);
                f(value);
            }
            Stmt::ExprStmt { expr, .. } => f(expr),
            Stmt::If { cond, then_branch, elseifs, else_branch, .. } => {
                f(cond);
                visit_stmts(then_branch, f);
                for (c, b) in elseifs {
                    f(c);
                    visit_stmts(b, f);
                }
                if let Some(b) = else_branch {
                    visit_stmts(b, f);
                }
            }
            Stmt::While { cond, body, .. } => {
                f(cond);
                visit_stmts(body, f);
            }
            Stmt::ForNum { start, stop, step, body, .. } => {
                f(start);
                f(stop);
                if let Some(s) = step {
                    f(s);
                }
                visit_stmts(body, f);
            }
            Stmt::ForIn { iter, body, .. } => {
                f(iter);
                visit_stmts(body, f);
            }
            Stmt::Return { value: Some(v), .. } => f(v),
            Stmt::Return { value: None, .. } => {}
            Stmt::Function { body, .. } => visit_stmts(body, f),
            Stmt::Match { subject, cases, .. } => {
                f(subject);
                for case in cases {
                    visit_stmts(&case.body, f);
                }
            }
            Stmt::Struct { .. } | Stmt::Enum { .. } => {}
        }
    }
}

fn visit_stmts_mut(stmts: &mut [Stmt], f: &mut impl FnMut(&mut Expr)) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { value: Some(v), .. } => f(v),
            Stmt::Global { value, .. } => f(value),
            Stmt::Assign { target, value, .. } => {
                f(target);
                f(value);
            }
            Stmt::ExprStmt { expr, .. } => f(expr),
            Stmt::If { cond, then_branch, elseifs, else_branch, .. } => {
                f(cond);
                visit_stmts_mut(then_branch, f);
                for (c, b) in elseifs.iter_mut() {
                    f(c);
                    visit_stmts_mut(b, f);
                }
                if let Some(b) = else_branch {
                    visit_stmts_mut(b, f);
                }
            }
            Stmt::While { cond, body, .. } => {
                f(cond);
                visit_stmts_mut(body, f);
            }
            Stmt::ForNum { start, stop, step, body, .. } => {
                f(start);
                f(stop);
                if let Some(s) = step {
                    f(s);
                }
                visit_stmts_mut(body, f);
            }
            Stmt::ForIn { iter, body, .. } => {
                f(iter);
                visit_stmts_mut(body, f);
            }
            Stmt::Return { value: Some(v), .. } => f(v),
            Stmt::Function { body, .. } => visit_stmts_mut(body, f),
            Stmt::Match { subject, cases, .. } => {
                f(subject);
                for case in cases.iter_mut() {
                    visit_stmts_mut(&mut case.body, f);
                }
            }
            _ => {}
        }
    }
}

fn walk_children(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    match expr {
        Expr::Unary { expr, .. } => f(expr),
        Expr::Binary { left, right, .. } => {
            f(left);
            f(right);
        }
        Expr::Call { callee, args, .. } => {
            f(callee);
            for a in args {
                f(a);
            }
        }
        Expr::Index { base, key, dot, .. } => {
            f(base);
            if !*dot {
                f(key);
            }
        }
        Expr::Table { fields, .. } => {
            for field in fields {
                match field {
                    TableField::Field { key_is_ident, key, value } => {
                        if !*key_is_ident {
                            f(key);
                        }
                        f(value);
                    }
                    TableField::ArrayField { value } => f(value),
                }
            }
        }
        Expr::Ident { .. } | Expr::Number { .. } | Expr::String { .. } | Expr::Boolean { .. } | Expr::Nil { .. } => {}
    }
}

fn walk_children_mut(expr: &mut Expr, f: &mut impl FnMut(&mut Expr)) {
    match expr {
        Expr::Unary { expr, .. } => f(expr),
        Expr::Binary { left, right, .. } => {
            f(left);
            f(right);
        }
        Expr::Call { callee, args, .. } => {
            f(callee);
            for a in args {
                f(a);
            }
        }
        Expr::Index { base, key, dot, .. } => {
            f(base);
            if !*dot {
                f(key);
            }
        }
        Expr::Table { fields, .. } => {
            for field in fields {
                match field {
                    TableField::Field { key_is_ident, key, value } => {
                        if !*key_is_ident {
                            f(key);
                        }
                        f(value);
                    }
                    TableField::ArrayField { value } => f(value),
                }
            }
        }
        Expr::Ident { .. } | Expr::Number { .. } | Expr::String { .. } | Expr::Boolean { .. } | Expr::Nil { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    #[test]
    fn eliminates_single_use_temp() {
        let program = parse("fn f() {\n  let x = 5\n  let y = x + 1\n  return y\n}\n", None).expect("parse");
        let stmts = run(program.body);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(!body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name == "x")));
        match &body[0] {
            Stmt::Let { name, value: Some(Expr::Binary { left, .. }), .. } => {
                assert_eq!(name, "y");
                assert!(matches!(**left, Expr::Number { value, .. } if value == 5.0));
            }
            other => panic!("expected substituted binary, got {other:?}"),
        }
    }

    #[test]
    fn keeps_multi_use_let() {
        let program = parse("fn f() {\n  let x = 5\n  let y = x + x\n  return y\n}\n", None).expect("parse");
        let stmts = run(program.body);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name == "x")));
    }

    #[test]
    fn chains_hoist_and_temp_elimination() {
        let src = "fn f(n: number) {\n  let a = 2\n  let b = 3\n  for i = 1, n {\n    let x = a * b\n    let y = x + 1\n  }\n}\n";
        let program = parse(src, None).expect("parse");
        let mut state = crate::optimize::PassState::new();
        let stmts = super::super::hoist::run(program.body, &mut state);
        let stmts = run(stmts);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        // `a` and `b` are themselves single-use simple lets (each feeds only
        // the hoisted product once), so this pass eliminates them too,
        // leaving just the hoisted binding and the loop.
        assert!(!body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name == "a" || name == "b")));
        let Stmt::ForNum { body: loop_body, .. } = body.last().expect("loop present") else {
            panic!("expected for loop")
        };
        assert!(!loop_body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name == "x")));
        match &loop_body[0] {
            Stmt::Let { name, value: Some(Expr::Binary { left, .. }), .. } => {
                assert_eq!(name, "y");
                assert!(matches!(**left, Expr::Ident { ref name, .. } if name == "_hoisted0"));
            }
            other => panic!("expected rewritten y, got {other:?}"),
        }
    }
}
