//! P4: global aliasing.
//!
//! For the fixed set of known-safe built-in tables `{math, string, table,
//! coroutine, utf8, os}`, a `G.field` read repeated two or more times at the
//! top level of a block is hoisted into `let field = G.field` at the front
//! of the block, and every top-level occurrence is rewritten to the bare
//! name. Restricted to known-safe built-ins (rather than every global) since
//! an arbitrary global may be reassigned by code this pass never sees.

use indexmap::IndexMap;
use std::collections::HashSet;

use transpiler_syntax::ast::{Expr, MatchCase, Stmt};
use transpiler_syntax::Span;

use super::state::PassState;

const SAFE_GLOBALS: &[&str] = &["math", "string", "table", "coroutine", "utf8", "os"];

pub fn run(stmts: Vec<Stmt>, state: &mut PassState) -> Vec<Stmt> {
    alias_block(stmts, state)
}

fn alias_block(stmts: Vec<Stmt>, state: &mut PassState) -> Vec<Stmt> {
    let mut counts: IndexMap<(String, String), usize> = IndexMap::new();
    for stmt in &stmts {
        for_each_header_expr(stmt, &mut |e| count_global_reads(e, &mut counts));
    }

    let existing_names: HashSet<String> = collect_existing_names(&stmts);
    let mut used_names = existing_names.clone();
    let mut alias_of: IndexMap<(String, String), String> = IndexMap::new();
    for ((global, field), count) in &counts {
        if *count < 2 {
            continue;
        }
        let name = if used_names.contains(field) {
            loop {
                let candidate = state.fresh_alias();
                if !used_names.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            field.clone()
        };
        used_names.insert(name.clone());
        alias_of.insert((global.clone(), field.clone()), name);
    }

    let mut out: Vec<Stmt> = stmts
        .into_iter()
        .map(|stmt| {
            let mut stmt = stmt;
            for_each_header_expr_mut(&mut stmt, &mut |e| rewrite_global_reads(e, &alias_of));
            recurse_nested(stmt, state)
        })
        .collect();

    for ((global, field), name) in alias_of.into_iter().rev() {
        let span = out.first().map(|s| s.span().clone()).unwrap_or_else(Span::unknown);
        let value = Expr::Index {
            base: Box::new(Expr::Ident { name: global, span: span.clone() }),
            key: Box::new(Expr::String { value: field, span: span.clone() }),
            dot: true,
            span: span.clone(),
        };
        out.insert(0, Stmt::Let { name, ty: None, value: Some(value), exported: false, span });
    }
    out
}

fn recurse_nested(stmt: Stmt, state: &mut PassState) -> Stmt {
    match stmt {
        Stmt::If { cond, then_branch, elseifs, else_branch, span } => Stmt::If {
            cond,
            then_branch: alias_block(then_branch, state),
            elseifs: elseifs.into_iter().map(|(c, b)| (c, alias_block(b, state))).collect(),
            else_branch: else_branch.map(|b| alias_block(b, state)),
            span,
        },
        Stmt::While { cond, body, span } => Stmt::While { cond, body: alias_block(body, state), span },
        Stmt::ForNum { name, start, stop, step, body, span } => {
            Stmt::ForNum { name, start, stop, step, body: alias_block(body, state), span }
        }
        Stmt::ForIn { name, iter, body, span } => Stmt::ForIn { name, iter, body: alias_block(body, state), span },
        Stmt::Function { name, params, ret, body, exported, span } => {
            Stmt::Function { name, params, ret, body: alias_block(body, state), exported, span }
        }
        Stmt::Match { subject, cases, span } => Stmt::Match {
            subject,
            cases: cases
                .into_iter()
                .map(|c| MatchCase { pattern: c.pattern, body: alias_block(c.body, state), span: c.span })
                .collect(),
            span,
        },
        other => other,
    }
}

fn for_each_header_expr(stmt: &Stmt, f: &mut impl FnMut(&Expr)) {
    match stmt {
        Stmt::Let { value: Some(v), .. } => f(v),
        Stmt::Global { value, .. } => f(value),
        Stmt::Assign { target, value, .. } => {
            f(target);
            f(value);
        }
        Stmt::ExprStmt { expr, .. } => f(expr),
        Stmt::If { cond, elseifs, .. } => {
            f(cond);
            for (c, _) in elseifs {
                f(c);
            }
        }
        Stmt::While { cond, .. } => f(cond),
        Stmt::ForNum { start, stop, step, .. } => {
            f(start);
            f(stop);
            if let Some(s) = step {
                f(s);
            }
        }
        Stmt::ForIn { iter, .. } => f(iter),
        Stmt::Return { value: Some(v), .. } => f(v),
        Stmt::Match { subject, .. } => f(subject),
        _ => {}
    }
}

fn for_each_header_expr_mut(stmt: &mut Stmt, f: &mut impl FnMut(&mut Expr)) {
    match stmt {
        Stmt::Let { value: Some(v), .. } => f(v),
        Stmt::Global { value, .. } => f(value),
        Stmt::Assign { target, value, .. } => {
            f(target);
            f(value);
        }
        Stmt::ExprStmt { expr, .. } => f(expr),
        Stmt::If { cond, elseifs, .. } => {
            f(cond);
            for (c, _) in elseifs.iter_mut() {
                f(c);
            }
        }
        Stmt::While { cond, .. } => f(cond),
        Stmt::ForNum { start, stop, step, .. } => {
            f(start);
            f(stop);
            if let Some(s) = step {
                f(s);
            }
        }
        Stmt::ForIn { iter, .. } => f(iter),
        Stmt::Return { value: Some(v), .. } => f(v),
        Stmt::Match { subject, .. } => f(subject),
        _ => {}
    }
}

fn count_global_reads(expr: &Expr, counts: &mut IndexMap<(String, String), usize>) {
    if let Expr::Index { base, key, dot: true, .. } = expr {
        if let (Expr::Ident { name: global, .. }, Expr::String { value: field, .. }) = (&**base, &**key) {
            if SAFE_GLOBALS.contains(&global.as_str()) {
                *counts.entry((global.clone(), field.clone())).or_insert(0) += 1;
            }
        }
    }
    walk_children(expr, &mut |child| count_global_reads(child, counts));
}

fn rewrite_global_reads(expr: &mut Expr, alias_of: &IndexMap<(String, String), String>) {
    if let Expr::Index { base, key, dot: true, span } = expr {
        if let (Expr::Ident { name: global, .. }, Expr::String { value: field, .. }) = (&**base, &**key) {
            if let Some(name) = alias_of.get(&(global.clone(), field.clone())) {
                *expr = Expr::Ident { name: name.clone(), span: span.clone() };
                return;
            }
        }
    }
    walk_children_mut(expr, &mut |child| rewrite_global_reads(child, alias_of));
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
                    transpiler_syntax::ast::TableField::Field { key_is_ident, key, value } => {
                        if !*key_is_ident {
                            f(key);
                        }
                        f(value);
                    }
                    transpiler_syntax::ast::TableField::ArrayField { value } => f(value),
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
                    transpiler_syntax::ast::TableField::Field { key_is_ident, key, value } => {
                        if !*key_is_ident {
                            f(key);
                        }
                        f(value);
                    }
                    transpiler_syntax::ast::TableField::ArrayField { value } => f(value),
                }
            }
        }
        Expr::Ident { .. } | Expr::Number { .. } | Expr::String { .. } | Expr::Boolean { .. } | Expr::Nil { .. } => {}
    }
}

fn collect_existing_names(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, .. } | Stmt::Function { name, .. } | Stmt::Struct { name, .. } | Stmt::Enum { name, .. } => {
                names.insert(name.clone());
            }
            _ => {}
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    #[test]
    fn aliases_repeated_builtin_field_read() {
        let program =
            parse("fn f(x: number) {\n  let a = math.floor(x) + math.floor(x)\n  return a\n}\n", None).expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(matches!(&body[0], Stmt::Let { name, .. } if name == "floor"));
    }

    #[test]
    fn does_not_alias_non_builtin_global() {
        let program = parse("fn f() {\n  let a = other.x + other.x\n  return a\n}\n", None).expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(!body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name == "x")));
    }
}
