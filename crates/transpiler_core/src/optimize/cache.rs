//! P3: local field caching.
//!
//! Within a block, a `base.field` read repeated two or more times — where
//! `base` is never reassigned and none of its fields are ever written in the
//! block — is hoisted into a single `let <base>_<field> = base.field` right
//! after `base`'s own declaration (or at the top of the block, if `base` is
//! inherited from an outer scope), and every occurrence is rewritten to read
//! the new local instead.
//!
//! Counting and mutation detection only look at the statements directly in
//! a block; nested bodies (`if`/`while`/`for`/`match`/`fn` bodies) are each
//! their own block and recurse independently, so a field read that only
//! repeats inside a deeply nested branch gets its own local there.

use indexmap::IndexMap;
use std::collections::HashSet;

use transpiler_syntax::ast::{Expr, MatchCase, Stmt};
use transpiler_syntax::Span;

use super::state::PassState;

pub fn run(stmts: Vec<Stmt>, state: &mut PassState) -> Vec<Stmt> {
    cache_block(stmts, state)
}

fn cache_block(stmts: Vec<Stmt>, state: &mut PassState) -> Vec<Stmt> {
    let mutated = collect_mutated_bases(&stmts);
    let mut counts: IndexMap<(String, String), usize> = IndexMap::new();
    for stmt in &stmts {
        for_each_header_expr(stmt, &mut |e| count_field_reads(e, &mut counts));
    }

    let existing_names: HashSet<String> = collect_existing_names(&stmts);
    let mut cache_of: IndexMap<(String, String), String> = IndexMap::new();
    let mut used_names = existing_names.clone();
    for ((base, field), count) in &counts {
        if *count < 2 || mutated.contains(base) {
            continue;
        }
        let preferred = format!("{base}_{field}");
        let name = if used_names.contains(&preferred) {
            loop {
                let candidate = state.fresh_cache();
                if !used_names.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            preferred
        };
        used_names.insert(name.clone());
        cache_of.insert((base.clone(), field.clone()), name);
    }

    let mut out: Vec<Stmt> = stmts
        .into_iter()
        .map(|stmt| {
            let mut stmt = stmt;
            for_each_header_expr_mut(&mut stmt, &mut |e| rewrite_field_reads(e, &cache_of));
            recurse_nested(stmt, state)
        })
        .collect();

    for ((base, field), name) in cache_of.into_iter().rev() {
        let decl_index = out.iter().position(|s| matches!(s, Stmt::Let { name: n, .. } if n == &base));
        let insert_at = decl_index.map(|i| i + 1).unwrap_or(0);
        let span = out.get(insert_at.saturating_sub(1)).map(|s| s.span().clone()).unwrap_or_else(Span::unknown);
        let value = Expr::Index {
            base: Box::new(Expr::Ident { name: base, span: span.clone() }),
            key: Box::new(Expr::String { value: field, span: span.clone() }),
            dot: true,
            span: span.clone(),
        };
        out.insert(insert_at, Stmt::Let { name, ty: None, value: Some(value), exported: false, span });
    }
    out
}

fn recurse_nested(stmt: Stmt, state: &mut PassState) -> Stmt {
    match stmt {
        Stmt::If { cond, then_branch, elseifs, else_branch, span } => Stmt::If {
            cond,
            then_branch: cache_block(then_branch, state),
            elseifs: elseifs.into_iter().map(|(c, b)| (c, cache_block(b, state))).collect(),
            else_branch: else_branch.map(|b| cache_block(b, state)),
            span,
        },
        Stmt::While { cond, body, span } => Stmt::While { cond, body: cache_block(body, state), span },
        Stmt::ForNum { name, start, stop, step, body, span } => {
            Stmt::ForNum { name, start, stop, step, body: cache_block(body, state), span }
        }
        Stmt::ForIn { name, iter, body, span } => Stmt::ForIn { name, iter, body: cache_block(body, state), span },
        Stmt::Function { name, params, ret, body, exported, span } => {
            Stmt::Function { name, params, ret, body: cache_block(body, state), exported, span }
        }
        Stmt::Match { subject, cases, span } => Stmt::Match {
            subject,
            cases: cases
                .into_iter()
                .map(|c| MatchCase { pattern: c.pattern, body: cache_block(c.body, state), span: c.span })
                .collect(),
            span,
        },
        other => other,
    }
}

/// Runs `f` over the expressions that live directly in `stmt` (its "header"
/// — condition, initializer, call target, etc.) without reaching into any
/// nested statement body.
fn for_each_header_expr(stmt: &Stmt, f: &mut impl FnMut(&Expr)) {
    match stmt {
        Stmt::Let { value: Some(v), .. } => f(v),
        Stmt::Let { value: None, .. } => {}
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
        Stmt::Return { value: None, .. } => {}
        Stmt::Match { subject, .. } => f(subject),
        Stmt::Function { .. } | Stmt::Struct { .. } | Stmt::Enum { .. } => {}
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

fn count_field_reads(expr: &Expr, counts: &mut IndexMap<(String, String), usize>) {
    if let Expr::Index { base, key, dot: true, .. } = expr {
        if let (Expr::Ident { name: base_name, .. }, Expr::String { value: field, .. }) = (&**base, &**key) {
            *counts.entry((base_name.clone(), field.clone())).or_insert(0) += 1;
        }
    }
    walk_children(expr, &mut |child| count_field_reads(child, counts));
}

fn rewrite_field_reads(expr: &mut Expr, cache_of: &IndexMap<(String, String), String>) {
    if let Expr::Index { base, key, dot: true, span } = expr {
        if let (Expr::Ident { name: base_name, .. }, Expr::String { value: field, .. }) = (&**base, &**key) {
            if let Some(name) = cache_of.get(&(base_name.clone(), field.clone())) {
                *expr = Expr::Ident { name: name.clone(), span: span.clone() };
                return;
            }
        }
    }
    walk_children_mut(expr, &mut |child| rewrite_field_reads(child, cache_of));
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

fn collect_mutated_bases(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    for stmt in stmts {
        if let Stmt::Assign { target, .. } = stmt {
            match target {
                Expr::Ident { name, .. } => {
                    names.insert(name.clone());
                }
                Expr::Index { base, dot: true, .. } => {
                    if let Expr::Ident { name, .. } = &**base {
                        names.insert(name.clone());
                    }
                }
                _ => {}
            }
        }
    }
    names
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
    fn caches_repeated_field_read() {
        let program = parse("fn f(p) {\n  let a = p.x + p.x\n  return a\n}\n", None).expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(matches!(&body[0], Stmt::Let { name, .. } if name == "p_x"));
    }

    #[test]
    fn does_not_cache_single_occurrence() {
        let program = parse("fn f(p) {\n  let a = p.x\n  return a\n}\n", None).expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(!matches!(&body[0], Stmt::Let { name, .. } if name == "p_x"));
    }

    #[test]
    fn does_not_cache_when_base_is_reassigned() {
        let program = parse("fn f(p) {\n  let a = p.x + p.x\n  p = a\n}\n", None).expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(!body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name == "p_x")));
    }
}
