//! P2: loop-invariant hoisting.
//!
//! For each loop, a top-level `let x = e` whose initializer is "pure" and
//! whose free names are never mutated anywhere in the loop body is hoisted
//! to a fresh `_hoisted<N>` binding immediately before the loop, and `x`'s
//! initializer is rewritten to read that binding instead of recomputing it
//! on every iteration.
//!
//! "Mutated inside the loop" is read per `§9`'s resolution of the
//! ambiguous source rule: a `ForNum`/`ForIn` loop mutates its own loop
//! variable name in addition to whatever its body assigns or locally
//! declares; a `While` loop mutates only what its body assigns/declares.

use std::collections::HashSet;

use transpiler_syntax::ast::{Expr, MatchCase, Stmt};

use super::state::PassState;

pub fn run(stmts: Vec<Stmt>, state: &mut PassState) -> Vec<Stmt> {
    hoist_block(stmts, state)
}

fn hoist_block(stmts: Vec<Stmt>, state: &mut PassState) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            Stmt::ForNum { name, start, stop, step, body, span } => {
                let body = hoist_block(body, state);
                let mut mutated = collect_mutated(&body);
                mutated.insert(name.clone());
                let (hoisted, body) = hoist_loop_body(body, &mutated, state);
                out.extend(hoisted);
                out.push(Stmt::ForNum { name, start, stop, step, body, span });
            }
            Stmt::ForIn { name, iter, body, span } => {
                let body = hoist_block(body, state);
                let mut mutated = collect_mutated(&body);
                mutated.insert(name.clone());
                let (hoisted, body) = hoist_loop_body(body, &mutated, state);
                out.extend(hoisted);
                out.push(Stmt::ForIn { name, iter, body, span });
            }
            Stmt::While { cond, body, span } => {
                let body = hoist_block(body, state);
                let mutated = collect_mutated(&body);
                let (hoisted, body) = hoist_loop_body(body, &mutated, state);
                out.extend(hoisted);
                out.push(Stmt::While { cond, body, span });
            }
            Stmt::If { cond, then_branch, elseifs, else_branch, span } => out.push(Stmt::If {
                cond,
                then_branch: hoist_block(then_branch, state),
                elseifs: elseifs.into_iter().map(|(c, b)| (c, hoist_block(b, state))).collect(),
                else_branch: else_branch.map(|b| hoist_block(b, state)),
                span,
            }),
            Stmt::Function { name, params, ret, body, exported, span } => out.push(Stmt::Function {
                name,
                params,
                ret,
                body: hoist_block(body, state),
                exported,
                span,
            }),
            Stmt::Match { subject, cases, span } => out.push(Stmt::Match {
                subject,
                cases: cases
                    .into_iter()
                    .map(|c| MatchCase { pattern: c.pattern, body: hoist_block(c.body, state), span: c.span })
                    .collect(),
                span,
            }),
            other => out.push(other),
        }
    }
    out
}

/// Scans `body` for hoistable top-level `let`s given the loop's mutated-name
/// set, returning the new `_hoisted<N>` bindings (in order) and the
/// rewritten body.
fn hoist_loop_body(body: Vec<Stmt>, mutated: &HashSet<String>, state: &mut PassState) -> (Vec<Stmt>, Vec<Stmt>) {
    let mut hoisted = Vec::new();
    let mut new_body = Vec::with_capacity(body.len());
    for stmt in body {
        match stmt {
            Stmt::Let { name, ty, value: Some(value), exported, span } if is_pure(&value, mutated) => {
                let hoisted_name = state.fresh_hoist();
                let value_span = value.span().clone();
                hoisted.push(Stmt::Let {
                    name: hoisted_name.clone(),
                    ty: None,
                    value: Some(value),
                    exported: false,
                    span: value_span.clone(),
                });
                new_body.push(Stmt::Let {
                    name,
                    ty,
                    value: Some(Expr::Ident { name: hoisted_name, span: value_span }),
                    exported,
                    span,
                });
            }
            other => new_body.push(other),
        }
    }
    (hoisted, new_body)
}

/// Pure enough to hoist: identifier/literal, unary/binary of pures, or a
/// dotted field read of a local base not mutated in the loop.
fn is_pure(expr: &Expr, mutated: &HashSet<String>) -> bool {
    match expr {
        Expr::Ident { name, .. } => !mutated.contains(name),
        Expr::Number { .. } | Expr::String { .. } | Expr::Boolean { .. } | Expr::Nil { .. } => true,
        Expr::Unary { expr, .. } => is_pure(expr, mutated),
        Expr::Binary { left, right, .. } => is_pure(left, mutated) && is_pure(right, mutated),
        Expr::Index { base, dot: true, .. } => match &**base {
            Expr::Ident { name, .. } => !mutated.contains(name),
            _ => false,
        },
        _ => false,
    }
}

fn collect_mutated(stmts: &[Stmt]) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_mutated_into(stmts, &mut names);
    names
}

fn collect_mutated_into(stmts: &[Stmt], names: &mut HashSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, .. } => {
                names.insert(name.clone());
            }
            Stmt::Global { name, .. } => {
                names.insert(name.clone());
            }
            Stmt::Assign { target, .. } => {
                if let Expr::Ident { name, .. } = target {
                    names.insert(name.clone());
                }
            }
            Stmt::Function { name, body, .. } => {
                names.insert(name.clone());
                collect_mutated_into(body, names);
            }
            Stmt::Struct { name, .. } | Stmt::Enum { name, .. } => {
                names.insert(name.clone());
            }
            Stmt::If { then_branch, elseifs, else_branch, .. } => {
                collect_mutated_into(then_branch, names);
                for (_, b) in elseifs {
                    collect_mutated_into(b, names);
                }
                if let Some(b) = else_branch {
                    collect_mutated_into(b, names);
                }
            }
            Stmt::While { body, .. } => collect_mutated_into(body, names),
            Stmt::ForNum { name, body, .. } => {
                names.insert(name.clone());
                collect_mutated_into(body, names);
            }
            Stmt::ForIn { name, body, .. } => {
                names.insert(name.clone());
                collect_mutated_into(body, names);
            }
            Stmt::Match { cases, .. } => {
                for case in cases {
                    collect_mutated_into(&case.body, names);
                }
            }
            Stmt::ExprStmt { .. } | Stmt::Return { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    #[test]
    fn hoists_invariant_product_out_of_numeric_for() {
        let program =
            parse("fn f(n: number) { let a = 2 let b = 3 for i = 1, n { let x = a * b let y = x + 1 } }", None)
                .expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(matches!(body[2], Stmt::Let { ref name, .. } if name == "_hoisted0"));
        let Stmt::ForNum { body: loop_body, .. } = &body[3] else { panic!("expected for loop") };
        match &loop_body[0] {
            Stmt::Let { value: Some(Expr::Ident { name, .. }), .. } => assert_eq!(name, "_hoisted0"),
            other => panic!("expected rewritten initializer, got {other:?}"),
        }
    }

    #[test]
    fn does_not_hoist_loop_variant_expression() {
        let program = parse("fn f(n: number) { for i = 1, n { let x = i * 2 } }", None).expect("parse");
        let mut state = PassState::new();
        let stmts = run(program.body, &mut state);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(matches!(body[0], Stmt::ForNum { .. }));
    }
}
