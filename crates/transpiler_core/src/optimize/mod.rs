//! Six-pass AST rewrite, run in fixed order on an already-checked program.
//!
//! Each pass is a plain function operating on owned `Vec<Stmt>`/`Expr` trees
//! (see `transpiler_syntax::ast` for why these are `Vec`/`Box`, not arena
//! allocated): folding precedes hoisting so invariant constants can be
//! hoisted as constants, hoisting precedes caching, caching precedes
//! aliasing, and single-use temp elimination runs last to clean up whatever
//! the earlier passes left behind.

mod alias;
mod cache;
mod fold;
mod for_normalize;
mod hoist;
mod state;
mod temps;

pub use state::PassState;

use transpiler_syntax::ast::Stmt;

/// Which of the six passes are enabled. Defaults to "all on", matching
/// `CompileOptions::enable` (`§6`).
#[derive(Debug, Clone, Copy)]
pub struct PassToggles {
    pub constant_folding: bool,
    pub loop_invariant_hoisting: bool,
    pub local_cache: bool,
    pub global_aliasing: bool,
    pub numeric_for_normalization: bool,
    pub redundant_temps: bool,
}

impl Default for PassToggles {
    fn default() -> Self {
        Self {
            constant_folding: true,
            loop_invariant_hoisting: true,
            local_cache: true,
            global_aliasing: true,
            numeric_for_normalization: true,
            redundant_temps: true,
        }
    }
}

/// Runs every enabled pass over `stmts` in the fixed order P1..P6.
pub fn run_all(mut stmts: Vec<Stmt>, toggles: PassToggles) -> Vec<Stmt> {
    let mut state = PassState::new();

    if toggles.constant_folding {
        log::debug!("optimize: running constant folding (P1)");
        stmts = fold::run(stmts);
    }
    if toggles.loop_invariant_hoisting {
        log::debug!("optimize: running loop-invariant hoisting (P2)");
        stmts = hoist::run(stmts, &mut state);
    }
    if toggles.local_cache {
        log::debug!("optimize: running local field caching (P3)");
        stmts = cache::run(stmts, &mut state);
    }
    if toggles.global_aliasing {
        log::debug!("optimize: running global aliasing (P4)");
        stmts = alias::run(stmts, &mut state);
    }
    if toggles.numeric_for_normalization {
        log::debug!("optimize: running for-loop normalization (P5, no-op)");
        stmts = for_normalize::run(stmts);
    }
    if toggles.redundant_temps {
        log::debug!("optimize: running single-use temp elimination (P6)");
        stmts = temps::run(stmts);
    }
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    fn optimize_src(src: &str) -> Vec<Stmt> {
        let program = parse(src, None).expect("parse");
        run_all(program.body, PassToggles::default())
    }

    #[test]
    fn full_pipeline_runs_without_panicking_on_a_realistic_function() {
        let src = "fn f(n: number) {\n  let a = 2\n  let b = 3\n  for i = 1, n {\n    let x = a * b\n    let y = x + 1\n  }\n}\n";
        let stmts = optimize_src(src);
        assert_eq!(stmts.len(), 1);
        let Stmt::Function { body, .. } = &stmts[0] else { panic!("expected function") };
        assert!(body.iter().any(|s| matches!(s, Stmt::Let { name, .. } if name.starts_with("_hoisted"))));
    }
}
