//! P5: numeric for-loop normalization.
//!
//! Reserved for a future rewrite of `for i = start, stop, step` loops into a
//! canonical step-1 form; currently a no-op placeholder kept in the fixed
//! pass order so enabling/disabling it via `PassToggles` never shifts the
//! position of P6 in the pipeline.

use transpiler_syntax::ast::Stmt;

pub fn run(stmts: Vec<Stmt>) -> Vec<Stmt> {
    stmts
}
