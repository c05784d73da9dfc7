//! Binding, definite-assignment, nilness, reachability, and return-shape
//! analysis over a parsed program.
//!
//! This pass never constructs [`crate::types::Type`] values — it only
//! tracks whether a local has been assigned and whether it might be `nil`.
//! Full structural typing is the type checker's job (`crate::checker`); the
//! two passes run independently over the same tree and do not share state,
//! though they agree on which identifiers a program binds.

use std::collections::HashSet;

use transpiler_syntax::ast::{
    BinaryOp, Expr, Literal, MatchCase, Param, Pattern, Program, Stmt, TableField, TypeExpr, UnaryOp,
};
use transpiler_syntax::{Diagnostics, Span};

use crate::module_env::{ImportBinding, ModuleEnv};

use super::flow::{const_truthy, narrow_form, FlowSummary, NarrowForm};
use super::scope::{join_scope_snapshots, LocalInfo, Nilness, Scope, ScopeStack};

/// Names that resolve without a prior `let`/`global` declaration — the
/// fixed standard-library surface of the target runtime.
const BUILTIN_GLOBALS: &[&str] = &[
    "assert", "error", "ipairs", "next", "pairs", "pcall", "print", "select", "tonumber", "tostring", "type",
    "unpack", "xpcall", "math", "string", "table", "coroutine", "os", "utf8", "require", "_G",
];

pub fn analyze(program: &Program, module_env: Option<&ModuleEnv>) -> Diagnostics {
    let mut analyzer = Analyzer::new(module_env);
    analyzer.run(program);
    analyzer.diagnostics
}

struct Analyzer<'m> {
    diagnostics: Diagnostics,
    scopes: ScopeStack,
    allowed_globals: HashSet<String>,
    module_env: Option<&'m ModuleEnv>,
}

impl<'m> Analyzer<'m> {
    fn new(module_env: Option<&'m ModuleEnv>) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            scopes: ScopeStack::new(),
            allowed_globals: BUILTIN_GLOBALS.iter().map(|s| s.to_string()).collect(),
            module_env,
        }
    }

    fn run(&mut self, program: &Program) {
        self.bind_imports(&program.imports);
        self.analyze_block(&program.body);
        let top = self.scopes.pop();
        self.finish_scope(&top);
    }

    // ---- imports --------------------------------------------------------

    fn bind_imports(&mut self, imports: &[transpiler_syntax::ast::Import]) {
        let Some(env) = self.module_env else { return };
        for (import, resolved) in imports.iter().zip(env.imports.iter()) {
            match &resolved.binding {
                ImportBinding::Alias(alias) => {
                    self.scopes.current().locals.insert(
                        alias.clone(),
                        LocalInfo::declaration_like(Nilness::NonNil, import.span),
                    );
                }
                ImportBinding::Named(names) => {
                    for name in names {
                        self.scopes.current().locals.insert(
                            name.clone(),
                            LocalInfo::declaration_like(Nilness::NonNil, import.span),
                        );
                    }
                }
            }
        }
    }

    // ---- scope bookkeeping ------------------------------------------------

    fn finish_scope(&mut self, scope: &Scope) {
        for (name, info) in scope.locals.iter() {
            if name == "_" || info.skip_unused_check || info.used {
                continue;
            }
            self.diagnostics.warn(Some(info.decl_span), format!("Unused local '{name}'"), Vec::new());
        }
    }

    /// Runs `body` in a fresh child scope and returns its flow summary
    /// together with a snapshot of the (now-restored) outer stack, so the
    /// caller can merge several mutually exclusive arms back together.
    fn run_arm(&mut self, body: &[Stmt]) -> (FlowSummary, Vec<Scope>) {
        self.scopes.push();
        let summary = self.analyze_block(body);
        let inner = self.scopes.pop();
        self.finish_scope(&inner);
        (summary, self.scopes.snapshot())
    }

    fn apply_narrow(&mut self, form: Option<NarrowForm<'_>>, positive: bool) {
        let Some(form) = form else { return };
        let (name, nilness) = match (form, positive) {
            (NarrowForm::EqNil(n), true) => (n, Nilness::MaybeNil),
            (NarrowForm::EqNil(n), false) => (n, Nilness::NonNil),
            (NarrowForm::NotEqNil(n), true) => (n, Nilness::NonNil),
            (NarrowForm::NotEqNil(n), false) => (n, Nilness::MaybeNil),
            (NarrowForm::Truthy(n), true) => (n, Nilness::NonNil),
            (NarrowForm::Truthy(n), false) => (n, Nilness::MaybeNil),
        };
        if let Some(info) = self.scopes.find_mut(name) {
            info.nilness = nilness;
        }
    }

    // ---- statements ---------------------------------------------------

    fn analyze_block(&mut self, stmts: &[Stmt]) -> FlowSummary {
        let mut summary = FlowSummary::straight_line();
        let mut dead_code_warned = false;
        for stmt in stmts {
            if summary.always_returns && !dead_code_warned {
                self.diagnostics.warn(Some(*stmt.span()), "Dead code after return".to_string(), Vec::new());
                dead_code_warned = true;
            }
            let next = self.analyze_stmt(stmt);
            summary = summary.then(next);
        }
        summary
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) -> FlowSummary {
        match stmt {
            Stmt::Let { name, ty, value, span, .. } => {
                let mut nilness = match value {
                    Some(v) => self.eval_expr(v),
                    None => Nilness::MaybeNil,
                };
                if let Some(ty) = ty {
                    if !type_expr_is_nilable(ty) {
                        nilness = Nilness::NonNil;
                    }
                }
                if name != "_" {
                    if self.scopes.declared_in_current(name) {
                        self.diagnostics.error(Some(*span), format!("'{name}' is already declared in this scope"), Vec::new());
                    } else if self.scopes.shadows_ancestor(name) {
                        self.diagnostics.warn(Some(*span), format!("Declaration of '{name}' shadows an outer declaration"), Vec::new());
                    }
                    let type_name = ty.as_ref().and_then(type_expr_simple_name);
                    let info = LocalInfo::new(value.is_some(), nilness, type_name, *span);
                    self.scopes.current().locals.insert(name.clone(), info);
                }
                FlowSummary::straight_line()
            }
            Stmt::Global { name, value, .. } => {
                self.eval_expr(value);
                self.allowed_globals.insert(name.clone());
                FlowSummary::straight_line()
            }
            Stmt::Assign { target, value, .. } => {
                let nilness = self.eval_expr(value);
                match target {
                    Expr::Ident { name, span } => {
                        if let Some(info) = self.scopes.find_mut(name) {
                            info.assigned = true;
                            info.nilness = nilness;
                        } else if !self.allowed_globals.contains(name) {
                            self.diagnostics.error(Some(*span), format!("Undefined variable '{name}'"), Vec::new());
                        }
                    }
                    other => {
                        self.eval_expr(other);
                    }
                }
                FlowSummary::straight_line()
            }
            Stmt::ExprStmt { expr, .. } => {
                self.eval_expr(expr);
                FlowSummary::straight_line()
            }
            Stmt::Function { name, params, ret, body, span, .. } => {
                self.declare_name(name, *span);
                self.scopes.push();
                for p in params {
                    self.declare_param(p);
                }
                let summary = self.analyze_block(body);
                let inner = self.scopes.pop();
                self.finish_scope(&inner);

                let declared_return = ret.is_some();
                if summary.any_with && summary.any_without {
                    self.diagnostics.error(Some(*span), "Inconsistent return values".to_string(), Vec::new());
                }
                if (declared_return || summary.any_with) && !summary.always_returns {
                    self.diagnostics.error(Some(*span), "Missing return on some paths".to_string(), Vec::new());
                }
                FlowSummary::straight_line()
            }
            Stmt::Struct { name, span, .. } => {
                self.declare_name(name, *span);
                FlowSummary::straight_line()
            }
            Stmt::Enum { name, items, span, .. } => {
                let member_names: Vec<String> = items.iter().map(|(n, _)| n.clone()).collect();
                self.scopes.declare_enum(name.clone(), member_names);
                self.declare_name(name, *span);
                FlowSummary::straight_line()
            }
            Stmt::If { cond, then_branch, elseifs, else_branch, span } => {
                self.analyze_if(cond, then_branch, elseifs, else_branch, span)
            }
            Stmt::While { cond, body, span } => self.analyze_while(cond, body, span),
            Stmt::ForNum { name, start, stop, step, body, span } => {
                self.eval_expr(start);
                self.eval_expr(stop);
                if let Some(s) = step {
                    self.eval_expr(s);
                }
                let baseline = self.scopes.snapshot();
                self.scopes.push();
                self.scopes.current().locals.insert(name.clone(), LocalInfo::new(true, Nilness::NonNil, None, *span));
                let summary = self.analyze_block(body);
                let inner = self.scopes.pop();
                self.finish_scope(&inner);
                let snap = self.scopes.snapshot();
                let merged = join_scope_snapshots(&[baseline, snap]);
                self.scopes.restore(merged);
                FlowSummary { always_returns: false, any_with: summary.any_with, any_without: summary.any_without }
            }
            Stmt::ForIn { name, iter, body, span } => {
                self.eval_expr(iter);
                let baseline = self.scopes.snapshot();
                self.scopes.push();
                self.scopes.current().locals.insert(name.clone(), LocalInfo::new(true, Nilness::Unknown, None, *span));
                let summary = self.analyze_block(body);
                let inner = self.scopes.pop();
                self.finish_scope(&inner);
                let snap = self.scopes.snapshot();
                let merged = join_scope_snapshots(&[baseline, snap]);
                self.scopes.restore(merged);
                FlowSummary { always_returns: false, any_with: summary.any_with, any_without: summary.any_without }
            }
            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    self.eval_expr(v);
                }
                FlowSummary::returning(value.is_some())
            }
            Stmt::Match { subject, cases, span } => self.analyze_match(subject, cases, span),
        }
    }

    fn declare_name(&mut self, name: &str, span: Span) {
        if self.scopes.declared_in_current(name) {
            self.diagnostics.error(Some(span), format!("'{name}' is already declared in this scope"), Vec::new());
        }
        self.scopes.current().locals.insert(name.to_string(), LocalInfo::declaration_like(Nilness::NonNil, span));
    }

    fn declare_param(&mut self, param: &Param) {
        let nilness = match &param.ty {
            None => Nilness::Unknown,
            Some(ty) if type_expr_is_nilable(ty) => Nilness::MaybeNil,
            Some(_) => Nilness::NonNil,
        };
        let type_name = param.ty.as_ref().and_then(type_expr_simple_name);
        self.scopes
            .current()
            .locals
            .insert(param.name.clone(), LocalInfo::new(true, nilness, type_name, param.span));
    }

    fn analyze_if(
        &mut self,
        cond: &Expr,
        then_branch: &[Stmt],
        elseifs: &[(Expr, Vec<Stmt>)],
        else_branch: &Option<Vec<Stmt>>,
        span: &Span,
    ) -> FlowSummary {
        self.eval_expr(cond);
        let baseline = self.scopes.snapshot();

        let mut summaries = Vec::new();
        let mut snapshots = Vec::new();
        let mut prior_const_true = false;

        self.warn_if_unreachable(cond, *span, prior_const_true);
        if const_truthy(cond) == Some(true) {
            prior_const_true = true;
        }
        self.scopes.restore(baseline.clone());
        self.apply_narrow(narrow_form(cond), true);
        let (summary, snap) = self.run_arm(then_branch);
        summaries.push(summary);
        snapshots.push(snap);

        let mut last_cond = cond;
        for (econd, ebody) in elseifs {
            self.scopes.restore(baseline.clone());
            self.eval_expr(econd);
            self.warn_if_unreachable(econd, *econd.span(), prior_const_true);
            if const_truthy(econd) == Some(true) {
                prior_const_true = true;
            }
            self.scopes.restore(baseline.clone());
            self.apply_narrow(narrow_form(econd), true);
            let (summary, snap) = self.run_arm(ebody);
            summaries.push(summary);
            snapshots.push(snap);
            last_cond = econd;
        }

        let exhaustive = if let Some(ebody) = else_branch {
            if prior_const_true {
                self.diagnostics.warn(Some(*span), "Unreachable branch (previous condition is always true)".to_string(), Vec::new());
            }
            self.scopes.restore(baseline.clone());
            self.apply_narrow(narrow_form(last_cond), false);
            let (summary, snap) = self.run_arm(ebody);
            summaries.push(summary);
            snapshots.push(snap);
            true
        } else {
            snapshots.push(baseline);
            false
        };

        let merged = join_scope_snapshots(&snapshots);
        self.scopes.restore(merged);
        FlowSummary::join_all(&summaries, exhaustive)
    }

    fn warn_if_unreachable(&mut self, cond: &Expr, span: Span, prior_const_true: bool) {
        if const_truthy(cond) == Some(false) {
            self.diagnostics.warn(Some(span), "Unreachable branch (condition is always false)".to_string(), Vec::new());
        } else if prior_const_true {
            self.diagnostics.warn(Some(span), "Unreachable branch (previous condition is always true)".to_string(), Vec::new());
        }
    }

    fn analyze_while(&mut self, cond: &Expr, body: &[Stmt], span: &Span) -> FlowSummary {
        self.eval_expr(cond);
        if const_truthy(cond) == Some(false) {
            self.diagnostics.warn(Some(*span), "Unreachable branch (condition is always false)".to_string(), Vec::new());
        }
        let baseline = self.scopes.snapshot();
        let (summary, snap) = self.run_arm(body);
        let merged = join_scope_snapshots(&[baseline, snap]);
        self.scopes.restore(merged);
        FlowSummary { always_returns: false, any_with: summary.any_with, any_without: summary.any_without }
    }

    fn analyze_match(&mut self, subject: &Expr, cases: &[MatchCase], span: &Span) -> FlowSummary {
        self.eval_expr(subject);
        let subject_enum = self.subject_enum_name(subject);
        let enum_items = subject_enum.as_deref().and_then(|n| self.scopes.enum_items(n).cloned());

        let baseline = self.scopes.snapshot();
        let mut has_wildcard = false;
        let mut seen_literals: Vec<Literal> = Vec::new();
        let mut seen_members: HashSet<String> = HashSet::new();
        let mut summaries = Vec::new();
        let mut snapshots = Vec::new();

        for case in cases {
            self.scopes.restore(baseline.clone());
            if has_wildcard {
                self.diagnostics.warn(Some(*case.pattern.span()), "Unreachable match case after wildcard".to_string(), Vec::new());
            }
            match &case.pattern {
                Pattern::Wildcard { .. } => has_wildcard = true,
                Pattern::Literal { value, span } => {
                    if seen_literals.contains(value) {
                        self.diagnostics.warn(Some(*span), "Redundant match case (duplicate literal)".to_string(), Vec::new());
                    } else {
                        seen_literals.push(value.clone());
                    }
                }
                Pattern::Expr { expr, span } => {
                    if let Some(member) = enum_member_pattern(expr, subject_enum.as_deref()) {
                        if !seen_members.insert(member) {
                            self.diagnostics.warn(Some(*span), "Redundant match case (duplicate literal)".to_string(), Vec::new());
                        }
                    } else {
                        self.eval_expr(expr);
                    }
                }
            }
            let (s, snap) = self.run_arm(&case.body);
            summaries.push(s);
            snapshots.push(snap);
        }

        let enum_exhaustive = enum_items.as_ref().is_some_and(|items| items.iter().all(|it| seen_members.contains(it)));
        let exhaustive = has_wildcard || enum_exhaustive;

        if let Some(items) = &enum_items {
            if !has_wildcard {
                let missing: Vec<&str> = items.iter().filter(|it| !seen_members.contains(*it)).map(|s| s.as_str()).collect();
                if !missing.is_empty() {
                    self.diagnostics.error(
                        Some(*span),
                        format!(
                            "Non-exhaustive match for enum '{}': missing {}",
                            subject_enum.as_deref().unwrap_or(""),
                            missing.join(", ")
                        ),
                        Vec::new(),
                    );
                }
            }
        } else if !has_wildcard {
            self.diagnostics.warn(Some(*span), "Non-exhaustive match (missing wildcard case)".to_string(), Vec::new());
        }

        if !exhaustive {
            snapshots.push(baseline);
        }
        let merged = join_scope_snapshots(&snapshots);
        self.scopes.restore(merged);
        FlowSummary::join_all(&summaries, exhaustive)
    }

    fn subject_enum_name(&self, expr: &Expr) -> Option<String> {
        let Expr::Ident { name, .. } = expr else { return None };
        let (_, info) = self.scopes.find(name)?;
        let type_name = info.type_name.as_ref()?;
        self.scopes.enum_items(type_name).map(|_| type_name.clone())
    }

    // ---- expressions ----------------------------------------------------

    fn read_ident(&mut self, name: &str, span: Span) -> Nilness {
        if let Some((_, info)) = self.scopes.find(name) {
            if !info.assigned {
                self.diagnostics.error(Some(span), format!("Use of '{name}' before assignment"), Vec::new());
            }
            let nilness = info.nilness;
            if let Some(info) = self.scopes.find_mut(name) {
                info.used = true;
            }
            return nilness;
        }
        if !self.allowed_globals.contains(name) {
            self.diagnostics.error(Some(span), format!("Undefined variable '{name}'"), Vec::new());
        }
        Nilness::Unknown
    }

    fn eval_expr(&mut self, expr: &Expr) -> Nilness {
        match expr {
            Expr::Ident { name, span } => self.read_ident(name, *span),
            Expr::Number { .. } | Expr::String { .. } | Expr::Boolean { .. } => Nilness::NonNil,
            Expr::Nil { .. } => Nilness::MaybeNil,
            Expr::Unary { op, expr, .. } => {
                self.eval_expr(expr);
                match op {
                    UnaryOp::Neg | UnaryOp::Not | UnaryOp::Len => Nilness::NonNil,
                }
            }
            Expr::Binary { op, left, right, .. } => {
                self.eval_expr(left);
                self.eval_expr(right);
                match op {
                    BinaryOp::And | BinaryOp::Or => Nilness::Unknown,
                    _ => Nilness::NonNil,
                }
            }
            Expr::Call { callee, args, .. } => {
                self.eval_expr(callee);
                for a in args {
                    self.eval_expr(a);
                }
                Nilness::Unknown
            }
            Expr::Index { base, key, dot, span } => {
                let base_nilness = self.eval_expr(base);
                if !*dot {
                    self.eval_expr(key);
                }
                if base_nilness == Nilness::MaybeNil {
                    self.diagnostics.error(Some(*span), "Cannot access field on possibly-nil value".to_string(), Vec::new());
                }
                self.check_module_access(base, key, *dot);
                Nilness::Unknown
            }
            Expr::Table { fields, .. } => {
                for field in fields {
                    match field {
                        TableField::Field { key_is_ident, key, value } => {
                            if !*key_is_ident {
                                self.eval_expr(key);
                            }
                            self.eval_expr(value);
                        }
                        TableField::ArrayField { value } => {
                            self.eval_expr(value);
                        }
                    }
                }
                Nilness::NonNil
            }
        }
    }

    fn check_module_access(&mut self, base: &Expr, key: &Expr, dot: bool) {
        if !dot {
            return;
        }
        let (Expr::Ident { name: alias, .. }, Expr::String { value: member, span }) = (base, key) else { return };
        let Some(env) = self.module_env else { return };
        let Some(module) = env.module_for_alias(alias) else { return };
        if env.export_names(module).is_some_and(|names| !names.contains(&member.as_str())) {
            self.diagnostics.error(
                Some(*span),
                format!("Access to non-exported symbol '{member}' from module '{module}'"),
                Vec::new(),
            );
        }
    }
}

fn enum_member_pattern(expr: &Expr, subject_enum: Option<&str>) -> Option<String> {
    let Expr::Index { base, key, dot: true, .. } = expr else { return None };
    let Expr::Ident { name: base_name, .. } = &**base else { return None };
    let Expr::String { value: member, .. } = &**key else { return None };
    if Some(base_name.as_str()) == subject_enum {
        Some(member.clone())
    } else {
        None
    }
}

fn type_expr_is_nilable(ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Name { name, .. } => name == "nil",
        TypeExpr::Union { left, right, .. } => type_expr_is_nilable(left) || type_expr_is_nilable(right),
        TypeExpr::Struct { .. } | TypeExpr::Func { .. } => false,
    }
}

fn type_expr_simple_name(ty: &TypeExpr) -> Option<String> {
    match ty {
        TypeExpr::Name { name, .. } => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parse;

    fn diagnostics_for(src: &str) -> Diagnostics {
        let program = parse(src, None).expect("parse");
        analyze(&program, None)
    }

    #[test]
    fn use_before_assignment_is_an_error() {
        let diags = diagnostics_for("let x: number\nprint(x)\n");
        assert!(diags.entries().iter().any(|d| d.message.contains("before assignment")));
    }

    #[test]
    fn unused_local_warns() {
        let diags = diagnostics_for("fn f() {\n  let x = 1\n  return 1\n}\n");
        assert!(diags.entries().iter().any(|d| d.message.contains("Unused local 'x'")));
    }

    #[test]
    fn field_access_on_maybe_nil_errors() {
        let diags = diagnostics_for("let t\nprint(t.x)\n");
        assert!(diags.entries().iter().any(|d| d.message.contains("possibly-nil")));
    }

    #[test]
    fn narrowing_suppresses_field_access_error() {
        let diags = diagnostics_for("let t\nif t ~= nil {\n  print(t.x)\n}\n");
        assert!(!diags.entries().iter().any(|d| d.message.contains("possibly-nil")));
    }

    #[test]
    fn non_exhaustive_enum_match_errors() {
        let src = "enum Color { Red, Green, Blue }\nlet c: Color\nmatch c {\n  case Color.Red => print(1)\n}\n";
        let diags = diagnostics_for(src);
        assert!(diags.entries().iter().any(|d| d.message.contains("Non-exhaustive match for enum")));
    }

    #[test]
    fn dead_code_after_return_warns() {
        let diags = diagnostics_for("fn f() {\n  return 1\n  print(2)\n}\n");
        assert!(diags.entries().iter().any(|d| d.message.contains("Dead code after return")));
    }

    #[test]
    fn inconsistent_returns_is_an_error() {
        let src = "fn f(x) {\n  if x {\n    return 1\n  } else {\n    return\n  }\n}\n";
        let diags = diagnostics_for(src);
        assert!(diags.entries().iter().any(|d| d.message.contains("Inconsistent return values")));
    }
}
