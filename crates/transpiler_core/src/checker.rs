//! Structural type checker.
//!
//! Runs after the analyzer. Builds a second, independent scope stack keyed
//! by declared or inferred types (the analyzer's `ScopeStack` tracks
//! nilness, not structure) and walks the tree once, typing every expression
//! bottom-up and checking every statement's own rule as it goes. An
//! identifier with no known binding types as `any` rather than erroring —
//! only `index` and `call` on a definitely-wrong-shaped value produce a
//! diagnostic, so that untyped locals never cascade into unrelated errors.

use indexmap::IndexMap;
use transpiler_syntax::ast::{BinaryOp, Expr, Param, Pattern, Program, Stmt, TableField, TypeExpr, UnaryOp};
use transpiler_syntax::diagnostics::Diagnostics;
use transpiler_syntax::span::Span;

use crate::analysis::flow::{narrow_form, NarrowForm};
use crate::module_env::ModuleEnv;
use crate::types::{assignable, make_union, Primitive, Type};

pub struct Checker<'m> {
    diags: Diagnostics,
    scopes: Vec<IndexMap<String, Type>>,
    type_defs: IndexMap<String, Type>,
    return_types: Vec<Option<Type>>,
    module_env: Option<&'m ModuleEnv>,
}

pub fn check(program: &Program, module_env: Option<&ModuleEnv>) -> Diagnostics {
    let mut checker = Checker::new(module_env);
    checker.bind_imports(program);
    checker.check_block(&program.body);
    checker.diags
}

impl<'m> Checker<'m> {
    fn new(module_env: Option<&'m ModuleEnv>) -> Self {
        Self {
            diags: Diagnostics::new(),
            scopes: vec![IndexMap::new()],
            type_defs: IndexMap::new(),
            return_types: Vec::new(),
            module_env,
        }
    }

    fn bind_imports(&mut self, program: &Program) {
        let Some(env) = self.module_env else { return };
        for import in &program.imports {
            match &import.kind {
                transpiler_syntax::ast::ImportKind::Whole { alias } => {
                    let bound = alias.clone().unwrap_or_else(|| last_segment(&import.module_path));
                    self.declare(bound, Type::Any);
                }
                transpiler_syntax::ast::ImportKind::Named { names } => {
                    for name in names {
                        let ty = env.export_type(&import.module_path, name).cloned().unwrap_or(Type::Any);
                        self.declare(name.clone(), ty);
                    }
                }
            }
        }
    }

    fn push(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: String, ty: Type) {
        self.scopes.last_mut().expect("empty scope stack").insert(name, ty);
    }

    fn lookup(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn has_binding(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn check_block(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, ty, value, span, .. } => {
                let value_ty = value.as_ref().map(|v| self.type_of(v));
                let declared = ty.as_ref().map(|t| self.type_from_expr(t));
                let final_ty = match (&declared, &value_ty) {
                    (Some(d), Some(v)) => {
                        if !assignable(v, d) {
                            self.error(
                                *span,
                                format!("Expected {}, got {}", d.display_name(), v.display_name()),
                            );
                        }
                        d.clone()
                    }
                    (Some(d), None) => d.clone(),
                    (None, Some(v)) => v,
                    (None, None) => Type::Any,
                };
                self.declare(name.clone(), final_ty);
            }
            Stmt::Global { name, value, .. } => {
                let ty = self.type_of(value);
                self.scopes.first_mut().expect("empty scope stack").insert(name.clone(), ty);
            }
            Stmt::Assign { target, value, span } => {
                let value_ty = self.type_of(value);
                if let Expr::Ident { name, .. } = target {
                    if let Some(existing) = self.lookup(name).cloned() {
                        if !assignable(&value_ty, &existing) {
                            self.error(
                                *span,
                                format!(
                                    "Expected {}, got {}",
                                    existing.display_name(),
                                    value_ty.display_name()
                                ),
                            );
                        }
                    }
                } else {
                    self.type_of(target);
                }
            }
            Stmt::ExprStmt { expr, .. } => {
                self.type_of(expr);
            }
            Stmt::Function { name, params, ret, body, .. } => {
                let param_types: Vec<Type> =
                    params.iter().map(|p| p.ty.as_ref().map(|t| self.type_from_expr(t)).unwrap_or(Type::Any)).collect();
                let ret_type = ret.as_ref().map(|t| self.type_from_expr(t)).unwrap_or(Type::Any);
                self.declare(
                    name.clone(),
                    Type::Func { params: param_types.clone(), ret: Box::new(ret_type.clone()) },
                );
                self.push();
                for (param, pty) in params.iter().zip(param_types.into_iter()) {
                    self.declare(param.name.clone(), pty);
                }
                self.return_types.push(Some(ret_type));
                self.check_block(body);
                self.return_types.pop();
                self.pop();
            }
            Stmt::Struct { name, fields, .. } => {
                let field_types: IndexMap<String, Type> =
                    fields.iter().map(|(n, t)| (n.clone(), self.type_from_expr(t))).collect();
                let instance = Type::Struct { fields: field_types.clone() };
                self.type_defs.insert(name.clone(), instance.clone());
                let ctor_params: Vec<(String, Type)> = field_types.into_iter().collect();
                self.declare(
                    name.clone(),
                    Type::StructCtor { name: name.clone(), instance: Box::new(instance), ctor_params },
                );
            }
            Stmt::Enum { name, items, .. } => {
                let item_names: Vec<String> = items.iter().map(|(n, _)| n.clone()).collect();
                let enum_ty = Type::Enum { name: name.clone(), items: item_names };
                self.type_defs.insert(name.clone(), enum_ty.clone());
                self.declare(name.clone(), enum_ty);
            }
            Stmt::If { cond, then_branch, elseifs, else_branch, .. } => {
                self.type_of(cond);
                self.push();
                self.apply_narrow(cond, true);
                self.check_block(then_branch);
                self.pop();
                for (econd, ebody) in elseifs {
                    self.type_of(econd);
                    self.push();
                    self.apply_narrow(econd, true);
                    self.check_block(ebody);
                    self.pop();
                }
                if let Some(eb) = else_branch {
                    self.push();
                    self.apply_narrow(cond, false);
                    self.check_block(eb);
                    self.pop();
                }
            }
            Stmt::While { cond, body, .. } => {
                self.type_of(cond);
                self.push();
                self.apply_narrow(cond, true);
                self.check_block(body);
                self.pop();
            }
            Stmt::ForNum { name, start, stop, step, body, .. } => {
                self.type_of(start);
                self.type_of(stop);
                if let Some(s) = step {
                    self.type_of(s);
                }
                self.push();
                self.declare(name.clone(), Type::number());
                self.check_block(body);
                self.pop();
            }
            Stmt::ForIn { name, iter, body, .. } => {
                self.type_of(iter);
                self.push();
                self.declare(name.clone(), Type::Any);
                self.check_block(body);
                self.pop();
            }
            Stmt::Return { value, span } => {
                let value_ty = value.as_ref().map(|v| self.type_of(v));
                if let Some(Some(expected)) = self.return_types.last().cloned() {
                    let got = value_ty.unwrap_or(Type::Nil);
                    if !assignable(&got, &expected) {
                        self.error(
                            *span,
                            format!(
                                "Return type mismatch: expected {}, got {}",
                                expected.display_name(),
                                got.display_name()
                            ),
                        );
                    }
                }
            }
            Stmt::Match { subject, cases, .. } => {
                let subject_ty = self.type_of(subject);
                for case in cases {
                    self.push();
                    self.bind_pattern(&case.pattern, &subject_ty);
                    self.check_block(&case.body);
                    self.pop();
                }
            }
        }
    }

    fn bind_pattern(&mut self, pattern: &Pattern, _subject_ty: &Type) {
        if let Pattern::Expr { expr, .. } = pattern {
            self.type_of(expr);
        }
    }

    /// Shadow-inserts a narrowed type into the current scope; positive is
    /// the branch where the condition held (`true` for `if`, `false` for
    /// the matching `else`).
    fn apply_narrow(&mut self, cond: &Expr, positive: bool) {
        let Some(form) = narrow_form(cond) else { return };
        let (name, non_nil_branch) = match form {
            NarrowForm::EqNil(n) => (n, !positive),
            NarrowForm::NotEqNil(n) => (n, positive),
            NarrowForm::Truthy(n) => (n, positive),
        };
        if !non_nil_branch {
            return;
        }
        if let Some(ty) = self.lookup(name).cloned() {
            self.declare(name.to_string(), ty.remove_nil());
        }
    }

    fn type_from_expr(&mut self, ty: &TypeExpr) -> Type {
        match ty {
            TypeExpr::Name { name, .. } => match name.as_str() {
                "any" => Type::Any,
                "never" => Type::Never,
                "nil" => Type::Nil,
                "number" => Type::number(),
                "string" => Type::string(),
                "boolean" => Type::boolean(),
                _ => self.type_defs.get(name).cloned().unwrap_or(Type::Any),
            },
            TypeExpr::Struct { fields, .. } => {
                let field_types: IndexMap<String, Type> =
                    fields.iter().map(|(n, t)| (n.clone(), self.type_from_expr(t))).collect();
                Type::Struct { fields: field_types }
            }
            TypeExpr::Union { left, right, .. } => {
                let l = self.type_from_expr(left);
                let r = self.type_from_expr(right);
                make_union(vec![l, r])
            }
            TypeExpr::Func { params, ret, .. } => {
                let ps: Vec<Type> = params.iter().map(|p| self.type_from_expr(p)).collect();
                let r = self.type_from_expr(ret);
                Type::Func { params: ps, ret: Box::new(r) }
            }
        }
    }

    fn type_of(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Ident { name, .. } => self.lookup(name).cloned().unwrap_or(Type::Any),
            Expr::Number { .. } => Type::number(),
            Expr::String { .. } => Type::string(),
            Expr::Boolean { .. } => Type::boolean(),
            Expr::Nil { .. } => Type::Nil,
            Expr::Unary { op, expr, .. } => {
                let inner = self.type_of(expr);
                match op {
                    UnaryOp::Not => Type::boolean(),
                    UnaryOp::Neg => inner,
                    UnaryOp::Len => Type::number(),
                }
            }
            Expr::Binary { op, left, right, .. } => {
                let l = self.type_of(left);
                let r = self.type_of(right);
                match op {
                    BinaryOp::And | BinaryOp::Or => make_union(vec![l, r]),
                    BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq => Type::boolean(),
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
                        Type::number()
                    }
                }
            }
            Expr::Call { callee, args, span } => self.type_call(callee, args, *span),
            Expr::Index { base, key, dot, span } => self.type_index(base, key, *dot, *span),
            Expr::Table { fields, .. } => self.type_table(fields),
        }
    }

    fn type_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Type {
        let callee_ty = self.type_of(callee);
        let arg_types: Vec<Type> = args.iter().map(|a| self.type_of(a)).collect();
        let func = match &callee_ty {
            Type::Any => return Type::Any,
            Type::Func { .. } => Some(callee_ty.clone()),
            Type::Union { types } => types.iter().find(|t| matches!(t, Type::Func { .. })).cloned(),
            _ => None,
        };
        let Some(Type::Func { params, ret }) = func else {
            self.error(
                span,
                format!("Attempt to call non-function value of type '{}'", callee_ty.display_name()),
            );
            return Type::Any;
        };
        for (i, (param_ty, arg_ty)) in params.iter().zip(arg_types.iter()).enumerate() {
            if !assignable(arg_ty, param_ty) {
                self.error(
                    span,
                    format!(
                        "Argument {}: expected {}, got {}",
                        i + 1,
                        param_ty.display_name(),
                        arg_ty.display_name()
                    ),
                );
            }
        }
        *ret
    }

    fn type_index(&mut self, base: &Expr, key: &Expr, dot: bool, span: Span) -> Type {
        if let Expr::Ident { name: base_name, .. } = base {
            if let Some(env) = self.module_env {
                if let Some(target_module) = env.module_for_alias(base_name) {
                    if let Expr::String { value: member, .. } = key {
                        if let Some(ty) = env.export_type(target_module, member) {
                            return ty.clone();
                        }
                        self.error(span, format!("Module '{target_module}' does not export '{member}'"));
                        return Type::Any;
                    }
                }
            }
        }

        let base_ty = self.type_of(base);
        if dot {
            if let Expr::String { value: member, .. } = key {
                if let Type::Enum { items, .. } = &base_ty {
                    if items.contains(member) {
                        return base_ty.clone();
                    }
                    self.error(span, format!("Unknown enum member '{member}' on '{}'", base_ty.display_name()));
                    return Type::Any;
                }
                if let Type::StructCtor { ctor_params, instance, .. } = &base_ty {
                    if member == "new" {
                        return Type::Func {
                            params: ctor_params.iter().map(|(_, t)| t.clone()).collect(),
                            ret: instance.clone(),
                        };
                    }
                    self.error(span, format!("Unknown member '{member}' on '{}'", base_ty.display_name()));
                    return Type::Any;
                }
                if let Type::Struct { fields } = &base_ty {
                    if let Some(field_ty) = fields.get(member) {
                        return field_ty.clone();
                    }
                    self.error(
                        span,
                        format!("Unknown field '{member}' on struct '{}'", base_ty.display_name()),
                    );
                    return Type::Any;
                }
            }
        }
        if base_ty.is_nilable() {
            self.error(span, format!("Attempt to index a possibly-nil value of type '{}'", base_ty.display_name()));
        }
        self.type_of(key);
        Type::Any
    }

    fn type_table(&mut self, fields: &[TableField]) -> Type {
        let mut field_types: IndexMap<String, Type> = IndexMap::new();
        let mut positional_types: Vec<Type> = Vec::new();
        let mut saw_computed = false;
        for field in fields {
            match field {
                TableField::Field { key_is_ident, key, value } => {
                    let value_ty = self.type_of(value);
                    if *key_is_ident {
                        if let Expr::Ident { name, .. } = key.as_ref() {
                            field_types.insert(name.clone(), value_ty);
                            continue;
                        }
                    }
                    self.type_of(key);
                    saw_computed = true;
                }
                TableField::ArrayField { value } => {
                    positional_types.push(self.type_of(value));
                }
            }
        }
        if saw_computed {
            field_types.insert("[index]".to_string(), Type::Any);
        } else if !positional_types.is_empty() {
            field_types.insert("[index]".to_string(), make_union(positional_types));
        }
        Type::Struct { fields: field_types }
    }

    fn error(&mut self, span: Span, message: String) {
        self.diags.error(Some(span), message, vec![]);
    }
}

fn last_segment(module_path: &str) -> String {
    module_path.rsplit('.').next().unwrap_or(module_path).to_string()
}

/// Builds a module's export table without running the full analyzer —
/// used by the linker before any unit's checker pass runs, so `import`
/// validation can resolve member types up front.
pub fn build_export_signature(program: &Program) -> (IndexMap<String, Type>, Vec<String>) {
    let mut checker = Checker::new(None);
    let mut exports = IndexMap::new();
    let mut errors = Vec::new();
    export_signature_walk(&mut checker, &program.body, &mut exports, &mut errors);
    (exports, errors)
}

fn export_signature_walk(
    checker: &mut Checker,
    stmts: &[Stmt],
    exports: &mut IndexMap<String, Type>,
    errors: &mut Vec<String>,
) {
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, ty, value, exported, .. } => {
                let declared = ty.as_ref().map(|t| checker.type_from_expr(t));
                let inferred = value.as_ref().map(|v| checker.type_of(v));
                let final_ty = declared.or(inferred).unwrap_or(Type::Any);
                checker.declare(name.clone(), final_ty.clone());
                if *exported {
                    insert_export(exports, name.clone(), final_ty, errors);
                }
            }
            Stmt::Function { name, params, ret, exported, .. } => {
                let param_types: Vec<Type> = params
                    .iter()
                    .map(|p: &Param| p.ty.as_ref().map(|t| checker.type_from_expr(t)).unwrap_or(Type::Any))
                    .collect();
                let ret_type = ret.as_ref().map(|t| checker.type_from_expr(t)).unwrap_or(Type::Any);
                let func_ty = Type::Func { params: param_types, ret: Box::new(ret_type) };
                checker.declare(name.clone(), func_ty.clone());
                if *exported {
                    insert_export(exports, name.clone(), func_ty, errors);
                }
            }
            Stmt::Struct { name, fields, exported, .. } => {
                let field_types: IndexMap<String, Type> =
                    fields.iter().map(|(n, t)| (n.clone(), checker.type_from_expr(t))).collect();
                let instance = Type::Struct { fields: field_types.clone() };
                checker.type_defs.insert(name.clone(), instance.clone());
                let ctor_params: Vec<(String, Type)> = field_types.into_iter().collect();
                let ctor_ty = Type::StructCtor { name: name.clone(), instance: Box::new(instance), ctor_params };
                checker.declare(name.clone(), ctor_ty.clone());
                if *exported {
                    insert_export(exports, name.clone(), ctor_ty, errors);
                }
            }
            Stmt::Enum { name, items, exported, .. } => {
                let item_names: Vec<String> = items.iter().map(|(n, _)| n.clone()).collect();
                let enum_ty = Type::Enum { name: name.clone(), items: item_names };
                checker.type_defs.insert(name.clone(), enum_ty.clone());
                checker.declare(name.clone(), enum_ty.clone());
                if *exported {
                    insert_export(exports, name.clone(), enum_ty, errors);
                }
            }
            _ => {}
        }
    }
}

fn insert_export(exports: &mut IndexMap<String, Type>, name: String, ty: Type, errors: &mut Vec<String>) {
    if exports.contains_key(&name) {
        errors.push(format!("Duplicate export '{name}'"));
        return;
    }
    exports.insert(name, ty);
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    fn diagnostics_for(src: &str) -> Diagnostics {
        let program = parse(src, Some(std::rc::Rc::from("t.lua"))).expect("parse failed");
        check(&program, None)
    }

    #[test]
    fn let_type_mismatch_errors() {
        let diags = diagnostics_for("let x: number = \"hi\"\n");
        assert!(diags.entries().iter().any(|d| d.message.contains("Expected number, got string")));
    }

    #[test]
    fn matching_let_type_is_clean() {
        let diags = diagnostics_for("let x: number = 1\n");
        assert!(!diags.has_errors());
    }

    #[test]
    fn calling_non_function_errors() {
        let diags = diagnostics_for("let x = 1\nx()\n");
        assert!(diags.entries().iter().any(|d| d.message.contains("Attempt to call non-function value")));
    }

    #[test]
    fn struct_field_access_is_typed() {
        let src = "struct Point { x: number, y: number }\nlet p = Point.new(1, 2)\nlet n: number = p.x\n";
        let diags = diagnostics_for(src);
        assert!(!diags.has_errors());
    }

    #[test]
    fn struct_field_access_catches_real_mismatch() {
        let src = "struct Point { x: number, y: number }\nlet p = Point.new(1, 2)\nlet n: string = p.x\n";
        let diags = diagnostics_for(src);
        assert!(diags.entries().iter().any(|d| d.message.contains("Expected string, got number")));
    }

    #[test]
    fn unknown_struct_field_errors() {
        let src = "struct Point { x: number, y: number }\nlet p = Point.new(1, 2)\nlet z = p.z\n";
        let diags = diagnostics_for(src);
        assert!(diags.entries().iter().any(|d| d.message.contains("Unknown field 'z'")));
    }

    #[test]
    fn return_type_mismatch_errors() {
        let src = "fn f(): number {\n  return \"hi\"\n}\n";
        let diags = diagnostics_for(src);
        assert!(diags.entries().iter().any(|d| d.message.contains("Return type mismatch")));
    }

    #[test]
    fn narrowing_allows_field_access_in_checker_too() {
        let src = "struct Point { x: number }\nlet p: Point | nil\nif p ~= nil {\n  let n: number = p.x\n}\n";
        let diags = diagnostics_for(src);
        assert!(!diags.has_errors());
    }
}
