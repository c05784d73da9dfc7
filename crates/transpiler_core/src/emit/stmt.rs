//! Statement printing.

use transpiler_syntax::ast::{Pattern, Stmt};

use super::expr::emit_expr;
use super::EmitState;

fn ind(indent: usize) -> String {
    "    ".repeat(indent)
}

pub fn emit_block(stmts: &[Stmt], indent: usize, state: &mut EmitState, module_table: Option<&str>) -> String {
    let mut out = String::new();
    for stmt in stmts {
        out.push_str(&emit_stmt(stmt, indent, state, module_table));
    }
    out
}

fn exported_line(indent: usize, module_table: Option<&str>, exported: bool, name: &str) -> String {
    match module_table {
        Some(table) if exported => format!("{}{table}.{name} = {name}\n", ind(indent)),
        _ => String::new(),
    }
}

fn emit_stmt(stmt: &Stmt, indent: usize, state: &mut EmitState, module_table: Option<&str>) -> String {
    let pad = ind(indent);
    match stmt {
        Stmt::Let { name, value, exported, .. } => {
            let mut out = match value {
                Some(v) => format!("{pad}local {name} = {}\n", emit_expr(v)),
                None => format!("{pad}local {name}\n"),
            };
            out.push_str(&exported_line(indent, module_table, *exported, name));
            out
        }
        Stmt::Global { name, value, .. } => {
            format!("{pad}{name} = {}\n", emit_expr(value))
        }
        Stmt::Assign { target, value, .. } => {
            format!("{pad}{} = {}\n", emit_expr(target), emit_expr(value))
        }
        Stmt::ExprStmt { expr, .. } => format!("{pad}{}\n", emit_expr(expr)),
        Stmt::Function { name, params, body, exported, .. } => {
            let params = params.iter().map(|p| p.name.clone()).collect::<Vec<_>>().join(", ");
            let mut out = format!("{pad}local function {name}({params})\n");
            out.push_str(&emit_block(body, indent + 1, state, module_table));
            out.push_str(&format!("{pad}end\n"));
            out.push_str(&exported_line(indent, module_table, *exported, name));
            out
        }
        Stmt::Struct { name, fields, exported, .. } => {
            let field_names = fields.iter().map(|(n, _)| n.clone()).collect::<Vec<_>>();
            let params = field_names.join(", ");
            let table_fields = field_names.iter().map(|n| format!("{n} = {n}")).collect::<Vec<_>>().join(", ");
            let mut out = format!("{pad}local {name} = {{}}\n");
            out.push_str(&format!("{pad}function {name}.new({params}) return {{ {table_fields} }} end\n"));
            out.push_str(&exported_line(indent, module_table, *exported, name));
            out
        }
        Stmt::Enum { name, items, exported, .. } => {
            let mut next_value = 1i64;
            let rendered = items
                .iter()
                .map(|(item_name, explicit)| {
                    let value = explicit.unwrap_or(next_value);
                    next_value = value + 1;
                    format!("{item_name} = {value}")
                })
                .collect::<Vec<_>>()
                .join(", ");
            let mut out = format!("{pad}local {name} = {{ {rendered} }}\n");
            out.push_str(&exported_line(indent, module_table, *exported, name));
            out
        }
        Stmt::If { cond, then_branch, elseifs, else_branch, .. } => {
            let mut out = format!("{pad}if {} then\n", emit_expr(cond));
            out.push_str(&emit_block(then_branch, indent + 1, state, module_table));
            for (c, body) in elseifs {
                out.push_str(&format!("{pad}elseif {} then\n", emit_expr(c)));
                out.push_str(&emit_block(body, indent + 1, state, module_table));
            }
            if let Some(body) = else_branch {
                out.push_str(&format!("{pad}else\n"));
                out.push_str(&emit_block(body, indent + 1, state, module_table));
            }
            out.push_str(&format!("{pad}end\n"));
            out
        }
        Stmt::While { cond, body, .. } => {
            let mut out = format!("{pad}while {} do\n", emit_expr(cond));
            out.push_str(&emit_block(body, indent + 1, state, module_table));
            out.push_str(&format!("{pad}end\n"));
            out
        }
        Stmt::ForNum { name, start, stop, step, body, .. } => {
            let header = match step {
                Some(s) => format!("for {name} = {}, {}, {} do\n", emit_expr(start), emit_expr(stop), emit_expr(s)),
                None => format!("for {name} = {}, {} do\n", emit_expr(start), emit_expr(stop)),
            };
            let mut out = format!("{pad}{header}");
            out.push_str(&emit_block(body, indent + 1, state, module_table));
            out.push_str(&format!("{pad}end\n"));
            out
        }
        Stmt::ForIn { name, iter, body, .. } => {
            let mut out = format!("{pad}for {name} in {} do\n", emit_expr(iter));
            out.push_str(&emit_block(body, indent + 1, state, module_table));
            out.push_str(&format!("{pad}end\n"));
            out
        }
        Stmt::Return { value, .. } => match value {
            Some(v) => format!("{pad}return {}\n", emit_expr(v)),
            None => format!("{pad}return\n"),
        },
        Stmt::Match { subject, cases, .. } => emit_match(subject, cases, indent, state, module_table),
    }
}

fn emit_match(
    subject: &transpiler_syntax::ast::Expr,
    cases: &[transpiler_syntax::ast::MatchCase],
    indent: usize,
    state: &mut EmitState,
    module_table: Option<&str>,
) -> String {
    use transpiler_syntax::ast::Expr;

    let pad = ind(indent);
    let mut out = String::new();
    let subject_var = match subject {
        Expr::Ident { name, .. } => name.clone(),
        _ => {
            let fresh = state.fresh_match();
            out.push_str(&format!("{pad}local {fresh} = {}\n", emit_expr(subject)));
            fresh
        }
    };

    let mut emitted_any = false;
    let mut in_else = false;
    for case in cases {
        match &case.pattern {
            Pattern::Wildcard { .. } => {
                out.push_str(&format!("{pad}else\n"));
                out.push_str(&emit_block(&case.body, indent + 1, state, module_table));
                in_else = true;
                break;
            }
            Pattern::Literal { value, .. } => {
                let lit = emit_expr(&literal_to_expr(value, case.span.clone()));
                let keyword = if emitted_any { "elseif" } else { "if" };
                out.push_str(&format!("{pad}{keyword} {subject_var} == {lit} then\n"));
                out.push_str(&emit_block(&case.body, indent + 1, state, module_table));
                emitted_any = true;
            }
            Pattern::Expr { expr, .. } => {
                let rendered = emit_expr(expr);
                let keyword = if emitted_any { "elseif" } else { "if" };
                out.push_str(&format!("{pad}{keyword} {subject_var} == {rendered} then\n"));
                out.push_str(&emit_block(&case.body, indent + 1, state, module_table));
                emitted_any = true;
            }
        }
    }
    if emitted_any || in_else {
        out.push_str(&format!("{pad}end\n"));
    }
    out
}

fn literal_to_expr(value: &transpiler_syntax::ast::Literal, span: transpiler_syntax::Span) -> transpiler_syntax::ast::Expr {
    use transpiler_syntax::ast::{Expr, Literal};
    match value {
        Literal::Number(n) => Expr::Number { value: n.0, span },
        Literal::String(s) => Expr::String { value: s.clone(), span },
        Literal::Boolean(b) => Expr::Boolean { value: *b, span },
        Literal::Nil => Expr::Nil { span },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transpiler_syntax::parser::parse;

    fn emit(src: &str) -> String {
        let program = parse(src, None).expect("parse");
        let mut state = EmitState::new();
        emit_block(&program.body, 0, &mut state, None)
    }

    #[test]
    fn emits_struct_as_table_with_constructor() {
        let out = emit("struct Point {\n  x: number,\n  y: number,\n}\n");
        assert!(out.contains("local Point = {}"));
        assert!(out.contains("function Point.new(x, y) return { x = x, y = y } end"));
    }

    #[test]
    fn emits_enum_as_number_table() {
        let out = emit("enum Color {\n  Red,\n  Green,\n  Blue,\n}\n");
        assert_eq!(out, "local Color = { Red = 1, Green = 2, Blue = 3 }\n");
    }

    #[test]
    fn emits_match_as_if_elseif_chain_with_fresh_temp_for_call_subject() {
        let src = "fn classify() {\n  match f() {\n    case 1 => return \"one\"\n    case _ => return \"other\"\n  }\n}\n";
        let out = emit(src);
        assert!(out.contains("local __match0 = f()"));
        assert!(out.contains("if __match0 == 1 then"));
        assert!(out.contains("else"));
    }

    #[test]
    fn emits_match_on_bare_identifier_without_fresh_temp() {
        let src = "fn classify(n) {\n  match n {\n    case 1 => return \"one\"\n    case _ => return \"other\"\n  }\n}\n";
        let out = emit(src);
        assert!(!out.contains("__match"));
        assert!(out.contains("if n == 1 then"));
    }

    #[test]
    fn emits_numeric_for_loop_with_and_without_step() {
        let out = emit("fn f() {\n  for i = 1, 10 {\n    return i\n  }\n}\n");
        assert!(out.contains("for i = 1, 10 do"));

        let out = emit("fn f() {\n  for i = 1, 10, 2 {\n    return i\n  }\n}\n");
        assert!(out.contains("for i = 1, 10, 2 do"));
    }
}
