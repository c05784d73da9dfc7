//! Expression printing.
//!
//! Parenthesizes only where target operator precedence would otherwise
//! change meaning, so folded/hoisted/cached output reads the way a human
//! would write it (`sin(a) + sin(b)`, not `(sin(a)) + (sin(b))`).

use transpiler_syntax::ast::{BinaryOp, Expr, TableField, UnaryOp};

/// Binding power, loosest to tightest. Ties among left-associative operators
/// never need parens on the left operand; the right operand of a
/// left-associative operator needs strictly tighter binding, and `^`
/// (right-associative) is the mirror image.
fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 1,
        BinaryOp::And => 2,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 3,
        BinaryOp::Add | BinaryOp::Sub => 4,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
        BinaryOp::Pow => 6,
    }
}

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => precedence(*op),
        Expr::Unary { .. } => 7,
        _ => u8::MAX,
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "^",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "~=",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

pub fn emit_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident { name, .. } => name.clone(),
        Expr::Number { value, .. } => format_number(*value),
        Expr::String { value, .. } => format!("\"{}\"", escape(value)),
        Expr::Boolean { value, .. } => value.to_string(),
        Expr::Nil { .. } => "nil".to_string(),
        Expr::Unary { op, expr: operand, .. } => {
            let rendered = wrap(operand, 7);
            match op {
                UnaryOp::Neg => format!("-{rendered}"),
                UnaryOp::Not => format!("not {rendered}"),
                UnaryOp::Len => format!("#{rendered}"),
            }
        }
        Expr::Binary { op, left, right, .. } => {
            let own = precedence(*op);
            let right_min = if matches!(op, BinaryOp::Pow) { own } else { own + 1 };
            format!("{} {} {}", wrap(left, own), binary_symbol(*op), wrap(right, right_min))
        }
        Expr::Call { callee, args, .. } => {
            let callee = wrap(callee, 8);
            let args = args.iter().map(emit_expr).collect::<Vec<_>>().join(", ");
            format!("{callee}({args})")
        }
        Expr::Index { base, key, dot, .. } => {
            let base = wrap(base, 8);
            if *dot {
                match &**key {
                    Expr::String { value, .. } => format!("{base}.{value}"),
                    other => format!("{base}[{}]", emit_expr(other)),
                }
            } else {
                format!("{base}[{}]", emit_expr(key))
            }
        }
        Expr::Table { fields, .. } => {
            let rendered = fields
                .iter()
                .map(|field| match field {
                    TableField::Field { key_is_ident, key, value } => {
                        if *key_is_ident {
                            if let Expr::String { value: k, .. } = &**key {
                                return format!("{k} = {}", emit_expr(value));
                            }
                            format!("{} = {}", emit_expr(key), emit_expr(value))
                        } else {
                            format!("[{}] = {}", emit_expr(key), emit_expr(value))
                        }
                    }
                    TableField::ArrayField { value } => emit_expr(value),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {rendered} }}")
        }
    }
}

fn wrap(expr: &Expr, min_prec: u8) -> String {
    let rendered = emit_expr(expr);
    if expr_precedence(expr) < min_prec {
        format!("({rendered})")
    } else {
        rendered
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
