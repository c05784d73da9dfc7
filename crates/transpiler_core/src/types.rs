//! Structural type lattice used by the type checker.
//!
//! `any`, `never`, `nil`, the three primitives, `enum`, `struct`,
//! `struct_ctor`, `func`, and `union`. Unions are always flattened and
//! de-duplicated by a structural key, and collapse when degenerate: a
//! single remaining member stands for itself, and zero members is `never`.

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Number,
    String,
    Boolean,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Any,
    Never,
    Nil,
    Primitive(Primitive),
    Enum { name: String, items: Vec<String> },
    Struct { fields: IndexMap<String, Type> },
    StructCtor { name: String, instance: Box<Type>, ctor_params: Vec<(String, Type)> },
    Func { params: Vec<Type>, ret: Box<Type> },
    Union { types: Vec<Type> },
}

impl Type {
    pub fn number() -> Type {
        Type::Primitive(Primitive::Number)
    }
    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }
    pub fn boolean() -> Type {
        Type::Primitive(Primitive::Boolean)
    }

    /// Canonical structural key, used for union de-duplication and for
    /// comparing two types for structural equality without caring about
    /// insertion order of struct fields or union members.
    pub fn structural_key(&self) -> String {
        match self {
            Type::Any => "any".to_string(),
            Type::Never => "never".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Primitive(p) => p.name().to_string(),
            Type::Enum { name, .. } => format!("enum:{name}"),
            Type::Struct { fields } => {
                let mut keys: Vec<String> =
                    fields.iter().map(|(k, v)| format!("{k}:{}", v.structural_key())).collect();
                keys.sort();
                format!("struct{{{}}}", keys.join(","))
            }
            Type::StructCtor { name, .. } => format!("struct_ctor:{name}"),
            Type::Func { params, ret } => {
                let ps: Vec<String> = params.iter().map(|p| p.structural_key()).collect();
                format!("func({})->{}", ps.join(","), ret.structural_key())
            }
            Type::Union { types } => {
                let mut keys: Vec<String> = types.iter().map(|t| t.structural_key()).collect();
                keys.sort();
                format!("union[{}]", keys.join("|"))
            }
        }
    }

    pub fn is_nilable(&self) -> bool {
        match self {
            Type::Nil => true,
            Type::Union { types } => types.iter().any(|t| matches!(t, Type::Nil)),
            _ => false,
        }
    }

    /// Drops the `nil` member from a (possibly non-nilable) type.
    pub fn remove_nil(&self) -> Type {
        match self {
            Type::Nil => Type::Never,
            Type::Union { types } => {
                let rest: Vec<Type> = types.iter().filter(|t| !matches!(t, Type::Nil)).cloned().collect();
                make_union(rest)
            }
            other => other.clone(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Type::Any => "any".to_string(),
            Type::Never => "never".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Primitive(p) => p.name().to_string(),
            Type::Enum { name, .. } => name.clone(),
            Type::Struct { fields } => {
                let parts: Vec<String> = fields.iter().map(|(k, v)| format!("{k}: {}", v.display_name())).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Type::StructCtor { name, .. } => name.clone(),
            Type::Func { params, ret } => {
                let ps: Vec<String> = params.iter().map(|p| p.display_name()).collect();
                format!("({}) -> {}", ps.join(", "), ret.display_name())
            }
            Type::Union { types } => types.iter().map(|t| t.display_name()).collect::<Vec<_>>().join(" | "),
        }
    }
}

/// Flattens (no union-of-union), de-duplicates by structural key, and
/// collapses degenerate results: one member stands for itself, zero
/// members is `never`.
pub fn make_union(members: Vec<Type>) -> Type {
    let mut flat = Vec::new();
    for m in members {
        match m {
            Type::Union { types } => flat.extend(types),
            other => flat.push(other),
        }
    }
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for t in flat {
        let key = t.structural_key();
        if seen.insert(key) {
            deduped.push(t);
        }
    }
    match deduped.len() {
        0 => Type::Never,
        1 => deduped.into_iter().next().unwrap(),
        _ => Type::Union { types: deduped },
    }
}

/// Structural assignability `src <= dst`.
pub fn assignable(src: &Type, dst: &Type) -> bool {
    if matches!(dst, Type::Any) || matches!(src, Type::Never) {
        return true;
    }
    if matches!(src, Type::Any) {
        return true;
    }
    if let Type::Union { types } = dst {
        return types.iter().any(|u| assignable(src, u));
    }
    if let Type::Union { types } = src {
        return types.iter().all(|s| assignable(s, dst));
    }
    match (src, dst) {
        (Type::Never, _) | (_, Type::Any) => true,
        (Type::Nil, Type::Nil) => true,
        (Type::Primitive(a), Type::Primitive(b)) => a == b,
        (Type::Enum { name: a, .. }, Type::Enum { name: b, .. }) => a == b,
        (Type::StructCtor { name: a, .. }, Type::StructCtor { name: b, .. }) => a == b,
        (Type::Struct { fields: sf }, Type::Struct { fields: df }) => {
            df.iter().all(|(name, dty)| sf.get(name).is_some_and(|sty| assignable(sty, dty)))
        }
        (Type::Func { params: sp, ret: sr }, Type::Func { params: dp, ret: dr }) => {
            sp.len() == dp.len()
                && sp.iter().zip(dp.iter()).all(|(s, d)| assignable(d, s))
                && assignable(sr, dr)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflexivity_holds_for_every_constructible_type() {
        let samples = vec![
            Type::Any,
            Type::Never,
            Type::Nil,
            Type::number(),
            Type::string(),
            Type::boolean(),
            Type::Enum { name: "E".into(), items: vec!["A".into(), "B".into()] },
            Type::Struct { fields: IndexMap::from([("x".to_string(), Type::number())]) },
            Type::Func { params: vec![Type::number()], ret: Box::new(Type::boolean()) },
            make_union(vec![Type::number(), Type::Nil]),
        ];
        for t in samples {
            assert!(assignable(&t, &t), "{:?} not reflexive", t);
        }
    }

    #[test]
    fn union_absorption() {
        let u = make_union(vec![Type::number(), Type::string()]);
        assert!(assignable(&Type::number(), &u));
        assert!(assignable(&Type::string(), &u));
    }

    #[test]
    fn any_neutrality() {
        let t = Type::number();
        assert!(assignable(&Type::Any, &t));
        assert!(assignable(&t, &Type::Any));
    }

    #[test]
    fn union_collapses_single_member() {
        let u = make_union(vec![Type::number(), Type::number()]);
        assert_eq!(u, Type::number());
    }

    #[test]
    fn union_collapses_empty_to_never() {
        assert_eq!(make_union(vec![]), Type::Never);
    }

    #[test]
    fn struct_width_subtyping() {
        let wide = Type::Struct {
            fields: IndexMap::from([("x".to_string(), Type::number()), ("y".to_string(), Type::string())]),
        };
        let narrow = Type::Struct { fields: IndexMap::from([("x".to_string(), Type::number())]) };
        assert!(assignable(&wide, &narrow));
        assert!(!assignable(&narrow, &wide));
    }

    #[test]
    fn func_contravariant_params_covariant_return() {
        let any_to_num = Type::Func { params: vec![Type::Any], ret: Box::new(Type::number()) };
        let num_to_any = Type::Func { params: vec![Type::number()], ret: Box::new(Type::Any) };
        // dst params checked contravariantly: dst.params[i] <= src.params[i]
        assert!(assignable(&any_to_num, &num_to_any));
    }
}
