//! The cross-module view a unit is analyzed and checked against.
//!
//! Built by the linker from the whole program's import graph before any
//! unit's analyzer or checker pass runs, so that import validation and
//! `alias.symbol` lookups never need to re-parse or re-resolve anything.

use indexmap::IndexMap;

use crate::types::Type;

/// How one `import` statement binds names into the importing unit.
#[derive(Debug, Clone)]
pub enum ImportBinding {
    /// `import a.b.c` or `import a.b.c as alias` — the whole module is
    /// bound to one name, and members are reached through `alias.member`.
    Alias(String),
    /// `import a.b.{x, y}` — each name is bound directly.
    Named(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub target_module: String,
    pub binding: ImportBinding,
}

/// The environment a single unit is analyzed against: its own resolved
/// imports, plus every module's export table (so `alias.member` accesses
/// can be validated without reaching back into the linker).
#[derive(Debug, Clone, Default)]
pub struct ModuleEnv {
    pub this_module: String,
    pub imports: Vec<ResolvedImport>,
    /// module name -> (export name -> type)
    pub exports: IndexMap<String, IndexMap<String, Type>>,
}

impl ModuleEnv {
    pub fn export_names(&self, module: &str) -> Option<Vec<&str>> {
        self.exports.get(module).map(|m| m.keys().map(|k| k.as_str()).collect())
    }

    pub fn export_type(&self, module: &str, name: &str) -> Option<&Type> {
        self.exports.get(module).and_then(|m| m.get(name))
    }

    /// Maps an alias bound by one of this unit's imports back to the
    /// target module it refers to, for `alias.member` validation.
    pub fn module_for_alias(&self, alias: &str) -> Option<&str> {
        self.imports.iter().find_map(|imp| match &imp.binding {
            ImportBinding::Alias(a) if a == alias => Some(imp.target_module.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Primitive, Type};

    fn env() -> ModuleEnv {
        let mut exports = IndexMap::new();
        let mut geometry = IndexMap::new();
        geometry.insert("area".to_string(), Type::Primitive(Primitive::Number));
        exports.insert("geometry".to_string(), geometry);
        ModuleEnv {
            this_module: "main".to_string(),
            imports: vec![ResolvedImport {
                target_module: "geometry".to_string(),
                binding: ImportBinding::Alias("geo".to_string()),
            }],
            exports,
        }
    }

    #[test]
    fn resolves_alias_to_module() {
        assert_eq!(env().module_for_alias("geo"), Some("geometry"));
        assert_eq!(env().module_for_alias("nope"), None);
    }

    #[test]
    fn looks_up_export_type_and_names() {
        let e = env();
        assert_eq!(e.export_type("geometry", "area"), Some(&Type::Primitive(Primitive::Number)));
        assert_eq!(e.export_type("geometry", "missing"), None);
        assert_eq!(e.export_names("geometry"), Some(vec!["area"]));
        assert_eq!(e.export_names("unknown_module"), None);
    }
}
