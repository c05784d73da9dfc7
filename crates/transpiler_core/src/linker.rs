//! Multi-unit compilation: export resolution, import graph validation,
//! cycle detection, and per-unit analysis/checking/emission.
//!
//! The moral equivalent of a module loader: nothing here parses or emits
//! itself (both are delegated to `transpiler_syntax::parse` and
//! `crate::emit`), it only resolves how units see each other before handing
//! each one, individually, to the same single-unit pipeline `compile` uses.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use transpiler_syntax::ast::{ImportKind, Program};
use transpiler_syntax::{parse, Diagnostics};

use crate::checker::{self, build_export_signature};
use crate::module_env::{ImportBinding, ModuleEnv, ResolvedImport};
use crate::{analysis, emit, optimize, CompileOptions};

pub fn link(
    sources: &BTreeMap<String, String>,
    opts: &CompileOptions,
) -> (Option<BTreeMap<String, String>>, Diagnostics) {
    let mut diags = Diagnostics::new();

    // Step 1-2: parse every unit, require a matching `module N` header.
    let mut programs: BTreeMap<String, Program> = BTreeMap::new();
    for (name, source) in sources {
        let file = std::rc::Rc::from(name.as_str());
        match parse(source, Some(file)) {
            Ok(program) => {
                match &program.module {
                    Some((declared, _)) if declared == name => {}
                    Some((declared, span)) => {
                        diags.error(
                            Some(span.clone()),
                            format!("Module name mismatch: expected '{name}', found '{declared}'"),
                            vec![],
                        );
                    }
                    None => {
                        diags.error(None, format!("Missing module declaration in '{name}'"), vec![]);
                    }
                }
                programs.insert(name.clone(), program);
            }
            Err(err) => {
                diags.error(Some(err.span.clone()), format!("{name}: {err}"), vec![]);
            }
        }
    }

    if diags.has_errors() {
        return (None, super::finish_diagnostics(diags, opts));
    }

    // Step 3: per-module export tables.
    let mut exports: IndexMap<String, IndexMap<String, crate::types::Type>> = IndexMap::new();
    for (name, program) in &programs {
        let (table, dupes) = build_export_signature(program);
        for dup in dupes {
            diags.error(None, format!("Duplicate export '{dup}' in module '{name}'"), vec![]);
        }
        exports.insert(name.clone(), table);
    }

    // Step 4: import graph, with named/whole import validation.
    let mut graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut resolved_imports: BTreeMap<String, Vec<ResolvedImport>> = BTreeMap::new();
    for (name, program) in &programs {
        let mut edges = Vec::new();
        let mut unit_imports = Vec::new();
        let mut seen_named = std::collections::HashSet::new();
        let mut bound_aliases = std::collections::HashSet::new();

        for import in &program.imports {
            let target = &import.module_path;
            if !sources.contains_key(target) {
                diags.error(Some(import.span.clone()), format!("unknown module '{target}'"), vec![]);
                continue;
            }
            edges.push(target.clone());

            match &import.kind {
                ImportKind::Named { names } => {
                    for n in names {
                        if !seen_named.insert(n.clone()) {
                            diags.error(Some(import.span.clone()), format!("duplicate import name '{n}'"), vec![]);
                            continue;
                        }
                        if !exports.get(target).map(|e| e.contains_key(n)).unwrap_or(false) {
                            diags.error(
                                Some(import.span.clone()),
                                format!("Module '{target}' does not export '{n}'"),
                                vec![],
                            );
                        }
                    }
                    unit_imports.push(ResolvedImport {
                        target_module: target.clone(),
                        binding: ImportBinding::Named(names.clone()),
                    });
                }
                ImportKind::Whole { alias } => {
                    let alias = alias.clone().unwrap_or_else(|| last_segment(target).to_string());
                    if !bound_aliases.insert(alias.clone()) || local_name_collides(program, &alias) {
                        diags.error(
                            Some(import.span.clone()),
                            format!("name collision between import and local '{alias}'"),
                            vec![],
                        );
                    }
                    unit_imports.push(ResolvedImport { target_module: target.clone(), binding: ImportBinding::Alias(alias) });
                }
            }
        }
        graph.insert(name.clone(), edges);
        resolved_imports.insert(name.clone(), unit_imports);
    }

    if diags.has_errors() {
        return (None, super::finish_diagnostics(diags, opts));
    }

    // Step 5: three-color DFS cycle detection, sorted for determinism.
    if let Some(cycle) = find_cycle(&graph) {
        diags.error(None, format!("Circular import detected: {}", cycle.join(" -> ")), vec![]);
        return (None, super::finish_diagnostics(diags, opts));
    }

    // Step 6-7: build each unit's environment, run analyzer + checker.
    for (name, program) in &programs {
        let env = ModuleEnv {
            this_module: name.clone(),
            imports: resolved_imports.get(name).cloned().unwrap_or_default(),
            exports: exports.clone(),
        };
        diags.merge(analysis::analyze(program, Some(&env)));
        diags.merge(checker::check(program, Some(&env)));
    }

    if diags.has_errors() {
        return (None, super::finish_diagnostics(diags, opts));
    }

    // Step 8: emit every unit.
    let mut outputs = BTreeMap::new();
    for (name, program) in &programs {
        let env = ModuleEnv {
            this_module: name.clone(),
            imports: resolved_imports.get(name).cloned().unwrap_or_default(),
            exports: exports.clone(),
        };
        let optimized_body = optimize::run_all(program.body.clone(), opts.enable);
        let optimized = Program { body: optimized_body, module: program.module.clone(), imports: program.imports.clone() };
        outputs.insert(name.clone(), emit::emit_program(&optimized, opts.target, Some(&env)));
    }

    (Some(outputs), super::finish_diagnostics(diags, opts))
}

fn last_segment(dotted: &str) -> &str {
    dotted.rsplit('.').next().unwrap_or(dotted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn links_two_modules_with_named_import() {
        let srcs = sources(&[
            ("geometry", "module geometry\nexport fn area(w, h) {\n  return w * h\n}\n"),
            ("main", "module main\nimport geometry.{area}\nfn run() {\n  return area(2, 3)\n}\n"),
        ]);
        let (out, diags) = link(&srcs, &CompileOptions::default());
        assert!(!diags.has_errors(), "{:?}", diags);
        let out = out.expect("expected linked output");
        assert!(out.contains_key("geometry"));
        assert!(out["main"].contains("require(\"geometry\")"));
    }

    #[test]
    fn detects_circular_import() {
        let srcs = sources(&[
            ("a", "module a\nimport b\nfn f() {\n  return 1\n}\n"),
            ("b", "module b\nimport a\nfn g() {\n  return 2\n}\n"),
        ]);
        let (out, diags) = link(&srcs, &CompileOptions::default());
        assert!(out.is_none());
        assert!(diags.has_errors());
        assert!(diags.format().contains("Circular import"));
    }

    #[test]
    fn reports_unknown_export() {
        let srcs = sources(&[
            ("geometry", "module geometry\nfn area(w, h) {\n  return w * h\n}\n"),
            ("main", "module main\nimport geometry.{area}\nfn run() {\n  return area(2, 3)\n}\n"),
        ]);
        let (out, diags) = link(&srcs, &CompileOptions::default());
        assert!(out.is_none());
        assert!(diags.format().contains("does not export"));
    }

    #[test]
    fn reports_module_name_mismatch() {
        let srcs = sources(&[("geometry", "module wrong_name\nfn f() {\n  return 1\n}\n")]);
        let (out, diags) = link(&srcs, &CompileOptions::default());
        assert!(out.is_none());
        assert!(diags.format().contains("Module name mismatch"));
    }

    #[test]
    fn finds_no_cycle_in_dag() {
        let mut graph = BTreeMap::new();
        graph.insert("a".to_string(), vec!["b".to_string()]);
        graph.insert("b".to_string(), vec!["c".to_string()]);
        graph.insert("c".to_string(), vec![]);
        assert!(find_cycle(&graph).is_none());
    }
}

fn local_name_collides(program: &Program, name: &str) -> bool {
    use transpiler_syntax::ast::Stmt;
    program.body.iter().any(|s| match s {
        Stmt::Let { name: n, .. } | Stmt::Function { name: n, .. } | Stmt::Struct { name: n, .. } | Stmt::Enum { name: n, .. } => {
            n == name
        }
        _ => false,
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS over the import graph, iterated in sorted (`BTreeMap`)
/// order so the reported cycle is deterministic regardless of how the
/// caller's source map was built.
fn find_cycle(graph: &BTreeMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut color: BTreeMap<&str, Color> = graph.keys().map(|k| (k.as_str(), Color::White)).collect();
    let mut path: Vec<String> = Vec::new();

    fn visit<'a>(
        node: &'a str,
        graph: &'a BTreeMap<String, Vec<String>>,
        color: &mut BTreeMap<&'a str, Color>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        color.insert(node, Color::Gray);
        path.push(node.to_string());
        if let Some(edges) = graph.get(node) {
            for next in edges {
                match color.get(next.as_str()).copied().unwrap_or(Color::White) {
                    Color::White => {
                        if let Some(cycle) = visit(next.as_str(), graph, color, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Gray => {
                        let start = path.iter().position(|n| n == next).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(next.clone());
                        return Some(cycle);
                    }
                    Color::Black => {}
                }
            }
        }
        path.pop();
        color.insert(node, Color::Black);
        None
    }

    for node in graph.keys() {
        if color.get(node.as_str()).copied() == Some(Color::White) {
            if let Some(cycle) = visit(node, graph, &mut color, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}
