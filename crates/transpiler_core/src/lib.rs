//! The four-phase semantic pipeline: analyzer, type checker, optimizer,
//! module linker — plus the two public entry points, [`compile`] and
//! [`compile_modules`], that wire them together.
//!
//! Lexing, parsing, and low-level text emission live in `transpiler_syntax`
//! and [`emit`]; this crate owns everything that defines the language's
//! static semantics and the observable shape of the lowered output.

pub mod analysis;
pub mod checker;
pub mod emit;
pub mod linker;
pub mod module_env;
pub mod optimize;
pub mod types;

use transpiler_syntax::{parse, Diagnostics};

use optimize::PassToggles;

/// Which dialect of the target runtime the output is intended for. Both
/// variants currently share one emitter (see `emit`'s module doc); the
/// field exists so callers can already select one without a breaking change
/// once the dialects actually diverge (e.g. `require` path conventions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Luau,
    Lua,
}

/// Options recognized by [`compile`] / [`compile_modules`]. Unknown fields
/// simply don't exist here — the builder-style `with_*` setters are the
/// extension point, matching `§6`'s "unknown options are ignored" by never
/// giving callers anywhere to put one.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub target: Target,
    pub filename: Option<String>,
    pub enable: PassToggles,
    pub warnings_as_errors: bool,
    pub max_errors: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            target: Target::default(),
            filename: None,
            enable: PassToggles::default(),
            warnings_as_errors: false,
            max_errors: None,
        }
    }
}

impl CompileOptions {
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_enable(mut self, enable: PassToggles) -> Self {
        self.enable = enable;
        self
    }
}

fn finish_diagnostics(mut diags: Diagnostics, opts: &CompileOptions) -> Diagnostics {
    if opts.warnings_as_errors {
        diags.promote_warnings();
    }
    if let Some(max) = opts.max_errors {
        diags.truncate_errors(max);
    }
    diags
}

/// Parses, analyzes, type-checks, optimizes, and emits a single compilation
/// unit. Returns `(None, diagnostics)` on any error accumulated by parse,
/// analysis, or checking; the optimizer and emitter never run in that case.
pub fn compile(source: &str, opts: Option<CompileOptions>) -> (Option<String>, Diagnostics) {
    let opts = opts.unwrap_or_default();
    let mut diags = Diagnostics::new();

    let file = opts.filename.clone().map(|f| std::rc::Rc::from(f.as_str()));
    let program = match parse(source, file) {
        Ok(program) => program,
        Err(err) => {
            diags.error(Some(err.span.clone()), err.to_string(), vec![]);
            return (None, finish_diagnostics(diags, &opts));
        }
    };

    diags.merge(analysis::analyze(&program, None));
    diags.merge(checker::check(&program, None));

    if diags.has_errors() {
        return (None, finish_diagnostics(diags, &opts));
    }

    let optimized_body = optimize::run_all(program.body, opts.enable);
    let optimized = transpiler_syntax::ast::Program { body: optimized_body, ..program };
    let output = emit::emit_program(&optimized, opts.target, None);
    (Some(output), finish_diagnostics(diags, &opts))
}

/// Parses and links a set of named compilation units: export resolution,
/// import cycle detection, per-unit analysis/checking against the shared
/// module environment, then (gated on zero accumulated errors) per-unit
/// optimization and emission.
pub fn compile_modules(
    sources: &std::collections::BTreeMap<String, String>,
    opts: Option<CompileOptions>,
) -> (Option<std::collections::BTreeMap<String, String>>, Diagnostics) {
    let opts = opts.unwrap_or_default();
    linker::link(sources, &opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_straight_line_program() {
        let (out, diags) = compile("let x = 1\nreturn x\n", None);
        assert!(!diags.has_errors());
        let out = out.expect("expected emitted output");
        assert!(out.contains("local x = 1"));
        assert!(out.contains("return x"));
    }

    #[test]
    fn reports_use_before_assignment() {
        let (out, diags) = compile("let x\nreturn x\n", None);
        assert!(out.is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn narrowing_removes_possibly_nil_warning() {
        let src = "fn f(x) {\n  if x ~= nil {\n    return x\n  }\n  return 0\n}\n";
        let (out, diags) = compile(src, None);
        assert!(out.is_some());
        assert!(!diags.has_errors());
    }

    #[test]
    fn warnings_as_errors_fails_a_clean_warning_only_program() {
        let src = "fn f() {\n  let unused = 1\n  return 0\n}\n";
        let opts = CompileOptions::default();
        let (_, diags) = compile(src, Some(opts.clone()));
        assert!(!diags.has_errors(), "expected only a warning");

        let opts = CompileOptions { warnings_as_errors: true, ..opts };
        let (out, diags) = compile(src, Some(opts));
        assert!(out.is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn max_errors_truncates_error_count() {
        let src = "return a\nreturn b\nreturn c\n";
        let opts = CompileOptions { max_errors: Some(1), ..CompileOptions::default() };
        let (_, diags) = compile(src, Some(opts));
        assert!(diags.count_errors() <= 1);
    }

    #[test]
    fn compile_modules_links_a_two_unit_program() {
        let mut sources = std::collections::BTreeMap::new();
        sources.insert("geometry".to_string(), "module geometry\nexport fn area(w, h) {\n  return w * h\n}\n".to_string());
        sources.insert(
            "main".to_string(),
            "module main\nimport geometry.{area}\nfn run() {\n  return area(2, 3)\n}\n".to_string(),
        );
        let (out, diags) = compile_modules(&sources, None);
        assert!(!diags.has_errors());
        assert!(out.expect("linked output").contains_key("main"));
    }
}
