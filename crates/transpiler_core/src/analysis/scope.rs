//! Scopes and per-local analyzer state.
//!
//! Scopes form a linear stack accessed by lookup, never a tree of shared
//! nodes. Control-flow joins are implemented by snapshotting the stack
//! before a branch and merging the snapshots back afterward — never by
//! sharing `Rc<RefCell<_>>` state between branches.

use indexmap::IndexMap;
use transpiler_syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nilness {
    NonNil,
    MaybeNil,
    Unknown,
}

impl Nilness {
    /// Lattice join used at control-flow merge points: `non_nil ∧ non_nil
    /// → non_nil`; any `unknown` → `unknown`; else `maybe_nil`.
    pub fn join(self, other: Nilness) -> Nilness {
        match (self, other) {
            (Nilness::NonNil, Nilness::NonNil) => Nilness::NonNil,
            (Nilness::Unknown, _) | (_, Nilness::Unknown) => Nilness::Unknown,
            _ => Nilness::MaybeNil,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalInfo {
    pub used: bool,
    pub assigned: bool,
    pub nilness: Nilness,
    pub type_name: Option<String>,
    pub decl_span: Span,
    /// True for struct/enum/function names, which are declarations rather
    /// than bindings a reader is expected to consume — they never trigger
    /// the "unused local" warning.
    pub skip_unused_check: bool,
}

impl LocalInfo {
    pub fn new(assigned: bool, nilness: Nilness, type_name: Option<String>, decl_span: Span) -> Self {
        Self { used: false, assigned, nilness, type_name, decl_span, skip_unused_check: false }
    }

    pub fn declaration_like(nilness: Nilness, decl_span: Span) -> Self {
        Self { used: false, assigned: true, nilness, type_name: None, decl_span, skip_unused_check: true }
    }
}

/// One level of lexical scope. `locals` is insertion-ordered so "unused
/// local" warnings are reported in a deterministic, declaration order.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub locals: IndexMap<String, LocalInfo>,
    pub enum_items: IndexMap<String, Vec<String>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The analyzer's scope stack: a `Vec`, not a tree of shared nodes.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { scopes: vec![Scope::new()] }
    }

    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop(&mut self) -> Scope {
        self.scopes.pop().expect("scope stack underflow")
    }

    pub fn current(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("empty scope stack")
    }

    /// Finds a local by walking from the innermost scope outward, returning
    /// the index of the owning scope (for mutation) along with a clone-free
    /// reference.
    pub fn find(&self, name: &str) -> Option<(usize, &LocalInfo)> {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if let Some(info) = scope.locals.get(name) {
                return Some((i, info));
            }
        }
        None
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut LocalInfo> {
        for scope in self.scopes.iter_mut().rev() {
            if scope.locals.contains_key(name) {
                return scope.locals.get_mut(name);
            }
        }
        None
    }

    /// True if `name` is declared in the *current* (innermost) scope only —
    /// used for the "re-declaring a name in the same scope is an error" rule.
    pub fn declared_in_current(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.locals.contains_key(name))
    }

    /// True if `name` shadows a binding in any ancestor scope (not the
    /// current one) — used for the shadowing warning.
    pub fn shadows_ancestor(&self, name: &str) -> bool {
        self.scopes[..self.scopes.len() - 1].iter().any(|s| s.locals.contains_key(name))
    }

    pub fn enum_items(&self, name: &str) -> Option<&Vec<String>> {
        self.scopes.iter().rev().find_map(|s| s.enum_items.get(name))
    }

    pub fn declare_enum(&mut self, name: String, items: Vec<String>) {
        self.current().enum_items.insert(name, items);
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Clones the full stack so a branch can be explored and then discarded
    /// or merged back in, without the branch's effects leaking into sibling
    /// branches.
    pub fn snapshot(&self) -> Vec<Scope> {
        self.scopes.clone()
    }

    pub fn restore(&mut self, snapshot: Vec<Scope>) {
        self.scopes = snapshot;
    }
}

/// Merges the outcomes of several mutually exclusive branches (the arms of
/// an `if`/`elseif`/`else`, or a loop body against its zero-iteration case)
/// back into one stack. All snapshots must share the same shape as the
/// baseline they were cloned from: same scope count, same local names per
/// scope. `assigned` joins by AND (assigned on every arm), `nilness` joins
/// by the lattice rule, and `used` joins by OR (read in any arm counts as
/// read overall).
pub fn join_scope_snapshots(branches: &[Vec<Scope>]) -> Vec<Scope> {
    assert!(!branches.is_empty(), "cannot join zero branches");
    let base = &branches[0];
    let mut merged = base.clone();
    for (scope_idx, scope) in merged.iter_mut().enumerate() {
        for (name, info) in scope.locals.iter_mut() {
            let mut assigned = true;
            let mut used = false;
            let mut nilness = None;
            for branch in branches {
                let other = &branch[scope_idx].locals[name];
                assigned &= other.assigned;
                used |= other.used;
                nilness = Some(match nilness {
                    None => other.nilness,
                    Some(acc) => Nilness::join(acc, other.nilness),
                });
            }
            info.assigned = assigned;
            info.used = used;
            if let Some(n) = nilness {
                info.nilness = n;
            }
        }
    }
    merged
}
