//! Fresh-name allocation shared by the passes that introduce new bindings.
//!
//! Owned by a single `PassState` threaded through each pass function, never
//! global/static, so output is deterministic regardless of how many times a
//! compile is repeated (`§9` "Optimizer rewriting discipline").

#[derive(Debug, Default)]
pub struct PassState {
    hoist_counter: u32,
    cache_counter: u32,
    alias_counter: u32,
}

impl PassState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_hoist(&mut self) -> String {
        let name = format!("_hoisted{}", self.hoist_counter);
        self.hoist_counter += 1;
        name
    }

    pub fn fresh_cache(&mut self) -> String {
        let name = format!("_cache{}", self.cache_counter);
        self.cache_counter += 1;
        name
    }

    pub fn fresh_alias(&mut self) -> String {
        let name = format!("_alias{}", self.alias_counter);
        self.alias_counter += 1;
        name
    }
}
