//! Identifier interning and fresh-name generation.
//!
//! Every identifier — source names, generated temporaries, generated struct
//! tags, string-literal bodies, and decimal-to-binary double
//! representations — is interned through the same table and referred to by
//! the opaque [`Ident`] token. No separate type distinguishes "real"
//! identifiers from interned string payloads; that distinction lives in how
//! callers use the token, mirroring the source toolchain's single
//! identifier space (see the shared-tag note in the data model).

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::fmt;

/// An opaque interned identifier token.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ident(u32);

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({})", self.0)
    }
}

/// A snapshot of the three monotonic counters, taken before a speculative
/// lowering walk and restored afterward so the throwaway walk consumes no
/// names. See the compound-assignment LHS re-walk in `cc_lower`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterSnapshot {
    label_count: u32,
    var_count: u32,
    struct_count: u32,
}

/// Owns the interning table and the fresh-name counters for one translation
/// unit. Lives at least as long as the frontend context.
pub struct IdentContext {
    strings: IndexSet<String>,
    by_str: FxHashMap<String, Ident>,
    label_count: u32,
    var_count: u32,
    struct_count: u32,
}

impl Default for IdentContext {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentContext {
    pub fn new() -> Self {
        IdentContext {
            strings: IndexSet::new(),
            by_str: FxHashMap::default(),
            label_count: 0,
            var_count: 0,
            struct_count: 0,
        }
    }

    /// Interns `s`, returning the existing token if already interned.
    pub fn intern(&mut self, s: &str) -> Ident {
        if let Some(id) = self.by_str.get(s) {
            return *id;
        }
        let (idx, _) = self.strings.insert_full(s.to_owned());
        let id = Ident(idx as u32);
        self.by_str.insert(s.to_owned(), id);
        id
    }

    pub fn resolve(&self, id: Ident) -> &str {
        self.strings.get_index(id.0 as usize).expect("Ident not present in interner")
    }

    /// Mints a fresh loop/switch/short-circuit label, e.g. `.Lwhile_start.3`.
    pub fn fresh_label(&mut self, prefix: &str) -> Ident {
        let n = self.label_count;
        self.label_count += 1;
        self.intern(&format!("{prefix}.{n}"))
    }

    /// Mints a fresh temporary variable name, e.g. `tmp.7`.
    pub fn fresh_var(&mut self, prefix: &str) -> Ident {
        let n = self.var_count;
        self.var_count += 1;
        self.intern(&format!("{prefix}.{n}"))
    }

    /// Mints a fresh struct/union tag, e.g. `struct.2`.
    pub fn fresh_struct_tag(&mut self) -> Ident {
        let n = self.struct_count;
        self.struct_count += 1;
        self.intern(&format!("struct.{n}"))
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            label_count: self.label_count,
            var_count: self.var_count,
            struct_count: self.struct_count,
        }
    }

    pub fn restore(&mut self, snap: CounterSnapshot) {
        self.label_count = snap.label_count;
        self.var_count = snap.var_count;
        self.struct_count = snap.struct_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_deduplicated() {
        let mut ctx = IdentContext::new();
        let a = ctx.intern("foo");
        let b = ctx.intern("foo");
        let c = ctx.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(ctx.resolve(a), "foo");
    }

    #[test]
    fn fresh_names_are_monotonic_and_unique() {
        let mut ctx = IdentContext::new();
        let t0 = ctx.fresh_var("tmp");
        let t1 = ctx.fresh_var("tmp");
        assert_ne!(t0, t1);
        assert_eq!(ctx.resolve(t0), "tmp.0");
        assert_eq!(ctx.resolve(t1), "tmp.1");
    }

    #[test]
    fn snapshot_restore_rolls_back_counters_not_the_table() {
        let mut ctx = IdentContext::new();
        let _ = ctx.fresh_var("tmp");
        let snap = ctx.snapshot();
        let _throwaway = ctx.fresh_var("tmp");
        ctx.restore(snap);
        let next = ctx.fresh_var("tmp");
        // After restore, the counter is reused: this name collides with the
        // throwaway one, exactly as the speculative-walk discipline requires
        // (the throwaway lowering's instructions are discarded, so the name
        // clash never becomes observable).
        assert_eq!(ctx.resolve(next), "tmp.1");
    }
}
