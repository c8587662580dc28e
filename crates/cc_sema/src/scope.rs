//! The two parallel scope stacks (identifiers, struct tags) plus the
//! extern-redeclaration map, all with a scope-guard idiom so every push is
//! matched by a pop on every exit path (spec §9's "scoped resources" note).

use cc_ident::Ident;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct ScopeStack {
    identifier_maps: Vec<FxHashMap<Ident, Ident>>,
    struct_maps: Vec<FxHashMap<Ident, (Ident, bool)>>,
    /// Shallowest scope depth at which an identifier was declared `extern`,
    /// so a deeper `extern` redeclaration can resolve to the same global.
    extern_scope_map: FxHashMap<Ident, usize>,
}

/// Releases the scope it was handed back when dropped, on every exit path
/// including an early `?` return.
pub struct ScopeGuard<'a> {
    stack: &'a mut ScopeStack,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.stack.identifier_maps.pop();
        self.stack.struct_maps.pop();
    }
}

impl ScopeStack {
    /// A fresh stack with file scope already pushed; file scope is never
    /// popped for the lifetime of the analyzer.
    pub fn new() -> Self {
        let mut s = ScopeStack::default();
        s.identifier_maps.push(FxHashMap::default());
        s.struct_maps.push(FxHashMap::default());
        s
    }

    #[must_use]
    pub fn enter(&mut self) -> ScopeGuard<'_> {
        self.identifier_maps.push(FxHashMap::default());
        self.struct_maps.push(FxHashMap::default());
        ScopeGuard { stack: self }
    }

    /// Unguarded counterpart to `enter`/`ScopeGuard::drop`, for callers whose
    /// matching `pop` happens across a recursive `&mut self` call and so
    /// cannot hold a borrowing guard open (the analyzer's recursive descent).
    pub fn push(&mut self) {
        self.identifier_maps.push(FxHashMap::default());
        self.struct_maps.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        self.identifier_maps.pop();
        self.struct_maps.pop();
    }

    pub fn depth(&self) -> usize {
        self.identifier_maps.len()
    }

    pub fn is_file_scope(&self) -> bool {
        self.depth() == 1
    }

    pub fn declare_identifier(&mut self, source: Ident, resolved: Ident) {
        self.identifier_maps.last_mut().expect("file scope always present").insert(source, resolved);
    }

    pub fn top_scope_has(&self, source: Ident) -> bool {
        self.identifier_maps.last().expect("file scope always present").contains_key(&source)
    }

    pub fn resolve_identifier(&self, source: Ident) -> Option<Ident> {
        self.identifier_maps.iter().rev().find_map(|m| m.get(&source).copied())
    }

    pub fn record_extern(&mut self, source: Ident) {
        self.extern_scope_map.entry(source).or_insert_with(|| self.identifier_maps.len());
    }

    pub fn extern_depth(&self, source: Ident) -> Option<usize> {
        self.extern_scope_map.get(&source).copied()
    }

    pub fn declare_struct_tag(&mut self, tag: Ident, resolved: Ident, is_union: bool) {
        self.struct_maps.last_mut().expect("file scope always present").insert(tag, (resolved, is_union));
    }

    pub fn top_struct_tag(&self, tag: Ident) -> Option<(Ident, bool)> {
        self.struct_maps.last().expect("file scope always present").get(&tag).copied()
    }

    pub fn resolve_struct_tag(&self, tag: Ident) -> Option<(Ident, bool)> {
        self.struct_maps.iter().rev().find_map(|m| m.get(&tag).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scope_shadows_then_releases_on_guard_drop() {
        let mut ctx = cc_ident::IdentContext::new();
        let x_src = ctx.intern("x");
        let x_outer = ctx.intern("x.resolved.0");
        let x_inner = ctx.intern("x.resolved.1");

        let mut stack = ScopeStack::new();
        stack.declare_identifier(x_src, x_outer);
        {
            let _guard = stack.enter();
            stack.declare_identifier(x_src, x_inner);
            assert_eq!(stack.resolve_identifier(x_src), Some(x_inner));
        }
        assert_eq!(stack.resolve_identifier(x_src), Some(x_outer));
    }

    #[test]
    fn struct_tag_minted_in_nested_scope_does_not_leak_outward() {
        let mut ctx = cc_ident::IdentContext::new();
        let s = ctx.intern("S");
        let s_outer = ctx.intern("struct.0");
        let s_inner = ctx.intern("struct.1");

        let mut stack = ScopeStack::new();
        stack.declare_struct_tag(s, s_outer, false);
        {
            let _guard = stack.enter();
            stack.declare_struct_tag(s, s_inner, false);
            assert_eq!(stack.resolve_struct_tag(s), Some((s_inner, false)));
        }
        assert_eq!(stack.resolve_struct_tag(s), Some((s_outer, false)));
    }
}
