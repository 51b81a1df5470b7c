//! Scopes and the active-scope stack.
//!
//! Every scope is an insertion-ordered map keyed by (name, namespace);
//! iteration order is load-bearing: parameters lay out left to right and
//! struct fields in declaration order. Scopes live in an arena for the
//! lifetime of the parse result; the stack only tracks which of them are
//! currently open.

use fcc_util::{define_idx, FxIndexMap};

use crate::symbol::SymbolId;

define_idx!(ScopeId);

/// Maximum number of simultaneously open scopes.
pub const MAX_SCOPE_DEPTH: usize = 255;

/// Disjoint key spaces within a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Ordinary identifiers: variables, functions, typedefs, enum
    /// constants.
    Name,
    /// struct/union/enum tags.
    Tag,
    /// Statement labels.
    Label,
}

/// One lexical scope.
#[derive(Debug, Default)]
pub struct Scope {
    entries: FxIndexMap<(String, Namespace), SymbolId>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    pub fn get(&self, name: &str, ns: Namespace) -> Option<SymbolId> {
        self.entries.get(&(name.to_string(), ns)).copied()
    }

    /// Inserts or overwrites a binding.
    pub fn set(&mut self, name: &str, ns: Namespace, symbol: SymbolId) {
        self.entries.insert((name.to_string(), ns), symbol);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Namespace, SymbolId)> {
        self.entries
            .iter()
            .map(|((name, ns), sym)| (name.as_str(), *ns, *sym))
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.entries.values().copied()
    }
}

/// The scope arena plus the stack of currently open scopes.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
}

impl Scopes {
    /// Creates the arena with the root scope open.
    pub fn new() -> Scopes {
        Scopes {
            scopes: vec![Scope::new()],
            stack: vec![ScopeId(0)],
        }
    }

    pub fn root() -> ScopeId {
        ScopeId(0)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Allocates a scope without opening it.
    pub fn alloc(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new());
        id
    }

    /// Allocates a fresh scope and pushes it onto the stack.
    ///
    /// Fails when the stack is at [`MAX_SCOPE_DEPTH`].
    pub fn enter(&mut self) -> Option<ScopeId> {
        let id = self.alloc();
        self.enter_existing(id).then_some(id)
    }

    /// Re-opens an existing scope (function bodies re-enter the parameter
    /// scope).
    pub fn enter_existing(&mut self, id: ScopeId) -> bool {
        if self.stack.len() >= MAX_SCOPE_DEPTH {
            return false;
        }
        self.stack.push(id);
        true
    }

    /// Closes the innermost scope. The scope itself stays in the arena.
    pub fn exit(&mut self) {
        debug_assert!(self.stack.len() > 1);
        self.stack.pop();
    }

    pub fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack is never empty")
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Inserts a binding into the innermost open scope.
    pub fn put(&mut self, name: &str, ns: Namespace, symbol: SymbolId) {
        let current = self.current();
        self.get_mut(current).set(name, ns, symbol);
    }

    /// Looks a name up, walking outward through the open scopes.
    pub fn lookup(&self, name: &str, ns: Namespace) -> Option<SymbolId> {
        self.stack
            .iter()
            .rev()
            .find_map(|&id| self.get(id).get(name, ns))
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
