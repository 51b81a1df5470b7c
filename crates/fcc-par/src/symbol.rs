//! Symbols and the symbol arena.
//!
//! Every declared entity is a `Symbol` in a single arena addressed by
//! `SymbolId`; type structure (pointer targets, array elements, function
//! returns, alias targets) is expressed through `base_type` links rather
//! than ownership, so shared canonical types like the builtin `int` have
//! exactly one symbol.

use std::fmt;
use std::ops::{Index, IndexMut};

use fcc_util::define_idx;

use crate::ast::{Node, NodeKind};
use crate::scope::{Namespace, ScopeId, Scopes};

define_idx!(SymbolId);

/// Symbol variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymKind {
    /// Builtin scalar type (`void`, `int`, `double`, `char`).
    ScalarType,
    /// typedef name; `base_type` is the aliased type.
    TypeAlias,
    Struct,
    Union,
    Enum,
    /// Enumeration constant; `expr` holds the synthesized value node.
    EnumConst,
    Pointer,
    Array,
    /// `base_type` is the return type, `members` the parameter scope.
    Function,
    Variable,
    GlobalVariable,
    Field,
    Parameter,
}

/// Symbol flag set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SymFlags(u8);

impl SymFlags {
    pub const VARIADIC: SymFlags = SymFlags(1 << 0);
    pub const STATIC: SymFlags = SymFlags(1 << 1);
    pub const EXTERN: SymFlags = SymFlags(1 << 2);
    /// Declared tag whose body has not been seen yet.
    pub const INCOMPLETE: SymFlags = SymFlags(1 << 3);

    pub fn empty() -> SymFlags {
        SymFlags(0)
    }

    pub fn contains(self, other: SymFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: SymFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: SymFlags) {
        self.0 &= !other.0;
    }
}

/// One declared entity.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub kind: SymKind,
    /// Declared or synthesized name (`@arg7`, `@struct3`); `None` for
    /// anonymous type structure like pointer links.
    pub name: Option<String>,
    /// Pointer target, array element, function return, variable type, or
    /// alias target.
    pub base_type: Option<SymbolId>,
    /// Array size expression, enum constant value, variable initializer,
    /// or function body.
    pub expr: Option<Node>,
    /// Field scope for struct/union, parameter scope for functions.
    pub members: Option<ScopeId>,
    pub flags: SymFlags,
    /// Storage size in bytes.
    pub size: i32,
    /// Offset within the frame (locals, parameters) or aggregate (fields).
    pub offset: i32,
    /// Total local-variable bytes; functions only.
    pub locals_size: i32,
    /// Assembly label id, assigned lazily on first emission; 0 means not
    /// yet assigned.
    pub label: u32,
}

impl Symbol {
    pub fn new(kind: SymKind) -> Symbol {
        Symbol {
            kind,
            name: None,
            base_type: None,
            expr: None,
            members: None,
            flags: SymFlags::empty(),
            size: 0,
            offset: 0,
            locals_size: 0,
            label: 0,
        }
    }

    pub fn named(kind: SymKind, name: impl Into<String>) -> Symbol {
        Symbol {
            name: Some(name.into()),
            ..Symbol::new(kind)
        }
    }

    /// Name for diagnostics and the symbol-table printer.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.kind, self.display_name())
    }
}

/// The symbol arena.
///
/// Builtins occupy fixed slots installed by [`install_builtins`]; they are
/// referenced by the `SymbolId` constants below throughout the parser and
/// the code generator.
#[derive(Debug, Default)]
pub struct Syms {
    symbols: Vec<Symbol>,
}

impl Syms {
    pub const VOID: SymbolId = SymbolId(0);
    pub const INT: SymbolId = SymbolId(1);
    pub const DOUBLE: SymbolId = SymbolId(2);
    pub const CHAR: SymbolId = SymbolId(3);
    pub const CHAR_PTR: SymbolId = SymbolId(4);
    pub const PRINTF: SymbolId = SymbolId(5);

    pub fn new() -> Syms {
        Syms {
            symbols: Vec::new(),
        }
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Index<SymbolId> for Syms {
    type Output = Symbol;

    fn index(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }
}

impl IndexMut<SymbolId> for Syms {
    fn index_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }
}

/// Installs the builtin types and the `printf` declaration into the root
/// scope.
///
/// Must run on a fresh arena: the allocation order pins the `SymbolId`
/// constants. `float` deliberately resolves to the `double` symbol.
pub fn install_builtins(syms: &mut Syms, scopes: &mut Scopes) {
    debug_assert!(syms.is_empty());

    let mut scalar = |syms: &mut Syms, name: &str, size: i32| {
        let mut symbol = Symbol::named(SymKind::ScalarType, name);
        symbol.size = size;
        let id = syms.alloc(symbol);
        scopes.put(name, Namespace::Name, id);
        id
    };

    let void = scalar(syms, "void", 0);
    let int = scalar(syms, "int", 4);
    let double = scalar(syms, "double", 8);
    let char_ty = scalar(syms, "char", 1);
    scopes.put("float", Namespace::Name, double);

    let mut char_ptr_sym = Symbol::new(SymKind::Pointer);
    char_ptr_sym.base_type = Some(char_ty);
    char_ptr_sym.size = syms[int].size;
    let char_ptr = syms.alloc(char_ptr_sym);

    let mut printf = Symbol::named(SymKind::Function, "printf");
    printf.base_type = Some(void);
    let mut flags = SymFlags::empty();
    flags.insert(SymFlags::EXTERN);
    flags.insert(SymFlags::VARIADIC);
    printf.flags = flags;
    let param_scope = scopes.alloc();
    printf.members = Some(param_scope);
    let printf_id = syms.alloc(printf);
    scopes.put("printf", Namespace::Name, printf_id);

    let mut message = Symbol::named(SymKind::Parameter, "message");
    message.base_type = Some(char_ptr);
    let message_id = syms.alloc(message);
    scopes.get_mut(param_scope).set("message", Namespace::Name, message_id);

    debug_assert_eq!(void, Syms::VOID);
    debug_assert_eq!(int, Syms::INT);
    debug_assert_eq!(double, Syms::DOUBLE);
    debug_assert_eq!(char_ty, Syms::CHAR);
    debug_assert_eq!(char_ptr, Syms::CHAR_PTR);
    debug_assert_eq!(printf_id, Syms::PRINTF);
}

/// The result of a successful translation-unit parse: the arenas plus the
/// file-scope id. Builtins live in the root scope underneath.
#[derive(Debug)]
pub struct TranslationUnit {
    pub syms: Syms,
    pub scopes: Scopes,
    pub file_scope: ScopeId,
}

impl TranslationUnit {
    /// Integer value of a symbol's constant expression, if it is a plain
    /// literal (array sizes, enum constants).
    pub fn const_value(&self, id: SymbolId) -> Option<i32> {
        match &self.syms[id].expr {
            Some(Node {
                kind: NodeKind::Int(value),
                ..
            }) => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_installation() {
        let mut syms = Syms::new();
        let mut scopes = Scopes::new();
        install_builtins(&mut syms, &mut scopes);

        assert_eq!(syms[Syms::INT].size, 4);
        assert_eq!(syms[Syms::CHAR].size, 1);
        assert_eq!(syms[Syms::DOUBLE].size, 8);
        assert_eq!(syms[Syms::VOID].size, 0);
        assert_eq!(syms[Syms::CHAR_PTR].base_type, Some(Syms::CHAR));

        // float and double share one canonical symbol.
        assert_eq!(
            scopes.lookup("float", Namespace::Name),
            scopes.lookup("double", Namespace::Name)
        );

        let printf = &syms[Syms::PRINTF];
        assert!(printf.flags.contains(SymFlags::VARIADIC));
        assert!(printf.flags.contains(SymFlags::EXTERN));
        assert_eq!(scopes.get(printf.members.unwrap()).len(), 1);
    }

    #[test]
    fn test_flags() {
        let mut flags = SymFlags::empty();
        flags.insert(SymFlags::EXTERN);
        assert!(flags.contains(SymFlags::EXTERN));
        assert!(!flags.contains(SymFlags::STATIC));
        flags.insert(SymFlags::INCOMPLETE);
        flags.remove(SymFlags::EXTERN);
        assert!(!flags.contains(SymFlags::EXTERN));
        assert!(flags.contains(SymFlags::INCOMPLETE));
    }
}
