//! Type predicates, structural compatibility, and implicit conversions.
//!
//! Scalar types are nominal (compatibility is identity of the canonical
//! symbol); pointers and functions are structural; struct/union
//! compatibility recurses over members in declaration order.

use crate::ast::{Node, NodeKind};
use crate::scope::{ScopeId, Scopes};
use crate::symbol::{SymKind, SymbolId, Syms};

/// Walks typedef aliases and variable/field/parameter wrappers down to the
/// canonical type symbol.
pub fn resolve_alias(syms: &Syms, mut id: SymbolId) -> SymbolId {
    loop {
        let symbol = &syms[id];
        let is_wrapper = symbol.kind == SymKind::TypeAlias || is_var_symbol(symbol.kind);
        match (is_wrapper, symbol.base_type) {
            (true, Some(base)) => id = base,
            _ => return id,
        }
    }
}

pub fn is_var_symbol(kind: SymKind) -> bool {
    matches!(
        kind,
        SymKind::Variable | SymKind::GlobalVariable | SymKind::Field | SymKind::Parameter
    )
}

pub fn is_type_symbol(kind: SymKind) -> bool {
    matches!(
        kind,
        SymKind::ScalarType
            | SymKind::TypeAlias
            | SymKind::Struct
            | SymKind::Union
            | SymKind::Enum
            | SymKind::Array
            | SymKind::Pointer
    )
}

pub fn is_ptr_type(kind: SymKind) -> bool {
    matches!(kind, SymKind::Pointer | SymKind::Array)
}

pub fn is_struct_type(kind: SymKind) -> bool {
    matches!(kind, SymKind::Struct | SymKind::Union)
}

/// Collapses declaration-only distinctions: variables of all storage
/// kinds compare as variables, arrays compare as pointers.
fn generic_kind(kind: SymKind) -> SymKind {
    match kind {
        SymKind::Parameter | SymKind::GlobalVariable | SymKind::Field => SymKind::Variable,
        SymKind::Array => SymKind::Pointer,
        other => other,
    }
}

/// Whether the expression type is usable where an `int` is expected
/// (plain `int`, `char`, or an enum constant).
pub fn is_int_like(syms: &Syms, id: SymbolId) -> bool {
    let resolved = resolve_alias(syms, id);
    resolved == Syms::INT
        || resolved == Syms::CHAR
        || syms[resolved].kind == SymKind::EnumConst
}

fn is_compatible_scope(syms: &Syms, scopes: &Scopes, s1: ScopeId, s2: ScopeId) -> bool {
    let a = scopes.get(s1);
    let b = scopes.get(s2);
    if a.len() != b.len() {
        return false;
    }
    a.symbols()
        .zip(b.symbols())
        .all(|(x, y)| is_compatible(syms, scopes, x, y))
}

/// Structural type compatibility.
pub fn is_compatible(syms: &Syms, scopes: &Scopes, s1: SymbolId, s2: SymbolId) -> bool {
    let s1 = resolve_alias(syms, s1);
    let s2 = resolve_alias(syms, s2);

    let t1 = generic_kind(syms[s1].kind);
    let t2 = generic_kind(syms[s2].kind);

    if t1 == SymKind::ScalarType && t2 == SymKind::ScalarType {
        return s1 == s2;
    }

    if t1 == SymKind::Pointer && t1 == t2 {
        return match (syms[s1].base_type, syms[s2].base_type) {
            (Some(b1), Some(b2)) => is_compatible(syms, scopes, b1, b2),
            _ => false,
        };
    }

    if t1 == SymKind::Function && t2 == SymKind::Function {
        let returns = match (syms[s1].base_type, syms[s2].base_type) {
            (Some(b1), Some(b2)) => is_compatible(syms, scopes, b1, b2),
            _ => false,
        };
        let params = match (syms[s1].members, syms[s2].members) {
            (Some(m1), Some(m2)) => is_compatible_scope(syms, scopes, m1, m2),
            _ => false,
        };
        return returns && syms[s1].flags == syms[s2].flags && params;
    }

    if is_struct_type(t1) && t1 == t2 {
        return match (syms[s1].members, syms[s2].members) {
            (Some(m1), Some(m2)) => is_compatible_scope(syms, scopes, m1, m2),
            _ => false,
        };
    }

    false
}

fn arith_common_one_way(syms: &Syms, s1: SymbolId, s2: SymbolId) -> Option<SymbolId> {
    if syms[s1].kind == SymKind::EnumConst && (s2 == Syms::INT || s2 == Syms::CHAR) {
        Some(Syms::INT)
    } else if s1 == Syms::DOUBLE
        && (s2 == Syms::DOUBLE || s2 == Syms::INT || s2 == Syms::CHAR)
    {
        Some(Syms::DOUBLE)
    } else if s1 == Syms::INT && (s2 == Syms::INT || s2 == Syms::CHAR) {
        Some(Syms::INT)
    } else if s1 == Syms::CHAR && s2 == Syms::CHAR {
        Some(Syms::CHAR)
    } else {
        None
    }
}

/// The usual-arithmetic-conversion result over this subset's promotion
/// order: double > int > char, enum constants promoting to int.
///
/// Both inputs must already be canonical.
pub fn arith_common_type(syms: &Syms, s1: SymbolId, s2: SymbolId) -> Option<SymbolId> {
    arith_common_one_way(syms, s1, s2).or_else(|| arith_common_one_way(syms, s2, s1))
}

/// Wraps `node` in a cast to `dst` unless it is already compatible.
pub fn implicit_cast_to(syms: &Syms, scopes: &Scopes, dst: SymbolId, node: Node) -> Node {
    if let Some(src) = node.type_sym {
        if is_compatible(syms, scopes, resolve_alias(syms, src), dst) {
            return node;
        }
    }
    Node::with_type(NodeKind::Cast(Box::new(node)), dst)
}

/// Replaces `*slot` with an implicit cast of itself to `dst`.
pub fn cast_in_place(syms: &Syms, scopes: &Scopes, dst: SymbolId, slot: &mut Node) {
    let old = std::mem::replace(slot, Node::nop());
    *slot = implicit_cast_to(syms, scopes, dst, old);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Namespace;
    use crate::symbol::{install_builtins, Symbol};

    fn setup() -> (Syms, Scopes) {
        let mut syms = Syms::new();
        let mut scopes = Scopes::new();
        install_builtins(&mut syms, &mut scopes);
        (syms, scopes)
    }

    fn pointer_to(syms: &mut Syms, base: SymbolId) -> SymbolId {
        let mut ptr = Symbol::new(SymKind::Pointer);
        ptr.base_type = Some(base);
        ptr.size = 4;
        syms.alloc(ptr)
    }

    #[test]
    fn test_scalar_compat_is_nominal() {
        let (syms, scopes) = setup();
        assert!(is_compatible(&syms, &scopes, Syms::INT, Syms::INT));
        assert!(!is_compatible(&syms, &scopes, Syms::INT, Syms::CHAR));
        assert!(!is_compatible(&syms, &scopes, Syms::INT, Syms::DOUBLE));
    }

    #[test]
    fn test_pointer_compat_is_structural() {
        let (mut syms, scopes) = setup();
        let p1 = pointer_to(&mut syms, Syms::INT);
        let p2 = pointer_to(&mut syms, Syms::INT);
        let p3 = pointer_to(&mut syms, Syms::CHAR);
        assert!(is_compatible(&syms, &scopes, p1, p2));
        assert!(!is_compatible(&syms, &scopes, p1, p3));
        assert!(is_compatible(&syms, &scopes, p3, Syms::CHAR_PTR));
    }

    #[test]
    fn test_array_compares_as_pointer() {
        let (mut syms, scopes) = setup();
        let mut arr = Symbol::new(SymKind::Array);
        arr.base_type = Some(Syms::INT);
        let arr = syms.alloc(arr);
        let ptr = pointer_to(&mut syms, Syms::INT);
        assert!(is_compatible(&syms, &scopes, arr, ptr));
    }

    #[test]
    fn test_resolve_alias_through_typedef_and_var() {
        let (mut syms, mut scopes) = setup();
        let mut alias = Symbol::named(SymKind::TypeAlias, "myint");
        alias.base_type = Some(Syms::INT);
        let alias = syms.alloc(alias);
        scopes.put("myint", Namespace::Name, alias);

        let mut var = Symbol::named(SymKind::Variable, "x");
        var.base_type = Some(alias);
        let var = syms.alloc(var);

        assert_eq!(resolve_alias(&syms, var), Syms::INT);
        assert_eq!(resolve_alias(&syms, alias), Syms::INT);
        assert_eq!(resolve_alias(&syms, Syms::INT), Syms::INT);
    }

    #[test]
    fn test_arith_common_type_promotion() {
        let (syms, _) = setup();
        assert_eq!(
            arith_common_type(&syms, Syms::INT, Syms::CHAR),
            Some(Syms::INT)
        );
        assert_eq!(
            arith_common_type(&syms, Syms::CHAR, Syms::DOUBLE),
            Some(Syms::DOUBLE)
        );
        assert_eq!(
            arith_common_type(&syms, Syms::CHAR, Syms::CHAR),
            Some(Syms::CHAR)
        );
        assert_eq!(arith_common_type(&syms, Syms::VOID, Syms::INT), None);
    }

    #[test]
    fn test_implicit_cast_inserted_only_when_needed() {
        let (syms, scopes) = setup();
        let int_node = Node::with_type(NodeKind::Int(1), Syms::INT);
        let unchanged = implicit_cast_to(&syms, &scopes, Syms::INT, int_node.clone());
        assert_eq!(unchanged.kind, NodeKind::Int(1));

        let casted = implicit_cast_to(&syms, &scopes, Syms::DOUBLE, int_node);
        assert!(matches!(casted.kind, NodeKind::Cast(_)));
        assert_eq!(casted.type_sym, Some(Syms::DOUBLE));
    }
}
