//! Parser and semantic-analysis tests.

use fcc_util::Handler;

use crate::ast::{BinOp, Node, NodeKind, UnOp};
use crate::scope::Namespace;
use crate::symbol::{SymKind, SymbolId, Syms, TranslationUnit};
use crate::{Parser, PF_ADD_INITIALIZERS, PF_RESOLVE_NAMES};

fn parse_expr_syntax(source: &str) -> Node {
    let handler = Handler::collecting();
    let parser = Parser::new(source.as_bytes(), &handler, 0);
    match parser.parse_expression() {
        Ok((node, _)) => node,
        Err(_) => panic!("parse failed: {:?}", handler.take_collected()),
    }
}

fn parse_stmt_syntax(source: &str) -> Node {
    let handler = Handler::collecting();
    let parser = Parser::new(source.as_bytes(), &handler, 0);
    match parser.parse_statement() {
        Ok((node, _)) => node,
        Err(_) => panic!("parse failed: {:?}", handler.take_collected()),
    }
}

fn parse_unit_src(source: &str) -> TranslationUnit {
    let handler = Handler::collecting();
    let parser = Parser::new(
        source.as_bytes(),
        &handler,
        PF_RESOLVE_NAMES | PF_ADD_INITIALIZERS,
    );
    match parser.parse_unit() {
        Ok(unit) => unit,
        Err(_) => panic!("parse failed: {:?}", handler.take_collected()),
    }
}

fn parse_unit_err(source: &str) -> String {
    let handler = Handler::collecting();
    let parser = Parser::new(
        source.as_bytes(),
        &handler,
        PF_RESOLVE_NAMES | PF_ADD_INITIALIZERS,
    );
    assert!(parser.parse_unit().is_err(), "expected an error: {}", source);
    handler.take_collected()[0].message.clone()
}

fn file_symbol(unit: &TranslationUnit, name: &str) -> SymbolId {
    unit.scopes
        .get(unit.file_scope)
        .get(name, Namespace::Name)
        .unwrap_or_else(|| panic!("no file-scope symbol {:?}", name))
}

fn file_tag(unit: &TranslationUnit, name: &str) -> SymbolId {
    unit.scopes
        .get(unit.file_scope)
        .get(name, Namespace::Tag)
        .unwrap_or_else(|| panic!("no file-scope tag {:?}", name))
}

fn body_items(unit: &TranslationUnit, function: &str) -> Vec<Node> {
    let f = file_symbol(unit, function);
    match &unit.syms[f].expr {
        Some(Node {
            kind: NodeKind::List(items),
            ..
        }) => items.clone(),
        other => panic!("function body is not a block: {:?}", other),
    }
}

fn ident(name: &str) -> Node {
    Node::new(NodeKind::Ident(name.to_string()))
}

fn bin(op: BinOp, lhs: Node, rhs: Node) -> Node {
    Node::new(NodeKind::Binary(op, Box::new(lhs), Box::new(rhs)))
}

// ----------------------------------------------------------------------
// Grammar shape
// ----------------------------------------------------------------------

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let node = parse_expr_syntax("a + b * c");
    let expected = bin(
        BinOp::Add,
        ident("a"),
        bin(BinOp::Mul, ident("b"), ident("c")),
    );
    assert_eq!(node, expected);
}

#[test]
fn test_assignment_is_right_associative() {
    let node = parse_expr_syntax("a = b = c");
    let expected = bin(
        BinOp::Assign,
        ident("a"),
        bin(BinOp::Assign, ident("b"), ident("c")),
    );
    assert_eq!(node, expected);
}

#[test]
fn test_comma_is_left_associative() {
    let node = parse_expr_syntax("a, b, c");
    let expected = bin(
        BinOp::Comma,
        bin(BinOp::Comma, ident("a"), ident("b")),
        ident("c"),
    );
    assert_eq!(node, expected);
}

#[test]
fn test_ternary_is_right_associative() {
    let node = parse_expr_syntax("a ? b : c ? d : e");
    let expected = Node::new(NodeKind::Ternary(
        Box::new(ident("a")),
        Box::new(ident("b")),
        Box::new(Node::new(NodeKind::Ternary(
            Box::new(ident("c")),
            Box::new(ident("d")),
            Box::new(ident("e")),
        ))),
    ));
    assert_eq!(node, expected);
}

#[test]
fn test_compound_assignment_survives_pure_syntax_mode() {
    let node = parse_expr_syntax("a += b");
    assert_eq!(node, bin(BinOp::AddAssign, ident("a"), ident("b")));
}

#[test]
fn test_subscript_survives_pure_syntax_mode() {
    let node = parse_expr_syntax("a[1]");
    assert_eq!(
        node,
        bin(
            BinOp::Subscript,
            ident("a"),
            Node::with_type(NodeKind::Int(1), Syms::INT)
        )
    );
}

#[test]
fn test_unary_chain() {
    let node = parse_expr_syntax("-~a");
    let expected = Node::new(NodeKind::Unary(
        UnOp::Minus,
        Box::new(Node::new(NodeKind::Unary(UnOp::Compl, Box::new(ident("a"))))),
    ));
    assert_eq!(node, expected);
}

#[test]
fn test_labeled_statement_uses_lookahead() {
    let node = parse_stmt_syntax("done: return;");
    assert!(matches!(node.kind, NodeKind::Labeled(_, _)));

    // Without the colon the same prefix is an expression statement.
    let node = parse_stmt_syntax("done;");
    assert_eq!(node, ident("done"));
}

#[test]
fn test_statement_forms_parse() {
    assert!(matches!(
        parse_stmt_syntax("while (1) ;").kind,
        NodeKind::While(_, _)
    ));
    assert!(matches!(
        parse_stmt_syntax("do x; while (1);").kind,
        NodeKind::DoWhile(_, _)
    ));
    assert!(matches!(
        parse_stmt_syntax("for (;;) ;").kind,
        NodeKind::For(_, _, _, _)
    ));
    assert!(matches!(
        parse_stmt_syntax("switch (x) { case 1: break; default: break; }").kind,
        NodeKind::Switch(_, _)
    ));
    assert!(matches!(
        parse_stmt_syntax("goto out;").kind,
        NodeKind::Goto(_)
    ));
    assert!(matches!(parse_stmt_syntax("break;").kind, NodeKind::Break));
    assert!(matches!(
        parse_stmt_syntax("continue;").kind,
        NodeKind::Continue
    ));
}

// ----------------------------------------------------------------------
// Declarations and layout
// ----------------------------------------------------------------------

#[test]
fn test_declarator_spiral_pointer_to_function() {
    let unit = parse_unit_src("int (*f)(int);");
    let f = file_symbol(&unit, "f");
    assert_eq!(unit.syms[f].kind, SymKind::GlobalVariable);

    let pointer = unit.syms[f].base_type.unwrap();
    assert_eq!(unit.syms[pointer].kind, SymKind::Pointer);

    let function = unit.syms[pointer].base_type.unwrap();
    assert_eq!(unit.syms[function].kind, SymKind::Function);
    assert_eq!(unit.syms[function].base_type, Some(Syms::INT));

    let params = unit.syms[function].members.unwrap();
    assert_eq!(unit.scopes.get(params).len(), 1);
}

#[test]
fn test_struct_layout() {
    let unit = parse_unit_src("struct S { char a; int b; };");
    let tag = file_tag(&unit, "S");
    assert_eq!(unit.syms[tag].kind, SymKind::Struct);
    assert_eq!(unit.syms[tag].size, 5);

    let members = unit.syms[tag].members.unwrap();
    let fields: Vec<SymbolId> = unit.scopes.get(members).symbols().collect();
    assert_eq!(unit.syms[fields[0]].offset, 0);
    assert_eq!(unit.syms[fields[0]].size, 1);
    assert_eq!(unit.syms[fields[1]].offset, 1);
    assert_eq!(unit.syms[fields[1]].size, 4);
}

#[test]
fn test_union_layout() {
    let unit = parse_unit_src("union U { char a; int b; };");
    let tag = file_tag(&unit, "U");
    assert_eq!(unit.syms[tag].size, 4);
    let members = unit.syms[tag].members.unwrap();
    for field in unit.scopes.get(members).symbols() {
        assert_eq!(unit.syms[field].offset, 0);
    }
}

#[test]
fn test_multi_dimensional_array_size() {
    let unit = parse_unit_src("int a[2][3];");
    let a = file_symbol(&unit, "a");
    assert_eq!(unit.syms[a].size, 24);
}

#[test]
fn test_locals_frame_layout() {
    let unit = parse_unit_src("int main() { int a; int b; char c; return 0; }");
    let main = file_symbol(&unit, "main");
    assert_eq!(unit.syms[main].locals_size, 9);
}

#[test]
fn test_enum_constants_count_from_zero() {
    let unit = parse_unit_src("enum E { A, B, C };");
    let c = file_symbol(&unit, "C");
    assert_eq!(unit.syms[c].kind, SymKind::EnumConst);
    assert_eq!(
        unit.syms[c].expr,
        Some(Node::new(NodeKind::Int(2)))
    );
    let a = file_symbol(&unit, "A");
    assert_eq!(unit.syms[a].expr, Some(Node::new(NodeKind::Int(0))));
}

#[test]
fn test_enum_with_body_is_complete() {
    let unit = parse_unit_src("enum E { A }; enum E e;");
    let e = file_symbol(&unit, "e");
    assert_eq!(unit.syms[e].kind, SymKind::GlobalVariable);
}

#[test]
fn test_typedef_aliases_resolve() {
    let unit = parse_unit_src("typedef int myint; myint x;");
    let x = file_symbol(&unit, "x");
    let alias = unit.syms[x].base_type.unwrap();
    assert_eq!(unit.syms[alias].kind, SymKind::TypeAlias);
    assert_eq!(crate::types::resolve_alias(&unit.syms, x), Syms::INT);
}

#[test]
fn test_float_is_double() {
    let unit = parse_unit_src("float f;");
    let f = file_symbol(&unit, "f");
    assert_eq!(unit.syms[f].base_type, Some(Syms::DOUBLE));
    assert_eq!(unit.syms[f].size, 8);
}

#[test]
fn test_variadic_function_flag() {
    let unit = parse_unit_src("int log_all(char *fmt, ...);");
    let f = file_symbol(&unit, "log_all");
    assert!(unit.syms[f]
        .flags
        .contains(crate::symbol::SymFlags::VARIADIC));
}

#[test]
fn test_anonymous_struct_gets_generated_tag() {
    let unit = parse_unit_src("struct { int a; } v;");
    let v = file_symbol(&unit, "v");
    let tag = unit.syms[v].base_type.unwrap();
    assert!(unit.syms[tag].display_name().starts_with("@struct"));
}

// ----------------------------------------------------------------------
// Semantic elaboration
// ----------------------------------------------------------------------

#[test]
fn test_array_reference_decays_to_pointer() {
    let unit = parse_unit_src("int a[10]; int f() { a; return 0; }");
    let items = body_items(&unit, "f");
    let NodeKind::Unary(UnOp::Ref, _) = &items[0].kind else {
        panic!("expected array-to-pointer wrapper, got {:?}", items[0].kind);
    };
    let ty = items[0].type_sym.unwrap();
    assert_eq!(unit.syms[ty].kind, SymKind::Pointer);
    assert_eq!(unit.syms[ty].base_type, Some(Syms::INT));
}

#[test]
fn test_initializer_inserts_exactly_one_cast() {
    let unit = parse_unit_src("int main() { int i; double d = i; return 0; }");
    let items = body_items(&unit, "main");
    // Item 0 is the (empty) bundle of `int i;`, item 1 the bundle of the
    // initialized declaration.
    let NodeKind::List(inits) = &items[1].kind else {
        panic!("expected initializer bundle");
    };
    let NodeKind::Binary(BinOp::Assign, _, rhs) = &inits[0].kind else {
        panic!("expected synthesized assignment");
    };
    assert!(matches!(rhs.kind, NodeKind::Cast(_)));
    assert_eq!(rhs.type_sym, Some(Syms::DOUBLE));
    let NodeKind::Cast(inner) = &rhs.kind else {
        unreachable!();
    };
    assert!(matches!(inner.kind, NodeKind::Var(_)));
}

#[test]
fn test_subscript_lowers_to_deref_of_add() {
    let unit = parse_unit_src("int a[4]; int f() { a[2]; return 0; }");
    let items = body_items(&unit, "f");
    let NodeKind::Unary(UnOp::Deref, inner) = &items[0].kind else {
        panic!("subscript should lower to a dereference");
    };
    assert!(matches!(
        inner.kind,
        NodeKind::Binary(BinOp::Add, _, _)
    ));
    assert_eq!(items[0].type_sym, Some(Syms::INT));
}

#[test]
fn test_arrow_lowers_to_member_of_deref() {
    let unit = parse_unit_src(
        "struct S { int v; };\n\
         int f(struct S *p) { p->v; return 0; }",
    );
    let items = body_items(&unit, "f");
    let NodeKind::Binary(BinOp::Member, object, _) = &items[0].kind else {
        panic!("arrow should lower to member access");
    };
    assert!(matches!(object.kind, NodeKind::Unary(UnOp::Deref, _)));
    assert_eq!(items[0].type_sym, Some(Syms::INT));
}

#[test]
fn test_compound_assignment_expands() {
    let unit = parse_unit_src("int main() { int x; x += 2; return x; }");
    let items = body_items(&unit, "main");
    let NodeKind::Binary(BinOp::Assign, _, rhs) = &items[1].kind else {
        panic!("compound assignment should become a plain assignment");
    };
    assert!(matches!(rhs.kind, NodeKind::Binary(BinOp::Add, _, _)));
}

#[test]
fn test_inner_scope_shadows_global() {
    let unit = parse_unit_src("int x; int main() { int x; x = 1; return x; }");
    let items = body_items(&unit, "main");
    let NodeKind::Binary(BinOp::Assign, lhs, _) = &items[1].kind else {
        panic!("expected assignment");
    };
    let NodeKind::Var(symbol) = lhs.kind else {
        panic!("expected variable reference");
    };
    assert_eq!(unit.syms[symbol].kind, SymKind::Variable);
}

#[test]
fn test_comparison_result_is_int_with_double_operands() {
    let unit = parse_unit_src("int main() { double d; d = 1.0; return d < 2.0; }");
    let items = body_items(&unit, "main");
    let NodeKind::Return(value) = &items.last().unwrap().kind else {
        panic!("expected return");
    };
    assert_eq!(value.type_sym, Some(Syms::INT));
}

#[test]
fn test_pointer_difference_is_int() {
    let unit = parse_unit_src("int f(int *p, int *q) { return p - q; }");
    let items = body_items(&unit, "f");
    let NodeKind::Return(value) = &items[0].kind else {
        panic!("expected return");
    };
    assert_eq!(value.type_sym, Some(Syms::INT));
}

#[test]
fn test_call_records_parameter_offsets() {
    let unit = parse_unit_src(
        "int add(int a, double b, char c);\n\
         int main() { return add(1, 2.0, 3); }",
    );
    let add = file_symbol(&unit, "add");
    let params: Vec<SymbolId> = unit
        .scopes
        .get(unit.syms[add].members.unwrap())
        .symbols()
        .collect();
    let offsets: Vec<i32> = params.iter().map(|&p| unit.syms[p].offset).collect();
    assert_eq!(offsets, vec![0, 4, 12]);
}

// ----------------------------------------------------------------------
// Diagnostics
// ----------------------------------------------------------------------

#[test]
fn test_undeclared_identifier() {
    assert_eq!(
        parse_unit_err("int main() { return zz; }"),
        "undeclared identifier"
    );
}

#[test]
fn test_assignment_requires_lvalue() {
    assert_eq!(parse_unit_err("int main() { 1 = 2; }"), "lvalue expected");
}

#[test]
fn test_calling_non_function() {
    assert_eq!(
        parse_unit_err("int main() { int x; x(); }"),
        "expected function or function pointer"
    );
}

#[test]
fn test_argument_count_mismatch() {
    assert_eq!(
        parse_unit_err("int f(int a); int main() { f(); }"),
        "too few arguments to function"
    );
    assert_eq!(
        parse_unit_err("int f(int a); int main() { f(1, 2); }"),
        "too many arguments to function"
    );
}

#[test]
fn test_variadic_call_accepts_extras() {
    parse_unit_src("int main() { printf(\"%d %d\", 1, 2); return 0; }");
}

#[test]
fn test_void_variable_rejected() {
    assert_eq!(parse_unit_err("void x;"), "variable or field declared void");
}

#[test]
fn test_incomplete_type_rejected() {
    assert_eq!(
        parse_unit_err("struct S; struct S s;"),
        "variable, field or function has incomplete type"
    );
}

#[test]
fn test_pointer_to_incomplete_is_fine() {
    parse_unit_src("struct S; struct S *p;");
}

#[test]
fn test_deref_requires_pointer() {
    assert_eq!(
        parse_unit_err("int main() { int x; *x; }"),
        "expected pointer type"
    );
}

#[test]
fn test_array_index_must_be_integer() {
    assert_eq!(
        parse_unit_err("int main() { int a[2]; double d; d = 0.0; a[d]; }"),
        "array index must be integer expression"
    );
}

#[test]
fn test_bitwise_rejects_double() {
    assert_eq!(
        parse_unit_err("int main() { double d; d = 1.0; d & 1; }"),
        "invalid operands"
    );
}

#[test]
fn test_typename_expected() {
    assert_eq!(parse_unit_err("foo x;"), "typename expected");
}

#[test]
fn test_unexpected_token_names_both_sides() {
    assert_eq!(
        parse_unit_err("int main() { return 1 }"),
        "unexpected token RBRACE, expected SEMICOLON"
    );
}

#[test]
fn test_unknown_field() {
    assert_eq!(
        parse_unit_err(
            "struct S { int a; }; int main() { struct S s; s.b; return 0; }"
        ),
        "expected valid field name"
    );
}

#[test]
fn test_member_of_non_struct() {
    assert_eq!(
        parse_unit_err("int main() { int x; x.a; return 0; }"),
        "expected struct or union"
    );
}

#[test]
fn test_scope_depth_is_bounded() {
    let mut source = String::from("int main() ");
    for _ in 0..300 {
        source.push('{');
    }
    for _ in 0..300 {
        source.push('}');
    }
    assert_eq!(parse_unit_err(&source), "too many nested scopes");
}

#[test]
fn test_error_position_is_reported() {
    let handler = Handler::collecting();
    let parser = Parser::new(
        "int main() {\n  return zz;\n}".as_bytes(),
        &handler,
        PF_RESOLVE_NAMES | PF_ADD_INITIALIZERS,
    );
    assert!(parser.parse_unit().is_err());
    let diag = &handler.take_collected()[0];
    assert_eq!(diag.line, 2);
    assert!(diag.column > 0);
}
