//! Debug views: syntax-tree and symbol-table pretty-printers.
//!
//! Trees render one node per line with ` +-` branch connectors and ` | `
//! rails for still-open levels; scopes attached to a node print between
//! `[` and `]`. Symbols describe themselves recursively: `pointer to
//! int`, `variadic function taking (...) returning <int>`, and so on.

use fcc_par::ast::{Node, NodeKind};
use fcc_par::scope::{Namespace, ScopeId};
use fcc_par::symbol::{SymFlags, SymKind, SymbolId, Syms, TranslationUnit};

pub struct TreePrinter<'a> {
    unit: &'a TranslationUnit,
    /// Per-level flag: is a sibling still pending below this rail?
    show: Vec<bool>,
    out: String,
}

impl<'a> TreePrinter<'a> {
    pub fn new(unit: &'a TranslationUnit) -> Self {
        TreePrinter {
            unit,
            show: Vec::new(),
            out: String::new(),
        }
    }

    /// Renders a node tree (the `parse-expr`/`parse-stmt` views).
    pub fn node_tree(mut self, node: &Node) -> String {
        self.print_node(node, 0, false);
        self.out
    }

    /// Renders a symbol table (the `parse` view).
    pub fn scope_tree(mut self, scope: ScopeId) -> String {
        self.print_symtable(scope, 0);
        self.out
    }

    fn set_show(&mut self, level: usize, value: bool) {
        if self.show.len() <= level {
            self.show.resize(level + 1, false);
        }
        self.show[level] = value;
    }

    fn shown(&self, level: usize) -> bool {
        self.show.get(level).copied().unwrap_or(false)
    }

    fn print_indent(&mut self, level: usize) {
        for i in 0..level {
            let rail = if self.shown(i + 1) { " | " } else { "   " };
            self.out.push_str(rail);
        }
    }

    fn print_node_indent(&mut self, level: usize, root: bool) {
        if !root && level > 0 {
            self.print_indent(level - 1);
            self.out.push_str(" +-");
        } else {
            self.print_indent(level);
        }
    }

    fn print_branch(&mut self, node: &Node, level: usize, last: bool) {
        self.print_indent(level + 1);
        self.out.push('\n');
        if last {
            self.set_show(level + 1, false);
        }
        self.print_node(node, level + 1, false);
    }

    fn print_node(&mut self, node: &Node, level: usize, root: bool) {
        self.set_show(level + 1, true);
        self.print_node_indent(level, root);

        self.out.push('(');
        match &node.kind {
            NodeKind::Int(value) => self.out.push_str(&value.to_string()),
            NodeKind::Double(value) => self.out.push_str(&format!("{:.6}", value)),
            NodeKind::Str(bytes) => {
                self.out.push('"');
                self.out.push_str(&String::from_utf8_lossy(bytes));
                self.out.push('"');
            }
            NodeKind::Ident(name) => {
                self.out.push_str("ident ");
                self.out.push_str(name);
            }
            NodeKind::Nop => self.out.push_str("nop"),
            NodeKind::Var(symbol) => {
                let name = self.unit.syms[*symbol].display_name().to_string();
                self.out.push_str("var ");
                self.out.push_str(&name);
            }
            NodeKind::Cast(_) => {
                self.out.push_str("cast to <");
                if let Some(target) = node.type_sym {
                    self.print_symbol(target, level + 1, 0);
                }
                self.out.push('>');
            }
            _ => self.out.push_str(node.repr()),
        }
        self.out.push_str(")\n");

        let children = node.children();
        if let Some(scope) = node.scope {
            if !self.unit.scopes.get(scope).is_empty() {
                self.print_indent(level);
                self.out.push_str("[\n");
                self.print_symtable(scope, level + 1);
                self.print_indent(level);
                self.out.push(']');
                if children.is_empty() {
                    self.out.push('\n');
                }
            }
        }

        let count = children.len();
        for (index, child) in children.into_iter().enumerate() {
            self.print_branch(child, level, index == count - 1);
        }
    }

    fn print_symbol(&mut self, id: SymbolId, level: usize, depth: usize) {
        let unit = self.unit;
        let symbol = &unit.syms[id];
        match symbol.kind {
            SymKind::ScalarType => self.out.push_str(symbol.display_name()),
            SymKind::Pointer => {
                self.out.push_str("pointer to ");
                match symbol.base_type {
                    Some(base) => self.print_symbol(base, level, depth + 1),
                    None => self.out.push_str("<nothing>"),
                }
            }
            SymKind::Array => {
                self.out.push_str("array");
                if let Some(size) = &symbol.expr {
                    self.out.push_str(" [\n");
                    self.set_show(level + 1, false);
                    self.print_node(size, level + 1, true);
                    self.print_indent(level);
                    self.out.push(']');
                }
                self.out.push_str(" of ");
                if let Some(base) = symbol.base_type {
                    self.print_symbol(base, level, depth + 1);
                }
            }
            SymKind::Function => {
                if symbol.flags.contains(SymFlags::VARIADIC) {
                    self.out.push_str("variadic ");
                }
                self.out.push_str("function ");
                if let Some(members) = symbol.members {
                    if !unit.scopes.get(members).is_empty() {
                        self.out.push_str("taking (\n");
                        for param in unit.scopes.get(members).symbols() {
                            self.print_indent(level + 1);
                            self.print_symbol(param, level + 1, 0);
                            self.out.push('\n');
                        }
                        self.print_indent(level);
                        self.out.push_str(") ");
                    }
                }
                self.out.push_str("returning ");
                match symbol.base_type {
                    Some(base) if base == Syms::VOID => self.out.push_str("nothing"),
                    Some(base) => {
                        self.out.push('<');
                        self.print_symbol(base, level, 0);
                        self.out.push('>');
                    }
                    None => self.out.push_str("nothing"),
                }
                if let Some(body) = &symbol.expr {
                    self.out.push_str(" defined as {\n");
                    self.set_show(level + 1, false);
                    self.print_node(body, level + 1, true);
                    self.print_indent(level);
                    self.out.push('}');
                }
            }
            SymKind::Variable | SymKind::GlobalVariable | SymKind::Field => {
                self.out.push_str("variable of type <");
                if let Some(base) = symbol.base_type {
                    self.print_symbol(base, level, depth + 1);
                }
                self.out.push('>');
                if let Some(init) = &symbol.expr {
                    self.out.push_str(" = (\n");
                    self.set_show(level + 1, false);
                    self.print_node(init, level + 1, true);
                    self.print_indent(level);
                    self.out.push(')');
                }
            }
            SymKind::Parameter => {
                self.out.push('<');
                if let Some(base) = symbol.base_type {
                    self.print_symbol(base, level, depth + 1);
                }
                self.out.push('>');
                if symbol.name.is_some() {
                    self.out.push_str(" as ");
                    self.out.push_str(symbol.display_name());
                }
            }
            SymKind::Struct | SymKind::Union | SymKind::Enum => {
                let keyword = match symbol.kind {
                    SymKind::Struct => "struct",
                    SymKind::Union => "union",
                    _ => "enum",
                };
                self.out.push_str(keyword);
                self.out.push(' ');
                self.out.push_str(symbol.display_name());
                if let Some(members) = symbol.members {
                    if depth == 0 {
                        self.out.push_str(" defined as {\n");
                        self.print_symtable(members, level + 1);
                        self.print_indent(level);
                        self.out.push('}');
                    }
                }
            }
            SymKind::TypeAlias => {
                self.out.push_str("alias for type <");
                if let Some(base) = symbol.base_type {
                    self.print_symbol(base, level, depth + 1);
                }
                self.out.push('>');
            }
            SymKind::EnumConst => {
                self.out.push_str("enum const of type <");
                if let Some(base) = symbol.base_type {
                    self.print_symbol(base, level, depth + 1);
                }
                self.out.push_str("> = (\n");
                if let Some(value) = &symbol.expr {
                    self.print_node(value, level + 1, true);
                }
                self.print_indent(level);
                self.out.push(')');
            }
        }
    }

    fn print_symtable(&mut self, scope: ScopeId, level: usize) {
        self.set_show(level, false);
        let unit = self.unit;
        for (name, ns, symbol) in unit.scopes.get(scope).iter() {
            self.print_indent(level);
            match ns {
                Namespace::Tag => {
                    self.out.push_str("tag \"");
                    self.out.push_str(name);
                    self.out.push_str("\" is ");
                }
                _ => {
                    self.out.push_str(name);
                    self.out.push_str(" is ");
                }
            }
            self.print_symbol(symbol, level, 0);
            self.out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcc_par::{Parser, PF_ADD_INITIALIZERS, PF_RESOLVE_NAMES};
    use fcc_util::Handler;

    fn parse(source: &str) -> TranslationUnit {
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

    #[test]
    fn test_symbol_descriptions() {
        let unit = parse(
            "typedef int myint;\n\
             int *p;\n\
             int a[4];\n\
             struct S { int x; };\n\
             int add(int a, int b) { return a + b; }\n",
        );
        let text = TreePrinter::new(&unit).scope_tree(unit.file_scope);
        assert!(text.contains("myint is alias for type <int>"));
        assert!(text.contains("p is variable of type <pointer to int>"));
        assert!(text.contains("array ["));
        assert!(text.contains("] of int"));
        assert!(text.contains("tag \"S\" is struct S defined as {"));
        assert!(text.contains("add is function taking ("));
        assert!(text.contains("<int> as a"));
        assert!(text.contains("returning <int>"));
        assert!(text.contains("defined as {"));
    }

    #[test]
    fn test_variadic_printf_description() {
        let unit = parse("int main() { return 0; }");
        // printf lives in the root scope underneath the file scope.
        let text = TreePrinter::new(&unit).scope_tree(fcc_par::Scopes::root());
        assert!(text.contains("printf is variadic function taking ("));
        assert!(text.contains("<pointer to char> as message"));
        assert!(text.contains("returning nothing"));
    }

    #[test]
    fn test_node_tree_shape() {
        let handler = Handler::collecting();
        let parser = Parser::new("1 + 2 * x".as_bytes(), &handler, 0);
        let (node, unit) = parser.parse_expression().expect("parse failed");
        let text = TreePrinter::new(&unit).node_tree(&node);
        assert!(text.contains("(+)"));
        assert!(text.contains("(mul)"));
        assert!(text.contains("(1)"));
        assert!(text.contains("(ident x)"));
        assert!(text.contains(" +-"));
    }
}
