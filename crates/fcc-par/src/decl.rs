//! Declarations, declarators, and tag specifiers.
//!
//! A declaration is a specifier-qualifier list introducing a base type
//! followed by a comma-separated list of declarators. Declarators build
//! type chains inside-out: pointer stars stack, inner parenthesized
//! declarators recurse, and array/function suffixes bind to the position
//! they follow. A chain under construction ends in a hole (`base_type ==
//! None`) that the enclosing context later plugs.

use std::io::Read;

use fcc_lex::TokenKind;
use fcc_util::PResult;

use crate::ast::{BinOp, Node, NodeKind};
use crate::scope::Namespace;
use crate::symbol::{SymFlags, SymKind, Symbol, SymbolId, Syms};
use crate::types::{implicit_cast_to, is_type_symbol, is_var_symbol};
use crate::{DeclContext, Parser};

impl<'a, R: Read> Parser<'a, R> {
    /// Whether the current token can begin a type specifier. Used both by
    /// declaration detection in statements and by cast detection in
    /// primary expressions.
    pub(crate) fn is_type_specifier_start(&self) -> bool {
        match self.token.kind {
            TokenKind::Void
            | TokenKind::Char
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum => true,
            TokenKind::Ident => self
                .lookup(self.token.str_value(), Namespace::Name)
                .map(|id| is_type_symbol(self.syms[id].kind))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn parse_type_specifier(&mut self) -> PResult<SymbolId> {
        match self.token.kind {
            TokenKind::Void => {
                self.bump()?;
                Ok(Syms::VOID)
            }
            TokenKind::Char => {
                self.bump()?;
                Ok(Syms::CHAR)
            }
            TokenKind::Int => {
                self.bump()?;
                Ok(Syms::INT)
            }
            // float carries double's representation in this subset.
            TokenKind::Float | TokenKind::Double => {
                self.bump()?;
                Ok(Syms::DOUBLE)
            }
            TokenKind::Ident => {
                let symbol = self
                    .lookup(self.token.str_value(), Namespace::Name)
                    .filter(|&id| is_type_symbol(self.syms[id].kind));
                let Some(symbol) = symbol else {
                    return Err(self.parser_error("typename expected"));
                };
                self.bump()?;
                Ok(symbol)
            }
            TokenKind::Struct | TokenKind::Union => self.parse_struct_or_union_specifier(),
            TokenKind::Enum => self.parse_enum_specifier(),
            _ => Err(self.parser_error("typename expected")),
        }
    }

    fn parse_type_qualifier(&mut self) -> PResult<()> {
        // `const` is accepted and discarded.
        self.accept(TokenKind::Const)?;
        Ok(())
    }

    pub(crate) fn parse_specifier_qualifier_list(&mut self) -> PResult<SymbolId> {
        self.parse_type_qualifier()?;
        self.parse_type_specifier()
    }

    // ------------------------------------------------------------------
    // Declarators
    // ------------------------------------------------------------------

    /// The end of a declarator chain (the hole to plug).
    fn root_of(&self, mut id: SymbolId) -> SymbolId {
        while let Some(base) = self.syms[id].base_type {
            id = base;
        }
        id
    }

    fn plug_root(&mut self, declarator: SymbolId, base: SymbolId) {
        let root = self.root_of(declarator);
        self.syms[root].base_type = Some(base);
    }

    /// Array and multi-dimensional array suffixes.
    fn parse_array_declarator(&mut self, base: Option<SymbolId>) -> PResult<SymbolId> {
        self.consume(TokenKind::LBracket)?;
        let mut size_expr = None;
        if !self.accept(TokenKind::RBracket)? {
            size_expr = Some(self.parse_const_expr()?);
            self.consume(TokenKind::RBracket)?;
        }

        let element = if self.token.kind == TokenKind::LBracket {
            Some(self.parse_array_declarator(base)?)
        } else {
            base
        };

        let mut array = Symbol::new(SymKind::Array);
        array.base_type = element;
        array.expr = size_expr;
        Ok(self.syms.alloc(array))
    }

    /// Function suffix: parameter list in a fresh scope, optional `...`.
    fn parse_function_declarator(&mut self, base: Option<SymbolId>) -> PResult<SymbolId> {
        let saved_context = self.decl_context;
        self.decl_context = DeclContext::Parameter;

        let mut function = Symbol::new(SymKind::Function);
        function.base_type = base;
        let scope = self.push_scope()?;
        function.members = Some(scope);
        let function = self.syms.alloc(function);

        self.consume(TokenKind::LParen)?;
        if self.token.kind != TokenKind::RParen {
            loop {
                if self.accept(TokenKind::Ellipsis)? {
                    self.syms[function].flags.insert(SymFlags::VARIADIC);
                    break;
                }

                let mut name = None;
                let base_ty = self.parse_type_specifier()?;
                let ty = self.parse_declarator(base_ty, &mut name)?;
                let name = match name {
                    Some(name) => name,
                    None => self.generate_name("@arg"),
                };

                let mut param = Symbol::named(SymKind::Parameter, name.clone());
                param.base_type = Some(ty);
                let param = self.syms.alloc(param);
                self.put_symbol(&name, Namespace::Name, param);

                if !self.accept(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen)?;
        self.scopes.exit();
        self.decl_context = saved_context;
        Ok(function)
    }

    /// Pointer stars, the declared name or an inner parenthesized
    /// declarator, and array/function suffixes. Returns `None` for a
    /// wholly absent (abstract, suffix-free) declarator.
    fn parse_declarator_base(&mut self, name: &mut Option<String>) -> PResult<Option<SymbolId>> {
        let mut outer: Option<SymbolId> = None;
        while self.token.kind == TokenKind::Star {
            self.bump()?;
            let mut pointer = Symbol::new(SymKind::Pointer);
            pointer.base_type = outer;
            pointer.size = self.syms[Syms::INT].size;
            outer = Some(self.syms.alloc(pointer));
        }

        let mut inner: Option<SymbolId> = None;
        match self.token.kind {
            TokenKind::Ident => {
                *name = Some(self.token.value.take_str());
                self.bump()?;
            }
            TokenKind::LParen => {
                self.consume(TokenKind::LParen)?;
                inner = self.parse_declarator_base(name)?;
                self.consume(TokenKind::RParen)?;
            }
            _ => {}
        }

        if self.token.kind == TokenKind::LBracket {
            outer = Some(self.parse_array_declarator(outer)?);
        } else if self.token.kind == TokenKind::LParen {
            outer = Some(self.parse_function_declarator(outer)?);
        }

        match (inner, outer) {
            // The inner declarator binds tighter; its hole takes the
            // outer continuation.
            (Some(inner), Some(outer)) => {
                self.plug_root(inner, outer);
                Ok(Some(inner))
            }
            (Some(inner), None) => Ok(Some(inner)),
            (None, outer) => Ok(outer),
        }
    }

    /// Completes a declarator against the declaration's base type and
    /// computes its storage size.
    pub(crate) fn parse_declarator(
        &mut self,
        base_type: SymbolId,
        name: &mut Option<String>,
    ) -> PResult<SymbolId> {
        let Some(declarator) = self.parse_declarator_base(name)? else {
            return Ok(base_type);
        };
        self.plug_root(declarator, base_type);
        let size = self.calc_symbol_size(declarator);
        self.syms[declarator].size = size;
        Ok(declarator)
    }

    /// Storage size in bytes; array sizes multiply out constant size
    /// expressions.
    fn calc_symbol_size(&mut self, id: SymbolId) -> i32 {
        if self.syms[id].size != 0 {
            return self.syms[id].size;
        }
        if self.syms[id].kind == SymKind::Array {
            let count = match &self.syms[id].expr {
                Some(Node {
                    kind: NodeKind::Int(value),
                    ..
                }) => Some(*value),
                _ => None,
            };
            if let (Some(count), Some(element)) = (count, self.syms[id].base_type) {
                let element_size = self.calc_symbol_size(element);
                self.syms[id].size = count * element_size;
            }
        }
        self.syms[id].size
    }

    // ------------------------------------------------------------------
    // Tag specifiers
    // ------------------------------------------------------------------

    /// Consumes the tag keyword and the optional tag name; an existing
    /// tag is shared, a new one starts out incomplete. Anonymous tags get
    /// a synthesized name.
    fn parse_structured_specifier_start(
        &mut self,
        kind: SymKind,
        name_prefix: &str,
    ) -> PResult<SymbolId> {
        self.bump()?;

        let name = if self.token.kind == TokenKind::Ident {
            let name = self.token.value.take_str();
            self.bump()?;
            if let Some(tag) = self.lookup(&name, Namespace::Tag) {
                return Ok(tag);
            }
            name
        } else {
            self.generate_name(name_prefix)
        };

        let mut symbol = Symbol::named(kind, name.clone());
        symbol.flags.insert(SymFlags::INCOMPLETE);
        let id = self.syms.alloc(symbol);
        self.put_symbol(&name, Namespace::Tag, id);
        Ok(id)
    }

    fn parse_struct_or_union_specifier(&mut self) -> PResult<SymbolId> {
        let kind = if self.token.kind == TokenKind::Struct {
            SymKind::Struct
        } else {
            SymKind::Union
        };
        let symbol = self.parse_structured_specifier_start(kind, "@struct")?;

        if self.accept(TokenKind::LBrace)? {
            let scope = self.push_scope()?;
            self.syms[symbol].members = Some(scope);

            let saved_context = self.decl_context;
            loop {
                self.decl_context = DeclContext::Struct;
                let result = self.parse_declaration();
                self.decl_context = saved_context;
                result?;
                if self.accept(TokenKind::RBrace)? {
                    break;
                }
            }
            self.scopes.exit();
            self.syms[symbol].flags.remove(SymFlags::INCOMPLETE);

            // Field layout: structs accumulate offsets in declaration
            // order, unions overlay everything at offset 0.
            let fields: Vec<SymbolId> = self.scopes.get(scope).symbols().collect();
            let is_struct = self.syms[symbol].kind == SymKind::Struct;
            for field in fields {
                if !is_var_symbol(self.syms[field].kind) {
                    continue;
                }
                if is_struct {
                    self.syms[field].offset = self.syms[symbol].size;
                    self.syms[symbol].size += self.syms[field].size;
                } else {
                    self.syms[field].offset = 0;
                    if self.syms[field].size > self.syms[symbol].size {
                        self.syms[symbol].size = self.syms[field].size;
                    }
                }
            }
        }
        Ok(symbol)
    }

    fn parse_enum_specifier(&mut self) -> PResult<SymbolId> {
        let symbol = self.parse_structured_specifier_start(SymKind::Enum, "@enum")?;

        if self.accept(TokenKind::LBrace)? {
            let mut counter = 0;
            while self.token.kind != TokenKind::RBrace {
                self.expect(TokenKind::Ident)?;
                let name = self.token.value.take_str();

                let mut constant = Symbol::named(SymKind::EnumConst, name.clone());
                constant.base_type = Some(symbol);
                constant.expr = Some(Node::new(NodeKind::Int(counter)));
                let constant = self.syms.alloc(constant);
                self.put_symbol(&name, Namespace::Name, constant);

                self.bump()?;
                if !self.accept(TokenKind::Comma)? {
                    break;
                }
                counter += 1;
            }
            self.consume(TokenKind::RBrace)?;
            self.syms[symbol].flags.remove(SymFlags::INCOMPLETE);
        }
        Ok(symbol)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_initializer(&mut self) -> PResult<Node> {
        self.parse_assign_expr()
    }

    pub(crate) fn parse_declaration(&mut self) -> PResult<()> {
        let mut is_typedef = false;
        let mut storage = SymFlags::empty();
        if self.decl_context == DeclContext::Global {
            is_typedef = self.accept(TokenKind::Typedef)?;
            if self.accept(TokenKind::Extern)? {
                storage.insert(SymFlags::EXTERN);
            } else if self.accept(TokenKind::Static)? {
                storage.insert(SymFlags::STATIC);
            }
        }

        let base_type = self.parse_specifier_qualifier_list()?;

        // A bare specifier (`struct S { ... };`) declares only the tag.
        if self.accept(TokenKind::Semicolon)? {
            return Ok(());
        }

        loop {
            let mut name = None;
            let declarator = self.parse_declarator(base_type, &mut name)?;

            let symbol = if self.syms[declarator].kind == SymKind::Function {
                self.syms[declarator].flags.insert(storage);
                declarator
            } else {
                let kind = if is_typedef {
                    SymKind::TypeAlias
                } else {
                    match self.decl_context {
                        DeclContext::Struct => SymKind::Field,
                        DeclContext::Global => SymKind::GlobalVariable,
                        _ => SymKind::Variable,
                    }
                };
                let mut wrapper = Symbol::new(kind);
                wrapper.base_type = Some(declarator);
                wrapper.size = self.syms[declarator].size;
                self.syms.alloc(wrapper)
            };
            self.syms[symbol].name = name.clone();

            let base = self.syms[symbol].base_type;
            let base_incomplete = base
                .map(|b| self.syms[b].flags.contains(SymFlags::INCOMPLETE))
                .unwrap_or(false);
            if !is_typedef && base_incomplete {
                return Err(
                    self.parser_error("variable, field or function has incomplete type")
                );
            }
            if is_var_symbol(self.syms[symbol].kind) && base == Some(Syms::VOID) {
                return Err(self.parser_error("variable or field declared void"));
            }
            let Some(name) = name else {
                return Err(self.parser_error("expected non-abstract declarator"));
            };

            if self.syms[symbol].kind == SymKind::Function {
                self.put_symbol(&name, Namespace::Name, symbol);
                if self.token.kind == TokenKind::LBrace {
                    self.parse_function_body(symbol)?;
                    return Ok(());
                }
            } else {
                if self.accept(TokenKind::Eq)? {
                    self.parse_declaration_initializer(symbol)?;
                }
                if self.decl_context == DeclContext::Local {
                    let size = self.syms[symbol].size;
                    self.syms[symbol].offset = -self.function_locals_size;
                    self.function_locals_size += size;
                }
                self.put_symbol(&name, Namespace::Name, symbol);
            }

            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }

        self.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    /// Function definition: re-enter the parameter scope, parse the body
    /// as one compound statement, record the locals frame size.
    fn parse_function_body(&mut self, function: SymbolId) -> PResult<()> {
        self.function_locals_size = 0;
        self.decl_context = DeclContext::Local;
        let members = self.syms[function].members;
        if let Some(members) = members {
            self.push_scope_existing(members)?;
        }
        let body = self.parse_stmt();
        if members.is_some() {
            self.scopes.exit();
        }
        self.decl_context = DeclContext::Global;
        self.syms[function].expr = Some(body?);
        self.syms[function].locals_size = self.function_locals_size;
        Ok(())
    }

    /// `= assignment-expression`, implicit-cast to the declared type;
    /// when a local-initializer bundle is being collected, additionally
    /// synthesize `var = init` into it.
    fn parse_declaration_initializer(&mut self, symbol: SymbolId) -> PResult<()> {
        let mut init = self.parse_initializer()?;
        let base = self.syms[symbol].base_type;
        if self.calc_types() {
            let Some(base) = base else {
                return Err(self.parser_error("wrong initializer type"));
            };
            init = implicit_cast_to(&self.syms, &self.scopes, base, init);
        }

        if self.initializers.is_some() {
            self.syms[symbol].expr = Some(init.clone());
            let variable = Node {
                kind: NodeKind::Var(symbol),
                type_sym: base,
                scope: None,
            };
            let assign = Node {
                kind: NodeKind::Binary(BinOp::Assign, Box::new(variable), Box::new(init)),
                type_sym: base,
                scope: None,
            };
            if let Some(inits) = self.initializers.as_mut() {
                inits.push(assign);
            }
        } else {
            self.syms[symbol].expr = Some(init);
        }
        Ok(())
    }
}
