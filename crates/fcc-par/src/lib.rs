//! fcc-par - Recursive-descent parser and semantic analyzer.
//!
//! Parsing and semantic elaboration run in one pass: as each node is
//! constructed the parser resolves names, computes types, and inserts
//! implicit conversions, gated by [`PF_RESOLVE_NAMES`] so the debug modes
//! can produce a pure syntax tree. [`PF_ADD_INITIALIZERS`] additionally
//! turns local-variable initializers into assignment statements bundled
//! into the enclosing block.
//!
//! Exactly one token of lookahead is used, in exactly one place: telling
//! a labeled statement (`IDENT ':'`) apart from an expression statement.
//! A failed parse drops everything it allocated; a successful one is
//! consumed into a [`TranslationUnit`].

pub mod ast;
pub mod scope;
pub mod symbol;
pub mod types;

mod decl;
mod expr;
mod stmt;

#[cfg(test)]
mod tests;

use std::io::Read;

use fcc_lex::{Lexer, Token, TokenKind};
use fcc_util::{ErrorReported, Handler, PResult};

pub use ast::{BinOp, Category, Node, NodeKind, UnOp};
pub use scope::{Namespace, Scope, ScopeId, Scopes};
pub use symbol::{SymFlags, SymKind, Symbol, SymbolId, Syms, TranslationUnit};

/// Resolve identifiers to symbols and compute expression types.
pub const PF_RESOLVE_NAMES: u32 = 1 << 0;
/// Synthesize assignment statements from local initializers.
pub const PF_ADD_INITIALIZERS: u32 = 1 << 1;

/// What kind of entity a declaration introduces in the current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeclContext {
    Global,
    Local,
    Struct,
    Parameter,
}

pub struct Parser<'a, R> {
    lexer: Lexer<'a, R>,
    handler: &'a Handler,
    flags: u32,
    pub syms: Syms,
    pub scopes: Scopes,
    token: Token,
    token_next: Token,
    name_uid: u32,
    pub(crate) decl_context: DeclContext,
    pub(crate) function_locals_size: i32,
    /// Assignment statements synthesized from local initializers of the
    /// declaration currently being parsed.
    pub(crate) initializers: Option<Vec<Node>>,
}

impl<'a, R: Read> Parser<'a, R> {
    pub fn new(source: R, handler: &'a Handler, flags: u32) -> Self {
        let mut syms = Syms::new();
        let mut scopes = Scopes::new();
        symbol::install_builtins(&mut syms, &mut scopes);

        let mut parser = Parser {
            lexer: Lexer::new(source, handler),
            handler,
            flags,
            syms,
            scopes,
            token: Token::error(),
            token_next: Token::error(),
            name_uid: 0,
            decl_context: DeclContext::Global,
            function_locals_size: 0,
            initializers: None,
        };
        parser.token_next = parser.pull();
        parser.bump_quiet();
        parser
    }

    /// Parses a single expression without name resolution or typing
    /// unless the flags request it; the whole input must be consumed.
    pub fn parse_expression(mut self) -> PResult<(Node, TranslationUnit)> {
        let node = self.parse_expr(0)?;
        self.expect(TokenKind::Eos)?;
        Ok((node, self.into_unit(Scopes::root())))
    }

    /// Parses a single statement.
    pub fn parse_statement(mut self) -> PResult<(Node, TranslationUnit)> {
        let node = self.parse_stmt()?;
        self.expect(TokenKind::Eos)?;
        Ok((node, self.into_unit(Scopes::root())))
    }

    /// Parses a whole translation unit; returns the file-scope symbol
    /// table with everything it references.
    pub fn parse_unit(mut self) -> PResult<TranslationUnit> {
        let file_scope = self.push_scope()?;
        while !self.accept(TokenKind::Eos)? {
            self.decl_context = DeclContext::Global;
            self.parse_declaration()?;
        }
        Ok(self.into_unit(file_scope))
    }

    fn into_unit(self, file_scope: ScopeId) -> TranslationUnit {
        TranslationUnit {
            syms: self.syms,
            scopes: self.scopes,
            file_scope,
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    /// Next non-comment token from the lexer.
    fn pull(&mut self) -> Token {
        loop {
            let token = self.lexer.next_token();
            if token.kind != TokenKind::Comment {
                return token;
            }
        }
    }

    fn bump_quiet(&mut self) {
        let next = self.pull();
        self.token = std::mem::replace(&mut self.token_next, next);
    }

    /// Advances to the next token; fails if the lexer produced an error
    /// token (the lexer already reported it).
    pub(crate) fn bump(&mut self) -> PResult<()> {
        self.bump_quiet();
        if self.token.kind == TokenKind::Error {
            return Err(ErrorReported);
        }
        Ok(())
    }

    pub(crate) fn accept(&mut self, kind: TokenKind) -> PResult<bool> {
        if self.token.kind == kind {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn expect(&self, kind: TokenKind) -> PResult<()> {
        if self.token.kind != kind {
            return Err(self.unexpected_token(Some(kind.name())));
        }
        Ok(())
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> PResult<()> {
        self.expect(kind)?;
        self.bump()
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Reports an error at the current token.
    ///
    /// Silently propagates when the current token is the lexer's error
    /// sentinel; the lexer already reported the real problem.
    pub(crate) fn parser_error(&self, message: impl Into<String>) -> ErrorReported {
        if self.token.kind == TokenKind::Error {
            return ErrorReported;
        }
        self.handler.set_pos(self.token.line, self.token.column);
        self.handler.error(message)
    }

    pub(crate) fn unexpected_token(&self, expected: Option<&str>) -> ErrorReported {
        let found = self.token.kind.name();
        match expected {
            Some(expected) => {
                self.parser_error(format!("unexpected token {}, expected {}", found, expected))
            }
            None => self.parser_error(format!("unexpected token {}", found)),
        }
    }

    // ------------------------------------------------------------------
    // Modes and scopes
    // ------------------------------------------------------------------

    pub(crate) fn calc_types(&self) -> bool {
        self.flags & PF_RESOLVE_NAMES == PF_RESOLVE_NAMES
    }

    pub(crate) fn add_initializers(&self) -> bool {
        self.flags & PF_ADD_INITIALIZERS == PF_ADD_INITIALIZERS
    }

    /// Synthesized name for anonymous entities (`@arg7`, `@struct3`).
    pub(crate) fn generate_name(&mut self, prefix: &str) -> String {
        self.name_uid += 1;
        format!("{}{}", prefix, self.name_uid)
    }

    pub(crate) fn push_scope(&mut self) -> PResult<ScopeId> {
        self.scopes
            .enter()
            .ok_or_else(|| self.parser_error("too many nested scopes"))
    }

    pub(crate) fn push_scope_existing(&mut self, id: ScopeId) -> PResult<()> {
        if !self.scopes.enter_existing(id) {
            return Err(self.parser_error("too many nested scopes"));
        }
        Ok(())
    }

    pub(crate) fn put_symbol(&mut self, name: &str, ns: Namespace, symbol: SymbolId) {
        self.scopes.put(name, ns, symbol);
    }

    pub(crate) fn lookup(&self, name: &str, ns: Namespace) -> Option<SymbolId> {
        self.scopes.lookup(name, ns)
    }

    /// The elaborated type of an expression node.
    pub(crate) fn node_type(&self, node: &Node) -> PResult<SymbolId> {
        node.type_sym
            .ok_or_else(|| self.parser_error("expression has no type"))
    }
}
