//! Statement parsing.
//!
//! Statements introducing a scope (blocks, loop bodies, if branches)
//! record it on the node. With [`crate::PF_ADD_INITIALIZERS`] on, a
//! declaration statement evaluates to the bundle of assignments its
//! initializers synthesized; otherwise it evaluates to a nop and empty
//! nops are dropped from blocks.

use std::io::Read;

use fcc_lex::TokenKind;
use fcc_util::PResult;

use crate::ast::{Node, NodeKind};
use crate::Parser;

impl<'a, R: Read> Parser<'a, R> {
    pub(crate) fn parse_stmt(&mut self) -> PResult<Node> {
        match self.token.kind {
            TokenKind::Return => {
                self.bump()?;
                let (value, ty) = if self.token.kind == TokenKind::Semicolon {
                    (Node::nop(), Some(crate::Syms::VOID))
                } else {
                    let expr = self.parse_expr(0)?;
                    let ty = expr.type_sym;
                    (expr, ty)
                };
                self.consume(TokenKind::Semicolon)?;
                let mut node = Node::new(NodeKind::Return(Box::new(value)));
                node.type_sym = ty;
                Ok(node)
            }
            TokenKind::While => {
                self.consume(TokenKind::While)?;
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr(0)?;
                self.consume(TokenKind::RParen)?;
                let scope = self.push_scope()?;
                let body = self.parse_stmt()?;
                self.scopes.exit();
                let mut node = Node::new(NodeKind::While(Box::new(cond), Box::new(body)));
                node.scope = Some(scope);
                Ok(node)
            }
            TokenKind::Do => {
                self.consume(TokenKind::Do)?;
                let body = self.parse_stmt()?;
                self.consume(TokenKind::While)?;
                self.consume(TokenKind::LParen)?;
                let scope = self.push_scope()?;
                let cond = self.parse_expr(0)?;
                self.scopes.exit();
                self.consume(TokenKind::RParen)?;
                self.consume(TokenKind::Semicolon)?;
                let mut node = Node::new(NodeKind::DoWhile(Box::new(body), Box::new(cond)));
                node.scope = Some(scope);
                Ok(node)
            }
            TokenKind::For => {
                self.consume(TokenKind::For)?;
                self.consume(TokenKind::LParen)?;
                let init = self.parse_opt_expr_until(TokenKind::Semicolon)?;
                let cond = self.parse_opt_expr_until(TokenKind::Semicolon)?;
                let step = self.parse_opt_expr_until(TokenKind::RParen)?;
                let scope = self.push_scope()?;
                let body = self.parse_stmt()?;
                self.scopes.exit();
                let mut node = Node::new(NodeKind::For(
                    Box::new(init),
                    Box::new(cond),
                    Box::new(step),
                    Box::new(body),
                ));
                node.scope = Some(scope);
                Ok(node)
            }
            TokenKind::If => {
                self.consume(TokenKind::If)?;
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr(0)?;
                self.consume(TokenKind::RParen)?;
                let scope = self.push_scope()?;
                let then = self.parse_stmt()?;
                self.scopes.exit();
                let alt = if self.accept(TokenKind::Else)? {
                    self.parse_stmt()?
                } else {
                    Node::nop()
                };
                let mut node = Node::new(NodeKind::If(
                    Box::new(cond),
                    Box::new(then),
                    Box::new(alt),
                ));
                node.scope = Some(scope);
                Ok(node)
            }
            TokenKind::Switch => {
                self.consume(TokenKind::Switch)?;
                self.consume(TokenKind::LParen)?;
                let cond = self.parse_expr(0)?;
                self.consume(TokenKind::RParen)?;
                let scope = self.push_scope()?;
                let body = self.parse_stmt()?;
                self.scopes.exit();
                let mut node = Node::new(NodeKind::Switch(Box::new(cond), Box::new(body)));
                node.scope = Some(scope);
                Ok(node)
            }
            TokenKind::LBrace => {
                self.consume(TokenKind::LBrace)?;
                let scope = self.push_scope()?;
                let mut items = Vec::new();
                while !self.accept(TokenKind::RBrace)? {
                    let stmt = self.parse_stmt()?;
                    // Empty statements carry nothing; drop them.
                    if stmt.kind != NodeKind::Nop {
                        items.push(stmt);
                    }
                }
                self.scopes.exit();
                let mut node = Node::new(NodeKind::List(items));
                node.scope = Some(scope);
                Ok(node)
            }
            TokenKind::Break => {
                self.consume(TokenKind::Break)?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Node::new(NodeKind::Break))
            }
            TokenKind::Continue => {
                self.consume(TokenKind::Continue)?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Node::new(NodeKind::Continue))
            }
            TokenKind::Goto => {
                self.consume(TokenKind::Goto)?;
                let target = self.parse_ident()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Node::new(NodeKind::Goto(Box::new(target))))
            }
            TokenKind::Default => {
                self.consume(TokenKind::Default)?;
                self.consume(TokenKind::Colon)?;
                let body = self.parse_stmt()?;
                Ok(Node::new(NodeKind::DefaultCase(Box::new(body))))
            }
            TokenKind::Case => {
                self.consume(TokenKind::Case)?;
                let value = self.parse_const_expr()?;
                self.consume(TokenKind::Colon)?;
                let body = self.parse_stmt()?;
                Ok(Node::new(NodeKind::Case(Box::new(value), Box::new(body))))
            }
            _ => self.parse_other_stmt(),
        }
    }

    fn parse_other_stmt(&mut self) -> PResult<Node> {
        if self.accept(TokenKind::Semicolon)? {
            return Ok(Node::nop());
        }

        // The one place lookahead is needed: `IDENT :` starts a labeled
        // statement, anything else is an expression statement.
        if self.token.kind == TokenKind::Ident && self.token_next.kind == TokenKind::Colon {
            let label = self.parse_ident()?;
            self.consume(TokenKind::Colon)?;
            let body = self.parse_stmt()?;
            return Ok(Node::new(NodeKind::Labeled(Box::new(label), Box::new(body))));
        }

        if self.is_type_specifier_start() {
            if self.add_initializers() {
                let saved = self.initializers.take();
                self.initializers = Some(Vec::new());
                let result = self.parse_declaration();
                let inits = self.initializers.take().unwrap_or_default();
                self.initializers = saved;
                result?;
                return Ok(Node::new(NodeKind::List(inits)));
            }
            self.parse_declaration()?;
            return Ok(Node::nop());
        }

        let node = self.parse_expr(0)?;
        self.consume(TokenKind::Semicolon)?;
        Ok(node)
    }

    /// Optional expression terminated by `until` (`for` headers); a bare
    /// terminator yields a nop.
    fn parse_opt_expr_until(&mut self, until: TokenKind) -> PResult<Node> {
        if self.accept(until)? {
            return Ok(Node::nop());
        }
        let node = self.parse_expr(0)?;
        self.consume(until)?;
        Ok(node)
    }
}
