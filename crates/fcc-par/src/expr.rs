//! Expression parsing and inline semantic elaboration.
//!
//! Eleven binary precedence levels from comma down to multiplicative;
//! level 10 descends through cast, unary, postfix, and primary
//! expressions. With name resolution on, each constructor also types the
//! node, inserts implicit conversions, and lowers sugar: `a[i]` becomes
//! `*(a + i)`, `a->f` becomes `(*a).f`, and `x op= y` becomes
//! `x = x op y`.

use std::io::Read;

use fcc_lex::TokenKind;
use fcc_util::PResult;

use crate::ast::{BinOp, Node, NodeKind, UnOp};
use crate::scope::Namespace;
use crate::symbol::{SymFlags, SymKind, Symbol, SymbolId, Syms};
use crate::types::{
    arith_common_type, cast_in_place, implicit_cast_to, is_compatible, is_ptr_type,
    is_var_symbol, resolve_alias,
};
use crate::Parser;

/// The binary operator recognized at the given precedence level, if the
/// token belongs to that level.
fn binop_for_level(kind: TokenKind, level: u32) -> Option<BinOp> {
    match (level, kind) {
        (0, TokenKind::Comma) => Some(BinOp::Comma),
        (1, TokenKind::PipePipe) => Some(BinOp::Or),
        (2, TokenKind::AmpAmp) => Some(BinOp::And),
        (3, TokenKind::Pipe) => Some(BinOp::BitOr),
        (4, TokenKind::Caret) => Some(BinOp::BitXor),
        (5, TokenKind::Amp) => Some(BinOp::BitAnd),
        (6, TokenKind::EqEq) => Some(BinOp::Eq),
        (6, TokenKind::NotEq) => Some(BinOp::Ne),
        (7, TokenKind::Lt) => Some(BinOp::Lt),
        (7, TokenKind::LtEq) => Some(BinOp::Le),
        (7, TokenKind::Gt) => Some(BinOp::Gt),
        (7, TokenKind::GtEq) => Some(BinOp::Ge),
        (8, TokenKind::Shl) => Some(BinOp::Shl),
        (8, TokenKind::Shr) => Some(BinOp::Shr),
        (9, TokenKind::Plus) => Some(BinOp::Add),
        (9, TokenKind::Minus) => Some(BinOp::Sub),
        (10, TokenKind::Star) => Some(BinOp::Mul),
        (10, TokenKind::Slash) => Some(BinOp::Div),
        (10, TokenKind::Percent) => Some(BinOp::Mod),
        _ => None,
    }
}

fn assign_op_from_token(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Eq => Some(BinOp::Assign),
        TokenKind::PlusEq => Some(BinOp::AddAssign),
        TokenKind::MinusEq => Some(BinOp::SubAssign),
        TokenKind::StarEq => Some(BinOp::MulAssign),
        TokenKind::SlashEq => Some(BinOp::DivAssign),
        TokenKind::PercentEq => Some(BinOp::ModAssign),
        TokenKind::ShlEq => Some(BinOp::ShlAssign),
        TokenKind::ShrEq => Some(BinOp::ShrAssign),
        TokenKind::PipeEq => Some(BinOp::OrAssign),
        TokenKind::AmpEq => Some(BinOp::AndAssign),
        TokenKind::CaretEq => Some(BinOp::XorAssign),
        _ => None,
    }
}

impl<'a, R: Read> Parser<'a, R> {
    /// Binary expression at the given precedence level; left-associative.
    pub(crate) fn parse_expr(&mut self, level: u32) -> PResult<Node> {
        let mut node = self.parse_expr_operand(level)?;
        while let Some(op) = binop_for_level(self.token.kind, level) {
            self.bump()?;
            let rhs = self.parse_expr_operand(level)?;
            let mut new_node = Node::new(NodeKind::Binary(op, Box::new(node), Box::new(rhs)));
            if self.calc_types() && !self.type_binary(&mut new_node) {
                return Err(self.parser_error("invalid operands"));
            }
            node = new_node;
        }
        Ok(node)
    }

    fn parse_expr_operand(&mut self, level: u32) -> PResult<Node> {
        match level {
            0 => self.parse_assign_expr(),
            10 => self.parse_cast_expr(),
            _ => self.parse_expr(level + 1),
        }
    }

    pub(crate) fn parse_const_expr(&mut self) -> PResult<Node> {
        self.parse_cond_expr()
    }

    pub(crate) fn parse_ident(&mut self) -> PResult<Node> {
        self.expect(TokenKind::Ident)?;
        let name = self.token.value.take_str();
        self.bump()?;
        Ok(Node::new(NodeKind::Ident(name)))
    }

    fn parse_primary_expr(&mut self) -> PResult<Node> {
        match self.token.kind {
            TokenKind::LParen => {
                self.consume(TokenKind::LParen)?;
                if self.is_type_specifier_start() {
                    // `( type-name ) cast-expression`
                    let mut name = None;
                    let mut ty = self.parse_specifier_qualifier_list()?;
                    if self.token.kind != TokenKind::RParen {
                        ty = self.parse_declarator(ty, &mut name)?;
                    }
                    if name.is_some() {
                        return Err(
                            self.parser_error("cast expression: expected abstract declarator")
                        );
                    }
                    self.consume(TokenKind::RParen)?;
                    let operand = self.parse_cast_expr()?;
                    Ok(Node::with_type(NodeKind::Cast(Box::new(operand)), ty))
                } else {
                    let node = self.parse_expr(0)?;
                    self.consume(TokenKind::RParen)?;
                    Ok(node)
                }
            }
            TokenKind::StringConst => {
                let bytes = self.token.value.take_bytes();
                self.bump()?;
                Ok(Node::with_type(NodeKind::Str(bytes), Syms::CHAR_PTR))
            }
            TokenKind::Ident if self.calc_types() => self.parse_resolved_ident(),
            TokenKind::Ident => self.parse_ident(),
            TokenKind::IntConst => {
                let value = self.token.int_value();
                self.bump()?;
                Ok(Node::with_type(NodeKind::Int(value), Syms::INT))
            }
            TokenKind::FloatConst => {
                let value = self.token.float_value();
                self.bump()?;
                Ok(Node::with_type(NodeKind::Double(value), Syms::DOUBLE))
            }
            _ => Err(self.unexpected_token(None)),
        }
    }

    fn parse_resolved_ident(&mut self) -> PResult<Node> {
        let Some(symbol) = self.lookup(self.token.str_value(), Namespace::Name) else {
            return Err(self.parser_error("undeclared identifier"));
        };
        let kind = self.syms[symbol].kind;
        if !is_var_symbol(kind) && kind != SymKind::Function && kind != SymKind::EnumConst {
            return Err(self.parser_error("expected variable type"));
        }
        self.bump()?;

        let var = Node::with_type(NodeKind::Var(symbol), symbol);
        let resolved = resolve_alias(&self.syms, symbol);
        if self.syms[resolved].kind == SymKind::Array {
            // Arrays decay to a pointer to their element type.
            let mut pointer = Symbol::new(SymKind::Pointer);
            pointer.base_type = self.syms[resolved].base_type;
            pointer.size = self.syms[Syms::INT].size;
            let pointer = self.syms.alloc(pointer);
            return Ok(Node::with_type(
                NodeKind::Unary(UnOp::Ref, Box::new(var)),
                pointer,
            ));
        }
        Ok(var)
    }

    /// The function a call target resolves to: either a function symbol
    /// or a variable of pointer-to-function type.
    fn get_callable(&self, id: SymbolId) -> Option<SymbolId> {
        let symbol = &self.syms[id];
        match symbol.kind {
            SymKind::Function => Some(id),
            kind if is_var_symbol(kind) => {
                let base = symbol.base_type?;
                if self.syms[base].kind != SymKind::Pointer {
                    return None;
                }
                let target = self.syms[base].base_type?;
                (self.syms[target].kind == SymKind::Function).then_some(target)
            }
            _ => None,
        }
    }

    fn parse_postfix_expr(&mut self) -> PResult<Node> {
        let mut node = self.parse_primary_expr()?;
        loop {
            match self.token.kind {
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.token.kind == TokenKind::PlusPlus {
                        UnOp::PostInc
                    } else {
                        UnOp::PostDec
                    };
                    let mut unode = Node::new(NodeKind::Unary(op, Box::new(node)));
                    if self.calc_types() {
                        self.type_inc_expr(&mut unode)?;
                    }
                    self.bump()?;
                    node = unode;
                }
                TokenKind::LParen => {
                    node = self.parse_call(node)?;
                }
                TokenKind::Dot | TokenKind::Arrow | TokenKind::LBracket => {
                    node = self.parse_member_or_subscript(node)?;
                }
                _ => return Ok(node),
            }
        }
    }

    fn parse_call(&mut self, callee: Node) -> PResult<Node> {
        let func = callee.type_sym.and_then(|ty| self.get_callable(ty));
        if self.calc_types() && func.is_none() {
            return Err(self.parser_error("expected function or function pointer"));
        }

        self.consume(TokenKind::LParen)?;
        let scope = self.push_scope()?;
        let mut args = Vec::new();
        if self.token.kind != TokenKind::RParen {
            loop {
                args.push(self.parse_assign_expr()?);
                if !self.accept(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.scopes.exit();
        self.consume(TokenKind::RParen)?;

        let mut list = Node::new(NodeKind::List(args));
        list.scope = Some(scope);
        let mut call = Node::new(NodeKind::Binary(
            BinOp::Call,
            Box::new(callee),
            Box::new(list),
        ));
        if self.calc_types() {
            if let Some(func) = func {
                self.type_call(&mut call, func)?;
            }
        }
        Ok(call)
    }

    /// Checks arity, casts arguments to parameter types, and records each
    /// parameter's byte offset from the left for the code generator.
    fn type_call(&mut self, call: &mut Node, func: SymbolId) -> PResult<()> {
        call.type_sym = self.syms[func].base_type;

        let params: Vec<SymbolId> = match self.syms[func].members {
            Some(members) => self.scopes.get(members).symbols().collect(),
            None => Vec::new(),
        };
        let variadic = self.syms[func].flags.contains(SymFlags::VARIADIC);

        let arg_count = match &call.kind {
            NodeKind::Binary(_, _, list) => match &list.kind {
                NodeKind::List(args) => args.len(),
                _ => 0,
            },
            _ => 0,
        };
        if arg_count < params.len() {
            return Err(self.parser_error("too few arguments to function"));
        }
        if arg_count > params.len() && !variadic {
            return Err(self.parser_error("too many arguments to function"));
        }

        let mut offset = 0;
        for (index, &param) in params.iter().enumerate() {
            let Some(ty) = self.syms[param].base_type else {
                continue;
            };
            self.syms[param].offset = offset;
            offset += self.syms[ty].size;
            if let NodeKind::Binary(_, _, list) = &mut call.kind {
                if let NodeKind::List(args) = &mut list.kind {
                    cast_in_place(&self.syms, &self.scopes, ty, &mut args[index]);
                }
            }
        }
        Ok(())
    }

    fn parse_member_or_subscript(&mut self, node: Node) -> PResult<Node> {
        let tk = self.token.kind;
        self.bump()?;

        let bnode = match tk {
            TokenKind::LBracket => {
                let index = self.parse_expr(0)?;
                let n = Node::new(NodeKind::Binary(
                    BinOp::Subscript,
                    Box::new(node),
                    Box::new(index),
                ));
                self.consume(TokenKind::RBracket)?;
                n
            }
            TokenKind::Dot => {
                let field = self.parse_ident()?;
                Node::new(NodeKind::Binary(BinOp::Member, Box::new(node), Box::new(field)))
            }
            _ => {
                let field = self.parse_ident()?;
                Node::new(NodeKind::Binary(
                    BinOp::MemberByPtr,
                    Box::new(node),
                    Box::new(field),
                ))
            }
        };

        if !self.calc_types() {
            return Ok(bnode);
        }
        match tk {
            TokenKind::LBracket => self.type_subscript(bnode),
            TokenKind::Arrow => self.type_member_by_ptr(bnode),
            _ => {
                let mut bnode = bnode;
                self.type_member(&mut bnode)?;
                Ok(bnode)
            }
        }
    }

    /// Lowers `a[i]` to `*(a + i)`, moving the pointer to the left when
    /// the subscript is written the other way round.
    fn type_subscript(&mut self, node: Node) -> PResult<Node> {
        let NodeKind::Binary(_, mut base, mut index) = node.kind else {
            return Err(self.parser_error("expected pointer type"));
        };

        let index_ty = resolve_alias(&self.syms, self.node_type(&index)?);
        if is_ptr_type(self.syms[index_ty].kind) {
            std::mem::swap(&mut base, &mut index);
        }

        let base_ty = resolve_alias(&self.syms, self.node_type(&base)?);
        if !is_ptr_type(self.syms[base_ty].kind) {
            return Err(self.parser_error("expected pointer type"));
        }

        let index_ty = resolve_alias(&self.syms, self.node_type(&index)?);
        let index_ok = index_ty == Syms::INT
            || index_ty == Syms::CHAR
            || self.syms[index_ty].kind == SymKind::EnumConst;
        if !index_ok {
            return Err(self.parser_error("array index must be integer expression"));
        }
        cast_in_place(&self.syms, &self.scopes, Syms::INT, &mut index);

        let Some(elem_ty) = self.syms[base_ty].base_type else {
            return Err(self.parser_error("expected pointer type"));
        };
        let add = Node::with_type(NodeKind::Binary(BinOp::Add, base, index), base_ty);
        Ok(Node::with_type(
            NodeKind::Unary(UnOp::Deref, Box::new(add)),
            elem_ty,
        ))
    }

    /// Lowers `a->f` to `(*a).f`.
    fn type_member_by_ptr(&mut self, node: Node) -> PResult<Node> {
        let NodeKind::Binary(_, object, field) = node.kind else {
            return Err(self.parser_error("expected pointer type"));
        };

        let object_ty = resolve_alias(&self.syms, self.node_type(&object)?);
        if !is_ptr_type(self.syms[object_ty].kind) {
            return Err(self.parser_error("expected pointer type"));
        }
        let Some(target) = self.syms[object_ty].base_type else {
            return Err(self.parser_error("expected pointer type"));
        };

        let deref = Node::with_type(NodeKind::Unary(UnOp::Deref, object), target);
        let mut member = Node::new(NodeKind::Binary(
            BinOp::Member,
            Box::new(deref),
            field,
        ));
        self.type_member(&mut member)?;
        Ok(member)
    }

    fn type_member(&mut self, node: &mut Node) -> PResult<()> {
        let NodeKind::Binary(_, object, field) = &mut node.kind else {
            return Ok(());
        };

        let object_ty = object
            .type_sym
            .ok_or_else(|| self.no_type_error())?;
        let object_ty = resolve_alias(&self.syms, object_ty);
        if !matches!(self.syms[object_ty].kind, SymKind::Struct | SymKind::Union) {
            return Err(self.parser_error("expected struct or union"));
        }

        let NodeKind::Ident(field_name) = &field.kind else {
            return Err(self.parser_error("expected valid field name"));
        };
        let Some(members) = self.syms[object_ty].members else {
            return Err(self.parser_error("expected valid field name"));
        };
        let Some(field_sym) = self.scopes.get(members).get(field_name, Namespace::Name) else {
            return Err(self.parser_error("expected valid field name"));
        };
        if self.syms[field_sym].kind != SymKind::Field {
            return Err(self.parser_error("expected valid field name"));
        }

        field.type_sym = Some(field_sym);
        node.type_sym = self.syms[field_sym].base_type;
        Ok(())
    }

    fn no_type_error(&self) -> fcc_util::ErrorReported {
        self.parser_error("expression has no type")
    }

    /// `++`/`--` in either position: lvalue of int, char, or double.
    fn type_inc_expr(&mut self, node: &mut Node) -> PResult<()> {
        let (is_lvalue, operand_ty) = match &node.kind {
            NodeKind::Unary(_, operand) => (operand.is_lvalue(), self.node_type(operand)?),
            _ => return Ok(()),
        };
        if !is_lvalue {
            return Err(self.parser_error("lvalue expected"));
        }
        let ty = resolve_alias(&self.syms, operand_ty);
        if ty != Syms::INT && ty != Syms::CHAR && ty != Syms::DOUBLE {
            return Err(self.parser_error("invalid operand"));
        }
        node.type_sym = Some(ty);
        Ok(())
    }

    pub(crate) fn parse_cast_expr(&mut self) -> PResult<Node> {
        self.parse_unary_expr()
    }

    fn parse_unary_expr(&mut self) -> PResult<Node> {
        let op = match self.token.kind {
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            TokenKind::Amp => Some(UnOp::Ref),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Minus => Some(UnOp::Minus),
            TokenKind::Tilde => Some(UnOp::Compl),
            TokenKind::Not => Some(UnOp::Not),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix_expr();
        };
        self.bump()?;

        if matches!(op, UnOp::PreInc | UnOp::PreDec) {
            let operand = self.parse_unary_expr()?;
            let ty = operand.type_sym;
            let mut node = Node::new(NodeKind::Unary(op, Box::new(operand)));
            node.type_sym = ty;
            if self.calc_types() {
                self.type_inc_expr(&mut node)?;
            }
            return Ok(node);
        }

        let operand = self.parse_cast_expr()?;
        let mut node = Node::new(NodeKind::Unary(op, Box::new(operand)));
        if self.calc_types() {
            self.type_unary(&mut node)?;
        }
        Ok(node)
    }

    fn type_unary(&mut self, node: &mut Node) -> PResult<()> {
        let (op, is_lvalue, operand_ty) = match &node.kind {
            NodeKind::Unary(op, operand) => (*op, operand.is_lvalue(), self.node_type(operand)?),
            _ => return Ok(()),
        };
        let ty = resolve_alias(&self.syms, operand_ty);
        let kind = self.syms[ty].kind;

        match op {
            UnOp::Not => {
                let numeric = ty == Syms::DOUBLE
                    || ty == Syms::CHAR
                    || is_compatible(&self.syms, &self.scopes, ty, Syms::INT);
                if !numeric {
                    return Err(self.parser_error("invalid operand"));
                }
                node.type_sym = Some(Syms::INT);
            }
            UnOp::Minus | UnOp::Plus => {
                let ok = ty == Syms::INT
                    || ty == Syms::CHAR
                    || ty == Syms::DOUBLE
                    || kind == SymKind::EnumConst;
                if !ok {
                    return Err(self.parser_error("invalid operand"));
                }
                node.type_sym = Some(ty);
            }
            UnOp::Compl => {
                let ok = ty == Syms::INT || ty == Syms::CHAR || kind == SymKind::EnumConst;
                if !ok {
                    return Err(self.parser_error("invalid operand"));
                }
                node.type_sym = Some(ty);
            }
            UnOp::Deref => {
                if !is_ptr_type(kind) {
                    return Err(self.parser_error("expected pointer type"));
                }
                node.type_sym = self.syms[ty].base_type;
            }
            UnOp::Ref => {
                if !is_lvalue {
                    return Err(self.parser_error("lvalue expected"));
                }
                let mut pointer = Symbol::new(SymKind::Pointer);
                pointer.base_type = Some(ty);
                pointer.size = self.syms[Syms::INT].size;
                node.type_sym = Some(self.syms.alloc(pointer));
            }
            _ => {
                node.type_sym = Some(ty);
            }
        }
        Ok(())
    }

    /// `cond ? a : b`; right-associative.
    fn parse_cond_expr(&mut self) -> PResult<Node> {
        let cond = self.parse_expr(1)?;
        if !self.accept(TokenKind::Question)? {
            return Ok(cond);
        }
        let then = self.parse_expr(0)?;
        self.consume(TokenKind::Colon)?;
        let alt = self.parse_cond_expr()?;

        let mut node = Node::new(NodeKind::Ternary(
            Box::new(cond),
            Box::new(then),
            Box::new(alt),
        ));
        if self.calc_types() {
            let branch_types = match &node.kind {
                NodeKind::Ternary(_, then, alt) => (then.type_sym, alt.type_sym),
                _ => (None, None),
            };
            let t1 = branch_types.0.ok_or_else(|| self.no_type_error())?;
            let t2 = branch_types.1.ok_or_else(|| self.no_type_error())?;
            let t1 = resolve_alias(&self.syms, t1);
            let t2 = resolve_alias(&self.syms, t2);
            let Some(common) = arith_common_type(&self.syms, t1, t2) else {
                return Err(self.parser_error("wrong operand type"));
            };
            if let NodeKind::Ternary(_, then, alt) = &mut node.kind {
                cast_in_place(&self.syms, &self.scopes, common, then);
                cast_in_place(&self.syms, &self.scopes, common, alt);
            }
            node.type_sym = Some(common);
        }
        Ok(node)
    }

    pub(crate) fn parse_assign_expr(&mut self) -> PResult<Node> {
        let lhs = self.parse_cond_expr()?;
        let Some(op) = assign_op_from_token(self.token.kind) else {
            return Ok(lhs);
        };
        self.bump()?;

        let lhs_ty = lhs.type_sym;
        if self.calc_types() && !lhs.is_lvalue() {
            return Err(self.parser_error("lvalue expected"));
        }
        let mut rhs = self.parse_assign_expr()?;

        let mut final_op = op;
        if self.calc_types() {
            let Some(dst) = lhs_ty else {
                return Err(self.parser_error("invalid operand"));
            };
            rhs = implicit_cast_to(&self.syms, &self.scopes, dst, rhs);

            if let Some(base_op) = op.assign_base() {
                // Expand `x op= y` into `x = x op y`.
                let mut op_node = Node::new(NodeKind::Binary(
                    base_op,
                    Box::new(lhs.clone()),
                    Box::new(rhs),
                ));
                if !self.type_binary(&mut op_node) {
                    return Err(self.parser_error("invalid operand"));
                }
                rhs = op_node;
                final_op = BinOp::Assign;
            }
        }

        let mut node = Node::new(NodeKind::Binary(final_op, Box::new(lhs), Box::new(rhs)));
        node.type_sym = lhs_ty;
        Ok(node)
    }

    /// Types a binary node: promotions, pointer arithmetic, and operand
    /// conversions. Returns false when the operands do not fit the
    /// operator.
    fn type_binary(&self, node: &mut Node) -> bool {
        let type_sym;
        {
            let NodeKind::Binary(op, lhs, rhs) = &mut node.kind else {
                return false;
            };
            let op = *op;
            let (Some(lt), Some(rt)) = (lhs.type_sym, rhs.type_sym) else {
                return false;
            };

            if op == BinOp::Comma {
                node.type_sym = Some(rt);
                return true;
            }

            let mut t1 = resolve_alias(&self.syms, lt);
            let mut t2 = resolve_alias(&self.syms, rt);
            let ptr1 = is_ptr_type(self.syms[t1].kind);
            let ptr2 = is_ptr_type(self.syms[t2].kind);

            // Pointer difference and pointer comparison yield int.
            let ptr_compare = matches!(
                op,
                BinOp::Sub | BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
            );
            if ptr_compare && ptr1 && ptr2 {
                if !is_compatible(&self.syms, &self.scopes, t1, t2) {
                    return false;
                }
                node.type_sym = Some(Syms::INT);
                return true;
            }

            // `ptr + int`, normalized so the pointer is on the left.
            if op == BinOp::Add && (ptr1 || ptr2) {
                if ptr2 {
                    std::mem::swap(lhs, rhs);
                    std::mem::swap(&mut t1, &mut t2);
                }
                let index_ok = t2 == Syms::INT
                    || t2 == Syms::CHAR
                    || self.syms[t2].kind == SymKind::EnumConst;
                if !index_ok {
                    return false;
                }
                cast_in_place(&self.syms, &self.scopes, Syms::INT, rhs);
                node.type_sym = Some(t1);
                return true;
            }

            let common = arith_common_type(&self.syms, t1, t2);
            type_sym = if op.is_comparison() {
                Some(Syms::INT)
            } else {
                common
            };
            if type_sym == Some(Syms::DOUBLE) && op.is_int_only() {
                return false;
            }

            let operand_ty = if matches!(op, BinOp::Or | BinOp::And) {
                Some(Syms::INT)
            } else {
                common
            };
            let Some(operand_ty) = operand_ty else {
                return false;
            };
            cast_in_place(&self.syms, &self.scopes, operand_ty, lhs);
            cast_in_place(&self.syms, &self.scopes, operand_ty, rhs);
        }
        node.type_sym = type_sym;
        true
    }
}
