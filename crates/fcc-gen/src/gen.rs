//! AST to instruction-list lowering.
//!
//! A pure stack machine over x86: every expression value lives on the C
//! stack, 4 bytes for scalars and pointers, 8 for doubles moved through
//! the x87 FPU. The `ret` flag threaded through every emitter says
//! whether the value must remain pushed; statement contexts pass false so
//! the final push can be skipped.
//!
//! eax is the accumulator, ebx the right-hand scratch, ecx/cl the setCC
//! and shift-count register, edx the division upper half.

use fcc_par::ast::{BinOp, Category, Node, NodeKind, UnOp};
use fcc_par::symbol::{SymFlags, SymKind, SymbolId, Syms, TranslationUnit};
use fcc_par::types::{is_int_like, resolve_alias};

use crate::asm::{
    deref, dword, imm, label, mem, named_label, qword, Code, Ins, Item, LabelRef, Op, Operand,
    CL, EAX, EBP, EBX, ECX, EDX, ESP, ST0, ST1,
};

/// Generates code for every defined function in the unit.
///
/// Function bodies are taken out of their symbols for the duration and
/// put back afterwards; the arena itself is mutated to assign data labels
/// and parameter offsets lazily.
pub fn generate(unit: &mut TranslationUnit) -> Code {
    let functions: Vec<SymbolId> = unit
        .scopes
        .get(unit.file_scope)
        .symbols()
        .filter(|&id| unit.syms[id].kind == SymKind::Function)
        .collect();

    let mut generator = Generator {
        syms: &mut unit.syms,
        code: Code::new(),
        label_counter: 0,
        return_label: 0,
    };
    for function in functions {
        generator.generate_function(function);
    }
    generator.code
}

struct Generator<'a> {
    syms: &'a mut Syms,
    code: Code,
    label_counter: u32,
    /// Jump target of `return` in the function being generated.
    return_label: u32,
}

impl<'a> Generator<'a> {
    fn emit(&mut self, op: Op, operands: Vec<Operand>) {
        self.code.text.push(Item::Ins(Ins::new(op, operands)));
    }

    fn emit_label(&mut self, id: u32) {
        self.code.text.push(Item::Label(LabelRef::Id(id)));
    }

    fn emit_name_label(&mut self, name: &str) {
        self.code.text.push(Item::Label(LabelRef::Name(name.to_string())));
    }

    fn emit_comment(&mut self, text: String) {
        self.code.text.push(Item::Comment(text));
    }

    fn emit_data(&mut self, text: String) {
        self.code.data.push(Item::Raw(text));
    }

    fn gen_label(&mut self) -> u32 {
        self.label_counter += 1;
        self.label_counter
    }

    /// Emits a `db` directive for raw bytes and returns its fresh label.
    fn emit_data_bytes(&mut self, bytes: &[u8]) -> u32 {
        let data_label = self.gen_label();
        let mut line = format!("_@{} db ", data_label);
        for (index, byte) in bytes.iter().enumerate() {
            if index > 0 {
                line.push(',');
            }
            line.push_str(&byte.to_string());
        }
        self.emit_data(line);
        data_label
    }

    fn node_ty(&self, node: &Node) -> SymbolId {
        node.type_sym.unwrap_or(Syms::VOID)
    }

    fn resolved_ty(&self, node: &Node) -> SymbolId {
        resolve_alias(self.syms, self.node_ty(node))
    }

    fn is_int_like_or_ptr(&self, id: SymbolId) -> bool {
        is_int_like(self.syms, id) || self.syms[id].kind == SymKind::Pointer
    }

    /// Pushes a value read from `operand`, honoring the 8-byte FPU path
    /// for doubles.
    fn push_value(&mut self, operand: Operand, ty: SymbolId, ret: bool) {
        if !ret {
            return;
        }
        let ty = resolve_alias(self.syms, ty);
        if ty == Syms::DOUBLE {
            self.emit(Op::Sub, vec![ESP, imm(8)]);
            self.emit(Op::Fld, vec![qword(operand)]);
            self.emit(Op::Fstp, vec![qword(deref(ESP))]);
        } else {
            self.emit(Op::Push, vec![dword(operand)]);
        }
    }

    /// The addressable location of an lvalue expression as a memory
    /// operand; may clobber eax.
    fn lvalue(&mut self, expr: &Node) -> Operand {
        match &expr.kind {
            NodeKind::Var(symbol) => {
                let symbol = *symbol;
                match self.syms[symbol].kind {
                    SymKind::Parameter => dword(mem(EBP, self.syms[symbol].offset + 8)),
                    SymKind::Variable => {
                        let offset = self.syms[symbol].offset - self.syms[symbol].size;
                        dword(mem(EBP, offset))
                    }
                    SymKind::GlobalVariable => {
                        if self.syms[symbol].label == 0 {
                            let data_label = self.gen_label();
                            self.syms[symbol].label = data_label;
                            let reservation =
                                format!("_@{} db {} dup(0)", data_label, self.syms[symbol].size);
                            self.emit_data(reservation);
                        }
                        dword(deref(label(self.syms[symbol].label)))
                    }
                    other => {
                        self.emit_comment(format!("unhandled var symbol {:?}", other));
                        deref(imm(0))
                    }
                }
            }
            NodeKind::Unary(UnOp::Deref, inner) => {
                self.generate_expr(inner, true);
                self.emit(Op::Pop, vec![EAX]);
                deref(EAX)
            }
            NodeKind::Binary(BinOp::Member, object, field) => {
                let object_place = self.lvalue(object);
                self.emit(Op::Lea, vec![EAX, object_place]);
                let offset = field
                    .type_sym
                    .map(|f| self.syms[f].offset)
                    .unwrap_or(0);
                mem(EAX, offset)
            }
            _ => {
                self.emit_comment(format!("'{}' is not lvalue", expr.repr()));
                deref(imm(0))
            }
        }
    }

    /// Pushes the address of an lvalue.
    fn generate_lvalue(&mut self, expr: &Node) {
        let place = self.lvalue(expr);
        self.emit(Op::Lea, vec![EAX, place]);
        self.emit(Op::Push, vec![EAX]);
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn generate_expr(&mut self, expr: &Node, ret: bool) {
        match &expr.kind {
            NodeKind::Nop => {}
            NodeKind::List(items) => {
                for item in items {
                    self.generate_expr(item, false);
                }
            }
            NodeKind::Binary(BinOp::Call, callee, args) => {
                self.generate_call(expr, callee, args, ret);
            }
            NodeKind::Str(bytes) => {
                let mut data = bytes.clone();
                data.push(0);
                let data_label = self.emit_data_bytes(&data);
                if ret {
                    self.emit(Op::Push, vec![label(data_label)]);
                }
            }
            NodeKind::Double(value) => {
                let data_label = self.emit_data_bytes(&value.to_le_bytes());
                self.push_value(deref(label(data_label)), self.node_ty(expr), ret);
            }
            NodeKind::Binary(BinOp::Member, _, _) => {
                let place = self.lvalue(expr);
                self.emit(Op::Lea, vec![EAX, place]);
                self.push_value(deref(EAX), self.node_ty(expr), ret);
            }
            NodeKind::Ternary(cond, then, alt) => {
                let l1 = self.gen_label();
                let l2 = self.gen_label();
                self.generate_expr(cond, true);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Test, vec![EAX, EAX]);
                self.emit(Op::Jz, vec![label(l1)]);
                self.generate_expr(then, ret);
                self.emit(Op::Jmp, vec![label(l2)]);
                self.emit_label(l1);
                self.generate_expr(alt, ret);
                self.emit_label(l2);
            }
            NodeKind::Binary(BinOp::Assign, lhs, rhs) => {
                if self.resolved_ty(lhs) == Syms::DOUBLE {
                    self.generate_expr(rhs, true);
                    self.emit(Op::Fld, vec![qword(deref(ESP))]);
                    self.generate_lvalue(lhs);
                    self.emit(Op::Pop, vec![EAX]);
                    if ret {
                        self.emit(Op::Fst, vec![qword(deref(ESP))]);
                    } else {
                        self.emit(Op::Add, vec![ESP, imm(8)]);
                    }
                    self.emit(Op::Fstp, vec![qword(deref(EAX))]);
                } else {
                    self.generate_lvalue(lhs);
                    self.generate_expr(rhs, true);
                    self.emit(Op::Pop, vec![EBX]);
                    self.emit(Op::Pop, vec![EAX]);
                    self.emit(Op::Mov, vec![deref(EAX), EBX]);
                    if ret {
                        self.emit(Op::Push, vec![EBX]);
                    }
                }
            }
            NodeKind::Cast(inner) => {
                let to = resolve_alias(self.syms, self.node_ty(expr));
                let from = self.resolved_ty(inner);
                self.generate_expr(inner, ret);
                if ret {
                    if self.is_int_like_or_ptr(from) && to == Syms::DOUBLE {
                        self.emit(Op::Fild, vec![dword(deref(ESP))]);
                        self.emit(Op::Sub, vec![ESP, imm(4)]);
                        self.emit(Op::Fstp, vec![qword(deref(ESP))]);
                    } else if from == Syms::DOUBLE && self.is_int_like_or_ptr(to) {
                        self.emit(Op::Fld, vec![qword(deref(ESP))]);
                        self.emit(Op::Fisttp, vec![dword(mem(ESP, 4))]);
                        self.emit(Op::Add, vec![ESP, imm(4)]);
                    }
                }
            }
            NodeKind::Unary(UnOp::Ref, inner) => {
                let place = self.lvalue(inner);
                self.emit(Op::Lea, vec![EAX, place]);
                if ret {
                    self.emit(Op::Push, vec![EAX]);
                }
            }
            NodeKind::Unary(UnOp::Deref, inner) => {
                self.generate_expr(inner, true);
                self.emit(Op::Pop, vec![EAX]);
                self.push_value(dword(deref(EAX)), self.node_ty(expr), ret);
            }
            NodeKind::Var(symbol) if self.syms[*symbol].kind == SymKind::EnumConst => {
                if ret {
                    let value = match &self.syms[*symbol].expr {
                        Some(Node {
                            kind: NodeKind::Int(value),
                            ..
                        }) => *value,
                        _ => 0,
                    };
                    self.emit(Op::Push, vec![imm(value)]);
                }
            }
            NodeKind::Var(_) => {
                let place = self.lvalue(expr);
                self.push_value(place, self.node_ty(expr), ret);
            }
            NodeKind::Int(value) => {
                if ret {
                    self.emit(Op::Push, vec![imm(*value)]);
                }
            }
            NodeKind::Binary(BinOp::Comma, lhs, rhs) => {
                self.generate_expr(lhs, false);
                self.generate_expr(rhs, ret);
            }
            NodeKind::Binary(BinOp::Add, lhs, rhs)
                if matches!(
                    self.syms[self.resolved_ty(lhs)].kind,
                    SymKind::Pointer | SymKind::Array
                ) =>
            {
                // ptr + int scales the index by the pointee size.
                let pointee_size = self.syms[self.resolved_ty(lhs)]
                    .base_type
                    .map(|b| self.syms[b].size)
                    .unwrap_or(0);
                self.generate_expr(lhs, true);
                self.generate_expr(rhs, true);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Mov, vec![EBX, imm(pointee_size)]);
                self.emit(Op::Imul, vec![EBX]);
                self.emit(Op::Pop, vec![EBX]);
                self.emit(Op::Add, vec![EAX, EBX]);
                if ret {
                    self.emit(Op::Push, vec![EAX]);
                }
            }
            _ => self.generate_by_category(expr, ret),
        }
    }

    fn generate_by_category(&mut self, expr: &Node, ret: bool) {
        match expr.category() {
            Category::Unary => {
                let operand = match &expr.kind {
                    NodeKind::Unary(_, operand) => operand,
                    _ => return,
                };
                let ty = self.resolved_ty(operand);
                if ty == Syms::DOUBLE {
                    self.generate_unary_double_op(expr, ret);
                } else if self.is_int_like_or_ptr(ty) {
                    self.generate_unary_int_op(expr, ret);
                }
            }
            Category::Binary => {
                let lhs = match &expr.kind {
                    NodeKind::Binary(_, lhs, _) => lhs,
                    _ => return,
                };
                let ty = self.resolved_ty(lhs);
                if ty == Syms::DOUBLE {
                    self.generate_binary_double_op(expr, ret);
                } else if self.is_int_like_or_ptr(ty) {
                    self.generate_binary_int_op(expr, ret);
                } else {
                    self.emit_comment(format!("unknown binary node {}", expr.repr()));
                }
            }
            Category::Statement => self.generate_statement(expr),
            _ => self.emit_comment(format!("unknown node {}", expr.repr())),
        }
    }

    /// `xor ecx,ecx; cmp eax,ebx; setCC cl; mov eax,ecx`
    fn generate_int_cmp(&mut self, set: Op) {
        self.emit(Op::Xor, vec![ECX, ECX]);
        self.emit(Op::Cmp, vec![EAX, EBX]);
        self.emit(set, vec![CL]);
        self.emit(Op::Mov, vec![EAX, ECX]);
    }

    /// Logical `&&`/`||`: both operands are already evaluated; the
    /// conditional jump skips the second test once the first operand
    /// decides the result.
    fn generate_int_logical_op(&mut self, jump: Op) {
        let skip = self.gen_label();
        self.emit(Op::Xor, vec![ECX, ECX]);
        self.emit(Op::Test, vec![EAX, EAX]);
        self.emit(jump, vec![label(skip)]);
        self.emit(Op::Test, vec![EBX, EBX]);
        self.emit_label(skip);
        self.emit(Op::Setnz, vec![CL]);
        self.emit(Op::Mov, vec![EAX, ECX]);
    }

    fn generate_unary_int_op(&mut self, expr: &Node, ret: bool) {
        let NodeKind::Unary(op, inner) = &expr.kind else {
            return;
        };
        self.generate_expr(inner, true);
        self.emit(Op::Pop, vec![EAX]);
        match op {
            UnOp::Not => {
                self.emit(Op::Xor, vec![ECX, ECX]);
                self.emit(Op::Test, vec![EAX, EAX]);
                self.emit(Op::Setz, vec![CL]);
                self.emit(Op::Mov, vec![EAX, ECX]);
            }
            UnOp::Compl => self.emit(Op::Not, vec![EAX]),
            UnOp::Minus => self.emit(Op::Neg, vec![EAX]),
            UnOp::Plus => {}
            UnOp::PreInc | UnOp::PreDec => {
                self.generate_lvalue(inner);
                self.emit(Op::Pop, vec![EBX]);
                let step = if *op == UnOp::PreInc { Op::Inc } else { Op::Dec };
                self.emit(step, vec![dword(deref(EBX))]);
                if ret {
                    self.emit(Op::Mov, vec![EAX, dword(deref(EBX))]);
                }
            }
            UnOp::PostInc | UnOp::PostDec => {
                self.generate_lvalue(inner);
                self.emit(Op::Pop, vec![EBX]);
                if ret {
                    self.emit(Op::Mov, vec![EAX, dword(deref(EBX))]);
                }
                let step = if *op == UnOp::PostInc { Op::Inc } else { Op::Dec };
                self.emit(step, vec![dword(deref(EBX))]);
            }
            _ => self.emit_comment(format!("unknown unary node {}", expr.repr())),
        }
        if ret {
            self.emit(Op::Push, vec![EAX]);
        }
    }

    fn generate_binary_int_op(&mut self, expr: &Node, ret: bool) {
        let NodeKind::Binary(op, lhs, rhs) = &expr.kind else {
            return;
        };
        self.generate_expr(lhs, true);
        self.generate_expr(rhs, true);
        self.emit(Op::Pop, vec![EBX]);
        self.emit(Op::Pop, vec![EAX]);

        match op {
            BinOp::Add => self.emit(Op::Add, vec![EAX, EBX]),
            BinOp::Sub => self.emit(Op::Sub, vec![EAX, EBX]),
            BinOp::Mul => self.emit(Op::Imul, vec![EBX]),
            BinOp::Shl => {
                self.emit(Op::Mov, vec![ECX, EBX]);
                self.emit(Op::Sal, vec![EAX, CL]);
            }
            BinOp::Shr => {
                self.emit(Op::Mov, vec![ECX, EBX]);
                self.emit(Op::Sar, vec![EAX, CL]);
            }
            BinOp::Div | BinOp::Mod => {
                self.emit(Op::Cdq, vec![]);
                self.emit(Op::Idiv, vec![EBX]);
                if *op == BinOp::Mod {
                    self.emit(Op::Mov, vec![EAX, EDX]);
                }
            }
            BinOp::Eq => self.generate_int_cmp(Op::Sete),
            BinOp::Ne => self.generate_int_cmp(Op::Setne),
            BinOp::Le => self.generate_int_cmp(Op::Setle),
            BinOp::Lt => self.generate_int_cmp(Op::Setl),
            BinOp::Ge => self.generate_int_cmp(Op::Setge),
            BinOp::Gt => self.generate_int_cmp(Op::Setg),
            BinOp::BitXor => self.emit(Op::Xor, vec![EAX, EBX]),
            BinOp::BitOr => self.emit(Op::Or, vec![EAX, EBX]),
            BinOp::BitAnd => self.emit(Op::And, vec![EAX, EBX]),
            BinOp::And => self.generate_int_logical_op(Op::Jz),
            BinOp::Or => self.generate_int_logical_op(Op::Jnz),
            _ => self.emit_comment(format!("unknown binary node {}", expr.repr())),
        }
        if ret {
            self.emit(Op::Push, vec![EAX]);
        }
    }

    /// Double comparison: both operands are on the FPU stack.
    fn generate_double_cmp(&mut self, set: Op) {
        self.emit(Op::Add, vec![ESP, imm(8)]);
        self.emit(Op::Xor, vec![ECX, ECX]);
        self.emit(Op::Fcomip, vec![ST1]);
        self.emit(set, vec![CL]);
        self.emit(Op::Push, vec![ECX]);
        self.emit(Op::Ffreep, vec![ST0]);
    }

    fn generate_unary_double_op(&mut self, expr: &Node, ret: bool) {
        let NodeKind::Unary(op, inner) = &expr.kind else {
            return;
        };
        match op {
            UnOp::Not => {
                self.generate_expr(inner, true);
                self.emit(Op::Fld, vec![qword(deref(ESP))]);
                self.emit(Op::Fldz, vec![]);
                self.emit(Op::Xor, vec![ECX, ECX]);
                self.emit(Op::Fcomip, vec![ST1]);
                self.emit(Op::Sete, vec![CL]);
                self.emit(Op::Ffreep, vec![ST0]);
                if ret {
                    self.emit(Op::Mov, vec![mem(ESP, 4), ECX]);
                    self.emit(Op::Add, vec![ESP, imm(4)]);
                } else {
                    self.emit(Op::Add, vec![ESP, imm(8)]);
                }
            }
            UnOp::Minus => {
                self.generate_expr(inner, true);
                if ret {
                    self.emit(Op::Fld, vec![qword(deref(ESP))]);
                    self.emit(Op::Fchs, vec![]);
                    self.emit(Op::Fstp, vec![qword(deref(ESP))]);
                } else {
                    self.emit(Op::Add, vec![ESP, imm(8)]);
                }
            }
            UnOp::Plus => {
                self.generate_expr(inner, ret);
            }
            UnOp::PreInc | UnOp::PreDec => {
                self.generate_lvalue(inner);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Fld, vec![qword(deref(EAX))]);
                self.emit(Op::Fld1, vec![]);
                let step = if *op == UnOp::PreInc { Op::Faddp } else { Op::Fsubp };
                self.emit(step, vec![]);
                if ret {
                    self.emit(Op::Fst, vec![qword(deref(EAX))]);
                    self.emit(Op::Sub, vec![ESP, imm(8)]);
                    self.emit(Op::Fstp, vec![qword(deref(ESP))]);
                } else {
                    self.emit(Op::Fstp, vec![qword(deref(EAX))]);
                }
            }
            UnOp::PostInc | UnOp::PostDec => {
                self.generate_lvalue(inner);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Fld, vec![qword(deref(EAX))]);
                if ret {
                    self.emit(Op::Sub, vec![ESP, imm(8)]);
                    self.emit(Op::Fst, vec![qword(deref(ESP))]);
                }
                self.emit(Op::Fld1, vec![]);
                let step = if *op == UnOp::PostInc { Op::Faddp } else { Op::Fsubp };
                self.emit(step, vec![]);
                self.emit(Op::Fstp, vec![qword(deref(EAX))]);
            }
            _ => self.emit_comment(format!("unknown unary node {}", expr.repr())),
        }
    }

    fn generate_binary_double_op(&mut self, expr: &Node, ret: bool) {
        let NodeKind::Binary(op, lhs, rhs) = &expr.kind else {
            return;
        };
        self.generate_expr(lhs, true);
        self.emit(Op::Fld, vec![qword(deref(ESP))]);
        self.generate_expr(rhs, true);
        self.emit(Op::Fld, vec![qword(deref(ESP))]);

        self.emit(Op::Add, vec![ESP, imm(if ret { 8 } else { 16 })]);

        match op {
            BinOp::Add => self.emit(Op::Faddp, vec![]),
            BinOp::Sub => self.emit(Op::Fsubp, vec![]),
            BinOp::Mul => self.emit(Op::Fmulp, vec![]),
            BinOp::Div => self.emit(Op::Fdivp, vec![]),
            // Operand order on the FPU stack inverts the conditions.
            BinOp::Eq => return self.generate_double_cmp(Op::Sete),
            BinOp::Ne => return self.generate_double_cmp(Op::Setne),
            BinOp::Le => return self.generate_double_cmp(Op::Setae),
            BinOp::Lt => return self.generate_double_cmp(Op::Seta),
            BinOp::Ge => return self.generate_double_cmp(Op::Setbe),
            BinOp::Gt => return self.generate_double_cmp(Op::Setb),
            _ => self.emit_comment(format!("unknown binary node {}", expr.repr())),
        }

        if ret {
            self.emit(Op::Fstp, vec![qword(deref(ESP))]);
        }
        self.emit(Op::Ffreep, vec![ST0]);
    }

    fn generate_call(&mut self, expr: &Node, callee: &Node, args: &Node, ret: bool) {
        let mut args_size = 0;
        if let NodeKind::List(items) = &args.kind {
            // cdecl: arguments pushed right to left.
            for arg in items.iter().rev() {
                self.generate_expr(arg, true);
                args_size += arg.type_sym.map(|t| self.syms[t].size).unwrap_or(0);
            }
        }

        let callee_sym = callee.type_sym;
        let (name, is_extern) = match callee_sym {
            Some(id) => (
                self.syms[id].name.clone().unwrap_or_default(),
                self.syms[id].flags.contains(SymFlags::EXTERN),
            ),
            None => (String::new(), false),
        };
        let mut target = named_label(&name);
        if is_extern {
            target = deref(target);
        }
        self.emit(Op::Call, vec![target]);
        self.emit(Op::Add, vec![ESP, imm(args_size)]);

        let ret_ty = resolve_alias(self.syms, self.node_ty(expr));
        if self.is_int_like_or_ptr(ret_ty) {
            if ret {
                self.emit(Op::Push, vec![EAX]);
            }
        } else if ret_ty == Syms::DOUBLE {
            if ret {
                self.emit(Op::Sub, vec![ESP, imm(8)]);
                self.emit(Op::Fstp, vec![qword(deref(ESP))]);
            } else {
                self.emit(Op::Ffreep, vec![ST0]);
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn generate_statement(&mut self, stmt: &Node) {
        match &stmt.kind {
            NodeKind::If(cond, then, alt) => {
                let else_label = self.gen_label();
                let end_label = self.gen_label();
                self.generate_expr(cond, true);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Test, vec![EAX, EAX]);
                self.emit(Op::Jz, vec![label(else_label)]);
                self.generate_expr(then, false);
                self.emit(Op::Jmp, vec![label(end_label)]);
                self.emit_label(else_label);
                self.generate_expr(alt, false);
                self.emit_label(end_label);
            }
            NodeKind::While(cond, body) => {
                let top = self.gen_label();
                let end = self.gen_label();
                self.emit_label(top);
                self.generate_expr(cond, true);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Test, vec![EAX, EAX]);
                self.emit(Op::Jz, vec![label(end)]);
                self.generate_expr(body, false);
                self.emit(Op::Jmp, vec![label(top)]);
                self.emit_label(end);
            }
            NodeKind::DoWhile(body, cond) => {
                let top = self.gen_label();
                self.emit_label(top);
                self.generate_expr(body, false);
                self.generate_expr(cond, true);
                self.emit(Op::Pop, vec![EAX]);
                self.emit(Op::Test, vec![EAX, EAX]);
                self.emit(Op::Jnz, vec![label(top)]);
            }
            NodeKind::For(init, cond, step, body) => {
                let top = self.gen_label();
                let end = self.gen_label();
                self.generate_expr(init, false);
                self.emit_label(top);
                if cond.kind != NodeKind::Nop {
                    self.generate_expr(cond, true);
                    self.emit(Op::Pop, vec![EAX]);
                    self.emit(Op::Test, vec![EAX, EAX]);
                    self.emit(Op::Jz, vec![label(end)]);
                }
                self.generate_expr(body, false);
                self.generate_expr(step, false);
                self.emit(Op::Jmp, vec![label(top)]);
                self.emit_label(end);
            }
            NodeKind::Return(value) => {
                let ty = stmt.type_sym.map(|t| resolve_alias(self.syms, t));
                match ty {
                    Some(ty) if self.is_int_like_or_ptr(ty) => {
                        self.generate_expr(value, true);
                        self.emit(Op::Pop, vec![EAX]);
                    }
                    Some(ty) if ty == Syms::DOUBLE => {
                        self.generate_expr(value, true);
                        self.emit(Op::Fld, vec![qword(deref(ESP))]);
                        self.emit(Op::Add, vec![ESP, imm(8)]);
                    }
                    _ => {}
                }
                let return_label = self.return_label;
                self.emit(Op::Jmp, vec![label(return_label)]);
            }
            _ => self.emit_comment(format!("unknown statement {}", stmt.repr())),
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn generate_function(&mut self, function: SymbolId) {
        if self.syms[function].flags.contains(SymFlags::EXTERN) {
            return;
        }
        let Some(body) = self.syms[function].expr.take() else {
            return;
        };

        self.return_label = self.gen_label();
        let name = self.syms[function].name.clone().unwrap_or_default();
        let locals_size = self.syms[function].locals_size;
        let is_main = name == "main";

        self.emit_comment(format!("start {}", name));
        self.emit_name_label(&name);

        if is_main {
            self.emit(Op::Mov, vec![dword(deref(named_label("@main_esp"))), ESP]);
        }
        self.emit(Op::Push, vec![EBP]);
        self.emit(Op::Mov, vec![EBP, ESP]);
        if locals_size != 0 {
            self.emit(Op::Sub, vec![ESP, imm(locals_size)]);
        }

        self.generate_expr(&body, false);

        if locals_size != 0 {
            self.emit(Op::Add, vec![ESP, imm(locals_size)]);
        }

        let return_label = self.return_label;
        self.emit_label(return_label);
        self.emit(Op::Mov, vec![ESP, EBP]);
        self.emit(Op::Pop, vec![EBP]);

        if is_main {
            let ok = self.gen_label();
            self.emit(
                Op::Cmp,
                vec![ESP, dword(deref(named_label("@main_esp")))],
            );
            self.emit(Op::Je, vec![label(ok)]);
            self.emit(Op::Push, vec![named_label("@stack_corruption_msg")]);
            self.emit(Op::Call, vec![deref(named_label("printf"))]);
            self.emit(Op::Add, vec![ESP, imm(4)]);
            self.emit_label(ok);
            // The process exit status is main's return value.
            self.emit(Op::Push, vec![EAX]);
            self.emit(Op::Call, vec![deref(named_label("ExitProcess"))]);
        } else {
            self.emit(Op::Ret, vec![]);
        }

        self.emit_comment(format!("end {}", name));
        self.syms[function].expr = Some(body);
    }
}
