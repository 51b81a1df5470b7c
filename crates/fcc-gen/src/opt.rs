//! Peephole optimizer.
//!
//! A fixed list of passes slides over the `.text` listing. Windows form
//! only over runs of real instructions: labels, comments, and data
//! directives pass through untouched and break the window, so no rewrite
//! ever crosses a jump target. A firing pass rewrites the head of its
//! window and reports how many instructions survive; the rest become NOP
//! slots that the sweep compacts out. Passes repeat until a full sweep
//! fires nothing.
//!
//! Every pattern checks operand aliasing before rewriting so the
//! transformation preserves both values and observable effects.

use crate::asm::{Base, Code, Ins, Item, Mem, Op, Operand, Reg, EAX};

const MAX_WINDOW: usize = 4;

struct Pass {
    /// Instructions consumed when the pass fires.
    window: usize,
    run: fn(&mut [Item], &[usize]) -> Option<usize>,
}

const PASSES: &[Pass] = &[
    Pass { window: 4, run: opt_push_push_pop_pop },
    Pass { window: 2, run: opt_push_pop },
    Pass { window: 1, run: opt_mov_self },
    Pass { window: 2, run: opt_lea_lea },
    Pass { window: 2, run: opt_lea_push },
    Pass { window: 2, run: opt_lea_mov },
    Pass { window: 2, run: opt_add_sub },
    Pass { window: 2, run: opt_mov_mov },
    Pass { window: 3, run: opt_div_pow2 },
    Pass { window: 2, run: opt_imul_imm },
    Pass { window: 1, run: opt_imul2_pow2 },
    Pass { window: 2, run: opt_fstp_fld },
];

/// Shrinks `.text` in place until no pattern fires.
pub fn optimize(code: &mut Code) {
    loop {
        let mut changed = false;
        let mut position = 0;
        while position < code.text.len() {
            if !is_real_ins(&code.text[position]) {
                position += 1;
                continue;
            }

            // Collect the run of instructions forming the window.
            let mut window = Vec::with_capacity(MAX_WINDOW);
            let mut next = position;
            while window.len() < MAX_WINDOW
                && next < code.text.len()
                && is_real_ins(&code.text[next])
            {
                window.push(next);
                next += 1;
            }

            for pass in PASSES {
                if window.len() < pass.window {
                    continue;
                }
                if let Some(keep) = (pass.run)(&mut code.text, &window) {
                    for &index in &window[keep..pass.window] {
                        code.text[index] = Item::Ins(Ins::new(Op::Nop, vec![]));
                    }
                    changed = true;
                    break;
                }
            }
            position += 1;
        }

        if !changed {
            return;
        }
        code.text
            .retain(|item| !matches!(item, Item::Ins(ins) if ins.op == Op::Nop));
    }
}

fn is_real_ins(item: &Item) -> bool {
    matches!(item, Item::Ins(ins) if ins.op != Op::Nop)
}

fn ins_at<'a>(items: &'a [Item], index: usize) -> &'a Ins {
    match &items[index] {
        Item::Ins(ins) => ins,
        _ => unreachable!("window indices always point at instructions"),
    }
}

fn op0(ins: &Ins) -> Option<&Operand> {
    ins.operand(0)
}

fn op1(ins: &Ins) -> Option<&Operand> {
    ins.operand(1)
}

fn as_reg(operand: &Operand) -> Option<Reg> {
    match operand {
        Operand::Reg(reg) => Some(*reg),
        _ => None,
    }
}

fn as_imm(operand: &Operand) -> Option<i32> {
    match operand {
        Operand::Imm(value) => Some(*value),
        _ => None,
    }
}

fn as_mem(operand: &Operand) -> Option<&Mem> {
    match operand {
        Operand::Mem(mem) => Some(mem),
        _ => None,
    }
}

fn is_mem(operand: &Operand) -> bool {
    matches!(operand, Operand::Mem(_))
}

/// Whether evaluating `operand` reads the given register.
fn uses_reg(operand: &Operand, reg: Reg) -> bool {
    match operand {
        Operand::Reg(r) => *r == reg,
        Operand::Mem(mem) => {
            matches!(&mem.base, Base::Reg(r) if *r == reg) || mem.index == Some(reg)
        }
        _ => false,
    }
}

fn is_power_of_two(value: i32) -> bool {
    value > 0 && value & (value - 1) == 0
}

/// `push a; push b; pop c; pop d` -> `mov c, b; mov d, a`.
///
/// Refused when a rewrite would pair two memory operands or when the
/// first pop's destination register feeds the still-pending second move.
fn opt_push_push_pop_pop(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let push_a = ins_at(items, window[0]);
    let push_b = ins_at(items, window[1]);
    let pop_c = ins_at(items, window[2]);
    let pop_d = ins_at(items, window[3]);

    if push_a.op != Op::Push || push_b.op != Op::Push || pop_c.op != Op::Pop || pop_d.op != Op::Pop
    {
        return None;
    }
    let a = op0(push_a)?.clone();
    let b = op0(push_b)?.clone();
    let c = op0(pop_c)?.clone();
    let d = op0(pop_d)?.clone();

    if (is_mem(&b) && is_mem(&c)) || (is_mem(&a) && is_mem(&d)) {
        return None;
    }
    // `mov c, b` executes before `mov d, a`; if a reads c the original
    // value is gone by then.
    if let Some(c_reg) = as_reg(&c) {
        if uses_reg(&a, c_reg) {
            return None;
        }
    }

    items[window[0]] = Item::Ins(Ins::new(Op::Mov, vec![c, b]));
    items[window[1]] = Item::Ins(Ins::new(Op::Mov, vec![d, a]));
    Some(2)
}

/// `push a; pop b` -> `mov b, a` unless both operands are memory.
fn opt_push_pop(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let push = ins_at(items, window[0]);
    let pop = ins_at(items, window[1]);
    if push.op != Op::Push || pop.op != Op::Pop {
        return None;
    }
    let src = op0(push)?.clone();
    let dst = op0(pop)?.clone();
    if is_mem(&src) && is_mem(&dst) {
        return None;
    }
    items[window[0]] = Item::Ins(Ins::new(Op::Mov, vec![dst, src]));
    Some(1)
}

/// `mov r, r` -> deleted.
fn opt_mov_self(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let mov = ins_at(items, window[0]);
    if mov.op != Op::Mov {
        return None;
    }
    let dst = as_reg(op0(mov)?)?;
    let src = as_reg(op1(mov)?)?;
    (dst == src).then_some(0)
}

/// `lea r, [b + k]; lea r, [r + j]` -> `lea r, [b + k + j]`.
fn opt_lea_lea(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let first = ins_at(items, window[0]);
    let second = ins_at(items, window[1]);
    if first.op != Op::Lea || second.op != Op::Lea {
        return None;
    }
    let r1 = as_reg(op0(first)?)?;
    let r2 = as_reg(op0(second)?)?;
    let m1 = as_mem(op1(first)?)?;
    let m2 = as_mem(op1(second)?)?;
    if r1 != r2
        || m2.index.is_some()
        || m1.size != m2.size
        || !matches!(&m2.base, Base::Reg(base) if *base == r1)
    {
        return None;
    }

    let mut merged = m1.clone();
    merged.offset += m2.offset;
    items[window[0]] = Item::Ins(Ins::new(Op::Lea, vec![Operand::Reg(r1), Operand::Mem(merged)]));
    Some(1)
}

/// `lea r, mem; push size [r + j]` -> `push size (mem + j)`.
fn opt_lea_push(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let lea = ins_at(items, window[0]);
    let push = ins_at(items, window[1]);
    if lea.op != Op::Lea || push.op != Op::Push {
        return None;
    }
    let r = as_reg(op0(lea)?)?;
    let source = as_mem(op1(lea)?)?;
    let target = as_mem(op0(push)?)?;
    if target.index.is_some() || !matches!(&target.base, Base::Reg(base) if *base == r) {
        return None;
    }

    let mut merged = source.clone();
    merged.offset += target.offset;
    merged.size = target.size;
    items[window[0]] = Item::Ins(Ins::new(Op::Push, vec![Operand::Mem(merged)]));
    Some(1)
}

/// `lea r, mem; mov [r + j], x` -> `mov (mem + j), x`.
fn opt_lea_mov(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let lea = ins_at(items, window[0]);
    let mov = ins_at(items, window[1]);
    if lea.op != Op::Lea || mov.op != Op::Mov {
        return None;
    }
    let r = as_reg(op0(lea)?)?;
    let source = as_mem(op1(lea)?)?;
    let target = as_mem(op0(mov)?)?;
    let value = op1(mov)?.clone();
    if target.index.is_some()
        || !matches!(&target.base, Base::Reg(base) if *base == r)
        || is_mem(&value)
        || uses_reg(&value, r)
    {
        return None;
    }

    let mut merged = source.clone();
    merged.offset += target.offset;
    merged.size = target.size;
    items[window[0]] = Item::Ins(Ins::new(Op::Mov, vec![Operand::Mem(merged), value]));
    Some(1)
}

/// `add/sub r, k; add/sub r, j` -> one adjustment (or nothing when the
/// net is zero).
fn opt_add_sub(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let first = ins_at(items, window[0]);
    let second = ins_at(items, window[1]);
    if !matches!(first.op, Op::Add | Op::Sub) || !matches!(second.op, Op::Add | Op::Sub) {
        return None;
    }
    let r1 = as_reg(op0(first)?)?;
    let r2 = as_reg(op0(second)?)?;
    if r1 != r2 {
        return None;
    }
    let k = as_imm(op1(first)?)?;
    let j = as_imm(op1(second)?)?;

    let signed = |op: Op, value: i32| if op == Op::Sub { -(value as i64) } else { value as i64 };
    let net = signed(first.op, k) + signed(second.op, j);
    if net == 0 {
        return Some(0);
    }
    let (op, magnitude) = if net < 0 {
        (Op::Sub, (-net) as i32)
    } else {
        (Op::Add, net as i32)
    };
    items[window[0]] = Item::Ins(Ins::new(op, vec![Operand::Reg(r1), Operand::Imm(magnitude)]));
    Some(1)
}

/// `mov b, a; mov c, b` -> `mov b, a; mov c, a` when b is a register,
/// so a later pass can drop the first move if b turns out dead.
fn opt_mov_mov(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let first = ins_at(items, window[0]);
    let second = ins_at(items, window[1]);
    if first.op != Op::Mov || second.op != Op::Mov {
        return None;
    }
    let b = as_reg(op0(first)?)?;
    let a = op1(first)?.clone();
    let c = op0(second)?.clone();
    let second_src = as_reg(op1(second)?)?;
    if second_src != b || uses_reg(&a, b) || (is_mem(&a) && is_mem(&c)) {
        return None;
    }

    items[window[1]] = Item::Ins(Ins::new(Op::Mov, vec![c, a]));
    Some(2)
}

/// `mov r, k; cdq; idiv r` -> `sar eax, log2(k)` for power-of-two k.
///
/// Refused when the following instruction reads the remainder out of
/// edx (the modulo pattern).
fn opt_div_pow2(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let mov = ins_at(items, window[0]);
    let cdq = ins_at(items, window[1]);
    let div = ins_at(items, window[2]);
    if mov.op != Op::Mov || cdq.op != Op::Cdq || div.op != Op::Idiv {
        return None;
    }
    let r = as_reg(op0(mov)?)?;
    let k = as_imm(op1(mov)?)?;
    if as_reg(op0(div)?)? != r || !is_power_of_two(k) {
        return None;
    }
    if let Some(&after) = window.get(3) {
        let next = ins_at(items, after);
        if next.op == Op::Mov && next.operand(1).map(|o| uses_reg(o, Reg::Edx)).unwrap_or(false) {
            return None;
        }
    }

    items[window[0]] = Item::Ins(Ins::new(
        Op::Sar,
        vec![EAX, Operand::Imm(k.trailing_zeros() as i32)],
    ));
    Some(1)
}

/// `mov r, k; imul r` -> `imul eax, k` (two-operand form).
fn opt_imul_imm(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let mov = ins_at(items, window[0]);
    let mul = ins_at(items, window[1]);
    if mov.op != Op::Mov || mul.op != Op::Imul {
        return None;
    }
    let r = as_reg(op0(mov)?)?;
    let k = as_imm(op1(mov)?)?;
    if as_reg(op0(mul)?)? != r {
        return None;
    }

    items[window[0]] = Item::Ins(Ins::new(Op::Imul2, vec![EAX, Operand::Imm(k)]));
    Some(1)
}

/// `imul r, 2^p` -> `shl r, p`; multiplying by one disappears.
fn opt_imul2_pow2(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let mul = ins_at(items, window[0]);
    if mul.op != Op::Imul2 {
        return None;
    }
    let r = as_reg(op0(mul)?)?;
    let k = as_imm(op1(mul)?)?;
    if k == 1 {
        return Some(0);
    }
    if !is_power_of_two(k) {
        return None;
    }

    items[window[0]] = Item::Ins(Ins::new(
        Op::Shl,
        vec![Operand::Reg(r), Operand::Imm(k.trailing_zeros() as i32)],
    ));
    Some(1)
}

/// `fstp x; fld x` -> deleted, for the transient `[esp]` slot only: the
/// value is still on the FPU stack and the slot is never read again.
fn opt_fstp_fld(items: &mut [Item], window: &[usize]) -> Option<usize> {
    let store = ins_at(items, window[0]);
    let load = ins_at(items, window[1]);
    if store.op != Op::Fstp || load.op != Op::Fld {
        return None;
    }
    let stored = op0(store)?;
    let loaded = op0(load)?;
    if stored != loaded {
        return None;
    }
    let mem = as_mem(stored)?;
    if !matches!(&mem.base, Base::Reg(Reg::Esp)) {
        return None;
    }
    Some(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{deref, dword, imm, mem, qword, LabelRef, EBP, EBX, EDX, ESP};

    fn ins(op: Op, operands: Vec<Operand>) -> Item {
        Item::Ins(Ins::new(op, operands))
    }

    fn optimize_text(text: Vec<Item>) -> Vec<Item> {
        let mut code = Code {
            text,
            data: Vec::new(),
        };
        optimize(&mut code);
        code.text
    }

    #[test]
    fn test_push_pop_becomes_mov() {
        let out = optimize_text(vec![
            ins(Op::Push, vec![imm(42)]),
            ins(Op::Pop, vec![EAX]),
        ]);
        assert_eq!(out, vec![ins(Op::Mov, vec![EAX, imm(42)])]);
    }

    #[test]
    fn test_push_pop_mem_to_mem_is_kept() {
        let before = vec![
            ins(Op::Push, vec![dword(mem(EBP, 8))]),
            ins(Op::Pop, vec![dword(mem(EBP, 12))]),
        ];
        assert_eq!(optimize_text(before.clone()), before);
    }

    #[test]
    fn test_push_push_pop_pop() {
        let out = optimize_text(vec![
            ins(Op::Push, vec![dword(mem(EBP, 8))]),
            ins(Op::Push, vec![imm(4)]),
            ins(Op::Pop, vec![EBX]),
            ins(Op::Pop, vec![EAX]),
        ]);
        assert_eq!(
            out,
            vec![
                ins(Op::Mov, vec![EBX, imm(4)]),
                ins(Op::Mov, vec![EAX, dword(mem(EBP, 8))]),
            ]
        );
    }

    #[test]
    fn test_push_push_pop_pop_aliasing_is_refused() {
        // The first pop writes eax, which the second move still reads.
        let before = vec![
            ins(Op::Push, vec![deref(EAX)]),
            ins(Op::Push, vec![imm(1)]),
            ins(Op::Pop, vec![EAX]),
            ins(Op::Pop, vec![EBX]),
        ];
        let out = optimize_text(before);
        // The 4-window is refused; the inner pair still collapses.
        assert_eq!(
            out,
            vec![
                ins(Op::Push, vec![deref(EAX)]),
                ins(Op::Mov, vec![EAX, imm(1)]),
                ins(Op::Pop, vec![EBX]),
            ]
        );
    }

    #[test]
    fn test_mov_self_deleted() {
        let out = optimize_text(vec![
            ins(Op::Mov, vec![EAX, EAX]),
            ins(Op::Ret, vec![]),
        ]);
        assert_eq!(out, vec![ins(Op::Ret, vec![])]);
    }

    #[test]
    fn test_lea_lea_collapses() {
        let out = optimize_text(vec![
            ins(Op::Lea, vec![EAX, dword(mem(EBP, -8))]),
            ins(Op::Lea, vec![EAX, dword(mem(EAX, 4))]),
        ]);
        assert_eq!(out, vec![ins(Op::Lea, vec![EAX, dword(mem(EBP, -4))])]);
    }

    #[test]
    fn test_lea_push_merges() {
        let out = optimize_text(vec![
            ins(Op::Lea, vec![EAX, dword(mem(EBP, -8))]),
            ins(Op::Push, vec![dword(mem(EAX, 4))]),
        ]);
        assert_eq!(out, vec![ins(Op::Push, vec![dword(mem(EBP, -4))])]);
    }

    #[test]
    fn test_lea_mov_merges() {
        let out = optimize_text(vec![
            ins(Op::Lea, vec![EAX, dword(mem(EBP, -8))]),
            ins(Op::Mov, vec![deref(EAX), EBX]),
        ]);
        assert_eq!(out, vec![ins(Op::Mov, vec![dword(mem(EBP, -8)), EBX])]);
    }

    #[test]
    fn test_add_sub_collapse() {
        let out = optimize_text(vec![
            ins(Op::Add, vec![ESP, imm(8)]),
            ins(Op::Sub, vec![ESP, imm(4)]),
        ]);
        assert_eq!(out, vec![ins(Op::Add, vec![ESP, imm(4)])]);
    }

    #[test]
    fn test_add_sub_cancel_out() {
        let out = optimize_text(vec![
            ins(Op::Add, vec![ESP, imm(8)]),
            ins(Op::Sub, vec![ESP, imm(8)]),
            ins(Op::Ret, vec![]),
        ]);
        assert_eq!(out, vec![ins(Op::Ret, vec![])]);
    }

    #[test]
    fn test_div_by_power_of_two() {
        let out = optimize_text(vec![
            ins(Op::Mov, vec![EBX, imm(8)]),
            ins(Op::Cdq, vec![]),
            ins(Op::Idiv, vec![EBX]),
        ]);
        assert_eq!(out, vec![ins(Op::Sar, vec![EAX, imm(3)])]);
    }

    #[test]
    fn test_mod_pattern_keeps_division() {
        let before = vec![
            ins(Op::Mov, vec![EBX, imm(8)]),
            ins(Op::Cdq, vec![]),
            ins(Op::Idiv, vec![EBX]),
            ins(Op::Mov, vec![EAX, EDX]),
        ];
        let out = optimize_text(before.clone());
        assert_eq!(out, before);
    }

    #[test]
    fn test_imul_imm_to_two_operand_then_shift() {
        let out = optimize_text(vec![
            ins(Op::Mov, vec![EBX, imm(4)]),
            ins(Op::Imul, vec![EBX]),
        ]);
        assert_eq!(out, vec![ins(Op::Shl, vec![EAX, imm(2)])]);
    }

    #[test]
    fn test_imul_by_one_disappears() {
        let out = optimize_text(vec![
            ins(Op::Mov, vec![EBX, imm(1)]),
            ins(Op::Imul, vec![EBX]),
            ins(Op::Ret, vec![]),
        ]);
        assert_eq!(out, vec![ins(Op::Ret, vec![])]);
    }

    #[test]
    fn test_fstp_fld_elided() {
        let out = optimize_text(vec![
            ins(Op::Fstp, vec![qword(deref(ESP))]),
            ins(Op::Fld, vec![qword(deref(ESP))]),
            ins(Op::Faddp, vec![]),
        ]);
        assert_eq!(out, vec![ins(Op::Faddp, vec![])]);
    }

    #[test]
    fn test_fstp_fld_through_variable_is_kept() {
        let before = vec![
            ins(Op::Fstp, vec![qword(deref(EAX))]),
            ins(Op::Fld, vec![qword(deref(EAX))]),
        ];
        assert_eq!(optimize_text(before.clone()), before);
    }

    #[test]
    fn test_labels_break_windows() {
        let before = vec![
            ins(Op::Push, vec![EAX]),
            Item::Label(LabelRef::Id(1)),
            ins(Op::Pop, vec![EBX]),
        ];
        assert_eq!(optimize_text(before.clone()), before);
    }

    #[test]
    fn test_comments_are_preserved() {
        let before = vec![
            Item::Comment("start main".into()),
            ins(Op::Push, vec![imm(1)]),
            ins(Op::Pop, vec![EAX]),
        ];
        let out = optimize_text(before);
        assert_eq!(out[0], Item::Comment("start main".into()));
        assert_eq!(out[1], ins(Op::Mov, vec![EAX, imm(1)]));
    }

    #[test]
    fn test_optimizer_is_idempotent() {
        let text = vec![
            ins(Op::Push, vec![dword(mem(EBP, 8))]),
            ins(Op::Push, vec![imm(3)]),
            ins(Op::Pop, vec![EBX]),
            ins(Op::Pop, vec![EAX]),
            ins(Op::Add, vec![EAX, EBX]),
            ins(Op::Push, vec![EAX]),
            ins(Op::Pop, vec![EAX]),
        ];
        let once = optimize_text(text);
        let twice = optimize_text(once.clone());
        assert_eq!(once, twice);
    }
}
