//! fcc-gen - Code generation for 32-bit x86 in FASM syntax.
//!
//! Consumes the symbol table a successful parse produced, lowers every
//! defined function onto a stack-machine evaluation model, shrinks the
//! result with a peephole pass, and prints a FASM listing targeting the
//! Windows PE/console runtime.

pub mod asm;
pub mod emit;
pub mod gen;
pub mod opt;


pub use asm::{Code, Ins, Item, LabelRef, Op, Operand};
pub use emit::{render, write_fasm};
pub use gen::generate;
pub use opt::optimize;
