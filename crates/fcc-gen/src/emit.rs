//! FASM listing writer.
//!
//! Fixed PE/console layout: the generated `.text`, a `.data` section that
//! always carries the saved entry esp and the stack-corruption message,
//! and the import table for the two runtime entry points.

use std::io::{self, Write};

use crate::asm::Code;

pub fn write_fasm<W: Write>(out: &mut W, code: &Code) -> io::Result<()> {
    writeln!(out, "format PE console")?;
    writeln!(out, "entry _main")?;
    writeln!(out, "include '%fasm%/include/win32a.inc'")?;
    writeln!(out)?;

    writeln!(out, "section '.text' code executable")?;
    for item in &code.text {
        writeln!(out, "{}", item)?;
    }
    writeln!(out)?;

    writeln!(out, "section '.data' data readable writable")?;
    writeln!(out)?;
    writeln!(out, "_@main_esp dd ?")?;
    writeln!(out, "_@stack_corruption_msg db \"Stack corruption\",10,0")?;
    for item in &code.data {
        writeln!(out, "{}", item)?;
    }
    writeln!(out)?;

    writeln!(out, "section '.idata' data readable import")?;
    writeln!(out, "library kernel32, 'kernel32.dll', msvcrt, 'msvcrt.dll'")?;
    writeln!(out, "import kernel32, _ExitProcess, 'ExitProcess'")?;
    writeln!(out, "import msvcrt, _printf, 'printf'")?;
    Ok(())
}

/// The whole listing as a string; used by the driver and by tests.
pub fn render(code: &Code) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_fasm(&mut buffer, code);
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{imm, Ins, Item, LabelRef, Op, EAX};

    #[test]
    fn test_layout_sections() {
        let mut code = Code::new();
        code.text.push(Item::Label(LabelRef::Name("main".into())));
        code.text.push(Item::Ins(Ins::new(Op::Mov, vec![EAX, imm(1)])));
        code.data.push(Item::Raw("_@1 db 104,105,0".into()));

        let listing = render(&code);
        let expected_order = [
            "format PE console",
            "entry _main",
            "section '.text' code executable",
            "_main:",
            "\tmov eax, 1",
            "section '.data' data readable writable",
            "_@main_esp dd ?",
            "_@stack_corruption_msg db \"Stack corruption\",10,0",
            "_@1 db 104,105,0",
            "section '.idata' data readable import",
            "import kernel32, _ExitProcess, 'ExitProcess'",
            "import msvcrt, _printf, 'printf'",
        ];
        let mut last = 0;
        for needle in expected_order {
            let found = listing[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("missing {:?} in listing", needle));
            last += found + needle.len();
        }
    }
}
