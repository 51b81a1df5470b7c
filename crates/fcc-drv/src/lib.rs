//! fcc-drv - Command-line driver.
//!
//! Mode dispatch around the compiler core: `lex` dumps tokens, the three
//! parse modes print trees and symbol tables for debugging, `compile`
//! runs the whole pipeline and writes a FASM listing to standard output.
//! An omitted file argument reads standard input. Exit code 0 on
//! success; I/O failures and (for `compile`) reported compile errors are
//! nonzero.

pub mod printer;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser as ClapParser, Subcommand};

use fcc_gen::{generate, optimize, write_fasm};
use fcc_lex::{Lexer, TokenKind};
use fcc_par::{Parser, PF_ADD_INITIALIZERS, PF_RESOLVE_NAMES};
use fcc_util::Handler;

use printer::TreePrinter;

/// C compiler for 32-bit x86, emitting FASM assembly.
#[derive(ClapParser, Debug)]
#[command(name = "fcc")]
#[command(version)]
#[command(about = "C compiler targeting 32-bit x86 in FASM syntax", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Tokenize and print a tab-separated token dump
    Lex {
        /// Source file (standard input when omitted)
        file: Option<PathBuf>,
    },
    /// Parse a single expression and print its syntax tree
    ParseExpr {
        file: Option<PathBuf>,
    },
    /// Parse a single statement and print its syntax tree
    ParseStmt {
        file: Option<PathBuf>,
    },
    /// Parse a translation unit with semantic analysis and print the
    /// resulting symbol table
    Parse {
        file: Option<PathBuf>,
    },
    /// Compile a translation unit to a FASM listing on standard output
    Compile {
        file: Option<PathBuf>,
        /// Skip the peephole optimizer
        #[arg(long)]
        no_optimize: bool,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Lex { file } => cmd_lex(&file),
        Command::ParseExpr { file } => cmd_parse_node(&file, false),
        Command::ParseStmt { file } => cmd_parse_node(&file, true),
        Command::Parse { file } => cmd_parse(&file),
        Command::Compile { file, no_optimize } => cmd_compile(&file, no_optimize),
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_input(file: &Option<PathBuf>) -> anyhow::Result<(Box<dyn Read>, String)> {
    match file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            Ok((Box::new(file), basename(path)))
        }
        None => Ok((Box::new(io::stdin()), ":stdin:".to_string())),
    }
}

fn cmd_lex(file: &Option<PathBuf>) -> anyhow::Result<i32> {
    let (source, unit_name) = open_input(file)?;
    let handler = Handler::new();
    handler.set_unit(&unit_name);
    let mut lexer = Lexer::new(source, &handler);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Line\tText\tValue\tType")?;
    loop {
        let token = lexer.next_token();
        if token.kind == TokenKind::Eos || token.kind == TokenKind::Error {
            break;
        }
        writeln!(
            out,
            "{}:{}\t{}\t{}\t{}",
            token.line,
            token.column,
            token.text,
            token.value.render(),
            token.kind.name()
        )?;
    }
    Ok(0)
}

fn cmd_parse_node(file: &Option<PathBuf>, statement: bool) -> anyhow::Result<i32> {
    let (source, unit_name) = open_input(file)?;
    let handler = Handler::new();
    handler.set_unit(&unit_name);

    let parser = Parser::new(source, &handler, 0);
    let parsed = if statement {
        parser.parse_statement()
    } else {
        parser.parse_expression()
    };
    if let Ok((node, unit)) = parsed {
        print!("{}", TreePrinter::new(&unit).node_tree(&node));
    }
    Ok(0)
}

fn cmd_parse(file: &Option<PathBuf>) -> anyhow::Result<i32> {
    let (source, unit_name) = open_input(file)?;
    let handler = Handler::new();
    handler.set_unit(&unit_name);

    let parser = Parser::new(source, &handler, PF_RESOLVE_NAMES | PF_ADD_INITIALIZERS);
    if let Ok(unit) = parser.parse_unit() {
        print!("{}", TreePrinter::new(&unit).scope_tree(unit.file_scope));
    }
    Ok(0)
}

fn cmd_compile(file: &Option<PathBuf>, no_optimize: bool) -> anyhow::Result<i32> {
    let (source, unit_name) = open_input(file)?;
    let handler = Handler::new();
    handler.set_unit(&unit_name);

    let parser = Parser::new(source, &handler, PF_RESOLVE_NAMES | PF_ADD_INITIALIZERS);
    let Ok(mut unit) = parser.parse_unit() else {
        return Ok(1);
    };

    let mut code = generate(&mut unit);
    if !no_optimize {
        optimize(&mut code);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_fasm(&mut out, &code)?;
    Ok(0)
}
