// eule - A bytecode-compiled dynamic scripting language
// Copyright (c) 2026 The eule authors. MIT licensed.

use std::env;
use std::fs;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use eule_vm::vm::Vm;
use eule_vm::VERSION;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() == 2 && (args[1] == "--help" || args[1] == "-h") {
        show_help();
        return;
    }

    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("eule v{}", VERSION);
        return;
    }

    if args.len() > 1 {
        run_file(&args[1]);
    } else {
        run_repl();
    }
}

/// Interpret a script file; exits non-zero on any error.
fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error reading '{}': {}", path, error);
            process::exit(1);
        }
    };

    let mut vm = match Vm::new() {
        Ok(vm) => vm,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    };

    if let Err(error) = vm.interpret(&source) {
        eprintln!("{}", error);
        process::exit(1);
    }
}

/// Read-eval loop over a shared VM, so definitions persist across lines.
fn run_repl() {
    println!("eule v{}", VERSION);
    println!("exit using ctrl+c");

    let mut vm = match Vm::new() {
        Ok(vm) => vm,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    };

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("failed to start line editor: {}", error);
            process::exit(1);
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                if let Err(error) = vm.interpret(&line) {
                    eprintln!("{}", error);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return,
            Err(error) => {
                eprintln!("repl: {}", error);
                return;
            }
        }
    }
}

fn show_help() {
    println!("eule v{}", VERSION);
    println!();
    println!("usage:");
    println!("  {:<18}{}", "repl", "eule");
    println!("  {:<18}{}", "file", "eule [script]");
    println!();
    println!("optional arguments:");
    println!("  {:<18}{}", "--help", "show command line usage");
    println!("  {:<18}{}", "--version", "show version");
}
