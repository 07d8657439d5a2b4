// eule-vm - Common test utilities
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Shared helpers for eule-vm integration tests.
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Available Helpers
//!
//! - [`run`] - interpret on a fresh VM, returning captured `print` output
//! - [`run_ok`] - like [`run`], panicking on any error
//! - [`run_err`] - interpret expecting failure, returning the error
//! - [`lines`] - captured output split into lines

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use eule_vm::error::Error;
use eule_vm::vm::Vm;

/// An output sink tests can keep a handle to after moving it into the VM.
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Build a prelude-loaded VM whose `print` output is captured.
pub fn capture_vm() -> (Vm, SharedBuf) {
    let mut vm = Vm::new().expect("prelude should load");
    let buf = SharedBuf::default();
    vm.set_output(Box::new(buf.clone()));
    (vm, buf)
}

/// Interpret `source` on a fresh VM and return everything it printed.
pub fn run(source: &str) -> Result<String, Error> {
    let (mut vm, buf) = capture_vm();
    vm.interpret(source)?;
    Ok(buf.contents())
}

pub fn run_ok(source: &str) -> String {
    match run(source) {
        Ok(output) => output,
        Err(error) => panic!("script failed: {}\nsource:\n{}", error, source),
    }
}

pub fn run_err(source: &str) -> Error {
    let (mut vm, _buf) = capture_vm();
    match vm.interpret(source) {
        Ok(()) => panic!("expected failure, script succeeded:\n{}", source),
        Err(error) => error,
    }
}

pub fn lines(source: &str) -> Vec<String> {
    run_ok(source).lines().map(str::to_string).collect()
}
