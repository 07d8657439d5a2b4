// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! The eule core: a single-pass Pratt compiler lowering source text to a
//! compact stack-machine bytecode, and a stack VM executing it with
//! lexical closures, prototype tables, variadic calls and recoverable
//! throws.
//!
//! # Example
//!
//! ```
//! use eule_vm::vm::Vm;
//!
//! let mut vm = Vm::new().unwrap();
//! vm.interpret("var answer = 6 * 7").unwrap();
//! assert_eq!(vm.get_global("answer"), Some(eule_vm::value::Value::Number(42.0)));
//! ```
//!
//! # Core components
//!
//! - [`compiler::compile`] - source text to a script [`chunk::Function`]
//! - [`vm::Vm`] - construction, global bindings, [`vm::Vm::interpret`]
//! - [`value::Value`] - the runtime value sum
//! - [`heap::Heap`] - tables, closures, upvalues and the tracing collector

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod error;
pub mod heap;
pub mod opcode;
pub mod value;
pub mod vm;

mod natives;

pub use chunk::{Function, UpvalDesc};
pub use error::{CompileError, Error, Result, RuntimeError};
pub use opcode::Op;
pub use value::{Native, NativeFn, Value};
pub use vm::Vm;

/// Crate version, surfaced by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Embedded standard prelude, interpreted by `Vm::new` before any user
/// code; publishes the array prototype and iterator helpers.
pub const PRELUDE: &str = include_str!("../../eule-std/prelude.eule");
