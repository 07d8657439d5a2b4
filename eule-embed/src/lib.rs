// eule-embed - High-level embedding API for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Embed eule in a Rust program.
//!
//! This crate wraps `eule-vm` in a small, stable surface: construct an
//! [`Engine`], evaluate source, exchange values through globals, and bind
//! native functions.

pub mod engine;

pub use engine::Engine;
pub use eule_vm::error::{Error, Result};
pub use eule_vm::value::{NativeFn, Value};
