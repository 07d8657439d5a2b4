// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Host functions bound into every VM's global table.
//!
//! A native returns `Ok(result)` or `Err(thrown)`; thrown values unwind
//! through the same try-handler machinery as `error()` calls in script.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::value::Value;
use crate::vm::Vm;

/// Bind the standard natives; called by `Vm::new_bare`.
pub(crate) fn install(vm: &mut Vm) {
    vm.register_native("print", native_print);
    vm.register_native("clock", native_clock);
    vm.register_native("assert", native_assert);
    vm.register_native("setPrototype", native_set_prototype);
    vm.register_native("getPrototype", native_get_prototype);
    vm.register_native("error", native_error);
}

/// `print(values...)`: space-separated, newline-terminated.
fn native_print(vm: &mut Vm, args: &[Value]) -> Result<Value, Value> {
    let line = args
        .iter()
        .map(|value| vm.display_value(value))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(vm.output(), "{}", line)
        .map_err(|error| Value::string(format!("print: {}", error)))?;
    Ok(Value::Nihil)
}

/// `clock()`: seconds since the Unix epoch, as a number.
fn native_clock(_vm: &mut Vm, _args: &[Value]) -> Result<Value, Value> {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(seconds))
}

/// `assert(condition, message?)`: throws when the condition is falsy.
fn native_assert(_vm: &mut Vm, args: &[Value]) -> Result<Value, Value> {
    let condition = match args.first() {
        Some(condition) => condition,
        None => return Err(Value::string("assert expects a condition")),
    };
    if condition.is_truthy() {
        return Ok(Value::Nihil);
    }
    match args.get(1) {
        Some(message) => Err(message.clone()),
        None => Err(Value::string("assertion failed")),
    }
}

/// `setPrototype(table, proto)`: `void` clears; returns the table.
fn native_set_prototype(vm: &mut Vm, args: &[Value]) -> Result<Value, Value> {
    let id = match args.first() {
        Some(Value::Table(id)) => *id,
        other => return Err(type_error("setPrototype expects a table", other)),
    };
    let proto = match args.get(1) {
        Some(Value::Table(proto)) => Some(*proto),
        Some(Value::Nihil) | None => None,
        other => return Err(type_error("setPrototype expects a table prototype", other)),
    };
    vm.heap_mut().table_mut(id).proto = proto;
    Ok(Value::Table(id))
}

/// `getPrototype(table)`: the prototype table, or `void`.
fn native_get_prototype(vm: &mut Vm, args: &[Value]) -> Result<Value, Value> {
    let id = match args.first() {
        Some(Value::Table(id)) => *id,
        other => return Err(type_error("getPrototype expects a table", other)),
    };
    Ok(match vm.heap().table(id).proto {
        Some(proto) => Value::Table(proto),
        None => Value::Nihil,
    })
}

/// `error(value?)`: throw the value; any value, not just strings.
fn native_error(_vm: &mut Vm, args: &[Value]) -> Result<Value, Value> {
    Err(args.first().cloned().unwrap_or(Value::Nihil))
}

fn type_error(expectation: &str, got: Option<&Value>) -> Value {
    match got {
        Some(value) => Value::string(format!("{}, got {}", expectation, value.type_name())),
        None => Value::string(format!("{}, got nothing", expectation)),
    }
}
