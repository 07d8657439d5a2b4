// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Stack-based virtual machine.
//!
//! The VM owns the operand stack, the call stack, the object heap, the
//! global table, the open-upvalue list and the try-handler stack; dispatch
//! is a tight match over opcodes. Runtime errors are thrown as values: an
//! instruction that fails returns the thrown value, and the loop either
//! unwinds to the newest try handler or surfaces a [`RuntimeError`] with a
//! stack trace.

pub mod frame;
pub mod stack;

use std::io::Write;
use std::rc::Rc;

use crate::chunk::Function;
use crate::compiler;
use crate::debug;
use crate::error::{Error, Result, RuntimeError, TraceFrame};
use crate::heap::{Closure, ClosureId, GcRoot, Heap, Table, TableId, UpvalId, Upvalue};
use crate::natives;
use crate::opcode::Op;
use crate::value::{
    format_number, Native, NativeFn, Value, KEY_ARRAY_PROTO, KEY_DONE, KEY_ERROR, KEY_LENGTH,
    KEY_VALUE,
};

pub use frame::{CallFrame, TryHandler};
pub use stack::ValueStack;

/// Maximum call-stack depth; bounds recursion cheaply.
pub const FRAMES_MAX: usize = 64;

/// Operand-stack capacity reserved up front.
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// Continue or halt, from one dispatched instruction.
enum Flow {
    Continue,
    Halt,
}

/// A thrown value travelling up the dispatch loop.
type Thrown = Value;

/// The eule virtual machine.
///
/// Single-threaded and self-contained: values must not cross VM
/// boundaries. Create one per independent interpreter.
pub struct Vm {
    stack: ValueStack,
    frames: Vec<CallFrame>,
    heap: Heap,
    globals: TableId,
    /// Open upvalues ordered by descending stack slot.
    open_upvals: Vec<UpvalId>,
    handlers: Vec<TryHandler>,
    out: Box<dyn Write>,
}

impl Vm {
    /// A VM with the native bindings but no prelude; for sandboxed
    /// embedding. Array literals work, but have no prototype methods until
    /// something defines `__array`.
    pub fn new_bare() -> Vm {
        let mut heap = Heap::new();
        let globals = heap.alloc_table(Table::new());
        let mut vm = Vm {
            stack: ValueStack::new(),
            frames: Vec::with_capacity(FRAMES_MAX),
            heap,
            globals,
            open_upvals: Vec::new(),
            handlers: Vec::new(),
            out: Box::new(std::io::stdout()),
        };
        natives::install(&mut vm);
        vm
    }

    /// A VM with the natives bound and the embedded prelude interpreted;
    /// the standard way to construct one.
    pub fn new() -> Result<Vm> {
        let mut vm = Vm::new_bare();
        vm.interpret(crate::PRELUDE)?;
        Ok(vm)
    }

    /// Compile and execute a source unit against this VM's globals.
    pub fn interpret(&mut self, source: &str) -> Result<()> {
        let function = compiler::compile(source)?;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("\n{}", debug::disassemble(&function));
        }

        // A previous run may have been abandoned mid-error: close every
        // surviving upvalue while its slot still exists, then reset.
        self.close_upvalues(0);
        self.stack.truncate(0);
        self.frames.clear();
        self.handlers.clear();

        self.stack.push(Value::Function(Rc::clone(&function)));
        if let Err(thrown) = self.call_function(function, 0, None) {
            return Err(Error::Runtime(self.runtime_error(thrown)));
        }
        self.run().map_err(Error::Runtime)
    }

    /// Redirect `print` and friends; defaults to stdout.
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.heap.table(self.globals).get(name).cloned()
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let globals = self.globals;
        self.heap.table_mut(globals).store(Rc::from(name), value);
    }

    /// Bind a host function into the global table.
    pub fn register_native(&mut self, name: &'static str, function: NativeFn) {
        self.set_global(name, Value::Native(Native { name, function }));
    }

    /// The global table's id, for host code that wants raw table access.
    pub fn globals(&self) -> TableId {
        self.globals
    }

    /// Current operand-stack depth. Between statements this is exactly the
    /// depth the compiler reserved, which makes it a useful probe for
    /// stack-discipline checks.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Render a value the way `print` does, resolving closure names.
    pub fn display_value(&self, value: &Value) -> String {
        match value {
            Value::Closure(id) => {
                let name = &self.heap.closure(*id).function.name;
                if name.is_empty() {
                    "<fn>".to_string()
                } else {
                    format!("<fn {}>", name)
                }
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn output(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /* == dispatch ========================================================== */

    fn run(&mut self) -> std::result::Result<(), RuntimeError> {
        loop {
            if log::log_enabled!(log::Level::Trace) {
                let frame = self.frame();
                let (text, _) = debug::instruction(&frame.function, frame.ip);
                log::trace!("{} |: {} slots", text, self.stack.len());
            }

            let byte = self.read_byte();
            let flow = match Op::from_byte(byte) {
                Some(op) => self.step(op),
                None => Err(Value::string(format!("unknown opcode {}", byte))),
            };
            match flow {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => return Ok(()),
                Err(thrown) => self.recover(thrown)?,
            }
        }
    }

    fn step(&mut self, op: Op) -> std::result::Result<Flow, Thrown> {
        match op {
            Op::Pop => {
                self.stack.pop();
            }
            Op::Dup => {
                let value = self.stack.peek(0).clone();
                self.stack.push(value);
            }
            Op::DupTwo => {
                let b = self.stack.peek(0).clone();
                let a = self.stack.peek(1).clone();
                self.stack.push(a);
                self.stack.push(b);
            }
            Op::Swap => self.stack.swap_top(),

            Op::Nihil => self.stack.push(Value::Nihil),
            Op::False => self.stack.push(Value::Boolean(false)),
            Op::True => self.stack.push(Value::Boolean(true)),
            Op::SmallInt => {
                let number = self.read_byte();
                self.stack.push(Value::Number(number as f64));
            }
            Op::Constant => {
                let value = self.read_constant();
                self.stack.push(value);
            }
            Op::Table => {
                let id = self.alloc_table(Table::new());
                self.stack.push(Value::Table(id));
            }
            Op::Array => {
                let proto = match self.heap.table(self.globals).get(KEY_ARRAY_PROTO) {
                    Some(Value::Table(id)) => Some(*id),
                    _ => None,
                };
                let id = self.alloc_table(Table::with_proto(proto));
                self.heap
                    .table_mut(id)
                    .store(Rc::from(KEY_LENGTH), Value::Number(0.0));
                self.stack.push(Value::Table(id));
            }

            Op::AddKey => {
                let value = self.stack.pop();
                let key = self.stack.pop();
                let id = self.peek_table(0)?;
                self.heap.table_mut(id).store(key.to_key(), value);
            }
            Op::AddSpread => {
                let source = self.stack.pop();
                let target = self.peek_table(0)?;
                match source {
                    Value::Nihil => {}
                    Value::Table(source_id) => {
                        let pairs: Vec<(Rc<str>, Value)> = self
                            .heap
                            .table(source_id)
                            .pairs()
                            .map(|(key, value)| (Rc::clone(key), value.clone()))
                            .collect();
                        for (key, value) in pairs {
                            self.heap.table_mut(target).store(key, value);
                        }
                    }
                    other => {
                        return Err(Value::string(format!(
                            "attempt to spread {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Op::AddArrayElt => {
                let value = self.stack.pop();
                let id = self.peek_table(0)?;
                self.array_append(id, value);
            }
            Op::AddArraySpread => {
                let source = self.stack.pop();
                let target = self.peek_table(0)?;
                match source {
                    Value::Nihil => {}
                    Value::Table(source_id) => {
                        let length = self.table_length(source_id);
                        for index in 0..length {
                            let key = format_number(index as f64);
                            let value = self
                                .heap
                                .table(source_id)
                                .get(&key)
                                .cloned()
                                .unwrap_or(Value::Nihil);
                            self.array_append(target, value);
                        }
                    }
                    other => {
                        return Err(Value::string(format!(
                            "attempt to spread {}",
                            other.type_name()
                        )))
                    }
                }
            }

            Op::LoadLocal => {
                let slot = self.read_byte() as usize;
                let base = self.frame().base;
                let value = self.stack.get(base + 1 + slot).clone();
                self.stack.push(value);
            }
            Op::StoreLocal => {
                let slot = self.read_byte() as usize;
                let base = self.frame().base;
                let value = self.stack.peek(0).clone();
                self.stack.set(base + 1 + slot, value);
            }
            Op::LoadTemp => {
                let base = self.frame().base;
                let value = self.stack.get(base).clone();
                let top = self.stack.len() - 1;
                self.stack.set(top, value);
            }
            Op::StoreTemp => {
                let base = self.frame().base;
                let value = self.stack.peek(0).clone();
                self.stack.set(base, value);
            }

            Op::DefineGlobal => {
                let name = self.read_string()?;
                let value = self.stack.pop();
                let globals = self.globals;
                self.heap.table_mut(globals).store(name, value);
            }
            Op::LoadGlobal => {
                let name = self.read_string()?;
                match self.heap.table(self.globals).get(&name) {
                    Some(value) => {
                        let value = value.clone();
                        self.stack.push(value);
                    }
                    None => {
                        return Err(Value::string(format!("variable '{}' is undefined", name)))
                    }
                }
            }
            Op::StoreGlobal => {
                let name = self.read_string()?;
                if !self.heap.table(self.globals).has(&name) {
                    return Err(Value::string(format!("variable '{}' is undefined", name)));
                }
                let value = self.stack.peek(0).clone();
                let globals = self.globals;
                self.heap.table_mut(globals).store(name, value);
            }

            Op::LoadUpvalue => {
                let index = self.read_byte() as usize;
                let id = self.frame_upval(index)?;
                let value = self.read_upvalue(id);
                self.stack.push(value);
            }
            Op::StoreUpvalue => {
                let index = self.read_byte() as usize;
                let id = self.frame_upval(index)?;
                let value = self.stack.peek(0).clone();
                self.write_upvalue(id, value);
            }
            Op::CloseUpvalue => {
                let top = self.stack.len() - 1;
                self.close_upvalues(top);
                self.stack.pop();
            }
            Op::Closure => {
                let function = match self.stack.pop() {
                    Value::Function(function) => function,
                    other => {
                        return Err(Value::string(format!(
                            "closure over {}",
                            other.type_name()
                        )))
                    }
                };
                let closure_id = self.alloc_closure(Closure {
                    function: Rc::clone(&function),
                    upvals: Vec::new(),
                });
                self.stack.push(Value::Closure(closure_id));
                let base = self.frame().base;
                let parent = self.frame().closure;
                for desc in function.upvals.iter() {
                    let upval = if desc.is_local {
                        self.capture_upvalue(base + 1 + desc.index as usize)
                    } else {
                        match parent {
                            Some(parent) => self.heap.closure(parent).upvals[desc.index as usize],
                            None => return Err(Value::string("upvalue outside closure")),
                        }
                    };
                    self.heap.closure_mut(closure_id).upvals.push(upval);
                }
            }

            Op::LoadKey => {
                let key = self.stack.pop();
                let receiver = self.stack.pop();
                match receiver {
                    Value::Table(id) => {
                        let value = self.heap.load(id, &key.to_key());
                        self.stack.push(value);
                    }
                    other => {
                        return Err(Value::string(format!(
                            "attempt to load key from {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Op::StoreKey => {
                let value = self.stack.pop();
                let key = self.stack.pop();
                let receiver = self.stack.pop();
                match receiver {
                    Value::Table(id) => {
                        self.heap.table_mut(id).store(key.to_key(), value.clone());
                        self.stack.push(value);
                    }
                    other => {
                        return Err(Value::string(format!(
                            "attempt to store key in {}",
                            other.type_name()
                        )))
                    }
                }
            }

            Op::Add => {
                let b = self.stack.pop();
                let a = self.stack.pop();
                match (&a, &b) {
                    (Value::String(x), Value::String(y)) => {
                        let mut joined = String::with_capacity(x.len() + y.len());
                        joined.push_str(x);
                        joined.push_str(y);
                        self.stack.push(Value::string(&joined));
                    }
                    (Value::Number(x), Value::Number(y)) => {
                        self.stack.push(Value::Number(x + y));
                    }
                    _ => {
                        return Err(Value::string(format!(
                            "attempt to add {} and {}",
                            a.type_name(),
                            b.type_name()
                        )))
                    }
                }
            }
            Op::Sub | Op::Mul | Op::Div | Op::Mod | Op::Lt | Op::Le => {
                self.binary_number_op(op)?;
            }
            Op::Eq => {
                let b = self.stack.pop();
                let a = self.stack.pop();
                self.stack.push(Value::Boolean(a == b));
            }
            Op::Not => {
                let value = self.stack.pop();
                self.stack.push(Value::Boolean(!value.is_truthy()));
            }
            Op::Neg => match self.stack.pop() {
                Value::Number(number) => self.stack.push(Value::Number(-number)),
                other => {
                    return Err(Value::string(format!(
                        "attempt to neg {}",
                        other.type_name()
                    )))
                }
            },
            Op::Pos => match self.stack.pop() {
                Value::Number(number) => self.stack.push(Value::Number(number.abs())),
                other => {
                    return Err(Value::string(format!(
                        "attempt to pos {}",
                        other.type_name()
                    )))
                }
            },
            Op::TypeOf => {
                let value = self.stack.pop();
                self.stack.push(Value::string(value.type_name()));
            }

            Op::Jump => {
                let offset = self.read_short() as usize;
                self.frame_mut().ip += offset;
            }
            Op::JumpIfFalse => {
                let offset = self.read_short() as usize;
                if !self.stack.peek(0).is_truthy() {
                    self.frame_mut().ip += offset;
                }
            }
            Op::JumpIfDone => {
                let offset = self.read_short() as usize;
                match self.stack.pop() {
                    Value::Table(id) => {
                        if self.heap.load(id, KEY_DONE).is_truthy() {
                            self.frame_mut().ip += offset;
                        } else {
                            let value = self.heap.load(id, KEY_VALUE);
                            self.stack.push(value);
                        }
                    }
                    other => {
                        return Err(Value::string(format!(
                            "attempt to iterate {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Op::JumpBack => {
                let offset = self.read_short() as usize;
                self.frame_mut().ip -= offset;
            }

            Op::Call => {
                let arg_count = self.read_byte() as usize;
                let callee = self.stack.peek(arg_count).clone();
                self.call_value(callee, arg_count)?;
            }
            Op::CallSpread => {
                let arg_count = self.read_byte() as usize;
                let extra = self.spread_arguments()?;
                let callee = self.stack.peek(arg_count + extra).clone();
                self.call_value(callee, arg_count + extra)?;
            }
            Op::Return => {
                let result = self.stack.pop();
                let frame = match self.frames.pop() {
                    Some(frame) => frame,
                    None => return Ok(Flow::Halt),
                };
                self.close_upvalues(frame.base + 1);
                self.stack.truncate(frame.base);
                self.stack.push(result);
                if self.frames.is_empty() {
                    return Ok(Flow::Halt);
                }
            }

            Op::OpenTry => {
                let offset = self.read_short() as usize;
                let recover = self.frame().ip + offset;
                self.handlers.push(TryHandler {
                    cst: self.frames.len(),
                    st: self.stack.len(),
                    recover,
                });
            }
            Op::CloseTry => {
                self.handlers.pop();
                let record = self.alloc_table(Table::new());
                let value = self.stack.pop();
                let table = self.heap.table_mut(record);
                table.store(Rc::from(KEY_VALUE), value);
                table.store(Rc::from(KEY_ERROR), Value::Boolean(false));
                self.stack.push(Value::Table(record));
            }
        }
        Ok(Flow::Continue)
    }

    /* == calls ============================================================= */

    fn call_value(&mut self, callee: Value, arg_count: usize) -> std::result::Result<(), Thrown> {
        match callee {
            Value::Closure(id) => {
                let function = Rc::clone(&self.heap.closure(id).function);
                self.call_function(function, arg_count, Some(id))
            }
            Value::Function(function) => self.call_function(function, arg_count, None),
            Value::Native(native) => self.call_native(native, arg_count),
            other => Err(Value::string(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(
        &mut self,
        function: Rc<Function>,
        arg_count: usize,
        closure: Option<ClosureId>,
    ) -> std::result::Result<(), Thrown> {
        if self.frames.len() == FRAMES_MAX {
            return Err(Value::string("stack overflow"));
        }
        let base = self.stack.len() - arg_count - 1;
        let param_count = function.param_count as usize;
        let vararg = function.vararg;
        self.frames.push(CallFrame::new(function, closure, base));
        self.balance_arguments(arg_count, param_count, vararg);
        Ok(())
    }

    /// Make the stack match the callee's declared parameters: missing
    /// arguments become `void`, excess is collected into the rest table for
    /// variadic callees and discarded otherwise.
    fn balance_arguments(&mut self, arg_count: usize, mut param_count: usize, vararg: bool) {
        if vararg {
            param_count = param_count.saturating_sub(1);
        }

        if arg_count <= param_count {
            for _ in arg_count..param_count {
                self.stack.push(Value::Nihil);
            }
            if vararg {
                let rest = self.alloc_table(Table::new());
                self.heap
                    .table_mut(rest)
                    .store(Rc::from(KEY_LENGTH), Value::Number(0.0));
                self.stack.push(Value::Table(rest));
            }
        } else {
            let extra = arg_count - param_count;
            if vararg {
                let rest = self.alloc_table(Table::new());
                for index in 0..extra {
                    let value = self.stack.peek(extra - 1 - index).clone();
                    self.heap
                        .table_mut(rest)
                        .store(Rc::from(format_number(index as f64).as_str()), value);
                }
                self.heap
                    .table_mut(rest)
                    .store(Rc::from(KEY_LENGTH), Value::Number(extra as f64));
                let len = self.stack.len();
                self.stack.truncate(len - extra);
                self.stack.push(Value::Table(rest));
            } else {
                let len = self.stack.len();
                self.stack.truncate(len - extra);
            }
        }
    }

    fn call_native(&mut self, native: Native, arg_count: usize) -> std::result::Result<(), Thrown> {
        let args = self.stack.top_slice(arg_count);
        // The originals stay on the stack during the call so a collection
        // triggered by the native still sees them.
        let result = (native.function)(self, &args);
        let len = self.stack.len();
        self.stack.truncate(len - arg_count - 1);
        let value = result?;
        self.stack.push(value);
        Ok(())
    }

    /// Expand the spread table at the top of the stack into positional
    /// arguments; `void` spreads as nothing.
    fn spread_arguments(&mut self) -> std::result::Result<usize, Thrown> {
        match self.stack.pop() {
            Value::Nihil => Ok(0),
            Value::Table(id) => {
                let length = self.table_length(id);
                for index in 0..length {
                    let key = format_number(index as f64);
                    let value = self
                        .heap
                        .table(id)
                        .get(&key)
                        .cloned()
                        .unwrap_or(Value::Nihil);
                    self.stack.push(value);
                }
                Ok(length)
            }
            other => Err(Value::string(format!(
                "attempt to spread {}",
                other.type_name()
            ))),
        }
    }

    /* == upvalues ========================================================== */

    fn capture_upvalue(&mut self, slot: usize) -> UpvalId {
        let mut insert_at = self.open_upvals.len();
        for (index, &id) in self.open_upvals.iter().enumerate() {
            if let Upvalue::Open(existing) = self.heap.upval(id) {
                if *existing == slot {
                    return id;
                }
                if *existing < slot {
                    insert_at = index;
                    break;
                }
            }
        }
        let id = self.alloc_upval(Upvalue::Open(slot));
        self.open_upvals.insert(insert_at, id);
        id
    }

    /// Close every open upvalue at or above `threshold`, copying the slot
    /// value out; the list is ordered by descending slot, so this peels a
    /// prefix.
    fn close_upvalues(&mut self, threshold: usize) {
        while let Some(&id) = self.open_upvals.first() {
            let slot = match self.heap.upval(id) {
                Upvalue::Open(slot) => *slot,
                Upvalue::Closed(_) => {
                    self.open_upvals.remove(0);
                    continue;
                }
            };
            if slot < threshold {
                break;
            }
            let value = self.stack.get(slot).clone();
            *self.heap.upval_mut(id) = Upvalue::Closed(value);
            self.open_upvals.remove(0);
        }
    }

    fn read_upvalue(&self, id: UpvalId) -> Value {
        match self.heap.upval(id) {
            Upvalue::Open(slot) => self.stack.get(*slot).clone(),
            Upvalue::Closed(value) => value.clone(),
        }
    }

    fn write_upvalue(&mut self, id: UpvalId, value: Value) {
        match self.heap.upval_mut(id) {
            Upvalue::Open(slot) => {
                let slot = *slot;
                self.stack.set(slot, value);
            }
            Upvalue::Closed(closed) => *closed = value,
        }
    }

    fn frame_upval(&self, index: usize) -> std::result::Result<UpvalId, Thrown> {
        match self.frame().closure {
            Some(closure) => Ok(self.heap.closure(closure).upvals[index]),
            None => Err(Value::string("upvalue outside closure")),
        }
    }

    /* == throw & unwind ==================================================== */

    /// Route a thrown value: unwind to the newest try handler, or convert
    /// it into a surfaced runtime error.
    fn recover(&mut self, thrown: Value) -> std::result::Result<(), RuntimeError> {
        match self.handlers.pop() {
            Some(handler) => {
                self.frames.truncate(handler.cst);
                self.close_upvalues(handler.st);
                self.stack.truncate(handler.st);
                self.frame_mut().ip = handler.recover;

                // Keep the payload rooted across the record allocation.
                self.stack.push(thrown);
                let record = self.alloc_table(Table::new());
                let value = self.stack.pop();
                let table = self.heap.table_mut(record);
                table.store(Rc::from(KEY_VALUE), value);
                table.store(Rc::from(KEY_ERROR), Value::Boolean(true));
                self.stack.push(Value::Table(record));
                Ok(())
            }
            None => Err(self.runtime_error(thrown)),
        }
    }

    fn runtime_error(&mut self, thrown: Value) -> RuntimeError {
        let message = self.display_value(&thrown);
        let mut trace = Vec::new();
        for frame in self.frames.iter().rev() {
            let line = if frame.function.lines.is_empty() {
                0
            } else {
                let index = frame.ip.saturating_sub(1).min(frame.function.lines.len() - 1);
                frame.function.lines[index]
            };
            trace.push(TraceFrame {
                line,
                name: Rc::clone(&frame.function.name),
            });
        }
        RuntimeError { message, trace }
    }

    /* == heap & helpers ==================================================== */

    fn alloc_table(&mut self, table: Table) -> TableId {
        self.maybe_gc();
        self.heap.alloc_table(table)
    }

    fn alloc_closure(&mut self, closure: Closure) -> ClosureId {
        self.maybe_gc();
        self.heap.alloc_closure(closure)
    }

    fn alloc_upval(&mut self, upval: Upvalue) -> UpvalId {
        self.maybe_gc();
        self.heap.alloc_upval(upval)
    }

    /// Collect if the heap asks for it. Runs before an allocation, never
    /// after: every live object is reachable from the roots at that point.
    fn maybe_gc(&mut self) {
        if !self.heap.wants_gc() {
            return;
        }
        let Vm {
            heap,
            stack,
            frames,
            globals,
            open_upvals,
            ..
        } = self;
        let roots = stack
            .iter()
            .map(GcRoot::Value)
            .chain(std::iter::once(GcRoot::Table(*globals)))
            .chain(frames.iter().filter_map(|f| f.closure.map(GcRoot::Closure)))
            .chain(open_upvals.iter().map(|&id| GcRoot::Upval(id)));
        heap.collect(roots);
    }

    fn array_append(&mut self, id: TableId, value: Value) {
        let length = match self.heap.table(id).get(KEY_LENGTH) {
            Some(Value::Number(n)) => *n,
            _ => 0.0,
        };
        let key: Rc<str> = Rc::from(format_number(length).as_str());
        let table = self.heap.table_mut(id);
        table.store(key, value);
        table.store(Rc::from(KEY_LENGTH), Value::Number(length + 1.0));
    }

    fn table_length(&self, id: TableId) -> usize {
        match self.heap.table(id).get(KEY_LENGTH) {
            Some(Value::Number(n)) if *n > 0.0 => *n as usize,
            _ => 0,
        }
    }

    fn peek_table(&self, distance: usize) -> std::result::Result<TableId, Thrown> {
        match self.stack.peek(distance) {
            Value::Table(id) => Ok(*id),
            other => Err(Value::string(format!(
                "attempt to store key in {}",
                other.type_name()
            ))),
        }
    }

    fn binary_number_op(&mut self, op: Op) -> std::result::Result<(), Thrown> {
        let b = self.stack.pop();
        let a = self.stack.pop();
        match (&a, &b) {
            (Value::Number(x), Value::Number(y)) => {
                let result = match op {
                    Op::Sub => Value::Number(x - y),
                    Op::Mul => Value::Number(x * y),
                    Op::Div => Value::Number(x / y),
                    Op::Mod => Value::Number(x % y),
                    Op::Lt => Value::Boolean(x < y),
                    Op::Le => Value::Boolean(x <= y),
                    _ => Value::Nihil,
                };
                self.stack.push(result);
                Ok(())
            }
            _ => Err(Value::string(format!(
                "attempt to {} {} and {}",
                op.name(),
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    fn frame(&self) -> &CallFrame {
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn read_byte(&mut self) -> u8 {
        self.frame_mut().read_byte()
    }

    fn read_short(&mut self) -> u16 {
        self.frame_mut().read_short()
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte() as usize;
        self.frame().function.constants[index].clone()
    }

    fn read_string(&mut self) -> std::result::Result<Rc<str>, Thrown> {
        match self.read_constant() {
            Value::String(name) => Ok(name),
            other => Err(Value::string(format!(
                "name constant is {}",
                other.type_name()
            ))),
        }
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("stack_depth", &self.stack.len())
            .field("frames", &self.frames.len())
            .field("live_objects", &self.heap.live_objects())
            .finish()
    }
}
