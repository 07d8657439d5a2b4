// eule-embed - Engine implementation
// Copyright (c) 2026 The eule authors. MIT licensed.

//! The Engine struct - main entry point for embedding eule.

use std::io::Write;
use std::path::Path;

use eule_vm::error::{Error, Result};
use eule_vm::value::{NativeFn, Value};
use eule_vm::vm::Vm;

/// The eule scripting engine.
///
/// `Engine` wraps a [`Vm`] with a file runner and convenience accessors
/// for host bindings. Scripts communicate results through globals: run a
/// script, then read what it defined.
///
/// # Thread Safety
///
/// **`Engine` is NOT thread-safe.** The VM owns its heap and stacks and
/// values must not cross VM boundaries. If you need concurrent
/// evaluation, create a separate `Engine` per thread.
///
/// # Example
///
/// ```rust
/// use eule_embed::Engine;
/// use eule_vm::value::Value;
///
/// let mut engine = Engine::new().unwrap();
/// engine.eval("var answer = 6 * 7").unwrap();
/// assert_eq!(engine.get_global("answer"), Some(Value::Number(42.0)));
/// ```
pub struct Engine {
    vm: Vm,
}

impl Engine {
    /// Create a new Engine with the prelude loaded.
    pub fn new() -> Result<Self> {
        Ok(Engine { vm: Vm::new()? })
    }

    /// Create a new Engine without the prelude.
    ///
    /// Useful for sandboxed environments or when you want to provide your
    /// own library bindings; array literals have no prototype methods
    /// until something defines `__array`.
    pub fn new_bare() -> Self {
        Engine {
            vm: Vm::new_bare(),
        }
    }

    /// Evaluate a string of eule code against the engine's globals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compile`] for syntax errors and [`Error::Runtime`]
    /// for uncaught throws; the `Display` form matches the CLI diagnostics.
    pub fn eval(&mut self, source: &str) -> Result<()> {
        self.vm.interpret(source)
    }

    /// Evaluate a file of eule code.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(|error| {
            Error::Runtime(eule_vm::error::RuntimeError {
                message: format!("read {}: {}", path.as_ref().display(), error),
                trace: Vec::new(),
            })
        })?;
        self.eval(&source)
    }

    /// Read a global. Returns `None` if it is not defined.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.vm.get_global(name)
    }

    /// Define or overwrite a global before (or between) evaluations.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.vm.set_global(name, value);
    }

    /// Bind a host function as a global.
    ///
    /// # Example
    ///
    /// ```rust
    /// use eule_embed::Engine;
    /// use eule_vm::value::Value;
    ///
    /// let mut engine = Engine::new().unwrap();
    /// engine.register_native("twice", |_vm, args| match args.first() {
    ///     Some(Value::Number(n)) => Ok(Value::Number(n * 2.0)),
    ///     _ => Err(Value::string("twice expects a number")),
    /// });
    /// engine.eval("var result = twice(21)").unwrap();
    /// assert_eq!(engine.get_global("result"), Some(Value::Number(42.0)));
    /// ```
    pub fn register_native(&mut self, name: &'static str, function: NativeFn) {
        self.vm.register_native(name, function);
    }

    /// Redirect `print` output; defaults to stdout.
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.vm.set_output(out);
    }

    /// Render a value the way `print` would.
    pub fn display(&self, value: &Value) -> String {
        self.vm.display_value(value)
    }

    /// Direct access to the underlying VM for advanced embedding.
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}
