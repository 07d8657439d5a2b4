// eule-embed - Engine integration tests
// Copyright (c) 2026 The eule authors. MIT licensed.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use eule_embed::{Engine, Error, Value};

#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn eval_and_read_globals() {
    let mut engine = Engine::new().expect("engine");
    engine.eval("var answer = 6 * 7").expect("eval");
    assert_eq!(engine.get_global("answer"), Some(Value::Number(42.0)));
    assert_eq!(engine.get_global("missing"), None);
}

#[test]
fn host_values_are_visible_to_scripts() {
    let mut engine = Engine::new().expect("engine");
    engine.set_global("seed", Value::Number(20.0));
    engine.eval("var result = seed + 22").expect("eval");
    assert_eq!(engine.get_global("result"), Some(Value::Number(42.0)));
}

#[test]
fn native_functions_can_throw_and_return() {
    let mut engine = Engine::new().expect("engine");
    engine.register_native("halve", |_vm, args| match args.first() {
        Some(Value::Number(n)) => Ok(Value::Number(n / 2.0)),
        _ => Err(Value::string("halve expects a number")),
    });

    engine.eval("var half = halve(84)").expect("eval");
    assert_eq!(engine.get_global("half"), Some(Value::Number(42.0)));

    engine
        .eval("var caught = (try halve(\"nope\")).value")
        .expect("eval");
    assert_eq!(
        engine.get_global("caught"),
        Some(Value::string("halve expects a number"))
    );
}

#[test]
fn output_redirection_captures_print() {
    let mut engine = Engine::new().expect("engine");
    let buf = SharedBuf::default();
    engine.set_output(Box::new(buf.clone()));
    engine.eval("print(\"hello\", 1)").expect("eval");
    assert_eq!(String::from_utf8_lossy(&buf.0.borrow()).as_ref(), "hello 1\n");
}

#[test]
fn errors_render_cli_diagnostics() {
    let mut engine = Engine::new().expect("engine");

    let error = engine.eval("var = 1").expect_err("syntax error");
    assert!(matches!(error, Error::Compile(_)));
    assert!(error.to_string().starts_with("compile error: ln 1:"));

    let error = engine.eval("nosuch()").expect_err("runtime error");
    assert!(matches!(error, Error::Runtime(_)));
    assert!(error.to_string().starts_with("runtime error:"));
}

#[test]
fn bare_engine_skips_the_prelude() {
    let mut engine = Engine::new_bare();
    assert_eq!(engine.get_global("__array"), None);
    // Array literals still work; they just have no prototype methods.
    engine.eval("var n = [1, 2].length").expect("eval");
    assert_eq!(engine.get_global("n"), Some(Value::Number(2.0)));
}

#[test]
fn display_matches_print() {
    let engine = Engine::new().expect("engine");
    assert_eq!(engine.display(&Value::Nihil), "void");
    assert_eq!(engine.display(&Value::Number(1.5)), "1.5");
    assert_eq!(engine.display(&Value::string("s")), "s");
}
