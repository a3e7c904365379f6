//! The standard global environment: named constants plus the host-side
//! functions every program starts with.

use std::io::Write;
use std::rc::Rc;

use crate::context::CallContext;
use crate::env::Env;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::position::Span;
use crate::value::{self, NativeFn, Number, Value};

/// A fresh global environment with the constants and built-in functions
/// installed. The evaluator never seeds these itself, so embedders can
/// start from a bare `Env` instead.
pub fn standard_env() -> Rc<Env> {
    let env = Env::new();
    env.set("null", Value::Nil);
    env.set("true", Value::int(1));
    env.set("false", Value::int(0));
    env.set("math_pi", Value::Number(Number::Float(std::f64::consts::PI)));
    for native in NATIVES {
        env.set(native.name, Value::Native(*native));
    }
    env
}

const NATIVES: &[NativeFn] = &[
    NativeFn { name: "print", params: &["value"], func: print },
    NativeFn { name: "print_ret", params: &["value"], func: print_ret },
    NativeFn { name: "input", params: &[], func: input },
    NativeFn { name: "input_int", params: &[], func: input_int },
    NativeFn { name: "clear", params: &[], func: clear },
    NativeFn { name: "is_number", params: &["value"], func: is_number },
    NativeFn { name: "is_string", params: &["value"], func: is_string },
    NativeFn { name: "is_list", params: &["value"], func: is_list },
    NativeFn { name: "is_function", params: &["value"], func: is_function },
    NativeFn { name: "append", params: &["list", "value"], func: append },
    NativeFn { name: "pop", params: &["list", "index"], func: pop },
    NativeFn { name: "extend", params: &["listA", "listB"], func: extend },
    NativeFn { name: "len", params: &["value"], func: len },
    NativeFn { name: "run", params: &["fn"], func: run },
];

fn expect_list<'a>(
    value: &'a Value,
    what: &str,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<&'a Rc<std::cell::RefCell<Vec<Value>>>, Error> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(Error::runtime(
            span.clone(),
            format!("{} must be a list, got a {}", what, other.type_name()),
            ctx,
        )),
    }
}

fn expect_str<'a>(
    value: &'a Value,
    what: &str,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<&'a str, Error> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(Error::runtime(
            span.clone(),
            format!("{} must be a string, got a {}", what, other.type_name()),
            ctx,
        )),
    }
}

fn print(
    interp: &mut Interpreter,
    args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    interp.emit(&args[0].display_string());
    interp.emit("\n");
    Ok(Value::Nil)
}

/// Like `print`, but hands the rendering back instead of printing it.
fn print_ret(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    Ok(Value::Str(args[0].display_string()))
}

fn read_stdin_line() -> String {
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    line.trim_end_matches(['\n', '\r']).to_string()
}

fn input(
    _interp: &mut Interpreter,
    _args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    Ok(Value::Str(read_stdin_line()))
}

/// Prompts again until the line parses as an integer.
fn input_int(
    interp: &mut Interpreter,
    _args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    loop {
        let line = read_stdin_line();
        match line.parse::<i64>() {
            Ok(n) => return Ok(Value::int(n)),
            Err(_) => {
                interp.emit(&format!("'{}' must be an integer. Try again!\n", line));
            }
        }
    }
}

fn clear(
    _interp: &mut Interpreter,
    _args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    print!("\x1b[2J\x1b[1;1H");
    let _ = std::io::stdout().flush();
    Ok(Value::Nil)
}

fn is_number(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    Ok(Value::bool(matches!(args[0], Value::Number(_))))
}

fn is_string(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    Ok(Value::bool(matches!(args[0], Value::Str(_))))
}

fn is_list(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    Ok(Value::bool(matches!(args[0], Value::List(_))))
}

fn is_function(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    _span: &Span,
    _ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    Ok(Value::bool(matches!(
        args[0],
        Value::Function(_) | Value::Native(_)
    )))
}

/// In-place push, visible through every alias of the list.
fn append(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    let items = expect_list(&args[0], "first argument of 'append'", span, ctx)?;
    items.borrow_mut().push(args[1].clone());
    Ok(Value::Nil)
}

fn pop(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    let items = expect_list(&args[0], "first argument of 'pop'", span, ctx)?;
    let idx = match &args[1] {
        Value::Number(n) => n.as_index(),
        _ => None,
    }
    .ok_or_else(|| {
        Error::runtime(
            span.clone(),
            "second argument of 'pop' must be an integer",
            ctx,
        )
    })?;
    let mut items = items.borrow_mut();
    let len = items.len();
    let at =
        value::resolve_index(idx, len).ok_or_else(|| value::index_error(idx, len, span, ctx))?;
    Ok(items.remove(at))
}

fn extend(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    let target = expect_list(&args[0], "first argument of 'extend'", span, ctx)?;
    let source = expect_list(&args[1], "second argument of 'extend'", span, ctx)?;
    // `extend(xs, xs)` would otherwise borrow xs twice.
    let extra: Vec<Value> = source.borrow().clone();
    target.borrow_mut().extend(extra);
    Ok(Value::Nil)
}

fn len(
    _interp: &mut Interpreter,
    args: Vec<Value>,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    let count = match &args[0] {
        Value::List(items) => items.borrow().len(),
        Value::Str(s) => s.chars().count(),
        other => {
            return Err(Error::runtime(
                span.clone(),
                format!("'len' expects a list or string, got a {}", other.type_name()),
                ctx,
            ));
        }
    };
    Ok(Value::int(count as i64))
}

/// Load and execute another script in the same interpreter and globals.
fn run(
    interp: &mut Interpreter,
    args: Vec<Value>,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    let path = expect_str(&args[0], "argument of 'run'", span, ctx)?;
    let source = std::fs::read_to_string(path).map_err(|e| {
        Error::runtime(
            span.clone(),
            format!("failed to load script \"{}\"\n{}", path, e),
            ctx,
        )
    })?;
    interp.run(path, &source).map_err(|e| {
        Error::runtime(
            span.clone(),
            format!(
                "failed to finish executing script \"{}\"\n{}",
                path,
                e.render()
            ),
            ctx,
        )
    })
}
