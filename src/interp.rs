use std::io::Write;
use std::rc::Rc;

use crate::ast::{Node, NodeKind};
use crate::builtins;
use crate::context::CallContext;
use crate::env::Env;
use crate::error::Error;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::position::Source;
use crate::trace::trace_log;
use crate::value::{self, FuncData, NativeFn, Number, Value};

/// Calls nested deeper than this fail with a runtime error instead of
/// exhausting the host stack.
pub(crate) const MAX_CALL_DEPTH: usize = 256;

/// The outcome of evaluating one node: either a plain value or a non-local
/// control signal on its way to the construct that consumes it. Failure
/// travels on the `Err` side of the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Value(Value),
    Return(Value),
    Continue,
    Break,
}

/// Unwrap a value-producing evaluation; any control signal short-circuits
/// the current node by propagating upward unchanged.
macro_rules! eval_value {
    ($self:ident, $node:expr, $env:expr, $ctx:expr) => {
        match $self.eval($node, $env, $ctx)? {
            Flow::Value(v) => v,
            other => return Ok(other),
        }
    };
}

/// What a loop does after one body evaluation.
enum LoopSignal {
    Next,
    Stop,
    Return(Value),
}

/// The tree-walking evaluator. Holds the global environment the pipeline
/// runs against and the output buffer `print` writes through, so embedders
/// and tests can capture printed text instead of losing it to stdout.
pub struct Interpreter {
    globals: Rc<Env>,
    output: String,
    immediate_stdout: bool,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_globals(builtins::standard_env())
    }

    /// Run against a caller-constructed global environment. The evaluator
    /// itself never installs built-ins.
    pub fn with_globals(globals: Rc<Env>) -> Self {
        Self {
            globals,
            output: String::new(),
            immediate_stdout: false,
            depth: 0,
        }
    }

    pub fn globals(&self) -> &Rc<Env> {
        &self.globals
    }

    /// Text printed so far (buffered mode only).
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Write `print` output straight to stdout instead of buffering.
    pub fn set_immediate_stdout(&mut self, immediate: bool) {
        self.immediate_stdout = immediate;
    }

    pub(crate) fn emit(&mut self, text: &str) {
        if self.immediate_stdout {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        } else {
            self.output.push_str(text);
        }
    }

    /// The whole pipeline: lex, parse, evaluate against the globals.
    /// `name` is the logical file name used in diagnostics.
    pub fn run(&mut self, name: &str, source: &str) -> Result<Value, Error> {
        let src = Source::new(name, source);
        let tokens = Lexer::new(src).tokenize()?;
        let ast = Parser::new(tokens).parse()?;
        trace_log!("eval", "running {}", name);
        let ctx = CallContext::root("<program>");
        let env = self.globals.clone();
        match self.eval(&ast, &env, &ctx)? {
            Flow::Value(v) | Flow::Return(v) => Ok(v),
            Flow::Continue | Flow::Break => Ok(Value::Nil),
        }
    }

    pub fn eval(
        &mut self,
        node: &Node,
        env: &Rc<Env>,
        ctx: &Rc<CallContext>,
    ) -> Result<Flow, Error> {
        match &node.kind {
            NodeKind::Number(n) => Ok(Flow::Value(Value::Number(n.clone()))),
            NodeKind::Str(s) => Ok(Flow::Value(Value::Str(s.clone()))),
            NodeKind::List(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for elem in elems {
                    items.push(eval_value!(self, elem, env, ctx));
                }
                Ok(Flow::Value(Value::list(items)))
            }
            NodeKind::VarAccess(name) => match env.get(name) {
                Some(v) => Ok(Flow::Value(v)),
                None => Err(Error::runtime(
                    node.span.clone(),
                    format!("'{}' is not defined", name),
                    ctx,
                )),
            },
            NodeKind::VarAssign { name, value } => {
                let v = eval_value!(self, value, env, ctx);
                env.set(name.clone(), v.clone());
                Ok(Flow::Value(v))
            }
            NodeKind::Unary { op, operand } => {
                let v = eval_value!(self, operand, env, ctx);
                value::unary_op(*op, &v, &node.span, ctx).map(Flow::Value)
            }
            NodeKind::Binary { op, left, right } => {
                // Both operands evaluate, left first; AND/OR do not
                // short-circuit.
                let lhs = eval_value!(self, left, env, ctx);
                let rhs = eval_value!(self, right, env, ctx);
                value::binary_op(*op, &lhs, &rhs, &node.span, &right.span, ctx).map(Flow::Value)
            }
            NodeKind::If { cases, else_case } => {
                for case in cases {
                    let cond = eval_value!(self, &case.cond, env, ctx);
                    if cond.truthy() {
                        let v = eval_value!(self, &case.body, env, ctx);
                        let result = if case.suppressed { Value::Nil } else { v };
                        return Ok(Flow::Value(result));
                    }
                }
                if let Some(else_case) = else_case {
                    let v = eval_value!(self, &else_case.body, env, ctx);
                    let result = if else_case.suppressed { Value::Nil } else { v };
                    return Ok(Flow::Value(result));
                }
                Ok(Flow::Value(Value::Nil))
            }
            NodeKind::For {
                var,
                start,
                end,
                step,
                body,
                suppressed,
            } => {
                let start_n = self.eval_number(start, env, ctx, "'FOR' start value")?;
                let end_n = self.eval_number(end, env, ctx, "'FOR' end value")?;
                let step_n = match step {
                    Some(step) => self.eval_number(step, env, ctx, "'FOR' step value")?,
                    None => Number::Int(1),
                };
                let ascending = step_n.compare(&Number::Int(0))
                    != Some(std::cmp::Ordering::Less);
                let mut acc = Vec::new();
                let mut current = start_n;
                loop {
                    let keep_going = if ascending {
                        current.compare(&end_n) == Some(std::cmp::Ordering::Less)
                    } else {
                        current.compare(&end_n) == Some(std::cmp::Ordering::Greater)
                    };
                    if !keep_going {
                        break;
                    }
                    env.set(var.clone(), Value::Number(current.clone()));
                    current = current.add(&step_n);
                    match self.eval_loop_body(body, env, ctx, *suppressed, &mut acc)? {
                        LoopSignal::Next => {}
                        LoopSignal::Stop => break,
                        LoopSignal::Return(v) => return Ok(Flow::Return(v)),
                    }
                }
                Ok(Flow::Value(loop_result(*suppressed, acc)))
            }
            NodeKind::ForEach {
                var,
                iterable,
                body,
                suppressed,
            } => {
                let source = eval_value!(self, iterable, env, ctx);
                // Iterate over a snapshot so a body that mutates the list
                // cannot invalidate the walk.
                let items: Vec<Value> = match &source {
                    Value::List(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                    _ => {
                        return Err(Error::runtime(
                            iterable.span.clone(),
                            format!("cannot iterate over a {}", source.type_name()),
                            ctx,
                        ));
                    }
                };
                let mut acc = Vec::new();
                for item in items {
                    env.set(var.clone(), item);
                    match self.eval_loop_body(body, env, ctx, *suppressed, &mut acc)? {
                        LoopSignal::Next => {}
                        LoopSignal::Stop => break,
                        LoopSignal::Return(v) => return Ok(Flow::Return(v)),
                    }
                }
                Ok(Flow::Value(loop_result(*suppressed, acc)))
            }
            NodeKind::While {
                cond,
                body,
                suppressed,
            } => self.eval_conditional_loop(cond, body, *suppressed, false, env, ctx),
            NodeKind::Until {
                cond,
                body,
                suppressed,
            } => self.eval_conditional_loop(cond, body, *suppressed, true, env, ctx),
            NodeKind::FunDef {
                name,
                params,
                body,
                expr_body,
            } => {
                let func = Value::Function(Rc::new(FuncData {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    // Captured now, at definition time: this is the
                    // closure environment.
                    env: env.clone(),
                    expr_body: *expr_body,
                }));
                if let Some(name) = name {
                    env.set(name.clone(), func.clone());
                }
                Ok(Flow::Value(func))
            }
            NodeKind::Call { callee, args } => {
                let callee_v = eval_value!(self, callee, env, ctx);
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(eval_value!(self, arg, env, ctx));
                }
                let result = match callee_v {
                    Value::Function(func) => {
                        self.call_function(&func, arg_values, &node.span, ctx)?
                    }
                    Value::Native(native) => {
                        self.call_native(&native, arg_values, &node.span, ctx)?
                    }
                    other => {
                        return Err(Error::runtime(
                            callee.span.clone(),
                            format!("illegal operation: a {} is not callable", other.type_name()),
                            ctx,
                        ));
                    }
                };
                Ok(Flow::Value(result))
            }
            NodeKind::Statements(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match self.eval(item, env, ctx)? {
                        Flow::Value(v) => values.push(v),
                        signal => return Ok(signal),
                    }
                }
                Ok(Flow::Value(Value::list(values)))
            }
            NodeKind::Return(value) => {
                let v = match value {
                    Some(value) => eval_value!(self, value, env, ctx),
                    None => Value::Nil,
                };
                Ok(Flow::Return(v))
            }
            NodeKind::Continue => Ok(Flow::Continue),
            NodeKind::Break => Ok(Flow::Break),
        }
    }

    /// User function call: fresh environment parented to the *closure*
    /// environment, fresh call context parented to the caller's.
    pub(crate) fn call_function(
        &mut self,
        func: &FuncData,
        args: Vec<Value>,
        call_span: &crate::position::Span,
        ctx: &Rc<CallContext>,
    ) -> Result<Value, Error> {
        check_arity(func.display_name(), func.params.len(), args.len(), call_span, ctx)?;
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Error::runtime(
                call_span.clone(),
                format!(
                    "maximum call depth exceeded in call to '{}'",
                    func.display_name()
                ),
                ctx,
            ));
        }
        let call_env = Env::with_parent(&func.env);
        for (param, arg) in func.params.iter().zip(args) {
            call_env.set(param.clone(), arg);
        }
        let call_ctx = CallContext::child(ctx, func.display_name(), call_span.clone());
        trace_log!("call", "{} (depth {})", func.display_name(), self.depth);
        self.depth += 1;
        let result = self.eval(&func.body, &call_env, &call_ctx);
        self.depth -= 1;
        Ok(match result? {
            // `-> expr` bodies return their value implicitly; block bodies
            // only return what an explicit RETURN produced.
            Flow::Value(v) if func.expr_body => v,
            Flow::Return(v) => v,
            Flow::Value(_) | Flow::Continue | Flow::Break => Value::Nil,
        })
    }

    fn call_native(
        &mut self,
        native: &NativeFn,
        args: Vec<Value>,
        call_span: &crate::position::Span,
        ctx: &Rc<CallContext>,
    ) -> Result<Value, Error> {
        check_arity(native.name, native.params.len(), args.len(), call_span, ctx)?;
        let call_ctx = CallContext::child(ctx, native.name, call_span.clone());
        trace_log!("call", "builtin {}", native.name);
        (native.func)(self, args, call_span, &call_ctx)
    }

    fn eval_conditional_loop(
        &mut self,
        cond: &Node,
        body: &Node,
        suppressed: bool,
        invert: bool,
        env: &Rc<Env>,
        ctx: &Rc<CallContext>,
    ) -> Result<Flow, Error> {
        let mut acc = Vec::new();
        loop {
            let test = eval_value!(self, cond, env, ctx);
            if test.truthy() == invert {
                break;
            }
            match self.eval_loop_body(body, env, ctx, suppressed, &mut acc)? {
                LoopSignal::Next => {}
                LoopSignal::Stop => break,
                LoopSignal::Return(v) => return Ok(Flow::Return(v)),
            }
        }
        Ok(Flow::Value(loop_result(suppressed, acc)))
    }

    /// One loop iteration. BREAK and CONTINUE are consumed here; RETURN
    /// and errors keep travelling.
    fn eval_loop_body(
        &mut self,
        body: &Node,
        env: &Rc<Env>,
        ctx: &Rc<CallContext>,
        suppressed: bool,
        acc: &mut Vec<Value>,
    ) -> Result<LoopSignal, Error> {
        match self.eval(body, env, ctx)? {
            Flow::Value(v) => {
                if !suppressed {
                    acc.push(v);
                }
                Ok(LoopSignal::Next)
            }
            Flow::Continue => Ok(LoopSignal::Next),
            Flow::Break => Ok(LoopSignal::Stop),
            Flow::Return(v) => Ok(LoopSignal::Return(v)),
        }
    }

    fn eval_number(
        &mut self,
        node: &Node,
        env: &Rc<Env>,
        ctx: &Rc<CallContext>,
        what: &str,
    ) -> Result<Number, Error> {
        match self.eval(node, env, ctx)? {
            Flow::Value(Value::Number(n)) => Ok(n),
            Flow::Value(other) => Err(Error::runtime(
                node.span.clone(),
                format!("{} must be a number, got a {}", what, other.type_name()),
                ctx,
            )),
            // A control signal in a loop header has nowhere sensible to
            // go; treat it as a missing value.
            _ => Err(Error::runtime(
                node.span.clone(),
                format!("{} did not produce a value", what),
                ctx,
            )),
        }
    }
}

fn loop_result(suppressed: bool, acc: Vec<Value>) -> Value {
    if suppressed {
        Value::Nil
    } else {
        Value::list(acc)
    }
}

fn check_arity(
    name: &str,
    expected: usize,
    got: usize,
    span: &crate::position::Span,
    ctx: &Rc<CallContext>,
) -> Result<(), Error> {
    if got > expected {
        return Err(Error::runtime(
            span.clone(),
            format!("{} too many args passed into '{}'", got - expected, name),
            ctx,
        ));
    }
    if got < expected {
        return Err(Error::runtime(
            span.clone(),
            format!("{} too few args passed into '{}'", expected - got, name),
            ctx,
        ));
    }
    Ok(())
}
