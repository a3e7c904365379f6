use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::ast::{BinOp, Node, UnaryOp};
use crate::context::CallContext;
use crate::env::Env;
use crate::error::Error;
use crate::interp::Interpreter;
use crate::position::Span;

/// A script number. The integer/float distinction is erased at the value
/// level: everything is a "number", arithmetic picks the representation.
/// Integer arithmetic that overflows `i64` is promoted to `BigInt`;
/// division always produces a float.
#[derive(Debug, Clone)]
pub enum Number {
    Int(i64),
    Big(BigInt),
    Float(f64),
}

impl Number {
    pub(crate) fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Big(b) => b.to_f64().unwrap_or(f64::NAN),
            Number::Float(f) => *f,
        }
    }

    /// Integral value if this number is exactly representable as `i64`.
    pub(crate) fn as_index(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Big(b) => b.to_i64(),
            Number::Float(_) => None,
        }
    }

    pub(crate) fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => *i == 0,
            Number::Big(b) => b.is_zero(),
            Number::Float(f) => *f == 0.0,
        }
    }

    fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    fn to_big(&self) -> BigInt {
        match self {
            Number::Int(i) => BigInt::from(*i),
            Number::Big(b) => b.clone(),
            Number::Float(f) => BigInt::from(*f as i64),
        }
    }

    /// Shrink a big result back to `i64` when it fits.
    fn from_big(b: BigInt) -> Number {
        match b.to_i64() {
            Some(i) => Number::Int(i),
            None => Number::Big(b),
        }
    }

    pub(crate) fn add(&self, other: &Number) -> Number {
        if self.is_float() || other.is_float() {
            return Number::Float(self.as_f64() + other.as_f64());
        }
        if let (Number::Int(a), Number::Int(b)) = (self, other)
            && let Some(n) = a.checked_add(*b)
        {
            return Number::Int(n);
        }
        Number::from_big(self.to_big() + other.to_big())
    }

    pub(crate) fn sub(&self, other: &Number) -> Number {
        if self.is_float() || other.is_float() {
            return Number::Float(self.as_f64() - other.as_f64());
        }
        if let (Number::Int(a), Number::Int(b)) = (self, other)
            && let Some(n) = a.checked_sub(*b)
        {
            return Number::Int(n);
        }
        Number::from_big(self.to_big() - other.to_big())
    }

    pub(crate) fn mul(&self, other: &Number) -> Number {
        if self.is_float() || other.is_float() {
            return Number::Float(self.as_f64() * other.as_f64());
        }
        if let (Number::Int(a), Number::Int(b)) = (self, other)
            && let Some(n) = a.checked_mul(*b)
        {
            return Number::Int(n);
        }
        Number::from_big(self.to_big() * other.to_big())
    }

    /// Always float. The caller has already rejected a zero divisor.
    pub(crate) fn div(&self, other: &Number) -> Number {
        Number::Float(self.as_f64() / other.as_f64())
    }

    /// Integer base with a non-negative integer exponent stays integral;
    /// anything else goes through floats.
    pub(crate) fn pow(&self, other: &Number) -> Number {
        if !self.is_float()
            && !other.is_float()
            && let Some(exp) = other.as_index()
            && exp >= 0
            && let Ok(exp) = u32::try_from(exp)
        {
            if let (Number::Int(base), true) = (self, exp < 64)
                && let Some(n) = base.checked_pow(exp)
            {
                return Number::Int(n);
            }
            return Number::from_big(self.to_big().pow(exp));
        }
        Number::Float(self.as_f64().powf(other.as_f64()))
    }

    pub(crate) fn compare(&self, other: &Number) -> Option<Ordering> {
        if self.is_float() || other.is_float() {
            self.as_f64().partial_cmp(&other.as_f64())
        } else {
            Some(self.to_big().cmp(&other.to_big()))
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Big(b) => write!(f, "{}", b),
            Number::Float(x) => {
                // Floats always show a fractional part, so 10 / 2 reads
                // "5.0" and not like an integer.
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
        }
    }
}

/// A user-defined function value: the parameter list, the shared body
/// node, and the environment captured at the definition site. The captured
/// environment is what makes scoping lexical.
#[derive(Debug)]
pub struct FuncData {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Node>,
    pub env: Rc<Env>,
    /// `-> expr` body: the body's value is the implicit return value.
    pub expr_body: bool,
}

impl FuncData {
    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

pub type NativeImpl =
    fn(&mut Interpreter, Vec<Value>, &Span, &Rc<CallContext>) -> Result<Value, Error>;

/// A host-implemented callable. Participates in arity checking exactly
/// like a user function, via its fixed parameter-name list.
#[derive(Clone, Copy)]
pub struct NativeFn {
    pub name: &'static str,
    pub params: &'static [&'static str],
    pub func: NativeImpl,
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

/// A runtime value. Lists are shared handles: every alias observes
/// in-place mutation through `append`/`pop`/`extend`.
#[derive(Debug, Clone)]
pub enum Value {
    Number(Number),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<FuncData>),
    Native(NativeFn),
    /// The null value: the result of suppressed block bodies, bare `print`,
    /// and constructs that produce nothing.
    Nil,
}

impl Value {
    pub(crate) fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub(crate) fn int(n: i64) -> Value {
        Value::Number(Number::Int(n))
    }

    pub(crate) fn bool(b: bool) -> Value {
        Value::int(if b { 1 } else { 0 })
    }

    pub(crate) fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => !n.is_zero(),
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) => true,
            Value::Nil => false,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Nil => "null",
        }
    }

    /// Plain rendering, used by `print` and string conversion.
    pub fn display_string(&self) -> String {
        self.render(false, &mut Vec::new())
    }

    /// Source-like rendering, used by the REPL: strings are quoted, lists
    /// bracketed.
    pub fn repr_string(&self) -> String {
        self.render(true, &mut Vec::new())
    }

    /// Shared renderer. Lists are shared handles, so a list can contain
    /// itself; `seen` holds the lists on the current path and a revisit
    /// prints `[...]` instead of recursing forever.
    fn render(&self, quoted: bool, seen: &mut Vec<*const RefCell<Vec<Value>>>) -> String {
        match self {
            Value::Number(n) => n.to_string(),
            Value::Str(s) if quoted => format!("\"{}\"", s),
            Value::Str(s) => s.clone(),
            Value::List(items) => {
                let ptr = Rc::as_ptr(items);
                if seen.contains(&ptr) {
                    return "[...]".to_string();
                }
                seen.push(ptr);
                let inner = items
                    .borrow()
                    .iter()
                    .map(|v| v.render(quoted, seen))
                    .collect::<Vec<_>>()
                    .join(", ");
                seen.pop();
                if quoted { format!("[{}]", inner) } else { inner }
            }
            Value::Function(f) => format!("<function {}>", f.display_name()),
            Value::Native(f) => format!("<built-in function {}>", f.name),
            Value::Nil => "null".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        eq_values(self, other, &mut Vec::new())
    }
}

/// Structural equality with the same self-reference guard as rendering:
/// a pair of lists already being compared further up the path is taken
/// as equal rather than descended into again.
fn eq_values(
    a: &Value,
    b: &Value,
    seen: &mut Vec<(*const RefCell<Vec<Value>>, *const RefCell<Vec<Value>>)>,
) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let pair = (Rc::as_ptr(x), Rc::as_ptr(y));
            if seen.contains(&pair) {
                return true;
            }
            seen.push(pair);
            let (xs, ys) = (x.borrow(), y.borrow());
            let equal = xs.len() == ys.len()
                && xs.iter().zip(ys.iter()).all(|(u, v)| eq_values(u, v, seen));
            seen.pop();
            equal
        }
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => std::ptr::fn_addr_eq(x.func, y.func),
        (Value::Nil, Value::Nil) => true,
        _ => false,
    }
}

/// Resolve a (possibly negative, Python-style) list index.
pub(crate) fn resolve_index(idx: i64, len: usize) -> Option<usize> {
    let adjusted = if idx < 0 { idx + len as i64 } else { idx };
    usize::try_from(adjusted).ok().filter(|i| *i < len)
}

pub(crate) fn index_error(idx: i64, len: usize, span: &Span, ctx: &Rc<CallContext>) -> Error {
    Error::runtime(
        span.clone(),
        format!("index {} out of bounds (list of length {})", idx, len),
        ctx,
    )
}

fn illegal_op(span: &Span, ctx: &Rc<CallContext>) -> Error {
    Error::runtime(span.clone(), "illegal operation", ctx)
}

/// Operator dispatch for `left <op> right`. `span` covers the whole
/// expression (used for "illegal operation"); `rhs_span` covers the right
/// operand (used for division-by-zero and index errors).
pub(crate) fn binary_op(
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
    span: &Span,
    rhs_span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match op {
            BinOp::Add => Ok(Value::Number(a.add(b))),
            BinOp::Sub => Ok(Value::Number(a.sub(b))),
            BinOp::Mul => Ok(Value::Number(a.mul(b))),
            BinOp::Div => {
                if b.is_zero() {
                    Err(Error::runtime(rhs_span.clone(), "division by zero", ctx))
                } else {
                    Ok(Value::Number(a.div(b)))
                }
            }
            BinOp::Pow => Ok(Value::Number(a.pow(b))),
            BinOp::Eq => Ok(Value::bool(a == b)),
            BinOp::Ne => Ok(Value::bool(a != b)),
            BinOp::Lt => Ok(Value::bool(a.compare(b) == Some(Ordering::Less))),
            BinOp::Gt => Ok(Value::bool(a.compare(b) == Some(Ordering::Greater))),
            BinOp::Le => Ok(Value::bool(matches!(
                a.compare(b),
                Some(Ordering::Less | Ordering::Equal)
            ))),
            BinOp::Ge => Ok(Value::bool(matches!(
                a.compare(b),
                Some(Ordering::Greater | Ordering::Equal)
            ))),
            BinOp::And => Ok(Value::bool(lhs.truthy() && rhs.truthy())),
            BinOp::Or => Ok(Value::bool(lhs.truthy() || rhs.truthy())),
        },
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        (Value::Str(s), Value::Number(n)) if op == BinOp::Mul => {
            let count = n.as_index().ok_or_else(|| illegal_op(span, ctx))?;
            Ok(Value::Str(s.repeat(count.max(0) as usize)))
        }
        (Value::List(items), _) if op == BinOp::Add => {
            // `list + x` yields a fresh list; only the builtins mutate.
            let mut next = items.borrow().clone();
            next.push(rhs.clone());
            Ok(Value::list(next))
        }
        (Value::List(items), Value::Number(n)) if op == BinOp::Sub => {
            let idx = n.as_index().ok_or_else(|| illegal_op(span, ctx))?;
            let mut next = items.borrow().clone();
            let at = resolve_index(idx, next.len())
                .ok_or_else(|| index_error(idx, next.len(), rhs_span, ctx))?;
            next.remove(at);
            Ok(Value::list(next))
        }
        (Value::List(a), Value::List(b)) if op == BinOp::Mul => {
            let mut next = a.borrow().clone();
            next.extend(b.borrow().iter().cloned());
            Ok(Value::list(next))
        }
        (Value::List(items), Value::Number(n)) if op == BinOp::Div => {
            let idx = n.as_index().ok_or_else(|| illegal_op(span, ctx))?;
            let items = items.borrow();
            let at = resolve_index(idx, items.len())
                .ok_or_else(|| index_error(idx, items.len(), rhs_span, ctx))?;
            Ok(items[at].clone())
        }
        _ => Err(illegal_op(span, ctx)),
    }
}

pub(crate) fn unary_op(
    op: UnaryOp,
    operand: &Value,
    span: &Span,
    ctx: &Rc<CallContext>,
) -> Result<Value, Error> {
    match (op, operand) {
        (UnaryOp::Plus, Value::Number(_)) => Ok(operand.clone()),
        // Unary minus is multiplication by -1, not a separate path.
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(n.mul(&Number::Int(-1)))),
        (UnaryOp::Not, _) => Ok(Value::bool(!operand.truthy())),
        _ => Err(illegal_op(span, ctx)),
    }
}
