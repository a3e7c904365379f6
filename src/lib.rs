//! akane is a tiny dynamically-typed scripting language with a
//! tree-walking interpreter.
//!
//! The pipeline is the classic three stages: [`lexer::Lexer`] turns source
//! text into position-tagged tokens, [`parser::Parser`] builds the
//! [`ast::Node`] tree by recursive descent, and [`interp::Interpreter`]
//! walks the tree. Every token and node carries a [`position::Span`] back
//! into the original source, which is what lets a runtime error five calls
//! deep print the offending line with a caret underline and a traceback.
//!
//! ```
//! use akane::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! let value = interp.run("<demo>", "FUN square(n) -> n * n\nsquare(7)").unwrap();
//! assert_eq!(value.repr_string(), "[<function square>, 49]");
//! ```

pub mod ast;
pub mod builtins;
mod context;
pub mod env;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod repl;
pub mod token;
mod trace;
pub mod value;

pub use builtins::standard_env;
pub use error::{Error, ErrorKind};
pub use interp::{Flow, Interpreter};
pub use value::Value;

use lexer::Lexer;
use parser::Parser;
use position::Source;

/// One-shot convenience: run `source` against a fresh interpreter with the
/// standard globals. `name` labels the source in diagnostics.
pub fn run_source(name: &str, source: &str) -> Result<Value, Error> {
    Interpreter::new().run(name, source)
}

/// Lex `source` and render the token stream, one token per line.
pub fn dump_tokens(name: &str, source: &str) -> Result<String, Error> {
    let tokens = Lexer::new(Source::new(name, source)).tokenize()?;
    let mut out = String::new();
    for tok in tokens {
        out.push_str(&format!("{:?} {:?}\n", tok.span, tok.kind));
    }
    Ok(out)
}

/// Parse `source` and render the syntax tree.
pub fn dump_ast(name: &str, source: &str) -> Result<String, Error> {
    let tokens = Lexer::new(Source::new(name, source)).tokenize()?;
    let ast = Parser::new(tokens).parse()?;
    Ok(format!("{:#?}\n", ast))
}
