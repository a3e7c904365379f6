use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};

use akane::Interpreter;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--repl] [--dump-ast] [--dump-tokens] [-e <code>] [file]",
        program
    );
    std::process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut dump_ast = false;
    let mut dump_tokens = false;
    let mut repl_flag = false;
    let mut filtered_args: Vec<String> = Vec::new();
    for arg in &args[1..] {
        if arg == "--dump-ast" {
            dump_ast = true;
        } else if arg == "--dump-tokens" {
            dump_tokens = true;
        } else if arg == "--repl" {
            repl_flag = true;
        } else if arg.starts_with("--") {
            usage(&args[0]);
        } else {
            filtered_args.push(arg.clone());
        }
    }

    if repl_flag || (filtered_args.is_empty() && io::stdin().is_terminal()) {
        akane::repl::run_repl();
        return;
    }

    let (input, program_name) = if !filtered_args.is_empty() && filtered_args[0] == "-e" {
        if filtered_args.len() < 2 {
            eprintln!("Usage: {} -e <code>", args[0]);
            std::process::exit(1);
        }
        (filtered_args[1].clone(), "-e".to_string())
    } else if !filtered_args.is_empty() {
        let content = fs::read_to_string(&filtered_args[0]).unwrap_or_else(|err| {
            eprintln!("Failed to read {}: {}", filtered_args[0], err);
            std::process::exit(1);
        });
        (content, filtered_args[0].clone())
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).unwrap_or_else(|err| {
            eprintln!("Failed to read stdin: {}", err);
            std::process::exit(1);
        });
        (buf, "<stdin>".to_string())
    };

    if dump_tokens {
        match akane::dump_tokens(&program_name, &input) {
            Ok(text) => print!("{}", text),
            Err(err) => {
                eprint!("{}", err.render());
                std::process::exit(1);
            }
        }
        return;
    }

    if dump_ast {
        match akane::dump_ast(&program_name, &input) {
            Ok(text) => print!("{}", text),
            Err(err) => {
                eprint!("{}", err.render());
                std::process::exit(1);
            }
        }
        return;
    }

    let mut interpreter = Interpreter::new();
    interpreter.set_immediate_stdout(true);
    if let Err(err) = interpreter.run(&program_name, &input) {
        eprint!("{}", err.render());
        std::process::exit(1);
    }
}
