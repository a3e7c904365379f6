use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::Interpreter;
use crate::error::ErrorKind;
use crate::value::Value;

/// Check if the input has unbalanced brackets or an open string,
/// suggesting more input is needed. Brackets inside strings and `#`
/// comments do not count.
fn is_incomplete(input: &str) -> bool {
    let mut depth_paren = 0i32;
    let mut depth_bracket = 0i32;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;

    for ch in input.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '#' => in_comment = true,
            '"' => in_string = true,
            '(' => depth_paren += 1,
            ')' => depth_paren -= 1,
            '[' => depth_bracket += 1,
            ']' => depth_bracket -= 1,
            _ => {}
        }
    }

    in_string || depth_paren > 0 || depth_bracket > 0
}

/// Result of processing a single REPL line.
enum LineResult {
    /// Need more input (unfinished construct).
    Continue,
    /// Line was processed (output may have been produced).
    Done,
}

/// A single evaluation produces the program's statement-value list; unwrap
/// the common one-statement case so `1 + 2` echoes `3`, not `[3]`.
fn display_value(value: &Value) -> Option<String> {
    let shown = match value {
        Value::List(items) => {
            let items = items.borrow();
            match items.len() {
                0 => return None,
                1 => items[0].clone(),
                _ => value.clone(),
            }
        }
        other => other.clone(),
    };
    if matches!(shown, Value::Nil) {
        None
    } else {
        Some(format!("{}\n", shown.repr_string()))
    }
}

/// Process a single line of REPL input. Returns the display string (if any)
/// and whether more input is needed.
///
/// This function is the testable core of the REPL loop: it has no I/O
/// dependencies beyond the `Interpreter`.
fn process_line(
    interpreter: &mut Interpreter,
    accumulated: &mut String,
    line: &str,
) -> (LineResult, Option<String>) {
    if accumulated.is_empty() {
        *accumulated = line.to_string();
    } else {
        accumulated.push('\n');
        accumulated.push_str(line);
    }

    if is_incomplete(accumulated) {
        return (LineResult::Continue, None);
    }

    // Skip empty or whitespace-only input
    if accumulated.trim().is_empty() {
        accumulated.clear();
        return (LineResult::Done, None);
    }

    interpreter.clear_output();
    let display = match interpreter.run("<stdin>", accumulated) {
        Ok(value) => {
            let mut text = interpreter.output().to_string();
            interpreter.clear_output();
            if let Some(echo) = display_value(&value) {
                text.push_str(&echo);
            }
            if text.is_empty() { None } else { Some(text) }
        }
        Err(err) => {
            // A syntax error at the very end of the input means the
            // construct is unfinished (an open IF, FUN, ...), not wrong.
            if err.kind == ErrorKind::Syntax && err.at_end_of_input() {
                return (LineResult::Continue, None);
            }
            let mut text = interpreter.output().to_string();
            interpreter.clear_output();
            text.push_str(&err.render());
            Some(text)
        }
    };

    accumulated.clear();
    (LineResult::Done, display)
}

pub fn run_repl() {
    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Failed to initialize line editor: {}", err);
            std::process::exit(1);
        }
    };

    let history_path = history_path();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    let mut interpreter = Interpreter::new();
    let mut accumulated = String::new();

    loop {
        let prompt = if accumulated.is_empty() { "> " } else { "* " };

        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                let (result, display) = process_line(&mut interpreter, &mut accumulated, &line);
                if let Some(text) = display {
                    print!("{}", text);
                }
                if matches!(result, LineResult::Continue) {
                    continue;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C: cancel current input
                accumulated.clear();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D: exit
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
}

fn history_path() -> Option<std::path::PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let dir = std::path::PathBuf::from(home).join(".akane");
    let _ = std::fs::create_dir_all(&dir);
    Some(dir.join("history"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: feed lines into the REPL core and collect all display output.
    fn repl_session(lines: &[&str]) -> Vec<String> {
        let mut interpreter = Interpreter::new();
        let mut accumulated = String::new();
        let mut outputs = Vec::new();

        for line in lines {
            let (_result, display) = process_line(&mut interpreter, &mut accumulated, line);
            if let Some(text) = display {
                outputs.push(text);
            }
        }
        outputs
    }

    #[test]
    fn test_expression_echoes_value() {
        let out = repl_session(&["1 + 2"]);
        assert_eq!(out, vec!["3\n"]);
    }

    #[test]
    fn test_print_shows_once() {
        let out = repl_session(&["print(\"hello\")", "3"]);
        assert_eq!(out, vec!["hello\n", "3\n"]);
    }

    #[test]
    fn test_strings_echo_quoted() {
        let out = repl_session(&["\"hi\""]);
        assert_eq!(out, vec!["\"hi\"\n"]);
    }

    #[test]
    fn test_variable_persists_across_lines() {
        let out = repl_session(&["VAR x = 42", "x + 1"]);
        assert_eq!(out, vec!["42\n", "43\n"]);
    }

    #[test]
    fn test_whitespace_only_line_ignored() {
        let out = repl_session(&["   ", "  \t  "]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_open_block_continues() {
        let out = repl_session(&["FUN f(n)", "RETURN n * 2", "END", "f(21)"]);
        // The definition itself is an expression and echoes too.
        assert_eq!(out, vec!["<function f>\n", "42\n"]);
    }

    #[test]
    fn test_open_bracket_continues() {
        let out = repl_session(&["[1,", "2]"]);
        assert_eq!(out, vec!["[1, 2]\n"]);
    }

    #[test]
    fn test_brackets_in_comments_do_not_continue() {
        let out = repl_session(&["print(1) # [", "2"]);
        assert_eq!(out, vec!["1\n", "2\n"]);
    }

    #[test]
    fn test_brackets_in_strings_do_not_continue() {
        let out = repl_session(&["\"a [ b # (\""]);
        assert_eq!(out, vec!["\"a [ b # (\"\n"]);
    }

    #[test]
    fn test_error_renders_and_resets() {
        let out = repl_session(&["nope", "1"]);
        assert_eq!(out.len(), 2);
        assert!(out[0].contains("'nope' is not defined"));
        assert_eq!(out[1], "1\n");
    }
}
