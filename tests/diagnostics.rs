use akane::{Error, ErrorKind, Interpreter};

fn run_err(program: &str) -> Error {
    Interpreter::new()
        .run("<test>", program)
        .expect_err("program should fail")
}

#[test]
fn division_by_zero_points_at_the_divisor() {
    let err = run_err("5 / 0");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.details, "division by zero");
    assert_eq!(err.span.start.line, 0);
    assert_eq!(err.span.start.column, 4);

    let rendered = err.render();
    assert!(
        rendered.starts_with("Runtime Error: division by zero\nFile <test>, line 1\n\n5 / 0\n    ^\n"),
        "unexpected rendering:\n{}",
        rendered
    );
    assert!(rendered.contains("File <test>, line 1, in <program>"));
}

#[test]
fn undefined_variable() {
    let err = run_err("VAR a = 1\na + b");
    assert_eq!(err.details, "'b' is not defined");
    assert_eq!(err.span.start.line, 1);
    assert_eq!(err.span.start.column, 4);
}

#[test]
fn illegal_operation_covers_the_whole_expression() {
    let err = run_err("1 + \"a\"");
    assert_eq!(err.details, "illegal operation");
    assert_eq!(err.span.start.column, 0);
    assert_eq!(err.span.end.column, 7);
}

#[test]
fn arity_mismatch_messages() {
    let program = "FUN f(a, b) -> a\n";
    let err = run_err(&format!("{}f(1, 2, 3)", program));
    assert_eq!(err.details, "1 too many args passed into 'f'");
    let err = run_err(&format!("{}f(1)", program));
    assert_eq!(err.details, "1 too few args passed into 'f'");
}

#[test]
fn traceback_lists_frames_innermost_first() {
    let program = "\
FUN inner()
RETURN 1 / 0
END
FUN outer()
RETURN inner()
END
outer()
";
    let err = run_err(program);
    assert_eq!(err.details, "division by zero");

    let names: Vec<&str> = err.trace.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["inner", "outer", "<program>"]);
    // Innermost frame carries the error position, outer frames their
    // call sites.
    let lines: Vec<usize> = err.trace.iter().map(|f| f.span.start.line + 1).collect();
    assert_eq!(lines, [2, 5, 7]);

    let rendered = err.render();
    assert!(rendered.contains("File <test>, line 2, in inner"));
    assert!(rendered.contains("File <test>, line 5, in outer"));
    assert!(rendered.contains("File <test>, line 7, in <program>"));
}

#[test]
fn calling_a_non_function_is_an_error() {
    let err = run_err("VAR x = 3\nx(1)");
    assert_eq!(err.details, "illegal operation: a number is not callable");
}

#[test]
fn runaway_recursion_is_reported_not_fatal() {
    let err = run_err("FUN spin() -> spin()\nspin()");
    assert_eq!(err.details, "maximum call depth exceeded in call to 'spin'");
}

#[test]
fn out_of_bounds_pop_leaves_the_list_unmodified() {
    let mut interp = Interpreter::new();
    interp.run("<test>", "VAR xs = [1, 2]").expect("setup");
    let err = interp.run("<test>", "pop(xs, 5)").expect_err("oob");
    assert_eq!(err.details, "index 5 out of bounds (list of length 2)");
    let value = interp.run("<test>", "len(xs)").expect("len");
    assert_eq!(value.repr_string(), "[2]");
}

#[test]
fn lexer_error_kinds() {
    let err = run_err("1 @ 2");
    assert_eq!(err.kind, ErrorKind::IllegalChar);
    assert_eq!(err.details, "'@'");

    let err = run_err("\"abc");
    assert_eq!(err.kind, ErrorKind::UnterminatedString);

    let err = run_err("1 ! 2");
    assert_eq!(err.kind, ErrorKind::ExpectedChar);
}

#[test]
fn trailing_tokens_are_invalid_syntax() {
    let err = run_err("1 2");
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.details, "token cannot appear after previous tokens");
    let rendered = err.render();
    assert!(rendered.starts_with("Invalid Syntax: token cannot appear after previous tokens\n"));
}

#[test]
fn caret_block_underlines_the_span() {
    let err = run_err("VAR nums = [1, 2, 3]\nnums + missing");
    assert_eq!(err.details, "'missing' is not defined");
    let rendered = err.render();
    assert!(
        rendered.contains("nums + missing\n       ^^^^^^^\n"),
        "unexpected rendering:\n{}",
        rendered
    );
}
