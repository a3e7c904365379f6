use akane::{Interpreter, Value};

/// Run a program and return its value (the list of statement values).
fn run_ok(program: &str) -> Value {
    let mut interp = Interpreter::new();
    interp.run("<test>", program).expect("program runs")
}

/// Source-like rendering of the last statement's value.
fn last_repr(program: &str) -> String {
    match run_ok(program) {
        Value::List(items) => items
            .borrow()
            .last()
            .expect("at least one statement")
            .repr_string(),
        other => other.repr_string(),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(last_repr("2 + 3 * 4"), "14");
    assert_eq!(last_repr("(2 + 3) * 4"), "20");
}

#[test]
fn power_is_right_associative() {
    assert_eq!(last_repr("2 ^ 3 ^ 2"), "512");
}

#[test]
fn unary_minus_binds_below_power() {
    assert_eq!(last_repr("-2 ^ 2"), "-4");
}

#[test]
fn division_always_produces_a_float() {
    assert_eq!(last_repr("10 / 4"), "2.5");
    assert_eq!(last_repr("10 / 2"), "5.0");
}

#[test]
fn integer_overflow_promotes_instead_of_wrapping() {
    assert_eq!(
        last_repr("9223372036854775807 + 1"),
        "9223372036854775808"
    );
    assert_eq!(last_repr("2 ^ 100"), "1267650600228229401496703205376");
}

#[test]
fn comparisons_yield_zero_or_one() {
    assert_eq!(last_repr("1 < 2"), "1");
    assert_eq!(last_repr("1 > 2"), "0");
    assert_eq!(last_repr("1 == 1.0"), "1");
    assert_eq!(last_repr("NOT 0"), "1");
    assert_eq!(last_repr("1 AND 0"), "0");
    assert_eq!(last_repr("1 OR 0"), "1");
}

#[test]
fn string_operators() {
    assert_eq!(last_repr("\"ab\" + \"cd\""), "\"abcd\"");
    assert_eq!(last_repr("\"ab\" * 3"), "\"ababab\"");
}

#[test]
fn list_operators_copy_instead_of_mutating() {
    assert_eq!(last_repr("[1, 2] + 3"), "[1, 2, 3]");
    assert_eq!(last_repr("[1, 2, 3] - 0"), "[2, 3]");
    assert_eq!(last_repr("[1] * [2, 3]"), "[1, 2, 3]");
    assert_eq!(last_repr("[10, 20] / 1"), "20");
    assert_eq!(last_repr("[10, 20] / -1"), "20");
    // The operand list is untouched.
    assert_eq!(last_repr("VAR xs = [1, 2]\nVAR ys = xs + 3\nlen(xs)"), "2");
}

#[test]
fn variables_persist_and_reassign() {
    assert_eq!(last_repr("VAR x = 5\nVAR x = x + 1\nx"), "6");
    assert_eq!(last_repr("VAR x = 5\nx = 7\nx"), "7");
}

#[test]
fn program_value_is_the_statement_list() {
    let value = run_ok("1; 2; 3");
    assert_eq!(value.repr_string(), "[1, 2, 3]");
}

#[test]
fn arrow_function_returns_implicitly() {
    assert_eq!(last_repr("FUN square(n) -> n * n\nsquare(7)"), "49");
}

#[test]
fn closures_capture_the_defining_scope() {
    let program = "\
FUN adder(n)
RETURN FUN (m) -> m + n
END
VAR add5 = adder(5)
add5(3)
";
    assert_eq!(last_repr(program), "8");
}

#[test]
fn block_function_without_return_yields_null() {
    assert_eq!(last_repr("FUN f()\nVAR x = 1\nEND\nf()"), "null");
}

#[test]
fn return_exits_through_nested_loops() {
    let program = "\
FUN find(xs, want)
FOR x IN xs THEN
IF x == want THEN RETURN \"yes\"
END
RETURN \"no\"
END
find([1, 2, 3], 2)
";
    assert_eq!(last_repr(program), "\"yes\"");
}

#[test]
fn inline_for_collects_its_values() {
    // The end bound is exclusive.
    assert_eq!(last_repr("FOR i = 0 TO 3 THEN i"), "[0, 1, 2]");
    assert_eq!(last_repr("FOR i = 3 TO 0 STEP -1 THEN i"), "[3, 2, 1]");
}

#[test]
fn block_for_yields_null() {
    let program = "\
VAR r = FOR i = 0 TO 3 THEN
i
END
r
";
    assert_eq!(last_repr(program), "null");
}

#[test]
fn for_in_iterates_lists_and_strings() {
    assert_eq!(last_repr("FOR x IN [1, 2] THEN x * 10"), "[10, 20]");
    assert_eq!(
        last_repr("FOR c IN \"abc\" THEN c"),
        "[\"a\", \"b\", \"c\"]"
    );
}

#[test]
fn while_and_until_loops() {
    let sum = "\
VAR i = 0
VAR total = 0
WHILE i < 4 DO
VAR total = total + i
VAR i = i + 1
END
total
";
    assert_eq!(last_repr(sum), "6");

    let until = "\
VAR i = 0
UNTIL i >= 3 DO
VAR i = i + 1
END
i
";
    assert_eq!(last_repr(until), "3");
}

#[test]
fn break_and_continue() {
    let program = "\
VAR out = []
FOR i = 0 TO 10 THEN
IF i == 3 THEN CONTINUE
IF i == 5 THEN BREAK
append(out, i)
END
out
";
    assert_eq!(last_repr(program), "[0, 1, 2, 4]");
}

#[test]
fn if_elsif_else_chain() {
    assert_eq!(last_repr("IF 0 THEN 1 ELSIF 0 THEN 2 ELSE 3"), "3");
    assert_eq!(last_repr("IF 1 THEN 1 ELSIF 0 THEN 2 ELSE 3"), "1");
    // An IF with no matching arm is null.
    assert_eq!(last_repr("IF 0 THEN 1"), "null");
}

#[test]
fn block_if_suppresses_its_value() {
    let program = "\
VAR r = IF 1 THEN
42
END
r
";
    assert_eq!(last_repr(program), "null");
}

#[test]
fn second_dot_ends_a_number_literal() {
    // "12.3.4" lexes as 12.3, '.', 4; the stray dot is a syntax error,
    // not a lex error.
    let err = akane::run_source("<test>", "12.3.4").expect_err("stray dot");
    assert_eq!(err.kind, akane::ErrorKind::Syntax);
}

#[test]
fn dump_helpers_render_the_pipeline_stages() {
    let tokens = akane::dump_tokens("<test>", "1 + 2").expect("lexes");
    assert!(tokens.contains("Int(1)"));
    assert!(tokens.contains("Plus"));
    assert!(tokens.contains("Eof"));

    let ast = akane::dump_ast("<test>", "1 + 2").expect("parses");
    assert!(ast.contains("Binary"));
    assert!(ast.contains("Add"));
}
