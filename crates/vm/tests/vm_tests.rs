//! Integration tests for the phpi VM: source text in, echo output and
//! runtime errors out.

use phpi_common::{Function, Instruction, NativeError, Opcode, Operand, Program, Variant};
use phpi_vm::{register_builtins, run, run_with_config, RuntimeError, Vm, VmConfig};
use proptest::prelude::*;

// ============================================================
// Helper functions
// ============================================================

fn build(src: &str) -> Program {
    let stmts = phpi_frontend::parse(src).unwrap();
    let mut program = phpi_compiler::compile(&stmts).unwrap();
    register_builtins(&mut program.functions);
    program
}

/// Runs `src` and returns everything it echoed.
fn output(src: &str) -> String {
    let program = build(src);
    let mut out = Vec::new();
    if let Err(e) = run(&program, &mut out) {
        panic!("{src:?} failed: {e}");
    }
    String::from_utf8(out).unwrap()
}

/// Runs `src`, expecting a fatal error. Returns it with the output
/// produced before it.
fn failure(src: &str) -> (RuntimeError, String) {
    failure_with(src, VmConfig::default())
}

fn failure_with(src: &str, config: VmConfig) -> (RuntimeError, String) {
    let program = build(src);
    let mut out = Vec::new();
    let err = run_with_config(&program, &mut out, config).unwrap_err();
    (err, String::from_utf8(out).unwrap())
}

// ============================================================
// Output and literals
// ============================================================

#[test]
fn html_passthrough() {
    assert_eq!(output("Hello <?php echo 1; ?> world"), "Hello 1 world");
}

#[test]
fn close_tag_swallows_one_newline() {
    assert_eq!(output("<?php echo 1; ?>\nA\n"), "1A\n");
}

#[test]
fn echo_list() {
    assert_eq!(output(r#"<?php echo "a", 1, "b";"#), "a1b");
}

#[test]
fn stringification() {
    assert_eq!(output("<?php echo true;"), "1");
    assert_eq!(output("<?php echo false;"), "");
    assert_eq!(output("<?php echo null;"), "<null>");
    assert_eq!(output("<?php echo $nope;"), "<UNDEFINED>");
}

#[test]
fn main_result_is_returned() {
    let program = build("<?php return 5;");
    assert_eq!(run(&program, Vec::new()), Ok(Variant::Long(5)));

    let program = build("<?php echo 1;");
    assert_eq!(run(&program, Vec::new()), Ok(Variant::Null));
}

// ============================================================
// Arithmetic
// ============================================================

#[test]
fn arithmetic_precedence() {
    assert_eq!(output("<?php echo 2 + 3 * 4;"), "14");
    assert_eq!(output("<?php echo (2 + 3) * 4;"), "20");
    assert_eq!(output("<?php echo 7 / 2, \" \", 7 % 3, \" \", -7 / 2;"), "3 1 -3");
}

#[test]
fn arithmetic_wraps() {
    assert_eq!(
        output("<?php echo 9223372036854775807 + 1;"),
        "-9223372036854775808"
    );
}

#[test]
fn strings_coerce_to_integers() {
    assert_eq!(output(r#"<?php echo "12abc" + 1;"#), "13");
    assert_eq!(output(r#"<?php echo "abc" * 5;"#), "0");
    assert_eq!(output(r#"<?php echo " -4" - 1;"#), "-5");
}

#[test]
fn division_by_zero_is_fatal() {
    let (err, out) = failure("<?php echo 1;\necho 1 / 0;\necho 2;");
    assert_eq!(err, RuntimeError::DivisionByZero { line: 2 });
    assert_eq!(out, "1");

    let (err, _) = failure("<?php echo 5 % 0;");
    assert_eq!(err, RuntimeError::DivisionByZero { line: 1 });
}

#[test]
fn shifts() {
    assert_eq!(output("<?php echo 1 << 3;"), "8");
    assert_eq!(output("<?php echo -16 >> 2;"), "-4");
    assert_eq!(output("<?php echo 1 << 64;"), "0");
    assert_eq!(output("<?php echo -8 >> 70;"), "-1");
    assert_eq!(output("<?php echo 8 >> 70;"), "0");
}

#[test]
fn negative_shift_is_fatal() {
    let (err, _) = failure("<?php echo 1 << -1;");
    assert_eq!(err, RuntimeError::NegativeShift { line: 1, count: -1 });
}

// ============================================================
// Comparison and logic
// ============================================================

#[test]
fn loose_equality() {
    assert_eq!(output(r#"<?php echo "0" == false;"#), "1");
    assert_eq!(output(r#"<?php echo "abc" == 0;"#), "1");
    assert_eq!(output(r#"<?php echo "1" == 1;"#), "1");
    assert_eq!(output(r#"<?php echo null == "";"#), "1");
    assert_eq!(output(r#"<?php echo null == 0;"#), "1");
    assert_eq!(output(r#"<?php echo "abc" == "ABC";"#), "");
    assert_eq!(output(r#"<?php echo "abc" != "ABC";"#), "1");
}

#[test]
fn relational_coerces_to_integer() {
    assert_eq!(output(r#"<?php echo "10" > 9;"#), "1");
    assert_eq!(output("<?php echo 3 <= 3, 3 < 3;"), "1");
}

#[test]
fn logic_does_not_short_circuit() {
    let src = r#"<?php
function side() { echo "s"; return true; }
if (false && side()) { echo "x"; }
if (true || side()) { echo "y"; }
"#;
    assert_eq!(output(src), "ssy");
}

#[test]
fn not_operator() {
    assert_eq!(output(r#"<?php echo !"";"#), "1");
    assert_eq!(output("<?php echo !1;"), "");
}

// ============================================================
// Variables, constants and casts
// ============================================================

#[test]
fn assignment_as_value() {
    assert_eq!(output("<?php echo $a = 4; echo $a;"), "44");
    assert_eq!(output("<?php $a = $b = 2; echo $a + $b;"), "4");
}

#[test]
fn increment_and_decrement() {
    assert_eq!(output("<?php $i = 5; echo $i++; echo $i; echo ++$i;"), "567");
    assert_eq!(output("<?php $i = 5; echo $i--; echo --$i;"), "53");
    assert_eq!(output("<?php $s = \"7\"; $s++; echo $s;"), "8");
}

#[test]
fn self_assignment_keeps_value() {
    assert_eq!(output("<?php $a = 5; $a = $a; echo $a;"), "5");
}

#[test]
fn constants() {
    assert_eq!(output("<?php const GREETING = \"hi\"; echo GREETING;"), "hi");
}

#[test]
fn constant_redeclaration_is_fatal() {
    let (err, _) = failure("<?php const A = 1;\nconst A = 1;");
    assert_eq!(
        err,
        RuntimeError::ConstRedeclaration {
            line: 2,
            name: "A".to_string()
        }
    );
}

#[test]
fn constant_reassignment_is_fatal() {
    let (err, _) = failure("<?php const A = 1;\n$A = 2;");
    assert_eq!(
        err,
        RuntimeError::ConstReassignment {
            line: 2,
            name: "A".to_string()
        }
    );
}

#[test]
fn casts() {
    assert_eq!(output(r#"<?php echo (int)"12abc" + 1;"#), "13");
    assert_eq!(output(r#"<?php echo (bool)"0";"#), "");
    assert_eq!(output(r#"<?php echo (string)5 . "x";"#), "5x");
    assert_eq!(output(r#"<?php echo +"42";"#), "42");
}

#[test]
fn concat_stringifies_both_sides() {
    assert_eq!(output(r#"<?php echo "a" . 1 . true . null;"#), "a11<null>");
}

// ============================================================
// Control flow
// ============================================================

#[test]
fn if_else() {
    let src = "<?php $x = 3; if ($x > 2) { echo \"big\"; } else { echo \"small\"; }";
    assert_eq!(output(src), "big");
    let src = "<?php $x = 1; if ($x > 2) echo \"big\"; else echo \"small\";";
    assert_eq!(output(src), "small");
}

#[test]
fn while_loop() {
    assert_eq!(
        output("<?php $i = 0; while ($i < 3) { echo $i; $i++; }"),
        "012"
    );
}

#[test]
fn for_loop() {
    assert_eq!(
        output("<?php for ($i = 0; $i < 5; $i = $i + 2) echo $i;"),
        "024"
    );
}

#[test]
fn for_without_condition_exits_through_return() {
    let src = "<?php function f() { for ($i = 0;; $i++) { if ($i == 3) return $i; } }\necho f();";
    assert_eq!(output(src), "3");
}

// ============================================================
// Functions
// ============================================================

#[test]
fn call_user_function() {
    let src = "<?php function add($x, $y) { return $x + $y; } echo add(2, 3);";
    assert_eq!(output(src), "5");
}

#[test]
fn wrong_arity_is_fatal_and_silent() {
    let src = "<?php function add($x, $y) { return $x + $y; } echo add(1);";
    let (err, out) = failure(src);
    assert_eq!(
        err,
        RuntimeError::ArityMismatch {
            line: 1,
            function: "add".to_string(),
            expected: 2,
            given: 1
        }
    );
    assert_eq!(out, "");
}

#[test]
fn recursion() {
    let src = "<?php
function fact($n) {
    if ($n <= 1) return 1;
    return $n * fact($n - 1);
}
echo fact(10);";
    assert_eq!(output(src), "3628800");
}

#[test]
fn functions_are_hoisted() {
    assert_eq!(output("<?php echo f(); function f() { return 7; }"), "7");
}

#[test]
fn function_without_return_yields_null() {
    assert_eq!(
        output("<?php function f() { echo \"in\"; } echo gettype(f());"),
        "inNULL"
    );
}

#[test]
fn functions_do_not_see_caller_scope() {
    let src = "<?php $x = 1; function f() { return $x; } echo f();";
    assert_eq!(output(src), "<UNDEFINED>");
}

#[test]
fn arguments_are_copied() {
    let src = "<?php function bump($v) { $v++; return $v; } $a = 1; echo bump($a), $a;";
    assert_eq!(output(src), "21");
}

#[test]
fn undefined_function_is_fatal() {
    let (err, _) = failure("<?php\n\nfoo(1);");
    assert_eq!(
        err,
        RuntimeError::UndefinedFunction {
            line: 3,
            name: "foo".to_string()
        }
    );
}

#[test]
fn call_depth_is_bounded() {
    let src = "<?php function f($n) { return f($n + 1); } f(0);";
    let (err, _) = failure_with(src, VmConfig { max_call_depth: 50 });
    assert_eq!(err, RuntimeError::CallDepthExceeded { line: 1, limit: 50 });
}

#[test]
fn deep_recursion_within_limit() {
    let src = "<?php function down($n) { if ($n == 0) return 0; return down($n - 1); } echo down(5000);";
    assert_eq!(output(src), "0");
}

// ============================================================
// Builtins
// ============================================================

#[test]
fn builtin_functions() {
    assert_eq!(
        output(r#"<?php echo gettype(1), gettype("a"), gettype(true), gettype(null);"#),
        "integerstringbooleanNULL"
    );
    assert_eq!(output(r#"<?php echo strlen("hello");"#), "5");
    assert_eq!(output(r#"<?php echo intval("42 apples") + 1;"#), "43");
    assert_eq!(output(r#"<?php echo strval(false) . "|";"#), "|");
}

#[test]
fn builtin_errors_are_fatal() {
    let (err, _) = failure("<?php strlen();");
    assert_eq!(
        err,
        RuntimeError::Native {
            line: 1,
            name: "strlen".to_string(),
            source: NativeError::Arity {
                expected: 1,
                given: 0
            }
        }
    );
}

#[test]
fn user_function_shadows_builtin() {
    let src = r#"<?php function strlen($s) { return 99; } echo strlen("a");"#;
    assert_eq!(output(src), "99");
}

// ============================================================
// Hand-assembled bytecode
// ============================================================

fn assembled(instrs: &[Instruction]) -> Program {
    let mut program = Program::new();
    for &instr in instrs {
        program.main.emit(instr, 1);
    }
    program
}

#[test]
fn calling_a_non_callable_is_fatal() {
    let program = assembled(&[
        Instruction::new(Opcode::Long, Operand::Long(3)),
        Instruction::new(Opcode::Call, Operand::Argc(0)),
    ]);
    assert_eq!(
        run(&program, Vec::new()),
        Err(RuntimeError::NotCallable {
            line: 1,
            found: "integer"
        })
    );
}

#[test]
fn stack_underflow_is_reported() {
    let program = assembled(&[Instruction::simple(Opcode::Echo)]);
    assert_eq!(
        run(&program, Vec::new()),
        Err(RuntimeError::StackUnderflow { line: 1 })
    );
}

#[test]
fn cast_to_function_is_fatal() {
    let program = assembled(&[
        Instruction::simple(Opcode::Null),
        Instruction::new(
            Opcode::Cast,
            Operand::Type(phpi_common::VariantType::Function),
        ),
    ]);
    assert_eq!(
        run(&program, Vec::new()),
        Err(RuntimeError::InvalidCast {
            line: 1,
            target: "function"
        })
    );
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let mut program = Program::new();
    program.main.code = vec![0xEE];
    program.main.lines = vec![4];
    assert!(matches!(
        run(&program, Vec::new()),
        Err(RuntimeError::Decode { line: 4, .. })
    ));
}

#[test]
fn jump_past_end_returns_null() {
    let program = assembled(&[
        Instruction::new(Opcode::Jmp, Operand::Addr(100)),
        Instruction::simple(Opcode::Echo),
    ]);
    assert_eq!(run(&program, Vec::new()), Ok(Variant::Null));
}

#[test]
fn vm_runs_an_arbitrary_entry() {
    let program = build("<?php function twice($n) { return $n * 2; }");
    let mut entry = Function::new("entry", 1);
    let idx = entry.intern("twice").unwrap();
    entry.emit(Instruction::new(Opcode::Long, Operand::Long(21)), 1);
    entry.emit(Instruction::new(Opcode::Str, Operand::Str(idx)), 1);
    entry.emit(Instruction::new(Opcode::Call, Operand::Argc(1)), 1);
    entry.emit(Instruction::simple(Opcode::Return), 1);

    let mut vm = Vm::with_entry(&program.functions, &entry, Vec::new(), VmConfig::default());
    assert_eq!(vm.run(), Ok(Variant::Long(42)));
    assert_eq!(vm.depth(), 1);
}

#[test]
fn main_scope_is_inspectable() {
    let program = build("<?php $a = 1; const B = 2;");
    let mut vm = Vm::new(&program, Vec::new(), VmConfig::default());
    vm.run().unwrap();
    assert_eq!(vm.scope().lookup("a"), Some(&Variant::Long(1)));
    assert!(vm.scope().is_const("B"));
}

// ============================================================
// Property tests
// ============================================================

proptest! {
    #[test]
    fn addition_matches_wrapping_i64(a in any::<i64>(), b in any::<i64>()) {
        let program = assembled(&[
            Instruction::new(Opcode::Long, Operand::Long(a)),
            Instruction::new(Opcode::Long, Operand::Long(b)),
            Instruction::simple(Opcode::Add),
            Instruction::simple(Opcode::Return),
        ]);
        prop_assert_eq!(run(&program, Vec::new()), Ok(Variant::Long(a.wrapping_add(b))));
    }

    #[test]
    fn echo_of_integer_is_decimal(n in any::<i64>()) {
        let program = assembled(&[
            Instruction::new(Opcode::Long, Operand::Long(n)),
            Instruction::simple(Opcode::Echo),
        ]);
        let mut out = Vec::new();
        run(&program, &mut out).unwrap();
        prop_assert_eq!(String::from_utf8(out).unwrap(), n.to_string());
    }
}
