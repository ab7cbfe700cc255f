mod util;

use bitsy::OpCode;
use util::*;

#[test]
fn return_constant() {
    let (executable, report) = compile("int f() { return 42; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(executable.functions().len(), 1);
    assert_eq!(ops(&executable, "f"), [OpCode::LoadValue, OpCode::Return]);
}

#[test]
fn return_param_expr() {
    let (executable, report) = compile("int f(int i) { return i + 42; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(ops(&executable, "f"), [
        OpCode::LoadArg,
        OpCode::LoadValue,
        OpCode::AddInt16,
        OpCode::Return,
    ]);
}

#[test]
fn conditional_return() {
    let (executable, report) = compile("int f(int i) { if (i) return 0; else return 42; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(ops(&executable, "f"), [
        OpCode::LoadArg,
        OpCode::BranchIfFalse,
        OpCode::LoadValue,
        OpCode::Return,
        OpCode::Jump,
        OpCode::LoadValue,
        OpCode::Return,
    ]);
}

#[test]
fn error_if_doesnt_return() {
    compile_with_errors("int f() { int a = 42; }", &[161]);
}

#[test]
fn error_if_doesnt_return_value() {
    compile_with_errors("int f() { int a = 42; return; }", &[126]);
}

#[test]
fn error_if_void_function_returns_value() {
    compile_with_errors("void f() { return 42; }", &[127]);
}

#[test]
fn void_functions_have_no_value() {
    compile_with_errors("
        void f() {
        }
        void main() {
            int a = f();
        }
    ", &[30]);
}

#[test]
fn local_variables() {
    let (executable, report) = compile("
        void f() {
            int a = 4;
            int b = 8;
            int c = a + b;
        }
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let f = executable.compiled_function("f").unwrap();
    assert_eq!(f.local_variables().len(), 3);
}

#[test]
fn relational_operators_reduce_to_three_comparisons() {
    // == < > are one instruction, != <= >= pay one logical negation
    let cases: &[(&str, &[OpCode])] = &[
        ("==", &[OpCode::EqualToInt16]),
        ("!=", &[OpCode::EqualToInt16, OpCode::LogicalNot]),
        ("<", &[OpCode::LessThanInt16]),
        ("<=", &[OpCode::GreaterThanInt16, OpCode::LogicalNot]),
        (">", &[OpCode::GreaterThanInt16]),
        (">=", &[OpCode::LessThanInt16, OpCode::LogicalNot]),
    ];
    for (operator, comparison) in cases {
        let source = format!("int f(int a, int b) {{ return a {} b; }}", operator);
        let (executable, report) = compile(&source);
        assert_eq!(report.error_count(), 0, "{}: {:?}", operator, report.diagnostics());
        let mut expected = vec![OpCode::LoadArg, OpCode::LoadArg];
        expected.extend_from_slice(comparison);
        expected.push(OpCode::Return);
        assert_eq!(ops(&executable, "f"), expected, "operator {}", operator);
    }
}

#[test]
fn instruction_offsets_select_width_variants() {
    let (executable, report) = compile("
        long int wide(long int a, long int b) { return a + b; }
        double real(double a, double b) { return a * b; }
        unsigned int flags(unsigned int a, unsigned int b) { return a & b; }
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert!(ops(&executable, "wide").contains(&OpCode::AddInt32));
    assert!(ops(&executable, "real").contains(&OpCode::MultiplyFloat64));
    assert!(ops(&executable, "flags").contains(&OpCode::BinaryAndUInt16));
}

#[test]
fn operands_are_cast_to_the_common_type() {
    let (executable, report) = compile("double f(int i) { return i + 0.5; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(ops(&executable, "f"), [
        OpCode::LoadArg,
        OpCode::Convert,
        OpCode::LoadValue,
        OpCode::AddFloat64,
        OpCode::Return,
    ]);
}

#[test]
fn identical_types_cast_to_nothing() {
    let (executable, report) = compile("int f(int i) { return i; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(ops(&executable, "f"), [OpCode::LoadArg, OpCode::Return]);
}

#[test]
fn return_value_is_cast_to_the_return_type() {
    let (executable, report) = compile("int f(unsigned int a, unsigned int b) { return a < b; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(ops(&executable, "f"), [
        OpCode::LoadArg,
        OpCode::LoadArg,
        OpCode::LessThanUInt16,
        OpCode::Convert,
        OpCode::Return,
    ]);
}

#[test]
fn unsupported_operator_on_floats() {
    compile_with_errors("int f(double a, double b) { return a % b; }", &[19]);
}

#[test]
fn pointer_operands_only_compare() {
    compile_with_errors("
        int f(int *a, int *b) {
            return a + b;
        }
    ", &[19]);
    let (_, report) = compile("
        int f(int *a, int *b) {
            return a == b;
        }
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
}

#[test]
fn undefined_name() {
    compile_with_errors("int f() { return missing; }", &[103]);
}

#[test]
fn undefined_function() {
    compile_with_errors("int f() { return missing(); }", &[103]);
}

#[test]
fn wrong_argument_count() {
    compile_with_errors("
        int one(int a) { return a; }
        int f() { return one(1, 2); }
    ", &[1501]);
}

#[test]
fn errors_do_not_stop_the_pass() {
    // batch diagnostics: both functions report their own error
    compile_with_errors("
        int f() { int a = 42; }
        int g() { return; }
    ", &[161, 126]);
}

#[test]
fn void_function_returns_implicitly() {
    let (executable, report) = compile("void f() { int a = 42; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(ops(&executable, "f").last(), Some(&OpCode::Return));
}

#[test]
fn sequence_discards_the_first_value() {
    let (executable, report) = compile("int f(int a) { return a = 1, a + 1; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let f = ops(&executable, "f");
    assert!(f.contains(&OpCode::Pop), "{:?}", f);
}

#[test]
fn intrinsics_occupy_the_function_table_front() {
    let (machine, _) = capture_machine();
    let (executable, report) = compile_with("int f() { return 42; }", &machine);
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(executable.functions().len(), machine.intrinsics().len() + 1);
    assert!(executable.compiled_function("f").is_some());
}

#[test]
fn calls_resolve_forward_declarations() {
    let (executable, report) = compile("
        int first() { return second(); }
        int second() { return 42; }
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert!(ops(&executable, "first").contains(&OpCode::Call));
}

#[test]
fn global_initializers_compile_into_startup_function() {
    let (executable, report) = compile("int counter = 5;");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let startup = executable.compiled_function("__cinit").expect("startup function exists");
    assert!(startup.instructions().iter().any(|i| i.op == OpCode::StoreGlobal));
}

#[test]
fn opcode_table_offsets_are_stable() {
    // the offset ordering is part of the bytecode surface
    assert_eq!(OpCode::AddInt16 as u8 + 1, OpCode::AddUInt16 as u8);
    assert_eq!(OpCode::AddInt16 as u8 + 2, OpCode::AddInt32 as u8);
    assert_eq!(OpCode::AddInt16 as u8 + 3, OpCode::AddUInt32 as u8);
    assert_eq!(OpCode::AddInt16 as u8 + 4, OpCode::AddFloat32 as u8);
    assert_eq!(OpCode::AddInt16 as u8 + 5, OpCode::AddFloat64 as u8);
    assert_eq!(OpCode::SubtractInt16 as u8, OpCode::AddInt16 as u8 + 6);
    assert_eq!(OpCode::from_u8(OpCode::LessThanFloat32 as u8), Some(OpCode::LessThanFloat32));
    assert_eq!(OpCode::from_u8(255), None);
}
