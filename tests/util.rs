use std::cell::RefCell;
use std::rc::Rc;
use bitsy::{Executable, MachineDescription, OpCode, Report, TranslationUnit, Value};

/// Lexes and parses code, returning the translation unit and its report.
#[allow(dead_code)]
pub fn parse(code: &str) -> (TranslationUnit, Report) {
    let tokens = bitsy::lex(code).expect("tokenizer accepts the source");
    let mut report = Report::new();
    let unit = bitsy::parse(&tokens, &mut report, bitsy::ParserOptions::default());
    (unit, report)
}

/// Compiles code against a bare 16 bit machine.
#[allow(dead_code)]
pub fn compile(code: &str) -> (Executable, Report) {
    compile_with(code, &MachineDescription::new("test"))
}

/// Compiles code against the given machine.
#[allow(dead_code)]
pub fn compile_with(code: &str, machine: &MachineDescription) -> (Executable, Report) {
    let mut report = Report::new();
    let executable = bitsy::build(code, machine, &mut report).expect("tokenizer accepts the source");
    (executable, report)
}

/// Compiles code and asserts that it produced each of the expected
/// diagnostic codes.
#[allow(dead_code)]
pub fn compile_with_errors(code: &str, expected: &[u32]) {
    let (_, report) = compile(code);
    for code in expected {
        assert!(
            report.contains(*code),
            "expected diagnostic {}, got {:?}",
            code,
            report.diagnostics()
        );
    }
}

/// The opcode sequence of a compiled function.
#[allow(dead_code)]
pub fn ops(executable: &Executable, name: &str) -> Vec<OpCode> {
    executable
        .compiled_function(name)
        .unwrap_or_else(|| panic!("no compiled function '{}'", name))
        .instructions()
        .iter()
        .map(|i| i.op)
        .collect()
}

/// A machine exposing `ret_int`, `ret_long` and `ret_double` intrinsics that
/// capture their argument, so compiled code can report values to the test.
#[allow(dead_code)]
pub fn capture_machine() -> (MachineDescription, Rc<RefCell<Vec<Value>>>) {
    let captured: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    let mut machine = MachineDescription::new("test");
    for prototype in ["void ret_int(int value)", "void ret_long(long int value)", "void ret_double(double value)"] {
        let sink = captured.clone();
        machine
            .register_prototype(prototype, Rc::new(move |args: &[Value]| {
                sink.borrow_mut().push(args[0]);
                None
            }))
            .expect("intrinsic prototype parses");
    }
    (machine, captured)
}

/// Runs a bit of C code and returns the values it reported through the
/// capture intrinsics. Code without a main function is wrapped in one.
#[allow(dead_code)]
pub fn run(code: &str) -> Vec<Value> {
    let (machine, captured) = capture_machine();
    let source = if code.contains("main(") {
        code.to_string()
    } else {
        format!("void main() {{ {} }}", code)
    };
    let mut vm = bitsy::vm(&source, &machine).expect("code compiles");
    vm.call("main", &[]).expect("code runs to completion");
    assert!(vm.stack().is_empty(), "operand stack not balanced after main");
    captured.take()
}

/// Shorthand for a list of 16 bit int values.
#[allow(dead_code)]
pub fn ints(values: &[i16]) -> Vec<Value> {
    values.iter().map(|&v| Value::Int16(v)).collect()
}
