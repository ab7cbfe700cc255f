mod util;

use bitsy::{CType, Signedness};
use bitsy::frontend::ast::{Expression, Statement};
use util::*;

fn assign_target_name(expression: &Expression) -> &str {
    match expression {
        Expression::Assign(assign) => match &assign.target {
            Expression::Variable(variable) => &variable.name,
            other => panic!("assignment target is not a variable: {}", other),
        },
        other => panic!("expected an assignment, got {}", other),
    }
}

#[test]
fn for_loop_with_three_inits() {
    let (unit, report) = parse("
        void f() {
            int acc;
            int i;
            int j;
            for (i = -10, acc = 0, j = 42; i <= 10; i += 2) {
                acc = acc + 1;
            }
        }
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let f = unit.function("f").expect("f is declared");
    let body = f.body.as_ref().expect("f has a body");
    let Statement::For(for_statement) = &body.statements[0] else {
        panic!("first statement is not a for loop");
    };
    // the init clause is one expression statement rooted in nested sequences,
    // evaluated strictly left to right: i, acc, j
    assert_eq!(for_statement.init.statements.len(), 1);
    let Statement::Expression(Expression::Sequence(outer)) = &for_statement.init.statements[0] else {
        panic!("init clause is not a sequence expression");
    };
    let Expression::Sequence(inner) = &outer.first else {
        panic!("first sequence operand is not a nested sequence");
    };
    assert_eq!(assign_target_name(&inner.first), "i");
    assert_eq!(assign_target_name(&inner.second), "acc");
    assert_eq!(assign_target_name(&outer.second), "j");
}

#[test]
fn array_length_inferred_from_initializer() {
    let (unit, report) = parse("void f() { int a[] = { 1, 2, 3 }; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let f = unit.function("f").expect("f is declared");
    let variable = f.body.as_ref().unwrap().variable("a").expect("a is declared");
    let CType::Array(array) = &variable.ty else {
        panic!("a is not an array");
    };
    assert_eq!(array.length, Some(3));
}

#[test]
fn array_length_counts_each_designator() {
    // a designated item contributes one unit per designator
    let (unit, report) = parse("void f() { int a[] = { .x = 1, .y = 1, 2 }; }");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let f = unit.function("f").unwrap();
    let variable = f.body.as_ref().unwrap().variable("a").unwrap();
    let CType::Array(array) = &variable.ty else {
        panic!("a is not an array");
    };
    assert_eq!(array.length, Some(3));
}

#[test]
fn explicit_array_length() {
    let (unit, report) = parse("int a[3 + 4];");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let CType::Array(array) = &unit.block.variable("a").unwrap().ty else {
        panic!("a is not an array");
    };
    assert_eq!(array.length, Some(7));
}

#[test]
fn two_dimensional_array() {
    let (unit, report) = parse("int a[3][4];");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let CType::Array(outer) = &unit.block.variable("a").unwrap().ty else {
        panic!("a is not an array");
    };
    assert_eq!(outer.length, Some(3));
    let CType::Array(inner) = &*outer.element else {
        panic!("element is not an array");
    };
    assert_eq!(inner.length, Some(4));
    assert_eq!(*inner.element, CType::basic("int"));
}

#[test]
fn array_of_pointers() {
    let (unit, report) = parse("int *a[3];");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let CType::Array(array) = &unit.block.variable("a").unwrap().ty else {
        panic!("a is not an array");
    };
    assert_eq!(array.length, Some(3));
    assert!(matches!(&*array.element, CType::Pointer(_)));
}

#[test]
fn pointer_to_array() {
    let (unit, report) = parse("int (*a)[3];");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let CType::Pointer(pointer) = &unit.block.variable("a").unwrap().ty else {
        panic!("a is not a pointer");
    };
    assert!(matches!(&*pointer.inner, CType::Array(_)));
}

#[test]
fn function_declaration_keeps_parameter_names() {
    let (unit, report) = parse("int add(int left, int right);");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let add = unit.function("add").expect("add is declared");
    assert!(add.body.is_none());
    let names: Vec<&str> = add.ty.parameters.iter().map(|p| &p.name[..]).collect();
    assert_eq!(names, ["left", "right"]);
}

#[test]
fn void_parameter_list_is_empty() {
    let (unit, report) = parse("int f(void);");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert!(unit.function("f").unwrap().ty.parameters.is_empty());
}

#[test]
fn function_pointer_is_a_variable() {
    // a strongly bound pointer to a function declares a variable whose type
    // collapses to the function type itself
    let (unit, report) = parse("int (*handler)(int, int);");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert!(unit.function("handler").is_none());
    let variable = unit.block.variable("handler").expect("handler is a variable");
    let CType::Function(function) = &variable.ty else {
        panic!("handler does not have a function type");
    };
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(*function.return_type, CType::basic("int"));
}

#[test]
fn parenthesized_name_declarator() {
    let (unit, report) = parse("int (x);");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(unit.block.variable("x").unwrap().ty, CType::basic("int"));
}

#[test]
fn typedef_registers_before_next_declaration() {
    let (unit, report) = parse("
        typedef unsigned int uint;
        uint x;
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    let CType::Basic(basic) = &unit.block.variable("x").unwrap().ty else {
        panic!("x is not a basic type");
    };
    assert_eq!(basic.name, "int");
    assert_eq!(basic.signedness, Signedness::Unsigned);
}

#[test]
fn typedef_of_pointer_type() {
    let (unit, report) = parse("
        typedef int *handle;
        handle h;
    ");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert!(matches!(&unit.block.variable("h").unwrap().ty, CType::Pointer(_)));
}

#[test]
fn bad_function_reports_errors() {
    let (_, report) = parse("
        void setup() {
            pin_mode(4, 1);
        }

        void loop() {
            pin_mode
            sleep(1000);
        }
    ");
    assert!(report.error_count() > 0);
}

#[test]
fn unsupported_struct_reports_9002() {
    let (_, report) = parse("struct point { int x; int y; };");
    assert!(report.contains(9002), "{:?}", report.diagnostics());
}

#[test]
fn unsupported_string_literal_reports_9002() {
    let (_, report) = parse("void f() { log(\"hello\"); }");
    assert!(report.contains(9002), "{:?}", report.diagnostics());
}

#[test]
fn unimplemented_switch_reports_9003() {
    let (_, report) = parse("void f(int i) { switch (i) { } }");
    assert!(report.contains(9003), "{:?}", report.diagnostics());
}

#[test]
fn unimplemented_ternary_reports_9003() {
    let (_, report) = parse("void f(int i) { i = i ? 1 : 2; }");
    assert!(report.contains(9003), "{:?}", report.diagnostics());
}

#[test]
fn parsing_continues_after_errors() {
    // batch diagnostics: both offending constructs are reported and the
    // declaration in between still lands in the unit
    let (unit, report) = parse("
        struct point { int x; };
        int ok;
        void f() { goto done; }
    ");
    assert!(report.contains(9002), "{:?}", report.diagnostics());
    assert!(report.contains(9003), "{:?}", report.diagnostics());
    assert!(unit.block.variable("ok").is_some());
}

#[test]
fn global_initializer_becomes_a_statement() {
    let (unit, report) = parse("int counter = 5;");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(unit.block.statements.len(), 1);
    assert!(matches!(&unit.block.statements[0], Statement::Expression(Expression::Assign(_))));
}

#[test]
fn multiple_declarators_in_one_declaration() {
    let (unit, report) = parse("int a, *b, c[2];");
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(unit.block.variable("a").unwrap().ty, CType::basic("int"));
    assert!(matches!(&unit.block.variable("b").unwrap().ty, CType::Pointer(_)));
    assert!(matches!(&unit.block.variable("c").unwrap().ty, CType::Array(_)));
}
