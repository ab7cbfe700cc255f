mod util;

use std::rc::Rc;
use bitsy::{FrameState, MachineDescription, RuntimeErrorKind, Value, VMState};
use util::*;

#[test]
fn return_constant() {
    let machine = MachineDescription::new("test");
    let mut vm = bitsy::vm("int f() { return 42; }", &machine).unwrap();
    let result = vm.call("f", &[]).unwrap();
    assert_eq!(result, Some(Value::Int16(42)));
    assert!(vm.stack().is_empty());
}

#[test]
fn return_param_expr() {
    let machine = MachineDescription::new("test");
    let mut vm = bitsy::vm("int f(int i) { return i + 42; }", &machine).unwrap();
    assert_eq!(vm.call("f", &[Value::Int16(-2)]).unwrap(), Some(Value::Int16(40)));
}

#[test]
fn binary_op() {
    let result = run("
        ret_int(1 + 4);
        ret_int(1 + 4 * 2);
        ret_int((1 + 4) * 2);
        ret_int(5 - 7);
        ret_int(5 - 7 * 2);
        ret_int(7 / 2);
        ret_int(7 % 2);
        ret_int(1 << 4);
        ret_int(6 & 3);
        ret_int(6 | 3);
        ret_int(6 ^ 3);
    ");
    assert_eq!(result, ints(&[5, 9, 10, -2, -9, 3, 1, 16, 2, 7, 5]));
}

#[test]
fn relational_ops() {
    let result = run("
        ret_int(1 == 2);
        ret_int(1 != 2);
        ret_int(1 < 2);
        ret_int(1 <= 1);
        ret_int(2 > 1);
        ret_int(2 >= 3);
    ");
    assert_eq!(result, ints(&[0, 1, 1, 1, 1, 0]));
}

#[test]
fn branching() {
    let result = run("
        int x = 1;
        int y = 2;
        while (x <= 3) {
            if (x < y) {
                ret_int(x);
            } else if (x > y) {
                ret_int(y);
            } else {
                ret_int(x + y);
            }
            x = x + 1;
        }
    ");
    assert_eq!(result, ints(&[1, 4, 2]));
}

#[test]
fn recursion() {
    let result = run("
        int fib(int n) {
            if (n < 2) {
                return n;
            }
            return fib(n - 1) + fib(n - 2);
        }
        void main() {
            ret_int(fib(1));
            ret_int(fib(2));
            ret_int(fib(5));
            ret_int(fib(7));
        }
    ");
    assert_eq!(result, ints(&[1, 1, 5, 13]));
}

#[test]
fn for_loop_with_three_inits() {
    let result = run("
        void main() {
            int acc;
            int i;
            int j;
            for (i = -10, acc = 0, j = 42; i <= 10; i += 2) {
                acc = acc + 1;
            }
            ret_int(acc);
            ret_int(j);
        }
    ");
    assert_eq!(result, ints(&[11, 42]));
}

#[test]
fn break_and_continue() {
    let result = run("
        int i;
        for (i = 0; i < 10; i += 1) {
            if (i == 3) {
                continue;
            }
            if (i == 5) {
                break;
            }
            ret_int(i);
        }
        ret_int(i);
    ");
    assert_eq!(result, ints(&[0, 1, 2, 4, 5]));
}

#[test]
fn do_while_runs_at_least_once() {
    let result = run("
        int i = 10;
        do {
            ret_int(i);
            i += 1;
        } while (i < 3);
    ");
    assert_eq!(result, ints(&[10]));
}

#[test]
fn floats() {
    let result = run("
        double x = 2.5;
        double y = 1.25;
        ret_double(x + y);
        ret_double(1 / 2.0);
    ");
    assert_eq!(result, [Value::Float64(3.75), Value::Float64(0.5)]);
}

#[test]
fn integer_division_truncates() {
    let result = run("ret_int(-7 / 2);");
    assert_eq!(result, ints(&[-3]));
}

#[test]
fn widening_casts() {
    let result = run("
        long int wide = 40000;
        ret_long(wide + 1);
        int narrow = 2;
        ret_double(narrow + 0.5);
    ");
    assert_eq!(result, [Value::Int32(40001), Value::Float64(2.5)]);
}

#[test]
fn increment_and_decrement() {
    let result = run("
        int i = 5;
        ret_int(++i);
        ret_int(i++);
        ret_int(i);
        ret_int(--i);
        ret_int(i--);
        ret_int(i);
    ");
    assert_eq!(result, ints(&[6, 6, 7, 6, 6, 5]));
}

#[test]
fn globals_initialize_before_the_first_call() {
    let result = run("
        int counter = 5;
        void main() {
            counter += 2;
            ret_int(counter);
        }
    ");
    assert_eq!(result, ints(&[7]));
}

#[test]
fn array_initializer_fills_slots() {
    let result = run("
        void main() {
            int a[] = { 3, 1, 4 };
            ret_int(0);
        }
    ");
    assert_eq!(result, ints(&[0]));
}

#[test]
fn comma_operator_keeps_the_right_value() {
    let result = run("
        int a = 1;
        int b = 2;
        ret_int((a = 5, b = 6, a + b));
    ");
    assert_eq!(result, ints(&[11]));
}

#[test]
fn intrinsic_results_feed_expressions() {
    let mut machine = MachineDescription::new("test");
    machine
        .register_prototype("int reading()", Rc::new(|_args: &[Value]| Some(Value::Int16(7))))
        .unwrap();
    let mut vm = bitsy::vm("int f() { return reading() + 1; }", &machine).unwrap();
    assert_eq!(vm.call("f", &[]).unwrap(), Some(Value::Int16(8)));
}

#[test]
fn intrinsic_without_result_faults() {
    let mut machine = MachineDescription::new("test");
    machine
        .register_prototype("int broken()", Rc::new(|_args: &[Value]| None))
        .unwrap();
    let mut vm = bitsy::vm("int f() { return broken(); }", &machine).unwrap();
    let error = vm.call("f", &[]).unwrap_err();
    assert!(matches!(error.kind(), RuntimeErrorKind::IntrinsicResultMissing(_)));
    assert_eq!(vm.status(), VMState::Fault);
}

#[test]
fn divide_by_zero_faults() {
    let machine = MachineDescription::new("test");
    let mut vm = bitsy::vm("int f(int a) { return a / 0; }", &machine).unwrap();
    let error = vm.call("f", &[Value::Int16(1)]).unwrap_err();
    assert_eq!(*error.kind(), RuntimeErrorKind::DivideByZero);
    assert_eq!(vm.status(), VMState::Fault);
    // a faulted vm refuses further calls until reset
    let error = vm.call("f", &[Value::Int16(1)]).unwrap_err();
    assert_eq!(*error.kind(), RuntimeErrorKind::NotReady);
    vm.reset();
    assert_eq!(vm.status(), VMState::Ready);
}

#[test]
fn unknown_function_call() {
    let machine = MachineDescription::new("test");
    let mut vm = bitsy::vm("int f() { return 1; }", &machine).unwrap();
    let error = vm.call("missing", &[]).unwrap_err();
    assert!(matches!(error.kind(), RuntimeErrorKind::UnknownFunction(_)));
}

#[test]
fn stack_balance_after_calls() {
    let machine = MachineDescription::new("test");
    let mut vm = bitsy::vm("
        int add(int a, int b) { return a + b; }
        int wrapped(int a) { return add(a, add(a, 1)); }
        void quiet(int a) { int b = a * 2; }
    ", &machine).unwrap();
    assert_eq!(vm.call("add", &[Value::Int16(2), Value::Int16(3)]).unwrap(), Some(Value::Int16(5)));
    assert!(vm.stack().is_empty());
    assert_eq!(vm.call("wrapped", &[Value::Int16(4)]).unwrap(), Some(Value::Int16(9)));
    assert!(vm.stack().is_empty());
    assert_eq!(vm.call("quiet", &[Value::Int16(4)]).unwrap(), None);
    assert!(vm.stack().is_empty());
}

#[test]
fn single_stepping() {
    let machine = MachineDescription::new("test");
    let mut vm = bitsy::vm("int f() { return 42; }", &machine).unwrap();
    vm.begin_call("f", &[]).unwrap();
    assert_eq!(vm.state().frames()[0].state(), FrameState::Initializing);

    // init step binds arguments and transitions the frame to Running
    vm.step().unwrap();
    assert_eq!(vm.state().frames()[0].state(), FrameState::Running);

    // LoadValue, then Return transitions the frame to Returned
    vm.step().unwrap();
    assert_eq!(vm.stack(), [Value::Int16(42)]);
    vm.step().unwrap();
    assert_eq!(vm.state().frames()[0].state(), FrameState::Returned);

    // the next step discards the frame; the return value remains
    let status = vm.step().unwrap();
    assert_eq!(status, VMState::Ready);
    assert!(vm.state().frames().is_empty());
    assert_eq!(vm.stack(), [Value::Int16(42)]);
}

#[test]
fn reset_reruns_global_initializers() {
    let result = run("
        int counter = 1;
        void main() {
            counter += 1;
            ret_int(counter);
        }
    ");
    assert_eq!(result, ints(&[2]));

    let (machine, captured) = capture_machine();
    let mut vm = bitsy::vm("
        int counter = 1;
        void main() {
            counter += 1;
            ret_int(counter);
        }
    ", &machine).unwrap();
    vm.call("main", &[]).unwrap();
    vm.call("main", &[]).unwrap();
    vm.reset();
    vm.call("main", &[]).unwrap();
    assert_eq!(captured.take(), ints(&[2, 3, 2]));
}
