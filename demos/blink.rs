//! Simulates a microcontroller blink sketch: the compiled program drives a
//! virtual pin through an intrinsic function, and the host single-steps the
//! VM the way a simulation would interleave it with other components.

use std::cell::RefCell;
use std::rc::Rc;
use bitsy::{MachineDescription, Value, VMState};

fn main() {
    let pin_levels: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));

    let mut machine = MachineDescription::new("demo-board");
    let writes = pin_levels.clone();
    machine
        .register_prototype("void digital_write(int pin, int level)", Rc::new(move |args: &[Value]| {
            writes.borrow_mut().push(args[1]);
            None
        }))
        .unwrap();

    let mut vm = bitsy::vm("
        int level;

        void blink(int times) {
            int i;
            for (i = 0; i < times; i += 1) {
                level = !level;
                digital_write(13, level);
            }
        }
    ", &machine).unwrap();

    // drive the call one instruction at a time, as a host simulation would
    vm.begin_call("blink", &[Value::Int16(4)]).unwrap();
    let mut steps = 0;
    while vm.step().unwrap() != VMState::Ready {
        steps += 1;
    }

    println!("executed {} steps, pin levels: {:?}", steps, pin_levels.borrow());
}
