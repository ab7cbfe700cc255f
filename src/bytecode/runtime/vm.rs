//! The virtual machine. Executes compiled instruction streams against an
//! explicit execution state, one instruction per step. Compiled and intrinsic
//! functions share the same two-method stepping contract, so the VM never
//! needs to know which kind it is stepping and a host can single-step
//! execution deterministically.

use crate::prelude::*;
use crate::shared::types::ArithmeticClass;
use crate::shared::value::Value;
use crate::bytecode::{CompiledFunction, Executable, Function, Instruction, Operand, opcodes::OpCode};
use crate::bytecode::runtime::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};
use crate::bytecode::runtime::stack::{StackOp, ValueStack};

/// Current state of the vm, checked after each step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VMState {
    /// No program is running. The VM accepts calls.
    Ready,
    /// A call is in progress; further steps are required.
    Running,
    /// Execution faulted. The VM must be reset before it can run again.
    Fault,
}

/// Per-frame progress through the function stepping contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameState {
    /// The frame was pushed; the next step binds arguments into slots.
    Initializing,
    /// Steps execute one instruction each.
    Running,
    /// The function returned; the next step discards the frame.
    Returned,
}

/// A single call frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pub(crate) function: usize,
    pub(crate) ip: usize,
    pub(crate) state: FrameState,
    pub(crate) args: Vec<Value>,
    pub(crate) locals: Vec<Value>,
}

impl Frame {
    /// Index of the frame's function in the executable's function table.
    pub fn function_index(self: &Self) -> usize {
        self.function
    }
    /// The instruction pointer.
    pub fn ip(self: &Self) -> usize {
        self.ip
    }
    pub fn state(self: &Self) -> FrameState {
        self.state
    }
}

/// Everything mutated by stepping: the shared operand stack, the call stack
/// and the global variable slots. Created per VM, mutated only by stepping.
#[derive(Debug)]
pub struct ExecutionState {
    pub(crate) stack: ValueStack,
    pub(crate) frames: Vec<Frame>,
    pub(crate) globals: Vec<Value>,
}

impl ExecutionState {
    pub(crate) fn new(executable: &Executable) -> Self {
        let mut globals = Vec::new();
        for global in executable.globals() {
            for _ in 0..global.ty.slot_count().unwrap_or(0) {
                globals.push(Value::Int16(0));
            }
        }
        ExecutionState {
            stack: ValueStack::new(),
            frames: Vec::new(),
            globals,
        }
    }
    /// The shared operand stack.
    pub fn stack(self: &Self) -> &ValueStack {
        &self.stack
    }
    /// The call frames, outermost first.
    pub fn frames(self: &Self) -> &[Frame] {
        &self.frames
    }
    /// The global variable slots.
    pub fn globals(self: &Self) -> &[Value] {
        &self.globals
    }
    pub(crate) fn push_frame(self: &mut Self, function: usize) {
        self.frames.push(Frame {
            function,
            ip: 0,
            state: FrameState::Initializing,
            args: Vec::new(),
            locals: Vec::new(),
        });
    }
    /// Completes the current frame: marks it returned and pushes the return
    /// value, if any, for the caller.
    pub(crate) fn return_from(self: &mut Self, value: Option<Value>) -> RuntimeResult {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::Internal("return without an active frame")))?;
        frame.state = FrameState::Returned;
        if let Some(value) = value {
            self.stack.push(value);
        }
        Ok(())
    }
}

/// The uniform function stepping contract shared by compiled and intrinsic
/// functions.
impl Function {
    /// Binds the declared parameter count from the operand stack into the
    /// frame's argument slots (arguments were pushed left to right),
    /// zero-fills local slots and transitions the frame to Running.
    pub fn init(self: &Self, state: &mut ExecutionState) -> RuntimeResult {
        let arity = self.function_type().parameters.len();
        let mut args = Vec::with_capacity(arity);
        for _ in 0..arity {
            args.push(state.stack.pop()?);
        }
        args.reverse();
        let locals = match self {
            Function::Compiled(function) => {
                let mut locals = Vec::new();
                for local in &function.local_variables {
                    let slots = local
                        .ty
                        .slot_count()
                        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::Internal("local slot of incomplete type")))?;
                    for _ in 0..slots {
                        locals.push(Value::Int16(0));
                    }
                }
                locals
            }
            Function::Intrinsic(_) => Vec::new(),
        };
        let frame = state
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::Internal("init without an active frame")))?;
        frame.args = args;
        frame.locals = locals;
        frame.state = FrameState::Running;
        Ok(())
    }

    /// Executes exactly one step: one instruction for a compiled function,
    /// the single host handler invocation for an intrinsic.
    pub fn step(self: &Self, executable: &Executable, state: &mut ExecutionState) -> RuntimeResult {
        match self {
            Function::Compiled(function) => function.step_instruction(executable, state),
            Function::Intrinsic(intrinsic) => {
                let result = {
                    let frame = state
                        .frames
                        .last()
                        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::Internal("step without an active frame")))?;
                    intrinsic.invoke(&frame.args)
                };
                if intrinsic.function_type().return_type.is_void() {
                    state.return_from(None)
                } else {
                    match result {
                        Some(value) => state.return_from(Some(value)),
                        None => Err(RuntimeError::new(RuntimeErrorKind::IntrinsicResultMissing(
                            intrinsic.name().to_string(),
                        ))),
                    }
                }
            }
        }
    }
}

macro_rules! binary_arithmetic {
    ($stack:expr, $class:expr, $int_method:ident, $float_op:tt) => {{
        match $class {
            ArithmeticClass::Int16 => {
                let b: i16 = $stack.pop_value()?;
                let a: i16 = $stack.pop_value()?;
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::UInt16 => {
                let b: u16 = $stack.pop_value()?;
                let a: u16 = $stack.pop_value()?;
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::Int32 => {
                let b: i32 = $stack.pop_value()?;
                let a: i32 = $stack.pop_value()?;
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::UInt32 => {
                let b: u32 = $stack.pop_value()?;
                let a: u32 = $stack.pop_value()?;
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::Float32 => {
                let b: f32 = $stack.pop_value()?;
                let a: f32 = $stack.pop_value()?;
                $stack.push_value(a $float_op b);
            }
            ArithmeticClass::Float64 => {
                let b: f64 = $stack.pop_value()?;
                let a: f64 = $stack.pop_value()?;
                $stack.push_value(a $float_op b);
            }
        }
        Ok(())
    }};
}

macro_rules! binary_division {
    ($stack:expr, $class:expr, $int_method:ident, $float_op:tt) => {{
        match $class {
            ArithmeticClass::Int16 => {
                let b: i16 = $stack.pop_value()?;
                let a: i16 = $stack.pop_value()?;
                if b == 0 {
                    return Err(RuntimeError::new(RuntimeErrorKind::DivideByZero));
                }
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::UInt16 => {
                let b: u16 = $stack.pop_value()?;
                let a: u16 = $stack.pop_value()?;
                if b == 0 {
                    return Err(RuntimeError::new(RuntimeErrorKind::DivideByZero));
                }
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::Int32 => {
                let b: i32 = $stack.pop_value()?;
                let a: i32 = $stack.pop_value()?;
                if b == 0 {
                    return Err(RuntimeError::new(RuntimeErrorKind::DivideByZero));
                }
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::UInt32 => {
                let b: u32 = $stack.pop_value()?;
                let a: u32 = $stack.pop_value()?;
                if b == 0 {
                    return Err(RuntimeError::new(RuntimeErrorKind::DivideByZero));
                }
                $stack.push_value(a.$int_method(b));
            }
            ArithmeticClass::Float32 => {
                let b: f32 = $stack.pop_value()?;
                let a: f32 = $stack.pop_value()?;
                $stack.push_value(a $float_op b);
            }
            ArithmeticClass::Float64 => {
                let b: f64 = $stack.pop_value()?;
                let a: f64 = $stack.pop_value()?;
                $stack.push_value(a $float_op b);
            }
        }
        Ok(())
    }};
}

macro_rules! binary_shift {
    ($stack:expr, $class:expr, $method:ident) => {{
        match $class {
            ArithmeticClass::Int16 => {
                let b: i16 = $stack.pop_value()?;
                let a: i16 = $stack.pop_value()?;
                $stack.push_value(a.$method(b as u32));
            }
            ArithmeticClass::UInt16 => {
                let b: u16 = $stack.pop_value()?;
                let a: u16 = $stack.pop_value()?;
                $stack.push_value(a.$method(b as u32));
            }
            ArithmeticClass::Int32 => {
                let b: i32 = $stack.pop_value()?;
                let a: i32 = $stack.pop_value()?;
                $stack.push_value(a.$method(b as u32));
            }
            ArithmeticClass::UInt32 => {
                let b: u32 = $stack.pop_value()?;
                let a: u32 = $stack.pop_value()?;
                $stack.push_value(a.$method(b as u32));
            }
            _ => return Err(RuntimeError::new(RuntimeErrorKind::UnsupportedInstruction)),
        }
        Ok(())
    }};
}

macro_rules! binary_bitwise {
    ($stack:expr, $class:expr, $op:tt) => {{
        match $class {
            ArithmeticClass::Int16 => {
                let b: i16 = $stack.pop_value()?;
                let a: i16 = $stack.pop_value()?;
                $stack.push_value(a $op b);
            }
            ArithmeticClass::UInt16 => {
                let b: u16 = $stack.pop_value()?;
                let a: u16 = $stack.pop_value()?;
                $stack.push_value(a $op b);
            }
            ArithmeticClass::Int32 => {
                let b: i32 = $stack.pop_value()?;
                let a: i32 = $stack.pop_value()?;
                $stack.push_value(a $op b);
            }
            ArithmeticClass::UInt32 => {
                let b: u32 = $stack.pop_value()?;
                let a: u32 = $stack.pop_value()?;
                $stack.push_value(a $op b);
            }
            _ => return Err(RuntimeError::new(RuntimeErrorKind::UnsupportedInstruction)),
        }
        Ok(())
    }};
}

macro_rules! binary_comparison {
    ($stack:expr, $class:expr, $op:tt) => {{
        let result = match $class {
            ArithmeticClass::Int16 => {
                let b: i16 = $stack.pop_value()?;
                let a: i16 = $stack.pop_value()?;
                a $op b
            }
            ArithmeticClass::UInt16 => {
                let b: u16 = $stack.pop_value()?;
                let a: u16 = $stack.pop_value()?;
                a $op b
            }
            ArithmeticClass::Int32 => {
                let b: i32 = $stack.pop_value()?;
                let a: i32 = $stack.pop_value()?;
                a $op b
            }
            ArithmeticClass::UInt32 => {
                let b: u32 = $stack.pop_value()?;
                let a: u32 = $stack.pop_value()?;
                a $op b
            }
            ArithmeticClass::Float32 => {
                let b: f32 = $stack.pop_value()?;
                let a: f32 = $stack.pop_value()?;
                a $op b
            }
            ArithmeticClass::Float64 => {
                let b: f64 = $stack.pop_value()?;
                let a: f64 = $stack.pop_value()?;
                a $op b
            }
        };
        $stack.push(Value::Int16(result as i16));
        Ok(())
    }};
}

/// Executes one width-specialized arithmetic instruction.
fn exec_arithmetic(stack: &mut ValueStack, base: OpCode, class: ArithmeticClass) -> RuntimeResult {
    match base {
        OpCode::AddInt16 => binary_arithmetic!(stack, class, wrapping_add, +),
        OpCode::SubtractInt16 => binary_arithmetic!(stack, class, wrapping_sub, -),
        OpCode::MultiplyInt16 => binary_arithmetic!(stack, class, wrapping_mul, *),
        OpCode::DivideInt16 => binary_division!(stack, class, wrapping_div, /),
        OpCode::ModuloInt16 => binary_division!(stack, class, wrapping_rem, %),
        OpCode::ShiftLeftInt16 => binary_shift!(stack, class, wrapping_shl),
        OpCode::ShiftRightInt16 => binary_shift!(stack, class, wrapping_shr),
        OpCode::BinaryAndInt16 => binary_bitwise!(stack, class, &),
        OpCode::BinaryOrInt16 => binary_bitwise!(stack, class, |),
        OpCode::BinaryXorInt16 => binary_bitwise!(stack, class, ^),
        OpCode::EqualToInt16 => binary_comparison!(stack, class, ==),
        OpCode::LessThanInt16 => binary_comparison!(stack, class, <),
        OpCode::GreaterThanInt16 => binary_comparison!(stack, class, >),
        _ => Err(RuntimeError::new(RuntimeErrorKind::UnsupportedInstruction)),
    }
}

fn operand_value(instruction: &Instruction) -> RuntimeResult<Value> {
    match &instruction.operand {
        Operand::Value(value) => Ok(*value),
        _ => Err(RuntimeError::new(RuntimeErrorKind::Internal("instruction requires a value operand"))),
    }
}

fn operand_slot(instruction: &Instruction) -> RuntimeResult<usize> {
    match &instruction.operand {
        Operand::Slot(slot) => Ok(*slot),
        _ => Err(RuntimeError::new(RuntimeErrorKind::Internal("instruction requires a slot operand"))),
    }
}

fn operand_target(instruction: &Instruction) -> RuntimeResult<usize> {
    match &instruction.operand {
        Operand::Target(target) => Ok(*target),
        _ => Err(RuntimeError::new(RuntimeErrorKind::Internal("instruction requires a target operand"))),
    }
}

fn operand_function(instruction: &Instruction) -> RuntimeResult<usize> {
    match &instruction.operand {
        Operand::Function(index) => Ok(*index),
        _ => Err(RuntimeError::new(RuntimeErrorKind::Internal("instruction requires a function operand"))),
    }
}

fn operand_cast(instruction: &Instruction) -> RuntimeResult<ArithmeticClass> {
    match &instruction.operand {
        Operand::Cast(class) => Ok(*class),
        _ => Err(RuntimeError::new(RuntimeErrorKind::Internal("instruction requires a cast operand"))),
    }
}

impl CompiledFunction {
    /// Executes the instruction at the current frame's instruction pointer.
    fn step_instruction(self: &Self, executable: &Executable, state: &mut ExecutionState) -> RuntimeResult {
        let instruction = {
            let frame = current_frame(state)?;
            let instruction = self
                .instructions
                .get(frame.ip)
                .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?
                .clone();
            frame.ip += 1;
            instruction
        };

        if let Some((base, class)) = instruction.op.family() {
            return exec_arithmetic(&mut state.stack, base, class);
        }

        match instruction.op {
            OpCode::Nop => Ok(()),
            OpCode::LoadValue => {
                let value = operand_value(&instruction)?;
                state.stack.push(value);
                Ok(())
            }
            OpCode::LoadArg => {
                let slot = operand_slot(&instruction)?;
                let frame = current_frame(state)?;
                let value = *frame.args.get(slot).ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?;
                state.stack.push(value);
                Ok(())
            }
            OpCode::StoreArg => {
                let slot = operand_slot(&instruction)?;
                let value = state.stack.pop()?;
                let frame = current_frame(state)?;
                let target = frame.args.get_mut(slot).ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?;
                *target = value;
                Ok(())
            }
            OpCode::LoadLocal => {
                let slot = operand_slot(&instruction)?;
                let frame = current_frame(state)?;
                let value = *frame.locals.get(slot).ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?;
                state.stack.push(value);
                Ok(())
            }
            OpCode::StoreLocal => {
                let slot = operand_slot(&instruction)?;
                let value = state.stack.pop()?;
                let frame = current_frame(state)?;
                let target = frame.locals.get_mut(slot).ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?;
                *target = value;
                Ok(())
            }
            OpCode::LoadGlobal => {
                let slot = operand_slot(&instruction)?;
                let value = *state.globals.get(slot).ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?;
                state.stack.push(value);
                Ok(())
            }
            OpCode::StoreGlobal => {
                let slot = operand_slot(&instruction)?;
                let value = state.stack.pop()?;
                let target = state.globals.get_mut(slot).ok_or_else(|| RuntimeError::new(RuntimeErrorKind::InvalidAddress))?;
                *target = value;
                Ok(())
            }
            OpCode::Dup => {
                let value = state.stack.top()?;
                state.stack.push(value);
                Ok(())
            }
            OpCode::Pop => state.stack.pop().map(|_| ()),
            OpCode::Jump => {
                let target = operand_target(&instruction)?;
                current_frame(state)?.ip = target;
                Ok(())
            }
            OpCode::BranchIfFalse => {
                let target = operand_target(&instruction)?;
                if state.stack.pop()?.is_zero() {
                    current_frame(state)?.ip = target;
                }
                Ok(())
            }
            OpCode::Call => {
                let index = operand_function(&instruction)?;
                if index >= executable.functions().len() {
                    return Err(RuntimeError::new(RuntimeErrorKind::InvalidAddress));
                }
                state.push_frame(index);
                Ok(())
            }
            OpCode::Return => {
                let value = if self.ty.return_type.is_void() {
                    None
                } else {
                    Some(state.stack.pop()?)
                };
                state.return_from(value)
            }
            OpCode::LogicalNot => {
                let value = state.stack.pop()?;
                state.stack.push(Value::Int16(value.is_zero() as i16));
                Ok(())
            }
            OpCode::Negate => {
                let value = state.stack.pop()?;
                state.stack.push(value.negated());
                Ok(())
            }
            OpCode::Convert => {
                let class = operand_cast(&instruction)?;
                let value = state.stack.pop()?;
                state.stack.push(value.convert(class));
                Ok(())
            }
            _ => Err(RuntimeError::new(RuntimeErrorKind::UnsupportedInstruction)),
        }
    }
}

fn current_frame(state: &mut ExecutionState) -> RuntimeResult<&mut Frame> {
    state
        .frames
        .last_mut()
        .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::Internal("no active frame")))
}

/// A virtual machine for running compiled executables. The VM never blocks
/// internally; a host pauses execution simply by not calling [VM::step].
#[derive(Debug)]
pub struct VM {
    executable: Executable,
    state: ExecutionState,
    status: VMState,
    initialized: bool,
}

impl VM {
    /// Creates a new VM instance for the given executable.
    pub fn new(executable: Executable) -> Self {
        let state = ExecutionState::new(&executable);
        VM {
            executable,
            state,
            status: VMState::Ready,
            initialized: false,
        }
    }
    /// The executable this VM runs.
    pub fn executable(self: &Self) -> &Executable {
        &self.executable
    }
    /// The current execution state.
    pub fn state(self: &Self) -> &ExecutionState {
        &self.state
    }
    /// The VM status after the most recent step.
    pub fn status(self: &Self) -> VMState {
        self.status
    }
    /// The operand stack contents, bottom first.
    pub fn stack(self: &Self) -> &[Value] {
        self.state.stack.values()
    }
    /// Resets the VM, keeping only the executable.
    pub fn reset(self: &mut Self) {
        self.state.stack.clear();
        self.state.frames.clear();
        for slot in &mut self.state.globals {
            *slot = Value::Int16(0);
        }
        self.status = VMState::Ready;
        self.initialized = false;
    }

    /// Executes a single step of the current frame: initialization, one
    /// instruction, or frame disposal after a return. This is the intended
    /// suspension seam for breakpointing and cooperative scheduling.
    pub fn step(self: &mut Self) -> RuntimeResult<VMState> {
        if self.status == VMState::Fault {
            return Err(RuntimeError::new(RuntimeErrorKind::NotReady));
        }
        let Some(frame) = self.state.frames.last() else {
            self.status = VMState::Ready;
            return Ok(self.status);
        };
        let function_index = frame.function;
        let frame_state = frame.state;
        let result = match frame_state {
            FrameState::Returned => {
                self.state.frames.pop();
                Ok(())
            }
            FrameState::Initializing | FrameState::Running => {
                match self.executable.functions().get(function_index) {
                    Some(function) => match frame_state {
                        FrameState::Initializing => function.init(&mut self.state),
                        _ => function.step(&self.executable, &mut self.state),
                    },
                    None => Err(RuntimeError::new(RuntimeErrorKind::InvalidAddress)),
                }
            }
        };
        match result {
            Ok(()) => {
                self.status = if self.state.frames.is_empty() { VMState::Ready } else { VMState::Running };
                Ok(self.status)
            }
            Err(error) => {
                self.status = VMState::Fault;
                Err(error)
            }
        }
    }

    /// Calls the named function with the given arguments and steps the VM
    /// until the call completes, returning the declared return value. Runs
    /// the hidden global-initializer function once before the first call.
    pub fn call(self: &mut Self, name: &str, args: &[Value]) -> RuntimeResult<Option<Value>> {
        if self.status == VMState::Fault {
            return Err(RuntimeError::new(RuntimeErrorKind::NotReady));
        }
        if !self.initialized {
            self.initialized = true;
            if self.executable.function_index("__cinit").is_some() {
                self.invoke("__cinit", &[])?;
            }
        }
        self.invoke(name, args)
    }

    /// Pushes the arguments and a call frame for the named function without
    /// stepping it, so a host can drive the call one [VM::step] at a time.
    /// The frame starts out Initializing; once it and every frame it spawns
    /// have completed, the return value (if any) remains on the stack.
    pub fn begin_call(self: &mut Self, name: &str, args: &[Value]) -> RuntimeResult {
        let index = self
            .executable
            .function_index(name)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnknownFunction(name.to_string())))?;
        for arg in args {
            self.state.stack.push(*arg);
        }
        self.state.push_frame(index);
        self.status = VMState::Running;
        Ok(())
    }

    fn invoke(self: &mut Self, name: &str, args: &[Value]) -> RuntimeResult<Option<Value>> {
        let returns_value = !self
            .executable
            .function(name)
            .ok_or_else(|| RuntimeError::new(RuntimeErrorKind::UnknownFunction(name.to_string())))?
            .function_type()
            .return_type
            .is_void();
        let depth = self.state.frames.len();
        self.begin_call(name, args)?;
        while self.state.frames.len() > depth {
            self.step()?;
        }
        if returns_value {
            Ok(Some(self.state.stack.pop()?))
        } else {
            Ok(None)
        }
    }
}
