//! Bytecode emitter. Walks the AST once; every expression node reports its
//! resolved type and emits its own instructions into the emission context.

pub mod error;

use crate::prelude::*;
use crate::shared::machine::MachineDescription;
use crate::shared::report::Report;
use crate::shared::types::{
    common_arithmetic_type, CBasicType, CFunctionType, CType, Signedness, TypeQualifiers, WidthModifier,
};
use crate::shared::value::Value;
use crate::frontend::ast::*;
use crate::bytecode::{
    CompiledFunction, Executable, Function, GlobalVariable, Instruction, LocalVariable, Operand,
    opcodes::OpCode,
};
use error::{CompileError, CompileErrorKind, CompileResult};

/// Compiles a parsed translation unit against the given machine description.
/// Emission errors become diagnostics and compilation continues with the next
/// function; callers must check the report's error count before trusting the
/// returned executable.
pub fn compile(unit: &TranslationUnit, machine: &MachineDescription, report: &mut Report) -> Executable {
    let mut functions: Vec<Function> = Vec::new();
    let mut function_index: UnorderedMap<String, (usize, CFunctionType)> = UnorderedMap::new();

    // machine intrinsics occupy the front of the function table
    for intrinsic in machine.intrinsics() {
        function_index.insert(
            intrinsic.name().to_string(),
            (functions.len(), intrinsic.function_type().clone()),
        );
        functions.push(Function::Intrinsic(intrinsic.clone()));
    }

    // global variable slots
    let mut globals: Vec<GlobalVariable> = Vec::new();
    let mut global_index: UnorderedMap<String, (usize, CType)> = UnorderedMap::new();
    let mut next_global_slot = 0;
    for variable in &unit.block.variables {
        match variable.ty.slot_count() {
            Some(slots) => {
                if global_index.contains_key(&variable.name) {
                    let error = CompileError::new(CompileErrorKind::AlreadyDefined(variable.name.clone()));
                    report.error(error.code(), error.to_string());
                    continue;
                }
                global_index.insert(variable.name.clone(), (next_global_slot, variable.ty.clone()));
                globals.push(GlobalVariable { name: variable.name.clone(), ty: variable.ty.clone() });
                next_global_slot += slots;
            }
            None => {
                let error = CompileError::new(CompileErrorKind::IncompleteType(variable.name.clone()));
                report.error(error.code(), error.to_string());
            }
        }
    }

    // assign function table indices up front so calls can reference functions
    // defined later in the unit
    let definitions: Vec<&FunctionDeclaration> = unit.block.functions.iter().filter(|f| f.body.is_some()).collect();
    let mut seen: Vec<&str> = Vec::new();
    for (offset, declaration) in definitions.iter().enumerate() {
        if seen.contains(&&declaration.name[..]) {
            let error = CompileError::new(CompileErrorKind::AlreadyDefined(declaration.name.clone()));
            report.error(error.code(), error.to_string());
        }
        seen.push(&declaration.name);
        function_index.insert(declaration.name.clone(), (functions.len() + offset, declaration.ty.clone()));
    }

    for declaration in definitions.iter().copied() {
        let compiled = compile_function(declaration, machine, &function_index, &global_index);
        functions.push(Function::Compiled(compiled.unwrap_or_else(|error| {
            report.error(error.code(), error.to_string());
            CompiledFunction {
                name: declaration.name.clone(),
                ty: declaration.ty.clone(),
                instructions: Vec::new(),
                local_variables: Vec::new(),
            }
        })));
    }

    // top-level initializer statements compile into a hidden startup
    // function the VM runs before the first call
    if !unit.block.statements.is_empty() {
        let startup = FunctionDeclaration {
            name: "__cinit".to_string(),
            ty: CFunctionType {
                return_type: Box::new(CType::Void),
                parameters: Vec::new(),
                variadic: false,
            },
            body: Some(Block {
                statements: unit.block.statements.clone(),
                variables: Vec::new(),
                functions: Vec::new(),
            }),
        };
        match compile_function(&startup, machine, &function_index, &global_index) {
            Ok(compiled) => functions.push(Function::Compiled(compiled)),
            Err(error) => report.error(error.code(), error.to_string()),
        }
    }

    Executable { functions, globals }
}

fn compile_function(
    declaration: &FunctionDeclaration,
    machine: &MachineDescription,
    functions: &UnorderedMap<String, (usize, CFunctionType)>,
    globals: &UnorderedMap<String, (usize, CType)>,
) -> CompileResult<CompiledFunction> {
    let body = declaration
        .body
        .as_ref()
        .ok_or_else(|| CompileError::internal("attempted to compile a function without a body"))?;
    let mut context = EmitContext::new(machine, functions, globals, declaration);
    context.emit_scoped_block(body)?;

    if declaration.ty.return_type.is_void() {
        // void functions return implicitly
        if !matches!(context.instructions.last().map(|i| i.op), Some(OpCode::Return)) {
            context.emit(OpCode::Return);
        }
    } else if !body.statements.iter().any(Statement::always_returns) {
        return Err(CompileError::new(CompileErrorKind::MissingReturn(declaration.name.clone())));
    }

    if !context.fixups.is_empty() {
        return Err(CompileError::internal("unpatched forward branch sites remain"));
    }

    Ok(CompiledFunction {
        name: declaration.name.clone(),
        ty: declaration.ty.clone(),
        instructions: context.instructions,
        local_variables: context.locals,
    })
}

/// Where a variable lives and how to access it.
struct Place {
    load: OpCode,
    store: OpCode,
    slot: usize,
    ty: CType,
}

struct LoopFrame {
    break_sites: Vec<usize>,
    continue_sites: Vec<usize>,
}

/// Mutable emission state for the function currently being lowered: the next
/// free local slot, the in-scope name to slot mappings, the growing
/// instruction list and the stack of unresolved forward-branch fixup sites.
pub struct EmitContext<'a> {
    machine: &'a MachineDescription,
    functions: &'a UnorderedMap<String, (usize, CFunctionType)>,
    globals: &'a UnorderedMap<String, (usize, CType)>,
    args: UnorderedMap<String, (usize, CType)>,
    scopes: Vec<UnorderedMap<String, (usize, CType)>>,
    locals: Vec<LocalVariable>,
    next_slot: usize,
    instructions: Vec<Instruction>,
    fixups: Vec<usize>,
    loops: Vec<LoopFrame>,
    return_type: CType,
    function_name: String,
}

impl<'a> EmitContext<'a> {
    fn new(
        machine: &'a MachineDescription,
        functions: &'a UnorderedMap<String, (usize, CFunctionType)>,
        globals: &'a UnorderedMap<String, (usize, CType)>,
        declaration: &FunctionDeclaration,
    ) -> Self {
        let mut args = UnorderedMap::new();
        for (slot, parameter) in declaration.ty.parameters.iter().enumerate() {
            args.insert(parameter.name.clone(), (slot, parameter.ty.clone()));
        }
        EmitContext {
            machine,
            functions,
            globals,
            args,
            scopes: Vec::new(),
            locals: Vec::new(),
            next_slot: 0,
            instructions: Vec::new(),
            fixups: Vec::new(),
            loops: Vec::new(),
            return_type: (*declaration.ty.return_type).clone(),
            function_name: declaration.name.clone(),
        }
    }

    fn position(self: &Self) -> usize {
        self.instructions.len()
    }
    fn emit(self: &mut Self, op: OpCode) -> usize {
        self.instructions.push(Instruction::new(op));
        self.instructions.len() - 1
    }
    fn emit_with(self: &mut Self, op: OpCode, operand: Operand) -> usize {
        self.instructions.push(Instruction::with(op, operand));
        self.instructions.len() - 1
    }
    /// Emits a branch with a placeholder target, pushing the site onto the
    /// fixup stack until the target instruction index is known.
    fn emit_branch(self: &mut Self, op: OpCode) -> usize {
        let site = self.emit_with(op, Operand::Target(usize::MAX));
        self.fixups.push(site);
        site
    }
    /// Patches the given fixup site to branch to the current position.
    fn patch_branch(self: &mut Self, site: usize) -> CompileResult {
        let index = self
            .fixups
            .iter()
            .rposition(|&s| s == site)
            .ok_or_else(|| CompileError::internal("branch fixup site is not on the fixup stack"))?;
        self.fixups.remove(index);
        let target = self.position();
        self.instructions[site].operand = Operand::Target(target);
        Ok(())
    }
    fn patch_site(self: &mut Self, site: usize, target: usize) {
        self.instructions[site].operand = Operand::Target(target);
    }

    /// Appends a conversion instruction, only when the two types differ in
    /// representation class.
    fn emit_cast(self: &mut Self, from: &CType, to: &CType) -> CompileResult {
        let from_class = from.arithmetic_class(self.machine)?;
        let to_class = to.arithmetic_class(self.machine)?;
        if from_class != to_class {
            self.emit_with(OpCode::Convert, Operand::Cast(to_class));
        }
        Ok(())
    }

    fn enter_scope(self: &mut Self) {
        self.scopes.push(UnorderedMap::new());
    }
    fn exit_scope(self: &mut Self) -> CompileResult {
        self.scopes
            .pop()
            .map(|_| ())
            .ok_or_else(|| CompileError::internal("emitter scope stack underflow"))
    }
    fn declare_local(self: &mut Self, variable: &VariableDeclaration) -> CompileResult<usize> {
        let slots = variable
            .ty
            .slot_count()
            .ok_or_else(|| CompileError::new(CompileErrorKind::IncompleteType(variable.name.clone())))?;
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| CompileError::internal("local declared outside of a scope"))?;
        if scope.contains_key(&variable.name) {
            return Err(CompileError::new(CompileErrorKind::AlreadyDefined(variable.name.clone())));
        }
        let slot = self.next_slot;
        scope.insert(variable.name.clone(), (slot, variable.ty.clone()));
        self.locals.push(LocalVariable { name: variable.name.clone(), ty: variable.ty.clone() });
        self.next_slot += slots;
        Ok(slot)
    }

    /// Resolves a name against locals, then arguments, then globals.
    fn lookup(self: &Self, name: &str) -> Option<Place> {
        for scope in self.scopes.iter().rev() {
            if let Some((slot, ty)) = scope.get(name) {
                return Some(Place { load: OpCode::LoadLocal, store: OpCode::StoreLocal, slot: *slot, ty: ty.clone() });
            }
        }
        if let Some((slot, ty)) = self.args.get(name) {
            return Some(Place { load: OpCode::LoadArg, store: OpCode::StoreArg, slot: *slot, ty: ty.clone() });
        }
        if let Some((slot, ty)) = self.globals.get(name) {
            return Some(Place { load: OpCode::LoadGlobal, store: OpCode::StoreGlobal, slot: *slot, ty: ty.clone() });
        }
        None
    }

    fn begin_loop(self: &mut Self) {
        self.loops.push(LoopFrame { break_sites: Vec::new(), continue_sites: Vec::new() });
    }
    /// Ends the current loop, pointing break sites at the current position
    /// and continue sites at the given target.
    fn end_loop(self: &mut Self, continue_target: usize) -> CompileResult {
        let frame = self
            .loops
            .pop()
            .ok_or_else(|| CompileError::internal("loop frame stack underflow"))?;
        let break_target = self.position();
        for site in frame.break_sites {
            self.patch_site(site, break_target);
        }
        for site in frame.continue_sites {
            self.patch_site(site, continue_target);
        }
        Ok(())
    }

    /// Emits a block in its own scope: declares its variables, then emits its
    /// statements in order.
    fn emit_scoped_block(self: &mut Self, block: &Block) -> CompileResult {
        self.enter_scope();
        for variable in &block.variables {
            self.declare_local(variable)?;
        }
        for statement in &block.statements {
            statement.emit(self)?;
        }
        self.exit_scope()
    }
}

impl Expression {
    /// Computes the type this expression evaluates to. Pure: never emits.
    pub fn resolved_type(self: &Self, context: &EmitContext<'_>) -> CompileResult<CType> {
        match self {
            Expression::Constant(constant) => match constant.value {
                ConstantValue::Integer(value) => {
                    if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
                        Ok(CType::basic("int"))
                    } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
                        Ok(CType::Basic(CBasicType {
                            name: "int".to_string(),
                            signedness: Signedness::Signed,
                            width: WidthModifier::Long,
                            qualifiers: TypeQualifiers::none(),
                        }))
                    } else {
                        Err(CompileError::new(CompileErrorKind::NotSupported(
                            format!("integer literal {} out of range", value),
                        )))
                    }
                }
                ConstantValue::Float(_) => Ok(CType::basic("double")),
            },
            Expression::Variable(variable) => context
                .lookup(&variable.name)
                .map(|place| place.ty)
                .ok_or_else(|| CompileError::new(CompileErrorKind::UndefinedName(variable.name.clone()))),
            Expression::Assign(assign) => assign.target.resolved_type(context),
            Expression::Binary(binary) => Ok(common_arithmetic_type(
                &binary.left.resolved_type(context)?,
                &binary.right.resolved_type(context)?,
                binary.op.as_str(),
                context.machine,
            )?),
            Expression::Relational(relational) => Ok(common_arithmetic_type(
                &relational.left.resolved_type(context)?,
                &relational.right.resolved_type(context)?,
                relational.op.as_str(),
                context.machine,
            )?),
            Expression::Sequence(sequence) => sequence.second.resolved_type(context),
            Expression::Structure(_) => Err(CompileError::new(CompileErrorKind::NotSupported(
                "structured initializers outside of a variable initializer".to_string(),
            ))),
            Expression::Call(call) => match context.functions.get(&call.function) {
                Some((_, function_type)) => Ok((*function_type.return_type).clone()),
                None => Err(CompileError::new(CompileErrorKind::UndefinedName(call.function.clone()))),
            },
            Expression::Unary(unary) => match unary.op {
                UnaryOp::LogicalNot => Ok(CType::basic("int")),
                _ => unary.operand.resolved_type(context),
            },
            Expression::Member(_) => Err(CompileError::new(CompileErrorKind::NotSupported(
                "member access".to_string(),
            ))),
        }
    }

    /// Emits the instructions computing this expression. Every expression
    /// leaves exactly one value on the operand stack, except assignments of
    /// structured initializers, which store their items directly.
    pub fn emit(self: &Self, context: &mut EmitContext<'_>) -> CompileResult {
        match self {
            Expression::Constant(constant) => {
                let ty = self.resolved_type(context)?;
                let class = ty.arithmetic_class(context.machine)?;
                let value = match constant.value {
                    ConstantValue::Integer(value) => Value::Int32(value as i32).convert(class),
                    ConstantValue::Float(value) => Value::Float64(value).convert(class),
                };
                context.emit_with(OpCode::LoadValue, Operand::Value(value));
                Ok(())
            }
            Expression::Variable(variable) => {
                let place = context
                    .lookup(&variable.name)
                    .ok_or_else(|| CompileError::new(CompileErrorKind::UndefinedName(variable.name.clone())))?;
                context.emit_with(place.load, Operand::Slot(place.slot));
                Ok(())
            }
            Expression::Assign(assign) => emit_assign(assign, context),
            Expression::Binary(binary) => emit_binary(binary, context),
            Expression::Relational(relational) => emit_relational(relational, context),
            Expression::Sequence(sequence) => {
                let first_type = sequence.first.resolved_type(context)?;
                sequence.first.emit(context)?;
                if leaves_value(&first_type) {
                    context.emit(OpCode::Pop);
                }
                sequence.second.emit(context)
            }
            Expression::Structure(_) => Err(CompileError::new(CompileErrorKind::NotSupported(
                "structured initializers outside of a variable initializer".to_string(),
            ))),
            Expression::Call(call) => emit_call(call, context),
            Expression::Unary(unary) => emit_unary(unary, context),
            Expression::Member(_) => Err(CompileError::new(CompileErrorKind::NotSupported(
                "member access".to_string(),
            ))),
        }
    }
}

/// Returns whether an expression of the given type leaves a value on the
/// operand stack that statement contexts must discard.
fn leaves_value(ty: &CType) -> bool {
    !ty.is_void() && !ty.is_array()
}

fn emit_assign(assign: &Assign, context: &mut EmitContext<'_>) -> CompileResult {
    let Expression::Variable(variable) = &assign.target else {
        return Err(CompileError::new(CompileErrorKind::NotSupported(
            "assignment to anything but a variable".to_string(),
        )));
    };
    let place = context
        .lookup(&variable.name)
        .ok_or_else(|| CompileError::new(CompileErrorKind::UndefinedName(variable.name.clone())))?;

    if let Expression::Structure(structure) = &assign.value {
        return emit_structure_assignment(structure, &place, &variable.name, context);
    }

    if place.ty.is_array() {
        return Err(CompileError::new(CompileErrorKind::NotSupported(
            "assignment to an array".to_string(),
        )));
    }

    let value_type = assign.value.resolved_type(context)?;
    if value_type.is_void() {
        return Err(CompileError::new(CompileErrorKind::VoidValue));
    }
    assign.value.emit(context)?;
    context.emit_cast(&value_type, &place.ty)?;
    // the stored value remains the value of the assignment expression
    context.emit(OpCode::Dup);
    context.emit_with(place.store, Operand::Slot(place.slot));
    Ok(())
}

/// Stores a structured initializer into consecutive array slots. Leaves no
/// value on the operand stack.
fn emit_structure_assignment(
    structure: &Structure,
    place: &Place,
    name: &str,
    context: &mut EmitContext<'_>,
) -> CompileResult {
    let CType::Array(array) = &place.ty else {
        return Err(CompileError::new(CompileErrorKind::NotSupported(
            "structured initializers for non-array variables".to_string(),
        )));
    };
    let length = array
        .length
        .ok_or_else(|| CompileError::new(CompileErrorKind::IncompleteType(name.to_string())))?;
    if structure.items.len() > length {
        return Err(CompileError::new(CompileErrorKind::TooManyInitializers(name.to_string())));
    }
    for (index, item) in structure.items.iter().enumerate() {
        if item.field.is_some() {
            return Err(CompileError::new(CompileErrorKind::NotSupported(
                "designated initializers in array initialization".to_string(),
            )));
        }
        let value_type = item.value.resolved_type(context)?;
        if value_type.is_void() {
            return Err(CompileError::new(CompileErrorKind::VoidValue));
        }
        item.value.emit(context)?;
        context.emit_cast(&value_type, &array.element)?;
        context.emit_with(place.store, Operand::Slot(place.slot + index));
    }
    Ok(())
}

/// Emits left, a cast to the common type, right, a cast to the common type,
/// then the family base opcode offset by the common type's class.
fn emit_binary(binary: &Binary, context: &mut EmitContext<'_>) -> CompileResult {
    let left_type = binary.left.resolved_type(context)?;
    let right_type = binary.right.resolved_type(context)?;
    let common = common_arithmetic_type(&left_type, &right_type, binary.op.as_str(), context.machine)?;

    binary.left.emit(context)?;
    context.emit_cast(&left_type, &common)?;
    binary.right.emit(context)?;
    context.emit_cast(&right_type, &common)?;

    let class = common.arithmetic_class(context.machine)?;
    let base = match binary.op {
        BinaryOp::Add => OpCode::AddInt16,
        BinaryOp::Subtract => OpCode::SubtractInt16,
        BinaryOp::Multiply => OpCode::MultiplyInt16,
        BinaryOp::Divide => OpCode::DivideInt16,
        BinaryOp::Modulo => OpCode::ModuloInt16,
        BinaryOp::ShiftLeft => OpCode::ShiftLeftInt16,
        BinaryOp::ShiftRight => OpCode::ShiftRightInt16,
        BinaryOp::BinaryAnd => OpCode::BinaryAndInt16,
        BinaryOp::BinaryOr => OpCode::BinaryOrInt16,
        BinaryOp::BinaryXor => OpCode::BinaryXorInt16,
    };
    context.emit(base.offset(class));
    Ok(())
}

/// Relational operators reduce to three physical comparisons: `!=`, `<=` and
/// `>=` emit the complementary primitive followed by a logical negation.
fn emit_relational(relational: &Relational, context: &mut EmitContext<'_>) -> CompileResult {
    let left_type = relational.left.resolved_type(context)?;
    let right_type = relational.right.resolved_type(context)?;
    let common = common_arithmetic_type(&left_type, &right_type, relational.op.as_str(), context.machine)?;

    relational.left.emit(context)?;
    context.emit_cast(&left_type, &common)?;
    relational.right.emit(context)?;
    context.emit_cast(&right_type, &common)?;

    let class = common.arithmetic_class(context.machine)?;
    match relational.op {
        RelationalOp::EqualTo => {
            context.emit(OpCode::EqualToInt16.offset(class));
        }
        RelationalOp::NotEqualTo => {
            context.emit(OpCode::EqualToInt16.offset(class));
            context.emit(OpCode::LogicalNot);
        }
        RelationalOp::LessThan => {
            context.emit(OpCode::LessThanInt16.offset(class));
        }
        RelationalOp::LessThanOrEqual => {
            context.emit(OpCode::GreaterThanInt16.offset(class));
            context.emit(OpCode::LogicalNot);
        }
        RelationalOp::GreaterThan => {
            context.emit(OpCode::GreaterThanInt16.offset(class));
        }
        RelationalOp::GreaterThanOrEqual => {
            context.emit(OpCode::LessThanInt16.offset(class));
            context.emit(OpCode::LogicalNot);
        }
    }
    Ok(())
}

/// Emits the arguments left to right, each cast to its parameter type, then
/// the call instruction.
fn emit_call(call: &Call, context: &mut EmitContext<'_>) -> CompileResult {
    let (index, function_type) = {
        let (index, function_type) = context
            .functions
            .get(&call.function)
            .ok_or_else(|| CompileError::new(CompileErrorKind::UndefinedName(call.function.clone())))?;
        (*index, function_type.clone())
    };
    let expected = function_type.parameters.len();
    let compatible = if function_type.variadic { call.args.len() >= expected } else { call.args.len() == expected };
    if !compatible {
        return Err(CompileError::new(CompileErrorKind::WrongArgumentCount {
            name: call.function.clone(),
            expected,
            got: call.args.len(),
        }));
    }
    for (position, arg) in call.args.iter().enumerate() {
        let arg_type = arg.resolved_type(context)?;
        if arg_type.is_void() {
            return Err(CompileError::new(CompileErrorKind::VoidValue));
        }
        arg.emit(context)?;
        if let Some(parameter) = function_type.parameters.get(position) {
            context.emit_cast(&arg_type, &parameter.ty)?;
        }
    }
    context.emit_with(OpCode::Call, Operand::Function(index));
    Ok(())
}

fn emit_unary(unary: &Unary, context: &mut EmitContext<'_>) -> CompileResult {
    match unary.op {
        UnaryOp::Negate => {
            let ty = unary.operand.resolved_type(context)?;
            if ty.is_void() {
                return Err(CompileError::new(CompileErrorKind::VoidValue));
            }
            unary.operand.emit(context)?;
            context.emit(OpCode::Negate);
            Ok(())
        }
        UnaryOp::LogicalNot => {
            let ty = unary.operand.resolved_type(context)?;
            if ty.is_void() {
                return Err(CompileError::new(CompileErrorKind::VoidValue));
            }
            unary.operand.emit(context)?;
            context.emit(OpCode::LogicalNot);
            Ok(())
        }
        UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
            let Expression::Variable(variable) = &unary.operand else {
                return Err(CompileError::new(CompileErrorKind::NotSupported(
                    "increment of anything but a variable".to_string(),
                )));
            };
            let place = context
                .lookup(&variable.name)
                .ok_or_else(|| CompileError::new(CompileErrorKind::UndefinedName(variable.name.clone())))?;
            let class = place.ty.arithmetic_class(context.machine)?;
            let one = Value::Int16(1).convert(class);
            let step = match unary.op {
                UnaryOp::PreIncrement | UnaryOp::PostIncrement => OpCode::AddInt16.offset(class),
                _ => OpCode::SubtractInt16.offset(class),
            };
            match unary.op {
                UnaryOp::PreIncrement | UnaryOp::PreDecrement => {
                    // leaves the updated value
                    context.emit_with(place.load, Operand::Slot(place.slot));
                    context.emit_with(OpCode::LoadValue, Operand::Value(one));
                    context.emit(step);
                    context.emit(OpCode::Dup);
                    context.emit_with(place.store, Operand::Slot(place.slot));
                }
                _ => {
                    // leaves the previous value
                    context.emit_with(place.load, Operand::Slot(place.slot));
                    context.emit(OpCode::Dup);
                    context.emit_with(OpCode::LoadValue, Operand::Value(one));
                    context.emit(step);
                    context.emit_with(place.store, Operand::Slot(place.slot));
                }
            }
            Ok(())
        }
    }
}

impl Statement {
    /// Emits the instructions executing this statement. Statements leave the
    /// operand stack at the depth they found it.
    pub fn emit(self: &Self, context: &mut EmitContext<'_>) -> CompileResult {
        match self {
            Statement::Empty => Ok(()),
            Statement::Expression(expression) => {
                let ty = expression.resolved_type(context)?;
                expression.emit(context)?;
                if leaves_value(&ty) {
                    context.emit(OpCode::Pop);
                }
                Ok(())
            }
            Statement::Block(block) => context.emit_scoped_block(block),
            Statement::If(if_statement) => {
                let condition_type = if_statement.condition.resolved_type(context)?;
                if condition_type.is_void() {
                    return Err(CompileError::new(CompileErrorKind::VoidValue));
                }
                if_statement.condition.emit(context)?;
                let to_else = context.emit_branch(OpCode::BranchIfFalse);
                if_statement.then_body.emit(context)?;
                match &if_statement.else_body {
                    Some(else_body) => {
                        let to_end = context.emit_branch(OpCode::Jump);
                        context.patch_branch(to_else)?;
                        else_body.emit(context)?;
                        context.patch_branch(to_end)
                    }
                    None => context.patch_branch(to_else),
                }
            }
            Statement::While(while_statement) => {
                let start = context.position();
                context.begin_loop();
                let condition_type = while_statement.condition.resolved_type(context)?;
                if condition_type.is_void() {
                    return Err(CompileError::new(CompileErrorKind::VoidValue));
                }
                while_statement.condition.emit(context)?;
                let exit = context.emit_branch(OpCode::BranchIfFalse);
                while_statement.body.emit(context)?;
                context.emit_with(OpCode::Jump, Operand::Target(start));
                context.patch_branch(exit)?;
                context.end_loop(start)
            }
            Statement::DoWhile(do_statement) => {
                let start = context.position();
                context.begin_loop();
                do_statement.body.emit(context)?;
                let continue_target = context.position();
                let condition_type = do_statement.condition.resolved_type(context)?;
                if condition_type.is_void() {
                    return Err(CompileError::new(CompileErrorKind::VoidValue));
                }
                do_statement.condition.emit(context)?;
                let exit = context.emit_branch(OpCode::BranchIfFalse);
                context.emit_with(OpCode::Jump, Operand::Target(start));
                context.patch_branch(exit)?;
                context.end_loop(continue_target)
            }
            Statement::For(for_statement) => {
                context.enter_scope();
                for variable in &for_statement.init.variables {
                    context.declare_local(variable)?;
                }
                for statement in &for_statement.init.statements {
                    statement.emit(context)?;
                }
                let start = context.position();
                context.begin_loop();
                let exit = match &for_statement.condition {
                    Some(condition) => {
                        let condition_type = condition.resolved_type(context)?;
                        if condition_type.is_void() {
                            return Err(CompileError::new(CompileErrorKind::VoidValue));
                        }
                        condition.emit(context)?;
                        Some(context.emit_branch(OpCode::BranchIfFalse))
                    }
                    None => None,
                };
                for_statement.body.emit(context)?;
                let continue_target = context.position();
                if let Some(next) = &for_statement.next {
                    let next_type = next.resolved_type(context)?;
                    next.emit(context)?;
                    if leaves_value(&next_type) {
                        context.emit(OpCode::Pop);
                    }
                }
                context.emit_with(OpCode::Jump, Operand::Target(start));
                if let Some(exit) = exit {
                    context.patch_branch(exit)?;
                }
                context.end_loop(continue_target)?;
                context.exit_scope()
            }
            Statement::Break(_) => {
                let site = context.emit_with(OpCode::Jump, Operand::Target(usize::MAX));
                match context.loops.last_mut() {
                    Some(frame) => {
                        frame.break_sites.push(site);
                        Ok(())
                    }
                    None => Err(CompileError::new(CompileErrorKind::NoEnclosingLoop)),
                }
            }
            Statement::Continue(_) => {
                let site = context.emit_with(OpCode::Jump, Operand::Target(usize::MAX));
                match context.loops.last_mut() {
                    Some(frame) => {
                        frame.continue_sites.push(site);
                        Ok(())
                    }
                    None => Err(CompileError::new(CompileErrorKind::NoEnclosingLoop)),
                }
            }
            Statement::Return(return_statement) => {
                match &return_statement.value {
                    Some(value) => {
                        if context.return_type.is_void() {
                            return Err(CompileError::new(CompileErrorKind::ReturnValueNotAllowed(
                                context.function_name.clone(),
                            )));
                        }
                        let value_type = value.resolved_type(context)?;
                        if value_type.is_void() {
                            return Err(CompileError::new(CompileErrorKind::VoidValue));
                        }
                        value.emit(context)?;
                        let return_type = context.return_type.clone();
                        context.emit_cast(&value_type, &return_type)?;
                    }
                    None => {
                        if !context.return_type.is_void() {
                            return Err(CompileError::new(CompileErrorKind::ReturnValueRequired(
                                context.function_name.clone(),
                            )));
                        }
                    }
                }
                context.emit(OpCode::Return);
                Ok(())
            }
        }
    }
}
