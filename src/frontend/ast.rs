//! The expression and statement AST. Each expression node can report its
//! resolved type and emit its own bytecode; those two capabilities are
//! implemented by the bytecode emitter.

use crate::prelude::*;
use crate::shared::types::{CType, CFunctionType};
use crate::frontend::lexer::token::Position;

/// A closed set of expression variants.
#[derive(Clone, Debug)]
pub enum Expression {
    Constant(Constant),
    Variable(Variable),
    Assign(Box<Assign>),
    Binary(Box<Binary>),
    Relational(Box<Relational>),
    Sequence(Box<Sequence>),
    Structure(Structure),
    Call(Call),
    Unary(Box<Unary>),
    Member(Box<Member>),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConstantValue {
    Integer(i64),
    Float(f64),
}

#[derive(Clone, Debug)]
pub struct Constant {
    pub value: ConstantValue,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct Assign {
    pub target: Expression,
    pub value: Expression,
}

#[derive(Clone, Debug)]
pub struct Binary {
    pub left: Expression,
    pub op: BinaryOp,
    pub right: Expression,
}

#[derive(Clone, Debug)]
pub struct Relational {
    pub left: Expression,
    pub op: RelationalOp,
    pub right: Expression,
}

/// The comma operator: evaluates First, discards its value, then evaluates
/// Second whose value becomes the value of the whole expression.
#[derive(Clone, Debug)]
pub struct Sequence {
    pub first: Expression,
    pub second: Expression,
}

/// A structured initializer. Items are either positional or name a field.
#[derive(Clone, Debug)]
pub struct Structure {
    pub items: Vec<StructureItem>,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct StructureItem {
    pub field: Option<String>,
    pub value: Expression,
}

#[derive(Clone, Debug)]
pub struct Call {
    pub function: String,
    pub args: Vec<Expression>,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Expression,
}

#[derive(Clone, Debug)]
pub struct Member {
    pub instance: Expression,
    pub field: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    ShiftLeft,
    ShiftRight,
    BinaryAnd,
    BinaryOr,
    BinaryXor,
}

impl BinaryOp {
    pub fn as_str(self: Self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BinaryAnd => "&",
            BinaryOp::BinaryOr => "|",
            BinaryOp::BinaryXor => "^",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RelationalOp {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl RelationalOp {
    pub fn as_str(self: Self) -> &'static str {
        match self {
            RelationalOp::EqualTo => "==",
            RelationalOp::NotEqualTo => "!=",
            RelationalOp::LessThan => "<",
            RelationalOp::LessThanOrEqual => "<=",
            RelationalOp::GreaterThan => ">",
            RelationalOp::GreaterThanOrEqual => ">=",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl Expression {
    /// Folds the expression to an integer constant, if it is one.
    pub fn constant_value(self: &Self) -> Option<i64> {
        match self {
            Expression::Constant(constant) => match constant.value {
                ConstantValue::Integer(value) => Some(value),
                ConstantValue::Float(_) => None,
            },
            Expression::Unary(unary) if unary.op == UnaryOp::Negate => {
                unary.operand.constant_value().map(|v| v.wrapping_neg())
            }
            Expression::Binary(binary) => {
                let left = binary.left.constant_value()?;
                let right = binary.right.constant_value()?;
                Some(match binary.op {
                    BinaryOp::Add => left.wrapping_add(right),
                    BinaryOp::Subtract => left.wrapping_sub(right),
                    BinaryOp::Multiply => left.wrapping_mul(right),
                    BinaryOp::Divide if right != 0 => left.wrapping_div(right),
                    BinaryOp::Modulo if right != 0 => left.wrapping_rem(right),
                    BinaryOp::ShiftLeft => left.wrapping_shl(right as u32),
                    BinaryOp::ShiftRight => left.wrapping_shr(right as u32),
                    BinaryOp::BinaryAnd => left & right,
                    BinaryOp::BinaryOr => left | right,
                    BinaryOp::BinaryXor => left ^ right,
                    _ => return None,
                })
            }
            Expression::Sequence(sequence) => sequence.second.constant_value(),
            _ => None,
        }
    }
}

impl Display for Expression {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(constant) => match constant.value {
                ConstantValue::Integer(value) => write!(f, "{}", value),
                ConstantValue::Float(value) => write!(f, "{}", value),
            },
            Expression::Variable(variable) => write!(f, "{}", variable.name),
            Expression::Assign(assign) => write!(f, "({} = {})", assign.target, assign.value),
            Expression::Binary(binary) => write!(f, "({} {} {})", binary.left, binary.op.as_str(), binary.right),
            Expression::Relational(relational) => write!(f, "({} {} {})", relational.left, relational.op.as_str(), relational.right),
            Expression::Sequence(sequence) => write!(f, "({}, {})", sequence.first, sequence.second),
            Expression::Structure(structure) => {
                write!(f, "{{ ")?;
                for (index, item) in structure.items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    match &item.field {
                        Some(field) => write!(f, ".{} = {}", field, item.value)?,
                        None => write!(f, "{}", item.value)?,
                    }
                }
                write!(f, " }}")
            }
            Expression::Call(call) => {
                write!(f, "{}(", call.function)?;
                for (index, arg) in call.args.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Unary(unary) => match unary.op {
                UnaryOp::Negate => write!(f, "(-{})", unary.operand),
                UnaryOp::LogicalNot => write!(f, "(!{})", unary.operand),
                UnaryOp::PreIncrement => write!(f, "(++{})", unary.operand),
                UnaryOp::PreDecrement => write!(f, "(--{})", unary.operand),
                UnaryOp::PostIncrement => write!(f, "({}++)", unary.operand),
                UnaryOp::PostDecrement => write!(f, "({}--)", unary.operand),
            },
            Expression::Member(member) => write!(f, "{}.{}", member.instance, member.field),
        }
    }
}

/// A closed set of statement variants.
#[derive(Clone, Debug)]
pub enum Statement {
    Empty,
    Expression(Expression),
    Block(Block),
    If(Box<If>),
    While(Box<While>),
    DoWhile(Box<DoWhile>),
    For(Box<For>),
    Break(Position),
    Continue(Position),
    Return(Return),
}

#[derive(Clone, Debug)]
pub struct If {
    pub condition: Expression,
    pub then_body: Statement,
    pub else_body: Option<Statement>,
}

#[derive(Clone, Debug)]
pub struct While {
    pub condition: Expression,
    pub body: Statement,
}

#[derive(Clone, Debug)]
pub struct DoWhile {
    pub body: Statement,
    pub condition: Expression,
}

/// A for loop. The init clause is itself a one-statement [Block] so that
/// comma-joined init expressions and C99 loop declarations share one scope.
#[derive(Clone, Debug)]
pub struct For {
    pub init: Block,
    pub condition: Option<Expression>,
    pub next: Option<Expression>,
    pub body: Statement,
}

#[derive(Clone, Debug)]
pub struct Return {
    pub value: Option<Expression>,
    pub position: Position,
}

/// A lexical scope: an ordered sequence of statements plus the variables and
/// nested function declarations installed in it.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub variables: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }
    /// Looks up a variable declared directly in this block.
    pub fn variable(self: &Self, name: &str) -> Option<&VariableDeclaration> {
        self.variables.iter().find(|v| v.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    pub name: String,
    pub ty: CType,
}

/// A function declaration. A missing body marks an external declaration
/// resolved against the machine's intrinsic table.
#[derive(Clone, Debug)]
pub struct FunctionDeclaration {
    pub name: String,
    pub ty: CFunctionType,
    pub body: Option<Block>,
}

/// The top-level scope holding all declarations of one compiled source, plus
/// the typedef names it registered.
#[derive(Debug, Default)]
pub struct TranslationUnit {
    pub block: Block,
    pub typedefs: UnorderedMap<String, CType>,
}

impl TranslationUnit {
    /// Looks up a top-level function declaration by name.
    pub fn function(self: &Self, name: &str) -> Option<&FunctionDeclaration> {
        self.block.functions.iter().find(|f| f.name == name)
    }
}

impl Statement {
    /// Returns whether every control flow path through this statement returns.
    pub fn always_returns(self: &Self) -> bool {
        match self {
            Statement::Return(_) => true,
            Statement::Block(block) => block.statements.iter().any(Statement::always_returns),
            Statement::If(if_statement) => match &if_statement.else_body {
                Some(else_body) => if_statement.then_body.always_returns() && else_body.always_returns(),
                None => false,
            },
            _ => false,
        }
    }
}
