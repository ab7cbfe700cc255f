//! Nom parsers over the token stream, generating translation units. Parsing
//! recovers from errors at top-level construct boundaries: the error is
//! classified, reported to the diagnostic sink and parsing resumes, so one
//! pass produces batch diagnostics and a (possibly incomplete) unit.

pub mod error;
mod state;
mod tokens;

use nom::combinator::opt;
use nom::multi::{many1, separated_list0, separated_list1};
use nom::sequence::preceded;
use crate::prelude::*;
use crate::shared::report::Report;
use crate::shared::types::{CType, TypeError, TypeQualifiers};
use crate::frontend::ast::*;
use crate::frontend::declarator::{
    fix_pointer_array_precedence, Declarator, DeclaratorKind, DeclarationSpecifiers,
    ParameterDeclaration, PointerLevel, TypeSpecifier, TypeSpecifierKind,
};
use crate::frontend::lexer::token::{Token, TokenKind};
use error::{ParseError, ParseErrorKind};
pub use state::ParserOptions;
use state::ParserState;
use tokens::{identifier, token, Failure, Input, Output};

/// Parses the given token stream into a translation unit, reporting
/// diagnostics to the given sink. Always consumes the whole stream; callers
/// must check the report's error count before trusting the result.
pub fn parse(tokens: &[Token], report: &mut Report, options: ParserOptions) -> TranslationUnit {
    let state = Rc::new(RefCell::new(ParserState::new(options)));
    let mut input = Input::new(tokens, state.clone());
    while !input.is_empty() {
        match external_declaration(input.clone()) {
            Ok((rest, ())) => input = rest,
            Err(nom::Err::Error(failure)) | Err(nom::Err::Failure(failure)) => {
                report_failure(&failure, report);
                // drop scope frames opened by the failed construct
                let mut state = failure.input.state.borrow_mut();
                while state.scopes.len() > 1 {
                    state.scopes.pop();
                }
                drop(state);
                input = recover(failure.input);
            }
            Err(nom::Err::Incomplete(_)) => {
                report.error(9001, "Internal compiler error: incomplete input");
                break;
            }
        }
    }
    let mut state = state.borrow_mut();
    if state.scopes.len() != 1 {
        report.error(9001, "Internal compiler error: unbalanced scope stack");
    }
    let block = state.scopes.drain(..).next().unwrap_or_default();
    TranslationUnit {
        block,
        typedefs: std::mem::take(&mut state.typedefs),
    }
}

fn report_failure(failure: &Failure<'_>, report: &mut Report) {
    let position = failure.input.max_parsed_position().unwrap_or_else(|| failure.input.position());
    let error = ParseError::new(failure.kind.clone(), position);
    let verbose = failure.input.state.borrow().options.verbose_errors;
    let message = match (&failure.kind, verbose, failure.input.first()) {
        (ParseErrorKind::SyntaxError, true, Some(token)) => format!("{} near '{}'", error, token.kind),
        _ => error.to_string(),
    };
    report.error(error.code(), message);
}

/// Skips to the next top-level production boundary: a semicolon outside
/// braces or the closing brace of the current construct.
fn recover(input: Input<'_>) -> Input<'_> {
    let mut depth = 0usize;
    let mut index = 0usize;
    while let Some(token) = input.tokens.get(index) {
        index += 1;
        match token.kind {
            TokenKind::LBrace => depth += 1,
            TokenKind::RBrace => {
                if depth <= 1 {
                    return input.advance(index);
                }
                depth -= 1;
            }
            TokenKind::Semicolon if depth == 0 => return input.advance(index),
            _ => {}
        }
    }
    input.advance(index)
}

fn type_failure<'a>(input: Input<'a>, error: TypeError) -> nom::Err<Failure<'a>> {
    let kind = match error {
        TypeError::Unsupported { what } => ParseErrorKind::NotSupported(what),
        TypeError::NonConstantLength => ParseErrorKind::NotSupported("non-constant array lengths".to_string()),
        other => ParseErrorKind::NotSupported(other.to_string()),
    };
    nom::Err::Failure(Failure::new(input, kind))
}

// translation unit level

fn external_declaration(i: Input<'_>) -> Output<'_, ()> {
    match function_definition(i.clone()) {
        Ok(result) => Ok(result),
        Err(nom::Err::Error(_)) => top_level_declaration(i),
        Err(failure) => Err(failure),
    }
}

fn function_definition(i: Input<'_>) -> Output<'_, ()> {
    let (i, specifiers) = declaration_specifiers(i)?;
    let (i, declarator) = declarator(i)?;
    // only a definition when a body follows
    if !matches!(i.first().map(|t| &t.kind), Some(TokenKind::LBrace)) {
        return Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)));
    }
    let ty = {
        let state = i.state.borrow();
        let base = specifiers.base_type(&state.typedefs).map_err(|e| type_failure(i.clone(), e))?;
        declarator.resolve(base, &state.typedefs).map_err(|e| type_failure(i.clone(), e))?
    };
    let CType::Function(function_type) = ty else {
        return Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)));
    };
    let name = declarator.declared_identifier().to_string();
    let (i, body) = compound_statement(i)?;
    i.state.borrow_mut().current_scope().functions.push(FunctionDeclaration {
        name,
        ty: function_type,
        body: Some(body),
    });
    Ok((i, ()))
}

fn top_level_declaration(i: Input<'_>) -> Output<'_, ()> {
    let (i, statements) = declaration(i)?;
    i.state.borrow_mut().current_scope().statements.extend(statements);
    Ok((i, ()))
}

// declarations

/// An initializer attached to a declarator.
#[derive(Clone, Debug)]
enum Initializer {
    Expression(Expression),
    Structured(Vec<StructuredInitializerItem>),
}

#[derive(Clone, Debug)]
struct StructuredInitializerItem {
    designators: Vec<String>,
    value: Initializer,
}

/// Parses one declaration and installs its declarators into the current
/// scope, returning the statements its initializers lower into.
fn declaration(i: Input<'_>) -> Output<'_, Vec<Statement>> {
    let (i, specifiers) = declaration_specifiers(i)?;
    if let Ok((i, _)) = token(TokenKind::Semicolon)(i.clone()) {
        return Ok((i, Vec::new()));
    }
    let (i, declarators) = separated_list1(token(TokenKind::Comma), init_declarator)(i)?;
    let (i, _) = token(TokenKind::Semicolon)(i)?;
    let mut statements = Vec::new();
    for (declarator, initializer) in declarators {
        statements.extend(install_declaration(&i, &specifiers, declarator, initializer)?);
    }
    Ok((i, statements))
}

fn init_declarator(i: Input<'_>) -> Output<'_, (Declarator, Option<Initializer>)> {
    let (i, declarator) = declarator(i)?;
    let (i, initializer) = opt(preceded(token(TokenKind::Assign), initializer))(i)?;
    Ok((i, (declarator, initializer)))
}

/// Installs one declarator. Typedefs update the live typedef table before the
/// next token is classified. A declaration resolving to a function type
/// without a strongly bound pointer becomes a function declaration, all
/// others become variables, with array length inference applied first.
fn install_declaration<'a>(
    i: &Input<'a>,
    specifiers: &DeclarationSpecifiers,
    declarator: Declarator,
    initializer: Option<Initializer>,
) -> Result<Vec<Statement>, nom::Err<Failure<'a>>> {
    let mut state = i.state.borrow_mut();
    let base = specifiers.base_type(&state.typedefs).map_err(|e| type_failure(i.clone(), e))?;
    let mut ty = declarator.resolve(base, &state.typedefs).map_err(|e| type_failure(i.clone(), e))?;
    let name = declarator.declared_identifier().to_string();

    if specifiers.storage.is_typedef {
        state.typedefs.insert(name, ty);
        return Ok(Vec::new());
    }

    if let CType::Function(function_type) = ty {
        if !declarator.has_strongly_bound_pointer() {
            state.current_scope().functions.push(FunctionDeclaration {
                name,
                ty: function_type,
                body: None,
            });
            return Ok(Vec::new());
        }
        ty = CType::Function(function_type);
    }

    // an open array length is fixed by its initializer list, counting one
    // unit per item and one unit per designator on designated items
    if let CType::Array(array) = &mut ty {
        if array.length.is_none() {
            if let Some(Initializer::Structured(items)) = &initializer {
                let mut length = 0;
                for item in items {
                    if item.designators.is_empty() {
                        length += 1;
                    } else {
                        for _ in &item.designators {
                            length += 1;
                        }
                    }
                }
                array.length = Some(length);
            }
        }
    }

    let position = i.position();
    state.current_scope().variables.push(VariableDeclaration { name: name.clone(), ty });

    if let Some(initializer) = initializer {
        let value = initializer_expression(initializer, position);
        Ok(vec![Statement::Expression(Expression::Assign(Box::new(Assign {
            target: Expression::Variable(Variable { name, position }),
            value,
        })))])
    } else {
        Ok(Vec::new())
    }
}

/// Lowers an initializer into an expression. Structured initializers become
/// Structure expressions; a designated item contributes one structure item
/// per designator, all carrying the same value.
fn initializer_expression(initializer: Initializer, position: u32) -> Expression {
    match initializer {
        Initializer::Expression(expression) => expression,
        Initializer::Structured(items) => {
            let mut structure_items = Vec::new();
            for item in items {
                let value = initializer_expression(item.value, position);
                if item.designators.is_empty() {
                    structure_items.push(StructureItem { field: None, value });
                } else {
                    for designator in item.designators {
                        structure_items.push(StructureItem {
                            field: Some(designator),
                            value: value.clone(),
                        });
                    }
                }
            }
            Expression::Structure(Structure { items: structure_items, position })
        }
    }
}

fn initializer(i: Input<'_>) -> Output<'_, Initializer> {
    if matches!(i.first().map(|t| &t.kind), Some(TokenKind::LBrace)) {
        structured_initializer(i)
    } else {
        let (i, expression) = assignment_expression(i)?;
        Ok((i, Initializer::Expression(expression)))
    }
}

fn structured_initializer(i: Input<'_>) -> Output<'_, Initializer> {
    let (i, _) = token(TokenKind::LBrace)(i)?;
    let (i, items) = separated_list0(token(TokenKind::Comma), structured_item)(i)?;
    let (i, _) = opt(token(TokenKind::Comma))(i)?;
    let (i, _) = token(TokenKind::RBrace)(i)?;
    Ok((i, Initializer::Structured(items)))
}

fn structured_item(i: Input<'_>) -> Output<'_, StructuredInitializerItem> {
    let (i, designators) = opt(nom::sequence::terminated(many1(designator), token(TokenKind::Assign)))(i)?;
    let (i, value) = initializer(i)?;
    Ok((i, StructuredInitializerItem { designators: designators.unwrap_or_default(), value }))
}

fn designator(i: Input<'_>) -> Output<'_, String> {
    if matches!(i.first().map(|t| &t.kind), Some(TokenKind::LBracket)) {
        return Failure::fail(i, ParseErrorKind::NotImplemented("array index designators"));
    }
    let (i, _) = token(TokenKind::Dot)(i)?;
    let (i, (name, _)) = identifier(i)?;
    Ok((i, name))
}

/// Collects declaration specifiers: storage classes, qualifiers and type
/// specifier tokens. An identifier counts as a type specifier only while no
/// other type specifier was collected and the live typedef predicate knows it.
fn declaration_specifiers(i: Input<'_>) -> Output<'_, DeclarationSpecifiers> {
    let mut specifiers = DeclarationSpecifiers::default();
    let mut input = i.clone();
    let mut matched = false;
    loop {
        let Some(next) = input.first() else { break };
        match &next.kind {
            TokenKind::Typedef => specifiers.storage.is_typedef = true,
            TokenKind::Extern => specifiers.storage.is_extern = true,
            TokenKind::Static => specifiers.storage.is_static = true,
            TokenKind::Auto => specifiers.storage.is_auto = true,
            TokenKind::Register => specifiers.storage.is_register = true,
            TokenKind::Const => specifiers.qualifiers.constant = true,
            TokenKind::Volatile => specifiers.qualifiers.volatile = true,
            TokenKind::Restrict => specifiers.qualifiers.restrict = true,
            TokenKind::Void
            | TokenKind::Char
            | TokenKind::Int
            | TokenKind::Short
            | TokenKind::Long
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Signed
            | TokenKind::Unsigned => specifiers.type_specifiers.push(TypeSpecifier {
                kind: TypeSpecifierKind::Builtin,
                name: next.kind.to_string(),
            }),
            TokenKind::Struct => return Failure::fail(input, ParseErrorKind::NotSupported("struct types".to_string())),
            TokenKind::Union => return Failure::fail(input, ParseErrorKind::NotSupported("union types".to_string())),
            TokenKind::Enum => return Failure::fail(input, ParseErrorKind::NotSupported("enum types".to_string())),
            TokenKind::Identifier(name)
                if specifiers.type_specifiers.is_empty() && input.state.borrow().is_typedef(name) =>
            {
                specifiers.type_specifiers.push(TypeSpecifier {
                    kind: TypeSpecifierKind::Typename,
                    name: name.clone(),
                });
            }
            _ => break,
        }
        matched = true;
        input = input.advance(1);
    }
    if !matched {
        input.update_max_parsed();
        return Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)));
    }
    Ok((input, specifiers))
}

// declarators

fn declarator(i: Input<'_>) -> Output<'_, Declarator> {
    let (i, levels) = pointer_levels(i)?;
    let (i, direct) = direct_declarator(i)?;
    if levels.is_empty() {
        if matches!(direct.kind, DeclaratorKind::Abstract) {
            // an empty declarator must not consume nothing
            return Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)));
        }
        Ok((i, direct))
    } else {
        Ok((i, Declarator {
            kind: DeclaratorKind::Pointer { levels, inner: Box::new(direct) },
            strong: false,
        }))
    }
}

fn pointer_levels(i: Input<'_>) -> Output<'_, Vec<PointerLevel>> {
    let mut input = i;
    let mut levels = Vec::new();
    while let Ok((i, _)) = token(TokenKind::Star)(input.clone()) {
        let (i, qualifiers) = type_qualifiers(i)?;
        levels.push(PointerLevel { qualifiers });
        input = i;
    }
    Ok((input, levels))
}

fn type_qualifiers(i: Input<'_>) -> Output<'_, TypeQualifiers> {
    let mut input = i;
    let mut qualifiers = TypeQualifiers::none();
    loop {
        match input.first().map(|t| &t.kind) {
            Some(TokenKind::Const) => qualifiers.constant = true,
            Some(TokenKind::Volatile) => qualifiers.volatile = true,
            Some(TokenKind::Restrict) => qualifiers.restrict = true,
            _ => break,
        }
        input = input.advance(1);
    }
    Ok((input, qualifiers))
}

fn direct_declarator(i: Input<'_>) -> Output<'_, Declarator> {
    // base: a name, a parenthesized declarator or an abstract declarator
    let (mut input, mut result) = if let Ok((i, (name, _))) = identifier(i.clone()) {
        (i, Declarator::identifier(name))
    } else if let Ok((i, inner)) = parenthesized_declarator(i.clone()) {
        (i, inner)
    } else {
        (i, Declarator::anonymous())
    };
    // suffixes: array levels and parameter lists
    loop {
        if let Ok((i, _)) = token(TokenKind::LBracket)(input.clone()) {
            let (i, qualifiers) = type_qualifiers(i)?;
            let (i, length) = opt(assignment_expression)(i)?;
            let (i, _) = token(TokenKind::RBracket)(i)?;
            result = make_array_declarator(result, qualifiers, length);
            input = i;
        } else if let Ok((i, _)) = token(TokenKind::LParen)(input.clone()) {
            let (i, (parameters, variadic)) = parameter_list(i)?;
            result = Declarator {
                kind: DeclaratorKind::Function { parameters, variadic, inner: Box::new(result) },
                strong: false,
            };
            input = i;
        } else {
            break;
        }
    }
    Ok((input, result))
}

fn parenthesized_declarator(i: Input<'_>) -> Output<'_, Declarator> {
    let (i, _) = token(TokenKind::LParen)(i)?;
    let (i, mut inner) = declarator(i)?;
    let (i, _) = token(TokenKind::RParen)(i)?;
    inner.strong = true;
    Ok((i, fix_pointer_array_precedence(inner)))
}

/// Attaches one array level to a declarator. A strongly bound declarator
/// keeps its position and the array level is inserted beneath it.
fn make_array_declarator(left: Declarator, qualifiers: TypeQualifiers, length: Option<Expression>) -> Declarator {
    if left.strong {
        let strong = left.strong;
        match left.kind {
            DeclaratorKind::Pointer { levels, inner } => Declarator {
                kind: DeclaratorKind::Pointer {
                    levels,
                    inner: Box::new(Declarator {
                        kind: DeclaratorKind::Array { length, qualifiers, inner },
                        strong: false,
                    }),
                },
                strong,
            },
            DeclaratorKind::Array { length: outer_length, qualifiers: outer_qualifiers, inner } => Declarator {
                kind: DeclaratorKind::Array {
                    length: outer_length,
                    qualifiers: outer_qualifiers,
                    inner: Box::new(Declarator {
                        kind: DeclaratorKind::Array { length, qualifiers, inner },
                        strong: false,
                    }),
                },
                strong,
            },
            DeclaratorKind::Function { parameters, variadic, inner } => Declarator {
                kind: DeclaratorKind::Function {
                    parameters,
                    variadic,
                    inner: Box::new(Declarator {
                        kind: DeclaratorKind::Array { length, qualifiers, inner },
                        strong: false,
                    }),
                },
                strong,
            },
            kind @ (DeclaratorKind::Identifier(_) | DeclaratorKind::Abstract) => Declarator {
                kind: DeclaratorKind::Array {
                    length,
                    qualifiers,
                    inner: Box::new(Declarator { kind, strong }),
                },
                strong: false,
            },
        }
    } else {
        Declarator {
            kind: DeclaratorKind::Array { length, qualifiers, inner: Box::new(left) },
            strong: false,
        }
    }
}

fn parameter_list(i: Input<'_>) -> Output<'_, (Vec<ParameterDeclaration>, bool)> {
    if let Ok((i, _)) = token(TokenKind::RParen)(i.clone()) {
        return Ok((i, (Vec::new(), false)));
    }
    let (i, parameters) = separated_list1(token(TokenKind::Comma), parameter_declaration)(i)?;
    let (i, variadic) = opt(preceded(token(TokenKind::Comma), token(TokenKind::Ellipsis)))(i)?;
    let (i, _) = token(TokenKind::RParen)(i)?;
    Ok((i, (parameters, variadic.is_some())))
}

fn parameter_declaration(i: Input<'_>) -> Output<'_, ParameterDeclaration> {
    let (i, specifiers) = declaration_specifiers(i)?;
    let (i, declarator) = opt(declarator)(i)?;
    Ok((i, ParameterDeclaration { specifiers, declarator }))
}

// statements

fn statement(i: Input<'_>) -> Output<'_, Statement> {
    match i.first().map(|t| &t.kind) {
        Some(TokenKind::LBrace) => {
            let (i, block) = compound_statement(i)?;
            Ok((i, Statement::Block(block)))
        }
        Some(TokenKind::If) => if_statement(i),
        Some(TokenKind::While) => while_statement(i),
        Some(TokenKind::Do) => do_statement(i),
        Some(TokenKind::For) => for_statement(i),
        Some(TokenKind::Return) => return_statement(i),
        Some(TokenKind::Break) => {
            let (i, position) = token(TokenKind::Break)(i)?;
            let (i, _) = token(TokenKind::Semicolon)(i)?;
            Ok((i, Statement::Break(position)))
        }
        Some(TokenKind::Continue) => {
            let (i, position) = token(TokenKind::Continue)(i)?;
            let (i, _) = token(TokenKind::Semicolon)(i)?;
            Ok((i, Statement::Continue(position)))
        }
        Some(TokenKind::Semicolon) => {
            let (i, _) = token(TokenKind::Semicolon)(i)?;
            Ok((i, Statement::Empty))
        }
        Some(TokenKind::Switch) | Some(TokenKind::Case) | Some(TokenKind::Default) => {
            Failure::fail(i, ParseErrorKind::NotImplemented("switch statements"))
        }
        Some(TokenKind::Goto) => Failure::fail(i, ParseErrorKind::NotImplemented("goto")),
        _ => expression_statement(i),
    }
}

fn expression_statement(i: Input<'_>) -> Output<'_, Statement> {
    let (i, expression) = expression(i)?;
    let (i, _) = token(TokenKind::Semicolon)(i)?;
    Ok((i, Statement::Expression(expression)))
}

/// Parses a compound statement. Enters a fresh scope frame on `{` and leaves
/// it on the matching `}`; entries and exits are strictly paired.
fn compound_statement(i: Input<'_>) -> Output<'_, Block> {
    let (i, _) = token(TokenKind::LBrace)(i)?;
    i.state.borrow_mut().begin_scope();
    let mut input = i;
    let mut statements = Vec::new();
    loop {
        if let Ok((i, _)) = token(TokenKind::RBrace)(input.clone()) {
            input = i;
            break;
        }
        let (i, mut items) = block_item(input)?;
        statements.append(&mut items);
        input = i;
    }
    let block = input.state.borrow_mut().end_scope();
    match block {
        Some(mut block) => {
            block.statements = statements;
            Ok((input, block))
        }
        None => Failure::fail(input, ParseErrorKind::InternalError("scope stack underflow".to_string())),
    }
}

fn block_item(i: Input<'_>) -> Output<'_, Vec<Statement>> {
    match declaration(i.clone()) {
        Ok(result) => Ok(result),
        Err(nom::Err::Error(_)) => {
            let (i, statement) = statement(i)?;
            Ok((i, vec![statement]))
        }
        Err(failure) => Err(failure),
    }
}

fn if_statement(i: Input<'_>) -> Output<'_, Statement> {
    let (i, _) = token(TokenKind::If)(i)?;
    let (i, _) = token(TokenKind::LParen)(i)?;
    let (i, condition) = expression(i)?;
    let (i, _) = token(TokenKind::RParen)(i)?;
    let (i, then_body) = statement(i)?;
    let (i, else_body) = opt(preceded(token(TokenKind::Else), statement))(i)?;
    Ok((i, Statement::If(Box::new(If { condition, then_body, else_body }))))
}

fn while_statement(i: Input<'_>) -> Output<'_, Statement> {
    let (i, _) = token(TokenKind::While)(i)?;
    let (i, _) = token(TokenKind::LParen)(i)?;
    let (i, condition) = expression(i)?;
    let (i, _) = token(TokenKind::RParen)(i)?;
    let (i, body) = statement(i)?;
    Ok((i, Statement::While(Box::new(While { condition, body }))))
}

fn do_statement(i: Input<'_>) -> Output<'_, Statement> {
    let (i, _) = token(TokenKind::Do)(i)?;
    let (i, body) = statement(i)?;
    let (i, _) = token(TokenKind::While)(i)?;
    let (i, _) = token(TokenKind::LParen)(i)?;
    let (i, condition) = expression(i)?;
    let (i, _) = token(TokenKind::RParen)(i)?;
    let (i, _) = token(TokenKind::Semicolon)(i)?;
    Ok((i, Statement::DoWhile(Box::new(DoWhile { body, condition }))))
}

/// Parses a for loop. The init clause lives in its own one-statement block so
/// comma-joined init expressions and loop declarations share one scope.
fn for_statement(i: Input<'_>) -> Output<'_, Statement> {
    let (i, _) = token(TokenKind::For)(i)?;
    let (i, _) = token(TokenKind::LParen)(i)?;
    i.state.borrow_mut().begin_scope();

    let (i, init_statements) = match i.first().map(|t| &t.kind) {
        Some(TokenKind::Semicolon) => {
            let (i, _) = token(TokenKind::Semicolon)(i)?;
            (i, Vec::new())
        }
        _ => match declaration(i.clone()) {
            Ok(result) => result,
            Err(nom::Err::Error(_)) => {
                let (i, statement) = expression_statement(i)?;
                (i, vec![statement])
            }
            Err(failure) => return Err(failure),
        },
    };

    let (i, condition) = opt(expression)(i)?;
    let (i, _) = token(TokenKind::Semicolon)(i)?;
    let (i, next) = opt(expression)(i)?;
    let (i, _) = token(TokenKind::RParen)(i)?;
    let (i, body) = statement(i)?;

    let block = i.state.borrow_mut().end_scope();
    match block {
        Some(mut init) => {
            init.statements = init_statements;
            Ok((i, Statement::For(Box::new(For { init, condition, next, body }))))
        }
        None => Failure::fail(i, ParseErrorKind::InternalError("scope stack underflow".to_string())),
    }
}

fn return_statement(i: Input<'_>) -> Output<'_, Statement> {
    let (i, position) = token(TokenKind::Return)(i)?;
    let (i, value) = opt(expression)(i)?;
    let (i, _) = token(TokenKind::Semicolon)(i)?;
    Ok((i, Statement::Return(Return { value, position })))
}

// expressions, loosest binding first

/// Full expression including the comma operator, which folds left so that
/// `a, b, c` becomes `Sequence(Sequence(a, b), c)`.
fn expression(i: Input<'_>) -> Output<'_, Expression> {
    let (mut input, mut result) = assignment_expression(i)?;
    loop {
        match preceded(token(TokenKind::Comma), assignment_expression)(input.clone()) {
            Ok((i, second)) => {
                result = Expression::Sequence(Box::new(Sequence { first: result, second }));
                input = i;
            }
            Err(nom::Err::Error(_)) => break,
            Err(failure) => return Err(failure),
        }
    }
    Ok((input, result))
}

fn assignment_expression(i: Input<'_>) -> Output<'_, Expression> {
    // try: unary-expression assignment-operator assignment-expression
    if let Ok((after_target, target)) = unary_expression(i.clone()) {
        if let Ok((after_op, op)) = assignment_operator(after_target.clone()) {
            let (i, value) = assignment_expression(after_op)?;
            let value = match op {
                None => value,
                // compound assignment lowers to target = target op value
                Some(op) => Expression::Binary(Box::new(Binary {
                    left: target.clone(),
                    op,
                    right: value,
                })),
            };
            return Ok((i, Expression::Assign(Box::new(Assign { target, value }))));
        }
    }
    binary_expression(i)
}

/// The assignment operator: `None` for plain `=`, the lowered binary operator
/// for compound assignments.
fn assignment_operator(i: Input<'_>) -> Output<'_, Option<BinaryOp>> {
    let op = match i.first().map(|t| &t.kind) {
        Some(TokenKind::Assign) => None,
        Some(TokenKind::PlusAssign) => Some(BinaryOp::Add),
        Some(TokenKind::MinusAssign) => Some(BinaryOp::Subtract),
        Some(TokenKind::StarAssign) => Some(BinaryOp::Multiply),
        Some(TokenKind::SlashAssign) => Some(BinaryOp::Divide),
        Some(TokenKind::PercentAssign) => Some(BinaryOp::Modulo),
        Some(TokenKind::ShlAssign) => Some(BinaryOp::ShiftLeft),
        Some(TokenKind::ShrAssign) => Some(BinaryOp::ShiftRight),
        Some(TokenKind::AmpAssign) => Some(BinaryOp::BinaryAnd),
        Some(TokenKind::PipeAssign) => Some(BinaryOp::BinaryOr),
        Some(TokenKind::CaretAssign) => Some(BinaryOp::BinaryXor),
        _ => {
            i.update_max_parsed();
            return Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)));
        }
    };
    Ok((i.advance(1), op))
}

fn binary_expression(i: Input<'_>) -> Output<'_, Expression> {
    let (i, result) = bitor_expression(i)?;
    // recognized operators outside the implemented expression surface
    match i.first().map(|t| &t.kind) {
        Some(TokenKind::Question) => Failure::fail(i, ParseErrorKind::NotImplemented("the conditional operator")),
        Some(TokenKind::AmpAmp) | Some(TokenKind::PipePipe) => {
            Failure::fail(i, ParseErrorKind::NotImplemented("logical operators"))
        }
        _ => Ok((i, result)),
    }
}

fn binary_level<'a>(
    i: Input<'a>,
    next: fn(Input<'a>) -> Output<'a, Expression>,
    table: &[(TokenKind, BinaryOp)],
) -> Output<'a, Expression> {
    let (mut input, mut result) = next(i)?;
    'fold: loop {
        for (kind, op) in table {
            if let Ok((i, _)) = token(kind.clone())(input.clone()) {
                let (i, right) = next(i)?;
                result = Expression::Binary(Box::new(Binary { left: result, op: *op, right }));
                input = i;
                continue 'fold;
            }
        }
        break;
    }
    Ok((input, result))
}

fn relational_level<'a>(
    i: Input<'a>,
    next: fn(Input<'a>) -> Output<'a, Expression>,
    table: &[(TokenKind, RelationalOp)],
) -> Output<'a, Expression> {
    let (mut input, mut result) = next(i)?;
    'fold: loop {
        for (kind, op) in table {
            if let Ok((i, _)) = token(kind.clone())(input.clone()) {
                let (i, right) = next(i)?;
                result = Expression::Relational(Box::new(Relational { left: result, op: *op, right }));
                input = i;
                continue 'fold;
            }
        }
        break;
    }
    Ok((input, result))
}

fn bitor_expression(i: Input<'_>) -> Output<'_, Expression> {
    binary_level(i, bitxor_expression, &[(TokenKind::Pipe, BinaryOp::BinaryOr)])
}

fn bitxor_expression(i: Input<'_>) -> Output<'_, Expression> {
    binary_level(i, bitand_expression, &[(TokenKind::Caret, BinaryOp::BinaryXor)])
}

fn bitand_expression(i: Input<'_>) -> Output<'_, Expression> {
    binary_level(i, equality_expression, &[(TokenKind::Amp, BinaryOp::BinaryAnd)])
}

fn equality_expression(i: Input<'_>) -> Output<'_, Expression> {
    relational_level(i, relational_expression, &[
        (TokenKind::EqEq, RelationalOp::EqualTo),
        (TokenKind::BangEq, RelationalOp::NotEqualTo),
    ])
}

fn relational_expression(i: Input<'_>) -> Output<'_, Expression> {
    relational_level(i, shift_expression, &[
        (TokenKind::LtEq, RelationalOp::LessThanOrEqual),
        (TokenKind::GtEq, RelationalOp::GreaterThanOrEqual),
        (TokenKind::Lt, RelationalOp::LessThan),
        (TokenKind::Gt, RelationalOp::GreaterThan),
    ])
}

fn shift_expression(i: Input<'_>) -> Output<'_, Expression> {
    binary_level(i, additive_expression, &[
        (TokenKind::Shl, BinaryOp::ShiftLeft),
        (TokenKind::Shr, BinaryOp::ShiftRight),
    ])
}

fn additive_expression(i: Input<'_>) -> Output<'_, Expression> {
    binary_level(i, multiplicative_expression, &[
        (TokenKind::Plus, BinaryOp::Add),
        (TokenKind::Minus, BinaryOp::Subtract),
    ])
}

fn multiplicative_expression(i: Input<'_>) -> Output<'_, Expression> {
    binary_level(i, unary_expression, &[
        (TokenKind::Star, BinaryOp::Multiply),
        (TokenKind::Slash, BinaryOp::Divide),
        (TokenKind::Percent, BinaryOp::Modulo),
    ])
}

fn unary_expression(i: Input<'_>) -> Output<'_, Expression> {
    match i.first().map(|t| &t.kind) {
        Some(TokenKind::Minus) => {
            let (i, operand) = unary_expression(i.advance(1))?;
            // negation of a literal folds into a negative constant
            let expression = match operand {
                Expression::Constant(Constant { value: ConstantValue::Integer(value), position }) => {
                    Expression::Constant(Constant { value: ConstantValue::Integer(value.wrapping_neg()), position })
                }
                Expression::Constant(Constant { value: ConstantValue::Float(value), position }) => {
                    Expression::Constant(Constant { value: ConstantValue::Float(-value), position })
                }
                operand => Expression::Unary(Box::new(Unary { op: UnaryOp::Negate, operand })),
            };
            Ok((i, expression))
        }
        Some(TokenKind::Plus) => unary_expression(i.advance(1)),
        Some(TokenKind::Bang) => {
            let (i, operand) = unary_expression(i.advance(1))?;
            Ok((i, Expression::Unary(Box::new(Unary { op: UnaryOp::LogicalNot, operand }))))
        }
        Some(TokenKind::PlusPlus) => {
            let (i, operand) = unary_expression(i.advance(1))?;
            Ok((i, Expression::Unary(Box::new(Unary { op: UnaryOp::PreIncrement, operand }))))
        }
        Some(TokenKind::MinusMinus) => {
            let (i, operand) = unary_expression(i.advance(1))?;
            Ok((i, Expression::Unary(Box::new(Unary { op: UnaryOp::PreDecrement, operand }))))
        }
        Some(TokenKind::Star) => Failure::fail(i, ParseErrorKind::NotImplemented("pointer dereference")),
        Some(TokenKind::Amp) => Failure::fail(i, ParseErrorKind::NotImplemented("the address-of operator")),
        Some(TokenKind::Tilde) => Failure::fail(i, ParseErrorKind::NotImplemented("bitwise complement")),
        Some(TokenKind::Sizeof) => Failure::fail(i, ParseErrorKind::NotSupported("sizeof".to_string())),
        _ => postfix_expression(i),
    }
}

fn postfix_expression(i: Input<'_>) -> Output<'_, Expression> {
    let (mut input, mut result) = primary_expression(i)?;
    loop {
        match input.first().map(|t| &t.kind) {
            Some(TokenKind::LParen) => {
                let (function, position) = match &result {
                    Expression::Variable(variable) => (variable.name.clone(), variable.position),
                    _ => return Failure::fail(input, ParseErrorKind::NotImplemented("indirect function calls")),
                };
                let (i, _) = token(TokenKind::LParen)(input.clone())?;
                let (i, args) = separated_list0(token(TokenKind::Comma), assignment_expression)(i)?;
                let (i, _) = token(TokenKind::RParen)(i)?;
                result = Expression::Call(Call { function, args, position });
                input = i;
            }
            Some(TokenKind::Dot) => {
                let (i, _) = token(TokenKind::Dot)(input)?;
                let (i, (field, _)) = identifier(i)?;
                result = Expression::Member(Box::new(Member { instance: result, field }));
                input = i;
            }
            Some(TokenKind::Arrow) => {
                return Failure::fail(input, ParseErrorKind::NotImplemented("pointer member access"));
            }
            Some(TokenKind::LBracket) => {
                return Failure::fail(input, ParseErrorKind::NotImplemented("array subscripts"));
            }
            Some(TokenKind::PlusPlus) => {
                result = Expression::Unary(Box::new(Unary { op: UnaryOp::PostIncrement, operand: result }));
                input = input.advance(1);
            }
            Some(TokenKind::MinusMinus) => {
                result = Expression::Unary(Box::new(Unary { op: UnaryOp::PostDecrement, operand: result }));
                input = input.advance(1);
            }
            _ => break,
        }
    }
    Ok((input, result))
}

fn primary_expression(i: Input<'_>) -> Output<'_, Expression> {
    match i.first() {
        Some(Token { kind: TokenKind::IntLiteral(value), position }) => Ok((
            i.advance(1),
            Expression::Constant(Constant { value: ConstantValue::Integer(*value), position: *position }),
        )),
        Some(Token { kind: TokenKind::FloatLiteral(value), position }) => Ok((
            i.advance(1),
            Expression::Constant(Constant { value: ConstantValue::Float(*value), position: *position }),
        )),
        Some(Token { kind: TokenKind::StringLiteral(_), .. }) => {
            Failure::fail(i, ParseErrorKind::NotSupported("string literals".to_string()))
        }
        Some(Token { kind: TokenKind::Identifier(name), position }) => Ok((
            i.advance(1),
            Expression::Variable(Variable { name: name.clone(), position: *position }),
        )),
        Some(Token { kind: TokenKind::LParen, .. }) => {
            let (i, _) = token(TokenKind::LParen)(i)?;
            let (i, expression) = expression(i)?;
            let (i, _) = token(TokenKind::RParen)(i)?;
            Ok((i, expression))
        }
        _ => {
            i.update_max_parsed();
            Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)))
        }
    }
}
