//! Declarators and declaration specifiers. A declarator describes how a
//! declared name relates to its base type (pointer/array/function wrapping);
//! resolution combines it with the base type into exactly one [CType].

use crate::prelude::*;
use crate::shared::types::{
    CArrayType, CBasicType, CFunctionType, CPointerType, CType, Parameter, Signedness, TypeError,
    TypeQualifiers, TypeResult, WidthModifier,
};
use crate::frontend::ast::Expression;

/// A recursively owned declarator chain, built bottom-up during a single
/// parse and never shared. `strong` marks a parenthesized sub-declarator,
/// which changes pointer/array/function binding precedence.
#[derive(Clone, Debug)]
pub struct Declarator {
    pub kind: DeclaratorKind,
    pub strong: bool,
}

#[derive(Clone, Debug)]
pub enum DeclaratorKind {
    /// The declared name itself.
    Identifier(String),
    /// An anonymous declarator, e.g. an abstract parameter declaration.
    Abstract,
    /// One or more pointer levels wrapping the inner declarator.
    Pointer {
        levels: Vec<PointerLevel>,
        inner: Box<Declarator>,
    },
    /// One array level wrapping the inner declarator. The length expression
    /// remains unresolved until type resolution const-folds it.
    Array {
        length: Option<Expression>,
        qualifiers: TypeQualifiers,
        inner: Box<Declarator>,
    },
    /// A function declarator wrapping the inner declarator.
    Function {
        parameters: Vec<ParameterDeclaration>,
        variadic: bool,
        inner: Box<Declarator>,
    },
}

/// A single `*` level with its qualifiers.
#[derive(Clone, Debug, Default)]
pub struct PointerLevel {
    pub qualifiers: TypeQualifiers,
}

/// An unresolved parameter declaration.
#[derive(Clone, Debug)]
pub struct ParameterDeclaration {
    pub specifiers: DeclarationSpecifiers,
    pub declarator: Option<Declarator>,
}

/// Storage class flags. Only typedef and default linkage matter here, the
/// remaining classes are accepted and ignored.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageClass {
    pub is_typedef: bool,
    pub is_extern: bool,
    pub is_static: bool,
    pub is_auto: bool,
    pub is_register: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeSpecifierKind {
    Builtin,
    Typename,
    Struct,
    Union,
    Enum,
}

/// A raw type-specifier token collected by the parser.
#[derive(Clone, Debug)]
pub struct TypeSpecifier {
    pub kind: TypeSpecifierKind,
    pub name: String,
}

/// The specifier part of a declaration, before any declarator applies.
#[derive(Clone, Debug, Default)]
pub struct DeclarationSpecifiers {
    pub storage: StorageClass,
    pub type_specifiers: Vec<TypeSpecifier>,
    pub qualifiers: TypeQualifiers,
}

impl DeclarationSpecifiers {
    /// Resolves the specifier list into the base type of the declaration.
    pub fn base_type(self: &Self, typedefs: &UnorderedMap<String, CType>) -> TypeResult {
        if let Some(builtin) = self.type_specifiers.iter().find(|ts| ts.kind == TypeSpecifierKind::Builtin) {
            if builtin.name == "void" {
                return Ok(CType::Void);
            }
            let mut signedness = Signedness::Signed;
            let mut width = WidthModifier::None;
            let mut name: Option<&str> = None;
            for specifier in &self.type_specifiers {
                match &specifier.name[..] {
                    "unsigned" => signedness = Signedness::Unsigned,
                    "signed" => signedness = Signedness::Signed,
                    "short" => width = WidthModifier::Short,
                    "long" => {
                        width = if width == WidthModifier::Long { WidthModifier::LongLong } else { WidthModifier::Long };
                    }
                    other => name = Some(other),
                }
            }
            if width == WidthModifier::LongLong {
                return Err(TypeError::Unsupported { what: "long long".to_string() });
            }
            return Ok(CType::Basic(CBasicType {
                name: name.unwrap_or("int").to_string(),
                signedness,
                width,
                qualifiers: self.qualifiers,
            }));
        }
        if let Some(typename) = self.type_specifiers.iter().find(|ts| ts.kind == TypeSpecifierKind::Typename) {
            return typedefs
                .get(&typename.name)
                .cloned()
                .ok_or_else(|| TypeError::Unsupported { what: format!("unknown type name '{}'", typename.name) });
        }
        if let Some(tagged) = self.type_specifiers.iter().find(|ts| {
            matches!(ts.kind, TypeSpecifierKind::Struct | TypeSpecifierKind::Union | TypeSpecifierKind::Enum)
        }) {
            let keyword = match tagged.kind {
                TypeSpecifierKind::Struct => "struct",
                TypeSpecifierKind::Union => "union",
                _ => "enum",
            };
            return Err(TypeError::Unsupported { what: format!("{} types", keyword) });
        }
        Err(TypeError::Unsupported { what: "declaration without type specifier".to_string() })
    }
}

impl Declarator {
    pub fn identifier(name: impl Into<String>) -> Self {
        Declarator { kind: DeclaratorKind::Identifier(name.into()), strong: false }
    }
    pub fn anonymous() -> Self {
        Declarator { kind: DeclaratorKind::Abstract, strong: false }
    }

    /// Walks the chain and returns the declared name, or an empty string for
    /// anonymous declarators.
    pub fn declared_identifier(self: &Self) -> &str {
        match &self.kind {
            DeclaratorKind::Identifier(name) => name,
            DeclaratorKind::Abstract => "",
            DeclaratorKind::Pointer { inner, .. }
            | DeclaratorKind::Array { inner, .. }
            | DeclaratorKind::Function { inner, .. } => inner.declared_identifier(),
        }
    }

    /// Returns whether the chain contains a strongly bound pointer. Such a
    /// declaration is a function pointer variable rather than a function
    /// declaration.
    pub fn has_strongly_bound_pointer(self: &Self) -> bool {
        match &self.kind {
            DeclaratorKind::Pointer { inner, .. } => self.strong || inner.has_strongly_bound_pointer(),
            DeclaratorKind::Array { inner, .. } | DeclaratorKind::Function { inner, .. } => {
                inner.has_strongly_bound_pointer()
            }
            DeclaratorKind::Identifier(_) | DeclaratorKind::Abstract => false,
        }
    }

    /// Resolves this declarator against the given base type into exactly one
    /// type.
    pub fn resolve(self: &Self, base: CType, typedefs: &UnorderedMap<String, CType>) -> TypeResult {
        match &self.kind {
            // the identifier is read separately as the declared name
            DeclaratorKind::Identifier(_) | DeclaratorKind::Abstract => Ok(base),
            DeclaratorKind::Pointer { levels, inner } => {
                let mut ty = base;
                let mut pointer_to_function = false;
                if self.strong {
                    // a parenthesized pointer binds tighter, resolve inside-out
                    ty = inner.resolve(ty, typedefs)?;
                    pointer_to_function = ty.is_function();
                }
                for level in levels {
                    ty = CType::Pointer(CPointerType {
                        inner: Box::new(ty),
                        qualifiers: level.qualifiers,
                    });
                }
                if !self.strong {
                    ty = inner.resolve(ty, typedefs)?;
                }
                // functions are themselves callable values, remove one level
                // of indirection for a pointer to a function
                if pointer_to_function {
                    if let CType::Pointer(pointer) = ty {
                        ty = *pointer.inner;
                    }
                }
                Ok(ty)
            }
            DeclaratorKind::Array { .. } => {
                let mut ty = base;
                let mut current = self;
                loop {
                    let DeclaratorKind::Array { length, qualifiers, inner } = &current.kind else {
                        break;
                    };
                    ty = CType::Array(CArrayType {
                        element: Box::new(ty),
                        length: resolve_length(length.as_ref())?,
                        qualifiers: *qualifiers,
                    });
                    if let DeclaratorKind::Array { inner: next_inner, .. } = &inner.kind {
                        match &next_inner.kind {
                            DeclaratorKind::Identifier(_) | DeclaratorKind::Abstract | DeclaratorKind::Array { .. } => {}
                            _ => {
                                ty = next_inner.resolve(ty, typedefs)?;
                            }
                        }
                        current = &**inner;
                    } else {
                        break;
                    }
                }
                Ok(ty)
            }
            DeclaratorKind::Function { parameters, variadic, inner } => {
                let mut function_parameters = Vec::new();
                for parameter in parameters {
                    let parameter_base = parameter.specifiers.base_type(typedefs)?;
                    let (name, ty) = match &parameter.declarator {
                        Some(declarator) => (
                            declarator.declared_identifier().to_string(),
                            declarator.resolve(parameter_base, typedefs)?,
                        ),
                        None => (String::new(), parameter_base),
                    };
                    // a single unnamed void parameter means "no parameters"
                    if !ty.is_void() {
                        function_parameters.push(Parameter { name, ty });
                    }
                }
                let ty = CType::Function(CFunctionType {
                    return_type: Box::new(base),
                    parameters: function_parameters,
                    variadic: *variadic,
                });
                inner.resolve(ty, typedefs)
            }
        }
    }
}

/// Const-folds an array length expression. `None` lengths stay open until an
/// initializer fixes them.
fn resolve_length(length: Option<&Expression>) -> TypeResult<Option<usize>> {
    match length {
        None => Ok(None),
        Some(expression) => match expression.constant_value() {
            Some(value) if value >= 0 => Ok(Some(value as usize)),
            _ => Err(TypeError::NonConstantLength),
        },
    }
}

/// Swaps a Pointer-over-Array pair into Array-over-Pointer order when a
/// strongly bound pointer wraps an array level, restoring the binding
/// precedence the parenthesis asks for.
pub fn fix_pointer_array_precedence(declarator: Declarator) -> Declarator {
    match declarator {
        Declarator {
            kind: DeclaratorKind::Pointer { levels, inner },
            strong: strong @ true,
        } => match *inner {
            Declarator {
                kind: DeclaratorKind::Array { length, qualifiers, inner: array_inner },
                strong: array_strong,
            } => Declarator {
                kind: DeclaratorKind::Array {
                    length,
                    qualifiers,
                    inner: Box::new(Declarator {
                        kind: DeclaratorKind::Pointer { levels, inner: array_inner },
                        strong,
                    }),
                },
                strong: array_strong,
            },
            other => Declarator {
                kind: DeclaratorKind::Pointer { levels, inner: Box::new(other) },
                strong,
            },
        },
        other => other,
    }
}
