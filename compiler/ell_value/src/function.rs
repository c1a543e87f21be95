//! Function declarations.

use std::fmt;
use std::rc::Rc;

use crate::active;
use crate::error::EmitResult;
use crate::intrinsics::Intrinsic;
use crate::layout::MemoryLayout;
use crate::value::Value;
use crate::value_type::ValueType;

/// Definition body of a function. Receives one value per parameter and
/// returns the result, or `None` for a `Void` function.
pub type FunctionBody = Rc<dyn Fn(&[Value]) -> EmitResult<Option<Value>>>;

/// A named, typed formal parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: ValueType,
    pub layout: MemoryLayout,
}

impl Parameter {
    /// Passed by value when rank 0, by reference otherwise.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.layout.is_scalar()
    }
}

/// Name, signature, and optional definition of a callable.
#[derive(Clone)]
pub struct FunctionDeclaration {
    name: String,
    return_type: ValueType,
    parameters: Vec<Parameter>,
    definition: Option<FunctionBody>,
    intrinsic: Option<Intrinsic>,
}

impl FunctionDeclaration {
    /// A `Void`, parameterless, undefined declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: ValueType::Void,
            parameters: Vec::new(),
            definition: None,
            intrinsic: None,
        }
    }

    pub(crate) fn intrinsic_declaration(intrinsic: Intrinsic) -> Self {
        Self {
            intrinsic: Some(intrinsic),
            ..Self::new(intrinsic.name())
        }
    }

    #[must_use]
    pub fn returns(mut self, ty: ValueType) -> Self {
        self.return_type = ty;
        self
    }

    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, ty: ValueType, layout: MemoryLayout) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            ty,
            layout,
        });
        self
    }

    /// Rank-0 parameter shorthand.
    #[must_use]
    pub fn scalar_parameter(self, name: impl Into<String>, ty: ValueType) -> Self {
        self.parameter(name, ty, MemoryLayout::scalar())
    }

    /// Attach a definition without emitting it. Backends use this to hand
    /// back the declaration they registered.
    #[must_use]
    pub fn with_definition(mut self, body: FunctionBody) -> Self {
        self.definition = Some(body);
        self
    }

    /// Define the function in the active context.
    pub fn define(
        &self,
        body: impl Fn(&[Value]) -> EmitResult<Option<Value>> + 'static,
    ) -> EmitResult<FunctionDeclaration> {
        active::create_function(self, Rc::new(body))
    }

    /// Call the function in the active context.
    pub fn call(&self, args: &[Value]) -> EmitResult<Option<Value>> {
        active::call(self, args)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    #[inline]
    pub fn returns_void(&self) -> bool {
        self.return_type == ValueType::Void
    }

    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.definition.is_some()
    }

    pub fn definition(&self) -> Option<&FunctionBody> {
        self.definition.as_ref()
    }

    #[inline]
    pub fn intrinsic(&self) -> Option<Intrinsic> {
        self.intrinsic
    }

    #[inline]
    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic.is_some()
    }
}

impl fmt::Debug for FunctionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDeclaration")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("parameters", &self.parameters)
            .field("defined", &self.is_defined())
            .field("intrinsic", &self.intrinsic)
            .finish()
    }
}
