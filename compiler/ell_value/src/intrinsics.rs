//! The fixed intrinsic table and the math functions built on it.

use std::fmt;

use crate::active;
use crate::error::{EmitError, EmitResult};
use crate::function::FunctionDeclaration;
use crate::layout::MemoryLayout;
use crate::scalar::{Elementwise, Scalar, Vector};
use crate::value::Value;
use crate::value_type::ValueType;

/// Math functions every backend provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Abs,
    Cos,
    Exp,
    Log,
    MaxNum,
    MinNum,
    Pow,
    Sin,
    Sqrt,
    Tanh,
}

impl Intrinsic {
    pub const ALL: [Intrinsic; 10] = [
        Intrinsic::Abs,
        Intrinsic::Cos,
        Intrinsic::Exp,
        Intrinsic::Log,
        Intrinsic::MaxNum,
        Intrinsic::MinNum,
        Intrinsic::Pow,
        Intrinsic::Sin,
        Intrinsic::Sqrt,
        Intrinsic::Tanh,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Intrinsic::Abs => "abs",
            Intrinsic::Cos => "cos",
            Intrinsic::Exp => "exp",
            Intrinsic::Log => "log",
            Intrinsic::MaxNum => "maxnum",
            Intrinsic::MinNum => "minnum",
            Intrinsic::Pow => "pow",
            Intrinsic::Sin => "sin",
            Intrinsic::Sqrt => "sqrt",
            Intrinsic::Tanh => "tanh",
        }
    }

    /// One argument, applied elementwise.
    pub const fn is_unary(self) -> bool {
        !matches!(self, Intrinsic::MaxNum | Intrinsic::MinNum | Intrinsic::Pow)
    }

    /// Accepts integral as well as `Double` elements.
    pub const fn accepts_integral(self) -> bool {
        matches!(self, Intrinsic::Abs | Intrinsic::MaxNum | Intrinsic::MinNum)
    }

    /// Nominal `Double` signature. Calls are checked by
    /// [`check_intrinsic_call`] rather than against these parameters.
    pub fn declaration(self) -> FunctionDeclaration {
        let decl = FunctionDeclaration::intrinsic_declaration(self).returns(ValueType::Double);
        match self {
            Intrinsic::MaxNum | Intrinsic::MinNum => decl
                .scalar_parameter("a", ValueType::Double)
                .scalar_parameter("b", ValueType::Double),
            Intrinsic::Pow => decl
                .scalar_parameter("base", ValueType::Double)
                .scalar_parameter("exponent", ValueType::Double),
            Intrinsic::Abs
            | Intrinsic::Cos
            | Intrinsic::Exp
            | Intrinsic::Log
            | Intrinsic::Sin
            | Intrinsic::Sqrt
            | Intrinsic::Tanh => decl.scalar_parameter("x", ValueType::Double),
        }
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check the shape rules of an intrinsic call.
///
/// Returns an undefined value with the type and layout of the result.
pub fn check_intrinsic_call(intrinsic: Intrinsic, args: &[Value]) -> EmitResult<Value> {
    let arity = if intrinsic.is_unary() { 1..=1 } else { 1..=2 };
    if !arity.contains(&args.len()) || (intrinsic == Intrinsic::Pow && args.len() != 2) {
        return Err(EmitError::invalid_argument(format!(
            "`{intrinsic}` called with {} arguments",
            args.len()
        )));
    }
    for arg in args {
        arg.ensure_defined()?;
    }

    let ty = args[0].base_type();
    let element_ok = ty.is_floating_point() || (intrinsic.accepts_integral() && ty.is_integral());
    if !element_ok {
        return Err(EmitError::TypeMismatch {
            expected: ValueType::Double,
            found: ty,
        });
    }
    if let Some(second) = args.get(1) {
        if second.base_type() != ty {
            return Err(EmitError::TypeMismatch {
                expected: ty,
                found: second.base_type(),
            });
        }
    }

    let first = args[0].layout()?;
    let layout = match intrinsic {
        Intrinsic::MaxNum | Intrinsic::MinNum if args.len() == 1 => {
            if first.num_dimensions() != 1 {
                return Err(EmitError::invalid_argument(format!(
                    "`{intrinsic}` reduces a vector, got rank {}",
                    first.num_dimensions()
                )));
            }
            if first.num_elements() == 0 {
                return Err(EmitError::invalid_argument(format!(
                    "`{intrinsic}` of an empty vector"
                )));
            }
            MemoryLayout::scalar()
        }
        Intrinsic::MaxNum | Intrinsic::MinNum => {
            if !first.is_scalar() || !args[1].layout()?.is_scalar() {
                return Err(EmitError::invalid_argument(format!(
                    "`{intrinsic}` of two values requires scalars"
                )));
            }
            MemoryLayout::scalar()
        }
        Intrinsic::Pow => {
            if !args[1].layout()?.is_scalar() {
                return Err(EmitError::invalid_argument("`pow` exponent must be a scalar"));
            }
            MemoryLayout::new(first.logical_size())?
        }
        Intrinsic::Abs
        | Intrinsic::Cos
        | Intrinsic::Exp
        | Intrinsic::Log
        | Intrinsic::Sin
        | Intrinsic::Sqrt
        | Intrinsic::Tanh => {
            MemoryLayout::new(first.logical_size())?
        }
    };
    Ok(Value::with_layout(ty, layout))
}

fn call_intrinsic(intrinsic: Intrinsic, args: &[Value]) -> EmitResult<Value> {
    active::call(&intrinsic.declaration(), args)?.ok_or_else(|| {
        EmitError::Backend(format!("`{intrinsic}` produced no result"))
    })
}

fn unary<T: Elementwise>(intrinsic: Intrinsic, x: &T) -> EmitResult<T> {
    T::from_value(call_intrinsic(intrinsic, &[x.as_value().clone()])?)
}

pub fn abs<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Abs, x)
}

pub fn cos<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Cos, x)
}

pub fn exp<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Exp, x)
}

pub fn log<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Log, x)
}

pub fn sin<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Sin, x)
}

pub fn sqrt<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Sqrt, x)
}

pub fn tanh<T: Elementwise>(x: &T) -> EmitResult<T> {
    unary(Intrinsic::Tanh, x)
}

/// `base` raised to `exponent`, elementwise.
pub fn pow<T: Elementwise>(base: &T, exponent: &Scalar) -> EmitResult<T> {
    let args = [base.as_value().clone(), exponent.value().clone()];
    T::from_value(call_intrinsic(Intrinsic::Pow, &args)?)
}

pub fn max(a: &Scalar, b: &Scalar) -> EmitResult<Scalar> {
    let args = [a.value().clone(), b.value().clone()];
    Scalar::new(call_intrinsic(Intrinsic::MaxNum, &args)?)
}

pub fn min(a: &Scalar, b: &Scalar) -> EmitResult<Scalar> {
    let args = [a.value().clone(), b.value().clone()];
    Scalar::new(call_intrinsic(Intrinsic::MinNum, &args)?)
}

/// Largest element of a non-empty vector.
pub fn max_element(v: &Vector) -> EmitResult<Scalar> {
    Scalar::new(call_intrinsic(Intrinsic::MaxNum, &[v.value().clone()])?)
}

/// Smallest element of a non-empty vector.
pub fn min_element(v: &Vector) -> EmitResult<Scalar> {
    Scalar::new(call_intrinsic(Intrinsic::MinNum, &[v.value().clone()])?)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
