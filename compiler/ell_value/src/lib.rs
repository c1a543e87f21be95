//! ELL Value - Backend-Neutral Emission Layer
//!
//! This crate contains the typed operation surface the ELL graph compiler
//! emits code through:
//! - `ValueType`, the closed set of element and pointer kinds
//! - `MemoryLayout`, multi-dimensional shape and addressing
//! - `Value`, `Scalar` and `Vector`, typed views on backend storage
//! - `FunctionDeclaration` and the ten math intrinsics
//! - `EmitterContext`, the trait every backend implements
//! - the per-thread active context and its `ContextGuard`
//! - `ComputeContext`, a backend that executes operations on the host
//!
//! # Design
//!
//! - **Validate, then lower**: `EmitterContext` provided methods check every
//!   precondition; backends only implement the `*_impl` hooks.
//! - **Scoped activation**: free functions dispatch to the innermost
//!   context pushed by a live `ContextGuard`, and fail with `IllegalState`
//!   otherwise.
//! - **Opaque handles**: a `Value` refers to backend objects through a
//!   `Copy` `Emittable` id that only the issuing backend interprets.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use ell_value::{ComputeContext, ConstantData, ContextGuard, Vector};
//!
//! let ctx = Rc::new(ComputeContext::new("example"));
//! let _guard = ContextGuard::new(ctx.clone());
//!
//! let v = Vector::constant(vec![1.0, 4.0, 9.0]).unwrap();
//! let roots = ell_value::sqrt(&v).unwrap();
//! assert_eq!(ctx.read(roots.value()).unwrap(), ConstantData::Double(vec![1.0, 2.0, 3.0]));
//! ```

pub mod active;
mod compute;
mod context;
mod error;
mod function;
mod intrinsics;
mod layout;
mod scalar;
mod value;
mod value_type;

pub use active::{get_context, has_context, with_context, ContextGuard};
pub use compute::ComputeContext;
pub use context::{
    EmitterContext, GlobalAllocationScope, IfBody, IfContext, IfContextImpl, ValueBinaryOperation,
    ValueLogicalOperation, ValueUnaryOperation,
};
pub use error::{EmitError, EmitResult};
pub use function::{FunctionBody, FunctionDeclaration, Parameter};
pub use intrinsics::{
    abs, check_intrinsic_call, cos, exp, log, max, max_element, min, min_element, pow, sin, sqrt,
    tanh, Intrinsic,
};
pub use layout::{calculate_offset, LogicalCoordinates, MemoryLayout};
pub use scalar::{Elementwise, Scalar, Vector};
pub use value::{ConstantData, Element, Emittable, Value};
pub use value_type::ValueType;
