//! LLVM Backend for the ELL Emission Layer
//!
//! This crate lowers `ell_value` operations to LLVM IR through inkwell.
//! Two layers:
//!
//! - [`IrEmitter`]: an id-based instruction emitter. Values, blocks, and
//!   functions are `Copy` ids, so callers never see inkwell lifetimes.
//! - [`LlvmEmitterContext`]: an [`ell_value::EmitterContext`] built on the
//!   emitter, usable with `ell_value::ContextGuard` like any other backend.
//!
//! # Debug Environment Variables
//!
//! - `ELL_DEBUG_LLVM`: Print the module IR to stderr when
//!   [`LlvmEmitterContext::finish`] runs on a context built with
//!   [`LlvmEmitterConfig::from_env`]. Any non-empty value enables this.
//!   Example: `ELL_DEBUG_LLVM=1 cargo test`
//!
//! - `RUST_LOG=ell_llvm=debug`: Function definitions, external
//!   declarations, and global allocations.
//!
//! - `RUST_LOG=ell_llvm=trace`: Every constant, copy, and intrinsic
//!   lowering (very verbose).
//!
//! # Clippy Configuration
//!
//! Cast lints are allowed crate-wide: LLVM takes `u64` constants and `u32`
//! array lengths where `ell_value` sizes are `usize`.

#![allow(
    // LLVM constants are u64 bit patterns of signed values
    clippy::cast_sign_loss,
    // Array lengths and parameter indices are u32 in LLVM
    clippy::cast_possible_truncation,
    // Most Result returns are for LLVM builder operations
    clippy::missing_errors_doc,
)]
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use ell_llvm::{LlvmEmitterConfig, LlvmEmitterContext};
//! use ell_value::{ContextGuard, Elementwise, FunctionDeclaration, Scalar, ValueType};
//!
//! let ctx = Rc::new(LlvmEmitterContext::new(LlvmEmitterConfig::new("demo")));
//! let _guard = ContextGuard::new(ctx.clone());
//!
//! FunctionDeclaration::new("square")
//!     .returns(ValueType::Double)
//!     .scalar_parameter("x", ValueType::Double)
//!     .define(|args| {
//!         let x = Scalar::new(args[0].clone())?;
//!         Ok(Some(x.multiply(&x)?.into_value()))
//!     })?;
//!
//! println!("{}", ctx.finish()?);
//! ```

mod context;
mod ir_emitter;
pub mod operators;
pub mod value_id;

pub use context::{LlvmEmitterConfig, LlvmEmitterContext};
pub use ir_emitter::{FunctionLinkage, IrEmitter, Position};
pub use operators::{ComparisonType, OperandClass, OperatorType};
pub use value_id::{BlockId, FunctionId, ValueId};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging.
///
/// Call this at the start of tests or main to enable tracing output.
/// Uses `RUST_LOG` environment variable for filtering.
///
/// # Example
///
/// ```ignore
/// ell_llvm::init_tracing();
/// ```
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
