//! # Contour Engine
//!
//! **Demand-driven resolution of multidimensional equations**
//!
//! A variable is defined by a set of equations, each valid in a region of a
//! multidimensional context. Asking for a variable at a context selects the
//! most specific applicable equation (best fit) and evaluates its body there.
//!
//! ## Quick Start
//!
//! ```rust
//! use contour::{Context, ContourResult, Dim, System, Value};
//!
//! fn main() -> ContourResult<()> {
//!     let mut system = System::new();
//!
//!     system.define(r#"greeting = "hello""#, 0)?;
//!     system.define(r#"greeting @ [lang <- "fr"] = "bonjour""#, 0)?;
//!
//!     let lang = system.dim("lang");
//!     let mut k = Context::new().with(lang, Value::text("fr"));
//!     assert_eq!(system.resolve("greeting", &mut k)?, Value::text("bonjour"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Contexts and regions
//! A context maps dimensions to values. An equation's guard describes a
//! region; the equation applies wherever the context lies inside it. A
//! region refines another when it constrains at least the same dimensions
//! at least as tightly.
//!
//! ### Specials and demands
//! Failures in the evaluated program are values, not errors: a special such
//! as `undefined` or `type-error` flows through operators like any other
//! value. When evaluating against a partially known context, a demand names
//! the dimensions still needed; the caller supplies them and asks again.
//!
//! ### Redefinition
//! Equations are installed at a logical time. Each change opens a new
//! generation, so contexts bound to an earlier time still see the equations
//! that were in force then.
//!
//! `Err` results are reserved for configuration faults such as malformed
//! guards, invalid priorities, or installation going back in time.

pub mod bestfit;
pub mod context;
pub mod dimension;
pub mod equation;
pub mod error;
pub mod evaluator;
pub mod guard;
pub mod parser;
pub mod redefinition;
pub mod resource_limits;
pub mod system;
pub mod tuple;
pub mod value;

pub use context::{Context, Perturbation};
pub use dimension::{Dim, DimensionKey, DimensionSpace};
pub use equation::{Definition, DefinitionCompiler, Equation, EquationHandle, Part, Provenance};
pub use error::{ContourError, ParseDetails};
pub use evaluator::{BinaryOp, Compiled, Evaluable, Expr, UnaryOp};
pub use guard::{CompiledGuard, GuardOutcome, GuardSpec};
pub use parser::ReferenceCompiler;
pub use redefinition::TimeRange;
pub use resource_limits::ResourceLimits;
pub use system::System;
pub use tuple::Tuple;
pub use value::{Demand, Range, Special, Value, ValueKind};

/// Result type for Contour operations
pub type ContourResult<T> = Result<T, ContourError>;

#[cfg(test)]
mod tests;
