//! Reference evaluator for carrier IR.
//!
//! Runs rewritten trees directly so runtime properties of a pass (how often
//! a producer is evaluated, whether null reaches a conversion intrinsic) can
//! be checked in tests.

pub mod errors;
pub mod evaluator;
pub mod value;

pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use evaluator::{Evaluator, HostCall, HostFn, Receivers};
pub use value::{Object, Value};
