//! Representation passes over carrier IR.
//!
//! - [`boxing`]: inserts explicit box/unbox conversions wherever a value's
//!   runtime representation differs from the one its consumer expects.
//! - [`inline_class`]: decides which types are carried unboxed.

pub mod boxing;
pub mod errors;
pub mod inline_class;

pub use boxing::{
    BoxingConfig, BoxingEnv, BoxingResult, Intrinsics, insert_boxing, insert_boxing_with_config,
};
pub use errors::{BoxingError, BoxingErrorKind, PassResult, ReceiverKind};
pub use inline_class::{ErasedInlineClasses, InlineClassOracle};
