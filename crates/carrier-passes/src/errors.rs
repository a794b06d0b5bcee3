//! Error types for the representation passes.
//!
//! Every error here is an internal-consistency fault: the input tree was
//! malformed by an earlier pass. The unit being rewritten is abandoned.

use carrier_ir::{OverrideError, Symbol};
use derive_more::{Display, From};

pub type PassResult<T> = Result<T, BoxingError>;

#[derive(Clone, Display, Debug, From, PartialEq)]
#[display("{kind}")]
pub struct BoxingError {
    #[from]
    kind: Box<BoxingErrorKind>,
}

impl<E> From<E> for BoxingError
where
    BoxingErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        BoxingError {
            kind: Box::new(BoxingErrorKind::from(error)),
        }
    }
}

impl BoxingError {
    pub fn kind(&self) -> &BoxingErrorKind {
        &self.kind
    }

    pub fn parameter_out_of_range(function: Symbol, index: usize, arity: usize) -> Self {
        BoxingErrorKind::ParameterOutOfRange {
            function,
            index,
            arity,
        }
        .into()
    }

    pub fn missing_receiver(function: Symbol, receiver: ReceiverKind) -> Self {
        BoxingErrorKind::MissingReceiver { function, receiver }.into()
    }

    pub fn intrinsic_shape(function: Symbol, reason: &'static str) -> Self {
        BoxingErrorKind::IntrinsicShape { function, reason }.into()
    }
}

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq)]
pub enum ReceiverKind {
    #[display("dispatch")]
    Dispatch,
    #[display("extension")]
    Extension,
}

#[derive(Clone, Display, Debug, From, PartialEq)]
pub enum BoxingErrorKind {
    #[display("Unresolved override target: {_0}")]
    #[from]
    UnresolvedOverride(OverrideError),

    #[display("Argument {index} is out of range for `{function}` with {arity} parameters")]
    ParameterOutOfRange {
        function: Symbol,
        index: usize,
        arity: usize,
    },

    #[display("Call passes a {receiver} receiver but `{function}` declares none")]
    MissingReceiver {
        function: Symbol,
        receiver: ReceiverKind,
    },

    #[display("Conversion intrinsic `{function}` has the wrong shape: {reason}")]
    IntrinsicShape {
        function: Symbol,
        reason: &'static str,
    },

    #[display("Cannot adapt between specialized representations `{actual}` and `{expected}`")]
    SpecializedMismatch { actual: String, expected: String },
}

impl std::error::Error for BoxingError {}
