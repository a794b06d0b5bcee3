//! Evaluation errors.

use carrier_ir::Symbol;
use derive_more::{Display, From};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Clone, Display, Debug, From, PartialEq)]
#[display("{kind}")]
pub struct EvalError {
    #[from]
    kind: Box<EvalErrorKind>,
}

impl<E> From<E> for EvalError
where
    EvalErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        EvalError {
            kind: Box::new(EvalErrorKind::from(error)),
        }
    }
}

impl EvalError {
    pub fn kind(&self) -> &EvalErrorKind {
        &self.kind
    }

    pub fn unbound_variable(name: Symbol) -> Self {
        EvalErrorKind::UnboundVariable(name).into()
    }

    pub fn missing_body(name: Symbol) -> Self {
        EvalErrorKind::MissingBody(name).into()
    }

    pub fn type_mismatch(expected: &'static str, found: impl std::fmt::Display) -> Self {
        EvalErrorKind::TypeMismatch {
            expected,
            found: found.to_string(),
        }
        .into()
    }

    pub fn unsupported(what: &'static str) -> Self {
        EvalErrorKind::Unsupported(what).into()
    }

    pub fn host(msg: impl std::fmt::Display) -> Self {
        EvalErrorKind::Host(msg.to_string()).into()
    }
}

#[derive(Clone, Display, Debug, PartialEq)]
pub enum EvalErrorKind {
    #[display("Unbound variable: {_0}")]
    UnboundVariable(Symbol),

    #[display("Function `{_0}` has no body and no host handler")]
    MissingBody(Symbol),

    #[display("Expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[display("Unsupported: {_0}")]
    Unsupported(&'static str),

    #[display("Return to `{_0}` escaped its function")]
    StrayReturn(Symbol),

    #[display("Host function failed: {_0}")]
    Host(String),
}

impl std::error::Error for EvalError {}
