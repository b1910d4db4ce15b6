use thiserror::Error;

/// Raised by the conversion table behind `$convert` and the `$to*` shorthands.
///
/// It never leaves the conversion operators: they catch it and substitute their
/// `onError` value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("unsupported conversion target: {0}")]
    UnsupportedTarget(String),

    #[error("cannot convert {value} to {target}")]
    Unconvertible { target: &'static str, value: String },

    #[error("value out of range for {target}")]
    OutOfRange { target: &'static str },
}

/// Operand count mismatch found while compiling an operator.
///
/// Logged and turned into a `null` implementation; callers never see it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArityError {
    #[error("\"{operator}\" operator expects {expected} operands, got {actual}.")]
    Fixed {
        operator: String,
        expected: usize,
        actual: usize,
    },

    #[error("\"{operator}\" operator expects at least {min} operands, got {actual}.")]
    TooFew {
        operator: String,
        min: usize,
        actual: usize,
    },

    #[error("\"{operator}\" operator expects at most {max} operands, got {actual}.")]
    TooMany {
        operator: String,
        max: usize,
        actual: usize,
    },
}
