/// Macro to check a caller-supplied precondition, returning an
/// `IllegalArgument` error when it does not hold.
#[macro_export]
macro_rules! require {
    ($cond:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        if !($cond) {
            return Err($crate::error::PricingError::illegal_argument(format!(
                $fmt $(, $arg)*
            )));
        }
    };
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($crate::error::PricingError::IllegalArgument($err));
        }
    };
}

/// Macro to check an internal invariant, returning an `AssertionFailure`
/// when it does not hold.
#[macro_export]
macro_rules! ensure_invariant {
    ($cond:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        if !($cond) {
            return Err($crate::error::PricingError::assertion(format!(
                $fmt $(, $arg)*
            )));
        }
    };
}

/// Macro to reject an invalid intermediate result with an `IllegalResult`
/// error.
#[macro_export]
macro_rules! reject_result {
    ($cond:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {
        if !($cond) {
            return Err($crate::error::PricingError::illegal_result(format!(
                $fmt $(, $arg)*
            )));
        }
    };
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($crate::error::PricingError::IllegalResult($err));
        }
    };
}
