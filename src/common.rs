//! Scalar aliases and null sentinels shared across the crate.

/// Continuous time measured in years.
pub type Time = f64;

/// A generic real quantity.
pub type Real = f64;

/// An interest rate (continuously compounded unless stated otherwise).
pub type Rate = f64;

/// A discount factor in (0, 1].
pub type DiscountFactor = f64;

/// A Black volatility.
pub type Volatility = f64;

/// Sentinel values for "unset" fields.
///
/// Numeric fields use their maximum as the null marker so that a null is
/// loud when it leaks into arithmetic instead of silently passing for a
/// plausible value.
pub trait Null: Sized + PartialEq {
    fn null() -> Self;

    fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

impl Null for f64 {
    fn null() -> Self {
        f64::MAX
    }
}

impl Null for i32 {
    fn null() -> Self {
        i32::MAX
    }
}

impl Null for usize {
    fn null() -> Self {
        usize::MAX
    }
}
