//! The `Number` trait abstracts the CF-tree's arithmetic over the host's
//! choice of floating-point precision.

use num_traits::NumCast;

/// A real number usable as the scalar type of a `CfEntry`'s statistics.
///
/// This mirrors the host library's own `Number` abstraction (see
/// `clam::metric`, where distances are generic over `T: Number`): rather than
/// hard-coding `f64`, the tree is generic so that callers trading precision
/// for memory (`f32`) are first-class, not an afterthought.
pub trait Number:
    Copy
    + Clone
    + Default
    + std::fmt::Debug
    + Send
    + Sync
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
    + std::ops::AddAssign
    + std::ops::SubAssign
    + std::iter::Sum
    + PartialOrd
    + PartialEq
    + 'static
{
    /// The additive identity.
    fn zero() -> Self;

    /// The multiplicative identity.
    fn one() -> Self;

    /// Converts a `usize` count into this `Number`.
    fn from_usize(n: usize) -> Self;

    /// Converts this `Number` into an `f64` for use in scale-free math (e.g.
    /// `log2`, `sqrt` of intermediate quantities) that this trait does not
    /// itself expose.
    fn as_f64(self) -> f64;

    /// Converts an `f64` back into this `Number`.
    fn from_f64(value: f64) -> Self;

    /// The non-negative square root.
    fn sqrt(self) -> Self;

    /// Clamps negative values (floating-point cancellation noise) to zero.
    fn clamp_non_negative(self) -> Self {
        if self < Self::zero() {
            Self::zero()
        } else {
            self
        }
    }
}

macro_rules! impl_number {
    ($t:ty) => {
        impl Number for $t {
            fn zero() -> Self {
                0 as $t
            }

            fn one() -> Self {
                1 as $t
            }

            fn from_usize(n: usize) -> Self {
                NumCast::from(n).unwrap_or_else(|| panic!("{n} does not fit in {}", stringify!($t)))
            }

            fn as_f64(self) -> f64 {
                NumCast::from(self).unwrap()
            }

            fn from_f64(value: f64) -> Self {
                NumCast::from(value).unwrap_or_else(|| panic!("{value} does not fit in {}", stringify!($t)))
            }

            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }
        }
    };
}

impl_number!(f32);
impl_number!(f64);
