//! Sample type abstraction for f32/f64 audio processing.
//!
//! The signal path computes in `f64` and converts at the buffer boundary, so
//! the trait only carries conversions plus what metering needs.

/// Host sample precision (`f32` or `f64`).
pub trait Sample: Copy + Send + Sync + 'static {
    /// Silence.
    const ZERO: Self;

    /// Narrow (or pass through) a value computed in `f64`.
    fn from_f64(value: f64) -> Self;

    /// Widen to `f64`. Exact for both precisions.
    fn to_f64(self) -> f64;

    /// Narrow to `f32` for metering.
    fn to_f32(self) -> f32;

    /// Absolute value.
    fn abs(self) -> Self;

    /// Larger of two values.
    fn max(self, other: Self) -> Self;
}

macro_rules! impl_sample {
    ($t:ty) => {
        impl Sample for $t {
            const ZERO: Self = 0.0;

            #[inline(always)]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline(always)]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline(always)]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline(always)]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline(always)]
            fn max(self, other: Self) -> Self {
                <$t>::max(self, other)
            }
        }
    };
}

impl_sample!(f32);
impl_sample!(f64);
