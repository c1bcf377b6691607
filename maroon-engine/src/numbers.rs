//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a u64 count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert a usize count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a u32 count to f64.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    cast::<u32, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_convert_exactly_in_small_range() {
        assert!((u64_to_f64(10_000) - 10_000.0).abs() < f64::EPSILON);
        assert!((usize_to_f64(24) - 24.0).abs() < f64::EPSILON);
        assert!((u32_to_f64(3) - 3.0).abs() < f64::EPSILON);
    }
}
