//! A counter that starts at 1 and wraps back to 1 after reaching a maximum,
//! used to allocate Serial API callback ids (never 0, since 0 means "no
//! callback expected" on the wire).

use num_traits::{Bounded, One, Unsigned, WrappingAdd};

pub struct WrappingCounter<T>
where
    T: Bounded + Ord + Unsigned + WrappingAdd + One + Copy,
{
    value: T,
    max: Option<T>,
}

impl<T> Default for WrappingCounter<T>
where
    T: Bounded + Ord + Unsigned + WrappingAdd + One + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WrappingCounter<T>
where
    T: Bounded + Ord + Unsigned + WrappingAdd + One + Copy,
{
    pub fn new() -> Self {
        Self {
            value: T::zero(),
            max: None,
        }
    }

    pub fn new_with_max(max: T) -> Self {
        Self {
            value: T::zero(),
            max: Some(max),
        }
    }

    /// Returns the next value in the sequence, advancing the counter.
    pub fn increment(&mut self) -> T {
        let mut next = self.value.wrapping_add(&T::one());
        next = match self.max {
            Some(max) if next > max => T::one(),
            _ => next,
        };
        if next.is_zero() {
            next = T::one();
        }

        self.value = next;
        self.value
    }

    pub fn current(&self) -> T {
        self.value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_increment() {
        let mut counter = WrappingCounter::new_with_max(5u8);
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.increment(), 3);
        assert_eq!(counter.increment(), 4);
        assert_eq!(counter.increment(), 5);
        assert_eq!(counter.increment(), 1);
    }

    #[test]
    fn callback_id_range_skips_reserved_nonce_ids() {
        // Callback ids 1..=9 are reserved for nonce traffic per the protocol;
        // the counter itself only guarantees wraparound, the driver starts
        // normal traffic at 10.
        let mut counter = WrappingCounter::new_with_max(255u8);
        for expected in 1..=255u8 {
            assert_eq!(counter.increment(), expected);
        }
        assert_eq!(counter.increment(), 1);
    }
}
