//! Key comparators.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{self, Display};
use std::marker::PhantomData;

/// Comparator interface. Unlike [`Ord`] a comparison is allowed to fail.
pub trait Compare<K: ?Sized> {
    /// Comparison error.
    type Error;

    /// Compares two keys.
    fn compare(&mut self, a: &K, b: &K) -> Result<Ordering, Self::Error>;
}

/// Total order defined by [`Ord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Natural;

impl<K: Ord + ?Sized> Compare<K> for Natural {
    type Error = Infallible;

    fn compare(&mut self, a: &K, b: &K) -> Result<Ordering, Infallible> {
        Ok(a.cmp(b))
    }
}

/// Partial order defined by [`PartialOrd`]. Comparing unordered keys (`NaN` for instance) fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Partial;

/// Keys have no defined order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incomparable;

impl Error for Incomparable {}

impl Display for Incomparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keys are not comparable")
    }
}

impl<K: PartialOrd + ?Sized> Compare<K> for Partial {
    type Error = Incomparable;

    fn compare(&mut self, a: &K, b: &K) -> Result<Ordering, Incomparable> {
        a.partial_cmp(b).ok_or(Incomparable)
    }
}

/// Infallible compare function.
pub struct FnCompare<F> {
    func: F,
}

impl<F> FnCompare<F> {
    pub fn new(func: F) -> Self {
        FnCompare { func }
    }
}

impl<K: ?Sized, F> Compare<K> for FnCompare<F>
where
    F: FnMut(&K, &K) -> Ordering,
{
    type Error = Infallible;

    fn compare(&mut self, a: &K, b: &K) -> Result<Ordering, Infallible> {
        Ok((self.func)(a, b))
    }
}

/// Fallible compare function.
pub struct TryFnCompare<F, E> {
    func: F,
    error_type: PhantomData<fn() -> E>,
}

impl<F, E> TryFnCompare<F, E> {
    pub fn new(func: F) -> Self {
        TryFnCompare {
            func,
            error_type: PhantomData,
        }
    }
}

impl<K: ?Sized, E, F> Compare<K> for TryFnCompare<F, E>
where
    F: FnMut(&K, &K) -> Result<Ordering, E>,
{
    type Error = E;

    fn compare(&mut self, a: &K, b: &K) -> Result<Ordering, E> {
        (self.func)(a, b)
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;

    use rstest::*;

    use super::{Compare, Incomparable, Partial};

    #[rstest]
    #[case(1.0, 2.0, Ok(Ordering::Less))]
    #[case(2.0, 2.0, Ok(Ordering::Equal))]
    #[case(f64::NAN, 2.0, Err(Incomparable))]
    #[case(2.0, f64::NAN, Err(Incomparable))]
    fn test_partial(#[case] a: f64, #[case] b: f64, #[case] expected: Result<Ordering, Incomparable>) {
        assert_eq!(Partial.compare(&a, &b), expected);
    }
}
