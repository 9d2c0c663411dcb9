//! Key extraction.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{self, Display};
use std::marker::PhantomData;

/// Key extraction interface. Maps an element to the value the merge order is decided by.
pub trait KeyFn<T> {
    /// Value cached next to every buffered element.
    type Key;
    /// Value handed to the comparator, borrowed either from the cached key or from the element itself.
    type Output: ?Sized;
    /// Key computation error.
    type Error;

    /// Computes the key of an element.
    fn extract(&mut self, item: &T) -> Result<Self::Key, Self::Error>;

    /// Returns the value to be compared for an element and its cached key.
    fn project<'a>(key: &'a Self::Key, item: &'a T) -> &'a Self::Output;
}

/// Orders elements by themselves. Nothing is computed or cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> KeyFn<T> for Identity {
    type Key = ();
    type Output = T;
    type Error = Infallible;

    fn extract(&mut self, _item: &T) -> Result<(), Infallible> {
        Ok(())
    }

    fn project<'a>(_key: &'a (), item: &'a T) -> &'a T {
        item
    }
}

/// Infallible key function.
pub struct FnKey<F, K> {
    func: F,
    key_type: PhantomData<fn() -> K>,
}

impl<F, K> FnKey<F, K> {
    pub fn new(func: F) -> Self {
        FnKey {
            func,
            key_type: PhantomData,
        }
    }
}

impl<T, K, F> KeyFn<T> for FnKey<F, K>
where
    F: FnMut(&T) -> K,
{
    type Key = K;
    type Output = K;
    type Error = Infallible;

    fn extract(&mut self, item: &T) -> Result<K, Infallible> {
        Ok((self.func)(item))
    }

    fn project<'a>(key: &'a K, _item: &'a T) -> &'a K {
        key
    }
}

/// Fallible key function. Its errors are reported by the merger as they are.
pub struct TryFnKey<F, K, E> {
    func: F,
    key_type: PhantomData<fn() -> Result<K, E>>,
}

impl<F, K, E> TryFnKey<F, K, E> {
    pub fn new(func: F) -> Self {
        TryFnKey {
            func,
            key_type: PhantomData,
        }
    }
}

impl<T, K, E, F> KeyFn<T> for TryFnKey<F, K, E>
where
    F: FnMut(&T) -> Result<K, E>,
{
    type Key = K;
    type Output = K;
    type Error = E;

    fn extract(&mut self, item: &T) -> Result<K, E> {
        (self.func)(item)
    }

    fn project<'a>(key: &'a K, _item: &'a T) -> &'a K {
        key
    }
}

/// Field key error.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKeyError {
    /// Key specification can't be parsed.
    InvalidSpec(String),
    /// Line has fewer fields than the key refers to.
    MissingField(usize),
    /// Field is expected to be numeric.
    NotANumber(String),
}

impl Error for FieldKeyError {}

impl Display for FieldKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKeyError::InvalidSpec(spec) => write!(f, "invalid key specification: '{}'", spec),
            FieldKeyError::MissingField(field) => write!(f, "line has no field {}", field),
            FieldKeyError::NotANumber(value) => write!(f, "field is not a number: '{}'", value),
        }
    }
}

/// Value of a line field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.partial_cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FieldSpec {
    // zero-based
    index: usize,
    numeric: bool,
}

impl FieldSpec {
    fn parse(spec: &str) -> Result<Self, FieldKeyError> {
        let invalid = || FieldKeyError::InvalidSpec(spec.to_string());

        let (digits, numeric) = match spec.strip_suffix('n') {
            Some(digits) => (digits, true),
            None => (spec, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let field: usize = digits.parse().map_err(|_| invalid())?;
        if field == 0 {
            return Err(invalid());
        }

        return Ok(FieldSpec {
            index: field - 1,
            numeric,
        });
    }
}

/// Text line key selecting a single field.
///
/// The specification is `N` (N-th field, 1-based, compared as text) or `Nn` (N-th field compared as a number).
/// It is only parsed when the first key is computed, so an invalid specification is reported by the first pull
/// of the merger and never by its construction.
#[derive(Debug, Clone)]
pub struct FieldKey {
    spec: String,
    separator: Option<char>,
    parsed: Option<FieldSpec>,
}

impl FieldKey {
    /// Creates a field key.
    ///
    /// # Arguments
    /// * `spec` - Field specification
    /// * `separator` - Field separator. If the parameter is [`None`] fields are separated by whitespace runs.
    pub fn new(spec: impl Into<String>, separator: Option<char>) -> Self {
        FieldKey {
            spec: spec.into(),
            separator,
            parsed: None,
        }
    }

    fn field_spec(&mut self) -> Result<FieldSpec, FieldKeyError> {
        if let Some(parsed) = self.parsed {
            return Ok(parsed);
        }
        let parsed = FieldSpec::parse(&self.spec)?;
        self.parsed = Some(parsed);

        return Ok(parsed);
    }
}

impl<T: AsRef<str>> KeyFn<T> for FieldKey {
    type Key = FieldValue;
    type Output = FieldValue;
    type Error = FieldKeyError;

    fn extract(&mut self, item: &T) -> Result<FieldValue, FieldKeyError> {
        let spec = self.field_spec()?;
        let line = item.as_ref();

        let field = match self.separator {
            Some(separator) => line.split(separator).nth(spec.index),
            None => line.split_whitespace().nth(spec.index),
        }
        .ok_or(FieldKeyError::MissingField(spec.index + 1))?;

        if spec.numeric {
            let number = field
                .trim()
                .parse()
                .map_err(|_| FieldKeyError::NotANumber(field.to_string()))?;
            Ok(FieldValue::Number(number))
        } else {
            Ok(FieldValue::Text(field.to_string()))
        }
    }

    fn project<'a>(key: &'a FieldValue, _item: &'a T) -> &'a FieldValue {
        key
    }
}
