//! Merge input adapters.

use std::convert::Infallible;
use std::error::Error;
use std::fmt::{self, Display};
use std::io::{self, prelude::*};
use std::marker::PhantomData;

/// Wraps an iterator that can't fail into a merge input.
pub fn infallible<I>(items: I) -> impl Iterator<Item = Result<I::Item, Infallible>>
where
    I: IntoIterator,
{
    items.into_iter().map(Ok)
}

/// MessagePack run reading error.
#[derive(Debug)]
pub enum RmpSourceError {
    /// Common I/O error.
    IO(io::Error),
    /// Record deserialization error.
    DeserializationError(rmp_serde::decode::Error),
}

impl Error for RmpSourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            RmpSourceError::IO(err) => err,
            RmpSourceError::DeserializationError(err) => err,
        })
    }
}

impl Display for RmpSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RmpSourceError::IO(err) => write!(f, "I/O operation failed: {}", err),
            RmpSourceError::DeserializationError(err) => write!(f, "record deserialization error: {}", err),
        }
    }
}

/// RMP (Rust MessagePack) sorted run.
/// Reads consecutive MessagePack-encoded records until the end of the input.
/// For more information see https://msgpack.org/.
pub struct RmpSource<T, R> {
    reader: R,

    item_type: PhantomData<T>,
}

impl<T, R> RmpSource<T, R>
where
    T: serde::de::DeserializeOwned,
    R: BufRead,
{
    /// Creates an instance of a MessagePack run reader.
    pub fn new(reader: R) -> Self {
        RmpSource {
            reader,
            item_type: PhantomData,
        }
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<T, R> Iterator for RmpSource<T, R>
where
    T: serde::de::DeserializeOwned,
    R: BufRead,
{
    type Item = Result<T, RmpSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let at_end = match self.reader.fill_buf() {
            Ok(buf) => buf.is_empty(),
            Err(err) => return Some(Err(RmpSourceError::IO(err))),
        };
        if at_end {
            return None;
        }

        Some(rmp_serde::decode::from_read(&mut self.reader).map_err(RmpSourceError::DeserializationError))
    }
}

/// Writes items as a MessagePack run readable by [`RmpSource`].
///
/// # Arguments
/// * `writer` - Run destination
/// * `items` - Items in merge order
pub fn dump_rmp<T, W>(writer: &mut W, items: impl IntoIterator<Item = T>) -> Result<(), rmp_serde::encode::Error>
where
    T: serde::ser::Serialize,
    W: Write,
{
    for item in items.into_iter() {
        rmp_serde::encode::write(&mut *writer, &item)?;
    }

    return Ok(());
}
