//! `multimerge` is a lazy k-way merge of sorted iterators.
//!
//! Given several inputs, each already sorted, it produces their merged sorted sequence one element at a time,
//! never holding more than one element per input in memory. It is similar to sorting the concatenation of all
//! the inputs, but nothing is sorted or buffered up front.
//!
//! # Overview
//!
//! `multimerge` supports the following features:
//!
//! * **Fallible inputs:**
//!   inputs are iterators over `Result`s. `None` marks the end of an input, every error is handed to the caller
//!   untouched and never mistaken for the end of an input.
//! * **Keys and comparators:**
//!   elements can be ordered by themselves, by a key function or by a custom comparator. Key functions and
//!   comparators are allowed to fail, their errors are reported the same way input errors are.
//! * **Reverse order:**
//!   inputs sorted in descending order are merged into a descending output.
//! * **Stability:**
//!   elements with equal keys are emitted in the order of their inputs.
//!
//! # Example
//!
//! ```
//! use std::io;
//!
//! use multimerge::MergerBuilder;
//!
//! let inputs: Vec<Vec<Result<&str, io::Error>>> = vec![
//!     vec![Ok("dog"), Ok("horse")],
//!     vec![Ok("cat"), Ok("fish"), Ok("kangaroo")],
//! ];
//!
//! let merged = MergerBuilder::new()
//!     .with_key_fn(|item: &&str| item.len())
//!     .build(inputs);
//!
//! let merged: Result<Vec<&str>, _> = merged.collect();
//! assert_eq!(merged.unwrap(), vec!["dog", "cat", "fish", "horse", "kangaroo"]);
//! ```

pub mod compare;
pub mod error;
pub mod heap;
pub mod key;
pub mod merger;
pub mod source;

pub use compare::{Compare, FnCompare, Incomparable, Natural, Partial, TryFnCompare};
pub use error::MergeError;
pub use key::{FieldKey, FieldKeyError, FieldValue, FnKey, Identity, KeyFn, TryFnKey};
pub use merger::{merge, merge_by, merge_by_key, Merger, MergerBuilder};
pub use source::{RmpSource, RmpSourceError};
