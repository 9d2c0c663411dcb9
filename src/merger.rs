//! K-way merger.

use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use log;

use crate::compare::{Compare, FnCompare, Natural, TryFnCompare};
use crate::error::MergeError;
use crate::heap::SelectionHeap;
use crate::key::{FnKey, Identity, KeyFn, TryFnKey};

/// Buffered head of a live source.
struct Entry<K, T> {
    key: K,
    source: usize,
    item: T,
}

enum Phase {
    /// Sources before `next` have been pulled once.
    Seeding { next: usize },
    Merging,
    Exhausted,
}

/// Lazy k-way merger.
///
/// Merges multiple sorted inputs into a single sorted output. Inputs must be sorted in ascending order
/// (descending if `reverse` is set) by the configured key and comparator, otherwise the result is undefined.
/// The merge is stable: elements with equal keys are emitted in the order of their inputs, and the relative
/// order of the elements of a single input is preserved.
///
/// Nothing happens until the first element is requested. At most one element per input is buffered.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number of items,
/// *n* is the number of inputs.
///
/// A `None` returned by an input means the input is exhausted; it is never pulled again.
/// Any error returned by an input, the key function or the comparator is passed to the caller as it is and
/// only ends the current pull: the input that failed is dropped, the others keep being merged.
/// If refilling from an input fails, the element selected from that input is returned by the following pull.
///
/// A failed comparison is retried on the next pull. A comparator that keeps failing on the same keys makes every
/// later pull fail too, so once a comparison has failed [`Iterator::size_hint`] reports no upper bound.
pub struct Merger<T, E, S, KF = Identity, C = Natural>
where
    S: IntoIterator<Item = Result<T, E>>,
    KF: KeyFn<T>,
    C: Compare<KF::Output>,
{
    // exhausted or failed sources are dropped
    sources: Vec<Option<S::IntoIter>>,
    heap: SelectionHeap<Entry<KF::Key, T>>,
    key_fn: KF,
    comparator: C,
    reverse: bool,
    phase: Phase,
    // selected element whose source failed on refill
    held: Option<T>,
    compare_failed: bool,
}

impl<T, E, S, KF, C> Merger<T, E, S, KF, C>
where
    S: IntoIterator<Item = Result<T, E>>,
    KF: KeyFn<T>,
    C: Compare<KF::Output>,
{
    /// Creates an instance of a merger. No input is touched until the first element is requested.
    ///
    /// # Arguments
    /// * `sources` - Sorted inputs to be merged in a single sorted one
    /// * `key_fn` - Function computing the key elements are compared by
    /// * `comparator` - Key comparator
    /// * `reverse` - Merge in descending order
    pub fn new<I>(sources: I, key_fn: KF, comparator: C, reverse: bool) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        let sources = Vec::from_iter(sources.into_iter().map(|s| Some(s.into_iter())));
        let heap = SelectionHeap::with_capacity(sources.len());

        return Merger {
            sources,
            heap,
            key_fn,
            comparator,
            reverse,
            phase: Phase::Seeding { next: 0 },
            held: None,
            compare_failed: false,
        };
    }

    /// Returns the number of inputs not yet exhausted or failed.
    pub fn live_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    /// Checks if the merged sequence has ended.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.phase, Phase::Exhausted)
    }

    fn seed(&mut self) -> Result<(), MergeError<E, KF::Error, C::Error>> {
        while let Phase::Seeding { next } = self.phase {
            if next == self.sources.len() {
                log::debug!(
                    "merge seeded ({} of {} sources non-empty)",
                    self.heap.len(),
                    self.sources.len()
                );
                self.heap.build();
                self.phase = Phase::Merging;
                break;
            }

            self.phase = Phase::Seeding { next: next + 1 };
            if let Some(entry) = self.pull(next)? {
                self.heap.push_unordered(entry);
            }
        }

        return Ok(());
    }

    /// Pulls the next element of a source and computes its key.
    /// The source is dropped if it is exhausted or fails.
    fn pull(&mut self, idx: usize) -> Result<Option<Entry<KF::Key, T>>, MergeError<E, KF::Error, C::Error>> {
        let source = match self.sources[idx].as_mut() {
            Some(source) => source,
            None => return Ok(None),
        };

        let err = match source.next() {
            Some(Ok(item)) => match self.key_fn.extract(&item) {
                Ok(key) => return Ok(Some(Entry { key, source: idx, item })),
                Err(err) => MergeError::Key(err),
            },
            Some(Err(err)) => MergeError::Source(err),
            None => {
                log::trace!("source #{} exhausted", idx);
                self.sources[idx] = None;
                return Ok(None);
            }
        };

        log::debug!("source #{} dropped after a failure", idx);
        self.sources[idx] = None;

        return Err(err);
    }

    fn settle(&mut self) -> Result<(), C::Error> {
        let comparator = &mut self.comparator;
        let reverse = self.reverse;

        self.heap.settle(|a, b| -> Result<bool, C::Error> {
            let ordering = comparator.compare(KF::project(&a.key, &a.item), KF::project(&b.key, &b.item))?;
            let ordering = if reverse { ordering.reverse() } else { ordering };

            Ok(ordering.then(a.source.cmp(&b.source)) == Ordering::Less)
        })
    }
}

impl<T, E, S, KF, C> Iterator for Merger<T, E, S, KF, C>
where
    S: IntoIterator<Item = Result<T, E>>,
    KF: KeyFn<T>,
    C: Compare<KF::Output>,
{
    type Item = Result<T, MergeError<E, KF::Error, C::Error>>;

    /// Returns the next item from the inputs in merge order.
    fn next(&mut self) -> Option<Self::Item> {
        if let Phase::Seeding { .. } = self.phase {
            if let Err(err) = self.seed() {
                return Some(Err(err));
            }
        }
        if let Some(item) = self.held.take() {
            return Some(Ok(item));
        }
        if let Phase::Exhausted = self.phase {
            return None;
        }

        if let Err(err) = self.settle() {
            self.compare_failed = true;
            return Some(Err(MergeError::Compare(err)));
        }

        let idx = match self.heap.peek() {
            Some(top) => top.source,
            None => {
                log::debug!("merge exhausted");
                self.phase = Phase::Exhausted;
                return None;
            }
        };

        match self.pull(idx) {
            Ok(Some(entry)) => self.heap.replace_top(entry).map(|top| Ok(top.item)),
            Ok(None) => self.heap.pop_top().map(|top| Ok(top.item)),
            Err(err) => {
                self.held = self.heap.pop_top().map(|top| top.item);
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_exhausted() {
            return (0, Some(0));
        }

        let buffered = self.heap.len() + usize::from(self.held.is_some());
        let (lower, upper) = self
            .sources
            .iter()
            .flatten()
            .map(|source| source.size_hint())
            .fold((buffered, Some(buffered)), |(lower, upper), (source_lower, source_upper)| {
                let upper = match (upper, source_upper) {
                    (Some(upper), Some(source_upper)) => upper.checked_add(source_upper),
                    _ => None,
                };
                (lower.saturating_add(source_lower), upper)
            });

        if self.compare_failed {
            (lower, None)
        } else {
            (lower, upper)
        }
    }
}

impl<T, E, S, KF, C> FusedIterator for Merger<T, E, S, KF, C>
where
    S: IntoIterator<Item = Result<T, E>>,
    KF: KeyFn<T>,
    C: Compare<KF::Output>,
{
}

/// Merger builder. Provides methods for [`Merger`] configuration.
pub struct MergerBuilder<T, KF = Identity, C = Natural> {
    /// Key function.
    key_fn: KF,
    /// Key comparator.
    comparator: C,
    /// Merge in descending order.
    reverse: bool,

    /// Input item type.
    item_type: PhantomData<T>,
}

impl<T> MergerBuilder<T> {
    /// Creates an instance of a builder with default parameters:
    /// elements are compared by themselves in ascending order.
    pub fn new() -> Self {
        MergerBuilder::default()
    }
}

impl<T> Default for MergerBuilder<T> {
    fn default() -> Self {
        MergerBuilder {
            key_fn: Identity,
            comparator: Natural,
            reverse: false,
            item_type: PhantomData,
        }
    }
}

impl<T, KF, C> MergerBuilder<T, KF, C> {
    /// Sets merge order. Inputs must be sorted in descending order if set.
    pub fn with_reverse(mut self, reverse: bool) -> MergerBuilder<T, KF, C> {
        self.reverse = reverse;
        return self;
    }

    /// Sets key function.
    pub fn with_key<K>(self, key_fn: K) -> MergerBuilder<T, K, C>
    where
        K: KeyFn<T>,
    {
        MergerBuilder {
            key_fn,
            comparator: self.comparator,
            reverse: self.reverse,
            item_type: PhantomData,
        }
    }

    /// Sets an infallible key function.
    pub fn with_key_fn<K, F>(self, func: F) -> MergerBuilder<T, FnKey<F, K>, C>
    where
        F: FnMut(&T) -> K,
    {
        self.with_key(FnKey::new(func))
    }

    /// Sets a fallible key function.
    pub fn with_try_key_fn<K, E, F>(self, func: F) -> MergerBuilder<T, TryFnKey<F, K, E>, C>
    where
        F: FnMut(&T) -> Result<K, E>,
    {
        self.with_key(TryFnKey::new(func))
    }

    /// Sets key comparator.
    pub fn with_comparator<C2>(self, comparator: C2) -> MergerBuilder<T, KF, C2> {
        MergerBuilder {
            key_fn: self.key_fn,
            comparator,
            reverse: self.reverse,
            item_type: PhantomData,
        }
    }

    /// Sets an infallible compare function.
    pub fn with_compare_fn<F>(self, func: F) -> MergerBuilder<T, KF, FnCompare<F>> {
        self.with_comparator(FnCompare::new(func))
    }

    /// Sets a fallible compare function.
    pub fn with_try_compare_fn<E, F>(self, func: F) -> MergerBuilder<T, KF, TryFnCompare<F, E>> {
        self.with_comparator(TryFnCompare::new(func))
    }

    /// Builds a [`Merger`] over the inputs using provided configuration.
    ///
    /// # Arguments
    /// * `sources` - Sorted inputs to be merged in a single sorted one
    pub fn build<E, S, I>(self, sources: I) -> Merger<T, E, S, KF, C>
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = Result<T, E>>,
        KF: KeyFn<T>,
        C: Compare<KF::Output>,
    {
        Merger::new(sources, self.key_fn, self.comparator, self.reverse)
    }
}

/// Merges sorted inputs in ascending order of their elements.
pub fn merge<T, E, S, I>(sources: I) -> Merger<T, E, S>
where
    T: Ord,
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = Result<T, E>>,
{
    MergerBuilder::new().build(sources)
}

/// Merges inputs sorted by a key in ascending order of the key.
pub fn merge_by_key<T, E, S, I, K, F>(sources: I, func: F) -> Merger<T, E, S, FnKey<F, K>>
where
    K: Ord,
    F: FnMut(&T) -> K,
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = Result<T, E>>,
{
    MergerBuilder::new().with_key_fn(func).build(sources)
}

/// Merges inputs sorted according to a compare function.
pub fn merge_by<T, E, S, I, F>(sources: I, func: F) -> Merger<T, E, S, Identity, FnCompare<F>>
where
    F: FnMut(&T, &T) -> Ordering,
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = Result<T, E>>,
{
    MergerBuilder::new().with_compare_fn(func).build(sources)
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::cmp::Ordering;
    use std::convert::Infallible;
    use std::error::Error;
    use std::io::{self, ErrorKind};
    use std::rc::Rc;

    use rand::Rng;
    use rstest::*;

    use crate::compare::{Incomparable, Partial};
    use crate::error::MergeError;
    use crate::key::{FieldKey, FieldKeyError};
    use crate::source;

    use super::{merge, merge_by, merge_by_key, MergerBuilder};

    type TestResult<T> = Result<T, MergeError<io::Error, Infallible, Infallible>>;

    fn test_error() -> io::Error {
        io::Error::new(ErrorKind::Other, "test error")
    }

    /// Source yielding `items` and then, if requested, a failure.
    fn failing_after(items: Vec<i32>, fail: bool) -> impl Iterator<Item = Result<i32, io::Error>> {
        items
            .into_iter()
            .map(Ok)
            .chain(fail.then(|| Err(test_error())))
    }

    /// Source counting how many times it was pulled.
    struct CountingSource {
        items: std::vec::IntoIter<i32>,
        pulls: Rc<Cell<usize>>,
    }

    impl Iterator for CountingSource {
        type Item = Result<i32, Infallible>;

        fn next(&mut self) -> Option<Self::Item> {
            self.pulls.set(self.pulls.get() + 1);
            self.items.next().map(Ok)
        }
    }

    #[rstest]
    #[case(
        vec![],
        vec![],
    )]
    #[case(
        vec![
            vec![],
            vec![]
        ],
        vec![],
    )]
    #[case(
        vec![
            vec![Ok(4), Ok(5), Ok(7)],
            vec![Ok(1), Ok(6)],
            vec![Ok(3)],
            vec![],
        ],
        vec![Ok(1), Ok(3), Ok(4), Ok(5), Ok(6), Ok(7)],
    )]
    #[case(
        vec![
            vec![Result::Err(test_error())]
        ],
        vec![
            Result::Err(MergeError::Source(test_error()))
        ],
    )]
    #[case(
        vec![
            vec![Ok(3), Result::Err(test_error())],
            vec![Ok(1), Ok(2)],
        ],
        vec![
            Ok(1),
            Ok(2),
            Result::Err(MergeError::Source(test_error())),
            Ok(3),
        ],
    )]
    fn test_merger(
        #[case] sources: Vec<Vec<Result<i32, io::Error>>>,
        #[case] expected_result: Vec<TestResult<i32>>,
    ) {
        let merger = merge(sources);
        let actual_result: Vec<TestResult<i32>> = merger.collect();
        assert!(
            compare_vectors_of_result(&actual_result, &expected_result),
            "actual={:?}, expected={:?}",
            actual_result,
            expected_result
        );
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_merge_random(#[case] reverse: bool) {
        let mut rng = rand::thread_rng();

        for sources_number in 0..25 {
            let mut sources = Vec::new();
            for _ in 0..sources_number {
                let len = rng.gen_range(0..20);
                let mut source = Vec::from_iter((0..len).map(|_| (rng.gen_range(b'A'..=b'C'), rng.gen_range(-500..500))));
                if reverse {
                    source.sort_by(|a, b| b.1.cmp(&a.1));
                } else {
                    source.sort_by_key(|item| item.1);
                }
                sources.push(source);
            }

            let mut expected = Vec::from_iter(sources.iter().flatten().cloned());
            if reverse {
                expected.sort_by(|a, b| b.1.cmp(&a.1));
            } else {
                expected.sort_by_key(|item| item.1);
            }

            let merger = MergerBuilder::new()
                .with_key_fn(|item: &(u8, i32)| item.1)
                .with_reverse(reverse)
                .build(sources.iter().cloned().map(source::infallible));
            let actual: Result<Vec<(u8, i32)>, _> = merger.collect();

            assert_eq!(actual.unwrap(), expected);
        }
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_merge_stability(#[case] reverse: bool) {
        let mut rng = rand::thread_rng();
        let mut sources = vec![Vec::new(); 4];
        for _ in 0..2000 {
            let stream = rng.gen_range(0..4);
            let value: i32 = rng.gen_range(0..50);
            sources[stream].push((value, stream));
        }
        for source in sources.iter_mut() {
            source.sort();
            if reverse {
                source.reverse();
            }
        }

        let merger = MergerBuilder::new()
            .with_key_fn(|item: &(i32, usize)| item.0)
            .with_reverse(reverse)
            .build(sources.into_iter().map(source::infallible));
        let actual: Vec<(i32, usize)> = merger.map(Result::unwrap).collect();

        let mut expected = actual.clone();
        if reverse {
            // equal keys still come in ascending input order
            expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        } else {
            expected.sort();
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_equal_keys_follow_source_order() {
        let sources = vec![vec![(5, "a")], vec![(5, "b")]];
        let merger = merge_by_key(sources.into_iter().map(source::infallible), |item: &(i32, &str)| item.0);
        let actual: Vec<(i32, &str)> = merger.map(Result::unwrap).collect();

        assert_eq!(actual, vec![(5, "a"), (5, "b")]);
    }

    #[test]
    fn test_reverse() {
        let sources = vec![vec![3, 2, 1], vec![6, 5, 4]];
        let merger = MergerBuilder::new()
            .with_reverse(true)
            .build(sources.into_iter().map(source::infallible));
        let actual: Vec<i32> = merger.map(Result::unwrap).collect();

        assert_eq!(actual, vec![6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_merge_by() {
        let sources = vec![vec!["kangaroo", "fish", "cat"], vec!["horse", "dog"]];
        let merger = merge_by(sources.into_iter().map(source::infallible), |a: &&str, b: &&str| {
            b.len().cmp(&a.len())
        });
        let actual: Vec<&str> = merger.map(Result::unwrap).collect();

        assert_eq!(actual, vec!["kangaroo", "horse", "fish", "cat", "dog"]);
    }

    #[test]
    fn test_exhaustion_is_final() {
        let mut merger = merge(vec![vec![Ok::<_, io::Error>(1)], vec![Ok(2)]]);

        assert_eq!(merger.next().map(Result::unwrap), Some(1));
        assert_eq!(merger.next().map(Result::unwrap), Some(2));
        assert!(merger.next().is_none());
        assert!(merger.is_exhausted());
        assert!(merger.next().is_none());
        assert_eq!(merger.size_hint(), (0, Some(0)));
    }

    #[test]
    fn test_exhausted_source_is_not_pulled_again() {
        let pulls = Rc::new(Cell::new(0));
        let counting = CountingSource {
            items: vec![1, 2].into_iter(),
            pulls: pulls.clone(),
        };
        let others: Box<dyn Iterator<Item = Result<i32, Infallible>>> =
            Box::new(source::infallible(vec![0, 3, 4, 5]));
        let sources: Vec<Box<dyn Iterator<Item = Result<i32, Infallible>>>> = vec![Box::new(counting), others];

        let mut merger = merge(sources);
        assert_eq!(pulls.get(), 0);

        let actual: Vec<i32> = merger.by_ref().map(Result::unwrap).collect();
        assert_eq!(actual, vec![0, 1, 2, 3, 4, 5]);
        // two items and a single exhaustion signal
        assert_eq!(pulls.get(), 3);
        assert_eq!(merger.live_sources(), 0);

        assert!(merger.next().is_none());
        assert_eq!(pulls.get(), 3);
    }

    #[test]
    fn test_nothing_is_pulled_before_first_request() {
        let pulls = Rc::new(Cell::new(0));
        let key_calls = Rc::new(Cell::new(0));
        let sources = vec![CountingSource {
            items: vec![1].into_iter(),
            pulls: pulls.clone(),
        }];

        let calls = key_calls.clone();
        let mut merger = MergerBuilder::new()
            .with_key_fn(move |item: &i32| {
                calls.set(calls.get() + 1);
                *item
            })
            .build(sources);
        assert_eq!((pulls.get(), key_calls.get()), (0, 0));

        assert_eq!(merger.next().map(Result::unwrap), Some(1));
        assert_eq!((pulls.get(), key_calls.get()), (2, 1));
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(9)]
    fn test_source_error_after_values_is_not_swallowed(#[case] sources_number: usize) {
        let sources = (0..sources_number).map(|_| failing_after(Vec::from_iter(0..10), true));
        let merger = merge(sources);

        let actual: TestResult<Vec<i32>> = merger.collect();
        match actual {
            Err(MergeError::Source(err)) => assert_eq!(err.to_string(), "test error"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[rstest]
    #[case(1)]
    #[case(5)]
    fn test_source_error_on_first_pull(#[case] sources_number: usize) {
        let sources = (0..sources_number).map(|_| failing_after(vec![], true));
        let mut merger = merge(sources);

        let first = merger.next();
        assert!(matches!(first, Some(Err(MergeError::Source(_)))), "first={:?}", first);
    }

    #[test]
    fn test_other_sources_survive_a_failure() {
        let sources = vec![failing_after(vec![1, 4], true), failing_after(vec![2, 3, 5], false)];
        let merger = merge(sources);

        let actual: Vec<Result<i32, String>> = merger.map(|item| item.map_err(|err| err.to_string())).collect();

        // 4 was selected before its source failed, it follows the error
        assert_eq!(
            actual,
            vec![
                Ok(1),
                Ok(2),
                Ok(3),
                Err("source pull failed: test error".to_string()),
                Ok(4),
                Ok(5),
            ]
        );
    }

    #[test]
    fn test_failing_sources_lose_no_values() {
        let sources = (0..2).map(|_| failing_after(Vec::from_iter(0..10), true));
        let merger = merge(sources);

        let (values, errors): (Vec<_>, Vec<_>) = merger.partition(|item| item.is_ok());
        let values = Vec::from_iter(values.into_iter().map(Result::unwrap));

        let mut expected = Vec::from_iter((0..10).chain(0..10));
        expected.sort();
        assert_eq!(values, expected);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|err| matches!(err, Err(MergeError::Source(err)) if err.to_string() == "test error")));
    }

    #[test]
    fn test_invalid_field_key_fails_on_first_pull() {
        let pulls = Rc::new(Cell::new(0));
        let counter = pulls.clone();
        let sources = vec![source::infallible(vec!["a 1".to_string(), "b 2".to_string()])
            .inspect(move |_| counter.set(counter.get() + 1))];

        let mut merger = MergerBuilder::new()
            .with_key(FieldKey::new("0", None))
            .with_comparator(Partial)
            .build(sources);
        assert_eq!(pulls.get(), 0);

        assert_eq!(
            merger.next(),
            Some(Err(MergeError::Key(FieldKeyError::InvalidSpec("0".to_string()))))
        );
        assert_eq!(pulls.get(), 1);
    }

    #[test]
    fn test_key_error_on_refill() {
        let sources = vec![vec![1, 5, 7], vec![2, 3]];
        let merger = MergerBuilder::new()
            .with_try_key_fn(|item: &i32| if *item == 5 { Err("bad key") } else { Ok(*item) })
            .build(sources.into_iter().map(source::infallible));
        let actual: Vec<_> = merger.collect();

        // the source of 5 is dropped, 1 was already selected and is kept
        assert_eq!(actual, vec![Err(MergeError::Key("bad key")), Ok(1), Ok(2), Ok(3)]);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_key_error_is_not_swallowed(#[case] reverse: bool) {
        let sources = vec![Vec::from_iter(0..10), Vec::from_iter(0..10)];
        let mut merger = MergerBuilder::new()
            .with_try_key_fn(|item: &i32| item.checked_div(0).ok_or("division by zero"))
            .with_reverse(reverse)
            .build(sources.into_iter().map(source::infallible));

        assert_eq!(merger.next(), Some(Err(MergeError::Key("division by zero"))));
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_compare_error_on_seeding(#[case] reverse: bool) {
        let mut sources = vec![vec![f64::NAN]];
        sources.extend((0..9).map(|_| Vec::from_iter((0..100).map(|x| x as f64))));
        if reverse {
            sources.iter_mut().for_each(|source| source.reverse());
        }

        let merger = MergerBuilder::new()
            .with_comparator(Partial)
            .with_reverse(reverse)
            .build(sources.into_iter().map(source::infallible));
        let actual: Result<Vec<f64>, _> = merger.collect();

        assert_eq!(actual.unwrap_err(), MergeError::Compare(Incomparable));
    }

    #[rstest]
    #[case(2)]
    #[case(9)]
    fn test_compare_error_while_merging(#[case] sources_number: usize) {
        let mut source = Vec::from_iter((0..10).map(|x| x as f64));
        source.push(f64::NAN);
        let sources = vec![source; sources_number];

        let merger = MergerBuilder::new()
            .with_comparator(Partial)
            .build(sources.into_iter().map(source::infallible));
        let actual: Result<Vec<f64>, _> = merger.collect();

        assert_eq!(actual.unwrap_err(), MergeError::Compare(Incomparable));
    }

    #[test]
    fn test_compare_fn_error_is_passed_as_is() {
        let sources = vec![vec![1, 2], vec![3]];
        let mut merger = MergerBuilder::new()
            .with_try_compare_fn(|_: &i32, _: &i32| -> Result<Ordering, &str> { Err("cannot compare") })
            .build(sources.into_iter().map(source::infallible));

        assert_eq!(merger.next(), Some(Err(MergeError::Compare("cannot compare"))));
    }

    #[test]
    fn test_single_source_needs_no_comparison() {
        let sources = vec![vec![3, 1, 2]];
        let merger = MergerBuilder::new()
            .with_try_compare_fn(|_: &i32, _: &i32| -> Result<Ordering, &str> { Err("cannot compare") })
            .build(sources.into_iter().map(source::infallible));
        let actual: Vec<i32> = merger.map(Result::unwrap).collect();

        assert_eq!(actual, vec![3, 1, 2]);
    }

    #[test]
    fn test_seeding_uses_linear_comparisons() {
        let k = 256;
        let comparisons = Rc::new(Cell::new(0));
        let counter = comparisons.clone();

        let sources = Vec::from_iter((0..k).rev().map(|x| vec![x]));
        let mut merger = MergerBuilder::new()
            .with_compare_fn(move |a: &i32, b: &i32| {
                counter.set(counter.get() + 1);
                a.cmp(b)
            })
            .build(sources.into_iter().map(source::infallible));

        assert_eq!(merger.next(), Some(Ok(0)));
        assert!(comparisons.get() < 2 * k as usize, "comparisons={}", comparisons.get());
    }

    #[test]
    fn test_size_hint_after_compare_error() {
        let sources = vec![vec![1.0, f64::NAN], vec![2.0, 3.0]];
        let mut merger = MergerBuilder::new()
            .with_comparator(Partial)
            .build(sources.into_iter().map(source::infallible));
        assert_eq!(merger.size_hint(), (4, Some(4)));

        assert_eq!(merger.next(), Some(Ok(1.0)));
        assert_eq!(merger.next(), Some(Err(MergeError::Compare(Incomparable))));
        assert_eq!(merger.size_hint().1, None);

        // the same keys keep failing
        assert_eq!(merger.by_ref().take(10).filter(|item| item.is_err()).count(), 10);
    }

    #[test]
    fn test_size_hint() {
        let sources = vec![vec![1, 3], vec![2]];
        let mut merger = merge(sources.into_iter().map(source::infallible));
        assert_eq!(merger.size_hint(), (3, Some(3)));

        merger.next();
        assert_eq!(merger.size_hint(), (2, Some(2)));
    }

    fn compare_vectors_of_result<T: PartialEq, E: Error + 'static>(
        actual: &Vec<Result<T, E>>,
        expected: &Vec<Result<T, E>>,
    ) -> bool {
        actual.len() == expected.len()
            && actual
                .into_iter()
                .zip(expected)
                .all(
                    |(actual_result, expected_result)| match (actual_result, expected_result) {
                        (Ok(actual_result), Ok(expected_result)) if actual_result == expected_result => true,
                        (Err(actual_err), Err(expected_err)) => actual_err.to_string() == expected_err.to_string(),
                        _ => false,
                    },
                )
    }
}
