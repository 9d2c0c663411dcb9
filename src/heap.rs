//! Selection heap.

/// Binary heap whose ordering predicate is allowed to fail.
///
/// `std::collections::BinaryHeap` requires an infallible [`Ord`], so a comparison error could neither be reported
/// nor recovered from. This heap never runs a sift on its own: mutating operations only record which positions
/// may violate the heap property and [`SelectionHeap::settle`] repairs them with a caller-provided predicate.
/// If the predicate fails half way through a sift the reached position is kept, so the next `settle` call
/// resumes the interrupted work and no entry is lost.
pub struct SelectionHeap<E> {
    entries: Vec<E>,
    // positions that still need a sift-down, processed from the back
    pending: Vec<usize>,
}

impl<E> SelectionHeap<E> {
    /// Creates an empty heap able to hold `capacity` entries without reallocation.
    pub fn with_capacity(capacity: usize) -> Self {
        return SelectionHeap {
            entries: Vec::with_capacity(capacity),
            pending: Vec::new(),
        };
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if the heap has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks if the heap property is known to hold.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Appends an entry without restoring the heap property.
    /// Call [`SelectionHeap::build`] once all unordered entries are pushed.
    pub fn push_unordered(&mut self, entry: E) {
        self.entries.push(entry);
    }

    /// Schedules a bottom-up heap construction: a sift-down for every inner node, deepest first.
    /// Costs O(*n*) comparisons once settled.
    pub fn build(&mut self) {
        self.pending.clear();
        // pending is consumed from the back, so pushing in ascending order visits the deepest node first
        self.pending.extend(0..self.entries.len() / 2);
    }

    /// Runs all pending sift-downs.
    ///
    /// `less(a, b)` must return `true` when `a` has to be selected before `b`.
    /// An error returned by `less` is passed through untouched; the heap stays consistent and the remaining work
    /// is kept for the next call.
    pub fn settle<F, Err>(&mut self, mut less: F) -> Result<(), Err>
    where
        F: FnMut(&E, &E) -> Result<bool, Err>,
    {
        while let Some(pos) = self.pending.last_mut() {
            sift_down(&mut self.entries, pos, &mut less)?;
            self.pending.pop();
        }

        return Ok(());
    }

    /// Returns the top entry. Only meaningful for a settled heap.
    pub fn peek(&self) -> Option<&E> {
        debug_assert!(self.is_settled());
        self.entries.first()
    }

    /// Replaces the top entry returning the previous one. The new entry is sifted down on the next settle.
    pub fn replace_top(&mut self, entry: E) -> Option<E> {
        let top = self.entries.first_mut()?;
        let prev = std::mem::replace(top, entry);
        self.pending.push(0);

        return Some(prev);
    }

    /// Removes the top entry. The entry moved to the top is sifted down on the next settle.
    pub fn pop_top(&mut self) -> Option<E> {
        if self.entries.is_empty() {
            return None;
        }

        let top = self.entries.swap_remove(0);
        if self.entries.len() > 1 {
            self.pending.push(0);
        }

        return Some(top);
    }
}

fn sift_down<E, F, Err>(entries: &mut [E], pos: &mut usize, less: &mut F) -> Result<(), Err>
where
    F: FnMut(&E, &E) -> Result<bool, Err>,
{
    loop {
        let left = 2 * *pos + 1;
        if left >= entries.len() {
            return Ok(());
        }

        let right = left + 1;
        let child = if right < entries.len() && less(&entries[right], &entries[left])? {
            right
        } else {
            left
        };

        if !less(&entries[child], &entries[*pos])? {
            return Ok(());
        }

        entries.swap(*pos, child);
        *pos = child;
    }
}
