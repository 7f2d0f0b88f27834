//! Batcher module for the bulk indexer pipeline.
//!
//! Groups a lazy document sequence into bounded batches without ever holding
//! more than one batch in memory.

/// Default number of documents per bulk request.
pub const DEFAULT_BATCH_SIZE: usize = 20_000;

/// Group `source` into batches of `batch_size`.
///
/// Full batches are yielded as soon as they fill up. Once the source is
/// exhausted, one trailing batch holding the remainder is yielded, even when
/// the remainder is empty; callers skip an empty trailing batch. A source of
/// `N` items therefore yields `N / batch_size + 1` batches, `ceil(N /
/// batch_size)` of them non-empty.
///
/// A `batch_size` of zero is treated as one.
pub fn produce_batches<I>(source: I, batch_size: usize) -> Batches<I::IntoIter>
where
    I: IntoIterator,
{
    Batches {
        source: source.into_iter(),
        batch_size: batch_size.max(1),
        done: false,
    }
}

/// Like `produce_batches`, for a fallible source.
///
/// The first `Err` from the source is yielded in place of the batch being
/// filled, and the iterator ends after it.
pub fn try_produce_batches<I, T, E>(source: I, batch_size: usize) -> TryBatches<I::IntoIter>
where
    I: IntoIterator<Item = Result<T, E>>,
{
    TryBatches {
        source: source.into_iter(),
        batch_size: batch_size.max(1),
        done: false,
    }
}

/// Iterator returned by [`produce_batches`].
pub struct Batches<I> {
    source: I,
    batch_size: usize,
    done: bool,
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.source.next() {
                Some(item) => batch.push(item),
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        Some(batch)
    }
}

/// Iterator returned by [`try_produce_batches`].
pub struct TryBatches<I> {
    source: I,
    batch_size: usize,
    done: bool,
}

impl<I, T, E> Iterator for TryBatches<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = Result<Vec<T>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.source.next() {
                Some(Ok(item)) => batch.push(item),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        Some(Ok(batch))
    }
}
