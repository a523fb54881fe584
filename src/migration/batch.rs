//! Lazy, bounded batch reads

use crate::relational::{RelationalSource, Row, RowQuery, SourceResult};
use std::iter::FusedIterator;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Streams one query in batches of at most `batch_size` mapped rows.
///
/// Each `next()` fetches one page from the source, so at most one batch is
/// held in memory. The reader resumes from the last row cursor it saw and
/// cannot be rewound; a new pass needs a new reader. After a source error
/// the reader yields nothing more.
pub struct BatchReader<S, F> {
    source: S,
    query: RowQuery,
    batch_size: usize,
    map: F,
    cursor: Option<i64>,
    done: bool,
}

impl<S, F, R> BatchReader<S, F>
where
    S: RelationalSource,
    F: FnMut(&Row) -> R,
{
    /// A `batch_size` of 0 is treated as 1
    pub fn new(source: S, query: RowQuery, batch_size: usize, map: F) -> Self {
        Self {
            source,
            query,
            batch_size: batch_size.max(1),
            map,
            cursor: None,
            done: false,
        }
    }

    /// Cursor of the last row read so far; `None` before the first row
    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }
}

impl<S, F, R> Iterator for BatchReader<S, F>
where
    S: RelationalSource,
    F: FnMut(&Row) -> R,
{
    type Item = SourceResult<Vec<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rows = match self.source.fetch_rows(&self.query, self.cursor, self.batch_size) {
            Ok(rows) => rows,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let Some(last) = rows.last() else {
            self.done = true;
            return None;
        };
        self.cursor = Some(last.cursor);
        if rows.len() < self.batch_size {
            self.done = true;
        }

        Some(Ok(rows.iter().map(&mut self.map).collect()))
    }
}

impl<S, F, R> FusedIterator for BatchReader<S, F>
where
    S: RelationalSource,
    F: FnMut(&Row) -> R,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::{Cell, SourceError};
    use std::cell::Cell as Counter;

    /// Source over an in-memory table of sequential cursors
    struct VecSource {
        rows: Vec<Row>,
        fetches: Counter<usize>,
        fail_after: Option<usize>,
    }

    impl VecSource {
        fn new(n: i64) -> Self {
            Self::with_cursors(1..=n)
        }

        fn with_cursors(cursors: impl IntoIterator<Item = i64>) -> Self {
            Self {
                rows: cursors
                    .into_iter()
                    .map(|i| Row::new(i, vec![Cell::Integer(i * 10)]))
                    .collect(),
                fetches: Counter::new(0),
                fail_after: None,
            }
        }
    }

    impl RelationalSource for VecSource {
        fn fetch_rows(&self, _query: &RowQuery, after: Option<i64>, limit: usize) -> SourceResult<Vec<Row>> {
            let calls = self.fetches.get();
            self.fetches.set(calls + 1);
            if self.fail_after.is_some_and(|n| calls >= n) {
                return Err(SourceError::InvalidQuery("connection lost".to_string()));
            }
            Ok(self
                .rows
                .iter()
                .filter(|row| after.map_or(true, |after| row.cursor > after))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    const QUERY: RowQuery = RowQuery {
        table: "t",
        columns: &["v"],
    };

    #[test]
    fn test_batches_are_bounded_and_complete() {
        let source = VecSource::new(5);
        let batches: Vec<Vec<i64>> = BatchReader::new(&source, QUERY, 2, |row: &Row| row.cursor)
            .collect::<SourceResult<_>>()
            .unwrap();

        assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
        // The short last page ends the pass without another fetch
        assert_eq!(source.fetches.get(), 3);
    }

    #[test]
    fn test_exact_multiple_needs_one_empty_fetch() {
        let source = VecSource::new(4);
        let batches: Vec<Vec<i64>> = BatchReader::new(&source, QUERY, 2, |row: &Row| row.cursor)
            .collect::<SourceResult<_>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(source.fetches.get(), 3);
    }

    #[test]
    fn test_reader_is_lazy() {
        let source = VecSource::new(10);
        let mut reader = BatchReader::new(&source, QUERY, 3, |row: &Row| row.cursor);
        assert_eq!(reader.cursor(), None);
        assert_eq!(source.fetches.get(), 0);
        reader.next();
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(reader.cursor(), Some(3));
    }

    #[test]
    fn test_error_ends_the_pass() {
        let mut source = VecSource::new(10);
        source.fail_after = Some(1);
        let mut reader = BatchReader::new(&source, QUERY, 3, |row: &Row| row.cursor);

        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let source = VecSource::new(2);
        let count = BatchReader::new(&source, QUERY, 0, |row: &Row| row.cursor).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_zero_and_negative_cursors_are_read() {
        let source = VecSource::with_cursors([i64::MIN, -5, 0, 1, 2]);
        let batches: Vec<Vec<i64>> = BatchReader::new(&source, QUERY, 2, |row: &Row| row.cursor)
            .collect::<SourceResult<_>>()
            .unwrap();
        assert_eq!(batches, vec![vec![i64::MIN, -5], vec![0, 1], vec![2]]);
    }
}
