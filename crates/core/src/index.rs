//! Per-second bucket index over a session's change log.
//!
//! `buckets[s]` holds every record whose timestamp falls in
//! `[s * 1000, (s + 1) * 1000)`. The bucket array is dense: every second from
//! zero to the last record has a bucket, possibly empty.

use crate::error::Error;
use crate::record::ChangeRecord;
use crate::result::Result;

/// Width of one bucket in milliseconds.
pub const BUCKET_MS: u64 = 1000;

/// Latest timestamp a session may carry: 24 hours.
///
/// Bounds the dense bucket array at 86 400 entries.
pub const MAX_TIMELINE_MS: u64 = 24 * 60 * 60 * BUCKET_MS;

/// Check that `timestamp` lies on a timeline the index can cover.
///
/// # Errors
///
/// Returns [`Error::TimelineTooLong`] for timestamps past [`MAX_TIMELINE_MS`].
pub fn check_timeline(timestamp: u64) -> Result<()> {
    if timestamp > MAX_TIMELINE_MS {
        return Err(Error::TimelineTooLong {
            timestamp,
            max: MAX_TIMELINE_MS,
        });
    }
    Ok(())
}

/// Read-only bucket index built once per playback load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeIndex {
    buckets: Vec<Vec<ChangeRecord>>,
}

impl ChangeIndex {
    /// Index a log ordered by non-decreasing timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsortedLog`] at the first record whose timestamp is
    /// smaller than its predecessor's and [`Error::TimelineTooLong`] at the
    /// first record past [`MAX_TIMELINE_MS`].
    pub fn build(changes: impl IntoIterator<Item = ChangeRecord>) -> Result<Self> {
        let mut buckets: Vec<Vec<ChangeRecord>> = Vec::new();
        let mut previous: Option<u64> = None;

        for (position, record) in changes.into_iter().enumerate() {
            if let Some(previous) = previous.filter(|prev| record.timestamp < *prev) {
                return Err(Error::UnsortedLog {
                    position,
                    previous,
                    timestamp: record.timestamp,
                });
            }
            previous = Some(record.timestamp);
            check_timeline(record.timestamp)?;

            let second = bucket_of(record.timestamp);
            match buckets.get_mut(second) {
                Some(bucket) => bucket.push(record),
                None => {
                    buckets.resize_with(second, Vec::new);
                    buckets.push(vec![record]);
                }
            }
        }

        tracing::debug!(buckets = buckets.len(), "Built change index");
        Ok(Self { buckets })
    }

    /// Wrap buckets that were already partitioned by second.
    pub const fn from_buckets(buckets: Vec<Vec<ChangeRecord>>) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[Vec<ChangeRecord>] {
        &self.buckets
    }

    /// Number of buckets (seconds covered).
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.buckets
            .iter()
            .rev()
            .find_map(|bucket| bucket.last())
            .map(|record| record.timestamp)
    }

    /// Records with `min(a, b) <= timestamp < max(a, b)`, in log order.
    ///
    /// Only the buckets overlapping the interval are visited. The direction
    /// of `a` and `b` does not matter; callers that scrub backwards reverse
    /// the result themselves.
    pub fn query_range(&self, time_start: u64, time_end: u64) -> Vec<&ChangeRecord> {
        let from = time_start.min(time_end);
        let to = time_start.max(time_end);
        let from_second = bucket_of(from);
        let bucket_span = bucket_of(to).saturating_sub(from_second).saturating_add(1);

        self.buckets
            .iter()
            .skip(from_second)
            .take(bucket_span)
            .flatten()
            .filter(|record| from <= record.timestamp && record.timestamp < to)
            .collect()
    }
}

/// Build a [`ChangeIndex`]; see [`ChangeIndex::build`].
///
/// # Errors
///
/// Returns [`Error::UnsortedLog`] for logs that are not ordered by timestamp
/// and [`Error::TimelineTooLong`] for records past [`MAX_TIMELINE_MS`].
pub fn index_changes(changes: impl IntoIterator<Item = ChangeRecord>) -> Result<ChangeIndex> {
    ChangeIndex::build(changes)
}

/// Query a [`ChangeIndex`]; see [`ChangeIndex::query_range`].
pub fn query_range(index: &ChangeIndex, time_start: u64, time_end: u64) -> Vec<&ChangeRecord> {
    index.query_range(time_start, time_end)
}

fn bucket_of(timestamp: u64) -> usize {
    usize::try_from(timestamp / BUCKET_MS).unwrap_or(usize::MAX)
}
