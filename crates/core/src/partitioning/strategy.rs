use std::{fmt, iter, sync::Arc};

use chrono::NaiveDateTime;

use super::{NameFormat, PartitionSpec, TimePartition, TimePartitionSize};
use crate::{Clock, SystemClock};

pub type PartitionIter<'a> = Box<dyn Iterator<Item = PartitionSpec> + 'a>;

/// Decides which partitions should exist and which may be dropped.
pub trait PartitioningStrategy: fmt::Debug {
    /// Partitions that should exist, ascending. Always finite.
    fn to_create(&self) -> PartitionIter<'_>;

    /// Deletion candidates, walking backward in time. May be unbounded;
    /// consumers stop at the first partition that does not exist.
    fn to_delete(&self) -> PartitionIter<'_>;
}

/// Keeps `count` buckets ahead of the current time and, with `max_age`,
/// offers everything older than that for deletion.
#[derive(Clone)]
pub struct CurrentTimePartitioningStrategy {
    size: TimePartitionSize,
    count: usize,
    max_age: Option<TimePartitionSize>,
    name_format: Option<NameFormat>,
    clock: Arc<dyn Clock>,
}

impl CurrentTimePartitioningStrategy {
    #[must_use]
    pub fn new(size: TimePartitionSize, count: usize) -> Self {
        Self {
            size,
            count,
            max_age: None,
            name_format: None,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: TimePartitionSize) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[must_use]
    pub fn with_name_format(mut self, name_format: NameFormat) -> Self {
        self.name_format = Some(name_format);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn size(&self) -> TimePartitionSize {
        self.size
    }

    /// The partition `dt` belongs in.
    #[must_use]
    pub fn for_datetime(&self, dt: NaiveDateTime) -> TimePartition {
        self.partition_at(self.size.start(dt))
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now().naive_utc()
    }

    fn partition_at(&self, start: NaiveDateTime) -> TimePartition {
        TimePartition::new(self.size, start, self.name_format.as_ref())
    }
}

impl fmt::Debug for CurrentTimePartitioningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentTimePartitioningStrategy")
            .field("size", &self.size)
            .field("count", &self.count)
            .field("max_age", &self.max_age)
            .field("name_format", &self.name_format)
            .finish_non_exhaustive()
    }
}

impl PartitioningStrategy for CurrentTimePartitioningStrategy {
    fn to_create(&self) -> PartitionIter<'_> {
        let first = self.size.start(self.now());
        Box::new(
            iter::successors(Some(first), move |start| Some(self.size.advance(*start)))
                .take(self.count)
                .map(move |start| PartitionSpec::Time(self.partition_at(start))),
        )
    }

    fn to_delete(&self) -> PartitionIter<'_> {
        let Some(max_age) = self.max_age else {
            return Box::new(iter::empty());
        };

        let first = self.size.start(max_age.rewind(self.now()));
        Box::new(
            iter::successors(Some(first), move |start| Some(self.size.rewind(*start)))
                .map(move |start| PartitionSpec::Time(self.partition_at(start))),
        )
    }
}

pub type DeleteCondition = Arc<dyn Fn(&PartitionSpec) -> bool + Send + Sync>;

/// Narrows a delegate's deletions with a predicate.
///
/// Creation candidates are the delegate's deletion candidates, so the
/// partitions this strategy keeps are recreated if they went missing.
#[derive(Clone)]
pub struct DeleteOnConditionPartitioningStrategy<S> {
    delegate: S,
    condition: DeleteCondition,
}

impl<S: PartitioningStrategy> DeleteOnConditionPartitioningStrategy<S> {
    pub fn new(delegate: S, condition: impl Fn(&PartitionSpec) -> bool + Send + Sync + 'static) -> Self {
        Self {
            delegate,
            condition: Arc::new(condition),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for DeleteOnConditionPartitioningStrategy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteOnConditionPartitioningStrategy")
            .field("delegate", &self.delegate)
            .finish_non_exhaustive()
    }
}

impl<S: PartitioningStrategy> PartitioningStrategy for DeleteOnConditionPartitioningStrategy<S> {
    fn to_create(&self) -> PartitionIter<'_> {
        self.delegate.to_delete()
    }

    fn to_delete(&self) -> PartitionIter<'_> {
        let condition = Arc::clone(&self.condition);
        Box::new(
            self.delegate
                .to_delete()
                .filter(move |partition| condition(partition)),
        )
    }
}

/// Fixed lists of partitions, mostly useful for list and hash tables.
#[derive(Debug, Clone, Default)]
pub struct ExplicitPartitioningStrategy {
    create: Vec<PartitionSpec>,
    delete: Vec<PartitionSpec>,
}

impl ExplicitPartitioningStrategy {
    #[must_use]
    pub fn new(create: Vec<PartitionSpec>, delete: Vec<PartitionSpec>) -> Self {
        Self { create, delete }
    }
}

impl PartitioningStrategy for ExplicitPartitioningStrategy {
    fn to_create(&self) -> PartitionIter<'_> {
        Box::new(self.create.iter().cloned())
    }

    fn to_delete(&self) -> PartitionIter<'_> {
        Box::new(self.delete.iter().cloned())
    }
}
