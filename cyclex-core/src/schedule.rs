//! ## cyclex-core::schedule
//! **Subtasks and the validated cycle table**
//!
//! A [`CycleSpec`] is the static plan of one cycle: an ordered list of
//! subtasks, each owning a fixed slot of the period. The slots always add up
//! to the cycle length exactly. The builder pads the remainder with a no-op
//! filler slot so the loop sleeps out the rest of the period.

use std::fmt;

use crate::error::ScheduleError;

/// Name given to the filler slot appended by [`CycleSpecBuilder::build`].
/// The angle brackets keep it outside the names configuration accepts.
pub const FILLER_NAME: &str = "<filler>";

/// A unit of work run once per cycle inside its slot.
///
/// Bodies run synchronously on the scheduler thread and are never preempted.
pub trait Subtask: Send {
    fn execute(&mut self);
}

impl<F> Subtask for F
where
    F: FnMut() + Send,
{
    #[inline]
    fn execute(&mut self) {
        self()
    }
}

/// One slot of the cycle.
pub struct SubtaskEntry {
    name: String,
    interval_ns: u64,
    task: Box<dyn Subtask>,
}

impl SubtaskEntry {
    pub fn new(name: impl Into<String>, interval_ns: u64, task: impl Subtask + 'static) -> Self {
        Self {
            name: name.into(),
            interval_ns,
            task: Box::new(task),
        }
    }

    fn filler(interval_ns: u64) -> Self {
        Self::new(FILLER_NAME, interval_ns, || {})
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn interval_ns(&self) -> u64 {
        self.interval_ns
    }

    #[inline]
    pub fn execute(&mut self) {
        self.task.execute();
    }
}

impl fmt::Debug for SubtaskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtaskEntry")
            .field("name", &self.name)
            .field("interval_ns", &self.interval_ns)
            .finish_non_exhaustive()
    }
}

/// Validated cycle table. Invariant: `sum(interval_ns) == cycle_ns`.
#[derive(Debug)]
pub struct CycleSpec {
    cycle_ns: u64,
    entries: Vec<SubtaskEntry>,
}

impl CycleSpec {
    pub fn builder(cycle_ns: u64) -> CycleSpecBuilder {
        CycleSpecBuilder {
            cycle_ns,
            entries: Vec::new(),
        }
    }

    /// The simplified variant: one subtask owning the whole period.
    pub fn single(
        cycle_ns: u64,
        name: impl Into<String>,
        task: impl Subtask + 'static,
    ) -> Result<Self, ScheduleError> {
        Self::from_entries(cycle_ns, vec![SubtaskEntry::new(name, cycle_ns, task)])
    }

    /// Takes a complete table as-is. The intervals must sum to the cycle
    /// length exactly, no filler is added.
    pub fn from_entries(cycle_ns: u64, entries: Vec<SubtaskEntry>) -> Result<Self, ScheduleError> {
        if entries.is_empty() {
            return Err(ScheduleError::EmptyTable);
        }
        let total_ns = validate_intervals(cycle_ns, &entries)?;
        if total_ns != cycle_ns as u128 {
            return Err(ScheduleError::IntervalMismatch { total_ns, cycle_ns });
        }
        Ok(Self { cycle_ns, entries })
    }

    #[inline]
    pub fn cycle_ns(&self) -> u64 {
        self.cycle_ns
    }

    pub fn entries(&self) -> &[SubtaskEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [SubtaskEntry] {
        &mut self.entries
    }

    pub fn total_interval_ns(&self) -> u128 {
        self.entries.iter().map(|e| e.interval_ns as u128).sum()
    }
}

pub struct CycleSpecBuilder {
    cycle_ns: u64,
    entries: Vec<SubtaskEntry>,
}

impl CycleSpecBuilder {
    pub fn subtask(
        mut self,
        name: impl Into<String>,
        interval_ns: u64,
        task: impl Subtask + 'static,
    ) -> Self {
        self.entries.push(SubtaskEntry::new(name, interval_ns, task));
        self
    }

    pub fn entry(mut self, entry: SubtaskEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Validates the table and appends the filler slot for the remainder.
    pub fn build(self) -> Result<CycleSpec, ScheduleError> {
        let Self {
            cycle_ns,
            mut entries,
        } = self;

        let total_ns = validate_intervals(cycle_ns, &entries)?;
        let remainder = cycle_ns as u128 - total_ns;
        if remainder > 0 {
            entries.push(SubtaskEntry::filler(remainder as u64));
        }

        Ok(CycleSpec { cycle_ns, entries })
    }
}

/// Checks the cycle and every slot, returning the slot total when it fits.
fn validate_intervals(cycle_ns: u64, entries: &[SubtaskEntry]) -> Result<u128, ScheduleError> {
    if cycle_ns == 0 {
        return Err(ScheduleError::ZeroCycle);
    }
    if let Some(entry) = entries.iter().find(|e| e.interval_ns == 0) {
        return Err(ScheduleError::ZeroInterval {
            name: entry.name.clone(),
        });
    }

    let total_ns: u128 = entries.iter().map(|e| e.interval_ns as u128).sum();
    if total_ns > cycle_ns as u128 {
        return Err(ScheduleError::IntervalsExceedCycle { total_ns, cycle_ns });
    }
    Ok(total_ns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CYCLE: u64 = 40_000_000;
    const TICK: u64 = 250_000;

    #[test]
    fn builder_appends_filler() {
        let spec = CycleSpec::builder(CYCLE)
            .subtask("dummy", 40 * TICK, || {})
            .build()
            .unwrap();

        let names: Vec<_> = spec.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["dummy", FILLER_NAME]);
        assert_eq!(spec.entries()[1].interval_ns(), 120 * TICK);
        assert_eq!(spec.total_interval_ns(), CYCLE as u128);
    }

    #[test]
    fn exact_table_gets_no_filler() {
        let spec = CycleSpec::builder(CYCLE)
            .subtask("recv", CYCLE / 2, || {})
            .subtask("send", CYCLE / 2, || {})
            .build()
            .unwrap();
        assert_eq!(spec.entries().len(), 2);
    }

    #[test]
    fn empty_builder_is_one_filler_slot() {
        let spec = CycleSpec::builder(CYCLE).build().unwrap();
        assert_eq!(spec.entries().len(), 1);
        assert_eq!(spec.entries()[0].interval_ns(), CYCLE);
    }

    #[test]
    fn rejects_overcommitted_table() {
        let err = CycleSpec::builder(CYCLE)
            .subtask("algo", 30_000_000, || {})
            .subtask("send", 15_000_000, || {})
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::IntervalsExceedCycle {
                total_ns: 45_000_000,
                cycle_ns: CYCLE
            }
        );
    }

    #[test]
    fn rejects_zero_cycle_and_zero_interval() {
        assert_eq!(
            CycleSpec::builder(0).build().unwrap_err(),
            ScheduleError::ZeroCycle
        );
        assert_eq!(
            CycleSpec::builder(CYCLE)
                .subtask("idle", 0, || {})
                .build()
                .unwrap_err(),
            ScheduleError::ZeroInterval {
                name: "idle".into()
            }
        );
    }

    #[test]
    fn from_entries_requires_exact_sum() {
        let err = CycleSpec::from_entries(CYCLE, vec![SubtaskEntry::new("a", CYCLE - 1, || {})])
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::IntervalMismatch {
                total_ns: (CYCLE - 1) as u128,
                cycle_ns: CYCLE
            }
        );
        assert_eq!(
            CycleSpec::from_entries(CYCLE, Vec::new()).unwrap_err(),
            ScheduleError::EmptyTable
        );
    }

    #[test]
    fn single_spans_the_cycle() {
        let spec = CycleSpec::single(CYCLE, "sample", || {}).unwrap();
        assert_eq!(spec.entries().len(), 1);
        assert_eq!(spec.entries()[0].interval_ns(), CYCLE);
    }

    #[test]
    fn entries_execute_their_body() {
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = hits.clone();
        let mut entry = SubtaskEntry::new("count", 1, move || {
            seen.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        });
        entry.execute();
        entry.execute();
        assert_eq!(hits.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    proptest! {
        #[test]
        fn built_tables_sum_to_cycle(
            cycle in 1u64..1_000_000_000,
            intervals in proptest::collection::vec(1u64..200_000_000, 0..12),
        ) {
            let total: u128 = intervals.iter().map(|&i| i as u128).sum();
            let builder = intervals
                .iter()
                .enumerate()
                .fold(CycleSpec::builder(cycle), |b, (i, &ns)| b.subtask(format!("t{i}"), ns, || {}));

            match builder.build() {
                Ok(spec) => {
                    prop_assert!(total <= cycle as u128);
                    prop_assert_eq!(spec.total_interval_ns(), cycle as u128);
                    prop_assert!(spec.entries().iter().all(|e| e.interval_ns() > 0));
                }
                Err(err) => {
                    prop_assert!(total > cycle as u128);
                    prop_assert_eq!(err, ScheduleError::IntervalsExceedCycle { total_ns: total, cycle_ns: cycle });
                }
            }
        }
    }
}
