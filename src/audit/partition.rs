//! Date partitioning of the audit directory.
//!
//! Records are written under `<root>/<year>/<month>/<day>`. Month and day are
//! not zero padded. Production uses `/`; any other profile uses the host
//! separator.

use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};

/// Source of "today" for partitioning.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Calendar segments and separator for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub separator: char,
}

impl Partition {
    pub fn at(date: NaiveDate, production: bool) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            separator: separator_for(production),
        }
    }

    /// `year<sep>month<sep>day`
    pub fn relative(&self) -> String {
        let sep = self.separator;
        format!("{}{sep}{}{sep}{}", self.year, self.month, self.day)
    }

    /// Append this partition to a root directory.
    pub fn under(&self, root: &str) -> String {
        let root = root.trim_end_matches(|c: char| c == '/' || c == '\\');
        format!("{root}{}{}", self.separator, self.relative())
    }
}

pub fn separator_for(production: bool) -> char {
    if production {
        '/'
    } else {
        MAIN_SEPARATOR
    }
}

/// Computes the partition for "now".
#[derive(Clone)]
pub struct DatePartitioner {
    production: bool,
    clock: Arc<dyn Clock>,
}

impl DatePartitioner {
    pub fn new(production: bool) -> Self {
        Self::with_clock(production, Arc::new(SystemClock))
    }

    pub fn with_clock(production: bool, clock: Arc<dyn Clock>) -> Self {
        Self { production, clock }
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    pub fn separator(&self) -> char {
        separator_for(self.production)
    }

    pub fn current(&self) -> Partition {
        Partition::at(self.clock.today(), self.production)
    }
}

impl std::fmt::Debug for DatePartitioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatePartitioner")
            .field("production", &self.production)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march_fifth() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_production_partition() {
        let partition = Partition::at(march_fifth(), true);
        assert_eq!((partition.year, partition.month, partition.day), (2024, 3, 5));
        assert_eq!(partition.relative(), "2024/3/5");
        assert_eq!(partition.under("/var/log/audit"), "/var/log/audit/2024/3/5");
        assert_eq!(partition.under("/var/log/audit/"), "/var/log/audit/2024/3/5");
    }

    #[test]
    fn test_development_uses_host_separator() {
        let partition = Partition::at(march_fifth(), false);
        let sep = MAIN_SEPARATOR;
        assert_eq!(partition.relative(), format!("2024{sep}3{sep}5"));
        assert_eq!(partition.under("logs"), format!("logs{sep}2024{sep}3{sep}5"));
    }

    #[test]
    fn test_partitioner_uses_clock() {
        let partitioner = DatePartitioner::with_clock(true, Arc::new(FixedClock(march_fifth())));
        assert!(partitioner.is_production());
        assert_eq!(partitioner.separator(), '/');
        assert_eq!(partitioner.current().relative(), "2024/3/5");
    }

    #[test]
    fn test_system_clock_is_today() {
        let partitioner = DatePartitioner::new(false);
        assert_eq!(partitioner.current().year, Local::now().year());
    }
}
