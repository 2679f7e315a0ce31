use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used for Earth Engine filter parameters and CSV output: "YYYY-MM-DD"
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A half-open date range `[start, end)` used as the unit of batch collection.
///
/// Invariant: `start < end`. Built through [`generate`], never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateInterval { start, end }
    }

    /// Format as "YYYY-MM-DD to YYYY-MM-DD", for logs and failure messages.
    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Step size between interval boundaries.
///
/// Calendar months clamp to the end of shorter months (Jan 31 + 3 months
/// lands on Apr 30); day steps are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Months(u32),
    Days(u64),
}

impl Cadence {
    /// The quarterly cadence used for long-running river analysis.
    pub const THREE_MONTHS: Cadence = Cadence::Months(3);

    /// The fine-grained cadence used for short spans.
    pub const FIFTEEN_DAYS: Cadence = Cadence::Days(15);

    fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Cadence::Months(n) => date.checked_add_months(Months::new(n)),
            Cadence::Days(n) => date.checked_add_days(Days::new(n)),
        }
    }
}

/// Generate contiguous intervals covering `[start, end]` at the given cadence.
///
/// Each interval ends where the next begins. The final interval is clamped so
/// its end never exceeds `end`. Returns an empty vector when `start >= end`.
pub fn generate(start: NaiveDate, end: NaiveDate, cadence: Cadence) -> Vec<DateInterval> {
    let mut intervals = Vec::new();
    let mut current = start;

    while current < end {
        let next = match cadence.advance(current) {
            Some(d) => d,
            // Date arithmetic overflow (year ~262143); treat as past `end`.
            None => end,
        };
        if next >= end {
            intervals.push(DateInterval::new(current, end));
            break;
        }
        intervals.push(DateInterval::new(current, next));
        current = next;
    }

    intervals
}
