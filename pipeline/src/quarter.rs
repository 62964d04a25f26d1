//! Calendar quarters, the aggregation window of the similarity
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One of the four fixed three-month periods of a year
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn all() -> [Quarter; 4] {
        [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4]
    }

    pub fn code(self) -> &'static str {
        match self {
            Quarter::Q1 => "q1",
            Quarter::Q2 => "q2",
            Quarter::Q3 => "q3",
            Quarter::Q4 => "q4",
        }
    }

    /// Quarter holding `date`
    pub fn of(date: NaiveDate) -> Quarter {
        match date.month() {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    /// First and last day, both inclusive, of the quarter in `year`
    pub fn dates(self, year: i32) -> Result<(NaiveDate, NaiveDate)> {
        let ((start_month, start_day), (end_month, end_day)) = match self {
            Quarter::Q1 => ((1, 1), (3, 31)),
            Quarter::Q2 => ((4, 1), (6, 30)),
            Quarter::Q3 => ((7, 1), (9, 30)),
            Quarter::Q4 => ((10, 1), (12, 31)),
        };
        let date = |month, day| {
            NaiveDate::from_ymd_opt(year, month, day).ok_or(PipelineError::InvalidYear(year))
        };
        Ok((date(start_month, start_day)?, date(end_month, end_day)?))
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        Quarter::of(date) == self
    }
}

/// Inclusive date range of the quarter `code` of `year`. Codes other than `q1`..`q4` are
/// rejected.
pub fn quarter_to_dates(year: i32, code: &str) -> Result<(NaiveDate, NaiveDate)> {
    code.parse::<Quarter>()?.dates(year)
}

impl FromStr for Quarter {
    type Err = PipelineError;

    fn from_str(code: &str) -> Result<Self> {
        match code {
            "q1" => Ok(Quarter::Q1),
            "q2" => Ok(Quarter::Q2),
            "q3" => Ok(Quarter::Q3),
            "q4" => Ok(Quarter::Q4),
            _ => Err(PipelineError::MalformedQuarter(code.to_string())),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarter_of_a_date() {
        assert_eq!(Quarter::of(ymd(2021, 3, 31)), Quarter::Q1);
        assert_eq!(Quarter::of(ymd(2021, 4, 1)), Quarter::Q2);
        assert_eq!(Quarter::of(ymd(2021, 9, 30)), Quarter::Q3);
        assert_eq!(Quarter::of(ymd(2021, 12, 31)), Quarter::Q4);
        assert!(Quarter::Q3.contains(ymd(2020, 8, 15)));
        assert!(!Quarter::Q3.contains(ymd(2020, 10, 15)));
    }

    #[test]
    fn codes_round_trip() {
        for quarter in Quarter::all().iter() {
            assert_eq!(quarter.to_string().parse::<Quarter>().unwrap(), *quarter);
        }
        assert!(matches!(
            "Q1".parse::<Quarter>(),
            Err(PipelineError::MalformedQuarter(code)) if code == "Q1"
        ));
    }

    #[test]
    fn serde_uses_the_code() {
        assert_eq!(serde_json::to_string(&Quarter::Q2).unwrap(), "\"q2\"");
        let quarter: Quarter = serde_json::from_str("\"q4\"").unwrap();
        assert_eq!(quarter, Quarter::Q4);
    }
}
