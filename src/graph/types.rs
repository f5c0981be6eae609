//! Core type definitions for decoded graph values

use chrono::{Datelike, Months, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// Server-assigned node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl NodeId {
    pub fn new(id: i64) -> Self {
        NodeId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        NodeId(id)
    }
}

/// Server-assigned edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EdgeId(pub i64);

impl EdgeId {
    pub fn new(id: i64) -> Self {
        EdgeId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EdgeId {
    fn from(id: i64) -> Self {
        EdgeId(id)
    }
}

/// Geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point({{latitude: {}, longitude: {}}})", self.latitude, self.longitude)
    }
}

/// Calendar duration balanced up to years
///
/// All fields share the sign of the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphDuration {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl GraphDuration {
    /// Calendar difference between `start` and `end`
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if end < start {
            return Self::between(end, start).map(|d| d.negated());
        }

        let mut months = (end.year() as i64 - start.year() as i64) * 12
            + (end.month0() as i64 - start.month0() as i64);
        let mut anchor = start.checked_add_months(Months::new(u32::try_from(months.max(0)).ok()?))?;
        while anchor > end && months > 0 {
            months -= 1;
            anchor = start.checked_add_months(Months::new(months as u32))?;
        }

        let rest = end - anchor;
        let total_seconds = rest.num_seconds();
        Some(Self {
            years: months / 12,
            months: months % 12,
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            seconds: total_seconds % 60,
        })
    }

    pub fn negated(&self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for GraphDuration {
    /// ISO 8601, e.g. `P1Y2M3DT4H5M6S`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "PT0S");
        }
        let negative = [self.years, self.months, self.days, self.hours, self.minutes, self.seconds]
            .iter()
            .any(|v| *v < 0);
        let d = if negative { self.negated() } else { *self };
        if negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;
        for (value, unit) in [(d.years, 'Y'), (d.months, 'M'), (d.days, 'D')] {
            if value != 0 {
                write!(f, "{}{}", value, unit)?;
            }
        }
        if d.hours != 0 || d.minutes != 0 || d.seconds != 0 {
            write!(f, "T")?;
            for (value, unit) in [(d.hours, 'H'), (d.minutes, 'M'), (d.seconds, 'S')] {
                if value != 0 {
                    write!(f, "{}{}", value, unit)?;
                }
            }
        }
        Ok(())
    }
}

impl Serialize for GraphDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
