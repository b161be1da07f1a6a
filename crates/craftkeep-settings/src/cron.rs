//! Validation of five-field cron schedules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("schedule is empty")]
    Empty,
    #[error("expected 5 fields, got {0}")]
    FieldCount(usize),
    #[error("unknown macro {0}")]
    UnknownMacro(String),
    #[error("invalid {field} field {value:?}")]
    InvalidField { field: CronField, value: String },
    #[error("{field} value {value} is outside {min}-{max}")]
    OutOfRange {
        field: CronField,
        value: u32,
        min: u32,
        max: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronField {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl CronField {
    const ALL: [Self; 5] = [
        Self::Minute,
        Self::Hour,
        Self::DayOfMonth,
        Self::Month,
        Self::DayOfWeek,
    ];

    const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            // 7 is accepted as a second spelling of Sunday.
            Self::DayOfWeek => (0, 7),
        }
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            Self::Month => &[
                "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
            ],
            Self::DayOfWeek => &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"],
            _ => &[],
        }
    }

    fn value(self, token: &str) -> Result<u32, CronError> {
        let (min, max) = self.bounds();
        let value = if let Ok(n) = token.parse::<u32>() {
            n
        } else {
            let offset = self
                .names()
                .iter()
                .position(|name| name.eq_ignore_ascii_case(token))
                .ok_or_else(|| self.invalid(token))?;
            u32::try_from(offset).map_err(|_| self.invalid(token))? + min
        };
        if value < min || value > max {
            return Err(CronError::OutOfRange {
                field: self,
                value,
                min,
                max,
            });
        }
        Ok(value)
    }

    fn invalid(self, value: &str) -> CronError {
        CronError::InvalidField {
            field: self,
            value: value.to_string(),
        }
    }

    fn validate(self, text: &str) -> Result<(), CronError> {
        for item in text.split(',') {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };

            if let Some(step) = step {
                match step.parse::<u32>() {
                    Ok(n) if n > 0 => {}
                    _ => return Err(self.invalid(item)),
                }
            }

            if range == "*" {
                continue;
            }
            match range.split_once('-') {
                Some((start, end)) => {
                    let start = self.value(start)?;
                    let end = self.value(end)?;
                    if start > end {
                        return Err(self.invalid(item));
                    }
                }
                None if step.is_some() || !range.is_empty() => {
                    self.value(range)?;
                }
                None => return Err(self.invalid(item)),
            }
        }
        Ok(())
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
        })
    }
}

const MACROS: [&str; 7] = [
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

/// A recurring schedule in standard five-field cron syntax.
///
/// Only the syntax is checked here; firing the schedule is up to the
/// external scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CronExpression(String);

impl CronExpression {
    /// Parse and normalise whitespace.
    ///
    /// # Errors
    /// Returns the first syntax problem found in the expression.
    pub fn parse(text: &str) -> Result<Self, CronError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CronError::Empty);
        }

        if text.starts_with('@') {
            let lowered = text.to_ascii_lowercase();
            return if MACROS.contains(&lowered.as_str()) {
                Ok(Self(lowered))
            } else {
                Err(CronError::UnknownMacro(text.to_string()))
            };
        }

        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != CronField::ALL.len() {
            return Err(CronError::FieldCount(fields.len()));
        }
        for (field, text) in CronField::ALL.iter().zip(&fields) {
            field.validate(text)?;
        }

        Ok(Self(fields.join(" ")))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CronExpression {
    type Error = CronError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CronExpression> for String {
    fn from(value: CronExpression) -> Self {
        value.0
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
