use std::fmt;

use chrono::{Duration, Local, NaiveDate};
use thiserror::Error;

use crate::apod::DATE_FORMAT;

const DATE_INPUT_LEN: usize = 10;

/// First day published in the APOD archive.
pub fn archive_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    pub fn other(self) -> Self {
        match self {
            DateField::Start => DateField::End,
            DateField::End => DateField::Start,
        }
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateField::Start => f.write_str("Start"),
            DateField::End => f.write_str("End"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select both start and end dates.")]
    MissingDates,
    #[error("{field} date {value:?} is not a valid YYYY-MM-DD date.")]
    InvalidDate { field: DateField, value: String },
    #[error("Start date must be before or equal to end date.")]
    StartAfterEnd,
    #[error("Dates must fall between {earliest} and {latest}.")]
    OutOfRange {
        earliest: NaiveDate,
        latest: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// The pair of editable date fields the user submits from.
///
/// Field contents are kept as raw text, the way an input element exposes
/// `.value`; nothing is parsed until [`DateRangeInput::read`].
#[derive(Debug, Clone)]
pub struct DateRangeInput {
    start: String,
    end: String,
    focused: DateField,
}

impl DateRangeInput {
    /// Fields covering `days` days ending on `today`, clamped to the archive.
    pub fn with_defaults(today: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        let start = (today - Duration::days(span)).max(archive_start());
        Self {
            start: start.format(DATE_FORMAT).to_string(),
            end: today.format(DATE_FORMAT).to_string(),
            focused: DateField::Start,
        }
    }

    pub fn value(&self, field: DateField) -> &str {
        match field {
            DateField::Start => &self.start,
            DateField::End => &self.end,
        }
    }

    pub fn set(&mut self, field: DateField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DateField::Start => self.start = value,
            DateField::End => self.end = value,
        }
    }

    pub fn focused(&self) -> DateField {
        self.focused
    }

    pub fn focus(&mut self, field: DateField) {
        self.focused = field;
    }

    /// Appends to the focused field. Only digits and dashes are accepted.
    pub fn push_char(&mut self, ch: char) -> bool {
        if !(ch.is_ascii_digit() || ch == '-') {
            return false;
        }
        let field = self.field_mut(self.focused);
        if field.len() >= DATE_INPUT_LEN {
            return false;
        }
        field.push(ch);
        true
    }

    pub fn backspace(&mut self) -> bool {
        self.field_mut(self.focused).pop().is_some()
    }

    pub fn clear(&mut self) {
        self.field_mut(self.focused).clear();
    }

    fn field_mut(&mut self, field: DateField) -> &mut String {
        match field {
            DateField::Start => &mut self.start,
            DateField::End => &mut self.end,
        }
    }

    /// Validates the two fields and returns the range to fetch. The upper
    /// bound is the local date at the time of the call.
    pub fn read(&self) -> Result<DateRange, ValidationError> {
        self.read_on(Local::now().date_naive())
    }

    fn read_on(&self, today: NaiveDate) -> Result<DateRange, ValidationError> {
        let start_raw = self.start.trim();
        let end_raw = self.end.trim();
        if start_raw.is_empty() || end_raw.is_empty() {
            return Err(ValidationError::MissingDates);
        }

        let start = parse_field(DateField::Start, start_raw)?;
        let end = parse_field(DateField::End, end_raw)?;
        if start > end {
            return Err(ValidationError::StartAfterEnd);
        }

        let earliest = archive_start();
        if start < earliest || end > today {
            return Err(ValidationError::OutOfRange {
                earliest,
                latest: today,
            });
        }

        Ok(DateRange { start, end })
    }
}

fn parse_field(field: DateField, raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}
