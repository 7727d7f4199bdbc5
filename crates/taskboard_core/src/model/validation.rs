//! Input validation shared by task and user drafts.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.%+-]+@[A-Za-z0-9_.-]+\.[a-zA-Z]{2,6}$")
        .expect("valid email regex")
});

/// Rejection reasons for malformed drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    BlankField(&'static str),
    /// Email does not match the accepted address shape.
    InvalidEmail(String),
    /// New tasks must be due strictly after `today`.
    DeadlineNotInFuture { deadline: NaiveDate, today: NaiveDate },
    /// Deadline year outside `1..=9999`.
    DeadlineOutOfRange(NaiveDate),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} cannot be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email format: `{value}`"),
            Self::DeadlineNotInFuture { deadline, today } => {
                write!(f, "deadline {deadline} must be after {today}")
            }
            Self::DeadlineOutOfRange(deadline) => {
                write!(f, "deadline {deadline} must fall in years 1 through 9999")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(value) {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}

/// Deadlines are stored as `YYYY-MM-DD` text and ordered as text, which only
/// holds for four-digit positive years.
pub(crate) fn require_storable_deadline(deadline: NaiveDate) -> Result<(), ValidationError> {
    if !(1..=9999).contains(&deadline.year()) {
        return Err(ValidationError::DeadlineOutOfRange(deadline));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_email, require_storable_deadline, require_text, ValidationError};
    use chrono::NaiveDate;

    #[test]
    fn email_shape_is_checked() {
        assert!(require_email("alex@example.com").is_ok());
        assert!(require_email("first.last+tag@mail.example.org").is_ok());
        assert!(matches!(
            require_email("not-an-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(require_email("alex@example.toolongtld").is_err());
    }

    #[test]
    fn email_word_characters_are_ascii_only() {
        assert!(require_email("user_01@example.com").is_ok());
        assert!(require_email("ü@example.com").is_err());
        assert!(require_email("user@exämple.com").is_err());
    }

    #[test]
    fn deadline_year_must_have_four_digits() {
        let edge = |y| NaiveDate::from_ymd_opt(y, 1, 1).unwrap();
        assert!(require_storable_deadline(edge(1)).is_ok());
        assert!(require_storable_deadline(edge(9999)).is_ok());
        assert_eq!(
            require_storable_deadline(edge(10000)),
            Err(ValidationError::DeadlineOutOfRange(edge(10000)))
        );
        assert!(require_storable_deadline(edge(0)).is_err());
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        assert_eq!(
            require_text("title", "  \t"),
            Err(ValidationError::BlankField("title"))
        );
        assert!(require_text("title", " x ").is_ok());
    }
}
