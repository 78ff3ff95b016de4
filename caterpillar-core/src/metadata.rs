use chrono::{NaiveDate, NaiveDateTime};

use crate::markdown::{first_heading, first_paragraph};
use crate::scanner::RawItem;
use crate::site::{Item, SectionId};

/// Format every `date` field must follow.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Date plus time of day, as older posts were written. Only the date is kept.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid `{field}`: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check a raw item and turn it into a normalized `Item`.
pub fn validate(raw: RawItem) -> Result<Item, ValidationError> {
    let RawItem {
        id,
        source,
        metadata,
        body,
        default_section,
    } = raw;

    if id.is_empty() {
        return Err(ValidationError::new(
            "id",
            "file name does not contain any slug characters",
        ));
    }

    let date = metadata
        .date
        .as_deref()
        .ok_or_else(|| ValidationError::new("date", "missing"))?;
    let publish_date = parse_date(date)?;

    let section = metadata
        .section
        .or(default_section)
        .ok_or_else(|| ValidationError::new("section", "missing"))?;
    let section_id = section
        .parse::<SectionId>()
        .map_err(|err| ValidationError::new("section", err.to_string()))?;

    let title = metadata
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| first_heading(&body))
        .unwrap_or_else(|| id.clone());

    let description = metadata
        .description
        .or_else(|| first_paragraph(&body))
        .unwrap_or_default();

    Ok(Item {
        id,
        title,
        description,
        raw_body: body,
        publish_date,
        section_id,
        reading_time: metadata.reading_time.unwrap_or_default(),
        source,
    })
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).map(|dt| dt.date()))
        .map_err(|_| {
            ValidationError::new(
                "date",
                format!("`{value}` does not match {DATE_FORMAT} or {DATE_TIME_FORMAT}"),
            )
        })
}
