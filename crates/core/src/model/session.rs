use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::ids::{SessionId, UserId};
use crate::model::options::{
    Association, ClassPeriod, ParseOptionError, SessionLength, SessionType, TeacherEngagement,
    YearGroup,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionValidationError {
    #[error("{field} must not be empty")]
    Blank { field: &'static str },

    #[error("invalid date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid time {0:?} (expected HH:MM)")]
    InvalidTime(String),

    #[error(transparent)]
    UnknownOption(#[from] ParseOptionError),

    #[error("at least one year group is required")]
    NoYearGroups,

    #[error("{field} must not be negative: {value}")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("{field} is too large: {value}")]
    CountOverflow { field: &'static str, value: i64 },

    #[error("geolocation out of range: ({lat}, {lng})")]
    InvalidGeolocation { lat: f64, lng: f64 },
}

/// A captured device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// # Errors
    ///
    /// Returns `SessionValidationError::InvalidGeolocation` for coordinates
    /// outside the WGS84 range (NaN included).
    pub fn new(lat: f64, lng: f64) -> Result<Self, SessionValidationError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(SessionValidationError::InvalidGeolocation { lat, lng });
        }
        Ok(Self { lat, lng })
    }
}

/// Unvalidated session payload, as posted by the entry form.
///
/// Enumerations arrive as slugs and counts as signed integers so that bad
/// input can be reported instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    pub activator_name: String,
    pub association: String,
    pub school: String,
    pub date: String,
    pub time: String,
    #[serde(default)]
    pub class_period: Option<String>,
    pub year_groups: Vec<String>,
    pub male_students: i64,
    pub female_students: i64,
    pub session_length: String,
    pub teacher_engagement: String,
    pub session_type: String,
    #[serde(default)]
    pub geolocation: Option<GeoPoint>,
    pub user_id: String,
}

impl SessionDraft {
    /// Validate and normalize the draft into a session ready to be stored.
    ///
    /// # Errors
    ///
    /// Returns the first `SessionValidationError` found, checking fields in
    /// form order.
    pub fn validate(self) -> Result<NewSession, SessionValidationError> {
        let activator_name = required("activator name", self.activator_name)?;
        let association: Association = self.association.parse()?;
        let school = required("school", self.school)?;
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|_| SessionValidationError::InvalidDate(self.date.clone()))?;
        let time = parse_time(&self.time)?;

        // The form sends an empty string when no period was picked.
        let class_period = match self.class_period.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<ClassPeriod>()?),
        };

        let year_groups = self
            .year_groups
            .iter()
            .map(|raw| raw.parse::<YearGroup>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        if year_groups.is_empty() {
            return Err(SessionValidationError::NoYearGroups);
        }

        let male_students = count("male students", self.male_students)?;
        let female_students = count("female students", self.female_students)?;
        let session_length: SessionLength = self.session_length.parse()?;
        let teacher_engagement: TeacherEngagement = self.teacher_engagement.parse()?;
        let session_type: SessionType = self.session_type.parse()?;
        let geolocation = self
            .geolocation
            .map(|point| GeoPoint::new(point.lat, point.lng))
            .transpose()?;
        let submitted_by = UserId::new(self.user_id)
            .map_err(|_| SessionValidationError::Blank { field: "user id" })?;

        Ok(NewSession {
            activator_name,
            association,
            school,
            date,
            time,
            class_period,
            year_groups,
            male_students,
            female_students,
            session_length,
            teacher_engagement,
            session_type,
            geolocation,
            submitted_by,
        })
    }
}

fn required(field: &'static str, raw: String) -> Result<String, SessionValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SessionValidationError::Blank { field });
    }
    Ok(trimmed.to_owned())
}

fn count(field: &'static str, value: i64) -> Result<u32, SessionValidationError> {
    if value < 0 {
        return Err(SessionValidationError::NegativeCount { field, value });
    }
    u32::try_from(value).map_err(|_| SessionValidationError::CountOverflow { field, value })
}

fn parse_time(raw: &str) -> Result<NaiveTime, SessionValidationError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| SessionValidationError::InvalidTime(raw.to_owned()))
}

/// A validated session that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    activator_name: String,
    association: Association,
    school: String,
    date: NaiveDate,
    time: NaiveTime,
    class_period: Option<ClassPeriod>,
    year_groups: BTreeSet<YearGroup>,
    male_students: u32,
    female_students: u32,
    session_length: SessionLength,
    teacher_engagement: TeacherEngagement,
    session_type: SessionType,
    geolocation: Option<GeoPoint>,
    #[serde(rename = "userId")]
    submitted_by: UserId,
}

impl NewSession {
    #[must_use]
    pub fn activator_name(&self) -> &str {
        &self.activator_name
    }

    #[must_use]
    pub fn association(&self) -> Association {
        self.association
    }

    #[must_use]
    pub fn school(&self) -> &str {
        &self.school
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    #[must_use]
    pub fn class_period(&self) -> Option<ClassPeriod> {
        self.class_period
    }

    #[must_use]
    pub fn year_groups(&self) -> &BTreeSet<YearGroup> {
        &self.year_groups
    }

    #[must_use]
    pub fn male_students(&self) -> u32 {
        self.male_students
    }

    #[must_use]
    pub fn female_students(&self) -> u32 {
        self.female_students
    }

    /// Male plus female attendance.
    #[must_use]
    pub fn participants(&self) -> u64 {
        u64::from(self.male_students) + u64::from(self.female_students)
    }

    #[must_use]
    pub fn session_length(&self) -> SessionLength {
        self.session_length
    }

    #[must_use]
    pub fn teacher_engagement(&self) -> TeacherEngagement {
        self.teacher_engagement
    }

    #[must_use]
    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    #[must_use]
    pub fn geolocation(&self) -> Option<GeoPoint> {
        self.geolocation
    }

    #[must_use]
    pub fn submitted_by(&self) -> &UserId {
        &self.submitted_by
    }

    /// Converts back into a draft carrying the same values.
    ///
    /// Storage adapters persist the draft's textual form and re-validate on
    /// load, so a row that no longer satisfies the rules is caught early.
    #[must_use]
    pub fn to_draft(&self) -> SessionDraft {
        SessionDraft {
            activator_name: self.activator_name.clone(),
            association: self.association.as_str().to_owned(),
            school: self.school.clone(),
            date: self.date.format(DATE_FORMAT).to_string(),
            time: format_time(self.time),
            class_period: self.class_period.map(|p| p.as_str().to_owned()),
            year_groups: self
                .year_groups
                .iter()
                .map(|g| g.as_str().to_owned())
                .collect(),
            male_students: i64::from(self.male_students),
            female_students: i64::from(self.female_students),
            session_length: self.session_length.as_str().to_owned(),
            teacher_engagement: self.teacher_engagement.as_str().to_owned(),
            session_type: self.session_type.as_str().to_owned(),
            geolocation: self.geolocation,
            user_id: self.submitted_by.as_str().to_owned(),
        }
    }
}

/// `HH:MM`, or `HH:MM:SS` when the seconds are significant.
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    use chrono::Timelike;
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

/// A stored session with its store-assigned identity and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    id: SessionId,
    created_at: DateTime<Utc>,
    #[serde(flatten)]
    session: NewSession,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: SessionId, created_at: DateTime<Utc>, session: NewSession) -> Self {
        Self {
            id,
            created_at,
            session,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn session(&self) -> &NewSession {
        &self.session
    }
}
