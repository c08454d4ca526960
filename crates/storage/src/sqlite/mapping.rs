use activator_core::model::{GeoPoint, SessionDraft, SessionId, SessionRecord};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn i64_to_count(field: &'static str, v: i64) -> Result<i64, StorageError> {
    if v < 0 {
        return Err(StorageError::Serialization(format!("invalid {field}: {v}")));
    }
    Ok(v)
}

/// Year groups are stored as a JSON array of their labels.
pub(crate) fn encode_year_groups(labels: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(labels).map_err(ser)
}

pub(crate) fn decode_year_groups(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

/// Geolocation is stored as two nullable columns that are set together.
pub(crate) fn geolocation_from_columns(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, StorageError> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint { lat, lng })),
        (None, None) => Ok(None),
        _ => Err(StorageError::Serialization(
            "geolocation has only one coordinate".into(),
        )),
    }
}

/// Rebuilds a record from a `sessions` row.
///
/// The row is decoded into a draft and re-validated, so a row that breaks a
/// domain rule surfaces as `StorageError::Serialization`.
pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionRecord, StorageError> {
    let year_groups: String = row.try_get("year_groups").map_err(ser)?;
    let id: SessionId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let created_at = row.try_get("created_at").map_err(ser)?;

    let draft = SessionDraft {
        activator_name: row.try_get("activator_name").map_err(ser)?,
        association: row.try_get("association").map_err(ser)?,
        school: row.try_get("school").map_err(ser)?,
        date: row.try_get("date").map_err(ser)?,
        time: row.try_get("time").map_err(ser)?,
        class_period: row.try_get("class_period").map_err(ser)?,
        year_groups: decode_year_groups(&year_groups)?,
        male_students: i64_to_count(
            "male_students",
            row.try_get::<i64, _>("male_students").map_err(ser)?,
        )?,
        female_students: i64_to_count(
            "female_students",
            row.try_get::<i64, _>("female_students").map_err(ser)?,
        )?,
        session_length: row.try_get("session_length").map_err(ser)?,
        teacher_engagement: row.try_get("teacher_engagement").map_err(ser)?,
        session_type: row.try_get("session_type").map_err(ser)?,
        geolocation: geolocation_from_columns(
            row.try_get("latitude").map_err(ser)?,
            row.try_get("longitude").map_err(ser)?,
        )?,
        user_id: row.try_get("submitted_by").map_err(ser)?,
    };

    let session = draft.validate().map_err(ser)?;
    Ok(SessionRecord::new(id, created_at, session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_groups_roundtrip_as_json() {
        let labels = vec!["Year 1".to_string(), "Year 6".to_string()];
        let raw = encode_year_groups(&labels).unwrap();
        assert_eq!(raw, r#"["Year 1","Year 6"]"#);
        assert_eq!(decode_year_groups(&raw).unwrap(), labels);
    }

    #[test]
    fn half_a_geolocation_is_rejected() {
        assert!(geolocation_from_columns(Some(1.0), None).is_err());
        assert_eq!(geolocation_from_columns(None, None).unwrap(), None);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(i64_to_count("male_students", -3).is_err());
        assert_eq!(i64_to_count("male_students", 7).unwrap(), 7);
    }
}
