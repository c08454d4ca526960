use std::collections::{BTreeMap, HashSet};

use activator_core::model::{Association, SessionRecord};
use serde::Serialize;

/// How many records `recent_sessions` carries.
pub const RECENT_SESSIONS: usize = 10;

/// Headline figures over the whole session collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_sessions: u64,
    pub total_participants: u64,
    pub schools_reached: usize,
    pub regions_active: usize,
    pub region_counts: BTreeMap<Association, u64>,
    /// The first records in store order; not re-sorted.
    pub recent_sessions: Vec<SessionRecord>,
}

/// Reduce `records` to an [`AnalyticsSummary`] in one pass.
///
/// Schools are distinct by exact, case-sensitive name.
#[must_use]
pub fn summarize(records: &[SessionRecord]) -> AnalyticsSummary {
    let mut total_participants = 0_u64;
    let mut schools = HashSet::new();
    let mut region_counts: BTreeMap<Association, u64> = BTreeMap::new();

    for record in records {
        let session = record.session();
        total_participants = total_participants.saturating_add(session.participants());
        schools.insert(session.school());
        *region_counts.entry(session.association()).or_default() += 1;
    }

    AnalyticsSummary {
        total_sessions: records.len() as u64,
        total_participants,
        schools_reached: schools.len(),
        regions_active: region_counts.len(),
        region_counts,
        recent_sessions: records.iter().take(RECENT_SESSIONS).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[test]
    fn three_record_scenario() {
        let records = vec![
            record(5, 3, "A", "auckland"),
            record(2, 2, "A", "wellington"),
            record(0, 4, "B", "auckland"),
        ];

        let summary = summarize(&records);

        assert_eq!(summary.total_sessions, 3);
        assert_eq!(summary.total_participants, 16);
        assert_eq!(summary.schools_reached, 2);
        assert_eq!(summary.regions_active, 2);
        assert_eq!(
            summary.region_counts,
            BTreeMap::from([(Association::Auckland, 2), (Association::Wellington, 1)])
        );
        assert_eq!(summary.recent_sessions.len(), 3);
    }

    #[test]
    fn empty_collection_is_all_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.total_participants, 0);
        assert_eq!(summary.schools_reached, 0);
        assert!(summary.region_counts.is_empty());
        assert!(summary.recent_sessions.is_empty());
    }

    #[test]
    fn school_names_are_case_sensitive() {
        let records = vec![
            record(1, 1, "Hillside School", "otago"),
            record(1, 1, "hillside school", "otago"),
            record(1, 1, "Hillside School", "otago"),
        ];
        assert_eq!(summarize(&records).schools_reached, 2);
    }

    #[test]
    fn region_counts_sum_to_sessions_and_recent_is_capped() {
        let regions = ["auckland", "otago", "canterbury", "northern-districts"];
        let records: Vec<_> = (0..23)
            .map(|i| record(i, 1, &format!("School {}", i % 7), regions[i as usize % 4]))
            .collect();

        let summary = summarize(&records);

        assert_eq!(summary.region_counts.values().sum::<u64>(), summary.total_sessions);
        assert_eq!(summary.recent_sessions.len(), RECENT_SESSIONS);
        assert_eq!(summary.recent_sessions[0].id(), records[0].id());
        assert_eq!(summary.recent_sessions[9].id(), records[9].id());
        let expected: u64 = (0..23_u64).map(|i| i + 1).sum();
        assert_eq!(summary.total_participants, expected);
    }
}
