//! Sliced figures behind the national, regional and insights dashboards.

use std::collections::{BTreeMap, HashMap};

use activator_core::model::{
    Association, NewSession, SessionRecord, SessionType, TeacherEngagement,
};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

/// Inclusive range of session dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// `None` if `from` is after `to`.
    #[must_use]
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    /// The `days` calendar days ending with `today`. Zero days still covers today.
    #[must_use]
    pub fn last_days(days: u32, today: NaiveDate) -> Self {
        let span = Days::new(u64::from(days.saturating_sub(1)));
        Self {
            from: today.checked_sub_days(span).unwrap_or(NaiveDate::MIN),
            to: today,
        }
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Which sessions a breakdown covers. The default covers everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    pub association: Option<Association>,
    pub window: Option<DateWindow>,
}

impl DashboardFilter {
    #[must_use]
    pub fn matches(&self, session: &NewSession) -> bool {
        self.association.is_none_or(|a| a == session.association())
            && self.window.is_none_or(|w| w.contains(session.date()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub sessions: u64,
    pub students: u64,
    pub schools_visited: usize,
    pub activators_active: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenderSplit {
    pub male: u64,
    pub female: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTypeShare {
    pub session_type: SessionType,
    pub sessions: u64,
    /// Share of all filtered sessions, rounded half up.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionActivity {
    pub association: Association,
    pub sessions: u64,
    pub students: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatorActivity {
    pub name: String,
    pub sessions: u64,
    pub students: u64,
    /// Most frequent teacher engagement; ties go to the higher level.
    pub engagement: TeacherEngagement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolActivity {
    pub school: String,
    pub sessions: u64,
    pub students: u64,
    pub last_visit: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyActivity {
    /// Monday of the ISO week.
    pub week_start: NaiveDate,
    pub sessions: u64,
    pub students: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementCount {
    pub level: TeacherEngagement,
    pub sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBreakdown {
    pub overview: Overview,
    pub gender: GenderSplit,
    pub session_types: Vec<SessionTypeShare>,
    pub regions: Vec<RegionActivity>,
    pub activators: Vec<ActivatorActivity>,
    pub schools: Vec<SchoolActivity>,
    pub weekly: Vec<WeeklyActivity>,
    pub engagement: Vec<EngagementCount>,
}

#[derive(Default)]
struct ActivatorTally {
    sessions: u64,
    students: u64,
    // Indexed by `TeacherEngagement::rank`.
    engagement: [u64; 3],
}

struct SchoolTally {
    sessions: u64,
    students: u64,
    last_visit: NaiveDate,
}

#[must_use]
pub fn percentage(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (u128::from(part) * 200 + u128::from(total)) / (u128::from(total) * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = Days::new(u64::from(date.weekday().num_days_from_monday()));
    date.checked_sub_days(offset).unwrap_or(NaiveDate::MIN)
}

fn dominant_engagement(counts: [u64; 3]) -> TeacherEngagement {
    [
        TeacherEngagement::None,
        TeacherEngagement::Moderate,
        TeacherEngagement::High,
    ]
    .into_iter()
    .max_by_key(|level| (counts[usize::from(level.rank())], level.rank()))
    .unwrap_or(TeacherEngagement::None)
}

/// Slice `records` for the dashboards, keeping only those `filter` matches.
#[must_use]
pub fn breakdown(records: &[SessionRecord], filter: &DashboardFilter) -> DashboardBreakdown {
    let mut overview = Overview::default();
    let mut gender = GenderSplit::default();
    let mut by_type: HashMap<SessionType, u64> = HashMap::new();
    let mut by_region: HashMap<Association, (u64, u64)> = HashMap::new();
    let mut by_engagement: HashMap<TeacherEngagement, u64> = HashMap::new();
    let mut activators: HashMap<&str, ActivatorTally> = HashMap::new();
    let mut schools: HashMap<&str, SchoolTally> = HashMap::new();
    let mut weekly: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();

    for session in records.iter().map(SessionRecord::session) {
        if !filter.matches(session) {
            continue;
        }
        let students = session.participants();

        overview.sessions += 1;
        overview.students += students;
        gender.male += u64::from(session.male_students());
        gender.female += u64::from(session.female_students());
        *by_type.entry(session.session_type()).or_default() += 1;
        *by_engagement.entry(session.teacher_engagement()).or_default() += 1;

        let region = by_region.entry(session.association()).or_default();
        region.0 += 1;
        region.1 += students;

        let activator = activators.entry(session.activator_name()).or_default();
        activator.sessions += 1;
        activator.students += students;
        activator.engagement[usize::from(session.teacher_engagement().rank())] += 1;

        schools
            .entry(session.school())
            .and_modify(|school| {
                school.sessions += 1;
                school.students += students;
                school.last_visit = school.last_visit.max(session.date());
            })
            .or_insert(SchoolTally {
                sessions: 1,
                students,
                last_visit: session.date(),
            });

        let week = weekly.entry(week_start(session.date())).or_default();
        week.0 += 1;
        week.1 += students;
    }

    overview.schools_visited = schools.len();
    overview.activators_active = activators.len();

    let session_types = SessionType::ALL
        .iter()
        .map(|&session_type| {
            let sessions = by_type.get(&session_type).copied().unwrap_or(0);
            SessionTypeShare {
                session_type,
                sessions,
                percentage: percentage(sessions, overview.sessions),
            }
        })
        .collect();

    let regions = Association::ALL
        .iter()
        .map(|&association| {
            let (sessions, students) = by_region.get(&association).copied().unwrap_or((0, 0));
            RegionActivity {
                association,
                sessions,
                students,
            }
        })
        .collect();

    let mut activators: Vec<ActivatorActivity> = activators
        .into_iter()
        .map(|(name, tally)| ActivatorActivity {
            name: name.to_owned(),
            sessions: tally.sessions,
            students: tally.students,
            engagement: dominant_engagement(tally.engagement),
        })
        .collect();
    activators.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.name.cmp(&b.name)));

    let mut schools: Vec<SchoolActivity> = schools
        .into_iter()
        .map(|(school, tally)| SchoolActivity {
            school: school.to_owned(),
            sessions: tally.sessions,
            students: tally.students,
            last_visit: tally.last_visit,
        })
        .collect();
    schools.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.school.cmp(&b.school)));

    let weekly = weekly
        .into_iter()
        .map(|(week_start, (sessions, students))| WeeklyActivity {
            week_start,
            sessions,
            students,
        })
        .collect();

    let engagement = TeacherEngagement::ALL
        .iter()
        .map(|&level| EngagementCount {
            level,
            sessions: by_engagement.get(&level).copied().unwrap_or(0),
        })
        .collect();

    DashboardBreakdown {
        overview,
        gender,
        session_types,
        regions,
        activators,
        schools,
        weekly,
        engagement,
    }
}
