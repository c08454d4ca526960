//! Plausible demo sessions for exercising the dashboards on a fresh database.

use activator_core::model::{
    Association, ClassPeriod, SessionDraft, SessionLength, SessionType, TeacherEngagement,
    YearGroup,
};
use chrono::{Duration, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;

const ACTIVATORS: &[&str] = &[
    "Sarah Johnson",
    "Mike Chen",
    "Emma Wilson",
    "James Taylor",
    "Lisa Garcia",
];

const SCHOOLS: &[&str] = &[
    "Auckland Primary School",
    "Wellington Central School",
    "Christchurch Academy",
    "Hamilton Elementary",
    "Dunedin Primary",
    "Tauranga Intermediate",
    "Napier Hill School",
    "Nelson Central",
];

pub const SEED_SUBMITTER: &str = "seed";

/// `count` valid drafts dated within the 60 days up to `today`.
pub fn seed_drafts<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    today: NaiveDate,
) -> Vec<SessionDraft> {
    (0..count).map(|_| seed_draft(rng, today)).collect()
}

fn seed_draft<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> SessionDraft {
    let date = today - Duration::days(rng.random_range(0..60));
    let hour = rng.random_range(8..15);
    let minute = [0, 15, 30, 45].choose(rng).copied().unwrap_or(0);

    let first_year = rng.random_range(0..YearGroup::ALL.len());
    let span = rng.random_range(1..=2);
    let year_groups = YearGroup::ALL
        .iter()
        .skip(first_year)
        .take(span)
        .map(|group| group.as_str().to_owned())
        .collect();

    SessionDraft {
        activator_name: pick(rng, ACTIVATORS).to_owned(),
        association: pick_option(rng, Association::ALL),
        school: pick(rng, SCHOOLS).to_owned(),
        date: date.format("%Y-%m-%d").to_string(),
        time: format!("{hour:02}:{minute:02}"),
        class_period: rng
            .random_bool(0.7)
            .then(|| pick_option(rng, ClassPeriod::ALL)),
        year_groups,
        male_students: rng.random_range(0..=15),
        female_students: rng.random_range(0..=15),
        session_length: pick_option(rng, SessionLength::ALL),
        teacher_engagement: pick_option(rng, TeacherEngagement::ALL),
        session_type: pick_option(rng, SessionType::ALL),
        geolocation: None,
        user_id: SEED_SUBMITTER.to_owned(),
    }
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

fn pick_option<T, R>(rng: &mut R, options: &[T]) -> String
where
    T: Copy + std::fmt::Display,
    R: Rng + ?Sized,
{
    options
        .choose(rng)
        .map(ToString::to_string)
        .unwrap_or_default()
}
