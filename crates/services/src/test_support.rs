use activator_core::model::{SessionDraft, SessionId, SessionRecord};
use activator_core::time::fixed_now;

/// Builds records for reducer tests without going through a store.
pub(crate) struct RecordBuilder {
    draft: SessionDraft,
}

impl RecordBuilder {
    pub(crate) fn new() -> Self {
        Self {
            draft: SessionDraft {
                activator_name: "Sarah Johnson".into(),
                association: "auckland".into(),
                school: "Auckland Primary School".into(),
                date: "2024-02-10".into(),
                time: "11:00".into(),
                class_period: None,
                year_groups: vec!["Year 5".into(), "Year 6".into()],
                male_students: 10,
                female_students: 10,
                session_length: "40".into(),
                teacher_engagement: "high".into(),
                session_type: "smash-play".into(),
                geolocation: None,
                user_id: "coach-1".into(),
            },
        }
    }

    pub(crate) fn counts(mut self, male: u32, female: u32) -> Self {
        self.draft.male_students = i64::from(male);
        self.draft.female_students = i64::from(female);
        self
    }

    pub(crate) fn school(mut self, school: &str) -> Self {
        self.draft.school = school.into();
        self
    }

    pub(crate) fn association(mut self, association: &str) -> Self {
        self.draft.association = association.into();
        self
    }

    pub(crate) fn activator(mut self, name: &str) -> Self {
        self.draft.activator_name = name.into();
        self
    }

    pub(crate) fn date(mut self, date: &str) -> Self {
        self.draft.date = date.into();
        self
    }

    pub(crate) fn engagement(mut self, level: &str) -> Self {
        self.draft.teacher_engagement = level.into();
        self
    }

    pub(crate) fn session_type(mut self, session_type: &str) -> Self {
        self.draft.session_type = session_type.into();
        self
    }

    pub(crate) fn year_groups(mut self, groups: &[&str]) -> Self {
        self.draft.year_groups = groups.iter().map(|g| (*g).to_owned()).collect();
        self
    }

    pub(crate) fn build(self) -> SessionRecord {
        let session = self.draft.validate().expect("test draft should be valid");
        SessionRecord::new(SessionId::generate(), fixed_now(), session)
    }
}

pub(crate) fn record(male: u32, female: u32, school: &str, association: &str) -> SessionRecord {
    RecordBuilder::new()
        .counts(male, female)
        .school(school)
        .association(association)
        .build()
}
