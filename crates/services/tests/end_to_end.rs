use std::collections::BTreeMap;
use std::time::Duration;

use activator_core::model::{Association, SessionDraft};
use activator_core::time::fixed_clock;
use services::export::{CSV_HEADER, write_export};
use services::{AppConfig, AppServices, DashboardFilter, FeedUpdate, SessionScope};

fn draft(male: i64, female: i64, school: &str, association: &str) -> SessionDraft {
    SessionDraft {
        activator_name: "Sarah Johnson".into(),
        association: association.into(),
        school: school.into(),
        date: "2024-02-10".into(),
        time: "11:00".into(),
        class_period: Some("period-3".into()),
        year_groups: vec!["Year 5".into(), "Year 6".into()],
        male_students: male,
        female_students: female,
        session_length: "40".into(),
        teacher_engagement: "high".into(),
        session_type: "smash-play".into(),
        geolocation: None,
        user_id: "coach-1".into(),
    }
}

async fn sqlite_services(name: &str) -> AppServices {
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    AppServices::new_sqlite(&config, fixed_clock())
        .await
        .expect("sqlite services")
}

#[tokio::test]
async fn three_sessions_summarize_and_export() {
    let services = sqlite_services("e2e_three_sessions").await;
    let store = services.sessions();

    store.submit(draft(5, 3, "A", "auckland")).await.unwrap();
    store.submit(draft(2, 2, "A", "wellington")).await.unwrap();
    store.submit(draft(0, 4, "B", "auckland")).await.unwrap();

    let summary = services.analytics().compute_summary().await.unwrap();
    assert_eq!(summary.total_sessions, 3);
    assert_eq!(summary.total_participants, 16);
    assert_eq!(summary.schools_reached, 2);
    assert_eq!(summary.regions_active, 2);
    assert_eq!(
        summary.region_counts,
        BTreeMap::from([(Association::Auckland, 2), (Association::Wellington, 1)])
    );
    let order: Vec<_> = summary
        .recent_sessions
        .iter()
        .map(|r| r.session().participants())
        .collect();
    assert_eq!(order, [8, 4, 4]);

    let mut feed = store.subscribe(SessionScope::All);
    let records = match tokio::time::timeout(Duration::from_secs(2), feed.next()).await {
        Ok(Some(FeedUpdate::Snapshot(records))) => records,
        other => panic!("expected a snapshot, got {other:?}"),
    };
    feed.cancel();

    let dir = tempfile::tempdir().unwrap();
    let path = write_export(dir.path(), &records, services.clock().today()).unwrap();
    let csv = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines.iter().all(|line| line.split(',').count() == 11));
    assert!(lines[1].starts_with("2024-02-10,B,auckland,"));
}

#[tokio::test]
async fn breakdown_reflects_stored_sessions() {
    let services = sqlite_services("e2e_breakdown").await;
    let store = services.sessions();
    store.submit(draft(5, 3, "A", "auckland")).await.unwrap();
    store.submit(draft(2, 2, "C", "wellington")).await.unwrap();

    let everything = services
        .analytics()
        .compute_breakdown(&DashboardFilter::default())
        .await
        .unwrap();
    assert_eq!(everything.overview.sessions, 2);
    assert_eq!(everything.overview.students, 12);
    assert_eq!(everything.gender.male, 7);
    assert_eq!(everything.gender.female, 5);

    let auckland = DashboardFilter {
        association: Some(Association::Auckland),
        window: None,
    };
    let regional = services
        .analytics()
        .compute_breakdown(&auckland)
        .await
        .unwrap();
    assert_eq!(regional.overview.sessions, 1);
    assert_eq!(regional.schools[0].school, "A");
}

#[tokio::test]
async fn feed_sees_writes_from_a_second_store_on_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.database.url = format!("sqlite://{}", dir.path().join("sessions.db").display());
    config.feed.poll_interval_ms = 20;

    let watcher = AppServices::new_sqlite(&config, fixed_clock()).await.unwrap();
    let writer = AppServices::new_sqlite(&config, fixed_clock()).await.unwrap();

    let watching = watcher.sessions();
    let mut feed = watching.subscribe(SessionScope::All);
    let initial = match tokio::time::timeout(Duration::from_secs(2), feed.next()).await {
        Ok(Some(FeedUpdate::Snapshot(records))) => records,
        other => panic!("expected a snapshot, got {other:?}"),
    };
    assert!(initial.is_empty());

    writer
        .sessions()
        .submit(draft(3, 3, "Across Town", "otago"))
        .await
        .unwrap();

    let refreshed = match tokio::time::timeout(Duration::from_secs(2), feed.next()).await {
        Ok(Some(FeedUpdate::Snapshot(records))) => records,
        other => panic!("expected a refreshed snapshot, got {other:?}"),
    };
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].session().school(), "Across Town");
}
