use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use topictime_lib::{
    clock::{DAY_MS, HOUR_MS},
    ActiveTimeListener, FakeClock, LearningServices, ProfileId, Settings, TrackerStatus,
};

fn morning_clock() -> Arc<FakeClock> {
    let local = NaiveDate::from_ymd_opt(2024, 9, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    Arc::new(FakeClock::at_local(local, FixedOffset::east_opt(2 * 3600).unwrap()))
}

#[tokio::test]
async fn learning_time_gates_the_survey_prompt() {
    topictime_lib::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let clock = morning_clock();
    let services = LearningServices::open(dir.path(), Settings::default(), clock.clone()).unwrap();
    let profile = ProfileId::new("P");

    services
        .learning_time
        .record_session(&profile, "T", 200_000)
        .await
        .unwrap();
    let record = services
        .learning_time
        .get_accumulated_time(&profile, "T")
        .await
        .unwrap();
    assert_eq!(record.topic_learning_time_ms, 200_000);

    clock.advance_ms(HOUR_MS);
    services
        .learning_time
        .record_session(&profile, "T", 150_000)
        .await
        .unwrap();
    let record = services
        .learning_time
        .get_accumulated_time(&profile, "T")
        .await
        .unwrap();
    assert_eq!(record.topic_learning_time_ms, 350_000);

    // 10:00 local, no survey shown yet.
    assert!(services.survey.should_show_survey(&profile, "T").await);

    services.survey.mark_survey_shown(&profile).await.unwrap();
    assert!(!services.survey.should_show_survey(&profile, "T").await);
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = morning_clock();
    clock.advance_ms(HOUR_MS);
    let profile = ProfileId::new("P");

    {
        let services =
            LearningServices::open(dir.path(), Settings::default(), clock.clone()).unwrap();
        services
            .learning_time
            .record_session(&profile, "T", 400_000)
            .await
            .unwrap();
        services.survey.mark_survey_shown(&profile).await.unwrap();
    }

    let services = LearningServices::open(dir.path(), Settings::default(), clock.clone()).unwrap();
    let record = services
        .learning_time
        .get_accumulated_time(&profile, "T")
        .await
        .unwrap();
    assert_eq!(record.topic_learning_time_ms, 400_000);
    assert!(!services.survey.should_show_survey(&profile, "T").await);

    // Thirty days and a second later the cooldown has run out.
    clock.advance_ms(30 * DAY_MS + 1_000);
    services
        .learning_time
        .record_session(&profile, "T", 400_000)
        .await
        .unwrap();
    assert!(services.survey.should_show_survey(&profile, "T").await);
}

#[tokio::test]
async fn tracked_session_feeds_the_gate() {
    let dir = tempfile::tempdir().unwrap();
    let clock = morning_clock();
    clock.advance_ms(2 * HOUR_MS);
    let services = LearningServices::open(dir.path(), Settings::default(), clock.clone()).unwrap();
    let profile = ProfileId::new("P");
    let tracker = services.session_tracker();

    tracker.begin(profile.clone(), "T").unwrap();
    clock.advance_ms(4 * 60_000);
    tracker.on_app_in_background();
    clock.advance_ms(HOUR_MS);
    tracker.on_app_in_foreground();
    clock.advance_ms(60_000);
    let session = tracker.finish().await.unwrap();

    assert_eq!(session.active_ms, 300_000);
    assert_eq!(tracker.status(), TrackerStatus::Idle);
    assert!(services.survey.should_show_survey(&profile, "T").await);
}

#[tokio::test]
async fn deleting_a_profile_resets_everything() {
    let dir = tempfile::tempdir().unwrap();
    let clock = morning_clock();
    clock.advance_ms(HOUR_MS);
    let services = LearningServices::open(dir.path(), Settings::default(), clock.clone()).unwrap();
    let profile = ProfileId::new("P");

    services
        .learning_time
        .record_session(&profile, "T", 900_000)
        .await
        .unwrap();
    services.survey.mark_survey_shown(&profile).await.unwrap();

    services.delete_profile(&profile).await.unwrap();

    let record = services
        .learning_time
        .get_accumulated_time(&profile, "T")
        .await
        .unwrap();
    assert_eq!(record.topic_learning_time_ms, 0);
    assert_eq!(services.db.get_survey_last_shown(&profile).await.unwrap(), None);
}
