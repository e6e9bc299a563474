//! Behaviour of the fake gateway as seen by code under test.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use gcal_core::{Event, Params, PropertyBag};
use gcal_events::testing::{CalendarCall, EventsFake, FindFake, GetFake};
use gcal_events::{CalendarAccessor, ErrorCode, EventQuery, EventsGateway};
use serde_json::json;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
}

fn fake() -> Arc<EventsFake> {
    Arc::new(EventsFake::new().with_default_calendar_id("defaultCalendarId"))
}

fn send_updates() -> Params {
    Params::from([("sendUpdates".to_string(), json!("all"))])
}

#[tokio::test]
async fn get_returns_registered_events_in_order() {
    let fake = fake();
    fake.fake_get(GetFake::returning(vec![
        PropertyBag::new()
            .with("summary", "Event 1")
            .with("startDateTime", now())
            .with("endDateTime", now() + Duration::hours(1)),
        PropertyBag::new()
            .with("summary", "Event 2")
            .with("startDateTime", now() + Duration::days(1))
            .with("endDateTime", now() + Duration::days(1) + Duration::hours(1)),
    ]));

    let gateway: Arc<dyn EventsGateway> = fake.clone();
    let events = gateway
        .get(EventQuery::new().starting_at(now() - Duration::days(7)).in_calendar("anything"))
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].summary(), Some("Event 1"));
    assert_eq!(events[0].start_date_time().unwrap(), Some(now().fixed_offset()));
    assert_eq!(
        events[0].end_date_time().unwrap(),
        Some((now() + Duration::hours(1)).fixed_offset())
    );
    assert_eq!(events[1].summary(), Some("Event 2"));
    assert_eq!(
        events[1].start_date_time().unwrap(),
        Some((now() + Duration::days(1)).fixed_offset())
    );
}

#[tokio::test]
async fn get_never_sorts_fixture_events() {
    let fake = fake();
    fake.fake_get(GetFake::returning(vec![
        PropertyBag::new().with("id", "late").with("startDate", now().date_naive() + Duration::days(2)),
        PropertyBag::new().with("id", "early").with("startDate", now().date_naive()),
    ]));

    let events = fake.get(EventQuery::new()).await.unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.id().unwrap()).collect();
    assert_eq!(ids, ["late", "early"]);
}

#[tokio::test]
async fn get_picks_the_first_matching_fixture() {
    let fake = fake();
    fake.fake_get(
        GetFake::returning(vec![PropertyBag::new().with("summary", "Event 1")])
            .starting_at(now() + Duration::days(1))
            .ending_at(now() + Duration::days(1) + Duration::hours(1))
            .with_parameters(Params::from([("orderBy".to_string(), json!("endTime"))]))
            .in_calendar("calendarId"),
    )
    .fake_get(
        GetFake::returning(vec![
            PropertyBag::new().with("summary", "Event 1"),
            PropertyBag::new().with("summary", "Event 2"),
        ])
        .starting_at(now())
        .ending_at(now() + Duration::hours(1))
        .with_parameters(Params::from([("orderBy".to_string(), json!("startTime"))]))
        .in_calendar("calendarId"),
    );

    let events = fake
        .get(
            EventQuery::new()
                .starting_at(now())
                .ending_at(now() + Duration::hours(1))
                .with_parameter("orderBy", "startTime")
                .in_calendar("calendarId"),
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.calendar_id() == Some("calendarId")));
}

#[tokio::test]
async fn get_matches_only_on_fields_specified() {
    let fake = fake();
    fake.fake_get(
        GetFake::returning(vec![
            PropertyBag::new().with("summary", "Event 1"),
            PropertyBag::new().with("summary", "Event 2"),
        ])
        .starting_at(now())
        .in_calendar("calendarId"),
    );

    let events = fake
        .get(
            EventQuery::new()
                .starting_at(now())
                .ending_at(now() + Duration::hours(1))
                .with_parameter("orderBy", "startTime")
                .in_calendar("calendarId"),
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn get_without_matching_fixture_is_missing_fake() {
    let fake = fake();
    fake.fake_get(
        GetFake::returning(vec![])
            .starting_at(now())
            .ending_at(now() + Duration::hours(1))
            .with_parameters(Params::from([("orderBy".to_string(), json!("startTime"))]))
            .in_calendar("calendarId"),
    );

    let err = fake
        .get(
            EventQuery::new()
                .starting_at(now() - Duration::hours(1))
                .ending_at(now() + Duration::hours(1))
                .with_parameter("orderBy", "startTime")
                .in_calendar("calendarId"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::MissingFake);
    assert_eq!(err.message(), "No fake get event matches the given parameters.");
}

#[tokio::test]
async fn get_registered_for_another_calendar_is_missing_fake() {
    let fake = fake();
    fake.fake_get(GetFake::returning(vec![PropertyBag::new()]).in_calendar("cal1"));

    let err = fake
        .get(EventQuery::new().in_calendar("cal2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingFake);
}

#[tokio::test]
async fn find_returns_matching_fixture() {
    let fake = fake();
    fake.fake_find(
        FindFake::returning(PropertyBag::new().with("summary", "Other")).with_event_id("other"),
    )
    .fake_find(
        FindFake::returning(PropertyBag::new().with("id", "evt").with("summary", "Found"))
            .with_event_id("evt")
            .in_calendar("work"),
    );

    let event = fake.find("evt", Some("work")).await.unwrap();

    assert_eq!(event.summary(), Some("Found"));
    assert_eq!(event.calendar_id(), Some("work"));
}

#[tokio::test]
async fn find_without_matching_fixture_is_missing_fake() {
    let fake = fake();
    fake.fake_find(FindFake::returning(PropertyBag::new()).with_event_id("known"));

    let err = fake.find("unknown", None).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::MissingFake);
    assert_eq!(err.message(), "No fake find event matches the given parameters.");
}

#[tokio::test]
async fn quick_create_without_fixture_returns_bare_event() {
    let fake = fake();

    let event = fake.quick_create("Lunch at noon", None).await.unwrap();

    assert_eq!(event.calendar_id(), Some("defaultCalendarId"));
    assert!(event.payload().is_empty());
    fake.assert_quick_created("Lunch at noon");
    fake.assert_not_quick_created("Dinner at eight");
}

#[tokio::test]
async fn quick_create_falls_back_to_default_fixture() {
    let fake = fake();
    fake.fake_quick_create(PropertyBag::new().with("summary", "Default"), None)
        .fake_quick_create(PropertyBag::new().with("summary", "Lunch"), Some("Lunch at noon"));

    assert_eq!(
        fake.quick_create("Lunch at noon", None).await.unwrap().summary(),
        Some("Lunch")
    );
    assert_eq!(
        fake.quick_create("Something else", None).await.unwrap().summary(),
        Some("Default")
    );
}

#[tokio::test]
async fn create_logs_call_and_returns_local_event() {
    let fake = fake();
    let properties = PropertyBag::new().with("summary", "Event 1");

    let event = fake
        .create(properties.clone().into(), Some("calendarId"), send_updates())
        .await
        .unwrap();

    assert_eq!(event.summary(), Some("Event 1"));
    assert_eq!(event.calendar_id(), Some("calendarId"));
    assert!(!event.exists());
    fake.assert_created(&properties, Some("calendarId"), &send_updates());
    fake.assert_not_created(&properties, None, &send_updates());
}

#[tokio::test]
async fn create_without_calendar_tags_the_default() {
    let fake = fake();
    let properties = PropertyBag::new().with("summary", "Event 1");

    let event = fake
        .create(properties.clone().into(), None, Params::new())
        .await
        .unwrap();

    assert_eq!(event.calendar_id(), Some("defaultCalendarId"));
    assert_eq!(fake.created()[0].calendar_id, None);
    fake.assert_created(&properties, None, &Params::new());

    let unconfigured = EventsFake::new();
    let event = unconfigured
        .create(Event::new().into(), None, Params::new())
        .await
        .unwrap();
    assert_eq!(event.calendar_id(), Some("calendarId"));
}

#[tokio::test]
async fn created_properties_compare_regardless_of_order() {
    let fake = fake();
    fake.create(
        PropertyBag::new()
            .with("summary", "Event 1")
            .with("location", "Room 1")
            .into(),
        None,
        Params::new(),
    )
    .await
    .unwrap();

    fake.assert_created(
        &PropertyBag::new()
            .with("location", "Room 1")
            .with("summary", "Event 1"),
        None,
        &Params::new(),
    );
}

#[tokio::test]
#[should_panic(expected = "No fake create event matches the given parameters.")]
async fn assert_created_fails_when_nothing_created() {
    fake().assert_created(
        &PropertyBag::new().with("summary", "Non-existent Event"),
        Some("calendarId"),
        &send_updates(),
    );
}

#[tokio::test]
#[should_panic(expected = "No fake create event matches the given parameters.")]
async fn assert_created_fails_on_different_properties() {
    let fake = fake();
    fake.create(
        PropertyBag::new().with("summary", "Event 1").into(),
        Some("calendarId"),
        send_updates(),
    )
    .await
    .unwrap();

    fake.assert_created(
        &PropertyBag::new().with("summary", "Event 2"),
        Some("calendarId"),
        &send_updates(),
    );
}

#[tokio::test]
#[should_panic(expected = "No fake create event matches the given parameters.")]
async fn assert_created_fails_on_different_calendar() {
    let fake = fake();
    let properties = PropertyBag::new().with("summary", "Event 1");
    fake.create(properties.clone().into(), Some("calendarId"), send_updates())
        .await
        .unwrap();

    fake.assert_created(&properties, Some("otherCalendarId"), &send_updates());
}

#[tokio::test]
#[should_panic(expected = "No fake create event matches the given parameters.")]
async fn assert_created_fails_on_different_options() {
    let fake = fake();
    let properties = PropertyBag::new().with("summary", "Event 1");
    fake.create(properties.clone().into(), Some("calendarId"), send_updates())
        .await
        .unwrap();

    fake.assert_created(&properties, Some("calendarId"), &Params::new());
}

#[tokio::test]
#[should_panic(expected = "A fake create event matches the given parameters.")]
async fn assert_not_created_fails_on_match() {
    let fake = fake();
    let properties = PropertyBag::new().with("summary", "Event 1");
    fake.create(properties.clone().into(), None, Params::new())
        .await
        .unwrap();

    fake.assert_not_created(&properties, None, &Params::new());
}

#[tokio::test]
#[should_panic(expected = "An event was created.")]
async fn assert_nothing_created_fails_after_create() {
    let fake = fake();
    fake.assert_nothing_created();
    fake.create(PropertyBag::new().into(), None, Params::new())
        .await
        .unwrap();

    fake.assert_nothing_created();
}

#[tokio::test]
#[should_panic(expected = "No fake quick create event matches the given text.")]
async fn assert_quick_created_fails_for_other_text() {
    let fake = fake();
    fake.quick_create("Lunch at noon", None).await.unwrap();

    fake.assert_quick_created("Dinner at eight");
}

#[tokio::test]
#[should_panic(expected = "A fake quick create event matches the given text.")]
async fn assert_not_quick_created_fails_for_same_text() {
    let fake = fake();
    fake.quick_create("Lunch at noon", None).await.unwrap();

    fake.assert_not_quick_created("Lunch at noon");
}

#[tokio::test]
#[should_panic(expected = "An event was quick created.")]
async fn assert_nothing_quick_created_fails_after_quick_create() {
    let fake = fake();
    fake.assert_nothing_quick_created();
    fake.quick_create("Lunch at noon", None).await.unwrap();

    fake.assert_nothing_quick_created();
}

#[tokio::test]
async fn update_echoes_record_and_is_asserted() {
    let fake = fake();
    let mut event = Event::from_payload(
        json!({"id": "evt", "summary": "Old"}).as_object().cloned().unwrap(),
        Some("work"),
    );
    event.set("name", "New").unwrap();

    let updated = fake.update(event.clone(), Params::new()).await.unwrap();

    assert_eq!(updated, event);
    fake.assert_updated(PropertyBag::new().with("name", "New"));
    fake.assert_updated(event);
}

#[tokio::test]
async fn save_routes_through_create_or_update() {
    let fake = fake();
    let gateway: Arc<dyn EventsGateway> = fake.clone();

    let mut unsaved = Event::new();
    unsaved.set("summary", "Fresh").unwrap();
    gateway.save(unsaved, Params::new()).await.unwrap();

    let saved = Event::from_payload(json!({"id": "evt"}).as_object().cloned().unwrap(), None);
    gateway
        .update_with(saved, &PropertyBag::new().with("location", "Room 2"), Params::new())
        .await
        .unwrap();

    assert_eq!(fake.created().len(), 1);
    assert!(fake.created()[0].properties.is_none());
    fake.assert_updated(PropertyBag::new().with("location", "Room 2"));
}

#[tokio::test]
#[should_panic(expected = "No fake update event matches the given parameters.")]
async fn assert_updated_fails_for_other_record() {
    let fake = fake();
    let event = Event::from_payload(json!({"id": "123"}).as_object().cloned().unwrap(), Some("456"));
    fake.update(event, Params::new()).await.unwrap();

    let other = Event::from_payload(json!({"id": "123"}).as_object().cloned().unwrap(), Some("789"));
    fake.assert_updated(other);
}

#[tokio::test]
async fn google_calendar_is_memoized_per_id() {
    let fake = fake();

    let default = fake.google_calendar(None);
    assert!(Arc::ptr_eq(&default, &fake.google_calendar(Some("defaultCalendarId"))));
    assert!(!Arc::ptr_eq(&default, &fake.google_calendar(Some("other"))));

    let replaced = fake.fake_google_calendar("defaultCalendarId");
    assert!(Arc::ptr_eq(&replaced, &fake.google_calendar(None)));
}

#[tokio::test]
async fn google_calendar_uses_placeholder_without_configuration() {
    let fake = EventsFake::new();

    let calendar = fake.calendar(None).unwrap();
    assert_eq!(calendar.calendar_id(), "calendarId");
}

#[tokio::test]
async fn delete_is_recorded_on_the_mock_calendar() {
    let fake = fake();
    let saved = Event::from_payload(json!({"id": "evt"}).as_object().cloned().unwrap(), Some("work"));

    fake.delete_event(&saved, send_updates()).await.unwrap();
    fake.delete_event(&Event::new(), Params::new()).await.unwrap();

    assert_eq!(
        fake.google_calendar(Some("work")).calls(),
        [CalendarCall::Delete {
            event_id: "evt".into(),
            options: send_updates(),
        }]
    );
    assert!(fake.google_calendar(None).calls().is_empty());
}
