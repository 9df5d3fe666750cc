use chrono::Utc;
use thingstodo::domain::activity::{Activity, ActivityDraft};
use thingstodo::domain::ports::{ActivityStoreRef, BookingStoreRef, Repositories};
use thingstodo::infrastructure::in_memory::InMemoryStore;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let repos = Repositories::from_backend(InMemoryStore::new());
    let activities: ActivityStoreRef = repos.activities.clone();
    let bookings: BookingStoreRef = repos.bookings.clone();

    let activity = Activity::canonical(ActivityDraft {
        title: "Climb Kilimanjaro".to_string(),
        description: String::new(),
        category: "adventure".to_string(),
        tags: vec!["hiking".to_string()],
        location: Some("Tanzania".to_string()),
    })
    .unwrap();
    let id = activity.id;

    // Verify Send + Sync by spawning tasks
    let activity_handle = tokio::spawn(async move {
        activities.store(activity).await.unwrap();
        activities.get(id).await.unwrap().unwrap()
    });

    let event_handle = tokio::spawn(async move {
        let first = bookings.record_event("evt_spawned").await.unwrap();
        let second = bookings.record_event("evt_spawned").await.unwrap();
        (first, second)
    });

    let retrieved = activity_handle.await.unwrap();
    assert_eq!(retrieved.title, "Climb Kilimanjaro");
    assert!(retrieved.created_at <= Utc::now());

    assert_eq!(event_handle.await.unwrap(), (true, false));

    // The bundle shares one backend: the activity is visible through it too.
    assert_eq!(repos.activities.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_event_recording_is_exactly_once() {
    let repos = Repositories::from_backend(InMemoryStore::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let bookings = repos.bookings.clone();
            tokio::spawn(async move { bookings.record_event("evt_race").await.unwrap() })
        })
        .collect();

    let mut fresh = 0;
    for handle in handles {
        if handle.await.unwrap() {
            fresh += 1;
        }
    }
    assert_eq!(fresh, 1);
}
