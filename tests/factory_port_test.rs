use thingstodo::domain::ports::{Repositories, RepositoriesFactory};
use thingstodo::domain::profile::Profile;
use thingstodo::infrastructure::in_memory::InMemoryStore;
use uuid::Uuid;

#[tokio::test]
async fn test_factory_instantiation() {
    let factory: RepositoriesFactory = Box::new(|| Repositories::from_backend(InMemoryStore::new()));

    let repos = factory();
    let profile = Profile::new(Uuid::new_v4());

    repos.profiles.store(profile.clone()).await.unwrap();
    let retrieved = repos.profiles.get(profile.id).await.unwrap().unwrap();
    assert_eq!(retrieved.username, profile.username);
}

#[tokio::test]
async fn test_factory_builds_isolated_stores() {
    let factory: RepositoriesFactory = Box::new(|| Repositories::from_backend(InMemoryStore::new()));

    let first = factory();
    let second = factory();
    let profile = Profile::new(Uuid::new_v4());
    first.profiles.store(profile.clone()).await.unwrap();

    assert!(second.profiles.get(profile.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_factory_in_task() {
    let factory: RepositoriesFactory = Box::new(|| Repositories::from_backend(InMemoryStore::new()));

    let handle = tokio::spawn(async move {
        let repos = factory();
        let profile = Profile::demo();
        repos.profiles.store(profile.clone()).await.unwrap();
        repos.profiles.get(profile.id).await.unwrap().unwrap()
    });

    let retrieved = handle.await.unwrap();
    assert_eq!(retrieved.display_name, "Demo Explorer");
}
