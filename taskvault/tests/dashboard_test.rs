//! Dashboard behavior against the in-memory backend.

use std::sync::Arc;

use rstest::rstest;
use taskvault::{AppState, Dashboard, MemoryBackend, MemorySessionStore};

async fn signed_in(email: &str) -> (Arc<MemoryBackend>, AppState) {
    let backend = Arc::new(MemoryBackend::new());
    let state = AppState::new(backend.clone(), Arc::new(MemorySessionStore::new()));
    state.session.resolve().await;
    state.session.sign_up(email, "pw123456").await.unwrap();
    (backend, state)
}

async fn mounted(state: &AppState) -> Dashboard {
    let mut dashboard =
        Dashboard::for_current_identity(state.session.clone(), state.tables.clone())
            .await
            .unwrap();
    dashboard.mount().await.unwrap();
    dashboard
}

#[tokio::test]
async fn test_first_load_creates_profile_and_empty_list() {
    let (backend, state) = signed_in("a@x.com").await;
    let dashboard = mounted(&state).await;

    let profile = dashboard.profile().unwrap();
    assert_eq!(profile.id, dashboard.identity().id);
    assert_eq!(profile.username.as_deref(), Some("a"));
    assert_eq!(profile.full_name.as_deref(), Some(""));
    assert!(dashboard.tasks().is_empty());
    assert_eq!(backend.rows("profiles").len(), 1);
}

#[tokio::test]
async fn test_second_profile_load_creates_nothing() {
    let (backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;

    dashboard.load_profile().await.unwrap();
    let mut again = mounted(&state).await;
    again.load_profile().await.unwrap();

    assert_eq!(backend.rows("profiles").len(), 1);
    assert_eq!(dashboard.profile(), again.profile());
}

#[tokio::test]
async fn test_add_toggle_delete_scenario() {
    let (_backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;

    dashboard.set_title("Buy milk");
    assert!(dashboard.add_task().await.unwrap());
    assert_eq!(dashboard.title(), "");
    assert_eq!(dashboard.tasks().len(), 1);
    let task = dashboard.tasks()[0].clone();
    assert_eq!(task.title, "Buy milk");
    assert!(!task.is_done);
    assert_eq!(task.user_id, dashboard.identity().id);

    dashboard.toggle_done(&task).await.unwrap();
    assert!(dashboard.tasks()[0].is_done);

    dashboard.remove_task(task.id).await.unwrap();
    assert!(dashboard.tasks().is_empty());
}

#[tokio::test]
async fn test_toggle_twice_restores_state() {
    let (_backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;
    dashboard.set_title("Walk dog");
    dashboard.add_task().await.unwrap();

    let original = dashboard.tasks()[0].clone();
    dashboard.toggle_done(&original).await.unwrap();
    let toggled = dashboard.tasks()[0].clone();
    dashboard.toggle_done(&toggled).await.unwrap();

    assert_eq!(dashboard.tasks()[0].is_done, original.is_done);
}

#[tokio::test]
async fn test_title_is_trimmed_before_insert() {
    let (_backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;

    dashboard.set_title("   Buy milk \t");
    dashboard.add_task().await.unwrap();
    assert_eq!(dashboard.tasks()[0].title, "Buy milk");
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\t\n")]
#[tokio::test]
async fn test_blank_title_makes_no_request(#[case] input: &str) {
    let (backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;
    let before = backend.request_count();

    dashboard.set_title(input);
    assert!(!dashboard.add_task().await.unwrap());

    assert_eq!(backend.request_count(), before);
    assert_eq!(dashboard.title(), input);
    assert!(dashboard.tasks().is_empty());
    assert!(backend.rows("tasks").is_empty());
}

#[tokio::test]
async fn test_tasks_listed_newest_first() {
    let (_backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;

    for title in ["one", "two", "three"] {
        dashboard.set_title(title);
        dashboard.add_task().await.unwrap();
    }

    let titles: Vec<&str> = dashboard.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["three", "two", "one"]);
    assert!(dashboard
        .tasks()
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn test_tasks_of_other_users_are_not_listed() {
    let backend = Arc::new(MemoryBackend::new());
    let alice = AppState::new(backend.clone(), Arc::new(MemorySessionStore::new()));
    let bob = AppState::new(backend.clone(), Arc::new(MemorySessionStore::new()));
    alice.session.sign_up("alice@x.com", "pw123456").await.unwrap();
    bob.session.sign_up("bob@x.com", "pw123456").await.unwrap();

    let mut alice_dash = mounted(&alice).await;
    alice_dash.set_title("alice only");
    alice_dash.add_task().await.unwrap();
    let alice_task = alice_dash.tasks()[0].clone();

    let mut bob_dash = mounted(&bob).await;
    assert!(bob_dash.tasks().is_empty());

    bob_dash.remove_task(alice_task.id).await.unwrap();
    alice_dash.load_tasks().await.unwrap();
    assert_eq!(alice_dash.tasks().len(), 1);
}

#[tokio::test]
async fn test_profile_username_falls_back_when_email_missing() {
    let (backend, state) = signed_in("a@x.com").await;
    let identity = state.session.current_identity().await.unwrap();
    let anonymous = taskvault_common::Identity::new(identity.id, None);

    let mut dashboard = Dashboard::new(state.session.clone(), state.tables.clone(), anonymous);
    dashboard.load_profile().await.unwrap();

    assert_eq!(
        dashboard.profile().unwrap().username.as_deref(),
        Some("user")
    );
    assert_eq!(backend.rows("profiles").len(), 1);
}

#[tokio::test]
async fn test_dashboard_requires_identity() {
    let backend = Arc::new(MemoryBackend::new());
    let state = AppState::new(backend, Arc::new(MemorySessionStore::new()));
    state.session.resolve().await;

    let result = Dashboard::for_current_identity(state.session.clone(), state.tables.clone()).await;
    assert!(matches!(result, Err(taskvault::Error::NotSignedIn)));
}

#[tokio::test]
async fn test_failed_mutation_leaves_state_untouched() {
    let (_backend, state) = signed_in("a@x.com").await;
    let mut dashboard = mounted(&state).await;
    dashboard.set_title("Buy milk");
    dashboard.add_task().await.unwrap();

    state.session.sign_out().await;

    dashboard.set_title("Walk dog");
    assert!(dashboard.add_task().await.is_err());
    assert_eq!(dashboard.title(), "Walk dog");
    assert_eq!(dashboard.tasks().len(), 1);
}
