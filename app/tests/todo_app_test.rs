//! End-to-end scenarios: the full app store over the in-memory backend.
//!
//! Every scenario drives the app through [`Intent`]s, the way a front-end
//! does, and waits for the live query to deliver the backend's view.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use firetodo_app::{AppState, Intent, Screen, TodoApp};
use firetodo_backend::{BackendClient, BackendError, InMemoryBackend, Operation, Todo, TodoId};
use firetodo_testing::{init_test_tracing, stepping_clock, wait_for_state};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

async fn app() -> (TodoApp, Arc<InMemoryBackend>) {
    init_test_tracing();
    let (client, backend) = BackendClient::in_memory(Arc::new(stepping_clock()));
    let app = TodoApp::new(client);
    app.start().await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| !s.session.is_loading)
        .await
        .unwrap();
    (app, backend)
}

/// Signed in as `email` with the first snapshot delivered.
fn ready_as(email: &'static str) -> impl Fn(&AppState) -> bool {
    move |s| {
        s.session.user.as_ref().is_some_and(|u| u.email == email)
            && s.todos.owner.is_some()
            && !s.todos.is_loading
    }
}

async fn credentials(app: &TodoApp, email: &str, password: &str, submit: Intent) {
    app.dispatch(Intent::EditEmail(email.into())).await.unwrap();
    app.dispatch(Intent::EditPassword(password.into())).await.unwrap();
    app.dispatch(submit).await.unwrap();
}

async fn sign_up(app: &TodoApp, email: &'static str, password: &str) {
    credentials(app, email, password, Intent::SignUp).await;
    wait_for_state(app.store(), TIMEOUT, ready_as(email))
        .await
        .unwrap();
}

async fn sign_in(app: &TodoApp, email: &'static str, password: &str) {
    credentials(app, email, password, Intent::SignIn).await;
    wait_for_state(app.store(), TIMEOUT, ready_as(email))
        .await
        .unwrap();
}

async fn sign_out(app: &TodoApp) {
    app.dispatch(Intent::SignOut).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| {
        s.session.user.is_none() && !s.session.is_loading
    })
    .await
    .unwrap();
}

async fn add(app: &TodoApp, text: &str) {
    let before = app.state(|s| s.todos.todos.len()).await;
    app.dispatch(Intent::EditInput(text.into())).await.unwrap();
    app.dispatch(Intent::SubmitAdd).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.todos.len() == before + 1)
        .await
        .unwrap();
}

async fn todos(app: &TodoApp) -> Vec<Todo> {
    app.state(|s| s.todos.todos.clone()).await
}

async fn first_id(app: &TodoApp) -> TodoId {
    todos(app).await[0].id.clone()
}

#[tokio::test]
async fn signed_out_app_shows_login_form() {
    let (app, _backend) = app().await;
    assert!(matches!(app.screen().await, Screen::SignedOut { .. }));
}

#[tokio::test]
async fn sign_up_lands_on_an_empty_list() {
    let (app, _backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;

    let screen = app.screen().await;
    let Screen::SignedIn {
        account,
        rows,
        empty_message,
        error,
        ..
    } = &screen
    else {
        panic!("expected signed-in screen, got {screen:?}");
    };
    assert_eq!(account.email, "a@x.com");
    assert!(rows.is_empty());
    assert!(empty_message.is_some());
    assert!(error.is_none());

    // The form was reset by the successful submission
    let login = app.state(|s| s.login.clone()).await;
    assert!(login.email.is_empty() && login.password.is_empty() && !login.pending);
}

#[tokio::test]
async fn add_creates_one_open_todo() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;

    add(&app, "Buy milk").await;

    let list = todos(&app).await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].text, "Buy milk");
    assert!(!list[0].completed);
    assert!(list[0].created_at.is_some());
    assert_eq!(backend.documents(), list);

    // Input cleared once the write landed
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.input.is_empty())
        .await
        .unwrap();
}

#[tokio::test]
async fn blank_add_writes_nothing() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;

    for text in ["", "   ", "\t\n"] {
        app.dispatch(Intent::EditInput(text.into())).await.unwrap();
        app.dispatch(Intent::SubmitAdd).await.unwrap();
    }

    assert!(backend.documents().is_empty());
    let state = app.state(Clone::clone).await;
    assert!(state.todos.todos.is_empty());
    assert!(state.todos.error.is_none());
}

#[tokio::test]
async fn toggle_twice_restores_completion() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    let id = first_id(&app).await;

    app.dispatch(Intent::Toggle(id.clone())).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.todos[0].completed)
        .await
        .unwrap();

    app.dispatch(Intent::Toggle(id)).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| !s.todos.todos[0].completed)
        .await
        .unwrap();

    let stored = backend.documents();
    assert!(!stored[0].completed);
    // Only text edits stamp the modification time
    assert!(stored[0].last_modified_at.is_none());
}

#[tokio::test]
async fn save_edit_updates_text() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    let id = first_id(&app).await;

    app.dispatch(Intent::BeginEdit(id.clone())).await.unwrap();
    assert_eq!(
        app.state(|s| s.todos.draft.clone()).await.map(|d| d.text),
        Some("Buy milk".to_string())
    );
    app.dispatch(Intent::EditDraft("Buy oat milk".into()))
        .await
        .unwrap();
    app.dispatch(Intent::SaveEdit).await.unwrap();

    wait_for_state(app.store(), TIMEOUT, |s| {
        s.todos.todos[0].text == "Buy oat milk" && s.todos.draft.is_none()
    })
    .await
    .unwrap();
    assert_eq!(backend.documents()[0].text, "Buy oat milk");
    assert_eq!(backend.documents()[0].id, id);
}

#[tokio::test]
async fn cancel_edit_leaves_backend_unchanged() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    let before = backend.documents();

    app.dispatch(Intent::BeginEdit(first_id(&app).await))
        .await
        .unwrap();
    app.dispatch(Intent::EditDraft("Something else".into()))
        .await
        .unwrap();
    app.dispatch(Intent::CancelEdit).await.unwrap();

    assert!(app.state(|s| s.todos.draft.is_none()).await);
    assert_eq!(backend.documents(), before);
}

#[tokio::test]
async fn blank_save_keeps_the_draft() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    let id = first_id(&app).await;

    app.dispatch(Intent::BeginEdit(id.clone())).await.unwrap();
    app.dispatch(Intent::EditDraft("   ".into())).await.unwrap();
    app.dispatch(Intent::SaveEdit).await.unwrap();

    let draft = app.state(|s| s.todos.draft.clone()).await.unwrap();
    assert_eq!(draft.target, id);
    assert_eq!(draft.text, "   ");
    assert_eq!(backend.documents()[0].text, "Buy milk");
}

#[tokio::test]
async fn delete_removes_the_row() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    add(&app, "Walk dog").await;

    app.dispatch(Intent::Delete(first_id(&app).await))
        .await
        .unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.todos.len() == 1)
        .await
        .unwrap();

    assert_eq!(todos(&app).await[0].text, "Walk dog");
    assert_eq!(backend.documents().len(), 1);
}

#[tokio::test]
async fn list_is_in_creation_order() {
    let (app, _backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    for text in ["one", "two", "three"] {
        add(&app, text).await;
    }

    let texts: Vec<String> = todos(&app).await.into_iter().map(|t| t.text).collect();
    assert_eq!(texts, ["one", "two", "three"]);
    let rows = app.screen().await;
    assert_eq!(rows.rows().len(), 3);
}

#[tokio::test]
async fn users_only_see_their_own_todos() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "A's todo").await;
    sign_out(&app).await;

    sign_up(&app, "b@x.com", "secret2").await;
    assert!(todos(&app).await.is_empty());
    add(&app, "B's todo").await;

    let visible = todos(&app).await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].text, "B's todo");
    assert_eq!(backend.documents().len(), 2);
}

#[tokio::test]
async fn sign_out_clears_and_sign_in_repopulates() {
    let (app, _backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    add(&app, "Walk dog").await;

    sign_out(&app).await;
    let state = app.state(Clone::clone).await;
    assert!(state.todos.todos.is_empty());
    assert!(state.todos.owner.is_none());
    assert!(matches!(app.screen().await, Screen::SignedOut { .. }));

    sign_in(&app, "a@x.com", "secret1").await;
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.todos.len() == 2)
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_sign_up_shows_auth_error() {
    let (app, _backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    sign_out(&app).await;

    credentials(&app, "a@x.com", "another1", Intent::SignUp).await;
    wait_for_state(app.store(), TIMEOUT, |s| s.login.error.is_some())
        .await
        .unwrap();

    let state = app.state(Clone::clone).await;
    assert_eq!(
        state.login.error.as_deref(),
        Some(BackendError::email_already_in_use().to_string().as_str())
    );
    assert!(!state.login.pending);
    assert!(state.session.user.is_none());
    // Fields are kept so the user can correct them
    assert_eq!(state.login.email, "a@x.com");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let (app, _backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    sign_out(&app).await;

    credentials(&app, "a@x.com", "wrong-password", Intent::SignIn).await;
    wait_for_state(app.store(), TIMEOUT, |s| s.login.error.is_some())
        .await
        .unwrap();

    let Screen::SignedOut { login } = app.screen().await else {
        panic!("expected login form");
    };
    assert_eq!(
        login.error,
        Some(BackendError::invalid_credentials().to_string())
    );
}

#[tokio::test]
async fn failed_write_shows_banner_until_next_success() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;

    backend.fail_next(Operation::Create, BackendError::Network("offline".into()));
    app.dispatch(Intent::EditInput("Buy milk".into()))
        .await
        .unwrap();
    app.dispatch(Intent::SubmitAdd).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.error.is_some())
        .await
        .unwrap();

    let state = app.state(Clone::clone).await;
    assert_eq!(
        state.todos.error.as_deref(),
        Some("Error adding todo: offline")
    );
    // Input kept for a retry
    assert_eq!(state.todos.input, "Buy milk");
    assert!(backend.documents().is_empty());
    assert!(app.screen().await.to_string().contains("! Error adding todo: offline"));

    app.dispatch(Intent::SubmitAdd).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| {
        s.todos.error.is_none() && s.todos.todos.len() == 1
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn rejected_live_query_shows_fetch_error() {
    let (app, backend) = app().await;
    backend.fail_next(Operation::Subscribe, BackendError::permission_denied());

    sign_up(&app, "a@x.com", "secret1").await;

    let state = app.state(Clone::clone).await;
    assert_eq!(
        state.todos.error.as_deref(),
        Some("Error fetching todos: Missing or insufficient permissions.")
    );
    assert!(state.todos.todos.is_empty());
    assert!(!state.todos.is_loading);
    assert_eq!(backend.active_queries(), 0);
    assert!(
        app.screen()
            .await
            .to_string()
            .contains("! Error fetching todos: Missing or insufficient permissions.")
    );
}

#[tokio::test]
async fn failed_snapshot_ends_the_live_query() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    add(&app, "Buy milk").await;
    assert_eq!(backend.active_queries(), 1);

    backend.fail_live_queries(&BackendError::permission_denied());
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.error.is_some())
        .await
        .unwrap();

    let state = app.state(Clone::clone).await;
    assert_eq!(
        state.todos.error.as_deref(),
        Some("Error fetching todos: Missing or insufficient permissions.")
    );
    assert!(state.todos.todos.is_empty());

    // The listener is gone: later writes are no longer mirrored
    tokio::time::timeout(TIMEOUT, async {
        while backend.active_queries() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    app.dispatch(Intent::EditInput("Walk dog".into()))
        .await
        .unwrap();
    app.dispatch(Intent::SubmitAdd).await.unwrap();
    wait_for_state(app.store(), TIMEOUT, |s| s.todos.input.is_empty())
        .await
        .unwrap();
    assert_eq!(backend.documents().len(), 2);
    assert!(todos(&app).await.is_empty());
}

#[tokio::test]
async fn toggle_of_vanished_todo_reports_error() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;

    app.dispatch(Intent::Toggle(TodoId::new("ghost")))
        .await
        .unwrap();

    let error = app.state(|s| s.todos.error.clone()).await;
    assert_eq!(
        error.as_deref(),
        Some(
            "Error updating todo: No document to update: \
             projects/firetodo-local/databases/(default)/documents/todos/ghost"
        )
    );
    assert!(backend.documents().is_empty());
}

#[tokio::test]
async fn shutdown_releases_live_query() {
    let (app, backend) = app().await;
    sign_up(&app, "a@x.com", "secret1").await;
    assert_eq!(backend.active_queries(), 1);

    app.shutdown();
    tokio::time::timeout(TIMEOUT, async {
        while backend.active_queries() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(app.dispatch(Intent::SignOut).await.is_err());
}
