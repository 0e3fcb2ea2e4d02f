use std::{sync::atomic::Ordering, time::Duration};

use mycloud::{
    Credentials, Registration, TokenPair,
    session::{Registered, SessionEvent, SessionStatus},
    store::TokenStore,
};

use crate::helpers::*;

fn registration(username: &str) -> Registration {
    Registration {
        username: username.to_string(),
        full_name: "Alice Example".to_string(),
        email: "alice@example.com".to_string(),
        password: "Secret1!".to_string(),
        password_confirm: "Secret1!".to_string(),
    }
}

#[tokio::test]
async fn login_establishes_session() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.client();
    let mut events = client.session().subscribe();

    let session = client
        .session()
        .login(&Credentials::new("demo", "Pw1!"))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.user.as_ref().map(|u| u.id), Some(7));
    assert!(session.expiry_epoch_ms.is_some());
    assert!(session.error.is_none());
    assert_eq!(
        stored(&store),
        Some(TokenPair::new(backend.state.accepted(), "r1"))
    );
    assert_eq!(store.load_user().unwrap().unwrap().username, "demo");
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Authenticated { user_id: Some(7) }
    );
    // The login response carried the user, so no profile fetch happened.
    assert_eq!(MockState::count(&backend.state.me_calls), 0);
}

#[tokio::test]
async fn failed_login_keeps_server_message() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.client();

    let err = client
        .session()
        .login(&Credentials::new("demo", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    let session = client.session().session();
    assert_eq!(session.status, SessionStatus::Anonymous);
    assert_eq!(
        session.error.as_deref(),
        Some("No active account found with the given credentials")
    );
    assert!(stored(&store).is_none());
}

#[tokio::test]
async fn next_login_clears_previous_error() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.client();

    let _ = client
        .session()
        .login(&Credentials::new("demo", "wrong"))
        .await;
    assert!(client.session().session().error.is_some());

    client
        .session()
        .login(&Credentials::new("demo", "Pw1!"))
        .await
        .unwrap();
    assert!(client.session().session().error.is_none());
    assert_eq!(MockState::count(&backend.state.login_calls), 2);
}

#[tokio::test]
async fn registration_with_tokens_logs_in() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.client();

    let registered = client
        .session()
        .register(&registration("alice"))
        .await
        .unwrap();

    let Registered::LoggedIn(session) = registered else {
        panic!("expected an automatic login, got {registered:?}");
    };
    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.user.map(|u| u.username), Some("alice".to_string()));
    assert_eq!(stored(&store).unwrap().refresh, "r9");
}

#[tokio::test]
async fn registration_without_tokens_stays_anonymous() {
    let backend = MockBackend::start().await;
    backend
        .state
        .register_returns_tokens
        .store(false, Ordering::SeqCst);
    let (client, store) = backend.client();

    let registered = client
        .session()
        .register(&registration("alice"))
        .await
        .unwrap();

    assert!(matches!(registered, Registered::AccountCreated));
    assert_eq!(client.session().status(), SessionStatus::Anonymous);
    assert!(client.session().session().error.is_none());
    assert!(stored(&store).is_none());
}

#[tokio::test]
async fn registration_field_errors_are_flattened() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.client();

    let err = client
        .session()
        .register(&registration("taken"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.to_string(),
        "username: A user with that username already exists."
    );
    assert_eq!(
        client.session().session().error.as_deref(),
        Some("username: A user with that username already exists.")
    );
}

#[tokio::test]
async fn invalid_registration_never_reaches_the_server() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.client();

    let mut form = registration("alice");
    form.password_confirm = "Secret2!".to_string();
    let err = client.session().register(&form).await.unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!(client.session().status(), SessionStatus::Anonymous);
    assert!(client.session().session().error.is_none());
}

#[tokio::test]
async fn logout_clears_session_even_if_server_fails() {
    let backend = MockBackend::start().await;
    backend.state.logout_fails.store(true, Ordering::SeqCst);
    let (client, store) = backend.logged_in().await;
    let mut events = client.session().subscribe();

    client.logout().await;

    assert_eq!(MockState::count(&backend.state.logout_calls), 1);
    assert_eq!(client.session().status(), SessionStatus::Anonymous);
    assert!(stored(&store).is_none());
    assert!(store.load_user().unwrap().is_none());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
}

#[tokio::test]
async fn startup_check_without_tokens_is_anonymous() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.client();

    let session = client.session().check_auth_status().await;

    assert_eq!(session.status, SessionStatus::Anonymous);
    assert!(session.error.is_none());
    assert_eq!(MockState::count(&backend.state.me_calls), 0);
}

#[tokio::test]
async fn startup_check_fetches_missing_profile() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.client();
    store
        .save(&TokenPair::new(backend.state.accepted(), "r1"))
        .unwrap();

    let session = client.session().check_auth_status().await;

    assert_eq!(session.status, SessionStatus::Authenticated);
    assert_eq!(session.user.map(|u| u.id), Some(7));
    assert_eq!(MockState::count(&backend.state.me_calls), 1);
    assert_eq!(MockState::count(&backend.state.refresh_calls), 0);
    assert_eq!(store.load_user().unwrap().map(|u| u.id), Some(7));
}

#[tokio::test]
async fn startup_check_refreshes_token_inside_window() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.client();
    // One minute left is inside the default five-minute refresh buffer.
    store
        .save(&TokenPair::new(token("a1", Duration::from_secs(60)), "r1"))
        .unwrap();

    let session = client.session().check_auth_status().await;

    assert_eq!(MockState::count(&backend.state.refresh_calls), 1);
    assert_eq!(session.status, SessionStatus::Authenticated);
    let renewed = backend.state.accepted();
    assert_eq!(
        session.tokens.as_ref().map(|t| t.access.as_str()),
        Some(renewed.as_str())
    );
    assert_eq!(stored(&store).unwrap().access, renewed);
    assert!(!client.session().should_refresh());
    assert!(!client.session().is_expired());
}

#[tokio::test]
async fn startup_check_with_rejected_refresh_clears_store() {
    let backend = MockBackend::start().await;
    backend.state.refresh_fails.store(true, Ordering::SeqCst);
    let (client, store) = backend.client();
    store
        .save(&TokenPair::new(token("a1", Duration::from_secs(60)), "r1"))
        .unwrap();

    let session = client.session().check_auth_status().await;

    assert_eq!(session.status, SessionStatus::Anonymous);
    assert!(session.error.is_some());
    assert!(stored(&store).is_none());
    assert_eq!(MockState::count(&backend.state.me_calls), 0);
}

#[tokio::test]
async fn explicit_refresh_renews_access_token() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.logged_in().await;
    let mut events = client.session().subscribe();

    let pair = client.session().refresh().await.unwrap();

    assert_eq!(pair.access, backend.state.accepted());
    assert_eq!(pair.refresh, "r1");
    assert_eq!(stored(&store), Some(pair));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Refreshed { expiry_epoch_ms: Some(_) }
    ));
    assert_eq!(client.session().status(), SessionStatus::Authenticated);
}

#[tokio::test]
async fn logout_during_refresh_keeps_tokens_out_of_the_store() {
    let backend = MockBackend::start().await;
    let (client, store) = backend.logged_in().await;
    *backend.state.refresh_delay.lock().unwrap() = Duration::from_millis(400);
    backend.state.revoke_access();

    let files = client.files().clone();
    let listing = tokio::spawn(async move { files.list().await });
    tokio::time::timeout(Duration::from_secs(5), async {
        while MockState::count(&backend.state.refresh_calls) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("refresh started");

    client.logout().await;
    let err = listing.await.unwrap().unwrap_err();

    assert!(err.requires_login());
    assert_eq!(client.session().status(), SessionStatus::Anonymous);
    assert!(stored(&store).is_none());
    // Only the original attempt; the renewed token was never used.
    assert_eq!(MockState::count(&backend.state.files_calls), 1);

    let session = client.session().check_auth_status().await;
    assert_eq!(session.status, SessionStatus::Anonymous);
}

#[tokio::test]
async fn refresh_task_renews_token_inside_window() {
    let backend = MockBackend::start().await;
    // Inside the default five-minute refresh buffer from the start.
    *backend.state.accepted.lock().unwrap() = token("a1", Duration::from_secs(60));
    let (client, store) = backend.logged_in().await;
    let mut events = client.session().subscribe();

    client.session().spawn_refresh_task();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("refresh event")
        .unwrap();
    assert!(matches!(event, SessionEvent::Refreshed { expiry_epoch_ms: Some(_) }));
    let renewed = backend.state.next_access.lock().unwrap().clone();
    assert_eq!(stored(&store).unwrap().access, renewed);
    assert_eq!(MockState::count(&backend.state.refresh_calls), 1);
    assert!(!client.session().should_refresh());
    assert_eq!(client.session().status(), SessionStatus::Authenticated);

    client.logout().await;
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.client();

    let health = client.health().await.unwrap();

    assert_eq!(health["status"], "ok");
}
