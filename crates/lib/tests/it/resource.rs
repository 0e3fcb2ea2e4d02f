use std::{
    collections::HashSet,
    sync::{Arc, Mutex, atomic::Ordering},
    time::Duration,
};

use mycloud::http::{ProgressFn, UploadPayload};

use crate::helpers::*;

#[tokio::test]
async fn independent_items_are_tracked_separately() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    client.files().list().await.unwrap();
    backend.state.holding.store(true, Ordering::SeqCst);

    let files = client.files().clone();
    let deleting = tokio::spawn(async move { files.delete(42).await });
    let files = client.files().clone();
    let renaming = tokio::spawn(async move { files.rename(43, "summary.txt").await });

    let state = client.files().state();
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.in_flight() != HashSet::from([42, 43]) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("both operations in flight");
    assert!(state.is_in_flight(&42));
    assert!(!state.is_loading());
    backend.state.hold.add_permits(2);

    deleting.await.unwrap().unwrap();
    renaming.await.unwrap().unwrap();

    assert!(state.in_flight().is_empty());
    assert!(state.get(&42).is_none());
    assert_eq!(state.get(&43).unwrap().original_name, "summary.txt");
    assert_eq!(state.len(), 1);
    assert!(state.error().is_none());
}

#[tokio::test]
async fn cancelled_operation_releases_its_item() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    client.files().list().await.unwrap();
    backend.state.holding.store(true, Ordering::SeqCst);

    let files = client.files().clone();
    let deleting = tokio::spawn(async move { files.delete(42).await });
    let state = client.files().state();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !state.is_in_flight(&42) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("delete in flight");

    deleting.abort();
    let _ = deleting.await;

    assert!(state.in_flight().is_empty());
    assert!(state.get(&42).is_some());
    backend.state.hold.add_permits(1);
}

#[tokio::test]
async fn upload_reports_monotonic_progress() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let on_progress: ProgressFn = {
        let seen = Arc::clone(&seen);
        Arc::new(move |percent: u8| seen.lock().unwrap().push(percent))
    };

    let data = vec![7u8; 10 * 1024 * 1024];
    let payload = UploadPayload::new("archive.zip", data).with_comment("quarterly");
    let created = client
        .files()
        .upload(payload, Some(on_progress))
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].original_name, "archive.zip");
    assert_eq!(created[0].size, 10 * 1024 * 1024);
    assert_eq!(
        MockState::count(&backend.state.uploaded_bytes),
        10 * 1024 * 1024
    );
    assert_eq!(
        backend.state.last_comment.lock().unwrap().as_deref(),
        Some("quarterly")
    );

    let seen = seen.lock().unwrap().clone();
    assert!(seen.len() > 1, "expected intermediate progress, got {seen:?}");
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));

    let state = client.files().state();
    assert_eq!(state.progress(), Some(100));
    assert!(!state.is_loading());
    assert!(state.get(&100).is_some());
}

#[tokio::test]
async fn invalid_upload_is_rejected_locally() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;

    let err = client
        .files()
        .upload(UploadPayload::new("../escape", b"x".to_vec()), None)
        .await
        .unwrap_err();

    assert!(err.is_validation_error());
    assert_eq!(MockState::count(&backend.state.uploaded_bytes), 0);
    assert_eq!(client.files().state().progress(), None);
}

#[tokio::test]
async fn comment_update_takes_server_entity() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    client.files().list().await.unwrap();

    client
        .files()
        .update_comment(43, "meeting notes")
        .await
        .unwrap();

    let file = client.files().state().get(&43).unwrap();
    assert_eq!(file.comment, "meeting notes");
    assert_eq!(file.original_name, "notes.txt");
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;

    let bytes = client.files().download(42).await.unwrap();

    assert_eq!(bytes, b"contents of 42");
}

#[tokio::test]
async fn admin_flags_update_rows() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;

    let users = client.users().list().await.unwrap();
    assert_eq!(users.len(), 2);

    // Acknowledgement shape: only the flag comes back.
    client.users().toggle_admin(7).await.unwrap();
    let demo = client.users().state().get(&7).unwrap();
    assert!(demo.is_staff);
    assert_eq!(demo.file_count, Some(2));

    // Full user shape.
    client.users().set_active(8, false).await.unwrap();
    let bob = client.users().state().get(&8).unwrap();
    assert_eq!(bob.is_active, Some(false));
    assert!(bob.is_staff);
    assert!(client.users().state().in_flight().is_empty());
}

#[tokio::test]
async fn admin_deletes_user() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    client.users().list().await.unwrap();

    client.users().delete(8).await.unwrap();

    let users = client.users().state();
    assert!(users.get(&8).is_none());
    assert_eq!(users.len(), 1);
    assert!(users.in_flight().is_empty());
    assert_eq!(backend.state.users.lock().unwrap().len(), 1);

    let err = client.users().delete(99).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(users.error().as_deref(), Some("User not found"));
}

#[tokio::test]
async fn another_users_files_replace_the_collection() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    client.files().list().await.unwrap();

    let files = client.files().list_for_user(8).await.unwrap();

    assert_eq!(files.len(), 1);
    let state = client.files().state();
    assert_eq!(state.len(), 1);
    assert_eq!(state.get(&50).unwrap().original_name, "bob.txt");
    assert!(state.get(&42).is_none());
}

#[tokio::test]
async fn logout_forgets_collections() {
    let backend = MockBackend::start().await;
    let (client, _store) = backend.logged_in().await;
    client.files().list().await.unwrap();
    client.users().list().await.unwrap();

    client.logout().await;

    assert!(client.files().state().is_empty());
    assert!(client.users().state().is_empty());
}
