use std::{
    collections::BTreeMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use form::{
    AttachedFile, ClientError, FieldValue, FormClient, Slot, StoredFile, SubmissionRecord,
};
use server::{
    app,
    config::{Config, DEFAULT_ALLOWED_ORIGIN},
    error::GENERIC_ERROR,
    state::State,
};
use tempfile::TempDir;
use tokio::{io::AsyncReadExt, net::TcpListener};

async fn spawn_server(uploads_dir: PathBuf) -> SocketAddr {
    let config = Config {
        port: 0,
        uploads_dir,
        allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        max_body_bytes: 32 * 1024 * 1024,
    };

    let router = app(State::new(config).await.unwrap()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    addr
}

/// Accepts connections, reads a little of each request, then hangs up.
async fn spawn_dropping_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);

            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            drop(socket);
        }
    });

    (addr, accepted)
}

fn endpoint(addr: SocketAddr) -> String {
    format!("http://{addr}/api/storage-requests")
}

fn fill_requester(client: &mut FormClient) {
    client.handle_change("first_name", "Ada").unwrap();
    client.handle_change("last_name", "Lovelace").unwrap();
    client
        .handle_change("contact_person_email", "ada@example.org")
        .unwrap();
}

fn form_strings(record: &SubmissionRecord) -> BTreeMap<String, String> {
    record
        .fields()
        .map(|(name, value)| (name.to_string(), value.to_form_string()))
        .collect()
}

#[tokio::test]
async fn test_missing_required_field_never_hits_network() {
    let (addr, accepted) = spawn_dropping_server().await;

    for missing in ["first_name", "last_name", "contact_person_email"] {
        let mut client = FormClient::new(endpoint(addr));
        fill_requester(&mut client);
        client.handle_change(missing, "").unwrap();

        let before = client.record().clone();
        let result = client.submit().await;

        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(client.error().is_some());
        assert!(!client.loading());
        assert_eq!(client.record(), &before);
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fields_only_submission_is_echoed() {
    let uploads = TempDir::new().unwrap();
    let addr = spawn_server(uploads.path().to_path_buf()).await;

    let mut client = FormClient::new(endpoint(addr));
    fill_requester(&mut client);
    client.handle_change("elevation", "1250").unwrap();
    client.handle_change("date_of_collection", "2024-05-17").unwrap();
    client.set_checked("sampling_permits_required", true);

    let expected = form_strings(client.record());
    let acknowledgement = client.submit().await.unwrap();

    assert_eq!(acknowledgement.data, expected);
    assert_eq!(acknowledgement.data["elevation"], "1250");
    assert_eq!(acknowledgement.data["sampling_permits_required"], "true");
    assert!(acknowledgement.files.is_empty());

    assert!(client.error().is_none());
    assert_eq!(client.confirmation(), Some(&acknowledgement));
    assert_eq!(client.record(), &SubmissionRecord::new());
    assert_eq!(client.progress(), 100);
}

#[tokio::test]
async fn test_manifest_upload_keeps_extension_and_size() {
    let uploads = TempDir::new().unwrap();
    let addr = spawn_server(uploads.path().to_path_buf()).await;

    let manifest = vec![b'x'; 200 * 1024];

    let mut client = FormClient::new(endpoint(addr));
    fill_requester(&mut client);
    client.handle_file_change(
        Slot::Manifest,
        Some(AttachedFile::new("manifest.xlsx", "application/octet-stream", manifest.clone())),
    );

    let acknowledgement = client.submit().await.unwrap();
    let stored = &acknowledgement.files["manifest_file"];

    assert!(stored.stored_name.ends_with(".xlsx"));
    assert_eq!(stored.original_name, "manifest.xlsx");
    assert_eq!(stored.size, manifest.len() as u64);
    assert_eq!(
        std::fs::read(uploads.path().join(&stored.stored_name)).unwrap(),
        manifest
    );
}

#[tokio::test]
async fn test_progress_is_reported_up_to_100() {
    let uploads = TempDir::new().unwrap();
    let addr = spawn_server(uploads.path().to_path_buf()).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = {
        let seen = seen.clone();
        Arc::new(move |pct: u8| seen.lock().unwrap().push(pct))
    };

    let mut client = FormClient::new(endpoint(addr)).on_progress(observer);
    fill_requester(&mut client);
    client.handle_file_change(
        Slot::SamplingPermits,
        Some(AttachedFile::new("permit.pdf", "application/pdf", vec![0u8; 1024 * 1024])),
    );

    client.submit().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(seen.len() > 2);
}

#[tokio::test]
async fn test_dropped_upload_keeps_record() {
    let (addr, accepted) = spawn_dropping_server().await;

    let mut client = FormClient::new(endpoint(addr));
    fill_requester(&mut client);
    client.handle_file_change(
        Slot::NagoyaPermits,
        Some(AttachedFile::new("nagoya.pdf", "application/pdf", vec![1u8; 8 * 1024 * 1024])),
    );

    let before = client.record().clone();
    let result = client.submit().await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert!(client.error().is_some());
    assert!(client.confirmation().is_none());
    assert!(!client.loading());
    assert_eq!(client.record(), &before);
    assert_eq!(
        client.record().field("first_name"),
        Some(&FieldValue::Text("Ada".to_string()))
    );
    assert!(client.record().file(Slot::NagoyaPermits).is_some());
    assert!(accepted.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_server_error_is_surfaced_and_retry_succeeds() {
    let uploads = TempDir::new().unwrap();
    let uploads_dir = uploads.path().join("uploads");
    let addr = spawn_server(uploads_dir.clone()).await;

    std::fs::remove_dir_all(&uploads_dir).unwrap();

    let mut client = FormClient::new(endpoint(addr));
    fill_requester(&mut client);
    client.handle_file_change(
        Slot::Manifest,
        Some(AttachedFile::new("manifest.csv", "text/csv", b"a,b\n1,2\n".to_vec())),
    );

    let before = client.record().clone();

    match client.submit().await {
        Err(ClientError::Rejected { status, message }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, GENERIC_ERROR);
        }
        other => panic!("expected a 500 rejection, got {other:?}"),
    }

    assert!(client.error().unwrap().contains(GENERIC_ERROR));
    assert_eq!(client.record(), &before);

    std::fs::create_dir_all(&uploads_dir).unwrap();

    let acknowledgement = client.submit().await.unwrap();

    assert_eq!(acknowledgement.files["manifest_file"].size, 8);
    assert!(client.error().is_none());
}

#[test]
fn test_stored_file_matches_receiver_json() {
    let stored = server::storage::StoredFile {
        field_name: "manifest_file".to_string(),
        stored_name: "1715950000000.csv".to_string(),
        original_name: "manifest.csv".to_string(),
        size: 8,
        mime_type: "text/csv".to_string(),
    };

    let sent = serde_json::to_value(&stored).unwrap();
    let received: StoredFile = serde_json::from_value(sent.clone()).unwrap();

    assert_eq!(serde_json::to_value(&received).unwrap(), sent);
}

#[test]
fn test_slots_match_receiver_field_names() {
    let client: Vec<_> = Slot::ALL.iter().map(|slot| slot.field_name()).collect();
    let receiver: Vec<_> = server::storage::Slot::ALL
        .iter()
        .map(|slot| slot.field_name())
        .collect();

    assert_eq!(client, receiver);
}
