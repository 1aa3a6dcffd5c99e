//! Upload side effects: repeated lookups and concurrent writers.

use reqwest::multipart::{Form, Part};

mod common;

fn file_form(name: &str, filename: &str, content: &[u8]) -> Form {
    Form::new().part(
        name.to_string(),
        Part::bytes(content.to_vec()).file_name(filename.to_string()),
    )
}

#[tokio::test]
async fn test_repeated_lookup_copies_twice() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(Some(dir.path())).await;

    let res = common::client()
        .post(server.url("/"))
        .header("x-params", "doc,doc")
        .multipart(file_form("doc", "twice.txt", b"same bytes"))
        .send()
        .await
        .unwrap();

    let dest = dir.path().join("twice.txt");
    let expected = format!("doc={0}\ndoc={0}", dest.display());
    assert_eq!(res.text().await.unwrap(), expected);
    assert_eq!(std::fs::read(&dest).unwrap(), b"same bytes");
}

#[tokio::test]
async fn test_same_filename_last_writer_wins() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(Some(dir.path())).await;
    let client = common::client();

    for content in [&b"first upload, the longer one"[..], b"second"] {
        let res = client
            .post(server.url("/"))
            .header("x-params", "f")
            .multipart(file_form("f", "shared.txt", content))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success());
    }

    assert_eq!(std::fs::read(dir.path().join("shared.txt")).unwrap(), b"second");
}

#[tokio::test]
async fn test_concurrent_uploads_of_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(Some(dir.path())).await;
    let client = common::client();

    let mut handles = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let url = server.url("/");
        handles.push(tokio::spawn(async move {
            let content = format!("file number {}", i).into_bytes();
            client
                .post(url)
                .header("x-params", "f")
                .multipart(file_form("f", &format!("f{}.txt", i), &content))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }

    for h in handles {
        assert!(h.await.unwrap().is_success());
    }
    for i in 0..10 {
        let written = std::fs::read_to_string(dir.path().join(format!("f{}.txt", i))).unwrap();
        assert_eq!(written, format!("file number {}", i));
    }
}

#[tokio::test]
async fn test_filename_cannot_escape_upload_dir() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    std::fs::create_dir(&uploads).unwrap();
    let server = common::start_server(Some(&uploads)).await;

    let res = common::client()
        .post(server.url("/"))
        .header("x-params", "f")
        .multipart(file_form("f", "../escape.txt", b"x"))
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert!(uploads.join("escape.txt").exists());
    assert!(!dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_missing_upload_dir_is_path_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::start_server(Some(&dir.path().join("missing"))).await;

    let res = common::client()
        .post(server.url("/"))
        .header("x-params", "f")
        .multipart(file_form("f", "a.txt", b"x"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), "f!PathError");
}
