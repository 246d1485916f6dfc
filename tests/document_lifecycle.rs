mod common;

use common::{png, write_file, FakeRenderer};
use paperstore::api::{CoverSource, PaperApi};
use paperstore::config::StoreConfig;
use paperstore::cover::placeholder::BUILTIN_PLACEHOLDER;
use paperstore::error::PaperError;
use paperstore::model::{NewDocument, PNG_MIME};
use std::time::Duration;
use tempfile::TempDir;

struct Env {
    tmp: TempDir,
    api: PaperApi<FakeRenderer>,
}

impl Env {
    async fn new(config: StoreConfig, renderer: Option<FakeRenderer>) -> Self {
        let tmp = TempDir::new().unwrap();
        let api = PaperApi::open_with_renderer(tmp.path().join("data"), &config, renderer)
            .await
            .unwrap();
        Self { tmp, api }
    }

    fn upload(&self, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        write_file(self.tmp.path(), name, bytes)
    }
}

#[tokio::test]
async fn create_list_get_delete() {
    let env = Env::new(StoreConfig::default(), None).await;
    let pdf = env.upload("upload.bin", b"%PDF-1.7 hello");

    let created = env
        .api
        .create_document(
            NewDocument::pdf(&pdf, "paper.pdf")
                .with_title("Paper")
                .with_tags("x, y"),
        )
        .await
        .unwrap();
    let record = created.documents[0].clone();
    assert_eq!(record.title, "Paper");
    assert_eq!(record.tags, vec!["x", "y"]);

    let listed = env.api.list_documents().await.unwrap();
    assert_eq!(listed.documents, vec![record.clone()]);

    let id = record.id.to_string();
    let fetched = env.api.get_document(&id).await.unwrap();
    assert_eq!(fetched.documents, vec![record.clone()]);

    let file = env.api.document_file(&id).await.unwrap().file.unwrap();
    assert_eq!(file.filename, "paper.pdf");
    assert_eq!(std::fs::read(&file.path).unwrap(), b"%PDF-1.7 hello");

    env.api.delete_document(&id).await.unwrap();
    assert!(env.api.list_documents().await.unwrap().documents.is_empty());
    assert!(env.api.get_document(&id).await.unwrap_err().is_not_found());
    assert!(!file.path.exists());
    // The id is still well-formed; only the directory is gone.
    let dir = env.api.store().dirs().resolve(&id).unwrap();
    assert!(!dir.exists());
}

#[tokio::test]
async fn newest_documents_list_first() {
    let env = Env::new(StoreConfig::default(), None).await;
    let pdf = env.upload("upload.bin", b"%PDF");

    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        let result = env
            .api
            .create_document(NewDocument::pdf(&pdf, "p.pdf").with_title(title))
            .await
            .unwrap();
        ids.push(result.documents[0].id);
    }

    let listed: Vec<_> = env
        .api
        .list_documents()
        .await
        .unwrap()
        .documents
        .iter()
        .map(|r| r.id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn rejected_uploads_leave_nothing_behind() {
    let config = StoreConfig {
        max_upload_bytes: 8,
        ..Default::default()
    };
    let env = Env::new(config, None).await;
    let papers = env.api.root().join("papers");

    let big = env.upload("big.bin", &[b'x'; 64]);
    let err = env
        .api
        .create_document(NewDocument::pdf(&big, "big.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaperError::TooLarge { size: 64, limit: 8 }));

    let small = env.upload("small.bin", b"%PDF");
    let mut wrong_type = NewDocument::pdf(&small, "notes.txt");
    wrong_type.content_type = "text/plain".to_string();
    let err = env.api.create_document(wrong_type).await.unwrap_err();
    assert!(matches!(err, PaperError::UnsupportedMedia(_)));

    let bad_cover = NewDocument::pdf(&small, "p.pdf").with_cover(&small, "image/jpeg");
    let err = env.api.create_document(bad_cover).await.unwrap_err();
    assert!(matches!(err, PaperError::UnsupportedMedia(_)));

    assert!(env.api.list_documents().await.unwrap().documents.is_empty());
    assert_eq!(std::fs::read_dir(&papers).unwrap().count(), 0);
}

#[tokio::test]
async fn bad_ids_are_not_found() {
    let env = Env::new(StoreConfig::default(), None).await;
    for id in ["../etc", "..", "not-a-uuid", "", "00000000-0000-0000-0000-00000000000/"] {
        let err = env.api.get_document(id).await.unwrap_err();
        assert!(err.is_not_found(), "{} gave {:?}", id, err);
        assert!(env.api.cover(id).await.unwrap_err().is_not_found());
        assert!(env.api.document_file(id).await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn uploaded_cover_is_served_without_rendering() {
    let renderer = FakeRenderer::new(Duration::from_millis(10));
    let stats = std::sync::Arc::clone(&renderer.stats);
    let env = Env::new(StoreConfig::default(), Some(renderer)).await;
    let pdf = env.upload("p.bin", b"%PDF");
    let cover = env.upload("c.bin", &png(200, 280));

    let record = env
        .api
        .create_document(NewDocument::pdf(&pdf, "p.pdf").with_cover(&cover, PNG_MIME))
        .await
        .unwrap()
        .documents
        .remove(0);

    let result = env.api.cover(&record.id.to_string()).await.unwrap();
    match result.cover {
        Some(CoverSource::File(path)) => assert_eq!(std::fs::read(path).unwrap(), png(200, 280)),
        other => panic!("unexpected cover: {:?}", other),
    }
    assert_eq!(stats.calls(), 0);
}

#[tokio::test]
async fn missing_cover_is_rendered_once() {
    let renderer = FakeRenderer::new(Duration::from_millis(10));
    let stats = std::sync::Arc::clone(&renderer.stats);
    let env = Env::new(StoreConfig::default(), Some(renderer)).await;
    let pdf = env.upload("p.bin", b"%PDF");
    let record = env
        .api
        .create_document(NewDocument::pdf(&pdf, "p.pdf"))
        .await
        .unwrap()
        .documents
        .remove(0);
    let id = record.id.to_string();

    let first = env.api.cover(&id).await.unwrap();
    assert!(matches!(first.cover, Some(CoverSource::File(_))));
    let second = env.api.cover(&id).await.unwrap();
    assert_eq!(first.cover, second.cover);
    assert_eq!(stats.calls(), 1);
}

#[tokio::test]
async fn failed_render_falls_back_to_placeholder() {
    let env = Env::new(
        StoreConfig::default(),
        Some(FakeRenderer::failing(Duration::from_millis(10))),
    )
    .await;
    let pdf = env.upload("p.bin", b"%PDF");
    let record = env
        .api
        .create_document(NewDocument::pdf(&pdf, "p.pdf"))
        .await
        .unwrap()
        .documents
        .remove(0);

    let result = env.api.cover(&record.id.to_string()).await.unwrap();
    assert_eq!(result.cover, Some(CoverSource::Builtin(BUILTIN_PLACEHOLDER)));
    assert_eq!(result.messages.len(), 1);
}

#[tokio::test]
async fn doctor_restores_a_deleted_index() {
    let env = Env::new(StoreConfig::default(), None).await;
    let pdf = env.upload("p.bin", b"%PDF");
    let mut ids = Vec::new();
    for _ in 0..3 {
        let result = env
            .api
            .create_document(NewDocument::pdf(&pdf, "p.pdf"))
            .await
            .unwrap();
        ids.push(result.documents[0].id);
    }
    std::fs::remove_file(env.api.root().join("index.json")).unwrap();
    assert!(env.api.list_documents().await.unwrap().documents.is_empty());

    let report = env.api.doctor().await.unwrap().report.unwrap();
    assert_eq!(report.recovered, 3);
    assert_eq!(report.total, 3);

    let mut listed: Vec<_> = env
        .api
        .list_documents()
        .await
        .unwrap()
        .documents
        .iter()
        .map(|r| r.id)
        .collect();
    listed.sort();
    ids.sort();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn mirror_follows_creates_and_deletes() {
    let mirror = TempDir::new().unwrap();
    let config = StoreConfig {
        mirror_root: Some(mirror.path().to_path_buf()),
        ..Default::default()
    };
    let env = Env::new(config, None).await;
    assert!(env.api.health().mirror_enabled);

    let pdf = env.upload("p.bin", b"%PDF-mirrored");
    let record = env
        .api
        .create_document(NewDocument::pdf(&pdf, "p.pdf").with_title("Mirrored"))
        .await
        .unwrap()
        .documents
        .remove(0);
    env.api.shutdown().await;

    let mirrored_dir = mirror.path().join("papers").join(record.id.to_string());
    assert_eq!(
        std::fs::read(mirrored_dir.join("content.pdf")).unwrap(),
        b"%PDF-mirrored"
    );
    assert!(mirrored_dir.join("metadata.json").exists());
    let index = std::fs::read_to_string(mirror.path().join("index.json")).unwrap();
    assert!(index.contains(&record.id.to_string()));

    env.api.delete_document(&record.id.to_string()).await.unwrap();
    env.api.shutdown().await;
    assert!(!mirrored_dir.exists());
    let index = std::fs::read_to_string(mirror.path().join("index.json")).unwrap();
    assert!(!index.contains(&record.id.to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mirror_keeps_deletes_issued_right_after_creates() {
    let mirror = TempDir::new().unwrap();
    let config = StoreConfig {
        mirror_root: Some(mirror.path().to_path_buf()),
        ..Default::default()
    };
    let env = Env::new(config, None).await;
    let pdf = env.upload("p.bin", &vec![b'x'; 1024 * 1024]);

    for _ in 0..10 {
        let record = env
            .api
            .create_document(NewDocument::pdf(&pdf, "p.pdf"))
            .await
            .unwrap()
            .documents
            .remove(0);
        env.api.delete_document(&record.id.to_string()).await.unwrap();
    }
    env.api.shutdown().await;

    assert!(env.api.list_documents().await.unwrap().documents.is_empty());
    let index: serde_json::Value =
        serde_json::from_slice(&std::fs::read(mirror.path().join("index.json")).unwrap()).unwrap();
    assert_eq!(index.as_array().map(|a| a.len()), Some(0), "{}", index);
    assert_eq!(std::fs::read_dir(mirror.path().join("papers")).unwrap().count(), 0);
}

#[tokio::test]
async fn mirror_root_equal_to_primary_is_ignored() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("data");
    let config = StoreConfig {
        mirror_root: Some(root.clone()),
        ..Default::default()
    };
    let api = PaperApi::open(&root, &config).await.unwrap();
    assert!(!api.health().mirror_enabled);
}
