use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use stegomark_client::{
    decode_data_url, Preview, PreviewRegistry, PreviewStrategy, ResourceError, ResourceErrorSink,
    ResourceManager, SelectedFile,
};

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<(String, ResourceError)>>,
}

impl ResourceErrorSink for RecordingSink {
    fn report(&self, slot: &str, error: &ResourceError) {
        self.reports
            .lock()
            .unwrap()
            .push((slot.to_string(), error.clone()));
    }
}

fn video(name: &str) -> SelectedFile {
    SelectedFile::from_bytes(name, "video/mp4", vec![0u8; 32])
}

#[test]
fn inline_preview_is_a_data_url_of_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cover.png");
    std::fs::write(&path, b"\x89PNG\r\n").unwrap();

    let mut manager = ResourceManager::new(Arc::new(PreviewRegistry::new()));
    let resource = manager.select("cover_image", SelectedFile::from_path(&path), PreviewStrategy::Inline);

    assert_eq!(resource.file().name(), "cover.png");
    assert_eq!(resource.file().mime(), "image/png");
    let Some(Preview::DataUrl(url)) = resource.preview() else {
        panic!("expected an inline preview");
    };
    let decoded = decode_data_url(url).unwrap();
    assert_eq!(decoded.mime, "image/png");
    assert_eq!(decoded.bytes, b"\x89PNG\r\n");
    assert_eq!(manager.registry().created_count(), 0);
}

#[test]
fn reselecting_a_handle_slot_revokes_the_previous_handle() {
    let registry = Arc::new(PreviewRegistry::new());
    let mut manager = ResourceManager::new(registry.clone());

    let first = match manager.select("video", video("a.mp4"), PreviewStrategy::Handle).preview() {
        Some(Preview::Handle(handle)) => *handle,
        other => panic!("expected a handle, got {other:?}"),
    };
    assert_eq!(registry.resolve(first).map(|f| f.name().to_string()), Some("a.mp4".into()));

    manager.select("video", video("b.mp4"), PreviewStrategy::Handle);

    assert!(registry.resolve(first).is_none());
    assert_eq!(registry.created_count(), 2);
    assert_eq!(registry.revoked_count(), 1);
    assert_eq!(registry.live_count(), 1);
    assert_eq!(manager.get("video").unwrap().file().name(), "b.mp4");
}

#[test]
fn release_is_idempotent() {
    let registry = Arc::new(PreviewRegistry::new());
    let mut manager = ResourceManager::new(registry.clone());
    manager.select("video", video("a.mp4"), PreviewStrategy::Handle);

    manager.release("video");
    manager.release("video");
    manager.release("never_selected");

    assert_eq!(registry.revoked_count(), 1);
    assert!(manager.is_empty());
}

#[test]
fn release_all_and_drop_release_every_handle_once() {
    let registry = Arc::new(PreviewRegistry::new());
    {
        let mut manager = ResourceManager::new(registry.clone());
        manager.select("watermarked_video", video("w.mp4"), PreviewStrategy::Handle);
        manager.select("original_video", video("o.mp4"), PreviewStrategy::Handle);
        assert_eq!(registry.live_count(), 2);

        manager.release_all();
        assert_eq!(registry.live_count(), 0);

        manager.select("watermarked_video", video("w2.mp4"), PreviewStrategy::Handle);
    }

    assert_eq!(registry.live_count(), 0);
    assert_eq!(registry.created_count(), 3);
    assert_eq!(registry.revoked_count(), 3);
}

#[test]
fn unreadable_file_is_reported_and_still_selected() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.png");
    let sink = Arc::new(RecordingSink::default());
    let mut manager =
        ResourceManager::with_error_sink(Arc::new(PreviewRegistry::new()), sink.clone());

    let resource = manager.select("host_image", SelectedFile::from_path(&missing), PreviewStrategy::Inline);
    assert!(resource.preview().is_none());

    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "host_image");
    assert!(matches!(&reports[0].1, ResourceError::Read { path, .. } if path == &missing));
    assert!(manager.get("host_image").is_some());
}

#[test]
fn non_media_files_get_no_preview() {
    let registry = Arc::new(PreviewRegistry::new());
    let mut manager = ResourceManager::new(registry.clone());

    let resource = manager.select(
        "watermark",
        SelectedFile::from_bytes("notes.txt", "text/plain", b"hi".to_vec()),
        PreviewStrategy::Handle,
    );

    assert!(resource.preview().is_none());
    assert_eq!(registry.created_count(), 0);
}
