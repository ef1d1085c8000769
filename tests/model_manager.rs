mod common;

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
};

use rand::{rngs::StdRng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use httpmock::prelude::*;

use genre_classifier_core::{
    ensure_model, prepare_model, set_download_progress_callback, GenreError, CACHE_DIR_ENV,
};

use common::zcr_bundle;

/// One cache dir for the whole test binary; tests use distinct model names.
fn cache_dir() -> PathBuf {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    let dir = DIR.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        std::env::set_var(CACHE_DIR_ENV, dir.path());
        dir
    });
    dir.path().to_path_buf()
}

fn sha256_hex(data: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(data);
    hex::encode(h.finalize())
}

fn make_fake_model_bytes(len: usize) -> (Vec<u8>, String, u64) {
    let mut data = vec![0u8; len];

    let mut rng = StdRng::seed_from_u64(42);
    rng.fill_bytes(&mut data);

    let sha = sha256_hex(&data);
    (data, sha, len as u64)
}

fn manifest_json(
    model_name: &str,
    file_name: &str,
    model_url: &str,
    sha256_hex: &str,
    size: u64,
) -> String {
    format!(
        r#"{{
  "name": "{name}",
  "version": "1.0.0",
  "format": "genre-bundle-json",
  "artifacts": [
    {{
      "file": "{file}",
      "url": "{url}",
      "sha256": "{sha}",
      "size_bytes": {size}
    }}
  ]
}}"#,
        name = model_name,
        file = file_name,
        url = model_url,
        sha = sha256_hex,
        size = size
    )
}

#[test]
fn downloads_and_caches_model_then_reuses_cache() {
    let cache = cache_dir();

    let (model_bytes, sha_hex, size) = make_fake_model_bytes(256 * 1024); // 256 KiB

    let server = MockServer::start();

    let model_mock = server.mock(|when, then| {
        when.method(GET).path("/gtzan_cached.json");
        then.status(200)
            .header("Content-Length", size.to_string().as_str())
            .body(model_bytes.clone());
    });

    let model_name = "gtzan_cached";
    let file_name = "gtzan_cached.json";
    let model_url = format!("{}/{}", server.base_url(), file_name);

    let manifest_body = manifest_json(model_name, file_name, &model_url, &sha_hex, size);

    let manifest_mock = server.mock(|when, then| {
        when.method(GET).path("/manifest/gtzan_cached");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(manifest_body.clone());
    });

    let manifest_url = format!("{}/manifest/gtzan_cached", server.base_url());

    let handle = ensure_model(&manifest_url).expect("first ensure_model failed");
    assert!(handle.local_path.exists(), "cached model should exist");
    assert!(handle.local_path.starts_with(&cache));
    assert_eq!(
        handle.local_path.file_name().unwrap().to_str().unwrap(),
        format!("gtzan_cached-{}.json", &sha_hex[..8])
    );
    assert_eq!(std::fs::read(&handle.local_path).unwrap(), model_bytes);

    assert!(manifest_mock.hits() >= 1);
    model_mock.assert_hits(1);

    let handle2 = ensure_model(&manifest_url).expect("second ensure_model failed");
    assert_eq!(
        handle.local_path, handle2.local_path,
        "cache path should be stable"
    );

    model_mock.assert_hits(1); // still exactly one hit total
    assert_eq!(manifest_mock.hits(), 2);
}

#[test]
fn checksum_mismatch_returns_error() {
    let cache = cache_dir();

    let (model_bytes, sha_hex, size) = make_fake_model_bytes(64 * 1024);
    let mut bad_sha = sha_hex.clone();
    let first = &bad_sha[0..1];
    bad_sha.replace_range(0..1, if first == "a" { "b" } else { "a" });

    let server = MockServer::start();

    let _model_mock = server.mock(|when, then| {
        when.method(GET).path("/bad.json");
        then.status(200)
            .header("Content-Length", size.to_string().as_str())
            .body(model_bytes.clone());
    });

    let model_url = format!("{}/bad.json", server.base_url());
    let manifest_body = manifest_json("bad_model", "bad.json", &model_url, &bad_sha, size);

    let _manifest_mock = server.mock(|when, then| {
        when.method(GET).path("/manifest/bad");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(manifest_body.clone());
    });

    let manifest_url = format!("{}/manifest/bad", server.base_url());

    match ensure_model(&manifest_url) {
        Ok(_) => panic!("expected checksum error, got Ok"),
        Err(e) => {
            assert!(matches!(e, GenreError::Checksum { .. }), "got {e:?}");
            let msg = e.to_string().to_lowercase();
            assert!(
                msg.contains("checksum"),
                "expected checksum error, got: {msg}"
            );
        }
    }

    let bad_path = cache.join(format!("bad_model-{}.json", &bad_sha[..8]));
    assert!(!bad_path.exists(), "rejected download must not stay in the cache");
}

#[test]
fn prepare_model_loads_served_bundle() {
    cache_dir();

    let body = serde_json::to_vec(&zcr_bundle()).unwrap();
    let sha = sha256_hex(&body);

    let server = MockServer::start();
    let _bundle_mock = server.mock(|when, then| {
        when.method(GET).path("/zcr.json");
        then.status(200).body(body.clone());
    });

    let bundle_url = format!("{}/zcr.json", server.base_url());
    let manifest_body = manifest_json("zcr_served", "zcr.json", &bundle_url, &sha, body.len() as u64);
    let _manifest_mock = server.mock(|when, then| {
        when.method(GET).path("/manifest/zcr");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(manifest_body.clone());
    });

    let downloaded = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&downloaded);
    set_download_progress_callback(move |done, _total| {
        seen.fetch_max(done, Ordering::SeqCst);
    });

    let ctx = prepare_model(&format!("{}/manifest/zcr", server.base_url())).unwrap();
    assert_eq!(ctx.name(), "zcr-test");
    assert_eq!(ctx.dimension(), 24);
    assert!(downloaded.load(Ordering::SeqCst) >= body.len() as u64);
}

#[test]
fn manifest_without_artifacts_is_rejected() {
    cache_dir();

    let server = MockServer::start();
    let _manifest_mock = server.mock(|when, then| {
        when.method(GET).path("/manifest/empty");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(r#"{"name":"empty","version":"0.1.0","artifacts":[]}"#);
    });

    let err = ensure_model(&format!("{}/manifest/empty", server.base_url())).unwrap_err();
    assert!(matches!(err, GenreError::Manifest(_)), "got {err:?}");
}

#[test]
fn manifest_names_cannot_escape_the_cache_dir() {
    cache_dir();
    let (body, sha, size) = make_fake_model_bytes(256);

    let server = MockServer::start();
    let model_mock = server.mock(|when, then| {
        when.method(GET).path("/models/escape.json");
        then.status(200).body(body.clone());
    });
    let cases = [
        ("/manifest/parent", "../escaped", "escape.json"),
        ("/manifest/nested", "a/b", "escape.json"),
        ("/manifest/backslash", "a\\\\b", "escape.json"),
        ("/manifest/ext", "safe-name", "escape.json/../../x"),
    ];
    for (path, name, file) in cases {
        let manifest = manifest_json(
            name,
            file,
            &format!("{}/models/escape.json", server.base_url()),
            &sha,
            size,
        );
        server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(200)
                .header("Content-Type", "application/json")
                .body(manifest);
        });

        let err = ensure_model(&format!("{}{}", server.base_url(), path)).unwrap_err();
        assert!(matches!(err, GenreError::Manifest(_)), "{name}: got {err:?}");
    }

    model_mock.assert_hits(0);
}
