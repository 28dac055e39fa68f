//! Scans of the on-disk fixture app through `LocalTreeProvider` and
//! `FileStore`.

use std::path::PathBuf;
use std::sync::Arc;

use screenmap::config::Config;
use screenmap::model::{FlowKind, ScreenKind};
use screenmap::provider::{LocalTreeProvider, TreeProvider};
use screenmap::{Engine, FileStore, Framework, RecordStore};
use tempfile::TempDir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/sveltekit-app")
}

fn engine(root: PathBuf, store_dir: &TempDir) -> Engine {
    Engine::new(
        Arc::new(LocalTreeProvider::new(root)) as Arc<dyn TreeProvider>,
        Arc::new(FileStore::new(store_dir.path())) as Arc<dyn RecordStore>,
        None,
        Config::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_sveltekit_fixture() {
    let store_dir = TempDir::new().unwrap();
    let engine = engine(fixture(), &store_dir);

    let result = engine.analyze("journal", "local", None).await.unwrap();

    assert_eq!(result.framework.primary, Some(Framework::Sveltekit));
    let routes: Vec<&str> = result.screens.iter().map(|s| s.route_path.as_str()).collect();
    assert_eq!(routes, vec!["/", "/about", "/blog/:slug"]);
    assert!(result.screens.iter().all(|s| s.kind == ScreenKind::Page));

    let home = &result.screens[0];
    assert!(home.navigates_to.contains("/about"));
    assert!(home.navigates_to.contains("/blog/:slug"));

    // `$lib/api` resolves into src/lib, so the home page reaches its fetch.
    let home_flows: Vec<_> = result
        .flows
        .iter()
        .filter(|f| home.flow_ids.contains(&f.id))
        .collect();
    assert!(home_flows
        .iter()
        .any(|f| f.kind == FlowKind::ApiCall && f.source_file == "src/lib/api.ts"));
    assert!(home_flows.iter().any(|f| f.kind == FlowKind::UiEvent));

    let about = &result.screens[1];
    assert!(about.flow_ids.is_empty());
    assert!(about.navigates_to.contains("/"));
}

#[tokio::test]
async fn test_records_persist_across_engines() {
    let store_dir = TempDir::new().unwrap();

    let first = engine(fixture(), &store_dir)
        .analyze("journal", "local", None)
        .await
        .unwrap();

    let reopened = engine(fixture(), &store_dir);
    let record = reopened.get_analysis(&first.analysis_id).await.unwrap();
    assert_eq!(record.screens, first.screens);
    assert_eq!(record.flows, first.flows);

    // The directory is unchanged, so it resolves to the same commit.
    let again = reopened.analyze("journal", "local", None).await.unwrap();
    assert_eq!(again.analysis_id, first.analysis_id);
}

#[tokio::test]
async fn test_edited_checkout_is_a_new_commit() {
    let checkout = TempDir::new().unwrap();
    for entry in walkdir::WalkDir::new(fixture()) {
        let entry = entry.unwrap();
        let relative = entry.path().strip_prefix(fixture()).unwrap();
        let target = checkout.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }

    let store_dir = TempDir::new().unwrap();
    let engine = engine(checkout.path().to_path_buf(), &store_dir);
    let first = engine.analyze("journal", "local", None).await.unwrap();

    std::fs::write(
        checkout.path().join("src/routes/about/+page.svelte"),
        "<h1>About us</h1>\n",
    )
    .unwrap();
    let second = engine.analyze("journal", "local", None).await.unwrap();

    assert_ne!(first.commit_sha, second.commit_sha);
    let about = |r: &screenmap::AnalysisResult| {
        r.screens
            .iter()
            .find(|s| s.route_path == "/about")
            .map(|s| (s.id.clone(), s.source_hash.clone()))
            .unwrap()
    };
    let (first_id, first_hash) = about(&first);
    let (second_id, second_hash) = about(&second);
    assert_eq!(first_id, second_id);
    assert_ne!(first_hash, second_hash);
}
