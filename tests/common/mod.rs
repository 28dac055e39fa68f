//! In-memory providers shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use screenmap::config::Config;
use screenmap::model::CaptureStatus;
use screenmap::provider::{
    CaptureOutcome, CaptureProvider, ProviderError, ProviderFuture, TreeEntry, TreeProvider,
};
use screenmap::{Engine, MemoryStore, RecordStore};
use tokio::sync::Semaphore;

/// A repository snapshot held in memory. The commit is set explicitly so
/// tests can model "new commit, same content".
pub struct FakeTree {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    commit: Mutex<String>,
    /// Only answer requests that carry this token; others get `NotFound`,
    /// the way GitHub hides private repositories.
    required_token: Option<String>,
    list_delay: Option<Duration>,
    failing: Mutex<HashSet<String>>,
    pub list_calls: AtomicUsize,
    pub content_calls: AtomicUsize,
}

impl FakeTree {
    pub fn new(commit: &str, files: &[(&str, &str)]) -> Self {
        Self {
            files: Mutex::new(
                files
                    .iter()
                    .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
                    .collect(),
            ),
            commit: Mutex::new(commit.to_string()),
            required_token: None,
            list_delay: None,
            failing: Mutex::new(HashSet::new()),
            list_calls: AtomicUsize::new(0),
            content_calls: AtomicUsize::new(0),
        }
    }

    pub fn private(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub fn slow_listing(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn set_commit(&self, commit: &str) {
        *self.commit.lock().unwrap() = commit.to_string();
    }

    pub fn set_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.as_bytes().to_vec());
    }

    /// Store raw bytes, e.g. content that is not UTF-8.
    pub fn set_bytes(&self, path: &str, content: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_vec());
    }

    pub fn fail_content(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_access(&self, repo: &str, token: Option<&str>) -> Result<(), ProviderError> {
        match &self.required_token {
            Some(required) if token != Some(required.as_str()) => {
                Err(ProviderError::NotFound(repo.to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl TreeProvider for FakeTree {
    fn resolve_commit<'a>(
        &'a self,
        repo: &'a str,
        _reference: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, String> {
        Box::pin(async move {
            self.check_access(repo, token)?;
            Ok(self.commit.lock().unwrap().clone())
        })
    }

    fn list_tree<'a>(
        &'a self,
        repo: &'a str,
        _reference: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<TreeEntry>> {
        Box::pin(async move {
            self.check_access(repo, token)?;
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.list_delay {
                tokio::time::sleep(delay).await;
            }
            let files = self.files.lock().unwrap();
            Ok(files
                .iter()
                .map(|(path, content)| {
                    let sha = screenmap::graph::ids::content_hash(content);
                    TreeEntry::blob(path, &sha, content.len() as u64)
                })
                .collect())
        })
    }

    fn get_content<'a>(
        &'a self,
        repo: &'a str,
        _reference: &'a str,
        path: &'a str,
        token: Option<&'a str>,
    ) -> ProviderFuture<'a, Vec<u8>> {
        Box::pin(async move {
            self.check_access(repo, token)?;
            self.content_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.lock().unwrap().contains(path) {
                return Err(ProviderError::Status(500));
            }
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(path.to_string()))
        })
    }
}

/// Capture provider that succeeds unless the screen path was marked failing.
#[derive(Default)]
pub struct FakeCapture {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeCapture {
    pub fn fail_path(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Screen paths captured so far, one entry per attempt.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Hold every capture after it is recorded in `calls` until the
    /// returned semaphore is given permits.
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

impl CaptureProvider for FakeCapture {
    fn capture<'a>(&'a self, url: &'a str, screen_path: &'a str) -> ProviderFuture<'a, CaptureOutcome> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(screen_path.to_string());
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                let _permit = gate.acquire().await.expect("gate open");
            }
            if self.failing.lock().unwrap().contains(screen_path) {
                return Ok(CaptureOutcome {
                    status: CaptureStatus::Error,
                    url: None,
                    error: Some(format!("render failed for {}", url)),
                });
            }
            Ok(CaptureOutcome {
                status: CaptureStatus::Ok,
                url: Some(format!("https://shots.test{}.png", screen_path)),
                error: None,
            })
        })
    }
}

/// Config with retries kept fast.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.fetch.backoff_ms = 1;
    config.fetch.max_retries = 1;
    config.capture.backoff_ms = 1;
    config.capture.max_retries = 1;
    config
}

pub struct Harness {
    pub engine: Engine,
    pub tree: Arc<FakeTree>,
    pub capture: Arc<FakeCapture>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(tree: FakeTree) -> Harness {
    harness_with(tree, test_config())
}

pub fn harness_with(tree: FakeTree, config: Config) -> Harness {
    let tree = Arc::new(tree);
    let capture = Arc::new(FakeCapture::default());
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(
        tree.clone() as Arc<dyn TreeProvider>,
        store.clone() as Arc<dyn RecordStore>,
        Some(capture.clone() as Arc<dyn CaptureProvider>),
        config,
    )
    .expect("valid test config");
    Harness {
        engine,
        tree,
        capture,
        store,
    }
}

/// A small pages-router app: three pages, a shared component and an api
/// helper module.
pub fn storefront() -> Vec<(&'static str, &'static str)> {
    vec![
        ("next.config.js", "module.exports = {};\n"),
        ("package.json", "{ \"name\": \"storefront\" }\n"),
        (
            "pages/index.tsx",
            r#"import Link from "next/link";
import { ProductList } from "../components/ProductList";

export default function Home() {
  return (
    <main>
      <ProductList />
      <Link href="/cart">Cart</Link>
    </main>
  );
}
"#,
        ),
        (
            "pages/cart.tsx",
            r#"import { loadCart, checkout } from "../lib/api";

export default function Cart() {
  const items = loadCart();
  function handleCheckout() {
    checkout(items);
  }
  return <button onClick={handleCheckout}>Checkout</button>;
}
"#,
        ),
        (
            "pages/products/[id].tsx",
            r#"import { useRouter } from "next/router";

export default function Product() {
  const router = useRouter();
  async function addToCart(id) {
    await fetch(`/api/cart/${id}`, { method: "POST" });
    router.push("/cart");
  }
  return <button onClick={() => addToCart(router.query.id)}>Add</button>;
}
"#,
        ),
        (
            "components/ProductList.tsx",
            r#"export function ProductList() {
  async function refresh() {
    const res = await fetch("/api/products");
    return res.json();
  }
  return <button onClick={refresh}>Refresh</button>;
}
"#,
        ),
        (
            "lib/api.ts",
            r#"export async function loadCart() {
  const res = await fetch("/api/cart");
  return res.json();
}

export async function checkout(items) {
  return fetch("/api/checkout", { method: "POST", body: JSON.stringify(items) });
}
"#,
        ),
    ]
}
