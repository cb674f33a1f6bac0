//! Offline GitHub repository shared by the unit tests.

use crate::manager::RepositoryManager;
use crate::packages::PackageManager;
use crate::receivers;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tug_config::Config;
use tug_core::{BoxFuture, Result};
use tug_db::{MemoryDatabase, PackageRepository, RepositoryRepository};
use tug_queue::{LocalMessageQueue, Message, MessageQueue, QueueReceiver, ReceiveReport};
use tokio::sync::{Notify, Semaphore};
use tug_vcs::{RemoteFilesystem, RemoteResponse, StaticRemoteFilesystem};

pub const URL: &str = "https://github.com/acme/foo";
pub const CANONICAL: &str = "https://github.com/acme/foo.git";
pub const API: &str = "https://api.github.com/repos/acme/foo";

pub const MANIFEST: &str = r#"{"name":"acme/foo","type":"library","time":"2024-01-01T00:00:00Z"}"#;

/// Branch and tag names with their commits.
pub const BRANCHES: [(&str, &str); 2] = [("main", "b1"), ("develop", "b2")];
pub const TAGS: [(&str, &str); 3] = [("v1.0.0", "t1"), ("v1.1.0", "t2"), ("v2.0.0-beta", "t3")];

pub fn contents(content: &str) -> String {
    format!(
        r#"{{"encoding":"base64","content":"{}"}}"#,
        STANDARD.encode(content)
    )
}

pub fn manifest_url(api: &str, reference: &str) -> String {
    format!("{api}/contents/composer.json?ref={reference}")
}

/// Install repository data, refs and a manifest at every ref of `acme/foo`.
pub fn seed(rfs: &StaticRemoteFilesystem) {
    rfs.insert(
        API,
        r#"{"owner":{"login":"acme"},"name":"foo","default_branch":"main","has_issues":false}"#,
    );
    rfs.insert(manifest_url(API, "main"), contents(MANIFEST));

    let heads: Vec<String> = BRANCHES
        .iter()
        .map(|(name, sha)| format!(r#"{{"ref":"refs/heads/{name}","object":{{"sha":"{sha}"}}}}"#))
        .collect();
    rfs.insert(
        format!("{API}/git/refs/heads?per_page=100"),
        format!("[{}]", heads.join(",")),
    );
    set_tags(rfs, &TAGS);

    for (_, sha) in BRANCHES.iter().chain(TAGS.iter()) {
        rfs.insert(manifest_url(API, sha), contents(MANIFEST));
    }
}

pub fn set_tags(rfs: &StaticRemoteFilesystem, tags: &[(&str, &str)]) {
    let tags: Vec<String> = tags
        .iter()
        .map(|(name, sha)| format!(r#"{{"name":"{name}","commit":{{"sha":"{sha}"}}}}"#))
        .collect();
    rfs.insert(
        format!("{API}/tags?per_page=100"),
        format!("[{}]", tags.join(",")),
    );
}

/// Fixture filesystem whose requests wait for permits on `gate`.
///
/// `entered` is notified as each request starts.
#[derive(Debug)]
pub struct GatedRemoteFilesystem {
    pub inner: StaticRemoteFilesystem,
    pub entered: Notify,
    pub gate: Semaphore,
}

impl GatedRemoteFilesystem {
    pub fn new() -> Self {
        Self {
            inner: StaticRemoteFilesystem::new(),
            entered: Notify::new(),
            gate: Semaphore::new(0),
        }
    }
}

impl RemoteFilesystem for GatedRemoteFilesystem {
    fn get<'a>(&'a self, origin: &'a str, url: &'a str) -> BoxFuture<'a, Result<RemoteResponse>> {
        Box::pin(async move {
            self.entered.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            self.inner.get(origin, url).await
        })
    }
}

/// Queue that only records what it is given.
#[derive(Debug, Default)]
pub struct RecordingQueue {
    pub batches: Mutex<Vec<(Vec<Message>, Option<Duration>)>>,
}

impl RecordingQueue {
    pub fn messages(&self) -> Vec<Message> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(messages, _)| messages.clone())
            .collect()
    }
}

impl MessageQueue for RecordingQueue {
    fn subscribe(&self, _receiver: Arc<dyn QueueReceiver>) {}

    fn send_batch(
        &self,
        messages: Vec<Message>,
        delay: Option<Duration>,
    ) -> BoxFuture<'_, Result<()>> {
        self.batches.lock().unwrap().push((messages, delay));
        Box::pin(async { Ok(()) })
    }

    fn receive(&self, _messages: Vec<Message>) -> BoxFuture<'_, ReceiveReport> {
        Box::pin(async { ReceiveReport::default() })
    }
}

pub struct Harness<Q> {
    pub rfs: Arc<StaticRemoteFilesystem>,
    pub queue: Arc<Q>,
    pub repositories: Arc<RepositoryManager>,
    pub packages: Arc<PackageManager>,
}

impl<Q: MessageQueue + 'static> Harness<Q> {
    pub fn with_queue(queue: Q, delay: Option<Duration>) -> Self {
        let rfs = Arc::new(StaticRemoteFilesystem::new());
        seed(&rfs);

        let db = Arc::new(MemoryDatabase::new());
        let queue = Arc::new(queue);
        let repositories = Arc::new(RepositoryManager::new(
            Arc::new(Config::default()),
            rfs.clone(),
            RepositoryRepository::new(db.clone(), "repository"),
        ));
        let packages = Arc::new(PackageManager::new(
            repositories.clone(),
            PackageRepository::new(db, "package"),
            queue.clone(),
            delay,
        ));

        Self {
            rfs,
            queue,
            repositories,
            packages,
        }
    }
}

impl Harness<LocalMessageQueue> {
    /// Harness whose queue runs the refresh receivers.
    pub fn local() -> Self {
        let harness = Self::with_queue(LocalMessageQueue::new(), None);
        receivers::subscribe(harness.queue.as_ref(), &harness.packages);
        harness
    }
}

impl Harness<RecordingQueue> {
    pub fn recording() -> Self {
        Self::with_queue(RecordingQueue::default(), Some(Duration::from_secs(2)))
    }
}
