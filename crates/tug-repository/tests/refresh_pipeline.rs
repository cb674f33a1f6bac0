//! Enable, refresh, list and delete a repository through the public API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tug_config::Config;
use tug_core::PackageName;
use tug_db::{MemoryDatabase, PackageRepository, RepositoryRepository};
use tug_queue::LocalMessageQueue;
use tug_repository::{PackageManager, RepositoryManager, receivers};
use tug_vcs::StaticRemoteFilesystem;

const URL: &str = "git@github.com:acme/widgets.git";
const API: &str = "https://api.github.com/repos/acme/widgets";

fn manifest(reference: &str) -> String {
    let body = STANDARD.encode(format!(
        r#"{{"name":"acme/widgets","type":"library","extra":{{"ref":"{reference}"}}}}"#
    ));
    format!(r#"{{"encoding":"base64","content":"{body}"}}"#)
}

fn remote() -> Arc<StaticRemoteFilesystem> {
    let rfs = Arc::new(StaticRemoteFilesystem::new());
    rfs.insert(
        API,
        r#"{"owner":{"login":"acme"},"name":"widgets","default_branch":"main"}"#,
    );
    rfs.insert(
        format!("{API}/git/refs/heads?per_page=100"),
        r#"[{"ref":"refs/heads/main","object":{"sha":"m1"}}]"#,
    );

    let page2 = format!("{API}/tags?per_page=100&page=2");
    rfs.insert_page(
        format!("{API}/tags?per_page=100"),
        r#"[{"name":"v1.0.0","commit":{"sha":"a1"}},{"name":"v1.1.0","commit":{"sha":"a2"}}]"#,
        &page2,
    );
    rfs.insert(&page2, r#"[{"name":"v2.0.0-RC1","commit":{"sha":"a3"}}]"#);

    for reference in ["main", "m1", "a1", "a2", "a3"] {
        rfs.insert(
            format!("{API}/contents/composer.json?ref={reference}"),
            manifest(reference),
        );
    }
    rfs
}

#[tokio::test]
async fn repository_lifecycle() {
    let rfs = remote();
    let db = Arc::new(MemoryDatabase::new());
    let queue = LocalMessageQueue::new();

    let repositories = Arc::new(RepositoryManager::new(
        Arc::new(Config::default()),
        rfs,
        RepositoryRepository::new(db.clone(), "repository"),
    ));
    let packages = Arc::new(PackageManager::new(
        repositories.clone(),
        PackageRepository::new(db, "package"),
        Arc::new(queue.clone()),
        None,
    ));
    receivers::subscribe(&queue, &packages);

    let record = repositories.enable(URL).await.unwrap();
    assert_eq!(record.url, "https://github.com/acme/widgets.git");

    let refreshed = packages.refresh_packages(URL, false).await.unwrap();
    let name = refreshed.package_name.clone().unwrap();
    assert_eq!(name, PackageName::new("acme", "widgets"));

    let totals = queue.idle().await;
    assert_eq!(totals.processed, 4);
    assert_eq!(totals.failed, 0);

    let page = packages.list_versions(&name, None, None, 0).await.unwrap();
    let versions: Vec<_> = page.items.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(versions, ["1.0.0.0", "1.1.0.0", "2.0.0.0-RC1", "dev-main"]);
    assert!(page.items.iter().all(|v| v.composer.contains("\"type\":\"library\"")));

    let stable = packages.list_versions(&name, Some("v1"), None, 0).await.unwrap();
    assert_eq!(stable.items.len(), 2);

    let deleted = packages.delete_package(URL, "v1.0.0").await.unwrap();
    assert_eq!(deleted.removed, 1);
    let deleted = packages.delete_packages(URL).await.unwrap();
    assert_eq!(deleted.package_name, Some(name.clone()));
    assert_eq!(deleted.removed, 3);
    assert!(packages.list_versions(&name, None, None, 0).await.unwrap().items.is_empty());

    assert!(repositories.disable(URL).await.unwrap().is_some());
    queue.shutdown();
}
