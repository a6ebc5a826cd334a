//! Debounced hot reload of the on-disk skill tiers.
//!
//! The embedded tier never changes at runtime; only the disk-core override
//! and the community directory are observed. Watching is recursive, so
//! newly created pack subdirectories are covered without re-walking.

use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::RELOAD_DEBOUNCE_MS;
use crate::errors::SkillError;
use crate::loader::{Loader, is_watchable_json};

/// Start watching the loader's on-disk roots for the process lifetime.
///
/// Bursts of file-system events within the debounce window trigger exactly
/// one [`Loader::load_all`]. Watcher errors are logged and swallowed — they
/// surface as missing hot reload, never as a crash.
pub fn spawn_watcher(loader: Arc<Loader>) -> Result<JoinHandle<()>, SkillError> {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => warn!(error = %e, "Skill watcher error"),
    })?;

    let roots = loader.watch_roots();
    for root in &roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
        debug!(root = %root.display(), "Watching skill directory");
    }

    Ok(tokio::spawn(run(watcher, rx, loader)))
}

async fn run(
    watcher: RecommendedWatcher,
    mut rx: mpsc::UnboundedReceiver<Event>,
    loader: Arc<Loader>,
) {
    // The watcher stops when dropped; owning it here ties its lifetime to
    // the task's.
    let _watcher = watcher;
    let debounce = Duration::from_millis(RELOAD_DEBOUNCE_MS);

    while let Some(event) = rx.recv().await {
        if !event.paths.iter().any(|p| is_watchable_json(p)) {
            continue;
        }
        // Coalesce the burst: keep draining until the window stays quiet.
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(_)) => {}
                Ok(None) => return,
                Err(_) => break,
            }
        }
        debug!("Skill definitions changed on disk, reloading");
        let _ = loader.load_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadOptions;
    use std::fs;
    use tempfile::TempDir;

    async fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        for _ in 0..100 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_new_definition_triggers_reload() {
        let tmp = TempDir::new().unwrap();
        let loader = Arc::new(Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        }));
        let _ = loader.load_all();
        assert!(loader.get_by_id("fresh").is_none());

        let handle = spawn_watcher(Arc::clone(&loader)).unwrap();

        fs::write(
            tmp.path().join("fresh.json"),
            r#"{"id":"fresh","name":"Fresh","version":"1.0.0"}"#,
        )
        .unwrap();

        assert!(wait_for(|| loader.get_by_id("fresh").is_some()).await);
        handle.abort();
    }

    #[tokio::test]
    async fn test_definition_in_new_subdirectory_is_picked_up() {
        let tmp = TempDir::new().unwrap();
        let loader = Arc::new(Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        }));
        let _ = loader.load_all();

        let handle = spawn_watcher(Arc::clone(&loader)).unwrap();

        let pack = tmp.path().join("pack");
        fs::create_dir_all(&pack).unwrap();
        fs::write(
            pack.join("nested.json"),
            r#"{"id":"nested","name":"Nested","version":"1.0.0"}"#,
        )
        .unwrap();

        assert!(wait_for(|| loader.get_by_id("nested").is_some()).await);
        handle.abort();
    }
}
