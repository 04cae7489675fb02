//! Generate the JSON feeds

use anyhow::Result;
use notify_debouncer_mini::notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::new_debouncer;
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::generator::SiteData;
use crate::Site;

/// Run the pipeline, write every document and return what was written
pub fn run(site: &Site) -> Result<SiteData> {
    let start = Instant::now();

    let data = site.load()?;
    site.emit(&data)?;

    let summary = &data.summary;
    tracing::info!(
        "Processed {} files: {} posts emitted, {} drafts skipped, {} failed, {} duplicates",
        summary.processed,
        summary.emitted,
        summary.skipped_drafts,
        summary.failed,
        summary.duplicates
    );
    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());

    Ok(data)
}

/// Regenerate whenever content changes, until the watcher stops
pub async fn watch(site: &Site) -> Result<()> {
    let site = site.clone();
    tokio::task::spawn_blocking(move || {
        watch_content(&site, |site| {
            if let Err(e) = run(site) {
                tracing::error!("Generation failed: {:#}", e);
            }
        })
    })
    .await?
}

/// Block on debounced file events under the content directories, calling
/// `on_change` once per batch of relevant changes
pub fn watch_content<F>(site: &Site, mut on_change: F) -> Result<()>
where
    F: FnMut(&Site),
{
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for dir in [&site.content_dir, &site.posts_dir] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    tracing::info!("Watching for content changes. Press Ctrl+C to stop.");

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| is_relevant_change(site, &e.path))
                    .collect();
                if changed.is_empty() {
                    continue;
                }

                for event in &changed {
                    tracing::info!("File changed: {}", event.path.display());
                }
                on_change(site);
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Ignore editor droppings, VCS metadata and our own output
fn is_relevant_change(site: &Site, path: &Path) -> bool {
    if path.starts_with(&site.output_dir) {
        return false;
    }
    let in_vcs = path.components().any(|c| c.as_os_str() == ".git");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    !in_vcs && name != ".DS_Store" && !name.ends_with('~') && !name.ends_with(".swp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_writes_output() {
        let tmp = TempDir::new().unwrap();
        let site = Site::with_config(tmp.path(), SiteConfig::default());
        fs::create_dir_all(&site.posts_dir).unwrap();
        fs::write(site.posts_dir.join("one.md"), "---\ntitle: One\n---\nHello").unwrap();

        let data = run(&site).unwrap();
        assert_eq!(data.posts.len(), 1);
        assert!(site.output_dir.join("posts.json").exists());
        assert!(site.output_dir.join("page-1.json").exists());
    }

    #[test]
    fn test_relevant_changes() {
        let tmp = TempDir::new().unwrap();
        let site = Site::with_config(tmp.path(), SiteConfig::default());

        assert!(is_relevant_change(&site, &site.posts_dir.join("post.md")));
        assert!(!is_relevant_change(&site, &site.posts_dir.join("post.md~")));
        assert!(!is_relevant_change(&site, &site.posts_dir.join(".post.md.swp")));
        assert!(!is_relevant_change(&site, &site.output_dir.join("posts.json")));
        assert!(!is_relevant_change(&site, &tmp.path().join(".git/index")));
        assert!(!is_relevant_change(&site, &site.posts_dir.join(".DS_Store")));
        assert!(is_relevant_change(&site, &site.posts_dir.join("my.github-tips.md")));
        assert!(is_relevant_change(&site, &site.posts_dir.join(".gitignore-notes.md")));
    }
}
