//! Hot reload of the config file.
//!
//! The parent directory is watched rather than the file itself: editors and
//! config-management tools replace files by rename, and a file-level watch
//! stops following the old inode. Events for sibling files are ignored.
//! Only the `kv` section is applied live, so a reload whose `kv` equals the
//! one in use is dropped.

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{AppConfig, KvConfig};

/// Watches one config file and emits validated configs with changed KV settings.
pub struct ConfigWatcher {
    reloader: Reloader,
}

impl ConfigWatcher {
    /// `current` is the configuration already in use; the first reload is
    /// compared against it.
    pub fn new(path: &Path, current: &AppConfig) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            path: path.to_path_buf(),
            last_kv: current.kv.clone(),
            updates,
        };
        (Self { reloader }, rx)
    }

    /// Start watching. Keep the returned handle alive for as long as
    /// updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let mut reloader = self.reloader;
        let dir = watch_dir(&reloader.path);
        let path = reloader.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &reloader.path) => {
                    reloader.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

struct Reloader {
    path: PathBuf,
    last_kv: KvConfig,
    updates: mpsc::UnboundedSender<AppConfig>,
}

impl Reloader {
    /// Re-read the file. Returns whether an update was emitted.
    fn reload(&mut self) -> bool {
        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Config reload rejected, keeping current settings"
                );
                return false;
            }
        };

        if config.kv == self.last_kv {
            tracing::debug!(path = %self.path.display(), "Config rewritten without KV changes");
            return false;
        }

        self.last_kv = config.kv.clone();
        self.updates.send(config).is_ok()
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` may have changed the file at `path`.
fn touches(event: &Event, path: &Path) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    let name = path.file_name();
    event.paths.iter().any(|p| p.file_name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use notify::EventKind;

    fn temp_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("confgate-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_only_events_for_the_file_count() {
        let path = Path::new("/etc/confgate/confgate.toml");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any));
        let create = Event::new(EventKind::Create(CreateKind::File));
        let remove = Event::new(EventKind::Remove(RemoveKind::File));

        assert!(touches(&modify.clone().add_path(path.into()), path));
        assert!(touches(&create.add_path("/etc/confgate/confgate.toml".into()), path));
        assert!(!touches(&modify.add_path("/etc/confgate/other.toml".into()), path));
        assert!(!touches(&remove.add_path(path.into()), path));
    }

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(watch_dir(Path::new("confgate.toml")), PathBuf::from("."));
        assert_eq!(watch_dir(Path::new("/etc/c.toml")), PathBuf::from("/etc"));
    }

    #[test]
    fn test_reload_emits_only_kv_changes() {
        let path = temp_config("[kv]\nkey_prefix = \"/a\"\n");
        let current = load_config(&path).unwrap();
        let (watcher, mut rx) = ConfigWatcher::new(&path, &current);
        let mut reloader = watcher.reloader;

        assert!(!reloader.reload());

        std::fs::write(&path, "[kv]\nkey_prefix = \"/a\"\n[listener]\nbind_address = \"0.0.0.0:9000\"\n").unwrap();
        assert!(!reloader.reload());

        std::fs::write(&path, "[kv]\nkey_prefix = \"/b\"\n").unwrap();
        assert!(reloader.reload());
        assert_eq!(rx.try_recv().unwrap().kv.key_prefix, "/b");

        std::fs::write(&path, "[kv\nbroken").unwrap();
        assert!(!reloader.reload());
        assert!(rx.try_recv().is_err());

        std::fs::remove_file(&path).ok();
    }
}
