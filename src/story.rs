//! Snapshot version control over the VFS: `begin`, `save`, `log`, `rewind`.
//! Snapshot content lives under `.story/snapshots/<id>/` in the VFS itself;
//! `.`-prefixed directories are excluded from the tree that gets snapshotted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::vfs::{Actor, Vfs};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryEntry {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Story {
    log: Vec<StoryEntry>,
}

impl Story {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks that story tracking has begun; a no-op beyond bookkeeping since
    /// every save is already self-contained.
    pub fn begin(&mut self) {}

    /// Snapshots the current tree under a fresh id, keyed off a SHA1 digest
    /// of the current nanosecond timestamp (truncated to 10 hex chars).
    pub fn save(&mut self, vfs: &mut Vfs, message: &str, now_nanos: u128) -> String {
        let mut hasher = Sha1::new();
        hasher.update(now_nanos.to_string().as_bytes());
        let digest = hasher.finalize();
        let id: String = hex::encode(digest).chars().take(10).collect();

        let mut snapshot = vfs.save_state_to_json();
        // Dotted directories (story snapshots themselves included) are excluded
        // from what gets snapshotted, so rewinding never resurrects history.
        if let Some(children) = snapshot.get_mut("children").and_then(|c| c.as_object_mut()) {
            children.retain(|name, _| !name.starts_with('.'));
        }
        let actor = Actor { name: "root", effective_groups: &[] };
        let _ = vfs.create_directory(&format!("/.story/snapshots/{}", id), &actor, true);
        let _ = vfs.write_file(&format!("/.story/snapshots/{}/tree.json", id), &snapshot.to_string(), &actor);

        self.log.insert(0, StoryEntry { id: id.clone(), message: message.to_string(), timestamp: Utc::now() });
        id
    }

    /// Newest-first log of every snapshot taken so far.
    pub fn log(&self) -> &[StoryEntry] {
        &self.log
    }

    /// Restores `id`'s snapshot. Since a snapshot excludes `.story` itself,
    /// the live `.story` subtree is preserved across the rewind rather than
    /// being replaced by the (absent) one inside the snapshot.
    pub fn rewind(&self, vfs: &mut Vfs, id: &str) -> Result<(), RewindError> {
        let path = format!("/.story/snapshots/{}/tree.json", id);
        let node = vfs.get_node(&path, true).map_err(|_| RewindError::NoSuchSnapshot)?;
        let raw = node.content().ok_or(RewindError::NoSuchSnapshot)?;
        let mut value: serde_json::Value = serde_json::from_str(raw).map_err(|_| RewindError::CorruptSnapshot)?;

        let story_subtree = vfs.get_node("/.story", false).ok().map(|n| crate::vfs::serialize_node_pub(n));
        if let (Some(children), Some(story_subtree)) = (value.get_mut("children").and_then(|c| c.as_object_mut()), story_subtree) {
            children.insert(".story".to_string(), story_subtree);
        }
        vfs.load_state_from_json(&value).map_err(|_| RewindError::CorruptSnapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindError {
    NoSuchSnapshot,
    CorruptSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_rewind_restores_tree() {
        let mut vfs = Vfs::new();
        let mut story = Story::new();
        let actor = Actor { name: "root", effective_groups: &[] };
        vfs.write_file("/tmp/a", "before", &actor).unwrap();
        let id = story.save(&mut vfs, "checkpoint", 1);
        vfs.write_file("/tmp/a", "after", &actor).unwrap();
        story.rewind(&mut vfs, &id).unwrap();
        assert_eq!(vfs.get_node("/tmp/a", true).unwrap().content(), Some("before"));
    }

    #[test]
    fn log_is_newest_first() {
        let mut vfs = Vfs::new();
        let mut story = Story::new();
        story.save(&mut vfs, "one", 1);
        story.save(&mut vfs, "two", 2);
        assert_eq!(story.log()[0].message, "two");
        assert_eq!(story.log()[1].message, "one");
    }
}
