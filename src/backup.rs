//! System state backup/restore: a CRC-32-checked JSON envelope around the
//! whole VFS tree.

use serde_json::json;

use crate::vfs::Vfs;

pub const BACKUP_FORMAT: &str = "SamwiseOS_System_State_Backup_v5.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreError {
    Malformed,
    ChecksumMismatch,
}

/// Serializes the tree with its keys already sorted (`serde_json::Value`
/// from a `BTreeMap`-backed tree is already canonical), computes a CRC-32
/// over that canonical text, and wraps both in an envelope.
pub fn create_backup(vfs: &Vfs) -> String {
    let tree = vfs.save_state_to_json();
    let canonical = tree.to_string();
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(canonical.as_bytes());
    let checksum = hasher.finalize();
    json!({
        "format": BACKUP_FORMAT,
        "checksum": checksum,
        "tree": tree,
    })
    .to_string()
}

pub fn restore_backup(vfs: &mut Vfs, payload: &str) -> Result<(), RestoreError> {
    let envelope: serde_json::Value = serde_json::from_str(payload).map_err(|_| RestoreError::Malformed)?;
    let tree = envelope.get("tree").ok_or(RestoreError::Malformed)?;
    let expected_checksum = envelope.get("checksum").and_then(|v| v.as_u64()).ok_or(RestoreError::Malformed)?;
    let canonical = tree.to_string();
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(canonical.as_bytes());
    if hasher.finalize() as u64 != expected_checksum {
        return Err(RestoreError::ChecksumMismatch);
    }
    vfs.load_state_from_json(tree).map_err(|_| RestoreError::Malformed)
}

impl From<RestoreError> for crate::error::CommandError {
    fn from(err: RestoreError) -> Self {
        use crate::error::{CommandError, ErrorKind};
        match err {
            RestoreError::Malformed => CommandError::new(ErrorKind::InvalidArgument, "restore: malformed backup"),
            RestoreError::ChecksumMismatch => CommandError::new(ErrorKind::InvalidArgument, "restore: checksum mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::Actor;

    #[test]
    fn backup_then_restore_round_trips() {
        let mut vfs = Vfs::new();
        let actor = Actor { name: "root", effective_groups: &[] };
        vfs.write_file("/tmp/a", "data", &actor).unwrap();
        let payload = create_backup(&vfs);
        let mut restored = Vfs::new();
        restore_backup(&mut restored, &payload).unwrap();
        assert_eq!(restored.get_node("/tmp/a", true).unwrap().content(), Some("data"));
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let vfs = Vfs::new();
        let payload = create_backup(&vfs);
        let tampered = payload.replace("\"checksum\":", "\"checksum\":0,\"old\":");
        let mut restored = Vfs::new();
        assert_eq!(restore_backup(&mut restored, &tampered), Err(RestoreError::ChecksumMismatch));
    }
}
