//! Append-only audit trail at `/var/log/audit.log`, owned `root:root` at
//! mode `640`. Distinct from `tracing`'s operator-facing diagnostics: this
//! log is user-visible, persisted state.

use chrono::Utc;

use crate::vfs::{Actor, Vfs};

const AUDIT_PATH: &str = "/var/log/audit.log";

pub fn record(vfs: &mut Vfs, actor_name: &str, action: &str, details: &str) {
    let root = Actor { name: "root", effective_groups: &[] };
    let line = format!("{} | USER: {} | ACTION: {} | DETAILS: {}\n", Utc::now().to_rfc3339(), actor_name, action, details);
    let existing = vfs.get_node(AUDIT_PATH, true).ok().and_then(|n| n.content()).unwrap_or_default().to_string();
    let _ = vfs.write_file(AUDIT_PATH, &(existing + &line), &root);
    let _ = vfs.chmod(AUDIT_PATH, 0o640, &root);
    let _ = vfs.chown(AUDIT_PATH, "root", false, &root);
}

pub fn read_log(vfs: &Vfs) -> String {
    vfs.get_node(AUDIT_PATH, true).ok().and_then(|n| n.content()).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_append_only_lines() {
        let mut vfs = Vfs::new();
        record(&mut vfs, "alice", "sudo", "whoami");
        record(&mut vfs, "alice", "passwd", "password changed");
        let log = read_log(&vfs);
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("ACTION: sudo"));
        let node = vfs.get_node(AUDIT_PATH, true).unwrap();
        assert_eq!(node.attrs().mode, 0o640);
    }
}
