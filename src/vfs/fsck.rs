//! Consistency pass over the VFS tree: unknown owners/groups, dangling
//! symlinks, and missing home directories.
//!
//! Lives as a submodule of `vfs` so it can reach `Vfs`'s private tree-walking
//! helpers directly rather than duplicating them.

use super::{Actor, Vfs};

#[derive(Debug, Default, Clone)]
pub struct Report {
    pub issues: Vec<String>,
    pub changed: bool,
}

pub fn run(vfs: &mut Vfs, known_users: &[String], known_groups: &[String], repair: bool) -> Report {
    let mut report = Report::default();
    walk(vfs, "/", known_users, known_groups, repair, &mut report);
    for user in known_users {
        let home = format!("/home/{}", user);
        if vfs.get_node(&home, false).is_err() {
            report.issues.push(format!("missing home directory for user '{}'", user));
            if repair {
                let actor = Actor { name: "root", effective_groups: &[] };
                if vfs.create_directory(&home, &actor, true).is_ok() {
                    let _ = vfs.chown(&home, user, false, &actor);
                    report.changed = true;
                }
            }
        }
    }
    if report.changed {
        vfs.save();
    }
    report
}

fn walk(vfs: &mut Vfs, path: &str, known_users: &[String], known_groups: &[String], repair: bool, report: &mut Report) {
    let canonical = match vfs.resolve(path, false) {
        Ok(c) => c,
        Err(_) => return,
    };
    let (owner, group, is_symlink, dangling, child_names) = {
        let node = match vfs.node_ref(&canonical) {
            Ok(n) => n,
            Err(_) => return,
        };
        let owner = node.attrs().owner.clone();
        let group = node.attrs().group.clone();
        let is_symlink = node.is_symlink();
        let dangling = if is_symlink { vfs.get_node(path, true).is_err() } else { false };
        let children: Vec<String> = node.children().map(|c| c.keys().cloned().collect()).unwrap_or_default();
        (owner, group, is_symlink, dangling, children)
    };

    if !known_users.contains(&owner) && owner != "root" {
        report.issues.push(format!("{}: unknown owner '{}'", path, owner));
        if repair {
            if let Ok(node) = vfs.node_mut(&canonical) {
                node.attrs_mut().owner = "root".to_string();
            }
            report.changed = true;
        }
    }
    if !known_groups.contains(&group) && group != "root" {
        report.issues.push(format!("{}: unknown group '{}'", path, group));
        if repair {
            if let Ok(node) = vfs.node_mut(&canonical) {
                node.attrs_mut().group = "root".to_string();
            }
            report.changed = true;
        }
    }
    if is_symlink && dangling {
        report.issues.push(format!("{}: dangling symlink", path));
        if repair {
            let actor = Actor { name: "root", effective_groups: &[] };
            if vfs.remove(path, false, &actor).is_ok() {
                report.changed = true;
            }
        }
        return;
    }
    for name in child_names {
        let child_path = if path == "/" { format!("/{}", name) } else { format!("{}/{}", path, name) };
        walk(vfs, &child_path, known_users, known_groups, repair, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::Actor;

    fn root() -> Actor<'static> {
        Actor { name: "root", effective_groups: &[] }
    }

    #[test]
    fn reports_and_repairs_unknown_owner() {
        let mut vfs = Vfs::new();
        vfs.write_file("/tmp/f", "x", &root()).unwrap();
        vfs.chown("/tmp/f", "ghost", false, &root()).unwrap();
        let known_users = vec!["root".to_string()];
        let known_groups = vec!["root".to_string()];
        let report = vfs.fsck(&known_users, &known_groups, false);
        assert!(report.issues.iter().any(|m| m.contains("unknown owner")));
        assert!(!report.changed);
        let repaired = vfs.fsck(&known_users, &known_groups, true);
        assert!(repaired.changed);
        let clean = vfs.fsck(&known_users, &known_groups, true);
        assert!(!clean.changed);
        assert!(clean.issues.is_empty());
    }

    #[test]
    fn detects_dangling_symlink() {
        let mut vfs = Vfs::new();
        vfs.ln("/tmp/nope", "/tmp/link", &root()).unwrap();
        let known = vec!["root".to_string()];
        let report = vfs.fsck(&known, &known, false);
        assert!(report.issues.iter().any(|m| m.contains("dangling symlink")));
    }

    #[test]
    fn creates_missing_home_directory() {
        let mut vfs = Vfs::new();
        let known_users = vec!["root".to_string(), "alice".to_string()];
        let known_groups = vec!["root".to_string()];
        let report = vfs.fsck(&known_users, &known_groups, true);
        assert!(report.changed);
        assert!(vfs.get_node("/home/alice", false).is_ok());
    }
}
