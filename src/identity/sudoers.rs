//! `/etc/sudoers` authorization: parsed lazily, on every check, straight out
//! of the VFS, rather than cached --- so an edit takes effect on the very
//! next `sudo` invocation.

use crate::vfs::Vfs;

#[derive(Debug, Default)]
pub struct SudoManager;

impl SudoManager {
    pub fn new() -> Self {
        Self
    }

    /// `true` if `user` (a member of `user_groups`) is authorized by
    /// `/etc/sudoers` to run `command`.
    ///
    /// Lines are either `username ALL=(ALL) ALL` / `username ALL=(ALL) <cmd>`
    /// or `%groupname ALL=(ALL) ALL` for group rules. A bare `ALL` in the
    /// command position authorizes anything.
    pub fn can_user_run_command(&self, vfs: &Vfs, user: &str, user_groups: &[String], command: &str) -> bool {
        if user == "root" {
            return true;
        }
        let Ok(node) = vfs.get_node("/etc/sudoers", true) else { return false };
        let Some(contents) = node.content() else { return false };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((subject, rest)) = line.split_once(' ') else { continue };
            let applies = if let Some(group) = subject.strip_prefix('%') {
                user_groups.iter().any(|g| g == group)
            } else {
                subject == user
            };
            if !applies {
                continue;
            }
            let Some(allowed) = rest.rsplit(' ').next() else { continue };
            if allowed == "ALL" || allowed == command {
                return true;
            }
        }
        false
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
    fn group_rule_grants_access() {
        let mut vfs = Vfs::new();
        vfs.write_file("/etc/sudoers", "%wheel ALL=(ALL) ALL\n", &root()).unwrap();
        let sudo = SudoManager::new();
        assert!(sudo.can_user_run_command(&vfs, "alice", &["wheel".to_string()], "whoami"));
        assert!(!sudo.can_user_run_command(&vfs, "bob", &[], "whoami"));
    }

    #[test]
    fn user_rule_restricted_to_single_command() {
        let mut vfs = Vfs::new();
        vfs.write_file("/etc/sudoers", "alice ALL=(ALL) /bin/ls\n", &root()).unwrap();
        let sudo = SudoManager::new();
        assert!(sudo.can_user_run_command(&vfs, "alice", &[], "/bin/ls"));
        assert!(!sudo.can_user_run_command(&vfs, "alice", &[], "/bin/rm"));
    }
}
