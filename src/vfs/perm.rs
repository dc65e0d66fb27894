//! Unix permission bit checks and the "ward" policy.

use super::node::Attrs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mask(u8);

impl Mask {
    pub const READ: Mask = Mask(0b100);
    pub const WRITE: Mask = Mask(0b010);
    pub const EXEC: Mask = Mask(0b001);

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for Mask {
    type Output = Mask;
    fn bitor(self, rhs: Mask) -> Mask {
        Mask(self.0 | rhs.0)
    }
}

/// An actor: the identity plus its effective group set, as described in the
/// glossary. Built once per command invocation by the identity layer.
pub struct Actor<'a> {
    pub name: &'a str,
    pub effective_groups: &'a [String],
}

impl<'a> Actor<'a> {
    pub fn is_root(&self) -> bool {
        self.name == "root"
    }
}

/// Checks `actor` against `attrs` for the bits in `mask`.
///
/// Order: root bypass -> owner bits -> any matching effective group -> other bits.
/// Monotone in `mask`: dropping a requested bit never turns a grant into a denial
/// for the remaining bits, since each bit is tested independently against the
/// same selected rwx triplet.
pub fn check(actor: &Actor, attrs: &Attrs, mask: Mask) -> bool {
    if actor.is_root() {
        return true;
    }
    let triplet = if actor.name == attrs.owner {
        (attrs.mode >> 6) & 0o7
    } else if actor.effective_groups.iter().any(|g| g == &attrs.group) {
        (attrs.mode >> 3) & 0o7
    } else {
        attrs.mode & 0o7
    };
    (triplet as u8) & mask.bits() == mask.bits()
}

/// Scans `/etc/agenda.json` jobs for a `chmod` command mentioning `path`; if
/// found, a plain permission denial should be reported as ward-protected
/// instead. Purely observational --- never grants or blocks access itself.
pub fn is_warded(agenda_json: Option<&str>, path: &str) -> bool {
    let Some(raw) = agenda_json else { return false };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else { return false };
    let Some(jobs) = value.as_array() else { return false };
    jobs.iter().any(|job| {
        job.get("command")
            .and_then(|c| c.as_str())
            .map(|cmd| cmd.trim_start().starts_with("chmod") && cmd.contains(path))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::node::Attrs;

    fn attrs(owner: &str, group: &str, mode: u16) -> Attrs {
        Attrs::new(owner, group, mode)
    }

    #[test]
    fn root_bypasses_everything() {
        let a = attrs("alice", "alice", 0o000);
        let root = Actor { name: "root", effective_groups: &[] };
        assert!(check(&root, &a, Mask::READ | Mask::WRITE | Mask::EXEC));
    }

    #[test]
    fn owner_bits_apply_to_owner_only() {
        let a = attrs("alice", "alice", 0o640);
        let alice = Actor { name: "alice", effective_groups: &["alice".into()] };
        let bob = Actor { name: "bob", effective_groups: &[] };
        assert!(check(&alice, &a, Mask::READ | Mask::WRITE));
        assert!(!check(&bob, &a, Mask::READ));
    }

    #[test]
    fn group_membership_grants_group_bits() {
        let a = attrs("alice", "devs", 0o640);
        let bob = Actor { name: "bob", effective_groups: &["devs".to_string()] };
        assert!(check(&bob, &a, Mask::READ));
        assert!(!check(&bob, &a, Mask::WRITE));
    }

    #[test]
    fn ward_detects_scheduled_chmod() {
        let agenda = r#"[{"id":"1","cronString":"* * * * *","command":"chmod 755 /a"}]"#;
        assert!(is_warded(Some(agenda), "/a"));
        assert!(!is_warded(Some(agenda), "/b"));
        assert!(!is_warded(None, "/a"));
    }
}
