//! Defines the VFS node tree --- [`Node`], [`NodeKind`], and the shared [`Attrs`]
//! every node carries (RFC-1813-flavoured naming, but the fields here are
//! plain owner/group/mode/mtime, not NFS wire attrs).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Unix permission bits, low 9 of [`Attrs::mode`].
pub const PERM_MASK: u16 = 0o777;

/// Attributes common to every node kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Attrs {
    pub owner: String,
    pub group: String,
    /// Low 9 bits are the authoritative rwx bits; upper bits are unused.
    pub mode: u16,
    pub mtime: DateTime<Utc>,
}

impl Attrs {
    pub fn new(owner: impl Into<String>, group: impl Into<String>, mode: u16) -> Self {
        Self { owner: owner.into(), group: group.into(), mode: mode & PERM_MASK, mtime: Utc::now() }
    }

    pub fn touch(&mut self) {
        self.mtime = Utc::now();
    }
}

/// A node in the VFS tree.
///
/// A node's `type` is a tag of its own, never derived from `mode`.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    File { attrs: Attrs, content: String },
    Directory { attrs: Attrs, children: BTreeMap<String, Node> },
    Symlink { attrs: Attrs, target: String },
}

impl Node {
    pub fn new_file(owner: &str, group: &str, mode: u16, content: String) -> Self {
        Node::File { attrs: Attrs::new(owner, group, mode), content }
    }

    pub fn new_directory(owner: &str, group: &str, mode: u16) -> Self {
        Node::Directory { attrs: Attrs::new(owner, group, mode), children: BTreeMap::new() }
    }

    pub fn new_symlink(owner: &str, group: &str, target: String) -> Self {
        Node::Symlink { attrs: Attrs::new(owner, group, 0o777), target }
    }

    pub fn attrs(&self) -> &Attrs {
        match self {
            Node::File { attrs, .. } | Node::Directory { attrs, .. } | Node::Symlink { attrs, .. } => attrs,
        }
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        match self {
            Node::File { attrs, .. } | Node::Directory { attrs, .. } | Node::Symlink { attrs, .. } => attrs,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Node::Symlink { .. })
    }

    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Directory { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match self {
            Node::Directory { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Node::File { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Size in bytes: file content length, recursive sum for directories, 0 for symlinks.
    pub fn size(&self) -> u64 {
        match self {
            Node::File { content, .. } => content.len() as u64,
            Node::Symlink { .. } => 0,
            Node::Directory { children, .. } => children.values().map(Node::size).sum(),
        }
    }
}
