//! The logical file tree handed to the compiler: [`FileTree`] and [`Node`].
//!
//! Mirrors the donor project's read-side inode/directory model but in the
//! opposite direction — here the tree is the *input* to a filesystem
//! compiler rather than the *output* of a scan.

use std::io::Read;

/// Index into [`FileTree`]'s arena. Stable for the lifetime of the tree.
pub type NodeId = usize;

/// Two sequence numbers are reserved for XFS's synthetic realtime-device
/// inodes (bitmap and summary); no [`Node`] backs them, they never gain
/// extents, and every filesystem carries them regardless of tree content.
pub const RT_BITMAP_SEQ: u64 = 1;
pub const RT_SUMMARY_SEQ: u64 = 2;

/// First node-sequence number available to real tree nodes other than root.
pub const FIRST_REGULAR_SEQ: u64 = 3;

pub enum NodeKind {
    Directory,
    Regular,
    Symlink { target: Vec<u8> },
}

/// A lazily-opened, readable-once byte source for a regular file's content.
pub type OpenFn = Box<dyn FnMut() -> std::io::Result<Box<dyn Read>>>;

pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub size: u64,
    pub nlink: u32,
    pub parent: NodeId,
    pub children: Vec<NodeId>,
    source: Option<OpenFn>,
    seq: Option<u64>,
}

impl Node {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, NodeKind::Symlink { .. })
    }

    /// Node sequence number, assigned by [`FileTree::assign_sequences`].
    pub fn seq(&self) -> u64 {
        self.seq.expect("node sequence not assigned yet")
    }
}

/// A rooted tree of [`Node`]s, walked in a deterministic depth-first order.
///
/// Children are stored (and therefore enumerated) in insertion order, which
/// is what the directory-hashing code relies on for a stable on-disk layout.
pub struct FileTree {
    arena: Vec<Node>,
    root: NodeId,
    /// node sequence -> arena index, built by `assign_sequences`. Index 0 is
    /// the root; indices 1 and 2 (`RT_BITMAP_SEQ`/`RT_SUMMARY_SEQ`) have no
    /// arena backing.
    seq_order: Vec<Option<NodeId>>,
}

impl FileTree {
    /// Build an empty tree containing only a root directory.
    pub fn new() -> Self {
        let root = Node {
            name: String::new(),
            kind: NodeKind::Directory,
            size: 0,
            nlink: 2,
            parent: 0,
            children: Vec::new(),
            source: None,
            seq: None,
        };
        FileTree {
            arena: vec![root],
            root: 0,
            seq_order: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    /// Number of arena-backed nodes (root plus every real file/dir/symlink).
    /// Unlike [`FileTree::node_count`], this excludes the two synthetic
    /// realtime-device sequence slots.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the root always exists
    }

    /// Add a directory child under `parent`. Returns the new node's id.
    pub fn add_directory(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        self.push_child(parent, name, NodeKind::Directory, 0, 2, None)
    }

    /// Add a regular-file child with a lazily-opened byte source.
    pub fn add_regular(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        size: u64,
        nlink: u32,
        open: OpenFn,
    ) -> NodeId {
        self.push_child(parent, name, NodeKind::Regular, size, nlink, Some(open))
    }

    /// Add a symlink child. The target is always known up front (readlink()
    /// is not a streaming operation), unlike regular-file content.
    pub fn add_symlink(&mut self, parent: NodeId, name: impl Into<String>, target: Vec<u8>) -> NodeId {
        let size = target.len() as u64;
        self.push_child(parent, name, NodeKind::Symlink { target }, size, 1, None)
    }

    fn push_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        size: u64,
        nlink: u32,
        source: Option<OpenFn>,
    ) -> NodeId {
        let id = self.arena.len();
        self.arena.push(Node {
            name: name.into(),
            kind,
            size,
            nlink,
            parent,
            children: Vec::new(),
            source,
            seq: None,
        });
        self.arena[parent].children.push(id);
        id
    }

    /// Assign node-sequence numbers by a deterministic depth-first walk, if
    /// not already assigned. Idempotent and cheap to call repeatedly.
    pub fn assign_sequences(&mut self) {
        if !self.seq_order.is_empty() {
            return;
        }
        self.arena[self.root].seq = Some(0);
        let mut order = vec![Some(self.root), None, None];

        // Iterative pre-order DFS; children are pushed in reverse so popping
        // the stack yields them in original insertion order.
        let mut frontier: Vec<NodeId> = self.arena[self.root].children.clone();
        frontier.reverse();
        let mut seq = FIRST_REGULAR_SEQ;
        while let Some(id) = frontier.pop() {
            self.arena[id].seq = Some(seq);
            order.push(Some(id));
            seq += 1;

            let mut kids = self.arena[id].children.clone();
            kids.reverse();
            frontier.extend(kids);
        }
        self.seq_order = order;
    }

    /// Total number of node-sequence numbers assigned (root + synthetic + real).
    pub fn node_count(&self) -> u64 {
        self.seq_order.len() as u64
    }

    /// Walk the tree in node-sequence order, invoking `f(path, node)`.
    /// Requires `assign_sequences` to have been called.
    pub fn walk<F: FnMut(&str, &Node)>(&self, mut f: F) {
        for entry in self.seq_order.iter().skip(1).take(2) {
            debug_assert!(entry.is_none(), "synthetic realtime slots must stay empty");
        }
        let root = &self.arena[self.root];
        f("/", root);
        for entry in self.seq_order.iter().skip(3) {
            let Some(id) = entry else { continue };
            let path = self.path_of(*id);
            f(&path, &self.arena[*id]);
        }
    }

    fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = id;
        while cur != self.root {
            parts.push(self.arena[cur].name.clone());
            cur = self.arena[cur].parent;
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Open the byte source for a regular-file node, for the data-emission
    /// walk. Consumes the source: calling twice on the same node panics.
    pub fn open_source(&mut self, id: NodeId) -> std::io::Result<Box<dyn Read>> {
        let node = &mut self.arena[id];
        let open = node
            .source
            .as_mut()
            .expect("node has no byte source (not a regular file, or already consumed)");
        let reader = open()?;
        node.source = None;
        Ok(reader)
    }

    /// Release a node's byte source without reading it (used when closing
    /// the tree early, e.g. on cancellation).
    pub fn close(&mut self) {
        for node in &mut self.arena {
            node.source = None;
        }
    }
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}
