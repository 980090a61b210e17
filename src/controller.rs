//! The controller: write/read/stream files, build directories, traverse
//! trees, over an injected `Storage` and `Hash` backend. Only compiled
//! under the `std` feature (it needs the async backend traits from
//! `backend.rs`).
//!
//! Holds no shared mutable state of its own; the only mutable state in the
//! whole path is inside the injected `Storage`. Every I/O-adjacent call
//! (hash, put, get, has) suspends at an `.await` point, per the
//! concurrency model.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use core::future::Future;
use core::pin::Pin;

use tracing::debug;

use crate::backend::{Hash, Storage};
use crate::config::Config;
use crate::error::CasError;
use crate::header::NodeType;
use crate::key::{Digest, Key};
use crate::node::{self, DecodedNode, DictEntry};
use crate::topology::{self, LayoutNode};

/// Outcome of `write_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub key: Key,
    pub size: u64,
    pub node_count: usize,
}

/// A node's kind, size, and (for non-leaf kinds) children, as returned by
/// `get_tree` and `get_node` — a thin, storage-agnostic view over a decoded node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeType,
    pub size: u64,
    pub children: Vec<Key>,
}

pub struct Controller<S: Storage, H: Hash> {
    storage: S,
    hash: H,
    config: Config,
}

impl<S: Storage, H: Hash> Controller<S, H> {
    pub fn new(storage: S, hash: H, config: Config) -> Self {
        Self { storage, hash, config }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    async fn persist(&self, bytes: Vec<u8>) -> Result<Key, CasError> {
        let digest = self.hash.sha256(&bytes).await;
        let key = Key::from_digest(digest);
        self.storage.put(key, bytes).await?;
        debug!(key = %key, "persisted node");
        Ok(key)
    }

    /// Encodes a non-root subtree of a file as an s-node, recursing
    /// children-first (their keys must exist before this node can be
    /// hashed). Returns the node's key, its subtree size, and the number
    /// of nodes it and its descendants contributed.
    async fn encode_successor_subtree(
        &self,
        layout: &LayoutNode,
        data: &[u8],
        cursor: &mut usize,
    ) -> Result<(Key, u64, usize), CasError> {
        if layout.is_leaf() {
            let start = *cursor;
            let end = start + layout.data_size as usize;
            let slice = &data[start..end];
            *cursor = end;
            let bytes = node::encode_successor(slice, &[], layout.data_size)?;
            let key = self.persist(bytes).await?;
            Ok((key, layout.data_size, 1))
        } else {
            let mut child_digests = Vec::with_capacity(layout.children.len());
            let mut total_size = 0u64;
            let mut total_nodes = 0usize;
            for child in &layout.children {
                let (key, size, count) =
                    Box::pin(self.encode_successor_subtree(child, data, cursor)).await?;
                child_digests.push(key.digest());
                total_size += size;
                total_nodes += count;
            }
            let bytes = node::encode_successor(&[], &child_digests, total_size)?;
            let key = self.persist(bytes).await?;
            Ok((key, total_size, total_nodes + 1))
        }
    }

    /// Plans a layout for `data`, walks it bottom-up (s-nodes before the
    /// f-node root that references them), and persists every node. Same
    /// `(data, content_type, node_limit)` always yields the same root key.
    pub async fn write_file(
        &self,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<WriteResult, CasError> {
        let layout = topology::compute_layout(data.len() as u64, self.config.node_limit)?;
        let mut cursor = 0usize;

        let (bytes, size, node_count) = if layout.is_leaf() {
            let bytes = node::encode_file(data, content_type, &[], layout.data_size)?;
            (bytes, layout.data_size, 1usize)
        } else {
            let mut child_digests = Vec::with_capacity(layout.children.len());
            let mut total_size = 0u64;
            let mut total_nodes = 0usize;
            for child in &layout.children {
                let (key, size, count) = self.encode_successor_subtree(child, data, &mut cursor).await?;
                child_digests.push(key.digest());
                total_size += size;
                total_nodes += count;
            }
            let bytes = node::encode_file(&[], content_type, &child_digests, total_size)?;
            (bytes, total_size, total_nodes + 1)
        };

        let key = self.persist(bytes).await?;
        Ok(WriteResult { key, size, node_count })
    }

    /// Writes a single f-node directly, with no chunking. The caller is
    /// responsible for `data` fitting within `node_limit`.
    pub async fn put_file_node(&self, data: &[u8], content_type: Option<&str>) -> Result<Key, CasError> {
        let bytes = node::encode_file(data, content_type, &[], data.len() as u64)?;
        self.persist(bytes).await
    }

    /// Builds a d-node from `(name, child key)` pairs, looking up each
    /// child's `size` from storage, sorting by name, and persisting the
    /// result.
    pub async fn make_dict(&self, entries: &[(String, Key)]) -> Result<Key, CasError> {
        let mut dict_entries = Vec::with_capacity(entries.len());
        for (name, key) in entries {
            let bytes = self
                .storage
                .get(key)
                .await?
                .ok_or_else(|| CasError::MissingChildren(alloc::vec![*key]))?;
            let decoded = node::decode_node(&bytes)?;
            dict_entries.push(DictEntry { name: name.clone(), key: key.digest(), size: decoded.size });
        }
        let bytes = node::encode_dict(&dict_entries)?;
        self.persist(bytes).await
    }

    /// Recursively reads a (possibly missing) subtree, concatenating its
    /// own inline data with its children's in order. A missing key
    /// contributes nothing rather than failing the whole read.
    fn read_subtree<'a>(&'a self, key: Key) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, CasError>> + Send + 'a>>
    where
        S: 'a,
        H: 'a,
    {
        Box::pin(async move {
            let bytes = match self.storage.get(&key).await? {
                Some(b) => b,
                None => {
                    debug!(key = %key, "missing child during read, contributing nothing");
                    return Ok(Vec::new());
                }
            };
            let decoded = node::decode_node(&bytes)?;
            let mut out = decoded.data.unwrap_or_default();
            if let Some(children) = decoded.children {
                for child in children {
                    let part = self.read_subtree(Key::from_digest(child)).await?;
                    out.extend(part);
                }
            }
            Ok(out)
        })
    }

    /// Fetches `key`, and if it is an f/s-node, returns its full byte
    /// sequence (own data followed by children's, left to right). Returns
    /// `None` if the key is absent or resolves to a d-node.
    pub async fn read_file(&self, key: &Key) -> Result<Option<Vec<u8>>, CasError> {
        let bytes = match self.storage.get(key).await? {
            Some(b) => b,
            None => return Ok(None),
        };
        let decoded = node::decode_node(&bytes)?;
        if decoded.kind == NodeType::Dict {
            return Ok(None);
        }
        let mut out = decoded.data.unwrap_or_default();
        if let Some(children) = decoded.children {
            for child in children {
                let part = self.read_subtree(Key::from_digest(child)).await?;
                out.extend(part);
            }
        }
        Ok(Some(out))
    }

    /// Opens a lazy, depth-first byte stream over the file rooted at
    /// `key`. Produces the same bytes as `read_file`, incrementally.
    /// Returns `None` under the same conditions as `read_file`.
    pub async fn open_file_stream<'c>(&'c self, key: &Key) -> Result<Option<FileStream<'c, S, H>>, CasError> {
        let bytes = match self.storage.get(key).await? {
            Some(b) => b,
            None => return Ok(None),
        };
        let decoded = node::decode_node(&bytes)?;
        if decoded.kind == NodeType::Dict {
            return Ok(None);
        }
        let frame = Frame {
            children: decoded.children.unwrap_or_default(),
            next_child: 0,
            data_emitted: false,
            data: decoded.data.unwrap_or_default(),
        };
        Ok(Some(FileStream { controller: self, stack: alloc::vec![frame] }))
    }

    /// Breadth-first traversal from `root_key`, visiting each key at most
    /// once, stopping once `limit` nodes have been recorded.
    pub async fn get_tree(&self, root_key: &Key, limit: usize) -> Result<BTreeMap<Key, NodeInfo>, CasError> {
        let mut visited = BTreeMap::new();
        let mut queue = VecDeque::new();
        let mut seen = BTreeSet::new();
        queue.push_back(*root_key);
        seen.insert(*root_key);

        while let Some(key) = queue.pop_front() {
            if visited.len() >= limit {
                break;
            }
            let bytes = match self.storage.get(&key).await? {
                Some(b) => b,
                None => continue,
            };
            let decoded = node::decode_node(&bytes)?;
            let children: Vec<Key> = decoded
                .children
                .clone()
                .unwrap_or_default()
                .into_iter()
                .map(Key::from_digest)
                .collect();
            visited.insert(key, NodeInfo { kind: decoded.kind, size: decoded.size, children: children.clone() });
            for child in children {
                if seen.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        Ok(visited)
    }

    /// Fetches and decodes a single node.
    pub async fn get_node(&self, key: &Key) -> Result<Option<DecodedNode>, CasError> {
        match self.storage.get(key).await? {
            Some(bytes) => Ok(Some(node::decode_node(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetches a node's raw bytes without decoding.
    pub async fn get_chunk(&self, key: &Key) -> Result<Option<Vec<u8>>, CasError> {
        self.storage.get(key).await
    }

    /// Probes whether `key` is present, without fetching its bytes.
    pub async fn has(&self, key: &Key) -> Result<bool, CasError> {
        self.storage.has(key).await
    }
}

struct Frame {
    children: Vec<Digest>,
    next_child: usize,
    data_emitted: bool,
    data: Vec<u8>,
}

/// A lazy, finite, depth-first byte stream over a file's nodes. Hand-rolled
/// rather than built on a generator: each `Frame` records a node's
/// not-yet-emitted data and its next unvisited child index, so the walk
/// can suspend at every storage fetch without an async generator.
pub struct FileStream<'c, S: Storage, H: Hash> {
    controller: &'c Controller<S, H>,
    stack: Vec<Frame>,
}

impl<'c, S: Storage, H: Hash> FileStream<'c, S, H> {
    /// Returns the next chunk of data, or `None` once the stream is
    /// exhausted. Not restartable; reopen with `open_file_stream` to
    /// re-read from the start.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, CasError> {
        loop {
            let frame = match self.stack.last_mut() {
                Some(f) => f,
                None => return Ok(None),
            };

            if !frame.data_emitted {
                frame.data_emitted = true;
                if !frame.data.is_empty() {
                    let data = core::mem::take(&mut frame.data);
                    return Ok(Some(data));
                }
                continue;
            }

            if frame.next_child >= frame.children.len() {
                self.stack.pop();
                continue;
            }

            let child_digest = frame.children[frame.next_child];
            frame.next_child += 1;
            let child_key = Key::from_digest(child_digest);

            match self.controller.storage.get(&child_key).await? {
                None => continue,
                Some(bytes) => {
                    let decoded = node::decode_node(&bytes)?;
                    self.stack.push(Frame {
                        children: decoded.children.unwrap_or_default(),
                        next_child: 0,
                        data_emitted: false,
                        data: decoded.data.unwrap_or_default(),
                    });
                }
            }
        }
    }
}
