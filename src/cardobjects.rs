//! Hierarchical store of the card's persistent objects.
//!
//! The tree holds directories, elementary files, passwords, keys, trust
//! points and auxiliary data. Nodes live in an arena indexed by [ObjectId];
//! parent links are plain indices, so the structure is acyclic and
//! single-owner by construction. Protection policies are attached per
//! operation; a missing policy denies.
//!
//! The session's [SecurityStatus] is not stored in the nodes. It is owned by
//! the session and passed by reference into every access decision, so
//! re-parenting never leaves stale references behind.

use num_bigint_dig::BigUint;
use time::Date;
use zeroize::Zeroizing;

use crate::domain_params::DomainParameterSet;
use crate::ec::{EcGroup, EcPoint};
use crate::secstatus::{SecCondition, SecurityStatus};
use crate::{Error, ErrorKind, Result};

/// Handle to a node in an [ObjectTree]. Only valid for the tree that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// Life cycle of a card object per ISO 7816-4/-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycle {
    Created,
    Initialized,
    OperationalActivated,
    OperationalDeactivated,
    Terminated,
}

impl LifeCycle {
    /// Only activated objects participate in authentication.
    pub fn usable_for_authentication(self) -> bool {
        self == LifeCycle::OperationalActivated
    }
}

/// A typed lookup identifier. Uniqueness is enforced per namespace only: an
/// object may carry a file id and an OID, and two siblings may share a file
/// id with different short file ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    FileId(u16),
    ShortFileId(u8),
    Aid(Vec<u8>),
    AuthId(u8),
    KeyId(u8),
    Oid(Vec<u8>),
}

/// One lookup predicate: an object matches if it carries any of the
/// accepted identifiers.
#[derive(Debug, Clone)]
pub struct IdMatcher {
    accepted: Vec<Identifier>,
}

impl IdMatcher {
    pub fn new(accepted: Vec<Identifier>) -> Self {
        IdMatcher { accepted }
    }

    pub fn exactly(identifier: Identifier) -> Self {
        IdMatcher {
            accepted: vec![identifier],
        }
    }

    pub fn matches(&self, object: &CardObject) -> bool {
        self.accepted
            .iter()
            .any(|wanted| object.identifiers.contains(wanted))
    }
}

/// Operations an object's protection policy may gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Update,
    Delete,
    Use,
    Change,
    Unblock,
}

/// Retry bookkeeping of a retry-limited secret.
#[derive(Debug, Clone)]
pub struct RetryCounter {
    pub limit: u8,
    pub remaining: u8,
}

impl RetryCounter {
    pub fn new(limit: u8) -> Self {
        RetryCounter {
            limit,
            remaining: limit,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn decrement(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        self.remaining = self.limit;
    }
}

/// A password or other shared secret used by PACE and the PIN commands.
#[derive(Debug)]
pub struct PasswordObject {
    pub value: Zeroizing<Vec<u8>>,
    /// `None` for passwords that never block (CAN, MRZ).
    pub retry: Option<RetryCounter>,
    pub change_cond: Option<SecCondition>,
    pub unblock_cond: Option<SecCondition>,
}

impl PasswordObject {
    /// A password with no protection policies yet; `retry_limit` is `None`
    /// for passwords that never block.
    pub fn new(value: &[u8], retry_limit: Option<u8>) -> Self {
        PasswordObject {
            value: Zeroizing::new(value.to_vec()),
            retry: retry_limit.map(RetryCounter::new),
            change_cond: None,
            unblock_cond: None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.retry.as_ref().map_or(false, RetryCounter::is_exhausted)
    }
}

/// A static asymmetric key of the card (chip authentication, restricted
/// identification).
#[derive(Debug)]
pub struct KeyObject {
    pub params: DomainParameterSet,
    pub private: BigUint,
    pub use_cond: Option<SecCondition>,
}

/// Anchor for verifying card-verifiable certificate chains.
#[derive(Debug, Clone)]
pub struct TrustPoint {
    /// Certification authority reference the root certificate must name.
    pub car: Vec<u8>,
    /// Signature suite of the anchor key.
    pub oid: Vec<u8>,
    pub group: EcGroup,
    pub public: EcPoint,
}

/// Payload variants of a tree node.
#[derive(Debug)]
pub enum ObjectKind {
    /// Master or dedicated file.
    Container,
    ElementaryFile {
        content: Vec<u8>,
        read_cond: Option<SecCondition>,
        update_cond: Option<SecCondition>,
        delete_cond: Option<SecCondition>,
    },
    Password(PasswordObject),
    Key(KeyObject),
    DomainParams(DomainParameterSet),
    TrustPoint(TrustPoint),
    /// The card's notion of the current date, advanced by verified
    /// certificate effective dates.
    CurrentDate(Date),
    /// Generic auxiliary data referenced by OID (date of birth, community
    /// id) for terminal-side verification.
    AuxData { value: Vec<u8> },
}

/// A tree node payload: life cycle, identifiers and the typed variant.
#[derive(Debug)]
pub struct CardObject {
    pub life_cycle: LifeCycle,
    pub identifiers: Vec<Identifier>,
    pub kind: ObjectKind,
}

impl CardObject {
    pub fn new(kind: ObjectKind, identifiers: Vec<Identifier>) -> Self {
        CardObject {
            life_cycle: LifeCycle::OperationalActivated,
            identifiers,
            kind,
        }
    }

    /// The policy configured for an operation, if any.
    pub fn condition_for(&self, operation: Operation) -> Option<&SecCondition> {
        match (&self.kind, operation) {
            (ObjectKind::ElementaryFile { read_cond, .. }, Operation::Read) => read_cond.as_ref(),
            (ObjectKind::ElementaryFile { update_cond, .. }, Operation::Update) => update_cond.as_ref(),
            (ObjectKind::ElementaryFile { delete_cond, .. }, Operation::Delete) => delete_cond.as_ref(),
            (ObjectKind::Password(password), Operation::Change) => password.change_cond.as_ref(),
            (ObjectKind::Password(password), Operation::Unblock) => password.unblock_cond.as_ref(),
            (ObjectKind::Key(key), Operation::Use) => key.use_cond.as_ref(),
            _ => None,
        }
    }

    /// Evaluates the operation's policy against the session status. An
    /// object without a policy for the operation denies.
    pub fn allows(&self, operation: Operation, status: &SecurityStatus) -> bool {
        self.condition_for(operation)
            .map_or(false, |condition| condition.evaluate(status))
    }
}

struct Node {
    object: CardObject,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

/// Arena-backed object tree rooted at the master file.
pub struct ObjectTree {
    nodes: Vec<Option<Node>>,
    root: ObjectId,
}

impl ObjectTree {
    /// Creates a tree holding only the given root (the master file).
    pub fn new(root: CardObject) -> Self {
        ObjectTree {
            nodes: vec![Some(Node {
                object: root,
                parent: None,
                children: Vec::new(),
            })],
            root: ObjectId(0),
        }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    fn node(&self, id: ObjectId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::new(ErrorKind::UnknownReference, "object id not present in this tree"))
    }

    fn node_mut(&mut self, id: ObjectId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::new(ErrorKind::UnknownReference, "object id not present in this tree"))
    }

    pub fn get(&self, id: ObjectId) -> Result<&CardObject> {
        Ok(&self.node(id)?.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut CardObject> {
        Ok(&mut self.node_mut(id)?.object)
    }

    pub fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>> {
        Ok(self.node(id)?.parent)
    }

    pub fn children(&self, id: ObjectId) -> Result<&[ObjectId]> {
        Ok(&self.node(id)?.children)
    }

    /// Attaches a new child under `parent` and returns its id. Children
    /// keep their attach order, which makes identifier lookup
    /// deterministic.
    pub fn attach(&mut self, parent: ObjectId, object: CardObject) -> Result<ObjectId> {
        self.node(parent)?;
        let id = ObjectId(self.nodes.len());
        self.nodes.push(Some(Node {
            object,
            parent: Some(parent),
            children: Vec::new(),
        }));
        // Parent existence was checked above.
        if let Ok(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        Ok(id)
    }

    /// Removes an object and its whole subtree. The root cannot be removed.
    pub fn remove(&mut self, id: ObjectId) -> Result<()> {
        if id == self.root {
            return Err(Error::new(ErrorKind::InvalidParameter, "the root object cannot be removed"));
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            let node = self.node_mut(parent)?;
            node.children.retain(|child| *child != id);
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                pending.extend(node.children);
            }
        }
        Ok(())
    }

    /// Children of `parent` matching every predicate, in child order.
    /// Returns an empty set rather than failing when nothing matches.
    pub fn find_children(&self, parent: ObjectId, matchers: &[IdMatcher]) -> Vec<ObjectId> {
        let children = match self.node(parent) {
            Ok(node) => &node.children,
            Err(_) => return Vec::new(),
        };
        children
            .iter()
            .copied()
            .filter(|child| match self.get(*child) {
                Ok(object) => matchers.iter().all(|matcher| matcher.matches(object)),
                Err(_) => false,
            })
            .collect()
    }

    /// First matching child in child order, if any.
    pub fn find_child(&self, parent: ObjectId, matchers: &[IdMatcher]) -> Option<ObjectId> {
        self.find_children(parent, matchers).into_iter().next()
    }

    /// Depth-first search of the whole subtree under `parent` (the parent
    /// itself is not considered).
    pub fn find_descendant(&self, parent: ObjectId, matchers: &[IdMatcher]) -> Option<ObjectId> {
        let children = self.node(parent).ok()?.children.clone();
        for child in children {
            if let Ok(object) = self.get(child) {
                if matchers.iter().all(|matcher| matcher.matches(object)) {
                    return Some(child);
                }
            }
            if let Some(found) = self.find_descendant(child, matchers) {
                return Some(found);
            }
        }
        None
    }

    /// Evaluates an object's protection policy for the operation.
    pub fn check_access(&self, id: ObjectId, operation: Operation, status: &SecurityStatus) -> Result<bool> {
        Ok(self.get(id)?.allows(operation, status))
    }
}
