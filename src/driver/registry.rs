use std::collections::HashMap;

use super::node::NodeKey;
use super::protocol::{NodeToken, RemoteNodeDescriptor};

/// Maps identity tokens to the live foreground node they denote.
///
/// Lookups of unknown tokens return `None`: a node may have been removed by
/// an earlier record while a stale mutation for it was already in flight.
#[derive(Debug)]
pub struct IdentityRegistry {
    nodes: HashMap<NodeToken, NodeKey>,
    root: NodeKey,
}

impl IdentityRegistry {
    pub fn new(root: NodeKey) -> Self {
        Self {
            nodes: HashMap::new(),
            root,
        }
    }

    /// Registers `key` under `token`, returning the node it displaced.
    pub fn register(&mut self, token: NodeToken, key: NodeKey) -> Option<NodeKey> {
        self.nodes.insert(token, key)
    }

    /// Resolves a node reference. Body-role references always resolve to
    /// the root singleton.
    pub fn lookup(&self, descriptor: &RemoteNodeDescriptor) -> Option<NodeKey> {
        if descriptor.is_body() {
            return Some(self.root);
        }
        descriptor
            .id
            .as_ref()
            .and_then(|token| self.lookup_token(token))
    }

    pub fn lookup_token(&self, token: &NodeToken) -> Option<NodeKey> {
        self.nodes.get(token).copied()
    }

    pub fn unregister(&mut self, token: &NodeToken) -> Option<NodeKey> {
        self.nodes.remove(token)
    }

    pub fn contains(&self, token: &NodeToken) -> bool {
        self.nodes.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::node::ForegroundTree;

    #[test]
    fn body_references_resolve_to_root() {
        let tree = ForegroundTree::new("div");
        let registry = IdentityRegistry::new(tree.root());
        let body = RemoteNodeDescriptor {
            node_name: Some("BODY".into()),
            ..Default::default()
        };
        assert_eq!(registry.lookup(&body), Some(tree.root()));
    }

    #[test]
    fn unknown_tokens_resolve_to_none() {
        let tree = ForegroundTree::new("div");
        let registry = IdentityRegistry::new(tree.root());
        assert_eq!(registry.lookup(&RemoteNodeDescriptor::reference("gone")), None);
        assert_eq!(registry.lookup(&RemoteNodeDescriptor::default()), None);
    }

    #[test]
    fn register_replaces_previous_entry() {
        let mut tree = ForegroundTree::new("div");
        let first = tree.insert(crate::driver::node::ForegroundNode::new("div"));
        let second = tree.insert(crate::driver::node::ForegroundNode::new("div"));
        let mut registry = IdentityRegistry::new(tree.root());
        let token = NodeToken::from("n1");

        assert_eq!(registry.register(token.clone(), first), None);
        assert_eq!(registry.register(token.clone(), second), Some(first));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unregister(&token), Some(second));
        assert!(!registry.contains(&token));
    }
}
