use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use crate::config::DriverConfig;

use super::factory::NodeFactory;
use super::node::{ForegroundNode, ForegroundTree, NodeKey};
use super::notifier::RenderNotifier;
use super::protocol::{
    coerce_text, scalar_text, ChangeRecord, NodeToken, RemoteNodeDescriptor, StyleDescription,
};
use super::registry::IdentityRegistry;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("unsupported mutation record type {tag:?} at index {index}")]
    UnsupportedRecord { index: usize, tag: String },
    #[error("malformed {tag} record at index {index}: {source}")]
    MalformedRecord {
        index: usize,
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub skipped: usize,
    pub rendered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Applied { structural: bool },
    Skipped,
}

/// Applies change-record batches to the foreground tree.
///
/// Records run strictly in order. A record whose target is not registered
/// is skipped without error and the rest of the batch still applies. The
/// render notifier fires at most once per batch, after the last record.
pub struct MutationReplayEngine {
    tree: ForegroundTree,
    registry: IdentityRegistry,
    factory: NodeFactory,
    notifier: RenderNotifier,
    root_component: String,
}

impl MutationReplayEngine {
    pub fn new(config: &DriverConfig) -> Self {
        Self::with_factory(config, NodeFactory::new(config))
    }

    pub fn with_factory(config: &DriverConfig, factory: NodeFactory) -> Self {
        let tree = ForegroundTree::new(config.root_component.clone());
        let registry = IdentityRegistry::new(tree.root());
        Self {
            tree,
            registry,
            factory,
            notifier: RenderNotifier::default(),
            root_component: config.root_component.clone(),
        }
    }

    pub fn tree(&self) -> &ForegroundTree {
        &self.tree
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn notifier_mut(&mut self) -> &mut RenderNotifier {
        &mut self.notifier
    }

    /// Resolves a token to its node, if it is still registered.
    pub fn node_key(&self, token: &NodeToken) -> Option<NodeKey> {
        self.registry.lookup_token(token)
    }

    /// Decodes and applies a raw batch. Decoding happens record by record:
    /// records before an unsupported or malformed one stay applied.
    pub fn apply_batch(&mut self, mutations: Vec<JsonValue>) -> Result<BatchSummary, ReplayError> {
        self.replay(
            mutations
                .into_iter()
                .enumerate()
                .map(|(index, raw)| decode_record(index, raw)),
        )
    }

    /// Drops every node and registration. Used on full teardown only.
    pub fn teardown(&mut self) {
        self.tree = ForegroundTree::new(self.root_component.clone());
        self.registry = IdentityRegistry::new(self.tree.root());
    }

    fn replay(
        &mut self,
        records: impl Iterator<Item = Result<ChangeRecord, ReplayError>>,
    ) -> Result<BatchSummary, ReplayError> {
        let mut summary = BatchSummary::default();
        let mut structural = false;
        let mut failure = None;

        for record in records {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            match self.apply_record(record) {
                RecordOutcome::Applied { structural: changed } => {
                    summary.applied += 1;
                    structural |= changed;
                }
                RecordOutcome::Skipped => summary.skipped += 1,
            }
        }

        if structural {
            self.notifier.notify(&self.tree);
            summary.rendered = true;
        }

        debug!(
            target: "driver",
            applied = summary.applied,
            skipped = summary.skipped,
            rendered = summary.rendered,
            nodes = self.registry.len(),
            "applied mutation batch"
        );

        match failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    fn apply_record(&mut self, record: ChangeRecord) -> RecordOutcome {
        match record {
            ChangeRecord::ChildList {
                target,
                removed_nodes,
                added_nodes,
                next_sibling: _,
            } => self.child_list(target.as_ref(), removed_nodes, added_nodes),
            ChangeRecord::Attributes {
                target,
                attribute_name,
                new_value,
                style,
            } => self.attributes(target.as_ref(), attribute_name, new_value, style),
            ChangeRecord::CharacterData { target, new_value } => {
                let Some(key) = self.resolve(target.as_ref()) else {
                    return RecordOutcome::Skipped;
                };
                let Some(node) = self.tree.get_mut(key) else {
                    return RecordOutcome::Skipped;
                };
                node.set_text(coerce_text(new_value.as_ref()));
                RecordOutcome::Applied { structural: true }
            }
            ChangeRecord::AddEvent { target, event_name } => {
                self.with_node(target.as_ref(), |node| {
                    node.props.add_listener(&event_name);
                })
            }
            ChangeRecord::RemoveEvent { target, event_name } => {
                self.with_node(target.as_ref(), |node| {
                    node.props.remove_listener(&event_name);
                })
            }
            ChangeRecord::CanvasContext2D {
                target,
                method,
                args,
                properties,
            } => self.with_node(target.as_ref(), |node| {
                let context = node.context_2d();
                for (name, value) in properties.into_iter().flatten() {
                    context.set_property(name, value);
                }
                if let Some(method) = method {
                    context.invoke(method, args);
                }
            }),
        }
    }

    fn child_list(
        &mut self,
        target: Option<&RemoteNodeDescriptor>,
        removed_nodes: Option<Vec<RemoteNodeDescriptor>>,
        added_nodes: Option<Vec<RemoteNodeDescriptor>>,
    ) -> RecordOutcome {
        if let Some(target) = target.filter(|target| target.is_body()) {
            self.adopt_root_token(target);
        }
        let parent = self.resolve(target);
        let root = self.tree.root();

        // Reverse order keeps positions valid against the original sequence.
        for reference in removed_nodes.iter().flatten().rev() {
            let Some(key) = self.registry.lookup(reference) else {
                continue;
            };
            if key == root {
                continue;
            }
            let detached = parent.is_some_and(|parent| self.tree.detach_child(parent, key));
            if !detached {
                // Still attached elsewhere; only the mapping goes.
                if let Some(token) = &reference.id {
                    self.registry.unregister(token);
                }
                continue;
            }
            for token in self.tree.release(key) {
                let stale = self
                    .registry
                    .lookup_token(&token)
                    .is_some_and(|mapped| self.tree.get(mapped).is_none());
                if stale {
                    self.registry.unregister(&token);
                }
            }
        }

        // Additions always append; the sibling hint is not used for placement.
        for descriptor in added_nodes.iter().flatten() {
            let key = match self.registry.lookup(descriptor) {
                Some(existing) => Some(existing),
                None => self
                    .factory
                    .build(descriptor, &mut self.tree, &mut self.registry),
            };
            let Some(key) = key else {
                continue;
            };
            if let Some(parent) = parent.filter(|parent| *parent != key && key != root) {
                self.tree.append_child(parent, key);
            }
        }

        RecordOutcome::Applied { structural: true }
    }

    fn attributes(
        &mut self,
        target: Option<&RemoteNodeDescriptor>,
        attribute_name: Option<String>,
        new_value: Option<JsonValue>,
        style: Option<StyleDescription>,
    ) -> RecordOutcome {
        let Some(key) = self.resolve(target) else {
            return RecordOutcome::Skipped;
        };
        let Some(node) = self.tree.get_mut(key) else {
            return RecordOutcome::Skipped;
        };

        if let Some(style) = style {
            self.factory.projector().project_style(&mut node.props, &style);
            return RecordOutcome::Applied { structural: false };
        }

        let Some(name) = attribute_name else {
            return RecordOutcome::Skipped;
        };
        match new_value {
            None | Some(JsonValue::Null) => {
                node.props.remove(&name);
            }
            Some(value @ (JsonValue::Object(_) | JsonValue::Array(_) | JsonValue::Bool(_))) => {
                node.props.set_typed(name, value);
            }
            Some(value) => {
                node.props
                    .set_attribute(name, scalar_text(&value).unwrap_or_default());
            }
        }
        RecordOutcome::Applied { structural: false }
    }

    fn with_node(
        &mut self,
        target: Option<&RemoteNodeDescriptor>,
        apply: impl FnOnce(&mut ForegroundNode),
    ) -> RecordOutcome {
        match self.resolve(target).and_then(|key| self.tree.get_mut(key)) {
            Some(node) => {
                apply(node);
                RecordOutcome::Applied { structural: false }
            }
            None => RecordOutcome::Skipped,
        }
    }

    fn resolve(&self, target: Option<&RemoteNodeDescriptor>) -> Option<NodeKey> {
        target.and_then(|target| self.registry.lookup(target))
    }

    fn adopt_root_token(&mut self, target: &RemoteNodeDescriptor) {
        let Some(token) = target.id.clone() else {
            return;
        };
        if self.tree.root_token() == Some(&token) {
            return;
        }
        let root = self.tree.root();
        if let Some(node) = self.tree.get_mut(root) {
            node.props
                .set_attribute(self.factory.identity_attribute().to_string(), token.as_str());
            node.token = Some(token.clone());
        }
        debug!(target: "driver", token = %token, "learned body token");
        self.registry.register(token, root);
    }
}

fn decode_record(index: usize, raw: JsonValue) -> Result<ChangeRecord, ReplayError> {
    let tag = raw
        .get("type")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();
    if !ChangeRecord::TAGS.contains(&tag.as_str()) {
        return Err(ReplayError::UnsupportedRecord { index, tag });
    }
    serde_json::from_value(raw).map_err(|source| ReplayError::MalformedRecord { index, tag, source })
}
