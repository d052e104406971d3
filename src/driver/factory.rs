use crate::config::DriverConfig;

use super::components::ComponentMap;
use super::node::{Child, ForegroundNode, ForegroundTree, NodeKey};
use super::protocol::{coerce_text, NodeKind, RemoteNodeDescriptor};
use super::registry::IdentityRegistry;
use super::style::{DeclarationProjector, StyleProjector};

/// Builds foreground nodes from background descriptors.
pub struct NodeFactory {
    components: ComponentMap,
    projector: Box<dyn StyleProjector>,
    text_component: String,
    identity_attribute: String,
}

impl NodeFactory {
    pub fn new(config: &DriverConfig) -> Self {
        Self::with_projector(config, Box::new(DeclarationProjector))
    }

    pub fn with_projector(config: &DriverConfig, projector: Box<dyn StyleProjector>) -> Self {
        Self {
            components: ComponentMap::from_config(config),
            projector,
            text_component: config.text_component.clone(),
            identity_attribute: config.identity_attribute.clone(),
        }
    }

    pub fn projector(&self) -> &dyn StyleProjector {
        self.projector.as_ref()
    }

    pub fn identity_attribute(&self) -> &str {
        &self.identity_attribute
    }

    /// Builds `descriptor` and its subtree, registering every node that
    /// carries a token before returning. Descriptors of unknown kind
    /// produce nothing.
    pub fn build(
        &self,
        descriptor: &RemoteNodeDescriptor,
        tree: &mut ForegroundTree,
        registry: &mut IdentityRegistry,
    ) -> Option<NodeKey> {
        let mut node = match descriptor.kind()? {
            NodeKind::Text => {
                let mut node = ForegroundNode::new(self.text_component.clone());
                node.children
                    .push(Child::Text(coerce_text(descriptor.data.as_ref())));
                node
            }
            NodeKind::Element => {
                let mut node = ForegroundNode::new(
                    self.components.resolve(descriptor.node_name.as_deref()),
                );
                node.children = descriptor
                    .child_nodes
                    .iter()
                    .filter_map(|child| self.build(child, tree, registry))
                    .map(Child::Node)
                    .collect();
                self.apply_props(&mut node, descriptor);
                node
            }
        };

        node.token = descriptor.id.clone();
        let key = tree.insert(node);
        if let Some(token) = descriptor.id.clone() {
            registry.register(token, key);
        }
        Some(key)
    }

    fn apply_props(&self, node: &mut ForegroundNode, descriptor: &RemoteNodeDescriptor) {
        let props = &mut node.props;
        if let Some(token) = &descriptor.id {
            props.set_attribute(self.identity_attribute.clone(), token.as_str());
        }
        if let Some(class_name) = &descriptor.class_name {
            props.set_attribute("className", class_name.clone());
        }
        if let Some(style) = &descriptor.style {
            self.projector.project_style(props, style);
        }
        self.projector.copy_attributes(props, &descriptor.attributes);
        for event in &descriptor.events {
            props.add_listener(event);
        }
    }
}
