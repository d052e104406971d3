use std::collections::{BTreeMap, HashMap};

use serde_json::Value as JsonValue;

use super::protocol::NodeToken;

/// Arena key of a live foreground node. Keys are never reused within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Node(NodeKey),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Plain string attribute.
    Attribute(String),
    /// Structured state such as `checked` or `value` objects.
    Typed(JsonValue),
}

/// Renderer props of a node: attributes, a style sub-object and the
/// listener-installation entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    values: BTreeMap<String, PropValue>,
    style: Option<BTreeMap<String, String>>,
    listeners: BTreeMap<String, String>,
}

impl Props {
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.values.get(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(PropValue::Attribute(value)) => Some(value),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), PropValue::Attribute(value.into()));
    }

    pub fn set_typed(&mut self, name: impl Into<String>, value: JsonValue) {
        self.values.insert(name.into(), PropValue::Typed(value));
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        if name == "style" {
            self.style = None;
        }
        self.values.remove(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn style(&self) -> Option<&BTreeMap<String, String>> {
        self.style.as_ref()
    }

    pub fn style_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.style.get_or_insert_with(BTreeMap::new)
    }

    /// Installs the listener prop for `event_name`. Returns the prop key.
    pub fn add_listener(&mut self, event_name: &str) -> Option<String> {
        let key = listen_key(event_name)?;
        self.listeners.insert(key.clone(), event_name.to_string());
        Some(key)
    }

    pub fn remove_listener(&mut self, event_name: &str) -> bool {
        listen_key(event_name)
            .and_then(|key| self.listeners.remove(&key))
            .is_some()
    }

    pub fn listens_to(&self, event_name: &str) -> bool {
        listen_key(event_name).is_some_and(|key| self.listeners.contains_key(&key))
    }

    /// Listener prop keys (`onClick`, ...) in key order.
    pub fn listener_keys(&self) -> impl Iterator<Item = &str> {
        self.listeners.keys().map(String::as_str)
    }
}

/// `click` → `onClick`.
pub fn listen_key(event_name: &str) -> Option<String> {
    let mut chars = event_name.chars();
    let first = chars.next()?;
    let mut key = String::with_capacity(event_name.len() + 2);
    key.push_str("on");
    key.extend(first.to_uppercase());
    key.push_str(chars.as_str());
    Some(key)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasCall {
    pub method: String,
    pub args: Vec<JsonValue>,
}

/// Drawing context of a canvas node. Property state is kept current; method
/// invocations queue up until the host painter drains them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasContext2D {
    properties: BTreeMap<String, JsonValue>,
    calls: Vec<CanvasCall>,
}

impl CanvasContext2D {
    pub fn set_property(&mut self, name: impl Into<String>, value: JsonValue) {
        self.properties.insert(name.into(), value);
    }

    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }

    pub fn invoke(&mut self, method: impl Into<String>, args: Vec<JsonValue>) {
        self.calls.push(CanvasCall {
            method: method.into(),
            args,
        });
    }

    pub fn calls(&self) -> &[CanvasCall] {
        &self.calls
    }

    pub fn drain_calls(&mut self) -> Vec<CanvasCall> {
        std::mem::take(&mut self.calls)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundNode {
    pub component: String,
    pub token: Option<NodeToken>,
    pub props: Props,
    pub children: Vec<Child>,
    canvas: Option<CanvasContext2D>,
}

impl ForegroundNode {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            token: None,
            props: Props::default(),
            children: Vec::new(),
            canvas: None,
        }
    }

    /// Text payload of a text container (its first child).
    pub fn text(&self) -> Option<&str> {
        match self.children.first() {
            Some(Child::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, text: String) {
        match self.children.first_mut() {
            Some(slot) => *slot = Child::Text(text),
            None => self.children.push(Child::Text(text)),
        }
    }

    pub fn child_keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.children.iter().filter_map(|child| match child {
            Child::Node(key) => Some(*key),
            Child::Text(_) => None,
        })
    }

    pub fn context_2d(&mut self) -> &mut CanvasContext2D {
        self.canvas.get_or_insert_with(CanvasContext2D::default)
    }

    pub fn canvas(&self) -> Option<&CanvasContext2D> {
        self.canvas.as_ref()
    }
}

/// Owns every live foreground node, including the body singleton.
#[derive(Debug)]
pub struct ForegroundTree {
    nodes: HashMap<NodeKey, ForegroundNode>,
    root: NodeKey,
    next_key: u64,
}

impl ForegroundTree {
    pub fn new(root_component: impl Into<String>) -> Self {
        let root = NodeKey(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, ForegroundNode::new(root_component));
        Self {
            nodes,
            root,
            next_key: 1,
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn root_node(&self) -> &ForegroundNode {
        &self.nodes[&self.root]
    }

    pub fn root_token(&self) -> Option<&NodeToken> {
        self.root_node().token.as_ref()
    }

    pub fn insert(&mut self, node: ForegroundNode) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        self.nodes.insert(key, node);
        key
    }

    pub fn get(&self, key: NodeKey) -> Option<&ForegroundNode> {
        self.nodes.get(&key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut ForegroundNode> {
        self.nodes.get_mut(&key)
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        match self.nodes.get_mut(&parent) {
            Some(node) => {
                node.children.push(Child::Node(child));
                true
            }
            None => false,
        }
    }

    /// Splices `child` out of `parent`'s child sequence.
    pub fn detach_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        let Some(node) = self.nodes.get_mut(&parent) else {
            return false;
        };
        let position = node
            .children
            .iter()
            .position(|entry| *entry == Child::Node(child));
        match position {
            Some(index) => {
                node.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Drops `key` and its descendants, returning the tokens they carried.
    /// The root is never released.
    pub fn release(&mut self, key: NodeKey) -> Vec<NodeToken> {
        let mut released = Vec::new();
        let mut pending = vec![key];
        while let Some(current) = pending.pop() {
            if current == self.root {
                continue;
            }
            if let Some(node) = self.nodes.remove(&current) {
                pending.extend(node.child_keys());
                released.extend(node.token);
            }
        }
        released
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listen_key_capitalizes_whole_name() {
        assert_eq!(listen_key("click").as_deref(), Some("onClick"));
        assert_eq!(listen_key("touchstart").as_deref(), Some("onTouchstart"));
        assert_eq!(listen_key(""), None);
    }

    #[test]
    fn listeners_round_trip_through_props() {
        let mut props = Props::default();
        assert_eq!(props.add_listener("scroll").as_deref(), Some("onScroll"));
        assert!(props.listens_to("scroll"));
        assert!(props.remove_listener("scroll"));
        assert!(!props.listens_to("scroll"));
        assert!(!props.remove_listener("scroll"));
    }

    #[test]
    fn release_drops_subtree_and_reports_tokens() {
        let mut tree = ForegroundTree::new("div");
        let mut parent = ForegroundNode::new("div");
        parent.token = Some(NodeToken::from("p"));
        let mut leaf = ForegroundNode::new("span");
        leaf.token = Some(NodeToken::from("leaf"));
        let leaf = tree.insert(leaf);
        parent.children.push(Child::Node(leaf));
        let parent = tree.insert(parent);
        tree.append_child(tree.root(), parent);

        assert!(tree.detach_child(tree.root(), parent));
        let mut released = tree.release(parent);
        released.sort();
        assert_eq!(released, vec![NodeToken::from("leaf"), NodeToken::from("p")]);
        assert!(tree.get(leaf).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn root_is_never_released() {
        let mut tree = ForegroundTree::new("div");
        let root = tree.root();
        assert!(tree.release(root).is_empty());
        assert!(tree.get(root).is_some());
    }

    #[test]
    fn canvas_context_is_created_lazily() {
        let mut node = ForegroundNode::new("canvas");
        assert!(node.canvas().is_none());
        node.context_2d().set_property("fillStyle", json!("red"));
        node.context_2d().invoke("fillRect", vec![json!(0), json!(0)]);
        let context = node.canvas().unwrap();
        assert_eq!(context.property("fillStyle"), Some(&json!("red")));
        assert_eq!(context.calls().len(), 1);
        assert_eq!(node.context_2d().drain_calls().len(), 1);
        assert!(node.canvas().unwrap().calls().is_empty());
    }
}
