//! Arena-allocated syntax tree.
//!
//! Every construct in a script file - assignments, blocks, bare list items,
//! comments, the synthetic root - is one [`Node`]. Nodes live in a per-document
//! arena ([`ScriptAst`]) and refer to each other by [`NodeId`] index, so the
//! parent back-reference is a plain optional index rather than an ownership
//! edge. Dropping the arena drops the whole tree atomically; re-parsing a
//! document replaces the arena and re-establishes every parent link.

use crate::position::{Position, Range};
use ck3_scope::ScopeType;
use serde::{Deserialize, Serialize};

/// Index of a node within its [`ScriptAst`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structural classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// The synthetic file root; children are the top-level forms.
    Root,
    /// `key op value` where value is a scalar or a block.
    Assignment,
    /// A bare scalar inside a block (list form).
    ListItem,
    /// A `#` comment, preserved for folding and formatting.
    Comment,
}

/// Comparison / assignment operator between key and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Assign,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    NotEq,
    Eq,
}

impl Operator {
    /// Literal operator text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterEq => ">=",
            Operator::LessEq => "<=",
            Operator::NotEq => "!=",
            Operator::Eq => "==",
        }
    }
}

/// Lexical class of a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Identifier,
    Number,
    String,
}

/// A scalar right-hand side or list element.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    /// Text as written (quotes stripped for strings).
    pub text: String,
    /// Lexical class.
    pub kind: ScalarKind,
    /// Range of the scalar token.
    pub range: Range,
}

/// Value of a node: nothing, a scalar, or a block of children.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Comments and the root carry no value.
    None,
    /// `key = scalar` or a bare list scalar.
    Scalar(Scalar),
    /// `key = { ... }`; the children vector holds the contents.
    Block,
}

/// One syntax-tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Structural type tag.
    pub node_type: NodeType,
    /// Left-hand side, or a synthetic key for root/list/comment nodes.
    pub key: String,
    /// Range of the key token.
    pub key_range: Range,
    /// Operator between key and value, when the node is an assignment.
    pub operator: Option<Operator>,
    /// Scalar or block payload.
    pub value: NodeValue,
    /// Range of the whole construct, braces included.
    pub range: Range,
    /// Parent arena index; `None` only for the root. Never an ownership edge.
    pub parent: Option<NodeId>,
    /// Child arena indices in source order.
    pub children: Vec<NodeId>,
    /// Scope the node's value evaluates in, filled by the annotation walk.
    pub scope_type: ScopeType,
}

impl Node {
    /// Whether the node's value is a block.
    #[inline]
    pub fn is_block(&self) -> bool {
        matches!(self.value, NodeValue::Block)
    }

    /// The scalar payload, if the value is a scalar.
    #[inline]
    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.value {
            NodeValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Arena owning every node of one parsed document.
///
/// The root node is always slot 0. Node ids are only meaningful within the
/// arena that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptAst {
    nodes: Vec<Node>,
}

impl ScriptAst {
    /// Create an arena holding just a root node spanning `range`.
    pub fn new(range: Range) -> Self {
        let root = Node {
            node_type: NodeType::Root,
            key: String::new(),
            key_range: Range::default(),
            operator: None,
            value: NodeValue::Block,
            range,
            parent: None,
            children: Vec::new(),
            scope_type: ScopeType::None,
        };
        Self { nodes: vec![root] }
    }

    /// The root node id.
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds only the root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Borrow a node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutably borrow a node.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Allocate `node` as the last child of `parent`.
    pub fn push_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Children of a node, in source order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Iterate ancestors from the node's parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.node(id).parent;
        std::iter::from_fn(move || {
            let next = current?;
            current = self.node(next).parent;
            Some(next)
        })
    }

    /// Pre-order traversal of the whole tree, root first.
    pub fn walk(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let children = &self.node(id).children;
            stack.extend(children.iter().rev().copied());
            Some(id)
        })
    }

    /// Deepest node whose range contains `pos`.
    pub fn node_at_position(&self, pos: Position) -> Option<NodeId> {
        if !self.node(self.root()).range.contains(pos) {
            return None;
        }
        let mut current = self.root();
        'descend: loop {
            for &child in self.children(current) {
                if self.node(child).range.contains(pos) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// First child assignment of `parent` whose key equals `key`.
    pub fn child_assignment(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.node(c).node_type == NodeType::Assignment && self.node(c).key == key)
    }

    /// All child assignments of `parent` with key `key`.
    pub fn child_assignments<'a>(
        &'a self,
        parent: NodeId,
        key: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent).iter().copied().filter(move |&c| {
            self.node(c).node_type == NodeType::Assignment && self.node(c).key == key
        })
    }

    /// Scalar text of `key = value` under `parent`, if present.
    pub fn scalar_of(&self, parent: NodeId, key: &str) -> Option<&str> {
        self.child_assignment(parent, key)
            .and_then(|id| self.node(id).scalar())
            .map(|s| s.text.as_str())
    }

    /// Render the tree as a canonical S-expression, whitespace-independent.
    ///
    /// Two parses of semantically identical source render identically, which
    /// is what the determinism and formatter round-trip tests compare.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        self.write_canonical(self.root(), &mut out);
        out
    }

    fn write_canonical(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.node_type {
            NodeType::Root => {
                out.push_str("(file");
                for &child in &node.children {
                    out.push(' ');
                    self.write_canonical(child, out);
                }
                out.push(')');
            }
            NodeType::Assignment => {
                out.push('(');
                out.push_str(&node.key);
                out.push(' ');
                out.push_str(node.operator.map(|o| o.as_str()).unwrap_or("="));
                match &node.value {
                    NodeValue::Scalar(s) => {
                        out.push(' ');
                        out.push_str(&s.text);
                    }
                    NodeValue::Block => {
                        for &child in &node.children {
                            out.push(' ');
                            self.write_canonical(child, out);
                        }
                    }
                    NodeValue::None => {}
                }
                out.push(')');
            }
            NodeType::ListItem => {
                if let NodeValue::Scalar(s) = &node.value {
                    out.push_str(&s.text);
                }
            }
            NodeType::Comment => {
                // Comments are trivia; they do not participate in canonical form.
            }
        }
    }
}
