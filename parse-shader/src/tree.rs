use crate::error::SyntaxError;
use crate::loc::Loc;

/// Kinds of syntax nodes produced for both dialects.
///
/// Nodes only exist for constructs that linking cares about. Operators, literals and most
/// punctuation are not represented; their bytes are simply covered by the enclosing node's span.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SyntaxKind {
  Program,
  // Unparseable top-level input.
  Error,

  Identifier,
  // Names that are never resolved against top-level symbols: member accesses, struct fields.
  PrivateIdentifier,
  Keyword,
  String,

  Attribute,
  AttributeList,
  ImportDeclaration,
  ImportDeclarationList,
  ImportDeclarationIdentifier,
  EnableDirective,
  EnableName,
  // A global directive other than `enable`, e.g. `requires` or `diagnostic(...)`.
  Directive,

  LocalDeclaration,
  FunctionDeclaration,
  FunctionHeader,
  ParameterList,
  Parameter,
  ReturnType,
  GlobalVariableDeclaration,
  VariableDeclaration,
  VariableQualifier,
  GlobalConstantDeclaration,
  TypeAliasDeclaration,
  StructDeclaration,
  StructBody,
  StructMember,
  Type,
  Block,
  Expression,

  Preprocessor,
  PreprocessorDirective,
  PragmaVerb,
  FunctionDefinition,
  FunctionPrototype,
  GlobalDeclaration,
  QualifiedType,
  TypeQualifierList,
  TypeQualifier,
  TypeSpecifier,
  Local,
  InterfaceBlock,
  PrecisionStatement,
}

/// Owned node produced while parsing, flattened into a [`SyntaxTree`] afterwards.
#[derive(Debug)]
pub struct RawNode {
  pub kind: SyntaxKind,
  pub loc: Loc,
  pub children: Vec<RawNode>,
}

impl RawNode {
  pub fn leaf(kind: SyntaxKind, loc: Loc) -> RawNode {
    RawNode {
      kind,
      loc,
      children: Vec::new(),
    }
  }

  pub fn new(kind: SyntaxKind, loc: Loc, children: Vec<RawNode>) -> RawNode {
    RawNode {
      kind,
      loc,
      children,
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Clone, Debug)]
struct NodeData {
  kind: SyntaxKind,
  loc: Loc,
  parent: Option<NodeId>,
  prev_sibling: Option<NodeId>,
  next_sibling: Option<NodeId>,
  // Exclusive end of this node's subtree in pre-order.
  end: u32,
}

/// An immutable concrete syntax tree.
///
/// Nodes are stored in pre-order, so a node's descendants occupy the contiguous id range directly
/// after it.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
  nodes: Vec<NodeData>,
  errors: Vec<SyntaxError>,
}

impl SyntaxTree {
  pub fn build(root: RawNode, errors: Vec<SyntaxError>) -> SyntaxTree {
    let mut nodes = Vec::new();
    flatten(&mut nodes, root, None, None);
    SyntaxTree { nodes, errors }
  }

  pub fn root(&self) -> Node<'_> {
    Node {
      tree: self,
      id: NodeId(0),
    }
  }

  pub fn node(&self, id: NodeId) -> Node<'_> {
    Node { tree: self, id }
  }

  pub fn cursor(&self) -> Cursor<'_> {
    Cursor {
      tree: self,
      id: NodeId(0),
    }
  }

  pub fn errors(&self) -> &[SyntaxError] {
    &self.errors
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  fn data(&self, id: NodeId) -> &NodeData {
    &self.nodes[id.index()]
  }
}

fn flatten(
  nodes: &mut Vec<NodeData>,
  raw: RawNode,
  parent: Option<NodeId>,
  prev_sibling: Option<NodeId>,
) -> NodeId {
  let id = NodeId(nodes.len() as u32);
  nodes.push(NodeData {
    kind: raw.kind,
    loc: raw.loc,
    parent,
    prev_sibling,
    next_sibling: None,
    end: 0,
  });
  let mut prev: Option<NodeId> = None;
  for child in raw.children {
    let child_id = flatten(nodes, child, Some(id), prev);
    if let Some(prev) = prev {
      nodes[prev.index()].next_sibling = Some(child_id);
    }
    prev = Some(child_id);
  }
  nodes[id.index()].end = nodes.len() as u32;
  id
}

/// A lightweight handle to a node in a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct Node<'t> {
  tree: &'t SyntaxTree,
  id: NodeId,
}

impl<'t> Node<'t> {
  pub fn id(&self) -> NodeId {
    self.id
  }

  pub fn kind(&self) -> SyntaxKind {
    self.tree.data(self.id).kind
  }

  pub fn loc(&self) -> Loc {
    self.tree.data(self.id).loc
  }

  pub fn is_error(&self) -> bool {
    self.kind() == SyntaxKind::Error
  }

  pub fn text<'s>(&self, source: &'s str) -> &'s str {
    let loc = self.loc();
    &source[loc.0..loc.1]
  }

  pub fn parent(&self) -> Option<Node<'t>> {
    self.tree.data(self.id).parent.map(|id| self.tree.node(id))
  }

  pub fn first_child(&self) -> Option<Node<'t>> {
    let end = self.tree.data(self.id).end;
    (end > self.id.0 + 1).then(|| self.tree.node(NodeId(self.id.0 + 1)))
  }

  pub fn next_sibling(&self) -> Option<Node<'t>> {
    self.tree.data(self.id).next_sibling.map(|id| self.tree.node(id))
  }

  pub fn prev_sibling(&self) -> Option<Node<'t>> {
    self.tree.data(self.id).prev_sibling.map(|id| self.tree.node(id))
  }

  pub fn children(&self) -> Children<'t> {
    Children {
      next: self.first_child(),
    }
  }

  pub fn child(&self, kind: SyntaxKind) -> Option<Node<'t>> {
    self.children().find(|c| c.kind() == kind)
  }

  /// All nodes strictly inside this node's subtree, in pre-order.
  pub fn descendants(&self) -> impl Iterator<Item = Node<'t>> + 't {
    let tree = self.tree;
    (self.id.0 + 1..tree.data(self.id).end).map(move |id| tree.node(NodeId(id)))
  }
}

impl std::fmt::Debug for Node<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}@{}..{}", self.kind(), self.loc().0, self.loc().1)
  }
}

impl PartialEq for Node<'_> {
  fn eq(&self, other: &Self) -> bool {
    std::ptr::eq(self.tree, other.tree) && self.id == other.id
  }
}

impl Eq for Node<'_> {}

pub struct Children<'t> {
  next: Option<Node<'t>>,
}

impl<'t> Iterator for Children<'t> {
  type Item = Node<'t>;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.next?;
    self.next = node.next_sibling();
    Some(node)
  }
}

/// A mutable position in a [`SyntaxTree`] with parent, child and sibling navigation.
///
/// Navigation methods return `false` and leave the cursor in place when the move is impossible.
#[derive(Clone)]
pub struct Cursor<'t> {
  tree: &'t SyntaxTree,
  id: NodeId,
}

impl<'t> Cursor<'t> {
  pub fn node(&self) -> Node<'t> {
    self.tree.node(self.id)
  }

  pub fn kind(&self) -> SyntaxKind {
    self.node().kind()
  }

  pub fn loc(&self) -> Loc {
    self.node().loc()
  }

  pub fn is_error(&self) -> bool {
    self.node().is_error()
  }

  fn go(&mut self, node: Option<Node<'t>>) -> bool {
    match node {
      Some(node) => {
        self.id = node.id;
        true
      }
      None => false,
    }
  }

  pub fn parent(&mut self) -> bool {
    let node = self.node().parent();
    self.go(node)
  }

  pub fn first_child(&mut self) -> bool {
    let node = self.node().first_child();
    self.go(node)
  }

  pub fn next_sibling(&mut self) -> bool {
    let node = self.node().next_sibling();
    self.go(node)
  }

  pub fn prev_sibling(&mut self) -> bool {
    let node = self.node().prev_sibling();
    self.go(node)
  }

  /// Moves to the next node in pre-order.
  pub fn next(&mut self) -> bool {
    let next = self.id.0 + 1;
    if (next as usize) < self.tree.len() {
      self.id = NodeId(next);
      true
    } else {
      false
    }
  }

  /// Moves to the next node in pre-order that is not a descendant of the current node.
  pub fn next_skipping_children(&mut self) -> bool {
    let end = self.tree.data(self.id).end;
    if (end as usize) < self.tree.len() {
      self.id = NodeId(end);
      true
    } else {
      false
    }
  }
}
