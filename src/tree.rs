//! Árboles indexados.
//!
//! Tanto el árbol sintáctico concreto como el abstracto se guardan en
//! un arena de nodos direccionados por índice. Cada nodo conoce a su
//! padre y a sus hijos en orden, sin referencias cíclicas. La
//! construcción es incremental: un cursor señala al nodo "actual",
//! [`Tree::descend()`] agrega un hijo y entra en él, [`Tree::leaf()`]
//! agrega un hijo sin moverse y [`Tree::ascend()`] regresa al padre.

use std::fmt::{self, Display};

/// Índice de un nodo dentro de su [`Tree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
    cursor: Option<NodeId>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Tree {
            nodes: Vec::new(),
            root: None,
            cursor: None,
        }
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.0].value
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Hijo en la posición `index`, si existe.
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Agrega un hijo al nodo actual y lo convierte en el nuevo nodo actual.
    pub fn descend(&mut self, value: T) -> NodeId {
        let id = self.attach(value);
        self.cursor = Some(id);
        id
    }

    /// Agrega un hijo al nodo actual sin mover el cursor.
    pub fn leaf(&mut self, value: T) -> NodeId {
        self.attach(value)
    }

    /// Regresa el cursor al padre del nodo actual.
    ///
    /// Ascender desde la raíz deja al árbol sin nodo actual.
    pub fn ascend(&mut self) {
        self.cursor = self.cursor.and_then(|cursor| self.parent(cursor));
    }

    /// Recorrido en preorden, con la profundidad de cada nodo.
    pub fn preorder(&self) -> Vec<(NodeId, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending: Vec<_> = self.root.into_iter().map(|root| (root, 0)).collect();

        while let Some((id, depth)) = pending.pop() {
            order.push((id, depth));
            pending.extend(self.children(id).iter().rev().map(|&child| (child, depth + 1)));
        }

        order
    }

    fn attach(&mut self, value: T) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            parent: self.cursor,
            children: Vec::new(),
        });

        match self.cursor {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => {
                debug_assert!(self.root.is_none(), "second root attached to tree");
                self.root = Some(id);
            }
        }

        id
    }
}

impl<T: Display> Display for Tree<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, depth) in self.preorder() {
            writeln!(fmt, "{:-<depth$}{}", "", self.get(id), depth = depth)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_mirrors_nesting() {
        let mut tree = Tree::new();
        let root = tree.descend("program");
        let block = tree.descend("block");
        tree.leaf("{");
        tree.leaf("}");
        tree.ascend();
        tree.leaf("$");
        tree.ascend();

        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.cursor(), None);
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.children(block).len(), 2);
        assert_eq!(tree.parent(block), Some(root));
        assert_eq!(*tree.get(tree.child(root, 1).unwrap()), "$");
    }

    #[test]
    fn preorder_rendering() {
        let mut tree = Tree::new();
        tree.descend("a");
        tree.descend("b");
        tree.leaf("c");
        tree.ascend();
        tree.leaf("d");

        assert_eq!(tree.to_string(), "a\n-b\n--c\n-d\n");
    }
}
