use crate::object::SourceObject;

/// One visited object in a flattened tree.
///
/// `parent` indexes the parent context inside the owning [`Traversal`],
/// forming the ancestor chain without holding the tree recursively.
#[derive(Debug, Clone, Copy)]
pub struct TraversalContext<'a> {
    pub current: &'a SourceObject,
    pub parent: Option<usize>,
    pub depth: usize,
}

/// Depth-first pre-order flattening of a whole object tree.
///
/// Every object is visited, convertible or not; filtering happens after
/// flattening so predicates can see the full ancestry.
#[derive(Debug, Clone)]
pub struct Traversal<'a> {
    contexts: Vec<TraversalContext<'a>>,
}

impl<'a> Traversal<'a> {
    pub fn flatten(root: &'a SourceObject) -> Self {
        let mut contexts = vec![];
        // explicit stack, so deep trees cannot exhaust the call stack
        let mut stack = vec![(root, None, 0)];
        while let Some((obj, parent, depth)) = stack.pop() {
            let ix = contexts.len();
            contexts.push(TraversalContext {
                current: obj,
                parent,
                depth,
            });
            for child in obj.children.iter().rev() {
                stack.push((child, Some(ix), depth + 1));
            }
        }
        Traversal { contexts }
    }

    pub fn contexts(&self) -> &[TraversalContext<'a>] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Indices of the ancestors of `ix`, nearest first.
    pub fn ancestors(&self, ix: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.contexts[ix].parent, |&p| self.contexts[p].parent)
    }
}
