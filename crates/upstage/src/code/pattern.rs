use super::node::SyntaxNode;
use std::fmt;

/// A predicate/transform pair over syntax tree nodes.
///
/// Patterns are pure: they see the current node (and its helpers) and hold no
/// state between calls.
pub trait CodePattern: Send + Sync {
    /// Returns `true` if `node` is a match.
    fn filter(&self, node: &SyntaxNode<'_>) -> bool;

    /// For existence queries: whether to descend into a non-matching node.
    fn recurse(&self, _node: &SyntaxNode<'_>) -> bool {
        true
    }

    /// For rewrites: source text replacing a matching node.
    ///
    /// Defaults to the node's own text.
    fn map(&self, node: &SyntaxNode<'_>) -> String {
        node.text().to_string()
    }
}

type Predicate = Box<dyn Fn(&SyntaxNode<'_>) -> bool + Send + Sync>;
type Mapper = Box<dyn Fn(&SyntaxNode<'_>) -> String + Send + Sync>;

/// A [`CodePattern`] assembled from closures.
///
/// # Examples
///
/// ```
/// use upstage::code::Pattern;
///
/// let pattern = Pattern::new(|node| node.is("import_statement"))
///     .recurse(|node| node.is("program"))
///     .map(|node| node.text().replace("babel", "core"));
/// # let _ = pattern;
/// ```
pub struct Pattern {
    filter: Predicate,
    recurse: Option<Predicate>,
    map: Option<Mapper>,
}

impl Pattern {
    /// Creates a pattern with only a filter.
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&SyntaxNode<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            filter: Box::new(filter),
            recurse: None,
            map: None,
        }
    }

    /// Sets the descend predicate.
    pub fn recurse<F>(mut self, recurse: F) -> Self
    where
        F: Fn(&SyntaxNode<'_>) -> bool + Send + Sync + 'static,
    {
        self.recurse = Some(Box::new(recurse));
        self
    }

    /// Sets the replacement producer.
    pub fn map<F>(mut self, map: F) -> Self
    where
        F: Fn(&SyntaxNode<'_>) -> String + Send + Sync + 'static,
    {
        self.map = Some(Box::new(map));
        self
    }
}

impl CodePattern for Pattern {
    fn filter(&self, node: &SyntaxNode<'_>) -> bool {
        (self.filter)(node)
    }

    fn recurse(&self, node: &SyntaxNode<'_>) -> bool {
        self.recurse.as_ref().map_or(true, |recurse| recurse(node))
    }

    fn map(&self, node: &SyntaxNode<'_>) -> String {
        match &self.map {
            Some(map) => map(node),
            None => node.text().to_string(),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("recurse", &self.recurse.is_some())
            .field("map", &self.map.is_some())
            .finish()
    }
}
