use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Quote character used for string literals the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quote {
    /// `'...'`
    Single,
    /// `"..."`
    #[default]
    Double,
}

impl Quote {
    fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }

    /// Renders `value` as a quoted, escaped string literal.
    ///
    /// ```
    /// use upstage::code::Quote;
    ///
    /// assert_eq!(Quote::Single.literal("#module"), "'#module'");
    /// assert_eq!(Quote::Double.literal(r#"say "hi""#), r#""say \"hi\"""#);
    /// ```
    pub fn literal(self, value: &str) -> String {
        let quote = self.as_char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(quote);
        for c in value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c == quote => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push(quote);
        out
    }
}

/// Formatting options for code emitted by rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOptions {
    /// Quote style for string literals built with [`SyntaxNode::literal`].
    #[serde(default)]
    pub quote: Quote,
}

impl PrintOptions {
    /// Options emitting single-quoted literals.
    pub fn single_quotes() -> Self {
        Self {
            quote: Quote::Single,
        }
    }
}

/// A read-only view of one syntax tree node handed to patterns.
///
/// Besides tree inspection it carries the file path (for import resolution)
/// and a literal builder honoring the active [`PrintOptions`].
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    node: tree_sitter::Node<'t>,
    source: &'t str,
    path: &'t str,
    print: &'t PrintOptions,
}

impl<'t> SyntaxNode<'t> {
    pub(crate) fn new(
        node: tree_sitter::Node<'t>,
        source: &'t str,
        path: &'t str,
        print: &'t PrintOptions,
    ) -> Self {
        Self {
            node,
            source,
            path,
            print,
        }
    }

    fn wrap(&self, node: tree_sitter::Node<'t>) -> Self {
        Self::new(node, self.source, self.path, self.print)
    }

    /// Grammar node kind, e.g. `import_statement`.
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// Returns `true` if the node has the given kind.
    pub fn is(&self, kind: &str) -> bool {
        self.node.kind() == kind
    }

    /// Returns `true` for named (non-punctuation) nodes.
    pub fn is_named(&self) -> bool {
        self.node.is_named()
    }

    /// Source text covered by the node.
    pub fn text(&self) -> &'t str {
        self.source.get(self.byte_range()).unwrap_or("")
    }

    /// Byte range in the source file.
    pub fn byte_range(&self) -> Range<usize> {
        self.node.start_byte()..self.node.end_byte()
    }

    /// One-based line of the node start.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }

    /// Project-relative path of the file being processed.
    pub fn path(&self) -> &'t str {
        self.path
    }

    /// Child stored under a grammar field, e.g. `source` of an import.
    pub fn field(&self, name: &str) -> Option<SyntaxNode<'t>> {
        self.node.child_by_field_name(name).map(|n| self.wrap(n))
    }

    /// All children, including anonymous tokens.
    pub fn children(&self) -> Vec<SyntaxNode<'t>> {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .map(|n| self.wrap(n))
            .collect()
    }

    /// Named children only.
    pub fn named_children(&self) -> Vec<SyntaxNode<'t>> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .map(|n| self.wrap(n))
            .collect()
    }

    /// Parent node, if any.
    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.node.parent().map(|n| self.wrap(n))
    }

    /// Contents of a quoted string literal, without its quotes.
    ///
    /// Returns `None` when the node text is not delimited by matching quotes.
    pub fn string_value(&self) -> Option<&'t str> {
        let text = self.text();
        let first = text.chars().next()?;
        if !matches!(first, '"' | '\'' | '`') || text.len() < 2 || !text.ends_with(first) {
            return None;
        }
        text.get(1..text.len() - 1)
    }

    /// Builds a string literal in the configured quote style.
    pub fn literal(&self, value: &str) -> String {
        self.print.quote.literal(value)
    }

    /// Active print options.
    pub fn print_options(&self) -> &'t PrintOptions {
        self.print
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxNode")
            .field("kind", &self.kind())
            .field("path", &self.path)
            .field("range", &self.byte_range())
            .finish()
    }
}
