//! Structural pattern engine.
//!
//! Files are parsed with tree-sitter and walked depth-first under
//! caller-supplied [`CodePattern`]s. [`find`] answers "does any pattern match
//! anywhere?" and stops at the first match; [`replace`] rewrites every match
//! and writes the file back when its text changed.
//!
//! Rewrites work on text: each visited position yields either the original
//! source slice or a new string, and unchanged subtrees are never copied.
//! Formatting outside replaced nodes is preserved byte for byte.

mod language;
mod node;
mod pattern;

pub use language::Language;
pub use node::{PrintOptions, Quote, SyntaxNode};
pub use pattern::{CodePattern, Pattern};

use std::borrow::Cow;
use tracing::debug;
use upstage_core::{MigrationError, Project};

/// Parses `source` into a syntax tree, choosing the grammar from `path`.
///
/// Trees containing syntax errors are rejected: a rewrite over a partially
/// understood file cannot be trusted.
pub fn parse(path: &str, source: &str) -> Result<tree_sitter::Tree, MigrationError> {
    let language = Language::from_path(path).ok_or_else(|| MigrationError::ParseFailure {
        path: path.to_string(),
        message: "unsupported file type".to_string(),
    })?;

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.grammar())
        .map_err(|e| MigrationError::ParseFailure {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| MigrationError::ParseFailure {
            path: path.to_string(),
            message: format!("{language} parser returned no tree"),
        })?;

    if let Some((line, kind)) = first_error(tree.root_node()) {
        return Err(MigrationError::ParseFailure {
            path: path.to_string(),
            message: format!("{kind} at line {line}"),
        });
    }
    Ok(tree)
}

fn first_error(root: tree_sitter::Node<'_>) -> Option<(usize, &'static str)> {
    if !root.has_error() {
        return None;
    }
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let kind = if node.is_missing() {
                "missing token"
            } else {
                "syntax error"
            };
            return Some((node.start_position().row + 1, kind));
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).filter(|c| c.has_error()).collect();
        stack.extend(children.into_iter().rev());
    }
    Some((root.start_position().row + 1, "syntax error"))
}

/// Returns `true` as soon as any pattern matches a node in any file.
///
/// Paths are processed strictly in order; files after the first match are
/// neither read nor parsed.
pub async fn find<S: AsRef<str>>(
    patterns: &[&dyn CodePattern],
    paths: &[S],
    project: &dyn Project,
) -> Result<bool, MigrationError> {
    for path in paths {
        let path = path.as_ref();
        let source = project.read(path).await?;
        if find_in_source(patterns, path, &source)? {
            debug!("Structural match in {}", path);
            return Ok(true);
        }
    }
    Ok(false)
}

/// Synchronous counterpart of [`find`] for one in-memory source.
pub fn find_in_source(
    patterns: &[&dyn CodePattern],
    path: &str,
    source: &str,
) -> Result<bool, MigrationError> {
    let tree = parse(path, source)?;
    let print = PrintOptions::default();
    let root = SyntaxNode::new(tree.root_node(), source, path, &print);
    Ok(patterns.iter().any(|pattern| lookup(*pattern, root)))
}

fn lookup(pattern: &dyn CodePattern, root: SyntaxNode<'_>) -> bool {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if pattern.filter(&node) {
            return true;
        }
        if pattern.recurse(&node) {
            stack.extend(node.children().into_iter().rev());
        }
    }
    false
}

/// Rewrites every match in every file and returns how many files changed.
///
/// At each node the first pattern (in declaration order) whose filter
/// accepts it wins; the node is replaced by its `map` output and its subtree
/// is not visited further. A file is written only when its text changed.
pub async fn replace<S: AsRef<str>>(
    patterns: &[&dyn CodePattern],
    paths: &[S],
    project: &dyn Project,
    options: &PrintOptions,
) -> Result<usize, MigrationError> {
    let mut changed = 0;
    for path in paths {
        let path = path.as_ref();
        let source = project.read(path).await?;
        if let Some(output) = replace_in_source(patterns, path, &source, options)? {
            project.write(path, &output).await?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// Synchronous counterpart of [`replace`] for one in-memory source.
///
/// Returns `None` when the text is unchanged.
pub fn replace_in_source(
    patterns: &[&dyn CodePattern],
    path: &str,
    source: &str,
    options: &PrintOptions,
) -> Result<Option<String>, MigrationError> {
    let tree = parse(path, source)?;
    let root = SyntaxNode::new(tree.root_node(), source, path, options);

    let mut rewriter = Rewriter {
        patterns,
        source,
        matches: 0,
    };
    let body = rewriter.rewrite(root);
    if rewriter.matches == 0 {
        return Ok(None);
    }

    let range = root.byte_range();
    let mut output = String::with_capacity(source.len());
    output.push_str(source.get(..range.start).unwrap_or_default());
    output.push_str(&body);
    output.push_str(source.get(range.end..).unwrap_or_default());

    debug!("Rewrote {} match(es) in {}", rewriter.matches, path);
    if output == source {
        Ok(None)
    } else {
        Ok(Some(output))
    }
}

struct Rewriter<'p> {
    patterns: &'p [&'p dyn CodePattern],
    source: &'p str,
    matches: usize,
}

impl Rewriter<'_> {
    fn rewrite<'t>(&mut self, node: SyntaxNode<'t>) -> Cow<'t, str> {
        if let Some(pattern) = self.patterns.iter().find(|pattern| pattern.filter(&node)) {
            self.matches += 1;
            return Cow::Owned(pattern.map(&node));
        }

        let range = node.byte_range();
        let mut output: Option<String> = None;
        let mut copied_to = range.start;
        for child in node.children() {
            if let Cow::Owned(text) = self.rewrite(child) {
                let child_range = child.byte_range();
                let buffer = output.get_or_insert_with(String::new);
                buffer.push_str(self.source.get(copied_to..child_range.start).unwrap_or_default());
                buffer.push_str(&text);
                copied_to = child_range.end;
            }
        }

        match output {
            Some(mut buffer) => {
                buffer.push_str(self.source.get(copied_to..range.end).unwrap_or_default());
                Cow::Owned(buffer)
            }
            None => Cow::Borrowed(node.text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{Call, MemoryProject};

    const TEST_FILE: &str = r#"import test from 'ava';
import {api} from '../../src/index.js';
export * from '../../src/index.js';
import {other} from './helpers.js';

test('api', (t) => {
	t.truthy(api);
});
"#;

    fn imports_source(module: &'static str) -> Pattern {
        Pattern::new(move |node| {
            (node.is("import_statement") || node.is("export_statement"))
                && node
                    .field("source")
                    .and_then(|source| source.string_value())
                    .is_some_and(|value| {
                        upstage_core::resolve_relative(node.path(), value) == module
                    })
        })
    }

    #[test]
    fn find_matches_imports_by_resolved_path() {
        let pattern = imports_source("./src/index.js");
        assert!(find_in_source(&[&pattern], "test/src/api.js", TEST_FILE).unwrap());

        let pattern = imports_source("./src/other.js");
        assert!(!find_in_source(&[&pattern], "test/src/api.js", TEST_FILE).unwrap());
    }

    #[test]
    fn recurse_false_prunes_subtree() {
        let pattern = Pattern::new(|node| node.is("call_expression"))
            .recurse(|node| node.is("program"))
            .map(|_| "skipped()".to_string());
        assert!(!find_in_source(&[&pattern], "a.js", TEST_FILE).unwrap());
        // Rewrites ignore `recurse`.
        let output = replace_in_source(&[&pattern], "a.js", TEST_FILE, &PrintOptions::default()).unwrap();
        assert!(output.is_some_and(|text| text.contains("skipped();")));

        let pattern = Pattern::new(|node| node.is("call_expression"));
        assert!(find_in_source(&[&pattern], "a.js", TEST_FILE).unwrap());
    }

    #[test]
    fn replace_rewrites_every_occurrence_in_one_pass() {
        let pattern = Pattern::new(|node| {
            node.is("string")
                && node.string_value() == Some("../../src/index.js")
                && node.parent().is_some_and(|p| p.is("import_statement") || p.is("export_statement"))
        })
        .map(|node| node.literal("#module"));

        let output = replace_in_source(&[&pattern], "test/src/api.js", TEST_FILE, &PrintOptions::single_quotes())
            .unwrap()
            .unwrap();
        assert_eq!(output.matches("'#module'").count(), 2);
        assert!(output.contains("import {other} from './helpers.js';"));
        assert!(output.contains("t.truthy(api);"));
        assert!(!output.contains("src/index.js"));
    }

    #[test]
    fn replace_with_identity_map_reports_unchanged() {
        let pattern = Pattern::new(|node| node.is("import_statement"));
        let output = replace_in_source(&[&pattern], "a.js", TEST_FILE, &PrintOptions::default()).unwrap();
        assert_eq!(output, None);
    }

    #[test]
    fn first_declared_pattern_wins() {
        let first = Pattern::new(|node| node.is("string") && node.string_value() == Some("ava"))
            .map(|node| node.literal("first"));
        let second = Pattern::new(|node| node.is("string")).map(|node| node.literal("second"));

        let output = replace_in_source(
            &[&first, &second],
            "a.js",
            "import test from 'ava';\n",
            &PrintOptions::single_quotes(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(output, "import test from 'first';\n");
    }

    #[test]
    fn syntax_errors_are_parse_failures() {
        let result = parse("broken.js", "import {a from 'b';\nconst = ;\n");
        assert!(matches!(result, Err(MigrationError::ParseFailure { .. })));

        let result = parse("notes.md", "# hello");
        match result {
            Err(MigrationError::ParseFailure { message, .. }) => assert_eq!(message, "unsupported file type"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn find_agrees_with_marking_replace() {
        fn marked(pattern: Pattern) -> Pattern {
            pattern.map(|node| format!("{}/*marked*/", node.text()))
        }
        let marking = [
            marked(Pattern::new(|node| node.is("import_statement"))),
            marked(Pattern::new(|node| node.is("string") && node.string_value() == Some("ava"))),
            marked(Pattern::new(|node| node.is("call_expression"))),
            marked(Pattern::new(|node| node.is("class_declaration"))),
            marked(imports_source("./src/index.js")),
        ];
        let sources = [
            ("test/src/api.js", TEST_FILE),
            ("a.js", "const a = 1;\n"),
            ("b.js", "class A {}\n"),
            ("c.js", "// nothing here\n"),
        ];

        let mut hits = 0;
        let mut misses = 0;
        for pattern in &marking {
            for (path, source) in sources {
                let patterns: [&dyn CodePattern; 1] = [pattern];
                let found = find_in_source(&patterns, path, source).unwrap();
                let rewritten = replace_in_source(&patterns, path, source, &PrintOptions::default()).unwrap();
                assert_eq!(found, rewritten.is_some(), "{path}");
                if found {
                    hits += 1;
                } else {
                    misses += 1;
                }
            }
        }
        assert!(hits > 0 && misses > 0);
    }

    #[test]
    fn parses_jsx_in_javascript() {
        let source = "const el = <div className=\"x\">hi</div>;\n";
        assert!(parse("src/app.js", source).is_ok());

        let pattern = Pattern::new(|node| node.is("jsx_element"));
        assert!(find_in_source(&[&pattern], "src/app.js", source).unwrap());
    }

    #[test]
    fn parses_other_grammars() {
        assert!(parse("src/lib.rs", "fn main() {}\n").is_ok());
        assert!(parse("tool.py", "def main():\n    return 1\n").is_ok());
    }

    #[tokio::test]
    async fn find_stops_reading_after_first_match() {
        let project = MemoryProject::new()
            .with_file("test/a.js", "const a = 1;\n")
            .with_file("test/b.js", "import x from 'ava';\n")
            .with_file("test/c.js", "import y from 'ava';\n");

        let pattern = Pattern::new(|node| node.is("import_statement"));
        let paths = ["test/a.js", "test/b.js", "test/c.js"];
        assert!(find(&[&pattern], &paths, &project).await.unwrap());

        let reads: Vec<_> = project
            .calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                Call::Read(path) => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(reads, vec!["test/a.js", "test/b.js"]);
    }

    #[tokio::test]
    async fn find_propagates_parse_failures() {
        let project = MemoryProject::new().with_file("a.js", "function (");
        let pattern = Pattern::new(|_| false);
        let result = find(&[&pattern], &["a.js"], &project).await;
        assert!(matches!(result, Err(MigrationError::ParseFailure { .. })));
    }

    #[tokio::test]
    async fn replace_writes_only_changed_files() {
        let project = MemoryProject::new()
            .with_file("a.js", "import x from 'babel';\n")
            .with_file("b.js", "const y = 2;\n");

        let pattern = Pattern::new(|node| node.is("string") && node.string_value() == Some("babel"))
            .map(|node| node.literal("core"));
        let changed = replace(&[&pattern], &["a.js", "b.js"], &project, &PrintOptions::single_quotes())
            .await
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(project.file("a.js").await.as_deref(), Some("import x from 'core';\n"));
        let writes: Vec<_> = project
            .calls()
            .await
            .into_iter()
            .filter(|call| matches!(call, Call::Write(_)))
            .collect();
        assert_eq!(writes, vec![Call::Write("a.js".to_string())]);
    }
}
