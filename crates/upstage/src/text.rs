//! Textual pattern engine for files that are not parsed as code.
//!
//! Needles are either literal substrings ([`MatchMethod::Exact`]) or regular
//! expressions ([`MatchMethod::Regex`]). Replacements are literal text or a
//! producer invoked with the match and its capture groups.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use upstage_core::{MigrationError, Project};

/// How needles are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Literal substring.
    #[default]
    Exact,
    /// Regular expression (`regex` crate syntax).
    Regex,
}

/// Which occurrences are replaced in each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaceScope {
    /// Only the first occurrence.
    First,
    /// Every occurrence.
    #[default]
    All,
}

/// Options for [`find`] and [`replace`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOptions {
    /// How needles are interpreted
    #[serde(default)]
    pub method: MatchMethod,
    /// Which occurrences are replaced
    #[serde(default)]
    pub scope: ReplaceScope,
}

impl TextOptions {
    /// Literal needles, every occurrence.
    pub fn exact() -> Self {
        Self::default()
    }

    /// Regular expression needles, every occurrence.
    pub fn regex() -> Self {
        Self {
            method: MatchMethod::Regex,
            scope: ReplaceScope::All,
        }
    }

    /// Restricts replacement to the first occurrence per file.
    pub fn first_only(mut self) -> Self {
        self.scope = ReplaceScope::First;
        self
    }
}

/// One occurrence handed to a replacement producer.
#[derive(Debug, Clone, Copy)]
pub struct TextMatch<'h> {
    captures: &'h Captures<'h>,
}

impl<'h> TextMatch<'h> {
    /// The whole matched text.
    pub fn as_str(&self) -> &'h str {
        self.captures.get(0).map_or("", |m| m.as_str())
    }

    /// A numbered capture group (regex needles only).
    pub fn group(&self, index: usize) -> Option<&'h str> {
        self.captures.get(index).map(|m| m.as_str())
    }

    /// A named capture group (regex needles only).
    pub fn name(&self, name: &str) -> Option<&'h str> {
        self.captures.name(name).map(|m| m.as_str())
    }
}

type Producer = Box<dyn Fn(&TextMatch<'_>) -> String + Send + Sync>;

/// Replacement text for a [`TextPattern`].
pub enum Replacement {
    /// Literal text. With regex needles `$1` / `${name}` are expanded.
    Literal(String),
    /// Computed from the match.
    Producer(Producer),
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Replacement::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// A needle and what replaces it.
///
/// ```
/// use upstage::text::TextPattern;
///
/// let badge = TextPattern::literal("workflows/ci:test.yml", "workflows/ci.yml");
/// let version = TextPattern::with(r"v(\d+)", |m| format!("v{}", m.group(1).unwrap_or("0").parse::<u32>().unwrap_or(0) + 1));
/// # let _ = (badge, version);
/// ```
#[derive(Debug)]
pub struct TextPattern {
    needle: String,
    replacement: Replacement,
}

impl TextPattern {
    /// Replaces `needle` with literal text.
    pub fn literal(needle: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            replacement: Replacement::Literal(replacement.into()),
        }
    }

    /// Replaces `needle` with the output of `producer`.
    pub fn with<F>(needle: impl Into<String>, producer: F) -> Self
    where
        F: Fn(&TextMatch<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            needle: needle.into(),
            replacement: Replacement::Producer(Box::new(producer)),
        }
    }

    /// The needle.
    pub fn needle(&self) -> &str {
        &self.needle
    }
}

fn compile(needle: &str, method: MatchMethod) -> Result<Regex, MigrationError> {
    let source = match method {
        MatchMethod::Exact => regex::escape(needle),
        MatchMethod::Regex => needle.to_string(),
    };
    Regex::new(&source).map_err(|e| MigrationError::InvalidPattern(format!("{needle}: {e}")))
}

/// Returns `true` as soon as any needle occurs in any file.
///
/// Files after the first hit are not read.
pub async fn find<N: AsRef<str>, S: AsRef<str>>(
    needles: &[N],
    paths: &[S],
    project: &dyn Project,
    method: MatchMethod,
) -> Result<bool, MigrationError> {
    let compiled = needles
        .iter()
        .map(|needle| compile(needle.as_ref(), method))
        .collect::<Result<Vec<_>, _>>()?;

    for path in paths {
        let path = path.as_ref();
        let text = project.read(path).await?;
        if compiled.iter().any(|regex| regex.is_match(&text)) {
            debug!("Text match in {}", path);
            return Ok(true);
        }
    }
    Ok(false)
}

/// Applies every pattern, in order, to every file and returns how many files changed.
///
/// A file is written only when its text changed.
pub async fn replace<S: AsRef<str>>(
    patterns: &[TextPattern],
    paths: &[S],
    project: &dyn Project,
    options: TextOptions,
) -> Result<usize, MigrationError> {
    let compiled = patterns
        .iter()
        .map(|pattern| Ok((compile(&pattern.needle, options.method)?, &pattern.replacement)))
        .collect::<Result<Vec<_>, MigrationError>>()?;

    let mut changed = 0;
    for path in paths {
        let path = path.as_ref();
        let original = project.read(path).await?;
        let mut text = original.clone();
        for (regex, replacement) in &compiled {
            text = substitute(regex, replacement, &text, options);
        }
        if text != original {
            project.write(path, &text).await?;
            changed += 1;
            debug!("Rewrote text in {}", path);
        }
    }
    Ok(changed)
}

fn substitute(regex: &Regex, replacement: &Replacement, text: &str, options: TextOptions) -> String {
    let limit = match options.scope {
        ReplaceScope::First => 1,
        ReplaceScope::All => 0,
    };
    regex
        .replacen(text, limit, |captures: &Captures<'_>| match replacement {
            Replacement::Literal(literal) => match options.method {
                MatchMethod::Exact => literal.clone(),
                MatchMethod::Regex => {
                    let mut expanded = String::new();
                    captures.expand(literal, &mut expanded);
                    expanded
                }
            },
            Replacement::Producer(producer) => producer(&TextMatch { captures }),
        })
        .into_owned()
}
