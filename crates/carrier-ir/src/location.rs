//! Where declarations and expressions come from.

use std::collections::HashMap;

use cranelift_entity::PrimaryMap;

use crate::refs::PathRef;

/// Byte range within a source file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Source position of a declaration or expression.
///
/// Nodes synthesized by a pass reuse the location of the node they adapt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: PathRef,
    pub span: Span,
}

impl Location {
    pub const fn new(path: PathRef, span: Span) -> Self {
        Self { path, span }
    }

    /// The empty span at the top of `path`.
    pub const fn file(path: PathRef) -> Self {
        Self::new(path, Span::new(0, 0))
    }
}

/// Source file paths of a context, each stored once.
#[derive(Default)]
pub struct PathInterner {
    paths: PrimaryMap<PathRef, String>,
    lookup: HashMap<String, PathRef>,
}

impl PathInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, path: &str) -> PathRef {
        if let Some(&known) = self.lookup.get(path) {
            return known;
        }
        let r = self.paths.push(path.to_owned());
        self.lookup.insert(path.to_owned(), r);
        r
    }

    pub fn resolve(&self, r: PathRef) -> &str {
        &self.paths[r]
    }
}
