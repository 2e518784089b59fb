//! Document text and per-node character ranges.
//!
//! Every node covers a half-open range `[start, end)` of the document text.
//! Text nodes contribute their own characters, element nodes cover their
//! descendants, and an element without content children contributes a single
//! [`OBJECT_REPLACEMENT`] character so that empty elements (`<br>`, `<img>`,
//! `<hr>`) still own a position. Offsets are byte offsets into the UTF-8 text.

use std::collections::HashMap;
use std::ops::Range;

use thiserror::Error;

use crate::{DomTree, NodeId, NodeType};

/// Placeholder character occupied by elements without content children.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Failure to extract text for a range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    /// The range ends past the end of the document text, or is reversed.
    #[error("range {start}..{end} is outside the document text (length {len})")]
    OutOfBounds {
        /// Requested start offset.
        start: usize,
        /// Requested end offset.
        end: usize,
        /// Length of the document text.
        len: usize,
    },
    /// The range splits a multi-byte character.
    #[error("range {start}..{end} does not fall on character boundaries")]
    NotCharBoundary {
        /// Requested start offset.
        start: usize,
        /// Requested end offset.
        end: usize,
    },
}

/// The linearised text of a document plus the range each node covers.
///
/// Built once per tree shape with [`DocumentText::index`]; rebuild it after
/// mutating the tree.
#[derive(Debug, Clone, Default)]
pub struct DocumentText {
    text: String,
    ranges: HashMap<NodeId, Range<usize>>,
}

impl DocumentText {
    /// Walk the tree from the document node and record every node's range.
    #[must_use]
    pub fn index(tree: &DomTree) -> Self {
        let mut index = Self::default();
        index.visit(tree, tree.root());
        index
    }

    /// Assemble an index from precomputed parts.
    ///
    /// The caller vouches that `ranges` agree with `text`; box construction
    /// treats any disagreement as a fatal error.
    #[must_use]
    pub const fn from_parts(text: String, ranges: HashMap<NodeId, Range<usize>>) -> Self {
        Self { text, ranges }
    }

    fn visit(&mut self, tree: &DomTree, id: NodeId) {
        let start = self.text.len();
        match tree.node_type(id) {
            Some(NodeType::Text(text)) => self.text.push_str(text),
            Some(NodeType::Element(_)) if tree.content_children(id).next().is_none() => {
                self.text.push(OBJECT_REPLACEMENT);
            }
            Some(NodeType::Element(_) | NodeType::Document) => {
                for &child in tree.children(id) {
                    self.visit(tree, child);
                }
            }
            Some(NodeType::Comment(_)) | None => {}
        }
        let _ = self.ranges.insert(id, start..self.text.len());
    }

    /// The range covered by `id`, if the node was attached when indexed.
    #[must_use]
    pub fn range_of(&self, id: NodeId) -> Option<Range<usize>> {
        self.ranges.get(&id).cloned()
    }

    /// Total length of the document text.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the document has no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Extract the text of `range`.
    ///
    /// # Errors
    ///
    /// Returns [`TextError`] if the range is reversed, ends past the text, or
    /// splits a character.
    pub fn extract(&self, range: Range<usize>) -> Result<&str, TextError> {
        let Range { start, end } = range;
        if start > end || end > self.text.len() {
            return Err(TextError::OutOfBounds {
                start,
                end,
                len: self.text.len(),
            });
        }
        self.text
            .get(start..end)
            .ok_or(TextError::NotCharBoundary { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementData;

    #[test]
    fn test_text_and_empty_elements_get_ranges() {
        let mut tree = DomTree::new();
        let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
        let text = tree.append_text(div, "ab");
        let br = tree.append_element(div, ElementData::new("br"));

        let index = DocumentText::index(&tree);

        assert_eq!(index.range_of(text), Some(0..2));
        assert_eq!(index.range_of(br), Some(2..2 + OBJECT_REPLACEMENT.len_utf8()));
        assert_eq!(index.range_of(div), Some(0..index.len()));
        assert_eq!(index.range_of(NodeId::ROOT), Some(0..index.len()));
    }

    #[test]
    fn test_comments_take_no_space() {
        let mut tree = DomTree::new();
        let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
        let comment = tree.alloc(NodeType::Comment("note".to_string()));
        tree.append_child(div, comment);
        let text = tree.append_text(div, "x");

        let index = DocumentText::index(&tree);

        assert_eq!(index.range_of(comment), Some(0..0));
        assert_eq!(index.range_of(text), Some(0..1));
    }

    #[test]
    fn test_extract_rejects_bad_ranges() {
        let mut tree = DomTree::new();
        let _ = tree.append_text(NodeId::ROOT, "héllo");
        let index = DocumentText::index(&tree);

        assert_eq!(index.extract(0..1), Ok("h"));
        assert!(matches!(
            index.extract(0..100),
            Err(TextError::OutOfBounds { .. })
        ));
        assert_eq!(
            index.extract(0..2),
            Err(TextError::NotCharBoundary { start: 0, end: 2 })
        );
    }
}
