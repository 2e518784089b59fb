//! Everything a build reads: the content tree, its text index, styles,
//! factories, metrics and options.
//!
//! Box construction never mutates any of these. Anonymous nodes are the one
//! kind of content that exists only inside a build; [`ContentNode`] lets the
//! rest of the crate treat them and real tree nodes uniformly.

use std::ops::Range;

use tessera_dom::{DocumentText, DomTree, NodeId, NodeType};
use tessera_style::{DisplayValue, StyleMap, StyleRecord};

use crate::config::BuildOptions;
use crate::error::BuildError;
use crate::factory::FactoryRegistry;
use crate::section::WrapperConvention;

/// Default font size in px.
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-width)
///
/// "...then the used value of 'width' becomes 300px."
pub const DEFAULT_REPLACED_WIDTH: f32 = 300.0;

/// [§ 10.6.2 Inline replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-height)
///
/// "...the used value of 'height' must be set to the height of the largest
/// rectangle that has a 2:1 ratio, has a height not greater than 150px..."
pub const DEFAULT_REPLACED_HEIGHT: f32 = 150.0;

/// Trait for measuring the extent of leaf content.
///
/// Abstracting this lets tests run without real fonts, and lets embedders
/// plug in shaping-aware measurement.
pub trait SpanMetrics {
    /// Measure the width of a text string at the given font size.
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    /// Get the line height for the given font size.
    fn line_height(&self, font_size: f32) -> f32;

    /// Intrinsic `(width, height)` of an opaque replaced leaf.
    fn replaced_size(&self) -> (f32, f32) {
        (DEFAULT_REPLACED_WIDTH, DEFAULT_REPLACED_HEIGHT)
    }
}

/// Approximate metrics for when no real font is available.
///
/// Uses a fixed average character width of 0.6 × `font_size` and a line
/// height of 1.2 × `font_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl SpanMetrics for ApproximateMetrics {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.6
    }

    fn line_height(&self, font_size: f32) -> f32 {
        font_size * 1.2
    }
}

static APPROXIMATE: ApproximateMetrics = ApproximateMetrics;

/// A synthesized block wrapping a run of inline siblings.
///
/// [§ 9.2.1.1 Anonymous block boxes](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level)
///
/// "if a block container box has a block-level box inside it, then we force
/// it to have only block-level boxes inside it." The run it wraps no longer
/// appears in the normalized child list; it is reachable only through here.
#[derive(Debug, Clone, PartialEq)]
pub struct AnonymousNode {
    parent: NodeId,
    children: Vec<NodeId>,
    style: StyleRecord,
}

impl AnonymousNode {
    /// Wrap `children` (a non-empty inline run of `parent`).
    #[must_use]
    pub fn new(parent: NodeId, children: Vec<NodeId>, visible: bool) -> Self {
        Self {
            parent,
            children,
            style: StyleRecord::anonymous_block(visible),
        }
    }

    /// The node whose children were wrapped.
    #[must_use]
    pub const fn parent(&self) -> NodeId {
        self.parent
    }

    /// The wrapped run, in document order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The synthesized style (`display: block`, anonymous).
    #[must_use]
    pub const fn style(&self) -> &StyleRecord {
        &self.style
    }
}

/// A node box construction can visit: a tree node or an anonymous wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    /// A node of the content tree.
    Dom(NodeId),
    /// A wrapper synthesized by normalization.
    Anonymous(AnonymousNode),
}

impl ContentNode {
    /// The tree node, or for an anonymous wrapper the node whose children it
    /// wraps.
    #[must_use]
    pub const fn owner(&self) -> NodeId {
        match self {
            Self::Dom(id) => *id,
            Self::Anonymous(anon) => anon.parent,
        }
    }

    /// The tree node, if this is not anonymous.
    #[must_use]
    pub const fn dom_id(&self) -> Option<NodeId> {
        match self {
            Self::Dom(id) => Some(*id),
            Self::Anonymous(_) => None,
        }
    }

    /// Returns true for anonymous wrappers.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous(_))
    }

    /// How many entries of the un-normalized sibling list this node stands
    /// for.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        match self {
            Self::Dom(_) => 1,
            Self::Anonymous(anon) => anon.children.len(),
        }
    }

    /// Returns true if `id` is this node or lies inside it.
    #[must_use]
    pub fn contains(&self, tree: &DomTree, id: NodeId) -> bool {
        match self {
            Self::Dom(own) => tree.is_inclusive_descendant_of(id, *own),
            Self::Anonymous(anon) => anon
                .children
                .iter()
                .any(|&child| tree.is_inclusive_descendant_of(id, child)),
        }
    }
}

impl From<NodeId> for ContentNode {
    fn from(id: NodeId) -> Self {
        Self::Dom(id)
    }
}

/// What sort of content a [`ContentNode`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node.
    Document,
    /// An element.
    Element,
    /// A text node.
    Text,
    /// A comment (never generates boxes).
    Comment,
    /// A synthesized anonymous wrapper.
    Anonymous,
}

/// Read-only inputs shared by every step of one build.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    tree: &'a DomTree,
    text: &'a DocumentText,
    styles: &'a StyleMap,
    factories: &'a FactoryRegistry,
    options: &'a BuildOptions,
    metrics: &'a dyn SpanMetrics,
    wrapper: &'a dyn WrapperConvention,
}

impl<'a> BuildContext<'a> {
    /// Bundle the inputs of a build, with approximate metrics and the wrapper
    /// convention selected by `options`.
    #[must_use]
    pub fn new(
        tree: &'a DomTree,
        text: &'a DocumentText,
        styles: &'a StyleMap,
        factories: &'a FactoryRegistry,
        options: &'a BuildOptions,
    ) -> Self {
        Self {
            tree,
            text,
            styles,
            factories,
            options,
            metrics: &APPROXIMATE,
            wrapper: options.wrapper.convention(),
        }
    }

    /// Builder: measure leaves with `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: &'a dyn SpanMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builder: flatten section content with a custom wrapper convention.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: &'a dyn WrapperConvention) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// The content tree.
    #[must_use]
    pub const fn tree(&self) -> &'a DomTree {
        self.tree
    }

    /// The text index.
    #[must_use]
    pub const fn text(&self) -> &'a DocumentText {
        self.text
    }

    /// The factory registry.
    #[must_use]
    pub const fn factories(&self) -> &'a FactoryRegistry {
        self.factories
    }

    /// The build options.
    #[must_use]
    pub const fn options(&self) -> &'a BuildOptions {
        self.options
    }

    /// Leaf measurement.
    #[must_use]
    pub fn metrics(&self) -> &'a dyn SpanMetrics {
        self.metrics
    }

    /// The wrapper convention the section root uses.
    #[must_use]
    pub fn wrapper(&self) -> &'a dyn WrapperConvention {
        self.wrapper
    }

    /// Whether the document is laid out for paged media.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.options.paged
    }

    /// Classify `node`.
    #[must_use]
    pub fn kind(&self, node: &ContentNode) -> Option<NodeKind> {
        let ContentNode::Dom(id) = node else {
            return Some(NodeKind::Anonymous);
        };
        Some(match self.tree.node_type(*id)? {
            NodeType::Document => NodeKind::Document,
            NodeType::Element(_) => NodeKind::Element,
            NodeType::Text(_) => NodeKind::Text,
            NodeType::Comment(_) => NodeKind::Comment,
        })
    }

    /// The recorded style of `node`, if any. Anonymous wrappers always have
    /// one; text nodes normally do not.
    #[must_use]
    pub fn style<'n>(&'n self, node: &'n ContentNode) -> Option<&'n StyleRecord> {
        match node {
            ContentNode::Dom(id) => self.styles.get(*id),
            ContentNode::Anonymous(anon) => Some(&anon.style),
        }
    }

    /// The style of `node`, falling back to the initial style.
    ///
    /// Elements without a recorded style fall back to `display: block`, which
    /// is how the classifier treats them.
    #[must_use]
    pub fn resolved_style(&self, node: &ContentNode) -> StyleRecord {
        if let Some(style) = self.style(node) {
            return style.clone();
        }
        match self.kind(node) {
            Some(NodeKind::Text) => StyleRecord::default(),
            _ => StyleRecord::new(DisplayValue::Block),
        }
    }

    /// The content children of `node`, comments excluded.
    #[must_use]
    pub fn children(&self, node: &ContentNode) -> Vec<ContentNode> {
        match node {
            ContentNode::Dom(id) => self.tree.content_children(*id).map(ContentNode::Dom).collect(),
            ContentNode::Anonymous(anon) => {
                anon.children.iter().copied().map(ContentNode::Dom).collect()
            }
        }
    }

    /// The character range covered by `node`.
    ///
    /// An anonymous wrapper covers its first child's start through its last
    /// child's end.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingNode`] if a node is not in the text index.
    pub fn range(&self, node: &ContentNode) -> Result<Range<usize>, BuildError> {
        match node {
            ContentNode::Dom(id) => self.dom_range(*id),
            ContentNode::Anonymous(anon) => {
                let (Some(&first), Some(&last)) = (anon.children.first(), anon.children.last())
                else {
                    return Ok(0..0);
                };
                Ok(self.dom_range(first)?.start..self.dom_range(last)?.end)
            }
        }
    }

    fn dom_range(&self, id: NodeId) -> Result<Range<usize>, BuildError> {
        self.text.range_of(id).ok_or(BuildError::MissingNode(id))
    }

    /// The text covered by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the node is not indexed or its range cannot
    /// be extracted.
    pub fn text_of(&self, id: NodeId) -> Result<&'a str, BuildError> {
        let range = self.dom_range(id)?;
        self.text
            .extract(range)
            .map_err(|source| BuildError::Text { node: id, source })
    }

    /// The namespace `node` belongs to: its style's namespace, else the
    /// element's own, else the one implied by the document media type.
    #[must_use]
    pub fn namespace_of(&self, node: &ContentNode) -> Option<&'a str> {
        if let ContentNode::Dom(id) = node {
            if let Some(ns) = self.styles.get(*id).and_then(|s| s.namespace.as_deref()) {
                return Some(ns);
            }
            if let Some(ns) = self.tree.as_element(*id).and_then(|e| e.namespace.as_deref()) {
                return Some(ns);
            }
        }
        self.options.default_namespace()
    }
}
