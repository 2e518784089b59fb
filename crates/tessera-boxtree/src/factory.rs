//! Box factories: which box a content node generates.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! A factory maps one content node to a box, or declines with `None` when the
//! node should not produce a single box of its own (an inline element whose
//! children belong directly to the enclosing line). Factories are shared
//! through `Rc` and looked up by namespace, so a document can embed foreign
//! content (SVG, MathML) handled by a different factory.

use std::collections::HashMap;
use std::rc::Rc;

use tessera_dom::namespace;
use tessera_style::DisplayValue;

use crate::classify::classify_children;
use crate::context::{BuildContext, ContentNode, NodeKind};
use crate::error::BuildError;
use crate::layout_box::{BoxKind, LayoutBox};

/// Attribute that requests an explicit page break at an element.
pub const PAGE_BREAK_ATTRIBUTE: &str = "data-page-break";

/// Turns content nodes into boxes.
pub trait BoxFactory {
    /// A short name for diagnostics.
    fn name(&self) -> &str;

    /// Create the box for `node`.
    ///
    /// With `allow_multiple` set, the factory may return `None` to say the
    /// node's children should be boxed in its place. Without it, the result
    /// is always `Some`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the node's text or range cannot be read.
    fn create_box(
        &self,
        cx: &BuildContext<'_>,
        node: &ContentNode,
        allow_multiple: bool,
    ) -> Result<Option<LayoutBox>, BuildError>;

    /// Create exactly one box for `node`.
    ///
    /// # Errors
    ///
    /// See [`BoxFactory::create_box`].
    fn create(&self, cx: &BuildContext<'_>, node: &ContentNode) -> Result<LayoutBox, BuildError> {
        match self.create_box(cx, node, false)? {
            Some(created) => Ok(created),
            None => LayoutBox::leaf(cx, BoxKind::Inline, node.clone()),
        }
    }

    /// Append the boxes for `node` to `out`, expanding nodes that decline a
    /// box of their own into their children, recursively.
    ///
    /// # Errors
    ///
    /// See [`BoxFactory::create_box`].
    fn create_all(
        &self,
        cx: &BuildContext<'_>,
        node: &ContentNode,
        out: &mut Vec<LayoutBox>,
    ) -> Result<(), BuildError> {
        if let Some(created) = self.create_box(cx, node, true)? {
            out.push(created);
            return Ok(());
        }
        for child in cx.children(node) {
            self.create_all(cx, &child, out)?;
        }
        Ok(())
    }
}

/// Factories by namespace, plus the default used for the document root.
pub struct FactoryRegistry {
    default: Rc<dyn BoxFactory>,
    by_namespace: HashMap<String, Rc<dyn BoxFactory>>,
}

impl FactoryRegistry {
    /// A registry whose default is `factory`, also registered for XHTML.
    #[must_use]
    pub fn with_default(factory: Rc<dyn BoxFactory>) -> Self {
        let mut by_namespace = HashMap::new();
        let _ = by_namespace.insert(namespace::XHTML.to_string(), Rc::clone(&factory));
        Self {
            default: factory,
            by_namespace,
        }
    }

    /// The standard set: [`HtmlBoxFactory`] as default and for XHTML, and a
    /// [`ReplacedBoxFactory`] each for SVG and MathML.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::with_default(Rc::new(HtmlBoxFactory::new()));
        registry.register(namespace::SVG, Rc::new(ReplacedBoxFactory::new(namespace::SVG)));
        registry.register(
            namespace::MATHML,
            Rc::new(ReplacedBoxFactory::new(namespace::MATHML)),
        );
        registry
    }

    /// Register (or replace) the factory for `namespace`.
    pub fn register(&mut self, namespace: &str, factory: Rc<dyn BoxFactory>) {
        let _ = self.by_namespace.insert(namespace.to_string(), factory);
    }

    /// The factory registered for `namespace`.
    #[must_use]
    pub fn for_namespace(&self, namespace: &str) -> Option<&Rc<dyn BoxFactory>> {
        self.by_namespace.get(namespace)
    }

    /// The factory that builds the document root.
    #[must_use]
    pub fn default_factory(&self) -> &Rc<dyn BoxFactory> {
        &self.default
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Returns true if `candidate` is the very factory object `current`.
fn is_same_factory(candidate: &Rc<dyn BoxFactory>, current: &dyn BoxFactory) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(candidate), std::ptr::from_ref(current))
}

/// The default factory for HTML content.
///
/// Dispatch order, first match wins:
///
/// 1. the document node becomes a section root;
/// 2. text becomes an inline leaf;
/// 3. hidden or `display: none` content becomes an invisible box;
/// 4. a node in a namespace with a different registered factory is handed to
///    that factory;
/// 5. an element carrying the page-break attribute becomes a page break;
/// 6. a non-inline node whose children are all inline becomes a paragraph
///    (table rows excepted, tables build those);
/// 7. block-level displays map to their box kinds;
/// 8. anything else declines (when allowed) or becomes an inline leaf.
#[derive(Debug, Clone)]
pub struct HtmlBoxFactory {
    page_break_attribute: String,
}

impl HtmlBoxFactory {
    /// A factory honouring [`PAGE_BREAK_ATTRIBUTE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_break_attribute(PAGE_BREAK_ATTRIBUTE)
    }

    /// A factory that treats `attribute` as the page-break request.
    #[must_use]
    pub fn with_page_break_attribute(attribute: &str) -> Self {
        Self {
            page_break_attribute: attribute.to_string(),
        }
    }

    fn requests_page_break(&self, cx: &BuildContext<'_>, node: &ContentNode) -> bool {
        node.dom_id()
            .and_then(|id| cx.tree().as_element(id))
            .is_some_and(|element| element.has_attr(&self.page_break_attribute))
    }

    fn composite(
        &self,
        cx: &BuildContext<'_>,
        kind: BoxKind,
        node: &ContentNode,
    ) -> Result<LayoutBox, BuildError> {
        let mut composite = LayoutBox::composite(cx, kind, node.clone())?;
        composite.populate(cx, Some(self))?;
        Ok(composite)
    }
}

impl Default for HtmlBoxFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxFactory for HtmlBoxFactory {
    fn name(&self) -> &str {
        "html"
    }

    fn create_box(
        &self,
        cx: &BuildContext<'_>,
        node: &ContentNode,
        allow_multiple: bool,
    ) -> Result<Option<LayoutBox>, BuildError> {
        let kind = cx.kind(node);
        let style = cx.resolved_style(node);

        // STEP 1: The document itself.
        if kind == Some(NodeKind::Document) {
            log::trace!(target: "tessera::factory", "node {} -> Section", node.owner().0);
            return LayoutBox::section(cx, node.clone(), self).map(Some);
        }

        // STEP 2: Text is never delegated.
        if kind == Some(NodeKind::Text) {
            return LayoutBox::leaf(cx, BoxKind::Inline, node.clone()).map(Some);
        }

        // STEP 3: [§ 11.2 Visibility](https://www.w3.org/TR/CSS2/visufx.html#visibility)
        //
        // "hidden: The generated box is invisible (fully transparent, nothing
        // is drawn), but still affects layout." Hidden content here takes no
        // span; `display: none` never generates a visible box at all.
        if !style.is_rendered() {
            return LayoutBox::leaf(cx, BoxKind::Invisible, node.clone()).map(Some);
        }

        // STEP 4: Hand foreign content to its own factory.
        if let Some(delegate) = cx
            .namespace_of(node)
            .and_then(|ns| cx.factories().for_namespace(ns))
            .filter(|delegate| !is_same_factory(delegate, self))
        {
            log::debug!(
                target: "tessera::factory",
                "node {} delegated to the {} factory",
                node.owner().0,
                delegate.name()
            );
            return delegate.create_box(cx, node, allow_multiple);
        }

        // STEP 5: Explicit page break.
        if self.requests_page_break(cx, node) {
            return LayoutBox::leaf(cx, BoxKind::PageBreak, node.clone()).map(Some);
        }

        // STEP 6: [§ 9.2.1 Block-level elements and block boxes](https://www.w3.org/TR/CSS2/visuren.html#block-boxes)
        //
        // "a block container box either contains only block-level boxes or
        // establishes an inline formatting context and thus contains only
        // inline-level boxes."
        let inline_self = kind == Some(NodeKind::Element) && style.display == DisplayValue::Inline;
        if !inline_self && style.display != DisplayValue::TableRow {
            let children = classify_children(cx, &cx.children(node));
            if children.has_inline && !children.has_block {
                log::trace!(target: "tessera::factory", "node {} -> Paragraph", node.owner().0);
                return self.composite(cx, BoxKind::Paragraph, node).map(Some);
            }
        }

        // STEP 7: Block-level displays.
        let block_kind = match style.display {
            DisplayValue::Block => Some(BoxKind::Block),
            DisplayValue::ListItem => Some(BoxKind::ListItem),
            DisplayValue::Table => Some(BoxKind::Table),
            DisplayValue::TableCell => Some(BoxKind::TableCell),
            DisplayValue::None => {
                return LayoutBox::leaf(cx, BoxKind::Invisible, node.clone()).map(Some);
            }
            DisplayValue::Inline | DisplayValue::TableRow => None,
        };
        if let Some(block_kind) = block_kind {
            log::trace!(
                target: "tessera::factory",
                "node {} -> {}",
                node.owner().0,
                block_kind.name()
            );
            return self.composite(cx, block_kind, node).map(Some);
        }

        // STEP 8: Inline content.
        if allow_multiple {
            return Ok(None);
        }
        LayoutBox::leaf(cx, BoxKind::Inline, node.clone()).map(Some)
    }
}

/// Renders every node of a foreign namespace as one opaque leaf.
///
/// [§ 10.3.2 Inline, replaced elements](https://www.w3.org/TR/CSS2/visudet.html#inline-replaced-width)
///
/// The subtree is not boxed further; its size comes from
/// [`crate::SpanMetrics::replaced_size`].
#[derive(Debug, Clone)]
pub struct ReplacedBoxFactory {
    namespace: String,
}

impl ReplacedBoxFactory {
    /// A factory for content in `namespace`.
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }

    /// The namespace this factory renders.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl BoxFactory for ReplacedBoxFactory {
    fn name(&self) -> &str {
        "replaced"
    }

    fn create_box(
        &self,
        cx: &BuildContext<'_>,
        node: &ContentNode,
        _allow_multiple: bool,
    ) -> Result<Option<LayoutBox>, BuildError> {
        let kind = if cx.resolved_style(node).is_rendered() {
            BoxKind::Replaced
        } else {
            BoxKind::Invisible
        };
        LayoutBox::leaf(cx, kind, node.clone()).map(Some)
    }
}

/// Build the box tree of the whole document with the registry's default
/// factory.
///
/// # Errors
///
/// Returns [`BuildError`] if the text index disagrees with the tree.
pub fn build_box_tree(cx: &BuildContext<'_>) -> Result<LayoutBox, BuildError> {
    let root = ContentNode::Dom(cx.tree().root());
    cx.factories().default_factory().create(cx, &root)
}
