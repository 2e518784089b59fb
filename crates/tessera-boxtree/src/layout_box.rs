//! Box types: leaves, composites and fragments.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)
//!
//! A [`LayoutBox`] is the unit the layout engine consumes. It refers back to
//! the content node that generated it and covers a half-open character range
//! of the document text. Composite boxes tile their children along one axis
//! and own them; fragments are slices of a composite produced by
//! [`crate::fragment`] and refer to their whole box by [`BoxId`] only.

use std::borrow::Cow;
use std::cell::OnceCell;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use strum_macros::IntoStaticStr;
use tessera_dom::{NodeId, StructuralChange};
use tessera_style::{ColorValue, DisplayValue, EdgeSizes, StyleRecord};

use crate::anonymous::normalize;
use crate::context::{BuildContext, ContentNode, DEFAULT_FONT_SIZE};
use crate::error::BuildError;
use crate::factory::BoxFactory;
use crate::section::{self, SectionState};

static NEXT_BOX_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a box.
///
/// Fragments get fresh ids; a box returned unchanged by a fragmentation
/// request keeps its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BoxId(u64);

impl BoxId {
    fn next() -> Self {
        Self(NEXT_BOX_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    /// Horizontal (inline direction in horizontal writing modes).
    X,
    /// Vertical (block direction in horizontal writing modes).
    Y,
}

impl Axis {
    /// The other axis.
    #[must_use]
    pub const fn perpendicular(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

/// What a box is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
pub enum BoxKind {
    /// Root of a document section, flattening the document's subtrees.
    Section {
        /// Laid out for paged media.
        paged: bool,
    },
    /// Block container.
    Block,
    /// [§ 12.5 Lists](https://www.w3.org/TR/CSS2/generate.html#lists)
    ListItem,
    /// [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
    Table,
    /// A row of cells, tiled horizontally.
    TableRow,
    /// A table cell.
    TableCell,
    /// A block whose children are all inline, tiled horizontally.
    Paragraph,
    /// Text, or an inline element taken as one unit.
    Inline,
    /// Foreign content rendered as one opaque object.
    Replaced,
    /// An explicit page break.
    PageBreak,
    /// Content that takes no space: `display: none`, `visibility: hidden`,
    /// or whitespace-only anonymous runs.
    Invisible,
}

impl BoxKind {
    /// The axis composite kinds tile their children along; `None` for leaves.
    #[must_use]
    pub const fn tiling_axis(self) -> Option<Axis> {
        match self {
            Self::Section { .. } | Self::Block | Self::ListItem | Self::Table | Self::TableCell => {
                Some(Axis::Y)
            }
            Self::Paragraph | Self::TableRow => Some(Axis::X),
            Self::Inline | Self::Replaced | Self::PageBreak | Self::Invisible => None,
        }
    }

    /// Returns true for kinds that own children.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        self.tiling_axis().is_some()
    }

    /// A short name for diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A non-owning reference to the box a fragment was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WholeRef {
    /// Identity of the whole box.
    pub id: BoxId,
    /// Range the whole box covered when the fragment was made.
    pub range: Range<usize>,
}

/// Whether a box is whole or a slice of another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxState {
    /// An ordinary box.
    Whole,
    /// [§ 1 Fragmentation](https://www.w3.org/TR/css-break-3/#fragmentation-model)
    ///
    /// "A box fragment is the portion of a box that belongs to exactly one
    /// fragment."
    Fragment {
        /// The fragment includes the whole box's start.
        first: bool,
        /// The fragment includes the whole box's end.
        last: bool,
        /// The box this fragment is part of.
        whole: WholeRef,
    },
}

/// Cached geometry of a composite box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Margin plus padding on each edge.
    pub insets: EdgeSizes,
    /// Background to paint, if any.
    pub background: Option<ColorValue>,
}

/// A node of the box tree.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    id: BoxId,
    kind: BoxKind,
    node: ContentNode,
    range: Range<usize>,
    style: StyleRecord,
    children: Vec<LayoutBox>,
    /// Measured `(width, height)` of a leaf.
    intrinsic: (f32, f32),
    geometry: OnceCell<Geometry>,
    state: BoxState,
    section: Option<SectionState>,
}

impl LayoutBox {
    fn with_parts(kind: BoxKind, node: ContentNode, range: Range<usize>, style: StyleRecord) -> Self {
        Self {
            id: BoxId::next(),
            kind,
            node,
            range,
            style,
            children: Vec::new(),
            intrinsic: (0.0, 0.0),
            geometry: OnceCell::new(),
            state: BoxState::Whole,
            section: None,
        }
    }

    /// Create a leaf of `kind` for `node`, measuring its content.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the node's range or text cannot be read.
    pub fn leaf(cx: &BuildContext<'_>, kind: BoxKind, node: ContentNode) -> Result<Self, BuildError> {
        let range = cx.range(&node)?;
        let style = cx.resolved_style(&node);
        let mut leaf = Self::with_parts(kind, node, range, style);
        leaf.intrinsic = leaf.measure(cx)?;
        Ok(leaf)
    }

    /// Create a childless composite of `kind` for `node`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingNode`] if the node is not indexed.
    pub fn composite(
        cx: &BuildContext<'_>,
        kind: BoxKind,
        node: ContentNode,
    ) -> Result<Self, BuildError> {
        let range = cx.range(&node)?;
        let style = cx.resolved_style(&node);
        Ok(Self::with_parts(kind, node, range, style))
    }

    /// Create and populate a section root for `node`.
    ///
    /// # Errors
    ///
    /// Propagates [`BuildError`] from population.
    pub fn section(
        cx: &BuildContext<'_>,
        node: ContentNode,
        factory: &dyn BoxFactory,
    ) -> Result<Self, BuildError> {
        let kind = BoxKind::Section {
            paged: cx.is_paged(),
        };
        let mut root = Self::composite(cx, kind, node)?;
        root.section = Some(SectionState::default());
        root.populate(cx, Some(factory))?;
        Ok(root)
    }

    /// A slice of this box holding `children`.
    pub(crate) fn fragment_of(
        &self,
        children: Vec<Self>,
        range: Range<usize>,
        first: bool,
        last: bool,
    ) -> Self {
        let mut fragment =
            Self::with_parts(self.kind, self.node.clone(), range, self.style.clone());
        fragment.children = children;
        fragment.intrinsic = self.intrinsic;
        fragment.state = BoxState::Fragment {
            first,
            last,
            whole: self.whole_ref(),
        };
        fragment
    }

    fn measure(&self, cx: &BuildContext<'_>) -> Result<(f32, f32), BuildError> {
        if !self.style.is_rendered() {
            return Ok((0.0, 0.0));
        }
        let metrics = cx.metrics();
        match self.kind {
            BoxKind::Replaced => Ok(metrics.replaced_size()),
            BoxKind::Inline => {
                let text = match &self.node {
                    ContentNode::Dom(id) => cx.text_of(*id)?,
                    ContentNode::Anonymous(_) => "",
                };
                // [§ 9.4.2 Inline formatting contexts](https://www.w3.org/TR/CSS2/visuren.html#inline-formatting)
                //
                // "Line boxes that contain no text [...] must be treated as
                // zero-height line boxes"
                if text.is_empty() {
                    return Ok((0.0, 0.0));
                }
                Ok((
                    metrics.text_width(text, DEFAULT_FONT_SIZE),
                    metrics.line_height(DEFAULT_FONT_SIZE),
                ))
            }
            _ => Ok((0.0, 0.0)),
        }
    }

    /// Identity of this box.
    #[must_use]
    pub const fn id(&self) -> BoxId {
        self.id
    }

    /// What this box is.
    #[must_use]
    pub const fn kind(&self) -> BoxKind {
        self.kind
    }

    /// The content node that generated this box.
    #[must_use]
    pub const fn node(&self) -> &ContentNode {
        &self.node
    }

    /// The `[start, end)` character range covered.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The style this box was built (or last restyled) with.
    #[must_use]
    pub const fn style(&self) -> &StyleRecord {
        &self.style
    }

    /// Child boxes in tiling order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Whole or fragment.
    #[must_use]
    pub const fn state(&self) -> &BoxState {
        &self.state
    }

    /// Returns true if this box is a slice of another.
    #[must_use]
    pub const fn is_fragment(&self) -> bool {
        matches!(self.state, BoxState::Fragment { .. })
    }

    /// Returns true if this box includes its whole box's start. Whole boxes
    /// trivially do.
    #[must_use]
    pub const fn is_first_fragment(&self) -> bool {
        match &self.state {
            BoxState::Whole => true,
            BoxState::Fragment { first, .. } => *first,
        }
    }

    /// Returns true if this box includes its whole box's end.
    #[must_use]
    pub const fn is_last_fragment(&self) -> bool {
        match &self.state {
            BoxState::Whole => true,
            BoxState::Fragment { last, .. } => *last,
        }
    }

    /// Reference to the whole box: the one this fragment was cut from, or
    /// this box itself.
    #[must_use]
    pub fn whole_ref(&self) -> WholeRef {
        match &self.state {
            BoxState::Whole => WholeRef {
                id: self.id,
                range: self.range.clone(),
            },
            BoxState::Fragment { whole, .. } => whole.clone(),
        }
    }

    /// The axis children are tiled along, for composites.
    #[must_use]
    pub const fn axis(&self) -> Option<Axis> {
        self.kind.tiling_axis()
    }

    /// Returns true if this box owns children.
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        self.kind.is_composite()
    }

    /// Returns true if the box takes space.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        !matches!(self.kind, BoxKind::Invisible) && self.style.is_rendered()
    }

    /// Section bookkeeping, for section roots.
    #[must_use]
    pub const fn section_state(&self) -> Option<&SectionState> {
        self.section.as_ref()
    }

    pub(crate) fn section_state_mut(&mut self) -> Option<&mut SectionState> {
        self.section.as_mut()
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Self> {
        &mut self.children
    }

    // ---- geometry -------------------------------------------------------

    /// The geometry cache, computed on first access after an invalidation.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        self.geometry.get_or_init(|| Geometry {
            insets: self.style.margin.add(self.style.padding),
            background: self
                .style
                .background_color
                .filter(|color| !color.is_transparent()),
        })
    }

    /// Drop the cached geometry.
    pub fn invalidate_geometry(&mut self) {
        let _ = self.geometry.take();
    }

    /// Insets along `axis` as `(leading, trailing)`, omitting the edges a
    /// fragment does not include.
    ///
    /// [§ 5.4 Box-decoration-break](https://www.w3.org/TR/css-break-3/#break-decoration)
    ///
    /// "slice: [...] no border and no padding are inserted at a break."
    #[must_use]
    pub fn insets(&self, axis: Axis) -> (f32, f32) {
        if !self.is_composite() || !self.is_rendered() {
            return (0.0, 0.0);
        }
        let insets = self.geometry().insets;
        let (leading, trailing) = match axis {
            Axis::X => (insets.left, insets.right),
            Axis::Y => (insets.top, insets.bottom),
        };
        if self.axis() != Some(axis) {
            return (leading, trailing);
        }
        (
            if self.is_first_fragment() { leading } else { 0.0 },
            if self.is_last_fragment() { trailing } else { 0.0 },
        )
    }

    // ---- spans ----------------------------------------------------------

    /// Preferred extent along `axis`.
    #[must_use]
    pub fn preferred_span(&self, axis: Axis) -> f32 {
        self.span(axis, Self::preferred_span)
    }

    /// Minimum extent along `axis`.
    #[must_use]
    pub fn minimum_span(&self, axis: Axis) -> f32 {
        self.span(axis, Self::minimum_span)
    }

    /// Maximum extent along `axis`. Block-level composites stretch without
    /// limit across their tiling axis.
    #[must_use]
    pub fn maximum_span(&self, axis: Axis) -> f32 {
        if self.is_rendered() && self.axis() == Some(axis.perpendicular()) {
            return f32::MAX;
        }
        // Summing unbounded children overflows to infinity; keep it at MAX.
        self.span(axis, Self::maximum_span).min(f32::MAX)
    }

    fn span(&self, axis: Axis, child_span: fn(&Self, Axis) -> f32) -> f32 {
        if !self.is_rendered() {
            return 0.0;
        }
        let Some(tiling) = self.axis() else {
            return match axis {
                Axis::X => self.intrinsic.0,
                Axis::Y => self.intrinsic.1,
            };
        };
        let spans = self.children.iter().map(|child| child_span(child, axis));
        let content = if axis == tiling {
            spans.sum::<f32>()
        } else {
            spans.fold(0.0, f32::max)
        };
        let (leading, trailing) = self.insets(axis);
        content + leading + trailing
    }

    // ---- population -----------------------------------------------------

    /// Rebuild the children of a composite from its content node.
    ///
    /// The node's children are normalized, each normalized child is turned
    /// into zero or more boxes by `factory`, and the result replaces the
    /// previous child list in one step. Without a factory the box is left
    /// childless. Leaves and fragments are not populated.
    ///
    /// # Errors
    ///
    /// Propagates [`BuildError`]; on error the previous children are kept.
    pub fn populate(
        &mut self,
        cx: &BuildContext<'_>,
        factory: Option<&dyn BoxFactory>,
    ) -> Result<(), BuildError> {
        if !self.is_composite() || self.is_fragment() {
            return Ok(());
        }
        let Some(factory) = factory else {
            self.children.clear();
            self.invalidate_geometry();
            return Ok(());
        };

        let children = if self.section.is_some() {
            section::populate(self, cx, factory)?
        } else if self.kind == BoxKind::Table {
            self.table_children(cx, factory)?
        } else {
            let nodes = cx.children(&self.node);
            let mut boxes = Vec::with_capacity(nodes.len());
            for child in normalize(cx, &self.node, &nodes)? {
                factory.create_all(cx, &child, &mut boxes)?;
            }
            boxes
        };

        self.children = children;
        self.invalidate_geometry();
        Ok(())
    }

    /// [§ 17.2.1 Anonymous table objects](https://www.w3.org/TR/CSS2/tables.html#anonymous-boxes)
    ///
    /// Rows become row composites; their cells go through the factory.
    /// Anything else a table holds is handed to the factory as it is.
    fn table_children(
        &self,
        cx: &BuildContext<'_>,
        factory: &dyn BoxFactory,
    ) -> Result<Vec<Self>, BuildError> {
        let mut boxes = Vec::new();
        for child in cx.children(&self.node) {
            let is_row = cx
                .style(&child)
                .is_some_and(|style| style.display == DisplayValue::TableRow && style.is_rendered());
            if is_row {
                let mut row = Self::composite(cx, BoxKind::TableRow, child)?;
                row.populate(cx, Some(factory))?;
                boxes.push(row);
            } else {
                factory.create_all(cx, &child, &mut boxes)?;
            }
        }
        Ok(boxes)
    }

    /// Re-read styles for every whole box intersecting `range` and drop
    /// their cached geometry.
    pub fn restyle(&mut self, cx: &BuildContext<'_>, range: Range<usize>) {
        if !intersects(&self.range, &range) {
            return;
        }
        if !self.node.is_anonymous() && !self.is_fragment() {
            self.style = cx.resolved_style(&self.node);
        }
        self.invalidate_geometry();
        for child in &mut self.children {
            child.restyle(cx, range.clone());
        }
    }

    /// Apply a child-list mutation of the content tree.
    ///
    /// The change goes to the deepest box whose content contains the changed
    /// parent; section roots get first refusal so that wrapped content is
    /// spliced rather than rebuilt. Ranges are refreshed afterwards, so `cx`
    /// must carry a text index rebuilt after the mutation.
    ///
    /// Returns `true` if some box handled the change.
    ///
    /// # Errors
    ///
    /// Propagates [`BuildError`] from repopulation.
    pub fn apply_structural_change(
        &mut self,
        cx: &BuildContext<'_>,
        factory: &dyn BoxFactory,
        change: &StructuralChange,
    ) -> Result<bool, BuildError> {
        let handled = self.forward_change(cx, factory, change)?;
        if handled {
            self.refresh_ranges(cx);
        }
        Ok(handled)
    }

    fn forward_change(
        &mut self,
        cx: &BuildContext<'_>,
        factory: &dyn BoxFactory,
        change: &StructuralChange,
    ) -> Result<bool, BuildError> {
        if self.is_fragment() || !self.is_composite() {
            return Ok(false);
        }
        if !self.node.contains(cx.tree(), change.parent) {
            return Ok(false);
        }
        if self.section.is_some() && section::on_structural_change(self, cx, factory, change)? {
            return Ok(true);
        }
        for index in 0..self.children.len() {
            if self.children[index].forward_change(cx, factory, change)? {
                self.redispatch_child(cx, factory, index, change)?;
                self.invalidate_geometry();
                return Ok(true);
            }
        }
        log::debug!(
            target: "tessera::boxes",
            "repopulating {} box of node {} after change under node {}",
            self.kind.name(),
            self.node.owner().0,
            change.parent.0
        );
        self.populate(cx, Some(factory))?;
        Ok(true)
    }

    /// Re-run dispatch for the child at `index` if its own child list was
    /// the one that changed.
    ///
    /// Whether a node generates a paragraph depends on its children, so an
    /// edit can change the kind of box its owner should be. A child whose
    /// node now declines a single box is expanded by repopulating `self`.
    fn redispatch_child(
        &mut self,
        cx: &BuildContext<'_>,
        factory: &dyn BoxFactory,
        index: usize,
        change: &StructuralChange,
    ) -> Result<(), BuildError> {
        let child = &self.children[index];
        if child.is_fragment() || child.dom_node() != Some(change.parent) {
            return Ok(());
        }
        let kind = child.kind;
        match factory.create_box(cx, &child.node, true)? {
            Some(fresh) if fresh.kind == kind => {}
            Some(fresh) => {
                log::debug!(
                    target: "tessera::boxes",
                    "node {} now generates a {} box instead of {}",
                    change.parent.0,
                    fresh.kind.name(),
                    kind.name()
                );
                self.children[index] = fresh;
            }
            None => self.populate(cx, Some(factory))?,
        }
        Ok(())
    }

    /// Recompute ranges of whole boxes from the current text index.
    pub fn refresh_ranges(&mut self, cx: &BuildContext<'_>) {
        for child in &mut self.children {
            child.refresh_ranges(cx);
        }
        if self.is_fragment() {
            return;
        }
        if let Ok(range) = cx.range(&self.node) {
            self.range = range;
        }
    }

    /// A serializable outline of this box and its descendants.
    #[must_use]
    pub fn summary(&self) -> BoxSummary {
        BoxSummary {
            kind: self.kind.name(),
            node: self.node.dom_id().map(|id| id.0),
            anonymous: self.node.is_anonymous(),
            range: (self.range.start, self.range.end),
            visible: self.is_rendered(),
            fragment: match &self.state {
                BoxState::Whole => None,
                BoxState::Fragment { first, last, .. } => Some((*first, *last)),
            },
            children: self.children.iter().map(Self::summary).collect(),
        }
    }

    /// Borrow this box as an unchanged fragmentation result.
    pub(crate) const fn unchanged(&self) -> Cow<'_, Self> {
        Cow::Borrowed(self)
    }

    /// The tree node this box was generated for, if not anonymous.
    #[must_use]
    pub const fn dom_node(&self) -> Option<NodeId> {
        self.node.dom_id()
    }
}

/// Serializable outline of a box tree, for dumps and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    /// Box kind name.
    pub kind: &'static str,
    /// Generating tree node, absent for anonymous boxes.
    pub node: Option<usize>,
    /// Generated for an anonymous wrapper.
    pub anonymous: bool,
    /// Character range.
    pub range: (usize, usize),
    /// Takes space.
    pub visible: bool,
    /// `(first, last)` flags of a fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<(bool, bool)>,
    /// Children in tiling order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BoxSummary>,
}

/// Half-open range intersection; an empty range intersects a range that
/// contains its position.
pub(crate) const fn intersects(a: &Range<usize>, b: &Range<usize>) -> bool {
    if a.start == a.end {
        return b.start <= a.start && (a.start < b.end || b.start == b.end);
    }
    if b.start == b.end {
        return a.start <= b.start && b.start < a.end;
    }
    a.start < b.end && b.start < a.end
}
