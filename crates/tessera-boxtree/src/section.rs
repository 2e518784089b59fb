//! The section root: flattens the document's top-level subtrees into one
//! list of children and keeps that list current as the tree changes.
//!
//! A subtree that matches the [`WrapperConvention`] contributes the children
//! of its wrapper element instead of itself. With the default
//! [`BodyWrapper`] an `html` root contributes the children of its `body`, so
//! `head` and anything else outside the body is never boxed.
//!
//! Child-list changes under a tracked wrapper are applied by re-normalizing
//! and re-building only the affected window of boxes.

use std::ops::Range;

use tessera_dom::{DomTree, NodeId, NodeType, StructuralChange};

use crate::anonymous::normalize_window;
use crate::classify::classify_children;
use crate::context::{BuildContext, ContentNode};
use crate::error::BuildError;
use crate::factory::BoxFactory;
use crate::layout_box::{LayoutBox, intersects};

/// Decides which element of a top-level subtree supplies section content.
pub trait WrapperConvention {
    /// The wrapper element inside the top-level subtree `root`, if `root`
    /// follows this convention.
    fn wrapper_of(&self, tree: &DomTree, root: NodeId) -> Option<NodeId>;

    /// Returns true if `node` is the kind of element this convention treats
    /// as a wrapper.
    fn is_wrapper(&self, tree: &DomTree, node: NodeId) -> bool;
}

/// [§ 4.1.1 The html element](https://html.spec.whatwg.org/multipage/semantics.html#the-html-element)
///
/// An `html` root whose `body` child holds the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyWrapper;

impl WrapperConvention for BodyWrapper {
    fn wrapper_of(&self, tree: &DomTree, root: NodeId) -> Option<NodeId> {
        if !tree.as_element(root)?.has_local_name("html") {
            return None;
        }
        tree.children(root)
            .iter()
            .copied()
            .find(|&child| self.is_wrapper(tree, child))
    }

    fn is_wrapper(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.as_element(node)
            .is_some_and(|element| element.has_local_name("body"))
    }
}

/// No wrappers: every top-level subtree is section content as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWrapper;

impl WrapperConvention for NoWrapper {
    fn wrapper_of(&self, _tree: &DomTree, _root: NodeId) -> Option<NodeId> {
        None
    }

    fn is_wrapper(&self, _tree: &DomTree, _node: NodeId) -> bool {
        false
    }
}

/// One top-level subtree and what it contributed to the flattened list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSubtree {
    /// The top-level node.
    pub root: NodeId,
    /// Its wrapper, if the convention matched.
    pub wrapper: Option<NodeId>,
    /// Number of flattened entries it contributed.
    pub entries: usize,
}

/// One normalized child of the section and the boxes built from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    /// Flattened entries covered (more than one for an anonymous run).
    entries: usize,
    /// Child boxes produced.
    boxes: usize,
    anonymous: bool,
}

/// Bookkeeping a section root keeps between builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionState {
    subtrees: Vec<TrackedSubtree>,
    segments: Vec<Segment>,
    mixed: bool,
}

impl SectionState {
    /// The tracked top-level subtrees, in document order.
    #[must_use]
    pub fn subtrees(&self) -> &[TrackedSubtree] {
        &self.subtrees
    }
}

/// Flatten the document's top-level subtrees.
fn flatten(cx: &BuildContext<'_>, document: NodeId) -> (Vec<TrackedSubtree>, Vec<ContentNode>) {
    let tree = cx.tree();
    let mut subtrees = Vec::new();
    let mut flat = Vec::new();
    for root in tree.content_children(document) {
        let wrapper = cx.wrapper().wrapper_of(tree, root);
        let before = flat.len();
        match wrapper {
            Some(wrapper) => flat.extend(tree.content_children(wrapper).map(ContentNode::Dom)),
            None => flat.push(ContentNode::Dom(root)),
        }
        subtrees.push(TrackedSubtree {
            root,
            wrapper,
            entries: flat.len() - before,
        });
    }
    (subtrees, flat)
}

/// The flattened section content intersecting `[start, end)`, in document
/// order.
///
/// # Errors
///
/// Returns [`BuildError::MissingNode`] if a flattened node is not indexed.
pub fn compute_visible_children(
    cx: &BuildContext<'_>,
    document: NodeId,
    start: usize,
    end: usize,
) -> Result<Vec<ContentNode>, BuildError> {
    let window = start..end;
    let mut visible = Vec::new();
    for node in flatten(cx, document).1 {
        if intersects(&cx.range(&node)?, &window) {
            visible.push(node);
        }
    }
    Ok(visible)
}

/// Build boxes for normalized `items`, recording one segment per item.
fn build_segments(
    cx: &BuildContext<'_>,
    factory: &dyn BoxFactory,
    items: &[ContentNode],
) -> Result<(Vec<LayoutBox>, Vec<Segment>), BuildError> {
    let mut boxes = Vec::new();
    let mut segments = Vec::with_capacity(items.len());
    for item in items {
        let before = boxes.len();
        factory.create_all(cx, item, &mut boxes)?;
        segments.push(Segment {
            entries: item.entry_count(),
            boxes: boxes.len() - before,
            anonymous: item.is_anonymous(),
        });
    }
    Ok((boxes, segments))
}

/// Build the children of a section root from scratch.
pub(crate) fn populate(
    root: &mut LayoutBox,
    cx: &BuildContext<'_>,
    factory: &dyn BoxFactory,
) -> Result<Vec<LayoutBox>, BuildError> {
    let document = root.node().owner();
    let (subtrees, flat) = flatten(cx, document);
    let mixed = classify_children(cx, &flat).is_mixed();
    let normalized = normalize_window(cx, root.node(), &flat, mixed)?;
    let (boxes, segments) = build_segments(cx, factory, &normalized)?;

    log::debug!(
        target: "tessera::section",
        "section of node {} built from {} subtrees, {} entries, {} boxes",
        document.0,
        subtrees.len(),
        flat.len(),
        boxes.len()
    );
    if let Some(state) = root.section_state_mut() {
        *state = SectionState {
            subtrees,
            segments,
            mixed,
        };
    }
    Ok(boxes)
}

/// React to a child-list change.
///
/// A change to the document node re-tracks the subtrees and rebuilds every
/// child. A change to a tracked wrapper rebuilds only the affected window:
/// the segments covering the changed entries, widened to the neighbouring
/// anonymous runs they may merge with. If the change flips whether block and
/// inline content are mixed, the whole list is rebuilt instead.
///
/// Returns `false`, touching nothing, for any other change.
///
/// # Errors
///
/// Propagates [`BuildError`] from normalization and box creation.
pub(crate) fn on_structural_change(
    root: &mut LayoutBox,
    cx: &BuildContext<'_>,
    factory: &dyn BoxFactory,
    change: &StructuralChange,
) -> Result<bool, BuildError> {
    let document = root.node().owner();
    if change.parent == document {
        log::debug!(target: "tessera::section", "document child list changed, rebuilding");
        root.populate(cx, Some(factory))?;
        return Ok(true);
    }

    let Some(state) = root.section_state() else {
        return Ok(false);
    };
    let Some(tracked) = state
        .subtrees
        .iter()
        .position(|subtree| subtree.wrapper == Some(change.parent))
    else {
        return Ok(false);
    };
    if !cx.wrapper().is_wrapper(cx.tree(), change.parent) {
        return Ok(false);
    }

    let shift: usize = state.subtrees[..tracked].iter().map(|s| s.entries).sum();
    let (index, removed) = content_position(cx.tree(), change);
    let (subtrees, flat) = flatten(cx, document);
    let mixed = classify_children(cx, &flat).is_mixed();
    let old_entries: usize = state.segments.iter().map(|s| s.entries).sum();

    let splice = if mixed == state.mixed {
        affected_window(state, shift + index, removed, mixed)
            .and_then(|window| window.rebase(old_entries, flat.len()))
    } else {
        None
    };
    let Some(splice) = splice else {
        log::debug!(
            target: "tessera::section",
            "change under node {} cannot be spliced (mixing flipped or out of range), rebuilding",
            change.parent.0
        );
        root.populate(cx, Some(factory))?;
        return Ok(true);
    };

    let normalized = normalize_window(cx, root.node(), &flat[splice.new_entries.clone()], mixed)?;
    let (boxes, segments) = build_segments(cx, factory, &normalized)?;
    log::debug!(
        target: "tessera::section",
        "splicing boxes {:?} of section with {} rebuilt boxes",
        splice.boxes,
        boxes.len()
    );

    let _ = root.children_mut().splice(splice.boxes.clone(), boxes);
    if let Some(state) = root.section_state_mut() {
        let _ = state.segments.splice(splice.segments, segments);
        state.subtrees = subtrees;
    }
    root.invalidate_geometry();
    Ok(true)
}

/// The index and removal count of `change` among content children.
///
/// A change record counts every child, comments included; flattened entries
/// do not. Siblings before the edit point are the same before and after the
/// change, so they can be read from the current tree.
fn content_position(tree: &DomTree, change: &StructuralChange) -> (usize, usize) {
    let is_content = |id: NodeId| !matches!(tree.node_type(id), Some(NodeType::Comment(_)));
    let siblings = tree.children(change.parent);
    let before = &siblings[..change.index.min(siblings.len())];
    (
        before.iter().filter(|&&id| is_content(id)).count(),
        change.removed.iter().filter(|&&id| is_content(id)).count(),
    )
}

/// The part of the section to rebuild, in old and new coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Splice {
    segments: Range<usize>,
    boxes: Range<usize>,
    old_entries: Range<usize>,
    new_entries: Range<usize>,
}

impl Splice {
    /// Map the window's entries into the flattened list after the change.
    fn rebase(mut self, old_total: usize, new_total: usize) -> Option<Self> {
        let end = (self.old_entries.end + new_total).checked_sub(old_total)?;
        if end < self.old_entries.start || end > new_total {
            return None;
        }
        self.new_entries = self.old_entries.start..end;
        Some(self)
    }
}

/// Segments covering old entries `[index, index + removed)`, widened to
/// whole anonymous runs on either side.
fn affected_window(state: &SectionState, index: usize, removed: usize, mixed: bool) -> Option<Splice> {
    // bounds[i] is the first entry of segment i; every segment covers at
    // least one entry, so the bounds strictly increase.
    let mut bounds = Vec::with_capacity(state.segments.len() + 1);
    bounds.push(0);
    for segment in &state.segments {
        bounds.push(bounds[bounds.len() - 1] + segment.entries);
    }
    let end = index + removed;
    if end > bounds[bounds.len() - 1] {
        return None;
    }

    let mut segments = if removed == 0 {
        // A pure insertion lands on a boundary (nothing to rebuild yet) or
        // inside a segment.
        match bounds.binary_search(&index) {
            Ok(boundary) => boundary..boundary,
            Err(after) => after - 1..after,
        }
    } else {
        let first = bounds.partition_point(|&b| b <= index) - 1;
        first..bounds.partition_point(|&b| b < end)
    };

    if mixed {
        if segments.start > 0 && state.segments[segments.start - 1].anonymous {
            segments.start -= 1;
        }
        if segments.end < state.segments.len() && state.segments[segments.end].anonymous {
            segments.end += 1;
        }
    }

    let boxes_before: usize = state.segments[..segments.start].iter().map(|s| s.boxes).sum();
    let boxes_within: usize = state.segments[segments.clone()].iter().map(|s| s.boxes).sum();
    Some(Splice {
        old_entries: bounds[segments.start]..bounds[segments.end],
        boxes: boxes_before..boxes_before + boxes_within,
        new_entries: 0..0,
        segments,
    })
}
