//! Anonymous block synthesis.
//!
//! [§ 9.2.1.1 Anonymous block boxes](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level)
//!
//! "When an inline box contains an in-flow block-level box, the inline box
//! (and its inline ancestors within the same line box) are broken around the
//! block-level box [...] and the line boxes before the break and after the
//! break are enclosed in anonymous block boxes."
//!
//! Normalization is a pure function of its input: the same sibling list
//! always yields the same output, and normalizing an already-normalized list
//! returns it unchanged.

use tessera_dom::NodeId;
use tessera_style::StyleRecord;

use crate::classify::{classify_children, is_inline};
use crate::context::{AnonymousNode, BuildContext, ContentNode, NodeKind};
use crate::error::BuildError;

/// Normalize the children of `parent` so that block and inline siblings do
/// not mix.
///
/// If the list holds both, every maximal run of consecutive inline siblings
/// is replaced by one [`AnonymousNode`]; block siblings pass through in
/// order. Otherwise the list is returned as it is.
///
/// # Errors
///
/// Returns [`BuildError`] if the text of a wrapped text node cannot be
/// extracted while deciding the wrapper's visibility.
pub fn normalize(
    cx: &BuildContext<'_>,
    parent: &ContentNode,
    children: &[ContentNode],
) -> Result<Vec<ContentNode>, BuildError> {
    let mixed = classify_children(cx, children).is_mixed();
    normalize_window(cx, parent, children, mixed)
}

/// Normalize a window of a larger sibling list.
///
/// `mixed` is the classification of the whole list; the window alone may
/// well be all-inline. Callers must widen the window so that it starts and
/// ends on a block sibling or a list boundary, otherwise a run would be split
/// across two wrappers.
///
/// # Errors
///
/// See [`normalize`].
pub fn normalize_window(
    cx: &BuildContext<'_>,
    parent: &ContentNode,
    window: &[ContentNode],
    mixed: bool,
) -> Result<Vec<ContentNode>, BuildError> {
    if !mixed {
        return Ok(window.to_vec());
    }

    let owner = parent.owner();
    let mut result = Vec::with_capacity(window.len());
    let mut run: Vec<NodeId> = Vec::new();

    for child in window {
        match child {
            ContentNode::Dom(id) if is_inline(cx, child) => run.push(*id),
            _ => {
                flush_run(cx, owner, &mut run, &mut result)?;
                result.push(child.clone());
            }
        }
    }
    flush_run(cx, owner, &mut run, &mut result)?;

    log::trace!(
        target: "tessera::anonymous",
        "normalized {} children of node {} into {}",
        window.len(),
        owner.0,
        result.len()
    );
    Ok(result)
}

fn flush_run(
    cx: &BuildContext<'_>,
    owner: NodeId,
    run: &mut Vec<NodeId>,
    result: &mut Vec<ContentNode>,
) -> Result<(), BuildError> {
    if run.is_empty() {
        return Ok(());
    }
    let nodes = std::mem::take(run);
    let visible = run_is_visible(cx, &nodes)?;
    result.push(ContentNode::Anonymous(AnonymousNode::new(owner, nodes, visible)));
    Ok(())
}

/// A run is visible if any member is; the scan starts from the end since
/// trailing whitespace is the common invisible case.
fn run_is_visible(cx: &BuildContext<'_>, run: &[NodeId]) -> Result<bool, BuildError> {
    for &id in run.iter().rev() {
        if node_is_visible(cx, id)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// An element is visible unless it is `display: none` or hidden, so empty
/// elements like `<br>` still count. A text node is visible iff it has a
/// non-whitespace character.
fn node_is_visible(cx: &BuildContext<'_>, id: NodeId) -> Result<bool, BuildError> {
    let node = ContentNode::Dom(id);
    match cx.kind(&node) {
        Some(NodeKind::Text) => Ok(cx.text_of(id)?.chars().any(|c| !c.is_whitespace())),
        Some(NodeKind::Element) => Ok(cx.style(&node).is_none_or(StyleRecord::is_rendered)),
        _ => Ok(false),
    }
}
