//! Inline versus block classification.
//!
//! [§ 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen)

use tessera_style::DisplayValue;

use crate::context::{BuildContext, ContentNode, NodeKind};

/// Returns true if `node` participates in an inline formatting context.
///
/// Text is always inline. An element is inline iff its resolved `display` is
/// `inline`; an element with no recorded style counts as block. Anonymous
/// wrappers are block by construction.
#[must_use]
pub fn is_inline(cx: &BuildContext<'_>, node: &ContentNode) -> bool {
    match cx.kind(node) {
        Some(NodeKind::Text) => true,
        Some(NodeKind::Element) => cx
            .style(node)
            .is_some_and(|style| style.display == DisplayValue::Inline),
        _ => false,
    }
}

/// Which kinds of children a sibling list holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildClassification {
    /// At least one child is block-level.
    pub has_block: bool,
    /// At least one child is inline-level.
    pub has_inline: bool,
}

impl ChildClassification {
    /// Both kinds coexist, so inline runs need anonymous wrappers.
    #[must_use]
    pub const fn is_mixed(self) -> bool {
        self.has_block && self.has_inline
    }
}

/// Classify a sibling list.
#[must_use]
pub fn classify_children(cx: &BuildContext<'_>, children: &[ContentNode]) -> ChildClassification {
    let mut classification = ChildClassification::default();
    for child in children {
        if is_inline(cx, child) {
            classification.has_inline = true;
        } else {
            classification.has_block = true;
        }
        if classification.is_mixed() {
            break;
        }
    }
    classification
}
