//! The per-node resolved style record.

use serde::{Deserialize, Serialize};

use crate::{ColorValue, DisplayValue, EdgeSizes, PageBreak};

/// Resolved style of one content node, as far as box construction cares.
///
/// Invariant: `display == none` means the node produces an invisible,
/// zero-span box whatever the other fields say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleRecord {
    /// Resolved `display`.
    pub display: DisplayValue,
    /// Namespace URI of the generating element, if it declared one.
    pub namespace: Option<String>,
    /// `false` for `visibility: hidden` and for synthesized whitespace runs.
    pub visible: bool,
    /// `page-break-before`.
    pub page_break_before: PageBreak,
    /// `page-break-after`.
    pub page_break_after: PageBreak,
    /// [§ 8.3 Margin properties](https://www.w3.org/TR/CSS2/box.html#margin-properties)
    pub margin: EdgeSizes,
    /// [§ 8.4 Padding properties](https://www.w3.org/TR/CSS2/box.html#padding-properties)
    pub padding: EdgeSizes,
    /// [§ 3.2 'background-color'](https://www.w3.org/TR/css-backgrounds-3/#background-color)
    pub background_color: Option<ColorValue>,
    /// Marks the synthesized style of an anonymous block.
    pub anonymous: bool,
}

impl Default for StyleRecord {
    fn default() -> Self {
        Self {
            display: DisplayValue::default(),
            namespace: None,
            visible: true,
            page_break_before: PageBreak::Auto,
            page_break_after: PageBreak::Auto,
            margin: EdgeSizes::default(),
            padding: EdgeSizes::default(),
            background_color: None,
            anonymous: false,
        }
    }
}

impl StyleRecord {
    /// A visible record with the given display.
    #[must_use]
    pub fn new(display: DisplayValue) -> Self {
        Self {
            display,
            ..Self::default()
        }
    }

    /// [§ 9.2.1.1 Anonymous block boxes](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level)
    ///
    /// "The properties of anonymous boxes are inherited from the enclosing
    /// non-anonymous box." Only the display and visibility matter here.
    #[must_use]
    pub fn anonymous_block(visible: bool) -> Self {
        Self {
            display: DisplayValue::Block,
            visible,
            anonymous: true,
            ..Self::default()
        }
    }

    /// Builder: set `visibility: hidden`.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Builder: set the namespace URI.
    #[must_use]
    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Builder: set the margins.
    #[must_use]
    pub fn with_margin(mut self, margin: EdgeSizes) -> Self {
        self.margin = margin;
        self
    }

    /// Builder: set the padding.
    #[must_use]
    pub fn with_padding(mut self, padding: EdgeSizes) -> Self {
        self.padding = padding;
        self
    }

    /// Builder: set the background colour.
    #[must_use]
    pub fn with_background(mut self, color: ColorValue) -> Self {
        self.background_color = Some(color);
        self
    }

    /// Builder: set `page-break-before` and `page-break-after`.
    #[must_use]
    pub fn with_page_breaks(mut self, before: PageBreak, after: PageBreak) -> Self {
        self.page_break_before = before;
        self.page_break_after = after;
        self
    }

    /// Returns true if this node contributes visible content: `display` is
    /// not `none` and `visibility` is not hidden.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        !self.display.is_none() && self.visible
    }
}
