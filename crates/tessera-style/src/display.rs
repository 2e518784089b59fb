//! Display and page-break keywords.
//!
//! [§ 2 Box Layout Modes: the display property](https://www.w3.org/TR/css-display-3/#the-display-properties)
//! [§ 13.3.1 Page break properties](https://www.w3.org/TR/CSS2/page.html#page-break-props)

use serde::{Deserialize, Serialize};
use strum_macros::{EnumString, IntoStaticStr};
use tessera_common::warning::warn_once;

/// The `display` values box construction distinguishes.
///
/// Only the keywords that select a different box kind are modelled; anything
/// else degrades to the initial value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DisplayValue {
    /// "The element generates a block-level box."
    Block,
    /// "The element generates one or more inline boxes." (the initial value)
    #[default]
    Inline,
    /// "The element generates a block box for the content and a separate
    /// list-item inline box."
    ListItem,
    /// [§ 17.2 The CSS table model](https://www.w3.org/TR/CSS2/tables.html#table-display)
    /// "Specifies that an element defines a block-level table."
    Table,
    /// "Specifies that an element is a row of cells."
    TableRow,
    /// "Specifies that an element represents a table cell."
    TableCell,
    /// [§ 2.6 display: none](https://www.w3.org/TR/css-display-3/#valdef-display-none)
    /// "The element and its descendants generate no boxes or text runs."
    None,
}

impl DisplayValue {
    /// Parse a `display` keyword, falling back to `inline` (the initial
    /// value) for anything unrecognised.
    #[must_use]
    pub fn parse_keyword(keyword: &str) -> Self {
        keyword.trim().parse().unwrap_or_else(|_| {
            let _ = warn_once("style", &format!("unsupported display value '{keyword}'"));
            Self::Inline
        })
    }

    /// The CSS keyword for this value.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        self.into()
    }

    /// Returns true for `display: none`.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// `page-break-before` / `page-break-after`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum PageBreak {
    /// "Neither force nor forbid a page break."
    #[default]
    Auto,
    /// "Avoid a page break."
    Avoid,
    /// "Always force a page break."
    Always,
}

impl PageBreak {
    /// Parse a page-break keyword, falling back to `auto`.
    #[must_use]
    pub fn parse_keyword(keyword: &str) -> Self {
        keyword.trim().parse().unwrap_or_else(|_| {
            let _ = warn_once("style", &format!("unsupported page-break value '{keyword}'"));
            Self::Auto
        })
    }
}
