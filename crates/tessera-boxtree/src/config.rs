//! Build options.
//!
//! Options are plain data so that embedders can keep them next to their
//! other settings and load them from JSON:
//!
//! ```
//! use tessera_boxtree::{BuildOptions, WrapperKind};
//!
//! let options = BuildOptions::from_json(r#"{ "paged": true }"#).unwrap();
//! assert!(options.paged);
//! assert_eq!(options.wrapper, WrapperKind::Body);
//! ```

use serde::{Deserialize, Serialize};
use tessera_dom::namespace;

use crate::BuildError;
use crate::section::{BodyWrapper, NoWrapper, WrapperConvention};

static BODY_WRAPPER: BodyWrapper = BodyWrapper;
static NO_WRAPPER: NoWrapper = NoWrapper;

/// Document-level switches for one box-tree build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Build the section root for paged media.
    pub paged: bool,
    /// Media type of the document, used to infer the namespace of nodes that
    /// do not declare one.
    pub media_type: Option<String>,
    /// Which wrapper convention the section root flattens.
    pub wrapper: WrapperKind,
}

impl BuildOptions {
    /// Parse options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Options`] for malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The namespace implied by the document's media type, if any.
    #[must_use]
    pub fn default_namespace(&self) -> Option<&'static str> {
        self.media_type.as_deref().and_then(namespace_for_media_type)
    }
}

/// Built-in wrapper conventions selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapperKind {
    /// `html` root element whose `body` child supplies the section content.
    #[default]
    Body,
    /// Every top-level subtree is taken as it is.
    None,
}

impl WrapperKind {
    /// The convention object for this kind.
    #[must_use]
    pub fn convention(self) -> &'static dyn WrapperConvention {
        match self {
            Self::Body => &BODY_WRAPPER,
            Self::None => &NO_WRAPPER,
        }
    }
}

/// Map a document media type to the namespace its unqualified nodes live in.
///
/// Parameters such as `; charset=utf-8` are ignored. `text/html` maps to no
/// namespace: HTML parsed as HTML carries its namespace on the elements.
#[must_use]
pub fn namespace_for_media_type(media_type: &str) -> Option<&'static str> {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "application/xhtml+xml" => Some(namespace::XHTML),
        "image/svg+xml" => Some(namespace::SVG),
        "application/mathml+xml" => Some(namespace::MATHML),
        _ => None,
    }
}
