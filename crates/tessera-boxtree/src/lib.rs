//! Box-tree construction for styled content trees.
//!
//! This crate turns a [`tessera_dom::DomTree`] plus resolved styles into a
//! tree of [`LayoutBox`]es ready for layout, following
//! [CSS 2.1 § 9.2 Controlling box generation](https://www.w3.org/TR/CSS2/visuren.html#box-gen):
//!
//! - [`classify`] - inline versus block classification
//! - [`anonymous`] - anonymous block synthesis for mixed sibling lists
//! - [`factory`] - which box each node generates, with per-namespace factories
//! - [`layout_box`] - box kinds, spans, population and restyling
//! - [`fragment`] - break weights and splitting boxes into fragments
//! - [`section`] - the document root, its wrapper conventions and
//!   incremental updates
//!
//! # Example
//!
//! ```
//! use tessera_boxtree::{BuildContext, BuildOptions, FactoryRegistry, build_box_tree};
//! use tessera_dom::{DocumentText, DomTree, ElementData, NodeId};
//! use tessera_style::StyleMap;
//!
//! let mut tree = DomTree::new();
//! let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
//! let _ = tree.append_text(div, "Hello");
//!
//! let text = DocumentText::index(&tree);
//! let styles = StyleMap::with_defaults(&tree);
//! let factories = FactoryRegistry::standard();
//! let options = BuildOptions::default();
//! let cx = BuildContext::new(&tree, &text, &styles, &factories, &options);
//!
//! let root = build_box_tree(&cx).unwrap();
//! assert_eq!(root.children().len(), 1);
//! ```

pub mod anonymous;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod fragment;
pub mod layout_box;
pub mod section;

pub use anonymous::{normalize, normalize_window};
pub use classify::{ChildClassification, classify_children, is_inline};
pub use config::{BuildOptions, WrapperKind, namespace_for_media_type};
pub use context::{
    AnonymousNode, ApproximateMetrics, BuildContext, ContentNode, NodeKind, SpanMetrics,
};
pub use error::BuildError;
pub use factory::{
    BoxFactory, FactoryRegistry, HtmlBoxFactory, PAGE_BREAK_ATTRIBUTE, ReplacedBoxFactory,
    build_box_tree,
};
pub use fragment::BreakWeight;
pub use layout_box::{Axis, BoxId, BoxKind, BoxState, BoxSummary, Geometry, LayoutBox, WholeRef};
pub use section::{
    BodyWrapper, NoWrapper, SectionState, TrackedSubtree, WrapperConvention,
    compute_visible_children,
};
