//! Per-node style storage and user-agent defaults.

use std::collections::HashMap;

use tessera_dom::{DomTree, NodeId, NodeType};

use crate::{DisplayValue, EdgeSizes, StyleRecord};

/// Returns the default display value for an element by local name.
///
/// [§ 15.3.1 Hidden elements](https://html.spec.whatwg.org/multipage/rendering.html#hidden-elements)
/// [§ 15.3.3 Flow content](https://html.spec.whatwg.org/multipage/rendering.html#flow-content-3)
/// [§ 15.3.7 Lists](https://html.spec.whatwg.org/multipage/rendering.html#lists)
/// [§ 15.3.8 Tables](https://html.spec.whatwg.org/multipage/rendering.html#tables-2)
#[must_use]
pub fn default_display_for_element(tag_name: &str) -> DisplayValue {
    // "The following elements must have their display set to none:"
    const HIDDEN: &[&str] = &[
        "area", "base", "basefont", "datalist", "head", "link", "meta", "noembed", "noframes",
        "param", "rp", "script", "style", "template", "title",
    ];
    const BLOCK: &[&str] = &[
        "address", "article", "aside", "blockquote", "body", "center", "dd", "details",
        "dialog", "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer",
        "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "html", "legend",
        "listing", "main", "menu", "nav", "ol", "p", "plaintext", "pre", "search", "section",
        "summary", "ul", "xmp",
    ];

    let tag = tag_name.to_ascii_lowercase();
    match tag.as_str() {
        t if HIDDEN.contains(&t) => DisplayValue::None,
        t if BLOCK.contains(&t) => DisplayValue::Block,
        // "li { display: list-item; }"
        "li" => DisplayValue::ListItem,
        "table" => DisplayValue::Table,
        "tr" => DisplayValue::TableRow,
        "td" | "th" => DisplayValue::TableCell,
        _ => DisplayValue::Inline,
    }
}

/// Resolved styles keyed by node.
///
/// Nodes without an entry are treated by box construction as not-inline;
/// text nodes never need an entry.
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    styles: HashMap<NodeId, StyleRecord>,
}

impl StyleMap {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record for every element from the UA defaults: display by local
    /// name, the element's namespace, and the UA margins for paragraphs.
    #[must_use]
    pub fn with_defaults(tree: &DomTree) -> Self {
        let mut map = Self::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            if let Some(NodeType::Element(data)) = tree.node_type(id) {
                let mut record = StyleRecord::new(default_display_for_element(&data.tag_name));
                record.namespace.clone_from(&data.namespace);
                // [§ 15.3.3](https://html.spec.whatwg.org/multipage/rendering.html#flow-content-3)
                // "p { margin-block: 1em; }"
                if data.has_local_name("p") {
                    record.margin = EdgeSizes {
                        top: 16.0,
                        bottom: 16.0,
                        ..EdgeSizes::default()
                    };
                }
                map.insert(id, record);
            }
            stack.extend(tree.children(id).iter().copied());
        }
        map
    }

    /// The style of `id`, if one was recorded.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&StyleRecord> {
        self.styles.get(&id)
    }

    /// Record (or replace) the style of `id`.
    pub fn insert(&mut self, id: NodeId, record: StyleRecord) {
        let _ = self.styles.insert(id, record);
    }

    /// Mutable access to the style of `id`, inserting the initial style first
    /// if needed.
    pub fn entry(&mut self, id: NodeId) -> &mut StyleRecord {
        self.styles.entry(id).or_default()
    }

    /// Number of recorded styles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
