//! Integration tests for inline classification and anonymous block synthesis.

use std::collections::HashMap;

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use tessera_boxtree::{
    BuildContext, BuildError, BuildOptions, ContentNode, FactoryRegistry, classify_children,
    is_inline, normalize,
};
use tessera_dom::{DocumentText, DomTree, ElementData, NodeId, TextError};
use tessera_style::{DisplayValue, StyleMap};

/// Everything a build reads, owned in one place.
struct Doc {
    tree: DomTree,
    text: DocumentText,
    styles: StyleMap,
    factories: FactoryRegistry,
    options: BuildOptions,
}

impl Doc {
    fn new(tree: DomTree, styles: StyleMap) -> Self {
        Self {
            text: DocumentText::index(&tree),
            tree,
            styles,
            factories: FactoryRegistry::standard(),
            options: BuildOptions::default(),
        }
    }

    fn cx(&self) -> BuildContext<'_> {
        BuildContext::new(
            &self.tree,
            &self.text,
            &self.styles,
            &self.factories,
            &self.options,
        )
    }

    /// Normalize the children of `parent`.
    fn normalize(&self, parent: NodeId) -> Vec<ContentNode> {
        let cx = self.cx();
        let parent = ContentNode::Dom(parent);
        normalize(&cx, &parent, &cx.children(&parent)).expect("normalization succeeds")
    }
}

/// Flatten a normalized list back into the nodes it stands for.
fn unwrap_entries(nodes: &[ContentNode]) -> Vec<NodeId> {
    nodes
        .iter()
        .flat_map(|node| match node {
            ContentNode::Dom(id) => vec![*id],
            ContentNode::Anonymous(anon) => anon.children().to_vec(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn test_text_is_always_inline() {
    let mut tree = DomTree::new();
    let div = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let text = tree.append_text(div, "hi");
    let doc = Doc::new(tree, StyleMap::new());
    let cx = doc.cx();

    assert!(is_inline(&cx, &ContentNode::Dom(text)));
    // No recorded style: treated as block.
    assert!(!is_inline(&cx, &ContentNode::Dom(div)));
}

#[test]
fn test_classify_reports_both_kinds() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let _ = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(body, "inline");
    let styles = StyleMap::with_defaults(&tree);
    let doc = Doc::new(tree, styles);
    let cx = doc.cx();

    let children = cx.children(&ContentNode::Dom(body));
    let classification = classify_children(&cx, &children);
    assert!(classification.has_block && classification.has_inline);
    assert!(classification.is_mixed());
}

// ---------------------------------------------------------------------------
// Normalization examples
//
// [§ 9.2.1.1 Anonymous block boxes](https://www.w3.org/TR/CSS2/visuren.html#anonymous-block-level)
// ---------------------------------------------------------------------------

#[test]
fn test_mixed_children_wrap_inline_run() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let first = tree.append_element(body, ElementData::new("div"));
    let text = tree.append_text(body, "some text");
    let span = tree.append_element(body, ElementData::new("span"));
    let last = tree.append_element(body, ElementData::new("div"));
    let styles = StyleMap::with_defaults(&tree);
    let doc = Doc::new(tree, styles);

    let normalized = doc.normalize(body);

    assert_eq!(normalized.len(), 3);
    assert_eq!(normalized[0], ContentNode::Dom(first));
    let ContentNode::Anonymous(anon) = &normalized[1] else {
        panic!("expected an anonymous wrapper, got {:?}", normalized[1]);
    };
    assert_eq!(anon.children(), &[text, span]);
    assert_eq!(anon.parent(), body);
    assert_eq!(anon.style().display, DisplayValue::Block);
    assert!(anon.style().anonymous);
    assert!(anon.style().visible);
    assert_eq!(normalized[2], ContentNode::Dom(last));
}

#[test]
fn test_all_inline_children_unchanged() {
    let mut tree = DomTree::new();
    let p = tree.append_element(NodeId::ROOT, ElementData::new("p"));
    let _ = tree.append_text(p, "a");
    let _ = tree.append_element(p, ElementData::new("em"));
    let styles = StyleMap::with_defaults(&tree);
    let doc = Doc::new(tree, styles);

    let normalized = doc.normalize(p);
    assert_eq!(normalized, doc.cx().children(&ContentNode::Dom(p)));
}

#[test]
fn test_whitespace_only_run_is_invisible() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let _ = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(body, "\n   \t");
    let _ = tree.append_element(body, ElementData::new("div"));
    let styles = StyleMap::with_defaults(&tree);
    let doc = Doc::new(tree, styles);

    let normalized = doc.normalize(body);
    let ContentNode::Anonymous(anon) = &normalized[1] else {
        panic!("expected an anonymous wrapper");
    };
    assert!(!anon.style().visible, "whitespace-only run should be invisible");
}

#[test]
fn test_empty_element_makes_run_visible() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let _ = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_element(body, ElementData::new("br"));
    let _ = tree.append_text(body, "  ");
    let styles = StyleMap::with_defaults(&tree);
    let doc = Doc::new(tree, styles);

    let normalized = doc.normalize(body);
    let ContentNode::Anonymous(anon) = &normalized[1] else {
        panic!("expected an anonymous wrapper");
    };
    assert!(anon.style().visible, "<br> counts as visible content");
}

#[test]
fn test_hidden_inline_does_not_make_run_visible() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let _ = tree.append_element(body, ElementData::new("div"));
    let span = tree.append_element(body, ElementData::new("span"));
    let _ = tree.append_text(span, "secret");
    let _ = tree.append_text(body, " ");
    let mut styles = StyleMap::with_defaults(&tree);
    styles.entry(span).visible = false;
    let doc = Doc::new(tree, styles);

    let normalized = doc.normalize(body);
    let ContentNode::Anonymous(anon) = &normalized[1] else {
        panic!("expected an anonymous wrapper");
    };
    assert!(!anon.style().visible);
}

#[test]
fn test_comments_are_not_children() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let comment = tree.alloc(tessera_dom::NodeType::Comment("note".to_string()));
    tree.append_child(body, comment);
    let div = tree.append_element(body, ElementData::new("div"));
    let styles = StyleMap::with_defaults(&tree);
    let doc = Doc::new(tree, styles);

    assert_eq!(doc.normalize(body), vec![ContentNode::Dom(div)]);
}

#[test]
fn test_text_extraction_failure_is_fatal() {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let div = tree.append_element(body, ElementData::new("div"));
    let text = tree.append_text(body, "tail");
    let styles = StyleMap::with_defaults(&tree);

    // An index that disagrees with the tree: the text node ends past the text.
    let ranges = HashMap::from([
        (NodeId::ROOT, 0..2),
        (body, 0..2),
        (div, 0..1),
        (text, 1..10),
    ]);
    let mut doc = Doc::new(tree, styles);
    doc.text = DocumentText::from_parts("ab".to_string(), ranges);

    let cx = doc.cx();
    let parent = ContentNode::Dom(body);
    let result = normalize(&cx, &parent, &cx.children(&parent));

    match result {
        Err(BuildError::Text { node, source }) => {
            assert_eq!(node, text);
            assert!(matches!(source, TextError::OutOfBounds { end: 10, .. }));
        }
        other => panic!("expected a text error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// One generated child of the parent under test.
#[derive(Debug, Clone, Copy)]
enum Kid {
    Word,
    Space,
    Span,
    EmptySpan,
    HiddenSpan,
    Div,
}

impl Arbitrary for Kid {
    fn arbitrary(g: &mut Gen) -> Self {
        *g.choose(&[
            Self::Word,
            Self::Space,
            Self::Span,
            Self::EmptySpan,
            Self::HiddenSpan,
            Self::Div,
        ])
        .expect("non-empty choice")
    }
}

/// Build `<body>` with the generated children and return it with its id.
fn doc_with(kids: &[Kid]) -> (Doc, NodeId) {
    let mut tree = DomTree::new();
    let body = tree.append_element(NodeId::ROOT, ElementData::new("body"));
    let mut hidden = Vec::new();
    for kid in kids {
        match kid {
            Kid::Word => {
                let _ = tree.append_text(body, "word");
            }
            Kid::Space => {
                let _ = tree.append_text(body, " \n ");
            }
            Kid::Span => {
                let span = tree.append_element(body, ElementData::new("span"));
                let _ = tree.append_text(span, "x");
            }
            Kid::EmptySpan => {
                let _ = tree.append_element(body, ElementData::new("span"));
            }
            Kid::HiddenSpan => {
                let span = tree.append_element(body, ElementData::new("span"));
                let _ = tree.append_text(span, "x");
                hidden.push(span);
            }
            Kid::Div => {
                let div = tree.append_element(body, ElementData::new("div"));
                let _ = tree.append_text(div, "block");
            }
        }
    }
    let mut styles = StyleMap::with_defaults(&tree);
    for id in hidden {
        styles.entry(id).visible = false;
    }
    (Doc::new(tree, styles), body)
}

#[quickcheck]
fn prop_normalize_preserves_document_order(kids: Vec<Kid>) -> bool {
    let (doc, body) = doc_with(&kids);
    let original: Vec<NodeId> = doc.tree.content_children(body).collect();
    unwrap_entries(&doc.normalize(body)) == original
}

#[quickcheck]
fn prop_mixed_output_has_no_bare_inline(kids: Vec<Kid>) -> bool {
    let (doc, body) = doc_with(&kids);
    let cx = doc.cx();
    let mixed = classify_children(&cx, &cx.children(&ContentNode::Dom(body))).is_mixed();
    let normalized = doc.normalize(body);

    if !mixed {
        return true;
    }
    let no_bare_inline = normalized.iter().all(|node| !is_inline(&cx, node));
    let maximal_runs = normalized
        .windows(2)
        .all(|pair| !(pair[0].is_anonymous() && pair[1].is_anonymous()));
    no_bare_inline && maximal_runs
}

#[quickcheck]
fn prop_normalize_is_idempotent(kids: Vec<Kid>) -> bool {
    let (doc, body) = doc_with(&kids);
    let cx = doc.cx();
    let parent = ContentNode::Dom(body);
    let once = doc.normalize(body);
    let twice = normalize(&cx, &parent, &once).expect("normalization succeeds");
    once == twice
}

#[quickcheck]
fn prop_unmixed_input_is_returned_unchanged(kids: Vec<Kid>) -> bool {
    let (doc, body) = doc_with(&kids);
    let cx = doc.cx();
    let children = cx.children(&ContentNode::Dom(body));
    classify_children(&cx, &children).is_mixed() || doc.normalize(body) == children
}

#[quickcheck]
fn prop_normalize_is_deterministic(kids: Vec<Kid>) -> bool {
    let (doc, body) = doc_with(&kids);
    doc.normalize(body) == doc.normalize(body)
}
