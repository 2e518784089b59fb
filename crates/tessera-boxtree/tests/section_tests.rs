//! Integration tests for the section root: wrapper flattening and
//! incremental child-list updates.

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;
use tessera_boxtree::{
    BoxId, BoxKind, BuildContext, BuildOptions, ContentNode, FactoryRegistry, LayoutBox,
    TrackedSubtree, WrapperConvention, WrapperKind, build_box_tree, compute_visible_children,
};
use tessera_dom::{DocumentText, DomTree, ElementData, NodeId, NodeType, StructuralChange};
use tessera_style::StyleMap;

struct Doc {
    tree: DomTree,
    text: DocumentText,
    styles: StyleMap,
    factories: FactoryRegistry,
    options: BuildOptions,
}

impl Doc {
    fn new(tree: DomTree) -> Self {
        Self {
            text: DocumentText::index(&tree),
            styles: StyleMap::with_defaults(&tree),
            tree,
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

    fn build(&self) -> LayoutBox {
        build_box_tree(&self.cx()).expect("box tree builds")
    }

    /// Re-index text and styles after the tree was edited.
    fn reindex(&mut self) {
        self.text = DocumentText::index(&self.tree);
        self.styles = StyleMap::with_defaults(&self.tree);
    }

    /// Apply `change` to `root` the way an embedder would after a mutation.
    fn apply(&mut self, root: &mut LayoutBox, change: &StructuralChange) -> bool {
        self.reindex();
        let factory = self.factories.default_factory();
        root.apply_structural_change(&self.cx(), factory.as_ref(), change)
            .expect("change applies")
    }
}

/// `<html><head><title>T</title></head><body></body></html>`
fn html_document() -> (DomTree, NodeId, NodeId) {
    let mut tree = DomTree::new();
    let html = tree.append_element(NodeId::ROOT, ElementData::new("html"));
    let head = tree.append_element(html, ElementData::new("head"));
    let title = tree.append_element(head, ElementData::new("title"));
    let _ = tree.append_text(title, "T");
    let body = tree.append_element(html, ElementData::new("body"));
    (tree, html, body)
}

fn div(tree: &mut DomTree, text: &str) -> NodeId {
    let div = tree.alloc(NodeType::Element(ElementData::new("div")));
    let _ = tree.append_text(div, text);
    div
}

fn kinds(boxes: &[LayoutBox]) -> Vec<BoxKind> {
    boxes.iter().map(LayoutBox::kind).collect()
}

fn ids(boxes: &[LayoutBox]) -> Vec<BoxId> {
    boxes.iter().map(LayoutBox::id).collect()
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

#[test]
fn test_body_children_become_section_children() {
    let (mut tree, html, body) = html_document();
    let a = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(a, "aaaa");
    let b = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(b, "bbbb");
    let doc = Doc::new(tree);

    let root = doc.build();
    assert_eq!(
        kinds(root.children()),
        vec![BoxKind::Paragraph, BoxKind::Paragraph]
    );
    assert_eq!(root.children()[0].dom_node(), Some(a));
    assert_eq!(root.children()[1].range(), 5..9);

    let state = root.section_state().expect("root is a section");
    assert_eq!(
        state.subtrees(),
        &[TrackedSubtree {
            root: html,
            wrapper: Some(body),
            entries: 2,
        }]
    );
}

#[test]
fn test_without_wrapper_the_html_element_is_boxed() {
    let (mut tree, html, body) = html_document();
    let _ = tree.append_text(body, "x");
    let mut doc = Doc::new(tree);
    doc.options.wrapper = WrapperKind::None;

    let root = doc.build();
    assert_eq!(kinds(root.children()), vec![BoxKind::Block]);
    let html_box = &root.children()[0];
    assert_eq!(html_box.dom_node(), Some(html));
    assert_eq!(
        kinds(html_box.children()),
        vec![BoxKind::Invisible, BoxKind::Paragraph]
    );
}

#[test]
fn test_non_html_roots_are_kept_whole() {
    let mut tree = DomTree::new();
    let first = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let _ = tree.append_text(first, "one");
    let second = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let _ = tree.append_text(second, "two");
    let doc = Doc::new(tree);

    let root = doc.build();
    let state = root.section_state().expect("root is a section");
    assert_eq!(state.subtrees().len(), 2);
    assert!(state.subtrees().iter().all(|s| s.wrapper.is_none() && s.entries == 1));
    assert_eq!(root.children().len(), 2);
}

/// Treats a top-level `doc` element's `content` child as the wrapper.
struct ContentWrapper;

impl WrapperConvention for ContentWrapper {
    fn wrapper_of(&self, tree: &DomTree, root: NodeId) -> Option<NodeId> {
        if !tree.as_element(root)?.has_local_name("doc") {
            return None;
        }
        tree.children(root)
            .iter()
            .copied()
            .find(|&child| self.is_wrapper(tree, child))
    }

    fn is_wrapper(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.as_element(node)
            .is_some_and(|element| element.has_local_name("content"))
    }
}

#[test]
fn test_custom_wrapper_convention() {
    let mut tree = DomTree::new();
    let root_el = tree.append_element(NodeId::ROOT, ElementData::new("doc"));
    let meta = tree.append_element(root_el, ElementData::new("meta"));
    let _ = tree.append_text(meta, "ignored");
    let content = tree.append_element(root_el, ElementData::new("content"));
    let para = tree.append_element(content, ElementData::new("div"));
    let _ = tree.append_text(para, "kept");
    let doc = Doc::new(tree);

    let cx = doc.cx().with_wrapper(&ContentWrapper);
    let root = build_box_tree(&cx).expect("box tree builds");
    assert_eq!(root.children().len(), 1);
    assert_eq!(root.children()[0].dom_node(), Some(para));
}

#[test]
fn test_compute_visible_children_filters_by_range() {
    let (mut tree, _html, body) = html_document();
    let a = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(a, "aaaa");
    let b = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(b, "bbbb");
    let doc = Doc::new(tree);
    let cx = doc.cx();

    // "T" of the title is 0..1 but the head is never section content.
    let all = compute_visible_children(&cx, NodeId::ROOT, 0, 9).expect("indexed");
    assert_eq!(all, vec![ContentNode::Dom(a), ContentNode::Dom(b)]);

    let tail = compute_visible_children(&cx, NodeId::ROOT, 5, 9).expect("indexed");
    assert_eq!(tail, vec![ContentNode::Dom(b)]);

    let none = compute_visible_children(&cx, NodeId::ROOT, 0, 1).expect("indexed");
    assert!(none.is_empty());
}

// ---------------------------------------------------------------------------
// Incremental updates
// ---------------------------------------------------------------------------

#[test]
fn test_insert_block_between_blocks_keeps_neighbours() {
    let (mut tree, _html, body) = html_document();
    let a = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(a, "aaaa");
    let b = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(b, "bbbb");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    let before = ids(root.children());

    let c = div(&mut doc.tree, "cc");
    let change = doc.tree.splice_children(body, 1, 0, &[c]);
    assert!(doc.apply(&mut root, &change));

    let after = ids(root.children());
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[1]);
    assert_eq!(root.children()[1].dom_node(), Some(c));
    // Ranges of the untouched boxes follow the new text index.
    assert_eq!(root.children()[2].range(), 7..11);
    assert_eq!(root.range(), 0..11);
}

#[test]
fn test_insert_inline_extends_anonymous_run() {
    let (mut tree, _html, body) = html_document();
    let first = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(first, "aa");
    let text = tree.append_text(body, "run");
    let last = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(last, "bb");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    let before = ids(root.children());

    let span = doc.tree.alloc(NodeType::Element(ElementData::new("span")));
    let _ = doc.tree.append_text(span, "more");
    let change = doc.tree.splice_children(body, 2, 0, &[span]);
    assert!(doc.apply(&mut root, &change));

    assert_eq!(
        kinds(root.children()),
        vec![BoxKind::Paragraph, BoxKind::Paragraph, BoxKind::Paragraph]
    );
    let run = &root.children()[1];
    let ContentNode::Anonymous(anon) = run.node() else {
        panic!("expected the anonymous run, got {:?}", run.node());
    };
    assert_eq!(anon.children(), &[text, span]);
    assert_eq!(run.children().len(), 2);
    let after = ids(root.children());
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert_ne!(after[1], before[1]);
}

#[test]
fn test_removing_a_block_merges_runs() {
    let (mut tree, _html, body) = html_document();
    let a = tree.append_text(body, "a");
    let split = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(split, "split");
    let b = tree.append_text(body, "b");
    let tail = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(tail, "tail");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    assert_eq!(root.children().len(), 4);
    let tail_id = root.children()[3].id();

    let change = doc.tree.splice_children(body, 1, 1, &[]);
    assert!(doc.apply(&mut root, &change));

    assert_eq!(root.children().len(), 2);
    let ContentNode::Anonymous(anon) = root.children()[0].node() else {
        panic!("expected a merged anonymous run");
    };
    assert_eq!(anon.children(), &[a, b]);
    assert_eq!(root.children()[1].id(), tail_id);
    assert_eq!(root.children()[1].range(), 3..7);
}

#[test]
fn test_mixing_flip_rebuilds_everything() {
    let (mut tree, _html, body) = html_document();
    let a = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(a, "aa");
    let b = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(b, "bb");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();

    let text = doc.tree.alloc(NodeType::Text("loose".to_string()));
    let change = doc.tree.splice_children(body, 1, 0, &[text]);
    assert!(doc.apply(&mut root, &change));

    assert_eq!(root.children().len(), 3);
    assert!(root.children()[1].node().is_anonymous());
    assert_eq!(root.summary(), doc.build().summary());
}

#[test]
fn test_document_child_change_retracks_subtrees() {
    let mut tree = DomTree::new();
    let first = tree.append_element(NodeId::ROOT, ElementData::new("div"));
    let _ = tree.append_text(first, "one");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();

    let second = div(&mut doc.tree, "two");
    let change = doc.tree.splice_children(NodeId::ROOT, 1, 0, &[second]);
    assert!(doc.apply(&mut root, &change));

    let state = root.section_state().expect("root is a section");
    assert_eq!(state.subtrees().len(), 2);
    assert_eq!(root.children()[1].dom_node(), Some(second));
}

#[test]
fn test_nested_change_repopulates_enclosing_box_only() {
    let (mut tree, _html, body) = html_document();
    let a = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(a, "aa");
    let b = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(b, "bb");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    let before = ids(root.children());

    let extra = doc.tree.alloc(NodeType::Text("cc".to_string()));
    let change = doc.tree.splice_children(a, 1, 0, &[extra]);
    assert!(doc.apply(&mut root, &change));

    assert_eq!(ids(root.children()), before);
    assert_eq!(root.children()[0].children().len(), 2);
    assert_eq!(root.children()[0].range(), 1..5);
    assert_eq!(root.children()[1].range(), 5..7);
}

#[test]
fn test_change_in_head_rebuilds_section() {
    let (mut tree, html, body) = html_document();
    let _ = tree.append_text(body, "x");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();

    let head = doc.tree.children(html)[0];
    let style = doc.tree.alloc(NodeType::Element(ElementData::new("style")));
    let change = doc.tree.splice_children(head, 1, 0, &[style]);
    assert!(doc.apply(&mut root, &change));
    assert_eq!(root.summary(), doc.build().summary());
}

#[test]
fn test_detached_change_is_ignored() {
    let (mut tree, _html, body) = html_document();
    let _ = tree.append_text(body, "x");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    let before = root.summary();

    let detached = doc.tree.alloc(NodeType::Element(ElementData::new("div")));
    let child = div(&mut doc.tree, "floating");
    let change = doc.tree.splice_children(detached, 0, 0, &[child]);
    assert!(!doc.apply(&mut root, &change));
    assert_eq!(root.summary(), before);
}

#[test]
fn test_comment_before_edit_keeps_splice_aligned() {
    let (mut tree, _html, body) = html_document();
    let comment = tree.alloc(NodeType::Comment("c".to_string()));
    tree.append_child(body, comment);
    let a = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(a, "aa");
    let _ = tree.append_text(body, "t1");
    let b = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(b, "bb");
    let c = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(c, "cc");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    let tail_id = root.children()[3].id();

    // Index 3 counts the comment; `b` is the third content child.
    let change = doc.tree.splice_children(body, 3, 1, &[]);
    assert!(doc.apply(&mut root, &change));

    assert_eq!(root.summary(), doc.build().summary());
    assert_eq!(root.children().len(), 3);
    assert_eq!(root.children()[2].dom_node(), Some(c));
    assert_eq!(root.children()[2].id(), tail_id);
}

#[test]
fn test_block_inserted_into_paragraph_redispatches_it() {
    let (mut tree, _html, body) = html_document();
    let host = tree.append_element(body, ElementData::new("div"));
    let _ = tree.append_text(host, "words");
    let mut doc = Doc::new(tree);
    let mut root = doc.build();
    assert_eq!(kinds(root.children()), vec![BoxKind::Paragraph]);

    let block = div(&mut doc.tree, "block");
    let change = doc.tree.splice_children(host, 1, 0, &[block]);
    assert!(doc.apply(&mut root, &change));

    assert_eq!(kinds(root.children()), vec![BoxKind::Block]);
    assert_eq!(root.summary(), doc.build().summary());

    // Removing it again turns the block back into a paragraph.
    let change = doc.tree.splice_children(host, 1, 1, &[]);
    assert!(doc.apply(&mut root, &change));
    assert_eq!(kinds(root.children()), vec![BoxKind::Paragraph]);
    assert_eq!(root.summary(), doc.build().summary());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Kid {
    Word,
    Space,
    Span,
    Div,
    Comment,
}

impl Arbitrary for Kid {
    fn arbitrary(g: &mut Gen) -> Self {
        const KIDS: [Kid; 5] = [Kid::Word, Kid::Space, Kid::Span, Kid::Div, Kid::Comment];
        *g.choose(&KIDS)
            .expect("non-empty choice")
    }
}

fn make_kid(tree: &mut DomTree, kid: Kid) -> NodeId {
    match kid {
        Kid::Word => tree.alloc(NodeType::Text("word".to_string())),
        Kid::Space => tree.alloc(NodeType::Text("  ".to_string())),
        Kid::Span => {
            let span = tree.alloc(NodeType::Element(ElementData::new("span")));
            let _ = tree.append_text(span, "s");
            span
        }
        Kid::Div => div(tree, "block"),
        Kid::Comment => tree.alloc(NodeType::Comment("note".to_string())),
    }
}

/// One child-list edit of the body.
#[derive(Debug, Clone)]
struct Edit {
    index: usize,
    remove: usize,
    insert: Vec<Kid>,
}

impl Arbitrary for Edit {
    fn arbitrary(g: &mut Gen) -> Self {
        Self {
            index: usize::arbitrary(g) % 8,
            remove: usize::arbitrary(g) % 3,
            insert: Vec::<Kid>::arbitrary(g).into_iter().take(3).collect(),
        }
    }
}

#[quickcheck]
fn prop_incremental_update_matches_fresh_build(kids: Vec<Kid>, edits: Vec<Edit>) -> bool {
    let (mut tree, _html, body) = html_document();
    for kid in kids {
        let node = make_kid(&mut tree, kid);
        tree.append_child(body, node);
    }
    let mut doc = Doc::new(tree);
    let mut root = doc.build();

    for edit in edits {
        let added: Vec<NodeId> = edit
            .insert
            .iter()
            .map(|&kid| make_kid(&mut doc.tree, kid))
            .collect();
        let change = doc
            .tree
            .splice_children(body, edit.index, edit.remove, &added);
        let _ = doc.apply(&mut root, &change);
        if root.summary() != doc.build().summary() {
            return false;
        }
    }
    true
}
