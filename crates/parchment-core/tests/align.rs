use parchment_core::{
    Align, BlockFormat, BlockKind, Document, Editor, Node, Point, Selection,
};

fn aligns(doc: &Document) -> Vec<Option<Align>> {
    doc.children
        .iter()
        .map(|n| match n {
            Node::Element(el) => el.align,
            Node::Text(_) => panic!("text leaf at top level"),
        })
        .collect()
}

#[test]
fn align_sets_and_clears_on_the_block() {
    let doc = Document {
        children: vec![Node::paragraph("centred")],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 3));
    let mut editor = Editor::new(doc, selection);

    assert!(!editor.is_block_active(BlockFormat::Align(Align::Center)));
    assert!(editor.toggle_block(BlockFormat::Align(Align::Center)).unwrap());
    assert_eq!(aligns(editor.doc()), vec![Some(Align::Center)]);
    assert!(editor.is_block_active(BlockFormat::Align(Align::Center)));

    assert!(editor.toggle_block(BlockFormat::Align(Align::Center)).unwrap());
    assert_eq!(aligns(editor.doc()), vec![None]);
}

#[test]
fn switching_alignment_replaces_the_previous_one() {
    let doc = Document {
        children: vec![Node::paragraph("text")],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    let mut editor = Editor::new(doc, selection);

    assert!(editor.toggle_block(BlockFormat::Align(Align::Right)).unwrap());
    // Right is active, justify is not, so the toggle sets justify.
    assert!(editor.toggle_block(BlockFormat::Align(Align::Justify)).unwrap());
    assert_eq!(aligns(editor.doc()), vec![Some(Align::Justify)]);
    assert!(!editor.is_block_active(BlockFormat::Align(Align::Right)));
}

#[test]
fn align_applies_across_multi_block_selection() {
    let doc = Document {
        children: vec![
            Node::paragraph("a"),
            Node::paragraph("b"),
            Node::paragraph("c"),
        ],
    };
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![2, 0], 1),
    };
    let mut editor = Editor::new(doc, selection);

    assert!(editor.toggle_block(BlockFormat::Align(Align::Right)).unwrap());
    assert_eq!(
        aligns(editor.doc()),
        vec![Some(Align::Right), Some(Align::Right), Some(Align::Right)]
    );
    // Selection stays where it was.
    assert_eq!(editor.selection().focus, Point::new(vec![2, 0], 1));
}

#[test]
fn align_lands_on_list_items_not_the_container() {
    let doc = Document {
        children: vec![Node::element(
            BlockKind::BulletedList,
            vec![Node::list_item("a"), Node::list_item("b")],
        )],
    };
    let selection = Selection {
        anchor: Point::new(vec![0, 0, 0], 0),
        focus: Point::new(vec![0, 1, 0], 1),
    };
    let mut editor = Editor::new(doc, selection);

    assert!(editor.toggle_block(BlockFormat::Align(Align::Center)).unwrap());

    let Node::Element(container) = &editor.doc().children[0] else {
        panic!("expected list container");
    };
    assert_eq!(container.kind, BlockKind::BulletedList);
    assert_eq!(container.align, None);
    for item in &container.children {
        let Node::Element(el) = item else {
            panic!("expected list item");
        };
        assert_eq!(el.kind, BlockKind::ListItem);
        assert_eq!(el.align, Some(Align::Center));
    }
}

#[test]
fn mixed_alignment_selection_activates_and_unifies() {
    let mut first = Node::paragraph("a");
    if let Node::Element(el) = &mut first {
        el.align = Some(Align::Center);
    }
    let doc = Document {
        children: vec![first, Node::paragraph("b")],
    };
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0], 1),
    };
    let mut editor = Editor::new(doc, selection);

    // One block already matches, so the query is active and the toggle
    // clears across the range.
    assert!(editor.is_block_active(BlockFormat::Align(Align::Center)));
    assert!(editor.toggle_block(BlockFormat::Align(Align::Center)).unwrap());
    assert_eq!(aligns(editor.doc()), vec![None, None]);
}
