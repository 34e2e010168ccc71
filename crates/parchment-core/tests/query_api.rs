use parchment_core::{
    is_block_active, is_mark_active, Align, BlockFormat, BlockKind, Document, Mark, Marks, Node,
    Point, Selection,
};

#[test]
fn fresh_document_has_nothing_active() {
    let doc = Document {
        children: vec![Node::paragraph("A line of text in a paragraph.")],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));

    for mark in Mark::ALL {
        assert!(!is_mark_active(&doc, &selection, mark));
    }
    assert!(is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::Paragraph)
    ));
    assert!(!is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::BulletedList)
    ));
    assert!(!is_block_active(&doc, &selection, BlockFormat::Align(Align::Center)));
}

#[test]
fn collapsed_selection_reads_the_caret_leaf() {
    let doc = Document {
        children: vec![Node::element(
            BlockKind::Paragraph,
            vec![
                Node::text("plain", Marks::default()),
                Node::text("bold", Marks::with(Mark::Bold)),
            ],
        )],
    };

    let in_plain = Selection::collapsed(Point::new(vec![0, 0], 3));
    assert!(!is_mark_active(&doc, &in_plain, Mark::Bold));

    let in_bold = Selection::collapsed(Point::new(vec![0, 1], 2));
    assert!(is_mark_active(&doc, &in_bold, Mark::Bold));
}

#[test]
fn drag_direction_does_not_matter() {
    let doc = Document {
        children: vec![Node::element(
            BlockKind::Paragraph,
            vec![
                Node::text("ab", Marks::with(Mark::Italic)),
                Node::text("cd", Marks::default()),
            ],
        )],
    };

    let forward = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![0, 1], 2),
    };
    let backward = Selection {
        anchor: Point::new(vec![0, 1], 2),
        focus: Point::new(vec![0, 0], 0),
    };
    assert!(is_mark_active(&doc, &forward, Mark::Italic));
    assert!(is_mark_active(&doc, &backward, Mark::Italic));
}

#[test]
fn unhang_excludes_a_block_merely_touched_at_its_start() {
    let doc = Document {
        children: vec![
            Node::paragraph("one"),
            Node::element(BlockKind::BulletedList, vec![Node::list_item("two")]),
        ],
    };

    // The range visually covers "one" but the focus sits at offset 0 of
    // the first list leaf. Unhanging pulls it back, so the list does not
    // count as selected.
    let selection = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0, 0], 0),
    };
    assert!(!is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::BulletedList)
    ));

    // One character into the list leaf is a real intersection.
    let into_list = Selection {
        anchor: Point::new(vec![0, 0], 0),
        focus: Point::new(vec![1, 0, 0], 1),
    };
    assert!(is_block_active(
        &doc,
        &into_list,
        BlockFormat::Kind(BlockKind::BulletedList)
    ));
}

#[test]
fn ancestor_container_counts_as_intersecting() {
    let doc = Document {
        children: vec![Node::element(
            BlockKind::NumberedList,
            vec![Node::list_item("item")],
        )],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0, 0], 2));

    assert!(is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::NumberedList)
    ));
    assert!(is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::ListItem)
    ));
    assert!(!is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::Paragraph)
    ));
}

#[test]
fn out_of_range_points_are_clamped() {
    let doc = Document {
        children: vec![Node::paragraph("ok")],
    };
    let selection = Selection {
        anchor: Point::new(vec![9, 9], 99),
        focus: Point::new(vec![0, 0], 0),
    };
    // Clamping lands both points on the only leaf.
    assert!(is_block_active(
        &doc,
        &selection,
        BlockFormat::Kind(BlockKind::Paragraph)
    ));
}
