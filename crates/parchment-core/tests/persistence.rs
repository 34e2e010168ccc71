use parchment_core::{
    default_document, load_document, save_document, BlockKind, Document, Mark, Marks, MemoryStore,
    FileStore, Node, SnapshotStore, CONTENT_KEY,
};
use pretty_assertions::assert_eq;

#[test]
fn missing_snapshot_loads_the_default_document() {
    let store = MemoryStore::new();
    let doc = load_document(&store);
    assert_eq!(
        doc.children,
        vec![Node::paragraph("A line of text in a paragraph.")]
    );
    assert_eq!(doc, default_document());
}

#[test]
fn save_then_load_round_trips() {
    let doc = Document {
        children: vec![
            Node::paragraph("plain"),
            Node::element(
                BlockKind::BulletedList,
                vec![Node::list_item("first"), Node::list_item("second")],
            ),
        ],
    };

    let mut store = MemoryStore::new();
    save_document(&mut store, &doc);
    assert_eq!(load_document(&store), doc);
}

#[test]
fn snapshot_wire_format_is_the_bare_node_array() {
    let doc = Document {
        children: vec![Node::element(
            BlockKind::Paragraph,
            vec![
                Node::text("A ", Marks::default()),
                Node::text("bold", Marks::with(Mark::Bold)),
                Node::text(" word.", Marks::default()),
            ],
        )],
    };

    let mut store = MemoryStore::new();
    save_document(&mut store, &doc);

    let raw = store.read(CONTENT_KEY).unwrap().unwrap();
    assert_eq!(
        raw,
        r#"[{"type":"paragraph","children":[{"text":"A "},{"text":"bold","bold":true},{"text":" word."}]}]"#
    );
}

#[test]
fn inactive_marks_and_unset_alignment_are_omitted() {
    let doc = default_document();
    let mut store = MemoryStore::new();
    save_document(&mut store, &doc);

    let raw = store.read(CONTENT_KEY).unwrap().unwrap();
    assert!(!raw.contains("bold"));
    assert!(!raw.contains("align"));
}

#[test]
fn malformed_snapshot_falls_back_to_the_default() {
    let mut store = MemoryStore::new();
    store.write(CONTENT_KEY, "{not json").unwrap();
    assert_eq!(load_document(&store), default_document());
}

#[test]
fn structurally_invalid_snapshot_falls_back_to_the_default() {
    let mut store = MemoryStore::new();
    // A list container holding a bare text leaf violates nesting.
    store
        .write(
            CONTENT_KEY,
            r#"[{"type":"bulleted-list","children":[{"text":"loose"}]}]"#,
        )
        .unwrap();
    assert_eq!(load_document(&store), default_document());
}

#[test]
fn orphan_top_level_leaf_falls_back_to_the_default() {
    let mut store = MemoryStore::new();
    // A text leaf with no parent block violates nesting.
    store
        .write(CONTENT_KEY, r#"[{"text":"orphan"}]"#)
        .unwrap();
    assert_eq!(load_document(&store), default_document());
}

#[test]
fn file_store_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path());

    let doc = Document {
        children: vec![Node::paragraph("persisted")],
    };
    save_document(&mut store, &doc);

    assert!(dir.path().join("content.json").is_file());
    assert_eq!(load_document(&store), doc);
}

#[test]
fn file_store_reports_a_missing_file_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("nested"));
    assert_eq!(store.read(CONTENT_KEY).unwrap(), None);
    assert_eq!(load_document(&store), default_document());
}

#[test]
fn loaded_snapshot_restores_mark_and_list_structure() {
    let mut store = MemoryStore::new();
    store
        .write(
            CONTENT_KEY,
            r#"[{"type":"numbered-list","children":[{"type":"list-item","align":"center","children":[{"text":"styled","italic":true}]}]}]"#,
        )
        .unwrap();

    let doc = load_document(&store);
    let Node::Element(container) = &doc.children[0] else {
        panic!("expected list container");
    };
    assert_eq!(container.kind, BlockKind::NumberedList);
    let Node::Element(item) = &container.children[0] else {
        panic!("expected list item");
    };
    assert_eq!(item.kind, BlockKind::ListItem);
    assert_eq!(item.align, Some(parchment_core::Align::Center));
    let Node::Text(t) = &item.children[0] else {
        panic!("expected text leaf");
    };
    assert_eq!(t.text, "styled");
    assert!(t.marks.italic && !t.marks.bold);
}
