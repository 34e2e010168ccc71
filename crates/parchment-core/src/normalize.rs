use crate::document::{Document, Marks, Node};
use crate::ops::Op;

/// One round of constraint repair. The editor applies the returned ops and
/// re-runs until no pass produces any, recording the inverses in the same
/// history entry as the mutation that triggered them. Only the first pass
/// with work to do contributes per round; its ops were computed against
/// the current tree and later passes would see stale paths.
pub(crate) fn normalize_ops(doc: &Document) -> Vec<Op> {
    let passes: [fn(&Document) -> Vec<Op>; 4] = [
        ensure_non_empty_document,
        drop_empty_list_containers,
        ensure_blocks_have_text_leaf,
        merge_adjacent_text_leaves,
    ];
    for pass in passes {
        let ops = pass(doc);
        if !ops.is_empty() {
            return ops;
        }
    }
    Vec::new()
}

fn ensure_non_empty_document(doc: &Document) -> Vec<Op> {
    if doc.children.is_empty() {
        return vec![Op::InsertNode {
            path: vec![0],
            node: Node::paragraph(""),
        }];
    }
    Vec::new()
}

fn drop_empty_list_containers(doc: &Document) -> Vec<Op> {
    let mut ops = Vec::new();
    for (ix, node) in doc.children.iter().enumerate().rev() {
        if let Node::Element(el) = node {
            if el.kind.is_list() && el.children.is_empty() {
                ops.push(Op::RemoveNode { path: vec![ix] });
            }
        }
    }
    ops
}

fn ensure_blocks_have_text_leaf(doc: &Document) -> Vec<Op> {
    let mut ops = Vec::new();

    fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);

            if el.kind.is_list() {
                walk(&el.children, path, ops);
            } else {
                let has_text = el.children.iter().any(|n| matches!(n, Node::Text(_)));
                if !has_text {
                    let mut insert_path = path.clone();
                    insert_path.push(0);
                    ops.push(Op::InsertNode {
                        path: insert_path,
                        node: Node::text("", Marks::default()),
                    });
                }
            }

            path.pop();
        }
    }

    walk(&doc.children, &mut Vec::new(), &mut ops);
    ops
}

fn merge_adjacent_text_leaves(doc: &Document) -> Vec<Op> {
    // One pair per round; the convergence loop folds longer runs. The
    // removed leaf's text then always sits at the end of its merged left
    // sibling, which the selection transform on node removal relies on.
    fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) -> bool {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);

            if el.kind.is_list() {
                if walk(&el.children, path, ops) {
                    path.pop();
                    return true;
                }
                path.pop();
                continue;
            }

            for pair_ix in 1..el.children.len() {
                let (Some(Node::Text(left)), Some(Node::Text(right))) =
                    (el.children.get(pair_ix - 1), el.children.get(pair_ix))
                else {
                    continue;
                };
                if left.marks != right.marks {
                    continue;
                }

                if !right.text.is_empty() {
                    let mut insert_text_path = path.clone();
                    insert_text_path.push(pair_ix - 1);
                    ops.push(Op::InsertText {
                        path: insert_text_path,
                        offset: left.text.len(),
                        text: right.text.clone(),
                    });
                }
                let mut remove_path = path.clone();
                remove_path.push(pair_ix);
                ops.push(Op::RemoveNode { path: remove_path });

                path.pop();
                return true;
            }

            path.pop();
        }
        false
    }

    let mut ops = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut ops);
    ops
}
