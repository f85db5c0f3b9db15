use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use treeshelf::model::bookmarks::BookmarkIndex;
use treeshelf::model::id::SequentialIds;
use treeshelf::model::path::Breadcrumb;
use treeshelf::model::search;
use treeshelf::{Folder, Node, NodeId, NodeKind, Note, ROOT_ID, Tree, TreeEngine, TreeError};

fn engine() -> TreeEngine {
    TreeEngine::from_tree(Tree::new("Root"), Box::new(SequentialIds::new("n")))
}

fn all_ids(tree: &Tree) -> Vec<NodeId> {
    let mut ids = Vec::new();
    tree.walk(|node, _| ids.push(node.id().clone()));
    ids
}

fn folder_ids(tree: &Tree) -> Vec<NodeId> {
    let mut ids = Vec::new();
    tree.walk(|node, _| {
        if node.kind() == NodeKind::Folder {
            ids.push(node.id().clone());
        }
    });
    ids
}

#[test]
fn ids_stay_unique_across_random_add_delete_sequences() {
    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut engine = engine();

        for step in 0..300 {
            let folders = folder_ids(engine.tree());
            let parent = folders[rng.gen_range(0..folders.len())].clone();
            match rng.gen_range(0..4) {
                0 => {
                    engine.add_folder(parent.as_str(), &format!("dir{step}")).unwrap();
                }
                1 => {
                    engine.add_note(parent.as_str(), &format!("note{step}")).unwrap();
                }
                2 => {
                    engine
                        .add_file(parent.as_str(), &format!("file{step}.txt"), None, 0)
                        .unwrap();
                }
                _ => {
                    let ids = all_ids(engine.tree());
                    let victim = &ids[rng.gen_range(0..ids.len())];
                    let deleted = engine.delete(victim.as_str());
                    assert_eq!(deleted, !victim.is_root());
                }
            }

            let ids = all_ids(engine.tree());
            let unique: HashSet<&NodeId> = ids.iter().collect();
            assert_eq!(unique.len(), ids.len(), "seed {seed} step {step}");
        }
    }
}

#[test]
fn folder_lookup_round_trips_through_node_lookup() {
    let mut engine = engine();
    let a = engine.add_folder(ROOT_ID, "a").unwrap();
    let b = engine.add_folder(a.as_str(), "b").unwrap();
    engine.add_note(b.as_str(), "n").unwrap();

    for id in folder_ids(engine.tree()) {
        let folder = engine.find_folder(id.as_str()).unwrap();
        let node = engine.find_node(folder.id().as_str()).unwrap();
        assert_eq!(node.as_folder(), Some(folder));
    }
}

#[test]
fn delete_removes_exactly_the_subtree() {
    let mut engine = engine();
    let docs = engine.add_folder(ROOT_ID, "Docs").unwrap();
    let keep = engine.add_note(ROOT_ID, "keep").unwrap();
    let inner = engine.add_folder(docs.as_str(), "inner").unwrap();
    let deep = engine.add_note(inner.as_str(), "deep").unwrap();
    let sibling = engine.add_note(docs.as_str(), "sibling").unwrap();

    let before = engine.tree().len();
    let root_children = engine.tree().root().child_count();

    assert!(engine.delete(docs.as_str()));

    assert_eq!(engine.tree().root().child_count(), root_children - 1);
    assert_eq!(engine.tree().len(), before - 4);
    for gone in [&docs, &inner, &deep, &sibling] {
        assert!(!engine.tree().contains(gone.as_str()));
    }
    assert!(engine.tree().contains(keep.as_str()));
}

#[test]
fn delete_inside_a_folder_decrements_only_that_parent() {
    let mut engine = engine();
    let docs = engine.add_folder(ROOT_ID, "Docs").unwrap();
    let a = engine.add_note(docs.as_str(), "a").unwrap();
    engine.add_note(docs.as_str(), "b").unwrap();

    assert!(engine.delete(a.as_str()));
    assert_eq!(engine.find_folder(docs.as_str()).unwrap().child_count(), 1);
    assert_eq!(engine.tree().root().child_count(), 1);
}

#[test]
fn blank_rename_keeps_the_old_name() {
    let mut engine = engine();
    let docs = engine.add_folder(ROOT_ID, "Docs").unwrap();

    for blank in ["", "   ", "\t\n"] {
        assert_eq!(
            engine.rename(docs.as_str(), blank).unwrap_err(),
            TreeError::InvalidName
        );
        assert_eq!(engine.find_node(docs.as_str()).unwrap().name(), "Docs");
    }
}

#[test]
fn resolve_skips_deleted_bookmarks() {
    let mut engine = engine();
    let a = engine.add_note(ROOT_ID, "a").unwrap();
    let b = engine.add_note(ROOT_ID, "b").unwrap();

    let mut bookmarks = BookmarkIndex::new();
    bookmarks.toggle(&a);
    bookmarks.toggle(&b);

    engine.delete(a.as_str());
    let resolved: Vec<&NodeId> = bookmarks
        .resolve(engine.tree())
        .into_iter()
        .map(Node::id)
        .collect();
    assert_eq!(resolved, vec![&b]);
    assert!(bookmarks.contains(a.as_str()));
}

#[test]
fn empty_term_is_the_identity() {
    let mut engine = engine();
    engine.add_folder(ROOT_ID, "Docs").unwrap();
    engine.add_note(ROOT_ID, "todo").unwrap();
    engine.add_file(ROOT_ID, "a.png", None, 1).unwrap();

    let nodes: Vec<&Node> = engine.tree().root().children().collect();
    assert_eq!(search::filter(nodes.iter().copied(), ""), nodes);
    assert_eq!(search::filter(nodes.iter().copied(), "  "), nodes);
    assert!(search::filter(Vec::<&Node>::new(), "").is_empty());
}

#[test]
fn docs_todo_scenario() {
    let mut engine = engine();
    engine
        .add_child(ROOT_ID, Folder::new("A", "Docs").unwrap().into())
        .unwrap();
    engine
        .add_child("A", Note::new("N1", "todo").unwrap().with_content("").into())
        .unwrap();

    let note = engine.find_node("N1").unwrap().as_note().unwrap();
    assert_eq!(note.content(), "");

    assert!(engine.edit_note_content("N1", "buy milk"));
    let note = engine.find_node("N1").unwrap().as_note().unwrap();
    assert_eq!(note.content(), "buy milk");
    assert!(note.updated_at() > note.created_at());
}

#[test]
fn breadcrumb_enter_and_back() {
    let mut path = Breadcrumb::new();
    path.enter(NodeId::from("A"));
    assert_eq!(path.ids(), &[NodeId::root(), NodeId::from("A")]);
    path.back_to(0).unwrap();
    assert_eq!(path.ids(), &[NodeId::root()]);
}

#[test]
fn bookmark_outlives_delete_until_removed() {
    let mut engine = engine();
    engine
        .add_child(ROOT_ID, Note::new("N1", "todo").unwrap().into())
        .unwrap();
    let mut bookmarks = BookmarkIndex::new();
    bookmarks.toggle(&NodeId::from("N1"));

    assert!(engine.delete("N1"));
    assert!(bookmarks.contains("N1"));

    assert!(bookmarks.remove("N1"));
    assert!(!bookmarks.contains("N1"));
}

#[test]
fn snapshots_are_isolated_from_deletes() {
    let mut engine = engine();
    let docs = engine.add_folder(ROOT_ID, "Docs").unwrap();
    engine.add_note(docs.as_str(), "todo").unwrap();
    let snapshot = engine.snapshot();

    engine.delete(docs.as_str());
    assert!(snapshot.contains(docs.as_str()));
    assert_eq!(snapshot.len(), 3);
    assert_eq!(engine.tree().len(), 1);
}
