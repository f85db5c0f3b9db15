use treeshelf::model::id::SequentialIds;
use treeshelf::storage::{self, FsSlotStore, MemorySlotStore, Slot, SlotStore};
use treeshelf::{Opened, ROOT_ID, Session, SessionOptions, Tree, TreeEngine};

fn options() -> SessionOptions {
    SessionOptions {
        root_name: "Shelf".to_string(),
        ..SessionOptions::default()
    }
}

#[test]
fn session_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (docs, note) = {
        let store = FsSlotStore::open(dir.path()).unwrap();
        let mut session = Session::load_with_ids(
            Box::new(store),
            Box::new(SequentialIds::new("p")),
            options(),
        )
        .unwrap();
        let docs = session.add_folder("Docs").unwrap();
        session.enter_folder(docs.as_str()).unwrap();
        let note = session.add_note("todo").unwrap();
        session.add_file("photo.png", vec![1, 2, 3]).unwrap();
        session.toggle_bookmark(note.as_str()).unwrap();
        session.toggle_theme();

        session.open(note.as_str()).unwrap();
        for ch in "eggs".chars() {
            session.note_draft_mut().unwrap().insert_char(ch);
        }
        session.close_preview();
        (docs, note)
    };

    let store = FsSlotStore::open(dir.path()).unwrap();
    let mut session = Session::load(Box::new(store), options()).unwrap();

    assert!(session.dark_mode());
    assert!(session.is_bookmarked(note.as_str()));
    assert_eq!(session.tree().root().name(), "Shelf");

    let stored = session.tree().find_node(note.as_str()).unwrap();
    assert_eq!(stored.as_note().unwrap().content(), "eggs");

    session.enter_folder(docs.as_str()).unwrap();
    let photo = session
        .visible_items()
        .into_iter()
        .find(|node| node.name() == "photo.png")
        .unwrap();
    let photo_file = photo.as_file().unwrap();
    assert_eq!(photo_file.size(), 3);
    assert!(photo_file.preview().is_some());
    assert!(photo_file.payload().is_none());

    let photo_id = photo.id().clone();
    assert!(matches!(
        session.open(photo_id.as_str()).unwrap(),
        Opened::Preview
    ));
}

#[test]
fn tree_slot_uses_tagged_json() {
    let mut store = MemorySlotStore::new();
    let mut engine = TreeEngine::from_tree(Tree::new("Root"), Box::new(SequentialIds::new("j")));
    let docs = engine.add_folder(ROOT_ID, "Docs").unwrap();
    engine.add_note(docs.as_str(), "todo").unwrap();
    storage::save_tree(&mut store, engine.tree()).unwrap();

    let raw: serde_json::Value = serde_json::from_str(store.get(Slot::Tree).unwrap()).unwrap();
    assert_eq!(raw["type"], "folder");
    assert_eq!(raw["id"], "root");
    assert_eq!(raw["children"][0]["name"], "Docs");
    assert_eq!(raw["children"][0]["children"][0]["type"], "note");

    let reloaded = storage::load_tree(&store, "ignored").unwrap();
    assert_eq!(&reloaded, engine.tree());
}

#[test]
fn duplicate_ids_in_a_stored_tree_are_rejected() {
    let mut store = MemorySlotStore::new();
    store
        .write(
            Slot::Tree,
            r#"{"type":"folder","id":"root","name":"Root","children":[
                {"type":"folder","id":"x","name":"a"},
                {"type":"folder","id":"x","name":"b"}
            ]}"#,
        )
        .unwrap();

    assert!(Session::load(Box::new(store), options()).is_err());
}

#[test]
fn bookmarks_slot_is_a_plain_id_array() {
    let mut session = Session::load_with_ids(
        Box::new(MemorySlotStore::new()),
        Box::new(SequentialIds::new("b")),
        options(),
    )
    .unwrap();
    let a = session.add_note("a").unwrap();
    session.toggle_bookmark(a.as_str()).unwrap();

    let index = session.bookmarks();
    assert_eq!(serde_json::to_string(index).unwrap(), r#"["b1"]"#);
}
