use std::fs;
use std::sync::mpsc;

use treeshelf::model::id::SequentialIds;
use treeshelf::model::view::ViewMode;
use treeshelf::preview::PreviewBody;
use treeshelf::preview::worker::spawn_decode;
use treeshelf::storage::MemorySlotStore;
use treeshelf::{NodeId, Opened, Session, SessionOptions};

fn session() -> Session {
    Session::load_with_ids(
        Box::new(MemorySlotStore::new()),
        Box::new(SequentialIds::new("s")),
        SessionOptions::default(),
    )
    .unwrap()
}

fn visible(session: &Session) -> Vec<String> {
    session
        .visible_items()
        .into_iter()
        .map(|node| node.name().to_string())
        .collect()
}

#[test]
fn search_narrows_the_current_folder_only() {
    let mut session = session();
    session.add_note("Shopping").unwrap();
    session.add_note("work").unwrap();
    let docs = session.add_folder("Docs").unwrap();
    session.enter_folder(docs.as_str()).unwrap();
    session.add_note("shop receipts").unwrap();
    session.go_back(0).unwrap();

    session.set_search("SHOP");
    assert_eq!(visible(&session), vec!["Shopping"]);

    session.set_search("   ");
    assert_eq!(visible(&session), vec!["Shopping", "work", "Docs"]);
}

#[test]
fn bookmark_view_lists_in_toggle_order_and_filters() {
    let mut session = session();
    let a = session.add_note("alpha").unwrap();
    let docs = session.add_folder("Docs").unwrap();
    session.enter_folder(docs.as_str()).unwrap();
    let b = session.add_note("beta").unwrap();

    session.toggle_bookmark(b.as_str()).unwrap();
    session.toggle_bookmark(a.as_str()).unwrap();

    assert_eq!(session.toggle_bookmark_view(), ViewMode::Bookmarks);
    assert_eq!(session.current_folder_id(), &NodeId::root());
    assert_eq!(visible(&session), vec!["beta", "alpha"]);

    session.set_search("al");
    assert_eq!(visible(&session), vec!["alpha"]);

    assert_eq!(session.toggle_bookmark_view(), ViewMode::Folder);
}

#[test]
fn deleting_a_bookmarked_note_clears_the_bookmark() {
    let mut session = session();
    let note = session.add_note("todo").unwrap();
    session.toggle_bookmark(note.as_str()).unwrap();

    assert!(session.delete(note.as_str()));
    assert!(!session.is_bookmarked(note.as_str()));
    assert!(session.bookmarks().is_empty());
}

#[test]
fn deleting_the_current_folder_moves_back_to_its_parent() {
    let mut session = session();
    let a = session.add_folder("a").unwrap();
    session.enter_folder(a.as_str()).unwrap();
    let b = session.add_folder("b").unwrap();
    session.enter_folder(b.as_str()).unwrap();

    assert!(session.delete(b.as_str()));
    assert_eq!(session.current_folder_id(), &a);
    assert_eq!(session.breadcrumb().ids(), &[NodeId::root(), a]);
}

#[test]
fn breadcrumb_back_out_of_range_is_reported() {
    let mut session = session();
    assert!(session.go_back(3).is_err());
    assert_eq!(session.breadcrumb().depth(), 0);
}

#[test]
fn imported_text_file_previews_through_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("readme.md");
    fs::write(&source, "# Title\nbody").unwrap();

    let mut session = session();
    let summary = session.import(&source).unwrap();
    assert_eq!(summary.files, 1);

    let id = session.visible_items()[0].id().clone();
    let Opened::Decode(job) = session.open(id.as_str()).unwrap() else {
        panic!("markdown decodes off-thread");
    };

    let (tx, rx) = mpsc::channel();
    spawn_decode(job, move |outcome| {
        let _ = tx.send(outcome);
    })
    .join()
    .unwrap();
    assert!(session.apply_decoded(rx.recv().unwrap()));

    let Some(PreviewBody::Text { text, .. }) = session.preview().map(|p| &p.body) else {
        panic!("expected a text body");
    };
    assert_eq!(text, "# Title\nbody");

    let out = dir.path().join("copy.md");
    assert_eq!(session.export(id.as_str(), &out).unwrap(), 12);
    assert_eq!(fs::read_to_string(out).unwrap(), "# Title\nbody");
}

#[test]
fn note_edits_survive_a_reopen() {
    let mut session = session();
    let note = session.add_note("todo").unwrap();

    session.open(note.as_str()).unwrap();
    for ch in "milk".chars() {
        session.note_draft_mut().unwrap().insert_char(ch);
    }
    assert!(session.save_note());

    session.close_preview();
    session.open(note.as_str()).unwrap();
    let Some(PreviewBody::Note(draft)) = session.preview().map(|p| &p.body) else {
        panic!("expected a note draft");
    };
    assert_eq!(draft.text(), "milk");
}

#[test]
fn opening_a_folder_enters_it() {
    let mut session = session();
    let docs = session.add_folder("Docs").unwrap();
    assert!(matches!(session.open(docs.as_str()).unwrap(), Opened::Folder));
    assert_eq!(session.current_folder_id(), &docs);
    assert!(session.preview().is_none());
}
