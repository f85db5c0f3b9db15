use crate::model::bookmarks::BookmarkIndex;
use crate::model::node::{Node, NodeId};
use crate::model::path::Breadcrumb;
use crate::model::search;
use crate::model::tree::Tree;

/// What the main list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Folder,
    Bookmarks,
}

impl ViewMode {
    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Folder => "FOLDER",
            ViewMode::Bookmarks => "BOOKMARKS",
        }
    }
}

/// The list the UI displays. Recomputed on every render.
pub fn compose<'t>(
    mode: ViewMode,
    tree: &'t Tree,
    current_folder_id: &str,
    bookmarks: &BookmarkIndex,
    term: &str,
) -> Vec<&'t Node> {
    match mode {
        ViewMode::Bookmarks => search::filter(bookmarks.resolve(tree), term),
        ViewMode::Folder => match tree.find_folder(current_folder_id) {
            Ok(folder) => search::filter(folder.children(), term),
            Err(_) => Vec::new(),
        },
    }
}

/// `(id, name)` for each breadcrumb entry that still resolves.
pub fn breadcrumb_labels<'t>(tree: &'t Tree, path: &Breadcrumb) -> Vec<(&'t NodeId, &'t str)> {
    path.ids()
        .iter()
        .filter_map(|id| tree.find_folder(id.as_str()).ok())
        .map(|folder| (folder.id(), folder.name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::id::SequentialIds;
    use crate::model::node::ROOT_ID;
    use crate::model::tree::TreeEngine;

    fn fixture() -> (TreeEngine, NodeId, NodeId) {
        let mut engine =
            TreeEngine::from_tree(Tree::new("Home"), Box::new(SequentialIds::new("n")));
        let docs = engine.add_folder(ROOT_ID, "Docs").unwrap();
        let todo = engine.add_note(docs.as_str(), "todo").unwrap();
        engine.add_note(docs.as_str(), "ideas").unwrap();
        engine.add_note(ROOT_ID, "top level").unwrap();
        (engine, docs, todo)
    }

    fn names(nodes: Vec<&Node>) -> Vec<&str> {
        nodes.into_iter().map(Node::name).collect()
    }

    #[test]
    fn folder_mode_lists_filtered_children() {
        let (engine, docs, _) = fixture();
        let bookmarks = BookmarkIndex::new();

        let listed = compose(ViewMode::Folder, engine.tree(), docs.as_str(), &bookmarks, "");
        assert_eq!(names(listed), vec!["todo", "ideas"]);

        let listed = compose(ViewMode::Folder, engine.tree(), docs.as_str(), &bookmarks, "ID");
        assert_eq!(names(listed), vec!["ideas"]);
    }

    #[test]
    fn bookmark_mode_ignores_current_folder() {
        let (engine, docs, todo) = fixture();
        let mut bookmarks = BookmarkIndex::new();
        bookmarks.toggle(&todo);
        bookmarks.toggle(&docs);

        let listed = compose(ViewMode::Bookmarks, engine.tree(), ROOT_ID, &bookmarks, "");
        assert_eq!(names(listed), vec!["todo", "Docs"]);

        let listed = compose(ViewMode::Bookmarks, engine.tree(), ROOT_ID, &bookmarks, "do");
        assert_eq!(names(listed), vec!["todo", "Docs"]);

        let listed = compose(ViewMode::Bookmarks, engine.tree(), ROOT_ID, &bookmarks, "doc");
        assert_eq!(names(listed), vec!["Docs"]);
    }

    #[test]
    fn missing_or_empty_folder_lists_nothing() {
        let (engine, _, todo) = fixture();
        let bookmarks = BookmarkIndex::new();
        assert!(compose(ViewMode::Folder, engine.tree(), "ghost", &bookmarks, "").is_empty());
        assert!(compose(ViewMode::Folder, engine.tree(), todo.as_str(), &bookmarks, "").is_empty());
    }

    #[test]
    fn breadcrumb_labels_follow_renames() {
        let (mut engine, docs, _) = fixture();
        let mut path = Breadcrumb::new();
        path.enter(docs.clone());

        engine.rename(docs.as_str(), "Papers").unwrap();
        let labels: Vec<_> = breadcrumb_labels(engine.tree(), &path)
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(labels, vec!["Home", "Papers"]);
    }
}
