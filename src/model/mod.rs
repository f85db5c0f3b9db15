pub mod bookmarks;
pub mod config;
pub mod id;
pub mod mode;
pub mod node;
pub mod note_editor;
pub mod path;
pub mod payload;
pub mod search;
pub mod tree;
pub mod view;
