use crate::model::node::NodeId;

/// What a typed name will be used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePurpose {
    NewFolder,
    NewNote,
    Rename(NodeId),
}

/// Application interaction modes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Moving through the listing.
    #[default]
    Browse,
    /// Typing into the search box.
    Search,
    /// Typing a name for a new folder/note or a rename.
    NameInput(NamePurpose),
    /// Waiting for y/n before deleting.
    ConfirmDelete(NodeId),
    /// A file or note is open in the preview overlay.
    Preview,
    /// Editing the open note's text.
    NoteEdit,
    /// Command line (`:` prefix).
    Command,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Browse => "BROWSE",
            Mode::Search => "SEARCH",
            Mode::NameInput(NamePurpose::Rename(_)) => "RENAME",
            Mode::NameInput(_) => "NEW",
            Mode::ConfirmDelete(_) => "DELETE",
            Mode::Preview => "PREVIEW",
            Mode::NoteEdit => "EDIT",
            Mode::Command => "COMMAND",
        }
    }

    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            Mode::Search | Mode::NameInput(_) | Mode::NoteEdit | Mode::Command
        )
    }
}
