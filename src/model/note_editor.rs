use ropey::Rope;

/// Direction for cursor movement inside a note draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    LineStart,
    LineEnd,
}

/// Cursor position within a draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Current line (0-indexed).
    pub row: usize,
    /// Byte offset within the line.
    pub col: usize,
    /// Column to return to when moving vertically.
    pub desired_col: usize,
}

/// Unsaved text of the note open in the preview pane.
///
/// Edits stay here until the session writes them back to the tree on save
/// or on close.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    rope: Rope,
    pub cursor: Cursor,
    pub top_line: usize,
}

impl NoteDraft {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            top_line: 0,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn differs_from(&self, saved: &str) -> bool {
        self.rope.len_bytes() != saved.len() || self.rope != saved
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Text of one line without its line break.
    pub fn line_text(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let mut line: String = self.rope.line(idx).chunks().collect();
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    pub fn insert_char(&mut self, ch: char) {
        let char_idx = self.rope.byte_to_char(self.cursor_byte_offset());
        self.rope.insert_char(char_idx, ch);
        self.cursor.col += ch.len_utf8();
        self.cursor.desired_col = self.cursor.col;
    }

    pub fn insert_newline(&mut self) {
        let char_idx = self.rope.byte_to_char(self.cursor_byte_offset());
        self.rope.insert_char(char_idx, '\n');
        self.cursor.row += 1;
        self.cursor.col = 0;
        self.cursor.desired_col = 0;
    }

    /// Backspace.
    pub fn delete_char_before(&mut self) {
        if self.cursor.col == 0 && self.cursor.row == 0 {
            return;
        }

        let char_idx = self.rope.byte_to_char(self.cursor_byte_offset());
        if self.cursor.col == 0 {
            let prev_len = self
                .line_text(self.cursor.row - 1)
                .map(|line| line.len())
                .unwrap_or(0);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.row -= 1;
            self.cursor.col = prev_len;
        } else {
            let removed_len = self.rope.char(char_idx - 1).len_utf8();
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.col -= removed_len;
        }
        self.cursor.desired_col = self.cursor.col;
    }

    pub fn move_cursor(&mut self, dir: Direction) {
        let line_len = |draft: &Self, row: usize| draft.line_text(row).map_or(0, |l| l.len());

        match dir {
            Direction::Up if self.cursor.row > 0 => {
                self.cursor.row -= 1;
                self.cursor.col = self.cursor.desired_col;
            }
            Direction::Down if self.cursor.row + 1 < self.line_count() => {
                self.cursor.row += 1;
                self.cursor.col = self.cursor.desired_col;
            }
            Direction::Left if self.cursor.col > 0 => {
                let line = self.line_text(self.cursor.row).unwrap_or_default();
                let step = line[..self.cursor.col]
                    .chars()
                    .next_back()
                    .map_or(1, char::len_utf8);
                self.cursor.col -= step;
                self.cursor.desired_col = self.cursor.col;
            }
            Direction::Right => {
                let line = self.line_text(self.cursor.row).unwrap_or_default();
                if let Some(ch) = line[self.cursor.col.min(line.len())..].chars().next() {
                    self.cursor.col += ch.len_utf8();
                    self.cursor.desired_col = self.cursor.col;
                }
            }
            Direction::LineStart => {
                self.cursor.col = 0;
                self.cursor.desired_col = 0;
            }
            Direction::LineEnd => {
                self.cursor.col = line_len(self, self.cursor.row);
                self.cursor.desired_col = self.cursor.col;
            }
            _ => {}
        }
        self.clamp_cursor();
    }

    /// Keeps the cursor on an existing line and a char boundary.
    pub fn clamp_cursor(&mut self) {
        let max_row = self.rope.len_lines().saturating_sub(1);
        self.cursor.row = self.cursor.row.min(max_row);

        let line = self.line_text(self.cursor.row).unwrap_or_default();
        let mut col = self.cursor.col.min(line.len());
        while !line.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.col = col;
    }

    /// Scrolls so the cursor stays inside a window of `height` lines.
    pub fn scroll_to_cursor(&mut self, height: usize) {
        let height = height.max(1);
        if self.cursor.row < self.top_line {
            self.top_line = self.cursor.row;
        }
        if self.cursor.row >= self.top_line + height {
            self.top_line = self.cursor.row + 1 - height;
        }
    }

    fn cursor_byte_offset(&self) -> usize {
        self.rope.line_to_byte(self.cursor.row) + self.cursor.col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_builds_text() {
        let mut draft = NoteDraft::from_text("");
        for ch in "buy".chars() {
            draft.insert_char(ch);
        }
        draft.insert_newline();
        for ch in "milk".chars() {
            draft.insert_char(ch);
        }
        assert_eq!(draft.text(), "buy\nmilk");
        assert_eq!(draft.cursor.row, 1);
        assert_eq!(draft.cursor.col, 4);
    }

    #[test]
    fn backspace_joins_lines_and_handles_multibyte() {
        let mut draft = NoteDraft::from_text("a\nжb");
        draft.cursor.row = 1;
        draft.cursor.col = "ж".len();
        draft.delete_char_before();
        assert_eq!(draft.text(), "a\nb");
        assert_eq!(draft.cursor.col, 0);

        draft.delete_char_before();
        assert_eq!(draft.text(), "ab");
        assert_eq!((draft.cursor.row, draft.cursor.col), (0, 1));
    }

    #[test]
    fn differs_from_compares_content() {
        let mut draft = NoteDraft::from_text("same");
        assert!(!draft.differs_from("same"));
        draft.insert_char('!');
        assert!(draft.differs_from("same"));
    }

    #[test]
    fn vertical_moves_remember_column() {
        let mut draft = NoteDraft::from_text("long line\nab\nanother line");
        draft.move_cursor(Direction::LineEnd);
        draft.move_cursor(Direction::Down);
        assert_eq!((draft.cursor.row, draft.cursor.col), (1, 2));
        draft.move_cursor(Direction::Down);
        assert_eq!((draft.cursor.row, draft.cursor.col), (2, 9));
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut draft = NoteDraft::from_text("1\n2\n3\n4\n5");
        draft.cursor.row = 4;
        draft.scroll_to_cursor(2);
        assert_eq!(draft.top_line, 3);
        draft.cursor.row = 0;
        draft.scroll_to_cursor(2);
        assert_eq!(draft.top_line, 0);
    }
}
