//! Text buffer primitives shared by the editor pane and the formatting commands.
//!
//! All offsets here are UTF-8 byte offsets into the buffer. The textarea
//! reports UTF-16 code units, so the UI converts at the boundary with
//! [`utf16_to_byte`] and [`byte_to_utf16`].

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Clamps both ends into `text` and snaps them back onto char boundaries.
    pub fn clamp_to(self, text: &str) -> Self {
        Self::new(
            floor_char_boundary(text, self.start),
            floor_char_boundary(text, self.end),
        )
    }

    pub fn shifted(self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChange {
    pub start: usize,
    pub end: usize,
    pub insert: String,
}

impl TextChange {
    pub fn new(start: usize, end: usize, insert: impl Into<String>) -> Self {
        Self {
            start,
            end,
            insert: insert.into(),
        }
    }

    /// Splices the change into `text`. The range must already be valid for
    /// `text`; callers build changes from a clamped [`Selection`].
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + self.insert.len());
        out.push_str(&text[..self.start]);
        out.push_str(&self.insert);
        out.push_str(&text[self.end..]);
        out
    }
}

/// Result of an edit: the new buffer and where the selection lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub text: String,
    pub selection: Selection,
}

/// Replaces the selection with `before + selection + after`.
///
/// The selection is kept over the same characters, so both ends move right by
/// `before.len()`. With a bare cursor this leaves the caret between the two
/// markers.
pub fn insert_at_cursor(text: &str, selection: Selection, before: &str, after: &str) -> Edit {
    let selection = selection.clamp_to(text);
    let selected = &text[selection.start..selection.end];

    let mut insert = String::with_capacity(before.len() + selected.len() + after.len());
    insert.push_str(before);
    insert.push_str(selected);
    insert.push_str(after);

    let change = TextChange::new(selection.start, selection.end, insert);
    Edit {
        text: change.apply(text),
        selection: selection.shifted(before.len()),
    }
}

/// Maps a UTF-16 code unit offset (as reported by the DOM) to a byte offset.
/// Offsets past the end, or inside a surrogate pair, round down.
pub fn utf16_to_byte(text: &str, utf16: usize) -> usize {
    let mut units = 0usize;
    for (idx, ch) in text.char_indices() {
        let next = units + ch.len_utf16();
        if next > utf16 {
            return idx;
        }
        units = next;
    }
    text.len()
}

pub fn byte_to_utf16(text: &str, byte: usize) -> usize {
    let byte = floor_char_boundary(text, byte);
    text[..byte].encode_utf16().count()
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_selection_and_shifts_it_by_the_opening_marker() {
        let edit = insert_at_cursor("hello world", Selection::new(0, 5), "**", "**");
        assert_eq!(edit.text, "**hello** world");
        assert_eq!(edit.selection, Selection::new(2, 7));
    }

    #[test]
    fn cursor_insert_places_caret_between_markers() {
        let edit = insert_at_cursor("ab", Selection::new(1, 1), "[", "](url)");
        assert_eq!(edit.text, "a[](url)b");
        assert_eq!(edit.selection, Selection::new(2, 2));
    }

    #[test]
    fn prefix_only_insert_leaves_tail_untouched() {
        let edit = insert_at_cursor("title", Selection::new(0, 0), "## ", "");
        assert_eq!(edit.text, "## title");
        assert_eq!(edit.selection, Selection::new(3, 3));
    }

    #[test]
    fn out_of_range_selection_is_clamped() {
        let edit = insert_at_cursor("abc", Selection::new(2, 40), "`", "`");
        assert_eq!(edit.text, "ab`c`");
        assert_eq!(edit.selection, Selection::new(3, 4));
    }

    #[test]
    fn selection_inside_multibyte_char_snaps_to_boundary() {
        // 'é' is two bytes; offset 2 sits inside it.
        let edit = insert_at_cursor("héllo", Selection::new(2, 3), "*", "*");
        assert_eq!(edit.text, "h*é*llo");
    }

    #[test]
    fn reversed_selection_is_normalized() {
        assert_eq!(Selection::new(5, 1), Selection::new(1, 5));
    }

    #[test]
    fn utf16_offsets_convert_across_astral_chars() {
        let text = "a😀b";
        // 'a' = 1 unit, emoji = 2 units, 'b' at unit 3 / byte 5.
        assert_eq!(utf16_to_byte(text, 3), 5);
        assert_eq!(byte_to_utf16(text, 5), 3);
        assert_eq!(utf16_to_byte(text, 2), 1);
        assert_eq!(utf16_to_byte(text, 99), text.len());
    }
}
