//! Formatting commands, their keyboard chords and the toolbar.
//!
//! Every formatting action is one `insert_at_cursor` call with a fixed pair of
//! markers. Chords are matched on the physical key code plus the exact Shift
//! state, so `Ctrl+L` and `Ctrl+Shift+L` are distinct entries and nothing
//! depends on registration order.

use std::borrow::Cow;

pub const TABLE_TEMPLATE: &str =
    "\n| Header 1 | Header 2 |\n| -------- | -------- |\n| Cell 1   | Cell 2   |\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Link,
    Heading(u8),
    BulletList,
    NumberedList,
    Table,
    InlineCode,
    CodeBlock,
    Image,
}

impl FormatCommand {
    /// Text inserted before and after the selection.
    pub fn markers(self) -> (Cow<'static, str>, &'static str) {
        match self {
            FormatCommand::Bold => (Cow::Borrowed("**"), "**"),
            FormatCommand::Italic => (Cow::Borrowed("*"), "*"),
            FormatCommand::Link => (Cow::Borrowed("["), "](url)"),
            FormatCommand::Heading(level) => {
                let level = usize::from(level.clamp(1, 6));
                (Cow::Owned(format!("{} ", "#".repeat(level))), "")
            }
            FormatCommand::BulletList => (Cow::Borrowed("- "), ""),
            FormatCommand::NumberedList => (Cow::Borrowed("1. "), ""),
            FormatCommand::Table => (Cow::Borrowed(TABLE_TEMPLATE), ""),
            FormatCommand::InlineCode => (Cow::Borrowed("`"), "`"),
            FormatCommand::CodeBlock => (Cow::Borrowed("\n```\n"), "\n```\n"),
            FormatCommand::Image => (Cow::Borrowed("!["), "](image_url)"),
        }
    }
}

/// A Ctrl/Cmd chord: `KeyboardEvent.code` plus whether Shift is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chord {
    pub code: &'static str,
    pub shift: bool,
}

const fn plain(code: &'static str) -> Chord {
    Chord { code, shift: false }
}

const fn shifted(code: &'static str) -> Chord {
    Chord { code, shift: true }
}

pub const SHORTCUTS: &[(Chord, FormatCommand)] = &[
    (plain("KeyB"), FormatCommand::Bold),
    (plain("KeyI"), FormatCommand::Italic),
    (plain("KeyK"), FormatCommand::Link),
    (plain("Digit1"), FormatCommand::Heading(1)),
    (plain("Digit2"), FormatCommand::Heading(2)),
    (plain("Digit3"), FormatCommand::Heading(3)),
    (plain("Digit4"), FormatCommand::Heading(4)),
    (plain("Digit5"), FormatCommand::Heading(5)),
    (plain("Digit6"), FormatCommand::Heading(6)),
    (plain("KeyL"), FormatCommand::BulletList),
    (shifted("KeyL"), FormatCommand::NumberedList),
    (plain("KeyT"), FormatCommand::Table),
    (plain("Backquote"), FormatCommand::InlineCode),
    (shifted("Backquote"), FormatCommand::CodeBlock),
];

/// Looks up the command for a key event. `command_key` is Ctrl, or Cmd on macOS.
pub fn command_for(code: &str, command_key: bool, shift: bool) -> Option<FormatCommand> {
    if !command_key {
        return None;
    }
    SHORTCUTS
        .iter()
        .find(|(chord, _)| chord.code == code && chord.shift == shift)
        .map(|(_, command)| *command)
}

/// A toolbar button. It runs the same command as the matching chord.
#[derive(Clone, Copy, Debug)]
pub struct ToolbarItem {
    pub label: &'static str,
    pub title: &'static str,
    pub command: FormatCommand,
}

const fn button(label: &'static str, title: &'static str, command: FormatCommand) -> ToolbarItem {
    ToolbarItem { label, title, command }
}

pub const TOOLBAR: &[ToolbarItem] = &[
    button("H1", "Heading 1", FormatCommand::Heading(1)),
    button("H2", "Heading 2", FormatCommand::Heading(2)),
    button("B", "Bold", FormatCommand::Bold),
    button("I", "Italic", FormatCommand::Italic),
    button("•", "Bullet list", FormatCommand::BulletList),
    button("1.", "Numbered list", FormatCommand::NumberedList),
    button("</>", "Code block", FormatCommand::CodeBlock),
    button("🔗", "Link", FormatCommand::Link),
    button("🖼", "Image", FormatCommand::Image),
    button("▦", "Table", FormatCommand::Table),
];

#[derive(Clone, Copy, Debug)]
pub struct LayoutPreset {
    pub title: &'static str,
    pub split_ratio: f64,
}

pub const LAYOUT_PRESETS: &[LayoutPreset] = &[
    LayoutPreset { title: "Split 50/50", split_ratio: 50.0 },
    LayoutPreset { title: "Split 33/67", split_ratio: 33.0 },
    LayoutPreset { title: "Split 67/33", split_ratio: 67.0 },
];
