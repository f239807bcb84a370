//! Controlled rich-text editing surface.
//!
//! The owner passes the stored markup in every frame through
//! [`EditorSurface::sync_external`] and receives markup back from the
//! editing calls. The surface only reloads when the external value differs
//! from the last value it received or emitted, so its own echoes never
//! reset the cursor.

pub mod document;
pub mod widget;

use document::{BlockKind, Caret, HeadingLevel, InlineMark, Marks, RichDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Strong,
    Emphasis,
    BulletList,
    OrderedList,
    Heading(HeadingLevel),
}

impl FormatCommand {
    pub const ALL: [FormatCommand; 7] = [
        FormatCommand::Heading(HeadingLevel::H1),
        FormatCommand::Heading(HeadingLevel::H2),
        FormatCommand::Heading(HeadingLevel::H3),
        FormatCommand::Strong,
        FormatCommand::Emphasis,
        FormatCommand::BulletList,
        FormatCommand::OrderedList,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Strong => "B",
            Self::Emphasis => "I",
            Self::BulletList => "•",
            Self::OrderedList => "1.",
            Self::Heading(HeadingLevel::H1) => "H1",
            Self::Heading(HeadingLevel::H2) => "H2",
            Self::Heading(HeadingLevel::H3) => "H3",
        }
    }

    fn inline_mark(self) -> Option<InlineMark> {
        match self {
            Self::Strong => Some(InlineMark::Strong),
            Self::Emphasis => Some(InlineMark::Emphasis),
            _ => None,
        }
    }

    fn block_kind(self) -> Option<BlockKind> {
        match self {
            Self::BulletList => Some(BlockKind::BulletItem),
            Self::OrderedList => Some(BlockKind::OrderedItem),
            Self::Heading(level) => Some(BlockKind::Heading(level)),
            _ => None,
        }
    }
}

/// Last known cursor or selection, in characters within one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub block: usize,
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn caret(block: usize, offset: usize) -> Self {
        Self {
            block,
            start: offset,
            end: offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct EditorSurface {
    document: RichDocument,
    last_synced: String,
    selection: Option<Selection>,
    pending_marks: Option<Marks>,
    focus_request: Option<Caret>,
}

impl EditorSurface {
    pub fn new(content: &str) -> Self {
        Self {
            document: RichDocument::from_html(content),
            last_synced: content.to_string(),
            selection: None,
            pending_marks: None,
            focus_request: None,
        }
    }

    pub fn document(&self) -> &RichDocument {
        &self.document
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Reloads from `content` when it is not what the surface last saw.
    /// Returns whether a reload happened.
    pub fn sync_external(&mut self, content: &str) -> bool {
        if content == self.last_synced {
            return false;
        }
        *self = Self::new(content);
        true
    }

    pub fn set_selection(&mut self, selection: Selection) {
        if self.selection != Some(selection) {
            self.pending_marks = None;
        }
        self.selection = Some(selection);
    }

    pub fn take_focus_request(&mut self) -> Option<Caret> {
        self.focus_request.take()
    }

    pub fn edit_block_text(&mut self, block: usize, text: &str) -> Option<String> {
        let typing = self.pending_marks.take();
        let caret = self.document.replace_block_text(block, text, typing)?;
        if caret.block != block {
            self.focus_request = Some(caret);
        }
        self.selection = Some(Selection::caret(caret.block, caret.offset));
        self.commit()
    }

    pub fn merge_backward(&mut self, block: usize) -> Option<String> {
        let caret = self.document.merge_backward(block)?;
        self.focus_request = Some(caret);
        self.selection = Some(Selection::caret(caret.block, caret.offset));
        self.commit()
    }

    /// Applies a toolbar command at the last known selection. Inline
    /// toggles on a collapsed selection only affect what is typed next.
    pub fn toggle(&mut self, command: FormatCommand) -> Option<String> {
        let selection = self
            .selection
            .unwrap_or_else(|| Selection::caret(0, 0));
        self.focus_request = Some(Caret {
            block: selection.block,
            offset: selection.end,
        });

        if let Some(mark) = command.inline_mark() {
            if selection.is_collapsed() {
                let current = self.typing_marks(selection);
                self.pending_marks = Some(current.with(mark, !current.has(mark)));
                return None;
            }
            self.document
                .toggle_inline(selection.block, selection.start..selection.end, mark);
        } else if let Some(kind) = command.block_kind() {
            self.document.toggle_block(selection.block, kind);
        }
        self.commit()
    }

    /// Whether the toolbar should show `command` as on.
    pub fn is_active(&self, command: FormatCommand) -> bool {
        let selection = self
            .selection
            .unwrap_or_else(|| Selection::caret(0, 0));
        let Some(block) = self.document.block(selection.block) else {
            return false;
        };
        if let Some(mark) = command.inline_mark() {
            if selection.is_collapsed() {
                return self.typing_marks(selection).has(mark);
            }
            return block.range_has_mark(selection.start..selection.end, mark);
        }
        command.block_kind() == Some(block.kind)
    }

    fn typing_marks(&self, selection: Selection) -> Marks {
        self.pending_marks.unwrap_or_else(|| {
            self.document
                .block(selection.block)
                .map(|block| block.marks_at(selection.start))
                .unwrap_or_default()
        })
    }

    fn commit(&mut self) -> Option<String> {
        let markup = self.document.to_html();
        if markup == self.last_synced {
            return None;
        }
        self.last_synced = markup.clone();
        Some(markup)
    }
}
