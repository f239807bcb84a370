//! Block-structured rich-text document and its markup codec.
//!
//! A document is a flat list of blocks. Each block carries plain text plus
//! one [`Marks`] entry per character, so inline formatting survives any
//! edit that only touches other characters.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn tag(self) -> &'static str {
        match self {
            Self::H1 => "h1",
            Self::H2 => "h2",
            Self::H3 => "h3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(HeadingLevel),
    BulletItem,
    OrderedItem,
}

impl BlockKind {
    pub fn is_list_item(self) -> bool {
        matches!(self, Self::BulletItem | Self::OrderedItem)
    }

    /// Kind of the block created when this one is split by a line break.
    fn continuation(self) -> Self {
        match self {
            Self::Heading(_) => Self::Paragraph,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineMark {
    Strong,
    Emphasis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Marks {
    pub strong: bool,
    pub emphasis: bool,
}

impl Marks {
    pub fn has(self, mark: InlineMark) -> bool {
        match mark {
            InlineMark::Strong => self.strong,
            InlineMark::Emphasis => self.emphasis,
        }
    }

    pub fn with(mut self, mark: InlineMark, on: bool) -> Self {
        match mark {
            InlineMark::Strong => self.strong = on,
            InlineMark::Emphasis => self.emphasis = on,
        }
        self
    }
}

/// Position inside a document: block index and character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub block: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    text: String,
    marks: Vec<Marks>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            text: String::new(),
            marks: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &[Marks] {
        &self.marks
    }

    pub fn char_len(&self) -> usize {
        self.marks.len()
    }

    pub fn push_str(&mut self, text: &str, marks: Marks) {
        for ch in text.chars() {
            self.text.push(ch);
            self.marks.push(marks);
        }
    }

    /// Splits at a character offset, returning the tail as a new block of
    /// `kind`.
    fn split_off(&mut self, offset: usize, kind: BlockKind) -> Block {
        let offset = offset.min(self.char_len());
        let byte = byte_index(&self.text, offset);
        Block {
            kind,
            text: self.text.split_off(byte),
            marks: self.marks.split_off(offset),
        }
    }

    fn append(&mut self, other: Block) {
        self.text.push_str(&other.text);
        self.marks.extend(other.marks);
    }

    /// Marks that newly typed text at `offset` should carry.
    pub fn marks_at(&self, offset: usize) -> Marks {
        if offset > 0 {
            self.marks
                .get(offset - 1)
                .or_else(|| self.marks.last())
                .copied()
                .unwrap_or_default()
        } else {
            self.marks.first().copied().unwrap_or_default()
        }
    }

    pub fn range_has_mark(&self, range: Range<usize>, mark: InlineMark) -> bool {
        let range = clamp_range(range, self.char_len());
        !range.is_empty() && self.marks[range].iter().all(|marks| marks.has(mark))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichDocument {
    blocks: Vec<Block>,
}

impl Default for RichDocument {
    fn default() -> Self {
        Self {
            blocks: vec![Block::new(BlockKind::Paragraph)],
        }
    }
}

impl RichDocument {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// A single empty paragraph, which serializes to the empty string.
    pub fn is_empty(&self) -> bool {
        matches!(self.blocks.as_slice(), [only] if only.kind == BlockKind::Paragraph && only.text.is_empty())
    }

    /// Replaces the text of one block, carrying existing marks over to the
    /// characters that were kept. Inserted characters take `typing` if
    /// given, otherwise the marks of the character before them. Line
    /// breaks split the block. Returns the caret after the inserted text.
    pub fn replace_block_text(
        &mut self,
        index: usize,
        new_text: &str,
        typing: Option<Marks>,
    ) -> Option<Caret> {
        let block = self.blocks.get_mut(index)?;
        let old: Vec<char> = block.text.chars().collect();
        let new: Vec<char> = new_text.chars().collect();

        let prefix = old
            .iter()
            .zip(new.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let inserted = new.len() - prefix - suffix;
        let inherit = typing.unwrap_or_else(|| block.marks_at(prefix));
        let mut marks = Vec::with_capacity(new.len());
        marks.extend_from_slice(&block.marks[..prefix]);
        marks.extend(std::iter::repeat(inherit).take(inserted));
        marks.extend_from_slice(&block.marks[old.len() - suffix..]);

        block.text = new_text.to_string();
        block.marks = marks;

        let caret = prefix + inserted;
        Some(self.split_line_breaks(index, caret))
    }

    fn split_line_breaks(&mut self, index: usize, caret: usize) -> Caret {
        let mut caret = Caret {
            block: index,
            offset: caret,
        };
        let mut current = index;
        loop {
            let block = &mut self.blocks[current];
            let Some(position) = block.text.chars().position(|ch| ch == '\n') else {
                break;
            };
            let kind = block.kind.continuation();
            let tail = block.split_off(position + 1, kind);
            // the line break itself is not kept
            block.text.pop();
            block.marks.pop();
            self.blocks.insert(current + 1, tail);

            if caret.block == current && caret.offset > position {
                caret = Caret {
                    block: current + 1,
                    offset: caret.offset - position - 1,
                };
            }
            current += 1;
        }
        caret
    }

    /// Backspace at the very start of a block. Non-paragraph blocks first
    /// turn into paragraphs; paragraphs join the previous block.
    pub fn merge_backward(&mut self, index: usize) -> Option<Caret> {
        let block = self.blocks.get_mut(index)?;
        if block.kind != BlockKind::Paragraph {
            block.kind = BlockKind::Paragraph;
            return Some(Caret { block: index, offset: 0 });
        }
        if index == 0 {
            return None;
        }
        let block = self.blocks.remove(index);
        let previous = &mut self.blocks[index - 1];
        let offset = previous.char_len();
        previous.append(block);
        Some(Caret {
            block: index - 1,
            offset,
        })
    }

    /// Removes `mark` from the range if every character has it, otherwise
    /// applies it to every character. Empty ranges change nothing.
    pub fn toggle_inline(&mut self, index: usize, range: Range<usize>, mark: InlineMark) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        let range = clamp_range(range, block.char_len());
        if range.is_empty() {
            return false;
        }
        let on = !block.range_has_mark(range.clone(), mark);
        for marks in &mut block.marks[range] {
            *marks = marks.with(mark, on);
        }
        true
    }

    /// A block already of `kind` reverts to a paragraph.
    pub fn toggle_block(&mut self, index: usize, kind: BlockKind) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        block.kind = if block.kind == kind {
            BlockKind::Paragraph
        } else {
            kind
        };
        true
    }

    pub fn to_html(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        let mut open_list: Option<BlockKind> = None;
        for block in &self.blocks {
            if open_list.is_some() && open_list != Some(block.kind) {
                close_list(&mut out, open_list.take());
            }
            match block.kind {
                BlockKind::BulletItem | BlockKind::OrderedItem => {
                    if open_list.is_none() {
                        out.push_str(list_tag(block.kind, false));
                        open_list = Some(block.kind);
                    }
                    out.push_str("<li>");
                    write_inline(&mut out, block);
                    out.push_str("</li>");
                }
                BlockKind::Paragraph => {
                    out.push_str("<p>");
                    write_inline(&mut out, block);
                    out.push_str("</p>");
                }
                BlockKind::Heading(level) => {
                    out.push('<');
                    out.push_str(level.tag());
                    out.push('>');
                    write_inline(&mut out, block);
                    out.push_str("</");
                    out.push_str(level.tag());
                    out.push('>');
                }
            }
        }
        close_list(&mut out, open_list);
        out
    }

    pub fn from_html(markup: &str) -> Self {
        let mut parser = Parser::default();
        for token in tokenize(markup) {
            match token {
                Token::Text(text) => parser.text(&text),
                Token::Tag { name, closing } => parser.tag(&name, closing),
            }
        }
        parser.finish()
    }

    /// Text with markup removed, blocks separated by spaces.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let start = range.start.min(len);
    let end = range.end.min(len).max(start);
    start..end
}

fn list_tag(kind: BlockKind, closing: bool) -> &'static str {
    match (kind, closing) {
        (BlockKind::OrderedItem, false) => "<ol>",
        (BlockKind::OrderedItem, true) => "</ol>",
        (_, false) => "<ul>",
        (_, true) => "</ul>",
    }
}

fn close_list(out: &mut String, open: Option<BlockKind>) {
    if let Some(kind) = open {
        out.push_str(list_tag(kind, true));
    }
}

fn write_inline(out: &mut String, block: &Block) {
    let mut chars = block.text.chars().zip(block.marks.iter().copied()).peekable();
    while let Some((ch, marks)) = chars.next() {
        let mut run = String::new();
        push_escaped(&mut run, ch);
        while let Some((next, _)) = chars.next_if(|(_, next_marks)| *next_marks == marks) {
            push_escaped(&mut run, next);
        }
        if marks.strong {
            out.push_str("<strong>");
        }
        if marks.emphasis {
            out.push_str("<em>");
        }
        out.push_str(&run);
        if marks.emphasis {
            out.push_str("</em>");
        }
        if marks.strong {
            out.push_str("</strong>");
        }
    }
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        other => out.push(other),
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let hex = numeric
                .strip_prefix('x')
                .or_else(|| numeric.strip_prefix('X'));
            let code = match hex {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Tag { name: String, closing: bool },
}

fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = markup.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '<' if !chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!')) =>
            {
                text.push('<');
            }
            '<' => {
                let mut raw = String::new();
                for next in chars.by_ref() {
                    if next == '>' {
                        break;
                    }
                    raw.push(next);
                }
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                let raw = raw.trim();
                let closing = raw.starts_with('/');
                let name: String = raw
                    .trim_start_matches('/')
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                if !name.is_empty() {
                    tokens.push(Token::Tag { name, closing });
                }
            }
            '&' => {
                let mut entity = String::new();
                while let Some(&next) = chars.peek() {
                    if next == ';' || entity.len() > 10 || next == '&' || next == '<' {
                        break;
                    }
                    entity.push(next);
                    chars.next();
                }
                match (chars.peek(), decode_entity(&entity)) {
                    (Some(';'), Some(decoded)) => {
                        chars.next();
                        text.push(decoded);
                    }
                    _ => {
                        text.push('&');
                        text.push_str(&entity);
                    }
                }
            }
            '\n' | '\r' | '\t' => text.push(' '),
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

#[derive(Default)]
struct Parser {
    blocks: Vec<Block>,
    current: Option<Block>,
    lists: Vec<BlockKind>,
    in_item: bool,
    strong: usize,
    emphasis: usize,
}

impl Parser {
    fn marks(&self) -> Marks {
        Marks {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
        }
    }

    fn item_kind(&self) -> BlockKind {
        self.lists.last().copied().unwrap_or(BlockKind::BulletItem)
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            self.blocks.push(block);
        }
    }

    fn start(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block::new(kind));
    }

    fn text(&mut self, text: &str) {
        if self.current.is_none() {
            if text.trim().is_empty() {
                return;
            }
            let kind = if self.in_item || !self.lists.is_empty() {
                self.item_kind()
            } else {
                BlockKind::Paragraph
            };
            self.current = Some(Block::new(kind));
        }
        let marks = self.marks();
        if let Some(block) = self.current.as_mut() {
            block.push_str(text, marks);
        }
    }

    fn tag(&mut self, name: &str, closing: bool) {
        match (name, closing) {
            ("p" | "div", false) => {
                let reuse = self.in_item
                    && self
                        .current
                        .as_ref()
                        .is_some_and(|block| block.kind.is_list_item() && block.text.is_empty());
                if !reuse {
                    let kind = if self.in_item {
                        self.item_kind()
                    } else {
                        BlockKind::Paragraph
                    };
                    self.start(kind);
                }
            }
            ("h1", false) => self.start(BlockKind::Heading(HeadingLevel::H1)),
            ("h2", false) => self.start(BlockKind::Heading(HeadingLevel::H2)),
            ("h3" | "h4" | "h5" | "h6", false) => {
                self.start(BlockKind::Heading(HeadingLevel::H3))
            }
            ("p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6", true) => self.flush(),
            ("ul", false) => {
                self.flush();
                self.lists.push(BlockKind::BulletItem);
            }
            ("ol", false) => {
                self.flush();
                self.lists.push(BlockKind::OrderedItem);
            }
            ("ul" | "ol", true) => {
                self.flush();
                self.lists.pop();
                self.in_item = false;
            }
            ("li", false) => {
                let kind = self.item_kind();
                self.start(kind);
                self.in_item = true;
            }
            ("li", true) => {
                self.flush();
                self.in_item = false;
            }
            ("br", _) => {
                let kind = self
                    .current
                    .as_ref()
                    .map(|block| block.kind.continuation())
                    .unwrap_or(BlockKind::Paragraph);
                self.start(kind);
            }
            ("strong" | "b", false) => self.strong += 1,
            ("strong" | "b", true) => self.strong = self.strong.saturating_sub(1),
            ("em" | "i", false) => self.emphasis += 1,
            ("em" | "i", true) => self.emphasis = self.emphasis.saturating_sub(1),
            _ => {}
        }
    }

    fn finish(mut self) -> RichDocument {
        self.flush();
        if self.blocks.is_empty() {
            return RichDocument::default();
        }
        RichDocument {
            blocks: self.blocks,
        }
    }
}
