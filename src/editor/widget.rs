use crate::editor::document::{BlockKind, HeadingLevel, Marks};
use crate::editor::{EditorSurface, FormatCommand, Selection};
use crate::theme::Theme;
use eframe::egui::{self, text::LayoutJob, FontId, Key, Modifiers, TextFormat};

enum BlockAction {
    Edited { block: usize, text: String },
    MergeBackward { block: usize },
}

fn font_size(kind: BlockKind) -> f32 {
    match kind {
        BlockKind::Heading(HeadingLevel::H1) => 26.0,
        BlockKind::Heading(HeadingLevel::H2) => 21.0,
        BlockKind::Heading(HeadingLevel::H3) => 17.0,
        _ => 14.0,
    }
}

fn styled_job(ui: &egui::Ui, text: &str, kind: BlockKind, marks: &[Marks]) -> LayoutJob {
    let size = font_size(kind);
    let heading = matches!(kind, BlockKind::Heading(_));
    let normal = ui.visuals().text_color();
    let strong = ui.visuals().strong_text_color();

    let mut job = LayoutJob::default();
    let mut run = String::new();
    let mut run_marks: Option<Marks> = None;
    let flush = |job: &mut LayoutJob, run: &mut String, marks: Marks| {
        if run.is_empty() {
            return;
        }
        let format = TextFormat {
            font_id: FontId::proportional(size),
            color: if marks.strong || heading { strong } else { normal },
            italics: marks.emphasis,
            ..Default::default()
        };
        job.append(run, 0.0, format);
        run.clear();
    };

    // marks may lag one frame behind the text while an edit is in flight
    for (index, ch) in text.chars().enumerate() {
        let marks = marks.get(index).copied().unwrap_or_default();
        if run_marks.is_some_and(|current| current != marks) {
            flush(&mut job, &mut run, run_marks.unwrap_or_default());
        }
        run_marks = Some(marks);
        run.push(ch);
    }
    flush(&mut job, &mut run, run_marks.unwrap_or_default());
    if job.sections.is_empty() {
        job.append(
            "",
            0.0,
            TextFormat {
                font_id: FontId::proportional(size),
                color: normal,
                ..Default::default()
            },
        );
    }
    job
}

fn render_toolbar(ui: &mut egui::Ui, surface: &mut EditorSurface) -> Option<String> {
    let mut emitted = None;
    ui.horizontal_wrapped(|ui| {
        for command in FormatCommand::ALL {
            if matches!(command, FormatCommand::Strong | FormatCommand::BulletList) {
                ui.separator();
            }
            let active = surface.is_active(command);
            if ui.selectable_label(active, command.label()).clicked() {
                if let Some(markup) = surface.toggle(command) {
                    emitted = Some(markup);
                }
            }
        }
    });
    emitted
}

fn place_cursor(ctx: &egui::Context, id: egui::Id, offset: usize) {
    let mut state = egui::TextEdit::load_state(ctx, id).unwrap_or_default();
    let ccursor = egui::text::CCursor::new(offset);
    state
        .cursor
        .set_char_range(Some(egui::text::CCursorRange::one(ccursor)));
    state.store(ctx, id);
    ctx.memory_mut(|memory| memory.request_focus(id));
}

/// Draws the toolbar and the document. Returns the new markup when the
/// user changed the document this frame.
pub fn show(ui: &mut egui::Ui, surface: &mut EditorSurface, theme: &Theme) -> Option<String> {
    let mut emitted = None;
    theme.card_frame().show(ui, |ui| {
        emitted = render_toolbar(ui, surface);
        ui.separator();

        let focus_request = surface.take_focus_request();
        let mut action = None;
        let mut selection_update = None;
        let mut ordinal = 0usize;

        for (index, block) in surface.document().blocks().iter().enumerate() {
            let id = ui.make_persistent_id(("editor_block", index));
            if let Some(caret) = focus_request.filter(|caret| caret.block == index) {
                place_cursor(ui.ctx(), id, caret.offset);
            }

            ordinal = if block.kind == BlockKind::OrderedItem {
                ordinal + 1
            } else {
                0
            };

            let at_block_start = ui.memory(|memory| memory.has_focus(id))
                && surface.selection() == Some(Selection::caret(index, 0));
            if at_block_start
                && action.is_none()
                && ui.input_mut(|input| input.consume_key(Modifiers::NONE, Key::Backspace))
            {
                action = Some(BlockAction::MergeBackward { block: index });
            }

            let kind = block.kind;
            let marks = block.marks();
            let mut text = block.text().to_string();
            let mut layouter = |ui: &egui::Ui, string: &str, wrap_width: f32| {
                let mut job = styled_job(ui, string, kind, marks);
                job.wrap.max_width = wrap_width;
                ui.fonts(|fonts| fonts.layout_job(job))
            };

            let output = ui
                .horizontal(|ui| {
                    match kind {
                        BlockKind::BulletItem => {
                            ui.label("•");
                        }
                        BlockKind::OrderedItem => {
                            ui.label(format!("{ordinal}."));
                        }
                        _ => {}
                    }
                    egui::TextEdit::multiline(&mut text)
                        .id(id)
                        .frame(false)
                        .desired_rows(1)
                        .desired_width(f32::INFINITY)
                        .hint_text(if index == 0 { "Start writing..." } else { "" })
                        .layouter(&mut layouter)
                        .show(ui)
                })
                .inner;

            if output.response.has_focus() {
                if let Some(range) = output.cursor_range {
                    let a = range.primary.ccursor.index;
                    let b = range.secondary.ccursor.index;
                    selection_update = Some(Selection {
                        block: index,
                        start: a.min(b),
                        end: a.max(b),
                    });
                }
            }
            if output.response.changed() && action.is_none() {
                action = Some(BlockAction::Edited { block: index, text });
            }
        }

        // applied after the loop; the document is borrowed while drawing.
        // Edits place the caret themselves.
        let changed = match action {
            Some(BlockAction::Edited { block, text }) => surface.edit_block_text(block, &text),
            Some(BlockAction::MergeBackward { block }) => surface.merge_backward(block),
            None => {
                if let Some(selection) = selection_update {
                    surface.set_selection(selection);
                }
                None
            }
        };
        if changed.is_some() {
            emitted = changed;
            ui.ctx().request_repaint();
        }
    });
    emitted
}
