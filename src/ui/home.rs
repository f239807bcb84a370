use crate::notes::state::NotesStore;
use crate::notes::Note;
use crate::theme::Theme;
use crate::ui::{excerpt, long_date, message_count_label, Route};
use chrono::Local;
use eframe::egui::{self, RichText, ScrollArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

enum HomeAction {
    NewNote,
    Open(String),
}

/// Overview of every note. The density choice is not persisted.
#[derive(Debug, Default)]
pub struct HomeView {
    pub view_mode: ViewMode,
}

impl HomeView {
    pub fn show(&mut self, ui: &mut egui::Ui, store: &mut NotesStore, theme: &Theme) -> Option<Route> {
        let mut action = None;

        ui.horizontal(|ui| {
            ui.heading(RichText::new("My Notes").size(26.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("+ New Note").clicked() {
                    action = Some(HomeAction::NewNote);
                }
                ui.selectable_value(&mut self.view_mode, ViewMode::List, "List");
                ui.selectable_value(&mut self.view_mode, ViewMode::Grid, "Grid");
            });
        });
        ui.add_space(theme.spacing_16);

        if store.notes().is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(theme.spacing_24 * 3.0);
                ui.label(RichText::new("No notes yet").size(18.0).color(theme.text_muted));
                if ui.button("+ Create your first note").clicked() {
                    action = Some(HomeAction::NewNote);
                }
            });
        } else {
            ScrollArea::vertical().id_salt("home_notes").show(ui, |ui| {
                match self.view_mode {
                    ViewMode::Grid => {
                        let columns = ((ui.available_width() / 260.0).floor() as usize).clamp(1, 4);
                        egui::Grid::new("notes_grid")
                            .num_columns(columns)
                            .spacing([theme.spacing_16, theme.spacing_16])
                            .show(ui, |ui| {
                                for (index, note) in store.notes().iter().enumerate() {
                                    if self.card(ui, note, theme) {
                                        action = Some(HomeAction::Open(note.id.clone()));
                                    }
                                    if (index + 1) % columns == 0 {
                                        ui.end_row();
                                    }
                                }
                            });
                    }
                    ViewMode::List => {
                        for note in store.notes() {
                            if self.card(ui, note, theme) {
                                action = Some(HomeAction::Open(note.id.clone()));
                            }
                            ui.add_space(theme.spacing_8);
                        }
                    }
                }
            });
        }

        match action? {
            HomeAction::NewNote => {
                store.add_note();
                None
            }
            HomeAction::Open(note_id) => match store.set_current_note(&note_id) {
                Ok(()) => Some(Route::Editor),
                Err(err) => {
                    tracing::warn!(note_id = %note_id, error = %err, "cannot open note");
                    None
                }
            },
        }
    }

    /// Returns true when the card was clicked.
    fn card(&self, ui: &mut egui::Ui, note: &Note, theme: &Theme) -> bool {
        let preview = excerpt(&note.content);
        let preview = if preview.is_empty() {
            "No content yet".to_string()
        } else {
            preview
        };
        let width = match self.view_mode {
            ViewMode::Grid => 240.0,
            ViewMode::List => ui.available_width(),
        };

        let response = theme
            .card_frame()
            .show(ui, |ui| {
                ui.set_width(width);
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new(&note.title).size(16.0).strong());
                        ui.label(
                            RichText::new(long_date(&note.updated_at.with_timezone(&Local)))
                                .small()
                                .color(theme.text_muted),
                        );
                        let wrap = match self.view_mode {
                            ViewMode::Grid => egui::TextWrapMode::Wrap,
                            ViewMode::List => egui::TextWrapMode::Truncate,
                        };
                        ui.add(
                            egui::Label::new(RichText::new(preview).color(theme.text_muted))
                                .wrap_mode(wrap),
                        );
                    });
                    if self.view_mode == ViewMode::List {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.label(
                                RichText::new(message_count_label(note.chat_history.len()))
                                    .small()
                                    .color(theme.text_muted),
                            );
                        });
                    }
                });
            })
            .response;
        response.interact(egui::Sense::click()).clicked()
    }
}
