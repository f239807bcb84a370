use crate::notes::state::NotesStore;
use crate::theme::Theme;
use crate::ui::{short_date, Route};
use chrono::Local;
use eframe::egui::{self, RichText, ScrollArea};

enum SidebarAction {
    Home,
    NewNote,
    Select(String),
    Delete(String),
}

pub fn show(ui: &mut egui::Ui, store: &mut NotesStore, theme: &Theme) -> Option<Route> {
    let mut action = None;

    ui.horizontal(|ui| {
        ui.heading("Notes");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("+").on_hover_text("New Note").clicked() {
                action = Some(SidebarAction::NewNote);
            }
            if ui.button("Home").clicked() {
                action = Some(SidebarAction::Home);
            }
        });
    });
    ui.separator();

    ScrollArea::vertical().id_salt("sidebar_notes").show(ui, |ui| {
        let current = store.current_note_id();
        for note in store.notes() {
            let selected = current == Some(note.id.as_str());
            ui.horizontal(|ui| {
                let label = RichText::new(&note.title).strong();
                let response = ui.selectable_label(selected, label);
                if response.clicked() {
                    action = Some(SidebarAction::Select(note.id.clone()));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").on_hover_text("Delete Note").clicked() {
                        action = Some(SidebarAction::Delete(note.id.clone()));
                    }
                });
            });
            ui.label(
                RichText::new(short_date(&note.updated_at.with_timezone(&Local)))
                    .small()
                    .color(theme.text_muted),
            );
            ui.add_space(theme.spacing_4);
        }

        if store.notes().is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(theme.spacing_24);
                ui.label(RichText::new("No notes yet").color(theme.text_muted));
                if ui.button("Create one").clicked() {
                    action = Some(SidebarAction::NewNote);
                }
            });
        }
    });

    let result = match action? {
        SidebarAction::Home => return Some(Route::Home),
        SidebarAction::NewNote => {
            store.add_note();
            Ok(Some(Route::Editor))
        }
        SidebarAction::Select(note_id) => store
            .set_current_note(&note_id)
            .map(|()| Some(Route::Editor)),
        SidebarAction::Delete(note_id) => store.delete_note(&note_id).map(|()| None),
    };
    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "sidebar action ignored");
        None
    })
}
