use crate::assistant::client::AssistantClient;
use crate::config::AppConfig;
use crate::event::AppEvent;
use crate::notes::state::{NotesStore, StoreEvent};
use crate::theme::Theme;
use crate::ui::home::HomeView;
use crate::ui::note_view::NoteView;
use crate::ui::{sidebar, Route};
use eframe::egui::{self, RichText};
use std::sync::mpsc::{Receiver, TryRecvError};

pub struct ScribbyApp {
    rx: Receiver<AppEvent>,
    store_events: Receiver<StoreEvent>,
    store: NotesStore,
    assistant: AssistantClient,
    theme: Theme,
    theme_applied: bool,
    route: Route,
    home: HomeView,
    note_view: NoteView,
    warnings: Vec<String>,
}

impl ScribbyApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        mut store: NotesStore,
        assistant: AssistantClient,
        config: &AppConfig,
        startup_warnings: Vec<String>,
    ) -> Self {
        let store_events = store.subscribe();
        let mut warnings = startup_warnings;
        if let Some(warning) = store.warning() {
            warnings.push(warning.to_string());
        }

        Self {
            rx,
            store_events,
            store,
            assistant,
            theme: Theme::default(),
            theme_applied: false,
            route: Route::default(),
            home: HomeView::default(),
            note_view: NoteView::new(config.title_debounce()),
            warnings,
        }
    }

    fn push_warning(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(AppEvent::AssistantReplied { note_id, content }) => {
                    self.note_view
                        .chat
                        .receive_reply(&mut self.store, &note_id, &content);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn drain_store_events(&mut self) {
        while let Ok(event) = self.store_events.try_recv() {
            match event {
                StoreEvent::PersistenceFailed { message } => self.push_warning(message),
                StoreEvent::SelectionChanged { note_id: None } => {
                    tracing::debug!("selection cleared");
                }
                other => tracing::trace!(event = ?other, "store changed"),
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let mut dismissed = false;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Scribby");
                ui.separator();
                let count = self.store.notes().len();
                ui.label(
                    RichText::new(format!("{count} note{}", if count == 1 { "" } else { "s" }))
                        .color(self.theme.text_muted),
                );
                if let Some(warning) = self.warnings.last() {
                    ui.separator();
                    ui.label(RichText::new(warning).color(self.theme.warning));
                    if ui.small_button("Dismiss").clicked() {
                        dismissed = true;
                    }
                }
            });
        });
        if dismissed {
            self.warnings.pop();
        }
    }

    fn render_sidebar(&mut self, ctx: &egui::Context) {
        let mut route = None;
        egui::SidePanel::left("notes_sidebar")
            .resizable(true)
            .default_width(256.0)
            .frame(self.theme.sidebar_frame())
            .show(ctx, |ui| {
                route = sidebar::show(ui, &mut self.store, &self.theme);
            });
        if let Some(route) = route {
            self.navigate(route);
        }
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        let mut route = None;
        egui::CentralPanel::default().show(ctx, |ui| match self.route {
            Route::Home => {
                route = self.home.show(ui, &mut self.store, &self.theme);
            }
            Route::Editor => {
                route = self
                    .note_view
                    .show(ui, &mut self.store, &self.assistant, &self.theme);
            }
        });
        if let Some(route) = route {
            self.navigate(route);
        }
    }

    fn navigate(&mut self, route: Route) {
        if self.route == Route::Editor && route != Route::Editor {
            self.note_view.flush_title(&mut self.store);
        }
        self.route = route;
    }
}

impl eframe::App for ScribbyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            self.theme.apply_visuals(ctx);
            self.theme_applied = true;
        }

        self.drain_events(ctx);
        self.render_top_bar(ctx);
        if self.route == Route::Editor {
            self.render_sidebar(ctx);
        }
        self.render_center_panel(ctx);
        self.drain_store_events();

        if self.note_view.chat.is_in_flight() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
        if ctx.input(|input| input.viewport().close_requested()) {
            self.note_view.flush_title(&mut self.store);
        }
    }
}
