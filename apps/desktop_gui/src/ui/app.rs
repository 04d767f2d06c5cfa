use client_core::{ClientSettings, EditMode, NotesState, Reconciler};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{Note, NoteId};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_connect_failure, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppViewState {
    Connect,
    Notes,
}

#[derive(Debug, Clone)]
enum NoteAction {
    Select(Note),
    Remove(NoteId),
}

pub struct NotetakerApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    settings: ClientSettings,
    api_key_input: String,
    auth_token_input: String,
    view_state: AppViewState,
    connecting: bool,
    reconciler: Option<Reconciler>,
    status: String,
    error_banner: Option<String>,
}

impl NotetakerApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: ClientSettings,
    ) -> Self {
        let api_key_input = settings.api_key.clone().unwrap_or_default();
        let auth_token_input = settings.auth_token.clone().unwrap_or_default();
        Self {
            cmd_tx,
            ui_rx,
            settings,
            api_key_input,
            auth_token_input,
            view_state: AppViewState::Connect,
            connecting: false,
            reconciler: None,
            status: "Not connected".to_string(),
            error_banner: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Mounted(reconciler) => {
                    let count = reconciler.snapshot().notes().len();
                    self.reconciler = Some(reconciler);
                    self.view_state = AppViewState::Notes;
                    self.connecting = false;
                    self.error_banner = None;
                    self.status = format!("Connected - {count} notes");
                }
                UiEvent::Unmounted => {
                    self.reconciler = None;
                    self.view_state = AppViewState::Connect;
                    self.connecting = false;
                    self.status = "Signed out".to_string();
                }
                UiEvent::NotesChanged => {
                    if let Some(reconciler) = &self.reconciler {
                        let count = reconciler.snapshot().notes().len();
                        self.status = format!("Connected - {count} notes");
                    }
                }
                UiEvent::StreamClosed(kind) => {
                    self.status = format!("{kind:?} stream closed; live updates for it stopped");
                }
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    tracing::warn!(
                        category = ?err.category(),
                        context = ?err.context(),
                        "ui error: {}",
                        err.message()
                    );
                    self.connecting = false;
                    if err.requires_reconnect() {
                        self.reconciler = None;
                        self.view_state = AppViewState::Connect;
                    }
                    let summary = classify_connect_failure(err.message());
                    self.status = summary.clone();
                    self.error_banner = Some(summary);
                }
            }
        }
    }

    fn connect(&mut self) {
        self.settings.api_key = non_blank(&self.api_key_input);
        self.settings.auth_token = non_blank(&self.auth_token_input);
        self.connecting = true;
        self.error_banner = None;
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Connect {
                settings: self.settings.clone(),
            },
            &mut self.status,
        );
    }

    fn show_connect_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(24.0);
            ui.vertical_centered(|ui| {
                ui.set_max_width(480.0);
                ui.heading("Notetaker");
                ui.weak("Connect to a notes backend.");
                ui.add_space(12.0);

                if let Some(banner) = &self.error_banner {
                    ui.colored_label(ui.visuals().error_fg_color, banner);
                    ui.add_space(6.0);
                }

                egui::Grid::new("connect_fields")
                    .num_columns(2)
                    .spacing([10.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Endpoint");
                        ui.text_edit_singleline(&mut self.settings.endpoint);
                        ui.end_row();

                        ui.label("API key");
                        ui.add(egui::TextEdit::singleline(&mut self.api_key_input).password(true));
                        ui.end_row();

                        ui.label("Auth token");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.auth_token_input).password(true),
                        );
                        ui.end_row();
                    });

                ui.add_space(10.0);
                let can_connect = !self.connecting && !self.settings.endpoint.trim().is_empty();
                if ui
                    .add_enabled(can_connect, egui::Button::new("Connect"))
                    .clicked()
                {
                    self.connect();
                }
                if self.connecting {
                    ui.spinner();
                }
                ui.small(&self.status);
            });
        });
    }

    fn show_notes_screen(&mut self, ctx: &egui::Context) {
        let Some(reconciler) = self.reconciler.clone() else {
            self.view_state = AppViewState::Connect;
            return;
        };
        let snapshot = reconciler.snapshot();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Notetaker");
                ui.separator();
                ui.label(&self.status);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign out").clicked() {
                        dispatch_backend_command(
                            &self.cmd_tx,
                            BackendCommand::Disconnect,
                            &mut self.status,
                        );
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            show_composer(ui, &reconciler, &snapshot);
            ui.separator();
            if let Some(action) = show_note_list(ui, &snapshot) {
                match action {
                    NoteAction::Select(note) => reconciler.select_for_edit(&note),
                    NoteAction::Remove(id) => {
                        reconciler.remove(id);
                    }
                }
            }
        });
    }
}

fn show_composer(ui: &mut egui::Ui, reconciler: &Reconciler, snapshot: &NotesState) {
    ui.horizontal(|ui| {
        let mut draft = snapshot.draft().to_string();
        let response = ui.add(
            egui::TextEdit::singleline(&mut draft)
                .hint_text("Write your note")
                .desired_width(ui.available_width() - 120.0),
        );
        if response.changed() {
            reconciler.set_draft(draft);
        }
        let enter_pressed =
            response.lost_focus() && ui.input(|input| input.key_pressed(egui::Key::Enter));
        let clicked = ui.button(submit_label(&snapshot.mode())).clicked();
        if clicked || enter_pressed {
            reconciler.submit_draft();
        }
    });
}

fn show_note_list(ui: &mut egui::Ui, snapshot: &NotesState) -> Option<NoteAction> {
    let mut action = None;
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            if snapshot.notes().is_empty() {
                ui.weak("No notes yet.");
            }
            for note in snapshot.notes() {
                ui.horizontal(|ui| {
                    if ui.small_button("×").on_hover_text("Delete note").clicked() {
                        action = Some(NoteAction::Remove(note.id.clone()));
                    }
                    let selected = snapshot.editing_id() == Some(&note.id);
                    if ui.selectable_label(selected, &note.text).clicked() {
                        action = Some(NoteAction::Select(note.clone()));
                    }
                });
            }
        });
    action
}

fn submit_label(mode: &EditMode) -> &'static str {
    match mode {
        EditMode::Composing => "Add Note",
        EditMode::Editing(_) => "Update Note",
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl eframe::App for NotetakerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        match self.view_state {
            AppViewState::Connect => self.show_connect_screen(ctx),
            AppViewState::Notes => self.show_notes_screen(ctx),
        }

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::bounded;

    use super::*;
    use crate::controller::events::{UiError, UiErrorContext};

    #[test]
    fn submit_label_follows_edit_mode() {
        assert_eq!(submit_label(&EditMode::Composing), "Add Note");
        assert_eq!(
            submit_label(&EditMode::Editing(NoteId::from("3"))),
            "Update Note"
        );
    }

    #[test]
    fn blank_credentials_are_omitted() {
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(" da2-key "), Some("da2-key".to_string()));
    }

    #[test]
    fn connect_queues_settings_with_entered_credentials() {
        let (cmd_tx, cmd_rx) = bounded(4);
        let (_ui_tx, ui_rx) = bounded(4);
        let mut app = NotetakerApp::new(cmd_tx, ui_rx, ClientSettings::default());
        app.api_key_input = "da2-gui".to_string();

        app.connect();

        assert!(app.connecting);
        match cmd_rx.try_recv() {
            Ok(BackendCommand::Connect { settings }) => {
                assert_eq!(settings.api_key.as_deref(), Some("da2-gui"));
                assert_eq!(settings.auth_token, None);
            }
            _ => panic!("expected a connect command"),
        }
    }

    #[test]
    fn connect_failure_returns_to_connect_screen_with_banner() {
        let (cmd_tx, _cmd_rx) = bounded(4);
        let (ui_tx, ui_rx) = bounded(4);
        let mut app = NotetakerApp::new(cmd_tx, ui_rx, ClientSettings::default());
        app.connecting = true;
        ui_tx
            .send(UiEvent::Error(UiError::from_message(
                UiErrorContext::Connect,
                "failed to fetch notes: connection refused",
            )))
            .expect("send ui event");

        app.process_ui_events();

        assert!(!app.connecting);
        assert_eq!(app.view_state, AppViewState::Connect);
        assert_eq!(
            app.error_banner.as_deref(),
            Some("Backend unreachable; check the endpoint URL/network and retry.")
        );
    }

    #[test]
    fn unmounted_event_signs_out() {
        let (cmd_tx, _cmd_rx) = bounded(4);
        let (ui_tx, ui_rx) = bounded(4);
        let mut app = NotetakerApp::new(cmd_tx, ui_rx, ClientSettings::default());
        app.view_state = AppViewState::Notes;
        ui_tx.send(UiEvent::Unmounted).expect("send ui event");

        app.process_ui_events();

        assert_eq!(app.view_state, AppViewState::Connect);
        assert_eq!(app.status, "Signed out");
    }
}
