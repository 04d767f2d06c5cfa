use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ClientSettings, EditMode, GraphqlNotesClient, NotesApi, NotesState, Reconciler,
    ReconcilerEvent,
};
use shared::domain::{Note, NoteId};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "notetaker", about = "Take notes against a GraphQL notes backend")]
struct Args {
    /// GraphQL HTTP endpoint; overrides notetaker.toml and the environment.
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    realtime_endpoint: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    auth_token: Option<String>,
    /// Print notes as JSON instead of a table.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every note.
    List,
    /// Create a note.
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Replace the text of an existing note.
    Update {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Delete a note.
    Delete { id: String },
    /// Keep the list in sync with the backend and reprint it on every change.
    Watch,
}

impl Args {
    fn apply_overrides(&self, settings: &mut ClientSettings) {
        if let Some(v) = &self.endpoint {
            settings.endpoint = v.clone();
        }
        if let Some(v) = &self.realtime_endpoint {
            settings.realtime_endpoint = Some(v.clone());
        }
        if let Some(v) = &self.api_key {
            settings.api_key = Some(v.clone());
        }
        if let Some(v) = &self.auth_token {
            settings.auth_token = Some(v.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    args.apply_overrides(&mut settings);
    let client = GraphqlNotesClient::new(&settings)?;

    match &args.command {
        Command::List => {
            let notes = client.fetch_all_notes().await?;
            print_notes(&notes, args.json)?;
        }
        Command::Add { text } => {
            let note = client.create_note(&text.join(" ")).await?;
            print_note(&note, args.json)?;
        }
        Command::Update { id, text } => {
            let note = client
                .update_note(&NoteId::new(id.as_str()), &text.join(" "))
                .await?;
            print_note(&note, args.json)?;
        }
        Command::Delete { id } => {
            let note = client.delete_note(&NoteId::new(id.as_str())).await?;
            print_note(&note, args.json)?;
        }
        Command::Watch => watch(Arc::new(client), args.json).await?,
    }

    Ok(())
}

async fn watch(api: Arc<dyn NotesApi>, json: bool) -> Result<()> {
    let mounted = Reconciler::mount(api).await?;
    let reconciler = mounted.reconciler().clone();
    let mut changes = reconciler.changes();
    print_state(&reconciler.snapshot(), json)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = changes.recv() => match change {
                Ok(ReconcilerEvent::StreamClosed(kind)) => {
                    eprintln!("{kind:?} stream closed; live updates for it have stopped");
                }
                Ok(_) => print_state(&reconciler.snapshot(), json)?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watch: fell behind reconciler events");
                    print_state(&reconciler.snapshot(), json)?;
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    mounted.unmount().await;
    Ok(())
}

fn print_note(note: &Note, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(note)?);
    } else {
        println!("{}\t{}", note.id, note.text);
    }
    Ok(())
}

fn print_notes(notes: &[Note], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(notes)?);
    } else {
        print!("{}", render_notes(notes));
    }
    Ok(())
}

fn print_state(state: &NotesState, json: bool) -> Result<()> {
    if json {
        return print_notes(state.notes(), true);
    }
    println!("--- {} ---", mode_label(&state.mode()));
    print!("{}", render_notes(state.notes()));
    Ok(())
}

fn mode_label(mode: &EditMode) -> String {
    match mode {
        EditMode::Composing => "Add Note".to_string(),
        EditMode::Editing(id) => format!("Update Note {id}"),
    }
}

fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "(no notes)\n".to_string();
    }
    notes
        .iter()
        .map(|note| format!("{}\t{}\n", note.id, note.text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_note() {
        let notes = vec![Note::new("1", "buy milk"), Note::new("2", "call mom")];
        assert_eq!(render_notes(&notes), "1\tbuy milk\n2\tcall mom\n");
        assert_eq!(render_notes(&[]), "(no notes)\n");
    }

    #[test]
    fn mode_label_tracks_editing_selection() {
        assert_eq!(mode_label(&EditMode::Composing), "Add Note");
        assert_eq!(
            mode_label(&EditMode::Editing(NoteId::from("7"))),
            "Update Note 7"
        );
    }

    #[test]
    fn cli_flags_override_loaded_settings() {
        let args = Args::parse_from([
            "notetaker",
            "--endpoint",
            "https://cli.example.com/graphql",
            "--api-key",
            "da2-cli",
            "add",
            "buy",
            "milk",
        ]);
        let mut settings = ClientSettings::default();

        args.apply_overrides(&mut settings);

        assert_eq!(settings.endpoint, "https://cli.example.com/graphql");
        assert_eq!(settings.api_key.as_deref(), Some("da2-cli"));
        match args.command {
            Command::Add { text } => assert_eq!(text.join(" "), "buy milk"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
