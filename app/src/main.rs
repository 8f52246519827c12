//! Terminal front-end for the todo app.
//!
//! Reads one command per line, dispatches the matching intents and prints the
//! rendered screen whenever the state changes.

use anyhow::Context;
use firetodo_app::{AppConfig, Intent, Screen, TodoApp};
use firetodo_backend::TodoId;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Commands:
  signup <email> <password>   create an account and sign in
  signin <email> <password>   sign in
  signout                     sign out
  add <text>                  add a todo
  toggle <n>                  flip completion of row n
  edit <n>                    edit row n
  text <text>                 replace the edit draft
  save | cancel               leave edit mode
  rm <n>                      delete row n
  help | quit";

/// One parsed input line.
enum Command {
    Intents(Vec<Intent>),
    Row(RowCommand, usize),
    Help,
    Quit,
}

#[derive(Clone, Copy)]
enum RowCommand {
    Toggle,
    Edit,
    Remove,
}

fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let credentials = |submit: Intent| -> Result<Command, String> {
        match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
            // Both fields are required before anything is submitted
            [email, password] => Ok(Command::Intents(vec![
                Intent::EditEmail((*email).to_string()),
                Intent::EditPassword((*password).to_string()),
                submit,
            ])),
            _ => Err(format!("usage: {verb} <email> <password>")),
        }
    };
    let row = |command: RowCommand| -> Result<Command, String> {
        rest.parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| Command::Row(command, n))
            .ok_or_else(|| format!("usage: {verb} <row number>"))
    };

    match verb {
        "signup" => credentials(Intent::SignUp),
        "signin" => credentials(Intent::SignIn),
        "signout" => Ok(Command::Intents(vec![Intent::SignOut])),
        "add" => Ok(Command::Intents(vec![
            Intent::EditInput(rest.to_string()),
            Intent::SubmitAdd,
        ])),
        "toggle" => row(RowCommand::Toggle),
        "edit" => row(RowCommand::Edit),
        "rm" => row(RowCommand::Remove),
        "text" => Ok(Command::Intents(vec![Intent::EditDraft(rest.to_string())])),
        "save" => Ok(Command::Intents(vec![Intent::SaveEdit])),
        "cancel" => Ok(Command::Intents(vec![Intent::CancelEdit])),
        "help" | "" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command `{other}`, try `help`")),
    }
}

/// Row `n` (1-based) of the screen.
fn row_id(screen: &Screen, n: usize) -> Option<TodoId> {
    screen.rows().get(n - 1).map(|row| row.id.clone())
}

async fn run_command(app: &TodoApp, command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Intents(intents) => {
            for intent in intents {
                app.dispatch(intent).await?;
            }
        },
        Command::Row(command, n) => {
            let Some(id) = row_id(&app.screen().await, n) else {
                println!("no row {n}");
                return Ok(true);
            };
            let intent = match command {
                RowCommand::Toggle => Intent::Toggle(id),
                RowCommand::Edit => Intent::BeginEdit(id),
                RowCommand::Remove => Intent::Delete(id),
            };
            app.dispatch(intent).await?;
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let backend = config
        .backend_client()
        .context("constructing backend client")?;
    tracing::info!(backend = ?config.backend, "backend ready");

    let app = TodoApp::new(backend);
    app.start().await?;

    println!("{HELP}\n");

    // Redraw on every state change
    let mut changes = app.subscribe_changes();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_drawn: Option<Screen> = None;
    loop {
        let screen = app.screen().await;
        if last_drawn.as_ref() != Some(&screen) {
            println!("{screen}");
            last_drawn = Some(screen);
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                // Let a burst of changes settle before redrawing
                tokio::time::sleep(Duration::from_millis(20)).await;
            },
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match parse(&line) {
                    Ok(command) => {
                        if !run_command(&app, command).await? {
                            break;
                        }
                    },
                    Err(message) => println!("{message}"),
                }
            },
        }
    }

    app.shutdown();
    Ok(())
}
