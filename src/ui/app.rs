use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::AppConfig;
use crate::game::difficulty;
use crate::game::records::RecordsStore;
use crate::game::scheduler::{Scheduler, TimerKind, TokioScheduler};
use crate::game::session::Session;
use crate::game::state::GameMode;
use crate::game::theme;
use crate::provider::{Provider, ProviderSettings};
use crate::storage::FileStore;

use super::board::render_board;
use super::hud::{banner, status_line};

const HELP: &str = "\
commands:
  <n>        flip card n
  r          restart (level mode starts over at level 1)
  n          next level
  m          switch casual/level mode
  d <id>     casual difficulty: easy, normal, hard, master
  t <name>   built-in theme: Classic Fruits, Space Explorer, Animals
  g <text>   generate a theme with the active provider
  <enter>    redraw
  h          help
  q          quit";

#[derive(Clone, Debug, Default)]
pub struct PlayOptions {
    pub mode: GameMode,
    pub difficulty: Option<String>,
    pub theme: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Flip(usize),
    Restart,
    NextLevel,
    ToggleMode,
    Difficulty(String),
    Theme(String),
    Generate(String),
    Redraw,
    Help,
    Quit,
}

// Positions are typed 1-based and returned 0-based.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Some(Command::Redraw);
    }
    if let Ok(n) = line.parse::<usize>() {
        return n.checked_sub(1).map(Command::Flip);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match (head.to_ascii_lowercase().as_str(), rest) {
        ("r", "") => Some(Command::Restart),
        ("n", "") => Some(Command::NextLevel),
        ("m", "") => Some(Command::ToggleMode),
        ("h", "") | ("?", "") => Some(Command::Help),
        ("q", "") => Some(Command::Quit),
        ("d", id) if !id.is_empty() => Some(Command::Difficulty(id.to_string())),
        ("t", name) if !name.is_empty() => Some(Command::Theme(name.to_string())),
        ("g", prompt) if !prompt.is_empty() => Some(Command::Generate(prompt.to_string())),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Refresh {
    Nothing,
    StatusLine,
    Board,
}

// Every live tick moves the clock, so the status line is reprinted each second.
fn refresh_after(kind: TimerKind, current_round: bool, status_changed: bool) -> Refresh {
    match kind {
        _ if status_changed => Refresh::Board,
        _ if !current_round => Refresh::Nothing,
        TimerKind::Tick => Refresh::StatusLine,
        TimerKind::Settle | TimerKind::Revert => Refresh::Board,
    }
}

fn draw<S: Scheduler>(session: &Session<S>) {
    let st = session.state();
    let columns = difficulty::board_columns(st.mode, session.casual_difficulty(), st.required_pairs);
    println!();
    println!("{}", status_line(session));
    println!("{}", render_board(st, columns));
    if let Some(text) = banner(session) {
        println!("{text}");
    }
}

async fn generate_theme<S: Scheduler>(
    session: &mut Session<S>,
    providers: &ProviderSettings,
    prompt: &str,
) {
    let config = providers.active();
    info!(provider = %config.name, "generating theme");
    match Provider::from_config(config) {
        Ok(provider) => {
            session.request_new_theme(prompt, &provider).await;
        }
        Err(err) => {
            session.fail_theme_request(prompt, err);
        }
    }
}

pub async fn run(config: AppConfig, options: PlayOptions) -> Result<()> {
    let (scheduler, mut timers) = TokioScheduler::new();
    let records = RecordsStore::load(Box::new(FileStore::new(&config.data_dir)));
    let providers = ProviderSettings::load(Box::new(FileStore::new(&config.data_dir)));
    let mut session = Session::new(scheduler, records, config.timings);

    if options.mode == GameMode::Level {
        session.toggle_mode();
    }
    if let Some(id) = &options.difficulty {
        session.set_casual_difficulty(id);
    }
    match options.theme.as_deref().map(theme::find_builtin) {
        Some(Some(found)) => session.select_theme(found),
        Some(None) => println!("Unknown theme, keeping {}", session.theme().name),
        None => {}
    }
    if session.round() == 0 {
        session.initialize();
    }
    if let Some(prompt) = &options.prompt {
        draw(&session);
        generate_theme(&mut session, &providers, prompt).await;
    }

    println!("{HELP}");
    draw(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = timers.recv() => {
                let before = session.status();
                let current = event.round == session.round();
                session.handle_timer(event);
                match refresh_after(event.kind, current, session.status() != before) {
                    Refresh::Board => draw(&session),
                    Refresh::StatusLine => println!("{}", status_line(&session)),
                    Refresh::Nothing => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(Command::Help) => println!("{HELP}"),
                    Some(Command::Redraw) => draw(&session),
                    Some(Command::Flip(position)) => {
                        session.flip_at(position);
                        draw(&session);
                    }
                    Some(Command::Restart) => {
                        session.restart();
                        draw(&session);
                    }
                    Some(Command::NextLevel) => {
                        if !session.next_level() {
                            println!("Next level is only available after winning a level.");
                        }
                        draw(&session);
                    }
                    Some(Command::ToggleMode) => {
                        session.toggle_mode();
                        draw(&session);
                    }
                    Some(Command::Difficulty(id)) => {
                        session.set_casual_difficulty(&id);
                        draw(&session);
                    }
                    Some(Command::Theme(name)) => match theme::find_builtin(&name) {
                        Some(found) => {
                            session.select_theme(found);
                            draw(&session);
                        }
                        None => println!("Unknown theme: {name}"),
                    },
                    Some(Command::Generate(prompt)) => {
                        println!("Generating theme...");
                        generate_theme(&mut session, &providers, &prompt).await;
                        draw(&session);
                    }
                    None => println!("Unrecognised command, h for help"),
                }
            }
        }
    }
    Ok(())
}
