//! Interactive command entry for a node agent. Lines typed at the prompt go
//! through the same typed command channel as the spool reader.

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config as RLConfig, Editor};
use std::path::PathBuf;
use std::thread::JoinHandle;

use crate::agent::commands::CommandQueue;
use crate::constants::{full_version, ICON_PLACEHOLDER};

const COMMANDS: &[&str] = &[
    "submit_info",
    "get_list",
    "get_ip",
    "peer_connect:",
    "chat:",
    "file:",
    "help",
    "version",
    "exit",
];

const HELP: &str = "\
  submit_info                          Register with the tracker
  get_list                             Fetch the tracker's node list
  get_ip                               Ask the tracker for our public IP
  peer_connect:<host:port>             Handshake with a peer
  chat:{\"peer\":..,\"message\":..}        Send a chat message
  file:{\"peer\":..,\"file\":{..}}         Send a file descriptor
  version                              Show version
  exit                                 Stop the agent";

/// Start the prompt on a dedicated thread (line editing blocks). The thread
/// ends on `exit`, EOF or Ctrl+C, each of which also stops the agent.
pub fn spawn_prompt(queue: CommandQueue, label: String) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("prompt".into())
        .spawn(move || run_prompt(queue, label))
}

fn history_path() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".nodetrack_history"))
        .unwrap_or_else(|_| PathBuf::from(".nodetrack_history"))
}

fn run_prompt(queue: CommandQueue, label: String) {
    let rl_cfg = RLConfig::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();
    let mut rl: Editor<CommandCompleter, DefaultHistory> = match Editor::with_config(rl_cfg) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}prompt unavailable: {}", ICON_PLACEHOLDER, e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter));
    let hist = history_path();
    let _ = rl.load_history(hist.as_path());
    let prompt_label = format!("{}> ", label);

    loop {
        let line = match rl.readline(&prompt_label) {
            Ok(line) => line,
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                queue.blocking_push_line("exit");
                break;
            }
            Err(e) => {
                eprintln!("{}read error: {}", ICON_PLACEHOLDER, e);
                queue.blocking_push_line("exit");
                break;
            }
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);
        match input {
            "help" | "/help" => {
                println!("Available commands:\n{}", HELP);
                continue;
            }
            "version" | "/version" => {
                println!("{}{}", ICON_PLACEHOLDER, full_version());
                continue;
            }
            "quit" | "/quit" => {
                queue.blocking_push_line("exit");
                break;
            }
            _ => {}
        }
        if !queue.blocking_push_line(input) || input == "exit" {
            break;
        }
    }
    let _ = rl.save_history(hist.as_path());
}

struct CommandCompleter;

impl rustyline::Helper for CommandCompleter {}

impl rustyline::hint::Hinter for CommandCompleter {
    type Hint = String;
}

impl rustyline::highlight::Highlighter for CommandCompleter {}

impl rustyline::validate::Validator for CommandCompleter {}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let before = &line[..pos];
        if before.contains(':') || before.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let out = COMMANDS
            .iter()
            .filter(|c| c.starts_with(before))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c.to_string(),
            })
            .collect();
        Ok((0, out))
    }
}
