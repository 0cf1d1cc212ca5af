//! Line input parsing and dispatch from the prompt to the session controller.

use std::sync::Arc;

use session_core::{RejectReason, SessionController, SessionError, SubmitOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Submit(String),
    SendInput,
    QuickQuery(usize),
    ToggleMap,
    ToggleTheme,
    Cancel,
    History,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
Type a question and press Enter to send it.
  /quick <n>   copy quick query <n> into the input
  /send        send the current input
  /map         show or hide the ARGO map panel
  /theme       switch between light and dark mode
  /cancel      abandon the pending reply
  /history     print the whole conversation
  /help        show this help
  /quit        leave the session";

pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return ReplCommand::Submit(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    match name.as_str() {
        "quick" | "q" => match parts.next().map(str::parse::<usize>) {
            Some(Ok(n)) if n >= 1 => ReplCommand::QuickQuery(n - 1),
            _ => ReplCommand::Unknown(trimmed.to_string()),
        },
        "send" => ReplCommand::SendInput,
        "map" => ReplCommand::ToggleMap,
        "theme" => ReplCommand::ToggleTheme,
        "cancel" => ReplCommand::Cancel,
        "history" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(trimmed.to_string()),
    }
}

pub fn command_name(cmd: &ReplCommand) -> &'static str {
    match cmd {
        ReplCommand::Submit(_) => "submit",
        ReplCommand::SendInput => "send_input",
        ReplCommand::QuickQuery(_) => "quick_query",
        ReplCommand::ToggleMap => "toggle_map",
        ReplCommand::ToggleTheme => "toggle_theme",
        ReplCommand::Cancel => "cancel",
        ReplCommand::History => "history",
        ReplCommand::Help => "help",
        ReplCommand::Quit => "quit",
        ReplCommand::Unknown(_) => "unknown",
    }
}

pub fn describe_rejection(reason: RejectReason) -> Option<&'static str> {
    match reason {
        // A disabled send button, not an error.
        RejectReason::EmptyQuery => None,
        RejectReason::ConcurrentSubmit => {
            Some("Still processing the previous query; wait for the reply or /cancel it.")
        }
        RejectReason::SessionClosed => Some("This session has ended."),
    }
}

pub enum Flow {
    Continue,
    Quit,
}

/// Runs one command against the session. Returns status text to print, if any.
pub async fn dispatch(
    session: &Arc<SessionController>,
    cmd: ReplCommand,
) -> Result<(Flow, Option<String>), SessionError> {
    tracing::debug!(command = command_name(&cmd), "dispatching prompt command");
    let status = match cmd {
        ReplCommand::Submit(text) => submit_status(session.submit(&text).await?),
        ReplCommand::SendInput => submit_status(session.send_input().await?),
        ReplCommand::QuickQuery(index) => match session.select_quick_query(index).await {
            Ok(query) => Some(format!("Input: {query}  (/send to ask)")),
            Err(err @ SessionError::Store(_)) => return Err(err),
            Err(err) => Some(err.to_string()),
        },
        ReplCommand::ToggleMap => {
            session.toggle_map().await;
            None
        }
        ReplCommand::ToggleTheme => {
            session.toggle_theme().await;
            None
        }
        ReplCommand::Cancel => {
            if session.cancel().await {
                None
            } else {
                Some("Nothing to cancel.".to_string())
            }
        }
        ReplCommand::History => Some(crate::render::transcript(session.messages().await.messages())),
        ReplCommand::Help => Some(HELP_TEXT.to_string()),
        ReplCommand::Quit => return Ok((Flow::Quit, None)),
        ReplCommand::Unknown(raw) => Some(format!("Unknown command '{raw}'. Try /help.")),
    };
    Ok((Flow::Continue, status))
}

fn submit_status(outcome: SubmitOutcome) -> Option<String> {
    match outcome {
        SubmitOutcome::Accepted { .. } => None,
        SubmitOutcome::Rejected(reason) => describe_rejection(reason).map(str::to_string),
    }
}
