use crate::assistant::Assistant;
use crate::error::{command_error, AppResult};
use crate::utils::time::{normalize_time, parse_date};
use std::path::PathBuf;

// Export submodules
pub mod account;
pub mod calendar;
pub mod profile;
pub mod util;

/// One line of terminal input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Chat(String),
    Help,
    Quit,
    Events,
    Sync,
    AddEvent {
        date: String,
        time: Option<String>,
        title: String,
    },
    DeleteEvent {
        title: String,
        date: Option<String>,
    },
    Memory,
    Remember(String),
    Request(String),
    Temporary(String),
    ForgetTemporary,
    Documents,
    AddDocument(PathBuf),
    RemoveDocument(String),
    Settings,
    Set {
        key: String,
        value: String,
    },
    Clear,
    Login,
    WhoAmI,
    Logout,
}

/// Output of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

fn required(rest: &str, usage: &str) -> AppResult<String> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(command_error(&format!("Usage: {}", usage)));
    }
    Ok(rest.to_string())
}

/// Parse a line of input; anything not starting with `/` is a chat message
pub fn parse_command(line: &str) -> AppResult<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Err(command_error("Nothing to send"));
    }
    if !line.starts_with('/') {
        return Ok(Command::Chat(line.to_string()));
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match name.to_lowercase().as_str() {
        "/help" | "/?" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        "/events" => Command::Events,
        "/sync" => Command::Sync,
        "/add" => parse_add(rest)?,
        "/delete" => parse_delete(rest)?,
        "/memory" => Command::Memory,
        "/remember" => Command::Remember(required(rest, "/remember <text>")?),
        "/request" => Command::Request(required(rest, "/request <text>")?),
        "/temp" => Command::Temporary(required(rest, "/temp <text>")?),
        "/forget-temp" => Command::ForgetTemporary,
        "/docs" => Command::Documents,
        "/doc" => parse_doc(rest)?,
        "/settings" => Command::Settings,
        "/set" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| command_error("Usage: /set <key> <value>"))?;
            Command::Set {
                key: key.to_lowercase(),
                value: value.trim().to_string(),
            }
        }
        "/clear" => Command::Clear,
        "/login" => Command::Login,
        "/whoami" => Command::WhoAmI,
        "/logout" => Command::Logout,
        other => return Err(command_error(&format!("Unknown command: {}", other))),
    };

    Ok(command)
}

/// `/add <date> [time] <title>`
fn parse_add(rest: &str) -> AppResult<Command> {
    const USAGE: &str = "Usage: /add <YYYY-MM-DD> [HH:MM] <title>";

    let mut parts = rest.split_whitespace();
    let date = parts.next().ok_or_else(|| command_error(USAGE))?;
    if parse_date(date).is_none() {
        return Err(command_error(&format!("Invalid date '{}'. {}", date, USAGE)));
    }

    let remaining: Vec<&str> = parts.collect();
    let (time, title_parts) = match remaining.split_first() {
        Some((first, others)) => match normalize_time(first) {
            Some(time) => (Some(time), others),
            None => (None, remaining.as_slice()),
        },
        None => (None, remaining.as_slice()),
    };

    let title = title_parts.join(" ");
    if title.is_empty() {
        return Err(command_error(USAGE));
    }

    Ok(Command::AddEvent {
        date: date.to_string(),
        time,
        title,
    })
}

/// `/delete <title> [date]`
fn parse_delete(rest: &str) -> AppResult<Command> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let (date, title_words) = match words.split_last() {
        Some((last, others)) if !others.is_empty() && parse_date(last).is_some() => {
            (Some(last.to_string()), others)
        }
        _ => (None, words.as_slice()),
    };

    let title = title_words.join(" ");
    if title.is_empty() {
        return Err(command_error("Usage: /delete <title> [YYYY-MM-DD]"));
    }

    Ok(Command::DeleteEvent { title, date })
}

/// `/doc add <path>` or `/doc rm <name>`
fn parse_doc(rest: &str) -> AppResult<Command> {
    const USAGE: &str = "Usage: /doc add <path> | /doc rm <name>";

    let (action, argument) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let argument = argument.trim();
    if argument.is_empty() {
        return Err(command_error(USAGE));
    }

    match action {
        "add" => Ok(Command::AddDocument(PathBuf::from(argument))),
        "rm" | "remove" => Ok(Command::RemoveDocument(argument.to_string())),
        _ => Err(command_error(USAGE)),
    }
}

/// Run a command against the open assistant
pub async fn execute(assistant: &mut Assistant, command: Command) -> AppResult<Reply> {
    let text = match command {
        Command::Quit => return Ok(Reply::Quit),
        Command::Help => util::help_text(),
        Command::Chat(message) => {
            let reply = assistant.chat(&message).await?;
            util::format_chat_reply(assistant.settings(), &reply)
        }
        Command::Events => calendar::events(assistant).await?,
        Command::Sync => calendar::sync(assistant).await?,
        Command::AddEvent { date, time, title } => {
            calendar::add(assistant, date, time, title).await?
        }
        Command::DeleteEvent { title, date } => calendar::delete(assistant, title, date).await?,
        Command::Memory => profile::memory(assistant).await?,
        Command::Remember(text) => profile::remember_information(assistant, &text).await?,
        Command::Request(text) => profile::remember_request(assistant, &text).await?,
        Command::Temporary(text) => profile::remember_temporary(assistant, &text).await?,
        Command::ForgetTemporary => profile::forget_temporary(assistant).await?,
        Command::Documents => profile::documents(assistant).await?,
        Command::AddDocument(path) => profile::add_document(assistant, &path).await?,
        Command::RemoveDocument(name) => profile::remove_document(assistant, &name).await?,
        Command::Settings => profile::settings(assistant),
        Command::Set { key, value } => profile::set(assistant, &key, &value).await?,
        Command::Clear => {
            assistant.clear_chat().await?;
            "Chat history cleared.".to_string()
        }
        Command::Login => account::login(assistant).await?,
        Command::WhoAmI => account::whoami(assistant).await?,
        Command::Logout => account::logout(assistant).await?,
    };

    Ok(Reply::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            parse_command("  what's on tomorrow? ").unwrap(),
            Command::Chat("what's on tomorrow?".to_string())
        );
        assert!(parse_command("   ").is_err());
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse_command("/add 2025-05-02 9:30 Dentist visit").unwrap(),
            Command::AddEvent {
                date: "2025-05-02".to_string(),
                time: Some("09:30".to_string()),
                title: "Dentist visit".to_string(),
            }
        );
        assert_eq!(
            parse_command("/add 2025-05-02 Midsummer").unwrap(),
            Command::AddEvent {
                date: "2025-05-02".to_string(),
                time: None,
                title: "Midsummer".to_string(),
            }
        );
        assert!(parse_command("/add tomorrow Dentist").is_err());
        assert!(parse_command("/add 2025-05-02 10:00").is_err());
    }

    #[test]
    fn test_parse_delete() {
        assert_eq!(
            parse_command("/delete Team lunch 2025-05-02").unwrap(),
            Command::DeleteEvent {
                title: "Team lunch".to_string(),
                date: Some("2025-05-02".to_string()),
            }
        );
        assert_eq!(
            parse_command("/delete 2025-05-02").unwrap(),
            Command::DeleteEvent {
                title: "2025-05-02".to_string(),
                date: None,
            }
        );
        assert!(parse_command("/delete").is_err());
    }

    #[test]
    fn test_parse_memory_doc_and_settings() {
        assert_eq!(
            parse_command("/remember I like tea").unwrap(),
            Command::Remember("I like tea".to_string())
        );
        assert!(parse_command("/temp").is_err());
        assert_eq!(
            parse_command("/doc add notes/todo.md").unwrap(),
            Command::AddDocument(PathBuf::from("notes/todo.md"))
        );
        assert_eq!(
            parse_command("/doc rm todo.md").unwrap(),
            Command::RemoveDocument("todo.md".to_string())
        );
        assert!(parse_command("/doc open x").is_err());
        assert_eq!(
            parse_command("/set Temperature 0.3").unwrap(),
            Command::Set {
                key: "temperature".to_string(),
                value: "0.3".to_string(),
            }
        );
        assert!(parse_command("/set temperature").is_err());
        assert_eq!(parse_command("/QUIT").unwrap(), Command::Quit);
        assert!(matches!(
            parse_command("/dance"),
            Err(crate::error::Error::Command(_))
        ));
    }
}
