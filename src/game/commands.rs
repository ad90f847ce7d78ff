//! Parsing of chat input into [`GameCommand`]s.
//!
//! Two surfaces feed the same enum: typed slash commands (`/feed bread`) and
//! button callback payloads (`feed_bread`, `explore_ruins`, `duel_accept_1a2b3c4d`).

use crate::game::catalog::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    Start,
    Help,
    Status,
    Profile,
    Inventory,
    Shop,
    Buy(String),
    Feed(String),
    Play,
    Rest,
    Train,
    Quest,
    Adventure,
    Explore(Location),
    Daily,
    Top,
    Rename(String),
    Duel(String),
    Duels,
    DuelAccept(String),
    DuelDecline(String),
    Boss,
    BossAttack,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("unknown place: {0}")]
    UnknownLocation(String),
}

fn required(
    arg: Option<&str>,
    command: &'static str,
    argument: &'static str,
) -> Result<String, CommandError> {
    match arg.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CommandError::MissingArgument { command, argument }),
    }
}

fn location(arg: Option<&str>) -> Result<GameCommand, CommandError> {
    match arg.map(str::trim).filter(|a| !a.is_empty()) {
        None => Ok(GameCommand::Adventure),
        Some(name) => Location::parse(name)
            .map(GameCommand::Explore)
            .ok_or_else(|| CommandError::UnknownLocation(name.to_string())),
    }
}

/// Parse a typed command. The leading slash is optional and a `@botname` suffix is ignored.
pub fn parse_command(input: &str) -> Result<GameCommand, CommandError> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let (head, rest) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, Some(rest.trim())),
        None => (body, None),
    };
    let head = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

    let command = match head.as_str() {
        "start" => GameCommand::Start,
        "help" | "?" => GameCommand::Help,
        "status" | "dragon" => GameCommand::Status,
        "profile" | "me" => GameCommand::Profile,
        "inventory" | "inv" | "bag" => GameCommand::Inventory,
        "shop" => GameCommand::Shop,
        "buy" => GameCommand::Buy(required(rest, "buy", "an item")?),
        "feed" => GameCommand::Feed(required(rest, "feed", "an item")?),
        "play" => GameCommand::Play,
        "rest" | "sleep" => GameCommand::Rest,
        "train" => GameCommand::Train,
        "quest" => GameCommand::Quest,
        "adventure" | "explore" => location(rest)?,
        "daily" | "bonus" => GameCommand::Daily,
        "top" | "leaderboard" => GameCommand::Top,
        "rename" | "name" => GameCommand::Rename(required(rest, "rename", "a new name")?),
        "duel" => match rest.map(str::trim).filter(|r| !r.is_empty()) {
            None => GameCommand::Duels,
            Some(args) => {
                let mut parts = args.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some("accept"), id) => GameCommand::DuelAccept(required(id, "duel accept", "a duel id")?),
                    (Some("decline"), id) => GameCommand::DuelDecline(required(id, "duel decline", "a duel id")?),
                    (Some(target), _) => GameCommand::Duel(target.to_string()),
                    (None, _) => GameCommand::Duels,
                }
            }
        },
        "duels" => GameCommand::Duels,
        "boss" => match rest.map(|r| r.to_ascii_lowercase()) {
            Some(arg) if arg == "attack" || arg == "hit" => GameCommand::BossAttack,
            _ => GameCommand::Boss,
        },
        "attack" => GameCommand::BossAttack,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

/// Parse a button payload.
pub fn parse_callback(data: &str) -> Result<GameCommand, CommandError> {
    let data = data.trim();
    if let Some(item) = data.strip_prefix("feed_") {
        return Ok(GameCommand::Feed(item.to_string()));
    }
    if let Some(item) = data.strip_prefix("buy_") {
        return Ok(GameCommand::Buy(item.to_string()));
    }
    if let Some(place) = data.strip_prefix("explore_") {
        return location(Some(place));
    }
    if let Some(id) = data.strip_prefix("duel_accept_") {
        return Ok(GameCommand::DuelAccept(id.to_string()));
    }
    if let Some(id) = data.strip_prefix("duel_decline_") {
        return Ok(GameCommand::DuelDecline(id.to_string()));
    }
    match data {
        "boss_attack" => Ok(GameCommand::BossAttack),
        "status" | "back" => Ok(GameCommand::Status),
        "feed" => Ok(GameCommand::Inventory),
        _ => parse_command(data),
    }
}
