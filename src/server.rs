//! # Console game server
//!
//! Line-oriented transport for the game engine. Each input line names the
//! player and then the command, exactly as a chat message would carry it:
//!
//! ```text
//! ann /feed bread
//! bob duel ann
//! ann cb:duel_accept_1a2b3c4d
//! ```
//!
//! The `cb:` prefix marks a button callback payload instead of typed text.
//! Blank lines and lines starting with `#` are ignored, which lets a scripted
//! session be piped in from a file.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use crate::config::Config;
use crate::game::{
    parse_callback, parse_command, render_error, render_outcome, spawn_maintenance, Actor,
    CommandError, DragonOwner, GameEngine, HELP_TEXT,
};
use crate::logutil::{actor_tag, escape_log};
use crate::validation::validate_player_id;

const CALLBACK_PREFIX: &str = "cb:";
const USAGE: &str = "Usage: <player> <command>, e.g. `ann /feed bread`";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine<'a> {
    Typed { player: &'a str, text: &'a str },
    Callback { player: &'a str, data: &'a str },
}

/// Split a raw line into player and payload. `None` for blank and comment lines.
pub fn split_line(line: &str) -> Option<Result<ConsoleLine<'_>, &'static str>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let Some((player, rest)) = line.split_once(char::is_whitespace) else {
        return Some(Err(USAGE));
    };
    let player = player.trim_end_matches(':');
    let rest = rest.trim();
    if player.is_empty() || rest.is_empty() {
        return Some(Err(USAGE));
    }
    Some(Ok(match rest.strip_prefix(CALLBACK_PREFIX) {
        Some(data) => ConsoleLine::Callback { player, data },
        None => ConsoleLine::Typed { player, text: rest },
    }))
}

pub struct GameServer {
    config: Config,
    engine: Arc<GameEngine>,
}

impl GameServer {
    pub fn new(config: Config) -> Result<Self> {
        let engine = GameEngine::from_config(&config)?;
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    pub fn with_engine(config: Config, engine: Arc<GameEngine>) -> Self {
        Self { config, engine }
    }

    pub fn engine(&self) -> &Arc<GameEngine> {
        &self.engine
    }

    /// Handle one input line and return the reply, if any.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let parsed = match split_line(line)? {
            Ok(parsed) => parsed,
            Err(usage) => return Some(usage.to_string()),
        };
        let (player, command) = match parsed {
            ConsoleLine::Typed { player, text } => (player, parse_command(text)),
            ConsoleLine::Callback { player, data } => (player, parse_callback(data)),
        };
        let player = match validate_player_id(player) {
            Ok(id) => id,
            Err(e) => {
                warn!("rejected player id {}: {}", escape_log(player), e);
                return Some(format!("Invalid player name: {}", e));
            }
        };
        let command = match command {
            Ok(command) => command,
            Err(CommandError::Unknown(name)) => {
                debug!("unknown command {} from {}", escape_log(&name), player);
                return Some(format!("Unknown command '{}'.\n{}", name, HELP_TEXT));
            }
            Err(e) => return Some(capitalize(&e.to_string())),
        };

        let actor = Actor::new(&player, &player);
        debug!("{} issued {:?}", actor_tag(&actor.id, &actor.display_name), command);
        Some(match self.engine.execute(&actor, command).await {
            Ok(outcome) => render_outcome(&outcome),
            Err(e) => {
                if e.is_user_facing() {
                    debug!("{} refused: {}", escape_log(&actor.id), e);
                } else {
                    warn!("request from {} failed: {}", escape_log(&actor.id), e);
                }
                render_error(&e)
            }
        })
    }

    /// Serve lines from `reader` until it closes or Ctrl-C arrives.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = spawn_maintenance(self.engine.clone(), &self.config.maintenance, shutdown_rx);
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if let Some(reply) = self.handle_line(&line).await {
                                writer.write_all(reply.as_bytes()).await?;
                                writer.write_all(b"\n").await?;
                                writer.flush().await?;
                            }
                        }
                        None => {
                            info!("Input closed");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        let _ = shutdown_tx.send(true);
        if let Some(handle) = sweeper {
            if let Err(e) = handle.await {
                warn!("Maintenance task ended abnormally: {}", e);
            }
        }
        info!("Game server shutdown complete");
        Ok(())
    }

    /// Serve the process's stdin and stdout.
    pub async fn run(&self) -> Result<()> {
        info!(
            "dragonkeep started ({:?} mode, data in {})",
            self.engine.settings().dragon_mode,
            self.config.storage.data_dir
        );
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Snapshot of the world for the `status` subcommand.
    pub async fn status_snapshot(&self) -> Result<serde_json::Value> {
        let store = self.engine.store();
        let world = store.get_dragon(&DragonOwner::World).ok();
        let boss = store.get_boss()?;
        let leaderboard = self.engine.leaderboard().await?;
        Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dragon_mode": self.engine.settings().dragon_mode,
            "players": store.list_player_ids()?.len(),
            "dragons": store.list_dragon_owners()?.len(),
            "world_dragon": world,
            "boss": boss,
            "leaderboard": leaderboard,
            "recent_events": store.recent_logs(10)?,
        }))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{DragonStoreBuilder, GameSettings, ManualClock};
    use chrono::Utc;
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> GameServer {
        let store = DragonStoreBuilder::new(dir.path()).open().unwrap();
        let settings = GameSettings {
            rng_seed: Some(3),
            ..GameSettings::default()
        };
        let engine = GameEngine::new(store, settings, Arc::new(ManualClock::new(Utc::now())));
        let mut config = Config::default();
        config.maintenance.enabled = false;
        GameServer::with_engine(config, Arc::new(engine))
    }

    #[test]
    fn splits_player_and_payload() {
        assert_eq!(
            split_line("ann /feed bread"),
            Some(Ok(ConsoleLine::Typed { player: "ann", text: "/feed bread" }))
        );
        assert_eq!(
            split_line("bob: cb:buy_mead"),
            Some(Ok(ConsoleLine::Callback { player: "bob", data: "buy_mead" }))
        );
        assert_eq!(split_line("   "), None);
        assert_eq!(split_line("# scripted session"), None);
        assert_eq!(split_line("lonely"), Some(Err(USAGE)));
    }

    #[tokio::test]
    async fn buys_and_reports_through_lines() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let reply = server.handle_line("ann /buy bread").await.unwrap();
        assert!(reply.contains("Bread"), "{}", reply);
        let reply = server.handle_line("ann cb:buy_unicorn").await.unwrap();
        assert!(reply.starts_with("Unknown item"), "{}", reply);
        assert!(server.handle_line("").await.is_none());
    }

    #[tokio::test]
    async fn rejects_bad_player_and_command() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let reply = server.handle_line("admin /status").await.unwrap();
        assert!(reply.starts_with("Invalid player name"), "{}", reply);
        let reply = server.handle_line("ann /dance").await.unwrap();
        assert!(reply.starts_with("Unknown command 'dance'"), "{}", reply);
        let reply = server.handle_line("ann /feed").await.unwrap();
        assert_eq!(reply, "Feed needs an item");
    }

    #[tokio::test]
    async fn serve_answers_each_line() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let input: &[u8] = b"ann /start\n\nann /daily\nann /daily\n";
        let mut output = Vec::new();
        server.serve(input, &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("already claimed"), "{}", text);
    }

    #[tokio::test]
    async fn status_snapshot_lists_world() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        server.handle_line("ann /play").await.unwrap();
        let snapshot = server.status_snapshot().await.unwrap();
        assert_eq!(snapshot["players"], 1);
        assert_eq!(snapshot["world_dragon"]["name"], "Ignis");
        assert!(snapshot["boss"].is_null());
    }
}
