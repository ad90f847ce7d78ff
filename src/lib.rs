//! # Dragonkeep - a community dragon-raising chat game
//!
//! Players look after a dragon together (or each raise their own), send it on
//! quests and adventures, duel each other and gang up on a shared world boss.
//! The crate is the game-state engine behind a chat bot: transports feed it
//! commands and get plain text back.
//!
//! ## Features
//!
//! - **Time-based care**: Hunger, energy, mood and health drift with wall-clock time, applied lazily on access.
//! - **Progression**: Levels, attributes, abilities and item-driven evolution paths.
//! - **Adventure**: Quests, explorable locations and multi-round monster fights.
//! - **PvP duels**: Challenge, accept or decline with timeouts and reputation.
//! - **World boss**: Tiered shared boss with damage-proportional rewards.
//! - **Economy**: Shop, inventory, daily bonus and leaderboard.
//! - **Persistence**: Sled-backed records with schema versioning and safe fallbacks.
//! - **Async Design**: Tokio throughout, with per-entity locks for concurrent players.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dragonkeep::config::Config;
//! use dragonkeep::server::GameServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let server = GameServer::new(config)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - Data model, rules, storage and the async engine
//! - [`server`] - Console transport reading `<player> <command>` lines
//! - [`config`] - Configuration loading and validation
//! - [`validation`] - Name and identifier validation
//! - [`logutil`] - Single-line log sanitizing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Transport     │ ← parse command, render outcome
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   GameEngine    │ ← locks, accrual, resolvers
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   DragonStore   │ ← Sled trees
//! └─────────────────┘
//! ```

pub mod config;
pub mod game;
pub mod logutil;
pub mod server;
pub mod validation;
