//! Telegram Integration - Bot API long-polling interface
//!
//! This crate connects the responder in `replybot-core` to Telegram:
//! - **Wire types** (`api`) - `Update`, `Message`, `sendMessage` payloads
//! - **Commands** (`commands`) - `/start`, `/help`, `/about`, `/services`, `/contact`
//! - **Keyboard** (`keyboard`) - quick-action reply keyboard attached to every reply
//! - **Events** (`events`) - update classification and handler dispatch
//! - **Gateway** (`gateway`) - HTTPS client for the Bot API
//! - **Polling** (`polling`) - `getUpdates` loop with backoff
//!
//! # Getting Started
//!
//! 1. Create a bot with @BotFather and copy its token
//! 2. Set `REPLYBOT_TELEGRAM_BOT_TOKEN` (or `TELEGRAM_TOKEN`)
//! 3. Run `replybot-server`
//!
//! # Architecture
//!
//! ```text
//! getUpdates → PollingRunner → EventDispatcher → MessageHandler → Responder
//!                   ↓
//!             sendMessage ← SendAction
//! ```

pub mod api;
pub mod commands;
pub mod events;
pub mod gateway;
pub mod keyboard;
pub mod polling;
