//! Client for the Telegram Bot API: long-polls `getUpdates`, decodes the
//! updates and hands text messages to handlers registered for their exact
//! text.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use telegram_bot_api::{Client, Message, MessageHandler, SendMessageOptions};
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl MessageHandler for Greeter {
//!     async fn handle(&self, client: &Client, message: &Message) -> telegram_bot_api::Result<()> {
//!         client
//!             .send_message(message.chat.id(), "Hi!", SendMessageOptions::default())
//!             .await?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn start() -> telegram_bot_api::Result<()> {
//! let mut client = Client::builder("110201543:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw")
//!     .listener("Hello", Arc::new(Greeter))
//!     .build()
//!     .await?;
//! client.run().await
//! # }
//! ```

pub mod config;
pub mod telegram;

pub use config::Config;
pub use telegram::client::{Client, ClientBuilder, Method, OffsetPolicy, SendMessageOptions};
pub use telegram::dispatcher::{Dispatcher, Handler, MessageHandler};
pub use telegram::{Chat, ChatId, Message, Result, TelegramError, Update, User};
