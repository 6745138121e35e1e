use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use telegram_bot_api::{
    Client, ClientBuilder, Config, Handler, Message, MessageHandler, Result, SendMessageOptions,
};

/// Answers "Hello" with "Hi!".
struct Greeter;

#[async_trait]
impl MessageHandler for Greeter {
    async fn handle(&self, client: &Client, message: &Message) -> Result<()> {
        info!(
            chat_id = message.chat.id(),
            sender = %message.sender.first_name,
            sent_at = ?message.sent_at(),
            "greeting"
        );
        client
            .send_message(message.chat.id(), "Hi!", SendMessageOptions::default())
            .await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Set up tracing/logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let greeter: Handler = Arc::new(Greeter);
    let mut client = match ClientBuilder::from_config(&config)
        .listener("Hello", greeter)
        .build()
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "could not start the bot");
            std::process::exit(1);
        }
    };

    if let Err(err) = client.run().await {
        error!(error = %err, "bot stopped");
        std::process::exit(1);
    }
}
