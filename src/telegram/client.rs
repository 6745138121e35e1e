use std::fmt;
use std::str::FromStr;

use reqwest::Client as HttpClient;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::codec::{decode_response, encode};
use super::dispatcher::{Dispatcher, Handler};
use super::{
    ChatAction, ChatId, GetMeResponse, GetUpdatesResponse, Message, ReplyMarkup, Response, Result,
    TelegramError, TelegramRequest, Update, User, UserProfilePhotos,
};
use crate::config::Config;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_LIMIT: u32 = 100;

/// What [`Client::token`] hands out instead of the real token.
pub const TOKEN_DECOY: &str = "You are not allowed to get token!";

const MAX_LIMIT: u32 = 100;

pub(crate) fn check_limit(limit: u32) -> Result<u32> {
    if (1..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(TelegramError::ConfigError(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )))
    }
}

/// Bot API methods this client knows the endpoint of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GetMe,
    GetUpdates,
    SetWebhook,
    SendMessage,
    ForwardMessage,
    SendPhoto,
    SendAudio,
    SendDocument,
    SendSticker,
    SendVideo,
    SendLocation,
    SendChatAction,
    GetUserProfilePhotos,
}

impl Method {
    pub const ALL: [Method; 13] = [
        Method::GetMe,
        Method::GetUpdates,
        Method::SetWebhook,
        Method::SendMessage,
        Method::ForwardMessage,
        Method::SendPhoto,
        Method::SendAudio,
        Method::SendDocument,
        Method::SendSticker,
        Method::SendVideo,
        Method::SendLocation,
        Method::SendChatAction,
        Method::GetUserProfilePhotos,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::GetMe => "getMe",
            Method::GetUpdates => "getUpdates",
            Method::SetWebhook => "setWebhook",
            Method::SendMessage => "sendMessage",
            Method::ForwardMessage => "forwardMessage",
            Method::SendPhoto => "sendPhoto",
            Method::SendAudio => "sendAudio",
            Method::SendDocument => "sendDocument",
            Method::SendSticker => "sendSticker",
            Method::SendVideo => "sendVideo",
            Method::SendLocation => "sendLocation",
            Method::SendChatAction => "sendChatAction",
            Method::GetUserProfilePhotos => "getUserProfilePhotos",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the polling offset moves after a batch of updates.
///
/// `FirstId` stores the first update id of the batch and then counts one up
/// for every dispatched message. That only lands past the batch when every
/// update carries a message; otherwise updates are fetched again.
/// `LastId` stores the last update id plus one and ignores dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetPolicy {
    #[default]
    FirstId,
    LastId,
}

impl OffsetPolicy {
    /// Offset to store after receiving `updates`. Empty batches reset it to 0.
    pub fn next_offset(self, updates: &[Update]) -> i64 {
        let picked = match self {
            OffsetPolicy::FirstId => updates.first().map(|u| u.update_id),
            OffsetPolicy::LastId => updates.last().map(|u| u.update_id + 1),
        };
        picked.unwrap_or(0)
    }

    pub fn advances_on_dispatch(self) -> bool {
        self == OffsetPolicy::FirstId
    }
}

impl FromStr for OffsetPolicy {
    type Err = TelegramError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_id" => Ok(OffsetPolicy::FirstId),
            "last" | "last_id" => Ok(OffsetPolicy::LastId),
            other => Err(TelegramError::ConfigError(format!(
                "unknown offset policy {other:?}, expected \"first\" or \"last\""
            ))),
        }
    }
}

/// Optional fields of `sendMessage`.
#[derive(Debug, Clone, Default)]
pub struct SendMessageOptions {
    pub disable_web_page_preview: Option<bool>,
    pub reply_to_message_id: Option<i64>,
    pub reply_markup: Option<ReplyMarkup>,
}

pub struct ClientBuilder {
    token: String,
    api_url: String,
    bot: Option<User>,
    debug: bool,
    limit: u32,
    timeout: u32,
    offset_policy: OffsetPolicy,
    dispatcher: Dispatcher,
}

impl ClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            bot: None,
            debug: false,
            limit: DEFAULT_LIMIT,
            timeout: 0,
            offset_policy: OffsetPolicy::default(),
            dispatcher: Dispatcher::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.token.clone())
            .api_url(config.api_url.clone())
            .debug(config.debug)
            .limit(config.limit)
            .timeout(config.timeout)
            .offset_policy(config.offset_policy)
    }

    /// Root of the API, `https://api.telegram.org` unless pointed elsewhere.
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Known bot identity; skips the `getMe` call in [`ClientBuilder::build`].
    pub fn bot(mut self, bot: User) -> Self {
        self.bot = Some(bot);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn timeout(mut self, timeout: u32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn offset_policy(mut self, offset_policy: OffsetPolicy) -> Self {
        self.offset_policy = offset_policy;
        self
    }

    pub fn listener(mut self, word: impl Into<String>, handler: Handler) -> Self {
        self.dispatcher.add_message_listener(word, handler);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Builds the client, fetching the bot identity when none was given.
    pub async fn build(self) -> Result<Client> {
        let fetch_identity = self.bot.is_none();
        let mut client = self.assemble()?;
        if fetch_identity {
            client.get_me().await?;
        }
        Ok(client)
    }

    fn assemble(self) -> Result<Client> {
        let mut client = Client::with_api_url(self.token, self.api_url);
        client.set_limit(self.limit)?;
        client.bot = self.bot;
        client.debug = self.debug;
        client.timeout = self.timeout;
        client.offset_policy = self.offset_policy;
        client.dispatcher = self.dispatcher;
        Ok(client)
    }
}

/// Long-polling Bot API client with a text dispatcher.
pub struct Client {
    http: HttpClient,
    api_url: String,
    token: String,
    base_url: String,
    bot: Option<User>,
    dispatcher: Dispatcher,
    debug: bool,
    offset: i64,
    limit: u32,
    timeout: u32,
    offset_policy: OffsetPolicy,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_url", &self.api_url)
            .field("bot", &self.bot)
            .field("listeners", &self.dispatcher.len())
            .field("debug", &self.debug)
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("offset_policy", &self.offset_policy)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connects with `token` and fetches the bot identity.
    pub async fn new(token: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(token).build().await
    }

    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    /// A client for an already known bot. Does not touch the network.
    pub fn with_bot(token: impl Into<String>, bot: User) -> Self {
        let mut client = Self::with_api_url(token.into(), DEFAULT_API_URL.to_string());
        client.bot = Some(bot);
        client
    }

    fn with_api_url(token: String, api_url: String) -> Self {
        let mut client = Self {
            http: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: String::new(),
            base_url: String::new(),
            bot: None,
            dispatcher: Dispatcher::new(),
            debug: false,
            offset: 0,
            limit: DEFAULT_LIMIT,
            timeout: 0,
            offset_policy: OffsetPolicy::default(),
        };
        client.set_token(token);
        client
    }

    /// The token is write-only; this always returns [`TOKEN_DECOY`].
    pub fn token(&self) -> &'static str {
        TOKEN_DECOY
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
        self.base_url = format!("{}/bot{}/", self.api_url, self.token);
    }

    pub fn bot(&self) -> Option<&User> {
        self.bot.as_ref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// When set, every raw response body is logged before it is parsed.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Identifier of the first update the next `getUpdates` asks for.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Accepts 1 to 100 updates per batch.
    pub fn set_limit(&mut self, limit: u32) -> Result<()> {
        self.limit = check_limit(limit)?;
        Ok(())
    }

    /// Long-poll timeout in seconds; 0 means short polling.
    pub fn timeout(&self) -> u32 {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: u32) {
        self.timeout = timeout;
    }

    pub fn offset_policy(&self) -> OffsetPolicy {
        self.offset_policy
    }

    pub fn set_offset_policy(&mut self, offset_policy: OffsetPolicy) {
        self.offset_policy = offset_policy;
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn add_message_listener(&mut self, word: impl Into<String>, handler: Handler) {
        self.dispatcher.add_message_listener(word, handler);
    }

    pub fn remove_message_listener(&mut self, handler: &Handler) -> bool {
        self.dispatcher.remove_message_listener(handler)
    }

    fn method_url(&self, method: Method) -> String {
        format!("{}{}", self.base_url, method.as_str())
    }

    async fn get(&self, method: Method, query: Option<&TelegramRequest>) -> Result<String> {
        debug!(method = method.as_str(), "calling telegram");
        let mut request = self.http.get(self.method_url(method));
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        self.read_body(method, response).await
    }

    async fn post(&self, method: Method, form: &TelegramRequest) -> Result<String> {
        debug!(method = method.as_str(), "calling telegram");
        let response = self
            .http
            .post(self.method_url(method))
            .form(form)
            .send()
            .await?;
        self.read_body(method, response).await
    }

    async fn read_body(&self, method: Method, response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if self.debug {
            info!(method = method.as_str(), status = status.as_u16(), body = %body, "raw response");
        }

        if !status.is_success() {
            // rejections usually still come wrapped in an envelope
            if let Ok(envelope) = decode_response::<IgnoredAny>(&body) {
                envelope.into_result()?;
            }
            return Err(TelegramError::StatusError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn required<T>(method: Method, response: Response<T>) -> Result<T> {
        response
            .into_result()?
            .ok_or_else(|| TelegramError::ShapeError(format!("missing result in {method} response")))
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, form: &TelegramRequest) -> Result<T> {
        let body = self.post(method, form).await?;
        Self::required(method, decode_response(&body)?)
    }

    /// Fetches the bot identity and caches it.
    pub async fn get_me(&mut self) -> Result<User> {
        let body = self.get(Method::GetMe, None).await?;
        let response: GetMeResponse = decode_response(&body)?;
        let bot = Self::required(Method::GetMe, response)?;

        info!(bot_id = bot.id, first_name = %bot.first_name, "authenticated");
        self.bot = Some(bot.clone());
        Ok(bot)
    }

    /// Fetches the next batch of updates and moves the stored offset.
    ///
    /// `None` arguments fall back to the client's own offset, limit and
    /// timeout.
    pub async fn get_updates(
        &mut self,
        offset: Option<i64>,
        limit: Option<u32>,
        timeout: Option<u32>,
    ) -> Result<Vec<Update>> {
        let query = TelegramRequest::Updates {
            offset: offset.unwrap_or(self.offset),
            limit: check_limit(limit.unwrap_or(self.limit))?,
            timeout: timeout.unwrap_or(self.timeout),
        };

        let body = self.get(Method::GetUpdates, Some(&query)).await?;
        let response: GetUpdatesResponse = decode_response(&body)?;
        let updates = response.result_or_default()?;

        self.offset = self.offset_policy.next_offset(&updates);
        debug!(count = updates.len(), offset = self.offset, "received updates");

        Ok(updates)
    }

    /// Sends a text message and returns the decoded response as is.
    ///
    /// Returns `Ok(None)` without calling the API when `chat_id` or `text` is
    /// empty.
    pub async fn send_message(
        &self,
        chat_id: impl Into<ChatId>,
        text: impl Into<String>,
        options: SendMessageOptions,
    ) -> Result<Option<Value>> {
        let chat_id = chat_id.into();
        let text = text.into();
        if chat_id.is_empty() || text.is_empty() {
            debug!("empty chat id or text, not sending");
            return Ok(None);
        }

        let reply_markup = options
            .reply_markup
            .as_ref()
            .map(encode)
            .transpose()?;
        let form = TelegramRequest::SendMessage {
            chat_id,
            text,
            disable_web_page_preview: options.disable_web_page_preview,
            reply_to_message_id: options.reply_to_message_id,
            reply_markup,
        };

        let body = self.post(Method::SendMessage, &form).await?;
        let value: Value = serde_json::from_str(&body)?;
        Response::<IgnoredAny>::deserialize(&value)?.into_result()?;

        Ok(Some(value))
    }

    pub async fn forward_message(
        &self,
        chat_id: impl Into<ChatId>,
        from_chat_id: impl Into<ChatId>,
        message_id: i64,
    ) -> Result<Message> {
        let form = TelegramRequest::ForwardMessage {
            chat_id: chat_id.into(),
            from_chat_id: from_chat_id.into(),
            message_id,
        };
        self.call(Method::ForwardMessage, &form).await
    }

    pub async fn send_location(
        &self,
        chat_id: impl Into<ChatId>,
        latitude: f64,
        longitude: f64,
        reply_to_message_id: Option<i64>,
    ) -> Result<Message> {
        let form = TelegramRequest::SendLocation {
            chat_id: chat_id.into(),
            latitude,
            longitude,
            reply_to_message_id,
        };
        self.call(Method::SendLocation, &form).await
    }

    pub async fn send_chat_action(
        &self,
        chat_id: impl Into<ChatId>,
        action: ChatAction,
    ) -> Result<bool> {
        let form = TelegramRequest::SendChatAction {
            chat_id: chat_id.into(),
            action,
        };
        self.call(Method::SendChatAction, &form).await
    }

    pub async fn get_user_profile_photos(
        &self,
        user_id: i64,
        offset: Option<i64>,
        limit: Option<u32>,
    ) -> Result<UserProfilePhotos> {
        let query = TelegramRequest::UserProfilePhotos {
            user_id,
            offset,
            limit: limit.map(check_limit).transpose()?,
        };
        let body = self.get(Method::GetUserProfilePhotos, Some(&query)).await?;
        Self::required(Method::GetUserProfilePhotos, decode_response(&body)?)
    }

    /// Hands `message` to the dispatcher. Under [`OffsetPolicy::FirstId`] the
    /// offset moves one up whether or not a handler matched.
    pub async fn dispatch_message(&mut self, message: &Message) -> Result<bool> {
        let dispatched = self.dispatcher.dispatch_message(&*self, message).await;
        if self.offset_policy.advances_on_dispatch() {
            self.offset += 1;
        }
        dispatched
    }

    /// Fetches one batch and dispatches every message in it. Returns the
    /// number of updates received.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let updates = self.get_updates(None, None, None).await?;

        for update in &updates {
            let Some(message) = &update.message else {
                continue;
            };
            if let Err(err) = self.dispatch_message(message).await {
                warn!(update_id = update.update_id, error = %err, "message handler failed");
            }
        }

        Ok(updates.len())
    }

    /// Polls forever. Only returns when a request or a decode fails.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            limit = self.limit,
            timeout = self.timeout,
            policy = ?self.offset_policy,
            "polling for updates"
        );

        loop {
            if let Err(err) = self.poll_once().await {
                error!(offset = self.offset, error = %err, "polling stopped");
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(update_id: i64) -> Update {
        Update {
            update_id,
            message: None,
        }
    }

    fn client() -> Client {
        Client::with_bot(
            "123:secret",
            User {
                id: 1,
                first_name: "Penguin".to_string(),
                last_name: None,
                username: None,
            },
        )
    }

    #[test]
    fn it_never_reveals_the_token() {
        let mut client = client();
        assert_eq!(client.token(), TOKEN_DECOY);

        client.set_token("456:other");
        assert_eq!(client.token(), TOKEN_DECOY);
        assert!(!format!("{client:?}").contains("456:other"));
    }

    #[test]
    fn it_rebuilds_the_method_url_when_the_token_changes() {
        let mut client = client();
        assert_eq!(
            client.method_url(Method::GetMe),
            "https://api.telegram.org/bot123:secret/getMe"
        );

        client.set_token("456:other");
        assert_eq!(
            client.method_url(Method::GetUpdates),
            "https://api.telegram.org/bot456:other/getUpdates"
        );
    }

    #[test]
    fn it_validates_the_limit() {
        let mut client = client();
        assert_eq!(client.limit(), DEFAULT_LIMIT);

        for bad in [0, 101] {
            assert!(matches!(
                client.set_limit(bad),
                Err(TelegramError::ConfigError(_))
            ));
        }
        assert_eq!(client.limit(), DEFAULT_LIMIT);

        client.set_limit(1).unwrap();
        assert_eq!(client.limit(), 1);
        client.set_limit(100).unwrap();
        assert_eq!(client.limit(), 100);
    }

    #[test]
    fn it_starts_with_the_default_polling_state() {
        let client = client();
        assert_eq!(client.offset(), 0);
        assert_eq!(client.timeout(), 0);
        assert!(!client.debug());
        assert_eq!(client.offset_policy(), OffsetPolicy::FirstId);
    }

    #[test]
    fn it_picks_the_next_offset_per_policy() {
        let batch = [update(5), update(6), update(9)];

        assert_eq!(OffsetPolicy::FirstId.next_offset(&batch), 5);
        assert_eq!(OffsetPolicy::LastId.next_offset(&batch), 10);
        assert_eq!(OffsetPolicy::FirstId.next_offset(&[]), 0);
        assert_eq!(OffsetPolicy::LastId.next_offset(&[]), 0);

        assert!(OffsetPolicy::FirstId.advances_on_dispatch());
        assert!(!OffsetPolicy::LastId.advances_on_dispatch());
    }

    #[test]
    fn it_parses_offset_policies() {
        assert_eq!("first".parse::<OffsetPolicy>().unwrap(), OffsetPolicy::FirstId);
        assert_eq!(" LAST ".parse::<OffsetPolicy>().unwrap(), OffsetPolicy::LastId);
        assert!("middle".parse::<OffsetPolicy>().is_err());
    }

    #[test]
    fn it_names_every_known_method() {
        let names: Vec<&str> = Method::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), 13);
        assert!(names.contains(&"getUserProfilePhotos"));
        assert!(names.contains(&"setWebhook"));
        assert_eq!(Method::SendMessage.to_string(), "sendMessage");
    }
}
