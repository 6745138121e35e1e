use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub mod client;
pub mod codec;
pub mod dispatcher;

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("http error ({status}): {body}")]
    StatusError { status: u16, body: String },

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("unrecognized object: {0}")]
    ShapeError(String),

    #[error("telegram api error ({error_code:?}): {description}")]
    ApiError {
        error_code: Option<i64>,
        description: String,
    },

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("handler error: {0}")]
    HandlerError(String),
}

impl TelegramError {
    /// True for failures to turn a response body into typed objects.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::JsonError(_) | Self::ShapeError(_))
    }
}

pub type Result<T> = std::result::Result<T, TelegramError>;

/// Query and form payloads for the API methods. Serialized with
/// `serde_urlencoded` through reqwest, so `None` fields are left out.
#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum TelegramRequest {
    Updates {
        offset: i64,
        limit: u32,
        timeout: u32,
    },
    SendMessage {
        chat_id: ChatId,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        disable_web_page_preview: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to_message_id: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_markup: Option<String>,
    },
    ForwardMessage {
        chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: i64,
    },
    SendLocation {
        chat_id: ChatId,
        latitude: f64,
        longitude: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reply_to_message_id: Option<i64>,
    },
    SendChatAction {
        chat_id: ChatId,
        action: ChatAction,
    },
    UserProfilePhotos {
        user_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
}

/// Recipient of an outgoing request: a numeric chat id or an `@username`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl ChatId {
    pub fn is_empty(&self) -> bool {
        match self {
            ChatId::Id(_) => false,
            ChatId::Username(name) => name.is_empty(),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

impl From<&str> for ChatId {
    fn from(name: &str) -> Self {
        ChatId::Username(name.to_string())
    }
}

impl From<String> for ChatId {
    fn from(name: String) -> Self {
        ChatId::Username(name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Typing,
    UploadPhoto,
    RecordVideo,
    UploadVideo,
    RecordAudio,
    UploadAudio,
    UploadDocument,
    FindLocation,
}

/// Envelope of every API reply.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Response<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
}

impl<T> Response<T> {
    /// Turns an `ok: false` envelope into [`TelegramError::ApiError`].
    pub fn into_result(self) -> Result<Option<T>> {
        if !self.ok {
            return Err(TelegramError::ApiError {
                error_code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(self.result)
    }
}

impl<T: Default> Response<T> {
    /// The result, or `T::default()` (an empty sequence for batches) when the
    /// server left it out.
    pub fn result_or_default(self) -> Result<T> {
        Ok(self.into_result()?.unwrap_or_default())
    }
}

/// A Telegram user or bot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupChat {
    pub id: i64,
    pub title: String,
}

/// Conversation a message belongs to: the other user for private chats, a
/// group otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Chat {
    User(User),
    Group(GroupChat),
}

impl Chat {
    pub fn id(&self) -> i64 {
        match self {
            Chat::User(user) => user.id,
            Chat::Group(group) => group.id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub message_id: i64,
    #[serde(rename = "from")]
    pub sender: User,
    pub date: i64,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_date: Option<i64>,
    /// Never carries a further nested reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Sticker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chat_participant: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_chat_participant: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chat_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chat_photo: Option<Vec<PhotoSize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_chat_photo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_chat_created: Option<bool>,
}

impl Message {
    /// `date` as a UTC timestamp, `None` if it is out of chrono's range.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.date, 0).single()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// One size of a photo, or a file/sticker thumbnail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Audio {
    pub file_id: String,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<PhotoSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Sticker {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<PhotoSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Video {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<PhotoSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Contact {
    pub phone_number: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfilePhotos {
    pub total_count: i64,
    /// Up to four sizes for each profile picture.
    pub photos: Vec<Vec<PhotoSize>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<String>>,
    #[serde(default)]
    pub resize_keyboard: bool,
    #[serde(default)]
    pub one_time_keyboard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selective: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReplyKeyboardHide {
    pub hide_keyboard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selective: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ForceReply {
    pub force_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selective: Option<bool>,
}

/// Extra interface options attached to an outgoing message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    HideKeyboard(ReplyKeyboardHide),
    ForceReply(ForceReply),
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(markup: ReplyKeyboardMarkup) -> Self {
        ReplyMarkup::Keyboard(markup)
    }
}

impl From<ReplyKeyboardHide> for ReplyMarkup {
    fn from(hide: ReplyKeyboardHide) -> Self {
        ReplyMarkup::HideKeyboard(hide)
    }
}

impl From<ForceReply> for ReplyMarkup {
    fn from(force: ForceReply) -> Self {
        ReplyMarkup::ForceReply(force)
    }
}

pub type GetUpdatesResponse = Response<Vec<Update>>;
pub type GetMeResponse = Response<User>;
