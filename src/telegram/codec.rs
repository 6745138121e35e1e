//! Conversions between response bodies and the typed model.
//!
//! The client decodes each endpoint straight into its expected shape with
//! [`decode_response`]. [`decode`] is the shape-sniffing fallback for bodies
//! whose origin is unknown: every JSON object is classified by the keys it
//! carries (`ok` counts as an envelope key, so rejections without a
//! `result` still decode).

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{Message, Result, TelegramError, Update, User};

/// A decoded object whose type was picked from its keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    User(User),
    Update(Box<Update>),
    Message(Box<Message>),
    Response(Box<Envelope>),
}

/// A response envelope whose result shape was not known in advance.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub ok: bool,
    pub result: ResultValue,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Many(Vec<Object>),
    One(Object),
    Flag(bool),
}

impl Default for ResultValue {
    fn default() -> Self {
        ResultValue::Many(Vec::new())
    }
}

/// Decodes a body into the envelope of a known endpoint.
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<super::Response<T>> {
    Ok(serde_json::from_str(body)?)
}

/// Decodes a body without knowing which endpoint produced it.
pub fn decode(body: &str) -> Result<Object> {
    let value: Value = serde_json::from_str(body)?;
    decode_value(value)
}

pub fn decode_value(value: Value) -> Result<Object> {
    match value {
        Value::Object(map) => decode_object(map),
        other => Err(TelegramError::ShapeError(format!(
            "expected an object, got {}",
            kind_of(&other)
        ))),
    }
}

fn decode_object(map: Map<String, Value>) -> Result<Object> {
    if map.contains_key("first_name") {
        let user = serde_json::from_value(Value::Object(map))?;
        Ok(Object::User(user))
    } else if map.contains_key("update_id") {
        let update = serde_json::from_value(Value::Object(map))?;
        Ok(Object::Update(Box::new(update)))
    } else if map.contains_key("result") || map.contains_key("ok") {
        decode_envelope(map).map(|envelope| Object::Response(Box::new(envelope)))
    } else {
        let message = serde_json::from_value(Value::Object(map))?;
        Ok(Object::Message(Box::new(message)))
    }
}

fn decode_envelope(mut map: Map<String, Value>) -> Result<Envelope> {
    let ok = match map.remove("ok") {
        Some(Value::Bool(ok)) => ok,
        Some(other) => {
            return Err(TelegramError::ShapeError(format!(
                "expected a boolean `ok`, got {}",
                kind_of(&other)
            )))
        }
        None => return Err(TelegramError::ShapeError("missing `ok`".to_string())),
    };

    let result = match map.remove("result") {
        None | Some(Value::Null) => ResultValue::default(),
        Some(Value::Array(items)) => ResultValue::Many(
            items
                .into_iter()
                .map(decode_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Some(Value::Bool(flag)) => ResultValue::Flag(flag),
        Some(value @ Value::Object(_)) => ResultValue::One(decode_value(value)?),
        Some(other) => {
            return Err(TelegramError::ShapeError(format!(
                "unsupported result of kind {}",
                kind_of(&other)
            )))
        }
    };

    let description = match map.remove("description") {
        Some(value) => serde_json::from_value(value)?,
        None => None,
    };
    let error_code = match map.remove("error_code") {
        Some(value) => serde_json::from_value(value)?,
        None => None,
    };

    Ok(Envelope {
        ok,
        result,
        description,
        error_code,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Wire JSON for any model value. Absent optional fields are left out.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::{Chat, GetUpdatesResponse};

    const UPDATES_BODY: &str = r#"{
        "ok": true,
        "result": [{
            "update_id": 5,
            "message": {
                "message_id": 1,
                "from": {"id": 10, "first_name": "Ada"},
                "date": 1441645532,
                "chat": {"id": 10, "first_name": "Ada"},
                "text": "Hello"
            }
        }]
    }"#;

    #[test]
    fn it_round_trips_a_user() {
        let user = User {
            id: 1,
            first_name: "A".to_string(),
            last_name: None,
            username: None,
        };

        let json = encode(&user).unwrap();
        assert_eq!(json, r#"{"id":1,"first_name":"A"}"#);

        match decode(&json).unwrap() {
            Object::User(decoded) => {
                assert_eq!(decoded, user);
                assert!(decoded.last_name.is_none());
                assert!(decoded.username.is_none());
            }
            other => panic!("expected a user, got {other:?}"),
        }
    }

    #[test]
    fn it_classifies_a_full_updates_response() {
        let envelope = match decode(UPDATES_BODY).unwrap() {
            Object::Response(envelope) => envelope,
            other => panic!("expected a response, got {other:?}"),
        };
        assert!(envelope.ok);

        let items = match envelope.result {
            ResultValue::Many(items) => items,
            other => panic!("expected a sequence, got {other:?}"),
        };
        assert_eq!(items.len(), 1);

        match &items[0] {
            Object::Update(update) => {
                assert_eq!(update.update_id, 5);
                let message = update.message.as_ref().unwrap();
                assert_eq!(message.sender.first_name, "Ada");
                assert!(matches!(message.chat, Chat::User(_)));
            }
            other => panic!("expected an update, got {other:?}"),
        }
    }

    #[test]
    fn it_falls_back_to_a_message() {
        let body = r#"{
            "message_id": 9,
            "from": {"id": 1, "first_name": "Bot"},
            "date": 0,
            "chat": {"id": -5, "title": "Penguins"},
            "new_chat_title": "Penguins"
        }"#;

        match decode(body).unwrap() {
            Object::Message(message) => {
                assert_eq!(message.message_id, 9);
                assert_eq!(message.chat.id(), -5);
                assert_eq!(message.new_chat_title.as_deref(), Some("Penguins"));
            }
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[test]
    fn it_keeps_an_empty_result_apart_from_a_failure() {
        match decode(r#"{"ok": true, "result": []}"#).unwrap() {
            Object::Response(envelope) => assert_eq!(envelope.result, ResultValue::Many(vec![])),
            other => panic!("expected a response, got {other:?}"),
        }

        let malformed = decode(r#"{"ok": true, "result": ["#).unwrap_err();
        assert!(malformed.is_decode());
        assert!(matches!(malformed, TelegramError::JsonError(_)));
    }

    #[test]
    fn it_rejects_unrecognized_shapes() {
        assert!(matches!(decode("42"), Err(TelegramError::ShapeError(_))));
        assert!(matches!(
            decode(r#"{"ok": true, "result": "yes"}"#),
            Err(TelegramError::ShapeError(_))
        ));
        // neither a user, an update nor a response, and no sender either
        assert!(matches!(
            decode(r#"{"id": 3, "title": "group"}"#),
            Err(TelegramError::JsonError(_))
        ));
    }

    #[test]
    fn it_decodes_a_rejection_without_a_result() {
        match decode(r#"{"ok": false, "error_code": 409, "description": "Conflict"}"#).unwrap() {
            Object::Response(envelope) => {
                assert!(!envelope.ok);
                assert_eq!(envelope.error_code, Some(409));
                assert_eq!(envelope.result, ResultValue::default());
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn it_keeps_boolean_results() {
        match decode(r#"{"ok": true, "result": true, "description": "Webhook was set"}"#).unwrap() {
            Object::Response(envelope) => {
                assert_eq!(envelope.result, ResultValue::Flag(true));
                assert_eq!(envelope.description.as_deref(), Some("Webhook was set"));
            }
            other => panic!("expected a response, got {other:?}"),
        }
    }

    #[test]
    fn it_decodes_a_known_endpoint_directly() {
        let response: GetUpdatesResponse = decode_response(UPDATES_BODY).unwrap();
        let updates = response.result_or_default().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 5);
    }
}
