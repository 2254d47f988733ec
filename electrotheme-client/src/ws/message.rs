//! Control channel message types and codec.
//!
//! Every frame is a single JSON object with a `type` discriminator:
//!
//! ```text
//! {"type": "Hello", "exe": "app.exe"}                 client -> coordinator
//! {"type": "StylesUpdate", "css": "body{color:red}"}  coordinator -> client
//! ```
//!
//! The coordinator speaks numeric codes (`0` = Hello, `1` = StylesUpdate), so
//! the decoder accepts both spellings.

use electrotheme_core::error::ProtocolError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

/// Closed set of message types this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Client handshake carrying the executable identity.
    Hello,
    /// Coordinator push carrying the current stylesheet.
    StylesUpdate,
}

impl MessageType {
    /// Returns the wire name of this type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hello => "Hello",
            Self::StylesUpdate => "StylesUpdate",
        }
    }

    /// Returns the numeric wire code of this type.
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Hello => 0,
            Self::StylesUpdate => 1,
        }
    }

    /// Looks a type up by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Hello" => Some(Self::Hello),
            "StylesUpdate" => Some(Self::StylesUpdate),
            _ => None,
        }
    }

    /// Looks a type up by numeric wire code.
    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Hello),
            1 => Some(Self::StylesUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded control channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Client handshake.
    Hello {
        /// Executable or identity string.
        exe: String,
    },
    /// New stylesheet from the coordinator.
    StylesUpdate {
        /// The stylesheet text.
        css: String,
    },
    /// A well-formed frame whose type this client does not know.
    Unknown {
        /// The type value as it appeared on the wire.
        kind: String,
    },
}

impl Message {
    /// Creates a Hello message.
    #[must_use]
    pub fn hello(exe: impl Into<String>) -> Self {
        Self::Hello { exe: exe.into() }
    }

    /// Creates a StylesUpdate message.
    #[must_use]
    pub fn styles_update(css: impl Into<String>) -> Self {
        Self::StylesUpdate { css: css.into() }
    }

    /// Returns the message type, or `None` for unknown messages.
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Self::Hello { .. } => Some(MessageType::Hello),
            Self::StylesUpdate { .. } => Some(MessageType::StylesUpdate),
            Self::Unknown { .. } => None,
        }
    }
}

/// How the `type` discriminator is written on outbound frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeEncoding {
    /// `"type": "Hello"`
    #[default]
    Name,
    /// `"type": 0`
    Code,
}

/// Message codec for the control channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec {
    encoding: TypeEncoding,
}

impl MessageCodec {
    /// Creates a codec that writes type names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec with the given outbound type encoding.
    #[must_use]
    pub fn with_encoding(encoding: TypeEncoding) -> Self {
        Self { encoding }
    }

    /// Returns the outbound type encoding.
    #[must_use]
    pub fn encoding(&self) -> TypeEncoding {
        self.encoding
    }

    /// Encodes `fields` merged with the `type` discriminator into a JSON object.
    ///
    /// The discriminator always wins: a `type` key inside `fields` is
    /// replaced by `kind`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Encode` if `fields` does not serialize to a
    /// JSON object.
    pub fn encode<T: Serialize>(&self, kind: MessageType, fields: &T) -> Result<String, ProtocolError> {
        let mut object = match serde_json::to_value(fields).map_err(|e| ProtocolError::Encode {
            reason: e.to_string(),
        })? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProtocolError::Encode {
                    reason: format!("message fields must be an object, got {}", json_kind(&other)),
                });
            }
        };
        if let Some(shadowed) = object.insert("type".to_string(), self.type_value(kind)) {
            debug!(%shadowed, "Replaced caller-supplied type field");
        }

        serde_json::to_string(&object).map_err(|e| ProtocolError::Encode {
            reason: e.to_string(),
        })
    }

    /// Encodes a typed message.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Encode` for `Message::Unknown`, which has no
    /// wire representation.
    pub fn encode_message(&self, message: &Message) -> Result<String, ProtocolError> {
        match message {
            Message::Hello { exe } => {
                self.encode(MessageType::Hello, &serde_json::json!({ "exe": exe }))
            }
            Message::StylesUpdate { css } => {
                self.encode(MessageType::StylesUpdate, &serde_json::json!({ "css": css }))
            }
            Message::Unknown { kind } => Err(ProtocolError::Encode {
                reason: format!("cannot encode message of unknown type '{kind}'"),
            }),
        }
    }

    /// Decodes one frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::MalformedMessage` if the frame is not UTF-8,
    /// not a JSON object, has no usable `type`, or a known type is missing a
    /// required field. Unknown types decode to `Message::Unknown`.
    pub fn decode(&self, bytes: &[u8]) -> Result<Message, ProtocolError> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ProtocolError::malformed(String::from_utf8_lossy(bytes), format!("invalid UTF-8: {e}"))
        })?;
        self.decode_str(text)
    }

    /// Decodes one frame that is already text.
    ///
    /// # Errors
    ///
    /// See [`MessageCodec::decode`].
    pub fn decode_str(&self, text: &str) -> Result<Message, ProtocolError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::malformed(text, e.to_string()))?;

        let Value::Object(mut object) = value else {
            return Err(ProtocolError::malformed(
                text,
                format!("frame must be a JSON object, got {}", json_kind(&value)),
            ));
        };

        let kind = object
            .remove("type")
            .ok_or_else(|| ProtocolError::malformed(text, "missing 'type' key"))?;

        let message_type = match &kind {
            Value::String(name) => MessageType::from_name(name),
            Value::Number(code) => code.as_u64().and_then(MessageType::from_code),
            other => {
                return Err(ProtocolError::malformed(
                    text,
                    format!("'type' must be a string or number, got {}", json_kind(other)),
                ));
            }
        };

        match message_type {
            Some(MessageType::Hello) => Ok(Message::Hello {
                exe: take_string(&mut object, "exe", text)?,
            }),
            Some(MessageType::StylesUpdate) => Ok(Message::StylesUpdate {
                css: take_string(&mut object, "css", text)?,
            }),
            None => Ok(Message::Unknown {
                kind: match kind {
                    Value::String(name) => name,
                    other => other.to_string(),
                },
            }),
        }
    }

    fn type_value(&self, kind: MessageType) -> Value {
        match self.encoding {
            TypeEncoding::Name => Value::String(kind.name().to_string()),
            TypeEncoding::Code => Value::from(kind.code()),
        }
    }
}

fn take_string(object: &mut Map<String, Value>, field: &str, raw: &str) -> Result<String, ProtocolError> {
    match object.remove(field) {
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(ProtocolError::malformed(
            raw,
            format!("field '{field}' must be a string, got {}", json_kind(&other)),
        )),
        None => Err(ProtocolError::malformed(raw, format!("missing field '{field}'"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
