//! Handler results and self-describing payloads

use serde::Serialize;
use serde_json::{Map, Value};

/// Payload key a controller may set to force or skip the envelope
pub const USE_ENVELOPE_KEY: &str = "_useEnvelope";

/// Per-instance override of the global null policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataClassConfig {
    /// `None` falls back to the global `suppress_nulls` setting
    pub suppress_nulls: Option<bool>,
}

impl DataClassConfig {
    pub const fn suppressing(suppress_nulls: bool) -> Self {
        Self {
            suppress_nulls: Some(suppress_nulls),
        }
    }
}

/// A result type that describes its own serialisable fields
pub trait DataClass {
    /// Public fields in declaration order; configuration is never included
    fn to_fields(&self) -> Map<String, Value>;

    fn data_config(&self) -> DataClassConfig {
        DataClassConfig::default()
    }

    /// Fields with nulls removed when the effective policy suppresses them.
    ///
    /// Takes `&self`, so exposing twice yields the same mapping.
    fn expose(&self, global_suppress_nulls: bool) -> Map<String, Value> {
        let suppress = self
            .data_config()
            .suppress_nulls
            .unwrap_or(global_suppress_nulls);
        let fields = self.to_fields();
        if !suppress {
            return fields;
        }
        fields.into_iter().filter(|(_, v)| !v.is_null()).collect()
    }
}

/// Adapts any serde-serialisable struct to `DataClass`
#[derive(Debug, Clone)]
pub struct SerdeData {
    fields: Map<String, Value>,
    config: DataClassConfig,
}

impl SerdeData {
    /// Serialise `value`, which must serialise to a JSON object
    pub fn new<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(Self {
                fields,
                config: DataClassConfig::default(),
            }),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "data class must serialize to an object, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DataClassConfig) -> Self {
        self.config = config;
        self
    }
}

impl DataClass for SerdeData {
    fn to_fields(&self) -> Map<String, Value> {
        self.fields.clone()
    }

    fn data_config(&self) -> DataClassConfig {
        self.config
    }
}

/// Structured handler output
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    data: Value,
    use_envelope: Option<bool>,
}

impl Payload {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        let mut fields = fields;
        let use_envelope = match fields.get(USE_ENVELOPE_KEY) {
            Some(Value::Bool(flag)) => {
                let flag = *flag;
                fields.shift_remove(USE_ENVELOPE_KEY);
                Some(flag)
            }
            _ => None,
        };
        Self {
            data: Value::Object(fields),
            use_envelope,
        }
    }

    pub const fn from_list(items: Vec<Value>) -> Self {
        Self {
            data: Value::Array(items),
            use_envelope: None,
        }
    }

    /// Force (`true`) or skip (`false`) the envelope
    #[must_use]
    pub fn with_envelope(mut self, use_envelope: bool) -> Self {
        self.use_envelope = Some(use_envelope);
        self
    }

    pub const fn use_envelope(&self) -> Option<bool> {
        self.use_envelope
    }

    pub const fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

/// What a controller operation hands back
pub enum HandlerResult {
    /// Already in wire form, sent verbatim
    Raw(String),
    Payload(Payload),
    Data(Box<dyn DataClass + Send>),
}

impl HandlerResult {
    pub fn raw(body: impl Into<String>) -> Self {
        Self::Raw(body.into())
    }

    pub fn data(value: impl DataClass + Send + 'static) -> Self {
        Self::Data(Box::new(value))
    }

    /// Build from a JSON value: objects and arrays become payloads,
    /// strings and other scalars pass through raw.
    pub fn json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::Payload(Payload::from_map(fields)),
            Value::Array(items) => Self::Payload(Payload::from_list(items)),
            Value::String(s) => Self::Raw(s),
            other => Self::Raw(other.to_string()),
        }
    }
}

impl std::fmt::Debug for HandlerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(body) => f.debug_tuple("Raw").field(body).finish(),
            Self::Payload(payload) => f.debug_tuple("Payload").field(payload).finish(),
            Self::Data(data) => f.debug_tuple("Data").field(&data.to_fields()).finish(),
        }
    }
}

impl From<Payload> for HandlerResult {
    fn from(payload: Payload) -> Self {
        Self::Payload(payload)
    }
}

impl From<String> for HandlerResult {
    fn from(body: String) -> Self {
        Self::Raw(body)
    }
}

impl From<&str> for HandlerResult {
    fn from(body: &str) -> Self {
        Self::Raw(body.to_string())
    }
}
