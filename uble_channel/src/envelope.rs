//! Reply envelopes and the error type carried by them.
//!
//! A successful reply is the one-element list `[result]`; a failed one is
//! `[code, message, details]`.

use crate::messenger::BinaryMessenger;
use bytes::Bytes;
use std::future::Future;
use tracing::warn;
use uble_codec::{
    BLE_CODEC, BleValue, DecodeError, EncodeError, FromValue, IntoValue, Value,
};

pub const CHANNEL_ERROR_CODE: &str = "channel-error";
pub const NULL_ERROR_CODE: &str = "null-error";

/// An error reported across a channel.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{code}: {}", .message.as_deref().unwrap_or(""))]
pub struct FlutterError {
    pub code: String,
    pub message: Option<String>,
    pub details: BleValue,
}

impl FlutterError {
    pub fn new(code: impl Into<String>, message: Option<String>, details: BleValue) -> Self {
        Self {
            code: code.into(),
            message,
            details,
        }
    }

    /// Error for a call that failed on the handler side before reaching the
    /// API, e.g. a bad argument. The text goes into `code`.
    pub fn from_message(text: impl Into<String>) -> Self {
        Self::new(text, Some("Error".to_string()), Value::Null)
    }

    /// No handler is listening on `channel`, or it sent a malformed reply.
    pub fn channel_error(channel: &str) -> Self {
        Self::new(
            CHANNEL_ERROR_CODE,
            Some(format!(
                "Unable to establish connection on channel: '{channel}'."
            )),
            Value::String(String::new()),
        )
    }

    /// The host returned null for a call whose result is not nullable.
    pub fn null_error() -> Self {
        Self::new(
            NULL_ERROR_CODE,
            Some("Host platform returned null value for non-null return value.".to_string()),
            Value::Null,
        )
    }
}

impl From<DecodeError> for FlutterError {
    fn from(err: DecodeError) -> Self {
        Self::from_message(err.to_string())
    }
}

impl From<EncodeError> for FlutterError {
    fn from(err: EncodeError) -> Self {
        Self::from_message(err.to_string())
    }
}

pub fn wrap_result(value: BleValue) -> BleValue {
    Value::List(vec![value])
}

pub fn wrap_error(error: &FlutterError) -> BleValue {
    Value::List(vec![
        error.code.as_str().into_value(),
        error.message.clone().into_value(),
        error.details.clone(),
    ])
}

/// Unwraps a reply envelope received on `channel`.
///
/// A list of more than one element is an error; a one-element list is the
/// result; an empty list reads as a null result. Anything else is treated
/// as a broken channel. An error envelope whose code is not a string, or
/// whose message is neither a string nor null, fails to decode.
pub fn parse_reply(channel: &str, reply: BleValue) -> Result<BleValue, FlutterError> {
    let Value::List(items) = reply else {
        return Err(FlutterError::channel_error(channel));
    };
    let mut items = items.into_iter();
    match items.len() {
        0 => Ok(Value::Null),
        1 => Ok(items.next().unwrap_or_default()),
        _ => {
            let code = String::from_value(items.next().unwrap_or_default())?;
            let message = Option::<String>::from_value(items.next().unwrap_or_default())?;
            let details = items.next().unwrap_or_default();
            Err(FlutterError::new(code, message, details))
        }
    }
}

/// Positional arguments of an incoming call.
#[derive(Debug, Default)]
pub(crate) struct Arguments {
    items: Vec<BleValue>,
}

impl Arguments {
    /// Calls without arguments arrive as a null message.
    pub(crate) fn from_message(message: BleValue) -> Result<Self, FlutterError> {
        match message {
            Value::Null => Ok(Self::default()),
            Value::List(items) => Ok(Self { items }),
            other => Err(FlutterError::from_message(format!(
                "arguments must be a list, found {}",
                other.type_name()
            ))),
        }
    }

    fn take(&mut self, index: usize) -> BleValue {
        self.items
            .get_mut(index)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub(crate) fn required<T: FromValue>(
        &mut self,
        index: usize,
        name: &str,
    ) -> Result<T, FlutterError> {
        let value = self.take(index);
        if value.is_null() {
            return Err(FlutterError::from_message(format!(
                "{name}_arg unexpectedly null."
            )));
        }
        Ok(T::from_value(value)?)
    }

    pub(crate) fn optional<T: FromValue>(&mut self, index: usize) -> Result<Option<T>, FlutterError> {
        Ok(Option::<T>::from_value(self.take(index))?)
    }
}

/// Decodes an incoming call, runs it and encodes the reply envelope.
pub(crate) async fn respond<F, Fut>(channel: &str, message: Bytes, call: F) -> Bytes
where
    F: FnOnce(Arguments) -> Fut,
    Fut: Future<Output = Result<BleValue, FlutterError>>,
{
    let arguments = BLE_CODEC
        .decode_message(message)
        .map_err(FlutterError::from)
        .and_then(Arguments::from_message);
    let result = match arguments {
        Ok(arguments) => call(arguments).await,
        Err(err) => Err(err),
    };
    let reply = match result {
        Ok(value) => wrap_result(value),
        Err(err) => {
            warn!("{channel}: call failed: {err}");
            wrap_error(&err)
        }
    };

    match BLE_CODEC.encode_message(&reply) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("{channel}: failed to encode reply: {err}");
            BLE_CODEC
                .encode_message(&wrap_error(&err.into()))
                .unwrap_or_default()
        }
    }
}

/// Sends a call on `channel` and unwraps the reply envelope.
pub(crate) async fn send_call(
    messenger: &dyn BinaryMessenger,
    channel: &str,
    arguments: BleValue,
) -> Result<BleValue, FlutterError> {
    let message = BLE_CODEC.encode_message(&arguments)?;
    let Some(reply) = messenger.send(channel, message).await else {
        warn!("{channel}: no reply");
        return Err(FlutterError::channel_error(channel));
    };
    let reply = BLE_CODEC.decode_message(reply)?;
    parse_reply(channel, reply)
}
