//! The callback channel: events pushed from the native BLE stack to the UI.

use crate::config::ChannelConfig;
use crate::enums::AvailabilityState;
use crate::envelope::{Arguments, FlutterError, respond, send_call};
use crate::messenger::{BinaryMessenger, message_handler};
use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt, sync::Arc};
use tracing::debug;
use uble_codec::{BleValue, IntoValue, ScanResult, Value};

pub const CALLBACK_API_NAME: &str = "UniversalBleCallbackChannel";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackMethod {
    OnAvailabilityChanged,
    OnPairStateChange,
    OnScanResult,
    OnValueChanged,
    OnConnectionChanged,
}

impl CallbackMethod {
    pub const ALL: [CallbackMethod; 5] = [
        CallbackMethod::OnAvailabilityChanged,
        CallbackMethod::OnPairStateChange,
        CallbackMethod::OnScanResult,
        CallbackMethod::OnValueChanged,
        CallbackMethod::OnConnectionChanged,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CallbackMethod::OnAvailabilityChanged => "onAvailabilityChanged",
            CallbackMethod::OnPairStateChange => "onPairStateChange",
            CallbackMethod::OnScanResult => "onScanResult",
            CallbackMethod::OnValueChanged => "onValueChanged",
            CallbackMethod::OnConnectionChanged => "onConnectionChanged",
        }
    }

    pub fn channel_name(self, config: &ChannelConfig) -> String {
        config.channel_name(CALLBACK_API_NAME, self.name())
    }
}

/// Native side of the callback channel. Each event resolves once the UI
/// has acknowledged it.
#[derive(Clone)]
pub struct BleCallbackChannel {
    messenger: Arc<dyn BinaryMessenger>,
    config: ChannelConfig,
}

impl fmt::Debug for BleCallbackChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BleCallbackChannel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BleCallbackChannel {
    pub fn new(messenger: Arc<dyn BinaryMessenger>, config: ChannelConfig) -> Self {
        Self { messenger, config }
    }

    async fn send(&self, method: CallbackMethod, args: Vec<BleValue>) -> Result<(), FlutterError> {
        let channel = method.channel_name(&self.config);
        send_call(self.messenger.as_ref(), &channel, Value::List(args))
            .await
            .map(|_| ())
    }

    pub async fn on_availability_changed(
        &self,
        state: AvailabilityState,
    ) -> Result<(), FlutterError> {
        self.send(
            CallbackMethod::OnAvailabilityChanged,
            vec![state.into_value()],
        )
        .await
    }

    pub async fn on_pair_state_change(
        &self,
        device_id: &str,
        is_paired: bool,
        error: Option<&str>,
    ) -> Result<(), FlutterError> {
        self.send(
            CallbackMethod::OnPairStateChange,
            vec![
                device_id.into_value(),
                is_paired.into_value(),
                error.into_value(),
            ],
        )
        .await
    }

    pub async fn on_scan_result(&self, result: ScanResult) -> Result<(), FlutterError> {
        self.send(CallbackMethod::OnScanResult, vec![result.into_value()])
            .await
    }

    pub async fn on_value_changed(
        &self,
        device_id: &str,
        characteristic_id: &str,
        value: Bytes,
    ) -> Result<(), FlutterError> {
        self.send(
            CallbackMethod::OnValueChanged,
            vec![
                device_id.into_value(),
                characteristic_id.into_value(),
                value.into_value(),
            ],
        )
        .await
    }

    pub async fn on_connection_changed(
        &self,
        device_id: &str,
        connected: bool,
        error: Option<&str>,
    ) -> Result<(), FlutterError> {
        self.send(
            CallbackMethod::OnConnectionChanged,
            vec![
                device_id.into_value(),
                connected.into_value(),
                error.into_value(),
            ],
        )
        .await
    }
}

/// UI side of the callback channel.
#[async_trait]
pub trait BleCallbackApi: Send + Sync {
    async fn on_availability_changed(&self, state: AvailabilityState) -> Result<(), FlutterError>;
    async fn on_pair_state_change(
        &self,
        device_id: String,
        is_paired: bool,
        error: Option<String>,
    ) -> Result<(), FlutterError>;
    async fn on_scan_result(&self, result: ScanResult) -> Result<(), FlutterError>;
    async fn on_value_changed(
        &self,
        device_id: String,
        characteristic_id: String,
        value: Bytes,
    ) -> Result<(), FlutterError>;
    async fn on_connection_changed(
        &self,
        device_id: String,
        connected: bool,
        error: Option<String>,
    ) -> Result<(), FlutterError>;
}

async fn dispatch(
    api: &dyn BleCallbackApi,
    method: CallbackMethod,
    mut args: Arguments,
) -> Result<BleValue, FlutterError> {
    match method {
        CallbackMethod::OnAvailabilityChanged => {
            api.on_availability_changed(args.required(0, "state")?)
                .await?
        }
        CallbackMethod::OnPairStateChange => {
            api.on_pair_state_change(
                args.required(0, "device_id")?,
                args.required(1, "is_paired")?,
                args.optional(2)?,
            )
            .await?
        }
        CallbackMethod::OnScanResult => api.on_scan_result(args.required(0, "result")?).await?,
        CallbackMethod::OnValueChanged => {
            api.on_value_changed(
                args.required(0, "device_id")?,
                args.required(1, "characteristic_id")?,
                args.required(2, "value")?,
            )
            .await?
        }
        CallbackMethod::OnConnectionChanged => {
            api.on_connection_changed(
                args.required(0, "device_id")?,
                args.required(1, "connected")?,
                args.optional(2)?,
            )
            .await?
        }
    }
    Ok(Value::Null)
}

/// Registers `api` on every callback channel of `messenger`.
///
/// Passing `None` removes the handlers.
pub fn set_up_callback_api(
    messenger: &dyn BinaryMessenger,
    api: Option<Arc<dyn BleCallbackApi>>,
    config: &ChannelConfig,
) {
    for method in CallbackMethod::ALL {
        let channel = method.channel_name(config);
        let handler = api.clone().map(|api| {
            let channel = channel.clone();
            message_handler(move |message| {
                let api = api.clone();
                let channel = channel.clone();
                async move {
                    respond(&channel, message, |args| dispatch(api.as_ref(), method, args)).await
                }
            })
        });
        debug!(
            "{channel}: {}",
            if handler.is_some() { "registered" } else { "removed" }
        );
        messenger.set_message_handler(&channel, handler);
    }
}
