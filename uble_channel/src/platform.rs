//! The platform channel: calls from the UI into the native BLE stack.

use crate::config::ChannelConfig;
use crate::enums::{AvailabilityState, BleConnectionState, BleInputProperty, BleOutputProperty};
use crate::envelope::{Arguments, FlutterError, respond, send_call};
use crate::messenger::{BinaryMessenger, message_handler};
use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt, sync::Arc};
use tracing::debug;
use uble_codec::{BleValue, FromValue, IntoValue, ScanFilter, ScanResult, Service, Value};

pub const PLATFORM_API_NAME: &str = "UniversalBlePlatformChannel";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformMethod {
    GetBluetoothAvailabilityState,
    EnableBluetooth,
    DisableBluetooth,
    StartScan,
    StopScan,
    Connect,
    Disconnect,
    SetNotifiable,
    DiscoverServices,
    ReadValue,
    RequestMtu,
    WriteValue,
    IsPaired,
    Pair,
    UnPair,
    GetSystemDevices,
    GetConnectionState,
}

impl PlatformMethod {
    pub const ALL: [PlatformMethod; 17] = [
        PlatformMethod::GetBluetoothAvailabilityState,
        PlatformMethod::EnableBluetooth,
        PlatformMethod::DisableBluetooth,
        PlatformMethod::StartScan,
        PlatformMethod::StopScan,
        PlatformMethod::Connect,
        PlatformMethod::Disconnect,
        PlatformMethod::SetNotifiable,
        PlatformMethod::DiscoverServices,
        PlatformMethod::ReadValue,
        PlatformMethod::RequestMtu,
        PlatformMethod::WriteValue,
        PlatformMethod::IsPaired,
        PlatformMethod::Pair,
        PlatformMethod::UnPair,
        PlatformMethod::GetSystemDevices,
        PlatformMethod::GetConnectionState,
    ];

    /// Method name as used in the channel name.
    pub fn name(self) -> &'static str {
        match self {
            PlatformMethod::GetBluetoothAvailabilityState => "getBluetoothAvailabilityState",
            PlatformMethod::EnableBluetooth => "enableBluetooth",
            PlatformMethod::DisableBluetooth => "disableBluetooth",
            PlatformMethod::StartScan => "startScan",
            PlatformMethod::StopScan => "stopScan",
            PlatformMethod::Connect => "connect",
            PlatformMethod::Disconnect => "disconnect",
            PlatformMethod::SetNotifiable => "setNotifiable",
            PlatformMethod::DiscoverServices => "discoverServices",
            PlatformMethod::ReadValue => "readValue",
            PlatformMethod::RequestMtu => "requestMtu",
            PlatformMethod::WriteValue => "writeValue",
            PlatformMethod::IsPaired => "isPaired",
            PlatformMethod::Pair => "pair",
            PlatformMethod::UnPair => "unPair",
            PlatformMethod::GetSystemDevices => "getSystemDevices",
            PlatformMethod::GetConnectionState => "getConnectionState",
        }
    }

    pub fn channel_name(self, config: &ChannelConfig) -> String {
        config.channel_name(PLATFORM_API_NAME, self.name())
    }
}

/// Native side of the platform channel.
///
/// Arguments arrive decoded and null-checked; an `Err` is sent back to the
/// caller as an error envelope.
#[async_trait]
pub trait BlePlatformApi: Send + Sync {
    async fn get_bluetooth_availability_state(&self) -> Result<AvailabilityState, FlutterError>;
    async fn enable_bluetooth(&self) -> Result<bool, FlutterError>;
    async fn disable_bluetooth(&self) -> Result<bool, FlutterError>;
    /// Starts scanning; `None` scans without filtering.
    async fn start_scan(&self, filter: Option<ScanFilter>) -> Result<(), FlutterError>;
    async fn stop_scan(&self) -> Result<(), FlutterError>;
    async fn connect(&self, device_id: String) -> Result<(), FlutterError>;
    async fn disconnect(&self, device_id: String) -> Result<(), FlutterError>;
    async fn set_notifiable(
        &self,
        device_id: String,
        service: String,
        characteristic: String,
        ble_input_property: BleInputProperty,
    ) -> Result<(), FlutterError>;
    async fn discover_services(&self, device_id: String) -> Result<Vec<Service>, FlutterError>;
    async fn read_value(
        &self,
        device_id: String,
        service: String,
        characteristic: String,
    ) -> Result<Bytes, FlutterError>;
    /// Returns the MTU actually negotiated.
    async fn request_mtu(&self, device_id: String, expected_mtu: i64) -> Result<i64, FlutterError>;
    async fn write_value(
        &self,
        device_id: String,
        service: String,
        characteristic: String,
        value: Bytes,
        ble_output_property: BleOutputProperty,
    ) -> Result<(), FlutterError>;
    async fn is_paired(&self, device_id: String) -> Result<bool, FlutterError>;
    async fn pair(&self, device_id: String) -> Result<bool, FlutterError>;
    async fn un_pair(&self, device_id: String) -> Result<(), FlutterError>;
    /// Devices already connected to the system that expose any of
    /// `with_services`.
    async fn get_system_devices(
        &self,
        with_services: Vec<String>,
    ) -> Result<Vec<ScanResult>, FlutterError>;
    async fn get_connection_state(
        &self,
        device_id: String,
    ) -> Result<BleConnectionState, FlutterError>;
}

async fn dispatch(
    api: &dyn BlePlatformApi,
    method: PlatformMethod,
    mut args: Arguments,
) -> Result<BleValue, FlutterError> {
    let value = match method {
        PlatformMethod::GetBluetoothAvailabilityState => {
            api.get_bluetooth_availability_state().await?.into_value()
        }
        PlatformMethod::EnableBluetooth => api.enable_bluetooth().await?.into_value(),
        PlatformMethod::DisableBluetooth => api.disable_bluetooth().await?.into_value(),
        PlatformMethod::StartScan => {
            api.start_scan(args.optional(0)?).await?;
            Value::Null
        }
        PlatformMethod::StopScan => {
            api.stop_scan().await?;
            Value::Null
        }
        PlatformMethod::Connect => {
            api.connect(args.required(0, "device_id")?).await?;
            Value::Null
        }
        PlatformMethod::Disconnect => {
            api.disconnect(args.required(0, "device_id")?).await?;
            Value::Null
        }
        PlatformMethod::SetNotifiable => {
            api.set_notifiable(
                args.required(0, "device_id")?,
                args.required(1, "service")?,
                args.required(2, "characteristic")?,
                args.required(3, "ble_input_property")?,
            )
            .await?;
            Value::Null
        }
        PlatformMethod::DiscoverServices => api
            .discover_services(args.required(0, "device_id")?)
            .await?
            .into_value(),
        PlatformMethod::ReadValue => api
            .read_value(
                args.required(0, "device_id")?,
                args.required(1, "service")?,
                args.required(2, "characteristic")?,
            )
            .await?
            .into_value(),
        PlatformMethod::RequestMtu => api
            .request_mtu(
                args.required(0, "device_id")?,
                args.required(1, "expected_mtu")?,
            )
            .await?
            .into_value(),
        PlatformMethod::WriteValue => {
            api.write_value(
                args.required(0, "device_id")?,
                args.required(1, "service")?,
                args.required(2, "characteristic")?,
                args.required(3, "value")?,
                args.required(4, "ble_output_property")?,
            )
            .await?;
            Value::Null
        }
        PlatformMethod::IsPaired => api
            .is_paired(args.required(0, "device_id")?)
            .await?
            .into_value(),
        PlatformMethod::Pair => api.pair(args.required(0, "device_id")?).await?.into_value(),
        PlatformMethod::UnPair => {
            api.un_pair(args.required(0, "device_id")?).await?;
            Value::Null
        }
        PlatformMethod::GetSystemDevices => api
            .get_system_devices(args.required(0, "with_services")?)
            .await?
            .into_value(),
        PlatformMethod::GetConnectionState => api
            .get_connection_state(args.required(0, "device_id")?)
            .await?
            .into_value(),
    };
    Ok(value)
}

/// Registers `api` on every platform channel of `messenger`.
///
/// Passing `None` removes the handlers.
pub fn set_up_platform_api(
    messenger: &dyn BinaryMessenger,
    api: Option<Arc<dyn BlePlatformApi>>,
    config: &ChannelConfig,
) {
    for method in PlatformMethod::ALL {
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

/// UI side of the platform channel.
#[derive(Clone)]
pub struct BlePlatformClient {
    messenger: Arc<dyn BinaryMessenger>,
    config: ChannelConfig,
}

impl fmt::Debug for BlePlatformClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlePlatformClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BlePlatformClient {
    pub fn new(messenger: Arc<dyn BinaryMessenger>, config: ChannelConfig) -> Self {
        Self { messenger, config }
    }

    async fn call(
        &self,
        method: PlatformMethod,
        args: Vec<BleValue>,
    ) -> Result<BleValue, FlutterError> {
        let channel = method.channel_name(&self.config);
        let message = if args.is_empty() {
            Value::Null
        } else {
            Value::List(args)
        };
        send_call(self.messenger.as_ref(), &channel, message).await
    }

    /// A call whose result must not be null.
    async fn call_for<T: FromValue>(
        &self,
        method: PlatformMethod,
        args: Vec<BleValue>,
    ) -> Result<T, FlutterError> {
        let value = self.call(method, args).await?;
        if value.is_null() {
            return Err(FlutterError::null_error());
        }
        Ok(T::from_value(value)?)
    }

    async fn call_void(
        &self,
        method: PlatformMethod,
        args: Vec<BleValue>,
    ) -> Result<(), FlutterError> {
        self.call(method, args).await.map(|_| ())
    }

    pub async fn get_bluetooth_availability_state(
        &self,
    ) -> Result<AvailabilityState, FlutterError> {
        self.call_for(PlatformMethod::GetBluetoothAvailabilityState, vec![])
            .await
    }

    pub async fn enable_bluetooth(&self) -> Result<bool, FlutterError> {
        self.call_for(PlatformMethod::EnableBluetooth, vec![]).await
    }

    pub async fn disable_bluetooth(&self) -> Result<bool, FlutterError> {
        self.call_for(PlatformMethod::DisableBluetooth, vec![]).await
    }

    pub async fn start_scan(&self, filter: Option<ScanFilter>) -> Result<(), FlutterError> {
        self.call_void(PlatformMethod::StartScan, vec![filter.into_value()])
            .await
    }

    pub async fn stop_scan(&self) -> Result<(), FlutterError> {
        self.call_void(PlatformMethod::StopScan, vec![]).await
    }

    pub async fn connect(&self, device_id: &str) -> Result<(), FlutterError> {
        self.call_void(PlatformMethod::Connect, vec![device_id.into_value()])
            .await
    }

    pub async fn disconnect(&self, device_id: &str) -> Result<(), FlutterError> {
        self.call_void(PlatformMethod::Disconnect, vec![device_id.into_value()])
            .await
    }

    pub async fn set_notifiable(
        &self,
        device_id: &str,
        service: &str,
        characteristic: &str,
        ble_input_property: BleInputProperty,
    ) -> Result<(), FlutterError> {
        self.call_void(
            PlatformMethod::SetNotifiable,
            vec![
                device_id.into_value(),
                service.into_value(),
                characteristic.into_value(),
                ble_input_property.into_value(),
            ],
        )
        .await
    }

    pub async fn discover_services(&self, device_id: &str) -> Result<Vec<Service>, FlutterError> {
        self.call_for(PlatformMethod::DiscoverServices, vec![device_id.into_value()])
            .await
    }

    pub async fn read_value(
        &self,
        device_id: &str,
        service: &str,
        characteristic: &str,
    ) -> Result<Bytes, FlutterError> {
        self.call_for(
            PlatformMethod::ReadValue,
            vec![
                device_id.into_value(),
                service.into_value(),
                characteristic.into_value(),
            ],
        )
        .await
    }

    pub async fn request_mtu(&self, device_id: &str, expected_mtu: i64) -> Result<i64, FlutterError> {
        self.call_for(
            PlatformMethod::RequestMtu,
            vec![device_id.into_value(), expected_mtu.into_value()],
        )
        .await
    }

    pub async fn write_value(
        &self,
        device_id: &str,
        service: &str,
        characteristic: &str,
        value: Bytes,
        ble_output_property: BleOutputProperty,
    ) -> Result<(), FlutterError> {
        self.call_void(
            PlatformMethod::WriteValue,
            vec![
                device_id.into_value(),
                service.into_value(),
                characteristic.into_value(),
                value.into_value(),
                ble_output_property.into_value(),
            ],
        )
        .await
    }

    pub async fn is_paired(&self, device_id: &str) -> Result<bool, FlutterError> {
        self.call_for(PlatformMethod::IsPaired, vec![device_id.into_value()])
            .await
    }

    pub async fn pair(&self, device_id: &str) -> Result<bool, FlutterError> {
        self.call_for(PlatformMethod::Pair, vec![device_id.into_value()])
            .await
    }

    pub async fn un_pair(&self, device_id: &str) -> Result<(), FlutterError> {
        self.call_void(PlatformMethod::UnPair, vec![device_id.into_value()])
            .await
    }

    pub async fn get_system_devices(
        &self,
        with_services: Vec<String>,
    ) -> Result<Vec<ScanResult>, FlutterError> {
        self.call_for(
            PlatformMethod::GetSystemDevices,
            vec![with_services.into_value()],
        )
        .await
    }

    pub async fn get_connection_state(
        &self,
        device_id: &str,
    ) -> Result<BleConnectionState, FlutterError> {
        self.call_for(
            PlatformMethod::GetConnectionState,
            vec![device_id.into_value()],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_method_names_unique() {
        let names: HashSet<&str> = PlatformMethod::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), PlatformMethod::ALL.len());
    }

    #[test]
    fn test_method_channel_name() {
        assert_eq!(
            PlatformMethod::GetBluetoothAvailabilityState.channel_name(&ChannelConfig::default()),
            "dev.flutter.pigeon.universal_ble.UniversalBlePlatformChannel.getBluetoothAvailabilityState"
        );
        assert_eq!(
            PlatformMethod::UnPair.channel_name(&ChannelConfig::with_suffix("2")),
            "dev.flutter.pigeon.universal_ble.UniversalBlePlatformChannel.unPair.2"
        );
    }
}
