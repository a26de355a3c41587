use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use uble_channel::{
    AvailabilityState, BinaryMessenger, BleCallbackApi, BleCallbackChannel, BleConnectionState,
    BleInputProperty, BleOutputProperty, BlePlatformApi, BlePlatformClient, CallbackMethod,
    ChannelConfig, FlutterError, MemoryMessenger, PlatformMethod, message_handler,
    set_up_callback_api, set_up_platform_api,
};
use uble_codec::{
    BLE_CODEC, BleValue, Characteristic, ManufacturerData, ManufacturerDataFilter, ScanFilter, ScanResult,
    Service, Value,
};

#[derive(Default)]
struct FakePlatform {
    calls: Mutex<Vec<String>>,
    filters: Mutex<Vec<Option<ScanFilter>>>,
    writes: Mutex<Vec<(String, Bytes, BleOutputProperty)>>,
}

impl FakePlatform {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn heart_rate_service() -> Service {
    Service::new(
        "180d",
        Some(vec![
            Characteristic::new("2a37", vec![4]),
            Characteristic::new("2a38", vec![1]),
        ]),
    )
}

#[async_trait]
impl BlePlatformApi for FakePlatform {
    async fn get_bluetooth_availability_state(&self) -> Result<AvailabilityState, FlutterError> {
        self.record("getBluetoothAvailabilityState");
        Ok(AvailabilityState::PoweredOn)
    }

    async fn enable_bluetooth(&self) -> Result<bool, FlutterError> {
        self.record("enableBluetooth");
        Ok(true)
    }

    async fn disable_bluetooth(&self) -> Result<bool, FlutterError> {
        self.record("disableBluetooth");
        Ok(false)
    }

    async fn start_scan(&self, filter: Option<ScanFilter>) -> Result<(), FlutterError> {
        self.record("startScan");
        self.filters.lock().unwrap().push(filter);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), FlutterError> {
        self.record("stopScan");
        Ok(())
    }

    async fn connect(&self, device_id: String) -> Result<(), FlutterError> {
        if device_id == "missing" {
            return Err(FlutterError::new(
                "not-found",
                Some("no such device".to_string()),
                Value::String(device_id),
            ));
        }
        self.record(format!("connect {device_id}"));
        Ok(())
    }

    async fn disconnect(&self, device_id: String) -> Result<(), FlutterError> {
        self.record(format!("disconnect {device_id}"));
        Ok(())
    }

    async fn set_notifiable(
        &self,
        device_id: String,
        service: String,
        characteristic: String,
        ble_input_property: BleInputProperty,
    ) -> Result<(), FlutterError> {
        self.record(format!(
            "setNotifiable {device_id} {service} {characteristic} {ble_input_property:?}"
        ));
        Ok(())
    }

    async fn discover_services(&self, device_id: String) -> Result<Vec<Service>, FlutterError> {
        self.record(format!("discoverServices {device_id}"));
        Ok(vec![heart_rate_service(), Service::new("180f", None)])
    }

    async fn read_value(
        &self,
        device_id: String,
        service: String,
        characteristic: String,
    ) -> Result<Bytes, FlutterError> {
        self.record(format!("readValue {device_id} {service} {characteristic}"));
        Ok(Bytes::from_static(&[0x06, 0x48]))
    }

    async fn request_mtu(&self, device_id: String, expected_mtu: i64) -> Result<i64, FlutterError> {
        self.record(format!("requestMtu {device_id} {expected_mtu}"));
        Ok(expected_mtu.min(185))
    }

    async fn write_value(
        &self,
        device_id: String,
        service: String,
        characteristic: String,
        value: Bytes,
        ble_output_property: BleOutputProperty,
    ) -> Result<(), FlutterError> {
        self.record(format!("writeValue {device_id} {service}"));
        self.writes
            .lock()
            .unwrap()
            .push((characteristic, value, ble_output_property));
        Ok(())
    }

    async fn is_paired(&self, device_id: String) -> Result<bool, FlutterError> {
        Ok(device_id == "paired")
    }

    async fn pair(&self, device_id: String) -> Result<bool, FlutterError> {
        self.record(format!("pair {device_id}"));
        Ok(true)
    }

    async fn un_pair(&self, device_id: String) -> Result<(), FlutterError> {
        self.record(format!("unPair {device_id}"));
        Ok(())
    }

    async fn get_system_devices(
        &self,
        with_services: Vec<String>,
    ) -> Result<Vec<ScanResult>, FlutterError> {
        Ok(with_services
            .into_iter()
            .map(|uuid| ScanResult {
                name: Some(format!("device for {uuid}")),
                services: Some(vec![Service::new(uuid.clone(), None)]),
                ..ScanResult::new(format!("id-{uuid}"))
            })
            .collect())
    }

    async fn get_connection_state(
        &self,
        device_id: String,
    ) -> Result<BleConnectionState, FlutterError> {
        Ok(if device_id == "up" {
            BleConnectionState::Connected
        } else {
            BleConnectionState::Disconnected
        })
    }
}

fn platform_pair(config: ChannelConfig) -> (Arc<MemoryMessenger>, Arc<FakePlatform>, BlePlatformClient) {
    let messenger = Arc::new(MemoryMessenger::new());
    let platform = Arc::new(FakePlatform::default());
    set_up_platform_api(messenger.as_ref(), Some(platform.clone()), &config);
    let client = BlePlatformClient::new(messenger.clone(), config);
    (messenger, platform, client)
}

#[tokio::test]
async fn test_platform_calls() {
    let (messenger, platform, client) = platform_pair(ChannelConfig::default());
    assert_eq!(messenger.channels().len(), PlatformMethod::ALL.len());

    assert_eq!(
        client.get_bluetooth_availability_state().await.unwrap(),
        AvailabilityState::PoweredOn
    );
    assert!(client.enable_bluetooth().await.unwrap());
    assert!(!client.disable_bluetooth().await.unwrap());
    client.connect("dev-1").await.unwrap();
    client
        .set_notifiable("dev-1", "180d", "2a37", BleInputProperty::Notification)
        .await
        .unwrap();
    client.stop_scan().await.unwrap();
    client.disconnect("dev-1").await.unwrap();
    assert!(client.pair("dev-1").await.unwrap());
    client.un_pair("dev-1").await.unwrap();

    assert_eq!(
        platform.calls(),
        vec![
            "getBluetoothAvailabilityState",
            "enableBluetooth",
            "disableBluetooth",
            "connect dev-1",
            "setNotifiable dev-1 180d 2a37 Notification",
            "stopScan",
            "disconnect dev-1",
            "pair dev-1",
            "unPair dev-1",
        ]
    );
}

#[tokio::test]
async fn test_platform_results() {
    let (_messenger, platform, client) = platform_pair(ChannelConfig::default());

    let services = client.discover_services("dev-1").await.unwrap();
    assert_eq!(services, vec![heart_rate_service(), Service::new("180f", None)]);

    let value = client.read_value("dev-1", "180d", "2a38").await.unwrap();
    assert_eq!(value, Bytes::from_static(&[0x06, 0x48]));

    assert_eq!(client.request_mtu("dev-1", 512).await.unwrap(), 185);
    assert!(client.is_paired("paired").await.unwrap());
    assert!(!client.is_paired("other").await.unwrap());
    assert_eq!(
        client.get_connection_state("up").await.unwrap(),
        BleConnectionState::Connected
    );

    client
        .write_value(
            "dev-1",
            "180d",
            "2a39",
            Bytes::from_static(&[1]),
            BleOutputProperty::WithoutResponse,
        )
        .await
        .unwrap();
    assert_eq!(
        platform.writes.lock().unwrap().as_slice(),
        &[(
            "2a39".to_string(),
            Bytes::from_static(&[1]),
            BleOutputProperty::WithoutResponse
        )]
    );

    let devices = client
        .get_system_devices(vec!["180d".to_string(), "180f".to_string()])
        .await
        .unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1].device_id, "id-180f");
    assert_eq!(devices[1].name.as_deref(), Some("device for 180f"));
    assert_eq!(devices[1].rssi, None);
}

#[tokio::test]
async fn test_start_scan_filter() {
    let (_messenger, platform, client) = platform_pair(ChannelConfig::default());
    let filter = ScanFilter {
        with_services: vec!["180d".to_string()],
        with_name_prefix: vec!["Polar".to_string()],
        with_manufacturer_data: vec![ManufacturerDataFilter::new(
            107,
            Some(Bytes::from_static(&[0x01])),
            None,
        )],
    };

    client.start_scan(Some(filter.clone())).await.unwrap();
    client.start_scan(None).await.unwrap();

    assert_eq!(*platform.filters.lock().unwrap(), vec![Some(filter), None]);
}

#[tokio::test]
async fn test_platform_error_reply() {
    let (_messenger, _platform, client) = platform_pair(ChannelConfig::default());
    let err = client.connect("missing").await.unwrap_err();
    assert_eq!(
        err,
        FlutterError::new(
            "not-found",
            Some("no such device".to_string()),
            Value::String("missing".to_string()),
        )
    );
}

#[tokio::test]
async fn test_null_argument_reply() {
    let (messenger, platform, _client) = platform_pair(ChannelConfig::default());
    let channel = PlatformMethod::Connect.channel_name(&ChannelConfig::default());

    let message = BLE_CODEC
        .encode_message(&Value::List(vec![Value::Null]))
        .unwrap();
    let reply = messenger.send(&channel, message).await.unwrap();

    let expected: BleValue = Value::List(vec![
        "device_id_arg unexpectedly null.".into(),
        "Error".into(),
        Value::Null,
    ]);
    assert_eq!(BLE_CODEC.decode_message(reply).unwrap(), expected);
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_undecodable_call_reply() {
    let (messenger, _platform, _client) = platform_pair(ChannelConfig::default());
    let channel = PlatformMethod::Connect.channel_name(&ChannelConfig::default());

    let reply = messenger
        .send(&channel, Bytes::from_static(&[135]))
        .await
        .unwrap();
    let Value::List(items) = BLE_CODEC.decode_message(reply).unwrap() else {
        panic!("reply is not a list");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], BleValue::from("unknown value type: 135"));
}

#[tokio::test]
async fn test_out_of_range_enum_argument_reply() {
    let (messenger, platform, _client) = platform_pair(ChannelConfig::default());
    let channel = PlatformMethod::SetNotifiable.channel_name(&ChannelConfig::default());

    let message = BLE_CODEC
        .encode_message(&Value::List(vec![
            "dev-1".into(),
            "180d".into(),
            "2a37".into(),
            Value::Int64(9),
        ]))
        .unwrap();
    let reply = messenger.send(&channel, message).await.unwrap();

    let expected: BleValue = Value::List(vec![
        "invalid BleInputProperty index: 9".into(),
        "Error".into(),
        Value::Null,
    ]);
    assert_eq!(BLE_CODEC.decode_message(reply).unwrap(), expected);
    assert!(platform.calls().is_empty());
}

#[tokio::test]
async fn test_unregistered_channel() {
    let messenger = Arc::new(MemoryMessenger::new());
    let client = BlePlatformClient::new(messenger, ChannelConfig::default());

    let err = client.stop_scan().await.unwrap_err();
    assert_eq!(err.code, "channel-error");
    assert_eq!(
        err.message.as_deref(),
        Some(
            "Unable to establish connection on channel: \
             'dev.flutter.pigeon.universal_ble.UniversalBlePlatformChannel.stopScan'."
        )
    );
    assert_eq!(err.details, BleValue::from(""));
}

#[tokio::test]
async fn test_null_result_for_non_null_return() {
    let messenger = Arc::new(MemoryMessenger::new());
    let config = ChannelConfig::default();
    messenger.set_message_handler(
        &PlatformMethod::GetConnectionState.channel_name(&config),
        Some(message_handler(|_| async {
            BLE_CODEC
                .encode_message(&Value::List(vec![Value::Null]))
                .unwrap()
        })),
    );
    let client = BlePlatformClient::new(messenger, config);

    let err = client.get_connection_state("dev-1").await.unwrap_err();
    assert_eq!(err.code, "null-error");
    assert_eq!(
        err.message.as_deref(),
        Some("Host platform returned null value for non-null return value.")
    );
}

#[tokio::test]
async fn test_channel_suffix() {
    let (messenger, _platform, client) = platform_pair(ChannelConfig::with_suffix("left"));
    assert!(client.enable_bluetooth().await.unwrap());

    let unsuffixed = BlePlatformClient::new(messenger.clone(), ChannelConfig::default());
    assert_eq!(
        unsuffixed.enable_bluetooth().await.unwrap_err().code,
        "channel-error"
    );
    assert!(
        messenger
            .channels()
            .iter()
            .all(|channel| channel.ends_with(".left"))
    );
}

#[tokio::test]
async fn test_remove_platform_api() {
    let config = ChannelConfig::default();
    let (messenger, _platform, client) = platform_pair(config.clone());
    set_up_platform_api(messenger.as_ref(), None, &config);

    assert!(messenger.channels().is_empty());
    assert_eq!(client.stop_scan().await.unwrap_err().code, "channel-error");
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Availability(AvailabilityState),
    Pair(String, bool, Option<String>),
    Scan(ScanResult),
    Value(String, String, Bytes),
    Connection(String, bool, Option<String>),
}

#[derive(Default)]
struct RecordingCallbacks {
    events: Mutex<Vec<Event>>,
}

impl RecordingCallbacks {
    fn push(&self, event: Event) -> Result<(), FlutterError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl BleCallbackApi for RecordingCallbacks {
    async fn on_availability_changed(&self, state: AvailabilityState) -> Result<(), FlutterError> {
        self.push(Event::Availability(state))
    }

    async fn on_pair_state_change(
        &self,
        device_id: String,
        is_paired: bool,
        error: Option<String>,
    ) -> Result<(), FlutterError> {
        self.push(Event::Pair(device_id, is_paired, error))
    }

    async fn on_scan_result(&self, result: ScanResult) -> Result<(), FlutterError> {
        if result.device_id.is_empty() {
            return Err(FlutterError::new("bad-result", None, Value::Null));
        }
        self.push(Event::Scan(result))
    }

    async fn on_value_changed(
        &self,
        device_id: String,
        characteristic_id: String,
        value: Bytes,
    ) -> Result<(), FlutterError> {
        self.push(Event::Value(device_id, characteristic_id, value))
    }

    async fn on_connection_changed(
        &self,
        device_id: String,
        connected: bool,
        error: Option<String>,
    ) -> Result<(), FlutterError> {
        self.push(Event::Connection(device_id, connected, error))
    }
}

#[tokio::test]
async fn test_callback_events() {
    let messenger = Arc::new(MemoryMessenger::new());
    let config = ChannelConfig::default();
    let ui = Arc::new(RecordingCallbacks::default());
    set_up_callback_api(messenger.as_ref(), Some(ui.clone()), &config);
    assert_eq!(messenger.channels().len(), CallbackMethod::ALL.len());

    let events = BleCallbackChannel::new(messenger, config);
    let result = ScanResult {
        name: Some("HRM".to_string()),
        rssi: Some(-61),
        manufacturer_data_list: Some(vec![ManufacturerData::new(107, vec![0x10, 0x20])]),
        ..ScanResult::new("dev-1")
    };

    events
        .on_availability_changed(AvailabilityState::PoweredOff)
        .await
        .unwrap();
    events.on_scan_result(result.clone()).await.unwrap();
    events
        .on_connection_changed("dev-1", true, None)
        .await
        .unwrap();
    events
        .on_value_changed("dev-1", "2a37", Bytes::from_static(&[0x06, 0x48]))
        .await
        .unwrap();
    events
        .on_pair_state_change("dev-1", false, Some("rejected"))
        .await
        .unwrap();

    assert_eq!(
        *ui.events.lock().unwrap(),
        vec![
            Event::Availability(AvailabilityState::PoweredOff),
            Event::Scan(result),
            Event::Connection("dev-1".to_string(), true, None),
            Event::Value(
                "dev-1".to_string(),
                "2a37".to_string(),
                Bytes::from_static(&[0x06, 0x48])
            ),
            Event::Pair("dev-1".to_string(), false, Some("rejected".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_callback_errors() {
    let messenger = Arc::new(MemoryMessenger::new());
    let config = ChannelConfig::with_suffix("ui");
    let events = BleCallbackChannel::new(messenger.clone(), config.clone());

    let err = events
        .on_availability_changed(AvailabilityState::Unknown)
        .await
        .unwrap_err();
    assert_eq!(err.code, "channel-error");

    set_up_callback_api(
        messenger.as_ref(),
        Some(Arc::new(RecordingCallbacks::default())),
        &config,
    );
    let err = events
        .on_scan_result(ScanResult::new(""))
        .await
        .unwrap_err();
    assert_eq!(err, FlutterError::new("bad-result", None, Value::Null));
}
