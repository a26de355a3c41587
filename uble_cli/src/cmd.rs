use crate::{Commands, config::CliConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, warn};
use uble_channel::{
    AvailabilityState, BinaryMessenger, BleCallbackApi, BleCallbackChannel, CallbackMethod,
    ChannelConfig, CharacteristicProperty, FlutterError, MemoryMessenger, MessageHandler, PlatformMethod,
    envelope::parse_reply, set_up_callback_api,
};
use uble_codec::{
    BLE_CODEC, BleValue, CUSTOM_TAGS, Characteristic, ManufacturerData, ScanResult, Service,
};

pub async fn run_command(config: CliConfig, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Decode { hex } => println!("{}", decode_message(&hex)?),
        Commands::Reply { hex, channel } => println!("{}", describe_reply(&channel, &hex)?),
        Commands::Tags => {
            for (tag, name) in CUSTOM_TAGS {
                println!("{tag}\t{name}");
            }
        }
        Commands::Channels { suffix } => {
            let mut channel = config.channel;
            if let Some(suffix) = suffix {
                channel.message_channel_suffix = suffix;
            }
            for name in channel_names(&channel) {
                println!("{name}");
            }
        }
        Commands::Config => print!("{}", toml::to_string(&config)?),
        Commands::Selftest => selftest(config.channel).await?,
    }
    Ok(())
}

fn parse_hex(input: &str) -> Result<Bytes> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(digits).context("message is not valid hex")?;
    Ok(Bytes::from(bytes))
}

pub fn decode_message(input: &str) -> Result<BleValue> {
    let message = parse_hex(input)?;
    BLE_CODEC
        .decode_message(message)
        .context("could not decode message")
}

pub fn describe_reply(channel: &str, input: &str) -> Result<String> {
    let reply = decode_message(input)?;
    Ok(match parse_reply(channel, reply) {
        Ok(value) => format!("ok {value}"),
        Err(err) => format!("error {err} (details: {})", err.details),
    })
}

pub fn channel_names(config: &ChannelConfig) -> Vec<String> {
    PlatformMethod::ALL
        .iter()
        .map(|method| method.channel_name(config))
        .chain(
            CallbackMethod::ALL
                .iter()
                .map(|method| method.channel_name(config)),
        )
        .collect()
}

/// Prints every message and reply that passes through it.
#[derive(Debug, Default)]
struct TapMessenger {
    inner: MemoryMessenger,
}

#[async_trait]
impl BinaryMessenger for TapMessenger {
    async fn send(&self, channel: &str, message: Bytes) -> Option<Bytes> {
        println!("-> {channel}");
        println!("   {}", hex::encode(&message));
        let reply = self.inner.send(channel, message).await;
        match &reply {
            Some(reply) => println!("<- {}", hex::encode(reply)),
            None => println!("<- no handler"),
        }
        reply
    }

    fn set_message_handler(&self, channel: &str, handler: Option<MessageHandler>) {
        self.inner.set_message_handler(channel, handler);
    }
}

struct LoggingCallbacks;

#[async_trait]
impl BleCallbackApi for LoggingCallbacks {
    async fn on_availability_changed(&self, state: AvailabilityState) -> Result<(), FlutterError> {
        info!("availability changed: {state:?}");
        Ok(())
    }

    async fn on_pair_state_change(
        &self,
        device_id: String,
        is_paired: bool,
        error: Option<String>,
    ) -> Result<(), FlutterError> {
        info!("{device_id}: paired {is_paired}, error {error:?}");
        Ok(())
    }

    async fn on_scan_result(&self, result: ScanResult) -> Result<(), FlutterError> {
        info!(
            "scan result: {} {:?} rssi {:?}",
            result.device_id, result.name, result.rssi
        );
        for line in describe_characteristics(&result) {
            info!("  {line}");
        }
        Ok(())
    }

    async fn on_value_changed(
        &self,
        device_id: String,
        characteristic_id: String,
        value: Bytes,
    ) -> Result<(), FlutterError> {
        info!("{device_id}: {characteristic_id} = {}", hex::encode(&value));
        Ok(())
    }

    async fn on_connection_changed(
        &self,
        device_id: String,
        connected: bool,
        error: Option<String>,
    ) -> Result<(), FlutterError> {
        info!("{device_id}: connected {connected}, error {error:?}");
        Ok(())
    }
}

/// One `service/characteristic: properties` line per advertised characteristic.
fn describe_characteristics(result: &ScanResult) -> Vec<String> {
    let services = result.services.iter().flatten();
    services
        .flat_map(|service| {
            service
                .characteristics
                .iter()
                .flatten()
                .map(move |characteristic| (service, characteristic))
        })
        .map(|(service, characteristic)| {
            let properties = match CharacteristicProperty::from_characteristic(characteristic) {
                Ok(properties) => format!("{properties:?}"),
                Err(err) => {
                    warn!("{}: {err}", characteristic.uuid);
                    format!("{:?}", characteristic.properties)
                }
            };
            format!("{}/{}: {properties}", service.uuid, characteristic.uuid)
        })
        .collect()
}

async fn selftest(config: ChannelConfig) -> Result<()> {
    let messenger = Arc::new(TapMessenger::default());
    set_up_callback_api(messenger.as_ref(), Some(Arc::new(LoggingCallbacks)), &config);
    let events = BleCallbackChannel::new(messenger, config);

    let result = ScanResult {
        name: Some("Heart Rate Monitor".to_string()),
        is_paired: Some(false),
        rssi: Some(-58),
        manufacturer_data_list: Some(vec![ManufacturerData::new(107, vec![0x10, 0x02])]),
        services: Some(vec![Service::new(
            "180d",
            Some(vec![Characteristic::new("2a37", vec![4])]),
        )]),
        ..ScanResult::new("C0:FF:EE:00:00:01")
    };

    events
        .on_availability_changed(AvailabilityState::PoweredOn)
        .await?;
    events.on_scan_result(result).await?;
    events
        .on_value_changed("C0:FF:EE:00:00:01", "2a37", Bytes::from_static(&[0x06, 0x48]))
        .await?;
    Ok(())
}
