//! Message channels between the UI runtime and a native BLE implementation.
//!
//! Two APIs share one [`BinaryMessenger`] and the BLE codec
//! (`uble_codec::BLE_CODEC`):
//!
//! - the **platform channel** (UI -> native): 17 request/response calls such
//!   as `startScan`, `connect` or `readValue`. The native side implements
//!   [`BlePlatformApi`] and registers it with [`set_up_platform_api`]; the UI
//!   side calls it through [`BlePlatformClient`].
//! - the **callback channel** (native -> UI): availability, scan result,
//!   value, connection and pairing events. The native side sends them with
//!   [`BleCallbackChannel`]; the UI side implements [`BleCallbackApi`] and
//!   registers it with [`set_up_callback_api`].
//!
//! Every call is a list of positional arguments. Replies are `[result]` on
//! success and `[code, message, details]` on failure; a missing reply means
//! nobody is listening on the channel (`channel-error`).
//!
//! Channel names are
//! `dev.flutter.pigeon.universal_ble.<Api>.<method>[.<suffix>]`, see
//! [`ChannelConfig`].

pub mod callback;
pub mod config;
pub mod enums;
pub mod envelope;
pub mod messenger;
pub mod platform;

pub use callback::{BleCallbackApi, BleCallbackChannel, CallbackMethod, set_up_callback_api};
pub use config::ChannelConfig;
pub use enums::{
    AvailabilityState, BleConnectionState, BleInputProperty, BleOutputProperty,
    CharacteristicProperty, EnumIndexError,
};
pub use envelope::FlutterError;
pub use messenger::{BinaryMessenger, MemoryMessenger, MessageHandler, message_handler};
pub use platform::{BlePlatformApi, BlePlatformClient, PlatformMethod, set_up_platform_api};
