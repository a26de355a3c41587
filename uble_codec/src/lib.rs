//! Wire format for the universal_ble message channels.
//!
//! This crate defines everything that crosses the binary channel between the
//! UI runtime and the native BLE implementation:
//!
//! ## Base format (wire-stable)
//!
//! - The generic value tree (`value::Value`)
//! - The standard message codec: one tag byte per value, little-endian
//!   scalars, compact size prefixes and aligned typed lists
//!   (`standard::StandardMessageCodec`, `standard::Serializer`)
//!
//! ## BLE records (wire-stable)
//!
//! - The six record types (`types::ScanResult`, `types::Service`, ...)
//! - Their tagged encoding in the custom band 129..=134
//!   (`custom::CustomValue`, `custom::BleSerializer`, `custom::BLE_CODEC`)
//!
//! Changing a tag number or a record's field order is a protocol change:
//! both ends of the channel must agree on them.
//!
//! Encoding and decoding are synchronous, allocation-bounded and reentrant.
//! The shared codec instance is a `static` with no interior state, so it can
//! be used from any thread.

pub mod convert;
pub mod custom;
pub mod standard;
pub mod types;
pub mod value;

pub use convert::{FromValue, IntoValue};
pub use custom::{BLE_CODEC, BleCodec, BleSerializer, BleValue, CUSTOM_TAGS, CustomValue};
pub use standard::{
    ByteStreamReader, ByteStreamWriter, DecodeError, EncodeError, Serializer,
    StandardMessageCodec, StandardSerializer,
};
pub use types::{
    Characteristic, ManufacturerData, ManufacturerDataFilter, Record, ScanFilter, ScanResult,
    Service,
};
pub use value::Value;
