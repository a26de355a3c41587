//! Tagged encoding of the BLE records.
//!
//! Each record travels as a first-class value: a reserved tag byte followed
//! by the record's field list, written with the same serializer so records
//! can nest (a `ScanFilter` carries `ManufacturerDataFilter`s, a
//! `ScanResult` carries `Service`s, ...).
//!
//! | Tag | Record |
//! |---|---|
//! | 129 | [`ScanResult`] |
//! | 130 | [`Service`] |
//! | 131 | [`Characteristic`] |
//! | 132 | [`ScanFilter`] |
//! | 133 | [`ManufacturerDataFilter`] |
//! | 134 | [`ManufacturerData`] |
//!
//! Any other tag is handed to the base format, which faults on tags it does
//! not know.

use crate::convert::{FromValue, IntoValue, mismatch};
use crate::standard::{
    ByteStreamReader, ByteStreamWriter, DecodeError, EncodeError, MAX_STANDARD_TAG, Serializer,
    StandardMessageCodec, StandardType, read_standard_value, write_standard_value,
};
use crate::types::{
    Characteristic, ManufacturerData, ManufacturerDataFilter, Record, ScanFilter, ScanResult,
    Service,
};
use crate::value::Value;
use core::fmt;
use tracing::debug;

/// A value as carried on the BLE channels.
pub type BleValue = Value<CustomValue>;

/// One of the BLE records, as a custom value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomValue {
    ScanResult(ScanResult),
    Service(Service),
    Characteristic(Characteristic),
    ScanFilter(ScanFilter),
    ManufacturerDataFilter(ManufacturerDataFilter),
    ManufacturerData(ManufacturerData),
}

impl CustomValue {
    pub const SCAN_RESULT_TAG: u8 = 129;
    pub const SERVICE_TAG: u8 = 130;
    pub const CHARACTERISTIC_TAG: u8 = 131;
    pub const SCAN_FILTER_TAG: u8 = 132;
    pub const MANUFACTURER_DATA_FILTER_TAG: u8 = 133;
    pub const MANUFACTURER_DATA_TAG: u8 = 134;

    /// Wire tag written in front of the record.
    pub fn tag(&self) -> u8 {
        match self {
            CustomValue::ScanResult(_) => Self::SCAN_RESULT_TAG,
            CustomValue::Service(_) => Self::SERVICE_TAG,
            CustomValue::Characteristic(_) => Self::CHARACTERISTIC_TAG,
            CustomValue::ScanFilter(_) => Self::SCAN_FILTER_TAG,
            CustomValue::ManufacturerDataFilter(_) => Self::MANUFACTURER_DATA_FILTER_TAG,
            CustomValue::ManufacturerData(_) => Self::MANUFACTURER_DATA_TAG,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CustomValue::ScanResult(_) => ScanResult::NAME,
            CustomValue::Service(_) => Service::NAME,
            CustomValue::Characteristic(_) => Characteristic::NAME,
            CustomValue::ScanFilter(_) => ScanFilter::NAME,
            CustomValue::ManufacturerDataFilter(_) => ManufacturerDataFilter::NAME,
            CustomValue::ManufacturerData(_) => ManufacturerData::NAME,
        }
    }

    /// The record's positional field list.
    pub fn to_list(&self) -> Vec<BleValue> {
        match self {
            CustomValue::ScanResult(r) => r.to_list(),
            CustomValue::Service(r) => r.to_list(),
            CustomValue::Characteristic(r) => r.to_list(),
            CustomValue::ScanFilter(r) => r.to_list(),
            CustomValue::ManufacturerDataFilter(r) => r.to_list(),
            CustomValue::ManufacturerData(r) => r.to_list(),
        }
    }
}

/// Tag to record name, in tag order.
pub const CUSTOM_TAGS: [(u8, &str); 6] = [
    (CustomValue::SCAN_RESULT_TAG, ScanResult::NAME),
    (CustomValue::SERVICE_TAG, Service::NAME),
    (CustomValue::CHARACTERISTIC_TAG, Characteristic::NAME),
    (CustomValue::SCAN_FILTER_TAG, ScanFilter::NAME),
    (
        CustomValue::MANUFACTURER_DATA_FILTER_TAG,
        ManufacturerDataFilter::NAME,
    ),
    (CustomValue::MANUFACTURER_DATA_TAG, ManufacturerData::NAME),
];

/// Shown as `Name#tag[field, ...]`, e.g. `ManufacturerData#134[76, h'01 02']`.
impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}#{}{}",
            self.type_name(),
            self.tag(),
            Value::List(self.to_list())
        )
    }
}

macro_rules! record_value {
    ($($record:ident),* $(,)?) => {$(
        impl From<$record> for CustomValue {
            fn from(record: $record) -> Self {
                CustomValue::$record(record)
            }
        }

        impl From<$record> for BleValue {
            fn from(record: $record) -> Self {
                Value::Custom(CustomValue::$record(record))
            }
        }

        impl FromValue for $record {
            const EXPECTED: &'static str = <$record as Record>::NAME;

            fn from_value(value: BleValue) -> Result<Self, DecodeError> {
                match value {
                    Value::Custom(CustomValue::$record(record)) => Ok(record),
                    other => Err(mismatch(Self::EXPECTED, &other)),
                }
            }
        }

        impl IntoValue for $record {
            fn into_value(self) -> BleValue {
                Value::Custom(CustomValue::$record(self))
            }
        }
    )*};
}

record_value!(
    ScanResult,
    Service,
    Characteristic,
    ScanFilter,
    ManufacturerDataFilter,
    ManufacturerData,
);

/// Serializer for the BLE channels: the base format plus the six records.
#[derive(Debug, Clone, Copy, Default)]
pub struct BleSerializer;

impl BleSerializer {
    /// Reads a record payload. The tag is checked before anything nested is
    /// decoded, so a chain of record tags cannot recurse past the list depth
    /// limit.
    fn read_record<R: Record>(&self, reader: &mut ByteStreamReader) -> Result<R, DecodeError> {
        let tag = reader.read_byte()?;
        if tag != StandardType::List as u8 {
            return Err(DecodeError::TypeMismatch {
                expected: "list",
                found: tag_name(tag),
            });
        }
        match read_standard_value(self, tag, reader)? {
            Value::List(items) => R::from_list(items),
            other => Err(mismatch("list", &other)),
        }
    }
}

fn tag_name(tag: u8) -> &'static str {
    match StandardType::try_from(tag) {
        Ok(standard) => standard.type_name(),
        Err(_) => CUSTOM_TAGS
            .iter()
            .find(|(custom, _)| *custom == tag)
            .map_or("unknown type", |(_, name)| *name),
    }
}

impl Serializer for BleSerializer {
    type Custom = CustomValue;

    fn read_value_of_type(
        &self,
        tag: u8,
        reader: &mut ByteStreamReader,
    ) -> Result<BleValue, DecodeError> {
        let custom = match tag {
            CustomValue::SCAN_RESULT_TAG => CustomValue::ScanResult(self.read_record(reader)?),
            CustomValue::SERVICE_TAG => CustomValue::Service(self.read_record(reader)?),
            CustomValue::CHARACTERISTIC_TAG => {
                CustomValue::Characteristic(self.read_record(reader)?)
            }
            CustomValue::SCAN_FILTER_TAG => CustomValue::ScanFilter(self.read_record(reader)?),
            CustomValue::MANUFACTURER_DATA_FILTER_TAG => {
                CustomValue::ManufacturerDataFilter(self.read_record(reader)?)
            }
            CustomValue::MANUFACTURER_DATA_TAG => {
                CustomValue::ManufacturerData(self.read_record(reader)?)
            }
            _ => {
                if tag > MAX_STANDARD_TAG {
                    debug!("no record type for tag {tag} at offset {}", reader.position());
                }
                return read_standard_value(self, tag, reader);
            }
        };
        Ok(Value::Custom(custom))
    }

    fn write_value(&self, value: &BleValue, writer: &mut ByteStreamWriter) -> Result<(), EncodeError> {
        match value {
            Value::Custom(custom) => {
                writer.write_byte(custom.tag());
                self.write_value(&Value::List(custom.to_list()), writer)
            }
            other => write_standard_value(self, other, writer),
        }
    }
}

pub type BleCodec = StandardMessageCodec<BleSerializer>;

/// The codec shared by the platform and callback channels.
pub static BLE_CODEC: BleCodec = StandardMessageCodec::new(BleSerializer);
