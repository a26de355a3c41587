//! BLE records exchanged over the channels.
//!
//! Each record is encoded as a list of its fields in declaration order
//! (positional, not keyed). Unset optional fields are written as an explicit
//! `null`; a `null` in a required position is a decode error.
//!
//! | Record | Fields |
//! |---|---|
//! | [`ScanResult`] | device_id, name?, is_paired?, rssi?, manufacturer_data_list?, services? |
//! | [`Service`] | uuid, characteristics? |
//! | [`Characteristic`] | uuid, properties |
//! | [`ScanFilter`] | with_services, with_name_prefix, with_manufacturer_data |
//! | [`ManufacturerDataFilter`] | company_identifier, data?, mask? |
//! | [`ManufacturerData`] | company_identifier, data |

use crate::convert::{FromValue, IntoValue};
use crate::custom::BleValue;
use crate::standard::DecodeError;
use bytes::Bytes;

/// A record with a positional list encoding.
pub trait Record: Sized {
    /// Record name, used in diagnostics and errors.
    const NAME: &'static str;

    /// Field names in wire order.
    const FIELDS: &'static [&'static str];

    fn to_list(&self) -> Vec<BleValue>;

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError>;
}

/// Reads the fields of an encoded record front to back.
///
/// Elements past the last known field are ignored, so a peer built from a
/// newer schema that appends fields can still be read.
struct FieldReader {
    record: &'static str,
    fields: &'static [&'static str],
    items: std::vec::IntoIter<BleValue>,
    index: usize,
}

impl FieldReader {
    fn new<R: Record>(list: Vec<BleValue>) -> Self {
        Self {
            record: R::NAME,
            fields: R::FIELDS,
            items: list.into_iter(),
            index: 0,
        }
    }

    fn next(&mut self) -> Result<(&'static str, BleValue), DecodeError> {
        let field = self.fields.get(self.index).copied().unwrap_or("?");
        self.index += 1;
        let value = self.items.next().ok_or(DecodeError::MissingField {
            record: self.record,
            field,
        })?;
        Ok((field, value))
    }

    fn required<T: FromValue>(&mut self) -> Result<T, DecodeError> {
        let (field, value) = self.next()?;
        if value.is_null() {
            return Err(DecodeError::UnexpectedNull {
                record: self.record,
                field,
            });
        }
        T::from_value(value)
    }

    fn optional<T: FromValue>(&mut self) -> Result<Option<T>, DecodeError> {
        let (_, value) = self.next()?;
        Option::<T>::from_value(value)
    }
}

/// A device seen while scanning, or returned by a system device query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub device_id: String,
    pub name: Option<String>,
    pub is_paired: Option<bool>,
    pub rssi: Option<i64>,
    pub manufacturer_data_list: Option<Vec<ManufacturerData>>,
    pub services: Option<Vec<Service>>,
}

impl ScanResult {
    /// Creates a result with only the required device id set.
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }
}

impl Record for ScanResult {
    const NAME: &'static str = "ScanResult";
    const FIELDS: &'static [&'static str] = &[
        "device_id",
        "name",
        "is_paired",
        "rssi",
        "manufacturer_data_list",
        "services",
    ];

    fn to_list(&self) -> Vec<BleValue> {
        vec![
            self.device_id.clone().into_value(),
            self.name.clone().into_value(),
            self.is_paired.into_value(),
            self.rssi.into_value(),
            self.manufacturer_data_list.clone().into_value(),
            self.services.clone().into_value(),
        ]
    }

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new::<Self>(list);
        Ok(Self {
            device_id: fields.required()?,
            name: fields.optional()?,
            is_paired: fields.optional()?,
            rssi: fields.optional()?,
            manufacturer_data_list: fields.optional()?,
            services: fields.optional()?,
        })
    }
}

/// A GATT service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Service {
    pub uuid: String,
    pub characteristics: Option<Vec<Characteristic>>,
}

impl Service {
    pub fn new(uuid: impl Into<String>, characteristics: Option<Vec<Characteristic>>) -> Self {
        Self {
            uuid: uuid.into(),
            characteristics,
        }
    }
}

impl Record for Service {
    const NAME: &'static str = "Service";
    const FIELDS: &'static [&'static str] = &["uuid", "characteristics"];

    fn to_list(&self) -> Vec<BleValue> {
        vec![
            self.uuid.clone().into_value(),
            self.characteristics.clone().into_value(),
        ]
    }

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new::<Self>(list);
        Ok(Self {
            uuid: fields.required()?,
            characteristics: fields.optional()?,
        })
    }
}

/// A GATT characteristic.
///
/// `properties` holds characteristic property indexes
/// (broadcast, read, write without response, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Characteristic {
    pub uuid: String,
    pub properties: Vec<i64>,
}

impl Characteristic {
    pub fn new(uuid: impl Into<String>, properties: Vec<i64>) -> Self {
        Self {
            uuid: uuid.into(),
            properties,
        }
    }
}

impl Record for Characteristic {
    const NAME: &'static str = "Characteristic";
    const FIELDS: &'static [&'static str] = &["uuid", "properties"];

    fn to_list(&self) -> Vec<BleValue> {
        vec![
            self.uuid.clone().into_value(),
            self.properties.clone().into_value(),
        ]
    }

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new::<Self>(list);
        Ok(Self {
            uuid: fields.required()?,
            properties: fields.required()?,
        })
    }
}

/// Criteria a scan result must match. Empty lists match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanFilter {
    pub with_services: Vec<String>,
    pub with_name_prefix: Vec<String>,
    pub with_manufacturer_data: Vec<ManufacturerDataFilter>,
}

impl Record for ScanFilter {
    const NAME: &'static str = "ScanFilter";
    const FIELDS: &'static [&'static str] =
        &["with_services", "with_name_prefix", "with_manufacturer_data"];

    fn to_list(&self) -> Vec<BleValue> {
        vec![
            self.with_services.clone().into_value(),
            self.with_name_prefix.clone().into_value(),
            self.with_manufacturer_data.clone().into_value(),
        ]
    }

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new::<Self>(list);
        Ok(Self {
            with_services: fields.required()?,
            with_name_prefix: fields.required()?,
            with_manufacturer_data: fields.required()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManufacturerDataFilter {
    pub company_identifier: i64,
    pub data: Option<Bytes>,
    pub mask: Option<Bytes>,
}

impl ManufacturerDataFilter {
    pub fn new(company_identifier: i64, data: Option<Bytes>, mask: Option<Bytes>) -> Self {
        Self {
            company_identifier,
            data,
            mask,
        }
    }
}

impl Record for ManufacturerDataFilter {
    const NAME: &'static str = "ManufacturerDataFilter";
    const FIELDS: &'static [&'static str] = &["company_identifier", "data", "mask"];

    fn to_list(&self) -> Vec<BleValue> {
        vec![
            self.company_identifier.into_value(),
            self.data.clone().into_value(),
            self.mask.clone().into_value(),
        ]
    }

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new::<Self>(list);
        Ok(Self {
            company_identifier: fields.required()?,
            data: fields.optional()?,
            mask: fields.optional()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManufacturerData {
    pub company_identifier: i64,
    pub data: Bytes,
}

impl ManufacturerData {
    pub fn new(company_identifier: i64, data: impl Into<Bytes>) -> Self {
        Self {
            company_identifier,
            data: data.into(),
        }
    }
}

impl Record for ManufacturerData {
    const NAME: &'static str = "ManufacturerData";
    const FIELDS: &'static [&'static str] = &["company_identifier", "data"];

    fn to_list(&self) -> Vec<BleValue> {
        vec![
            self.company_identifier.into_value(),
            self.data.clone().into_value(),
        ]
    }

    fn from_list(list: Vec<BleValue>) -> Result<Self, DecodeError> {
        let mut fields = FieldReader::new::<Self>(list);
        Ok(Self {
            company_identifier: fields.required()?,
            data: fields.required()?,
        })
    }
}
