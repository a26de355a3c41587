//! Enumerations passed over the channels as integer indexes.

use uble_codec::{BleValue, Characteristic, DecodeError, FromValue, IntoValue, Value};

/// An integer that does not name a variant of the expected enum.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid {kind} index: {index}")]
pub struct EnumIndexError {
    pub kind: &'static str,
    pub index: i64,
}

impl From<EnumIndexError> for DecodeError {
    fn from(err: EnumIndexError) -> Self {
        DecodeError::InvalidEnumIndex {
            kind: err.kind,
            index: err.index,
        }
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $index:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $index,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Index written on the wire.
            pub fn index(self) -> i64 {
                self as i64
            }
        }

        impl TryFrom<i64> for $name {
            type Error = EnumIndexError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $($index => Ok($name::$variant),)*
                    _ => Err(EnumIndexError {
                        kind: stringify!($name),
                        index: value,
                    }),
                }
            }
        }

        impl FromValue for $name {
            const EXPECTED: &'static str = stringify!($name);

            fn from_value(value: BleValue) -> Result<Self, DecodeError> {
                Ok($name::try_from(i64::from_value(value)?)?)
            }
        }

        impl IntoValue for $name {
            fn into_value(self) -> BleValue {
                Value::Int64(self.index())
            }
        }
    };
}

wire_enum! {
    /// State of the host's Bluetooth adapter.
    AvailabilityState {
        Unknown = 0,
        Resetting = 1,
        Unsupported = 2,
        Unauthorized = 3,
        PoweredOff = 4,
        PoweredOn = 5,
    }
}

wire_enum! {
    BleConnectionState {
        Connected = 0,
        Disconnected = 1,
        Connecting = 2,
        Disconnecting = 3,
    }
}

wire_enum! {
    /// How value changes of a characteristic are reported.
    BleInputProperty {
        Disabled = 0,
        Notification = 1,
        Indication = 2,
    }
}

wire_enum! {
    BleOutputProperty {
        WithResponse = 0,
        WithoutResponse = 1,
    }
}

wire_enum! {
    /// Entries of `Characteristic::properties`.
    CharacteristicProperty {
        Broadcast = 0,
        Read = 1,
        WriteWithoutResponse = 2,
        Write = 3,
        Notify = 4,
        Indicate = 5,
        AuthenticatedSignedWrites = 6,
        ExtendedProperties = 7,
    }
}

impl CharacteristicProperty {
    /// Typed view of `characteristic.properties`, failing on the first
    /// index that names no property.
    pub fn from_characteristic(characteristic: &Characteristic) -> Result<Vec<Self>, EnumIndexError> {
        characteristic
            .properties
            .iter()
            .map(|&index| Self::try_from(index))
            .collect()
    }
}
