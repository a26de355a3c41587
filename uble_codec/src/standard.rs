//! The standard message codec.
//!
//! Every value is written as a one-byte type tag followed by its payload.
//!
//! Wire format:
//! - scalars are little-endian
//! - sizes (string/byte lengths, element counts) use a compact prefix:
//!   - `0..=253`: the size itself in one byte
//!   - `254`: followed by the size as `u16`
//!   - `255`: followed by the size as `u32`
//! - `float64` values and the elements of typed numeric lists are aligned to
//!   their width, measured from the start of the message; padding bytes are
//!   zero.
//!
//! Tags `0..=14` belong to the base format (tag 5, the legacy "large int",
//! is reserved and never written). Serializers extend the format by
//! overriding [`Serializer::read_value_of_type`] and [`Serializer::write_value`]
//! for tags outside that band and delegating everything else to
//! [`read_standard_value`] / [`write_standard_value`].

use crate::value::Value;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::convert::Infallible;

/// Maximum nesting of lists and maps accepted when decoding.
///
/// Records nest at most a few levels deep; the limit keeps hostile input from
/// exhausting the stack through recursion.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Highest tag used by the base format.
pub const MAX_STANDARD_TAG: u8 = 14;

/// Errors that can occur while decoding a message.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("insufficient bytes: needed {needed}, {remaining} remaining")]
    InsufficientBytes { needed: usize, remaining: usize },

    #[error("unknown value type: {0}")]
    UnknownType(u8),

    #[error("invalid utf-8 in string value: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{record}.{field} unexpectedly null")]
    UnexpectedNull {
        record: &'static str,
        field: &'static str,
    },

    #[error("{record}.{field} missing from encoded record")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("invalid {kind} index: {index}")]
    InvalidEnumIndex { kind: &'static str, index: i64 },

    #[error("value nesting exceeds {MAX_NESTING_DEPTH} levels")]
    NestingTooDeep,

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Errors that can occur while encoding a message.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("size {0} does not fit the u32 size prefix")]
    SizeOverflow(usize),

    #[error("custom value not supported by this serializer")]
    UnsupportedCustomValue,
}

/// Type tags of the base format.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StandardType {
    Null = 0,
    True = 1,
    False = 2,
    Int32 = 3,
    Int64 = 4,
    Float64 = 6,
    String = 7,
    Uint8List = 8,
    Int32List = 9,
    Int64List = 10,
    Float64List = 11,
    List = 12,
    Map = 13,
    Float32List = 14,
}

impl StandardType {
    /// Same names as [`Value::type_name`].
    pub fn type_name(self) -> &'static str {
        match self {
            StandardType::Null => "null",
            StandardType::True | StandardType::False => "bool",
            StandardType::Int32 => "int32",
            StandardType::Int64 => "int64",
            StandardType::Float64 => "float64",
            StandardType::String => "string",
            StandardType::Uint8List => "uint8 list",
            StandardType::Int32List => "int32 list",
            StandardType::Int64List => "int64 list",
            StandardType::Float64List => "float64 list",
            StandardType::List => "list",
            StandardType::Map => "map",
            StandardType::Float32List => "float32 list",
        }
    }
}

impl TryFrom<u8> for StandardType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StandardType::Null),
            1 => Ok(StandardType::True),
            2 => Ok(StandardType::False),
            3 => Ok(StandardType::Int32),
            4 => Ok(StandardType::Int64),
            6 => Ok(StandardType::Float64),
            7 => Ok(StandardType::String),
            8 => Ok(StandardType::Uint8List),
            9 => Ok(StandardType::Int32List),
            10 => Ok(StandardType::Int64List),
            11 => Ok(StandardType::Float64List),
            12 => Ok(StandardType::List),
            13 => Ok(StandardType::Map),
            14 => Ok(StandardType::Float32List),
            _ => Err(DecodeError::UnknownType(value)),
        }
    }
}

/// Cursor over an encoded message.
#[derive(Debug)]
pub struct ByteStreamReader {
    buf: Bytes,
    len: usize,
    depth: usize,
}

impl ByteStreamReader {
    pub fn new(buf: Bytes) -> Self {
        let len = buf.len();
        Self { buf, len, depth: 0 }
    }

    /// Offset from the start of the message.
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::InsufficientBytes {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Reads `count` elements of `width` bytes each as one slice.
    fn read_elements(&mut self, count: usize, width: usize) -> Result<Bytes, DecodeError> {
        let len = count
            .checked_mul(width)
            .ok_or(DecodeError::InsufficientBytes {
                needed: usize::MAX,
                remaining: self.buf.remaining(),
            })?;
        self.read_bytes(len)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    pub fn read_size(&mut self) -> Result<usize, DecodeError> {
        match self.read_byte()? {
            254 => Ok(usize::from(self.read_u16()?)),
            255 => Ok(self.read_u32()? as usize),
            n => Ok(usize::from(n)),
        }
    }

    /// Skips the padding needed to reach the next multiple of `alignment`.
    pub fn read_alignment(&mut self, alignment: usize) -> Result<(), DecodeError> {
        let m = self.position() % alignment;
        if m != 0 {
            let pad = alignment - m;
            self.ensure(pad)?;
            self.buf.advance(pad);
        }
        Ok(())
    }

    fn descend(&mut self) -> Result<(), DecodeError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep);
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }
}

/// Growable output buffer for an encoded message.
#[derive(Debug, Default)]
pub struct ByteStreamWriter {
    buf: BytesMut,
}

impl ByteStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Offset from the start of the message.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    pub fn write_size(&mut self, size: usize) -> Result<(), EncodeError> {
        if size < 254 {
            self.write_byte(size as u8);
        } else if let Ok(size) = u16::try_from(size) {
            self.write_byte(254);
            self.write_u16(size);
        } else {
            let size = u32::try_from(size).map_err(|_| EncodeError::SizeOverflow(size))?;
            self.write_byte(255);
            self.write_u32(size);
        }
        Ok(())
    }

    /// Pads with zeros up to the next multiple of `alignment`.
    pub fn write_alignment(&mut self, alignment: usize) {
        let m = self.position() % alignment;
        if m != 0 {
            self.buf.put_bytes(0, alignment - m);
        }
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads and writes [`Value`]s.
///
/// The default methods implement the base format. Implementations that add
/// custom values override `read_value_of_type` and `write_value`, handle
/// their own tags and delegate the rest. Nested values are always read and
/// written through the serializer, so custom values may appear anywhere in
/// a message, including inside lists and maps.
pub trait Serializer {
    /// Extension values understood by this serializer.
    type Custom;

    fn read_value(&self, reader: &mut ByteStreamReader) -> Result<Value<Self::Custom>, DecodeError> {
        let tag = reader.read_byte()?;
        self.read_value_of_type(tag, reader)
    }

    /// Decodes the payload of a value whose tag was just consumed.
    fn read_value_of_type(
        &self,
        tag: u8,
        reader: &mut ByteStreamReader,
    ) -> Result<Value<Self::Custom>, DecodeError> {
        read_standard_value(self, tag, reader)
    }

    fn write_value(
        &self,
        value: &Value<Self::Custom>,
        writer: &mut ByteStreamWriter,
    ) -> Result<(), EncodeError> {
        write_standard_value(self, value, writer)
    }
}

/// Decodes the payload of a base-format value.
///
/// Faults with [`DecodeError::UnknownType`] for tags outside the base format.
pub fn read_standard_value<S: Serializer + ?Sized>(
    serializer: &S,
    tag: u8,
    reader: &mut ByteStreamReader,
) -> Result<Value<S::Custom>, DecodeError> {
    let value = match StandardType::try_from(tag)? {
        StandardType::Null => Value::Null,
        StandardType::True => Value::Bool(true),
        StandardType::False => Value::Bool(false),
        StandardType::Int32 => Value::Int32(reader.read_i32()?),
        StandardType::Int64 => Value::Int64(reader.read_i64()?),
        StandardType::Float64 => {
            reader.read_alignment(8)?;
            Value::Float64(reader.read_f64()?)
        }
        StandardType::String => {
            let len = reader.read_size()?;
            let bytes = reader.read_bytes(len)?;
            Value::String(std::str::from_utf8(&bytes)?.to_owned())
        }
        StandardType::Uint8List => {
            let len = reader.read_size()?;
            Value::Uint8List(reader.read_bytes(len)?)
        }
        StandardType::Int32List => {
            let count = reader.read_size()?;
            reader.read_alignment(4)?;
            let mut raw = reader.read_elements(count, 4)?;
            Value::Int32List((0..count).map(|_| raw.get_i32_le()).collect())
        }
        StandardType::Int64List => {
            let count = reader.read_size()?;
            reader.read_alignment(8)?;
            let mut raw = reader.read_elements(count, 8)?;
            Value::Int64List((0..count).map(|_| raw.get_i64_le()).collect())
        }
        StandardType::Float32List => {
            let count = reader.read_size()?;
            reader.read_alignment(4)?;
            let mut raw = reader.read_elements(count, 4)?;
            Value::Float32List((0..count).map(|_| raw.get_f32_le()).collect())
        }
        StandardType::Float64List => {
            let count = reader.read_size()?;
            reader.read_alignment(8)?;
            let mut raw = reader.read_elements(count, 8)?;
            Value::Float64List((0..count).map(|_| raw.get_f64_le()).collect())
        }
        StandardType::List => {
            let count = reader.read_size()?;
            reader.descend()?;
            // every element takes at least one byte
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(serializer.read_value(reader)?);
            }
            reader.ascend();
            Value::List(items)
        }
        StandardType::Map => {
            let count = reader.read_size()?;
            reader.descend()?;
            let mut entries = Vec::with_capacity(count.min(reader.remaining() / 2));
            for _ in 0..count {
                let key = serializer.read_value(reader)?;
                let value = serializer.read_value(reader)?;
                entries.push((key, value));
            }
            reader.ascend();
            Value::Map(entries)
        }
    };
    Ok(value)
}

/// Encodes a base-format value (tag and payload).
///
/// `Value::Custom` is rejected; serializers that define custom values handle
/// them before delegating here.
pub fn write_standard_value<S: Serializer + ?Sized>(
    serializer: &S,
    value: &Value<S::Custom>,
    writer: &mut ByteStreamWriter,
) -> Result<(), EncodeError> {
    match value {
        Value::Null => writer.write_byte(StandardType::Null as u8),
        Value::Bool(true) => writer.write_byte(StandardType::True as u8),
        Value::Bool(false) => writer.write_byte(StandardType::False as u8),
        Value::Int32(n) => {
            writer.write_byte(StandardType::Int32 as u8);
            writer.write_i32(*n);
        }
        Value::Int64(n) => {
            writer.write_byte(StandardType::Int64 as u8);
            writer.write_i64(*n);
        }
        Value::Float64(n) => {
            writer.write_byte(StandardType::Float64 as u8);
            writer.write_alignment(8);
            writer.write_f64(*n);
        }
        Value::String(s) => {
            writer.write_byte(StandardType::String as u8);
            writer.write_size(s.len())?;
            writer.write_bytes(s.as_bytes());
        }
        Value::Uint8List(bytes) => {
            writer.write_byte(StandardType::Uint8List as u8);
            writer.write_size(bytes.len())?;
            writer.write_bytes(bytes);
        }
        Value::Int32List(items) => {
            writer.write_byte(StandardType::Int32List as u8);
            writer.write_size(items.len())?;
            writer.write_alignment(4);
            items.iter().for_each(|n| writer.write_i32(*n));
        }
        Value::Int64List(items) => {
            writer.write_byte(StandardType::Int64List as u8);
            writer.write_size(items.len())?;
            writer.write_alignment(8);
            items.iter().for_each(|n| writer.write_i64(*n));
        }
        Value::Float32List(items) => {
            writer.write_byte(StandardType::Float32List as u8);
            writer.write_size(items.len())?;
            writer.write_alignment(4);
            items.iter().for_each(|n| writer.write_f32(*n));
        }
        Value::Float64List(items) => {
            writer.write_byte(StandardType::Float64List as u8);
            writer.write_size(items.len())?;
            writer.write_alignment(8);
            items.iter().for_each(|n| writer.write_f64(*n));
        }
        Value::List(items) => {
            writer.write_byte(StandardType::List as u8);
            writer.write_size(items.len())?;
            for item in items {
                serializer.write_value(item, writer)?;
            }
        }
        Value::Map(entries) => {
            writer.write_byte(StandardType::Map as u8);
            writer.write_size(entries.len())?;
            for (key, value) in entries {
                serializer.write_value(key, writer)?;
                serializer.write_value(value, writer)?;
            }
        }
        Value::Custom(_) => return Err(EncodeError::UnsupportedCustomValue),
    }
    Ok(())
}

/// The base format without extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSerializer;

impl Serializer for StandardSerializer {
    type Custom = Infallible;
}

/// Encodes whole messages with a [`Serializer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMessageCodec<S> {
    serializer: S,
}

impl<S> StandardMessageCodec<S> {
    pub const fn new(serializer: S) -> Self {
        Self { serializer }
    }
}

impl<S: Serializer> StandardMessageCodec<S> {
    pub fn encode_message(&self, value: &Value<S::Custom>) -> Result<Bytes, EncodeError> {
        let mut writer = ByteStreamWriter::new();
        self.serializer.write_value(value, &mut writer)?;
        Ok(writer.freeze())
    }

    /// Decodes one complete message.
    ///
    /// An empty message is `null`. Bytes left over after the top-level value
    /// mean the message is corrupt.
    pub fn decode_message(&self, message: Bytes) -> Result<Value<S::Custom>, DecodeError> {
        if message.is_empty() {
            return Ok(Value::Null);
        }
        let mut reader = ByteStreamReader::new(message);
        let value = self.serializer.read_value(&mut reader)?;
        if reader.remaining() > 0 {
            return Err(DecodeError::TrailingBytes(reader.remaining()));
        }
        Ok(value)
    }
}
