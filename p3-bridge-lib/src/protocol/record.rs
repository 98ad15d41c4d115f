//! Parsed P3 records and their outbound JSON envelope.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::protocol::crc::CrcCheck;
use crate::protocol::tables::{self, TypeTag};
use crate::protocol::wire;

/// One typed field extracted from a record body.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub tof: u8,
    pub tof_name: String,
    pub length: u16,
    pub type_tag: TypeTag,
    pub raw: Vec<u8>,
    pub value: Value,
}

/// The parsed result of one frame payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub version: u8,
    pub tor: u16,
    pub tor_name: String,
    pub flags: u16,
    pub fields: Vec<Field>,
    pub crc: CrcCheck,
    pub received_at: DateTime<Utc>,
}

impl Record {
    pub fn is_status(&self) -> bool {
        self.tor == tables::TOR_STATUS
    }

    /// Flat `{name -> value}` convenience map. A duplicate name widens
    /// the slot into an array; later duplicates append to it.
    pub fn decoded(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for field in &self.fields {
            match map.get_mut(&field.tof_name) {
                None => {
                    map.insert(field.tof_name.clone(), field.value.clone());
                }
                Some(Value::Array(values)) => values.push(field.value.clone()),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, field.value.clone()]);
                }
            }
        }
        map
    }

    /// The JSON body POSTed to the backend for this record.
    pub fn envelope(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| {
                json!({
                    "tof": f.tof,
                    "tofName": f.tof_name,
                    "length": f.length,
                    "type": f.type_tag.name(),
                    "value": f.value,
                    "valueType": if f.value.is_string() { "string" } else { "number" },
                    "dataHex": hex::encode(&f.raw),
                    "dataAscii": wire::ascii_preview(&f.raw),
                })
            })
            .collect();
        json!({
            "receivedAt": self.received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            "version": self.version,
            "tor": self.tor,
            "torName": self.tor_name,
            "flags": self.flags,
            "crcOk": self.crc.ok,
            "decoded": Value::Object(self.decoded()),
            "fields": fields,
        })
    }
}
