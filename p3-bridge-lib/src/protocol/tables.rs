//! Static record- and field-name tables for the P3 protocol.
//!
//! Field typing is resolved per `(tor, tof)` pair: the record-specific
//! table wins, then the general transport table, and anything else falls
//! back to the printable heuristic in the parser. Unknown identifiers
//! keep their raw value under a synthetic `tor_0x..` / `tof_0x..` name.

/// Transponder-crossing event; the primary data product.
pub const TOR_PASSING: u16 = 0x0001;
/// Periodic decoder-health record (noise, voltage, temperature, GPS).
pub const TOR_STATUS: u16 = 0x0002;
pub const TOR_VERSION: u16 = 0x0003;
pub const TOR_RESEND: u16 = 0x0004;
pub const TOR_CLEAR_PASSING: u16 = 0x0005;
pub const TOR_WATCHDOG: u16 = 0x0006;
pub const TOR_ERROR: u16 = 0xFFFF;

/// How a field's raw bytes decode into a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    U8,
    U16,
    U32,
    U64,
    I16,
    I32,
    /// Binary identifier rendered as lowercase hex, no integer
    /// interpretation (transponder codes).
    Hex,
    Str,
    /// Untyped data that failed the printable heuristic.
    Bytes,
}

impl TypeTag {
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::U8 => "u8",
            TypeTag::U16 => "u16",
            TypeTag::U32 => "u32",
            TypeTag::U64 => "u64",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::Hex => "hex",
            TypeTag::Str => "string",
            TypeTag::Bytes => "bytes",
        }
    }
}

type TofEntry = (u8, &'static str, TypeTag);

/// Transport-level fields that may appear in any record.
const GENERAL_TOFS: &[TofEntry] = &[
    (0x81, "decoderId", TypeTag::U32),
    (0x83, "controllerId", TypeTag::U32),
    (0x85, "requestId", TypeTag::U64),
];

const PASSING_TOFS: &[TofEntry] = &[
    (0x01, "passingNumber", TypeTag::U32),
    (0x03, "transponder", TypeTag::Hex),
    (0x04, "rtcTime", TypeTag::U64),
    (0x05, "strength", TypeTag::U16),
    (0x06, "hits", TypeTag::U16),
    (0x08, "temperature", TypeTag::I16),
];

const STATUS_TOFS: &[TofEntry] = &[
    (0x01, "noise", TypeTag::U16),
    (0x07, "temperature", TypeTag::I16),
    (0x0A, "inputVoltage", TypeTag::U16),
    (0x0C, "satInUse", TypeTag::U8),
];

const VERSION_TOFS: &[TofEntry] = &[(0x02, "firmwareVersion", TypeTag::Str)];

const ERROR_TOFS: &[TofEntry] = &[
    (0x01, "errorCode", TypeTag::U16),
    (0x02, "message", TypeTag::Str),
];

pub fn tor_name(tor: u16) -> String {
    match tor {
        TOR_PASSING => "passing".to_string(),
        TOR_STATUS => "status".to_string(),
        TOR_VERSION => "version".to_string(),
        TOR_RESEND => "resend".to_string(),
        TOR_CLEAR_PASSING => "clearPassing".to_string(),
        TOR_WATCHDOG => "watchdog".to_string(),
        TOR_ERROR => "error".to_string(),
        other => format!("tor_0x{other:04x}"),
    }
}

pub fn tof_fallback_name(tof: u8) -> String {
    format!("tof_0x{tof:02x}")
}

/// Resolve `(tor, tof)` to a name and type tag. Record-specific entries
/// shadow the general transport table.
pub fn lookup_tof(tor: u16, tof: u8) -> Option<(&'static str, TypeTag)> {
    let specific: &[TofEntry] = match tor {
        TOR_PASSING => PASSING_TOFS,
        TOR_STATUS => STATUS_TOFS,
        TOR_VERSION => VERSION_TOFS,
        TOR_ERROR => ERROR_TOFS,
        _ => &[],
    };
    specific
        .iter()
        .chain(GENERAL_TOFS)
        .find(|&&(id, _, _)| id == tof)
        .map(|&(_, name, tag)| (name, tag))
}
