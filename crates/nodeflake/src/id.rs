use core::fmt;

use crate::error::{Error, Result};

/// A 63-bit Snowflake ID carrying a datacenter and worker identity.
///
/// - 1 bit reserved (always zero, so the ID is a non-negative `i64`)
/// - 41 bits timestamp (ms since [`DEFAULT_EPOCH`] or the configured epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21              17 16          12 11             0
///              +--------------+----------------+------------------+--------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter ID (5)| worker ID (5)| sequence (12) |
///              +--------------+----------------+------------------+--------------+---------------+
///              |<--------------------- MSB ------------ 64 bits ------------ LSB ------------------>|
/// ```
///
/// Ordering follows the raw integer, so IDs issued by one generator sort in
/// issue order.
///
/// # Example
///
/// ```
/// use nodeflake::SnowflakeId;
///
/// let id = SnowflakeId::from(1000, 3, 7, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 3);
/// assert_eq!(id.worker_id(), 7);
/// assert_eq!(id.sequence(), 1);
/// ```
///
/// [`DEFAULT_EPOCH`]: crate::DEFAULT_EPOCH
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u32 = 41;

    /// Width of the datacenter ID field.
    pub const DATACENTER_ID_BITS: u32 = 5;

    /// Width of the worker ID field.
    pub const WORKER_ID_BITS: u32 = 5;

    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u32 = 12;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << Self::DATACENTER_ID_BITS) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << Self::WORKER_ID_BITS) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u32 =
        Self::SEQUENCE_BITS + Self::WORKER_ID_BITS + Self::DATACENTER_ID_BITS;

    /// Number of bits to shift the datacenter ID to its correct position (bit
    /// 17).
    pub const DATACENTER_ID_SHIFT: u32 = Self::SEQUENCE_BITS + Self::WORKER_ID_BITS;

    /// Number of bits to shift the worker ID to its correct position (bit 12).
    pub const WORKER_ID_SHIFT: u32 = Self::SEQUENCE_BITS;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u32 = 0;

    /// Packs the four fields into an ID. Out-of-range values are truncated to
    /// their field width.
    pub const fn from(timestamp: u64, datacenter_id: u64, worker_id: u64, sequence: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id = (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Packs the four fields into an ID, asserting in debug builds that each
    /// one fits its field.
    pub fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(
            datacenter_id <= Self::DATACENTER_ID_MASK,
            "datacenter_id overflow"
        );
        debug_assert!(worker_id <= Self::WORKER_ID_MASK, "worker_id overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        Self::from(timestamp, datacenter_id, worker_id, sequence)
    }

    /// Extracts the timestamp from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the maximum possible value for the timestamp field.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Returns the maximum possible value for the datacenter ID field.
    pub const fn max_datacenter_id() -> u64 {
        Self::DATACENTER_ID_MASK
    }

    /// Returns the maximum possible value for the worker ID field.
    pub const fn max_worker_id() -> u64 {
        Self::WORKER_ID_MASK
    }

    /// Returns the maximum possible value for the sequence field.
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Returns the raw packed integer.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a raw packed integer without validation.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the ID as a signed 64-bit integer.
    ///
    /// IDs produced by a generator always have the reserved bit clear, so the
    /// result is non-negative for them.
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Returns `true` if the reserved sign bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >> (u64::BITS - 1) == 0
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }

    /// Returns every field of the ID.
    pub const fn parts(&self) -> SnowflakeParts {
        SnowflakeParts {
            timestamp: self.timestamp(),
            datacenter_id: self.datacenter_id(),
            worker_id: self.worker_id(),
            sequence: self.sequence(),
        }
    }
}

const _: () = assert!(
    SnowflakeId::TIMESTAMP_BITS
        + SnowflakeId::DATACENTER_ID_BITS
        + SnowflakeId::WORKER_ID_BITS
        + SnowflakeId::SEQUENCE_BITS
        == 63
);

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_i64()
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl TryFrom<i64> for SnowflakeId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        if raw < 0 {
            return Err(Error::InvalidId { raw });
        }
        Ok(Self::from_raw(raw as u64))
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("timestamp", Self::TIMESTAMP_BITS, self.timestamp()),
            ("datacenter_id", Self::DATACENTER_ID_BITS, self.datacenter_id()),
            ("worker_id", Self::WORKER_ID_BITS, self.worker_id()),
            ("sequence", Self::SEQUENCE_BITS, self.sequence()),
        ];
        write_bit_layout_debug(f, self.id, &fields)
    }
}

/// Writes a table of the ID's fields with their bit widths, decimal and hex
/// values.
fn write_bit_layout_debug(
    f: &mut fmt::Formatter<'_>,
    raw: u64,
    fields: &[(&str, u32, u64)],
) -> fmt::Result {
    fn center(s: &str, width: usize) -> String {
        let pad = width.saturating_sub(s.len());
        let left = pad / 2;
        format!("{}{}{}", " ".repeat(left), s, " ".repeat(pad - left))
    }

    let rows: Vec<[String; 3]> = fields
        .iter()
        .map(|(name, bits, value)| {
            [
                format!("{name} ({bits})"),
                value.to_string(),
                format!("0x{value:x}"),
            ]
        })
        .collect();

    // Widest cell per column plus padding
    let widths: Vec<usize> = rows
        .iter()
        .map(|row| row.iter().map(String::len).max().unwrap_or(0) + 2)
        .collect();

    writeln!(f, "SnowflakeId {{")?;
    writeln!(f, "    raw id     : 0x{raw:016x} ({raw})")?;
    let border: String = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("+");
    for line in 0..3 {
        let cells: Vec<String> = rows
            .iter()
            .zip(&widths)
            .map(|(row, w)| center(&row[line], *w))
            .collect();
        if line == 1 {
            writeln!(f, "               +{border}+")?;
        }
        let label = ["field", "dec", "hex"][line];
        writeln!(f, "    {label:<10} :|{}|", cells.join("|"))?;
    }
    write!(f, "}}")
}

/// All fields of a decoded [`SnowflakeId`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnowflakeParts {
    /// Milliseconds since the generator's epoch.
    pub timestamp: u64,
    /// Datacenter ID in `[0, 31]`.
    pub datacenter_id: u64,
    /// Worker ID in `[0, 31]`.
    pub worker_id: u64,
    /// Per-millisecond sequence in `[0, 4095]`.
    pub sequence: u64,
}

/// Extracts the `(datacenter_id, worker_id)` pair from a raw ID.
///
/// Total over every 64-bit input: the masks always yield values within
/// `[0, 31]`, whether or not `id` came from a conforming generator.
///
/// ```
/// use nodeflake::{SnowflakeId, decode};
///
/// let id = SnowflakeId::from(123, 4, 5, 6);
/// assert_eq!(decode(id.to_i64()), (4, 5));
/// ```
pub const fn decode(id: i64) -> (u64, u64) {
    let id = SnowflakeId::from_raw(id as u64);
    (id.datacenter_id(), id.worker_id())
}

/// Extracts every field from a raw ID. Total over every 64-bit input.
pub const fn decode_parts(id: i64) -> SnowflakeParts {
    SnowflakeId::from_raw(id as u64).parts()
}
