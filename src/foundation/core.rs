use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Absolute 0-based frame index in stream order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Inclusive frame-index range; `None` leaves that side unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// First frame to keep (inclusive).
    pub first: Option<u64>,
    /// Last frame to keep (inclusive).
    pub last: Option<u64>,
}

impl FrameRange {
    /// Create a validated range with `first <= last` when both are present.
    pub fn new(first: Option<u64>, last: Option<u64>) -> TimewarpResult<Self> {
        if let (Some(f), Some(l)) = (first, last)
            && f > l
        {
            return Err(TimewarpError::validation(format!(
                "frame range first ({f}) must be <= last ({l})"
            )));
        }
        Ok(Self { first, last })
    }

    /// Range with no bounds on either side.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Return `true` when `idx` falls inside the inclusive bounds.
    pub fn contains(self, idx: FrameIndex) -> bool {
        self.first.is_none_or(|f| idx.0 >= f) && self.last.is_none_or(|l| idx.0 <= l)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> TimewarpResult<Self> {
        if den == 0 {
            return Err(TimewarpError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(TimewarpError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}", self.as_f64())
    }
}

impl FromStr for Fps {
    type Err = TimewarpError;

    /// Accepts `30`, `30000/1001` or `29.97`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((n, d)) = s.split_once('/') {
            let num = n
                .trim()
                .parse::<u32>()
                .map_err(|e| TimewarpError::validation(format!("invalid fps '{s}': {e}")))?;
            let den = d
                .trim()
                .parse::<u32>()
                .map_err(|e| TimewarpError::validation(format!("invalid fps '{s}': {e}")))?;
            return Self::new(num, den);
        }
        if let Ok(num) = s.parse::<u32>() {
            return Self::new(num, 1);
        }
        let v = s
            .parse::<f64>()
            .map_err(|e| TimewarpError::validation(format!("invalid fps '{s}': {e}")))?;
        if !v.is_finite() || v <= 0.0 {
            return Err(TimewarpError::validation(format!("invalid fps '{s}'")));
        }
        Self::new((v * 1000.0).round() as u32, 1000)
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Round both axes down to the nearest even value.
    pub fn even(self) -> Self {
        Self {
            width: self.width & !1,
            height: self.height & !1,
        }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Decode a packed little-endian four-character code into four printable, uppercased characters.
///
/// Bytes outside printable ASCII render as `?`.
pub fn decode_fourcc(packed: u32) -> String {
    packed
        .to_le_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b.to_ascii_uppercase() as char
            } else {
                '?'
            }
        })
        .collect()
}

/// Four-character codec identifier (`H264`, `MJPG`, `XVID`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub fn from_packed(packed: u32) -> Self {
        Self(packed.to_le_bytes())
    }

    pub fn pack(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub fn is_zero(self) -> bool {
        self.pack() == 0
    }
}

impl Default for FourCc {
    fn default() -> Self {
        Self(*b"H264")
    }
}

impl FromStr for FourCc {
    type Err = TimewarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(TimewarpError::validation(format!(
                "codec identifier '{s}' must be exactly four printable ASCII characters"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl TryFrom<String> for FourCc {
    type Error = TimewarpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FourCc> for String {
    fn from(value: FourCc) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode_fourcc(self.pack()))
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

/// Lifecycle of a source or sink handle.
///
/// `Unopened -> Open -> Streaming -> Closed`; any state may jump to `Closed`, nothing leaves it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Unopened,
    Open,
    Streaming,
    Closed,
}

impl StreamState {
    pub fn can_advance_to(self, next: StreamState) -> bool {
        use StreamState::*;
        matches!(
            (self, next),
            (Unopened, Open)
                | (Open, Streaming)
                | (Streaming, Streaming)
                | (Unopened | Open | Streaming, Closed)
        )
    }

    /// Move to `next` if the transition is legal. Returns whether the state changed.
    pub fn advance(&mut self, next: StreamState) -> bool {
        if self.can_advance_to(next) {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn is_closed(self) -> bool {
        self == StreamState::Closed
    }
}
