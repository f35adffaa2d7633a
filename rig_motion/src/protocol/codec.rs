//! Word-level encoding: split floats, the axis status word and command codes.

use bitflags::bitflags;

/// Split an IEEE-754 single into `[low, high]` register words.
///
/// The low-order half goes to the first address, the high-order half to
/// the next one.
#[inline]
pub const fn encode_float(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits & 0xFFFF) as u16, (bits >> 16) as u16]
}

/// Inverse of [`encode_float`]. NaN and infinities pass through unchanged.
#[inline]
pub const fn decode_float(words: [u16; 2]) -> f32 {
    f32::from_bits((words[0] as u32) | ((words[1] as u32) << 16))
}

bitflags! {
    /// Raw per-axis status word.
    ///
    /// Bit 2 is a standstill flag: the axis is moving while it is clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusWord: u16 {
        /// Drive enabled.
        const ENABLED    = 0x0001;
        /// Homing completed.
        const REFERENCED = 0x0002;
        /// Axis at rest.
        const STANDSTILL = 0x0004;
    }
}

impl Default for StatusWord {
    fn default() -> Self {
        Self::STANDSTILL
    }
}

/// Decoded status flags of one axis, valid for a single read only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisStatus {
    pub enabled: bool,
    pub referenced: bool,
    pub moving: bool,
}

impl AxisStatus {
    /// Decode a status register value. Unknown bits are ignored.
    pub const fn from_word(word: u16) -> Self {
        let flags = StatusWord::from_bits_truncate(word);
        Self {
            enabled: flags.contains(StatusWord::ENABLED),
            referenced: flags.contains(StatusWord::REFERENCED),
            moving: !flags.contains(StatusWord::STANDSTILL),
        }
    }

    /// Encode back into a status register value.
    pub const fn to_word(self) -> u16 {
        let mut bits = 0;
        if self.enabled {
            bits |= StatusWord::ENABLED.bits();
        }
        if self.referenced {
            bits |= StatusWord::REFERENCED.bits();
        }
        if !self.moving {
            bits |= StatusWord::STANDSTILL.bits();
        }
        bits
    }
}

/// Code written to an axis command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandCode {
    /// Clear the command register.
    Reset = 0,
    Enable = 10,
    Reference = 20,
    Cancel = 80,
    EmergencyStop = 90,
    Disable = 99,
    IncrementalMove = 100,
    AbsoluteMove = 101,
}

impl CommandCode {
    #[inline]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Reset),
            10 => Some(Self::Enable),
            20 => Some(Self::Reference),
            80 => Some(Self::Cancel),
            90 => Some(Self::EmergencyStop),
            99 => Some(Self::Disable),
            100 => Some(Self::IncrementalMove),
            101 => Some(Self::AbsoluteMove),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Move code for the given addressing mode.
    #[inline]
    pub const fn for_move(absolute: bool) -> Self {
        if absolute {
            Self::AbsoluteMove
        } else {
            Self::IncrementalMove
        }
    }

    /// True for the two move codes.
    pub const fn is_move(self) -> bool {
        matches!(self, Self::IncrementalMove | Self::AbsoluteMove)
    }
}
