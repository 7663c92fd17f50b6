// SMCD14 holding-register map and float codec
//
// All addresses are word addresses. Floats occupy two consecutive
// registers: the low half-word of the IEEE-754 pattern comes first,
// the high half-word second.

use crate::error::{MotionError, Result};

/// Number of words in the device's holding-register space
pub const REGISTER_SPACE: usize = 1000;

/// Status word bit set while the axis sits at its target
pub const STATUS_IN_POSITION_BIT: u16 = 4;
pub const STATUS_IN_POSITION: u16 = 1 << STATUS_IN_POSITION_BIT;

/// Words per float value
pub const FLOAT_WIDTH: usize = 2;

/// Register addresses for SMCD14
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    // Command area
    MoveType = 0,        // 1 word: 1=absolute, 2=relative
    TargetPosition = 2,  // 2 words (float)
    TargetVelocity = 8,  // 2 words (float)
    MotorEnable = 14,    // 1 word: 0=off, 1=on
    StartRequest = 15,   // 1 word
    StopRequest = 16,    // 1 word
    Status = 17,         // 1 word, bit-flags
    ActualPosition = 18, // 2 words (float), read-only
    ErrorCode = 20,      // 1 word, read-only
    ClearErrorRequest = 22,

    // Mirrored flags, read-only
    RunFlag = 41,
    InPositionFlag = 42,
    EnabledFlag = 43,

    // Parameter area
    Backlash = 72, // 2 words (float)
}

impl Register {
    pub const fn address(self) -> u16 {
        self as u16
    }

    /// Width in words
    pub const fn width(self) -> usize {
        match self {
            Register::TargetPosition
            | Register::TargetVelocity
            | Register::ActualPosition
            | Register::Backlash => FLOAT_WIDTH,
            _ => 1,
        }
    }

    /// Registers that only the device itself updates
    pub const READ_ONLY: [Register; 5] = [
        Register::ActualPosition,
        Register::ErrorCode,
        Register::RunFlag,
        Register::InPositionFlag,
        Register::EnabledFlag,
    ];
}

/// Move type selector written to `Register::MoveType`
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Absolute = 1,
    Relative = 2,
}

impl MoveType {
    /// Anything other than the relative code is treated as absolute
    pub fn from_word(word: u16) -> Self {
        if word == MoveType::Relative as u16 {
            MoveType::Relative
        } else {
            MoveType::Absolute
        }
    }
}

/// Split a float into its two register words, low half first
pub fn encode_f32(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits & 0xFFFF) as u16, (bits >> 16) as u16]
}

/// Join a register pair back into a float, low half first
pub fn join_f32(words: [u16; 2]) -> f32 {
    let [lo, hi] = words;
    f32::from_bits(((hi as u32) << 16) | lo as u32)
}

/// Rebuild a float from registers read off the wire
pub fn decode_f32(words: &[u16]) -> Result<f32> {
    match words {
        [lo, hi] => Ok(join_f32([*lo, *hi])),
        _ => Err(MotionError::InvalidLength {
            expected: FLOAT_WIDTH,
            actual: words.len(),
        }),
    }
}
