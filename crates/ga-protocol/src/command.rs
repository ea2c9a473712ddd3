//! The 13 command IDs, written as the first little-endian `int32` of every
//! frame's payload.

use ga_error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    HelperHello = 1,
    ClientHello = 2,
    Busy = 3,
    Accept = 4,
    Keepalive = 5,
    Factory = 6,
    Result = 7,
    NoHelpers = 8,
    Calculate = 9,
    Fitness = 10,
    FactoryResult = 11,
    CurrentBest = 12,
    GenerationInfo = 13,
}

impl CommandId {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            1 => Self::HelperHello,
            2 => Self::ClientHello,
            3 => Self::Busy,
            4 => Self::Accept,
            5 => Self::Keepalive,
            6 => Self::Factory,
            7 => Self::Result,
            8 => Self::NoHelpers,
            9 => Self::Calculate,
            10 => Self::Fitness,
            11 => Self::FactoryResult,
            12 => Self::CurrentBest,
            13 => Self::GenerationInfo,
            other => ga_error::ga_bail!(Protocol: "unknown command id {}", other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_command() {
        for id in 1..=13 {
            let command = CommandId::from_i32(id).unwrap();
            assert_eq!(command.as_i32(), id);
        }
    }

    #[test]
    fn rejects_unknown_ids() {
        assert!(CommandId::from_i32(0).is_err());
        assert!(CommandId::from_i32(14).is_err());
    }
}
