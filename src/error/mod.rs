use crate::output::OutputKind;
use rustevg_hal::config::ConfigError;
use rustevg_hal::traits::HalError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    #[error("mapping code {code:#06x} is out of range for {kind} output {id} (max {max:#06x})")]
    InvalidMappingCode {
        kind: OutputKind,
        id: u32,
        code: u16,
        max: u16,
    },
    #[error("register access failed: {0}")]
    RegisterAccess(#[from] HalError),
    #[error("no {kind} output {id} on this card")]
    UnknownOutput { kind: OutputKind, id: u32 },
}

/// Failure to bring up an [`EvgCard`](crate::card::EvgCard).
#[derive(Debug, Error)]
pub enum CardError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{kind} output {id}: {source}")]
    Bind {
        kind: OutputKind,
        id: u32,
        source: HalError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_output() {
        let err = OutputError::InvalidMappingCode {
            kind: OutputKind::FrontPanel,
            id: 3,
            code: 0xFFFF,
            max: 0xFF,
        };
        assert_eq!(
            err.to_string(),
            "mapping code 0xffff is out of range for FrontPanel output 3 (max 0x00ff)"
        );

        let err = OutputError::UnknownOutput {
            kind: OutputKind::Universal,
            id: 99,
        };
        assert_eq!(err.to_string(), "no Universal output 99 on this card");
    }

    #[test]
    fn hal_errors_convert() {
        let err: OutputError = HalError::BusFault(0x402).into();
        assert_eq!(err, OutputError::RegisterAccess(HalError::BusFault(0x402)));
        assert_eq!(err.to_string(), "register access failed: bus fault at offset 0x0402");
    }
}
