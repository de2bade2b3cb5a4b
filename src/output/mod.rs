//! One output pin of the event generator and its mapping register.
//!
//! The mapping register selects which internal event or signal drives the
//! pin. An [`Output`] is bound to that register for its whole life and is the
//! only path through which the selector is written.

use crate::error::OutputError;
use rustevg_hal::traits::RegisterCell;
use std::fmt;

/// Connector family an output id belongs to. Front-panel and universal ids
/// are independent, zero-based sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    FrontPanel,
    Universal,
}

/// Highest mapping code accepted when the card layout does not say otherwise.
/// Both kinds share it; per-kind limits come from the layout.
pub const DEFAULT_MAX_CODE: u16 = 0xFF;

impl OutputKind {
    pub const ALL: [OutputKind; 2] = [OutputKind::FrontPanel, OutputKind::Universal];
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::FrontPanel => f.write_str("FrontPanel"),
            OutputKind::Universal => f.write_str("Universal"),
        }
    }
}

/// An output bound to its mapping register.
///
/// `R` is a non-owning register handle supplied by the card driver (a borrow
/// of a cell, or a handle into a mapped window). Its lifetime keeps the
/// output from outliving the mapping. Building or dropping an `Output`
/// never touches the hardware.
#[derive(Debug)]
pub struct Output<R: RegisterCell> {
    id: u32,
    kind: OutputKind,
    register: R,
    max_code: u16,
}

impl<R: RegisterCell> Output<R> {
    pub fn new(id: u32, register: R, kind: OutputKind) -> Self {
        let max_code = DEFAULT_MAX_CODE.min(register.width().max_value());
        Self {
            id,
            kind,
            register,
            max_code,
        }
    }

    /// Set the highest valid mapping code, clamped to what the register can hold.
    pub fn with_max_code(mut self, max_code: u16) -> Self {
        self.max_code = max_code.min(self.register.width().max_value());
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> OutputKind {
        self.kind
    }

    pub fn max_code(&self) -> u16 {
        self.max_code
    }

    /// The bound register handle. Reading it is how callers learn the current
    /// mapping; the output itself keeps no copy.
    pub fn register(&self) -> &R {
        &self.register
    }

    /// Route mapping code `code` to this output.
    ///
    /// Issues exactly one store to the mapping register, or none when the
    /// code is rejected. Nothing is cached and nothing is retried.
    pub fn set_out_map(&self, code: u16) -> Result<(), OutputError> {
        if code > self.max_code {
            return Err(OutputError::InvalidMappingCode {
                kind: self.kind,
                id: self.id,
                code,
                max: self.max_code,
            });
        }
        self.register.write(code)?;
        log::trace!("{} output {} mapped to {code:#06x}", self.kind, self.id);
        Ok(())
    }
}
