use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    #[error("register at offset {offset:#06x} ({width}) lies outside the {len:#06x}-byte window")]
    OutOfBounds {
        offset: usize,
        width: RegisterWidth,
        len: usize,
    },
    #[error("register at offset {offset:#06x} is not aligned for {width} access")]
    Misaligned { offset: usize, width: RegisterWidth },
    #[error("value {value:#06x} does not fit a {width} register")]
    ValueTooWide { value: u16, width: RegisterWidth },
    #[error("bus fault at offset {0:#06x}")]
    BusFault(usize),
}

/// Access width of a single control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterWidth {
    U8,
    U16,
}

impl RegisterWidth {
    pub fn bytes(self) -> usize {
        match self {
            RegisterWidth::U8 => 1,
            RegisterWidth::U16 => 2,
        }
    }

    /// Largest value a store of this width can carry.
    pub fn max_value(self) -> u16 {
        match self {
            RegisterWidth::U8 => u8::MAX as u16,
            RegisterWidth::U16 => u16::MAX,
        }
    }

    pub fn fits(self, value: u16) -> bool {
        value <= self.max_value()
    }
}

impl fmt::Display for RegisterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterWidth::U8 => f.write_str("u8"),
            RegisterWidth::U16 => f.write_str("u16"),
        }
    }
}

/// A single hardware-visible register of fixed width.
///
/// Stores go straight to the device: one call, one access, no buffering.
/// Registers are interior-mutable from the CPU's point of view, so both
/// operations take `&self`.
pub trait RegisterCell {
    fn width(&self) -> RegisterWidth;
    fn read(&self) -> Result<u16, HalError>;
    fn write(&self, value: u16) -> Result<(), HalError>;
}

impl<T: RegisterCell + ?Sized> RegisterCell for &T {
    fn width(&self) -> RegisterWidth {
        (**self).width()
    }
    fn read(&self) -> Result<u16, HalError> {
        (**self).read()
    }
    fn write(&self, value: u16) -> Result<(), HalError> {
        (**self).write(value)
    }
}

/// A byte-addressed register space already mapped by the card driver.
pub trait RegisterWindow {
    /// Size of the mapped space in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load one register. Implementations must reject an access that is not
    /// inside the window or not aligned (see [`check_access`]).
    fn load(&self, offset: usize, width: RegisterWidth) -> Result<u16, HalError>;

    /// Store one register. Same checks as `load`, and `value` must fit `width`.
    fn store(&self, offset: usize, width: RegisterWidth, value: u16) -> Result<(), HalError>;

    /// Bind the register at `offset`. Bounds and alignment are checked up
    /// front so a bad layout fails when outputs are built, not on first write.
    fn register(&self, offset: usize, width: RegisterWidth) -> Result<WindowRegister<'_, Self>, HalError> {
        check_access(self.len(), offset, width)?;
        Ok(WindowRegister {
            window: self,
            offset,
            width,
        })
    }
}

/// Check that a `width` access at `offset` lies inside a `len`-byte window
/// and is naturally aligned.
pub fn check_access(len: usize, offset: usize, width: RegisterWidth) -> Result<(), HalError> {
    let end = offset.checked_add(width.bytes());
    if end.is_none_or(|end| end > len) {
        return Err(HalError::OutOfBounds { offset, width, len });
    }
    if offset % width.bytes() != 0 {
        return Err(HalError::Misaligned { offset, width });
    }
    Ok(())
}

/// Check that `value` can be carried by a `width` store.
pub fn check_value(value: u16, width: RegisterWidth) -> Result<(), HalError> {
    if !width.fits(value) {
        return Err(HalError::ValueTooWide { value, width });
    }
    Ok(())
}

/// Handle to one register inside a [`RegisterWindow`].
///
/// Borrows the window, so it can never outlive the mapping it points into.
#[derive(Debug)]
pub struct WindowRegister<'w, W: RegisterWindow + ?Sized> {
    window: &'w W,
    offset: usize,
    width: RegisterWidth,
}

impl<W: RegisterWindow + ?Sized> WindowRegister<'_, W> {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<W: RegisterWindow + ?Sized> RegisterCell for WindowRegister<'_, W> {
    fn width(&self) -> RegisterWidth {
        self.width
    }

    fn read(&self) -> Result<u16, HalError> {
        self.window.load(self.offset, self.width)
    }

    fn write(&self, value: u16) -> Result<(), HalError> {
        check_value(value, self.width)?;
        self.window.store(self.offset, self.width, value)
    }
}
