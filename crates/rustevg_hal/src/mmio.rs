//! Volatile access to a register space the card driver has already mapped.
//!
//! The window does not map or unmap anything. Whoever created the mapping
//! owns it; the `'m` lifetime ties every register handle to that ownership.

use crate::traits::{HalError, RegisterWidth, RegisterWindow, check_access, check_value};
use std::marker::PhantomData;
use std::ptr::NonNull;

#[derive(Debug)]
pub struct MmioWindow<'m> {
    base: NonNull<u8>,
    len: usize,
    _mapping: PhantomData<&'m mut [u8]>,
}

impl<'m> MmioWindow<'m> {
    /// Wrap a mapped address range.
    ///
    /// # Safety
    ///
    /// `base` must point to `len` bytes of device memory (or ordinary memory)
    /// that stay mapped and valid for reads and writes for `'m`, and must be
    /// aligned to 2 bytes. Nothing else may create references to that range
    /// while the window exists.
    pub unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
        Self {
            base,
            len,
            _mapping: PhantomData,
        }
    }

    /// Use ordinary memory as the register space, e.g. a DMA shadow or a test buffer.
    /// Contents are interpreted in native byte order.
    pub fn from_words(words: &'m mut [u16]) -> Self {
        let len = std::mem::size_of_val(words);
        let base = NonNull::from(words).cast::<u8>();
        // SAFETY: the exclusive borrow covers `len` bytes for `'m` and u16 storage is 2-aligned.
        unsafe { Self::new(base, len) }
    }
}

impl RegisterWindow for MmioWindow<'_> {
    fn len(&self) -> usize {
        self.len
    }

    fn load(&self, offset: usize, width: RegisterWidth) -> Result<u16, HalError> {
        check_access(self.len, offset, width)?;
        // SAFETY: the access lies inside the mapping and is aligned (checked above).
        let value = unsafe {
            let ptr = self.base.as_ptr().add(offset);
            match width {
                RegisterWidth::U8 => ptr.read_volatile() as u16,
                RegisterWidth::U16 => ptr.cast::<u16>().read_volatile(),
            }
        };
        Ok(value)
    }

    fn store(&self, offset: usize, width: RegisterWidth, value: u16) -> Result<(), HalError> {
        check_access(self.len, offset, width)?;
        check_value(value, width)?;
        // SAFETY: as in `load`.
        unsafe {
            let ptr = self.base.as_ptr().add(offset);
            match width {
                RegisterWidth::U8 => ptr.write_volatile(value as u8),
                RegisterWidth::U16 => ptr.cast::<u16>().write_volatile(value),
            }
        }
        log::trace!("mmio store {value:#06x} -> {offset:#06x} ({width})");
        Ok(())
    }
}
