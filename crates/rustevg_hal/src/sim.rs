//! Simulated register hardware for CI and unit tests.
//!
//! `SimRegister` stands in for one cell, `SimWindow` for a whole mapped
//! register space. Both count the stores that reach them and can be told to
//! fail, so callers can check "exactly one write" and error propagation
//! without a card in the crate.

use crate::traits::{
    HalError, RegisterCell, RegisterWidth, RegisterWindow, check_access, check_value,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct SimRegister {
    value: AtomicU16,
    width: RegisterWidth,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl SimRegister {
    pub fn new(width: RegisterWidth, initial: u16) -> Self {
        Self {
            value: AtomicU16::new(initial & width.max_value()),
            width,
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Current content, bypassing fault injection.
    pub fn value(&self) -> u16 {
        self.value.load(Ordering::SeqCst)
    }

    /// Make subsequent writes report a bus fault (and leave the content alone).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stores that reached the register.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for SimRegister {
    fn default() -> Self {
        Self::new(RegisterWidth::U16, 0)
    }
}

impl RegisterCell for SimRegister {
    fn width(&self) -> RegisterWidth {
        self.width
    }

    fn read(&self) -> Result<u16, HalError> {
        Ok(self.value())
    }

    fn write(&self, value: u16) -> Result<(), HalError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HalError::BusFault(0));
        }
        check_value(value, self.width)?;
        self.value.store(value, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Zero-initialised byte-addressed register space.
///
/// 16-bit registers are stored big-endian, like the MRF form factors expose
/// them on the bus.
#[derive(Debug)]
pub struct SimWindow {
    bytes: Mutex<Vec<u8>>,
    faults: Mutex<HashSet<usize>>,
    writes: AtomicUsize,
}

impl SimWindow {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: Mutex::new(vec![0; len]),
            faults: Mutex::new(HashSet::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Make every access to the register starting at `offset` fail with a bus fault.
    pub fn inject_fault(&self, offset: usize) {
        lock(&self.faults).insert(offset);
    }

    pub fn clear_fault(&self, offset: usize) {
        lock(&self.faults).remove(&offset);
    }

    /// Number of stores that reached the window.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Read raw content without going through a register handle.
    ///
    /// # Panics
    ///
    /// Panics if the register does not lie inside the window.
    pub fn peek(&self, offset: usize, width: RegisterWidth) -> u16 {
        decode(&lock(&self.bytes), offset, width)
    }

    /// Set raw content, e.g. to model power-up state. Not counted as a write.
    ///
    /// # Panics
    ///
    /// Panics if the register does not lie inside the window.
    pub fn preset(&self, offset: usize, width: RegisterWidth, value: u16) {
        encode(&mut lock(&self.bytes), offset, width, value);
    }

    fn check_fault(&self, offset: usize) -> Result<(), HalError> {
        if lock(&self.faults).contains(&offset) {
            return Err(HalError::BusFault(offset));
        }
        Ok(())
    }
}

impl RegisterWindow for SimWindow {
    fn len(&self) -> usize {
        lock(&self.bytes).len()
    }

    fn load(&self, offset: usize, width: RegisterWidth) -> Result<u16, HalError> {
        let bytes = lock(&self.bytes);
        check_access(bytes.len(), offset, width)?;
        self.check_fault(offset)?;
        Ok(decode(&bytes, offset, width))
    }

    fn store(&self, offset: usize, width: RegisterWidth, value: u16) -> Result<(), HalError> {
        let mut bytes = lock(&self.bytes);
        check_access(bytes.len(), offset, width)?;
        check_value(value, width)?;
        self.check_fault(offset)?;
        encode(&mut bytes, offset, width, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn decode(bytes: &[u8], offset: usize, width: RegisterWidth) -> u16 {
    match width {
        RegisterWidth::U8 => bytes[offset] as u16,
        RegisterWidth::U16 => u16::from_be_bytes([bytes[offset], bytes[offset + 1]]),
    }
}

fn encode(bytes: &mut [u8], offset: usize, width: RegisterWidth, value: u16) {
    match width {
        RegisterWidth::U8 => bytes[offset] = value as u8,
        RegisterWidth::U16 => bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_register_counts_writes() {
        let reg = SimRegister::new(RegisterWidth::U8, 7);
        assert_eq!(reg.read().unwrap(), 7);
        assert_eq!(reg.write_count(), 0);

        reg.write(9).unwrap();
        reg.write(9).unwrap();
        assert_eq!(reg.value(), 9);
        assert_eq!(reg.write_count(), 2);
    }

    #[test]
    fn sim_register_fault_keeps_content() {
        let reg = SimRegister::default();
        reg.write(0x55).unwrap();
        reg.fail_writes(true);
        assert_eq!(reg.write(0x66), Err(HalError::BusFault(0)));
        assert_eq!(reg.value(), 0x55);
        assert_eq!(reg.write_count(), 1);

        reg.fail_writes(false);
        reg.write(0x66).unwrap();
        assert_eq!(reg.value(), 0x66);
    }

    #[test]
    fn window_stores_big_endian() {
        let window = SimWindow::new(8);
        let reg = window.register(4, RegisterWidth::U16).unwrap();
        reg.write(0x1234).unwrap();
        assert_eq!(window.peek(4, RegisterWidth::U8), 0x12);
        assert_eq!(window.peek(5, RegisterWidth::U8), 0x34);
        assert_eq!(window.write_count(), 1);
    }

    #[test]
    fn window_fault_injection() {
        let window = SimWindow::new(8);
        window.preset(2, RegisterWidth::U16, 0x00AA);
        let reg = window.register(2, RegisterWidth::U16).unwrap();

        window.inject_fault(2);
        assert_eq!(reg.write(0x0001), Err(HalError::BusFault(2)));
        assert_eq!(reg.read(), Err(HalError::BusFault(2)));
        assert_eq!(window.peek(2, RegisterWidth::U16), 0x00AA);
        assert_eq!(window.write_count(), 0);

        window.clear_fault(2);
        reg.write(0x0001).unwrap();
        assert_eq!(reg.read(), Ok(0x0001));
    }

    #[test]
    fn direct_access_outside_window_is_an_error() {
        let window = SimWindow::new(4);
        assert_eq!(
            window.store(8, RegisterWidth::U16, 1),
            Err(HalError::OutOfBounds {
                offset: 8,
                width: RegisterWidth::U16,
                len: 4
            })
        );
        assert!(window.load(3, RegisterWidth::U16).is_err());
        assert!(matches!(
            window.store(1, RegisterWidth::U16, 1),
            Err(HalError::Misaligned { .. })
        ));
        assert!(matches!(
            window.store(0, RegisterWidth::U8, 0x100),
            Err(HalError::ValueTooWide { .. })
        ));
        assert_eq!(window.write_count(), 0);
        assert_eq!(window.load(2, RegisterWidth::U16), Ok(0));
    }

    #[test]
    fn adjacent_registers_are_independent() {
        let window = SimWindow::new(4);
        let a = window.register(0, RegisterWidth::U16).unwrap();
        let b = window.register(2, RegisterWidth::U16).unwrap();
        a.write(0xFFFF).unwrap();
        b.write(0x0102).unwrap();
        assert_eq!(a.read(), Ok(0xFFFF));
        assert_eq!(b.read(), Ok(0x0102));
    }
}
