//! Output-mapping block of one event generator card.
//!
//! `EvgCard` binds exactly one [`Output`] to every mapping register in the
//! layout. Its routing path (`set_out_map`) takes `&mut self`, so requests
//! routed through one card are serialized. Handles borrowed through
//! `output()`/`outputs()` can still write; callers that use them directly
//! take over the one-writer-per-register rule themselves.

use crate::error::{CardError, OutputError};
use crate::output::{Output, OutputKind};
use rustevg_hal::config::{CardLayout, RegisterBlock};
use rustevg_hal::traits::{RegisterCell, RegisterWindow, WindowRegister};

pub type CardOutput<'w, W> = Output<WindowRegister<'w, W>>;

#[derive(Debug)]
pub struct EvgCard<'w, W: RegisterWindow> {
    front_panel: Vec<CardOutput<'w, W>>,
    universal: Vec<CardOutput<'w, W>>,
}

impl<'w, W: RegisterWindow> EvgCard<'w, W> {
    pub fn new(window: &'w W, layout: &CardLayout) -> Result<Self, CardError> {
        layout.validate()?;
        let front_panel = bind_block(window, &layout.front_panel, OutputKind::FrontPanel)?;
        let universal = bind_block(window, &layout.universal, OutputKind::Universal)?;

        log::info!(
            "EVG outputs bound: {} front panel, {} universal",
            front_panel.len(),
            universal.len()
        );

        Ok(Self {
            front_panel,
            universal,
        })
    }

    pub fn output(&self, kind: OutputKind, id: u32) -> Option<&CardOutput<'w, W>> {
        self.block(kind).get(id as usize)
    }

    pub fn outputs(&self, kind: OutputKind) -> impl Iterator<Item = &CardOutput<'w, W>> {
        self.block(kind).iter()
    }

    /// Route `code` to output `id` of `kind`.
    pub fn set_out_map(&mut self, kind: OutputKind, id: u32, code: u16) -> Result<(), OutputError> {
        let output = self
            .output(kind, id)
            .ok_or(OutputError::UnknownOutput { kind, id })?;

        match output.set_out_map(code) {
            Ok(()) => {
                log::debug!("{kind} output {id} <- {code:#06x}");
                Ok(())
            }
            Err(e) => {
                log::warn!("{kind} output {id}: {e}");
                Err(e)
            }
        }
    }

    /// Current register content of output `id`, read straight from the hardware.
    pub fn read_out_map(&self, kind: OutputKind, id: u32) -> Result<u16, OutputError> {
        let output = self
            .output(kind, id)
            .ok_or(OutputError::UnknownOutput { kind, id })?;
        Ok(output.register().read()?)
    }

    fn block(&self, kind: OutputKind) -> &[CardOutput<'w, W>] {
        match kind {
            OutputKind::FrontPanel => &self.front_panel,
            OutputKind::Universal => &self.universal,
        }
    }
}

fn bind_block<'w, W: RegisterWindow>(
    window: &'w W,
    block: &RegisterBlock,
    kind: OutputKind,
) -> Result<Vec<CardOutput<'w, W>>, CardError> {
    (0..block.count)
        .map(|id| {
            let offset = block.offset_of(id).unwrap_or(usize::MAX);
            let register = window
                .register(offset, block.width())
                .map_err(|source| CardError::Bind { kind, id, source })?;
            Ok(Output::new(id, register, kind).with_max_code(block.max_code))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustevg_hal::sim::SimWindow;
    use rustevg_hal::traits::{HalError, RegisterWidth};

    fn small_layout() -> CardLayout {
        CardLayout::from_toml(
            r#"
window_size = 0x40

[front_panel]
base = 0x00
count = 2

[universal]
base = 0x10
count = 3
width = "u8"
max_code = 0x3f
"#,
        )
        .unwrap()
    }

    #[test]
    fn binds_one_output_per_register() {
        let window = SimWindow::new(0x40);
        let card = EvgCard::new(&window, &small_layout()).unwrap();

        let fp: Vec<_> = card.outputs(OutputKind::FrontPanel).map(|o| o.id()).collect();
        assert_eq!(fp, vec![0, 1]);
        assert_eq!(card.outputs(OutputKind::Universal).count(), 3);
        assert_eq!(card.output(OutputKind::Universal, 2).unwrap().max_code(), 0x3f);
        assert!(card.output(OutputKind::FrontPanel, 2).is_none());
        assert_eq!(window.write_count(), 0);
    }

    #[test]
    fn routes_by_kind_and_id() {
        let window = SimWindow::new(0x40);
        let mut card = EvgCard::new(&window, &small_layout()).unwrap();

        card.set_out_map(OutputKind::FrontPanel, 1, 0x42).unwrap();
        card.set_out_map(OutputKind::Universal, 1, 0x3f).unwrap();

        assert_eq!(window.peek(0x02, RegisterWidth::U16), 0x42);
        assert_eq!(window.peek(0x11, RegisterWidth::U8), 0x3f);
        assert_eq!(window.peek(0x00, RegisterWidth::U16), 0);
        assert_eq!(card.read_out_map(OutputKind::FrontPanel, 1), Ok(0x42));
        assert_eq!(window.write_count(), 2);
    }

    #[test]
    fn rejects_unknown_and_invalid() {
        let window = SimWindow::new(0x40);
        let mut card = EvgCard::new(&window, &small_layout()).unwrap();

        assert_eq!(
            card.set_out_map(OutputKind::FrontPanel, 5, 1),
            Err(OutputError::UnknownOutput {
                kind: OutputKind::FrontPanel,
                id: 5
            })
        );
        assert!(matches!(
            card.set_out_map(OutputKind::Universal, 0, 0x40),
            Err(OutputError::InvalidMappingCode { max: 0x3f, .. })
        ));
        assert_eq!(window.write_count(), 0);
    }

    #[test]
    fn surfaces_bus_faults() {
        let window = SimWindow::new(0x40);
        let mut card = EvgCard::new(&window, &small_layout()).unwrap();
        window.inject_fault(0x10);

        assert_eq!(
            card.set_out_map(OutputKind::Universal, 0, 1),
            Err(OutputError::RegisterAccess(HalError::BusFault(0x10)))
        );
        assert!(card.read_out_map(OutputKind::Universal, 0).is_err());
        assert!(card.set_out_map(OutputKind::Universal, 1, 1).is_ok());
    }

    #[test]
    fn window_smaller_than_layout_fails_to_bind() {
        let window = SimWindow::new(0x08);
        let err = EvgCard::new(&window, &small_layout()).unwrap_err();
        assert!(matches!(
            err,
            CardError::Bind {
                kind: OutputKind::Universal,
                id: 0,
                source: HalError::OutOfBounds { .. }
            }
        ));
    }

    #[test]
    fn default_layout_on_full_window() {
        let window = SimWindow::new(0x1000);
        let mut card = EvgCard::new(&window, &CardLayout::default()).unwrap();
        card.set_out_map(OutputKind::Universal, 15, 0xFF).unwrap();
        assert_eq!(window.peek(0x45e, RegisterWidth::U16), 0xFF);
    }
}
