//! Controller table builder.
//!
//! Consumes the board's ordered [`SlotDescriptor`] list, builds one
//! [`SlotConfig`] per valid slot, attaches the right sequencer by slot
//! index, and hands the finished table to the host driver. Runs once,
//! single-threaded, at system init.
//!
//! Failure handling follows two tiers: a descriptor with a bad or
//! duplicate slot index is logged and skipped, while an entry allocation
//! failure aborts the rest of the pass (already-built entries are still
//! registered). Board code observes failures as slots left without a
//! device handle.

use crate::control::{CtrlOffsets, SocVariant};
use crate::sequencer::{AuxClockSequencer, BiasSequencer, SlotSequencer};
use crate::slot::{slot_name, DeviceHandle, SlotConfig, SlotDescriptor};

/// Number of HSMMC controller slots on the supported SoCs.
pub const NR_SLOTS: usize = 3;

/// Host driver registration entry point.
///
/// Takes ownership of the whole table, indexed by slot index − 1, and
/// returns a device handle for every slot it accepted.
pub trait ControllerDriver {
    fn register(
        &mut self,
        slots: [Option<SlotConfig>; NR_SLOTS],
    ) -> [Option<DeviceHandle>; NR_SLOTS];
}

/// Allocation seam for configuration entries.
///
/// Production code uses [`DirectAlloc`]; tests substitute an
/// implementation that fails after a set number of entries to exercise
/// the abort path.
pub trait EntryAlloc {
    /// A fresh zeroed entry, or `None` if no storage is available.
    fn alloc_entry(&mut self) -> Option<SlotConfig>;
}

/// Infallible entry allocation.
#[derive(Debug, Default)]
pub struct DirectAlloc;

impl EntryAlloc for DirectAlloc {
    fn alloc_entry(&mut self) -> Option<SlotConfig> {
        Some(SlotConfig::default())
    }
}

/// Context-loss counter for OMAP3 parts.
///
/// TODO: hook up PRCM context-loss accounting once a PM layer exists;
/// until then the count never advances.
fn context_loss_count() -> u32 {
    0
}

fn context_loss_hook(variant: SocVariant) -> Option<fn() -> u32> {
    match variant {
        SocVariant::Omap34xx | SocVariant::Omap3630 => Some(context_loss_count),
        SocVariant::Omap2430 => None,
    }
}

/// Configure the MMC slots described by `controllers` and register them
/// with `driver`.
///
/// Device handles (and any wire-count clamping) are written back into the
/// descriptors, which is how board code learns what was registered.
pub fn configure_slots<D: ControllerDriver>(
    variant: SocVariant,
    controllers: &mut [SlotDescriptor],
    driver: &mut D,
) {
    configure_slots_with(variant, controllers, &mut DirectAlloc, driver)
}

/// [`configure_slots`] with an explicit entry allocator.
pub fn configure_slots_with<A: EntryAlloc, D: ControllerDriver>(
    variant: SocVariant,
    controllers: &mut [SlotDescriptor],
    alloc: &mut A,
    driver: &mut D,
) {
    let offsets = CtrlOffsets::resolve(variant);
    let mut table: [Option<SlotConfig>; NR_SLOTS] = [None, None, None];

    for c in controllers.iter_mut() {
        let index = c.slot as usize;
        if c.slot == 0 || index > NR_SLOTS {
            debug!("MMC{}: no such controller", c.slot);
            continue;
        }
        if table[index - 1].is_some() {
            debug!("MMC{}: already configured", c.slot);
            continue;
        }

        let Some(mut mmc) = alloc.alloc_entry() else {
            // Fatal to this pass: stop consuming descriptors, but still
            // register what has been built so far.
            error!("MMC{}: cannot allocate slot entry", c.slot);
            break;
        };

        mmc.name = slot_name(c.name, c.slot);
        mmc.nr_slots = 1;
        mmc.wires = c.wires;
        mmc.internal_clock = !c.ext_clock;
        mmc.dma_mask = 0xffff_ffff;
        mmc.get_context_loss = context_loss_hook(variant);
        mmc.cd_pin = c.cd_pin;
        mmc.wp_pin = c.wp_pin;
        mmc.cover = c.cover_only;
        mmc.nonremovable = c.nonremovable;
        mmc.power_saving = c.power_saving;

        // NOTE: slots are expected to have a Vcc regulator set up; until
        // the regulator framework binding lands, the OCR mask stands in
        // for a fixed supply.
        mmc.ocr_mask = c.ocr_mask;

        match c.slot {
            1 => {
                // On-chip level shifting via PBIAS.
                mmc.sequencer = Some(SlotSequencer::SharedBias(BiasSequencer::new(
                    offsets,
                    mmc.internal_clock,
                )));

                // OMAP3630 MMC1 supports only 4-bit.
                if variant == SocVariant::Omap3630 && c.wires > 4 {
                    c.wires = 4;
                    mmc.wires = 4;
                }
            }
            2 | 3 => {
                if c.slot == 2 {
                    if c.ext_clock {
                        c.transceiver = true;
                    }
                    if c.transceiver && c.wires > 4 {
                        c.wires = 4;
                        mmc.wires = 4;
                    }
                }
                // Off-chip level shifting, or none.
                mmc.sequencer = Some(SlotSequencer::AuxClock(AuxClockSequencer::new(
                    offsets,
                    mmc.internal_clock,
                )));
            }
            _ => {
                error!("MMC{}: configuration not supported", c.slot);
                continue;
            }
        }
        table[index - 1] = Some(mmc);
    }

    let devices = driver.register(table);

    // Pass the device handles back to board setup code.
    for c in controllers.iter_mut() {
        let index = c.slot as usize;
        if c.slot == 0 || index > NR_SLOTS {
            continue;
        }
        c.dev = devices[index - 1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingDriver {
        received: Vec<Option<SlotConfig>>,
    }

    impl RecordingDriver {
        fn new() -> Self {
            Self {
                received: Vec::new(),
            }
        }

        fn slot(&self, slot: usize) -> &SlotConfig {
            self.received[slot - 1].as_ref().unwrap()
        }
    }

    impl ControllerDriver for RecordingDriver {
        fn register(
            &mut self,
            slots: [Option<SlotConfig>; NR_SLOTS],
        ) -> [Option<DeviceHandle>; NR_SLOTS] {
            let mut devs = [None; NR_SLOTS];
            for (i, slot) in slots.iter().enumerate() {
                if slot.is_some() {
                    devs[i] = DeviceHandle::new(100 + i as u32 + 1);
                }
            }
            self.received = slots.into_iter().collect();
            devs
        }
    }

    struct CountingAlloc {
        calls: usize,
    }

    impl EntryAlloc for CountingAlloc {
        fn alloc_entry(&mut self) -> Option<SlotConfig> {
            self.calls += 1;
            Some(SlotConfig::default())
        }
    }

    struct FailingAlloc {
        remaining: usize,
    }

    impl EntryAlloc for FailingAlloc {
        fn alloc_entry(&mut self) -> Option<SlotConfig> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            Some(SlotConfig::default())
        }
    }

    fn desc(slot: u8) -> SlotDescriptor {
        SlotDescriptor {
            slot,
            wires: 4,
            ocr_mask: 0x0010_0000,
            ..Default::default()
        }
    }

    #[test]
    fn builds_one_entry_per_slot() {
        let mut controllers = [
            SlotDescriptor {
                name: Some("wl1271"),
                cd_pin: Some(160),
                wp_pin: Some(159),
                cover_only: true,
                nonremovable: true,
                power_saving: true,
                ..desc(1)
            },
            SlotDescriptor {
                ext_clock: true,
                ..desc(2)
            },
            desc(3),
        ];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        let mmc1 = driver.slot(1);
        assert_eq!(mmc1.name.as_str(), "wl1271");
        assert_eq!(mmc1.nr_slots, 1);
        assert_eq!(mmc1.wires, 4);
        assert!(mmc1.internal_clock);
        assert_eq!(mmc1.dma_mask, 0xffff_ffff);
        assert_eq!(mmc1.cd_pin, Some(160));
        assert_eq!(mmc1.wp_pin, Some(159));
        assert!(mmc1.cover);
        assert!(mmc1.nonremovable);
        assert!(mmc1.power_saving);
        assert_eq!(mmc1.ocr_mask, 0x0010_0000);
        assert_eq!(mmc1.get_context_loss.map(|f| f()), Some(0));

        let mmc2 = driver.slot(2);
        assert_eq!(mmc2.name.as_str(), "mmc2slot1");
        assert!(!mmc2.internal_clock);

        assert_eq!(driver.slot(3).name.as_str(), "mmc3slot1");
    }

    #[test]
    fn sequencer_selection_by_slot() {
        let mut controllers = [desc(1), desc(2), desc(3)];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        let seq = |slot: usize| driver.slot(slot).sequencer.unwrap();
        assert!(seq(1).has_after_phase());
        assert!(!seq(2).has_after_phase());
        assert!(!seq(3).has_after_phase());
        assert!(matches!(seq(1), SlotSequencer::SharedBias(_)));
        assert!(matches!(seq(2), SlotSequencer::AuxClock(_)));
        assert!(matches!(seq(3), SlotSequencer::AuxClock(_)));
    }

    #[test]
    fn no_context_loss_hook_on_2430() {
        let mut controllers = [desc(1)];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap2430, &mut controllers, &mut driver);

        assert_eq!(driver.slot(1).get_context_loss, None);
    }

    #[test]
    fn omap3630_clamps_slot1_to_four_wires() {
        let mut controllers = [SlotDescriptor { wires: 8, ..desc(1) }];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap3630, &mut controllers, &mut driver);

        assert_eq!(driver.slot(1).wires, 4);
        // The clamp is visible to board code.
        assert_eq!(controllers[0].wires, 4);
    }

    #[test]
    fn omap34xx_keeps_slot1_wire_count() {
        let mut controllers = [SlotDescriptor { wires: 8, ..desc(1) }];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        assert_eq!(driver.slot(1).wires, 8);
        assert_eq!(controllers[0].wires, 8);
    }

    #[test]
    fn slot2_ext_clock_forces_transceiver_and_clamps() {
        let mut controllers = [SlotDescriptor {
            ext_clock: true,
            wires: 8,
            ..desc(2)
        }];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        assert!(controllers[0].transceiver);
        assert_eq!(controllers[0].wires, 4);
        assert_eq!(driver.slot(2).wires, 4);
        assert!(!driver.slot(2).internal_clock);
    }

    #[test]
    fn slot2_transceiver_four_wires_untouched() {
        let mut controllers = [SlotDescriptor {
            transceiver: true,
            ..desc(2)
        }];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        assert_eq!(driver.slot(2).wires, 4);
    }

    #[test]
    fn slot3_wires_never_clamped() {
        let mut controllers = [SlotDescriptor { wires: 8, ..desc(3) }];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap3630, &mut controllers, &mut driver);

        assert_eq!(driver.slot(3).wires, 8);
    }

    #[test]
    fn duplicate_slot_keeps_first_entry() {
        let mut controllers = [
            SlotDescriptor {
                name: Some("first"),
                ..desc(1)
            },
            SlotDescriptor {
                name: Some("second"),
                ..desc(1)
            },
        ];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        assert_eq!(driver.slot(1).name.as_str(), "first");
        // Both descriptors name a registered slot, so both get the handle.
        assert_eq!(controllers[0].dev, DeviceHandle::new(101));
        assert_eq!(controllers[1].dev, DeviceHandle::new(101));
    }

    #[test]
    fn invalid_slot_indices_never_allocate() {
        let mut controllers = [desc(0), desc(4), desc(255)];
        let mut alloc = CountingAlloc { calls: 0 };
        let mut driver = RecordingDriver::new();

        configure_slots_with(
            SocVariant::Omap34xx,
            &mut controllers,
            &mut alloc,
            &mut driver,
        );

        assert_eq!(alloc.calls, 0);
        assert!(driver.received.iter().all(Option::is_none));
        assert!(controllers.iter().all(|c| c.dev.is_none()));
    }

    #[test]
    fn zero_slot_is_skipped_not_a_terminator() {
        let mut controllers = [desc(1), desc(0), desc(2)];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        assert!(driver.received[0].is_some());
        assert!(driver.received[1].is_some());
        assert!(controllers[2].dev.is_some());
    }

    #[test]
    fn alloc_failure_registers_entries_built_before_it() {
        let mut controllers = [desc(1), desc(2), desc(3)];
        let mut alloc = FailingAlloc { remaining: 2 };
        let mut driver = RecordingDriver::new();

        configure_slots_with(
            SocVariant::Omap34xx,
            &mut controllers,
            &mut alloc,
            &mut driver,
        );

        assert!(driver.received[0].is_some());
        assert!(driver.received[1].is_some());
        assert!(driver.received[2].is_none());
        assert!(controllers[0].dev.is_some());
        assert!(controllers[1].dev.is_some());
        assert_eq!(controllers[2].dev, None);
    }

    #[test]
    fn device_handles_are_copied_back() {
        let mut controllers = [desc(3), desc(1)];
        let mut driver = RecordingDriver::new();

        configure_slots(SocVariant::Omap34xx, &mut controllers, &mut driver);

        assert_eq!(controllers[0].dev, DeviceHandle::new(103));
        assert_eq!(controllers[1].dev, DeviceHandle::new(101));
    }
}
