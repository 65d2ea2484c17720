//! Slot configuration data model.
//!
//! [`SlotDescriptor`] is what board code submits; [`SlotConfig`] is the
//! entry the table builder produces and hands to the host driver.

use core::fmt::Write as _;
use core::num::NonZeroU32;

use heapless::String;

use crate::sequencer::SlotSequencer;

/// Maximum slot name length in bytes. Longer caller-supplied names are
/// silently truncated.
pub const NAME_LEN: usize = 9;

/// Opaque handle to a registered controller device, minted by the host
/// driver and passed back to board code through the descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceHandle(NonZeroU32);

impl DeviceHandle {
    /// Wrap a raw nonzero device identifier.
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// The raw device identifier.
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

/// One controller slot as described by board code.
///
/// `slot` is 1-based. `dev` starts out `None` and receives the device
/// handle once the slot has been registered with the host driver; the
/// builder also writes clamped `wires`/`transceiver` values back here so
/// board code sees the effective configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SlotDescriptor {
    pub slot: u8,
    pub name: Option<&'static str>,
    pub wires: u8,
    pub ext_clock: bool,
    pub cd_pin: Option<u16>,
    pub wp_pin: Option<u16>,
    pub ocr_mask: u32,
    pub cover_only: bool,
    pub nonremovable: bool,
    pub power_saving: bool,
    pub transceiver: bool,
    pub dev: Option<DeviceHandle>,
}

/// Built configuration entry for one slot, owned by the builder until it
/// is handed to the host driver.
///
/// The name is owned by the entry itself, so its lifetime is tied to the
/// entry rather than to any longer-lived table.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SlotConfig {
    pub name: String<NAME_LEN>,
    /// Slots behind this controller. Always 1 in this design.
    pub nr_slots: u8,
    pub wires: u8,
    pub internal_clock: bool,
    pub dma_mask: u32,
    /// PM context-loss counter query, where the platform has one.
    pub get_context_loss: Option<fn() -> u32>,
    pub cd_pin: Option<u16>,
    pub wp_pin: Option<u16>,
    pub cover: bool,
    pub nonremovable: bool,
    pub power_saving: bool,
    pub ocr_mask: u32,
    /// Power sequencing behavior, fixed by slot index at build time.
    pub sequencer: Option<SlotSequencer>,
}

/// Effective slot name: the caller's, truncated to [`NAME_LEN`], or a
/// generated `mmc<slot>slot1`.
pub(crate) fn slot_name(given: Option<&str>, slot: u8) -> String<NAME_LEN> {
    let mut name = String::new();
    match given {
        Some(s) => {
            for ch in s.chars() {
                if name.push(ch).is_err() {
                    break;
                }
            }
        }
        None => {
            // "mmc3slot1" is exactly NAME_LEN bytes; slot has already been
            // validated to a single digit.
            let _ = write!(&mut name, "mmc{}slot1", slot);
        }
    }
    name
}
