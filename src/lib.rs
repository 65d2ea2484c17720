#![cfg_attr(not(test), no_std)]
#![doc = "OMAP2/3 HSMMC slot configuration glue."]
#![doc = ""]
#![doc = "Builds the per-slot configuration table consumed by a generic HSMMC"]
#![doc = "host driver, and provides the PBIAS power sequencers the driver"]
#![doc = "invokes around slot power transitions. Register access and delays go"]
#![doc = "through the [`ControlModule`] port implemented by board support code."]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod control;
pub mod init;
pub mod sequencer;
pub mod slot;

pub use control::{ControlModule, CtrlOffsets, SocVariant};
pub use init::{configure_slots, configure_slots_with, ControllerDriver, DirectAlloc, EntryAlloc, NR_SLOTS};
pub use sequencer::{PowerTarget, SlotSequencer, VddLevel};
pub use slot::{DeviceHandle, SlotConfig, SlotDescriptor, NAME_LEN};
