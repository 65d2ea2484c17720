//! Power-transition sequencers for the MMC slots.
//!
//! The host driver calls [`SlotSequencer::power_pre`] and
//! [`SlotSequencer::power_post`] symmetrically around every slot power
//! change. Which sequence runs is fixed per slot when the configuration
//! table is built:
//!
//! - MMC1 is level-shifted on-chip through the shared PBIAS cell and needs
//!   the full before/after protocol ([`BiasSequencer`]).
//! - MMC2/MMC3 are level-shifted off-chip (or not at all) and only ever
//!   touch the clock loopback select ([`AuxClockSequencer`]).
//!
//! The driver serializes transitions per slot; these sequences assume no
//! concurrent access to the bias registers.

use crate::control::{
    ControlModule, CtrlOffsets, Devconf0, Devconf1, PbiasLite, ProgIo1, SocVariant,
    CONTROL_DEVCONF0, OMAP343X_CONTROL_PROG_IO1,
};

/// OCR mask bit for 1.65-1.95V. Targets at or below this run the pads in
/// 1.8V mode.
pub const OCR_VDD_165_195: u32 = 1 << 7;
/// OCR mask bit for 3.0-3.1V. Targets at or above this need the 2430
/// active-overwrite workaround.
pub const OCR_VDD_30_31: u32 = 1 << 18;

/// PBIAS settle time after reprogramming, in milliseconds.
pub const PBIAS_SETTLE_MS: u32 = 100;

/// Target card voltage, given as an OCR mask bit index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VddLevel(u8);

impl VddLevel {
    /// Wrap an OCR bit index (0..=31).
    pub const fn new(ocr_bit: u8) -> Self {
        Self(ocr_bit)
    }

    /// Single-bit OCR mask for this level. Out-of-range indices behave as
    /// an empty mask.
    pub const fn mask(self) -> u32 {
        match 1u32.checked_shl(self.0 as u32) {
            Some(mask) => mask,
            None => 0,
        }
    }
}

/// Direction and target of a power transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerTarget {
    Off,
    On { vdd: VddLevel },
}

/// MMC1 sequencer: shared PBIAS bias cell plus clock select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BiasSequencer {
    pub(crate) offsets: CtrlOffsets,
    pub(crate) internal_clock: bool,
}

impl BiasSequencer {
    pub(crate) const fn new(offsets: CtrlOffsets, internal_clock: bool) -> Self {
        Self {
            offsets,
            internal_clock,
        }
    }

    /// Runs before the regulator changes the card supply.
    ///
    /// Powers the bias cell down around the transition; on power-up also
    /// programs the voltage-dependent pad configuration so the cell comes
    /// back in a known state.
    pub fn power_pre(&self, ctrl: &mut impl ControlModule, target: PowerTarget) {
        match target {
            PowerTarget::On { vdd } => {
                if self.offsets.variant == SocVariant::Omap2430 {
                    let mut reg = Devconf1::from_bits_retain(ctrl.read(self.offsets.devconf1));
                    if vdd.mask() >= OCR_VDD_30_31 {
                        reg.insert(Devconf1::MMC1_ACTIVE_OVERWRITE);
                    } else {
                        reg.remove(Devconf1::MMC1_ACTIVE_OVERWRITE);
                    }
                    ctrl.write(self.offsets.devconf1, reg.bits());
                }

                if self.internal_clock {
                    let mut reg = Devconf0::from_bits_retain(ctrl.read(CONTROL_DEVCONF0));
                    reg.insert(Devconf0::MMCSDIO1_ADPCLKISEL);
                    ctrl.write(CONTROL_DEVCONF0, reg.bits());
                }

                let mut reg = PbiasLite::from_bits_retain(ctrl.read(self.offsets.pbias_lite));
                if self.offsets.variant == SocVariant::Omap3630 {
                    // 3630 moved MMC1 pad speed control to PROG_IO1.
                    let mut prog_io =
                        ProgIo1::from_bits_retain(ctrl.read(OMAP343X_CONTROL_PROG_IO1));
                    prog_io.insert(ProgIo1::SDMMC1_SPEEDCTRL);
                    ctrl.write(OMAP343X_CONTROL_PROG_IO1, prog_io.bits());
                } else {
                    reg.insert(PbiasLite::SPEEDCTRL0);
                }
                reg.remove(PbiasLite::PWRDNZ0);
                ctrl.write(self.offsets.pbias_lite, reg.bits());
            }
            PowerTarget::Off => {
                let mut reg = PbiasLite::from_bits_retain(ctrl.read(self.offsets.pbias_lite));
                reg.remove(PbiasLite::PWRDNZ0);
                ctrl.write(self.offsets.pbias_lite, reg.bits());
            }
        }
    }

    /// Runs after the regulator has changed the card supply.
    pub fn power_post(&self, ctrl: &mut impl ControlModule, target: PowerTarget) {
        // PBIAS needs 100ms to settle before its state is trusted.
        ctrl.delay_ms(PBIAS_SETTLE_MS);

        let mut reg = PbiasLite::from_bits_retain(ctrl.read(self.offsets.pbias_lite));
        match target {
            PowerTarget::On { vdd } => {
                reg.insert(PbiasLite::PWRDNZ0 | PbiasLite::SPEEDCTRL0);
                if vdd.mask() <= OCR_VDD_165_195 {
                    reg.remove(PbiasLite::VMODE0);
                } else {
                    reg.insert(PbiasLite::VMODE0);
                }
            }
            PowerTarget::Off => {
                reg.insert(PbiasLite::PWRDNZ0 | PbiasLite::SPEEDCTRL0 | PbiasLite::VMODE0);
            }
        }
        ctrl.write(self.offsets.pbias_lite, reg.bits());
    }
}

/// MMC2/MMC3 sequencer: clock loopback select only, no bias cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AuxClockSequencer {
    pub(crate) devconf1: u16,
    pub(crate) internal_clock: bool,
}

impl AuxClockSequencer {
    pub(crate) const fn new(offsets: CtrlOffsets, internal_clock: bool) -> Self {
        Self {
            devconf1: offsets.devconf1,
            internal_clock,
        }
    }

    /// Runs before power-up. Only MMC2 supports a CLKIN, selected here.
    pub fn power_pre(&self, ctrl: &mut impl ControlModule, target: PowerTarget) {
        if let PowerTarget::On { .. } = target {
            if self.internal_clock {
                let mut reg = Devconf1::from_bits_retain(ctrl.read(self.devconf1));
                reg.insert(Devconf1::MMCSDIO2_ADPCLKISEL);
                ctrl.write(self.devconf1, reg.bits());
            }
        }
    }
}

/// Per-slot sequencing behavior, fixed when the configuration table is
/// built. Replaces the pair of raw hook pointers the host driver would
/// otherwise store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotSequencer {
    /// On-chip level shifting via the shared PBIAS cell (MMC1).
    SharedBias(BiasSequencer),
    /// Off-chip level shifting or none (MMC2/MMC3).
    AuxClock(AuxClockSequencer),
}

impl SlotSequencer {
    /// Hook invoked before a power transition.
    pub fn power_pre(&self, ctrl: &mut impl ControlModule, target: PowerTarget) {
        match self {
            Self::SharedBias(seq) => seq.power_pre(ctrl, target),
            Self::AuxClock(seq) => seq.power_pre(ctrl, target),
        }
    }

    /// Hook invoked after a power transition. A no-op for slots without an
    /// after phase.
    pub fn power_post(&self, ctrl: &mut impl ControlModule, target: PowerTarget) {
        match self {
            Self::SharedBias(seq) => seq.power_post(ctrl, target),
            Self::AuxClock(_) => {}
        }
    }

    /// Whether this slot has any after-transition work at all.
    pub fn has_after_phase(&self) -> bool {
        matches!(self, Self::SharedBias(_))
    }
}
