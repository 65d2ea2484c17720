//! System Control Module (SCM) access for MMC slot configuration.
//!
//! The SCM pad/bias registers live outside the HSMMC controller itself.
//! Which offsets apply depends on the SoC family, resolved once at init
//! time into a [`CtrlOffsets`] value that the sequencers carry around.
//! Actual register access goes through the [`ControlModule`] port so that
//! board support code owns the mapping (and host tests can record it).

use bitflags::bitflags;
use embedded_hal::delay::DelayNs;

/// DEVCONF0 offset, common to all supported variants.
pub const CONTROL_DEVCONF0: u16 = 0x274;

/// OMAP2430 PBIAS_LITE offset.
pub const OMAP243X_CONTROL_PBIAS_LITE: u16 = 0x230;
/// OMAP2430 DEVCONF1 offset.
pub const OMAP243X_CONTROL_DEVCONF1: u16 = 0x278;

/// OMAP34xx/36xx PBIAS_LITE offset.
pub const OMAP343X_CONTROL_PBIAS_LITE: u16 = 0x2b0;
/// OMAP34xx/36xx DEVCONF1 offset.
pub const OMAP343X_CONTROL_DEVCONF1: u16 = 0x2d8;
/// OMAP34xx/36xx PROG_IO1 offset (pad speed control lives here on 3630).
pub const OMAP343X_CONTROL_PROG_IO1: u16 = 0x444;

bitflags! {
    /// CONTROL_PBIAS_LITE bits for the MMC1 bias cell.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PbiasLite: u32 {
        /// I/O voltage mode: set for 3.0V, clear for 1.8V.
        const VMODE0 = 1 << 0;
        /// Bias cell power-down, active low.
        const PWRDNZ0 = 1 << 1;
        /// High-speed I/O on the MMC1 pads.
        const SPEEDCTRL0 = 1 << 2;
    }

    /// CONTROL_DEVCONF0 bits used by MMC1.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Devconf0: u32 {
        /// MMC1 clock loopback: feed the internally generated clock back in.
        const MMCSDIO1_ADPCLKISEL = 1 << 24;
    }

    /// CONTROL_DEVCONF1 bits used by MMC1/MMC2.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Devconf1: u32 {
        /// MMC2 clock loopback select.
        const MMCSDIO2_ADPCLKISEL = 1 << 6;
        /// MMC1 active overwrite (2430 only), required for 3.0V cards.
        const MMC1_ACTIVE_OVERWRITE = 1 << 31;
    }

    /// CONTROL_PROG_IO1 bits (3630 only).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ProgIo1: u32 {
        /// SDMMC1 pads at 52MHz.
        const SDMMC1_SPEEDCTRL = 1 << 20;
    }
}

/// SoC variant, as identified by platform detection at boot.
///
/// OMAP3630 is an OMAP3 for offset purposes but routes MMC1 pad speed
/// control through PROG_IO1 instead of the PBIAS register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocVariant {
    Omap2430,
    Omap34xx,
    Omap3630,
}

/// SCM offsets that differ between the OMAP2430 and OMAP3 families.
///
/// Resolved once per init call and threaded into the sequencers; there is
/// no global offset state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CtrlOffsets {
    pub variant: SocVariant,
    pub pbias_lite: u16,
    pub devconf1: u16,
}

impl CtrlOffsets {
    /// Select the offset pair for `variant`. Infallible: every supported
    /// variant maps to exactly one pair.
    pub const fn resolve(variant: SocVariant) -> Self {
        match variant {
            SocVariant::Omap2430 => Self {
                variant,
                pbias_lite: OMAP243X_CONTROL_PBIAS_LITE,
                devconf1: OMAP243X_CONTROL_DEVCONF1,
            },
            SocVariant::Omap34xx | SocVariant::Omap3630 => Self {
                variant,
                pbias_lite: OMAP343X_CONTROL_PBIAS_LITE,
                devconf1: OMAP343X_CONTROL_DEVCONF1,
            },
        }
    }
}

/// Port to the System Control Module register file.
///
/// Offsets are relative to the SCM base, matching the TRM register maps.
/// The [`DelayNs`] supertrait supplies the settle delays the sequencers
/// need between bias reprogramming steps.
pub trait ControlModule: DelayNs {
    /// Read a 32-bit SCM register.
    fn read(&mut self, offset: u16) -> u32;
    /// Write a 32-bit SCM register.
    fn write(&mut self, offset: u16, value: u32);
}
