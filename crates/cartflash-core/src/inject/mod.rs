//! ntrboot injection layouts
//!
//! An injection writes a Blowfish key and a FIRM image to fixed flash
//! offsets. Where they go depends on the cart family and, for the R4iSDHC
//! family, on whether the cart is a legacy one. The layout is computed up
//! front so that budget checks happen before any bus traffic and the plan
//! can be shown without touching hardware.

#[cfg(feature = "std")]
mod toml;

use heapless::Vec;

use crate::error::{Error, Result};

/// Length of a Blowfish key blob: P-array followed by the S-boxes
pub const KEY_LEN: usize = 0x1048;
/// Length of the Blowfish P-array at the start of the key
pub const KEY_P_ARRAY_LEN: usize = 0x48;
/// Length of the ROM <=> NOR map table
pub const MAP_TABLE_LEN: usize = 0x100;
/// Length of the FIRM header mirrored by current carts
pub const FIRM_HEADER_LEN: usize = 0x200;
/// Length of the FIRM head mirrored by legacy carts
///
/// Legacy carts read 0x8000-0x10000 from 0x1F8000-0x200000 instead of 0x8000.
pub const LEGACY_FIRM_HEADER_LEN: usize = 0x8200;

/// Upper bound on the number of regions in any layout
pub const MAX_REGIONS: usize = 8;

/// ROM <=> NOR map table written by current R4iSDHC carts
///
/// The first entry maps ROM 1:1 onto NOR; the second is pushed out of reach
/// (0x7FFFFFFF, big-endian).
pub const MAP_TABLE: [u8; MAP_TABLE_LEN] = {
    let mut map = [0u8; MAP_TABLE_LEN];
    map[4] = 0x7F;
    map[5] = 0xFF;
    map[6] = 0xFF;
    map[7] = 0xFF;
    map
};

/// Offsets of the R4iSDHC family
pub mod r4isdhc {
    /// ROM <=> NOR map table
    pub const MAP_TABLE: u32 = 0x40;
    /// Blowfish P-array
    pub const KEY: u32 = 0x1000;
    /// Blowfish P-array mirror
    pub const KEY_MIRROR: u32 = 0x1F1000;
    /// Blowfish S-boxes
    pub const SBOX: u32 = 0x2000;
    /// Blowfish S-boxes mirror
    pub const SBOX_MIRROR: u32 = 0x1F2000;
    /// FIRM image
    pub const FIRM: u32 = 0x7E00;
    /// FIRM header mirror
    pub const FIRM_MIRROR: u32 = 0x1F7E00;
    /// Largest FIRM that does not run into the key mirror
    pub const FIRM_MAX: usize = (KEY_MIRROR - FIRM) as usize;
}

/// Offsets of the R4 SDHC Dual-Core family
pub mod dualcore {
    /// Block holding the encoded key
    pub const KEY_BLOCK: u32 = 0x10000;
    /// Encoded FIRM header, inside the key block
    pub const FIRM_HEADER: u32 = 0x1BE00;
    /// Encoded FIRM body
    pub const FIRM_BODY: u32 = 0x1C0000;
    /// Largest FIRM: the header plus everything up to the end of flash
    pub const FIRM_MAX: usize = super::FIRM_HEADER_LEN + (0x200000 - FIRM_BODY) as usize;
}

/// Where the bytes of a region come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    /// [`MAP_TABLE`]
    MapTable,
    /// `key[start..end]`
    Key {
        /// First byte
        start: usize,
        /// One past the last byte
        end: usize,
    },
    /// `firm[start..end]`
    Firm {
        /// First byte
        start: usize,
        /// One past the last byte
        end: usize,
    },
}

/// One named write of an injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Progress label for this step
    pub name: &'static str,
    /// Flash offset of the first byte
    pub offset: u32,
    /// Source of the bytes
    pub payload: Payload,
    /// Whether the bytes pass through [`crate::cipher::encode`]
    pub encoded: bool,
}

impl Region {
    /// Number of bytes written
    pub fn len(&self) -> usize {
        match self.payload {
            Payload::MapTable => MAP_TABLE_LEN,
            Payload::Key { start, end } | Payload::Firm { start, end } => end - start,
        }
    }

    /// Whether the region writes nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The plain bytes of this region
    ///
    /// `key` and `firm` must be the ones the layout was computed for.
    pub fn bytes<'a>(&self, key: &'a [u8], firm: &'a [u8]) -> &'a [u8] {
        match self.payload {
            Payload::MapTable => &MAP_TABLE,
            Payload::Key { start, end } => &key[start..end],
            Payload::Firm { start, end } => &firm[start..end],
        }
    }
}

/// The ordered writes of one injection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionLayout {
    /// Cart family the layout targets
    pub device: &'static str,
    /// Whether the legacy variant was assumed
    pub legacy: bool,
    /// Size of the FIRM the layout was computed for
    pub firm_len: usize,
    /// Largest FIRM the family accepts
    pub firm_max: usize,
    regions: Vec<Region, MAX_REGIONS>,
}

impl InjectionLayout {
    fn new(device: &'static str, legacy: bool, firm_len: usize, firm_max: usize) -> Result<Self> {
        if firm_len > firm_max {
            log::error!("FIRM too big ({} bytes, max {} bytes)", firm_len, firm_max);
            return Err(Error::SizeExceeded {
                len: firm_len,
                max: firm_max,
            });
        }
        Ok(Self {
            device,
            legacy,
            firm_len,
            firm_max,
            regions: Vec::new(),
        })
    }

    fn push(&mut self, region: Region) {
        // Layouts are built from fixed tables well below MAX_REGIONS
        let _ = self.regions.push(region);
    }

    /// Regions in write order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Layout of the R4iSDHC family
    ///
    /// Legacy carts have no ROM map in NOR and mirror the first 0x8200 FIRM
    /// bytes instead of just the header.
    pub fn r4isdhc(legacy: bool, firm_len: usize) -> Result<Self> {
        let mut layout = Self::new("R4iSDHC family", legacy, firm_len, r4isdhc::FIRM_MAX)?;
        let mirror_len = if legacy {
            LEGACY_FIRM_HEADER_LEN
        } else {
            FIRM_HEADER_LEN
        };
        let p_array = Payload::Key {
            start: 0,
            end: KEY_P_ARRAY_LEN,
        };
        let sboxes = Payload::Key {
            start: KEY_P_ARRAY_LEN,
            end: KEY_LEN,
        };

        if !legacy {
            layout.push(plain("Writing ROM <=> NOR map", r4isdhc::MAP_TABLE, Payload::MapTable));
        }
        layout.push(plain("Writing Blowfish key (1)", r4isdhc::KEY, p_array));
        layout.push(plain("Writing Blowfish key (2)", r4isdhc::KEY_MIRROR, p_array));
        layout.push(plain("Writing Blowfish key (3)", r4isdhc::SBOX, sboxes));
        layout.push(plain("Writing Blowfish key (4)", r4isdhc::SBOX_MIRROR, sboxes));
        layout.push(plain(
            "Writing FIRM (1)",
            r4isdhc::FIRM,
            Payload::Firm {
                start: 0,
                end: firm_len,
            },
        ));
        layout.push(plain(
            "Writing FIRM (2)",
            r4isdhc::FIRM_MIRROR,
            Payload::Firm {
                start: 0,
                end: firm_len.min(mirror_len),
            },
        ));
        Ok(layout)
    }

    /// Layout of the R4 SDHC Dual-Core family
    ///
    /// Everything is obfuscated. The key and the FIRM header share the
    /// 64 KiB block at 0x10000; the FIRM body follows at 0x1C0000.
    pub fn dualcore(firm_len: usize) -> Result<Self> {
        let mut layout = Self::new("R4 SDHC Dual-Core", false, firm_len, dualcore::FIRM_MAX)?;
        layout.push(encoded(
            "Writing Blowfish key",
            dualcore::KEY_BLOCK,
            Payload::Key {
                start: 0,
                end: KEY_LEN,
            },
        ));
        layout.push(encoded(
            "Writing FIRM header",
            dualcore::FIRM_HEADER,
            Payload::Firm {
                start: 0,
                end: firm_len.min(FIRM_HEADER_LEN),
            },
        ));
        if firm_len > FIRM_HEADER_LEN {
            layout.push(encoded(
                "Writing FIRM body",
                dualcore::FIRM_BODY,
                Payload::Firm {
                    start: FIRM_HEADER_LEN,
                    end: firm_len,
                },
            ));
        }
        Ok(layout)
    }
}

fn plain(name: &'static str, offset: u32, payload: Payload) -> Region {
    Region {
        name,
        offset,
        payload,
        encoded: false,
    }
}

fn encoded(name: &'static str, offset: u32, payload: Payload) -> Region {
    Region {
        name,
        offset,
        payload,
        encoded: true,
    }
}

/// Reject key material that does not cover the P-array and S-boxes
pub fn check_key(key: &[u8]) -> Result<()> {
    if key.len() < KEY_LEN {
        log::error!("Blowfish key too short ({} bytes, need {})", key.len(), KEY_LEN);
        return Err(Error::InvalidKey);
    }
    Ok(())
}
