use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};
use crate::format::EXTENDED_HEADER_LEN;
use crate::io::{ReadLeExt, WriteLeExt};
use crate::types::CpuState;

/// Fixed `.z80` header, field for field in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Z80Header {
    pub a: u8,
    pub f: u8,
    pub bc: u16,
    pub hl: u16,
    /// Zero when an extended header follows.
    pub version: u16,
    pub sp: u16,
    pub i: u8,
    /// Low 7 bits of R.
    pub r: u8,
    /// Bit 0: bit 7 of R. Bits 1-3: border color.
    pub flags1: u8,
    pub de: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub a_alt: u8,
    pub f_alt: u8,
    pub iy: u16,
    pub ix: u16,
    pub iff1: u8,
    pub iff2: u8,
    /// Bits 0-1: interrupt mode.
    pub flags2: u8,
    pub extended_len: u16,
    pub pc: u16,
}

impl Z80Header {
    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            a: r.read_u8()?,
            f: r.read_u8()?,
            bc: r.read_u16_le()?,
            hl: r.read_u16_le()?,
            version: r.read_u16_le()?,
            sp: r.read_u16_le()?,
            i: r.read_u8()?,
            r: r.read_u8()?,
            flags1: r.read_u8()?,
            de: r.read_u16_le()?,
            bc_alt: r.read_u16_le()?,
            de_alt: r.read_u16_le()?,
            hl_alt: r.read_u16_le()?,
            a_alt: r.read_u8()?,
            f_alt: r.read_u8()?,
            iy: r.read_u16_le()?,
            ix: r.read_u16_le()?,
            iff1: r.read_u8()?,
            iff2: r.read_u8()?,
            flags2: r.read_u8()?,
            extended_len: r.read_u16_le()?,
            pc: r.read_u16_le()?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u8(self.a)?;
        w.write_u8(self.f)?;
        w.write_u16_le(self.bc)?;
        w.write_u16_le(self.hl)?;
        w.write_u16_le(self.version)?;
        w.write_u16_le(self.sp)?;
        w.write_u8(self.i)?;
        w.write_u8(self.r)?;
        w.write_u8(self.flags1)?;
        w.write_u16_le(self.de)?;
        w.write_u16_le(self.bc_alt)?;
        w.write_u16_le(self.de_alt)?;
        w.write_u16_le(self.hl_alt)?;
        w.write_u8(self.a_alt)?;
        w.write_u8(self.f_alt)?;
        w.write_u16_le(self.iy)?;
        w.write_u16_le(self.ix)?;
        w.write_u8(self.iff1)?;
        w.write_u8(self.iff2)?;
        w.write_u8(self.flags2)?;
        w.write_u16_le(self.extended_len)?;
        w.write_u16_le(self.pc)?;
        Ok(())
    }

    /// Builds the header for `cpu` with the given 3-bit border color.
    pub fn pack(cpu: &CpuState, border: u8) -> Self {
        let [a, f] = cpu.af.to_be_bytes();
        let [a_alt, f_alt] = cpu.af_alt.to_be_bytes();
        Self {
            a,
            f,
            bc: cpu.bc,
            hl: cpu.hl,
            version: 0,
            sp: cpu.sp,
            i: cpu.i,
            r: cpu.r,
            flags1: (cpu.r >> 7) | ((border & 0x07) << 1),
            de: cpu.de,
            bc_alt: cpu.bc_alt,
            de_alt: cpu.de_alt,
            hl_alt: cpu.hl_alt,
            a_alt,
            f_alt,
            iy: cpu.iy,
            ix: cpu.ix,
            iff1: cpu.iff1 as u8,
            iff2: cpu.iff2 as u8,
            flags2: cpu.im & 0x03,
            extended_len: EXTENDED_HEADER_LEN,
            pc: cpu.pc,
        }
    }

    /// Rejects header variants other than the 48K extended header.
    pub fn validate(&self) -> Result<()> {
        if self.extended_len != EXTENDED_HEADER_LEN {
            return Err(SnapshotError::UnsupportedHeaderLength(self.extended_len));
        }
        Ok(())
    }

    /// `flags1` with the legacy `0xFF` value read as `0x01`.
    pub fn normalized_flags1(&self) -> u8 {
        if self.flags1 == 0xFF {
            0x01
        } else {
            self.flags1
        }
    }

    pub fn border_color(&self) -> u8 {
        (self.normalized_flags1() >> 1) & 0x07
    }

    pub fn cpu_state(&self) -> CpuState {
        CpuState {
            af: u16::from_be_bytes([self.a, self.f]),
            bc: self.bc,
            de: self.de,
            hl: self.hl,
            af_alt: u16::from_be_bytes([self.a_alt, self.f_alt]),
            bc_alt: self.bc_alt,
            de_alt: self.de_alt,
            hl_alt: self.hl_alt,
            ix: self.ix,
            iy: self.iy,
            sp: self.sp,
            pc: self.pc,
            i: self.i,
            r: (self.r & 0x7F) | ((self.normalized_flags1() & 0x01) << 7),
            iff1: self.iff1 != 0,
            iff2: self.iff2 != 0,
            im: self.flags2 & 0x03,
        }
    }
}
