//! Byte order aware read and write helpers.
//!
//! These sit on top of [`byteorder`] and pick the byte order at runtime from a [`binrw::Endian`],
//! normally taken from [`crate::Context::endian`].

use std::io::{self, Read, Write};

use binrw::Endian;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::types::{FourCC, Vec3, Vec4};

/// Round `value` up to the next multiple of `alignment`
///
/// An alignment of zero or one leaves the value untouched.
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}

/// Extension methods for reading primitives in a runtime byte order
pub trait ReadCodecExt: Read {
    /// Read a `u16`
    fn read_u16_in(&mut self, endian: Endian) -> io::Result<u16> {
        match endian {
            Endian::Big => self.read_u16::<BigEndian>(),
            Endian::Little => self.read_u16::<LittleEndian>(),
        }
    }

    /// Read a `u32`
    fn read_u32_in(&mut self, endian: Endian) -> io::Result<u32> {
        match endian {
            Endian::Big => self.read_u32::<BigEndian>(),
            Endian::Little => self.read_u32::<LittleEndian>(),
        }
    }

    /// Read a `u64`
    fn read_u64_in(&mut self, endian: Endian) -> io::Result<u64> {
        match endian {
            Endian::Big => self.read_u64::<BigEndian>(),
            Endian::Little => self.read_u64::<LittleEndian>(),
        }
    }

    /// Read a `f32`
    fn read_f32_in(&mut self, endian: Endian) -> io::Result<f32> {
        match endian {
            Endian::Big => self.read_f32::<BigEndian>(),
            Endian::Little => self.read_f32::<LittleEndian>(),
        }
    }

    /// Read three consecutive floats
    fn read_vec3_in(&mut self, endian: Endian) -> io::Result<Vec3> {
        Ok(Vec3 {
            x: self.read_f32_in(endian)?,
            y: self.read_f32_in(endian)?,
            z: self.read_f32_in(endian)?,
        })
    }

    /// Read four consecutive floats
    fn read_vec4_in(&mut self, endian: Endian) -> io::Result<Vec4> {
        Ok(Vec4 {
            x: self.read_f32_in(endian)?,
            y: self.read_f32_in(endian)?,
            z: self.read_f32_in(endian)?,
            w: self.read_f32_in(endian)?,
        })
    }

    /// Read a four character code, which has no byte order
    fn read_fourcc(&mut self) -> io::Result<FourCC> {
        let mut code = [0u8; 4];
        self.read_exact(&mut code)?;
        Ok(FourCC(code))
    }

    /// Read exactly `len` bytes
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read bytes up to and excluding a null terminator
    fn read_cstring(&mut self) -> io::Result<Vec<u8>> {
        let mut raw = Vec::new();
        loop {
            let char = self.read_u8()?;
            if char == b'\0' {
                break;
            }
            raw.push(char);
        }
        Ok(raw)
    }
}

impl<R: Read + ?Sized> ReadCodecExt for R {}

/// Extension methods for writing primitives in a runtime byte order
pub trait WriteCodecExt: Write {
    /// Write a `u16`
    fn write_u16_in(&mut self, value: u16, endian: Endian) -> io::Result<()> {
        match endian {
            Endian::Big => self.write_u16::<BigEndian>(value),
            Endian::Little => self.write_u16::<LittleEndian>(value),
        }
    }

    /// Write a `u32`
    fn write_u32_in(&mut self, value: u32, endian: Endian) -> io::Result<()> {
        match endian {
            Endian::Big => self.write_u32::<BigEndian>(value),
            Endian::Little => self.write_u32::<LittleEndian>(value),
        }
    }

    /// Write a `u64`
    fn write_u64_in(&mut self, value: u64, endian: Endian) -> io::Result<()> {
        match endian {
            Endian::Big => self.write_u64::<BigEndian>(value),
            Endian::Little => self.write_u64::<LittleEndian>(value),
        }
    }

    /// Write a `f32`
    fn write_f32_in(&mut self, value: f32, endian: Endian) -> io::Result<()> {
        match endian {
            Endian::Big => self.write_f32::<BigEndian>(value),
            Endian::Little => self.write_f32::<LittleEndian>(value),
        }
    }

    /// Write three floats
    fn write_vec3_in(&mut self, value: &Vec3, endian: Endian) -> io::Result<()> {
        self.write_f32_in(value.x, endian)?;
        self.write_f32_in(value.y, endian)?;
        self.write_f32_in(value.z, endian)
    }

    /// Write four floats
    fn write_vec4_in(&mut self, value: &Vec4, endian: Endian) -> io::Result<()> {
        self.write_f32_in(value.x, endian)?;
        self.write_f32_in(value.y, endian)?;
        self.write_f32_in(value.z, endian)?;
        self.write_f32_in(value.w, endian)
    }

    /// Write `count` zero bytes
    fn write_zeros(&mut self, count: usize) -> io::Result<()> {
        const ZEROS: [u8; 64] = [0; 64];

        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(ZEROS.len());
            self.write_all(&ZEROS[..chunk])?;
            remaining -= chunk;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteCodecExt for W {}
