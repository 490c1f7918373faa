//! Small value types shared by the geometry and texture formats.

use std::{fmt, str::FromStr};

use binrw::{BinRead, BinWrite};

use crate::error::Error;

/// Three component vector
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Four component vector, used for positions where `w` carries orientation
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const ZERO: Vec4 = Vec4::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// True when every component compares equal to zero
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0 && self.w == 0.0
    }

    /// Raw bit patterns, for comparisons that must be exact
    pub fn to_bits(&self) -> [u32; 4] {
        [
            self.x.to_bits(),
            self.y.to_bits(),
            self.z.to_bits(),
            self.w.to_bits(),
        ]
    }

    fn zip_with(&self, other: &Vec4, f: impl Fn(f32, f32) -> f32) -> Vec4 {
        Vec4::new(
            f(self.x, other.x),
            f(self.y, other.y),
            f(self.z, other.z),
            f(self.w, other.w),
        )
    }
}

/// Axis aligned bounding box
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec4,
    pub max: Vec4,
}

impl Aabb {
    pub const fn new(min: Vec4, max: Vec4) -> Self {
        Self { min, max }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.zip_with(&other.min, f32::min),
            max: self.max.zip_with(&other.max, f32::max),
        }
    }

    /// Centre of the box
    pub fn center(&self) -> Vec4 {
        self.min.zip_with(&self.max, |a, b| (a + b) / 2.0)
    }
}

/// Four character code, e.g. the compression format of a texture
#[derive(BinRead, BinWrite, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const DXT1: FourCC = FourCC(*b"DXT1");
    pub const DXT3: FourCC = FourCC(*b"DXT3");
    pub const DXT5: FourCC = FourCC(*b"DXT5");

    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.0);
        f.write_str(text.trim_end_matches('\0'))
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({:?})", self.to_string())
    }
}

impl FromStr for FourCC {
    type Err = Error;

    /// Codes shorter than four bytes are padded with nulls
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(Error::Format(format!("invalid four character code {s:?}")));
        }

        let mut code = [0u8; 4];
        code[..bytes.len()].copy_from_slice(bytes);
        Ok(FourCC(code))
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite, Endian};
    use pretty_assertions::assert_eq;

    use crate::types::{Aabb, FourCC, Vec4};

    #[test]
    fn zero_vector() {
        assert!(Vec4::ZERO.is_zero());
        assert!(Vec4::new(-0.0, 0.0, 0.0, 0.0).is_zero());
        assert!(!Vec4::new(0.0, 0.0, 0.0, 1.0).is_zero());
    }

    #[test]
    fn aabb_union() {
        let a = Aabb::new(Vec4::new(0.0, 0.0, 0.0, 0.0), Vec4::new(1.0, 1.0, 1.0, 0.0));
        let b = Aabb::new(Vec4::new(-1.0, 2.0, 0.5, 0.0), Vec4::new(0.5, 3.0, 4.0, 0.0));

        let union = a.union(&b);
        assert_eq!(union.min, Vec4::new(-1.0, 0.0, 0.0, 0.0));
        assert_eq!(union.max, Vec4::new(1.0, 3.0, 4.0, 0.0));
        assert_eq!(union.center(), Vec4::new(0.0, 1.5, 2.0, 0.0));
    }

    #[test]
    fn binrw_uses_runtime_endian() {
        let value = Vec4::new(1.0, 0.0, 0.0, 0.0);

        let mut big = Cursor::new(Vec::new());
        value.write_options(&mut big, Endian::Big, ()).unwrap();
        assert_eq!(&big.get_ref()[..4], &[0x3F, 0x80, 0x00, 0x00]);

        let mut little = Cursor::new(Vec::new());
        value.write_options(&mut little, Endian::Little, ()).unwrap();
        assert_eq!(&little.get_ref()[..4], &[0x00, 0x00, 0x80, 0x3F]);

        little.set_position(0);
        let read = Vec4::read_options(&mut little, Endian::Little, ()).unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn fourcc_text() {
        assert_eq!("DXT1".parse::<FourCC>().unwrap(), FourCC::DXT1);
        assert_eq!("AB".parse::<FourCC>().unwrap(), FourCC(*b"AB\0\0"));
        assert_eq!(FourCC(*b"AB\0\0").to_string(), "AB");
        assert!("TOOLONG".parse::<FourCC>().is_err());
    }
}
