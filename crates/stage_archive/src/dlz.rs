//! DLZ payload wrapper
//!
//! A `.dlz` file is a bare zlib stream around a DLD payload store. Unpacking inflates it next to
//! the other unpacked files as `<stem>.dld`.

use crate::compression::{deflate, inflate};
use crate::error::{Error, Result};

/// Inflate a DLZ file into the DLD it wraps
pub fn unwrap_dlz(data: &[u8]) -> Result<Vec<u8>> {
    inflate(data).map_err(|e| Error::corrupt("dlz", e))
}

/// Wrap a DLD into a DLZ file
pub fn wrap_dlz(dld: &[u8]) -> Result<Vec<u8>> {
    deflate(dld)
}

/// Name of the payload store unpacked from a DLZ file
pub fn dld_name(dlz_name: &str) -> String {
    let stem = dlz_name.strip_suffix(".dlz").unwrap_or(dlz_name);
    format!("{stem}.dld")
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::dlz::{dld_name, unwrap_dlz, wrap_dlz};
    use crate::error::{Error, Result};

    #[test]
    fn wrap_then_unwrap() -> Result<()> {
        let dld = b"DLD\0\0\0\0\x01".to_vec();
        assert_eq!(unwrap_dlz(&wrap_dlz(&dld)?)?, dld);
        Ok(())
    }

    #[test]
    fn garbage_is_corrupt() {
        let result = unwrap_dlz(b"not zlib at all");
        assert!(matches!(result, Err(Error::CorruptArchive { .. })));
    }

    #[test]
    fn payload_name() {
        assert_eq!(dld_name("tex_main.dlz"), "tex_main.dld");
        assert_eq!(dld_name("plain"), "plain.dld");
    }
}
