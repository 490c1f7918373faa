//! String hashing used for identifiers

use crc::{Crc, CRC_32_BZIP2};

const STR_CODE: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// Hash a name the way identifiers are stored in stage files
pub fn str_code(name: &str) -> u32 {
    STR_CODE.checksum(name.as_bytes())
}
