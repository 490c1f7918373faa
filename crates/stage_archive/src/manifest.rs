//! Manifest written next to the entries of every unpacked container.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::compression::CompressionMethod;
use crate::error::{Error, Result};
use crate::kind::ContainerKind;

/// File name of the manifest inside an unpacked container directory
pub const MANIFEST_NAME: &str = ".manifest.json";

const CHECKSUM: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Checksum recorded for unpacked entry contents
pub fn checksum(data: &[u8]) -> u32 {
    CHECKSUM.checksum(data)
}

/// One entry of an unpacked container, in container order
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    #[serde(default)]
    pub compression: CompressionMethod,
    pub crc32: u32,
}

/// Everything needed to put an unpacked container back together
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub kind: ContainerKind,
    /// File name of the container the directory was unpacked from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(default)]
    pub alignment: u32,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(kind: ContainerKind, alignment: u32) -> Self {
        Self {
            kind,
            source: String::new(),
            alignment,
            entries: Vec::new(),
        }
    }

    /// Record an entry and the checksum of its unpacked bytes
    pub fn push(&mut self, name: impl Into<String>, compression: CompressionMethod, data: &[u8]) {
        self.entries.push(ManifestEntry {
            name: name.into(),
            compression,
            crc32: checksum(data),
        });
    }

    /// Load the manifest of an unpacked container directory
    pub fn load(dir: &Path) -> Result<Manifest> {
        let path = dir.join(MANIFEST_NAME);
        if !path.is_file() {
            return Err(Error::MissingManifest(dir.display().to_string()));
        }

        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    /// Load the manifest of `dir`, which must have been unpacked from `container`
    ///
    /// Manifests without a recorded source are accepted for any container.
    pub fn load_for(dir: &Path, container: &str) -> Result<Manifest> {
        let manifest = Manifest::load(dir)?;
        if !manifest.source.is_empty() && manifest.source != container {
            return Err(Error::DirectoryInUse {
                dir: dir.display().to_string(),
                owner: manifest.source,
            });
        }
        Ok(manifest)
    }

    /// Store the manifest in an unpacked container directory
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join(MANIFEST_NAME), serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::compression::CompressionMethod;
    use crate::error::Result;
    use crate::kind::ContainerKind;
    use crate::manifest::{checksum, Manifest};

    #[test]
    fn standard_checksum() {
        assert_eq!(checksum(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn json_shape() -> Result<()> {
        let mut manifest = Manifest::new(ContainerKind::Qar, 16);
        manifest.push("hello.txt", CompressionMethod::Zlib, b"123456789");

        let json: serde_json::Value = serde_json::to_value(&manifest)?;
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "qar",
                "alignment": 16,
                "entries": [
                    { "name": "hello.txt", "compression": "zlib", "crc32": 0xCBF43926u32 }
                ]
            })
        );

        let back: Manifest = serde_json::from_value(json)?;
        assert_eq!(back, manifest);

        Ok(())
    }

    #[test]
    fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::load(dir.path()).is_err());
    }
}
