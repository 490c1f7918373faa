//! Classification of stage files by extension.

use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

/// Container formats that unpack into a directory of further files
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Qar,
    Dar,
    Dlz,
}

impl ContainerKind {
    /// Extension of files of this kind, without the dot
    pub const fn extension(self) -> &'static str {
        match self {
            ContainerKind::Qar => "qar",
            ContainerKind::Dar => "dar",
            ContainerKind::Dlz => "dlz",
        }
    }
}

/// Kind of a stage file, which decides the parser or editor it is routed to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Container archive
    Container(ContainerKind),
    /// Geometry file
    Geom,
    /// Texture slot dictionary
    Txn,
    /// Texture info dictionary
    Dci,
    /// Texture payload store
    Dld,
    /// Text configuration
    Cnf,
    /// Text configuration, name table flavour
    Nni,
    /// Anything else
    Other,
}

impl FileKind {
    /// Classify a file name by its extension, ignoring case
    pub fn from_name(name: &str) -> FileKind {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "qar" => FileKind::Container(ContainerKind::Qar),
            "dar" => FileKind::Container(ContainerKind::Dar),
            "dlz" => FileKind::Container(ContainerKind::Dlz),
            "geom" => FileKind::Geom,
            "txn" => FileKind::Txn,
            "dci" => FileKind::Dci,
            "dld" => FileKind::Dld,
            "cnf" => FileKind::Cnf,
            "nni" => FileKind::Nni,
            _ => FileKind::Other,
        }
    }

    /// The container kind, if this file unpacks into a directory
    pub const fn container(self) -> Option<ContainerKind> {
        match self {
            FileKind::Container(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether the file is plain text that can be edited as such
    pub const fn is_text(self) -> bool {
        matches!(self, FileKind::Cnf | FileKind::Nni)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Container(kind) => kind.extension(),
            FileKind::Geom => "geom",
            FileKind::Txn => "txn",
            FileKind::Dci => "dci",
            FileKind::Dld => "dld",
            FileKind::Cnf => "cnf",
            FileKind::Nni => "nni",
            FileKind::Other => "other",
        };
        f.write_str(name)
    }
}
