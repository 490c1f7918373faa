//! Types for loading and querying the hash dictionary
//!

use std::{
    borrow::Cow,
    collections::{hash_map::Entry, HashMap},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use tracing::{debug, info, instrument};
use winnow::ascii::{hex_uint, space1, till_line_ending};
use winnow::combinator::{alt, opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;

use crate::error::{Error, Result};
use crate::hash::str_code;

/// Reverse lookup from identifier hashes to names
///
/// The dictionary is immutable once loaded and can be shared between threads behind an
/// [`std::sync::Arc`].
///
/// ```no_run
/// fn print_name(hash: u32) -> stage_dict::error::Result<()> {
///     let dictionary = stage_dict::HashDictionary::load(
///         "bin/dictionary.txt",
///         "bin/dictionary-aliases.txt",
///     )?;
///
///     println!("{}", dictionary.resolve(hash));
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct HashDictionary {
    names: HashMap<u64, String>,
    aliases: HashMap<String, String>,
}

fn explicit_entry<'s>(input: &mut &'s str) -> PResult<(u64, &'s str)> {
    (
        preceded(opt(alt(("0x", "0X"))), hex_uint::<_, u64, ContextError>),
        preceded(space1, till_line_ending),
    )
        .parse_next(input)
}

fn alias_entry<'s>(input: &mut &'s str) -> PResult<(&'s str, &'s str)> {
    (
        winnow::token::take_till(1.., (' ', '\t')),
        preceded(space1, till_line_ending),
    )
        .parse_next(input)
}

fn content_lines<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader.lines().enumerate().map(|(i, l)| (i + 1, l))
}

fn is_skipped(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

fn open_table(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::TableNotFound {
            path: path.display().to_string(),
            source,
        })
}

impl HashDictionary {
    /// Load the primary and alias tables from disk
    #[instrument(skip_all, fields(primary = %primary.as_ref().display(), aliases = %aliases.as_ref().display()))]
    pub fn load(primary: impl AsRef<Path>, aliases: impl AsRef<Path>) -> Result<HashDictionary> {
        let dictionary =
            Self::from_readers(open_table(primary.as_ref())?, open_table(aliases.as_ref())?)?;

        info!(
            "loaded {} names and {} aliases",
            dictionary.names.len(),
            dictionary.aliases.len()
        );

        Ok(dictionary)
    }

    /// Build a dictionary from already opened tables
    pub fn from_readers<P: BufRead, A: BufRead>(primary: P, aliases: A) -> Result<HashDictionary> {
        let mut names = HashMap::new();
        for (number, line) in content_lines(primary) {
            let line = line?;
            let line = line.trim();
            if is_skipped(line) {
                continue;
            }

            let (hash, name) = match explicit_entry.parse(line) {
                Ok((hash, name)) => (hash, name.trim()),
                Err(_) => (str_code(line) as u64, line),
            };

            match names.entry(hash) {
                Entry::Occupied(existing) => {
                    debug!(
                        "line {number}: {name} collides with {} for {hash:#x}",
                        existing.get()
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(name.to_owned());
                }
            }
        }

        let mut alias_map = HashMap::new();
        for (number, line) in content_lines(aliases) {
            let line = line?;
            let line = line.trim();
            if is_skipped(line) {
                continue;
            }

            let (canonical, preferred) =
                alias_entry
                    .parse(line)
                    .map_err(|_| Error::InvalidAlias {
                        line: number,
                        content: line.to_owned(),
                    })?;
            alias_map.insert(canonical.to_owned(), preferred.trim().to_owned());
        }

        Ok(HashDictionary {
            names,
            aliases: alias_map,
        })
    }

    /// Number of names in the primary table
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the primary table is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of alias overrides
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Name for a hash with aliases applied, if it is known
    pub fn lookup(&self, hash: impl Into<u64>) -> Option<&str> {
        let name = self.names.get(&hash.into())?;
        Some(
            self.aliases
                .get(name)
                .map(String::as_str)
                .unwrap_or(name.as_str()),
        )
    }

    /// Name for a hash, falling back to the hex form of the hash
    pub fn resolve(&self, hash: impl Into<u64>) -> Cow<'_, str> {
        let hash = hash.into();
        match self.lookup(hash) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(Self::fallback(hash)),
        }
    }

    /// Textual form used for hashes without a name
    pub fn fallback(hash: u64) -> String {
        if hash <= u32::MAX as u64 {
            format!("{hash:08x}")
        } else {
            format!("{hash:016x}")
        }
    }

    /// Find the hash of a name known to the primary table, preferring canonical names
    pub fn hash_of(&self, name: &str) -> Option<u64> {
        let canonical = self
            .aliases
            .iter()
            .find(|(_, preferred)| preferred.as_str() == name)
            .map(|(canonical, _)| canonical.as_str())
            .unwrap_or(name);

        self.names
            .iter()
            .find(|(_, n)| n.as_str() == canonical)
            .map(|(hash, _)| *hash)
    }
}
