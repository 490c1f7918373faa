//! # Hash Dictionary Documentation
//!
//! Stage packages never store names, only hashes of them. This crate reverses those hashes
//! using two line oriented text tables shipped next to the tool.
//!
//! ## Primary table
//!
//! One entry per line. A line is either
//!
//! | Form                | Example                          | Meaning                                  |
//! |---------------------|----------------------------------|------------------------------------------|
//! | `name`              | `PRP_STAGE_CENTER`               | hash is computed with [`str_code`]       |
//! | `hash name`         | `0x9a3f00c1 PRP_STAGE_CENTER`    | hash given in hex, 32 or 64 bits         |
//!
//! Empty lines and lines starting with `#` are ignored. When two lines produce the same hash
//! the first one is kept.
//!
//! ## Alias table
//!
//! Each line holds `canonical preferred`. Whenever a hash resolves to `canonical`, `preferred`
//! is returned instead. Aliases are applied once, so resolving is idempotent.
//!
//! ## Fallback
//!
//! A hash that is not in the table resolves to its lowercase hex form, eight digits for 32-bit
//! values and sixteen digits for wider ones, so resolution never fails.

pub mod error;
pub mod hash;
pub mod read;

pub use hash::str_code;
pub use read::HashDictionary;
