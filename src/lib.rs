//! Codec for the **r**e**s**ou**rc**e section of Windows portable executables.
//!
//! Reads the resource directory tree of a `.rsrc` section, lets callers
//! locate and mutate individual resource payloads (icons, version info,
//! localized string tables), and rebuilds the section with every offset,
//! address, size and count recomputed from the live tree. Built for
//! customizing native launcher stubs, where a template executable is
//! patched with product-specific resources.
//!
//! The crate never opens or parses a whole executable: the caller's PE
//! reader supplies the section table values that anchor the section, and
//! hands in the section's raw bytes.
//!
//! See [`ResourceSection`] for the main entry point.
//!
//! # Examples
//!
//! ### Replacing a localized string
//! ```
//! use rsrcpatch::{constants::RT_STRING, EntryName, ResourceSection, SectionInfo, StringTableDirectory};
//!
//! let data = std::fs::read(SECTION_PATH)?;
//!
//! // parse the resource section
//! let mut section = ResourceSection::read(&data, SectionInfo {
//!     file_offset: 0x1400,
//!     virtual_address: 0x3000,
//!     raw_data_size: data.len() as u32,
//! })?;
//!
//! // decode the string table blocks and replace one string
//! let strings = section.root_mut().get_mut(EntryName::ID(RT_STRING as u32))
//!     .and_then(|entry| entry.as_sub_dir_mut())
//!     .expect("no string table directory");
//! let mut strings = StringTableDirectory::read(strings)?;
//! strings.set_string(3, "Hello")?;
//! strings.save()?;
//!
//! // rebuild the section with all offsets recomputed
//! let target = section.write()?;
//! ```
//!
//! ### Replacing a raw resource payload
//! ```
//! use rsrcpatch::{constants::RT_MANIFEST, EntryName, ResourceSection, SectionInfo};
//!
//! let data = std::fs::read(SECTION_PATH)?;
//! let manifest = std::fs::read(MANIFEST_PATH)?;
//!
//! let mut section = ResourceSection::read(&data, SectionInfo {
//!     file_offset: 0x1400,
//!     virtual_address: 0x3000,
//!     raw_data_size: data.len() as u32,
//! })?;
//!
//! let leaf = section.root_mut().get_mut(EntryName::ID(RT_MANIFEST as u32))
//!     .and_then(|entry| entry.as_sub_dir_mut())
//!     .and_then(|dir| dir.get_raw_resource_mut(0))
//!     .expect("no manifest resource");
//! leaf.replace(manifest);
//!
//! let target = section.write()?;
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(doc)))]

pub(crate) mod errors;
pub(crate) mod resource;
pub(crate) mod stringtable;
pub(crate) mod util;

pub mod constants;
pub mod types;

pub use crate::{errors::*, resource::*, stringtable::*};
