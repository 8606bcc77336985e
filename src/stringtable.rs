//! Decoding and mutation of STRINGTABLE resources.
//!
//! A STRINGTABLE block encodes 16 length-prefixed UTF-16 strings with no
//! terminators and no padding between them. Block `n` covers the string ids
//! `(n - 1) * 16` through `(n - 1) * 16 + 15`; block id 0 is reserved.
//! See <https://docs.microsoft.com/en-us/windows/win32/menurc/stringtable-resource> for more information.

use log::warn;

use crate::{constants::*, errors::*, resource::*, util::*};

/// One decoded string table block of exactly [`STRING_TABLE_SLOTS`] logical
/// strings. Absent strings are empty, not null.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StringTable {
    strings: Vec<String>,
}
impl Default for StringTable {
    fn default() -> Self {
        Self {
            strings: vec![String::new(); STRING_TABLE_SLOTS],
        }
    }
}
impl StringTable {
    /// Create a block of 16 empty strings.
    pub fn new() -> Self { Self::default() }

    /// Decode a block from the payload of a string table leaf.
    ///
    /// # Returns
    /// Returns an error if the payload ends before the 16th slot, if a
    /// slot is not valid UTF-16, or if bytes remain after the last slot.
    pub fn parse(bytes: &[u8]) -> Result<Self, SectionReadError> {
        let mut strings = Vec::with_capacity(STRING_TABLE_SLOTS);
        let mut offset = 0;
        for _ in 0..STRING_TABLE_SLOTS {
            let length = read_at::<u16>(bytes, offset)? as usize;
            let string = read_utf16_at(bytes, offset + 2, length)?;
            offset += 2 + length * 2;
            strings.push(string);
        }
        if offset != bytes.len() {
            return Err(SectionReadError::Malformed(format!(
                "string table block has {} bytes after the last slot",
                bytes.len() - offset
            )));
        }
        Ok(Self { strings })
    }

    /// Returns the string in the given slot.
    pub fn string(&self, slot: usize) -> &str { &self.strings[slot] }

    /// Returns all 16 strings of the block.
    pub fn strings(&self) -> &[String] { &self.strings }

    /// Replace the string in the given slot.
    ///
    /// # Returns
    /// Returns an error if the string exceeds the 65535 UTF-16 units a
    /// slot can hold.
    pub fn set_string(&mut self, slot: usize, value: &str) -> Result<(), ValueOutOfRange> {
        fit_u16("StringLength", utf16_units(value) as u64)?;
        self.strings[slot] = value.to_string();
        Ok(())
    }

    /// Encode the block back into leaf payload bytes. An empty slot
    /// contributes exactly two zero bytes; decoding the result reproduces
    /// the same 16 strings.
    pub fn bytes(&self) -> Result<Vec<u8>, ValueOutOfRange> {
        let mut out = Vec::new();
        for string in &self.strings {
            out.extend_from_slice(
                &fit_u16("StringLength", utf16_units(string) as u64)?.to_le_bytes(),
            );
            out.extend(utf16_bytes(string));
        }
        Ok(out)
    }
}

#[derive(Debug)]
struct StringBlock {
    block_id: u32,
    table:    StringTable,
    touched:  bool,
}

/// Registry of the string table blocks under one string type directory,
/// addressing individual strings by their global id.
///
/// Borrows the directory for its whole lifetime; [`save`](Self::save)
/// re-encodes every modified block and writes it back through the owning
/// [`RawResource`], so length changes are picked up by the next
/// serialization of the section.
pub struct StringTableDirectory<'a> {
    dir:    &'a mut DirectoryEntry,
    blocks: Vec<StringBlock>,
}
impl<'a> StringTableDirectory<'a> {
    /// Decode every id-keyed block under the given string type directory.
    ///
    /// A block is either an id-keyed data leaf directly under the
    /// directory, or an id-keyed subdirectory (the language level) whose
    /// first data leaf carries the block. Name-keyed entries are skipped.
    ///
    /// # Returns
    /// Returns an error if a block directory carries no data or a block
    /// payload does not decode.
    pub fn read(dir: &'a mut DirectoryEntry) -> Result<Self, StringTableError> {
        let mut blocks = Vec::new();
        for (name, entry) in &dir.entries {
            let Some(block_id) = name.id() else {
                warn!("skipping name-keyed entry {:?} in string table directory", name);
                continue;
            };
            let resource = match entry {
                ResourceEntry::Data(data) => data.raw_resource(),
                ResourceEntry::SubDir(sub) => {
                    sub.get_raw_resource(0).ok_or(StringTableError::EmptyBlock(block_id))?
                }
            };
            blocks.push(StringBlock {
                block_id,
                table: StringTable::parse(resource.bytes())?,
                touched: false,
            });
        }
        Ok(Self { dir, blocks })
    }

    fn locate(id: u32) -> (u32, usize) {
        let slots = STRING_TABLE_SLOTS as u32;
        (id / slots + 1, (id % slots) as usize)
    }

    /// Returns the string with the given global id, if a loaded block
    /// covers it.
    pub fn get_string(&self, id: u32) -> Option<&str> {
        let (block_id, slot) = Self::locate(id);
        self.blocks
            .iter()
            .find(|block| block.block_id == block_id)
            .map(|block| block.table.string(slot))
    }

    /// Replace the string with the given global id.
    ///
    /// # Returns
    /// Returns an error if no loaded block covers the id, or if the string
    /// does not fit a slot.
    pub fn set_string(&mut self, id: u32, value: &str) -> Result<(), StringTableError> {
        let (block_id, slot) = Self::locate(id);
        let block = self
            .blocks
            .iter_mut()
            .find(|block| block.block_id == block_id)
            .ok_or(StringTableError::UnknownStringId(id))?;
        block.table.set_string(slot, value)?;
        block.touched = true;
        Ok(())
    }

    /// Re-encode every modified block and write it back through the owning
    /// payload.
    pub fn save(&mut self) -> Result<(), StringTableError> {
        for block in self.blocks.iter_mut().filter(|block| block.touched) {
            let bytes = block.table.bytes()?;
            let resource = match self.dir.get_mut(EntryName::ID(block.block_id)) {
                Some(ResourceEntry::Data(data)) => data.raw_resource_mut(),
                Some(ResourceEntry::SubDir(sub)) => sub
                    .get_raw_resource_mut(0)
                    .ok_or(StringTableError::EmptyBlock(block.block_id))?,
                None => return Err(StringTableError::EmptyBlock(block.block_id)),
            };
            resource.replace(bytes);
            block.touched = false;
        }
        Ok(())
    }
}
