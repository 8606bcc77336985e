//! Data types for parsing and building the resource section tree.
//! The resource section contains the resource directory and the resource data.
//! See <https://learn.microsoft.com/en-us/windows/win32/debug/pe-format#the-rsrc-section> for more information.

use std::{borrow::Borrow, collections::VecDeque, io::Read, io::Write};

use ahash::RandomState;
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use log::trace;
use zerocopy::IntoBytes;

use crate::{constants::*, errors::*, types::*, util::*};


/// Placement of the resource section inside its image, taken from the
/// section table header of the source image.
///
/// The section's placement reconciles the three offset frames of the
/// format: file-absolute offsets, image-relative virtual addresses, and
/// section-internal offsets. All conversions are computed on demand and
/// never cached.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct SectionInfo {
    /// File offset where the section's raw data starts.
    pub file_offset:     u32,
    /// Virtual address the section is mapped at.
    pub virtual_address: u32,
    /// Size of the section's raw data in the file.
    pub raw_data_size:   u32,
}
impl SectionInfo {
    /// Anchor the section placement to a section table header supplied by
    /// the caller's PE reader.
    pub fn from_header(header: &SectionHeader) -> Self {
        Self {
            file_offset:     header.pointer_to_raw_data,
            virtual_address: header.virtual_address,
            raw_data_size:   header.size_of_raw_data,
        }
    }

    /// File-absolute offset where the section starts.
    pub fn start_offset(&self) -> u32 { self.file_offset }

    /// Translation constant from a virtual address inside this section to a
    /// file offset: `file_offset == rva + main_sections_offset()`.
    pub fn main_sections_offset(&self) -> i64 {
        i64::from(self.file_offset) - i64::from(self.virtual_address)
    }

    /// Convert a virtual address into an offset inside the section.
    /// An address below the section base is malformed.
    pub fn section_offset(&self, rva: u32) -> Result<u32, SectionReadError> {
        rva.checked_sub(self.virtual_address).ok_or_else(|| {
            SectionReadError::Malformed(format!(
                "rva {:#x} below section base {:#x}",
                rva, self.virtual_address
            ))
        })
    }

    /// Convert an offset inside the section into a virtual address.
    /// Inverse of [`section_offset`](Self::section_offset).
    pub fn rva(&self, section_offset: u32) -> u32 { self.virtual_address + section_offset }

    /// Convert a virtual address inside this section into a file offset.
    pub fn file_offset_of(&self, rva: u32) -> Result<u32, SectionReadError> {
        Ok(self.section_offset(rva)? + self.file_offset)
    }
}

/// Split an index row offset into the subdirectory discriminator and the
/// 31-bit offset it carries.
pub fn split_entry_offset(raw: u32) -> (bool, u32) {
    (raw & RESOURCE_FLAG_BIT != 0, raw & !RESOURCE_FLAG_BIT)
}

/// Re-apply the subdirectory discriminator to an offset.
/// Inverse of [`split_entry_offset`].
pub fn mark_entry_offset(is_subdir: bool, offset: u32) -> u32 {
    if is_subdir {
        offset | RESOURCE_FLAG_BIT
    } else {
        offset
    }
}


/// Resource directory entry identifier.
/// This can either be a raw id or a UTF-16 name.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum EntryName {
    ID(u32),
    Name(String),
}
impl EntryName {
    fn parse(section: &[u8], raw: u32, max_end: &mut usize) -> Result<Self, SectionReadError> {
        if raw & RESOURCE_FLAG_BIT != 0 {
            trace!("reading resource name at {:#x?}", raw);
            let offset = (raw ^ RESOURCE_FLAG_BIT) as usize;
            let length = read_at::<u16>(section, offset)? as usize;
            let name = read_utf16_at(section, offset + 2, length)?;
            trace!("resource name: {:?}", name);
            *max_end = (*max_end).max(offset + 2 + length * 2);
            Ok(Self::Name(name))
        } else {
            Ok(Self::ID(raw))
        }
    }

    pub fn from_string<S: AsRef<str>>(string: S) -> Self { Self::Name(string.as_ref().to_string()) }

    /// Returns the numeric id, if this is an id entry.
    pub fn id(&self) -> Option<u32> {
        match self {
            Self::ID(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// Returns the name, if this is a name entry.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::ID(_) => None,
            Self::Name(name) => Some(name),
        }
    }

    fn is_name(&self) -> bool { matches!(self, Self::Name(_)) }

    /// Size of the length-prefixed UTF-16 encoding in the strings region.
    /// Id entries occupy no string space.
    pub(crate) fn encoded_size(&self) -> u32 {
        match self {
            Self::ID(_) => 0,
            Self::Name(name) => 2 + utf16_units(name) as u32 * 2,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, ValueOutOfRange> {
        match self {
            Self::ID(_) => Ok(Vec::new()),
            Self::Name(name) => {
                let units = utf16_units(name);
                let mut data = Vec::with_capacity(2 + units * 2);
                data.extend_from_slice(&fit_u16("NameLength", units as u64)?.to_le_bytes());
                data.extend(utf16_bytes(name));
                Ok(data)
            }
        }
    }
}

/// Raw payload bytes of one data leaf.
///
/// This is the unit of external mutation: replacing the contents may change
/// the length, and the tree's size and offset computations pick the new
/// length up on the next serialization pass.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct RawResource {
    bytes: DebugIgnore<Vec<u8>>,
}
impl RawResource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Returns the payload bytes.
    pub fn bytes(&self) -> &[u8] { &self.bytes }

    /// Replace the payload bytes.
    pub fn replace(&mut self, bytes: Vec<u8>) { self.bytes = bytes.into(); }

    pub fn len(&self) -> usize { self.bytes.len() }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }
}

/// Resource data leaf: codepage and reserved field of the on-disk
/// descriptor, plus the payload bytes. The descriptor's address and size
/// fields are recomputed from the live tree on every write.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct DataEntry {
    pub(crate) codepage: u32,
    pub(crate) reserved: u32,
    pub(crate) resource: RawResource,
}
impl DataEntry {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            codepage: 0,
            reserved: 0,
            resource: RawResource::new(bytes),
        }
    }

    fn parse(
        section: &[u8], info: &SectionInfo, descriptor_offset: u32, level: usize,
        max_end: &mut usize,
    ) -> Result<Self, SectionReadError> {
        let descriptor = read_at::<ResourceDataEntry>(section, descriptor_offset as usize)?;
        trace!("{} {:#x?}", "--".repeat(level + 1), descriptor);
        *max_end = (*max_end).max(descriptor_offset as usize + RESOURCE_DATA_ENTRY_SIZE as usize);

        let rva = descriptor.data_rva;
        let size = descriptor.size;
        let start = info.section_offset(rva)? as usize;
        let bytes = slice_at(section, start, size as usize).map_err(|_| {
            SectionReadError::Malformed(format!(
                "resource data at rva {:#x} with size {:#x} outside section of {:#x} bytes",
                rva,
                size,
                section.len()
            ))
        })?;
        *max_end = (*max_end).max(start + size as usize);

        Ok(Self {
            codepage: descriptor.codepage,
            reserved: descriptor.reserved,
            resource: RawResource::new(bytes.to_vec()),
        })
    }

    /// Returns the payload of the leaf.
    pub fn raw_resource(&self) -> &RawResource { &self.resource }

    /// Returns the mutable payload of the leaf.
    pub fn raw_resource_mut(&mut self) -> &mut RawResource { &mut self.resource }

    /// Returns the codepage of the leaf.
    pub fn codepage(&self) -> u32 { self.codepage }

    /// Set the codepage of the leaf.
    pub fn set_codepage(&mut self, codepage: u32) { self.codepage = codepage; }
}

/// Entry in a resource directory.
/// This can be either a subdirectory or a data leaf. Every parsed index row
/// is classified into exactly one of the two, at parse time, by the high
/// bit of its offset field.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResourceEntry {
    SubDir(DirectoryEntry),
    Data(DataEntry),
}
impl ResourceEntry {
    pub fn as_sub_dir(&self) -> Option<&DirectoryEntry> {
        match self {
            ResourceEntry::SubDir(dir) => Some(dir),
            ResourceEntry::Data(_) => None,
        }
    }

    pub fn as_sub_dir_mut(&mut self) -> Option<&mut DirectoryEntry> {
        match self {
            ResourceEntry::SubDir(dir) => Some(dir),
            ResourceEntry::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataEntry> {
        match self {
            ResourceEntry::SubDir(_) => None,
            ResourceEntry::Data(data) => Some(data),
        }
    }

    pub fn as_data_mut(&mut self) -> Option<&mut DataEntry> {
        match self {
            ResourceEntry::SubDir(_) => None,
            ResourceEntry::Data(data) => Some(data),
        }
    }

    /// Returns the size of the entry's index row and the tables below it.
    pub fn table_size(&self) -> u32 {
        match self {
            // row + sub-table
            ResourceEntry::SubDir(dir) => dir.tables_size() + RESOURCE_ENTRY_SIZE,
            // row
            ResourceEntry::Data(_) => RESOURCE_ENTRY_SIZE,
        }
    }

    /// Returns the size of the name strings below the entry.
    pub fn strings_size(&self) -> u32 {
        match self {
            ResourceEntry::SubDir(dir) => dir.strings_size(),
            ResourceEntry::Data(_) => 0,
        }
    }

    /// Returns the size of the data descriptors of the entry or the entries
    /// below it.
    pub fn descriptions_size(&self) -> u32 {
        match self {
            ResourceEntry::SubDir(dir) => dir.descriptions_size(),
            ResourceEntry::Data(_) => RESOURCE_DATA_ENTRY_SIZE,
        }
    }

    /// Returns the size of the payload bytes of the entry or the entries
    /// below it.
    pub fn data_size(&self) -> u32 {
        match self {
            ResourceEntry::SubDir(dir) => dir.data_size(),
            ResourceEntry::Data(data) => data.resource.len() as u32,
        }
    }
}

/// One resource directory: the preserved table header fields plus the
/// ordered child entries. Entry order is the on-disk row order; the name
/// and id counts of the header are derived from the live entries.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct DirectoryEntry {
    pub(crate) characteristics: u32,
    pub(crate) time_date_stamp: u32,
    pub(crate) version:         VersionU16,
    pub(crate) entries:         IndexMap<EntryName, ResourceEntry, RandomState>,
}
impl DirectoryEntry {
    fn parse(
        section: &[u8], info: &SectionInfo, table_offset: u32, level: usize, max_end: &mut usize,
    ) -> Result<Self, SectionReadError> {
        if level > MAX_DIRECTORY_DEPTH {
            return Err(SectionReadError::Malformed(format!(
                "directory nesting deeper than {MAX_DIRECTORY_DEPTH} levels"
            )));
        }
        let table = read_at::<ResourceDirectoryTable>(section, table_offset as usize)?;
        trace!("{} {:#x?}", "--".repeat(level + 1), table);

        let named = table.number_of_name_entries as u32;
        let ids = table.number_of_id_entries as u32;
        *max_end = (*max_end).max(
            table_offset as usize
                + RESOURCE_TABLE_SIZE as usize
                + ((named + ids) * RESOURCE_ENTRY_SIZE) as usize,
        );

        let mut entries = IndexMap::with_hasher(RandomState::new());
        let mut entry_offset = table_offset + RESOURCE_TABLE_SIZE;
        for row in 0..(named + ids) {
            let entry = read_at::<ResourceDirectoryEntry>(section, entry_offset as usize)?;
            trace!("{} {:#x?}", "--".repeat(level + 1), entry);

            let name = EntryName::parse(section, entry.name_offset_or_integer_id, max_end)?;
            // name rows precede id rows on disk; a mismatch means the
            // declared counts disagree with the rows actually present
            if (row < named) != name.is_name() {
                return Err(SectionReadError::Malformed(format!(
                    "row {} disagrees with the declared {} name and {} id entries",
                    row, named, ids
                )));
            }

            let (is_subdir, offset) = split_entry_offset(entry.data_entry_or_subdirectory_offset);
            let parsed = if is_subdir {
                ResourceEntry::SubDir(Self::parse(section, info, offset, level + 1, max_end)?)
            } else {
                ResourceEntry::Data(DataEntry::parse(section, info, offset, level + 1, max_end)?)
            };
            if entries.insert(name.clone(), parsed).is_some() {
                return Err(SectionReadError::Malformed(format!(
                    "duplicate entry {:?} in directory at {:#x}",
                    name, table_offset
                )));
            }

            entry_offset += RESOURCE_ENTRY_SIZE;
        }
        Ok(Self {
            characteristics: table.characteristics,
            time_date_stamp: table.time_date_stamp,
            version: table.version,
            entries,
        })
    }

    /// Get a resource entry from the directory.
    pub fn get<N: Borrow<EntryName>>(&self, name: N) -> Option<&ResourceEntry> {
        self.entries.get(name.borrow())
    }

    /// Get a mutable resource entry from the directory.
    pub fn get_mut<N: Borrow<EntryName>>(&mut self, name: N) -> Option<&mut ResourceEntry> {
        self.entries.get_mut(name.borrow())
    }

    /// Find a subdirectory by its name.
    pub fn find_sub_dir(&self, name: &str) -> Option<&DirectoryEntry> {
        self.get(EntryName::from_string(name))?.as_sub_dir()
    }

    /// Find a mutable subdirectory by its name.
    pub fn find_sub_dir_mut(&mut self, name: &str) -> Option<&mut DirectoryEntry> {
        self.get_mut(EntryName::from_string(name))?.as_sub_dir_mut()
    }

    /// Iterate the subdirectories of this directory in row order.
    pub fn sub_dirs(&self) -> impl Iterator<Item = (&EntryName, &DirectoryEntry)> {
        self.entries.iter().filter_map(|(name, entry)| Some((name, entry.as_sub_dir()?)))
    }

    /// Iterate the data leaves of this directory in row order.
    pub fn data_entries(&self) -> impl Iterator<Item = (&EntryName, &DataEntry)> {
        self.entries.iter().filter_map(|(name, entry)| Some((name, entry.as_data()?)))
    }

    /// Get the payload of the `index`-th data leaf of this directory,
    /// counting leaves in row order.
    pub fn get_raw_resource(&self, index: usize) -> Option<&RawResource> {
        self.data_entries().nth(index).map(|(_, data)| data.raw_resource())
    }

    /// Get the mutable payload of the `index`-th data leaf of this
    /// directory, counting leaves in row order.
    pub fn get_raw_resource_mut(&mut self, index: usize) -> Option<&mut RawResource> {
        self.entries
            .values_mut()
            .filter_map(ResourceEntry::as_data_mut)
            .nth(index)
            .map(DataEntry::raw_resource_mut)
    }

    /// Append a subdirectory after all existing rows.
    pub fn add_sub_dir(&mut self, name: EntryName, dir: DirectoryEntry) {
        self.insert_sub_dir(self.entries.len(), name, dir);
    }

    /// Insert a subdirectory at the given row index.
    ///
    /// The caller is responsible for choosing an index that keeps the
    /// on-disk contract: name rows first sorted by name, then id rows in
    /// ascending order. The order is not enforced here, only checked in
    /// debug builds.
    pub fn insert_sub_dir(&mut self, index: usize, name: EntryName, dir: DirectoryEntry) {
        self.entries.shift_insert(index, name, ResourceEntry::SubDir(dir));
        debug_assert!(self.rows_canonical(), "directory rows out of canonical order");
    }

    /// Append a data leaf after all existing rows.
    pub fn add_data_entry(&mut self, name: EntryName, data: DataEntry) {
        self.insert_data_entry(self.entries.len(), name, data);
    }

    /// Insert a data leaf at the given row index.
    ///
    /// The same ordering contract applies as for
    /// [`insert_sub_dir`](Self::insert_sub_dir).
    pub fn insert_data_entry(&mut self, index: usize, name: EntryName, data: DataEntry) {
        self.entries.shift_insert(index, name, ResourceEntry::Data(data));
        debug_assert!(self.rows_canonical(), "directory rows out of canonical order");
    }

    /// Remove a resource entry from the directory.
    /// # Returns
    /// The removed entry.
    pub fn remove<N: Borrow<EntryName>>(&mut self, name: N) -> Option<ResourceEntry> {
        self.entries.shift_remove(name.borrow())
    }

    /// Number of name-keyed rows.
    pub fn number_of_name_entries(&self) -> usize {
        self.entries.keys().filter(|name| name.is_name()).count()
    }

    /// Number of id-keyed rows.
    pub fn number_of_id_entries(&self) -> usize {
        self.entries.keys().filter(|name| !name.is_name()).count()
    }

    fn rows_canonical(&self) -> bool {
        let mut previous: Option<&EntryName> = None;
        for name in self.entries.keys() {
            if let Some(previous) = previous {
                let ordered = match (previous, name) {
                    (EntryName::Name(a), EntryName::Name(b)) => a <= b,
                    (EntryName::Name(_), EntryName::ID(_)) => true,
                    (EntryName::ID(_), EntryName::Name(_)) => false,
                    (EntryName::ID(a), EntryName::ID(b)) => a <= b,
                };
                if !ordered {
                    return false;
                }
            }
            previous = Some(name);
        }
        true
    }

    /// Iterate this directory and all nested subdirectories in
    /// breadth-first order, the order in which tables are laid out on disk:
    /// all tables of one depth precede every table of the next.
    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst {
            queue: VecDeque::from([(self, 0)]),
        }
    }

    /// Size of this directory's own table on disk: the header plus one row
    /// per entry.
    fn own_table_size(&self) -> u32 {
        RESOURCE_TABLE_SIZE + self.entries.len() as u32 * RESOURCE_ENTRY_SIZE
    }

    /// Returns the complete size of the directory, its resources and its
    /// children in the resource section.
    pub fn size(&self) -> u32 {
        self.tables_size() + self.strings_size() + self.descriptions_size() + self.data_size()
    }

    /// Returns the size of the table and its children in the resource section.
    pub fn tables_size(&self) -> u32 {
        self.entries.values().map(ResourceEntry::table_size).sum::<u32>() + RESOURCE_TABLE_SIZE
    }

    /// Returns the size of the name strings of the entries and their children.
    pub fn strings_size(&self) -> u32 {
        self.entries
            .iter()
            .map(|(name, entry)| name.encoded_size() + entry.strings_size())
            .sum()
    }

    /// Returns the size of the data descriptors of the entries and their children.
    pub fn descriptions_size(&self) -> u32 {
        self.entries.values().map(ResourceEntry::descriptions_size).sum()
    }

    /// Returns the size of the payload bytes of the entries and their children.
    pub fn data_size(&self) -> u32 {
        self.entries.values().map(ResourceEntry::data_size).sum()
    }
}

/// Breadth-first directory traversal, created by
/// [`DirectoryEntry::breadth_first`]. Yields each directory with its depth.
pub struct BreadthFirst<'a> {
    queue: VecDeque<(&'a DirectoryEntry, usize)>,
}
impl<'a> Iterator for BreadthFirst<'a> {
    type Item = (&'a DirectoryEntry, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (dir, depth) = self.queue.pop_front()?;
        for entry in dir.entries.values() {
            if let ResourceEntry::SubDir(sub) = entry {
                self.queue.push_back((sub, depth + 1));
            }
        }
        Some((dir, depth))
    }
}

/// Resource section codec.
///
/// Anchors the directory tree to the section placement from the source
/// image, owns the root directory, and retains any trailing bytes of the
/// section that the tree does not cover so that untouched sections
/// round-trip byte-identically.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceSection {
    info:     SectionInfo,
    root:     DirectoryEntry,
    trailing: DebugIgnore<Vec<u8>>,
}
impl ResourceSection {
    /// Create an empty resource section for the given placement.
    pub fn new(info: SectionInfo) -> Self {
        Self {
            info,
            root: DirectoryEntry::default(),
            trailing: Vec::new().into(),
        }
    }

    /// Parse the resource section from its raw bytes.
    ///
    /// `data` is the section's raw data, starting at the section's file
    /// offset; the root directory table is expected at its beginning.
    /// Bytes beyond the furthest byte the directory tree covers are
    /// retained verbatim and re-emitted by [`write`](Self::write).
    ///
    /// # Returns
    /// Returns an error if the section is truncated or structurally invalid.
    pub fn read(data: &[u8], info: SectionInfo) -> Result<Self, SectionReadError> {
        let mut max_end = 0;
        let root = DirectoryEntry::parse(data, &info, 0, 0, &mut max_end)?;
        let trailing = data[max_end..].to_vec();
        trace!("resource tree covers {:#x} bytes, {:#x} trailing", max_end, trailing.len());
        Ok(Self {
            info,
            root,
            trailing: trailing.into(),
        })
    }

    /// Parse the resource section from a reader positioned at the
    /// section's file offset. Reads at most `raw_data_size` bytes; the
    /// reader stays open and is closed by the caller.
    ///
    /// # Returns
    /// Returns an error if the reader fails or the section is invalid.
    pub fn read_from<R: Read>(reader: &mut R, info: SectionInfo) -> Result<Self, SectionReadError> {
        let mut data = Vec::with_capacity(info.raw_data_size as usize);
        reader.take(u64::from(info.raw_data_size)).read_to_end(&mut data)?;
        Self::read(&data, info)
    }

    /// Build the resource section into raw bytes.
    ///
    /// Tables are laid out in breadth-first order, followed by the name
    /// strings, the data descriptors, the payload bytes back to back, and
    /// the retained trailing bytes. Every offset, address, size and count
    /// field is recomputed from the live tree.
    ///
    /// # Returns
    /// Returns an error if a count or offset no longer fits its on-disk field.
    pub fn write(&self) -> Result<Vec<u8>, SectionWriteError> {
        let tables_total = self.root.tables_size();
        let strings_total = self.root.strings_size();
        let descriptions_total = self.root.descriptions_size();

        let mut tables = Vec::with_capacity(tables_total as usize);
        let mut strings = Vec::with_capacity(strings_total as usize);
        let mut descriptions = Vec::with_capacity(descriptions_total as usize);
        let mut data = Vec::with_capacity(self.root.data_size() as usize);

        // table offsets are assigned in queue order, which is the same
        // breadth-first order the queue emits tables in
        let mut queue = VecDeque::from([&self.root]);
        let mut next_table_offset = self.root.own_table_size();
        while let Some(dir) = queue.pop_front() {
            let table = ResourceDirectoryTable {
                characteristics:        dir.characteristics,
                time_date_stamp:        dir.time_date_stamp,
                version:                dir.version,
                number_of_name_entries: fit_u16(
                    "NumberOfNameEntries",
                    dir.number_of_name_entries() as u64,
                )?,
                number_of_id_entries:   fit_u16(
                    "NumberOfIdEntries",
                    dir.number_of_id_entries() as u64,
                )?,
            };
            tables.extend_from_slice(table.as_bytes());

            for (name, entry) in &dir.entries {
                let name_offset_or_integer_id = match name {
                    EntryName::ID(id) => *id,
                    EntryName::Name(_) => {
                        let offset = fit_offset31(
                            "NameOffset",
                            u64::from(tables_total) + strings.len() as u64,
                        )?;
                        strings.extend(name.encode()?);
                        offset | RESOURCE_FLAG_BIT
                    }
                };
                let data_entry_or_subdirectory_offset = match entry {
                    ResourceEntry::SubDir(sub) => {
                        let offset =
                            fit_offset31("SubdirectoryOffset", u64::from(next_table_offset))?;
                        next_table_offset += sub.own_table_size();
                        queue.push_back(sub);
                        mark_entry_offset(true, offset)
                    }
                    ResourceEntry::Data(leaf) => {
                        let offset = fit_offset31(
                            "DataEntryOffset",
                            u64::from(tables_total)
                                + u64::from(strings_total)
                                + descriptions.len() as u64,
                        )?;
                        let descriptor = ResourceDataEntry {
                            data_rva: fit_u32(
                                "DataRva",
                                u64::from(self.info.virtual_address)
                                    + u64::from(tables_total)
                                    + u64::from(strings_total)
                                    + u64::from(descriptions_total)
                                    + data.len() as u64,
                            )?,
                            size:     fit_u32("Size", leaf.resource.len() as u64)?,
                            codepage: leaf.codepage,
                            reserved: leaf.reserved,
                        };
                        descriptions.extend_from_slice(descriptor.as_bytes());
                        data.extend_from_slice(leaf.resource.bytes());
                        mark_entry_offset(false, offset)
                    }
                };
                let row = ResourceDirectoryEntry {
                    name_offset_or_integer_id,
                    data_entry_or_subdirectory_offset,
                };
                tables.extend_from_slice(row.as_bytes());
            }
        }
        debug_assert_eq!(tables.len() as u32, tables_total);
        debug_assert_eq!(strings.len() as u32, strings_total);
        debug_assert_eq!(descriptions.len() as u32, descriptions_total);

        let mut out = tables;
        out.extend(strings);
        out.extend(descriptions);
        out.extend(data);
        out.extend_from_slice(&self.trailing);
        Ok(out)
    }

    /// Build the resource section and write it to a writer. The writer
    /// stays open and is closed by the caller.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), SectionWriteError> {
        writer.write_all(&self.write()?)?;
        Ok(())
    }

    /// Returns the section placement.
    pub fn info(&self) -> SectionInfo { self.info }

    /// File-absolute offset where the section starts.
    pub fn start_offset(&self) -> u32 { self.info.start_offset() }

    /// Translation constant from a virtual address inside this section to
    /// a file offset.
    pub fn main_sections_offset(&self) -> i64 { self.info.main_sections_offset() }

    /// Returns the root directory.
    pub fn root(&self) -> &DirectoryEntry { &self.root }

    /// Returns the mutable root directory.
    pub fn root_mut(&mut self) -> &mut DirectoryEntry { &mut self.root }

    /// Returns the trailing bytes retained beyond the directory tree.
    pub fn trailing(&self) -> &[u8] { &self.trailing }

    /// Returns the size of the built section in bytes.
    pub fn size(&self) -> u32 { self.root.size() + self.trailing.len() as u32 }
}
