use rsrcpatch::*;
use std::sync::Once;

static INIT_LOGGER: Once = Once::new();
fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::builder()
            .is_test(false)
            .filter_level(log::LevelFilter::Info)
            .format_timestamp(None)
            .format_module_path(false)
            .format_level(true)
            .format_target(false)
            .write_style(env_logger::WriteStyle::Auto)
            .init();
    });
}

const INFO: SectionInfo = SectionInfo {
    file_offset:     0x1400,
    virtual_address: 0x3000,
    raw_data_size:   0x400,
};

fn table_header(named: u16, ids: u16) -> Vec<u8> {
    let mut out = vec![0u8; 12];
    out.extend(named.to_le_bytes());
    out.extend(ids.to_le_bytes());
    out
}

fn row(name: u32, offset: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend(name.to_le_bytes());
    out.extend(offset.to_le_bytes());
    out
}

fn descriptor(rva: u32, size: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend(rva.to_le_bytes());
    out.extend(size.to_le_bytes());
    out.extend(0u32.to_le_bytes());
    out.extend(0u32.to_le_bytes());
    out
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn string_block(slot: usize, value: &str) -> Vec<u8> {
    let mut table = StringTable::new();
    table.set_string(slot, value).unwrap();
    table.bytes().unwrap()
}

/// Root with a named STRINGTABLE subdirectory holding one block leaf and an
/// id-keyed payload leaf after it.
fn string_section() -> ResourceSection {
    let mut section = ResourceSection::new(INFO);
    let mut strings = DirectoryEntry::default();
    strings.add_data_entry(EntryName::ID(1), DataEntry::new(string_block(3, "OK")));
    section.root_mut().add_sub_dir(EntryName::from_string("STRINGTABLE"), strings);
    section
        .root_mut()
        .add_data_entry(EntryName::ID(10), DataEntry::new(b"PAYLOAD".to_vec()));
    section
}

#[test]
fn parse_section() {
    init_logger();

    let data = string_section().write().unwrap();
    let section = ResourceSection::read(&data, INFO);
    assert!(section.is_ok(), "section successfully parsed");

    let section = section.unwrap();
    assert!(section.root().find_sub_dir("STRINGTABLE").is_some(), "named subdirectory present");
    assert_eq!(section.root().number_of_name_entries(), 1, "one name entry in the root");
    assert_eq!(section.root().number_of_id_entries(), 1, "one id entry in the root");
}

#[test]
fn round_trip_untouched() {
    init_logger();

    let original = string_section();
    let data = original.write().unwrap();
    assert_eq!(data.len(), original.size() as usize, "built section size equals computed size");

    let section = ResourceSection::read(&data, INFO).unwrap();
    assert_eq!(section, original, "parsed section equals the section it was built from");

    let rebuilt = section.write().unwrap();
    assert_eq!(rebuilt, data, "rebuilding without mutation reproduces the input bytes");
}

#[test]
fn round_trip_preserves_trailing_bytes() {
    init_logger();

    let mut data = string_section().write().unwrap();
    // sections are padded to the file alignment; the padding is not covered
    // by the directory tree and must survive a round trip verbatim
    data.extend_from_slice(&[0u8; 64]);

    let section = ResourceSection::read(&data, INFO).unwrap();
    assert_eq!(section.trailing().len(), 64, "padding retained as trailing bytes");

    let rebuilt = section.write().unwrap();
    assert_eq!(rebuilt, data, "padded section round-trips byte-identically");
}

#[test]
fn offset_frames_are_inverse() {
    init_logger();

    assert_eq!(INFO.start_offset(), 0x1400, "start offset is the file offset");
    assert_eq!(INFO.main_sections_offset(), 0x1400 - 0x3000, "translation constant");

    for offset in [0u32, 1, 0x123, 0xfffff] {
        let rva = INFO.rva(offset);
        assert_eq!(INFO.section_offset(rva).unwrap(), offset, "rva conversion round-trips");
        assert_eq!(
            INFO.file_offset_of(rva).unwrap() as i64,
            rva as i64 + INFO.main_sections_offset(),
            "file offset equals rva plus translation constant"
        );
    }
    assert!(
        INFO.section_offset(INFO.virtual_address - 1).is_err(),
        "rva below the section base is rejected"
    );

    for offset in [0u32, 0x10, 0x7fff_ffff] {
        for is_subdir in [false, true] {
            let marked = mark_entry_offset(is_subdir, offset);
            assert_eq!(
                split_entry_offset(marked),
                (is_subdir, offset),
                "entry offset marking round-trips"
            );
        }
    }
}

#[test]
fn classification_partition() {
    init_logger();

    let mut section = ResourceSection::new(INFO);
    let mut icon = DirectoryEntry::default();
    icon.add_data_entry(EntryName::ID(1), DataEntry::new(vec![1, 2, 3, 4]));
    section.root_mut().add_sub_dir(EntryName::from_string("ICON"), icon);
    section.root_mut().add_data_entry(EntryName::ID(1), DataEntry::new(vec![5, 6]));
    section.root_mut().add_data_entry(EntryName::ID(2), DataEntry::new(vec![7, 8]));

    let data = section.write().unwrap();
    let section = ResourceSection::read(&data, INFO).unwrap();

    assert_eq!(section.root().number_of_name_entries(), 1, "one name entry");
    assert_eq!(section.root().number_of_id_entries(), 2, "two id entries");
    assert_eq!(section.root().sub_dirs().count(), 1, "one subdirectory");
    assert_eq!(section.root().data_entries().count(), 2, "two data leaves");

    // the high bit of each index row offset selects the classification:
    // row 0 is the named subdirectory, rows 1 and 2 are id-keyed leaves
    let flags: Vec<bool> =
        (0..3).map(|row| u32_at(&data, 16 + row * 8 + 4) & 0x8000_0000 != 0).collect();
    assert_eq!(flags, [true, false, false], "subdirectory bit matches the classification");
}

#[test]
fn breadth_first_levels() {
    init_logger();

    let mut inner = DirectoryEntry::default();
    inner.add_sub_dir(EntryName::ID(5), DirectoryEntry::default());

    let mut section = ResourceSection::new(INFO);
    section.root_mut().add_sub_dir(EntryName::ID(1), inner);
    section.root_mut().add_sub_dir(EntryName::ID(2), DirectoryEntry::default());

    let depths: Vec<usize> = section.root().breadth_first().map(|(_, depth)| depth).collect();
    assert_eq!(depths, [0, 1, 1, 2], "all tables of one depth precede the next depth");

    // on disk the same order holds: both depth-1 tables precede the depth-2 table
    let data = section.write().unwrap();
    let first = u32_at(&data, 16 + 4) & 0x7fff_ffff;
    let second = u32_at(&data, 16 + 8 + 4) & 0x7fff_ffff;
    let nested = u32_at(&data, first as usize + 16 + 4) & 0x7fff_ffff;
    assert!(first < second, "first child table precedes its sibling");
    assert!(second < nested, "sibling table precedes the nested table");
}

#[test]
fn string_table_round_trip() {
    init_logger();

    let mut table = StringTable::new();
    table.set_string(0, "first").unwrap();
    table.set_string(7, "mittlere Zeichenkette").unwrap();
    table.set_string(15, "последняя строка").unwrap();

    let bytes = table.bytes().unwrap();
    let decoded = StringTable::parse(&bytes).unwrap();
    assert_eq!(decoded, table, "decoding the encoded block reproduces the strings");

    let empty = StringTable::new().bytes().unwrap();
    assert_eq!(empty.len(), 32, "an empty slot contributes exactly two zero bytes");
    assert!(empty.iter().all(|&b| b == 0), "empty block encodes to zeros");
}

#[test]
fn string_table_rejects_trailing_bytes() {
    init_logger();

    let mut bytes = StringTable::new().bytes().unwrap();
    bytes.push(0);
    assert!(
        matches!(StringTable::parse(&bytes), Err(SectionReadError::Malformed(_))),
        "bytes after the last slot are malformed"
    );
}

#[test]
fn replace_string_in_section() {
    init_logger();

    let mut section = string_section();
    {
        let strings = section.root_mut().find_sub_dir_mut("STRINGTABLE").unwrap();
        let mut strings = StringTableDirectory::read(strings).unwrap();
        assert_eq!(strings.get_string(3), Some("OK"), "slot 3 decoded from the section");
        strings.set_string(3, "Hello").unwrap();
        strings.save().unwrap();
    }

    let data = section.write().unwrap();
    let section = ResourceSection::read(&data, INFO).unwrap();
    let block = section
        .root()
        .find_sub_dir("STRINGTABLE")
        .and_then(|dir| dir.get_raw_resource(0))
        .unwrap();
    let table = StringTable::parse(block.bytes()).unwrap();
    assert_eq!(table.string(3), "Hello", "replaced string survives the rebuild");
    for slot in (0..16).filter(|&slot| slot != 3) {
        assert_eq!(table.string(slot), "", "untouched slots stay empty");
    }
}

#[test]
fn string_growth_propagates_sizes_and_offsets() {
    init_logger();

    let section = string_section();
    let before = section.write().unwrap();

    let mut section = section;
    {
        let strings = section.root_mut().find_sub_dir_mut("STRINGTABLE").unwrap();
        let mut strings = StringTableDirectory::read(strings).unwrap();
        strings.set_string(3, "Hello").unwrap();
        strings.save().unwrap();
    }
    let after = section.write().unwrap();

    // "OK" is 2 utf-16 units, "Hello" is 5: the section grows by exactly 6 bytes
    assert_eq!(after.len(), before.len() + 6, "total length shifts by the utf-16 byte delta");

    let section = ResourceSection::read(&after, INFO).unwrap();
    let payload = section
        .root()
        .get(EntryName::ID(10))
        .and_then(ResourceEntry::as_data)
        .unwrap();
    assert_eq!(
        payload.raw_resource().bytes(),
        b"PAYLOAD",
        "sibling leaf offsets shifted consistently with the growth"
    );
}

#[test]
fn string_blocks_behind_language_directories() {
    init_logger();

    let mut block = DirectoryEntry::default();
    block.add_data_entry(
        EntryName::ID(constants::LANGUAGE_ID_EN_US as u32),
        DataEntry::new(string_block(0, "First")),
    );
    let mut strings = DirectoryEntry::default();
    strings.add_sub_dir(EntryName::ID(1), block);
    let mut section = ResourceSection::new(INFO);
    section.root_mut().add_sub_dir(EntryName::ID(constants::RT_STRING as u32), strings);

    {
        let strings = section
            .root_mut()
            .get_mut(EntryName::ID(constants::RT_STRING as u32))
            .and_then(ResourceEntry::as_sub_dir_mut)
            .unwrap();
        let mut strings = StringTableDirectory::read(strings).unwrap();
        assert_eq!(strings.get_string(0), Some("First"), "block found behind the language level");
        strings.set_string(0, "Second").unwrap();
        strings.save().unwrap();
    }

    let data = section.write().unwrap();
    let section = ResourceSection::read(&data, INFO).unwrap();
    let block = section
        .root()
        .get(EntryName::ID(constants::RT_STRING as u32))
        .and_then(ResourceEntry::as_sub_dir)
        .and_then(|dir| dir.get(EntryName::ID(1)))
        .and_then(ResourceEntry::as_sub_dir)
        .and_then(|dir| dir.get_raw_resource(0))
        .unwrap();
    let table = StringTable::parse(block.bytes()).unwrap();
    assert_eq!(table.string(0), "Second", "replacement reached the language leaf");
}

#[test]
fn unknown_string_id() {
    init_logger();

    let mut section = string_section();
    let strings = section.root_mut().find_sub_dir_mut("STRINGTABLE").unwrap();
    let mut strings = StringTableDirectory::read(strings).unwrap();
    assert!(
        matches!(strings.set_string(100, "x"), Err(StringTableError::UnknownStringId(100))),
        "id outside every loaded block is rejected"
    );
}

#[test]
fn oversized_string_rejected() {
    init_logger();

    let mut table = StringTable::new();
    let long = "x".repeat(65536);
    assert!(
        matches!(table.set_string(0, &long), Err(ValueOutOfRange { .. })),
        "a string longer than a slot's 16-bit count is rejected"
    );
}

#[test]
fn truncated_header() {
    init_logger();

    let result = ResourceSection::read(&[0u8; 10], INFO);
    assert!(
        matches!(result, Err(SectionReadError::TruncatedInput { .. })),
        "a stream ending mid-header raises a truncation error, not a zero-filled tree"
    );
}

#[test]
fn truncated_rows() {
    init_logger();

    // header declares one id entry but the input ends at the header
    let data = table_header(0, 1);
    let result = ResourceSection::read(&data, INFO);
    assert!(
        matches!(result, Err(SectionReadError::TruncatedInput { .. })),
        "missing index rows raise a truncation error"
    );
}

#[test]
fn entry_counts_disagreeing_with_rows() {
    init_logger();

    // header declares one name entry, but the single row carries an id
    let mut data = table_header(1, 0);
    data.extend(row(5, 24));
    let result = ResourceSection::read(&data, INFO);
    assert!(
        matches!(result, Err(SectionReadError::Malformed(_))),
        "count and row disagreement is malformed"
    );
}

#[test]
fn data_outside_section() {
    init_logger();

    let mut data = table_header(0, 1);
    data.extend(row(1, 24));
    data.extend(descriptor(INFO.virtual_address, 0xffff));
    let result = ResourceSection::read(&data, INFO);
    assert!(
        matches!(result, Err(SectionReadError::Malformed(_))),
        "a data range past the section end is malformed"
    );
}

#[test]
fn convert_entry_name() {
    init_logger();

    let name = EntryName::from_string("MAINICON");
    assert_eq!(name.name(), Some("MAINICON"), "name conversion is lossless");
    assert_eq!(name.id(), None, "a name entry has no id");
    assert_eq!(EntryName::ID(3).id(), Some(3), "an id entry keeps its id");
}

#[test]
fn insert_find_and_remove() {
    init_logger();

    let mut dir = DirectoryEntry::default();
    dir.add_data_entry(EntryName::ID(2), DataEntry::new(vec![2]));
    dir.insert_data_entry(0, EntryName::ID(1), DataEntry::new(vec![1]));

    assert_eq!(
        dir.get_raw_resource(0).map(RawResource::bytes),
        Some(&[1u8][..]),
        "insertion index is the row index"
    );
    assert_eq!(dir.number_of_id_entries(), 2, "both leaves counted");

    assert!(dir.remove(EntryName::ID(1)).is_some(), "entry removed");
    assert_eq!(dir.number_of_id_entries(), 1, "count follows removal");
    assert_eq!(
        dir.get_raw_resource(0).map(RawResource::bytes),
        Some(&[2u8][..]),
        "remaining leaf moved up"
    );
}

#[test]
fn stream_read_and_write() {
    init_logger();

    let section = string_section();
    let mut data = Vec::new();
    section.write_to(&mut data).unwrap();

    let info = SectionInfo {
        raw_data_size: data.len() as u32,
        ..INFO
    };
    let mut reader = std::io::Cursor::new(&data);
    let parsed = ResourceSection::read_from(&mut reader, info).unwrap();
    assert_eq!(parsed.root(), section.root(), "stream round trip preserves the tree");
}
