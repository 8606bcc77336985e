//! Windows API and binary constants.

pub type DWORD = u32;
pub type WORD = u16;
pub type LANGID = WORD;


// https://docs.microsoft.com/en-us/openspecs/windows_protocols/ms-lcid/a9eac961-e77d-41a6-90a5-ce1a8b0cdb9c
pub const LANGUAGE_ID_EN_US: LANGID = 1033; // 0x0409, en-US
// https://docs.microsoft.com/en-us/openspecs/windows_protocols/ms-ucoderef/28fefe92-d66c-4b03-90a9-97b473223d43
pub const CODE_PAGE_ID_EN_US: LANGID = 1200; // 0x04B0, UTF-16LE


// https://docs.microsoft.com/en-us/windows/win32/menurc/resource-types

pub const RT_CURSOR: WORD = 0x01;
pub const RT_BITMAP: WORD = 0x02;
pub const RT_ICON: WORD = 0x03;
pub const RT_MENU: WORD = 0x04;
pub const RT_DIALOG: WORD = 0x05;
pub const RT_STRING: WORD = 0x06;
pub const RT_FONTDIR: WORD = 0x07;
pub const RT_FONT: WORD = 0x08;
pub const RT_ACCELERATOR: WORD = 0x09;
pub const RT_RCDATA: WORD = 0x0A;
pub const RT_MESSAGETABLE: WORD = 0x0B;
pub const RT_GROUP_CURSOR: WORD = 0x0C;
pub const RT_GROUP_ICON: WORD = 0x0E;
pub const RT_VERSION: WORD = 0x10;
pub const RT_DLGINCLUDE: WORD = 0x11;
pub const RT_PLUGPLAY: WORD = 0x13;
pub const RT_VXD: WORD = 0x14;
pub const RT_ANICURSOR: WORD = 0x15;
pub const RT_ANIICON: WORD = 0x16;
pub const RT_HTML: WORD = 0x17;
pub const RT_MANIFEST: WORD = 0x18;


// https://docs.microsoft.com/en-us/windows/win32/debug/pe-format#the-rsrc-section

/// High bit of an index row offset: set when the row points at a subdirectory
/// table, clear when it points at a data entry. The same bit marks the name
/// field as a string offset as opposed to an integer id.
pub const RESOURCE_FLAG_BIT: DWORD = 0x8000_0000;

/// Size of a resource directory table header on disk.
pub const RESOURCE_TABLE_SIZE: DWORD = 16;
/// Size of one index row on disk.
pub const RESOURCE_ENTRY_SIZE: DWORD = 8;
/// Size of a resource data entry descriptor on disk.
pub const RESOURCE_DATA_ENTRY_SIZE: DWORD = 16;

/// Nesting bound for directory tables. The format uses three levels
/// (type, name, language); anything deeper is treated as a malformed
/// offset chain.
pub const MAX_DIRECTORY_DEPTH: usize = 32;


// https://docs.microsoft.com/en-us/windows/win32/menurc/stringtable-resource

/// Number of string slots in one STRINGTABLE resource block.
pub const STRING_TABLE_SLOTS: usize = 16;
