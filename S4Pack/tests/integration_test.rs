use s4pack::prelude::*;
use s4pack::compression::{CODEC_DELETED, CODEC_NONE, CODEC_STREAMABLE};
use s4pack::formats::dictionary::{parse_dictionary_bytes, read_dictionary};
use s4pack::formats::stbl::xml;
use s4pack::translation::{write_tables, FinalizeReport};
use std::io::Cursor;
use tempfile::tempdir;

const RUS: u64 = 0x1200_0000_0000_0000;

fn stbl_id(locale: u64, base: u64) -> ResourceId {
    ResourceId::new(0x8000_0000, locale | base, TYPE_STBL)
}

/// One hand-built index entry: id, codec, stored bytes, decompressed size
struct RawEntry<'a> {
    id: ResourceId,
    codec: u16,
    stored: &'a [u8],
    size: u32,
}

/// Assemble a package byte by byte with an expanded (flags = 0) index
fn raw_package(entries: &[RawEntry]) -> Vec<u8> {
    let mut content = Vec::new();
    let mut index = 0u32.to_le_bytes().to_vec();
    for entry in entries {
        let offset = 96 + content.len() as u32;
        content.extend_from_slice(entry.stored);
        index.extend_from_slice(&entry.id.type_id.to_le_bytes());
        index.extend_from_slice(&entry.id.group.to_le_bytes());
        index.extend_from_slice(&((entry.id.instance >> 32) as u32).to_le_bytes());
        index.extend_from_slice(&(entry.id.instance as u32).to_le_bytes());
        index.extend_from_slice(&offset.to_le_bytes());
        index.extend_from_slice(&(entry.stored.len() as u32 | 0x8000_0000).to_le_bytes());
        index.extend_from_slice(&entry.size.to_le_bytes());
        index.extend_from_slice(&entry.codec.to_le_bytes());
        index.extend_from_slice(&1u16.to_le_bytes());
    }

    let index_offset = 96 + content.len() as u32;
    let mut header = vec![0u8; 96];
    header[0..4].copy_from_slice(b"DBPF");
    header[4..8].copy_from_slice(&2u32.to_le_bytes());
    header[8..12].copy_from_slice(&1u32.to_le_bytes());
    header[36..40].copy_from_slice(&(entries.len() as u32).to_le_bytes());
    header[44..48].copy_from_slice(&(index.len() as u32).to_le_bytes());
    header[64..68].copy_from_slice(&index_offset.to_le_bytes());

    [header, content, index].concat()
}

fn in_memory(layout: IndexLayout, items: &[(ResourceId, &str)]) -> Vec<u8> {
    let mut package = Package::buffer().unwrap().with_layout(layout);
    for (id, content) in items {
        package.put(*id, content.as_bytes()).unwrap();
    }
    package.commit().unwrap();
    package.into_inner().unwrap().into_inner()
}

#[test]
fn test_package_file_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("mod.package");

    let other = ResourceId::new(0, 0x42, 0x0333_406C);
    let mut table = StringTable::with_id(stbl_id(0, 1));
    table.add(0xABCD, "Hello");

    Package::write(&path, |package| {
        package.put(other, b"<tuning/>")?;
        package.put(stbl_id(0, 1), &table.to_bytes()?)
    })
    .unwrap();

    let mut package = Package::open(&path).unwrap();
    assert_eq!(package.search(None).unwrap(), vec![other, stbl_id(0, 1)]);
    assert_eq!(package.search_stbl().unwrap(), vec![stbl_id(0, 1)]);
    assert_eq!(package.search(Some(0x0333_406C)).unwrap(), vec![other]);
    assert_eq!(package.content_of(&other).unwrap().unwrap(), b"<tuning/>");

    let bytes = package.content_of(&stbl_id(0, 1)).unwrap().unwrap();
    assert_eq!(StringTable::from_bytes(&bytes).unwrap().get(0xABCD), Some("Hello"));
    assert!(package.content_of(&stbl_id(0, 2)).unwrap().is_none());
}

#[test]
fn test_compacted_index_reads_the_same() {
    let items = [
        (ResourceId::new(7, 0x0000_0001_0000_0001, TYPE_STBL), "one"),
        (ResourceId::new(7, 0x0000_0001_0000_0002, TYPE_STBL), "two"),
        (ResourceId::new(7, 0x0000_0001_0000_0003, TYPE_STBL), ""),
    ];
    let expanded = in_memory(IndexLayout::Expanded, &items);
    let compacted = in_memory(IndexLayout::Compacted, &items);
    assert!(compacted.len() < expanded.len());

    for bytes in [expanded, compacted] {
        let mut package = Package::from_bytes(bytes).unwrap();
        let ids = package.search(None).unwrap();
        assert_eq!(ids, items.iter().map(|(id, _)| *id).collect::<Vec<_>>());
        for (id, content) in &items {
            assert_eq!(package.content_of(id).unwrap().unwrap(), content.as_bytes());
        }
    }
}

#[test]
fn test_empty_and_foreign_files_have_no_resources() {
    for bytes in [Vec::new(), b"NOT A PACKAGE".to_vec(), vec![0u8; 200]] {
        let mut package = Package::from_bytes(bytes).unwrap();
        assert!(package.search(None).unwrap().is_empty());
    }
}

#[test]
fn test_refpack_raw_and_deleted_entries() {
    let refpack = [0x10, 0xFB, 0x00, 0x00, 0x04, 0xE0, b'a', b'b', b'c', b'd', 0xFC];
    let packed = ResourceId::new(1, 1, 1);
    let raw = ResourceId::new(1, 2, 1);
    let gone = ResourceId::new(1, 3, 1);

    let bytes = raw_package(&[
        RawEntry { id: packed, codec: CODEC_STREAMABLE, stored: &refpack, size: 4 },
        RawEntry { id: raw, codec: CODEC_NONE, stored: b"plain", size: 5 },
        RawEntry { id: gone, codec: CODEC_DELETED, stored: b"", size: 0 },
    ]);

    let mut package = Package::from_bytes(bytes).unwrap();
    assert_eq!(package.search(None).unwrap(), vec![packed, raw]);
    assert_eq!(package.content_of(&packed).unwrap().unwrap(), b"abcd");
    assert_eq!(package.content_of(&raw).unwrap().unwrap(), b"plain");
    assert!(package.get(&gone).unwrap().is_none());
}

#[test]
fn test_resource_from_other_package_rejected() {
    let id = ResourceId::new(0, 1, 2);
    let bytes = in_memory(IndexLayout::Expanded, &[(id, "x")]);

    let mut first = Package::from_bytes(bytes.clone()).unwrap();
    let mut second = Package::from_bytes(bytes).unwrap();
    let resource = first.get(&id).unwrap().unwrap();

    assert!(matches!(
        second.content(&resource),
        Err(Error::ForeignResource(_))
    ));
    assert_eq!(resource.content(&mut first).unwrap(), b"x");
}

#[test]
fn test_locale_conversion() {
    let locales = LocaleTable::builtin();
    let english = ResourceId::new(0x8000_0000, 0x0012_3456_789A_BCDE, TYPE_STBL);

    let russian = english.convert_instance("RUS_RU", &locales).unwrap();
    assert_eq!(russian.instance, 0x1212_3456_789A_BCDE);
    assert_eq!(russian.language(&locales).map(|l| l.locale.as_str()), Some("RUS_RU"));
    assert_eq!(russian.base_instance(), english.base_instance());
    assert!(english.convert_instance("XXX_YY", &locales).is_none());
}

#[test]
fn test_resource_names() {
    let id = ResourceId::new(0x8000_0000, 0x0012_3456_789A_BCDE, TYPE_STBL);
    for format in NameFormat::ALL {
        assert_eq!(ResourceId::from_string(&format.format(&id), false), id);
    }
    let fallback = ResourceId::from_string("readme.txt", true);
    assert!(fallback.is_sentinel());
    assert_eq!(fallback.group, 0x8000_0000);
}

#[test]
fn test_stbl_file_and_xml() {
    let dir = tempdir().unwrap();
    let id = stbl_id(RUS, 0x55);
    let path = dir.path().join(format!("{}.stbl", id.filename()));

    let mut table = StringTable::new();
    table.add(1, "Line one\r\nline two");
    table.add(2, "Tom & Jerry");
    write_stbl(&path, &table).unwrap();

    let loaded = read_stbl(&path).unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.get(1), Some("Line one\\nline two"));

    let back = xml::from_xml(&xml::to_xml(&loaded).unwrap()).unwrap();
    assert_eq!(back.entries, loaded.entries);
}

#[test]
fn test_retarget_and_finalize() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("mod.package");
    let english = stbl_id(0, 0xAB);

    let mut table = StringTable::with_id(english);
    table.add(1, "Hello");
    table.add(2, "World");
    Package::write(&source, |package| {
        package.put(ResourceId::new(0, 9, 0x0333_406C), b"<tuning/>")?;
        package.put(english, &table.to_bytes()?)
    })
    .unwrap();

    let settings = Settings::default();
    let locales = settings.locale_table();
    let mut entries = load_package(&source, &settings, &locales).unwrap();
    assert_eq!(entries.len(), 2);
    entries[0].translation = "Привет".into();
    entries[1].translation = "Мир".into();

    let tables = build_tables(&entries, "RUS_RU", &locales).unwrap();
    let retargeted = dir.path().join("ru.package");
    write_tables(&retargeted, &tables).unwrap();
    let mut package = Package::open(&retargeted).unwrap();
    assert_eq!(package.search_stbl().unwrap(), vec![stbl_id(RUS, 0xAB)]);
    package.close();

    let dest = dir.path().join("final.package");
    let report = finalize(&source, &dest, tables, &settings, &locales).unwrap();
    assert_eq!(
        report,
        FinalizeReport { copied: 2, replaced: 0, appended: 1 }
    );

    // Loading the finalized package pairs both languages
    let merged = load_package(&dest, &settings, &locales).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].source, "Hello");
    assert_eq!(merged[0].translation, "Привет");
    assert_eq!(merged[0].id, stbl_id(RUS, 0xAB));
}

#[test]
fn test_dictionary_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("MyMod.dct");
    let records = vec![
        DictionaryRecord::new(1, "Yes", "Да", ""),
        DictionaryRecord::new(2, "Two\nlines", "Две\nстроки", "checked"),
    ];
    s4pack::formats::write_dictionary(&path, &records).unwrap();

    assert_eq!(read_dictionary(&path).unwrap(), records);
    let dictionary = Dictionary::load(&path).unwrap();
    assert_eq!(dictionary.name, "mymod");
    assert_eq!(dictionary.translations_of("Two\nlines"), vec!["Две\\nстроки"]);

    assert!(parse_dictionary_bytes(b"DCT\x07[]").unwrap_err().is_format_mismatch());
}

#[test]
fn test_commit_on_reader_is_wrong_mode() {
    let bytes = in_memory(IndexLayout::Expanded, &[]);
    let mut package = Package::from_reader(Cursor::new(bytes)).unwrap();
    assert!(matches!(package.commit(), Err(Error::WrongMode { .. })));
}
