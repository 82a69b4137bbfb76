#![cfg(not(target_arch = "wasm32"))]

mod common;

use cbfs::{run, FileTable, OutputSink, Selection, TOP_OF_SPACE};
use common::*;
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct FileLayout {
    name: String,
    file_type: u32,
    len: usize,
}

prop_compose! {
    fn arb_file()(
        name in "[a-z][a-z0-9/._-]{0,30}",
        file_type in prop_oneof![Just(0x10u32), Just(0x20), Just(0x50), Just(0xab)],
        len in 0usize..700,
    ) -> FileLayout {
        FileLayout { name, file_type, len }
    }
}

fn align_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![Just(16u32), Just(64u32), Just(256u32)]
}

fn build(files: &[FileLayout], align: u32) -> RomBuilder {
    let offset = 0x40u32.max(align);
    let mut builder = RomBuilder::new(0, offset, align);
    for (i, layout) in files.iter().enumerate() {
        builder = builder.file(TestFile::new(&layout.name, layout.file_type, &vec![i as u8; layout.len]));
    }

    let table_end = builder
        .files
        .iter()
        .zip(builder.record_offsets())
        .map(|(f, at)| at + f.offset() as usize + f.len() as usize)
        .max()
        .unwrap_or(offset as usize);
    // Leave at least one erased record slot plus the footer above the last record.
    builder.romsize = ((table_end + align as usize + 64) as u32).next_power_of_two();
    builder
}

proptest! {
    #[test]
    fn walk_matches_layout(files in prop::collection::vec(arb_file(), 0..12), align in align_strategy()) {
        let builder = build(&files, align);
        let rom = builder.image();
        let table = FileTable::locate(&rom, TOP_OF_SPACE).unwrap();

        let entries: Vec<_> = table.files().collect::<cbfs::Result<_>>().unwrap();
        prop_assert_eq!(entries.len(), files.len());

        for (entry, at) in entries.iter().zip(builder.record_offsets()) {
            prop_assert_eq!(entry.address, phys(builder.romsize, at));
        }
        for pair in entries.windows(2) {
            let delta = pair[1].address - pair[0].address;
            prop_assert!(delta > 0);
            prop_assert_eq!(delta % u64::from(align), 0);
            prop_assert!(delta >= pair[0].record.extent());
        }
    }

    #[test]
    fn list_with_filter_is_ordered_subset(
        files in prop::collection::vec(arb_file(), 0..12),
        align in align_strategy(),
        filter in prop::option::of(prop_oneof![Just(0x10u32), Just(0x50)]),
    ) {
        let rom = build(&files, align).image();
        let table = FileTable::locate(&rom, TOP_OF_SPACE).unwrap();

        let selection = Selection { list: true, read: None, file_type: filter };
        let mut sink = OutputSink::new(Vec::new());
        run(&table, &selection, &mut sink).unwrap();

        let expected: String = files
            .iter()
            .filter(|f| filter.map_or(true, |t| f.file_type == t))
            .map(|f| format!("{}\n", f.name))
            .collect();
        prop_assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), expected);
    }
}
