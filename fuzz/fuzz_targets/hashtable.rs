#![no_main]

use libfuzzer_sys::fuzz_target;
use nativeformat::{NativeCuckooFilter, NativeHashtable, NativeParser, NativeReader};

// First byte picks the table offset, the rest is the image. Walking a hostile image must end
// in an error or a clean stop, never a panic or an endless loop.
fuzz_target!(|input: &[u8]| {
    let Some((&start, data)) = input.split_first() else {
        return;
    };
    let reader = NativeReader::new(data);
    let end = data.len() as u32;

    if let Ok(table) = NativeHashtable::new(reader, NativeParser::new(reader, u32::from(start)), end) {
        for entry in table.entries().take(1 << 16) {
            if let Ok(mut entry) = entry {
                let _ = entry.get_unsigned();
            }
        }
        if let Ok(lookup) = table.lookup(i32::from(start) << 8) {
            let _ = lookup.take(1 << 16).count();
        }
        let _ = table.dump();
    }

    if let Ok(filter) = NativeCuckooFilter::new(reader, 0, end & !0xF) {
        let _ = filter.to_string();
    }
});
