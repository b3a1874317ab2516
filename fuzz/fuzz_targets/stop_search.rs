#![no_main]
use libfuzzer_sys::fuzz_target;
use vrs_gtfs_core::stop_resolver::{parse_geocode, parse_stop_search};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok((id, name)) = parse_stop_search(text) {
            assert!(!id.is_empty() && !name.is_empty());
        }
    }
    let _ = parse_geocode(data);
});
