#![no_main]
use libfuzzer_sys::fuzz_target;
use vrs_gtfs_core::journey_page::{JourneyPage, PANEL_COUNT};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);
    let page = JourneyPage::parse(&html);
    for number in 1..=PANEL_COUNT {
        let Some(panel) = page.panel(number) else {
            continue;
        };
        let _ = panel.line_label();
        if let Ok(rows) = panel.stop_rows() {
            for row in rows {
                let _ = row.station_name();
                if let Ok((hours, minutes)) = row.departure_clock() {
                    assert!(hours < 24 && minutes < 60);
                }
            }
        }
    }
});
