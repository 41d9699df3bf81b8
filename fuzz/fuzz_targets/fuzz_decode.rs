#![no_main]
use libfuzzer_sys::fuzz_target;
use shade_core::decoder::{BATTERY_HALF_PERCENT_MAX, decode_report};
use shade_core::probe::classify;
use shade_core::{DecodedEvent, RawReport, decode_frame};

fuzz_target!(|input: (u8, u8, u8, Vec<u8>)| {
    let (tag, dp, t, bytes) = input;

    // Frame splitting never panics; a split frame decodes like a raw report.
    if let Ok(report) = decode_frame(tag, &bytes) {
        check(&report, u64::from(t));
    }
    check(&RawReport::new(dp, tag, bytes), u64::from(t));
});

fn check(report: &RawReport, t_ms: u64) {
    match decode_report(report, t_ms) {
        DecodedEvent::Position(s) => assert!(s.value <= 100),
        DecodedEvent::Battery(b) => assert!(b.to_half_percent() <= BATTERY_HALF_PERCENT_MAX),
        _ => {}
    }
    let _ = classify(report);
}
