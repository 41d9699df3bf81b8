use rstest::rstest;
use shade_core::decoder::{DecodedEvent, Decoder, decode_report};
use shade_core::{BatteryReport, FunctionTag, PositionSample, RawReport};

const GET: u8 = FunctionTag::GET_DATA;

fn value_payload(v: u32) -> Vec<u8> {
    let mut p = vec![0x02];
    p.extend_from_slice(&v.to_be_bytes());
    p
}

#[rstest]
#[case(0)]
#[case(42)]
#[case(100)]
fn position_in_range_yields_sample(#[case] v: u8) {
    let r = RawReport::new(3, GET, [0x02, 0, 0, 0, v]);
    assert_eq!(
        decode_report(&r, 1234),
        DecodedEvent::Position(PositionSample {
            t_ms: 1234,
            value: v
        })
    );
}

#[rstest]
#[case(vec![0x02, 0, 0, 0, 101])]
#[case(vec![0x02, 0, 0, 0, 255])]
#[case(vec![0x02, 0, 0, 0])]
#[case(vec![])]
fn position_malformed_or_out_of_range_is_noop(#[case] payload: Vec<u8>) {
    let r = RawReport::new(3, GET, payload);
    assert_eq!(decode_report(&r, 0), DecodedEvent::NoOp);
}

#[rstest]
#[case(vec![0x04, 0], false)]
#[case(vec![0x04, 1], true)]
#[case(vec![0x01, 7, 9], true)]
fn battery_status_bit(#[case] payload: Vec<u8>, #[case] low: bool) {
    let r = RawReport::new(12, GET, payload);
    assert_eq!(decode_report(&r, 0), DecodedEvent::BatteryStatus { low });
}

#[rstest]
fn battery_status_short_payload_is_noop() {
    let r = RawReport::new(12, GET, [0x04]);
    assert_eq!(decode_report(&r, 0), DecodedEvent::NoOp);
}

#[rstest]
#[case(50, 100)]
#[case(100, 200)]
#[case(0, 0)]
fn battery_percent_is_doubled(#[case] percent: u8, #[case] half: u8) {
    let r = RawReport::new(13, GET, value_payload(u32::from(percent)));
    let ev = decode_report(&r, 0);
    assert_eq!(ev, DecodedEvent::Battery(BatteryReport { percent }));
    if let DecodedEvent::Battery(b) = ev {
        assert_eq!(b.to_half_percent(), half);
    }
}

#[rstest]
fn battery_above_hundred_is_discarded() {
    let r = RawReport::new(13, GET, value_payload(150));
    assert_eq!(decode_report(&r, 0), DecodedEvent::NoOp);
}

#[rstest]
#[case(5, true)]
#[case(10, true)]
#[case(15, true)]
#[case(4, false)]
#[case(16, false)]
#[case(101, false)]
fn unknown_ids_marked_for_classifier(#[case] dp: u8, #[case] candidate: bool) {
    let r = RawReport::new(dp, GET, value_payload(30));
    assert_eq!(
        decode_report(&r, 0),
        DecodedEvent::Unknown {
            dp,
            probe_candidate: candidate
        }
    );
}

#[rstest]
#[case(FunctionTag::SET_DATA)]
#[case(0x06)]
#[case(0x24)]
fn non_data_tags_pass_through_unrecorded(#[case] tag: u8) {
    let mut d = Decoder::new();
    let r = RawReport::new(3, tag, [0x02, 0, 0, 0, 40]);
    assert_eq!(d.decode(&r, 10), DecodedEvent::PassThrough);
    assert!(d.discovered().is_empty());
}

#[rstest]
fn every_data_report_is_recorded_with_overwrite() {
    let mut d = Decoder::new();
    d.decode(&RawReport::new(3, GET, [0x02, 0, 0, 0, 40]), 100);
    d.decode(&RawReport::new(3, FunctionTag::SET_DATA_RESPONSE, [0x02, 0, 0, 0, 44]), 250);
    // malformed still recorded
    d.decode(&RawReport::new(13, GET, [0x02]), 300);
    d.decode(&RawReport::new(77, GET, [0x00, 0xde, 0xad]), 400);

    let map = d.discovered();
    assert_eq!(map.len(), 3);
    let pos = &map[&3];
    assert_eq!(pos.payload, vec![0x02, 0, 0, 0, 44]);
    assert_eq!(pos.tag, FunctionTag::SET_DATA_RESPONSE);
    assert_eq!(pos.last_seen_ms, 250);
    assert_eq!(map[&13].payload, vec![0x02]);
    assert_eq!(map[&77].last_seen_ms, 400);
}
