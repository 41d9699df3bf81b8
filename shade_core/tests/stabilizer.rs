use rstest::{fixture, rstest};
use shade_core::{
    PositionSample, PositionStabilizer, SampleOutcome, StabilizerCfg, StabilizerState,
};

#[fixture]
fn stab() -> PositionStabilizer {
    PositionStabilizer::new(StabilizerCfg::default())
}

fn s(t_ms: u64, value: u8) -> PositionSample {
    PositionSample { t_ms, value }
}

fn feed(st: &mut PositionStabilizer, samples: &[(u64, u8)]) -> Vec<SampleOutcome> {
    samples.iter().map(|&(t, v)| st.on_sample(s(t, v))).collect()
}

#[rstest]
fn scenario_a_settles_on_forty_once(mut stab: PositionStabilizer) {
    let out = feed(&mut stab, &[(0, 40), (300, 41), (600, 40)]);
    let settled: Vec<u8> = out
        .iter()
        .filter_map(|o| match o {
            SampleOutcome::Settled(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(settled, vec![40]);
    assert_eq!(stab.stable_position(), Some(40));
}

#[rstest]
fn scenario_b_cooldown_then_new_window(mut stab: PositionStabilizer) {
    stab.begin_cooldown(0);
    assert_eq!(stab.state(0), StabilizerState::Cooling);
    assert_eq!(stab.on_sample(s(500, 37)), SampleOutcome::DroppedCooldown);
    assert_eq!(stab.window_len(), 0);
    assert_eq!(stab.on_sample(s(1200, 37)), SampleOutcome::Collecting);
    assert_eq!(stab.window_len(), 1);
    assert_eq!(stab.state(1200), StabilizerState::Collecting);
}

#[rstest]
fn scenario_c_hysteresis(mut stab: PositionStabilizer) {
    feed(&mut stab, &[(0, 40), (200, 40)]);
    assert_eq!(stab.stable_position(), Some(40));

    let out = feed(&mut stab, &[(2000, 41), (2300, 41)]);
    assert_eq!(out[1], SampleOutcome::Held(41));
    assert_eq!(stab.stable_position(), Some(40));

    let out = feed(&mut stab, &[(3500, 43), (3800, 43)]);
    assert_eq!(out[1], SampleOutcome::Settled(43));
    assert_eq!(stab.stable_position(), Some(43));
}

#[rstest]
fn repeated_stable_value_never_resettles(mut stab: PositionStabilizer) {
    feed(&mut stab, &[(0, 55), (100, 55)]);
    let later: Vec<(u64, u8)> = (1..50u64).map(|i| (100 + i * 150, 55)).collect();
    let out = feed(&mut stab, &later);
    assert!(out.iter().all(|o| !matches!(o, SampleOutcome::Settled(_))));
}

#[rstest]
fn wide_spread_keeps_collecting(mut stab: PositionStabilizer) {
    let out = feed(&mut stab, &[(0, 10), (100, 20), (200, 30), (300, 40)]);
    assert!(out.iter().all(|o| *o == SampleOutcome::Collecting));
    assert_eq!(stab.stable_position(), None);
}

#[rstest]
fn only_recent_samples_count(mut stab: PositionStabilizer) {
    // 70 is still in the window but no longer recent when 20 arrives.
    feed(&mut stab, &[(0, 70)]);
    assert_eq!(stab.on_sample(s(1500, 20)), SampleOutcome::Collecting);
    assert_eq!(stab.window_len(), 2);
    assert_eq!(stab.on_sample(s(1700, 21)), SampleOutcome::Settled(20));
}

#[rstest]
fn window_prunes_old_samples(mut stab: PositionStabilizer) {
    feed(&mut stab, &[(0, 10), (100, 90)]);
    assert_eq!(stab.window_len(), 2);
    stab.on_sample(s(3150, 50));
    assert_eq!(stab.window_len(), 1);
    assert_eq!(stab.state(6100), StabilizerState::Collecting);
    assert_eq!(stab.state(6200), StabilizerState::Idle);
}

#[rstest]
fn cooldown_clears_window_and_counts(mut stab: PositionStabilizer) {
    feed(&mut stab, &[(0, 10)]);
    stab.begin_cooldown(100);
    stab.begin_cooldown(200);
    assert_eq!(stab.window_len(), 0);
    assert_eq!(stab.cooldown_activations(), 2);
    assert_eq!(stab.on_sample(s(1199, 10)), SampleOutcome::DroppedCooldown);
    assert_eq!(stab.on_sample(s(1200, 10)), SampleOutcome::Collecting);
}

#[rstest]
fn settled_state_until_next_sample(mut stab: PositionStabilizer) {
    feed(&mut stab, &[(0, 33), (50, 33)]);
    assert_eq!(stab.state(60), StabilizerState::Settled);
    stab.on_sample(s(80, 33));
    assert_eq!(stab.state(90), StabilizerState::Collecting);
}

#[rstest]
#[case(1, 2, vec![(0, 60), (10, 61)], Some(60))]
#[case(0, 2, vec![(0, 60), (10, 61)], None)]
#[case(2, 2, vec![(0, 60), (10, 60), (20, 61), (30, 61)], Some(60))]
#[case(2, 3, vec![(0, 60), (10, 60), (1100, 62), (1110, 62)], Some(60))]
fn spread_and_hysteresis_config(
    #[case] max_spread: u8,
    #[case] hysteresis: u8,
    #[case] samples: Vec<(u64, u8)>,
    #[case] expect: Option<u8>,
) {
    let cfg = StabilizerCfg {
        max_spread,
        hysteresis,
        ..StabilizerCfg::default()
    };
    let mut st = PositionStabilizer::new(cfg);
    feed(&mut st, &samples);
    assert_eq!(st.stable_position(), expect);
}
