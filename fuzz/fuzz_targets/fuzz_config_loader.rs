#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Config TOML and trace CSV must be rejected gracefully, never panic.
    if let Ok(cfg) = toml::from_str::<shade_config::Config>(data) {
        let _ = cfg.validate();
    }
    let _ = shade_config::parse_trace_csv(data.as_bytes());
});
