//! Fuzz target: `RimsConfig::from_props`
//!
//! Feeds arbitrary bytes, parsed as a JSON object, into the property-bag
//! and host-config parsers and verifies:
//! - No panics on any input
//! - Gains and delta are always finite, delta never negative
//! - Sample time is one of the offered periods
//!
//! cargo fuzz run fuzz_rims_props

#![no_main]

use libfuzzer_sys::fuzz_target;
use pidrims::config::{RimsConfig, SampleTime, TempUnit};
use serde_json::{Map, Value};

fuzz_target!(|data: &[u8]| {
    let Ok(props) = serde_json::from_slice::<Map<String, Value>>(data) else {
        return;
    };

    let config = RimsConfig::from_props(&props, TempUnit::from_host_config(&props));

    assert!(config.kp.is_finite());
    assert!(config.ki.is_finite());
    assert!(config.kd.is_finite());
    assert!(config.delta.is_finite() && config.delta >= 0.0);
    assert!(SampleTime::OPTIONS.contains(&config.sample_time.secs()));
});
