//! Fuzz target: `ParameterSynchronizer::apply_update`
//!
//! Feeds arbitrary raw payloads to every registered parameter kind and
//! asserts that rejections never change stored values.
//!
//! cargo fuzz run fuzz_param_update

#![no_main]

use libfuzzer_sys::fuzz_target;
use twinsync::SyncConfig;
use twinsync::registry::{FixedBuf, Shared, TypedField};
use twinsync::twin::params::{ParameterDescriptor, ParameterSynchronizer};

fuzz_target!(|data: &[u8]| {
    let Some((&selector, raw)) = data.split_first() else {
        return;
    };

    let label = Shared::new(FixedBuf::with_text(20, "TICTAC"));
    let level = Shared::new(0_i32);
    let period = Shared::new(10_u32);
    let ratio = Shared::new(1.0_f64);

    let mut sync = ParameterSynchronizer::new(&SyncConfig::default());
    let registered = [
        sync.register(ParameterDescriptor::text(1, TypedField::text("label", &label))),
        sync.register(ParameterDescriptor::ranged(
            2,
            TypedField::int32("level", &level),
            -10..=10,
        )),
        sync.register(ParameterDescriptor::ranged(
            3,
            TypedField::uint32("period", &period),
            1..=120,
        )),
        sync.register(ParameterDescriptor::ranged(
            4,
            TypedField::double("ratio", &ratio),
            0.0..=2.0,
        )),
    ];
    if registered.iter().any(Result::is_err) {
        return;
    }

    let uref = u16::from(selector % 5);
    let before = (
        label.with(|b| b.text().into_owned()),
        level.get(),
        period.get(),
        ratio.get().to_bits(),
    );
    let result = sync.apply_update(uref, raw);
    let after = (
        label.with(|b| b.text().into_owned()),
        level.get(),
        period.get(),
        ratio.get().to_bits(),
    );

    if result.is_err() {
        assert_eq!(before, after);
    }
    assert!(after.0.len() <= 18);
    assert!((-10..=10).contains(&after.1));
    assert!((1..=120).contains(&after.2));
    assert!((0.0..=2.0).contains(&f64::from_bits(after.3)));
});
