//! Parameter updates as delivered by the transport.

use super::mock::{PARAM_GAIN, PARAM_NAME, PARAM_THRESHOLD, PARAM_TIMEOUT, device, text};

use twinsync::ResponseCode;
use twinsync::error::ParamError;
use twinsync::twin::params::ParamUpdate;

#[test]
fn name_accepts_up_to_eighteen_bytes() {
    let dev = device();
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_NAME, b"eighteen-bytes-ok!"),
        ResponseCode::Ok
    );
    assert_eq!(text(&dev.name), "eighteen-bytes-ok!");

    assert_eq!(
        dev.twin.on_parameter_event(PARAM_NAME, b"nineteen-bytes-long"),
        ResponseCode::LengthInvalid
    );
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_NAME, b""),
        ResponseCode::LengthInvalid
    );
    assert_eq!(text(&dev.name), "eighteen-bytes-ok!");
}

#[test]
fn name_must_be_utf8() {
    let dev = device();
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_NAME, &[0xff, 0xfe]),
        ResponseCode::LengthInvalid
    );
    assert_eq!(text(&dev.name), "TICTAC");
}

#[test]
fn name_with_embedded_nul_is_rejected() {
    let dev = device();
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_NAME, b"ab\0cd"),
        ResponseCode::LengthInvalid
    );
    assert_eq!(text(&dev.name), "TICTAC");
}

#[test]
fn timeout_range_and_width() {
    let dev = device();
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_TIMEOUT, &60_u32.to_le_bytes()),
        ResponseCode::Ok
    );
    assert_eq!(dev.timeout.get(), 60);
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_TIMEOUT, &0_u32.to_le_bytes()),
        ResponseCode::OutOfRange
    );
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_TIMEOUT, &[60, 0]),
        ResponseCode::LengthInvalid
    );
    assert_eq!(dev.timeout.get(), 60);
}

#[test]
fn threshold_walkthrough() {
    let dev = device();
    let set = |v: i32| dev.twin.on_parameter_event(PARAM_THRESHOLD, &v.to_le_bytes());

    assert_eq!(set(-3), ResponseCode::Unchanged);
    assert_eq!(set(5), ResponseCode::Ok);
    assert_eq!(dev.threshold.get(), 5);
    assert_eq!(set(11), ResponseCode::OutOfRange);
    assert_eq!(dev.threshold.get(), 5);
}

#[test]
fn gain_rejects_nan() {
    let dev = device();
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_GAIN, &f32::NAN.to_le_bytes()),
        ResponseCode::OutOfRange
    );
    assert_eq!(
        dev.twin.on_parameter_event(PARAM_GAIN, &2.5_f32.to_le_bytes()),
        ResponseCode::Ok
    );
    assert_eq!(dev.gain.get(), 2.5);
}

#[test]
fn unknown_parameter() {
    let dev = device();
    assert_eq!(
        dev.twin.on_parameter_event(77, &[1, 0, 0, 0]),
        ResponseCode::UnknownParameter
    );
}

#[test]
fn batch_applies_independently_and_counts_overflow() {
    let dev = device();
    let timeout = 30_u32.to_le_bytes();
    let bad = 50_i32.to_le_bytes();
    let gain = 3.0_f32.to_le_bytes();
    let updates = [
        ParamUpdate { uref: PARAM_NAME, raw: b"alpha" },
        ParamUpdate { uref: PARAM_TIMEOUT, raw: &timeout },
        ParamUpdate { uref: PARAM_THRESHOLD, raw: &bad },
        ParamUpdate { uref: PARAM_GAIN, raw: &gain },
        ParamUpdate { uref: 99, raw: &gain },
        ParamUpdate { uref: PARAM_NAME, raw: b"dropped" },
    ];

    let outcome = dev.twin.on_parameter_batch(&updates);
    assert_eq!(outcome.results.len(), 6);
    assert_eq!(outcome.applied(), 3);
    assert_eq!(outcome.overflow, 1);
    assert_eq!(
        outcome.results[5],
        (PARAM_NAME, Err(ParamError::BatchOverflow))
    );
    assert_eq!(text(&dev.name), "alpha");
    assert_eq!(dev.timeout.get(), 30);
    assert_eq!(dev.threshold.get(), -3);
    assert_eq!(dev.gain.get(), 3.0);
}
