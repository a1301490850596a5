//! Resource transfer through the transport-facing callbacks.

use super::mock::{
    IMAGE_CAP, Pull, RSC_IMAGE, RSC_MESSAGE, RecordingUplink, ScriptedSource, device, device_with,
    text,
};

use twinsync::adapters::memory::SliceChunkSource;
use twinsync::registry::FieldValue;
use twinsync::twin::transfer::TransferState;
use twinsync::{ResourceEvent, ResourcePhase, ResponseCode, SyncConfig};

fn start(uref: u16, size: usize) -> ResourceEvent<'static> {
    ResourceEvent {
        uref,
        phase: ResourcePhase::Start {
            size,
            old_version: "01.00",
            new_version: "02.00",
            digest: None,
        },
    }
}

fn data(uref: u16, offset: usize) -> ResourceEvent<'static> {
    ResourceEvent {
        uref,
        phase: ResourcePhase::Data { offset },
    }
}

fn complete(uref: u16, success: bool, new_version: &str) -> ResourceEvent<'_> {
    ResourceEvent {
        uref,
        phase: ResourcePhase::Complete {
            success,
            new_version,
        },
    }
}

#[test]
fn message_resource_rewrites_status_and_republishes() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let body = b"Firmware 2 is live";
    let mut src = SliceChunkSource::new(body);

    assert_eq!(
        dev.twin.on_resource_event(start(RSC_MESSAGE, body.len()), &mut src, &mut up),
        ResponseCode::Ok
    );
    assert_eq!(
        dev.twin.on_resource_event(data(RSC_MESSAGE, 0), &mut src, &mut up),
        ResponseCode::Ok
    );
    assert_eq!(text(&dev.message), "Firmware 2 is live");
    assert!(up.status.is_empty(), "no publish before completion");

    assert_eq!(
        dev.twin.on_resource_event(complete(RSC_MESSAGE, true, "02.00"), &mut src, &mut up),
        ResponseCode::Ok
    );
    assert_eq!(text(&dev.message_version), "02.00");
    assert_eq!(up.status.len(), 1);
    assert_eq!(
        up.last_status("sample_message"),
        Some(FieldValue::Text("Firmware 2 is live".into()))
    );
    assert!(dev.twin.resources().is_idle());
}

#[test]
fn image_arrives_in_budget_sized_chunks() {
    let cfg = SyncConfig {
        chunk_budget: 1024,
        ..SyncConfig::default()
    };
    let dev = device_with(cfg);
    let mut up = RecordingUplink::new();
    let payload: Vec<u8> = (0..3000_u32).map(|i| (i % 251) as u8).collect();
    let mut src = SliceChunkSource::new(&payload);

    dev.twin
        .on_resource_event(start(RSC_IMAGE, payload.len()), &mut src, &mut up);
    let mut offset = 0;
    while offset < payload.len() {
        assert_eq!(
            dev.twin.on_resource_event(data(RSC_IMAGE, offset), &mut src, &mut up),
            ResponseCode::Ok
        );
        let TransferState::Transferring(s) = dev.twin.resources().state() else {
            panic!("session dropped at offset {offset}");
        };
        assert!(s.cumulative_offset - offset <= 1024);
        offset = s.cumulative_offset;
    }
    assert_eq!(offset, 3000);
    assert_eq!(dev.image.with(|b| b.as_bytes()[..3000].to_vec()), payload);

    dev.twin
        .on_resource_event(complete(RSC_IMAGE, true, "01.01"), &mut src, &mut up);
    assert_eq!(text(&dev.image_version), "01.01");
}

#[test]
fn digest_mismatch_keeps_version() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let payload = b"image bytes";
    let mut src = SliceChunkSource::new(payload);
    let mut wrong = hmac_sha256::Hash::hash(payload);
    wrong[0] ^= 0xff;

    let begin = ResourceEvent {
        uref: RSC_IMAGE,
        phase: ResourcePhase::Start {
            size: payload.len(),
            old_version: "01.00",
            new_version: "09.00",
            digest: Some(wrong),
        },
    };
    assert_eq!(
        dev.twin.on_resource_event(begin, &mut src, &mut up),
        ResponseCode::Ok
    );
    dev.twin
        .on_resource_event(data(RSC_IMAGE, 0), &mut src, &mut up);
    assert_eq!(
        dev.twin.on_resource_event(complete(RSC_IMAGE, true, "09.00"), &mut src, &mut up),
        ResponseCode::DigestMismatch
    );
    assert_eq!(text(&dev.image_version), "01.00");
    assert!(up.status.is_empty());
    assert!(dev.twin.resources().is_idle());
}

#[test]
fn only_one_session_device_wide() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = SliceChunkSource::new(b"abc");

    dev.twin
        .on_resource_event(start(RSC_MESSAGE, 3), &mut src, &mut up);
    assert_eq!(
        dev.twin.on_resource_event(start(RSC_IMAGE, 3), &mut src, &mut up),
        ResponseCode::TransferInProgress
    );
    assert_eq!(
        dev.twin.on_resource_event(data(RSC_IMAGE, 0), &mut src, &mut up),
        ResponseCode::TransferInProgress
    );
    assert_eq!(src.remaining(), 3, "nothing pulled for the wrong resource");
}

#[test]
fn size_at_capacity_is_rejected() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = SliceChunkSource::default();
    assert_eq!(
        dev.twin.on_resource_event(start(RSC_IMAGE, IMAGE_CAP), &mut src, &mut up),
        ResponseCode::SizeTooLarge
    );
    assert_eq!(
        dev.twin.on_resource_event(start(RSC_IMAGE, IMAGE_CAP - 1), &mut src, &mut up),
        ResponseCode::Ok
    );
}

#[test]
fn over_reporting_source_aborts_without_write() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = ScriptedSource::new([Pull::OverReport(10)]);

    dev.twin
        .on_resource_event(start(RSC_MESSAGE, 8), &mut src, &mut up);
    assert_eq!(
        dev.twin.on_resource_event(data(RSC_MESSAGE, 0), &mut src, &mut up),
        ResponseCode::OutOfBounds
    );
    assert_eq!(text(&dev.message), "READY");
    assert!(dev.twin.resources().is_idle());
}

#[test]
fn pull_request_never_exceeds_remaining_size() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = ScriptedSource::new([Pull::Bytes(b"abcd".to_vec()), Pull::Bytes(b"ef".to_vec())]);

    dev.twin
        .on_resource_event(start(RSC_MESSAGE, 6), &mut src, &mut up);
    dev.twin
        .on_resource_event(data(RSC_MESSAGE, 0), &mut src, &mut up);
    dev.twin
        .on_resource_event(data(RSC_MESSAGE, 4), &mut src, &mut up);
    assert_eq!(src.requested, [6, 2]);
    assert_eq!(text(&dev.message), "abcdef");
}

#[test]
fn transport_error_aborts_session() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = ScriptedSource::new([Pull::Fail]);

    dev.twin
        .on_resource_event(start(RSC_IMAGE, 16), &mut src, &mut up);
    assert_eq!(
        dev.twin.on_resource_event(data(RSC_IMAGE, 0), &mut src, &mut up),
        ResponseCode::ChunkReadFailed
    );
    assert!(dev.twin.resources().is_idle());
    assert_eq!(
        dev.twin.on_resource_event(start(RSC_IMAGE, 16), &mut src, &mut up),
        ResponseCode::Ok
    );
}

#[test]
fn failed_completion_rolls_back() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = SliceChunkSource::new(b"partial");

    dev.twin
        .on_resource_event(start(RSC_MESSAGE, 7), &mut src, &mut up);
    dev.twin
        .on_resource_event(data(RSC_MESSAGE, 0), &mut src, &mut up);
    assert_eq!(
        dev.twin.on_resource_event(complete(RSC_MESSAGE, false, "02.00"), &mut src, &mut up),
        ResponseCode::Ok
    );
    assert_eq!(text(&dev.message_version), "01.00");
    assert!(up.status.is_empty());
    assert!(dev.twin.resources().is_idle());
}

#[test]
fn unknown_resource() {
    let dev = device();
    let mut up = RecordingUplink::new();
    let mut src = SliceChunkSource::default();
    assert_eq!(
        dev.twin.on_resource_event(start(7, 1), &mut src, &mut up),
        ResponseCode::UnknownResource
    );
    assert_eq!(
        dev.twin.on_resource_event(data(7, 0), &mut src, &mut up),
        ResponseCode::NoActiveTransfer
    );
}
