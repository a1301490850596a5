//! Command dispatch and deferred responses.

use super::mock::{CMD_LED, CMD_RESET, device};

use twinsync::ResponseCode;
use twinsync::twin::commands::{ArgValue, CommandRequest, CommandResponse};

fn led(cid: u32, ticks: i64) -> CommandRequest {
    CommandRequest::new(CMD_LED, cid)
        .with_arg("ticks", ArgValue::Number(ticks))
        .unwrap()
}

#[test]
fn reset_answers_immediately() {
    let dev = device();
    let req = CommandRequest::new(CMD_RESET, 11);
    assert_eq!(dev.twin.on_command_event(&req), ResponseCode::Ok);
    assert_eq!(dev.twin.tick(), 0);
    assert_eq!(dev.twin.next_response(), None);
}

#[test]
fn led_without_delay_toggles_now() {
    let dev = device();
    assert_eq!(
        dev.twin.on_command_event(&CommandRequest::new(CMD_LED, 3)),
        ResponseCode::Ok
    );
    assert_eq!(dev.led.toggles(), 1);
    assert!(dev.led.is_high());
}

#[test]
fn led_with_delay_answers_after_ticks() {
    let dev = device();
    assert_eq!(dev.twin.on_command_event(&led(42, 2)), ResponseCode::Pending);
    assert_eq!(
        dev.twin.commands().descriptor(CMD_LED).map(|d| d.correlation_id),
        Some(42)
    );

    assert_eq!(dev.twin.tick(), 0);
    assert_eq!(dev.led.toggles(), 0);
    assert_eq!(dev.twin.tick(), 1);
    assert_eq!(dev.led.toggles(), 1);

    assert_eq!(
        dev.twin.next_response(),
        Some(CommandResponse {
            uref: CMD_LED,
            correlation_id: 42,
            code: ResponseCode::Ok,
        })
    );
    assert_eq!(dev.twin.next_response(), None);
    assert_eq!(
        dev.twin.commands().descriptor(CMD_LED).map(|d| d.correlation_id),
        Some(0)
    );
}

#[test]
fn led_delay_out_of_range_is_immediate() {
    let dev = device();
    assert_eq!(dev.twin.on_command_event(&led(5, 5)), ResponseCode::Ok);
    assert_eq!(dev.led.toggles(), 1);
    assert_eq!(dev.twin.tick(), 0);
}

#[test]
fn argument_names_match_case_insensitively() {
    let dev = device();
    let req = CommandRequest::new(CMD_LED, 8)
        .with_arg("TICKS", ArgValue::Number(1))
        .unwrap();
    assert_eq!(dev.twin.on_command_event(&req), ResponseCode::Pending);
    assert_eq!(dev.twin.tick(), 1);
}

#[test]
fn newer_pending_request_takes_over_correlation() {
    let dev = device();
    dev.twin.on_command_event(&led(1, 3));
    dev.twin.on_command_event(&led(2, 1));
    assert_eq!(
        dev.twin.next_response(),
        Some(CommandResponse {
            uref: CMD_LED,
            correlation_id: 1,
            code: ResponseCode::CommandFailed,
        })
    );
    assert_eq!(dev.twin.tick(), 1);
    assert_eq!(dev.twin.next_response().map(|r| r.correlation_id), Some(2));
    assert_eq!(dev.twin.tick(), 0);
}

#[test]
fn immediate_led_after_deferred_closes_the_deferred_one() {
    let dev = device();
    assert_eq!(dev.twin.on_command_event(&led(102, 2)), ResponseCode::Pending);
    assert_eq!(
        dev.twin.on_command_event(&CommandRequest::new(CMD_LED, 103)),
        ResponseCode::Ok
    );
    assert_eq!(dev.led.toggles(), 1);
    assert_eq!(
        dev.twin.commands().descriptor(CMD_LED).map(|d| d.correlation_id),
        Some(0)
    );
    assert_eq!(
        dev.twin.next_response(),
        Some(CommandResponse {
            uref: CMD_LED,
            correlation_id: 102,
            code: ResponseCode::CommandFailed,
        })
    );

    for _ in 0..10 {
        assert_eq!(dev.twin.tick(), 0);
    }
    assert_eq!(dev.twin.next_response(), None);
    assert_eq!(dev.led.toggles(), 1);
}

#[test]
fn unknown_command() {
    let dev = device();
    assert_eq!(
        dev.twin.on_command_event(&CommandRequest::new(99, 1)),
        ResponseCode::UnknownCommand
    );
}

#[test]
fn zero_correlation_is_malformed() {
    let dev = device();
    assert_eq!(
        dev.twin.on_command_event(&CommandRequest::new(CMD_RESET, 0)),
        ResponseCode::MalformedRequest
    );
    assert_eq!(dev.led.toggles(), 0);
}

#[test]
fn too_many_arguments_never_reach_handler() {
    let dev = device();
    let mut req = CommandRequest::new(CMD_LED, 4);
    for name in ["a", "b", "c", "d", "e", "f"] {
        req.push_arg(name, ArgValue::Bool(true)).unwrap();
    }
    assert_eq!(dev.twin.on_command_event(&req), ResponseCode::MalformedRequest);
    assert_eq!(dev.led.toggles(), 0);
}
