//! TwinSync simulation: host entry point.
//!
//! Replays a scripted platform session against a [`DeviceTwin`] wired the
//! way a small LiveObjects-style device would be: a status set, a
//! telemetry stream, four configuration parameters, RESET/LED commands
//! and two resources (a message rewriting the status string, and an image).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  futures_lite::block_on                                      │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  edge_executor::LocalExecutor                          │  │
//! │  │                                                        │  │
//! │  │  ┌──────────┐  PLATFORM  ┌───────────┐  ┌───────────┐  │  │
//! │  │  │ Platform │──────────▶│ Transport │  │ Periodic  │  │  │
//! │  │  │ script   │  channel   │ callbacks │  │ tick ⏱    │  │  │
//! │  │  └──────────┘            └─────┬─────┘  └─────┬─────┘  │  │
//! │  │                                └─▶ DeviceTwin ◀┘        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Set `TWINSYNC_CONFIG` to a JSON document to override [`SyncConfig`]
//! fields; `RUST_LOG` controls verbosity.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use anyhow::{Context, Result};
use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use twinsync::adapters::log_uplink::LogUplink;
use twinsync::adapters::memory::SliceChunkSource;
use twinsync::adapters::sim_pin::SimPin;
use twinsync::registry::{FieldSet, FixedBuf, Shared, TypedField};
use twinsync::twin::commands::{ArgValue, CommandRequest, HandlerOutcome};
use twinsync::twin::handlers::{DelayedToggle, FnHandler};
use twinsync::twin::params::ParameterDescriptor;
use twinsync::twin::publisher::{DataHandle, DataStream};
use twinsync::twin::transfer::{ResourceDescriptor, ResourceSink};
use twinsync::{DeviceTwin, ResourceEvent, ResourcePhase, SyncConfig};

const APP_VERSION: &str = "TWINSYNC SIM V01.2";

const PARAM_NAME: u16 = 1;
const PARAM_TIMEOUT: u16 = 2;
const PARAM_THRESHOLD: u16 = 3;
const PARAM_GAIN: u16 = 4;

const CMD_RESET: u16 = 1;
const CMD_LED: u16 = 2;

const RSC_MESSAGE: u16 = 1;
const RSC_IMAGE: u16 = 2;

const MESSAGE_CAP: usize = 150;
const IMAGE_CAP: usize = 5 * 1024;
const VERSION_CAP: usize = 10;

// ── Platform events ───────────────────────────────────────────

/// One inbound platform message, already decoded by the transport.
enum PlatformEvent {
    PushStatus,
    Param {
        uref: u16,
        raw: Vec<u8>,
    },
    Command(CommandRequest),
    ResourceStart {
        uref: u16,
        size: usize,
        old_version: &'static str,
        new_version: &'static str,
        digest: Option<[u8; 32]>,
    },
    ResourceData {
        uref: u16,
        offset: usize,
        bytes: Vec<u8>,
    },
    ResourceComplete {
        uref: u16,
        success: bool,
        new_version: &'static str,
    },
}

static PLATFORM: Channel<CriticalSectionRawMutex, PlatformEvent, 8> = Channel::new();

// ── Application wiring ────────────────────────────────────────

struct App {
    twin: DeviceTwin,
    data: DataHandle,
    status_counter: Shared<i32>,
    sample_counter: Shared<u8>,
    ts_before: Shared<f64>,
    ts_after: Shared<f64>,
    message: Shared<FixedBuf>,
    image_version: Shared<FixedBuf>,
    led: SimPin,
    uplink: RefCell<LogUplink>,
    rx_buffer: RefCell<SliceChunkSource>,
}

fn build(config: SyncConfig) -> Result<App> {
    let status_counter = Shared::new(0_i32);
    let message = Shared::new(FixedBuf::with_text(MESSAGE_CAP, "READY"));
    let app_version = Shared::new(FixedBuf::with_text(APP_VERSION.len() + 1, APP_VERSION));

    let sample_counter = Shared::new(0_u8);
    let ts_before = Shared::new(0.0_f64);
    let ts_after = Shared::new(0.0_f64);

    let name = Shared::new(FixedBuf::with_text(20, "TICTAC"));
    let timeout = Shared::new(10_u32);
    let threshold = Shared::new(-3_i32);
    let gain = Shared::new(1.05_f32);

    let message_version = Shared::new(FixedBuf::with_text(VERSION_CAP, "01.00"));
    let image_version = Shared::new(FixedBuf::with_text(VERSION_CAP, "01.00"));
    let image = Shared::new(FixedBuf::new(IMAGE_CAP));

    let led = SimPin::new();

    let mut twin = DeviceTwin::new(config).context("twin config")?;

    twin.attach_status(
        FieldSet::new()
            .with(TypedField::text("sample_version", &app_version))
            .with(TypedField::int32("sample_counter", &status_counter))
            .with(TypedField::text("sample_message", &message)),
    )
    .context("attach status")?;

    let data = twin
        .attach_data(
            DataStream::new(
                "urn:lo:nsid:synchro",
                "latency",
                "Test",
                FieldSet::new()
                    .with(TypedField::uint8("counter", &sample_counter))
                    .with(TypedField::double("ts_before", &ts_before))
                    .with(TypedField::double("ts_after", &ts_after)),
            )
            .context("stream metadata")?,
        )
        .context("attach data")?;

    twin.register_parameter(ParameterDescriptor::text(
        PARAM_NAME,
        TypedField::text("name", &name),
    ))?;
    twin.register_parameter(ParameterDescriptor::ranged(
        PARAM_TIMEOUT,
        TypedField::uint32("timeout", &timeout),
        1..=120,
    ))?;
    twin.register_parameter(ParameterDescriptor::ranged(
        PARAM_THRESHOLD,
        TypedField::int32("threshold", &threshold),
        -10..=10,
    ))?;
    twin.register_parameter(ParameterDescriptor::ranged(
        PARAM_GAIN,
        TypedField::float("gain", &gain),
        0.0..=10.0,
    ))?;

    twin.register_command(
        CMD_RESET,
        "RESET",
        FnHandler(|_: &CommandRequest| {
            info!("APP: system reboot requested (simulated)");
            HandlerOutcome::Ok
        }),
    )?;
    twin.register_command(CMD_LED, "LED", DelayedToggle::new(led.clone()))?;

    twin.register_resource(ResourceDescriptor::new(
        RSC_MESSAGE,
        "message",
        &message_version,
        ResourceSink::Text(message.clone()),
    ))?;
    twin.register_resource(ResourceDescriptor::new(
        RSC_IMAGE,
        "image",
        &image_version,
        ResourceSink::Binary(image),
    ))?;

    Ok(App {
        twin,
        data,
        status_counter,
        sample_counter,
        ts_before,
        ts_after,
        message,
        image_version,
        led,
        uplink: RefCell::new(LogUplink::new()),
        rx_buffer: RefCell::new(SliceChunkSource::default()),
    })
}

// ── Tasks ─────────────────────────────────────────────────────

/// Transport task: turns platform events into twin callbacks.
async fn transport_loop(app: Rc<App>) {
    loop {
        let event = PLATFORM.receive().await;
        let mut up = app.uplink.borrow_mut();
        let mut rx = app.rx_buffer.borrow_mut();
        let (what, code) = match event {
            PlatformEvent::PushStatus => {
                app.twin.publish_status(&mut *up);
                continue;
            }
            PlatformEvent::Param { uref, raw } => {
                ("param", app.twin.on_parameter_event(uref, &raw))
            }
            PlatformEvent::Command(req) => ("command", app.twin.on_command_event(&req)),
            PlatformEvent::ResourceStart {
                uref,
                size,
                old_version,
                new_version,
                digest,
            } => {
                let ev = ResourceEvent {
                    uref,
                    phase: ResourcePhase::Start {
                        size,
                        old_version,
                        new_version,
                        digest,
                    },
                };
                ("rsc start", app.twin.on_resource_event(ev, &mut *rx, &mut *up))
            }
            PlatformEvent::ResourceData {
                uref,
                offset,
                bytes,
            } => {
                rx.feed(&bytes);
                let ev = ResourceEvent {
                    uref,
                    phase: ResourcePhase::Data { offset },
                };
                ("rsc data", app.twin.on_resource_event(ev, &mut *rx, &mut *up))
            }
            PlatformEvent::ResourceComplete {
                uref,
                success,
                new_version,
            } => {
                let ev = ResourceEvent {
                    uref,
                    phase: ResourcePhase::Complete {
                        success,
                        new_version,
                    },
                };
                ("rsc done", app.twin.on_resource_event(ev, &mut *rx, &mut *up))
            }
        };
        if code.is_error() {
            warn!("IO: {} -> {:?} ({})", what, code, code.code());
        } else {
            info!("IO: {} -> {:?}", what, code);
        }
    }
}

/// Periodic task: resolves deferred commands and publishes telemetry.
async fn periodic_loop(app: Rc<App>, tick: Duration, publish_every: u32) {
    let started = std::time::Instant::now();
    let mut ticks: u32 = 0;
    loop {
        Timer::after(tick).await;
        ticks = ticks.wrapping_add(1);

        app.twin.tick();
        while let Some(resp) = app.twin.next_response() {
            info!(
                "IO: deferred response uref={} cid={} -> {:?}",
                resp.uref, resp.correlation_id, resp.code
            );
        }

        if ticks % publish_every == 0 {
            app.ts_before.set(started.elapsed().as_secs_f64());
            app.sample_counter.with_mut(|c| *c = c.wrapping_add(1));
            app.status_counter.with_mut(|c| *c += 1);
            app.twin.publish_data(app.data, &mut *app.uplink.borrow_mut());
            app.ts_after.set(started.elapsed().as_secs_f64());
        }
    }
}

fn send(event: PlatformEvent) {
    if PLATFORM.try_send(event).is_err() {
        warn!("SIM: platform channel full, event dropped");
    }
}

fn command(uref: u16, cid: u32, args: &[(&str, ArgValue)]) -> Result<PlatformEvent> {
    let mut req = CommandRequest::new(uref, cid);
    for (name, value) in args {
        req.push_arg(name, value.clone())?;
    }
    Ok(PlatformEvent::Command(req))
}

/// Platform script. Returns once the session has played out.
async fn platform_script(step: Duration, tick: Duration) -> Result<()> {
    send(PlatformEvent::PushStatus);
    Timer::after(step).await;

    // Configuration updates: one accepted per kind, plus each reject reason.
    let params: [(u16, Vec<u8>); 7] = [
        (PARAM_NAME, b"BOX-42".to_vec()),
        (PARAM_NAME, b"THIS NAME IS FAR TOO LONG".to_vec()),
        (PARAM_TIMEOUT, 0_u32.to_le_bytes().to_vec()),
        (PARAM_THRESHOLD, (-3_i32).to_le_bytes().to_vec()),
        (PARAM_THRESHOLD, 5_i32.to_le_bytes().to_vec()),
        (PARAM_THRESHOLD, 11_i32.to_le_bytes().to_vec()),
        (PARAM_GAIN, 2.5_f32.to_le_bytes().to_vec()),
    ];
    for (uref, raw) in params {
        send(PlatformEvent::Param { uref, raw });
        Timer::after(step).await;
    }

    // Commands: immediate, deferred, out-of-range delay, unknown.
    send(command(CMD_LED, 101, &[])?);
    Timer::after(step).await;
    send(command(CMD_LED, 102, &[("ticks", ArgValue::Number(2))])?);
    Timer::after(step).await;
    send(command(CMD_LED, 103, &[("Ticks", ArgValue::Text("5".into()))])?);
    Timer::after(step).await;
    send(command(CMD_RESET, 104, &[])?);
    Timer::after(step).await;
    send(command(9, 105, &[])?);
    Timer::after(step).await;

    // Message resource rewrites the status string chunk by chunk.
    let text = b"Hello from the platform";
    send(PlatformEvent::ResourceStart {
        uref: RSC_MESSAGE,
        size: text.len(),
        old_version: "01.00",
        new_version: "02.00",
        digest: None,
    });
    Timer::after(step).await;
    for (i, chunk) in text.chunks(10).enumerate() {
        send(PlatformEvent::ResourceData {
            uref: RSC_MESSAGE,
            offset: i * 10,
            bytes: chunk.to_vec(),
        });
        Timer::after(step).await;
    }
    send(PlatformEvent::ResourceComplete {
        uref: RSC_MESSAGE,
        success: true,
        new_version: "02.00",
    });
    Timer::after(step).await;

    // Image resource with an integrity digest.
    let image: Vec<u8> = (0..3000_u32).map(|i| (i % 251) as u8).collect();
    send(PlatformEvent::ResourceStart {
        uref: RSC_IMAGE,
        size: image.len(),
        old_version: "01.00",
        new_version: "01.01",
        digest: Some(hmac_sha256::Hash::hash(&image)),
    });
    Timer::after(step).await;
    let mut offset = 0;
    for chunk in image.chunks(1024) {
        send(PlatformEvent::ResourceData {
            uref: RSC_IMAGE,
            offset,
            bytes: chunk.to_vec(),
        });
        offset += chunk.len();
        Timer::after(step).await;
    }
    send(PlatformEvent::ResourceComplete {
        uref: RSC_IMAGE,
        success: true,
        new_version: "01.01",
    });
    Timer::after(step).await;

    // An image that cannot fit the sink.
    send(PlatformEvent::ResourceStart {
        uref: RSC_IMAGE,
        size: IMAGE_CAP + 1,
        old_version: "01.01",
        new_version: "01.02",
        digest: None,
    });

    // Let the deferred LED command and a telemetry sample go out.
    Timer::after(tick * 4).await;
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────

fn load_config() -> Result<SyncConfig> {
    match std::env::var("TWINSYNC_CONFIG") {
        Ok(json) => SyncConfig::from_json(&json).context("TWINSYNC_CONFIG"),
        Err(_) => Ok(SyncConfig {
            tick_interval_ms: 200,
            publish_interval_ms: 1000,
            ..SyncConfig::default()
        }),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    config.validate().context("config")?;
    info!("SIM: {} starting with {:?}", APP_VERSION, config);

    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));
    let publish_every = (config.publish_interval_ms / config.tick_interval_ms).max(1);
    let step = tick / 2;

    let app = Rc::new(build(config)?);

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    executor.spawn(transport_loop(app.clone())).detach();
    executor
        .spawn(periodic_loop(app.clone(), tick, publish_every))
        .detach();

    futures_lite::future::block_on(executor.run(platform_script(step, tick)))?;

    let up = app.uplink.borrow();
    info!(
        "SIM: done | led={} toggles={} | message='{}' | image v{} | status={} data={} samples={}",
        if app.led.is_high() { "ON" } else { "OFF" },
        app.led.toggles(),
        app.message.with(|m| m.text().into_owned()),
        app.image_version.with(|v| v.text().into_owned()),
        up.status_pushes(),
        up.data_pushes(),
        app.twin.publisher().sample_count(),
    );
    Ok(())
}
