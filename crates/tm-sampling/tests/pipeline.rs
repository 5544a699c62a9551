//! End-to-end runs of the sampling subsystem against stand-in hardware.

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tm_sampling::{
    ChannelFault, PulseConfig, RecordingIndicator, SamplingError, SamplingSubsystem,
    ScriptedChannel, SimulatedChannel, SimulationConfig, SubsystemConfig,
};
use tm_sync::{PeriodicConfig, TaskSpawner};

fn config(period_ms: u64, hold_ms: u64) -> SubsystemConfig {
    SubsystemConfig {
        timer: PeriodicConfig::periodic(Duration::from_millis(period_ms)),
        pulse: PulseConfig {
            hold: Duration::from_millis(hold_ms),
            settle: Duration::ZERO,
        },
        ..Default::default()
    }
}

#[test]
fn overload_drops_ticks_instead_of_queuing() {
    let spawner = TaskSpawner::new();
    let indicator = RecordingIndicator::new();
    let observer = indicator.clone();
    let channel = SimulatedChannel::new("adc0", SimulationConfig::default());

    // Ticks every 2 ms against a cycle of at least 15 ms.
    let running = SamplingSubsystem::new(config(2, 15))
        .unwrap()
        .start(channel, indicator, &spawner)
        .unwrap();
    thread::sleep(Duration::from_millis(250));
    let (report, _worker) = running.stop().unwrap();

    assert!(report.samples > 0);
    assert!(report.samples <= report.ticks_posted);
    assert!(report.ticks_dropped > 0, "expected dropped ticks: {report:?}");
    // At most one tick can be pending when the timer stops.
    assert!(report.ticks_posted - report.ticks_dropped <= report.samples + 1);
    assert_eq!(observer.pulses() as u64, report.samples);
    assert!(report.mean_cycle_s >= 0.015);
}

#[test]
fn not_ready_channel_never_reads() {
    let spawner = TaskSpawner::new();
    let channel = ScriptedChannel::new([Ok(100), Ok(200)]).not_ready();
    let reads = channel.read_counter();

    let err = SamplingSubsystem::new(config(5, 1))
        .unwrap()
        .start(channel, RecordingIndicator::new(), &spawner)
        .err()
        .expect("start must fail");

    assert!(matches!(err, SamplingError::HardwareUnavailable { .. }));
    thread::sleep(Duration::from_millis(30));
    assert_eq!(reads.load(Ordering::Relaxed), 0);
    assert_eq!(spawner.spawned(), 0);
}

#[test]
fn read_failures_do_not_advance_sequence() {
    let spawner = TaskSpawner::new();
    let script = [
        Ok(900),
        Err(ChannelFault::IO),
        Ok(901),
        Err(ChannelFault::IO),
        Ok(902),
    ];
    let channel = ScriptedChannel::new(script);
    let reads = channel.read_counter();

    let running = SamplingSubsystem::new(config(5, 1))
        .unwrap()
        .start(channel, RecordingIndicator::new(), &spawner)
        .unwrap();

    // Wait until the script is used up; later reads fail with NO_DATA.
    let mut waited = Duration::ZERO;
    while reads.load(Ordering::Relaxed) < 5 && waited < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(5));
        waited += Duration::from_millis(5);
    }
    let (report, worker) = running.stop().unwrap();

    assert_eq!(report.samples, 3);
    assert_eq!(report.last_sequence, 3);
    assert_eq!(worker.sequence(), 3);
    assert_eq!(report.read_failures, reads.load(Ordering::Relaxed) - 3);
}

#[test]
fn stop_returns_devices_to_caller() {
    let spawner = TaskSpawner::new();
    let indicator = RecordingIndicator::new();
    let running = SamplingSubsystem::new(config(10, 1))
        .unwrap()
        .start(
            SimulatedChannel::new("adc0", SimulationConfig::default()),
            indicator,
            &spawner,
        )
        .unwrap();
    thread::sleep(Duration::from_millis(60));
    let (report, worker) = running.stop().unwrap();

    let (channel, indicator) = worker.into_parts();
    assert_eq!(channel.reads(), report.samples);
    assert_eq!(indicator.pulses() as u64, report.samples);
    // Idle between pulses and after stop.
    assert_eq!(indicator.history().last(), Some(&false));
}
