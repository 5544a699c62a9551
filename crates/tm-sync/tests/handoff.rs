//! Timing source to worker hand-off through a binary signal.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tm_sync::{
    PeriodicConfig, PeriodicSource, Priority, Signal, TaskSpawner, TaskSpec, Timeout, WaitOutcome,
};

#[test]
fn slow_consumer_never_builds_a_backlog() {
    let signal = Arc::new(Signal::binary());
    let mut source =
        PeriodicSource::new("overload", PeriodicConfig::periodic(Duration::from_millis(2)))
            .unwrap();

    let spawner = TaskSpawner::new();
    let consumer = {
        let signal = Arc::clone(&signal);
        spawner
            .spawn(
                TaskSpec::new("slow-consumer", 2048, Priority::new(5)),
                move |ctx| {
                    let mut handled = 0_u64;
                    while !ctx.should_stop() {
                        if signal.wait(Timeout::from_millis(20)).is_acquired() {
                            handled += 1;
                            // Cycle time far above the tick period.
                            thread::sleep(Duration::from_millis(15));
                        }
                    }
                    handled
                },
            )
            .unwrap()
    };

    source.start(signal.poster()).unwrap();
    thread::sleep(Duration::from_millis(200));
    source.stop();
    let handled = consumer.stop_and_join().unwrap();

    let ticks = source.expiry_count();
    let stats = signal.stats();
    assert!(handled > 0);
    assert!(handled <= ticks, "handled {handled} of {ticks} ticks");
    assert!(stats.saturated > 0, "overload should drop ticks");
    assert_eq!(stats.accepted + stats.saturated, ticks);
    assert!(signal.count() <= 1);
}

#[test]
fn bounded_wait_does_not_starve_without_producer() {
    let signal = Signal::binary();
    for timeout_ms in [0_u64, 1, 10, 25] {
        let start = std::time::Instant::now();
        let outcome = signal.wait(Timeout::from_millis(timeout_ms));
        let elapsed = start.elapsed();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(elapsed >= Duration::from_millis(timeout_ms));
        assert!(elapsed < Duration::from_millis(timeout_ms + 500));
    }
}

#[test]
fn each_post_wakes_one_waiter() {
    let signal = Arc::new(Signal::new(0, 4).unwrap());
    let spawner = TaskSpawner::new();

    let waiters: Vec<_> = (0..3)
        .map(|i| {
            let signal = Arc::clone(&signal);
            spawner
                .spawn(
                    TaskSpec::new(format!("waiter-{i}"), 1024, Priority::new(3)),
                    move |_ctx| signal.wait(Timeout::from_millis(500)),
                )
                .unwrap()
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    signal.post();
    signal.post();

    let acquired = waiters
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|o| o.is_acquired())
        .count();
    assert_eq!(acquired, 2);
    assert_eq!(signal.count(), 0);
}
