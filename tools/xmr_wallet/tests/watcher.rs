use xmr_wallet::{LockWatcher, WatcherConfig, WatcherEvent};

const ADDRESS: &str = "shared";
const AMOUNT: u64 = 3_330_000_000_000;

#[test]
fn reports_no_lock_without_observation() {
    let watcher = LockWatcher::new(WatcherConfig::default(), ADDRESS.to_string(), AMOUNT);
    assert_eq!(watcher.evaluate(100), WatcherEvent::NoLockObserved);
}

#[test]
fn waits_for_confirmations_then_confirms() {
    let config = WatcherConfig {
        confirmations_required: 10,
        reorg_buffer: 5,
    };
    let mut watcher = LockWatcher::new(config, ADDRESS.to_string(), AMOUNT);
    watcher.observe_lock(50);

    assert_eq!(
        watcher.evaluate(55),
        WatcherEvent::AwaitingConfirmations {
            observed_height: 50,
            current_height: 55,
            remaining: 5,
        }
    );

    assert_eq!(
        watcher.evaluate(60),
        WatcherEvent::Confirmed {
            observed_height: 50,
            confirmations: 10,
        }
    );
}

#[test]
fn single_confirmation_suffices_by_default() {
    let mut watcher = LockWatcher::new(WatcherConfig::default(), ADDRESS.to_string(), AMOUNT);
    watcher.observe_lock(50);
    assert!(matches!(
        watcher.evaluate(51),
        WatcherEvent::Confirmed {
            confirmations: 1,
            ..
        }
    ));
}

#[test]
fn detects_reorg_and_clears_lock() {
    let config = WatcherConfig {
        confirmations_required: 10,
        reorg_buffer: 5,
    };
    let mut watcher = LockWatcher::new(config, ADDRESS.to_string(), AMOUNT);
    watcher.observe_lock(50);
    watcher.update_height(100);

    assert_eq!(
        watcher.update_height(90),
        Some(WatcherEvent::ReorgDetected {
            previous_height: 100,
            current_height: 90,
        })
    );
    assert_eq!(watcher.evaluate(90), WatcherEvent::NoLockObserved);
}
