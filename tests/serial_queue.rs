mod common;

use sequent::{ManualScheduler, Scheduler, SerialQueue, ThreadScheduler, TimerId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn manual_queue() -> (Arc<ManualScheduler>, SerialQueue) {
    common::init_tracing();
    let scheduler = Arc::new(ManualScheduler::new());
    let queue = SerialQueue::new(scheduler.clone());
    (scheduler, queue)
}

fn thread_queue() -> SerialQueue {
    common::init_tracing();
    SerialQueue::new(Arc::new(ThreadScheduler::new().unwrap()))
}

#[test]
fn test_simple_usage() {
    let queue = thread_queue();
    let (transmitter, receiver) = mpsc::channel();

    queue.enqueue(move || {
        let _ = transmitter.send(());
    });

    receiver
        .recv_timeout(TIMEOUT)
        .expect("enqueued operation should run");
}

#[test]
fn test_operations_see_queue_context() {
    let (scheduler, queue) = manual_queue();
    let checked = Arc::new(AtomicBool::new(false));

    let inner = queue.clone();
    let flag = checked.clone();
    queue.enqueue(move || {
        inner.verify_is_current_queue();
        inner.verify_called_from_operation();
        flag.store(true, Ordering::SeqCst);
    });
    scheduler.run_until_idle();

    assert!(checked.load(Ordering::SeqCst));
}

#[test]
#[should_panic(expected = "cannot enqueue nested operations")]
fn test_enqueued_operations_cannot_enqueue_operations() {
    let (scheduler, queue) = manual_queue();

    let inner = queue.clone();
    queue.enqueue(move || inner.enqueue(|| {}));
    scheduler.run_until_idle();
}

#[test]
fn test_enqueued_operations_can_enqueue_allowing_nesting() {
    let (scheduler, queue) = manual_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner = queue.clone();
    let outer_log = log.clone();
    queue.enqueue(move || {
        let nested_log = outer_log.clone();
        inner.enqueue_allowing_nesting(move || nested_log.lock().unwrap().push("nested"));
        outer_log.lock().unwrap().push("outer");
    });

    assert_eq!(scheduler.run_until_idle(), 2);
    assert_eq!(*log.lock().unwrap(), vec!["outer", "nested"]);
}

#[test]
fn test_nested_enqueue_is_rejected_on_thread_scheduler() {
    let queue = thread_queue();
    let (transmitter, receiver) = mpsc::channel();

    let inner = queue.clone();
    let result = queue.enqueue_blocking(move || {
        let nested = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            inner.enqueue(|| {});
        }));
        let _ = transmitter.send(nested.is_err());
    });

    assert!(result.is_ok());
    assert!(receiver.recv_timeout(TIMEOUT).unwrap(), "Nested enqueue must panic");
}

#[test]
#[should_panic(expected = "expected to be called on the serial queue")]
fn test_verify_is_current_queue_outside_queue_panics() {
    let (_scheduler, queue) = manual_queue();

    queue.verify_is_current_queue();
}

#[test]
#[should_panic(expected = "no operation is executing")]
fn test_verify_called_from_operation_requires_operation() {
    let (scheduler, queue) = manual_queue();

    // Raw scheduler work runs in the queue's context, but outside of any
    // queue operation.
    let inner = queue.clone();
    scheduler.execute_now(Box::new(move || inner.verify_called_from_operation()));
    scheduler.run_until_idle();
}

#[test]
fn test_enqueue_blocking_waits() {
    let queue = thread_queue();
    let done = Arc::new(AtomicBool::new(false));

    let flag = done.clone();
    queue
        .enqueue_blocking(move || flag.store(true, Ordering::SeqCst))
        .unwrap();

    assert!(done.load(Ordering::SeqCst));
}

#[test]
fn test_can_schedule_operations_in_the_future() {
    let (scheduler, queue) = manual_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner = queue.clone();
    let steps = log.clone();
    queue.enqueue(move || {
        steps.lock().unwrap().push(1);

        let delayed = steps.clone();
        inner.enqueue_after_delay(Duration::from_millis(5), TimerId::ListenStreamIdle, move || {
            delayed.lock().unwrap().push(4);
        });

        let later = steps.clone();
        inner.enqueue_allowing_nesting(move || later.lock().unwrap().push(3));
        steps.lock().unwrap().push(2);
    });

    scheduler.run_until_idle();
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);

    scheduler.advance(Duration::from_millis(5));
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_can_cancel_delayed_operations() {
    let (scheduler, queue) = manual_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner = queue.clone();
    let steps = log.clone();
    queue.enqueue(move || {
        let delayed = steps.clone();
        let handle = inner.enqueue_after_delay(
            Duration::from_millis(1),
            TimerId::ListenStreamIdle,
            move || delayed.lock().unwrap().push("delayed"),
        );
        assert!(inner.is_scheduled(TimerId::ListenStreamIdle));

        handle.cancel();
        assert!(!inner.is_scheduled(TimerId::ListenStreamIdle));
        steps.lock().unwrap().push("done");
    });

    scheduler.advance(Duration::from_millis(10));
    assert_eq!(*log.lock().unwrap(), vec!["done"]);
}

#[test]
#[should_panic(expected = "multiple operations with id")]
fn test_rejects_duplicate_timer_ids() {
    let (scheduler, queue) = manual_queue();

    let inner = queue.clone();
    queue.enqueue(move || {
        inner.enqueue_after_delay(Duration::from_secs(1), TimerId::WriteStreamIdle, || {});
        inner.enqueue_after_delay(Duration::from_secs(2), TimerId::WriteStreamIdle, || {});
    });
    scheduler.run_until_idle();
}

#[test]
fn test_can_manually_drain_all_delayed_operations() {
    let (scheduler, queue) = manual_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner = queue.clone();
    let steps = log.clone();
    queue
        .enqueue_blocking(move || {
            steps.lock().unwrap().push(1);

            let delayed = [
                (20, TimerId::WriteStreamConnectionBackoff, 4),
                (10, TimerId::ListenStreamConnectionBackoff, 3),
            ];
            for (millis, timer_id, value) in delayed {
                let steps = steps.clone();
                inner.enqueue_after_delay(Duration::from_millis(millis), timer_id, move || {
                    steps.lock().unwrap().push(value);
                });
            }

            let nested = steps.clone();
            inner.enqueue_allowing_nesting(move || nested.lock().unwrap().push(2));
        })
        .unwrap();

    queue.run_scheduled_operations_until(TimerId::All).unwrap();

    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3, 4]);
    assert!(scheduler.is_schedule_empty());
    assert_eq!(scheduler.now(), Duration::ZERO, "Draining must not move the clock");
}

#[test]
fn test_can_manually_drain_specific_delayed_operations() {
    let (scheduler, queue) = manual_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner = queue.clone();
    let steps = log.clone();
    queue
        .enqueue_blocking(move || {
            let delayed = [
                (5, TimerId::ListenStreamIdle, 1),
                (10, TimerId::ListenStreamConnectionBackoff, 2),
                (15, TimerId::WriteStreamIdle, 3),
            ];
            for (millis, timer_id, value) in delayed {
                let steps = steps.clone();
                inner.enqueue_after_delay(Duration::from_millis(millis), timer_id, move || {
                    steps.lock().unwrap().push(value);
                });
            }
        })
        .unwrap();

    queue
        .run_scheduled_operations_until(TimerId::ListenStreamConnectionBackoff)
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    assert!(scheduler.has_pending(TimerId::WriteStreamIdle.into()));
}

#[test]
fn test_drain_delayed_operations_on_thread_scheduler() {
    let queue = thread_queue();
    let (transmitter, receiver) = mpsc::channel();

    let inner = queue.clone();
    queue
        .enqueue_blocking(move || {
            inner.enqueue_after_delay(Duration::from_secs(3600), TimerId::OnlineStateTimeout, move || {
                let _ = transmitter.send(());
            });
        })
        .unwrap();

    queue
        .run_scheduled_operations_until(TimerId::OnlineStateTimeout)
        .unwrap();

    receiver
        .recv_timeout(Duration::ZERO)
        .expect("operation should already have run");
}

#[test]
fn test_drain_with_empty_schedule_fails_on_the_queue() {
    let queue = thread_queue();

    let result = queue.run_scheduled_operations_until(TimerId::All);

    assert!(result.is_err(), "Nothing was scheduled");
}

#[test]
fn test_pending_operations_are_skipped_once_queue_is_dropped() {
    let (scheduler, queue) = manual_queue();
    let ran = Arc::new(AtomicBool::new(false));

    let flag = ran.clone();
    queue.enqueue(move || flag.store(true, Ordering::SeqCst));
    drop(queue);

    scheduler.run_until_idle();
    assert!(!ran.load(Ordering::SeqCst));
}
