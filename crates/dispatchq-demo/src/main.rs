use clap::Parser;
use dispatchq::{BaseQueue, DelayedQueue};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Drives a small worker pool over `dispatchq::BaseQueue`, retrying failed
/// jobs through a `DelayedQueue` instead of re-enqueueing them immediately.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value_t = 4)]
    workers: usize,

    #[arg(long, default_value_t = 20)]
    jobs: u64,

    /// Every Nth job simulates a failure and is retried after a short delay.
    #[arg(long, default_value_t = 5)]
    fail_every: u64,
}

fn main() {
    let _ = Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();
    let queue = Arc::new(BaseQueue::named("dispatchq-demo"));
    let retries = Arc::new(DelayedQueue::named("dispatchq-demo-retries"));
    let completed = Arc::new(AtomicU64::new(0));
    let already_retried: Arc<Mutex<HashSet<u64>>> = Arc::new(Mutex::new(HashSet::new()));

    // Retries feed back into the main queue once their delay elapses.
    {
        let retries = retries.clone();
        let queue = queue.clone();
        std::thread::spawn(move || loop {
            match retries.get() {
                Some(job) => {
                    queue.add(job);
                    retries.done(job);
                }
                None => break,
            }
        });
    }

    let workers: Vec<_> = (0..args.workers)
        .map(|id| {
            let queue = queue.clone();
            let retries = retries.clone();
            let completed = completed.clone();
            let already_retried = already_retried.clone();
            let fail_every = args.fail_every;
            std::thread::spawn(move || loop {
                match queue.get() {
                    Some(job) => {
                        let first_attempt = already_retried.lock().unwrap().insert(job);
                        let should_fail = fail_every > 0 && job % fail_every == 0 && first_attempt;
                        if should_fail {
                            tracing::warn!(worker = id, job, "job failed, scheduling retry");
                            queue.done(job);
                            retries.add_after(job, Duration::from_millis(500));
                        } else {
                            tracing::info!(worker = id, job, "job completed");
                            queue.done(job);
                            completed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    None => break,
                }
            })
        })
        .collect();

    for job in 0..args.jobs {
        queue.add(job);
    }

    while completed.load(Ordering::SeqCst) < args.jobs {
        std::thread::sleep(Duration::from_millis(20));
    }

    queue.shutdown_with_drain();
    retries.shutdown_with_drain();
    for w in workers {
        let _ = w.join();
    }

    println!("completed {} jobs", completed.load(Ordering::SeqCst));
}
