//! Integration tests for the allocation tracing of `ChunkPool`.
//!
//! Each test installs a thread-local `tracing` subscriber that writes formatted events into a
//! buffer, so tests running in parallel do not see each other's output.

use std::io;
use std::sync::{Arc, Mutex};

use chunk_pool::{ChunkPool, LogLevel};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Debug, Default)]
struct CapturedLog {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLog {
    fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();

        String::from_utf8_lossy(&buffer)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Number of events whose message starts with `message`.
    fn count(&self, message: &str) -> usize {
        let pattern = format!(": {message}");

        self.lines()
            .iter()
            .filter(|line| line.contains(&pattern))
            .count()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture(f: impl FnOnce()) -> CapturedLog {
    let log = CapturedLog::default();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, f);

    log
}

fn churn(log_level: LogLevel) {
    let mut pool = ChunkPool::<u64>::builder()
        .chunks_per_block(8)
        .max_blocks(2)
        .log_level(log_level)
        .build()
        .unwrap();

    let items = (0..10)
        .map(|_| pool.allocate().unwrap())
        .collect::<Vec<_>>();

    for item in items.into_iter().rev() {
        // SAFETY: Allocated from this pool and not yet deallocated.
        unsafe {
            pool.deallocate(item);
        }
    }
}

#[test]
fn show_allocations_traces_every_memory_event() {
    let log = capture(|| churn(LogLevel::ShowAllocations));

    assert_eq!(log.count("allocated block table"), 1);
    assert_eq!(log.count("allocated block"), 1 + 2);
    assert_eq!(log.count("allocated chunk"), 10);
    assert_eq!(log.count("deallocated chunk"), 10);
    assert_eq!(log.count("released block"), 2);

    assert!(log.lines().iter().all(|line| line.contains("address=0x")));
}

#[test]
fn events_follow_the_pool_lifecycle() {
    let log = capture(|| churn(LogLevel::ShowAllocations));
    let lines = log.lines();

    assert!(lines.first().unwrap().contains(": allocated block table"));
    assert!(lines.get(1).unwrap().contains(": allocated block address="));
    assert!(lines.last().unwrap().contains(": released block"));
}

#[test]
fn traced_addresses_match_handed_out_chunks() {
    let mut address = String::new();

    let log = capture(|| {
        let mut pool = ChunkPool::<u64>::builder()
            .chunks_per_block(4)
            .max_blocks(1)
            .log_level(LogLevel::ShowAllocations)
            .build()
            .unwrap();

        let item = pool.allocate().unwrap();
        address = format!("{item:?}");

        // SAFETY: Allocated from this pool and not yet deallocated.
        unsafe {
            pool.deallocate(item);
        }
    });

    let field = format!("address={address}");
    let mentions = log
        .lines()
        .into_iter()
        .filter(|line| line.split_whitespace().any(|token| token == field))
        .collect::<Vec<_>>();

    // The first chunk shares its address with the block that contains it.
    assert_eq!(mentions.len(), 4);
}

#[test]
fn off_is_silent() {
    let log = capture(|| churn(LogLevel::Off));

    assert!(log.lines().is_empty());
}
