use std::sync::Arc;
use std::time::{Duration, Instant};
use humansize::{format_size, DECIMAL};
use log::{error, info};
use tokio::task::JoinSet;
use crate::driver::{compress_file, Outcome};
use crate::encoder::Encoder;
use crate::profile::EncodeProfile;
use crate::scan::Candidate;

/// Totals for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub applied: usize,
    pub rejected: usize,
    pub failed: usize,
    pub bytes_saved: u64,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        self.bytes_saved += outcome.bytes_saved();
        match outcome {
            Outcome::Applied { .. } => self.applied += 1,
            Outcome::Rejected { .. } => self.rejected += 1,
            Outcome::Failed { .. } => self.failed += 1,
        }
    }
}

/// Compress every candidate once, keeping at most `jobs` encodes in flight
///
/// With `jobs == 1` files are handled strictly one after another in the
/// given order. A failed file never stops the batch or its siblings.
pub async fn run_batch<E>(
    encoder: Arc<E>,
    candidates: Vec<Candidate>,
    jobs: usize,
    profile: EncodeProfile,
) -> BatchSummary
where
    E: Encoder + Send + Sync + 'static,
{
    let started = Instant::now();
    let total = candidates.len();
    let mut summary = BatchSummary::default();

    if jobs <= 1 {
        for (i, candidate) in candidates.into_iter().enumerate() {
            info!("[{}/{}] Processing {}", i + 1, total, candidate.path.display());
            let outcome = compress_file(encoder.as_ref(), &candidate.path, &profile).await;
            summary.record(&outcome);
        }
    } else {
        let mut in_flight = JoinSet::new();
        for (i, candidate) in candidates.into_iter().enumerate() {
            while in_flight.len() >= jobs {
                collect_next(&mut in_flight, &mut summary).await;
            }

            info!("[{}/{}] Processing {}", i + 1, total, candidate.path.display());
            let encoder = Arc::clone(&encoder);
            in_flight.spawn(async move {
                compress_file(encoder.as_ref(), &candidate.path, &profile).await
            });
        }
        while !in_flight.is_empty() {
            collect_next(&mut in_flight, &mut summary).await;
        }
    }

    summary.elapsed = started.elapsed();
    info!(
        "Batch complete: {} processed in {:.1}s ({} applied, {} no improvement, {} failed, {} saved)",
        summary.processed,
        summary.elapsed.as_secs_f64(),
        summary.applied,
        summary.rejected,
        summary.failed,
        format_size(summary.bytes_saved, DECIMAL)
    );
    summary
}

async fn collect_next(in_flight: &mut JoinSet<Outcome>, summary: &mut BatchSummary) {
    match in_flight.join_next().await {
        Some(Ok(outcome)) => summary.record(&outcome),
        Some(Err(e)) => {
            error!("Compression task aborted: {}", e);
            summary.record(&Outcome::Failed {
                reason: e.to_string(),
            });
        }
        None => {}
    }
}
