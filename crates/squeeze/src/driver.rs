use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, Instant};
use anyhow::{Context, Result};
use humansize::{format_size, DECIMAL};
use log::{error, info, warn};
use crate::artifact;
use crate::encoder::Encoder;
use crate::profile::EncodeProfile;

/// Terminal state of one file's compress attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output was smaller and now sits at the original path
    Applied {
        old_size: u64,
        new_size: u64,
        elapsed: Duration,
    },
    /// Output was not smaller; original kept, output deleted
    Rejected {
        old_size: u64,
        new_size: u64,
        elapsed: Duration,
    },
    /// Encoder failed or the result could not be handled; original kept
    Failed { reason: String },
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    /// Bytes freed on disk by this outcome
    pub fn bytes_saved(&self) -> u64 {
        match self {
            Outcome::Applied { old_size, new_size, .. } => old_size - new_size,
            _ => 0,
        }
    }
}

/// Relative size change in percent, negative when the file shrank
pub fn size_delta_percent(old_size: u64, new_size: u64) -> f64 {
    if old_size == 0 {
        return 0.0;
    }
    (new_size as f64 - old_size as f64) / old_size as f64 * 100.0
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Re-encode one file and keep the result only if it is strictly smaller
///
/// Exactly one encoder call is made. Whatever happens, the temp artifact
/// is gone when this returns: promoted over the original or deleted.
pub async fn compress_file<E: Encoder>(
    encoder: &E,
    input: &Path,
    profile: &EncodeProfile,
) -> Outcome {
    let name = display_name(input);
    let temp = artifact::temp_artifact_path(input);

    let start_size = match fs::metadata(input) {
        Ok(m) => m.len(),
        Err(e) => {
            let reason = format!("failed to stat {}: {}", input.display(), e);
            error!("    Error compressing {}: {}", name, reason);
            return Outcome::Failed { reason };
        }
    };
    info!("--> Compressing: {} ({})", name, format_size(start_size, DECIMAL));

    // Only the encoder call is timed
    let started = Instant::now();
    let encoded = encoder.encode(input, &temp, profile).await;
    let elapsed = started.elapsed();

    let outcome = match encoded {
        Err(e) => Outcome::Failed {
            reason: e.to_string(),
        },
        Ok(()) => match settle(input, &temp, elapsed) {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed {
                reason: format!("{:#}", e),
            },
        },
    };

    if !outcome.is_applied() {
        if let Err(e) = artifact::discard(&temp) {
            warn!("    {:#}", e);
        }
    }

    report(&name, &outcome);
    outcome
}

/// Compare sizes after a successful encode and promote or reject
fn settle(input: &Path, temp: &Path, elapsed: Duration) -> Result<Outcome> {
    let new_size = match fs::metadata(temp) {
        Ok(m) => m.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Outcome::Failed {
                reason: "encoder exited 0 but produced no output".to_string(),
            });
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to stat temp artifact: {}", temp.display()));
        }
    };

    if new_size == 0 {
        return Ok(Outcome::Failed {
            reason: "encoder produced an empty output".to_string(),
        });
    }

    let old_size = fs::metadata(input)
        .with_context(|| format!("Failed to stat original file: {}", input.display()))?
        .len();

    if new_size < old_size {
        artifact::promote(temp, input)?;
        Ok(Outcome::Applied {
            old_size,
            new_size,
            elapsed,
        })
    } else {
        Ok(Outcome::Rejected {
            old_size,
            new_size,
            elapsed,
        })
    }
}

fn report(name: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Applied { old_size, new_size, elapsed } => info!(
            "    Done in {:.1}s. Size: {} -> {} ({:.0}%)",
            elapsed.as_secs_f64(),
            format_size(*old_size, DECIMAL),
            format_size(*new_size, DECIMAL),
            size_delta_percent(*old_size, *new_size)
        ),
        Outcome::Rejected { old_size, new_size, .. } => info!(
            "    No improvement ({} -> {}). Keeping original.",
            format_size(*old_size, DECIMAL),
            format_size(*new_size, DECIMAL)
        ),
        Outcome::Failed { reason } => error!("    Error compressing {}: {}", name, reason),
    }
}
