use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use crate::encoder::{EncodeError, Encoder};
use crate::profile::EncodeProfile;

#[derive(Debug, Clone, Copy)]
pub enum FakeBehavior {
    /// Exit 0 with an output of `input size * ratio` bytes
    Ratio(f64),
    /// Write `partial` bytes, then exit 1
    Crash { partial: usize },
    /// Exit 0 without writing anything
    NoOutput,
}

/// Deterministic stand-in for ffmpeg used by the driver and batch tests
pub struct FakeEncoder {
    default: FakeBehavior,
    overrides: HashMap<String, FakeBehavior>,
    delay: Duration,
    calls: Mutex<Vec<PathBuf>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeEncoder {
    pub fn new(default: FakeBehavior) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Use `behavior` for inputs with this file name
    pub fn with_override(mut self, file_name: &str, behavior: FakeBehavior) -> Self {
        self.overrides.insert(file_name.to_string(), behavior);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behavior_for(&self, input: &Path) -> FakeBehavior {
        input
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.overrides.get(n))
            .copied()
            .unwrap_or(self.default)
    }
}

impl Encoder for FakeEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        _profile: &EncodeProfile,
    ) -> Result<(), EncodeError> {
        self.calls.lock().unwrap().push(input.to_path_buf());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = self.behavior_for(input);
        let result = (|| -> Result<(), EncodeError> {
            match behavior {
                FakeBehavior::Ratio(ratio) => {
                    let input_size = fs::metadata(input).map_err(EncodeError::Io)?.len();
                    let size = (input_size as f64 * ratio).round() as usize;
                    fs::write(output, vec![7u8; size]).map_err(EncodeError::Io)?;
                    Ok(())
                }
                FakeBehavior::Crash { partial } => {
                    fs::write(output, vec![9u8; partial]).map_err(EncodeError::Io)?;
                    Err(EncodeError::Exit {
                        code: Some(1),
                        stderr: "simulated encoder crash".to_string(),
                    })
                }
                FakeBehavior::NoOutput => Ok(()),
            }
        })();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
