use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::process::Command;
use crate::profile::EncodeProfile;

/// Why an encode attempt produced no usable output
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to start encoder at {}: {source}", .bin.display())]
    Spawn {
        bin: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for encoder: {0}")]
    Io(#[source] io::Error),
    #[error("encoder {}: {}", exit_label(.code), .stderr.trim())]
    Exit { code: Option<i32>, stderr: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with code {}", c),
        None => "was terminated by a signal".to_string(),
    }
}

/// Something that can turn `input` into a re-encoded file at `output`
///
/// `Ok(())` means the process exited 0. The output file is expected at
/// `output` in that case, but callers still check it exists.
pub trait Encoder {
    fn encode(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> impl Future<Output = Result<(), EncodeError>> + Send;
}

/// Command builder for generating ffmpeg command lines
pub struct CommandBuilder;

impl CommandBuilder {
    pub fn new() -> Self {
        CommandBuilder
    }

    /// Build the argument list for one compress attempt
    pub fn build_compress_command(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite a stale output without prompting
        args.push("-y".to_string());

        args.push("-i".to_string());
        args.push(input.to_string_lossy().to_string());

        args.push("-vcodec".to_string());
        args.push(profile.video_codec.to_string());
        args.push("-crf".to_string());
        args.push(profile.crf.to_string());
        args.push("-preset".to_string());
        args.push(profile.preset.to_string());

        args.push("-acodec".to_string());
        args.push(profile.audio_codec.to_string());
        args.push("-b:a".to_string());
        args.push(profile.audio_bitrate.to_string());

        args.push("-movflags".to_string());
        args.push(profile.movflags.to_string());

        args.push("-loglevel".to_string());
        args.push(profile.loglevel.to_string());

        args.push(output.to_string_lossy().to_string());

        args
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// ffmpeg version information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FFmpegVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FFmpegVersion {
    /// Parse the first line of `ffmpeg -version`
    ///
    /// "ffmpeg version 6.1.1-3ubuntu5 Copyright ..." -> 6.1.1
    pub fn parse(version_line: &str) -> Result<Self> {
        let token = version_line
            .split_whitespace()
            .skip_while(|t| *t != "version")
            .nth(1)
            .ok_or_else(|| anyhow!("No version number found in: {}", version_line))?;

        let numeric: String = token
            .trim_start_matches('n')
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major = parts
            .next()
            .ok_or_else(|| anyhow!("Invalid version format: {}", token))?
            .parse::<u32>()
            .with_context(|| format!("Failed to parse major version from: {}", token))?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);

        Ok(FFmpegVersion { major, minor, patch })
    }
}

impl std::fmt::Display for FFmpegVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Check whether `ffmpeg -encoders` output lists an encoder by exact name
pub fn lists_encoder(encoders_output: &str, name: &str) -> bool {
    encoders_output
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(name))
}

/// Runs the real ffmpeg binary, one child process per encode
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    pub ffmpeg_bin: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }

    /// Make sure ffmpeg runs and has the encoders the profile needs
    ///
    /// Returns the detected version when the first line of `-version`
    /// could be parsed.
    pub async fn preflight(&self, profile: &EncodeProfile) -> Result<Option<FFmpegVersion>> {
        let version = self.detect_version().await?;
        match &version {
            Some(v) => info!("Using ffmpeg {} at {}", v, self.ffmpeg_bin.display()),
            None => warn!("Could not parse ffmpeg version from {}", self.ffmpeg_bin.display()),
        }

        let encoders = self.list_encoders().await?;
        let missing: Vec<&str> = profile
            .required_encoders()
            .into_iter()
            .filter(|name| !lists_encoder(&encoders, name))
            .collect();

        if !missing.is_empty() {
            return Err(anyhow!(
                "ffmpeg at {} is missing required encoder(s): {}",
                self.ffmpeg_bin.display(),
                missing.join(", ")
            ));
        }

        Ok(version)
    }

    async fn detect_version(&self) -> Result<Option<FFmpegVersion>> {
        let output = Command::new(&self.ffmpeg_bin)
            .arg("-version")
            .output()
            .await
            .with_context(|| format!("Failed to execute ffmpeg at: {}", self.ffmpeg_bin.display()))?;

        if !output.status.success() {
            return Err(anyhow!("ffmpeg version check failed ({})", output.status));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .next()
            .and_then(|line| FFmpegVersion::parse(line).ok()))
    }

    async fn list_encoders(&self) -> Result<String> {
        let output = Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .arg("-encoders")
            .output()
            .await
            .with_context(|| format!("Failed to query ffmpeg encoders at: {}", self.ffmpeg_bin.display()))?;

        if !output.status.success() {
            return Err(anyhow!("ffmpeg encoder query failed ({})", output.status));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        profile: &EncodeProfile,
    ) -> Result<(), EncodeError> {
        let args = CommandBuilder::new().build_compress_command(input, output, profile);
        debug!("Executing ffmpeg: {} {}", self.ffmpeg_bin.display(), args.join(" "));

        let child = Command::new(&self.ffmpeg_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                bin: self.ffmpeg_bin.clone(),
                source,
            })?;

        let result = child.wait_with_output().await.map_err(EncodeError::Io)?;

        if result.status.success() {
            Ok(())
        } else {
            Err(EncodeError::Exit {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            })
        }
    }
}
