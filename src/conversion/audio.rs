//! MP3 transcoding via ffmpeg.
//!
//! A single pass applies the requested bitrate plus the optional edits:
//! trim window (seek before decode for the start, output duration bound
//! for the end), loudness normalization, and the mp3 sample-rate ceiling.

use std::path::Path;

use crate::core::config;
use crate::core::error::AppError;
use crate::core::process::{run_tool, stderr_tail};
use crate::core::validation::TrimWindow;

/// Highest sample rate the mp3 container supports. Sources above it
/// (e.g. 96 kHz masters) are clamped to this ceiling.
pub const MP3_SAMPLE_RATE_CEILING: u32 = 48_000;

/// Loudness normalization filter applied when the caller asks for it.
pub const NORMALIZE_FILTER: &str = "dynaudnorm";

/// Edits applied during the transcode pass.
#[derive(Debug, Clone, Default)]
pub struct TranscodeOptions {
    pub bitrate_kbps: u32,
    pub trim: Option<TrimWindow>,
    pub normalize: bool,
}

/// Assemble the ffmpeg argument vector for one transcode pass.
///
/// Argument order matters: a trim start seeks before the input is opened
/// (`-ss` before `-i`), the duration bound applies to the output
/// (`-t` after `-i`).
pub fn build_transcode_args(input: &Path, output: &Path, opts: &TranscodeOptions) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if let Some(start) = opts.trim.as_ref().and_then(|t| t.start_secs) {
        args.push("-ss".to_string());
        args.push(format_seconds(start));
    }

    args.push("-i".to_string());
    args.push(input.to_string_lossy().into_owned());

    if let Some(duration) = opts.trim.as_ref().and_then(|t| t.output_duration()) {
        args.push("-t".to_string());
        args.push(format_seconds(duration));
    }

    if opts.normalize {
        args.push("-af".to_string());
        args.push(NORMALIZE_FILTER.to_string());
    }

    args.extend(["-vn", "-codec:a", "libmp3lame", "-b:a"].iter().map(|s| s.to_string()));
    args.push(format!("{}k", opts.bitrate_kbps));
    args.push("-ar".to_string());
    args.push(MP3_SAMPLE_RATE_CEILING.to_string());

    args.push(output.to_string_lossy().into_owned());
    args
}

/// Re-encode the downloaded artifact to MP3 CBR at the requested bitrate.
pub async fn transcode_to_mp3(
    ffmpeg: &str,
    input: &Path,
    output: &Path,
    opts: &TranscodeOptions,
) -> Result<(), AppError> {
    let args = build_transcode_args(input, output, opts);

    match run_tool(ffmpeg, &args, config::process::transcode_timeout()).await {
        Ok(_) => Ok(()),
        Err(AppError::Timeout(secs)) => Err(AppError::Timeout(secs)),
        Err(AppError::ToolExecution(msg)) => Err(AppError::TranscodeFailed(stderr_tail(&msg))),
        Err(other) => Err(other),
    }
}

fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{:.3}", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args_for(opts: &TranscodeOptions) -> Vec<String> {
        build_transcode_args(&PathBuf::from("/job/audio.m4a"), &PathBuf::from("/job/output.mp3"), opts)
    }

    fn position(args: &[String], needle: &str) -> usize {
        args.iter().position(|a| a == needle).unwrap_or_else(|| panic!("missing {}", needle))
    }

    #[test]
    fn test_plain_transcode_args() {
        let args = args_for(&TranscodeOptions {
            bitrate_kbps: 192,
            trim: None,
            normalize: false,
        });

        assert!(args.contains(&"libmp3lame".to_string()));
        assert!(args.contains(&"192k".to_string()));
        assert!(args.contains(&"48000".to_string()));
        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-t".to_string()));
        assert!(!args.contains(&"-af".to_string()));
        assert_eq!(args.last().unwrap(), "/job/output.mp3");
    }

    #[test]
    fn test_trim_and_normalize_ordering() {
        // start=10s end=20s: seek to 10, bound output to 10s, then filter
        let args = args_for(&TranscodeOptions {
            bitrate_kbps: 128,
            trim: Some(TrimWindow {
                start_secs: Some(10.0),
                end_secs: Some(20.0),
            }),
            normalize: true,
        });

        let ss = position(&args, "-ss");
        let input = position(&args, "-i");
        let t = position(&args, "-t");
        let af = position(&args, "-af");

        assert!(ss < input, "-ss must seek before the input is opened");
        assert!(input < t, "-t must bound the output, after -i");
        assert!(t < af);

        assert_eq!(args[ss + 1], "10");
        assert_eq!(args[t + 1], "10");
        assert_eq!(args[af + 1], NORMALIZE_FILTER);
    }

    #[test]
    fn test_end_only_trim_bounds_from_zero() {
        let args = args_for(&TranscodeOptions {
            bitrate_kbps: 128,
            trim: Some(TrimWindow {
                start_secs: None,
                end_secs: Some(30.0),
            }),
            normalize: false,
        });

        assert!(!args.contains(&"-ss".to_string()));
        let t = position(&args, "-t");
        assert_eq!(args[t + 1], "30");
    }

    #[test]
    fn test_start_only_trim_has_no_duration_bound() {
        let args = args_for(&TranscodeOptions {
            bitrate_kbps: 128,
            trim: Some(TrimWindow {
                start_secs: Some(5.5),
                end_secs: None,
            }),
            normalize: false,
        });

        let ss = position(&args, "-ss");
        assert_eq!(args[ss + 1], "5.500");
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(10.0), "10");
        assert_eq!(format_seconds(10.25), "10.250");
        assert_eq!(format_seconds(0.0), "0");
    }
}
