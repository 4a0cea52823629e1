use std::path::{Path, PathBuf};
use std::process::Stdio;

use regex::Regex;
use tokio::process::Command;

use crate::atomic::{replace_file, temp_path};
use crate::error::{PostprocessError, Result};

/// Wraps the external transform binary (an ffmpeg-equivalent). Each method is a
/// pure file -> file step: on success `input` now holds the transformed audio; on
/// failure `input` is untouched and the error propagates.
#[derive(Debug, Clone)]
pub struct PostProcessor {
    ffmpeg_path: PathBuf,
}

impl PostProcessor {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self { ffmpeg_path: ffmpeg_path.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<(i32, String)> {
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        let status = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if status != 0 {
            return Err(PostprocessError::TransformFailed { status, stderr });
        }
        Ok((status, stderr))
    }

    /// Removes leading/trailing silence by reversing the stream twice around a
    /// single-pass `silenceremove` filter (the standard trick for trimming both
    /// ends with a filter that only trims the start).
    pub async fn trim_silence(&self, input: &Path) -> Result<()> {
        let temp = temp_path(input);
        let filter = "silenceremove=start_periods=1:start_duration=0:start_threshold=-50dB:detection=peak,\
                       areverse,\
                       silenceremove=start_periods=1:start_duration=0:start_threshold=-50dB:detection=peak,\
                       areverse";
        self.run(&[
            "-y",
            "-i",
            &input.to_string_lossy(),
            "-af",
            filter,
            &temp.to_string_lossy(),
        ])
        .await?;
        replace_file(input, &temp).await?;
        Ok(())
    }

    /// Two-pass EBU R128 loudness normalization: the first pass measures stats
    /// (emitted as a JSON blob embedded in stderr), the second pass re-encodes using
    /// those measured values so the filter converges in one visible step.
    pub async fn loudness_normalize(&self, input: &Path) -> Result<()> {
        let (_, stderr) = self
            .run(&[
                "-i",
                &input.to_string_lossy(),
                "-af",
                "loudnorm=I=-16:TP=-1.5:LRA=11:print_format=json",
                "-f",
                "null",
                "-",
            ])
            .await?;

        let stats = parse_loudnorm_stats(&stderr)?;

        let temp = temp_path(input);
        let filter = format!(
            "loudnorm=I=-16:TP=-1.5:LRA=11:measured_I={}:measured_TP={}:measured_LRA={}:measured_thresh={}:offset={}",
            stats.input_i, stats.input_tp, stats.input_lra, stats.input_thresh, stats.target_offset,
        );
        self.run(&["-i", &input.to_string_lossy(), "-af", &filter, &temp.to_string_lossy()]).await?;
        replace_file(input, &temp).await?;
        Ok(())
    }

    /// Re-encodes to the given codec, returning the path of the compressed file
    /// (the extension changes, so this is the one transform that doesn't keep
    /// `input`'s path — the caller is expected to use the returned path going
    /// forward and remove the pre-compression file).
    pub async fn compress(&self, input: &Path, codec: &str) -> Result<PathBuf> {
        let output = input.with_extension(codec);
        let codec_args: &[&str] = match codec {
            "opus" => &["-c:a", "libopus"],
            _ => &["-c:a", codec],
        };
        let mut args: Vec<&str> = vec!["-y", "-i"];
        let input_str = input.to_string_lossy();
        args.push(&input_str);
        args.extend_from_slice(codec_args);
        let output_str = output.to_string_lossy();
        args.push(&output_str);
        self.run(&args).await?;

        if output != input {
            tokio::fs::remove_file(input).await?;
        }
        Ok(output)
    }

    /// The default pipeline: trim silence, normalize loudness, then compress to
    /// `codec`. Returns the final on-disk path.
    pub async fn run_default_pipeline(&self, input: &Path, codec: &str) -> Result<PathBuf> {
        self.trim_silence(input).await?;
        self.loudness_normalize(input).await?;
        self.compress(input, codec).await
    }
}

#[derive(Debug, serde::Deserialize)]
struct LoudnormStats {
    input_i: String,
    input_tp: String,
    input_lra: String,
    input_thresh: String,
    target_offset: String,
}

fn parse_loudnorm_stats(stderr: &str) -> Result<LoudnormStats> {
    let re = Regex::new(r"(?s)\{.*\}").expect("static regex");
    let captured = re.find(stderr).ok_or(PostprocessError::LoudnormStatsNotFound)?;
    serde_json::from_str(captured.as_str()).map_err(|_| PostprocessError::LoudnormStatsNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loudnorm_stats_embedded_in_noisy_stderr() {
        let stderr = r#"
            some ffmpeg banner text
            [Parsed_loudnorm_0 @ 0x...]
            {
                "input_i" : "-25.50",
                "input_tp" : "-6.00",
                "input_lra" : "3.20",
                "input_thresh" : "-35.90",
                "target_offset" : "0.50"
            }
        "#;
        let stats = parse_loudnorm_stats(stderr).unwrap();
        assert_eq!(stats.input_i, "-25.50");
        assert_eq!(stats.target_offset, "0.50");
    }

    #[test]
    fn missing_stats_blob_is_an_error() {
        let err = parse_loudnorm_stats("no json here").unwrap_err();
        assert!(matches!(err, PostprocessError::LoudnormStatsNotFound));
    }

    #[test]
    fn temp_path_preserves_extension() {
        assert_eq!(temp_path(Path::new("/a/b/song.mp3")), PathBuf::from("/a/b/song.tmp.mp3"));
    }

    #[test]
    fn compress_target_path_changes_extension() {
        let input = Path::new("/a/b/song.wav");
        assert_eq!(input.with_extension("opus"), PathBuf::from("/a/b/song.opus"));
    }
}
