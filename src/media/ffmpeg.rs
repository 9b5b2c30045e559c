use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::{MediaError, Result};
use crate::media::toolkit::{MediaToolkit, SplitJob, TranscodeJob};

/// Media toolkit backed by the external `ffmpeg` and `ffprobe` binaries
pub struct FfmpegToolkit {
    config: EncoderConfig,
}

impl FfmpegToolkit {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    fn tool_available(program: &str) -> bool {
        Command::new(program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn probe_args(source: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v", "error",
            "-show_entries", "format=duration",
            "-of", "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(source.as_os_str().to_owned());
        args
    }

    fn split_args(&self, job: &SplitJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-loglevel".into(), self.config.log_level.as_str().into(),
            "-y".into(),
            "-i".into(), job.source.as_os_str().to_owned(),
            "-ss".into(), job.range.start.to_string().into(),
            "-to".into(), job.range.end.to_string().into(),
            "-c".into(), "copy".into(),
        ];
        args.push(job.output.as_os_str().to_owned());
        args
    }

    fn transcode_args(&self, job: &TranscodeJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-loglevel".into(), self.config.log_level.as_str().into(),
            "-y".into(),
            "-i".into(), job.input.as_os_str().to_owned(),
            "-c:v".into(), self.config.video_codec.as_str().into(),
            "-vf".into(), format!("scale={}:-1", job.params.target_width).into(),
            "-r".into(), job.params.fps.to_string().into(),
            "-b:v".into(), self.config.video_bitrate.as_str().into(),
        ];
        if self.config.strip_audio {
            args.push("-an".into());
        }
        args.push(job.output.as_os_str().to_owned());
        args
    }

    fn run(program: &str, args: &[OsString]) -> std::result::Result<Output, String> {
        debug!("Running {} {:?}", program, args);
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("{} execution failed: {}", program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("{} exited with {}: {}", program, output.status, stderr.trim()));
        }

        Ok(output)
    }

    fn ensure_output(path: &Path) -> std::result::Result<(), String> {
        if path.is_file() {
            Ok(())
        } else {
            Err(format!("output file not created: {}", path.display()))
        }
    }
}

/// Parse the bare `format=duration` value printed by ffprobe
pub fn parse_duration_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
}

impl MediaToolkit for FfmpegToolkit {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn probe_duration(&self, source: &Path) -> Result<f64> {
        let path = source.display().to_string();
        let output = Self::run(&self.config.ffprobe_path, &Self::probe_args(source))
            .map_err(|reason| MediaError::ProbeFailed { path: path.clone(), reason })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration = parse_duration_output(&stdout).ok_or_else(|| MediaError::ProbeFailed {
            path,
            reason: format!("unparseable duration output: {:?}", stdout.trim()),
        })?;

        Ok(duration)
    }

    fn split(&self, job: &SplitJob) -> Result<()> {
        Self::run(&self.config.ffmpeg_path, &self.split_args(job))
            .and_then(|_| Self::ensure_output(&job.output))
            .map_err(|reason| MediaError::SplitFailed { segment_id: job.segment_id, reason })?;
        Ok(())
    }

    fn transcode(&self, job: &TranscodeJob) -> Result<()> {
        Self::run(&self.config.ffmpeg_path, &self.transcode_args(job))
            .and_then(|_| Self::ensure_output(&job.output))
            .map_err(|reason| MediaError::TranscodeFailed {
                segment_id: job.segment_id,
                fps: job.params.fps,
                reason,
            })?;
        Ok(())
    }

    fn check_available(&self) -> Result<()> {
        for tool in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            if !Self::tool_available(tool) {
                return Err(MediaError::ToolNotFound { tool: tool.clone() }.into());
            }
        }
        Ok(())
    }
}
