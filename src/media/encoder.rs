//! Per-take encoding through an `ffmpeg` child process.
//!
//! Camera frames are piped to ffmpeg's stdin in the camera's native format
//! and encoded to H.264. The microphone is written to a WAV file alongside;
//! when the take finishes the two are muxed into one MP4.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use nokhwa::utils::FrameFormat;
use tempfile::TempPath;

use super::microphone::AudioTap;
use super::{RecordedFile, TakeId, RECORDING_MEDIA_TYPE};
use crate::error::DeviceError;

const FFMPEG: &str = "ffmpeg";

/// Fail early when ffmpeg is not installed.
pub fn check_available() -> Result<(), DeviceError> {
    match Command::new(FFMPEG)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(DeviceError::Encoder(format!("ffmpeg -version exited with {status}"))),
        Err(e) => Err(DeviceError::Encoder(format!("ffmpeg not available: {e}"))),
    }
}

fn pixel_format(format: FrameFormat) -> Option<&'static str> {
    match format {
        FrameFormat::YUYV => Some("yuyv422"),
        FrameFormat::NV12 => Some("nv12"),
        FrameFormat::GRAY => Some("gray"),
        FrameFormat::RAWRGB => Some("rgb24"),
        _ => None,
    }
}

/// ffmpeg input options for frames in `format` read from stdin.
pub fn input_args(
    format: FrameFormat,
    width: u32,
    height: u32,
    frame_rate: u32,
) -> Result<Vec<String>, DeviceError> {
    let mut args: Vec<String> = Vec::new();
    if format == FrameFormat::MJPEG {
        args.extend(["-f", "mjpeg"].map(String::from));
    } else {
        let pixel_format = pixel_format(format).ok_or_else(|| {
            DeviceError::Encoder(format!("unsupported camera frame format {format:?}"))
        })?;
        args.extend(["-f", "rawvideo", "-pixel_format", pixel_format].map(String::from));
        args.push("-video_size".into());
        args.push(format!("{width}x{height}"));
    }
    args.push("-framerate".into());
    args.push(frame_rate.max(1).to_string());
    args.extend(["-i", "-"].map(String::from));
    Ok(args)
}

fn encode_args(frame_rate: u32, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = [
        "-an", "-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p", "-crf", "23",
    ]
    .map(String::from)
    .to_vec();
    args.push("-g".into());
    args.push((frame_rate.max(1) * 2).to_string());
    args.extend(["-movflags", "+faststart"].map(String::from));
    args.push(output.to_string_lossy().into_owned());
    args
}

fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];
    args.push("-i".into());
    args.push(video.to_string_lossy().into_owned());
    args.push("-i".into());
    args.push(audio.to_string_lossy().into_owned());
    args.extend(
        [
            "-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac", "-b:a", "128k",
            "-shortest", "-movflags", "+faststart",
        ]
        .map(String::from),
    );
    args.push(output.to_string_lossy().into_owned());
    args
}

fn temp_path(suffix: &str) -> Result<TempPath, DeviceError> {
    tempfile::Builder::new()
        .prefix("candidate-video-")
        .suffix(suffix)
        .tempfile()
        .map(|file| file.into_temp_path())
        .map_err(|e| DeviceError::Encoder(format!("failed to create temp file: {e}")))
}

/// Encoder for one take. Frames are streamed to ffmpeg as they arrive.
pub struct TakeEncoder {
    take: TakeId,
    process: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    video_path: Option<TempPath>,
    audio: Option<(AudioTap, TempPath)>,
    frames: u64,
}

impl TakeEncoder {
    pub fn start(
        take: TakeId,
        input: &[String],
        frame_rate: u32,
        audio: Option<AudioTap>,
    ) -> Result<Self, DeviceError> {
        let video_path = temp_path(".mp4")?;

        let mut process = Command::new(FFMPEG)
            .args(["-y", "-loglevel", "error"])
            .args(input)
            .args(encode_args(frame_rate, &video_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DeviceError::Encoder(format!("failed to start ffmpeg: {e}")))?;
        let stdin = process.stdin.take().map(BufWriter::new);

        let audio = match audio {
            Some(tap) => {
                let path = temp_path(".wav")?;
                match tap.begin(&path) {
                    Ok(()) => Some((tap, path)),
                    Err(e) => {
                        log::warn!("Recording take {take} without audio: {e}");
                        None
                    }
                }
            }
            None => None,
        };

        log::info!(
            "Started encoder for take {take}: {}",
            video_path.display()
        );
        Ok(Self {
            take,
            process: Some(process),
            stdin,
            video_path: Some(video_path),
            audio,
            frames: 0,
        })
    }

    pub fn write_frame(&mut self, data: &[u8]) -> Result<(), DeviceError> {
        let stdin = self.stdin.as_mut().ok_or(DeviceError::Released)?;
        stdin
            .write_all(data)
            .map_err(|e| DeviceError::Encoder(format!("ffmpeg stopped accepting frames: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    /// Close the input, wait for ffmpeg and mux in the audio.
    pub fn finish(mut self) -> Result<RecordedFile, DeviceError> {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                log::warn!("Failed to flush frames for take {}: {e}", self.take);
            }
        }
        let process = self.process.take().ok_or(DeviceError::Released)?;
        let output = process
            .wait_with_output()
            .map_err(|e| DeviceError::Encoder(format!("failed to wait for ffmpeg: {e}")))?;

        let audio = self.audio.take();
        let audio_samples = match &audio {
            Some((tap, _)) => tap.finish().unwrap_or_else(|e| {
                log::warn!("Audio for take {} lost: {e}", self.take);
                0
            }),
            None => 0,
        };

        if self.frames == 0 {
            return Err(DeviceError::Encoder("no frames were captured".into()));
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeviceError::Encoder(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let video_path = self.video_path.take().ok_or(DeviceError::Released)?;
        let (path, has_audio) = match audio {
            Some((_, audio_path)) if audio_samples > 0 => match mux(&video_path, &audio_path) {
                Ok(muxed) => (muxed, true),
                Err(e) => {
                    log::warn!("Keeping take {} without audio: {e}", self.take);
                    (video_path, false)
                }
            },
            _ => (video_path, false),
        };

        let size = std::fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| DeviceError::Encoder(format!("encoded file missing: {e}")))?;
        log::info!(
            "Take {} encoded: {} frames, {size} bytes, audio={has_audio}",
            self.take,
            self.frames
        );
        Ok(RecordedFile {
            media_type: RECORDING_MEDIA_TYPE,
            path,
            size,
            has_audio,
        })
    }
}

impl Drop for TakeEncoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut process) = self.process.take() {
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}

fn mux(video: &Path, audio: &Path) -> Result<TempPath, DeviceError> {
    let output_path = temp_path(".mp4")?;
    let output = Command::new(FFMPEG)
        .args(mux_args(video, audio, &output_path))
        .stdin(Stdio::null())
        .output()
        .map_err(|e| DeviceError::Encoder(format!("failed to start ffmpeg: {e}")))?;
    if !output.status.success() {
        return Err(DeviceError::Encoder(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mjpeg_frames_are_read_as_a_jpeg_stream() {
        let args = input_args(FrameFormat::MJPEG, 640, 480, 30).unwrap();
        assert_eq!(args, ["-f", "mjpeg", "-framerate", "30", "-i", "-"]);
    }

    #[test]
    fn raw_frames_declare_pixel_format_and_size() {
        let args = input_args(FrameFormat::YUYV, 640, 480, 30).unwrap();
        assert_eq!(
            args,
            [
                "-f", "rawvideo", "-pixel_format", "yuyv422", "-video_size", "640x480",
                "-framerate", "30", "-i", "-"
            ]
        );
    }

    #[test]
    fn mux_copies_video_and_encodes_audio() {
        let args = mux_args(Path::new("/tmp/v.mp4"), Path::new("/tmp/a.wav"), Path::new("/tmp/o.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-i /tmp/v.mp4 -i /tmp/a.wav"));
        assert!(joined.contains("-c:v copy -c:a aac"));
        assert!(joined.ends_with("/tmp/o.mp4"));
    }

    fn ffmpeg_with_x264() -> bool {
        Command::new(FFMPEG)
            .args(["-hide_banner", "-encoders"])
            .output()
            .map(|out| out.status.success() && String::from_utf8_lossy(&out.stdout).contains("libx264"))
            .unwrap_or(false)
    }

    #[test]
    fn finished_take_is_a_playable_mp4_with_audio() {
        if !ffmpeg_with_x264() {
            eprintln!("skipping: ffmpeg with libx264 not installed");
            return;
        }
        let (width, height, fps) = (64, 48, 10);
        let input = input_args(FrameFormat::GRAY, width, height, fps).unwrap();
        let tap = AudioTap::new(16_000);

        let mut encoder = TakeEncoder::start(1, &input, fps, Some(tap.clone())).unwrap();
        for i in 0..20u8 {
            encoder.write_frame(&vec![i * 10; (width * height) as usize]).unwrap();
            tap.write(&[0.25; 1600]);
        }
        let recorded = encoder.finish().unwrap();

        assert_eq!(recorded.media_type, "video/mp4");
        assert!(recorded.has_audio);
        let head = std::fs::read(&recorded.path).unwrap();
        assert_eq!(head.len() as u64, recorded.size);
        assert_eq!(&head[4..8], b"ftyp");
    }

    #[test]
    fn take_without_frames_is_an_error() {
        if !ffmpeg_with_x264() {
            eprintln!("skipping: ffmpeg with libx264 not installed");
            return;
        }
        let input = input_args(FrameFormat::GRAY, 64, 48, 10).unwrap();
        let encoder = TakeEncoder::start(1, &input, 10, None).unwrap();
        assert!(matches!(encoder.finish(), Err(DeviceError::Encoder(_))));
    }
}
