use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::info;

use super::sink::{FrameSink, SinkConfig};
use crate::error::{Result, VideoError};

const STAGE: &str = "video encoding";

/// Frames buffered between the renderer and the stdin writer.
const QUEUED_FRAMES: usize = 2;

/// Streams raw RGBA frames into a system `ffmpeg` process.
///
/// Frames go through a bounded queue to a writer thread so a stalled encoder
/// cannot block the caller past the deadline.
pub struct FfmpegSink {
    program: OsString,
    leading_args: Vec<OsString>,
    out_path: PathBuf,
    timeout: Duration,
    deadline: Option<Instant>,
    started: bool,
    cfg: Option<SinkConfig>,
    child: Option<Child>,
    frames: Option<SyncSender<Vec<u8>>>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl FfmpegSink {
    pub fn new(out_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: "ffmpeg".into(),
            leading_args: Vec::new(),
            out_path: out_path.into(),
            timeout,
            deadline: None,
            started: false,
            cfg: None,
            child: None,
            frames: None,
            writer: None,
            stderr_drain: None,
        }
    }

    /// Whether an encoder process was spawned, i.e. the output may have been touched.
    pub fn started(&self) -> bool {
        self.started
    }

    fn check_deadline(&mut self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => {
                self.kill();
                Err(VideoError::Timeout {
                    stage: STAGE,
                    seconds: self.timeout.as_secs(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Stop the encoder. A writer blocked on the pipe fails once the child is gone.
    fn kill(&mut self) {
        drop(self.frames.take());
        drop(self.writer.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn collect_stderr(&mut self) -> String {
        let bytes = self
            .stderr_drain
            .take()
            .and_then(|handle| handle.join().ok())
            .and_then(|r| r.ok())
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).trim().to_string()
    }

    fn join_writer(&mut self) -> std::io::Result<()> {
        match self.writer.take().map(JoinHandle::join) {
            Some(Ok(result)) => result,
            Some(Err(_)) => Err(std::io::Error::other("stdin writer thread panicked")),
            None => Ok(()),
        }
    }

    /// Wait for exit, polling so the deadline still applies.
    fn wait_child(&mut self) -> Result<std::process::ExitStatus> {
        loop {
            let child = self
                .child
                .as_mut()
                .ok_or_else(|| VideoError::Encoding("ffmpeg sink not started".to_string()))?;
            if let Some(status) = child.try_wait()? {
                self.child = None;
                return Ok(status);
            }
            self.check_deadline()?;
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

/// Command-line arguments for encoding `cfg` into `out_path`.
pub fn build_args(cfg: &SinkConfig, out_path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", cfg.width, cfg.height),
        "-r",
        &cfg.fps.to_string(),
        "-i",
        "pipe:0",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    if let Some(audio) = &cfg.audio {
        args.push("-i".into());
        args.push(audio.into());
        args.extend(
            ["-map", "0:v:0", "-map", "1:a:0", "-c:a", "aac"]
                .iter()
                .map(OsString::from),
        );
    } else {
        args.push("-an".into());
    }

    args.extend(
        [
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-r",
            &cfg.fps.to_string(),
            "-t",
            &format!("{:.3}", cfg.duration),
            "-movflags",
            "+faststart",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(out_path.into());
    args
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<()> {
        if cfg.fps == 0 {
            return Err(VideoError::Encoding("fps must be non-zero".to_string()));
        }
        if cfg.width == 0 || cfg.height == 0 || cfg.width % 2 != 0 || cfg.height % 2 != 0 {
            return Err(VideoError::Encoding(format!(
                "frame size must be non-zero and even for yuv420p, got {}x{}",
                cfg.width, cfg.height
            )));
        }
        if let Some(parent) = self.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(
            "Rendering {} ({}x{} @ {} fps)",
            self.out_path.display(),
            cfg.width,
            cfg.height,
            cfg.fps
        );

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(build_args(&cfg, &self.out_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::Encoding(format!("Failed to run FFmpeg: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VideoError::Encoding("failed to open ffmpeg stdin".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VideoError::Encoding("failed to open ffmpeg stderr".to_string()))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        let (frames, queue) = mpsc::sync_channel::<Vec<u8>>(QUEUED_FRAMES);
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            for frame in queue {
                stdin.write_all(&frame)?;
            }
            Ok(())
        });

        self.started = true;
        self.deadline = Some(Instant::now() + self.timeout);
        self.child = Some(child);
        self.frames = Some(frames);
        self.writer = Some(writer);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, frame: &RgbaImage) -> Result<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VideoError::Encoding("ffmpeg sink not started".to_string()))?;
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(VideoError::Encoding(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        let frames = self
            .frames
            .clone()
            .ok_or_else(|| VideoError::Encoding("ffmpeg sink already finished".to_string()))?;

        let mut data = frame.as_raw().clone();
        loop {
            match frames.try_send(data) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    data = back;
                    self.check_deadline()?;
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(TrySendError::Disconnected(_)) => {
                    // ffmpeg quit early; its stderr explains why.
                    let write_err = self.join_writer().err();
                    self.kill();
                    let stderr = self.collect_stderr();
                    return Err(VideoError::Encoding(format!(
                        "failed to write frame to ffmpeg ({}): {stderr}",
                        write_err.map(|e| e.to_string()).unwrap_or_default()
                    )));
                }
            }
        }
    }

    fn end(&mut self) -> Result<()> {
        // Closing the queue lets the writer drain and close stdin.
        drop(self.frames.take());
        let status = self.wait_child()?;
        let write_result = self.join_writer();
        let stderr = self.collect_stderr();
        self.cfg = None;

        if let Err(e) = write_result {
            if status.success() {
                return Err(VideoError::Encoding(format!(
                    "failed to write frames to ffmpeg: {e}"
                )));
            }
        }

        if !status.success() {
            return Err(VideoError::Encoding(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        info!("Video saved to: {}", self.out_path.display());
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(audio: Option<PathBuf>) -> SinkConfig {
        SinkConfig {
            width: 1080,
            height: 1920,
            fps: 24,
            audio,
            duration: 30.0,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn args_mux_audio_with_fixed_codecs() {
        let args = strings(build_args(
            &cfg(Some(PathBuf::from("assets/voiceover.mp3"))),
            Path::new("output/final_short.mp4"),
        ));
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1080x1920 -r 24 -i pipe:0"));
        assert!(joined.contains("-i assets/voiceover.mp3 -map 0:v:0 -map 1:a:0 -c:a aac"));
        assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p"));
        assert!(joined.contains("-t 30.000"));
        assert_eq!(args.last().map(String::as_str), Some("output/final_short.mp4"));
    }

    #[test]
    fn args_without_audio_disable_audio_stream() {
        let args = strings(build_args(&cfg(None), Path::new("out.mp4")));
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"aac".to_string()));
    }

    #[test]
    fn odd_dimensions_are_rejected_before_spawning() {
        let mut sink = FfmpegSink::new("out.mp4", Duration::from_secs(1));
        let mut bad = cfg(None);
        bad.width = 1081;
        assert!(matches!(sink.begin(bad), Err(VideoError::Encoding(_))));
    }

    #[test]
    fn rejected_config_does_not_start() {
        let mut sink = FfmpegSink::new("out.mp4", Duration::from_secs(1));
        let mut bad = cfg(None);
        bad.fps = 0;
        assert!(sink.begin(bad).is_err());
        assert!(!sink.started());
    }

    #[cfg(unix)]
    #[test]
    fn stalled_encoder_hits_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        // An "encoder" that never reads stdin; extra arguments become $0, $1, ...
        let mut sink = FfmpegSink::new(dir.path().join("out.mp4"), Duration::from_millis(300));
        sink.program = "sh".into();
        sink.leading_args = vec!["-c".into(), "exec sleep 30".into()];

        let mut small = cfg(None);
        small.width = 256;
        small.height = 256;
        sink.begin(small).unwrap();
        assert!(sink.started());

        // Each frame is larger than a pipe buffer, so the writer blocks at once.
        let frame = RgbaImage::new(256, 256);
        let started = Instant::now();
        let err = loop {
            if let Err(e) = sink.push_frame(&frame) {
                break e;
            }
            assert!(started.elapsed() < Duration::from_secs(10));
        };

        assert!(matches!(
            err,
            VideoError::Timeout {
                stage: "video encoding",
                ..
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn frames_before_begin_are_rejected() {
        let mut sink = FfmpegSink::new("out.mp4", Duration::from_secs(1));
        let frame = RgbaImage::new(2, 2);
        assert!(matches!(sink.push_frame(&frame), Err(VideoError::Encoding(_))));
    }
}
