use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    path::Path,
};

use crate::{
    result::{Error, Result},
    types::Bitrate,
};

use super::command::{
    assert_success_command, run_command, tail, Capture, FFMPEG, FFXXX_DEFAULT_ARGS,
};

pub trait StreamTransformer: Sync + Send + Debug {
    /// Convert the audio track of the input file to an MP3 file
    /// with a constant bitrate. Any video track is discarded.
    fn transcode_mp3(&self, input: &Path, output: &Path, bitrate: Bitrate) -> Result<()>;

    /// Combine a video-only and an audio-only file into an MP4 file.
    ///
    /// The video stream is copied, the audio re-encoded to AAC, and the
    /// result is cut to the shorter of the two inputs.
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: String,
}

impl Ffmpeg {
    /// Verify that the `ffmpeg` binary is reachable
    pub fn new(program: Option<&str>) -> Result<Self> {
        let program = program.unwrap_or(FFMPEG).to_owned();
        assert_success_command(&program, |cmd| cmd.arg("-version"))
            .map_err(|err| err.wrap_err_with(|| format!("{program} is not reachable")))?;

        Ok(Self { program })
    }
}

impl StreamTransformer for Ffmpeg {
    fn transcode_mp3(&self, input: &Path, output: &Path, bitrate: Bitrate) -> Result<()> {
        let res = run_command(
            &self.program,
            |cmd| cmd.args(mp3_args(input, output, bitrate)),
            Capture::STDERR,
        )?;

        if !res.status.success() {
            return Err(Error::Transcode {
                code: res.status.code(),
                stderr: tail(&res.stderr, 5),
            });
        }
        ensure_output(&self.program, output)
    }

    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let res = run_command(
            &self.program,
            |cmd| cmd.args(mux_args(video, audio, output)),
            Capture::STDERR,
        )?;

        if !res.status.success() {
            return Err(Error::Mux {
                code: res.status.code(),
                stderr: tail(&res.stderr, 5),
            });
        }
        ensure_output(&self.program, output)
    }
}

/// A zero exit status without the expected file is still a failure
fn ensure_output(program: &str, output: &Path) -> Result<()> {
    if output.is_file() {
        Ok(())
    } else {
        Err(Error::MissingOutput {
            program: program.to_owned(),
            path: output.to_path_buf(),
        })
    }
}

fn mp3_args(input: &Path, output: &Path, bitrate: Bitrate) -> Vec<OsString> {
    let mut args: Vec<OsString> = FFXXX_DEFAULT_ARGS.iter().map(OsString::from).collect();
    args.push("-y".into());
    args.extend([OsStr::new("-i"), input.as_os_str()].map(OsString::from));
    // Drop any video track, cover art included
    args.push("-vn".into());
    args.extend(["-c:a", "libmp3lame", "-b:a"].map(OsString::from));
    args.push(bitrate.to_string().into());
    args.push("--".into());
    args.push(output.as_os_str().to_owned());
    args
}

fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = FFXXX_DEFAULT_ARGS.iter().map(OsString::from).collect();
    args.push("-y".into());
    args.extend([OsStr::new("-i"), video.as_os_str()].map(OsString::from));
    args.extend([OsStr::new("-i"), audio.as_os_str()].map(OsString::from));
    args.extend(["-map", "0:v:0", "-map", "1:a:0"].map(OsString::from));
    args.extend(["-c:v", "copy", "-c:a", "aac"].map(OsString::from));
    // Stop at the end of the shorter input, no trailing black or silent part
    args.push("-shortest".into());
    args.push("--".into());
    args.push(output.as_os_str().to_owned());
    args
}
