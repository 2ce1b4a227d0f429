//! Stream command construction algorithm
//!
//! The builder walks the stream configuration in a fixed order (input,
//! video filters, audio filter, codec settings, container, destination) so
//! that identical inputs always yield byte-identical argument lists.
//!
//! Two output modes exist. Passthrough relays the source as-is with a
//! stream-copy directive. The render path re-encodes and is taken whenever
//! transcoding is requested explicitly or an option requires a filter
//! (playback speed, brightness, overlay text, audio volume) — a filter can
//! never be combined with stream copy, so those options imply re-encoding.
//! A resolution request alone does not force a re-encode: in passthrough
//! mode it is dropped with a warning.

use std::path::Path;

use crate::registry::{Destination, SourceKind, StreamOptions};

use super::error::CommandError;

/// Frame rate used for screen capture input
const SCREEN_CAPTURE_FPS: u32 = 30;

/// Keyframe interval emitted on the render path
const KEYFRAME_INTERVAL: u32 = 50;

/// Fixed audio settings on the render path
const AUDIO_BITRATE: &str = "128k";
const AUDIO_SAMPLE_RATE: &str = "44100";
const AUDIO_CHANNELS: &str = "2";

/// Output I/O timeout hint, in microseconds
const RW_TIMEOUT_US: u64 = 10_000_000;

/// Build the full transcoder argument list for one stream.
///
/// `resolved_url` is the Source Resolver's result for remote sources;
/// `None` means resolution failed or was never attempted, in which case
/// the raw source reference is used as a degraded fallback.
pub fn build_stream_command(
    source: &str,
    kind: SourceKind,
    destination: &Destination,
    options: &StreamOptions,
    resolved_url: Option<&str>,
) -> Result<Vec<String>, CommandError> {
    validate(source, kind, destination)?;

    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into()];

    push_input_args(&mut args, source, kind, options, resolved_url);

    if needs_render(options) {
        let filters = build_video_filters(options);
        if !filters.is_empty() {
            args.push("-vf".into());
            args.push(filters.join(","));
        }
        if options.volume != 1.0 {
            args.push("-af".into());
            args.push(format!("volume={}", options.volume));
        }
        push_render_output(&mut args, options);
    } else {
        if let Some(resolution) = &options.resolution {
            tracing::warn!(
                resolution = %resolution,
                "resolution option ignored in passthrough mode, enable transcoding to scale"
            );
        }
        args.push("-c".into());
        args.push("copy".into());
    }

    args.push("-f".into());
    args.push("flv".into());
    args.push("-rw_timeout".into());
    args.push(RW_TIMEOUT_US.to_string());
    args.push(destination.target());

    Ok(args)
}

/// Parse a strict `WIDTHxHEIGHT` resolution string.
pub fn parse_resolution(value: &str) -> Result<(u32, u32), CommandError> {
    let malformed = || CommandError::MalformedResolution(value.to_string());

    let (width, height) = value.split_once('x').ok_or_else(malformed)?;
    if width.is_empty()
        || height.is_empty()
        || !width.bytes().all(|b| b.is_ascii_digit())
        || !height.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let width = width.parse().map_err(|_| malformed())?;
    let height = height.parse().map_err(|_| malformed())?;
    Ok((width, height))
}

fn validate(source: &str, kind: SourceKind, destination: &Destination) -> Result<(), CommandError> {
    if source.is_empty() {
        return Err(CommandError::InvalidSource("source is empty".into()));
    }
    if destination.url.is_empty() {
        return Err(CommandError::InvalidSource("destination URL is empty".into()));
    }
    if destination.key.is_empty() {
        return Err(CommandError::InvalidSource("stream key is empty".into()));
    }
    if kind == SourceKind::File && !Path::new(source).exists() {
        return Err(CommandError::InvalidSource(format!("no such file: {}", source)));
    }
    Ok(())
}

fn needs_render(options: &StreamOptions) -> bool {
    options.transcode
        || options.speed != 1.0
        || options.brightness != 0
        || options.volume != 1.0
        || options.overlay_text.is_some()
}

fn push_input_args(
    args: &mut Vec<String>,
    source: &str,
    kind: SourceKind,
    options: &StreamOptions,
    resolved_url: Option<&str>,
) {
    match kind {
        SourceKind::File => {
            // Pace reads at native frame rate so the endpoint sees live timing
            args.push("-re".into());
            if options.loop_input {
                args.push("-stream_loop".into());
                args.push("-1".into());
            }
            // TODO: splice options.intro/options.outro around the main file
            // with a concat filter
            args.push("-i".into());
            args.push(source.into());
        }
        SourceKind::RemoteVideo => {
            args.push("-re".into());
            args.push("-i".into());
            args.push(resolved_url.unwrap_or(source).into());
        }
        SourceKind::ScreenCapture => {
            let (format, device) = if cfg!(target_os = "macos") {
                ("avfoundation", "1:0")
            } else if cfg!(target_os = "windows") {
                ("gdigrab", "desktop")
            } else {
                ("x11grab", ":0.0")
            };
            args.push("-f".into());
            args.push(format.into());
            args.push("-framerate".into());
            args.push(SCREEN_CAPTURE_FPS.to_string());
            args.push("-i".into());
            args.push(device.into());
        }
    }
}

/// Ordered filter chain: scale, speed, brightness, overlay text.
fn build_video_filters(options: &StreamOptions) -> Vec<String> {
    let mut filters = Vec::new();

    if let Some(resolution) = &options.resolution {
        match parse_resolution(resolution) {
            Ok((width, height)) => filters.push(format!("scale={}:{}", width, height)),
            Err(_) => {
                tracing::warn!(resolution = %resolution, "dropping malformed resolution option")
            }
        }
    }
    if options.speed != 1.0 {
        filters.push(format!("setpts=PTS/{}", options.speed));
    }
    if options.brightness != 0 {
        filters.push(format!("eq=brightness={}", options.brightness as f64 / 100.0));
    }
    if let Some(text) = &options.overlay_text {
        filters.push(format!(
            "drawtext=text='{}':fontsize={}:fontcolor={}:x={}:y={}",
            escape_overlay_text(text),
            options.text_size,
            options.text_color,
            options.text_x,
            options.text_y
        ));
    }

    filters
}

fn push_render_output(args: &mut Vec<String>, options: &StreamOptions) {
    for arg in ["-c:v", "libx264", "-preset"] {
        args.push(arg.into());
    }
    args.push(options.preset.clone());
    args.push("-tune".into());
    args.push("zerolatency".into());
    for flag in ["-b:v", "-maxrate", "-bufsize"] {
        args.push(flag.into());
        args.push(options.bitrate.clone());
    }
    args.push("-g".into());
    args.push(KEYFRAME_INTERVAL.to_string());
    args.push("-pix_fmt".into());
    args.push("yuv420p".into());
    for arg in [
        "-c:a",
        "aac",
        "-b:a",
        AUDIO_BITRATE,
        "-ar",
        AUDIO_SAMPLE_RATE,
        "-ac",
        AUDIO_CHANNELS,
    ] {
        args.push(arg.into());
    }
}

/// Escape user text for safe embedding in a quoted drawtext value.
fn escape_overlay_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\\'")
}
