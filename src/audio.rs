use std::{
    fmt,
    fs::File,
    io::{Cursor, ErrorKind, Read},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use hound::WavWriter;
use rubato::{FftFixedIn, Resampler};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSource, MediaSourceStream},
    meta::MetadataOptions,
    probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use crate::{
    core::features::{FeatureConfig, SampleRatePolicy},
    error::{GenreError, Result},
    types::{max_frames, AudioData, Waveform},
};

/// Where the audio for one invocation comes from.
#[derive(Clone)]
pub enum AudioSource {
    Path(PathBuf),
    /// An in-memory byte stream; `extension` is an optional container hint
    /// such as `"wav"` or `"mp3"`.
    Bytes {
        data: Vec<u8>,
        extension: Option<String>,
    },
}

impl AudioSource {
    /// Buffers a readable stream; the buffer lives as long as the source.
    pub fn from_reader<R: Read>(mut reader: R, extension: Option<&str>) -> std::io::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(AudioSource::Bytes {
            data,
            extension: extension.map(str::to_owned),
        })
    }

    /// Short human-readable origin used in errors and logs.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::Path(p) => p.display().to_string(),
            AudioSource::Bytes { data, extension } => describe_bytes(data.len(), extension.as_deref()),
        }
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<PathBuf> for AudioSource {
    fn from(p: PathBuf) -> Self {
        AudioSource::Path(p)
    }
}

impl From<&Path> for AudioSource {
    fn from(p: &Path) -> Self {
        AudioSource::Path(p.to_path_buf())
    }
}

impl From<&str> for AudioSource {
    fn from(p: &str) -> Self {
        AudioSource::Path(PathBuf::from(p))
    }
}

/// Decodes a whole file to interleaved samples.
pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path: &Path = path.as_ref();
    decode_path(path, &path.display().to_string(), None)
}

/// Decodes an in-memory byte stream to interleaved samples.
pub fn read_audio_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<AudioData> {
    let origin = describe_bytes(data.len(), extension);
    decode_bytes(data, extension, &origin, None)
}

fn describe_bytes(len: usize, extension: Option<&str>) -> String {
    match extension {
        Some(ext) => format!("<{len} bytes, .{ext}>"),
        None => format!("<{len} bytes>"),
    }
}

fn decode_path(path: &Path, origin: &str, max_secs: Option<f64>) -> Result<AudioData> {
    let file: File = File::open(path)
        .with_context(|| format!("Failed to open audio file: {:?}", path))
        .map_err(|e| GenreError::decode(origin, e))?;

    let mut hint: Hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_stream(Box::new(file), hint, origin, max_secs)
}

fn decode_bytes(
    data: Vec<u8>,
    extension: Option<&str>,
    origin: &str,
    max_secs: Option<f64>,
) -> Result<AudioData> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    decode_stream(Box::new(Cursor::new(data)), hint, origin, max_secs)
}

/// Probe, pick the default track and decode it, stopping once `max_secs`
/// of audio are available when a cap is given.
fn decode_stream(
    source: Box<dyn MediaSource>,
    hint: Hint,
    origin: &str,
    max_secs: Option<f64>,
) -> Result<AudioData> {
    let mss: MediaSourceStream = MediaSourceStream::new(source, Default::default());

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| GenreError::decode(origin, e))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| GenreError::decode(origin, anyhow!("No default track found")))?;
    let track_id = track.id;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| GenreError::decode(origin, e))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_rate: u32 = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels: u16 = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(GenreError::decode(origin, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped += 1;
                warn!(origin, msg, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(GenreError::decode(origin, e)),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());

        if let Some(secs) = max_secs {
            if channels > 0 && samples.len() / channels as usize >= max_frames(sample_rate, secs) {
                break;
            }
        }
    }

    if sample_rate == 0 {
        return Err(GenreError::decode(origin, anyhow!("unknown sample rate")));
    }
    if channels == 0 {
        if !samples.is_empty() {
            return Err(GenreError::decode(origin, anyhow!("unknown channel layout")));
        }
        channels = 1;
    }

    debug!(
        origin,
        sample_rate,
        channels,
        samples = samples.len(),
        skipped,
        "decoded audio"
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

/// Averages interleaved channels into one.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|chunk| chunk.iter().copied().sum::<f32>() / channels as f32)
        .collect()
}

const RESAMPLE_CHUNK: usize = 1024;
const RESAMPLE_SUB_CHUNKS: usize = 2;

fn new_resampler(sr_in: u32, sr_out: u32) -> anyhow::Result<FftFixedIn<f32>> {
    FftFixedIn::<f32>::new(
        sr_in as usize,
        sr_out as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        1,
    )
    .context("creating resampler")
}

/// Number of leading output frames the resampler emits before the first
/// input frame shows up, found from the peak of its impulse response.
fn resampler_delay(sr_in: u32, sr_out: u32) -> anyhow::Result<usize> {
    let mut resampler = new_resampler(sr_in, sr_out)?;
    let mut block = vec![vec![0.0f32; RESAMPLE_CHUNK]];
    block[0][0] = 1.0;

    // the first FFT unit holds the whole peak; feed until it is emitted
    let max_blocks = sr_in as usize / RESAMPLE_CHUNK + 2;
    let mut response = Vec::new();
    for _ in 0..max_blocks {
        let frames = resampler.process(&block, None).context("resampling")?;
        response.extend_from_slice(&frames[0]);
        if !response.is_empty() {
            break;
        }
        block[0][0] = 0.0;
    }

    response
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .ok_or_else(|| anyhow!("resampler produced no output"))
}

/// Resamples mono PCM from `sr_in` to `sr_out`. Output length is
/// `round(len * sr_out / sr_in)` and the filter delay is removed, so frame
/// `i` of the input lands at `i * sr_out / sr_in` in the output.
pub fn resample_mono(input: &[f32], sr_in: u32, sr_out: u32) -> anyhow::Result<Vec<f32>> {
    if sr_in == sr_out || input.is_empty() {
        return Ok(input.to_vec());
    }

    let delay = resampler_delay(sr_in, sr_out)?;
    let mut resampler = new_resampler(sr_in, sr_out)?;

    let expected_len = (input.len() as f64 * sr_out as f64 / sr_in as f64).round() as usize;
    let wanted = delay + expected_len;
    let mut out = Vec::with_capacity(wanted + RESAMPLE_CHUNK);

    let mut block = vec![vec![0.0f32; RESAMPLE_CHUNK]];
    for chunk in input.chunks(RESAMPLE_CHUNK) {
        block[0][..chunk.len()].copy_from_slice(chunk);
        block[0][chunk.len()..].fill(0.0);
        let frames = resampler.process(&block, None).context("resampling")?;
        out.extend_from_slice(&frames[0]);
    }

    // push silence until the delayed tail has come out
    block[0].fill(0.0);
    let max_flushes = sr_in as usize / RESAMPLE_CHUNK + 8;
    let mut flushes = 0;
    while out.len() < wanted && flushes < max_flushes {
        let frames = resampler.process(&block, None).context("resampling")?;
        out.extend_from_slice(&frames[0]);
        flushes += 1;
    }

    out.drain(..delay.min(out.len()));
    out.resize(expected_len, 0.0);
    debug!(sr_in, sr_out, delay, frames = out.len(), "resampled");
    Ok(out)
}

/// Turns any supported audio source into a capped mono [`Waveform`].
#[derive(Clone, Debug)]
pub struct WaveformLoader {
    policy: SampleRatePolicy,
    max_duration_secs: f64,
}

impl WaveformLoader {
    pub fn new(policy: SampleRatePolicy, max_duration_secs: f64) -> Self {
        Self {
            policy,
            max_duration_secs,
        }
    }

    pub fn from_config(config: &FeatureConfig) -> Self {
        Self::new(config.sample_rate, config.max_duration_secs)
    }

    pub fn policy(&self) -> SampleRatePolicy {
        self.policy
    }

    pub fn load(&self, source: &AudioSource) -> Result<Waveform> {
        let origin = source.describe();
        let cap = Some(self.max_duration_secs);

        let audio = match source {
            AudioSource::Path(path) => decode_path(path, &origin, cap)?,
            AudioSource::Bytes { data, extension } => {
                decode_bytes(data.clone(), extension.as_deref(), &origin, cap)?
            }
        };

        self.to_waveform(audio, &origin)
    }

    /// Applies down-mix, duration cap and sample-rate policy to decoded audio.
    pub fn to_waveform(&self, audio: AudioData, origin: &str) -> Result<Waveform> {
        let mut mono = downmix_to_mono(&audio.samples, audio.channels);
        mono.truncate(max_frames(audio.sample_rate, self.max_duration_secs));

        let (samples, rate) = match self.policy {
            SampleRatePolicy::Native => (mono, audio.sample_rate),
            SampleRatePolicy::Fixed(target) => {
                let resampled = resample_mono(&mono, audio.sample_rate, target)
                    .map_err(|e| GenreError::decode(origin, e))?;
                (resampled, target)
            }
        };

        Ok(Waveform::new(samples, rate, self.max_duration_secs))
    }
}

pub fn write_audio(path: &str, audio: &AudioData) -> Result<()> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(anyhow::Error::from)?;
    for sample in &audio.samples {
        let s = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(s).map_err(anyhow::Error::from)?;
    }

    writer.finalize().map_err(anyhow::Error::from)?;
    Ok(())
}
