use std::path::{Path, PathBuf};

use retrodesk_core::{DecodedBuffer, ResourceDecoder, Result, RetroDeskError};

/// Resolves audio locators against a local asset directory and decodes
/// them as WAV. `/assets/audio/song.mp3` is looked up as
/// `<root>/assets/audio/song.mp3` and then `<root>/assets/audio/song.wav`.
#[derive(Debug, Clone)]
pub struct WavDecoder {
    root: PathBuf,
}

impl WavDecoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, uri: &str) -> Option<PathBuf> {
        let relative = Path::new(uri.trim_start_matches('/'));
        let direct = self.root.join(relative);
        let wav = direct.with_extension("wav");
        [direct, wav].into_iter().find(|path| path.is_file())
    }
}

impl ResourceDecoder for WavDecoder {
    fn decode(&self, uri: &str) -> Result<DecodedBuffer> {
        let path = self.resolve(uri).ok_or_else(|| {
            RetroDeskError::transport(uri, format!("not found under {}", self.root.display()))
        })?;
        tracing::debug!(%uri, path = %path.display(), "decoding wav");

        let reader =
            hound::WavReader::open(&path).map_err(|err| RetroDeskError::decode(uri, err))?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 * scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(|err| RetroDeskError::decode(uri, err))?;

        into_buffer(uri, samples, spec)
    }
}

/// A header whose layout does not match its sample data is a decode error
/// of the resource, not a misuse of the buffer type.
fn into_buffer(uri: &str, samples: Vec<f32>, spec: hound::WavSpec) -> Result<DecodedBuffer> {
    DecodedBuffer::new(samples, spec.sample_rate, spec.channels)
        .map_err(|err| RetroDeskError::decode(uri, err))
}
