use std::{collections::VecDeque, fmt, time::Duration};

use crate::{
    Analyser, AudioConfig, AudioNotification, AudioService, DecodedBuffer, HandleId,
    ResourceDecoder, Result, RetroDeskError,
};

/// In-process audio host without a sound card.
///
/// Started handles are mixed into the analyser as host time advances, so
/// the visualizer sees real spectra. Like a browser audio context it does
/// not stop overlapping handles on its own: exclusivity is the caller's job.
/// Load requests complete only when [`HeadlessAudio::complete`] is called,
/// or on every poll when auto-completion is enabled.
pub struct HeadlessAudio {
    config: AudioConfig,
    decoder: Box<dyn ResourceDecoder>,
    analyser: Option<Analyser>,
    refuse_output: Option<String>,
    refuse_start: bool,
    refuse_stop: bool,
    auto_complete: bool,
    pending: VecDeque<String>,
    notifications: Vec<AudioNotification>,
    voices: Vec<Voice>,
    next_handle: u64,
}

struct Voice {
    id: HandleId,
    buffer: DecodedBuffer,
    position: usize,
}

impl HeadlessAudio {
    pub fn new(config: AudioConfig, decoder: impl ResourceDecoder + 'static) -> Self {
        Self {
            config,
            decoder: Box::new(decoder),
            analyser: None,
            refuse_output: None,
            refuse_start: false,
            refuse_stop: false,
            auto_complete: false,
            pending: VecDeque::new(),
            notifications: Vec::new(),
            voices: Vec::new(),
            next_handle: 1,
        }
    }

    /// Completes every pending request on each poll.
    pub fn with_auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    /// Makes [`AudioService::open_output`] fail, as a host that denies
    /// audio output would.
    pub fn refusing_output(mut self, reason: impl Into<String>) -> Self {
        self.refuse_output = Some(reason.into());
        self
    }

    pub fn set_refuse_start(&mut self, refuse: bool) {
        self.refuse_start = refuse;
    }

    /// Makes [`AudioService::stop`] fail and leaves the handle sounding.
    pub fn set_refuse_stop(&mut self, refuse: bool) {
        self.refuse_stop = refuse;
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// Resolves the oldest pending request for `uri`. Returns `false` when
    /// nothing was pending for it.
    pub fn complete(&mut self, uri: &str) -> bool {
        let Some(position) = self.pending.iter().position(|pending| pending == uri) else {
            return false;
        };
        if let Some(uri) = self.pending.remove(position) {
            self.resolve(uri);
        }
        true
    }

    pub fn complete_all(&mut self) {
        while let Some(uri) = self.pending.pop_front() {
            self.resolve(uri);
        }
    }

    /// Handles currently mixed into the output.
    pub fn sounding(&self) -> Vec<HandleId> {
        self.voices.iter().map(|voice| voice.id).collect()
    }

    /// The buffer a sounding handle plays.
    pub fn buffer_of(&self, handle: HandleId) -> Option<&DecodedBuffer> {
        self.voices
            .iter()
            .find(|voice| voice.id == handle)
            .map(|voice| &voice.buffer)
    }

    fn resolve(&mut self, uri: String) {
        let notification = match self.decoder.decode(&uri) {
            Ok(buffer) => AudioNotification::Decoded { uri, buffer },
            Err(error) => AudioNotification::LoadFailed { uri, error },
        };
        self.notifications.push(notification);
    }

    fn render(&mut self, elapsed: Duration) {
        let Some(analyser) = self.analyser.as_mut() else {
            return;
        };

        let out_rate = f64::from(self.config.sample_rate);
        let out_frames = (elapsed.as_secs_f64() * out_rate).round() as usize;
        if out_frames == 0 {
            return;
        }

        let mut mix = vec![0.0_f32; out_frames];
        let mut ended = Vec::new();
        for voice in &mut self.voices {
            let ratio = f64::from(voice.buffer.sample_rate()) / out_rate;
            let channels = voice.buffer.channels() as usize;
            let total = voice.buffer.frames();
            let samples = voice.buffer.samples();

            for (offset, slot) in mix.iter_mut().enumerate() {
                let frame = voice.position + (offset as f64 * ratio) as usize;
                if frame >= total {
                    break;
                }
                let frame = &samples[frame * channels..(frame + 1) * channels];
                *slot += frame.iter().sum::<f32>() / channels as f32;
            }

            voice.position += (out_frames as f64 * ratio).round() as usize;
            if voice.position >= total {
                ended.push(voice.id);
            }
        }

        analyser.push_samples(&mix);
        self.voices.retain(|voice| !ended.contains(&voice.id));
        self.notifications
            .extend(ended.into_iter().map(AudioNotification::Ended));
    }
}

impl AudioService for HeadlessAudio {
    fn open_output(&mut self) -> Result<()> {
        if let Some(reason) = &self.refuse_output {
            return Err(RetroDeskError::OutputUnavailable(reason.clone()));
        }
        if self.analyser.is_none() {
            self.analyser = Some(Analyser::new(&self.config));
        }
        Ok(())
    }

    fn request_buffer(&mut self, uri: &str) {
        self.pending.push_back(uri.to_string());
    }

    fn start(&mut self, buffer: &DecodedBuffer) -> Result<HandleId> {
        if self.analyser.is_none() {
            return Err(RetroDeskError::invalid("output pipeline has not been opened"));
        }
        if self.refuse_start {
            return Err(RetroDeskError::invalid("host refused to start a source"));
        }

        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        self.voices.push(Voice {
            id,
            buffer: buffer.clone(),
            position: 0,
        });
        Ok(id)
    }

    fn stop(&mut self, handle: HandleId) -> Result<()> {
        if self.refuse_stop {
            return Err(RetroDeskError::invalid(format!("host refused to stop {handle}")));
        }
        let before = self.voices.len();
        self.voices.retain(|voice| voice.id != handle);
        if self.voices.len() == before {
            return Err(RetroDeskError::invalid(format!("{handle} is not sounding")));
        }
        Ok(())
    }

    fn analyser_mut(&mut self) -> Option<&mut Analyser> {
        self.analyser.as_mut()
    }

    fn poll(&mut self, elapsed: Duration) -> Vec<AudioNotification> {
        if self.auto_complete {
            self.complete_all();
        }
        self.render(elapsed);
        std::mem::take(&mut self.notifications)
    }
}

impl fmt::Debug for HeadlessAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessAudio")
            .field("output_ready", &self.analyser.is_some())
            .field("pending", &self.pending)
            .field("sounding", &self.voices.len())
            .field("auto_complete", &self.auto_complete)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToneDecoder;

    fn host() -> HeadlessAudio {
        HeadlessAudio::new(
            AudioConfig::default(),
            ToneDecoder::new(48_000, Duration::from_millis(100)),
        )
    }

    #[test]
    fn completions_follow_call_order_not_request_order() {
        let mut audio = host();
        audio.request_buffer("/a.mp3");
        audio.request_buffer("/b.mp3");

        assert!(audio.complete("/b.mp3"));
        assert!(!audio.complete("/b.mp3"));
        let notes = audio.poll(Duration::ZERO);
        assert!(matches!(&notes[..], [AudioNotification::Decoded { uri, .. }] if uri == "/b.mp3"));
        assert_eq!(audio.pending().collect::<Vec<_>>(), vec!["/a.mp3"]);
    }

    #[test]
    fn handle_reports_end_once() {
        let mut audio = host();
        audio.open_output().unwrap();
        let buffer = ToneDecoder::new(48_000, Duration::from_millis(100))
            .decode("/a.mp3")
            .unwrap();
        let handle = audio.start(&buffer).unwrap();

        assert!(audio.poll(Duration::from_millis(50)).is_empty());
        let notes = audio.poll(Duration::from_millis(60));
        assert!(matches!(&notes[..], [AudioNotification::Ended(id)] if *id == handle));
        assert!(audio.poll(Duration::from_millis(60)).is_empty());
        assert!(audio.sounding().is_empty());
    }

    #[test]
    fn stopped_handle_is_silent() {
        let mut audio = host();
        audio.open_output().unwrap();
        let buffer = DecodedBuffer::new(vec![0.1; 4_800], 48_000, 1).unwrap();
        let handle = audio.start(&buffer).unwrap();

        audio.stop(handle).unwrap();
        assert!(audio.stop(handle).is_err());
        assert!(audio.poll(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn refused_stop_keeps_the_handle_sounding() {
        let mut audio = host();
        audio.open_output().unwrap();
        let buffer = DecodedBuffer::new(vec![0.1; 4_800], 48_000, 1).unwrap();
        let handle = audio.start(&buffer).unwrap();

        audio.set_refuse_stop(true);
        assert!(audio.stop(handle).is_err());
        assert_eq!(audio.sounding(), vec![handle]);
    }

    #[test]
    fn refuses_output_when_configured() {
        let mut audio = host().refusing_output("denied");
        let err = audio.open_output().unwrap_err();
        assert!(matches!(err, RetroDeskError::OutputUnavailable(_)));
        assert!(audio.analyser_mut().is_none());
    }

    #[test]
    fn start_requires_output() {
        let mut audio = host();
        let buffer = DecodedBuffer::new(vec![0.0; 10], 48_000, 1).unwrap();
        assert!(audio.start(&buffer).is_err());
    }
}
