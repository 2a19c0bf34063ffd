use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::{
    AudioNotification, AudioService, DecodedBuffer, HandleId, Result, RetroDeskError,
    TrackRegistry,
};

/// Direction for [`PlaybackController::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Everything that can change the playback session.
#[derive(Debug)]
pub enum PlaybackEvent {
    Toggle,
    Next,
    Previous,
    Select(usize),
    Ended(HandleId),
    BufferReady { uri: String, buffer: DecodedBuffer },
    BufferFailed { uri: String, error: RetroDeskError },
}

impl From<AudioNotification> for PlaybackEvent {
    fn from(notification: AudioNotification) -> Self {
        match notification {
            AudioNotification::Decoded { uri, buffer } => PlaybackEvent::BufferReady { uri, buffer },
            AudioNotification::LoadFailed { uri, error } => {
                PlaybackEvent::BufferFailed { uri, error }
            }
            AudioNotification::Ended(handle) => PlaybackEvent::Ended(handle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveHandle {
    id: HandleId,
    track: usize,
}

/// Owns the single playback session and keeps at most one handle sounding.
///
/// A new handle is only ever started after the previous one was stopped,
/// so exclusivity holds even though the host would happily mix several.
/// Host failures are logged and never returned to the caller.
#[derive(Debug)]
pub struct PlaybackController {
    tracks: TrackRegistry,
    current: usize,
    playing: bool,
    buffers: HashMap<String, DecodedBuffer>,
    loading: HashSet<String>,
    failed: HashSet<String>,
    active: Option<ActiveHandle>,
}

impl PlaybackController {
    pub fn new(tracks: TrackRegistry) -> Self {
        Self {
            tracks,
            current: 0,
            playing: false,
            buffers: HashMap::new(),
            loading: HashSet::new(),
            failed: HashSet::new(),
            active: None,
        }
    }

    pub fn tracks(&self) -> &TrackRegistry {
        &self.tracks
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn active_handle(&self) -> Option<HandleId> {
        self.active.map(|active| active.id)
    }

    /// Track bound to the sounding handle, if any.
    pub fn active_track(&self) -> Option<usize> {
        self.active.map(|active| active.track)
    }

    pub fn is_buffered(&self, index: usize) -> bool {
        self.tracks
            .get(index)
            .map(|track| self.buffers.contains_key(&track.audio))
            .unwrap_or(false)
    }

    pub fn handle(&mut self, event: PlaybackEvent, audio: &mut dyn AudioService) {
        match event {
            PlaybackEvent::Toggle => self.toggle(audio),
            PlaybackEvent::Next => self.advance(Direction::Next, audio),
            PlaybackEvent::Previous => self.advance(Direction::Previous, audio),
            PlaybackEvent::Select(index) => {
                if let Err(err) = self.select(index, audio) {
                    warn!(%err, "ignoring track selection");
                }
            }
            PlaybackEvent::Ended(handle) => self.on_ended(handle, audio),
            PlaybackEvent::BufferReady { uri, buffer } => self.on_buffer(uri, buffer, audio),
            PlaybackEvent::BufferFailed { uri, error } => {
                warn!(%uri, %error, "audio resource unavailable");
                self.loading.remove(&uri);
                self.failed.insert(uri);
            }
        }
    }

    /// Makes `index` the current track, switching audio over when playing.
    pub fn select(&mut self, index: usize, audio: &mut dyn AudioService) -> Result<()> {
        self.tracks.get(index)?;
        debug!(index, playing = self.playing, "selecting track");
        self.current = index;
        if self.playing {
            self.stop_active(audio);
            self.try_play_current(audio);
        }
        Ok(())
    }

    pub fn toggle(&mut self, audio: &mut dyn AudioService) {
        if self.playing {
            debug!("pausing playback");
            self.playing = false;
            self.stop_active(audio);
            return;
        }

        if let Err(err) = audio.open_output() {
            warn!(%err, "audio output could not be initialised");
            return;
        }

        self.playing = true;
        self.request_missing(audio);
        self.try_play_current(audio);
    }

    pub fn advance(&mut self, direction: Direction, audio: &mut dyn AudioService) {
        let target = match direction {
            Direction::Next if self.current < self.tracks.last_index() => self.current + 1,
            Direction::Previous if self.current > 0 => self.current - 1,
            _ => {
                debug!(?direction, index = self.current, "already at playlist edge");
                return;
            }
        };

        if let Err(err) = self.select(target, audio) {
            warn!(%err, "advance failed");
        }
    }

    fn on_ended(&mut self, handle: HandleId, audio: &mut dyn AudioService) {
        match self.active {
            Some(active) if active.id == handle => {}
            _ => {
                debug!(%handle, "ignoring end of a detached handle");
                return;
            }
        }

        self.active = None;
        if self.current < self.tracks.last_index() {
            self.advance(Direction::Next, audio);
        } else {
            info!("reached the end of the playlist");
            self.playing = false;
        }
    }

    fn on_buffer(&mut self, uri: String, buffer: DecodedBuffer, audio: &mut dyn AudioService) {
        debug!(%uri, ?buffer, "buffer decoded");
        self.loading.remove(&uri);
        self.failed.remove(&uri);
        self.buffers.insert(uri.clone(), buffer);

        let waiting = self.playing
            && self.active.is_none()
            && self.tracks.by_audio(&uri).map(|track| track.index) == Some(self.current);
        if waiting {
            self.try_play_current(audio);
        }
    }

    fn request_missing(&mut self, audio: &mut dyn AudioService) {
        for track in self.tracks.iter() {
            let uri = &track.audio;
            if self.buffers.contains_key(uri)
                || self.loading.contains(uri)
                || self.failed.contains(uri)
            {
                continue;
            }
            self.loading.insert(uri.clone());
            audio.request_buffer(uri);
        }
    }

    /// Starts the current track if its buffer is ready; otherwise waits for
    /// the buffer to arrive.
    fn try_play_current(&mut self, audio: &mut dyn AudioService) {
        let Ok(track) = self.tracks.get(self.current) else {
            return;
        };
        let title = track.title.clone();
        let Some(buffer) = self.buffers.get(&track.audio).cloned() else {
            debug!(index = self.current, "buffer not ready, waiting");
            return;
        };

        self.stop_active(audio);
        match audio.start(&buffer) {
            Ok(id) => {
                info!(index = self.current, %title, %id, "playing");
                self.active = Some(ActiveHandle {
                    id,
                    track: self.current,
                });
            }
            Err(err) => {
                warn!(%err, index = self.current, "could not start playback");
                self.playing = false;
            }
        }
    }

    fn stop_active(&mut self, audio: &mut dyn AudioService) {
        if let Some(active) = self.active.take() {
            if let Err(err) = audio.stop(active.id) {
                warn!(%err, handle = %active.id, "stopping audio source failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{AudioConfig, HeadlessAudio, ResourceDecoder, ToneDecoder};

    fn setup() -> (PlaybackController, HeadlessAudio) {
        let audio = HeadlessAudio::new(
            AudioConfig::default(),
            ToneDecoder::new(48_000, Duration::from_millis(200)),
        );
        (PlaybackController::new(TrackRegistry::portfolio()), audio)
    }

    fn uri(player: &PlaybackController, index: usize) -> String {
        player.tracks().get(index).unwrap().audio.clone()
    }

    /// Feeds host notifications back into the controller.
    fn pump(player: &mut PlaybackController, audio: &mut HeadlessAudio, elapsed: Duration) {
        for note in audio.poll(elapsed) {
            player.handle(note.into(), audio);
        }
        assert!(audio.sounding().len() <= 1);
    }

    fn deliver(player: &mut PlaybackController, audio: &mut HeadlessAudio, index: usize) {
        let uri = uri(player, index);
        assert!(audio.complete(&uri));
        pump(player, audio, Duration::ZERO);
    }

    #[test]
    fn toggle_waits_for_buffer_then_plays() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);

        assert!(player.is_playing());
        assert!(player.active_handle().is_none());
        assert_eq!(audio.pending().count(), 10);

        deliver(&mut player, &mut audio, 0);
        let handle = player.active_handle().expect("track 0 should be sounding");
        assert_eq!(audio.sounding(), vec![handle]);
    }

    #[test]
    fn toggling_off_stops_the_handle() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        deliver(&mut player, &mut audio, 0);

        player.toggle(&mut audio);
        assert!(!player.is_playing());
        assert!(player.active_handle().is_none());
        assert!(audio.sounding().is_empty());
    }

    #[test]
    fn second_toggle_on_does_not_rerequest() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        player.toggle(&mut audio);
        player.toggle(&mut audio);
        assert_eq!(audio.pending().count(), 10);
    }

    #[test]
    fn advance_past_last_is_a_noop() {
        let (mut player, mut audio) = setup();
        player.select(9, &mut audio).unwrap();
        player.advance(Direction::Next, &mut audio);
        assert_eq!(player.current_index(), 9);
        assert!(!player.is_playing());

        player.toggle(&mut audio);
        deliver(&mut player, &mut audio, 9);
        let handle = player.active_handle();
        player.advance(Direction::Next, &mut audio);
        assert_eq!(player.current_index(), 9);
        assert!(player.is_playing());
        assert_eq!(player.active_handle(), handle);
    }

    #[test]
    fn previous_at_first_is_a_noop() {
        let (mut player, mut audio) = setup();
        player.advance(Direction::Previous, &mut audio);
        assert_eq!(player.current_index(), 0);
        assert!(!player.is_playing());
    }

    #[test]
    fn select_out_of_range_is_rejected() {
        let (mut player, mut audio) = setup();
        assert!(player.select(10, &mut audio).is_err());
        player.handle(PlaybackEvent::Select(42), &mut audio);
        assert_eq!(player.current_index(), 0);
    }

    #[test]
    fn natural_end_advances_until_the_last_track() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        audio.complete_all();
        pump(&mut player, &mut audio, Duration::ZERO);
        assert_eq!(player.active_track(), Some(0));

        pump(&mut player, &mut audio, Duration::from_millis(250));
        assert_eq!(player.current_index(), 1);
        assert!(player.is_playing());
        assert_eq!(player.active_track(), Some(1));

        player.select(9, &mut audio).unwrap();
        pump(&mut player, &mut audio, Duration::from_millis(250));
        assert_eq!(player.current_index(), 9);
        assert!(!player.is_playing());
        assert!(player.active_handle().is_none());
    }

    #[test]
    fn stale_end_event_is_ignored() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        audio.complete_all();
        pump(&mut player, &mut audio, Duration::ZERO);
        let first = player.active_handle().unwrap();

        player.advance(Direction::Next, &mut audio);
        player.handle(PlaybackEvent::Ended(first), &mut audio);
        assert_eq!(player.current_index(), 1);
        assert!(player.active_handle().is_some());
    }

    #[test]
    fn out_of_order_buffers_only_fill_their_own_slot() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        player.select(2, &mut audio).unwrap();
        player.select(3, &mut audio).unwrap();

        deliver(&mut player, &mut audio, 2);
        assert!(player.is_buffered(2));
        assert!(!player.is_buffered(3));
        assert!(player.active_handle().is_none());

        deliver(&mut player, &mut audio, 5);
        assert!(player.active_handle().is_none());

        deliver(&mut player, &mut audio, 3);
        assert_eq!(player.active_track(), Some(3));
    }

    #[test]
    fn late_buffer_does_not_autoplay_when_paused() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        player.toggle(&mut audio);

        deliver(&mut player, &mut audio, 0);
        assert!(player.is_buffered(0));
        assert!(player.active_handle().is_none());
        assert!(audio.sounding().is_empty());
    }

    #[test]
    fn five_skips_leave_one_handle_on_track_five() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        audio.complete_all();
        pump(&mut player, &mut audio, Duration::ZERO);
        assert!(player.active_handle().is_some());

        for _ in 0..5 {
            player.advance(Direction::Next, &mut audio);
            assert!(audio.sounding().len() <= 1);
        }

        assert_eq!(player.current_index(), 5);
        let handle = player.active_handle().unwrap();
        assert_eq!(audio.sounding(), vec![handle]);
        let expected = ToneDecoder::new(48_000, Duration::from_millis(200))
            .decode(&uri(&player, 5))
            .unwrap();
        assert_eq!(audio.buffer_of(handle), Some(&expected));
    }

    #[test]
    fn select_while_paused_starts_on_next_toggle() {
        let (mut player, mut audio) = setup();
        player.select(3, &mut audio).unwrap();
        assert_eq!(player.current_index(), 3);
        assert!(audio.sounding().is_empty());

        player.toggle(&mut audio);
        audio.complete_all();
        pump(&mut player, &mut audio, Duration::ZERO);
        player.toggle(&mut audio);
        assert!(audio.sounding().is_empty());

        player.toggle(&mut audio);
        assert_eq!(player.active_track(), Some(3));
    }

    #[test]
    fn output_failure_leaves_playback_off() {
        let (mut player, _) = setup();
        let mut audio = HeadlessAudio::new(
            AudioConfig::default(),
            ToneDecoder::new(48_000, Duration::from_millis(200)),
        )
        .refusing_output("denied");

        player.toggle(&mut audio);
        assert!(!player.is_playing());
        assert_eq!(audio.pending().count(), 0);
    }

    #[test]
    fn start_failure_leaves_playback_off() {
        let (mut player, mut audio) = setup();
        audio.set_refuse_start(true);
        player.toggle(&mut audio);
        deliver(&mut player, &mut audio, 0);

        assert!(!player.is_playing());
        assert!(player.active_handle().is_none());
    }

    #[test]
    fn stop_failure_during_advance_keeps_the_session_running() {
        let (mut player, mut audio) = setup();
        player.toggle(&mut audio);
        audio.complete_all();
        pump(&mut player, &mut audio, Duration::ZERO);
        let first = player.active_handle().expect("track 0 should be sounding");

        audio.set_refuse_stop(true);
        player.advance(Direction::Next, &mut audio);

        assert!(player.is_playing());
        assert_eq!(player.current_index(), 1);
        assert_eq!(player.active_track(), Some(1));
        let second = player.active_handle().expect("track 1 should be sounding");
        assert_ne!(second, first);

        // The refused handle still ends on its own; the controller ignores it.
        audio.set_refuse_stop(false);
        for note in audio.poll(Duration::from_millis(300)) {
            player.handle(note.into(), &mut audio);
        }
        assert!(player.is_playing());
        assert_eq!(player.current_index(), 2);
    }

    #[test]
    fn failed_loads_are_not_retried() {
        let offline = |uri: &str| -> Result<DecodedBuffer> {
            Err(RetroDeskError::transport(uri, "404"))
        };
        let mut audio = HeadlessAudio::new(AudioConfig::default(), offline);
        let mut player = PlaybackController::new(TrackRegistry::portfolio());

        player.toggle(&mut audio);
        audio.complete_all();
        pump(&mut player, &mut audio, Duration::ZERO);
        assert!(player.is_playing());
        assert!(player.active_handle().is_none());

        player.toggle(&mut audio);
        player.toggle(&mut audio);
        assert_eq!(audio.pending().count(), 0);
    }
}
