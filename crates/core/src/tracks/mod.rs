use serde::{Deserialize, Serialize};

use crate::{Result, RetroDeskError};

/// Playlist entry as written in configuration files. Indices are assigned
/// by the registry from list position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub artist: String,
    pub title: String,
    pub artwork: String,
    pub audio: String,
}

impl TrackEntry {
    fn new(artist: &str, title: &str, artwork: &str, audio: &str) -> Self {
        Self {
            artist: artist.to_string(),
            title: title.to_string(),
            artwork: artwork.to_string(),
            audio: audio.to_string(),
        }
    }
}

/// Immutable track metadata with its dense playlist index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub index: usize,
    pub artist: String,
    pub title: String,
    pub artwork: String,
    pub audio: String,
}

/// Read-only lookup table of the playlist. Never empty.
#[derive(Debug, Clone)]
pub struct TrackRegistry {
    tracks: Vec<Track>,
}

impl TrackRegistry {
    pub fn new(entries: Vec<TrackEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(RetroDeskError::Config(
                "a playlist needs at least one track".into(),
            ));
        }

        Ok(Self {
            tracks: index_entries(entries),
        })
    }

    /// The playlist shipped with the desktop.
    pub fn portfolio() -> Self {
        Self {
            tracks: index_entries(default_entries()),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.tracks.len() - 1
    }

    pub fn get(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index).ok_or(RetroDeskError::UnknownTrack {
            index,
            len: self.tracks.len(),
        })
    }

    pub fn by_audio(&self, uri: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.audio == uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::portfolio()
    }
}

fn index_entries(entries: Vec<TrackEntry>) -> Vec<Track> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| Track {
            index,
            artist: entry.artist,
            title: entry.title,
            artwork: entry.artwork,
            audio: entry.audio,
        })
        .collect()
}

pub fn default_entries() -> Vec<TrackEntry> {
    vec![
        TrackEntry::new(
            "The Black Keys",
            "Weight Of Love",
            "/assets/blackkeys.jpg",
            "/assets/audio/The-Black-Keys-Weight-of-Love.mp3",
        ),
        TrackEntry::new(
            "Grimes",
            "Oblivion",
            "/assets/grimes.jpg",
            "/assets/audio/Grimes-Oblivion.mp3",
        ),
        TrackEntry::new(
            "Radiohead",
            "Just",
            "/assets/radiohead.jpg",
            "/assets/audio/Radiohead-Just.mp3",
        ),
        TrackEntry::new(
            "The Beatles",
            "While My Guitar Gently Weeps",
            "/assets/Abbey-Road.webp",
            "/assets/audio/wmggw.mp3",
        ),
        TrackEntry::new(
            "Elton John",
            "Goodbye Yellow Brick Road",
            "/assets/Elton-John-Goodbye-Yellow-Brick-Road-album-cover-820.webp",
            "/assets/audio/Goodbye-Yellow-Brick-Road.mp3",
        ),
        TrackEntry::new(
            "Nirvana",
            "About A Girl",
            "/assets/Nirvana-Bleach.jpg",
            "/assets/audio/AboutAGirl.mp3",
        ),
        TrackEntry::new(
            "Clairo",
            "Nomad",
            "/assets/clairocharm.jpg",
            "/assets/audio/Clairo-Nomad.mp3",
        ),
        TrackEntry::new(
            "Chris Stapleton",
            "The Bottom",
            "/assets/CHRIS-STAPLETON-HIGHER.jpg",
            "/assets/audio/ChrisStapleton-TheBottom.mp3",
        ),
        TrackEntry::new(
            "My Chemical Romance",
            "House Of Wolves",
            "/assets/mcr.jpg",
            "/assets/audio/MCR-HouseofWolves.mp3",
        ),
        TrackEntry::new(
            "Billie Eilish",
            "L'AMOUR DE MA VIE",
            "/assets/billie.jpg",
            "/assets/audio/BillieEilish-LAMOURDEMAVIE.mp3",
        ),
    ]
}
