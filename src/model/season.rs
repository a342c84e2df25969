use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four canonical competitive modes a season record tracks. The source
/// exposes more playlist variants (casual, tournaments); those are ignored.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
pub enum Playlist {
    #[strum(serialize = "1v1")]
    Duel,
    #[strum(serialize = "2v2")]
    Doubles,
    #[strum(serialize = "3v3")]
    Standard,
    #[strum(serialize = "4v4")]
    Chaos,
}

/// Normalized per-mode stats for one season. Every field may be `None` when
/// the source segment lacked it; an all-`None` record still means the mode
/// had a segment, which is distinct from the mode being absent entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistData {
    pub rank: Option<String>,
    pub rank_value: Option<i64>,
    pub division: Option<String>,
    pub division_value: Option<i64>,
    pub rating: Option<i64>,
    pub matches_played: Option<i64>,
    pub win_streak: Option<i64>,
}

/// One season's worth of normalized stats for a tracker. Unique per
/// (tracker, season_number) in the season store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub season_number: u32,
    pub season_name: String,
    pub playlist_1v1: Option<PlaylistData>,
    pub playlist_2v2: Option<PlaylistData>,
    pub playlist_3v3: Option<PlaylistData>,
    pub playlist_4v4: Option<PlaylistData>,
    pub scraped_at: DateTime<Utc>,
}

impl SeasonRecord {
    pub fn playlist(&self, playlist: Playlist) -> Option<&PlaylistData> {
        match playlist {
            Playlist::Duel => self.playlist_1v1.as_ref(),
            Playlist::Doubles => self.playlist_2v2.as_ref(),
            Playlist::Standard => self.playlist_3v3.as_ref(),
            Playlist::Chaos => self.playlist_4v4.as_ref(),
        }
    }

    pub(crate) fn playlist_mut(&mut self, playlist: Playlist) -> &mut Option<PlaylistData> {
        match playlist {
            Playlist::Duel => &mut self.playlist_1v1,
            Playlist::Doubles => &mut self.playlist_2v2,
            Playlist::Standard => &mut self.playlist_3v3,
            Playlist::Chaos => &mut self.playlist_4v4,
        }
    }
}
