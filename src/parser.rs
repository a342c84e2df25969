use chrono::{DateTime, Utc};

use crate::model::{AvailableSegment, Playlist, PlaylistData, SeasonRecord, Segment, StatField};

/// Playlist type ids as (primary, alternative) per mode. The source has used
/// two numbering schemes over its history; both are live in old seasons, so
/// resolution tries the primary id first and falls back to the alternative.
/// Scheme changes land here, not in code.
const PLAYLIST_TYPE_IDS: [(Playlist, i64, i64); 4] = [
    (Playlist::Duel, 1, 10),
    (Playlist::Doubles, 2, 11),
    (Playlist::Standard, 3, 12),
    (Playlist::Chaos, 4, 13),
];

const OVERVIEW_KIND: &str = "overview";

/// Build a season record draft from the raw segment list.
///
/// Pure and deterministic: same input, same record. `scraped_at` is passed in
/// rather than read from a clock so callers and tests control it.
pub fn build_season_record(
    segments: &[Segment],
    season_number: u32,
    available_segments: &[AvailableSegment],
    scraped_at: DateTime<Utc>,
) -> SeasonRecord {
    let in_season: Vec<&Segment> = segments
        .iter()
        .filter(|s| s.attributes.season == Some(season_number))
        .collect();

    let mut record = SeasonRecord {
        season_number,
        season_name: season_name(season_number, available_segments, &in_season),
        playlist_1v1: None,
        playlist_2v2: None,
        playlist_3v3: None,
        playlist_4v4: None,
        scraped_at,
    };

    for (playlist, primary, alternative) in PLAYLIST_TYPE_IDS {
        let segment = resolve_segment(&in_season, primary, alternative);
        if let Some(segment) = segment {
            *record.playlist_mut(playlist) = parse_playlist_data(segment);
        }
    }

    record
}

/// First segment matching the primary type id, else the alternative id.
/// Segments under any other id (non-ranked modes) are simply not ours.
fn resolve_segment<'a>(in_season: &[&'a Segment], primary: i64, alternative: i64) -> Option<&'a Segment> {
    in_season
        .iter()
        .find(|s| s.attributes.playlist_id == Some(primary))
        .or_else(|| {
            in_season
                .iter()
                .find(|s| s.attributes.playlist_id == Some(alternative))
        })
        .copied()
}

/// Extract normalized stats from a resolved segment.
///
/// Returns `None` only for a structurally malformed block: at least one stat
/// value present and every present value non-numeric. A block whose stats are
/// all null is valid and kept as a record of null fields.
fn parse_playlist_data(segment: &Segment) -> Option<PlaylistData> {
    let stats = &segment.stats;
    let slots = [
        &stats.tier,
        &stats.division,
        &stats.rating,
        &stats.matches_played,
        &stats.win_streak,
    ];
    let present: Vec<&StatField> = slots
        .into_iter()
        .flatten()
        .filter(|s| s.is_present())
        .collect();
    if !present.is_empty() && present.iter().all(|s| s.is_corrupt()) {
        return None;
    }

    let (rank, rank_value) = name_and_value(&stats.tier);
    let (division, division_value) = name_and_value(&stats.division);

    Some(PlaylistData {
        rank,
        rank_value,
        division,
        division_value,
        rating: numeric(&stats.rating),
        matches_played: numeric(&stats.matches_played),
        win_streak: numeric(&stats.win_streak),
    })
}

/// Display name and numeric ordinal of a tiered stat. A missing metadata
/// sub-object means both are `None`, not an error.
fn name_and_value(stat: &Option<StatField>) -> (Option<String>, Option<i64>) {
    match stat {
        Some(s) => (
            s.metadata.as_ref().and_then(|m| m.name.clone()),
            s.as_i64(),
        ),
        None => (None, None),
    }
}

fn numeric(stat: &Option<StatField>) -> Option<i64> {
    stat.as_ref().and_then(StatField::as_i64)
}

/// Season display name, in fallback order: the available-segment entry for
/// this season, the overview segment's metadata name, the literal
/// `"Season {n}"`.
fn season_name(
    season_number: u32,
    available_segments: &[AvailableSegment],
    in_season: &[&Segment],
) -> String {
    available_segments
        .iter()
        .find(|a| a.attributes.season == Some(season_number))
        .and_then(|a| a.metadata.name.clone())
        .or_else(|| {
            in_season
                .iter()
                .find(|s| s.kind.as_deref() == Some(OVERVIEW_KIND))
                .and_then(|s| s.metadata.name.clone())
        })
        .unwrap_or_else(|| format!("Season {season_number}"))
}
