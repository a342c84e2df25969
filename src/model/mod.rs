mod profile;
mod season;
mod tracker;

pub use profile::{
    AvailableSegment, ScrapedProfile, Segment, SegmentAttributes, SegmentMetadata, SegmentStats,
    StatField, StatMetadata,
};
pub(crate) use profile::RawProfile;
pub use season::{Playlist, PlaylistData, SeasonRecord};
pub use tracker::{Platform, ScrapingStatus, Tracker};
