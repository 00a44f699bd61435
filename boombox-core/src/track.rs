use std::str::FromStr;

use serde::Serialize;

use crate::{RoomError, RoomResult};

pub type TrackId = String;

/// Where a track's media lives. Every source maps to a playback engine on the
/// client, which is why the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    Youtube,
    Soundcloud,
    Local,
}

/// A single entry in a room's playlist. Immutable once added.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub source: TrackSource,
    pub url: String,
}

impl Track {
    /// Builds a track from raw client input, validating the source tag.
    pub fn new(id: TrackId, title: String, source: &str, url: String) -> RoomResult<Self> {
        Ok(Self {
            id,
            title,
            source: source.parse()?,
            url,
        })
    }
}

impl TrackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Soundcloud => "soundcloud",
            Self::Local => "local",
        }
    }
}

impl FromStr for TrackSource {
    type Err = RoomError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "youtube" => Ok(Self::Youtube),
            "soundcloud" => Ok(Self::Soundcloud),
            "local" => Ok(Self::Local),
            other => Err(RoomError::UnsupportedTrackSource(other.to_string())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::TrackSource;
    use crate::RoomError;

    #[test]
    fn parses_known_sources() {
        assert_eq!("youtube".parse(), Ok(TrackSource::Youtube));
        assert_eq!("soundcloud".parse(), Ok(TrackSource::Soundcloud));
        assert_eq!("local".parse(), Ok(TrackSource::Local));
    }

    #[test]
    fn rejects_unknown_sources() {
        let result: Result<TrackSource, _> = "vimeo".parse();

        assert_eq!(
            result,
            Err(RoomError::UnsupportedTrackSource("vimeo".to_string()))
        );
    }
}
