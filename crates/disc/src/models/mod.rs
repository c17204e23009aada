mod playlist;
mod track;

pub use self::playlist::PlaylistInfo;
pub use self::track::{Resolution, Track, TrackFlags, TrackKind, UNDETERMINED_LANGUAGE};
