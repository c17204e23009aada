use ptmux_disc::{Track, TrackKind};
use std::cmp::Ordering;

const VIDEO_CODECS: &[&str] = &["h264", "h265", "mpeg2", "vc1"];
const LANGUAGES: &[&str] = &["eng", "jpn", "fra", "deu", "spa", "ita", "por", "rus"];

pub fn identity_order(tracks: &[Track]) -> Vec<Track> {
    tracks.to_vec()
}

/// Sorts tracks with [`beyondhd_compare`].
pub fn beyondhd_order(tracks: &[Track]) -> Vec<Track> {
    let mut ordered = tracks.to_vec();
    ordered.sort_by(beyondhd_compare);
    ordered
}

/// Total order over tracks:
///
/// 1. video, then audio, then subtitles;
/// 2. video by codec preference, then resolution (highest first);
/// 3. audio by language preference, then channel count (most first), then codec name;
/// 4. subtitles by language preference, forced first, default first, then codec name;
/// 5. track id.
///
/// Anything outside the preference lists, and any missing value, sorts last
/// within its step.
pub fn beyondhd_compare(a: &Track, b: &Track) -> Ordering {
    a.kind
        .cmp(&b.kind)
        .then_with(|| match a.kind {
            TrackKind::Video => rank(VIDEO_CODECS, &a.codec)
                .cmp(&rank(VIDEO_CODECS, &b.codec))
                .then_with(|| descending(a.resolution, b.resolution)),
            TrackKind::Audio => rank(LANGUAGES, &a.language)
                .cmp(&rank(LANGUAGES, &b.language))
                .then_with(|| descending(a.channels, b.channels))
                .then_with(|| a.codec.cmp(&b.codec)),
            TrackKind::Subtitle => rank(LANGUAGES, &a.language)
                .cmp(&rank(LANGUAGES, &b.language))
                .then_with(|| b.flags.forced.cmp(&a.flags.forced))
                .then_with(|| b.flags.default.cmp(&a.flags.default))
                .then_with(|| a.codec.cmp(&b.codec)),
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn rank(preference: &[&str], value: &str) -> usize {
    preference.iter().position(|p| *p == value).unwrap_or(preference.len())
}

/// Largest first, with `None` after every value.
fn descending<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptmux_disc::{Resolution, TrackFlags};
    use rstest::rstest;

    fn video(id: u32, codec: &str, resolution: Option<(u32, u32)>) -> Track {
        let track = Track::new(id, TrackKind::Video, codec, "in.m2ts");
        match resolution {
            Some((w, h)) => track.with_resolution(Resolution::new(w, h)),
            None => track,
        }
    }

    fn audio(id: u32, language: &str, channels: Option<u32>, codec: &str) -> Track {
        let track = Track::new(id, TrackKind::Audio, codec, "in.m2ts").with_language(language);
        match channels {
            Some(c) => track.with_channels(c),
            None => track,
        }
    }

    fn subtitle(id: u32, language: &str, forced: bool, default: bool) -> Track {
        Track::new(id, TrackKind::Subtitle, "pgs", "in.m2ts")
            .with_language(language)
            .with_flags(TrackFlags { default, forced, external: false })
    }

    fn ids(tracks: &[Track]) -> Vec<u32> {
        tracks.iter().map(|t| t.id).collect()
    }

    fn mixed() -> Vec<Track> {
        vec![
            subtitle(0, "eng", false, false),
            audio(1, "fra", Some(6), "ac3"),
            video(2, "h265", Some((3840, 2160))),
            audio(3, "eng", Some(2), "ac3"),
            subtitle(4, "eng", true, false),
            video(5, "h264", Some((1920, 1080))),
            audio(6, "eng", Some(8), "truehd"),
            audio(7, "kor", Some(8), "dts"),
            subtitle(8, "jpn", false, true),
            audio(9, "eng", Some(8), "dtshd"),
            video(10, "h264", None),
            subtitle(11, "und", false, false),
        ]
    }

    #[test]
    fn test_mixed_order() {
        let ordered = beyondhd_order(&mixed());
        assert_eq!(ids(&ordered), vec![5, 10, 2, 9, 6, 3, 1, 7, 4, 0, 8, 11]);
    }

    #[test]
    fn test_idempotent() {
        let once = beyondhd_order(&mixed());
        assert_eq!(beyondhd_order(&once), once);
    }

    #[test]
    fn test_independent_of_input_order() {
        let expected = ids(&beyondhd_order(&mixed()));
        let mut tracks = mixed();
        for _ in 0..tracks.len() {
            tracks.rotate_left(1);
            assert_eq!(ids(&beyondhd_order(&tracks)), expected);
        }
        tracks.reverse();
        assert_eq!(ids(&beyondhd_order(&tracks)), expected);
    }

    #[rstest]
    #[case(video(0, "vc1", None), video(1, "h264", None))]
    #[case(video(0, "av1", None), video(1, "vc1", None))]
    #[case(video(0, "h264", Some((1280, 720))), video(1, "h264", Some((1920, 1080))))]
    #[case(audio(0, "deu", Some(8), "ac3"), audio(1, "fra", Some(2), "ac3"))]
    #[case(audio(0, "eng", None, "ac3"), audio(1, "eng", Some(1), "ac3"))]
    #[case(audio(0, "eng", Some(6), "eac3"), audio(1, "eng", Some(6), "ac3"))]
    #[case(subtitle(0, "eng", false, true), subtitle(1, "eng", true, false))]
    #[case(subtitle(0, "eng", false, false), subtitle(1, "eng", false, true))]
    #[case(audio(0, "eng", Some(2), "ac3"), video(1, "mpeg2", None))]
    #[case(subtitle(0, "eng", true, true), audio(1, "rus", None, "flac"))]
    fn test_second_sorts_first(#[case] first: Track, #[case] second: Track) {
        assert_eq!(beyondhd_compare(&second, &first), Ordering::Less);
        assert_eq!(ids(&beyondhd_order(&[first, second])), vec![1, 0]);
    }

    #[test]
    fn test_id_breaks_ties() {
        let tracks = [audio(7, "eng", Some(6), "ac3"), audio(3, "eng", Some(6), "ac3")];
        assert_eq!(ids(&beyondhd_order(&tracks)), vec![3, 7]);
    }

    #[test]
    fn test_identity_keeps_order() {
        assert_eq!(ids(&identity_order(&mixed())), ids(&mixed()));
    }
}
