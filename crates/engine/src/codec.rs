use ptmux_disc::{Track, TrackKind};

/// How ffmpeg should write a single track out of the disc stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Extraction {
    pub extension: &'static str,
    pub codec_args: &'static [&'static str],
}

const COPY: &[&str] = &["-c", "copy"];
/// LPCM has no raw elementary format worth keeping; re-wrap it losslessly.
const LPCM_TO_FLAC: &[&str] = &["-c:a", "flac"];

pub(crate) fn extraction(track: &Track) -> Extraction {
    let (extension, codec_args) = match track.codec.as_str() {
        "h264" => ("h264", COPY),
        "h265" => ("hevc", COPY),
        "mpeg2" => ("m2v", COPY),
        "vc1" => ("vc1", COPY),
        "ac3" => ("ac3", COPY),
        "eac3" => ("eac3", COPY),
        "dts" | "dtshd" => ("dts", COPY),
        "truehd" => ("thd", COPY),
        "lpcm" => ("flac", LPCM_TO_FLAC),
        "aac" => ("aac", COPY),
        "flac" => ("flac", COPY),
        "pgs" => ("sup", COPY),
        "srt" => ("srt", COPY),
        "ass" => ("ass", COPY),
        _ => match track.kind {
            TrackKind::Video => ("mkv", COPY),
            TrackKind::Audio => ("mka", COPY),
            TrackKind::Subtitle => ("mks", COPY),
        },
    };
    Extraction { extension, codec_args }
}

/// ffmpeg's stream type specifier.
pub(crate) fn specifier(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Video => "v",
        TrackKind::Audio => "a",
        TrackKind::Subtitle => "s",
    }
}
