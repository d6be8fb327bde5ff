#![forbid(unsafe_code)]

use std::fmt;

const TS_PACKET_LEN: usize = 188;
const TS_SYNC_BYTE: u8 = 0x47;

/// Container format of a media stream, as declared by a representation or
/// resolved by probing chunk bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StreamFormat {
    /// Not yet resolved; probing may still succeed.
    #[default]
    Unknown,
    /// Resolved to something no demuxer can handle.
    Unsupported,
    Mp4,
    MpegTs,
    WebM,
    Ogg,
    WebVtt,
    Ttml,
    PackedAac,
}

impl StreamFormat {
    /// Resolve a format from the leading bytes of a chunk.
    ///
    /// The slice is the peeked prefix, not the whole chunk; detection only
    /// relies on magic bytes that fit well within a probe window.
    #[must_use]
    pub fn from_probe(data: &[u8]) -> StreamFormat {
        if data.len() >= 8 && matches!(&data[4..8], b"ftyp" | b"styp" | b"moof" | b"moov" | b"sidx")
        {
            return StreamFormat::Mp4;
        }
        if looks_like_ts(data) {
            return StreamFormat::MpegTs;
        }
        if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return StreamFormat::WebM;
        }
        if data.starts_with(b"OggS") {
            return StreamFormat::Ogg;
        }
        let text = strip_utf8_bom(data);
        if text.starts_with(b"WEBVTT") {
            return StreamFormat::WebVtt;
        }
        if text.starts_with(b"<?xml") || text.starts_with(b"<tt") {
            return StreamFormat::Ttml;
        }
        if data.starts_with(b"ID3") || looks_like_adts(data) {
            return StreamFormat::PackedAac;
        }
        StreamFormat::Unknown
    }

    /// Resolve a format from an HTTP content type, used as a fallback when
    /// probing is inconclusive.
    #[must_use]
    pub fn from_mime(mime: &str) -> StreamFormat {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "video/mp4" | "audio/mp4" | "application/mp4" => StreamFormat::Mp4,
            "video/mp2t" => StreamFormat::MpegTs,
            "video/webm" | "audio/webm" => StreamFormat::WebM,
            "audio/ogg" | "application/ogg" => StreamFormat::Ogg,
            "text/vtt" => StreamFormat::WebVtt,
            "application/ttml+xml" => StreamFormat::Ttml,
            "audio/aac" | "audio/aacp" => StreamFormat::PackedAac,
            _ => StreamFormat::Unknown,
        }
    }
}

fn looks_like_ts(data: &[u8]) -> bool {
    // One sync byte alone is too weak; require every packet boundary the
    // probe window covers to carry it, and at least two boundaries.
    if data.len() <= TS_PACKET_LEN {
        return false;
    }
    data.iter()
        .step_by(TS_PACKET_LEN)
        .take(3)
        .all(|&b| b == TS_SYNC_BYTE)
}

fn looks_like_adts(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && (data[1] == 0xF1 || data[1] == 0xF9)
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamFormat::Unknown => "unknown",
            StreamFormat::Unsupported => "unsupported",
            StreamFormat::Mp4 => "mp4",
            StreamFormat::MpegTs => "mpegts",
            StreamFormat::WebM => "webm",
            StreamFormat::Ogg => "ogg",
            StreamFormat::WebVtt => "webvtt",
            StreamFormat::Ttml => "ttml",
            StreamFormat::PackedAac => "packed-aac",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ts_payload(packets: usize) -> Vec<u8> {
        let mut data = vec![0u8; packets * TS_PACKET_LEN];
        for boundary in data.iter_mut().step_by(TS_PACKET_LEN) {
            *boundary = TS_SYNC_BYTE;
        }
        data
    }

    #[rstest]
    #[case(b"\x00\x00\x00\x20ftypisom....".to_vec(), StreamFormat::Mp4)]
    #[case(b"\x00\x00\x00\x18stypmsdh....".to_vec(), StreamFormat::Mp4)]
    #[case(b"\x00\x00\x01\x00moof........".to_vec(), StreamFormat::Mp4)]
    #[case(b"\x1A\x45\xDF\xA3webmwebm".to_vec(), StreamFormat::WebM)]
    #[case(b"OggS\x00\x02....".to_vec(), StreamFormat::Ogg)]
    #[case(b"WEBVTT\n\n00:00.000".to_vec(), StreamFormat::WebVtt)]
    #[case(b"\xEF\xBB\xBFWEBVTT\n".to_vec(), StreamFormat::WebVtt)]
    #[case(b"<?xml version=\"1.0\"?><tt>".to_vec(), StreamFormat::Ttml)]
    #[case(b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec(), StreamFormat::PackedAac)]
    #[case(b"\xFF\xF1\x50\x80\x00\x1F\xFC".to_vec(), StreamFormat::PackedAac)]
    #[case(ts_payload(3), StreamFormat::MpegTs)]
    #[case(b"garbage bytes".to_vec(), StreamFormat::Unknown)]
    #[case(Vec::new(), StreamFormat::Unknown)]
    fn probe_resolves_magic_bytes(#[case] data: Vec<u8>, #[case] expected: StreamFormat) {
        assert_eq!(StreamFormat::from_probe(&data), expected);
    }

    #[test]
    fn single_sync_byte_is_not_transport_stream() {
        // A lone 0x47 with no second packet boundary must not match.
        let data = vec![TS_SYNC_BYTE; 10];
        assert_eq!(StreamFormat::from_probe(&data), StreamFormat::Unknown);
    }

    #[rstest]
    #[case("video/mp4", StreamFormat::Mp4)]
    #[case("audio/MP4", StreamFormat::Mp4)]
    #[case("video/mp2t", StreamFormat::MpegTs)]
    #[case("video/mp2t; charset=binary", StreamFormat::MpegTs)]
    #[case("text/vtt", StreamFormat::WebVtt)]
    #[case("application/ttml+xml", StreamFormat::Ttml)]
    #[case("audio/aac", StreamFormat::PackedAac)]
    #[case("audio/webm", StreamFormat::WebM)]
    #[case("application/octet-stream", StreamFormat::Unknown)]
    #[case("", StreamFormat::Unknown)]
    fn mime_fallback_resolves_content_types(#[case] mime: &str, #[case] expected: StreamFormat) {
        assert_eq!(StreamFormat::from_mime(mime), expected);
    }
}
