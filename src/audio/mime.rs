//! MIME string helpers

/// Essence of the PCM format produced by [`PcmEncoder`](super::PcmEncoder)
pub const PCM_ESSENCE: &str = "audio/pcm";

/// MIME type for raw WAV bytes
pub const WAV_MIME: &str = "audio/wav";

/// Build the MIME string for 16-bit little-endian PCM
pub fn pcm_mime(sample_rate: u32, channels: u16) -> String {
    format!("{PCM_ESSENCE};rate={sample_rate};channels={channels}")
}

/// The type/subtype part of a MIME string, without parameters
pub fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Look up a `;name=value` parameter
pub fn param<'a>(mime: &'a str, name: &str) -> Option<&'a str> {
    mime.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Sample rate and channel count of a PCM MIME string
pub fn pcm_params(mime: &str) -> Option<(u32, u16)> {
    if !essence(mime).eq_ignore_ascii_case(PCM_ESSENCE) {
        return None;
    }
    let rate = param(mime, "rate")?.parse().ok()?;
    let channels = param(mime, "channels").map_or(Some(1), |c| c.parse().ok())?;
    Some((rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_essence_strips_parameters() {
        assert_eq!(essence("audio/webm;codecs=opus"), "audio/webm");
        assert_eq!(essence("audio/wav"), "audio/wav");
        assert_eq!(essence(" audio/ogg ; codecs=vorbis"), "audio/ogg");
    }

    #[test]
    fn test_pcm_params() {
        let mime = pcm_mime(16000, 1);
        assert_eq!(mime, "audio/pcm;rate=16000;channels=1");
        assert_eq!(pcm_params(&mime), Some((16000, 1)));
        assert_eq!(pcm_params("audio/pcm;rate=48000"), Some((48000, 1)));
        assert_eq!(pcm_params("audio/wav"), None);
        assert_eq!(pcm_params("audio/pcm;rate=fast"), None);
    }

    #[test]
    fn test_param_lookup() {
        assert_eq!(param("audio/webm; codecs=\"opus\"", "codecs"), Some("opus"));
        assert_eq!(param("audio/webm", "codecs"), None);
    }
}
