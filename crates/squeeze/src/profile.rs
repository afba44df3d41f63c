/// Fixed ffmpeg settings applied to every file in a batch
///
/// There is one profile and it is not configurable: x264 at CRF 28 with the
/// `veryfast` preset, AAC audio at 128k, and `+faststart` so the moov atom
/// sits at the front for progressive download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeProfile {
    pub video_codec: &'static str,
    pub crf: u8,
    pub preset: &'static str,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub movflags: &'static str,
    pub loglevel: &'static str,
}

impl EncodeProfile {
    pub const WEB: EncodeProfile = EncodeProfile {
        video_codec: "libx264",
        crf: 28,
        preset: "veryfast",
        audio_codec: "aac",
        audio_bitrate: "128k",
        movflags: "+faststart",
        loglevel: "error",
    };

    /// Encoder names ffmpeg must support for this profile
    pub fn required_encoders(&self) -> [&'static str; 2] {
        [self.video_codec, self.audio_codec]
    }
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self::WEB
    }
}
