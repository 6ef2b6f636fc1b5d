use std::path::Path;

use serde::Deserialize;

use crate::pipe::{Error, Result};

// Last line of every reply from a command that worked
pub const STATUS_OK: &str = "BatchCommand finished: OK";

/// Did Audacity accept the command?
pub fn command_ok(response: &str) -> bool {
    response.lines().last().map(str::trim) == Some(STATUS_OK)
}

/// The reply without its trailing status line.
pub fn payload(response: &str) -> &str {
    match response.rfind("BatchCommand finished:") {
        Some(at) => response[..at].trim_end(),
        None => response.trim_end(),
    }
}

// Import2 wants single quotes around the filename
pub fn import_audio(path: &Path) -> String {
    format!("Import2: Filename='{}'", path.display())
}

// Export2 wants double quotes and chokes on backslashes
pub fn export_audio(path: &Path, channels: u32) -> String {
    let path = path.display().to_string().replace('\\', "/");
    format!("Export2: Filename=\"{}\" NumChannels={}", path, channels)
}

pub fn select_all() -> &'static str {
    "SelectAll:"
}

pub fn select_none() -> &'static str {
    "SelectNone:"
}

pub fn select_time(start: f64, end: f64) -> String {
    format!("SelectTime: Start={} End={} RelativeTo=ProjectStart", start, end)
}

pub fn select_tracks(track: usize, count: usize) -> String {
    format!("SelectTracks: Track={} TrackCount={} Mode=Set", track, count)
}

// Applies to the selected tracks
pub fn set_track_mute(mute: bool) -> String {
    format!("SetTrackAudio: Mute={}", mute as u8)
}

pub fn normalize(peak_level: f64) -> String {
    format!(
        "Normalize: PeakLevel={} ApplyGain=True RemoveDcOffset=True StereoIndependent=False",
        peak_level
    )
}

pub fn new_stereo_track() -> &'static str {
    "NewStereoTrack:"
}

pub fn remove_tracks() -> &'static str {
    "RemoveTracks:"
}

pub fn copy() -> &'static str {
    "Copy:"
}

pub fn paste() -> &'static str {
    "Paste:"
}

pub fn delete_selection() -> &'static str {
    "Delete:"
}

pub fn get_info(kind: &str) -> String {
    format!("GetInfo: Type={}", kind)
}

pub fn help() -> &'static str {
    "Help:"
}

// GetInfo replies carry JSON ahead of the status line. Only the fields we
// act on are kept, everything else Audacity reports is ignored.

#[derive(Debug, Deserialize)]
pub struct TrackInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    mute: u8,
}

impl TrackInfo {
    pub fn muted(&self) -> bool {
        self.mute != 0
    }
}

#[derive(Debug, Deserialize)]
pub struct ClipInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "missing_track")]
    pub track: i64,
    #[serde(default = "missing_time")]
    pub start: f64,
    #[serde(default = "missing_time")]
    pub end: f64,
}

fn missing_track() -> i64 {
    -1
}

fn missing_time() -> f64 {
    -1.0
}

impl ClipInfo {
    // Audacity occasionally reports placeholder clips with no usable
    // position, skip those
    pub fn valid(&self) -> bool {
        self.track >= 0 && self.start >= 0.0 && self.end > self.start
    }
}

pub fn parse_tracks(response: &str) -> Result<Vec<TrackInfo>> {
    serde_json::from_str(payload(response)).map_err(|source| Error::BadInfo {
        kind: "track",
        source,
    })
}

pub fn parse_clips(response: &str) -> Result<Vec<ClipInfo>> {
    serde_json::from_str(payload(response)).map_err(|source| Error::BadInfo {
        kind: "clip",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_uses_single_quotes() {
        assert_eq!(
            import_audio(Path::new("in.wav")),
            "Import2: Filename='in.wav'"
        );
    }

    #[test]
    fn test_export_uses_double_quotes_and_forward_slashes() {
        assert_eq!(
            export_audio(Path::new(r"C:\audio\out.wav"), 2),
            "Export2: Filename=\"C:/audio/out.wav\" NumChannels=2"
        );
    }

    #[test]
    fn test_selection_builders() {
        assert_eq!(
            select_time(0.0, 12.5),
            "SelectTime: Start=0 End=12.5 RelativeTo=ProjectStart"
        );
        assert_eq!(
            select_tracks(3, 1),
            "SelectTracks: Track=3 TrackCount=1 Mode=Set"
        );
        assert_eq!(set_track_mute(true), "SetTrackAudio: Mute=1");
        assert_eq!(set_track_mute(false), "SetTrackAudio: Mute=0");
    }

    #[test]
    fn test_normalize_spells_out_booleans() {
        assert_eq!(
            normalize(-1.0),
            "Normalize: PeakLevel=-1 ApplyGain=True RemoveDcOffset=True StereoIndependent=False"
        );
    }

    #[test]
    fn test_command_ok_checks_the_status_line() {
        assert!(command_ok("BatchCommand finished: OK"));
        assert!(command_ok("some output\nBatchCommand finished: OK"));
        assert!(!command_ok("some output\nBatchCommand finished: Failed!"));
        assert!(!command_ok(""));
    }

    #[test]
    fn test_payload_strips_the_status_line() {
        assert_eq!(payload("[1, 2]\nBatchCommand finished: OK"), "[1, 2]");
        assert_eq!(payload("BatchCommand finished: OK"), "");
        assert_eq!(payload("no status here"), "no status here");
    }

    #[test]
    fn test_parse_tracks_ignores_unknown_fields() {
        let response = concat!(
            r#"[{"name":"intro","mute":1,"solo":0,"pan":0.0},{"mute":0}]"#,
            "\nBatchCommand finished: OK",
        );

        let tracks = parse_tracks(response).expect("parse failed");
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name, "intro");
        assert!(tracks[0].muted());
        assert_eq!(tracks[1].name, "");
        assert!(!tracks[1].muted());
    }

    #[test]
    fn test_parse_clips_flags_unusable_entries() {
        let response = concat!(
            r#"[{"name":"take 1","track":0,"start":1.5,"end":4.0},"#,
            r#" {"track":-1,"start":0.0,"end":1.0},"#,
            r#" {"track":2,"start":3.0,"end":3.0},"#,
            r#" {"track":1}]"#,
            "\nBatchCommand finished: OK",
        );

        let clips = parse_clips(response).expect("parse failed");
        assert_eq!(clips.len(), 4);
        assert!(clips[0].valid());
        assert_eq!(clips[0].name.as_deref(), Some("take 1"));
        assert!(!clips[1].valid());
        assert!(!clips[2].valid());
        assert!(!clips[3].valid());
    }

    #[test]
    fn test_parse_garbage_is_reported_as_bad_info() {
        match parse_tracks("nonsense\nBatchCommand finished: OK") {
            Err(Error::BadInfo { kind: "track", .. }) => {}
            Err(other) => panic!("expected BadInfo, got {:?}", other),
            Ok(tracks) => panic!("expected BadInfo, got {:?}", tracks),
        }
    }
}
