use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::{self, ClipInfo};
use crate::pipe::{Error, PipeClient, Result};
use crate::util::{self, LogType};

// Wide enough to wipe any clip previously staged, Audacity clamps the
// selection to the track anyway
const STAGING_WIPE_SECS: f64 = 100.0;

// Run one command and insist Audacity accepted it
fn run(client: &mut PipeClient, command: &str) -> Result<String> {
    let response = client.do_command(command)?;
    if !commands::command_ok(&response) {
        return Err(Error::CommandFailed {
            command: command.to_string(),
            response,
        });
    }
    Ok(response)
}

// Audacity resolves relative paths against its own working directory,
// not ours, so hand it absolute ones
fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(path))
}

/// Import a file, normalize the whole of it and export the result.
pub fn normalize_file(
    client: &mut PipeClient,
    input: &Path,
    output: &Path,
    peak_level: f64,
) -> Result<()> {
    let input = absolute(input)?;
    let output = absolute(output)?;

    run(client, &commands::import_audio(&input))?;
    run(client, commands::select_all())?;
    run(client, &commands::normalize(peak_level))?;
    run(client, &commands::export_audio(&output, 2))?;

    util::log(
        format!("Normalized {} into {}", input.display(), output.display()),
        LogType::Info,
    );
    Ok(())
}

/// Export every track of the open project to its own file, named
/// `base_1.format`, `base_2.format` and so on.
pub fn export_tracks(
    client: &mut PipeClient,
    out_dir: &Path,
    base: &str,
    format: &str,
) -> Result<()> {
    let format = format.trim_start_matches('.');
    let out_dir = absolute(out_dir)?;
    fs::create_dir_all(&out_dir)?;

    let tracks = commands::parse_tracks(&run(client, &commands::get_info("Tracks"))?)?;
    if tracks.is_empty() {
        util::log("No tracks found in the current project".to_string(), LogType::Warning);
        return Ok(());
    }
    util::log(format!("Found {} track(s)", tracks.len()), LogType::Info);

    for (index, track) in tracks.iter().enumerate() {
        let name = if track.name.is_empty() {
            format!("Track {}", index + 1)
        } else {
            track.name.clone()
        };
        let path = out_dir.join(format!("{}_{}.{}", base, index + 1, format));
        util::log(
            format!("Exporting track {}/{}: '{}'", index + 1, tracks.len(), name),
            LogType::Info,
        );

        // Solo the track by muting everything, then unmuting just it
        for other in 0..tracks.len() {
            run(client, &commands::select_tracks(other, 1))?;
            run(client, &commands::set_track_mute(true))?;
        }
        run(client, &commands::select_tracks(index, 1))?;
        run(client, &commands::set_track_mute(false))?;

        run(client, commands::select_all())?;
        run(client, &commands::export_audio(&path, 2))?;
    }

    // Leave no track muted behind
    for index in 0..tracks.len() {
        run(client, &commands::select_tracks(index, 1))?;
        run(client, &commands::set_track_mute(false))?;
    }

    util::log(
        format!("Exported {} track(s) to {}", tracks.len(), out_dir.display()),
        LogType::Info,
    );
    Ok(())
}

/// Export every clip on an unmuted track to its own file, named after the
/// clip. Clips are staged one at a time on a scratch track appended to the
/// project, which is removed again afterwards.
pub fn export_clips(
    client: &mut PipeClient,
    out_dir: &Path,
    prefix: &str,
    format: &str,
) -> Result<()> {
    let format = format.trim_start_matches('.');
    let out_dir = absolute(out_dir)?;
    fs::create_dir_all(&out_dir)?;

    let original = commands::parse_tracks(&run(client, &commands::get_info("Tracks"))?)?;
    let clips = commands::parse_clips(&run(client, &commands::get_info("Clips"))?)?;
    if clips.is_empty() {
        util::log("No clips found in the current project".to_string(), LogType::Warning);
        return Ok(());
    }

    // Clips sitting on a muted track are skipped on purpose, muting is
    // how you leave takes out of an export
    let mut chosen = Vec::new();
    for clip in clips {
        let muted = usize::try_from(clip.track)
            .ok()
            .and_then(|index| original.get(index))
            .map(|track| track.muted())
            .unwrap_or(false);
        if muted {
            util::log(
                format!(
                    "Skipping clip '{}' (track {} is muted)",
                    clip.name.as_deref().unwrap_or("Unnamed"),
                    clip.track + 1
                ),
                LogType::Warning,
            );
        } else {
            chosen.push(clip);
        }
    }
    if chosen.is_empty() {
        util::log("No clips found in unmuted tracks".to_string(), LogType::Warning);
        return Ok(());
    }
    util::log(format!("Found {} clip(s) to export", chosen.len()), LogType::Info);

    // Stage each clip on a scratch track appended to the project, so
    // exporting never touches the real ones
    run(client, commands::new_stereo_track())?;
    let grown = commands::parse_tracks(&run(client, &commands::get_info("Tracks"))?)?;
    let staging = grown.len().saturating_sub(1);

    // Everything but the scratch track gets muted for the duration
    for index in 0..grown.len() {
        run(client, commands::select_none())?;
        run(client, &commands::select_tracks(index, 1))?;
        run(client, &commands::set_track_mute(index != staging))?;
    }

    let mut exported = 0;
    for (nth, clip) in chosen.iter().enumerate() {
        let name = clip
            .name
            .clone()
            .unwrap_or_else(|| format!("clip_{}", nth + 1));
        if !clip.valid() {
            util::log(
                format!("Skipping clip '{}' due to invalid data", name),
                LogType::Warning,
            );
            continue;
        }

        let stem = format!("{}{}", prefix, util::sanitize_filename(&name));
        let path = util::unique_path(&out_dir, &stem, format);
        util::log(
            format!("Exporting clip {}/{}: '{}'", nth + 1, chosen.len(), name),
            LogType::Info,
        );

        match export_clip(client, clip, staging, &path) {
            Ok(()) => exported += 1,
            Err(err @ Error::CommandFailed { .. }) => {
                util::log(format!("Failed to export clip: {}", err), LogType::Warning);
            }
            Err(err) => return Err(err),
        }
    }

    // Drop the scratch track and put every mute back the way it was
    run(client, commands::select_none())?;
    run(client, &commands::select_tracks(staging, 1))?;
    run(client, commands::remove_tracks())?;
    for (index, track) in original.iter().enumerate() {
        run(client, commands::select_none())?;
        run(client, &commands::select_tracks(index, 1))?;
        run(client, &commands::set_track_mute(track.muted()))?;
    }

    util::log(
        format!(
            "Exported {}/{} clip(s) to {}",
            exported,
            chosen.len(),
            out_dir.display()
        ),
        LogType::Info,
    );
    Ok(())
}

fn export_clip(
    client: &mut PipeClient,
    clip: &ClipInfo,
    staging: usize,
    path: &Path,
) -> Result<()> {
    // Lift the clip off its track
    run(client, commands::select_none())?;
    run(client, &commands::select_tracks(clip.track as usize, 1))?;
    run(client, &commands::select_time(clip.start, clip.end))?;
    run(client, commands::copy())?;

    // Wipe whatever the previous clip left on the scratch track
    run(client, commands::select_none())?;
    run(client, &commands::select_tracks(staging, 1))?;
    run(client, &commands::select_time(0.0, STAGING_WIPE_SECS))?;
    run(client, commands::delete_selection())?;

    run(client, commands::select_none())?;
    run(client, &commands::select_tracks(staging, 1))?;
    run(client, commands::paste())?;

    // Export exactly the pasted span
    run(client, commands::select_none())?;
    run(client, &commands::select_tracks(staging, 1))?;
    run(client, &commands::select_time(0.0, clip.end - clip.start))?;
    run(client, &commands::export_audio(path, 2))?;
    Ok(())
}
