mod commands;
mod config;
mod export;
mod pipe;
mod util;

#[cfg(test)]
mod testkit;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::pipe::PipeClient;
use crate::util::LogType;

#[derive(Subcommand)]
enum Command {
    /// Check that Audacity is reachable over the scripting pipe
    Test,

    /// Send one raw scripting command and print the reply
    Send { command: String },

    /// Import an audio file, normalize it and export the result
    Normalize {
        input: PathBuf,
        output: PathBuf,

        /// Peak level in dB to normalize to
        #[arg(long, allow_negative_numbers = true)]
        peak: Option<f64>,
    },

    /// Export every track of the open project to its own file
    ExportTracks {
        out_dir: PathBuf,

        /// Base name, files come out as base_1.wav, base_2.wav, ...
        #[arg(long, default_value = "track")]
        base: String,

        /// File extension to export as
        #[arg(long, default_value = "wav")]
        format: String,
    },

    /// Export every clip on an unmuted track to its own file
    ExportClips {
        out_dir: PathBuf,

        /// Prepended to every exported filename
        #[arg(long, default_value = "")]
        prefix: String,

        /// File extension to export as
        #[arg(long, default_value = "wav")]
        format: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

// Resolve the pipe paths, connect and poke Audacity a little
fn self_test(config: &Config) -> pipe::Result<()> {
    let (to_path, from_path) = pipe::pipe_paths(config)?;
    util::log(format!("Command pipe:  {}", to_path.display()), LogType::Info);
    util::log(format!("Response pipe: {}", from_path.display()), LogType::Info);

    let mut client = match PipeClient::connect(config) {
        Ok(client) => client,
        Err(err) => {
            util::log("Audacity is not reachable. Make sure that:".to_string(), LogType::Warning);
            util::log("  1. Audacity is running".to_string(), LogType::Warning);
            util::log(
                "  2. mod-script-pipe is enabled under Edit > Preferences > Modules".to_string(),
                LogType::Warning,
            );
            util::log(
                "  3. Audacity was restarted after enabling it".to_string(),
                LogType::Warning,
            );
            return Err(err);
        }
    };
    util::log("Connected".to_string(), LogType::Info);

    let help = client.do_command(commands::help())?;
    util::log(format!("Help: replied with {} bytes", help.len()), LogType::Info);

    let tracks = commands::parse_tracks(&client.do_command(&commands::get_info("Tracks"))?)?;
    util::log(format!("Project has {} track(s)", tracks.len()), LogType::Info);

    client.close();
    util::log("All good".to_string(), LogType::Info);
    Ok(())
}

fn run(cli: Cli) -> pipe::Result<()> {
    let config = config::load()?;
    if matches!(cli.command, Command::Test) {
        return self_test(&config);
    }

    let mut client = PipeClient::connect(&config)?;
    match cli.command {
        Command::Test => {} // handled above
        Command::Send { command } => println!("{}", client.do_command(&command)?),
        Command::Normalize {
            input,
            output,
            peak,
        } => export::normalize_file(
            &mut client,
            &input,
            &output,
            peak.unwrap_or(config.peak_level),
        )?,
        Command::ExportTracks {
            out_dir,
            base,
            format,
        } => export::export_tracks(&mut client, &out_dir, &base, &format)?,
        Command::ExportClips {
            out_dir,
            prefix,
            format,
        } => export::export_clips(&mut client, &out_dir, &prefix, &format)?,
    }
    client.close();
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        util::log(err.to_string(), LogType::Error);
        std::process::exit(1);
    }
}
