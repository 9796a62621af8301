use std::path::PathBuf;

use clap::Parser;
use grasp_devices::SensorScript;

/// Default simulated participant: rest, hold, lift, return. Ends on a single
/// present sample so the next trial's replay starts with the rest again.
pub const DEFAULT_SENSOR_SCRIPT: &str = "0*20,1*30,0*15,1";

/// EEG grasping experiment: PLATO goggles, IR finger sensor and go cue.
#[derive(Debug, Parser)]
#[command(name = "grasp-experiment", version)]
pub struct Cli {
    /// Participant ID; names the output file.
    #[arg(short, long)]
    pub participant: String,

    /// JSON experiment config. Missing fields use the lab defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for `participant_<id>_data.csv`.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of trials to run before finalizing.
    #[arg(short = 'n', long)]
    pub trials: Option<usize>,

    /// Simulated sensor levels, `level*count` segments, e.g. `0*20,1*30,0*15,1`.
    /// Replayed once per trial.
    #[arg(long, default_value = DEFAULT_SENSOR_SCRIPT)]
    pub sensor_script: SensorScript,

    /// Block for the real cue duration instead of returning immediately.
    #[arg(long)]
    pub realtime_audio: bool,
}
