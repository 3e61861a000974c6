use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shellpilot")]
#[command(about = "Remote control for the device UI shell")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Host running the shell's automation server
    #[arg(long, global = true, default_value = "localhost")]
    pub host: String,

    /// Automation server port
    #[arg(long, global = true, default_value_t = 2828)]
    pub port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wake the screen and launch an app by name
    Run {
        /// App display name (e.g. "camera")
        name: String,
    },

    /// Capture a screenshot to a PNG file
    Capture {
        /// Output file path
        output: PathBuf,
    },

    /// Press a hardware or keyboard button
    Press {
        /// Button name ("home", "volumeup", ...) or a key like "Enter"
        button: String,
    },

    /// Read an engine preference
    Getpref {
        /// Preference name
        name: String,
    },

    /// Write an engine preference and verify it stuck
    Setpref {
        /// name=value; true/false and digit strings are typed accordingly
        assignment: String,
    },

    /// Read a shell setting
    Getsettings {
        /// Setting name
        name: String,
    },

    /// Write a shell setting and verify it stuck
    Setsettings {
        /// name=value
        assignment: String,
    },

    /// Dump all shell settings
    Getallsettings,
}
