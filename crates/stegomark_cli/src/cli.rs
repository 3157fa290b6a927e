use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use stegomark_logging::{LogDestination, DEFAULT_LOG_FILE};

#[derive(Parser, Debug)]
#[command(
    name = "stegomark",
    about = "Submit steganography and watermarking jobs and follow their progress"
)]
pub struct Cli {
    /// Processing server base URL (overrides STEGOMARK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Log file path
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Debug logging, mirrored to the terminal
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        if self.verbose {
            LogDestination::Both(self.log_file.clone())
        } else {
            LogDestination::File(self.log_file.clone())
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hide a text message inside a cover image
    EmbedMessage {
        #[arg(long)]
        cover: PathBuf,
        #[arg(long)]
        message: String,
        /// Encrypt the message with this password
        #[arg(long)]
        password: Option<String>,
        /// Where to save the stego image
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Recover a hidden message from a stego image
    ExtractMessage {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
    /// Embed a watermark image into a host image
    EmbedWatermark {
        #[arg(long)]
        host: PathBuf,
        #[arg(long)]
        watermark: PathBuf,
        #[arg(long, default_value_t = 0.1)]
        alpha: f64,
        #[arg(long, default_value_t = 10)]
        arnold_iterations: u32,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Extract a watermark by comparing against the original image
    ExtractWatermark {
        #[arg(long)]
        watermarked: PathBuf,
        #[arg(long)]
        original: PathBuf,
        /// Known watermark, used to report normalized cross-correlation
        #[arg(long)]
        original_watermark: Option<PathBuf>,
        #[arg(long, default_value_t = 64)]
        watermark_size: u32,
        #[arg(long, default_value_t = 10)]
        arnold_iterations: u32,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Embed a watermark image into a video
    EmbedVideo {
        #[arg(long)]
        video: PathBuf,
        #[arg(long)]
        watermark: PathBuf,
        #[arg(long, default_value_t = 0.1)]
        alpha: f64,
        #[arg(long, default_value_t = 5)]
        frame_skip: u32,
        #[arg(long, default_value_t = 10)]
        arnold_iterations: u32,
        /// Watermark every n-th frame instead of scene changes
        #[arg(long)]
        no_scene_detection: bool,
        #[arg(long, default_value_t = 30.0)]
        scene_threshold: f64,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Extract a watermark from one frame of a watermarked video
    ExtractVideo {
        #[arg(long)]
        watermarked: PathBuf,
        #[arg(long)]
        original: PathBuf,
        #[arg(long, default_value_t = 0)]
        frame_number: u32,
        #[arg(long, default_value_t = 64)]
        watermark_size: u32,
        #[arg(long, default_value_t = 10)]
        arnold_iterations: u32,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn video_defaults_follow_the_server_defaults() {
        let cli = Cli::parse_from(["stegomark", "embed-video", "--video", "a.mp4", "--watermark", "w.png"]);
        match cli.command {
            Command::EmbedVideo {
                alpha,
                frame_skip,
                no_scene_detection,
                scene_threshold,
                ..
            } => {
                assert_eq!(alpha, 0.1);
                assert_eq!(frame_skip, 5);
                assert!(!no_scene_detection);
                assert_eq!(scene_threshold, 30.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::parse_from([
            "stegomark",
            "extract-message",
            "--image",
            "s.png",
            "--api-url",
            "http://gpu-box:8000",
            "-v",
        ]);
        assert_eq!(cli.api_url.as_deref(), Some("http://gpu-box:8000"));
        assert!(cli.verbose);
    }
}
