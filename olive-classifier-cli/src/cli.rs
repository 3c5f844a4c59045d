use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use olive_classifier::{service::prepare::Interpolation, tensor::Layout, verdict::ConfidencePolicy};
use strum::Display;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input image path.
    /// Example: --input /path/to/leaf1.jpg --input /path/to/leaf2.png
    #[arg(short, long)]
    pub input: Vec<PathBuf>,

    /// Path of the bundled ONNX model.
    #[arg(short, long, default_value = "models/olive_disease_model.onnx")]
    pub model: PathBuf,

    /// Directory the model is copied to before being loaded.
    /// When omitted the model is loaded from its bundled location.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// File with one class label per line, the first one being the healthy class.
    /// Default: the olive disease classes of the bundled model
    #[arg(short, long)]
    pub labels: Option<PathBuf>,

    /// Side of the square image expected by the model.
    #[arg(long, default_value = "224", value_parser = clap::value_parser!(u32).range(1..=4096))]
    pub size: u32,

    /// Input layout tried first: channels-first (NCHW) or channels-last (NHWC).
    /// The other one is tried once if the model rejects the first.
    #[arg(long, default_value = "channels-first")]
    pub layout: LayoutArg,

    /// Resize filter: bilinear or nearest.
    #[arg(long, default_value = "bilinear")]
    pub interpolation: InterpolationArg,

    /// How the confidence is computed: raw (model score as is) or softmax.
    #[arg(short, long, default_value = "raw")]
    pub confidence: ConfidenceArg,

    /// Number of threads used to prepare the images. Must be greater than 0 and less than 65536.
    /// Example: --threads 8
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: u16,

    /// Number of top class scores to show for each image, 0 to show only the verdict.
    /// Example: --show 3
    #[arg(short, long, default_value = "0")]
    pub show: usize,

    /// Print the input and output names declared by the model and exit.
    #[arg(long)]
    pub inspect: bool,
}

#[derive(Debug, Clone, Display)]
pub enum LayoutArg {
    #[strum(serialize = "channels-first")]
    ChannelsFirst,
    #[strum(serialize = "channels-last")]
    ChannelsLast,
}

impl FromStr for LayoutArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channels-first" | "nchw" => Ok(Self::ChannelsFirst),
            "channels-last" | "nhwc" => Ok(Self::ChannelsLast),
            _ => Err(format!("Invalid layout: {}", s)),
        }
    }
}

impl From<LayoutArg> for Layout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::ChannelsFirst => Layout::ChannelsFirst,
            LayoutArg::ChannelsLast => Layout::ChannelsLast,
        }
    }
}

#[derive(Debug, Clone, Display)]
pub enum InterpolationArg {
    #[strum(serialize = "bilinear")]
    Bilinear,
    #[strum(serialize = "nearest")]
    Nearest,
}

impl FromStr for InterpolationArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bilinear" => Ok(Self::Bilinear),
            "nearest" => Ok(Self::Nearest),
            _ => Err(format!("Invalid interpolation: {}", s)),
        }
    }
}

impl From<InterpolationArg> for Interpolation {
    fn from(value: InterpolationArg) -> Self {
        match value {
            InterpolationArg::Bilinear => Interpolation::Bilinear,
            InterpolationArg::Nearest => Interpolation::Nearest,
        }
    }
}

#[derive(Debug, Clone, Display)]
pub enum ConfidenceArg {
    #[strum(serialize = "raw")]
    Raw,
    #[strum(serialize = "softmax")]
    Softmax,
}

impl FromStr for ConfidenceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "softmax" => Ok(Self::Softmax),
            _ => Err(format!("Invalid confidence policy: {}", s)),
        }
    }
}

impl From<ConfidenceArg> for ConfidencePolicy {
    fn from(value: ConfidenceArg) -> Self {
        match value {
            ConfidenceArg::Raw => ConfidencePolicy::Raw,
            ConfidenceArg::Softmax => ConfidencePolicy::Softmax,
        }
    }
}
