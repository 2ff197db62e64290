//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use shade_model::{Define, Exclusion, Granularity, MatrixOrder, ShaderStage, TargetSpec};

#[derive(Parser)]
#[command(
    name = "shade",
    version,
    about = "Shader cross-compiler with end-to-end source maps",
    long_about = "Translate GLSL and HLSL shaders to GLSL, ESSL, HLSL (d3d9/d3d11), Metal \n\
                  and interface listings.\n\n\
                  Every generated file comes with a source map that resolves positions in \n\
                  the output back to the original shader source."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Translate shader sources to every requested target.
    Build(BuildArgs),

    /// List target profiles and their default versions.
    Profiles(ProfilesArgs),

    /// Resolve a generated position through a written source map.
    Lookup(LookupArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Shader files or directories (added to the config file's sources).
    #[arg(value_name = "SOURCES")]
    pub sources: Vec<PathBuf>,

    /// Batch configuration file (TOML).
    #[arg(long = "config", short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Target profile, optionally with a version (glsl, essl:300, d3d11, metal, varlist).
    #[arg(long = "target", short = 't', value_name = "PROFILE[:VERSION]")]
    pub targets: Vec<TargetSpec>,

    /// Platform the shaders are built for (windows, linux, macos, ios, android, html5, ...).
    #[arg(long = "system", short = 's', value_name = "SYSTEM")]
    pub system: Option<String>,

    /// Output directory for generated files.
    #[arg(long = "output-dir", short = 'o', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of worker threads (default: available parallelism).
    #[arg(long = "jobs", short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Only translate these stages.
    #[arg(long = "stage", value_name = "STAGE")]
    pub stages: Vec<ShaderStage>,

    /// Skip a stage/profile combination (e.g. comp:essl).
    #[arg(long = "exclude", value_name = "STAGE:PROFILE")]
    pub exclude: Vec<Exclusion>,

    /// Preprocessor define.
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<Define>,

    /// Entry point of HLSL sources.
    #[arg(long = "entry-point", value_name = "NAME")]
    pub entry_point: Option<String>,

    /// Also produce relaxed-precision variants.
    #[arg(long = "relax")]
    pub relax: bool,

    /// Produce instanced and non-instanced variants of sources using
    /// INSTANCED_RENDERING.
    #[arg(long = "instanced-optional")]
    pub instanced_optional: bool,

    /// Produce a variant per texture unit count for sources using
    /// MAX_TEXTURE_UNITS.
    #[arg(short = 'T', long = "texture-units", value_name = "N")]
    pub texture_units: Vec<u32>,

    /// Precision of recorded source positions.
    #[arg(long = "granularity", value_enum)]
    pub granularity: Option<GranularityArg>,

    /// Do not embed shader sources in the written source maps.
    #[arg(long = "no-embed-sources")]
    pub no_embed_sources: bool,

    /// Write a `.d` dependency file next to every output.
    #[arg(long = "deps")]
    pub deps: bool,

    /// Translate and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Matrix layout for HLSL output.
    #[arg(long = "matrix-order", value_enum)]
    pub matrix_order: Option<MatrixOrderArg>,

    /// First register number assigned to HLSL resources.
    #[arg(long = "binding-base", value_name = "N")]
    pub binding_base: Option<u32>,

    /// Write the batch report (JSON) to this path.
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ProfilesArgs {
    /// Show default versions for this platform.
    #[arg(long = "system", short = 's', value_name = "SYSTEM")]
    pub system: Option<String>,
}

#[derive(Parser)]
pub struct LookupArgs {
    /// Source map written by `shade build`.
    #[arg(value_name = "MAP")]
    pub map: PathBuf,

    /// 1-based line in the generated file.
    #[arg(value_name = "LINE")]
    pub line: u32,

    /// 0-based column in the generated file.
    #[arg(value_name = "COLUMN", default_value_t = 0)]
    pub column: u32,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GranularityArg {
    /// Exact token columns.
    Token,
    /// Line starts only.
    Line,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Token => Self::Token,
            GranularityArg::Line => Self::Line,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MatrixOrderArg {
    Column,
    Row,
}

impl From<MatrixOrderArg> for MatrixOrder {
    fn from(arg: MatrixOrderArg) -> Self {
        match arg {
            MatrixOrderArg::Column => Self::Column,
            MatrixOrderArg::Row => Self::Row,
        }
    }
}
