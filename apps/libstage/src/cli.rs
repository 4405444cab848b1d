//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use libstage_staging::request::StrippedObjectEntry;
use libstage_staging::RequestFile;
use libstage_types::{ColorChoice, CpuType};
use std::path::PathBuf;

use crate::error::CliError;

/// libstage - Stage native libraries for Android application packages
#[derive(Parser)]
#[command(name = "libstage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stage native libraries for Android application packages")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Stage native libraries into the scratch directory and write metadata.txt
    Stage {
        #[command(flatten)]
        request: RequestArgs,

        /// Override the scratch root
        #[arg(long, value_name = "DIR")]
        scratch_root: Option<PathBuf>,

        /// Number of files hashed concurrently (0 = auto)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print the steps a stage run would execute
    Plan {
        #[command(flatten)]
        request: RequestArgs,

        /// Override the scratch root
        #[arg(long, value_name = "DIR")]
        scratch_root: Option<PathBuf>,
    },

    /// Re-hash a staged directory and compare it with its metadata.txt
    Verify {
        /// Run directory containing libs/, assetLibs/ and metadata.txt
        run_dir: PathBuf,

        /// Number of files hashed concurrently (0 = auto)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

/// A staging request, from a file or from flags
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Request file (TOML)
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["module", "target"])]
    pub request: Option<PathBuf>,

    /// Module name
    #[arg(long)]
    pub module: Option<String>,

    /// Owning build target, e.g. //apps/sample:native
    #[arg(long)]
    pub target: Option<String>,

    /// Native library directory; earlier directories win on collisions
    #[arg(long = "source-dir", value_name = "DIR")]
    pub source_dirs: Vec<PathBuf>,

    /// Only copy these architectures (arm, armv7, arm64, x86, x86_64, mips)
    #[arg(long = "cpu", value_name = "CPU")]
    pub cpu_filters: Vec<String>,

    /// Stripped library as CPU:NAME:PATH
    #[arg(long = "stripped-lib", value_name = "CPU:NAME:PATH")]
    pub stripped_libs: Vec<String>,

    /// Stripped asset library as CPU:NAME:PATH
    #[arg(long = "stripped-asset", value_name = "CPU:NAME:PATH")]
    pub stripped_lib_assets: Vec<String>,
}

fn parse_stripped(raw: &str) -> Result<StrippedObjectEntry, CliError> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(cpu), Some(name), Some(path)) if !name.is_empty() && !path.is_empty() => {
            Ok(StrippedObjectEntry {
                path: PathBuf::from(path),
                name: name.to_string(),
                cpu: CpuType::parse(cpu),
                module: String::new(),
            })
        }
        _ => Err(CliError::InvalidArguments(format!(
            "expected CPU:NAME:PATH, got `{raw}`"
        ))),
    }
}

impl RequestArgs {
    /// Turn the flags into a request file, loading it from disk when given
    pub async fn into_request_file(self) -> Result<RequestFile, CliError> {
        if let Some(path) = self.request {
            let mut file = RequestFile::load(&path).await?;
            // Flags extend whatever the file lists
            file.source_dirs.extend(self.source_dirs);
            file.cpu_filters
                .extend(self.cpu_filters.iter().map(|cpu| CpuType::parse(cpu)));
            for raw in &self.stripped_libs {
                file.stripped_libs.push(parse_stripped(raw)?);
            }
            for raw in &self.stripped_lib_assets {
                file.stripped_lib_assets.push(parse_stripped(raw)?);
            }
            return Ok(file);
        }

        let module = self
            .module
            .ok_or_else(|| CliError::InvalidArguments("--module or --request is required".into()))?;
        let target = self
            .target
            .ok_or_else(|| CliError::InvalidArguments("--target or --request is required".into()))?;

        Ok(RequestFile {
            module,
            target,
            source_dirs: self.source_dirs,
            cpu_filters: self.cpu_filters.iter().map(|cpu| CpuType::parse(cpu)).collect(),
            stripped_libs: self
                .stripped_libs
                .iter()
                .map(|raw| parse_stripped(raw))
                .collect::<Result<_, _>>()?,
            stripped_lib_assets: self
                .stripped_lib_assets
                .iter()
                .map(|raw| parse_stripped(raw))
                .collect::<Result<_, _>>()?,
        })
    }
}
