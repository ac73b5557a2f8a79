use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "api-scanner")]
#[command(about = "Extract a deterministic public API snapshot from compiled JARs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Raise diagnostic logging to debug level. No behavioral effect.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Scan one or more JARs and write one API text file per target.
    Scan {
        #[arg(value_name = "JAR", required = true)]
        targets: Vec<PathBuf>,

        /// Dependency classpath entry: a JAR, or a directory expanded to
        /// the JARs beneath it. Repeatable; order is classloader order.
        #[arg(long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,

        #[arg(long, value_name = "DIR", default_value = "api")]
        output_dir: PathBuf,

        /// Package to exclude from scanning, including subpackages.
        #[arg(long = "exclude-package", value_name = "PKG")]
        exclude_packages: Vec<String>,

        /// Class to exclude from scanning; a trailing '*' matches a prefix.
        #[arg(long = "exclude-class", value_name = "CLASS")]
        exclude_classes: Vec<String>,

        /// JSON file mapping class names to excluded "name+descriptor"
        /// method signatures.
        #[arg(long = "exclude-methods", value_name = "FILE")]
        exclude_methods: Option<PathBuf>,

        /// Suffix naming internal-marker annotations.
        #[arg(long, value_name = "SUFFIX", default_value = ".Internal")]
        internal_annotation_suffix: String,

        /// Canonical internal-marker annotation, always treated as internal.
        #[arg(long, value_name = "CLASS")]
        internal_annotation: Option<String>,

        /// Do-not-extend/do-not-implement marker, pinned first in headers.
        #[arg(long, value_name = "CLASS")]
        sealed_annotation: Option<String>,

        /// Package path segment marking internal packages.
        #[arg(long, value_name = "SEGMENT", default_value = ".internal.")]
        internal_package_segment: String,
    },
}
