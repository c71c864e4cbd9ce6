use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

pub struct Config {
    /// Directory or archive to convert.
    pub source: PathBuf,
    /// Output file; `None` means `<project>_<date>.md` in the current directory.
    pub output_path: Option<PathBuf>,
    pub project_name: Option<String>,
    /// Archive format tag overriding detection from the file name.
    pub format: Option<String>,
    pub ignore_file: Option<PathBuf>,
    /// Extensions to enable; empty means all.
    pub extensions: Vec<String>,
    pub excluded_extensions: Vec<String>,
    /// Paths to select, in order; empty means every visible file.
    pub selected_paths: Vec<String>,
    pub assume_yes: bool,
    pub list_only: bool,
    pub verbosity: u8,
}

impl Config {
    /// Config for `source` with every other option at its default.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_path: None,
            project_name: None,
            format: None,
            ignore_file: None,
            extensions: Vec::new(),
            excluded_extensions: Vec::new(),
            selected_paths: Vec::new(),
            assume_yes: false,
            list_only: false,
            verbosity: 0,
        }
    }
}

fn command() -> Command {
    Command::new("repo2md")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turns a directory or source archive into a single Markdown document")
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .help("Directory, .zip, .tar, .tar.gz or .tgz to convert")
                .default_value("."),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Sets the output .md file path [default: <project>_<YYYY-MM-DD>.md]")
                .num_args(1),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .value_name("NAME")
                .help("Project name used in the heading and tree root")
                .num_args(1),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Archive format: zip, tar or tar.gz (detected from the file name by default)")
                .num_args(1),
        )
        .arg(
            Arg::new("ignore")
                .short('i')
                .long("ignore")
                .value_name("FILE")
                .help("Sets an extra ignore file for directory sources")
                .num_args(1),
        )
        .arg(
            Arg::new("ext")
                .short('e')
                .long("ext")
                .value_name("EXT")
                .help("Only include files with this extension (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("exclude-ext")
                .short('x')
                .long("exclude-ext")
                .value_name("EXT")
                .help("Exclude files with this extension (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("select")
                .short('s')
                .long("select")
                .value_name("PATH")
                .help("Include only this relative path, in the given order (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .help("Include files that look like they contain secrets without refusing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("Print the file tree with sizes and filter state instead of writing Markdown")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count),
        )
}

/// Parses the process arguments, exiting with usage on `--help` or bad input.
pub fn parse_args() -> Config {
    config_from(&command().get_matches())
}

pub fn parse_args_from<I, T>(args: I) -> Result<Config>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    Ok(config_from(&matches))
}

fn config_from(matches: &ArgMatches) -> Config {
    let strings = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default()
    };

    Config {
        source: matches
            .get_one::<String>("source")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        project_name: matches.get_one::<String>("name").cloned(),
        format: matches.get_one::<String>("format").cloned(),
        ignore_file: matches.get_one::<String>("ignore").map(PathBuf::from),
        extensions: strings("ext"),
        excluded_extensions: strings("exclude-ext"),
        selected_paths: strings("select"),
        assume_yes: matches.get_flag("yes"),
        list_only: matches.get_flag("list"),
        verbosity: matches.get_count("verbose"),
    }
}

/// Log level filter for a `-v` count.
pub fn log_level(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
