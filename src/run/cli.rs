use crate::output::toc::TocOptions;
use crate::output::{FormatOptions, MdWriterOptions, PlainOptions};
use crate::wiki_elem::{AutoLink, ParseOptions};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use derive_builder::Builder;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

macro_rules! create_options_structs {
    (
        $(
            $(#[$meta:meta])*
            clap $clap:tt
            pub $name:ident : $ty:ty
        ),* $(,)?
    ) => {
        #[derive(Clone, Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Parser)]
        #[command(version, about, long_about = None)]
        #[doc(hidden)]
        pub struct CliOptions {
            $(
            $(#[$meta])*
            #[arg$clap]
            pub(crate) $name: $ty,
            )*

            // clap-only stuff:

            /// Turn bare URLs in verbatim text into links, in HTML output.
            ///
            /// Off by default.
            // Note: this is a fake arg, only here for the help text. The real args are the hidden --auto-link-verbatim
            // and --no-auto-link-verbatim below, since clap doesn't have negatable boolean flags.
            #[arg(long = "[no]-auto-link-verbatim", action)]
            pub(crate) auto_link_verbatim_umbrella: bool,

            /// Turns on the --[no]-auto-link-verbatim option.
            #[arg(long, hide = true)]
            pub(crate) auto_link_verbatim: bool,

            /// Negates the --[no]-auto-link-verbatim option.
            #[arg(long, conflicts_with = "auto_link_verbatim", hide = true)]
            pub(crate) no_auto_link_verbatim: bool,

            /// Wiki files to convert, by path. If not provided, standard input will be used.
            ///
            /// If several are provided, they're converted as if they were all concatenated into a single file. A path of
            /// "-" represents standard input; all but the first "-" are ignored.
            #[arg()]
            pub(crate) file_paths: Vec<String>,
        }

        /// Options analogous to the hikifmt CLI's switches.
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Builder)]
        pub struct RunOptions {
            $(
            $(#[$meta])*
            pub $name: $ty,
            )*

            /// Whether bare URLs in verbatim text become links. `None` leaves it up to the output format. This is
            /// analogous to the `--[no-]auto-link-verbatim` option in the CLI arguments.
            pub auto_link_in_verbatim: Option<bool>,

            pub file_paths: Vec<String>,
        }

        impl From<CliOptions> for RunOptions {
            fn from(value: CliOptions) -> Self {
                let auto_link_in_verbatim = match (value.auto_link_verbatim, value.no_auto_link_verbatim) {
                    (false, false) => None,
                    (true, false) => Some(true),
                    (false, true) => Some(false),
                    (true, true) => {
                        // Clap will prevent this from happening. See test [tests::both_auto_link_verbatim_flags] below.
                        log::error!("conflicting --auto-link-verbatim flags; using the output format's default");
                        None
                    }
                };
                Self {
                    $($name: value.$name,)*
                    auto_link_in_verbatim,
                    file_paths: value.file_paths,
                }
            }
        }
    };
}

create_options_structs! {
    /// Specifies the output format.
    clap(long, short, value_enum, default_value_t = OutputFormat::Html4)
    pub output: OutputFormat,

    /// Turn bare URLs, and optionally WikiNames, into links before parsing.
    clap(long, value_enum, default_value_t = AutoLink::Off)
    pub auto_link: AutoLink,

    /// Put a table of contents before the document. Only headings with an id (`![id]Heading`) are included.
    clap(long)
    pub toc: bool,

    /// Which heading levels the table of contents covers, as `MIN..=MAX` (or just `LEVEL`).
    clap(long, default_value_t = TocLevels::default())
    pub toc_levels: TocLevels,

    /// Fail on malformed tables in plain output, and on GFM tables that can't be written as pipe tables.
    clap(long)
    pub strict: bool,

    /// Write every GFM table as a pipe table, flattening cells that span rows or columns. Only valid with `-o gfm`.
    clap(long)
    pub force_pipe_tables: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: OutputFormat::Html4,
            auto_link: AutoLink::Off,
            toc: false,
            toc_levels: TocLevels::default(),
            strict: false,
            force_pipe_tables: false,
            auto_link_in_verbatim: None,
            file_paths: vec![],
        }
    }
}

impl From<&RunOptions> for ParseOptions {
    fn from(cli: &RunOptions) -> Self {
        ParseOptions {
            auto_link: cli.auto_link,
        }
    }
}

impl From<&RunOptions> for FormatOptions {
    fn from(cli: &RunOptions) -> Self {
        FormatOptions {
            auto_link_in_verbatim: cli.auto_link_in_verbatim,
        }
    }
}

impl From<&RunOptions> for MdWriterOptions {
    fn from(cli: &RunOptions) -> Self {
        MdWriterOptions {
            gfm: cli.output == OutputFormat::Gfm,
            strict: cli.strict,
            force_pipe_tables: cli.force_pipe_tables,
        }
    }
}

impl From<&RunOptions> for PlainOptions {
    fn from(cli: &RunOptions) -> Self {
        PlainOptions {
            verbose: cli.output == OutputFormat::PlainVerbose,
            strict: cli.strict,
        }
    }
}

impl From<&RunOptions> for TocOptions {
    fn from(cli: &RunOptions) -> Self {
        TocOptions {
            levels: cli.toc_levels.min..=cli.toc_levels.max,
        }
    }
}

impl CliOptions {
    pub fn extra_validation(&self) -> bool {
        if self.force_pipe_tables && self.output != OutputFormat::Gfm {
            let _ = CliOptions::command()
                .error(
                    ErrorKind::ArgumentConflict,
                    format!("--force-pipe-tables only applies to gfm output, not {}", self.output),
                )
                .print();
            return false;
        }
        if self.auto_link_verbatim_umbrella {
            let _ = CliOptions::command()
                .error(
                    ErrorKind::UnknownArgument,
                    r"invalid argument '--[no]-auto-link-verbatim'; use '--auto-link-verbatim' or '--no-auto-link-verbatim'.",
                )
                .print();
            return false;
        }
        true
    }
}

/// Output formats, analogous to `--output` in the CLI.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum OutputFormat {
    /// HTML 4, with `<div class="section">` around each heading's section.
    #[default]
    Html4,

    /// XHTML 1. Like HTML 4, but void elements are closed (`<hr />`).
    Xhtml,

    /// HTML 5, with `<section>` elements and `id` anchors.
    Html5,

    /// Just the text. Links are written as their captions, and deleted text is dropped.
    Plain,

    /// Plain text that keeps link destinations (`caption (url)`) and marks deleted text (`[deleted:text]`).
    PlainVerbose,

    /// Markdown. Definition lists and tables are embedded as HTML.
    #[value(alias = "md")]
    Markdown,

    /// GitHub-Flavored Markdown: like Markdown, but with `~~strikethrough~~` and pipe tables.
    Gfm,

    /// The parsed tree, as JSON.
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let self_str = match self {
            OutputFormat::Html4 => "html4",
            OutputFormat::Xhtml => "xhtml",
            OutputFormat::Html5 => "html5",
            OutputFormat::Plain => "plain",
            OutputFormat::PlainVerbose => "plain-verbose",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Gfm => "gfm",
            OutputFormat::Json => "json",
        };
        f.write_str(self_str)
    }
}

/// An inclusive range of heading levels, analogous to `--toc-levels` in the CLI.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TocLevels {
    pub min: u32,
    pub max: u32,
}

impl Default for TocLevels {
    fn default() -> Self {
        let defaults = TocOptions::default().levels;
        Self {
            min: *defaults.start(),
            max: *defaults.end(),
        }
    }
}

impl Display for TocLevels {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

impl FromStr for TocLevels {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_level = |level: &str| {
            level
                .trim()
                .parse::<u32>()
                .map_err(|err| format!("invalid heading level {level:?}: {err}"))
        };
        let (min, max) = match s.split_once("..=") {
            Some((min, max)) => (parse_level(min)?, parse_level(max)?),
            None => {
                let level = parse_level(s)?;
                (level, level)
            }
        };
        if min == 0 || min > max {
            return Err(format!("{s:?} isn't a range of heading levels, like 2..=3"));
        }
        Ok(Self { min, max })
    }
}
