use crate::output::toc::{self, TocOptions};
use crate::output::{Dialect, Format, FormatError, FormatOptions, HtmlFormatter, MdFormatter, PlainFormatter};
use crate::run::cli::OutputFormat;
use crate::run::RunOptions;
use crate::wiki_elem::{BlockParser, BlockTree};
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::{env, io};

/// The run's overall possible error.
#[derive(Debug)]
pub enum Error {
    /// The document couldn't be written in the requested format.
    ///
    /// This only happens in strict mode; see [`RunOptions::strict`].
    Format(FormatError),

    /// The parsed tree couldn't be serialized as JSON.
    Json(serde_json::Error),

    /// Couldn't read an input file.
    FileReadError(Input, io::Error),

    /// Couldn't write the output.
    WriteError(io::Error),
}

impl std::error::Error for Error {}

/// Stdin or an input file by path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Input {
    Stdin,
    FilePath(String),
}

impl Error {
    pub(crate) fn from_io_error(error: io::Error, file: Input) -> Self {
        Error::FileReadError(file, error)
    }
}

impl From<FormatError> for Error {
    fn from(value: FormatError) -> Self {
        Error::Format(value)
    }
}

impl Display for Input {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::FilePath(file) => write!(f, "file {file:?}"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Format(err) => writeln!(f, "error: {err}"),
            Error::Json(err) => writeln!(f, "JSON error: {err}"),
            Error::FileReadError(file, err) => {
                if env::var("HIKIFMT_PORTABLE_ERRORS").unwrap_or_default().is_empty() {
                    writeln!(f, "{err} while reading {file}")
                } else {
                    writeln!(f, "{} while reading {file}", err.kind())
                }
            }
            Error::WriteError(err) => writeln!(f, "{err} while writing output"),
        }
    }
}

/// A simple facade for handling I/O.
///
/// This trait lets you do "I/O-y stuff" like mocking out stdin or reading files. The [`run`] method uses it.
pub trait OsFacade {
    /// Read stdin (or your mock of it) to a `String`.
    fn read_stdin(&self) -> io::Result<String>;

    /// Read a file path (or your mock of one) to a `String`.
    fn read_file(&self, path: &str) -> io::Result<String>;

    /// Get a writer for stdout (or your mock of it).
    fn stdout(&mut self) -> impl Write;

    /// Handle an error.
    fn write_error(&mut self, err: Error);

    /// Read a slice of file paths into a single, concatenated `String`.
    ///
    /// The default implementation (which you should feel free to use) treats the file path `"-"` as stdin. The first
    /// `"-"` reads all of stdin (via [`Self::read_stdin`]), and subsequent `"-"`s get silently ignored.
    fn read_all(&self, file_paths: &[String]) -> Result<String, Error> {
        if file_paths.is_empty() {
            return self.read_stdin().map_err(|err| Error::from_io_error(err, Input::Stdin));
        }
        let mut contents = String::new();
        let mut have_read_stdin = false;
        for path in file_paths {
            if path == "-" {
                if !have_read_stdin {
                    contents.push_str(
                        &self
                            .read_stdin()
                            .map_err(|err| Error::from_io_error(err, Input::Stdin))?,
                    );
                    have_read_stdin = true
                }
            } else {
                let path_contents = self
                    .read_file(path)
                    .map_err(|err| Error::from_io_error(err, Input::FilePath(path.to_string())))?;
                contents.push_str(&path_contents);
            }
            contents.push('\n');
        }
        Ok(contents)
    }
}

/// Runs hikifmt end to end.
///
/// This uses the provided [RunOptions] and [OsFacade] to read the input files, parses them as a single document, and
/// writes the document to the [`OsFacade`] in the format specified by [`RunOptions::output`]. Returns whether it
/// succeeded; on failure, the error has already gone to [`OsFacade::write_error`].
pub fn run(cli: &RunOptions, os: &mut impl OsFacade) -> bool {
    match run_or_error(cli, os) {
        Ok(()) => true,
        Err(err) => {
            os.write_error(err);
            false
        }
    }
}

fn run_or_error(cli: &RunOptions, os: &mut impl OsFacade) -> Result<(), Error> {
    let contents_str = os.read_all(&cli.file_paths)?;
    let tree = BlockParser::with_options(cli.into()).parse_str(&contents_str);
    let rendered = render(cli, &tree)?;

    let mut stdout = os.stdout();
    stdout.write_all(rendered.as_bytes()).map_err(Error::WriteError)?;
    stdout.flush().map_err(Error::WriteError)
}

/// Renders an already-parsed tree per the given options, including its table of contents if one was requested.
pub fn render(cli: &RunOptions, tree: &BlockTree) -> Result<String, Error> {
    let toc_tree = if cli.toc {
        Some(toc::build(tree, &TocOptions::from(cli)))
    } else {
        None
    };
    match cli.output {
        OutputFormat::Html4 => Ok(render_with(&html(Dialect::Html4), cli, tree, toc_tree, "")?),
        OutputFormat::Xhtml => Ok(render_with(&html(Dialect::Xhtml), cli, tree, toc_tree, "")?),
        OutputFormat::Html5 => Ok(render_with(&html(Dialect::Html5), cli, tree, toc_tree, "")?),
        OutputFormat::Plain | OutputFormat::PlainVerbose => {
            Ok(render_with(&PlainFormatter::new(cli.into()), cli, tree, toc_tree, "\n")?)
        }
        OutputFormat::Markdown | OutputFormat::Gfm => {
            Ok(render_with(&MdFormatter::new(cli.into()), cli, tree, toc_tree, "\n")?)
        }
        OutputFormat::Json => {
            let json = match &toc_tree {
                Some(toc_tree) => serde_json::to_string_pretty(&serde_json::json!({
                    "toc": toc_tree,
                    "document": tree,
                })),
                None => serde_json::to_string_pretty(tree),
            };
            let mut json = json.map_err(Error::Json)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn html(dialect: Dialect) -> HtmlFormatter {
    HtmlFormatter::new(dialect)
}

/// Formats the table of contents (if any) and then the document, with `separator` between them.
fn render_with<F: Format>(
    fmt: &F,
    cli: &RunOptions,
    tree: &BlockTree,
    toc_tree: Option<BlockTree>,
    separator: &str,
) -> Result<String, FormatError> {
    let options = FormatOptions::from(cli);
    let body = fmt.format_with(tree, &options)?;
    let Some(toc_tree) = toc_tree else {
        return Ok(body);
    };
    let toc = fmt.format_with(&toc_tree, &options)?;
    if toc.is_empty() {
        return Ok(body);
    }
    if body.is_empty() {
        return Ok(toc);
    }
    Ok(format!("{toc}{separator}{body}"))
}
