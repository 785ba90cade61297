use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docbatch")]
#[command(author, version, about, long_about = None)]
#[command(about = "Batch split, merge, rename, move and classify case documents")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Preview the planned operations without modifying the filesystem
    #[arg(short, long, global = true)]
    pub dry: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pause between items, in milliseconds
    #[arg(long, value_name = "MS", default_value = "0", global = true)]
    pub delay_ms: u64,

    /// Write a JSON report of the job to this file
    #[arg(long, value_name = "FILE", global = true)]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split PDFs by a fixed page count or by explicit page ranges
    Split(SplitArgs),

    /// Merge PDFs, in the order given, into one document
    Merge(MergeArgs),

    /// Rename PDFs after a table row matched in their page text
    Rename(RenameArgs),

    /// Move files one-to-one into destination folders
    Move(MoveArgs),

    /// Copy files matched by glob rules into named buckets
    Classify(ClassifyArgs),

    /// Convert Word and Excel files in folders to PDF
    Convert(ConvertArgs),

    /// Rotate sideways or upside-down pages upright
    Orient(OrientArgs),
}

/// Source of page text
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recognizer {
    /// Rasterise with pdftoppm and run tesseract
    Tesseract,
    /// Read the text already embedded in the PDF
    TextLayer,
}

#[derive(ClapArgs, Debug)]
pub struct SplitArgs {
    /// PDF files or folders containing them
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Pages per part
    #[arg(long, value_name = "N", conflicts_with = "ranges", required_unless_present = "ranges")]
    pub every: Option<u32>,

    /// First page (1-based) of a fixed-size split
    #[arg(long, value_name = "PAGE", default_value = "1")]
    pub start_page: u32,

    /// Page range "<start>-<end>", a single page, or "" for the whole
    /// document; append "=NAME" to name that part. Repeatable.
    #[arg(long = "range", value_name = "SPEC[=NAME]")]
    pub ranges: Vec<String>,

    /// Naming template for the parts; {0} is the source file name
    #[arg(long, value_name = "TEMPLATE")]
    pub name: Option<String>,

    /// Output directory (default: a folder named after each source)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Only look at the top level of source folders
    #[arg(long)]
    pub no_recursive: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MergeArgs {
    /// PDF files or folders, merged in the order given
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Output file name (default: merged-<timestamp>.pdf)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Output directory (default: the first input's folder)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Delete the inputs after a successful merge
    #[arg(long)]
    pub delete_sources: bool,

    /// Only look at the top level of source folders
    #[arg(long)]
    pub no_recursive: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RenameArgs {
    /// PDF files or folders containing them
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Regex searched in the page text
    #[arg(long, value_name = "REGEX")]
    pub pattern: String,

    /// Table column (0-based) that must occur in the matched text
    #[arg(long, value_name = "INDEX", default_value = "0")]
    pub column: usize,

    /// Tab-separated reference table file
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "table_text",
        required_unless_present = "table_text"
    )]
    pub table: Option<PathBuf>,

    /// Tab-separated reference table given inline
    #[arg(long, value_name = "TEXT")]
    pub table_text: Option<String>,

    /// Ignore the first table row
    #[arg(long)]
    pub skip_header: bool,

    /// Naming template, e.g. "2025-{1}-{2}-判决书" (default: the matched cell)
    #[arg(long, value_name = "TEMPLATE", default_value = "")]
    pub template: String,

    /// Page (1-based) whose text is matched
    #[arg(long, value_name = "PAGE", default_value = "1")]
    pub page: u32,

    /// How page text is obtained
    #[arg(long, value_enum, default_value_t = Recognizer::Tesseract)]
    pub ocr: Recognizer,

    /// Only look at the top level of source folders
    #[arg(long)]
    pub no_recursive: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MoveArgs {
    /// Files to move, paired with --to by position
    #[arg(long = "file", value_name = "FILE", required = true, num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Destination folders, one per file
    #[arg(long = "to", value_name = "DIR", required = true, num_args = 1..)]
    pub destinations: Vec<PathBuf>,

    /// New base names, one per file (extension is kept)
    #[arg(long = "name", value_name = "NAME", num_args = 1..)]
    pub names: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ClassifyArgs {
    /// Folder the glob patterns are relative to
    pub root: PathBuf,

    /// Folder the buckets are created in
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// File with one rule per line: "<bucket> <glob> [<glob>...]"
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// A single rule; repeatable
    #[arg(long = "rule", value_name = "RULE")]
    pub rule: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ConvertArgs {
    /// Folders (or files) to convert
    #[arg(required = true)]
    pub folders: Vec<PathBuf>,

    /// Convert Word documents (.doc, .docx)
    #[arg(long)]
    pub word: bool,

    /// Convert Excel workbooks (.xls, .xlsx)
    #[arg(long)]
    pub excel: bool,

    /// Only look at the top level of folders
    #[arg(long)]
    pub no_recursive: bool,
}

#[derive(ClapArgs, Debug)]
pub struct OrientArgs {
    /// PDF files or folders containing them
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// How page orientation is detected
    #[arg(long, value_enum, default_value_t = Recognizer::Tesseract)]
    pub ocr: Recognizer,

    /// Only look at the top level of source folders
    #[arg(long)]
    pub no_recursive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_every() {
        let args =
            Args::try_parse_from(["docbatch", "split", "a.pdf", "--every", "3", "--dry"]).unwrap();

        assert!(args.dry);
        match args.command {
            Command::Split(split) => {
                assert_eq!(split.every, Some(3));
                assert_eq!(split.start_page, 1);
                assert!(split.ranges.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_split_requires_every_or_range() {
        assert!(Args::try_parse_from(["docbatch", "split", "a.pdf"]).is_err());
        assert!(Args::try_parse_from([
            "docbatch", "split", "a.pdf", "--every", "2", "--range", "1-3"
        ])
        .is_err());
    }

    #[test]
    fn test_split_ranges_repeat() {
        let args = Args::try_parse_from([
            "docbatch", "split", "a.pdf", "--range", "1-2=起诉状", "--range", "3-",
        ])
        .unwrap();

        let Command::Split(split) = args.command else {
            panic!("expected split");
        };
        assert_eq!(split.ranges, vec!["1-2=起诉状", "3-"]);
    }

    #[test]
    fn test_rename_needs_table() {
        assert!(Args::try_parse_from(["docbatch", "rename", "a.pdf", "--pattern", "x"]).is_err());

        let args = Args::try_parse_from([
            "docbatch",
            "rename",
            "a.pdf",
            "--pattern",
            "被告:.*,",
            "--table-text",
            "张三\t001",
            "--ocr",
            "text-layer",
        ])
        .unwrap();
        let Command::Rename(rename) = args.command else {
            panic!("expected rename");
        };
        assert_eq!(rename.ocr, Recognizer::TextLayer);
        assert_eq!(rename.page, 1);
        assert_eq!(rename.template, "");
    }

    #[test]
    fn test_move_lists() {
        let args = Args::try_parse_from([
            "docbatch", "move", "--file", "a.pdf", "b.pdf", "--to", "x", "y", "-vv",
        ])
        .unwrap();

        assert_eq!(args.verbose, 2);
        let Command::Move(relocate) = args.command else {
            panic!("expected move");
        };
        assert_eq!(relocate.files.len(), 2);
        assert_eq!(relocate.destinations, vec![PathBuf::from("x"), PathBuf::from("y")]);
        assert!(relocate.names.is_empty());
    }

    #[test]
    fn test_global_report_flag() {
        let args = Args::try_parse_from([
            "docbatch",
            "classify",
            "/data",
            "--out",
            "/sorted",
            "--rule",
            "docs */*.pdf",
            "--report",
            "r.json",
        ])
        .unwrap();

        assert_eq!(args.report, Some(PathBuf::from("r.json")));
    }
}
