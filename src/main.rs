//! lectio - Bible markup importer

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use lectio::books::{find_book, standard_book_meta};
use lectio::{
    BookSink, BookTree, Dialect, Osis, ParserOptions, Usx, VersionMeta, import_file,
    load_rules_from_path,
};

#[derive(Parser)]
#[command(name = "lectio")]
#[command(version, about = "Convert OSIS and USX Bible markup into content trees", long_about = None)]
#[command(after_help = "EXAMPLES:
    lectio osis kjv.xml --summary          Import an OSIS file and print counts
    lectio usx RUT.usx --books Ruth        Print the Ruth content tree as JSON
    lectio v11n versification.tsv          Load a versification rule table")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Import an OSIS document
    Osis(ImportArgs),
    /// Import a USX document
    Usx(ImportArgs),
    /// Load a versification rule table
    V11n {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Print counts instead of the rules
        #[arg(short, long)]
        summary: bool,
    },
}

#[derive(Args)]
struct ImportArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Only output these books (comma separated, any notation)
    #[arg(long, value_delimiter = ',')]
    books: Vec<String>,

    /// Print counts instead of the content trees
    #[arg(short, long)]
    summary: bool,

    /// Close stray paragraphs and open paragraphs for loose text
    #[arg(long)]
    auto_paragraphs: bool,

    /// The source has no paragraph markup
    #[arg(long)]
    no_structural_markup: bool,

    /// Fail on unknown tags
    #[arg(long)]
    strict_tags: bool,

    /// Version identifier
    #[arg(long, default_value = "UNKNOWN")]
    uid: String,

    /// Version language
    #[arg(long, default_value = "en")]
    language: String,
}

impl ImportArgs {
    fn options(&self) -> ParserOptions {
        ParserOptions::new()
            .with_auto_generate_paragraphs(self.auto_paragraphs)
            .with_structural_markup(!self.no_structural_markup)
            .with_strict_tags(self.strict_tags)
    }
}

/// Keeps the trees of the requested books.
struct FilteredSink {
    wanted: Vec<String>,
    trees: Vec<BookTree>,
}

impl BookSink for FilteredSink {
    fn accept(&mut self, _version: &VersionMeta, book: BookTree) -> lectio::Result<()> {
        if self.wanted.is_empty() || self.wanted.contains(&book.book.osis_id) {
            self.trees.push(book);
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = lectio::logging::init_tracing(cli.log_level.as_deref()) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Osis(args) => run_import(Osis, &args),
        Command::Usx(args) => run_import(Usx, &args),
        Command::V11n { input, summary } => run_v11n(&input, summary),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_import<D: Dialect + Clone>(dialect: D, args: &ImportArgs) -> Result<(), String> {
    let wanted = args
        .books
        .iter()
        .map(|id| {
            find_book(id)
                .map(|b| b.osis_id.to_string())
                .ok_or_else(|| format!("unknown book {id:?}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let title = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let version = VersionMeta::new(&args.uid, &args.language, title);
    let mut sink = FilteredSink {
        wanted,
        trees: Vec::new(),
    };
    let summary = import_file(
        dialect,
        &args.input,
        &standard_book_meta(),
        &version,
        args.options(),
        &mut sink,
    )
    .map_err(|e| e.to_string())?;

    if args.summary {
        println!("File: {}", args.input.display());
        println!("Books: {}", summary.books.join(" "));
        println!("Phrases: {}", summary.phrases);
        println!("Joined verses: {}", summary.placeholders);
        for tree in &sink.trees {
            println!(
                "  {}: {} sections, {} phrases",
                tree.book.osis_id,
                tree.sections().len(),
                tree.phrases().len()
            );
        }
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&sink.trees).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn run_v11n(input: &Path, summary: bool) -> Result<(), String> {
    let table = load_rules_from_path(input).map_err(|e| e.to_string())?;
    if summary {
        println!("File: {}", input.display());
        println!("Rules: {}", table.len());
        println!("Skipped: {}", table.skipped.total());
        for (reason, count) in &table.skipped.by_reason {
            println!("  {reason}: {count}");
        }
        return Ok(());
    }
    let json = serde_json::to_string_pretty(&table).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
