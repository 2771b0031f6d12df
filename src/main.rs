//! bookmill - ingest an ebook and show what was extracted

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use bookmill::{ChapterOptions, IngestedBook, ingest_with};

#[derive(Parser)]
#[command(name = "bookmill")]
#[command(version, about = "Split TXT, EPUB and MOBI books into chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    bookmill novel.txt              Show title, author and chapter count
    bookmill novel.txt --chapters   List chapter titles with sizes
    bookmill book.epub --json       Dump the whole book as JSON")]
struct Cli {
    /// Input file (TXT, EPUB, or MOBI)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Print the ingested book as JSON
    #[arg(long, conflicts_with = "chapters")]
    json: bool,

    /// List chapter titles and sizes
    #[arg(short, long)]
    chapters: bool,

    /// Split chapters found by heading detection above this many characters
    #[arg(long, value_name = "N")]
    max_toc_len: Option<usize>,

    /// Chunk size for text without detectable headings
    #[arg(long, value_name = "N")]
    max_plain_len: Option<usize>,

    /// Log more detail (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress log messages
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut options = ChapterOptions::default();
    if let Some(n) = cli.max_toc_len {
        options.max_len_with_toc = n;
    }
    if let Some(n) = cli.max_plain_len {
        options.max_len_without_toc = n;
    }

    let result = ingest_with(&cli.input, &options)
        .map_err(|e| e.to_string())
        .and_then(|ingested| report(&ingested, &cli));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Off,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, _) => LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn report(ingested: &IngestedBook, cli: &Cli) -> Result<(), String> {
    if cli.json {
        let json = serde_json::to_string_pretty(ingested).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    let book = &ingested.book;
    println!("File: {}", ingested.source_path.display());
    println!("Format: {}", ingested.format);
    println!("Title: {}", book.title);
    println!("Author: {}", book.author);
    if let Some(cover) = &book.cover {
        println!("Cover: {} ({} bytes)", cover.media_type, cover.data.len());
    }
    println!("Chapters: {}", book.chapters.len());

    if cli.chapters {
        let width = book.chapters.len().to_string().len();
        for (i, chapter) in book.chapters.iter().enumerate() {
            println!(
                "{:>width$}  {}  ({} chars)",
                i + 1,
                chapter.title,
                chapter.content.chars().count()
            );
        }
    }

    Ok(())
}
