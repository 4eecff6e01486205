//! prashn CLI - Hindi MCQ extraction tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use prashn::{
    open_backend, render, Classifier, Document, ExtractOptions, ExtractionResult, Extractor,
    JsonFormat, McqDetector, Normalizer, OcrLanguage, PageKind, TesseractCli,
};

#[derive(Parser)]
#[command(name = "prashn")]
#[command(version)]
#[command(about = "Extract Hindi multiple-choice questions from PDFs and scans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract questions from a PDF or image
    Extract {
        /// Input PDF or image file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Show how each page would be read (text layer or OCR)
    Classify {
        /// Input PDF or image file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Minimum text-layer characters per square inch
        #[arg(long, default_value = "1.0")]
        min_density: f32,
    },

    /// Normalize a UTF-8 text file (legacy font remap and matra repair)
    Normalize {
        /// Input text file
        #[arg(value_name = "TEXT_FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip legacy font detection
        #[arg(long)]
        no_legacy: bool,
    },

    /// Detect questions in a UTF-8 text file
    Detect {
        /// Input text file
        #[arg(value_name = "TEXT_FILE")]
        input: PathBuf,

        /// Normalize the text first
        #[arg(long)]
        normalize: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct Tuning {
    /// JSON file with extraction options
    #[arg(long, value_name = "FILE", env = "PRASHN_CONFIG")]
    config: Option<PathBuf>,

    /// MIME type hint for inputs without a recognizable signature
    #[arg(long)]
    mime: Option<String>,

    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Mean OCR confidence (0-1) below which a page is retried
    #[arg(long)]
    threshold: Option<f32>,

    /// Maximum OCR attempts per page
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Overall confidence (0-1) below which the result is flagged
    #[arg(long)]
    warn_below: Option<f32>,

    /// Time budget for the whole document, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Page workers (0 = one per CPU)
    #[arg(long)]
    workers: Option<usize>,

    /// Concurrent OCR engine calls (0 = one per CPU)
    #[arg(long)]
    ocr_instances: Option<usize>,

    /// Tesseract language(s), e.g. "hin" or "hin+eng"
    #[arg(long)]
    lang: Option<String>,

    /// Path to the tesseract executable
    #[arg(long, value_name = "PATH", env = "PRASHN_TESSERACT")]
    tesseract: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full extraction result as JSON
    Json,
    /// Question listing
    Text,
}

impl Tuning {
    fn options(&self) -> Result<ExtractOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => ExtractOptions::from_json_file(path)?,
            None => ExtractOptions::default(),
        };
        if let Some(dpi) = self.dpi {
            options = options.with_dpi(dpi);
            if options.degraded_dpi > dpi {
                options = options.with_degraded_dpi(dpi);
            }
        }
        if let Some(threshold) = self.threshold {
            options = options.with_ocr_confidence_threshold(threshold);
        }
        if let Some(attempts) = self.max_attempts {
            options = options.with_max_ocr_attempts(attempts);
        }
        if let Some(warn) = self.warn_below {
            options = options.with_warning_threshold(warn);
        }
        if let Some(secs) = self.timeout {
            options = options.with_time_budget(Duration::from_secs(secs));
        }
        if let Some(workers) = self.workers {
            options = options.with_workers(workers);
        }
        if let Some(instances) = self.ocr_instances {
            options = options.with_ocr_instances(instances);
        }
        if let Some(lang) = &self.lang {
            options = options.with_language(parse_language(lang));
        }
        options.validate()?;
        Ok(options)
    }
}

fn parse_language(value: &str) -> OcrLanguage {
    let mut parts = value.split('+').map(str::trim).filter(|p| !p.is_empty());
    OcrLanguage {
        primary: parts.next().unwrap_or("hin").to_string(),
        fallback: parts.next().map(str::to_string),
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            format,
            compact,
            tuning,
        } => cmd_extract(&input, output.as_deref(), format, compact, &tuning),
        Commands::Classify { input, min_density } => cmd_classify(&input, min_density),
        Commands::Normalize {
            input,
            output,
            no_legacy,
        } => cmd_normalize(&input, output.as_deref(), no_legacy),
        Commands::Detect {
            input,
            normalize,
            compact,
        } => cmd_detect(&input, normalize, compact),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_extract(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    compact: bool,
    tuning: &Tuning,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = tuning.options()?;

    let data = fs::read(input)?;
    let document = Document::from_bytes(data, tuning.mime.as_deref())?;

    let mut engine = TesseractCli::new();
    if let Some(path) = &tuning.tesseract {
        engine = engine.with_program(path);
    }
    engine.probe(&options.language)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Extracting {} ({})", input.display(), document.kind()));

    let extractor = Extractor::new(Arc::new(engine)).with_options(options);
    let result = extractor.extract(&document);
    pb.finish_and_clear();
    let result = result?;

    let rendered = match format {
        OutputFormat::Json => {
            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            render::to_json(&result, format)?
        }
        OutputFormat::Text => render::to_text(&result),
    };

    write_output(output, &rendered)?;
    print_summary(&result);
    Ok(())
}

fn print_summary(result: &ExtractionResult) {
    eprintln!(
        "{} {} questions from {} pages, confidence {:.0}%",
        "Done!".green().bold(),
        result.questions.len(),
        result.page_count(),
        result.overall_confidence * 100.0
    );
    let failed = result.failed_pages();
    if !failed.is_empty() {
        let pages: Vec<String> = failed.iter().map(u32::to_string).collect();
        eprintln!("{} pages without text: {}", "Note:".yellow(), pages.join(", "));
    }
    if result.timed_out {
        eprintln!("{} time budget exceeded, result is partial", "Warning:".yellow().bold());
    }
    if result.low_confidence_warning {
        eprintln!(
            "{} low confidence result, consider re-scanning the document",
            "Warning:".yellow().bold()
        );
    }
}

fn cmd_classify(input: &Path, min_density: f32) -> Result<(), Box<dyn std::error::Error>> {
    let document = Document::open(input)?;
    let backend = open_backend(&document)?;
    let pages = Classifier::new(min_density).classify(backend.as_ref());

    println!("{}", "Page Classification".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), document.kind());
    println!("{}: {}", "Pages".bold(), pages.len());
    println!();

    for page in &pages {
        let kind = match page.kind {
            PageKind::TextNative => "text".green(),
            PageKind::ScanNative => "scan".yellow(),
        };
        let flag = if page.flagged {
            " (text layer unreadable)".red().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:>4}  {}  {:>8.2} chars/in²{}",
            page.page, kind, page.density, flag
        );
    }
    Ok(())
}

fn cmd_normalize(
    input: &Path,
    output: Option<&Path>,
    no_legacy: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(input)?;
    let normalized = Normalizer::new()
        .with_legacy_detection(!no_legacy)
        .normalize(&text);

    write_output(output, &normalized.text)?;
    if normalized.legacy_font_detected {
        eprintln!(
            "{} legacy font encoding remapped ({} unmapped glyphs)",
            "Note:".yellow(),
            normalized.unmapped_chars
        );
    }
    eprintln!("{} {} characters repaired", "Done!".green().bold(), normalized.repaired_chars);
    Ok(())
}

fn cmd_detect(input: &Path, normalize: bool, compact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut text = fs::read_to_string(input)?;
    if normalize {
        text = Normalizer::new().normalize(&text).text;
    }
    let questions = McqDetector::new().detect(&text);
    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    println!("{}", render::to_json(&questions, format)?);
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        eprintln!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "prashn".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Hindi MCQ extraction tool");
    println!();
    println!("OCR: tesseract (hin, eng); rasterizer: pdftoppm");
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        let lang = parse_language("hin+eng");
        assert_eq!(lang.primary, "hin");
        assert_eq!(lang.fallback.as_deref(), Some("eng"));
        assert_eq!(parse_language("hin").fallback, None);
    }

    #[test]
    fn test_extract_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "prashn",
            "extract",
            "paper.pdf",
            "--dpi",
            "150",
            "--threshold",
            "0.8",
            "--timeout",
            "30",
            "--ocr-instances",
            "2",
        ])
        .unwrap();
        let Commands::Extract { tuning, .. } = cli.command else {
            panic!("expected extract");
        };
        let options = tuning.options().unwrap();
        assert_eq!(options.dpi, 150);
        assert_eq!(options.degraded_dpi, 150);
        assert_eq!(options.ocr_confidence_threshold, 0.8);
        assert_eq!(options.per_document_time_budget, Duration::from_secs(30));
        assert_eq!(options.ocr_instances, 2);
        assert_eq!(options.effective_ocr_instances(), 2);
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        let cli = Cli::try_parse_from(["prashn", "extract", "a.png", "--threshold", "70"]).unwrap();
        let Commands::Extract { tuning, .. } = cli.command else {
            panic!("expected extract");
        };
        assert!(tuning.options().is_err());
    }
}
