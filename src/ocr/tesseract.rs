//! `tesseract` executable driver.

use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::{DynamicImage, GrayImage, ImageFormat};

use super::{OcrEngine, OcrLanguage, OcrToken, PageSegMode, Recognition};
use crate::error::{Error, Result};

/// Word-level rows in Tesseract's TSV output.
const TSV_WORD_LEVEL: u32 = 5;
/// Columns up to and including `text`.
const TSV_MIN_FIELDS: usize = 12;

/// OCR engine backed by the `tesseract` command-line program.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
        }
    }
}

impl TesseractCli {
    /// Use `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Check that the executable runs and has every language pack installed.
    pub fn probe(&self, language: &OcrLanguage) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--list-langs")
            .output()
            .map_err(|e| self.unavailable(None, &e))?;
        if !output.status.success() {
            return Err(Error::EngineUnavailable {
                page: None,
                reason: format!("{} --list-langs exited with {}", self.program.display(), output.status),
            });
        }

        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        let installed: Vec<&str> = listing.lines().map(str::trim).collect();

        let wanted = std::iter::once(language.primary.as_str()).chain(language.fallback.as_deref());
        for lang in wanted {
            if !installed.contains(&lang) {
                return Err(Error::EngineUnavailable {
                    page: None,
                    reason: format!("language pack '{}' is not installed", lang),
                });
            }
        }
        log::debug!("{} supports {}", self.program.display(), language.tesseract_code());
        Ok(())
    }

    fn unavailable(&self, page: Option<u32>, err: &io::Error) -> Error {
        Error::EngineUnavailable {
            page,
            reason: format!("cannot run {}: {}", self.program.display(), err),
        }
    }
}

/// Arguments for one recognition run reading PNG from stdin and writing TSV.
///
/// No `--dpi` is passed: preprocessing rescales the bitmap, so the raster
/// resolution no longer describes it and Tesseract estimates its own.
fn recognize_args(language: &OcrLanguage, mode: PageSegMode) -> Vec<String> {
    vec![
        "stdin".to_string(),
        "stdout".to_string(),
        "-l".to_string(),
        language.tesseract_code(),
        "--psm".to_string(),
        mode.as_u8().to_string(),
        "tsv".to_string(),
    ]
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(
        &self,
        image: &GrayImage,
        language: &OcrLanguage,
        mode: PageSegMode,
    ) -> Result<Recognition> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::Ocr {
                page: 0,
                reason: format!("encode bitmap: {}", e),
            })?;

        let mut command = Command::new(&self.program);
        command
            .args(recognize_args(language, mode))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| self.unavailable(None, &e))?;

        // Feed stdin from a separate thread so a full stdout pipe cannot deadlock us.
        let mut stdin = child.stdin.take().ok_or_else(|| Error::Ocr {
            page: 0,
            reason: "stdin not captured".to_string(),
        })?;
        let writer = std::thread::spawn(move || stdin.write_all(&png));
        let output = child.wait_with_output()?;
        let write_result = writer.join().unwrap_or_else(|_| {
            Err(io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))
        });

        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_missing_language(&stderr) {
            return Err(Error::EngineUnavailable {
                page: None,
                reason: stderr.trim().to_string(),
            });
        }
        if !output.status.success() {
            return Err(Error::Ocr {
                page: 0,
                reason: format!("tesseract exited with {}: {}", output.status, stderr.trim()),
            });
        }
        if let Err(e) = write_result {
            log::debug!("tesseract closed stdin early: {}", e);
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn is_missing_language(stderr: &str) -> bool {
    stderr.contains("Failed loading language") || stderr.contains("Error opening data file")
}

/// Parse Tesseract TSV output into words and line-structured text.
///
/// Words sharing a (block, paragraph, line) key form one text line; a new
/// block or paragraph inserts a blank line. Confidence `-1` means undefined.
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut text = String::new();
    let mut tokens = Vec::new();
    let mut current: Option<(u32, u32, u32)> = None;

    for (line_num, line) in tsv.lines().enumerate() {
        if line_num == 0 && line.starts_with("level") {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }
        if fields[0].trim().parse::<u32>().unwrap_or(0) != TSV_WORD_LEVEL {
            continue;
        }

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(0),
            fields[3].parse().unwrap_or(0),
            fields[4].parse().unwrap_or(0),
        );
        match current {
            Some(prev) if prev == key => text.push(' '),
            Some(prev) => {
                text.push('\n');
                if (prev.0, prev.1) != (key.0, key.1) {
                    text.push('\n');
                }
            }
            None => {}
        }
        current = Some(key);
        text.push_str(word);

        let confidence = fields[10]
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|c| *c >= 0.0)
            .map(|c| (c / 100.0).min(1.0));
        tokens.push(OcrToken::new(word, confidence));
    }

    Recognition { text, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_recognize_args() {
        let language = OcrLanguage {
            primary: "hin".to_string(),
            fallback: Some("eng".to_string()),
        };
        let args = recognize_args(&language, PageSegMode::SparseText);
        assert_eq!(
            args,
            vec!["stdin", "stdout", "-l", "hin+eng", "--psm", "11", "tsv"]
        );
        assert!(!args.iter().any(|a| a == "--dpi"));
    }

    #[test]
    fn test_parse_tsv_lines_and_confidence() {
        let tsv = format!(
            "{}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t96.0\tप्रश्न\n\
             5\t1\t1\t1\t1\t2\t70\t10\t20\t20\t91.0\t1.\n\
             5\t1\t1\t1\t2\t1\t10\t40\t20\t20\t-1\tA)\n\
             5\t1\t2\t1\t1\t1\t10\t90\t40\t20\t80.5\tउत्तर:",
            HEADER
        );
        let recognition = parse_tsv(&tsv);
        assert_eq!(recognition.text, "प्रश्न 1.\nA)\n\nउत्तर:");
        assert_eq!(recognition.tokens.len(), 4);
        assert!((recognition.tokens[0].confidence.unwrap() - 0.96).abs() < 1e-6);
        assert_eq!(recognition.tokens[2].confidence, None);
    }

    #[test]
    fn test_parse_tsv_skips_short_and_empty_rows() {
        let tsv = format!("{}\n5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t90\t \n5\t1\t1", HEADER);
        let recognition = parse_tsv(&tsv);
        assert!(recognition.text.is_empty());
        assert!(recognition.tokens.is_empty());
    }

    #[test]
    fn test_missing_language_detection() {
        assert!(is_missing_language(
            "Error opening data file /usr/share/tessdata/hin.traineddata"
        ));
        assert!(is_missing_language("Failed loading language 'hin'"));
        assert!(!is_missing_language("Warning: Invalid resolution 0 dpi"));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let engine = TesseractCli::new().with_program("/nonexistent/tesseract-binary");
        let image = GrayImage::new(4, 4);
        let err = engine
            .recognize(&image, &OcrLanguage::default(), PageSegMode::SingleBlock)
            .unwrap_err();
        assert!(matches!(err, Error::EngineUnavailable { .. }));
        assert!(engine.probe(&OcrLanguage::default()).is_err());
    }
}
