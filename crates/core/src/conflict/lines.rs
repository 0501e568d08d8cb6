//! Whole-file line buffers that round-trip line endings.

use std::io::Write;
use std::path::Path;

use tracing::debug;

/// Line terminator detected in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// The content of one file as lines, with what is needed to write it back
/// byte-for-byte when the lines are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileLines {
    pub lines: Vec<String>,
    pub line_ending: LineEnding,
    pub trailing_newline: bool,
}

impl FileLines {
    pub fn parse(content: &str) -> Self {
        let line_ending = if content.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        Self {
            lines: content.lines().map(str::to_string).collect(),
            line_ending,
            trailing_newline: content.ends_with('\n'),
        }
    }

    pub fn render(&self) -> String {
        let eol = self.line_ending.as_str();
        let mut out = self.lines.join(eol);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(eol);
        }
        out
    }

    pub fn read(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let lines = Self::parse(&content);
        debug!(path = %path.display(), count = lines.lines.len(), "read file lines");
        Ok(lines)
    }

    /// Replace the file in one step via a sibling temp file and rename.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.flush()?;
        if let Ok(meta) = std::fs::metadata(path) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), count = self.lines.len(), "wrote file lines");
        Ok(())
    }

    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            lines,
            line_ending: self.line_ending,
            trailing_newline: self.trailing_newline,
        }
    }
}
