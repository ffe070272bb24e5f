use clap::Parser;

use crate::config::{DEFAULT_CHUNK_SIZE, ReaderOptions};

#[derive(Parser, Debug)]
#[command(name = "lazyzip")]
#[command(version)]
#[command(about = "List and extract ZIP archives from files or HTTP URLs without downloading them whole", long_about = None)]
#[command(after_help = "Examples:\n  \
  lazyzip data1.zip -x joe        extract all files except joe from data1.zip\n  \
  lazyzip -p foo.zip | more       send contents of foo.zip via pipe into more\n  \
  lazyzip -l https://example.com/archive.zip   list files from remote ZIP\n\n\
Set RUST_LOG=debug to trace the range reads.")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Keep backslashes in entry names
    #[arg(long)]
    pub strict_names: bool,

    /// Verify CRC-32 and size of every extracted entry
    #[arg(long)]
    pub verify: bool,

    /// Bytes fetched per range request while extracting
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::default()
            .strict_names(self.strict_names)
            .verify_checksums(self.verify)
            .chunk_size(self.chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "lazyzip", "-l", "--verify", "--chunk-size", "4096", "https://example.com/a.zip",
        ])
        .unwrap();
        assert!(cli.list);
        assert!(cli.is_http_url());

        let options = cli.reader_options();
        assert!(options.verify_checksums);
        assert!(!options.strict_names);
        assert_eq!(options.chunk_size, 4096);
    }

    #[test]
    fn test_pipe_is_quiet() {
        let cli = Cli::try_parse_from(["lazyzip", "-p", "a.zip", "docs/*.md"]).unwrap();
        assert!(cli.is_quiet());
        assert!(!cli.is_very_quiet());
        assert_eq!(cli.files, vec!["docs/*.md"]);
    }
}
