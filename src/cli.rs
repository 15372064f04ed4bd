//! Command Line Interface (CLI) arguments.

use byte_unit::Byte;
use clap::Parser;

/// Tabstore server command line interface
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "127.0.0.1", env = "TABSTORE_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8000, env = "TABSTORE_PORT")]
    pub port: u16,
    /// Directory holding the metadata index and dataset content files
    #[arg(long, default_value = "storage", env = "TABSTORE_STORAGE_DIR")]
    pub storage_dir: String,
    /// Maximum size of an upload request body, e.g. 100MiB
    #[arg(
        long,
        default_value = "100MiB",
        env = "TABSTORE_MAX_UPLOAD_SIZE",
        value_parser = parse_size
    )]
    pub max_upload_size: u64,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "TABSTORE_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
}

impl CommandLineArgs {
    /// Maximum upload size in bytes, saturating on platforms where it does not fit.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_size).unwrap_or(usize::MAX)
    }
}

/// Parse a human readable size such as `512KiB` into a number of bytes.
fn parse_size(size: &str) -> Result<u64, String> {
    Byte::parse_str(size, /* ignore case */ true)
        .map(|bytes| bytes.as_u64())
        .map_err(|err| err.to_string())
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CommandLineArgs::parse_from(["tabstore"]);
        assert_eq!("127.0.0.1", args.host);
        assert_eq!(8000, args.port);
        assert_eq!("storage", args.storage_dir);
        assert_eq!(100 * 1024 * 1024, args.max_upload_bytes());
        assert_eq!(60, args.graceful_shutdown_timeout);
    }

    #[test]
    fn overrides() {
        let args = CommandLineArgs::parse_from([
            "tabstore",
            "--port",
            "9000",
            "--storage-dir",
            "/tmp/tabstore",
            "--max-upload-size",
            "1KiB",
        ]);
        assert_eq!(9000, args.port);
        assert_eq!("/tmp/tabstore", args.storage_dir);
        assert_eq!(1024, args.max_upload_bytes());
    }

    #[test]
    fn invalid_size() {
        let result =
            CommandLineArgs::try_parse_from(["tabstore", "--max-upload-size", "lots"]);
        assert!(result.is_err());
    }
}
