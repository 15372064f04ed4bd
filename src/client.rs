//! Command line client for the dataset API.
//!
//! The client is a thin wrapper over the HTTP API. Unknown dataset IDs are reported as
//! "Dataset not found." and are not treated as errors. Any other failed request is returned as
//! an error.

use crate::artifacts::statistics::Statistics;
use crate::models::{Dataset, DatasetCreated, DatasetSummary, Message};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use std::path::{Path, PathBuf};

/// Tabstore command line client
#[derive(Debug, Parser)]
#[command(name = "tabstore-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// API server URL.
    #[arg(long, env = "TABSTORE_URL", default_value = "http://localhost:8000")]
    pub url: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Client subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List all datasets.
    List,
    /// Upload a CSV dataset.
    Upload {
        /// Path to CSV file.
        file: PathBuf,
    },
    /// Retrieve a dataset's information.
    Get {
        /// Dataset ID.
        id: String,
    },
    /// Delete a dataset.
    Delete {
        /// Dataset ID.
        id: String,
    },
    /// Export a dataset to Excel.
    Excel {
        /// Dataset ID.
        id: String,
        /// Output Excel filename.
        output: PathBuf,
    },
    /// Generate PDF histograms for a dataset.
    Plot {
        /// Dataset ID.
        id: String,
        /// Output PDF filename.
        output: PathBuf,
    },
    /// Show summary statistics for a dataset.
    Stats {
        /// Dataset ID.
        id: String,
    },
}

const NOT_FOUND: &str = "Dataset not found.";
const ENDPOINT_NOT_FOUND: &str = "API error (404 Not Found): datasets endpoint not found";

/// API client for the dataset endpoints.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/datasets/{}", self.base_url, path)
    }

    /// Return the response if it succeeded, `None` if the dataset was not found, and an error
    /// otherwise.
    async fn check(response: Response) -> Result<Option<Response>> {
        let status = response.status();
        if status.is_success() {
            Ok(Some(response))
        } else if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({status}): {body}")
        }
    }

    async fn get(&self, path: &str) -> Result<Option<Response>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .context("Failed to send request")?;
        Self::check(response).await
    }

    /// Lists all datasets.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let response = self.get("").await?.context(ENDPOINT_NOT_FOUND)?;
        response.json().await.context("Failed to parse response")
    }

    /// Uploads a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the request fails or the response cannot
    /// be parsed.
    pub async fn upload_dataset(&self, file: &Path) -> Result<DatasetCreated> {
        let filename = file
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid file name {}", file.display()))?
            .to_string();
        let content = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let form = Form::new().part("file", Part::bytes(content).file_name(filename));

        let response = self
            .client
            .post(self.url(""))
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;

        let response = Self::check(response).await?.context(ENDPOINT_NOT_FOUND)?;
        response.json().await.context("Failed to parse response")
    }

    /// Gets a dataset's name and size. Returns `None` if the dataset does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn get_dataset(&self, id: &str) -> Result<Option<DatasetSummary>> {
        match self.get(id).await? {
            Some(response) => Ok(Some(
                response.json().await.context("Failed to parse response")?,
            )),
            None => Ok(None),
        }
    }

    /// Deletes a dataset. Returns `None` if the dataset does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn delete_dataset(&self, id: &str) -> Result<Option<Message>> {
        let response = self
            .client
            .delete(self.url(id))
            .send()
            .await
            .context("Failed to send request")?;
        match Self::check(response).await? {
            Some(response) => Ok(Some(
                response.json().await.context("Failed to parse response")?,
            )),
            None => Ok(None),
        }
    }

    /// Gets summary statistics of a dataset. Returns `None` if the dataset does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn dataset_stats(&self, id: &str) -> Result<Option<Statistics>> {
        match self.get(&format!("{id}/stats")).await? {
            Some(response) => Ok(Some(
                response.json().await.context("Failed to parse response")?,
            )),
            None => Ok(None),
        }
    }

    /// Downloads a binary artifact of a dataset, e.g. `excel` or `plot`. Returns `None` if the
    /// dataset does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be read.
    pub async fn download(&self, id: &str, artifact: &str) -> Result<Option<Bytes>> {
        match self.get(&format!("{id}/{artifact}")).await? {
            Some(response) => Ok(Some(
                response.bytes().await.context("Failed to read response")?,
            )),
            None => Ok(None),
        }
    }
}

/// Execute a client command, printing its outcome.
///
/// # Errors
///
/// Returns an error if a request fails for any reason other than an unknown dataset, or if an
/// output file cannot be written.
pub async fn execute(cli: Cli) -> Result<()> {
    let client = ApiClient::new(&cli.url)?;

    match cli.command {
        Commands::List => {
            let datasets = client.list_datasets().await?;
            if datasets.is_empty() {
                println!("No datasets found.");
            }
            for dataset in datasets {
                println!(
                    "{}: {} ({} bytes)",
                    dataset.id, dataset.filename, dataset.file_size
                );
            }
        }
        Commands::Upload { file } => {
            if !file.exists() {
                println!("File {} does not exist.", file.display());
                return Ok(());
            }
            let created = client.upload_dataset(&file).await?;
            println!(
                "Dataset created: {} (id: {})",
                created.dataset.filename, created.id
            );
        }
        Commands::Get { id } => match client.get_dataset(&id).await? {
            Some(summary) => println!("{id}: {} ({} bytes)", summary.filename, summary.file_size),
            None => println!("{NOT_FOUND}"),
        },
        Commands::Delete { id } => match client.delete_dataset(&id).await? {
            Some(_) => println!("Dataset deleted successfully."),
            None => println!("{NOT_FOUND}"),
        },
        Commands::Excel { id, output } => {
            save(client.download(&id, "excel").await?, &output, "Excel file").await?;
        }
        Commands::Plot { id, output } => {
            save(client.download(&id, "plot").await?, &output, "Plot PDF").await?;
        }
        Commands::Stats { id } => match client.dataset_stats(&id).await? {
            Some(statistics) => println!("{}", serde_json::to_string_pretty(&statistics)?),
            None => println!("{NOT_FOUND}"),
        },
    }

    Ok(())
}

/// Write a downloaded artifact to `output`.
async fn save(content: Option<Bytes>, output: &Path, kind: &str) -> Result<()> {
    let Some(content) = content else {
        println!("{NOT_FOUND}");
        return Ok(());
    };
    tokio::fs::write(output, &content)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{kind} saved to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::app_state::AppState;
    use crate::cli::CommandLineArgs;

    use axum::ServiceExt;
    use std::net::TcpListener;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Start a server on an ephemeral port and return its base URL.
    fn spawn_server(storage_dir: &TempDir) -> String {
        let args = CommandLineArgs::parse_from([
            "tabstore",
            "--storage-dir",
            storage_dir.path().to_str().unwrap(),
        ]);
        let state = Arc::new(AppState::new(&args).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app::service(state).into_make_service());
        tokio::spawn(server);
        format!("http://{}", addr)
    }

    #[test]
    fn parse_commands() {
        let cli = Cli::parse_from(["tabstore-cli", "--url", "http://host:1234", "get", "abc"]);
        assert_eq!("http://host:1234", cli.url);
        assert!(matches!(cli.command, Commands::Get { id } if id == "abc"));

        let cli = Cli::parse_from(["tabstore-cli", "excel", "abc", "out.xlsx"]);
        assert!(matches!(
            cli.command,
            Commands::Excel { id, output } if id == "abc" && output == Path::new("out.xlsx")
        ));
    }

    #[test]
    fn parse_requires_command() {
        assert!(Cli::try_parse_from(["tabstore-cli"]).is_err());
        assert!(Cli::try_parse_from(["tabstore-cli", "plot", "abc"]).is_err());
    }

    #[test]
    fn trailing_slash_in_base_url() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!("http://localhost:8000/datasets/abc", client.url("abc"));
    }

    #[tokio::test]
    async fn round_trip() {
        let storage_dir = TempDir::new().unwrap();
        let client = ApiClient::new(&spawn_server(&storage_dir)).unwrap();
        assert!(client.list_datasets().await.unwrap().is_empty());

        let work_dir = TempDir::new().unwrap();
        let csv = work_dir.path().join("data.csv");
        std::fs::write(&csv, "a,b\n1,x\n2,y\n3,z\n").unwrap();
        let created = client.upload_dataset(&csv).await.unwrap();
        assert_eq!("data.csv", created.dataset.filename);

        let datasets = client.list_datasets().await.unwrap();
        assert_eq!(vec![created.dataset.clone()], datasets);

        let summary = client.get_dataset(&created.id).await.unwrap().unwrap();
        assert_eq!(16, summary.file_size);

        let statistics = client.dataset_stats(&created.id).await.unwrap().unwrap();
        assert_eq!([3, 2], statistics.additional_info.shape);

        let workbook = client.download(&created.id, "excel").await.unwrap().unwrap();
        assert_eq!(b"PK", &workbook[..2]);
        let pdf = client.download(&created.id, "plot").await.unwrap().unwrap();
        assert_eq!(b"%PDF-", &pdf[..5]);

        assert!(client.delete_dataset(&created.id).await.unwrap().is_some());
        assert!(client.get_dataset(&created.id).await.unwrap().is_none());
        assert!(client.delete_dataset(&created.id).await.unwrap().is_none());
        assert!(client.download(&created.id, "plot").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_upload_is_error() {
        let storage_dir = TempDir::new().unwrap();
        let client = ApiClient::new(&spawn_server(&storage_dir)).unwrap();

        let work_dir = TempDir::new().unwrap();
        let txt = work_dir.path().join("data.txt");
        std::fs::write(&txt, "a\n1\n").unwrap();
        let err = client.upload_dataset(&txt).await.unwrap_err();
        assert!(err.to_string().contains("400"), "{err}");
    }

    #[tokio::test]
    async fn execute_downloads() {
        let storage_dir = TempDir::new().unwrap();
        let url = spawn_server(&storage_dir);
        let client = ApiClient::new(&url).unwrap();

        let work_dir = TempDir::new().unwrap();
        let csv = work_dir.path().join("data.csv");
        std::fs::write(&csv, "a\n1\n2\n").unwrap();
        let created = client.upload_dataset(&csv).await.unwrap();

        let output = work_dir.path().join("out.pdf");
        let cli = Cli::parse_from([
            "tabstore-cli",
            "--url",
            &url,
            "plot",
            &created.id,
            output.to_str().unwrap(),
        ]);
        execute(cli).await.unwrap();
        assert_eq!(b"%PDF-", &std::fs::read(&output).unwrap()[..5]);

        // Unknown IDs are reported but are not errors.
        let missing = work_dir.path().join("missing.pdf");
        let cli = Cli::parse_from([
            "tabstore-cli",
            "--url",
            &url,
            "plot",
            "nope",
            missing.to_str().unwrap(),
        ]);
        execute(cli).await.unwrap();
        assert!(!missing.exists());
    }
}
