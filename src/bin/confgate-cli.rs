use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use confgate::http::request::{
    CreateFileRequest, CreateNamespaceRequest, UpdateFileRequest, UpdateNamespaceRequest,
};
use confgate::model::{FileId, NamespaceId};
use confgate::resilience::retries::{retry, RetryPolicy};

#[derive(Parser)]
#[command(name = "confgate-cli")]
#[command(about = "Management CLI for confgate", long_about = None)]
struct Cli {
    #[arg(short, long, env = "CONFGATE_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status
    Health,
    /// Manage namespaces
    #[command(subcommand)]
    Namespaces(NamespaceCommands),
    /// Manage config files
    #[command(subcommand)]
    Files(FileCommands),
}

#[derive(Subcommand)]
enum NamespaceCommands {
    /// List namespaces with their outdated flag
    List,
    /// Create a namespace
    Create {
        name: String,
        #[arg(short, long)]
        environment: Option<String>,
    },
    /// Show one namespace and its associated files
    Show { id: i64 },
    /// Replace the set of associated config files
    Associate {
        id: i64,
        /// Config file ids; pass none to clear the set
        files: Vec<i64>,
    },
    /// Publish the merged document to the KV store
    Publish {
        id: i64,
        /// Retries on 5xx or connection errors
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Show the key and endpoints a watcher should use
    Watch { id: i64 },
}

#[derive(Subcommand)]
enum FileCommands {
    /// List config files
    List,
    /// Create a config file owned by a namespace
    Create {
        namespace_id: i64,
        filename: String,
        /// Initial content; a path, or `-` for stdin
        #[arg(short, long)]
        content: Option<PathBuf>,
    },
    /// Show a config file with its content
    Show { id: i64 },
    /// Merge content into a config file
    Edit {
        id: i64,
        /// A path, or `-` for stdin
        content: PathBuf,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

struct Api {
    client: reqwest::Client,
    base: String,
}

impl Api {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    async fn get(&self, path: &str) -> CliResult<reqwest::Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> CliResult<reqwest::Response> {
        Ok(self.client.request(method, self.url(path)).json(body).send().await?)
    }
}

fn read_content(path: &PathBuf) -> CliResult<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let api = Api {
        client: reqwest::Client::new(),
        base: cli.url,
    };

    let res = match cli.command {
        Commands::Health => api.get("/healthz").await?,
        Commands::Namespaces(cmd) => match cmd {
            NamespaceCommands::List => api.get("/v1/namespaces").await?,
            NamespaceCommands::Create { name, environment } => {
                let body = CreateNamespaceRequest { name, environment };
                api.send(reqwest::Method::POST, "/v1/namespaces", &body).await?
            }
            NamespaceCommands::Show { id } => api.get(&format!("/v1/namespaces/{}", id)).await?,
            NamespaceCommands::Associate { id, files } => {
                let body = UpdateNamespaceRequest {
                    config_files: files.into_iter().map(FileId).collect(),
                };
                api.send(reqwest::Method::PUT, &format!("/v1/namespaces/{}", id), &body)
                    .await?
            }
            NamespaceCommands::Publish { id, retries } => publish(&api, NamespaceId(id), retries).await?,
            NamespaceCommands::Watch { id } => {
                api.get(&format!("/v1/namespaces/{}/watch", id)).await?
            }
        },
        Commands::Files(cmd) => match cmd {
            FileCommands::List => api.get("/v1/config-files").await?,
            FileCommands::Create {
                namespace_id,
                filename,
                content,
            } => {
                let config = match content {
                    Some(path) => read_content(&path)?,
                    None => String::new(),
                };
                let body = CreateFileRequest {
                    namespace_id: NamespaceId(namespace_id),
                    filename,
                    config,
                };
                api.send(reqwest::Method::POST, "/v1/config-files", &body).await?
            }
            FileCommands::Show { id } => api.get(&format!("/v1/config-files/{}", id)).await?,
            FileCommands::Edit { id, content } => {
                let body = UpdateFileRequest {
                    config: read_content(&content)?,
                };
                api.send(reqwest::Method::PUT, &format!("/v1/config-files/{}", id), &body)
                    .await?
            }
        },
    };

    print_response(res).await
}

/// Publish, retrying connection failures and 5xx answers (a 502 means the
/// KV put failed and the namespace is still outdated).
async fn publish(api: &Api, id: NamespaceId, retries: u32) -> CliResult<reqwest::Response> {
    let policy = RetryPolicy {
        max_retries: retries,
        ..RetryPolicy::default()
    };
    let url = api.url(&format!("/v1/namespaces/{}/publish", id));
    let (client, url) = (&api.client, url.as_str());

    let result = retry(
        &policy,
        |e: &PublishAttemptError| e.retryable,
        move |_| async move {
            match client.post(url).send().await {
                Ok(res) if res.status().is_server_error() => Err(PublishAttemptError {
                    message: format!("server answered {}", res.status()),
                    retryable: true,
                    response: Some(res),
                }),
                Ok(res) => Ok(res),
                Err(e) => Err(PublishAttemptError {
                    message: e.to_string(),
                    retryable: e.is_connect() || e.is_timeout(),
                    response: None,
                }),
            }
        },
    )
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(PublishAttemptError {
            response: Some(res), ..
        }) => Ok(res),
        Err(e) => Err(e.message.into()),
    }
}

struct PublishAttemptError {
    message: String,
    retryable: bool,
    response: Option<reqwest::Response>,
}

impl std::fmt::Display for PublishAttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

async fn print_response(res: reqwest::Response) -> CliResult<()> {
    let status = res.status();
    let text = res.text().await?;

    let pretty = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        eprintln!("{}", pretty);
        std::process::exit(1);
    }

    println!("{}", pretty);
    Ok(())
}
