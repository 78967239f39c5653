use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use object_store_fs::{
    app::AppBuilder,
    config::{self, CdnSettings},
    services::{CdnUrlSigner, CustomPolicy, StatMode, StreamWrapper},
    settings::StoreSettings,
};

#[derive(Parser, Debug)]
#[command(name = "object-store-fs-cli")]
#[command(about = "Filesystem-style access to S3-compatible storage", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreSettings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the external URL of an object
    Url {
        /// Locator, e.g. s3://bucket/key
        uri: String,
    },

    /// Show size, type and modification time
    Stat { uri: String },

    /// List a directory
    Ls { uri: String },

    /// Download an object
    Get {
        uri: String,
        /// Output file path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a file (public-read)
    Put {
        /// File path to upload
        file: PathBuf,
        uri: String,
    },

    /// Delete an object
    Rm { uri: String },

    /// Move an object, across buckets if needed
    Mv { from: String, to: String },

    /// Sign an arbitrary CDN URL
    Sign {
        url: String,
        /// Validity in seconds
        #[arg(long, default_value = "3600")]
        ttl: i64,
        /// Restrict to a source CIDR (custom policy)
        #[arg(long)]
        ip: Option<String>,
    },
}

async fn wrapper(store: &StoreSettings) -> Result<StreamWrapper> {
    let wrapper = config::install(store.wrapper_config()?)?;
    let app = AppBuilder::new()
        .with_config(store.to_app_config(wrapper)?)
        .build()
        .context("Failed to build application")?;
    Ok(app.wrapper)
}

fn signer(cdn: Option<&CdnSettings>) -> Result<CdnUrlSigner> {
    let cdn = cdn.context("S3FS_CDN_DOMAIN is required for signing")?;
    Ok(CdnUrlSigner::from_settings(cdn)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Url { uri } => {
            let fs = wrapper(&cli.store).await?;
            let locator = fs.resolve(&uri).await?;
            println!("{}", fs.external_url(&locator).await?);
        }
        Commands::Stat { uri } => {
            let fs = wrapper(&cli.store).await?;
            let locator = fs.resolve(&uri).await?;
            let stat = fs.stat(&locator, StatMode::Required).await?;
            println!("type:     {}", if stat.is_dir { "directory" } else { "file" });
            println!("size:     {}", stat.size);
            if let Some(mtime) = stat.mtime {
                println!("modified: {}", mtime.to_rfc3339());
            }
        }
        Commands::Ls { uri } => {
            let fs = wrapper(&cli.store).await?;
            let locator = fs.resolve(&uri).await?;
            for entry in fs.list_dir(&locator).await? {
                if entry.is_dir {
                    println!("{}/", entry.name);
                } else {
                    println!("{}", entry.name);
                }
            }
        }
        Commands::Get { uri, output } => {
            let fs = wrapper(&cli.store).await?;
            let locator = fs.resolve(&uri).await?;
            let data = fs.read(&locator).await?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &data)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Downloaded {} bytes to {}", data.len(), path.display());
                }
                None => {
                    use tokio::io::AsyncWriteExt;
                    tokio::io::stdout().write_all(&data).await?;
                }
            }
        }
        Commands::Put { file, uri } => {
            let fs = wrapper(&cli.store).await?;
            let locator = fs.resolve(&uri).await?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let size = data.len();
            fs.write(&locator, Bytes::from(data)).await?;
            println!("Uploaded {} bytes to {}", size, locator);
        }
        Commands::Rm { uri } => {
            let fs = wrapper(&cli.store).await?;
            let locator = fs.resolve(&uri).await?;
            fs.unlink(&locator).await?;
            println!("Deleted {}", locator);
        }
        Commands::Mv { from, to } => {
            let fs = wrapper(&cli.store).await?;
            let from = fs.resolve(&from).await?;
            let to = fs.resolve(&to).await?;
            fs.rename(&from, &to).await?;
            println!("Moved {} to {}", from, to);
        }
        Commands::Sign { url, ttl, ip } => {
            let settings = cli.store.wrapper_config()?;
            let signer = signer(settings.cdn.as_ref())?;
            let expires_at = chrono::Utc::now() + chrono::TimeDelta::seconds(ttl);
            let signed = match ip {
                Some(cidr) => {
                    signer.sign_custom(&url, &CustomPolicy::new(&url, expires_at).source_ip(cidr))?
                }
                None => signer.sign(&url, expires_at)?,
            };
            println!("{}", signed);
        }
    }

    Ok(())
}
