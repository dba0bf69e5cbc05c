use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use secure_clustering_crypto::homomorphic::{self, SecretKey, DEFAULT_M};
use secure_clustering_crypto::ope::{self, Dataset, OpeKey, OpeParams};
use secure_clustering_crypto::storage::{StorageClient, StorageConfig};

#[derive(Parser)]
#[command(name = "secure-clustering")]
#[command(about = "Client-side cryptography for secure clustering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an FDH-OPE key calibrated on a dataset
    OpeKeygen {
        /// Dataset as a JSON array of rows
        #[arg(short, long, value_name = "FILE")]
        dataset: PathBuf,
        /// Where to write the key
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
        /// Upper bound on the number of ranges
        #[arg(long, default_value = "5")]
        max_range: usize,
        /// Cipher domain expansion factor
        #[arg(long, default_value = "5.0")]
        proportion: f64,
        /// Lower bound of the message space
        #[arg(long, default_value = "0.0")]
        min_value: f64,
    },
    /// Encrypt values or a whole matrix under an FDH-OPE key
    OpeEncrypt {
        #[arg(short, long, value_name = "FILE")]
        key: PathBuf,
        /// Matrix as a JSON array of rows; encrypted in parallel
        #[arg(short, long, value_name = "FILE")]
        matrix: Option<PathBuf>,
        /// Noise magnitude relative to the range scale
        #[arg(long, default_value_t = ope::DEFAULT_SENSITIVITY)]
        sensitivity: f64,
        /// Scalars to encrypt
        #[arg(allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// Generate a homomorphic secret key
    LiuKeygen {
        /// Number of key triples (at least 3)
        #[arg(short, long, default_value_t = DEFAULT_M)]
        m: usize,
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Encrypt two numbers and check the homomorphic operations on them
    LiuDemo {
        #[arg(short, long, default_value_t = DEFAULT_M)]
        m: usize,
        #[arg(allow_negative_numbers = true)]
        a: f64,
        #[arg(allow_negative_numbers = true)]
        b: f64,
    },
    /// Upload a matrix to a storage node
    PutMatrix {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Matrix as a JSON array of rows
        #[arg(short, long, value_name = "FILE")]
        matrix: PathBuf,
        /// Object id; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Download a matrix from a storage node and print it as JSON
    GetMatrix {
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(short, long, default_value = "3000")]
        port: u16,
        #[arg(long)]
        id: String,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

fn liu_demo(m: usize, a: f64, b: f64) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::rng();
    let sk = SecretKey::generate(m, &mut rng)?;
    let ea = homomorphic::encrypt_scalar(a, &sk, &mut rng);
    let eb = homomorphic::encrypt_scalar(b, &sk, &mut rng);

    let sum = homomorphic::decrypt_scalar(&homomorphic::add(&ea, &eb)?, &sk)?;
    let diff = homomorphic::decrypt_scalar(&homomorphic::subtract(&ea, &eb)?, &sk)?;
    let scaled = homomorphic::decrypt_scalar(&homomorphic::multiply_c(b, &ea), &sk)?;
    let product = homomorphic::decrypt_product(&homomorphic::multiply(&ea, &eb)?, &sk)?;

    println!("a + b = {} (expected {})", sum, a + b);
    println!("a - b = {} (expected {})", diff, a - b);
    println!("b * E(a) = {} (expected {})", scaled, a * b);
    println!("E(a) * E(b) = {} (expected {})", product, a * b);
    Ok(())
}

async fn main_async() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::OpeKeygen {
            dataset,
            out,
            max_range,
            proportion,
            min_value,
        } => {
            let rows: Vec<Vec<f64>> = read_json(&dataset)?;
            let dataset = Dataset::from_rows(&rows)?;
            let params = OpeParams {
                min_value,
                max_range,
                proportion,
            };
            let key = ope::keygen(&dataset, &params, &mut rand::rng())?;
            write_json(&out, &key)?;
            info!(ranges = key.message_space().len(), path = %out.display(), "wrote OPE key");
        }
        Commands::OpeEncrypt {
            key,
            matrix,
            sensitivity,
            values,
        } => {
            let key: OpeKey = read_json(&key)?;
            if let Some(path) = matrix {
                let rows: Vec<Vec<f64>> = read_json(&path)?;
                let encrypted = ope::par_encrypt_matrix(&rows, &key, sensitivity)?;
                println!("{}", serde_json::to_string(&encrypted)?);
            }
            if !values.is_empty() {
                let encrypted = ope::encrypt_vector(&values, &key, sensitivity, &mut rand::rng())?;
                println!("{}", serde_json::to_string(&encrypted)?);
            }
        }
        Commands::LiuKeygen { m, out } => {
            let sk = SecretKey::generate(m, &mut rand::rng())?;
            write_json(&out, &sk)?;
            info!(m, path = %out.display(), "wrote homomorphic secret key");
        }
        Commands::LiuDemo { m, a, b } => liu_demo(m, a, b)?,
        Commands::PutMatrix {
            host,
            port,
            matrix,
            id,
        } => {
            let rows: Vec<Vec<f64>> = read_json(&matrix)?;
            let client = StorageClient::new(StorageConfig { hostname: host, port });
            let response = client.put_matrix(id.as_deref(), &rows).await?;
            println!("{}", response);
        }
        Commands::GetMatrix { host, port, id } => {
            let client = StorageClient::new(StorageConfig { hostname: host, port });
            let (_, matrix) = client.get_matrix(&id).await?;
            println!("{}", serde_json::to_string(&matrix)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(e) = main_async().await {
        eprintln!("secure-clustering failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .try_init();
    });
}
