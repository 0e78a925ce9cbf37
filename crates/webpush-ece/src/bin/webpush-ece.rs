//! webpush-ece: Command-line tool for Web Push payload encryption.
//!
//! Encrypts and decrypts Encrypted Content-Encoding bodies, inspects the
//! `aes128gcm` header, and converts VAPID keys to PEM.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use webpush_ece::{
    base64url_encode, encrypt_for_subscription_with, read_header, ContentEncoding, Ece, EceParams,
    SubscriptionKeys, TracingKeyLog, VapidKeyPair,
};

#[derive(Parser)]
#[command(name = "webpush-ece")]
#[command(author, version, about = "Encrypted Content-Encoding for Web Push")]
#[command(propagate_version = true)]
struct Cli {
    /// Log intermediate key material at TRACE level (target webpush_ece::keylog)
    #[arg(long, global = true)]
    keylog: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    Encrypt {
        /// Input file to encrypt
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for encrypted data
        #[arg(short, long)]
        output: PathBuf,

        /// JSON parameter file (version, rs, salt, key, keyid, dh, authSecret, privateKey, pad)
        #[arg(short, long, required_unless_present = "subscription")]
        params: Option<PathBuf>,

        /// JSON subscription keys file ({"p256dh": ..., "auth": ...})
        #[arg(short, long, conflicts_with = "params")]
        subscription: Option<PathBuf>,

        /// Content encoding for --subscription
        #[arg(long, default_value = "aes128gcm")]
        encoding: String,

        /// Padding bytes for --subscription
        #[arg(long, default_value_t = 0)]
        pad: usize,
    },

    /// Decrypt a file
    Decrypt {
        /// Input file to decrypt
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for decrypted data
        #[arg(short, long)]
        output: PathBuf,

        /// JSON parameter file
        #[arg(short, long)]
        params: PathBuf,
    },

    /// Show the aes128gcm header of an encrypted file
    Inspect {
        /// Path to encrypted file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate a P-256 key pair (base64url)
    Keygen,

    /// Convert VAPID keys to an EC private key PEM
    VapidPem {
        /// Private key, base64url
        #[arg(long, env = "VAPID_PRIVATE_KEY", hide_env_values = true)]
        private_key: String,

        /// Public key, base64url (derived from the private key if omitted)
        #[arg(long, env = "VAPID_PUBLIC_KEY")]
        public_key: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing on stderr.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   RUST_LOG    - standard env filter (default: "webpush_ece=info")
fn init_tracing(keylog: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let mut env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "webpush_ece=info".into());
    if keylog {
        env_filter = env_filter.add_directive("webpush_ece::keylog=trace".parse()?);
    }

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(cli.keylog)?;

    let engine = if cli.keylog {
        Ece::with_keylog(Arc::new(TracingKeyLog))
    } else {
        Ece::new()
    };

    match cli.command {
        Commands::Encrypt {
            input,
            output,
            params,
            subscription,
            encoding,
            pad,
        } => match (params, subscription) {
            (_, Some(subscription)) => {
                cmd_encrypt_subscription(&engine, &input, &output, &subscription, &encoding, pad)?;
            }
            (Some(params), None) => {
                cmd_encrypt(&engine, &input, &output, &params)?;
            }
            (None, None) => return Err("Either --params or --subscription is required".into()),
        },
        Commands::Decrypt {
            input,
            output,
            params,
        } => {
            cmd_decrypt(&engine, &input, &output, &params)?;
        }
        Commands::Inspect { input } => {
            cmd_inspect(&input)?;
        }
        Commands::Keygen => {
            cmd_keygen()?;
        }
        Commands::VapidPem {
            private_key,
            public_key,
            output,
        } => {
            cmd_vapid_pem(&private_key, public_key.as_deref(), output.as_deref())?;
        }
    }

    Ok(())
}

fn load_params(path: &Path) -> Result<EceParams, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    Ok(EceParams::from_json(&json)?)
}

fn cmd_encrypt(
    engine: &Ece,
    input_path: &Path,
    output_path: &Path,
    params_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = load_params(params_path)?;
    let plaintext = std::fs::read(input_path)?;

    let ciphertext = engine.encrypt(&plaintext, &params)?;
    std::fs::write(output_path, &ciphertext)?;

    let output = serde_json::json!({
        "input": input_path.to_string_lossy(),
        "output": output_path.to_string_lossy(),
        "input_size": plaintext.len(),
        "output_size": ciphertext.len(),
        "content_encoding": params.version,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_encrypt_subscription(
    engine: &Ece,
    input_path: &Path,
    output_path: &Path,
    subscription_path: &Path,
    encoding: &str,
    pad: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let keys: SubscriptionKeys = serde_json::from_str(&std::fs::read_to_string(subscription_path)?)?;
    let version: ContentEncoding = encoding.parse()?;
    let plaintext = std::fs::read(input_path)?;

    let payload = encrypt_for_subscription_with(engine, &plaintext, &keys, version, pad)?;
    std::fs::write(output_path, &payload.body)?;

    // Legacy encodings need these headers on the push request
    let output = serde_json::json!({
        "input": input_path.to_string_lossy(),
        "output": output_path.to_string_lossy(),
        "input_size": plaintext.len(),
        "output_size": payload.body.len(),
        "content_encoding": payload.content_encoding,
        "sender_public_key": base64url_encode(&payload.sender_public_key),
        "encryption": payload.encryption_header(),
        "crypto_key": payload.crypto_key_header(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_decrypt(
    engine: &Ece,
    input_path: &Path,
    output_path: &Path,
    params_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let params = load_params(params_path)?;
    let ciphertext = std::fs::read(input_path)?;

    let plaintext = engine.decrypt(&ciphertext, &params)?;
    std::fs::write(output_path, &plaintext)?;

    let output = serde_json::json!({
        "input": input_path.to_string_lossy(),
        "output": output_path.to_string_lossy(),
        "input_size": ciphertext.len(),
        "output_size": plaintext.len(),
        "content_encoding": params.version,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_inspect(input_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input_path)?;
    let (header, consumed) = read_header(&data)?;

    let output = serde_json::json!({
        "file": input_path.to_string_lossy(),
        "salt": base64url_encode(&header.salt),
        "record_size": header.record_size,
        "key_id": base64url_encode(&header.key_id),
        "key_id_length": header.key_id.len(),
        "header_size": consumed,
        "body_size": data.len() - consumed,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_keygen() -> Result<(), Box<dyn std::error::Error>> {
    let pair = VapidKeyPair::generate();

    let output = serde_json::json!({
        "private_key": pair.private_key_base64url().as_str(),
        "public_key": pair.public_key_base64url(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_vapid_pem(
    private_key: &str,
    public_key: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pem = match public_key {
        Some(public_key) => webpush_ece::to_pem(private_key, public_key)?,
        None => VapidKeyPair::from_base64url(private_key)?.to_pem()?,
    };

    match output_path {
        Some(path) => {
            std::fs::write(path, &pem)?;
            let output = serde_json::json!({
                "output": path.to_string_lossy(),
                "size": pem.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => print!("{}", pem),
    }

    Ok(())
}
