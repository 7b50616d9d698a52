//! Secret sealing command.

use super::read_file;
use anyhow::{bail, Context, Result};
use anywhere_core::ApiConfig;
use anywhere_credentials::Sealer;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub async fn execute(config: &ApiConfig, bundle: &Path, value: Option<&str>, stdin: bool) -> Result<()> {
    let bundle_pem = read_file(bundle)?;
    let plaintext = read_value(value, stdin, std::io::stdin().lock())?;
    debug!(bytes = plaintext.len(), "read value to seal");

    let sealer = Sealer::from_config(config).context("Failed to create sealer")?;
    let sealed = sealer.seal_secret(&bundle_pem, &plaintext).await?;

    println!("{}", sealed);
    Ok(())
}

/// Take the value from the flag, or from `reader` without its final line ending.
fn read_value(value: Option<&str>, stdin: bool, mut reader: impl Read) -> Result<Vec<u8>> {
    match (value, stdin) {
        (Some(value), false) => Ok(value.as_bytes().to_vec()),
        (None, true) => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).context("Failed to read value from stdin")?;
            if buf.ends_with(b"\n") {
                buf.pop();
                if buf.ends_with(b"\r") {
                    buf.pop();
                }
            }
            Ok(buf)
        }
        _ => bail!("Exactly one of --value or --stdin is required"),
    }
}
