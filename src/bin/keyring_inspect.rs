// src/bin/keyring_inspect.rs
//! Inspect configured keyrings — list, find by fingerprint, per-user view

use anyhow::{bail, Context, Result};
use secret_keyring::{load_config, Entity, Fingerprint, KeyringFile, Keyrings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: keyring-inspect <list | find FINGERPRINT | user USERNAME>";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config().context("Failed to load config — is SKR_CONFIG valid?")?;
    let (keyrings, report) = Keyrings::from_config(config)
        .context("Failed to load public keyrings")?;
    for failure in &report.secret_failures {
        warn!("secret keyring skipped: {failure}");
    }

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["list"] | [] => {
            let set = keyrings.keyring_set();
            for file in set.public_files().iter().chain(set.secret_files()) {
                print_file(file);
            }
        }
        ["find", fp] => {
            let fp = Fingerprint::from_hex(fp).context("not a fingerprint")?;
            match keyrings.find_key(&fp, true) {
                Some(entity) => {
                    println!("secret:");
                    print_entity(&entity);
                }
                None => match keyrings.find_key(&fp, false) {
                    Some(entity) => {
                        println!("public:");
                        print_entity(&entity);
                    }
                    None => println!("{fp} not found"),
                },
            }
        }
        ["user", name] => {
            let file = keyrings
                .load_secret_keyring(name)
                .with_context(|| format!("Failed to load secret keyring for {name}"))?;
            print_file(&file);
        }
        _ => bail!(USAGE),
    }

    info!("done");
    Ok(())
}

fn print_file(file: &KeyringFile) {
    let kind = if file.is_public() { "public" } else { "secret" };
    println!(
        "=== {} ({kind}, {} entities)",
        file.path().display(),
        file.len()
    );
    for entity in file.entities() {
        print_entity(entity);
    }
}

fn print_entity(entity: &Entity) {
    println!("  {}", entity.identity());
    for (pk, sk) in entity.keys() {
        let marker = if sk.is_some() { "sec" } else { "pub" };
        println!(
            "    {marker} {} {} {} flags={:?} created={}",
            pk.key_id(),
            pk.fingerprint(),
            pk.algorithm(),
            pk.flags(),
            pk.created_at().to_rfc3339()
        );
    }
}
