//! # Key file
//!
//! `<datadir>/key.pem`: a PKCS#8 PEM-encoded Ed25519 private key,
//! generated on first run if absent.

use shared_crypto::Ed25519KeyPair;
use shared_types::NodeError;
use std::path::Path;

/// Loads the keypair at `path`, generating and persisting a new one if
/// the file doesn't exist yet.
pub fn load_or_generate(path: &Path) -> Result<Ed25519KeyPair, NodeError> {
    if path.exists() {
        let pem = std::fs::read_to_string(path)
            .map_err(|err| NodeError::Startup(format!("reading key file {}: {err}", path.display())))?;
        return Ed25519KeyPair::from_pem(&pem)
            .map_err(|err| NodeError::Startup(format!("decoding key file {}: {err}", path.display())));
    }

    let keypair = Ed25519KeyPair::generate();
    let pem = keypair
        .to_pem()
        .map_err(|err| NodeError::Startup(format!("encoding new key: {err}")))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|err| NodeError::Startup(format!("creating {}: {err}", parent.display())))?;
    }
    std::fs::write(path, pem)
        .map_err(|err| NodeError::Startup(format!("writing key file {}: {err}", path.display())))?;
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_persists_on_first_run() {
        let dir = std::env::temp_dir().join("poset-keys-test-generate");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("key.pem");
        let _ = std::fs::remove_file(&path);

        let generated = load_or_generate(&path).unwrap();
        assert!(path.exists());

        let reloaded = load_or_generate(&path).unwrap();
        assert_eq!(generated.public_key(), reloaded.public_key());
    }
}
