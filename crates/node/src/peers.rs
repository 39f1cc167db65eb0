//! # Peers file
//!
//! A JSON array of `{public_key_hex, net_addr}` entries, loaded once at
//! startup into a [`ParticipantSet`]. Every participant, including self,
//! is listed: the local entry is identified by matching public keys
//! against the loaded keypair.

use serde::Deserialize;
use shared_types::{NodeError, Participant, ParticipantSet};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PeerEntry {
    public_key_hex: String,
    net_addr: String,
}

/// Loads `path` into a [`ParticipantSet`], deriving each participant's
/// id from its public key.
pub fn load(path: &Path) -> Result<ParticipantSet, NodeError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| NodeError::Startup(format!("reading peers file {}: {err}", path.display())))?;
    let entries: Vec<PeerEntry> = serde_json::from_str(&raw)
        .map_err(|err| NodeError::Startup(format!("parsing peers file {}: {err}", path.display())))?;

    let mut participants = Vec::with_capacity(entries.len());
    for entry in entries {
        let bytes = hex::decode(&entry.public_key_hex)
            .map_err(|err| NodeError::Startup(format!("invalid public_key_hex {:?}: {err}", entry.public_key_hex)))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| NodeError::Startup(format!("public key {:?} is not 32 bytes", entry.public_key_hex)))?;
        participants.push(Participant::new(key, entry.net_addr));
    }
    if participants.is_empty() {
        return Err(NodeError::Startup("peers file lists no participants".to_string()));
    }
    Ok(ParticipantSet::new(participants))
}
