//! Invitation seeding from a YAML file.
//!
//! ```yaml
//! - id: 6f1c-holly
//!   participant: Robin
//! - id: 93ab-ivy
//!   participant: Sam
//!   square: 12
//! ```

use anyhow::{Context, Result};
use std::path::Path;

use poster_core::{Invitation, RecordStore};

pub fn parse_invitations(yaml: &str) -> Result<Vec<Invitation>> {
    serde_yaml::from_str(yaml).context("invitations file is not a YAML list of invitations")
}

/// Insert every invitation from `path`. Ids already in the store are left
/// alone. Returns how many were new.
pub async fn seed_invitations(records: &dyn RecordStore, path: &Path) -> Result<usize> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let invitations = parse_invitations(&yaml)?;

    let mut inserted = 0;
    for invitation in &invitations {
        if records
            .insert_invitation(invitation)
            .await
            .with_context(|| format!("failed to seed invitation {}", invitation.id))?
        {
            inserted += 1;
        }
    }
    tracing::info!(
        file = %path.display(),
        total = invitations.len(),
        inserted,
        "invitations seeded"
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poster_core::MemoryRecordStore;

    const YAML: &str = "
- id: holly
  participant: Robin
- id: ivy
  participant: Sam
  square: 12
";

    #[test]
    fn parses_passthrough_fields_and_squares() {
        let invitations = parse_invitations(YAML).unwrap();
        assert_eq!(invitations.len(), 2);
        assert_eq!(invitations[0].participant(), Some("Robin"));
        assert_eq!(invitations[0].square, None);
        assert_eq!(invitations[1].square.map(|s| s.index()), Some(12));
    }

    #[test]
    fn out_of_range_square_is_rejected() {
        assert!(parse_invitations("- id: x\n  square: 72\n").is_err());
    }

    #[tokio::test]
    async fn seeding_twice_inserts_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("invitations.yaml");
        std::fs::write(&path, YAML).unwrap();

        let records = MemoryRecordStore::new();
        assert_eq!(seed_invitations(&records, &path).await.unwrap(), 2);
        assert_eq!(seed_invitations(&records, &path).await.unwrap(), 0);
        assert!(records.get_invitation("ivy").await.unwrap().is_some());
    }
}
