// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of TMOS Rollout.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Inventory file: one `host,imagePath` per line

use crate::error::InventoryError;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub host: String,
    pub image_path: PathBuf,
}

/// Parse inventory text; blank lines and `#` comments are ignored
pub fn parse_inventory(text: &str) -> Result<Vec<InventoryEntry>, InventoryError> {
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let invalid = |reason: &str| InventoryError::Line {
            line: index + 1,
            reason: reason.to_owned(),
        };
        let (host, image) = line
            .split_once(',')
            .ok_or_else(|| invalid("expected host,imagePath"))?;
        let (host, image) = (host.trim(), image.trim());
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if image.is_empty() {
            return Err(invalid("empty image path"));
        }

        entries.push(InventoryEntry {
            host: host.to_owned(),
            image_path: PathBuf::from(image),
        });
    }

    if entries.is_empty() {
        return Err(InventoryError::Empty);
    }
    Ok(entries)
}

pub async fn load_inventory(path: &Path) -> Result<Vec<InventoryEntry>, InventoryError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InventoryError::Read {
            path: path.display().to_string(),
            source,
        })?;
    parse_inventory(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_entries() {
        let entries = parse_inventory(
            "# lab pair\n\
             bigip1, /img/BIGIP-15.1.2.1-0.0.10.iso\n\
             \n\
             10.0.0.2,/img/BIGIP-15.1.2.1-0.0.10.iso\n",
        )
        .unwrap();

        assert_eq!(
            entries,
            vec![
                InventoryEntry {
                    host: "bigip1".to_owned(),
                    image_path: PathBuf::from("/img/BIGIP-15.1.2.1-0.0.10.iso"),
                },
                InventoryEntry {
                    host: "10.0.0.2".to_owned(),
                    image_path: PathBuf::from("/img/BIGIP-15.1.2.1-0.0.10.iso"),
                },
            ]
        );
    }

    #[test]
    fn test_splits_at_first_comma() {
        let entries = parse_inventory("bigip1,/img/odd,name.iso").unwrap();
        assert_eq!(entries[0].image_path, PathBuf::from("/img/odd,name.iso"));
    }

    #[test]
    fn test_line_number_reported() {
        let result = parse_inventory("bigip1,/img/a.iso\n\nbigip2\n");
        assert!(matches!(result, Err(InventoryError::Line { line: 3, .. })));
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(matches!(
            parse_inventory(",/img/a.iso"),
            Err(InventoryError::Line { line: 1, .. })
        ));
        assert!(matches!(
            parse_inventory("bigip1, "),
            Err(InventoryError::Line { line: 1, .. })
        ));
    }

    #[test]
    fn test_only_comments_is_empty() {
        assert!(matches!(
            parse_inventory("# nothing yet\n\n"),
            Err(InventoryError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_load_inventory_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "bigip1,/img/BIGIP-15.1.2.1-0.0.10.iso\n").unwrap();

        let entries = load_inventory(file.path()).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_inventory() {
        let result = load_inventory(Path::new("/nonexistent/hosts.csv")).await;
        assert!(matches!(result, Err(InventoryError::Read { .. })));
    }
}
