//! Card-set discovery across the local tree and remapped external paths
//!
//! Definition files anywhere under the root become card sets named by
//! their root-relative path. A `cardFiles` rules file can additionally pull
//! in definition files from outside the root, optionally renaming them in
//! the logical-id namespace; their progress files are always written under
//! the local root so an external (possibly read-only) collection never has
//! to hold review state.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::models::{CardSet, RemapRule};

/// File-name suffix of a card definition file
pub const DEFINITION_SUFFIX: &str = ".cd";

/// Appended to the full definition file name to form the progress file name
pub const PROGRESS_SUFFIX: &str = "d";

/// Conventional name of the remap-rules file under the discovery root
pub const REMAP_RULES_FILE: &str = "cardFiles";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid remap rule on line {line}: expected 2 or 3 fields, found {found}")]
    InvalidRule { line: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Progress-file path for a definition file (`words.cd` -> `words.cdd`)
pub fn progress_path_for(definition_path: &Path) -> PathBuf {
    let mut name = definition_path.as_os_str().to_os_string();
    name.push(PROGRESS_SUFFIX);
    PathBuf::from(name)
}

/// Read a remap-rules file: one whitespace-separated rule per line, either
/// `root subPath` or `root subPath renameTarget`. A missing file means no
/// rules.
pub fn load_remap_rules(path: &Path) -> Result<Vec<RemapRule>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let text = std::fs::read_to_string(path)?;
    let mut rules = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let rule = match fields.len() {
            2 => RemapRule {
                root: PathBuf::from(fields[0]),
                sub_path: fields[1].to_string(),
                rename: None,
            },
            3 => RemapRule {
                root: PathBuf::from(fields[0]),
                sub_path: fields[1].to_string(),
                rename: Some(fields[2].to_string()),
            },
            found => {
                return Err(DiscoveryError::InvalidRule {
                    line: index + 1,
                    found,
                })
            }
        };
        rules.push(rule);
    }
    Ok(rules)
}

/// Discover card sets under `root`, applying the rules in `root/cardFiles`
/// if that file exists
pub fn discover_card_sets(root: &Path) -> Result<Vec<CardSet>> {
    let rules = load_remap_rules(&root.join(REMAP_RULES_FILE))?;
    discover_card_sets_with_rules(root, &rules)
}

/// Discover card sets: every definition file under `root`, plus the files
/// each remap rule maps in. Any walk failure aborts the whole pass.
pub fn discover_card_sets_with_rules(root: &Path, rules: &[RemapRule]) -> Result<Vec<CardSet>> {
    let mut sets = discover_local(root)?;

    for rule in rules {
        discover_remapped(root, rule, &mut sets)?;
    }

    // Stable presentation order regardless of walk or rule order.
    sets.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));

    log::debug!("Discovered {} card sets under {:?}", sets.len(), root);
    Ok(sets)
}

fn discover_local(root: &Path) -> Result<Vec<CardSet>> {
    let mut sets = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_definition_file(path) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        sets.push(CardSet::new(
            logical_id_for(relative),
            path.to_path_buf(),
            progress_path_for(path),
        ));
    }
    Ok(sets)
}

/// Map one rule's definition files into the namespace. Each file's logical
/// position is its path relative to the rule's sub-path, re-rooted at the
/// rename target when one is set; the progress file mirrors that position
/// under the local root.
fn discover_remapped(root: &Path, rule: &RemapRule, sets: &mut Vec<CardSet>) -> Result<()> {
    let walk_root = rule.root.join(&rule.sub_path);
    let mapped_base = rule.rename.as_ref().unwrap_or(&rule.sub_path);

    for entry in WalkDir::new(&walk_root).follow_links(true) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_definition_file(path) {
            continue;
        }

        // Relative position under the rule's directory; a single-file rule
        // walks only itself, leaving this empty.
        let relative = path.strip_prefix(&walk_root).unwrap_or(Path::new(""));
        let mapped = if relative.as_os_str().is_empty() {
            PathBuf::from(mapped_base)
        } else {
            Path::new(mapped_base).join(relative)
        };

        sets.push(CardSet::new(
            logical_id_for(&mapped),
            path.to_path_buf(),
            progress_path_for(&root.join(&mapped)),
        ));
    }
    Ok(())
}

fn is_definition_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with(DEFINITION_SUFFIX))
}

/// Slash-separated, suffix-stripped form of a relative definition path
fn logical_id_for(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined
        .strip_suffix(DEFINITION_SUFFIX)
        .unwrap_or(&joined)
        .to_string()
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "a | 1\n").unwrap();
    }

    #[test]
    fn test_progress_path_appends_suffix() {
        assert_eq!(
            progress_path_for(Path::new("a/words.cd")),
            PathBuf::from("a/words.cdd")
        );
    }

    #[test]
    fn test_local_discovery_sorted_and_stripped() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("a/x.cd"));
        touch(&root.path().join("a/b/y.cd"));
        touch(&root.path().join("a/notes.txt"));

        let sets = discover_card_sets(root.path()).unwrap();

        let ids: Vec<&str> = sets.iter().map(|s| s.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["a/b/y", "a/x"]);
        assert_eq!(sets[1].definition_path, root.path().join("a/x.cd"));
        assert_eq!(sets[1].progress_path, root.path().join("a/x.cdd"));
    }

    #[test]
    fn test_empty_root_yields_no_sets() {
        let root = TempDir::new().unwrap();
        assert!(discover_card_sets(root.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_rules_file_means_local_only() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("x.cd"));

        let sets = discover_card_sets(root.path()).unwrap();
        assert_eq!(sets.len(), 1);
    }

    #[test]
    fn test_load_remap_rules() {
        let dir = TempDir::new().unwrap();
        let rules_path = dir.path().join(REMAP_RULES_FILE);
        fs::write(
            &rules_path,
            "/ext lang/nouns.cd words/nouns.cd\n/other shared\n",
        )
        .unwrap();

        let rules = load_remap_rules(&rules_path).unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].root, PathBuf::from("/ext"));
        assert_eq!(rules[0].sub_path, "lang/nouns.cd");
        assert_eq!(rules[0].rename.as_deref(), Some("words/nouns.cd"));
        assert!(rules[1].rename.is_none());
    }

    #[test]
    fn test_malformed_rule_line_tagged() {
        let dir = TempDir::new().unwrap();
        let rules_path = dir.path().join(REMAP_RULES_FILE);
        fs::write(&rules_path, "/ext sub\n/ext\n").unwrap();

        let err = load_remap_rules(&rules_path).unwrap_err();
        match err {
            DiscoveryError::InvalidRule { line, found } => {
                assert_eq!(line, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_single_file_rule_with_rename() {
        let root = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        touch(&external.path().join("lang/nouns.cd"));

        let rules = vec![RemapRule {
            root: external.path().to_path_buf(),
            sub_path: "lang/nouns.cd".to_string(),
            rename: Some("words/nouns.cd".to_string()),
        }];

        let sets = discover_card_sets_with_rules(root.path(), &rules).unwrap();

        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].logical_id, "words/nouns");
        assert_eq!(
            sets[0].definition_path,
            external.path().join("lang/nouns.cd")
        );
        assert_eq!(sets[0].progress_path, root.path().join("words/nouns.cdd"));
    }

    #[test]
    fn test_single_file_rule_without_rename() {
        let root = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        touch(&external.path().join("lang/verbs.cd"));

        let rules = vec![RemapRule {
            root: external.path().to_path_buf(),
            sub_path: "lang/verbs.cd".to_string(),
            rename: None,
        }];

        let sets = discover_card_sets_with_rules(root.path(), &rules).unwrap();

        assert_eq!(sets[0].logical_id, "lang/verbs");
        assert_eq!(sets[0].progress_path, root.path().join("lang/verbs.cdd"));
    }

    #[test]
    fn test_directory_rule_maps_whole_tree() {
        let root = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        touch(&external.path().join("decks/de/nouns.cd"));
        touch(&external.path().join("decks/de/verbs.cd"));

        let rules = vec![RemapRule {
            root: external.path().to_path_buf(),
            sub_path: "decks/de".to_string(),
            rename: Some("german".to_string()),
        }];

        let sets = discover_card_sets_with_rules(root.path(), &rules).unwrap();

        let ids: Vec<&str> = sets.iter().map(|s| s.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["german/nouns", "german/verbs"]);
        assert_eq!(
            sets[0].progress_path,
            root.path().join("german/nouns.cdd")
        );
        assert_eq!(
            sets[0].definition_path,
            external.path().join("decks/de/nouns.cd")
        );
    }

    #[test]
    fn test_directory_rule_without_rename_keeps_sub_path() {
        let root = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        touch(&external.path().join("decks/fr/nouns.cd"));

        let rules = vec![RemapRule {
            root: external.path().to_path_buf(),
            sub_path: "decks/fr".to_string(),
            rename: None,
        }];

        let sets = discover_card_sets_with_rules(root.path(), &rules).unwrap();

        assert_eq!(sets[0].logical_id, "decks/fr/nouns");
        assert_eq!(
            sets[0].progress_path,
            root.path().join("decks/fr/nouns.cdd")
        );
    }

    #[test]
    fn test_local_and_remapped_merge_sorted() {
        let root = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        touch(&root.path().join("zebra.cd"));
        touch(&external.path().join("apple.cd"));

        let rules = vec![RemapRule {
            root: external.path().to_path_buf(),
            sub_path: "apple.cd".to_string(),
            rename: None,
        }];

        let sets = discover_card_sets_with_rules(root.path(), &rules).unwrap();

        let ids: Vec<&str> = sets.iter().map(|s| s.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["apple", "zebra"]);
    }

    #[test]
    fn test_rule_pointing_nowhere_aborts_discovery() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("x.cd"));

        let rules = vec![RemapRule {
            root: root.path().join("does-not-exist"),
            sub_path: "sub".to_string(),
            rename: None,
        }];

        assert!(discover_card_sets_with_rules(root.path(), &rules).is_err());
    }

    #[test]
    fn test_rules_file_drives_discovery() {
        let root = TempDir::new().unwrap();
        let external = TempDir::new().unwrap();
        touch(&external.path().join("shared/greek.cd"));
        fs::write(
            root.path().join(REMAP_RULES_FILE),
            format!("{} shared/greek.cd\n", external.path().display()),
        )
        .unwrap();

        let sets = discover_card_sets(root.path()).unwrap();

        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].logical_id, "shared/greek");
    }
}
