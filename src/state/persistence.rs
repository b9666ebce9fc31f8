//! Target list persistence.
//!
//! One line per key:
//!
//! ```text
//! <scope>,<channel>;<user>,<user>,...
//! ```
//!
//! `scope` is a guild id, `group` or `dm`. The whole file is rewritten on
//! every save, through a temp file and a rename, so a crash mid-save leaves
//! the previous version intact.

use super::key::{ConversationKey, Scope, TargetSet};
use crate::error::{CodecError, StoreError};
use pingwire_proto::{ChannelId, GuildId, UserId};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const GROUP_TOKEN: &str = "group";
const DIRECT_TOKEN: &str = "dm";

/// Encode entries, sorted by key so identical stores produce identical files.
/// Empty sets are skipped; they never belong in the file.
pub fn encode<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a ConversationKey, &'a TargetSet)>,
{
    let mut rows: Vec<_> = entries
        .into_iter()
        .filter(|(_, targets)| !targets.is_empty())
        .collect();
    rows.sort_unstable_by_key(|(key, _)| **key);

    let mut out = String::new();
    for (key, targets) in rows {
        match key.scope {
            Scope::Guild(guild) => {
                let _ = write!(out, "{guild}");
            }
            Scope::Group => out.push_str(GROUP_TOKEN),
            Scope::Direct => out.push_str(DIRECT_TOKEN),
        }
        let _ = write!(out, ",{};", key.channel);
        for (i, user) in targets.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{user}");
        }
        out.push('\n');
    }
    out
}

/// Decode a whole file. Any malformed line fails the entire decode.
pub fn decode(text: &str) -> Result<HashMap<ConversationKey, TargetSet>, CodecError> {
    let mut entries = HashMap::new();
    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let (key, targets) = decode_line(raw.trim_end_matches('\r'), lineno)?;
        if entries.insert(key, targets).is_some() {
            return Err(CodecError::new(lineno, format!("duplicate key {key}")));
        }
    }
    Ok(entries)
}

fn decode_line(line: &str, lineno: usize) -> Result<(ConversationKey, TargetSet), CodecError> {
    let (key_part, ids_part) = line
        .split_once(';')
        .ok_or_else(|| CodecError::new(lineno, "missing ';' between key and identities"))?;
    let (scope_part, channel_part) = key_part
        .split_once(',')
        .ok_or_else(|| CodecError::new(lineno, "missing ',' in key"))?;

    let scope = match scope_part {
        GROUP_TOKEN => Scope::Group,
        DIRECT_TOKEN => Scope::Direct,
        other => Scope::Guild(GuildId(parse_id(other, lineno, "guild id")?)),
    };
    let channel = ChannelId(parse_id(channel_part, lineno, "channel id")?);

    let mut targets = TargetSet::new();
    for part in ids_part.split(',') {
        targets.insert(UserId(parse_id(part, lineno, "identity")?));
    }
    if targets.is_empty() {
        return Err(CodecError::new(lineno, "empty identity list"));
    }

    Ok((ConversationKey::new(scope, channel), targets))
}

fn parse_id(raw: &str, lineno: usize, what: &str) -> Result<u64, CodecError> {
    // u64::from_str accepts a leading '+', the file format does not
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::new(lineno, format!("invalid {what} {raw:?}")));
    }
    raw.parse()
        .map_err(|_| CodecError::new(lineno, format!("{what} out of range {raw:?}")))
}

/// Load the target list. A missing file is an empty store.
pub async fn load(path: &Path) -> Result<HashMap<ConversationKey, TargetSet>, StoreError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No target list on disk, starting empty");
            return Ok(HashMap::new());
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    decode(&text).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the file at `path` with `contents`.
///
/// Uses atomic write (temp file + rename) to prevent corruption.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let wrap = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }

    let temp_path = temp_path_for(path);
    let mut file = tokio::fs::File::create(&temp_path).await.map_err(wrap)?;
    file.write_all(contents.as_bytes()).await.map_err(wrap)?;
    file.sync_all().await.map_err(wrap)?;
    drop(file);

    // Atomic rename
    tokio::fs::rename(&temp_path, path).await.map_err(wrap)?;

    debug!(path = %path.display(), bytes = contents.len(), "Target list saved");
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "targets".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u64]) -> TargetSet {
        ids.iter().copied().map(UserId).collect()
    }

    #[test]
    fn decode_guild_line() {
        let entries = decode("100,55;11,22\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[&ConversationKey::guild(100, 55)], set(&[11, 22]));
    }

    #[test]
    fn decode_sentinel_scopes() {
        let entries = decode("group,7;1\ndm,8;2,3\n").unwrap();
        assert_eq!(
            entries[&ConversationKey::new(Scope::Group, ChannelId(7))],
            set(&[1])
        );
        assert_eq!(
            entries[&ConversationKey::new(Scope::Direct, ChannelId(8))],
            set(&[2, 3])
        );
    }

    #[test]
    fn encode_is_sorted_and_skips_empty_sets() {
        let mut entries = HashMap::new();
        entries.insert(ConversationKey::guild(200, 1), set(&[5]));
        entries.insert(ConversationKey::guild(100, 55), set(&[22, 11]));
        entries.insert(ConversationKey::new(Scope::Direct, ChannelId(3)), set(&[]));
        entries.insert(ConversationKey::new(Scope::Group, ChannelId(9)), set(&[4]));

        assert_eq!(encode(&entries), "100,55;11,22\n200,1;5\ngroup,9;4\n");
    }

    #[test]
    fn saved_line_reloads_to_the_same_entry() {
        let entries = decode("100,55;22,11").unwrap();
        let text = encode(&entries);
        assert!(text.starts_with("100,55;"));
        assert_eq!(decode(&text).unwrap(), entries);
    }

    #[test]
    fn crlf_and_blank_lines_are_tolerated() {
        let entries = decode("\r\n100,55;1\r\n\n").unwrap();
        assert_eq!(entries[&ConversationKey::guild(100, 55)], set(&[1]));
    }

    #[test]
    fn malformed_lines_fail_the_whole_load() {
        let cases = [
            "100,55",
            "100;1",
            "abc,55;1",
            "100,55;",
            "100,55;1,,2",
            "100,x;1",
            "+100,55;1",
            "100,55;-1",
            "99999999999999999999,1;1",
            "DM,1;1",
        ];
        for case in cases {
            let text = format!("200,1;5\n{case}\n");
            let err = decode(&text).unwrap_err();
            assert_eq!(err.line, 2, "case {case:?}");
        }
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = decode("100,55;1\n100,55;2\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = load(&dir.path().join("absent.txt")).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, "100,55;1\nnonsense\n").unwrap();
        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn write_atomic_replaces_contents_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("targets.txt");

        write_atomic(&path, "100,55;1\n").await.unwrap();
        write_atomic(&path, "200,1;2\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "200,1;2\n");
        assert!(!temp_path_for(&path).exists());
        assert_eq!(
            load(&path).await.unwrap()[&ConversationKey::guild(200, 1)],
            set(&[2])
        );
    }
}
