use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use tempfile::NamedTempFile;

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// `tasks_2025-07-10T09-00-00-000Z.json`
fn backup_name(stem: &str, now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}_{}.json", stem, stamp)
}

/// Copy `source` into `backup_dir` under a timestamped name, then drop all but
/// the newest `keep` backups of the same file. Returns `None` when there is
/// nothing to back up yet.
pub fn backup_file(
    backup_dir: &Path,
    source: &Path,
    keep: usize,
    now: DateTime<Utc>,
) -> io::Result<Option<PathBuf>> {
    if !source.exists() {
        return Ok(None);
    }
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data");
    fs::create_dir_all(backup_dir)?;
    let target = backup_dir.join(backup_name(stem, now));
    fs::copy(source, &target)?;

    let prefix = format!("{}_", stem);
    let mut existing: Vec<PathBuf> = fs::read_dir(backup_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .collect();
    // Timestamps sort lexically; newest first
    existing.sort();
    existing.reverse();
    for stale in existing.iter().skip(keep) {
        fs::remove_file(stale)?;
    }
    Ok(Some(target))
}

/// Delete backups last modified before `cutoff`. Returns the removed paths.
pub fn prune_backups(backup_dir: &Path, cutoff: SystemTime) -> io::Result<Vec<PathBuf>> {
    if !backup_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut removed = Vec::new();
    for entry in fs::read_dir(backup_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if modified < cutoff {
            fs::remove_file(&path)?;
            tracing::info!(path = %path.display(), "deleted old backup");
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 10, 9, minute, 0).unwrap()
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        // no temp files left behind
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn backup_name_has_no_colons() {
        assert_eq!(backup_name("tasks", at(5)), "tasks_2025-07-10T09-05-00-000Z.json");
    }

    #[test]
    fn backup_missing_source_is_noop() {
        let tmp = TempDir::new().unwrap();
        let out = backup_file(&tmp.path().join("backups"), &tmp.path().join("tasks.json"), 10, at(0));
        assert!(out.unwrap().is_none());
    }

    #[test]
    fn backups_are_capped_per_file() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("tasks.json");
        let other = tmp.path().join("projects.json");
        fs::write(&source, "{}").unwrap();
        fs::write(&other, "[]").unwrap();
        let dir = tmp.path().join("backups");

        backup_file(&dir, &other, 2, at(0)).unwrap();
        for minute in 1..=4 {
            backup_file(&dir, &source, 2, at(minute)).unwrap();
        }

        let mut names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "projects_2025-07-10T09-00-00-000Z.json",
                "tasks_2025-07-10T09-03-00-000Z.json",
                "tasks_2025-07-10T09-04-00-000Z.json",
            ]
        );
    }

    #[test]
    fn prune_removes_only_old_files() {
        let tmp = TempDir::new().unwrap();
        let old = tmp.path().join("tasks_old.json");
        let fresh = tmp.path().join("tasks_new.json");
        fs::write(&old, "{}").unwrap();
        fs::write(&fresh, "{}").unwrap();

        let ten_days_ago = SystemTime::now() - Duration::from_secs(10 * 24 * 3600);
        fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(ten_days_ago)
            .unwrap();

        let cutoff = SystemTime::now() - Duration::from_secs(7 * 24 * 3600);
        let removed = prune_backups(tmp.path(), cutoff).unwrap();
        assert_eq!(removed, vec![old.clone()]);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn prune_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let removed = prune_backups(&tmp.path().join("none"), SystemTime::now()).unwrap();
        assert!(removed.is_empty());
    }
}
