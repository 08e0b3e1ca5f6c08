//! Shells out to a real `git` binary for object and ref writes, treating the
//! Git on-disk object writer as a command-line subprocess rather than
//! reimplementing loose-object encoding here.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::errors::GitError;
use crate::hash::ObjectHash;
use crate::internal::object::ObjectType;

use super::{ObjectWriter, RefWriter};

pub struct GitSubprocess {
    repo_path: PathBuf,
}

impl GitSubprocess {
    pub fn new(repo_path: impl Into<PathBuf>) -> GitSubprocess {
        GitSubprocess { repo_path: repo_path.into() }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo_path);
        cmd
    }

    fn run_capturing(&self, mut cmd: Command) -> Result<String, GitError> {
        let output = cmd
            .output()
            .map_err(|e| GitError::GitWriteError(format!("failed to spawn git: {e}")))?;
        if !output.status.success() {
            return Err(GitError::GitWriteError(format!(
                "git exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}

impl ObjectWriter for GitSubprocess {
    fn write_object(&self, object_type: ObjectType, data: &[u8]) -> Result<ObjectHash, GitError> {
        let expected = ObjectHash::from_type_and_data(object_type, data);

        let mut cmd = self.git();
        cmd.args(["hash-object", "-t", object_type.to_string().as_str(), "-w", "--stdin", "--literally"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .map_err(|e| GitError::HasherError(format!("failed to spawn git hash-object: {e}")))?;
        child
            .stdin
            .take()
            .expect("stdin piped")
            .write_all(data)
            .map_err(|e| GitError::HasherError(format!("failed to write to git hash-object: {e}")))?;
        let output = child
            .wait_with_output()
            .map_err(|e| GitError::HasherError(format!("git hash-object failed: {e}")))?;
        if !output.status.success() {
            return Err(GitError::HasherError(format!(
                "git hash-object exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let hex = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        let hash = ObjectHash::from_str(&hex)
            .map_err(|e| GitError::HasherError(format!("git returned an unparsable object id `{hex}`: {e}")))?;
        if hash != expected {
            return Err(GitError::HasherError(format!(
                "git hash-object id {hash} disagrees with computed id {expected}"
            )));
        }
        Ok(hash)
    }
}

impl RefWriter for GitSubprocess {
    fn update_ref(&self, refname: &str, target: ObjectHash) -> Result<(), GitError> {
        let mut cmd = self.git();
        cmd.args(["update-ref", refname, &target.to_string()]);
        self.run_capturing(cmd)?;
        Ok(())
    }

    fn delete_ref(&self, refname: &str) -> Result<(), GitError> {
        let mut cmd = self.git();
        cmd.args(["update-ref", "-d", refname]);
        self.run_capturing(cmd)?;
        Ok(())
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<(String, ObjectHash)>, GitError> {
        let mut cmd = self.git();
        cmd.args(["for-each-ref", "--format=%(refname) %(objectname)", prefix]);
        let output = self.run_capturing(cmd)?;
        output
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let (name, hash_hex) = line
                    .split_once(' ')
                    .ok_or_else(|| GitError::GitWriteError(format!("unparsable for-each-ref line: {line}")))?;
                let hash = ObjectHash::from_str(hash_hex)
                    .map_err(|e| GitError::GitWriteError(format!("bad object id in ref listing: {e}")))?;
                Ok((name.to_owned(), hash))
            })
            .collect()
    }
}

/// Resolves a `git` binary's idea of the current repository's `.git` dir,
/// used to tell `--target-repository <path>` apart from an initialized
/// worktree vs. a bare repository before shelling out further commands.
pub fn discover_git_dir(repo_path: &Path) -> Result<PathBuf, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_path)
        .args(["rev-parse", "--git-dir"])
        .output()
        .map_err(|e| GitError::GitWriteError(format!("failed to spawn git: {e}")))?;
    if !output.status.success() {
        return Err(GitError::GitWriteError(format!(
            "{repo_path:?} is not a git repository: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    let dir = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    Ok(repo_path.join(dir))
}
