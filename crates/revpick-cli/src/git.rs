//! `GitClient` backed by the `git` executable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use revpick_core::{CommitId, CommitWalk, Error, GitClient, RemoteBranch, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

/// Queries a local working copy by running `git`.
pub struct GitCli {
    repo_path: PathBuf,
    /// Only report branches of this remote.
    remote: Option<String>,
}

impl GitCli {
    pub fn new(repo_path: impl Into<PathBuf>, remote: Option<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            remote,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo_path);
        cmd
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, path = %self.repo_path.display(), "Running git");
        let output = self
            .command()
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }

    /// Run a command that must succeed and return its stdout.
    async fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(Error::CommandFailed(format!(
                "git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn remote_branches(&self) -> Result<Vec<RemoteBranch>> {
        let prefix = match &self.remote {
            Some(remote) => format!("refs/remotes/{}/", remote),
            None => "refs/remotes/".to_string(),
        };
        let stdout = self
            .run_checked(&["for-each-ref", "--format=%(objectname) %(refname)", &prefix])
            .await?;

        let mut branches = Vec::new();
        for line in stdout.lines().filter(|l| !l.is_empty()) {
            let (commit, refname) = line
                .split_once(' ')
                .ok_or_else(|| Error::InvalidOutput(line.to_string()))?;
            let name = refname.strip_prefix("refs/remotes/").unwrap_or(refname);
            // origin/HEAD is a symbolic alias of another remote branch
            if name.ends_with("/HEAD") {
                continue;
            }
            branches.push(RemoteBranch::new(name, commit));
        }
        Ok(branches)
    }

    async fn tag_names(&self, filter: &str) -> Result<BTreeSet<String>> {
        let stdout = self.run_checked(&["tag", "--list", filter]).await?;
        // `--list` treats the filter as a glob; only the tag named exactly counts
        Ok(stdout
            .lines()
            .filter(|l| *l == filter)
            .map(str::to_string)
            .collect())
    }

    async fn rev_parse(&self, rev: &str) -> Result<Option<CommitId>> {
        let target = format!("{}^{{commit}}", rev);
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", &target])
            .await?;

        match output.status.code() {
            Some(0) => {
                let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Ok(Some(CommitId::new(id)))
            }
            // --quiet exits with 1 and no message for unknown revisions
            Some(1) => Ok(None),
            _ => Err(Error::CommandFailed(format!(
                "git rev-parse {}: {}",
                rev,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    async fn commit_walk<'a>(&'a self) -> Result<Box<dyn CommitWalk + 'a>> {
        let mut child = self
            .command()
            .args(["cat-file", "--batch"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Unavailable("cat-file stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Unavailable("cat-file stdout not captured".to_string()))?;

        Ok(Box::new(CatFileWalk {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
        }))
    }
}

/// Commit lookups through one long-running `git cat-file --batch`. The
/// process is killed when the walk is dropped.
struct CatFileWalk {
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

#[async_trait]
impl CommitWalk for CatFileWalk {
    async fn commit_time(&mut self, commit: &CommitId) -> Result<Option<DateTime<Utc>>> {
        self.stdin
            .write_all(format!("{}\n", commit).as_bytes())
            .await?;
        self.stdin.flush().await?;

        let mut header = String::new();
        if self.stdout.read_line(&mut header).await? == 0 {
            return Err(Error::Unavailable("cat-file exited".to_string()));
        }

        // "<id> <type> <size>" or "<id> missing"
        let fields: Vec<&str> = header.split_whitespace().collect();
        let [_, kind, size] = fields.as_slice() else {
            return Ok(None);
        };
        let size: usize = size
            .parse()
            .map_err(|_| Error::InvalidOutput(header.trim().to_string()))?;

        // Object body plus the trailing newline
        let mut body = vec![0; size + 1];
        self.stdout.read_exact(&mut body).await?;

        if *kind != "commit" {
            return Ok(None);
        }
        Ok(parse_committer_time(&String::from_utf8_lossy(&body[..size])))
    }
}

/// Committer timestamp of a raw commit object.
fn parse_committer_time(body: &str) -> Option<DateTime<Utc>> {
    let line = body
        .lines()
        .take_while(|l| !l.is_empty())
        .find(|l| l.starts_with("committer "))?;
    // "committer Name <email> 1700000000 +0100"
    let mut fields = line.rsplitn(3, ' ');
    let _tz = fields.next()?;
    let seconds: i64 = fields.next()?.parse().ok()?;
    DateTime::from_timestamp(seconds, 0)
}
