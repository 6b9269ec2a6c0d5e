//! Remote repository URL parsing

use std::fmt;
use std::path::Path;

use crate::{Error, Result};

/// How git reaches the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Https,
    Ssh,
    /// A mirror on the local filesystem (`file://` or a plain path)
    Local,
}

/// A parsed remote for the mSCP repository (or a fork or mirror of it)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    pub transport: Transport,
    /// Empty for local mirrors
    pub host: String,
    /// Last path component without `.git`, e.g. `macos_security`
    pub repo: String,
    /// URL handed to `git clone` / `git ls-remote`
    pub clone_url: String,
}

impl RemoteUrl {
    /// Parse a remote URL or shorthand
    ///
    /// Accepts `https://host/owner/repo(.git)`, `git@host:owner/repo.git`,
    /// `owner/repo` (GitHub), `file:///path` and absolute paths to a mirror.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let parsed = if input.starts_with("https://") || input.starts_with("http://") {
            parse_http(input)
        } else if input.starts_with("file://") || Path::new(input).is_absolute() {
            parse_local(input)
        } else if let Some(rest) = input.strip_prefix("git@") {
            parse_scp(input, rest)
        } else {
            parse_shorthand(input)
        };

        parsed.ok_or_else(|| {
            Error::Config(format!(
                "Invalid remote: {:?}. Use owner/repo, https://host/owner/repo, git@host:owner/repo.git or a local path",
                input
            ))
        })
    }

    /// Where the remote lives, for display
    pub fn summary(&self) -> String {
        match self.transport {
            Transport::Local => format!("{} (local mirror)", self.repo),
            _ => format!("{} on {} over {}", self.repo, self.host, self.transport),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transport::Https => "https",
            Transport::Ssh => "ssh",
            Transport::Local => "file",
        })
    }
}

/// Repository name from the final path segment
fn repo_name(path: &str) -> Option<String> {
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()?
        .trim_end_matches(".git");
    (!name.is_empty()).then(|| name.to_string())
}

/// Repository name of an `owner/repo` path; both segments required
fn owner_and_repo(path: &str) -> Option<String> {
    let (owner, rest) = path.trim_matches('/').split_once('/')?;
    if owner.is_empty() || rest.is_empty() {
        return None;
    }
    repo_name(rest)
}

fn parse_http(input: &str) -> Option<RemoteUrl> {
    let url = url::Url::parse(input).ok()?;
    let repo = owner_and_repo(url.path())?;
    let base = input.trim_end_matches('/');
    let clone_url = if base.ends_with(".git") {
        base.to_string()
    } else {
        format!("{}.git", base)
    };

    Some(RemoteUrl {
        transport: Transport::Https,
        host: url.host_str()?.to_string(),
        repo,
        clone_url,
    })
}

fn parse_scp(input: &str, rest: &str) -> Option<RemoteUrl> {
    let (host, path) = rest.split_once(':')?;
    if host.is_empty() {
        return None;
    }

    Some(RemoteUrl {
        transport: Transport::Ssh,
        host: host.to_string(),
        repo: owner_and_repo(path)?,
        clone_url: input.to_string(),
    })
}

fn parse_local(input: &str) -> Option<RemoteUrl> {
    let path = match input.strip_prefix("file://") {
        Some(_) => url::Url::parse(input).ok()?.path().to_string(),
        None => input.to_string(),
    };

    Some(RemoteUrl {
        transport: Transport::Local,
        host: String::new(),
        repo: repo_name(&path)?,
        clone_url: input.to_string(),
    })
}

fn parse_shorthand(input: &str) -> Option<RemoteUrl> {
    let (owner, repo) = input.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') || input.contains(':') {
        return None;
    }
    let repo = repo.trim_end_matches(".git");

    Some(RemoteUrl {
        transport: Transport::Https,
        host: "github.com".to_string(),
        repo: repo.to_string(),
        clone_url: format!("https://github.com/{}/{}.git", owner, repo),
    })
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clone_url)
    }
}
