use serde::Serialize;

use crate::error::Error;

/// Well-known host for bare `org/repo@ref` references.
const GIT_HOST: &str = "github.com";

/// Default revision when a reference carries no `@<revision>` suffix.
pub const DEFAULT_REVISION: &str = "master";

/// Provenance of an action's container image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageKind {
    /// A `docker://` reference; the image is used as-is, nothing is built.
    ContainerImage,
    /// A `./path` reference into the upstream repository.
    LocalPath,
    /// An `org/repo[/path]@revision` reference to another repository.
    RemoteGitReference,
}

/// An upstream git repository reference, `location[@revision]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub location: String,
    pub revision: String,
}

impl RepoRef {
    /// Split `location@revision`. The revision defaults to [`DEFAULT_REVISION`].
    pub fn parse(reference: &str) -> Self {
        Self::parse_with_default(reference, DEFAULT_REVISION)
    }

    pub fn parse_with_default(reference: &str, default_revision: &str) -> Self {
        match reference.split_once('@') {
            Some((location, revision)) => Self {
                location: location.to_string(),
                revision: revision.to_string(),
            },
            None => Self {
                location: reference.to_string(),
                revision: default_revision.to_string(),
            },
        }
    }
}

/// Given an `org/repo/path...` designation, return just the `org/repo` portion.
///
/// Applied to the raw reference, never to a host-prefixed path.
pub fn repo_prefix(reference: &str) -> String {
    let path = reference.split('@').next().unwrap_or(reference);
    let mut components = path.splitn(3, '/');
    match (components.next(), components.next()) {
        (Some(org), Some(repo)) => format!("{org}/{repo}"),
        _ => path.to_string(),
    }
}

/// Given an `org/repo/path...` designation, return just the path portion
/// (`/` when the reference is a bare `org/repo`).
pub fn repo_path(reference: &str) -> String {
    let path = reference.split('@').next().unwrap_or(reference);
    match path.splitn(3, '/').nth(2) {
        Some(rest) => format!("/{rest}"),
        None => "/".to_string(),
    }
}

/// Derive the deduplication key for a `uses` reference: drop everything after
/// the last `@`, replace `/` and `.` with `-`, collapse repeated `-`, strip a
/// leading `-`, lowercase.
pub fn normalize_uses_name(uses: &str) -> String {
    let stem = match uses.rsplit_once('@') {
        Some((stem, _)) => stem,
        None => uses,
    };

    let mut name = String::with_capacity(stem.len());
    for ch in stem.chars() {
        let ch = match ch {
            '/' | '.' => '-',
            other => other.to_ascii_lowercase(),
        };
        if ch == '-' && name.ends_with('-') {
            continue;
        }
        name.push(ch);
    }

    name.trim_start_matches('-').to_string()
}

/// The retrievable source behind a built image: a git location at a revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    pub url: String,
    pub revision: String,
}

/// A provenance-classified image source. Deduplicated by `name` in the
/// resource registry: two actions whose `uses` strings normalize to the same
/// name share one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResource {
    pub kind: ImageKind,
    pub path: String,
    /// Normalized resource name, the registry deduplication key.
    pub name: String,
    /// Present for every kind that requires a build; `None` for
    /// [`ImageKind::ContainerImage`].
    pub source: Option<GitSource>,
    /// Build context directory inside the fetched source tree.
    pub context: String,
}

/// Classify a raw `uses` reference into a [`BuildResource`]. First match
/// wins; anything that matches no rule is an unsupported reference naming
/// the offending action.
pub fn classify(action: &str, uses: &str, repo: Option<&RepoRef>) -> Result<BuildResource, Error> {
    if let Some(path) = uses.strip_prefix("docker://") {
        return Ok(BuildResource {
            kind: ImageKind::ContainerImage,
            name: normalize_uses_name(path),
            path: path.to_string(),
            source: None,
            context: String::new(),
        });
    }

    if let Some(path) = uses.strip_prefix("./") {
        let repo = repo.ok_or_else(|| Error::MissingRepository {
            action: action.to_string(),
        })?;
        return Ok(BuildResource {
            kind: ImageKind::LocalPath,
            name: normalize_uses_name(uses),
            source: Some(GitSource {
                url: repo.location.clone(),
                revision: repo.revision.clone(),
            }),
            context: format!("/{path}"),
            path: path.to_string(),
        });
    }

    if uses.contains('@') {
        return Ok(BuildResource {
            kind: ImageKind::RemoteGitReference,
            name: normalize_uses_name(uses),
            path: format!("{GIT_HOST}/{uses}"),
            source: Some(GitSource {
                url: format!("https://{GIT_HOST}/{}", repo_prefix(uses)),
                revision: RepoRef::parse(uses).revision,
            }),
            context: repo_path(uses),
        });
    }

    Err(Error::UnsupportedReference {
        action: action.to_string(),
        uses: uses.to_string(),
    })
}

impl BuildResource {
    /// Name of the declared git resource feeding this resource's build task.
    pub fn source_resource_name(&self) -> String {
        format!("{}-git", self.name)
    }

    /// Name of the declared image resource the build task produces.
    pub fn image_resource_name(&self) -> String {
        format!("{}-image", self.name)
    }

    /// Name of the generated build task.
    pub fn build_task_name(&self) -> String {
        format!("{}-build", self.name)
    }

    /// Image reference a step running this resource should use: the literal
    /// path for direct container images, the registry-prefixed built image
    /// otherwise.
    pub fn image_reference(&self, registry: &str) -> String {
        match self.kind {
            ImageKind::ContainerImage => self.path.clone(),
            _ => format!("{registry}/{}", self.name),
        }
    }

    pub fn requires_build(&self) -> bool {
        self.kind != ImageKind::ContainerImage
    }
}
