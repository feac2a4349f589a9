//! Endpoint paths, query items and version prefixes.

use url::Url;

/// An ordered list of path segments, rendered as `/a/b/c`.
///
/// Used both for endpoint paths and for version prefixes; two paths compose
/// by concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `self` followed by `other`.
    pub fn appending(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    pub fn rendered(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Path and query of one resource on the remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub path: Path,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new(path: Path) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    /// Split a `/`-separated string into segments. Empty segments are dropped.
    pub fn from_path(path: &str) -> Self {
        Self::new(Path::new(path.split('/').filter(|s| !s.is_empty())))
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// This endpoint with `prefix` in front of its path.
    pub fn versioned(&self, prefix: &Path) -> Endpoint {
        Endpoint {
            path: prefix.appending(&self.path),
            query: self.query.clone(),
        }
    }

    /// Resolve against `base`: the endpoint path replaces the base path and
    /// the query is set only when the endpoint has items.
    pub(crate) fn resolve(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_path(&self.path.rendered());
        url.set_query(None);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }
}
