//! Share links: `{origin}/n/{id}` or `{origin}/n/{id}#{key}`.
//!
//! The fragment is the only place the link key lives. Browsers never send it
//! to the server, and this client only ever puts `origin` and `id` on the wire.

use std::fmt;

use anyhow::{bail, Context, Result};
use http::Uri;
use quicknote_core::LinkKey;

const NOTE_SEGMENT: &str = "/n/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// Scheme, authority and any path prefix the server is mounted under.
    pub origin: String,
    pub id: String,
    pub key: Option<LinkKey>,
}

impl ShareLink {
    pub fn new(origin: &str, id: impl Into<String>, key: Option<LinkKey>) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_owned(),
            id: id.into(),
            key,
        }
    }

    pub fn parse(link: &str) -> Result<Self> {
        let link = link.trim();
        let (base, fragment) = match link.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (link, None),
        };

        let uri: Uri = base.parse().context("not a valid URL")?;
        let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
            bail!("link must be an absolute http(s) URL");
        };
        if scheme != "http" && scheme != "https" {
            bail!("unsupported link scheme: {scheme}");
        }

        let path = uri.path();
        let Some(at) = path.rfind(NOTE_SEGMENT) else {
            bail!("link does not point at a note");
        };
        let prefix = &path[..at];
        let id = path[at + NOTE_SEGMENT.len()..].trim_end_matches('/');
        if id.is_empty() || id.contains('/') {
            bail!("link does not contain a note id");
        }

        let key = match fragment.map(str::trim).filter(|f| !f.is_empty()) {
            Some(encoded) => {
                Some(LinkKey::parse(encoded).context("link key in fragment is malformed")?)
            }
            None => None,
        };

        Ok(Self {
            origin: format!("{scheme}://{authority}{prefix}"),
            id: id.to_owned(),
            key,
        })
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.origin, NOTE_SEGMENT, self.id)?;
        if let Some(key) = &self.key {
            write!(f, "#{}", key.encode())?;
        }
        Ok(())
    }
}
