//! Source Link documents.
//!
//! A Source Link document maps local source paths to URLs:
//!
//! ```json
//! {"documents": {"/_/*": "https://raw.githubusercontent.com/org/repo/0123abc/*"}}
//! ```
//!
//! A key ending in `*` matches every path with that prefix and the matched remainder replaces
//! the `*` of the URL. Other keys match one path exactly. The longest matching key wins.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Result;

#[derive(Deserialize)]
struct SourceLinkJson {
    documents: BTreeMap<String, String>,
}

/// One entry of a Source Link document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLinkMap {
    /// The local path, or path prefix for wildcard entries, with `\` normalized to `/`
    pub path: String,
    /// The URL, with a `*` for wildcard entries
    pub url: String,
    /// Whether the entry ends in `*`
    pub wildcard: bool,
}

impl SourceLinkMap {
    /// Parse a Source Link document, returning the maps and a message per invalid entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::Json`] if the document is not valid Source Link JSON.
    pub fn parse(json: &str) -> Result<(Vec<SourceLinkMap>, Vec<String>)> {
        let document: SourceLinkJson = serde_json::from_str(json)?;

        let mut maps = Vec::new();
        let mut errors = Vec::new();
        for (path, url) in document.documents {
            let path = path.replace('\\', "/");
            let (prefix, wildcard) = match path.strip_suffix('*') {
                Some(prefix) => (prefix.to_string(), true),
                None => (path.clone(), false),
            };

            if prefix.contains('*') {
                errors.push(format!("Source Link path '{path}' has a '*' before its end"));
                continue;
            }

            let url_wildcards = url.matches('*').count();
            if (wildcard && url_wildcards != 1) || (!wildcard && url_wildcards != 0) {
                errors.push(format!(
                    "Source Link URL '{url}' does not match the wildcard of path '{path}'"
                ));
                continue;
            }

            maps.push(SourceLinkMap {
                path: prefix,
                url,
                wildcard,
            });
        }

        Ok((maps, errors))
    }

    /// Resolve the URL of a document path with the best matching map.
    #[must_use]
    pub fn resolve(maps: &[SourceLinkMap], document: &str) -> Option<String> {
        let document = document.replace('\\', "/");

        maps.iter()
            .filter(|map| {
                if map.wildcard {
                    document.starts_with(&map.path)
                } else {
                    document == map.path
                }
            })
            .max_by_key(|map| (map.path.len(), !map.wildcard))
            .map(|map| {
                if map.wildcard {
                    map.url.replacen('*', &document[map.path.len()..], 1)
                } else {
                    map.url.clone()
                }
            })
    }
}
