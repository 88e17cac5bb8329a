//! Follows Nexus continuation tokens to list every version of an image.

use std::collections::HashSet;

use cantus_core::{CantusError, Result, NEXUS_SOURCE};

use crate::client::NexusApi;
use crate::types::ImageVersion;

/// Lists every version of `namespace/name` in `repository`.
///
/// Pages are fetched one after another, each only once the previous page's
/// token is known, and flattened in page order. The walk stops when a page
/// has no token.
///
/// # Errors
///
/// Propagates the first failing page. Fails with a protocol violation if
/// Nexus repeats a continuation token or more than `max_pages` pages are
/// needed.
pub async fn get_all_versions(
    api: &dyn NexusApi,
    namespace: &str,
    name: &str,
    repository: &str,
    max_pages: usize,
) -> Result<Vec<ImageVersion>> {
    let mut versions = Vec::new();
    let mut seen = HashSet::new();
    let mut token: Option<String> = None;
    let mut pages = 0;

    loop {
        if pages == max_pages {
            tracing::warn!(namespace, name, repository, pages, "Nexus page limit reached");
            return Err(CantusError::protocol(
                format!("version listing exceeded {max_pages} pages"),
                NEXUS_SOURCE,
            ));
        }

        let page = api
            .search_versions(namespace, name, repository, token.as_deref())
            .await?;
        pages += 1;

        versions.extend(page.items.iter().map(ImageVersion::from_item));

        match page.continuation_token {
            None => break,
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(CantusError::protocol(
                        format!("continuation token '{next}' was returned twice"),
                        NEXUS_SOURCE,
                    ));
                }
                token = Some(next);
            }
        }
    }

    tracing::debug!(namespace, name, repository, pages, count = versions.len(), "Listed versions");
    Ok(versions)
}
