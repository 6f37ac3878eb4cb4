//! Link rewrites: local `.md` references to published URLs, and upstream
//! EIP links to the site's mirror.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use blockdocs_shared::ArticleId;

/// Matches `[text](path/to/file.md)`.
static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+\.md)\)").expect("md link regex"));

/// Upstream prefix → mirror prefix, applied in order.
const EIP_MIRRORS: &[(&str, &str)] = &[
    (
        "https://eips.ethereum.org/EIPS/eip-",
        "https://learnblockchain.cn/docs/eips/EIPS/eip-",
    ),
    (
        "https://eips.ethereum.org/erc",
        "https://learnblockchain.cn/docs/eips/erc/",
    ),
];

/// One rewritten link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChange {
    pub from: String,
    pub to: String,
}

/// Build the `file name → article URL` lookup from ledger entries.
///
/// Only the file name of each ledger key is kept; when two keys share a file
/// name the later one in iteration order wins.
pub fn article_url_map<'a, I>(entries: I, site_url: &str) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a str, ArticleId)>,
{
    entries
        .into_iter()
        .filter_map(|(key, id)| {
            let name = Path::new(key).file_name()?.to_string_lossy().into_owned();
            Some((name, id.url(site_url)))
        })
        .collect()
}

/// Point `[text](…/name.md)` links at the published article for `name.md`.
///
/// Handles bare, `./` and `../` relative forms. Links without a known target
/// are left untouched.
pub fn rewrite_article_links(
    content: &str,
    urls: &HashMap<String, String>,
) -> (String, Vec<LinkChange>) {
    let mut changes = Vec::new();

    let updated = MD_LINK_RE.replace_all(content, |caps: &Captures| {
        let text = &caps[1];
        let original = &caps[2];
        let name = original.rsplit('/').next().unwrap_or(original);

        match urls.get(name) {
            Some(url) => {
                changes.push(LinkChange {
                    from: original.to_string(),
                    to: url.clone(),
                });
                format!("[{text}]({url})")
            }
            None => caps[0].to_string(),
        }
    });

    (updated.into_owned(), changes)
}

/// Redirect upstream EIP links to the site mirror.
pub fn rewrite_eip_mirrors(content: &str) -> String {
    if !content.contains("https://eips.ethereum.org/") {
        return content.to_string();
    }
    EIP_MIRRORS
        .iter()
        .fold(content.to_string(), |acc, (from, to)| acc.replace(from, to))
}
