use std::collections::BTreeSet;

use anyhow::Context as _;
use serde::Serialize;

use crate::cli::ResourcesArgs;
use crate::fetch::SiteClient;
use crate::formats::Resource;
use crate::render::{OutputFormat, render};

pub const RESOURCES_JSON: &str = "data/resources.json";

pub const LOAD_FAILED_MESSAGE: &str = "Could not load resources right now. Please refresh.";
pub const NO_MATCHES_MESSAGE: &str =
    "No resources match your search. Try a different word or clear some tags.";

/// Resource list plus the search term and active tags for one page.
///
/// Every query recomputes from the full list.
#[derive(Debug, Clone, Default)]
pub struct ResourceDirectory {
    resources: Vec<Resource>,
    search: String,
    active_tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChip {
    pub tag: String,
    pub active: bool,
}

impl ResourceDirectory {
    pub async fn load(client: &SiteClient) -> anyhow::Result<Self> {
        let resources: Vec<Resource> = client
            .get_json(RESOURCES_JSON)
            .await
            .context("load resource list")?;
        tracing::info!(count = resources.len(), "loaded resources");
        Ok(Self::new(resources))
    }

    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            ..Self::default()
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Returns whether the tag is active afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.active_tags.remove(tag) {
            false
        } else {
            self.active_tags.insert(tag.to_owned());
            true
        }
    }

    /// Applies a search term and a tag selection as if typed and clicked.
    pub fn apply(&mut self, search: &str, tags: &[String]) {
        self.set_search(search);
        for tag in tags {
            if !self.active_tags.contains(tag) {
                self.toggle_tag(tag);
            }
        }
    }

    pub fn clear(&mut self) {
        self.search.clear();
        self.active_tags.clear();
    }

    pub fn active_tags(&self) -> &BTreeSet<String> {
        &self.active_tags
    }

    pub fn visible(&self) -> Vec<&Resource> {
        let term = self.search.trim().to_lowercase();
        self.resources
            .iter()
            .filter(|item| matches_text(item, &term) && matches_tags(item, &self.active_tags))
            .collect()
    }

    /// Sorted union of every resource's tags.
    pub fn all_tags(&self) -> Vec<String> {
        self.resources
            .iter()
            .flat_map(|r| r.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn chips(&self) -> Vec<TagChip> {
        self.all_tags()
            .into_iter()
            .map(|tag| TagChip {
                active: self.active_tags.contains(&tag),
                tag,
            })
            .collect()
    }

    pub fn page(&self) -> ResourcePage {
        let items = self.visible().into_iter().cloned().collect::<Vec<_>>();
        let status = items.is_empty().then(|| NO_MATCHES_MESSAGE.to_owned());
        ResourcePage {
            search: self.search.clone(),
            chips: self.chips(),
            items,
            status,
        }
    }
}

fn matches_text(item: &Resource, lowered_term: &str) -> bool {
    if lowered_term.is_empty() {
        return true;
    }
    let haystack = format!("{} {} {}", item.title, item.description, item.tags.join(" "));
    haystack.to_lowercase().contains(lowered_term)
}

/// Every active tag must be present (exact match).
fn matches_tags(item: &Resource, active: &BTreeSet<String>) -> bool {
    active.iter().all(|tag| item.tags.iter().any(|t| t == tag))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourcePage {
    pub search: String,
    pub chips: Vec<TagChip>,
    pub items: Vec<Resource>,
    pub status: Option<String>,
}

impl ResourcePage {
    pub fn load_failed() -> Self {
        Self {
            search: String::new(),
            chips: Vec::new(),
            items: Vec::new(),
            status: Some(LOAD_FAILED_MESSAGE.to_owned()),
        }
    }
}

/// Loads the directory, applies the search and tags, and degrades on failure.
pub async fn resource_page(client: &SiteClient, search: &str, tags: &[String]) -> ResourcePage {
    match ResourceDirectory::load(client).await {
        Ok(mut directory) => {
            directory.apply(search, tags);
            directory.page()
        }
        Err(err) => {
            tracing::warn!(?err, "failed to load resources");
            ResourcePage::load_failed()
        }
    }
}

pub async fn run(
    args: ResourcesArgs,
    client: &SiteClient,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match ResourceDirectory::load(client).await {
        Ok(mut directory) => {
            directory.apply(&args.search, &args.tags);
            print!("{}", render(&directory.page(), format)?);
            Ok(())
        }
        Err(err) => {
            print!("{}", render(&ResourcePage::load_failed(), format)?);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(title: &str, description: &str, tags: &[&str]) -> Resource {
        Resource {
            title: title.to_owned(),
            description: description.to_owned(),
            url: format!("https://example.com/{}", title.to_lowercase()),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    fn directory() -> ResourceDirectory {
        ResourceDirectory::new(vec![
            resource("Alphabet Song", "Sing the letters", &["letters", "video"]),
            resource("Number Drills", "Count to ten", &["numbers", "worksheet"]),
            resource("Letter Tracing", "Practice writing", &["letters", "worksheet"]),
            resource("Colors", "Vocabulary cards", &["vocabulary"]),
        ])
    }

    fn titles(items: Vec<&Resource>) -> Vec<&str> {
        items.into_iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn tags_use_and_semantics() {
        let mut dir = directory();
        dir.toggle_tag("letters");
        dir.toggle_tag("worksheet");
        assert_eq!(titles(dir.visible()), vec!["Letter Tracing"]);
    }

    #[test]
    fn empty_tag_set_applies_text_only() {
        let mut dir = directory();
        assert_eq!(dir.visible().len(), 4);
        dir.set_search("  COUNT ");
        assert_eq!(titles(dir.visible()), vec!["Number Drills"]);
    }

    #[test]
    fn search_matches_tags_too() {
        let mut dir = directory();
        dir.set_search("vocab");
        assert_eq!(titles(dir.visible()), vec!["Colors"]);
    }

    #[test]
    fn text_and_tags_combine() {
        let mut dir = directory();
        dir.toggle_tag("letters");
        dir.set_search("song");
        assert_eq!(titles(dir.visible()), vec!["Alphabet Song"]);
        dir.set_search("drills");
        assert!(dir.visible().is_empty());
        assert_eq!(dir.page().status.as_deref(), Some(NO_MATCHES_MESSAGE));
    }

    #[test]
    fn toggling_twice_removes_the_tag() {
        let mut dir = directory();
        assert!(dir.toggle_tag("video"));
        assert!(!dir.toggle_tag("video"));
        assert!(dir.active_tags().is_empty());
    }

    #[test]
    fn chips_are_sorted_and_deduplicated() {
        let mut dir = directory();
        dir.toggle_tag("numbers");
        let chips = dir.chips();
        let tags = chips.iter().map(|c| c.tag.as_str()).collect::<Vec<_>>();
        assert_eq!(
            tags,
            vec!["letters", "numbers", "video", "vocabulary", "worksheet"]
        );
        assert!(chips.iter().any(|c| c.tag == "numbers" && c.active));
        assert_eq!(chips.iter().filter(|c| c.active).count(), 1);
    }

    #[test]
    fn clear_resets_term_and_tags() {
        let mut dir = directory();
        dir.toggle_tag("letters");
        dir.set_search("zzz");
        dir.clear();
        assert_eq!(dir.visible().len(), 4);
    }
}
