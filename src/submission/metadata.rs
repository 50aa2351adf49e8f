/// Caption, location and hashtags attached to a post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostMetadata {
    pub caption: String,
    pub location: String,
    /// Free text; the posting service splits it on whitespace
    pub hashtags: String,
}

impl PostMetadata {
    pub fn new(
        caption: impl Into<String>,
        location: impl Into<String>,
        hashtags: impl Into<String>,
    ) -> Self {
        Self {
            caption: caption.into(),
            location: location.into(),
            hashtags: hashtags.into(),
        }
    }

    /// All three fields filled in. Whitespace-only counts as empty.
    pub fn is_complete(&self) -> bool {
        [&self.caption, &self.location, &self.hashtags]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    pub fn hashtag_list(&self) -> Vec<&str> {
        self.hashtags.split_whitespace().collect()
    }
}
