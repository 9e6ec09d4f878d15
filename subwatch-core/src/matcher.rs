use crate::types::{Keyword, RedditPost};

/// Keywords, in list order and original case, contained in the post's title or body.
pub fn match_keywords(post: &RedditPost, keywords: &[Keyword]) -> Vec<String> {
    let content = post.searchable_text();
    keywords
        .iter()
        .filter(|keyword| content.contains(keyword.normalized()))
        .map(|keyword| keyword.text.clone())
        .collect()
}
