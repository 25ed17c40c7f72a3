use maud::{html, Markup, Render};

use crate::components::ui::button::Button;
use crate::posts::Post;

/// A post in a listing, or in full on its own page
pub struct PostCard<'a> {
    pub post: &'a Post,
    pub can_modify: bool,
    pub full: bool,
}

impl<'a> PostCard<'a> {
    pub fn summary(post: &'a Post) -> Self {
        Self {
            post,
            can_modify: false,
            full: false,
        }
    }

    pub fn full(post: &'a Post) -> Self {
        Self {
            full: true,
            ..Self::summary(post)
        }
    }

    /// Show edit and delete actions
    pub fn can_modify(mut self, can_modify: bool) -> Self {
        self.can_modify = can_modify;
        self
    }
}

impl Render for PostCard<'_> {
    fn render(&self) -> Markup {
        let post = self.post;

        html! {
            article class="bg-white rounded-lg border border-gray-200 p-4 shadow-sm" {
                h2 class="text-xl font-semibold text-indigo-700" {
                    a href={"/posts/" (post.id)} { (post.title) }
                }
                p class="text-sm text-gray-500 mt-1" {
                    "By: " (post.author_name.as_deref().unwrap_or("[deleted account]"))
                    " · " (post.date_posted.format("%Y-%m-%d %H:%M"))
                    " · " span class="font-mono" { (post.slug) }
                }

                @if self.full {
                    div class="mt-4 text-gray-800 whitespace-pre-wrap" { (post.content) }
                } @else {
                    p class="mt-3 text-gray-700 line-clamp-3" { (post.content) }
                }

                div class="mt-4 flex flex-wrap gap-2" {
                    @if !self.full {
                        (Button::secondary("View Post").href(&format!("/posts/{}", post.id)))
                    }
                    @if self.can_modify {
                        (Button::secondary("Edit Post").href(&format!("/posts/edit/{}", post.id)))
                        (Button::danger("Delete Post").href(&format!("/delete_post/{}", post.id)))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::accounts::AccountId;
    use crate::posts::PostId;

    fn post() -> Post {
        Post {
            id: PostId(7),
            title: "Intro to <X>".to_string(),
            content: "<b>bold</b>".to_string(),
            slug: "intro".to_string(),
            date_posted: Utc::now(),
            author_id: None,
            author_name: None,
            version: 1,
        }
    }

    #[test]
    fn test_post_content_is_escaped() {
        let markup = PostCard::full(&post()).render().into_string();

        assert!(markup.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(markup.contains("Intro to &lt;X&gt;"));
    }

    #[test]
    fn test_orphaned_post_shows_deleted_author() {
        let markup = PostCard::summary(&post()).render().into_string();
        assert!(markup.contains("[deleted account]"));
    }

    #[test]
    fn test_actions_only_for_those_who_may_modify() {
        let mut post = post();
        post.author_id = Some(AccountId(1));

        let viewer = PostCard::summary(&post).render().into_string();
        assert!(!viewer.contains("/posts/edit/7"));

        let owner = PostCard::summary(&post).can_modify(true).render().into_string();
        assert!(owner.contains("/posts/edit/7"));
        assert!(owner.contains("/delete_post/7"));
    }
}
