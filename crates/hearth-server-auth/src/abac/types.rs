// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource attributes handed to the policy functions.
//!
//! The surrounding application owns content and comments. It loads the fields a
//! policy needs into these structs before asking for a decision; relationship
//! and facet facts are looked up by the engine itself.

use serde::{Deserialize, Serialize};

use crate::types::{CommentId, CommunityId, ContentId, PostStatus, UserId, Visibility};

/// The community a content item was posted into, with its moderation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPostAttrs {
	pub community_id: CommunityId,
	pub status: PostStatus,
}

impl CommunityPostAttrs {
	pub fn is_approved(&self) -> bool {
		self.status == PostStatus::Approved
	}
}

/// Attributes of a content item (post, article, media).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentAttrs {
	pub id: ContentId,
	pub author_id: UserId,
	pub visibility: Visibility,
	pub community: Option<CommunityPostAttrs>,
	pub is_paywalled: bool,
	pub comments_enabled: bool,
}

impl ContentAttrs {
	/// A private, standalone item with comments enabled.
	pub fn new(id: ContentId, author_id: UserId) -> Self {
		Self {
			id,
			author_id,
			visibility: Visibility::Private,
			community: None,
			is_paywalled: false,
			comments_enabled: true,
		}
	}

	/// Builder: set visibility.
	pub fn with_visibility(mut self, visibility: Visibility) -> Self {
		self.visibility = visibility;
		self
	}

	/// Builder: place the item in a community with the given moderation state.
	pub fn in_community(mut self, community_id: CommunityId, status: PostStatus) -> Self {
		self.community = Some(CommunityPostAttrs {
			community_id,
			status,
		});
		self
	}

	/// Builder: mark paywalled.
	pub fn paywalled(mut self) -> Self {
		self.is_paywalled = true;
		self
	}

	/// Builder: turn comments off.
	pub fn without_comments(mut self) -> Self {
		self.comments_enabled = false;
		self
	}

	pub fn is_authored_by(&self, user_id: UserId) -> bool {
		self.author_id == user_id
	}

	pub fn community_id(&self) -> Option<CommunityId> {
		self.community.map(|c| c.community_id)
	}
}

/// Attributes of a comment, together with the content it hangs off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAttrs {
	pub id: CommentId,
	pub author_id: UserId,
	pub content: ContentAttrs,
}

impl CommentAttrs {
	pub fn new(id: CommentId, author_id: UserId, content: ContentAttrs) -> Self {
		Self {
			id,
			author_id,
			content,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn content_defaults_are_restrictive() {
		let author = UserId::generate();
		let content = ContentAttrs::new(ContentId::generate(), author);
		assert_eq!(content.visibility, Visibility::Private);
		assert!(content.community.is_none());
		assert!(!content.is_paywalled);
		assert!(content.comments_enabled);
		assert!(content.is_authored_by(author));
	}

	#[test]
	fn community_builder_records_status() {
		let community_id = CommunityId::generate();
		let content = ContentAttrs::new(ContentId::generate(), UserId::generate())
			.in_community(community_id, PostStatus::Pending);
		assert_eq!(content.community_id(), Some(community_id));
		assert!(!content.community.unwrap().is_approved());
	}
}
