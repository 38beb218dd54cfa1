// src/models/content.rs

/// The closed set of content types the portal serves.
///
/// The string form doubles as the API path segment, the `content_kind`
/// discriminator stored on comments/ratings/versions, and the notification
/// room prefix. The table name is kept separate so queries can be built per
/// kind without stringly-typed call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Article,
    BlogPost,
    WikiPage,
    GalleryItem,
    Story,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Article,
        ContentKind::BlogPost,
        ContentKind::WikiPage,
        ContentKind::GalleryItem,
        ContentKind::Story,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "articles",
            ContentKind::BlogPost => "blog",
            ContentKind::WikiPage => "wiki",
            ContentKind::GalleryItem => "gallery",
            ContentKind::Story => "stories",
        }
    }

    /// Backing table. Only ever interpolated from this enum, never from
    /// request input.
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Article => "articles",
            ContentKind::BlogPost => "blog_posts",
            ContentKind::WikiPage => "wiki_pages",
            ContentKind::GalleryItem => "gallery_items",
            ContentKind::Story => "stories",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Notification room for one piece of content, e.g. "articles:42".
    pub fn room(&self, id: i64) -> String {
        format!("{}:{}", self.as_str(), id)
    }

    /// Whether edits to this kind snapshot a `content_versions` row.
    pub fn versioned(&self) -> bool {
        !matches!(self, ContentKind::GalleryItem)
    }
}

/// Parses a room name of the form `<kind>:<id>`.
pub fn parse_room(room: &str) -> Option<(ContentKind, i64)> {
    let (kind, id) = room.split_once(':')?;
    let kind = ContentKind::parse(kind)?;
    let id: i64 = id.parse().ok()?;
    if id <= 0 {
        return None;
    }
    Some((kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_every_kind() {
        for kind in ContentKind::ALL {
            assert_eq!(ContentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentKind::parse("podcasts"), None);
    }

    #[test]
    fn rooms_parse_back() {
        let room = ContentKind::WikiPage.room(9);
        assert_eq!(room, "wiki:9");
        assert_eq!(parse_room(&room), Some((ContentKind::WikiPage, 9)));
    }

    #[test]
    fn bad_rooms_are_rejected() {
        assert_eq!(parse_room("wiki"), None);
        assert_eq!(parse_room("wiki:abc"), None);
        assert_eq!(parse_room("wiki:-4"), None);
        assert_eq!(parse_room("podcasts:1"), None);
    }

    #[test]
    fn gallery_is_not_versioned() {
        assert!(!ContentKind::GalleryItem.versioned());
        assert!(ContentKind::WikiPage.versioned());
    }
}
