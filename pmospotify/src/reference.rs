//! Reconnaissance des références au catalogue
//!
//! Trois formes sont acceptées :
//!
//! ```text
//! https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy    (URL web, préfixe intl-xx toléré)
//! spotify:track:11dFghVXANMlKmJXsNCbNl                    (URI de l'application)
//! spotify-playlist-37i9dQZF1DXcBWIGoYBM5M                 (forme compacte interne)
//! album-4aawyAB9vmqN3uQ7FjRGTy                            (forme compacte sans préfixe)
//! ```

use pmosource::ImportCategory;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static COMPACT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:spotify-)?(track|album|playlist)-([A-Za-z0-9]+)$").expect("valid compact pattern")
});

static APP_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^spotify:(track|album|playlist):([A-Za-z0-9]+)$").expect("valid app uri pattern")
});

/// Référence reconnue : catégorie et identifiant externe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRef {
    pub category: ImportCategory,
    pub id: String,
}

/// Entrées d'un import réparties par catégorie
///
/// Les identifiants sont dédoublonnés en conservant l'ordre d'apparition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedRefs {
    pub albums: Vec<String>,
    pub tracks: Vec<String>,
    pub playlists: Vec<String>,
    /// Entrées non reconnues, inchangées
    pub remaining: Vec<String>,
}

impl PartitionedRefs {
    /// Vrai si aucune entrée n'a été reconnue
    pub fn is_empty(&self) -> bool {
        self.albums.is_empty() && self.tracks.is_empty() && self.playlists.is_empty()
    }

    fn push(&mut self, reference: CatalogRef) {
        let bucket = match reference.category {
            ImportCategory::Album => &mut self.albums,
            ImportCategory::Track => &mut self.tracks,
            ImportCategory::Playlist => &mut self.playlists,
            ImportCategory::Artist => return,
        };
        if !bucket.contains(&reference.id) {
            bucket.push(reference.id);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceParser {
    web_domain: String,
}

impl ReferenceParser {
    pub fn new(web_domain: impl Into<String>) -> Self {
        Self {
            web_domain: web_domain.into(),
        }
    }

    pub fn web_domain(&self) -> &str {
        &self.web_domain
    }

    /// Vrai si `uri` pointe vers le site web du catalogue
    pub fn is_web_url(&self, uri: &str) -> bool {
        Url::parse(uri)
            .map(|u| u.host_str() == Some(self.web_domain.as_str()))
            .unwrap_or(false)
    }

    pub fn parse(&self, item: &str) -> Option<CatalogRef> {
        let item = item.trim();
        let captures = COMPACT_REF
            .captures(item)
            .or_else(|| APP_URI.captures(item));
        if let Some(c) = captures {
            return Some(CatalogRef {
                category: ImportCategory::parse(&c[1])?,
                id: c[2].to_string(),
            });
        }
        self.parse_web_url(item)
    }

    fn parse_web_url(&self, item: &str) -> Option<CatalogRef> {
        let url = Url::parse(item).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str() != Some(self.web_domain.as_str()) {
            return None;
        }

        let mut segments = url.path_segments()?.filter(|s| !s.is_empty()).peekable();
        if segments.peek().is_some_and(|s| s.starts_with("intl-")) {
            segments.next();
        }

        let category = match segments.next()? {
            "album" => ImportCategory::Album,
            "track" => ImportCategory::Track,
            "playlist" => ImportCategory::Playlist,
            _ => return None,
        };
        let id = segments.next()?;
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        Some(CatalogRef {
            category,
            id: id.to_string(),
        })
    }

    /// Répartit les entrées par catégorie, le reste passe dans `remaining`
    pub fn partition(&self, items: &[String]) -> PartitionedRefs {
        let mut refs = PartitionedRefs::default();
        for item in items {
            match self.parse(item) {
                Some(reference) => refs.push(reference),
                None => refs.remaining.push(item.clone()),
            }
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ReferenceParser {
        ReferenceParser::new("open.spotify.com")
    }

    #[test]
    fn test_web_urls() {
        let p = parser();
        assert_eq!(
            p.parse("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy?si=xyz"),
            Some(CatalogRef {
                category: ImportCategory::Album,
                id: "4aawyAB9vmqN3uQ7FjRGTy".into()
            })
        );
        assert_eq!(
            p.parse("https://open.spotify.com/intl-fr/track/11dFghVXANMlKmJXsNCbNl")
                .map(|r| r.category),
            Some(ImportCategory::Track)
        );
        assert!(p.parse("https://open.spotify.com/artist/0OdUWJ0sBjDrqHygGUXeCF").is_none());
        assert!(p.parse("https://example.com/album/4aawyAB9vmqN3uQ7FjRGTy").is_none());
        assert!(p.parse("https://open.spotify.com/album").is_none());
    }

    #[test]
    fn test_compact_and_app_forms() {
        let p = parser();
        assert_eq!(
            p.parse("spotify-playlist-37i9dQZF1DXcBWIGoYBM5M").map(|r| r.category),
            Some(ImportCategory::Playlist)
        );
        assert_eq!(
            p.parse("spotify:track:11dFghVXANMlKmJXsNCbNl").map(|r| r.id),
            Some("11dFghVXANMlKmJXsNCbNl".to_string())
        );
        assert_eq!(
            p.parse("album-4aawyAB9vmqN3uQ7FjRGTy").map(|r| r.category),
            Some(ImportCategory::Album)
        );
        assert!(p.parse("local-track-abc").is_none());
        assert!(p.parse("artist-0OdUWJ0sBjDrqHygGUXeCF").is_none());
        assert!(p.parse("not-a-uri").is_none());
    }

    #[test]
    fn test_partition_keeps_order_and_dedups() {
        let items: Vec<String> = [
            "spotify-album-A1",
            "not-a-uri",
            "https://open.spotify.com/album/A1",
            "spotify-track-T1",
            "spotify-album-A2",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let refs = parser().partition(&items);
        assert_eq!(refs.albums, vec!["A1", "A2"]);
        assert_eq!(refs.tracks, vec!["T1"]);
        assert!(refs.playlists.is_empty());
        assert_eq!(refs.remaining, vec!["not-a-uri"]);
        assert!(!refs.is_empty());
    }

    #[test]
    fn test_is_web_url() {
        let p = parser();
        assert!(p.is_web_url("https://open.spotify.com/track/abc"));
        assert!(!p.is_web_url("https://youtube.com/watch?v=abc"));
        assert!(!p.is_web_url(""));
    }
}
