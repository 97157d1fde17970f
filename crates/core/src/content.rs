//! Admin-authored page content and the page resolver.
//!
//! A product may carry a [`ContentConfig`]: an ordered list of pages,
//! background art keyed by page index and combination key, positioned
//! text templates and positioned stickers. At render time each displayed
//! page is resolved against the buyer's configuration into a flat render
//! description; products authored before the content editor existed fall
//! back to a flat, already-generated story-page list instead.
//!
//! Pagination, flip animation and actual placement belong to the
//! rendering surface; this module only decides *what* goes on a page.

use serde::{Deserialize, Serialize};

use crate::combination::{combination_key, AvatarMapping, DEFAULT_COMBINATION_KEY};
use crate::configuration::ResolvedConfiguration;
use crate::error::CoreError;
use crate::schema::CustomizationSchema;
use crate::substitution::substitute;

// ---------------------------------------------------------------------------
// Authored content model
// ---------------------------------------------------------------------------

/// The authored page content for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentConfig {
    /// Ordered pages; layer entries reference a page by its index in
    /// this list.
    pub pages: Vec<PageDefinition>,
    #[serde(default)]
    pub images: Vec<BackgroundImage>,
    #[serde(default)]
    pub texts: Vec<TextElement>,
    #[serde(default)]
    pub image_elements: Vec<ImageElement>,
}

/// One authored page slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDefinition {
    /// The page number the rendering surface displays for this slot
    /// (1-based, counting front matter).
    pub page_number: u32,
}

/// Background art for one page and one combination of choices. The
/// reserved combination key [`DEFAULT_COMBINATION_KEY`] marks the
/// fallback used when no art exists for the live combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundImage {
    pub page_index: u32,
    pub combination_key: String,
    pub url: String,
}

/// Placement of a text or sticker element on a page, in percent of the
/// page box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub page_index: u32,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

/// A positioned text template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    pub template: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A positioned sticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    #[serde(flatten)]
    pub source: ImageElementSource,
    pub position: Position,
}

/// Where a sticker's artwork comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageElementSource {
    /// A fixed URL.
    Static { url: String },
    /// Artwork following a tab's live combination key through the
    /// product's avatar mapping, with an optional fixed fallback.
    Variable {
        #[serde(rename = "tabId")]
        tab_id: String,
        #[serde(
            default,
            rename = "fallbackUrl",
            skip_serializing_if = "Option::is_none"
        )]
        fallback_url: Option<String>,
    },
}

impl ContentConfig {
    /// The index of the authored page displayed as `page_number`.
    pub fn page_index_for_number(&self, page_number: u32) -> Option<u32> {
        self.pages
            .iter()
            .position(|p| p.page_number == page_number)
            .map(|i| i as u32)
    }
}

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

/// Validate an authored content config once, at catalog load.
pub fn validate_content_config(content: &ContentConfig) -> Result<(), CoreError> {
    if content.pages.is_empty() {
        return Err(CoreError::Validation(
            "Content config must declare at least one page".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for page in &content.pages {
        if !seen.insert(page.page_number) {
            return Err(CoreError::Validation(format!(
                "Duplicate page number {}",
                page.page_number
            )));
        }
    }
    for image in &content.images {
        if image.combination_key.is_empty() {
            return Err(CoreError::Validation(format!(
                "Background image for page index {} has an empty combination key",
                image.page_index
            )));
        }
        if image.url.is_empty() {
            return Err(CoreError::Validation(format!(
                "Background image for page index {} has an empty url",
                image.page_index
            )));
        }
    }
    for element in &content.image_elements {
        match &element.source {
            ImageElementSource::Static { url } if url.is_empty() => {
                return Err(CoreError::Validation(format!(
                    "Static image element on page index {} has an empty url",
                    element.position.page_index
                )));
            }
            ImageElementSource::Variable { tab_id, .. } if tab_id.is_empty() => {
                return Err(CoreError::Validation(format!(
                    "Variable image element on page index {} names no tab",
                    element.position.page_index
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Resolved output
// ---------------------------------------------------------------------------

/// Render description for one authored page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPage {
    pub page_index: u32,
    /// Background art for the live combination, or `None` when neither a
    /// live-key nor a default-key image is authored.
    pub background_url: Option<String>,
    /// Substituted texts, in authored order.
    pub texts: Vec<PlacedText>,
    /// Resolved stickers, in authored order. Stickers with no resolvable
    /// artwork are dropped rather than rendered broken.
    pub stickers: Vec<PlacedSticker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedText {
    pub text: String,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedSticker {
    pub url: String,
    pub position: Position,
}

/// What the rendering surface should show for one displayed page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolvedPageContent {
    /// Admin-authored content.
    Authored(ResolvedPage),
    /// Legacy flat story text (no combination-key logic).
    Legacy { text: String },
    /// Nothing authored for this page.
    Empty,
}

// ---------------------------------------------------------------------------
// Page resolution
// ---------------------------------------------------------------------------

/// Resolve one authored page against the buyer's configuration.
///
/// Returns `None` when `page_index` has no page definition. Background
/// art prefers the live combination key over the reserved default key;
/// text templates run through placeholder substitution; variable
/// stickers follow their owning tab's combination key through the avatar
/// mapping, then their own fallback URL, and are dropped when neither
/// resolves.
pub fn resolve_page(
    page_index: u32,
    content: &ContentConfig,
    schema: &CustomizationSchema,
    config: &ResolvedConfiguration,
    avatars: &AvatarMapping,
    live_key: &str,
) -> Option<ResolvedPage> {
    if page_index as usize >= content.pages.len() {
        return None;
    }

    let background_url = select_background(content, page_index, live_key).map(str::to_string);

    let texts = content
        .texts
        .iter()
        .filter(|t| t.position.page_index == page_index)
        .map(|t| PlacedText {
            text: substitute(&t.template, config).text,
            position: t.position.clone(),
            font_size: t.font_size,
            color: t.color.clone(),
        })
        .collect();

    let stickers = content
        .image_elements
        .iter()
        .filter(|e| e.position.page_index == page_index)
        .filter_map(|e| {
            resolve_sticker(e, schema, config, avatars).map(|url| PlacedSticker {
                url,
                position: e.position.clone(),
            })
        })
        .collect();

    Some(ResolvedPage {
        page_index,
        background_url,
        texts,
        stickers,
    })
}

/// Pick the background for a page: live-key entry first, default-key
/// entry second.
fn select_background<'a>(
    content: &'a ContentConfig,
    page_index: u32,
    live_key: &str,
) -> Option<&'a str> {
    let candidates = content
        .images
        .iter()
        .filter(|i| i.page_index == page_index);
    let mut fallback = None;
    for image in candidates {
        if image.combination_key == live_key {
            return Some(image.url.as_str());
        }
        if image.combination_key == DEFAULT_COMBINATION_KEY {
            fallback = Some(image.url.as_str());
        }
    }
    fallback
}

fn resolve_sticker(
    element: &ImageElement,
    schema: &CustomizationSchema,
    config: &ResolvedConfiguration,
    avatars: &AvatarMapping,
) -> Option<String> {
    match &element.source {
        ImageElementSource::Static { url } => Some(url.clone()),
        ImageElementSource::Variable {
            tab_id,
            fallback_url,
        } => {
            let mapped = schema.tab(tab_id).and_then(|tab| {
                let key = config
                    .character(tab_id)
                    .map(|selections| combination_key(tab, selections))
                    .unwrap_or_else(|| DEFAULT_COMBINATION_KEY.to_string());
                avatars.resolve(tab_id, &key).map(str::to_string)
            });
            let resolved = mapped.or_else(|| fallback_url.clone());
            if resolved.is_none() {
                tracing::debug!(%tab_id, "variable image element dropped, nothing to render");
            }
            resolved
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy story fallback
// ---------------------------------------------------------------------------

/// Resolve a displayed page number against the legacy flat story-page
/// list: 1-indexed after `front_matter_pages` fixed pages.
pub fn legacy_story_page<'a>(
    story_pages: &'a [String],
    display_number: u32,
    front_matter_pages: u32,
) -> Option<&'a str> {
    let story_number = display_number.checked_sub(front_matter_pages)?;
    let index = story_number.checked_sub(1)? as usize;
    story_pages.get(index).map(String::as_str)
}

/// Everything page resolution needs for one rendered book: the product's
/// authored inputs plus the buyer's finalized configuration.
#[derive(Debug, Clone, Copy)]
pub struct BookContext<'a> {
    pub schema: &'a CustomizationSchema,
    pub config: &'a ResolvedConfiguration,
    pub avatars: &'a AvatarMapping,
    /// Authored content; `None` switches the whole book to legacy mode.
    pub content: Option<&'a ContentConfig>,
    /// Legacy flat story list, used only when `content` is `None`.
    pub story_pages: &'a [String],
    /// Fixed pages (cover, title) displayed before story content in
    /// legacy mode.
    pub front_matter_pages: u32,
}

impl BookContext<'_> {
    /// Resolve what to render for one displayed page, dispatching
    /// between authored content and the legacy story list.
    pub fn resolve_display_page(&self, display_number: u32, live_key: &str) -> ResolvedPageContent {
        match self.content {
            Some(content) => content
                .page_index_for_number(display_number)
                .and_then(|page_index| {
                    resolve_page(
                        page_index,
                        content,
                        self.schema,
                        self.config,
                        self.avatars,
                        live_key,
                    )
                })
                .map(ResolvedPageContent::Authored)
                .unwrap_or(ResolvedPageContent::Empty),
            None => {
                match legacy_story_page(self.story_pages, display_number, self.front_matter_pages)
                {
                    Some(text) => ResolvedPageContent::Legacy {
                        text: text.to_string(),
                    },
                    None => ResolvedPageContent::Empty,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;

    use super::*;
    use crate::schema::{OptionChoice, Tab, TabKind, Variant, VariantKind};
    use crate::selection::SelectionValues;
    use crate::types::Timestamp;

    fn schema() -> CustomizationSchema {
        CustomizationSchema {
            tabs: vec![Tab {
                id: "child".to_string(),
                label: "Child".to_string(),
                kind: TabKind::Character,
                variants: vec![
                    Variant {
                        id: "name".to_string(),
                        label: "Name".to_string(),
                        show_label: true,
                        kind: VariantKind::Text {
                            min_length: None,
                            max_length: None,
                        },
                    },
                    Variant {
                        id: "hairColor".to_string(),
                        label: "Hair".to_string(),
                        show_label: false,
                        kind: VariantKind::Options {
                            options: vec![
                                OptionChoice {
                                    id: "blonde".to_string(),
                                    label: "Blonde".to_string(),
                                    resource: None,
                                    thumbnail: None,
                                },
                                OptionChoice {
                                    id: "brown".to_string(),
                                    label: "Brown".to_string(),
                                    resource: None,
                                    thumbnail: None,
                                },
                            ],
                        },
                    },
                ],
            }],
        }
    }

    fn config(hair: &str) -> ResolvedConfiguration {
        let mut characters: SelectionValues = BTreeMap::new();
        let child = characters.entry("child".to_string()).or_default();
        child.insert("name".to_string(), "Léa".to_string());
        child.insert("hairColor".to_string(), hair.to_string());

        ResolvedConfiguration {
            id: uuid::Uuid::nil(),
            product_id: "book-1".to_string(),
            name: Some("Léa".to_string()),
            characters,
            appearance: BTreeMap::new(),
            dedication: None,
            author: None,
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    fn position(page_index: u32) -> Position {
        Position {
            page_index,
            x: 10.0,
            y: 20.0,
            width: None,
            height: None,
            rotation: None,
        }
    }

    fn content() -> ContentConfig {
        ContentConfig {
            pages: vec![
                PageDefinition { page_number: 2 },
                PageDefinition { page_number: 3 },
            ],
            images: vec![
                BackgroundImage {
                    page_index: 0,
                    combination_key: "brown".to_string(),
                    url: "/bg/p0-brown.jpg".to_string(),
                },
                BackgroundImage {
                    page_index: 0,
                    combination_key: DEFAULT_COMBINATION_KEY.to_string(),
                    url: "/bg/p0-default.jpg".to_string(),
                },
            ],
            texts: vec![
                TextElement {
                    template: "Bonjour {child.name}".to_string(),
                    position: position(0),
                    font_size: Some(18.0),
                    color: None,
                },
                TextElement {
                    template: "Page two text".to_string(),
                    position: position(1),
                    font_size: None,
                    color: None,
                },
            ],
            image_elements: vec![
                ImageElement {
                    source: ImageElementSource::Static {
                        url: "/stickers/star.png".to_string(),
                    },
                    position: position(0),
                },
                ImageElement {
                    source: ImageElementSource::Variable {
                        tab_id: "child".to_string(),
                        fallback_url: Some("/stickers/child-generic.png".to_string()),
                    },
                    position: position(0),
                },
            ],
        }
    }

    fn avatars(pairs: &[(&str, &str)]) -> AvatarMapping {
        AvatarMapping::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    // -- wire shape --

    #[test]
    fn deserializes_authored_json() {
        let json = r#"{
            "pages": [{"pageNumber": 2}],
            "images": [{"pageIndex": 0, "combinationKey": "brown", "url": "/bg.jpg"}],
            "texts": [{"template": "Hi {child.name}", "position": {"pageIndex": 0, "x": 5, "y": 5}}],
            "imageElements": [
                {"type": "static", "url": "/s.png", "position": {"pageIndex": 0, "x": 1, "y": 1}},
                {"type": "variable", "tabId": "child", "fallbackUrl": "/f.png",
                 "position": {"pageIndex": 0, "x": 2, "y": 2}}
            ]
        }"#;
        let content: ContentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(content.pages[0].page_number, 2);
        assert_matches!(
            &content.image_elements[1].source,
            ImageElementSource::Variable { tab_id, .. } if tab_id == "child"
        );
    }

    // -- validation --

    #[test]
    fn validates_a_well_formed_config() {
        assert!(validate_content_config(&content()).is_ok());
    }

    #[test]
    fn rejects_empty_page_list() {
        let mut content = content();
        content.pages.clear();
        let err = validate_content_config(&content).unwrap_err();
        assert!(err.to_string().contains("at least one page"));
    }

    #[test]
    fn rejects_duplicate_page_numbers() {
        let mut content = content();
        content.pages.push(PageDefinition { page_number: 2 });
        let err = validate_content_config(&content).unwrap_err();
        assert!(err.to_string().contains("Duplicate page number"));
    }

    #[test]
    fn rejects_background_with_empty_combination_key() {
        let mut content = content();
        content.images[0].combination_key.clear();
        let err = validate_content_config(&content).unwrap_err();
        assert!(err.to_string().contains("empty combination key"));
    }

    #[test]
    fn rejects_variable_element_without_tab() {
        let mut content = content();
        content.image_elements.push(ImageElement {
            source: ImageElementSource::Variable {
                tab_id: String::new(),
                fallback_url: None,
            },
            position: position(0),
        });
        let err = validate_content_config(&content).unwrap_err();
        assert!(err.to_string().contains("names no tab"));
    }

    // -- background selection --

    #[test]
    fn live_key_background_beats_default() {
        let page = resolve_page(0, &content(), &schema(), &config("brown"), &avatars(&[]), "brown")
            .unwrap();
        assert_eq!(page.background_url.as_deref(), Some("/bg/p0-brown.jpg"));
    }

    #[test]
    fn default_background_used_when_live_key_has_no_art() {
        let page = resolve_page(
            0,
            &content(),
            &schema(),
            &config("blonde"),
            &avatars(&[]),
            "blonde",
        )
        .unwrap();
        assert_eq!(page.background_url.as_deref(), Some("/bg/p0-default.jpg"));
    }

    #[test]
    fn page_without_art_has_no_background() {
        let page = resolve_page(1, &content(), &schema(), &config("brown"), &avatars(&[]), "brown")
            .unwrap();
        assert_eq!(page.background_url, None);
    }

    // -- text layer --

    #[test]
    fn texts_are_substituted_and_filtered_by_page() {
        let page = resolve_page(0, &content(), &schema(), &config("brown"), &avatars(&[]), "brown")
            .unwrap();
        assert_eq!(page.texts.len(), 1);
        assert_eq!(page.texts[0].text, "Bonjour Léa");
        assert_eq!(page.texts[0].font_size, Some(18.0));
    }

    // -- sticker layer --

    #[test]
    fn static_sticker_uses_its_fixed_url() {
        let page = resolve_page(0, &content(), &schema(), &config("brown"), &avatars(&[]), "brown")
            .unwrap();
        assert_eq!(page.stickers[0].url, "/stickers/star.png");
    }

    #[test]
    fn variable_sticker_follows_the_tab_combination_key() {
        let page = resolve_page(
            0,
            &content(),
            &schema(),
            &config("brown"),
            &avatars(&[("child:brown", "/avatars/child-brown.png")]),
            "brown",
        )
        .unwrap();
        assert_eq!(page.stickers[1].url, "/avatars/child-brown.png");
    }

    #[test]
    fn variable_sticker_falls_back_to_its_own_url() {
        let page = resolve_page(0, &content(), &schema(), &config("brown"), &avatars(&[]), "brown")
            .unwrap();
        assert_eq!(page.stickers[1].url, "/stickers/child-generic.png");
    }

    #[test]
    fn variable_sticker_without_any_artwork_is_dropped() {
        let mut content = content();
        content.image_elements[1] = ImageElement {
            source: ImageElementSource::Variable {
                tab_id: "child".to_string(),
                fallback_url: None,
            },
            position: position(0),
        };
        let page = resolve_page(0, &content, &schema(), &config("brown"), &avatars(&[]), "brown")
            .unwrap();
        assert_eq!(page.stickers.len(), 1);
    }

    #[test]
    fn out_of_range_page_index_resolves_to_none() {
        assert!(resolve_page(9, &content(), &schema(), &config("brown"), &avatars(&[]), "brown")
            .is_none());
    }

    // -- legacy fallback --

    #[test]
    fn legacy_pages_are_one_indexed_after_front_matter() {
        let story = vec!["first".to_string(), "second".to_string()];
        assert_eq!(legacy_story_page(&story, 3, 2), Some("first"));
        assert_eq!(legacy_story_page(&story, 4, 2), Some("second"));
    }

    #[test]
    fn legacy_front_matter_pages_resolve_to_none() {
        let story = vec!["first".to_string()];
        assert_eq!(legacy_story_page(&story, 2, 2), None);
        assert_eq!(legacy_story_page(&story, 0, 2), None);
    }

    #[test]
    fn legacy_past_the_end_resolves_to_none() {
        let story = vec!["first".to_string()];
        assert_eq!(legacy_story_page(&story, 9, 2), None);
    }

    // -- dispatcher --

    #[test]
    fn dispatcher_prefers_authored_content() {
        let schema = schema();
        let config = config("brown");
        let content = content();
        let story = vec!["legacy".to_string()];
        let avatars = avatars(&[]);
        let context = BookContext {
            schema: &schema,
            config: &config,
            avatars: &avatars,
            content: Some(&content),
            story_pages: &story,
            front_matter_pages: 1,
        };

        let result = context.resolve_display_page(2, "brown");
        assert_matches!(result, ResolvedPageContent::Authored(page) => {
            assert_eq!(page.page_index, 0);
        });
    }

    #[test]
    fn dispatcher_falls_back_to_legacy_story() {
        let schema = schema();
        let config = config("brown");
        let story = vec!["once upon a time".to_string()];
        let avatars = avatars(&[]);
        let context = BookContext {
            schema: &schema,
            config: &config,
            avatars: &avatars,
            content: None,
            story_pages: &story,
            front_matter_pages: 1,
        };

        let result = context.resolve_display_page(2, "brown");
        assert_matches!(result, ResolvedPageContent::Legacy { text } => {
            assert_eq!(text, "once upon a time");
        });
    }

    #[test]
    fn dispatcher_marks_unknown_pages_empty() {
        let schema = schema();
        let config = config("brown");
        let content = content();
        let avatars = avatars(&[]);
        let context = BookContext {
            schema: &schema,
            config: &config,
            avatars: &avatars,
            content: Some(&content),
            story_pages: &[],
            front_matter_pages: 1,
        };

        assert_matches!(
            context.resolve_display_page(99, "brown"),
            ResolvedPageContent::Empty
        );
    }
}
