//! Turns an [`AnalysisResult`] into the sections shown to the user.
//!
//! Order is fixed: caption, two-column tag table, numbered tag list, color
//! summary. Sections with nothing to show are `None` and get skipped; the
//! page in `page.rs` draws them in that order.

use crate::vision::{AnalysisResult, ColorInfo};
use serde::Serialize;

/// Tags shown in the two-column table.
pub const TAG_COLUMN_LIMIT: usize = 10;
/// Tags shown in the numbered list. Anything past this is never shown.
pub const TAG_LIST_LIMIT: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub caption: Option<CaptionView>,
    pub tags: Option<TagsView>,
    pub colors: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionView {
    pub text: String,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRow {
    pub name: String,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagsView {
    pub columns: Vec<TagRow>,
    pub numbered: Vec<TagRow>,
}

pub fn confidence(value: f64) -> String {
    format!("{value:.4}")
}

impl ResultView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let caption = result.caption().map(|c| CaptionView {
            text: c.text.clone(),
            confidence: confidence(c.confidence),
        });

        let rows = |limit: usize| -> Vec<TagRow> {
            result
                .tags
                .iter()
                .take(limit)
                .map(|t| TagRow {
                    name: t.name.clone(),
                    confidence: confidence(t.confidence),
                })
                .collect()
        };
        let tags = (!result.tags.is_empty()).then(|| TagsView {
            columns: rows(TAG_COLUMN_LIMIT),
            numbered: rows(TAG_LIST_LIMIT),
        });

        Self {
            caption,
            tags,
            colors: result.color.as_ref().and_then(color_summary),
        }
    }
}

/// `"Dominant colors: Brown, White, accent #A26B2F"`
fn color_summary(color: &ColorInfo) -> Option<String> {
    let mut parts = Vec::new();
    if !color.dominant_colors.is_empty() {
        parts.push(format!("Dominant colors: {}", color.dominant_colors.join(", ")));
    }
    if let Some(accent) = color.accent.as_deref().filter(|a| !a.is_empty()) {
        parts.push(format!("accent #{accent}"));
    }
    if color.is_black_and_white {
        parts.push("black and white".to_string());
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{Caption, Tag};

    fn tags(n: usize) -> Vec<Tag> {
        (1..=n)
            .map(|i| Tag {
                name: format!("tag{i}"),
                confidence: 1.0 - i as f64 / 100.0,
            })
            .collect()
    }

    fn color(accent: Option<&str>, bw: bool) -> ColorInfo {
        ColorInfo {
            dominant_foreground: Some("Brown".to_string()),
            dominant_background: Some("White".to_string()),
            dominant_colors: vec!["Brown".to_string(), "White".to_string()],
            accent: accent.map(str::to_string),
            is_black_and_white: bw,
        }
    }

    #[test]
    fn empty_captions_leave_caption_unset() {
        let result = AnalysisResult {
            tags: tags(3),
            ..Default::default()
        };
        let view = ResultView::from_result(&result);
        assert!(view.caption.is_none());
        assert_eq!(view.tags.unwrap().numbered.len(), 3);
    }

    #[test]
    fn only_first_caption_is_kept() {
        let result = AnalysisResult {
            captions: vec![
                Caption {
                    text: "first".to_string(),
                    confidence: 0.5,
                },
                Caption {
                    text: "second".to_string(),
                    confidence: 0.4,
                },
            ],
            ..Default::default()
        };
        let caption = ResultView::from_result(&result).caption.unwrap();
        assert_eq!(caption.text, "first");
        assert_eq!(caption.confidence, "0.5000");
    }

    #[test]
    fn tag_rows_keep_service_order() {
        let result = AnalysisResult {
            tags: tags(20),
            ..Default::default()
        };
        let view = ResultView::from_result(&result);
        let tags_view = view.tags.unwrap();
        assert_eq!(tags_view.columns.len(), TAG_COLUMN_LIMIT);
        assert_eq!(tags_view.numbered.len(), TAG_LIST_LIMIT);
        assert_eq!(tags_view.numbered[0].name, "tag1");
        assert_eq!(tags_view.numbered[14].name, "tag15");
        assert_eq!(tags_view.numbered[14].confidence, "0.8500");
    }

    #[test]
    fn empty_result_has_no_sections() {
        let view = ResultView::from_result(&AnalysisResult::default());
        assert_eq!(
            view,
            ResultView {
                caption: None,
                tags: None,
                colors: None,
            }
        );
    }

    #[test]
    fn color_summary_lists_dominants_and_accent() {
        let result = AnalysisResult {
            color: Some(color(Some("A26B2F"), false)),
            ..Default::default()
        };
        assert_eq!(
            ResultView::from_result(&result).colors.as_deref(),
            Some("Dominant colors: Brown, White, accent #A26B2F")
        );
    }

    #[test]
    fn color_summary_without_accent() {
        assert_eq!(
            color_summary(&color(None, true)).as_deref(),
            Some("Dominant colors: Brown, White, black and white")
        );
        assert_eq!(color_summary(&color(Some(""), false)).as_deref(), Some("Dominant colors: Brown, White"));
    }

    #[test]
    fn confidence_has_four_places() {
        assert_eq!(confidence(0.5), "0.5000");
        assert_eq!(confidence(0.123456), "0.1235");
        assert_eq!(confidence(1.0), "1.0000");
    }
}
