use serde::Deserialize;

use crate::enrich::{Attendee, EnrichedConfig, RecordOverride, preferred};
use crate::error::RenderError;
use crate::ir::{Circle, Element, Group, Image, Rect, Scene, Text, TextAnchor};
use crate::schema::{FieldSpec, Property, Schema};

use super::text::{text_width, wrap_text};
use super::{LayoutDefinition, LayoutKind, RenderContext};

const NAME: &str = "onion";

const PAD_X: f32 = 80.0;
const PAD_TOP: f32 = 80.0;
const PAD_BOTTOM: f32 = 48.0;
const LOGO_SIZE: f32 = 64.0;
const AVATAR_SIZE: f32 = 40.0;
const TITLE_SIZE: f32 = 60.0;
const DESCRIPTION_SIZE: f32 = 30.0;
const DESCRIPTION_MAX_WIDTH: f32 = 608.0;
const AUTHOR_SIZE: f32 = 28.0;
const BADGE_SIZE: f32 = 20.0;
const DATE_SIZE: f32 = 14.0;

static FIELDS: &[FieldSpec] = &[
    FieldSpec::url("TemplateImage"),
    FieldSpec::text("Title"),
    FieldSpec::text("Description"),
    FieldSpec::text("AuthorImage").nullable(),
    FieldSpec::text("AuthorName"),
    FieldSpec::text("Category").nullable(),
];

const PROPERTIES: &[Property] = &[
    Property {
        name: "TemplateImage",
        default: "https://devicons.railway.app/i/umami-dark.svg",
    },
    Property {
        name: "Title",
        default: "OnionDAO",
    },
    Property {
        name: "Description",
        default: "Web3 community for builders and creators",
    },
    Property {
        name: "AuthorImage",
        default: "https://avatars.githubusercontent.com/u/10681116?v=4",
    },
    Property {
        name: "AuthorName",
        default: "OnionDAO",
    },
    Property {
        name: "Category",
        default: "Community",
    },
];

const OVERRIDES: &[RecordOverride] = &[
    RecordOverride {
        record_field: "name",
        config_field: "Title",
    },
    RecordOverride {
        record_field: "email",
        config_field: "Description",
    },
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OnionConfig {
    template_image: String,
    title: String,
    description: String,
    author_image: Option<String>,
    author_name: String,
    category: Option<String>,
}

pub(super) fn definition() -> LayoutDefinition {
    LayoutDefinition {
        kind: LayoutKind::Onion,
        name: NAME,
        schema: Schema { fields: FIELDS },
        properties: PROPERTIES,
        overrides: OVERRIDES,
        render,
    }
}

fn render(enriched: &EnrichedConfig, ctx: &RenderContext<'_>) -> Result<Scene, RenderError> {
    let config: OnionConfig = enriched
        .config()
        .decode()
        .map_err(|source| RenderError::Config {
            layout: NAME,
            source,
        })?;
    let record = enriched.record_value();
    let attendee = enriched.attendee();
    let title = preferred(record.as_ref(), OVERRIDES, "Title", &config.title);
    let description = preferred(record.as_ref(), OVERRIDES, "Description", &config.description);

    let theme = ctx.theme;
    let width = ctx.width;
    let height = ctx.height;
    let left = PAD_X;
    let right = width - PAD_X;
    let top = PAD_TOP;
    let bottom = height - PAD_BOTTOM;

    let mut scene = Scene::new(width, height, theme.background.clone());
    scene.push(illustration(width, height, &theme.accent));

    scene.push(Image {
        x: left,
        y: top,
        width: LOGO_SIZE,
        height: LOGO_SIZE,
        href: config.template_image.clone(),
        rounded: false,
    });

    if let Some(attendee) = &attendee {
        let label = format!("Attendee #{}", attendee.index);
        let label_width = text_width(&label, BADGE_SIZE, &theme.mono_font_family);
        let badge_width = label_width + 48.0;
        let badge_height = BADGE_SIZE + 20.0;
        let badge_x = right - badge_width;
        let badge_y = top + (LOGO_SIZE - badge_height) / 2.0;
        scene.push(Rect {
            x: badge_x,
            y: badge_y,
            width: badge_width,
            height: badge_height,
            radius: badge_height / 2.0,
            fill: theme.badge_background.clone(),
        });
        scene.push(Text {
            x: badge_x + badge_width / 2.0,
            y: badge_y + badge_height / 2.0 + BADGE_SIZE * 0.35,
            lines: vec![label],
            font_family: theme.mono_font_family.clone(),
            font_size: BADGE_SIZE,
            font_weight: 400,
            line_height: 1.2,
            fill: theme.foreground.clone(),
            anchor: TextAnchor::Middle,
        });
    }

    let mut cursor = top + LOGO_SIZE + 64.0;
    if let Some(category) = config.category.as_deref() {
        scene.push(Text {
            x: left,
            y: cursor,
            lines: vec![category.to_uppercase()],
            font_family: theme.font_family.clone(),
            font_size: 18.0,
            font_weight: 600,
            line_height: 1.2,
            fill: theme.accent.clone(),
            anchor: TextAnchor::Start,
        });
        cursor += 24.0;
    }

    let title_lines = wrap_text(title, right - left, TITLE_SIZE, &theme.font_family, 2);
    let title_line_height = 1.1;
    cursor += TITLE_SIZE;
    let title_block = title_lines.len() as f32 * TITLE_SIZE * title_line_height;
    scene.push(Text {
        x: left,
        y: cursor,
        lines: title_lines,
        font_family: theme.font_family.clone(),
        font_size: TITLE_SIZE,
        font_weight: 700,
        line_height: title_line_height,
        fill: theme.foreground.clone(),
        anchor: TextAnchor::Start,
    });
    cursor += title_block - TITLE_SIZE * title_line_height + 16.0;

    let description_lines = wrap_text(
        description,
        DESCRIPTION_MAX_WIDTH.min(right - left),
        DESCRIPTION_SIZE,
        &theme.font_family,
        3,
    );
    scene.push(Text {
        x: left,
        y: cursor + DESCRIPTION_SIZE * 1.6,
        lines: description_lines,
        font_family: theme.font_family.clone(),
        font_size: DESCRIPTION_SIZE,
        font_weight: 400,
        line_height: 1.3,
        fill: theme.muted.clone(),
        anchor: TextAnchor::Start,
    });

    let mut author_x = left;
    if let Some(author_image) = config.author_image.as_deref() {
        scene.push(Image {
            x: left,
            y: bottom - AVATAR_SIZE,
            width: AVATAR_SIZE,
            height: AVATAR_SIZE,
            href: author_image.to_string(),
            rounded: true,
        });
        author_x += AVATAR_SIZE + 20.0;
    }
    scene.push(Text {
        x: author_x,
        y: bottom - AVATAR_SIZE / 2.0 + AUTHOR_SIZE * 0.35,
        lines: vec![config.author_name.clone()],
        font_family: theme.font_family.clone(),
        font_size: AUTHOR_SIZE,
        font_weight: 400,
        line_height: 1.2,
        fill: theme.muted.clone(),
        anchor: TextAnchor::Start,
    });

    if let Some(date) = attendee.as_ref().and_then(created_date) {
        scene.push(Text {
            x: right,
            y: bottom - 4.0,
            lines: vec![date],
            font_family: theme.mono_font_family.clone(),
            font_size: DATE_SIZE,
            font_weight: 400,
            line_height: 1.2,
            fill: theme.muted.clone(),
            anchor: TextAnchor::End,
        });
    }

    Ok(scene)
}

/// `M/D/YYYY` in the timestamp's own offset.
fn created_date(attendee: &Attendee) -> Option<String> {
    match chrono::DateTime::parse_from_rfc3339(&attendee.created_at) {
        Ok(created) => Some(created.format("%-m/%-d/%Y").to_string()),
        Err(err) => {
            tracing::debug!(error = %err, created_at = %attendee.created_at, "unparsable createdAt");
            None
        }
    }
}

/// Concentric rings anchored to the right edge.
fn illustration(width: f32, height: f32, accent: &str) -> Element {
    let cx = width * 0.84;
    let cy = height * 0.58;
    let mut children: Vec<Element> = (1..=7)
        .map(|ring| {
            Element::Circle(Circle {
                cx,
                cy,
                r: 48.0 * ring as f32,
                fill: None,
                stroke: Some(accent.to_string()),
                stroke_width: 2.0,
            })
        })
        .collect();
    children.push(Element::Circle(Circle {
        cx,
        cy,
        r: 24.0,
        fill: Some(accent.to_string()),
        stroke: None,
        stroke_width: 0.0,
    }));
    Element::Group(Group {
        opacity: 0.2,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_svg;
    use crate::schema::{RawParams, resolve};
    use crate::theme::Theme;
    use serde_json::json;

    fn render_with(params: &[(&str, &str)], record: Option<serde_json::Value>) -> String {
        let definition = definition();
        let raw: RawParams = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = resolve(&definition, &raw).unwrap();
        let enriched = EnrichedConfig::new(config, record.map(|value| value.to_string()));
        let theme = Theme::dark();
        let ctx = RenderContext {
            theme: &theme,
            width: 1200.0,
            height: 630.0,
        };
        render_svg(&definition.render(&enriched, &ctx).unwrap()).unwrap()
    }

    #[test]
    fn renders_configuration_without_record() {
        let svg = render_with(&[("Title", "Hack Night")], None);
        assert!(svg.contains("Hack Night"));
        assert!(svg.contains("Web3 community"));
        assert!(svg.contains("creators"));
        assert!(svg.contains("umami-dark.svg"));
        assert!(!svg.contains("Attendee #"));
    }

    #[test]
    fn record_fields_replace_title_and_description() {
        let record = json!({
            "id": "r3",
            "createdAt": "2024-01-01T00:00:00Z",
            "index": 3,
            "name": "Ada",
            "email": "ada@x.co"
        });
        let svg = render_with(&[], Some(record));
        assert!(svg.contains(">Ada<"));
        assert!(svg.contains("ada@x.co"));
        assert!(svg.contains("Attendee #3"));
        assert!(svg.contains("1/1/2024"));
        assert!(!svg.contains("Web3 community"));
    }

    #[test]
    fn partial_record_keeps_config_fallbacks() {
        let svg = render_with(&[], Some(json!({"name": "Grace"})));
        assert!(svg.contains("Grace"));
        assert!(svg.contains("Web3 community"));
        assert!(!svg.contains("Attendee #"));
    }

    #[test]
    fn category_and_author_are_drawn() {
        let svg = render_with(&[("Category", "Meetup"), ("AuthorName", "Railway")], None);
        assert!(svg.contains("MEETUP"));
        assert!(svg.contains("Railway"));
        assert!(svg.contains("clip-path"));
    }
}
