use serde::Deserialize;

use crate::enrich::{EnrichedConfig, RecordOverride, preferred};
use crate::error::RenderError;
use crate::ir::{Rect, Scene, Text, TextAnchor};
use crate::schema::{FieldSpec, HEX_COLOR, Property, Schema};
use crate::theme::Theme;

use super::text::wrap_text;
use super::{LayoutDefinition, LayoutKind, RenderContext};

const NAME: &str = "simple";

const TITLE_SIZE: f32 = 72.0;
const DESCRIPTION_SIZE: f32 = 36.0;
const ACCENT_BAR: f32 = 12.0;
const PAD_X: f32 = 96.0;

static FIELDS: &[FieldSpec] = &[
    FieldSpec::text("Title"),
    FieldSpec::text("Description").nullable(),
    FieldSpec::one_of("Theme", &["light", "dark"]),
    FieldSpec::pattern("Accent", &HEX_COLOR),
];

const PROPERTIES: &[Property] = &[
    Property {
        name: "Title",
        default: "Hello World",
    },
    Property {
        name: "Theme",
        default: "dark",
    },
    Property {
        name: "Accent",
        default: "#a855f7",
    },
];

// The record email is not shown on this card.
const OVERRIDES: &[RecordOverride] = &[RecordOverride {
    record_field: "name",
    config_field: "Title",
}];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SimpleConfig {
    title: String,
    description: Option<String>,
    theme: String,
    accent: String,
}

pub(super) fn definition() -> LayoutDefinition {
    LayoutDefinition {
        kind: LayoutKind::Simple,
        name: NAME,
        schema: Schema { fields: FIELDS },
        properties: PROPERTIES,
        overrides: OVERRIDES,
        render,
    }
}

fn render(enriched: &EnrichedConfig, ctx: &RenderContext<'_>) -> Result<Scene, RenderError> {
    let config: SimpleConfig = enriched
        .config()
        .decode()
        .map_err(|source| RenderError::Config {
            layout: NAME,
            source,
        })?;
    let record = enriched.record_value();
    let title = preferred(record.as_ref(), OVERRIDES, "Title", &config.title);

    let palette = Theme::by_name(&config.theme).unwrap_or_else(|| ctx.theme.clone());
    let font_family = ctx.theme.font_family.clone();
    let width = ctx.width;
    let height = ctx.height;
    let max_width = width - 2.0 * PAD_X;

    let mut scene = Scene::new(width, height, palette.background.clone());
    scene.push(Rect {
        x: 0.0,
        y: 0.0,
        width,
        height: ACCENT_BAR,
        radius: 0.0,
        fill: config.accent.clone(),
    });

    let title_lines = wrap_text(title, max_width, TITLE_SIZE, &font_family, 3);
    let description_lines = config
        .description
        .as_deref()
        .map(|description| wrap_text(description, max_width, DESCRIPTION_SIZE, &font_family, 2))
        .unwrap_or_default();

    let title_line_height = 1.15;
    let description_line_height = 1.35;
    let title_block = title_lines.len() as f32 * TITLE_SIZE * title_line_height;
    let gap = if description_lines.is_empty() { 0.0 } else { 32.0 };
    let description_block =
        description_lines.len() as f32 * DESCRIPTION_SIZE * description_line_height;
    let block = title_block + gap + description_block;
    let top = ACCENT_BAR + (height - ACCENT_BAR - block) / 2.0;

    scene.push(Text {
        x: width / 2.0,
        y: top + TITLE_SIZE,
        lines: title_lines,
        font_family: font_family.clone(),
        font_size: TITLE_SIZE,
        font_weight: 800,
        line_height: title_line_height,
        fill: palette.foreground.clone(),
        anchor: TextAnchor::Middle,
    });

    if !description_lines.is_empty() {
        scene.push(Text {
            x: width / 2.0,
            y: top + title_block + gap + DESCRIPTION_SIZE,
            lines: description_lines,
            font_family,
            font_size: DESCRIPTION_SIZE,
            font_weight: 400,
            line_height: description_line_height,
            fill: palette.muted.clone(),
            anchor: TextAnchor::Middle,
        });
    }

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_svg;
    use crate::schema::{RawParams, resolve};
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
    fn light_theme_switches_palette() {
        let svg = render_with(&[("Theme", "light"), ("Accent", "#ff0066")], None);
        assert!(svg.contains(&Theme::light().background));
        assert!(svg.contains("#ff0066"));
        assert!(svg.contains("Hello World"));
    }

    #[test]
    fn description_is_optional() {
        let svg = render_with(&[], None);
        assert_eq!(svg.matches("<text").count(), 1);
        let svg = render_with(&[("Description", "Ship it")], None);
        assert!(svg.contains("Ship it"));
    }

    #[test]
    fn record_name_wins_but_email_is_ignored() {
        let svg = render_with(
            &[("Title", "Configured")],
            Some(json!({"name": "Ada", "email": "ada@x.co", "index": 3})),
        );
        assert!(svg.contains("Ada"));
        assert!(!svg.contains("Configured"));
        assert!(!svg.contains("ada@x.co"));
    }
}
