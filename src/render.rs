use crate::config::RenderConfig;
use crate::error::{RasterError, RenderError};
use crate::ir::{Circle, Element, Group, Image, Rect, Scene, Text};
#[cfg(feature = "png")]
use std::sync::Arc;

/// Serializes a scene to an SVG document.
///
/// Output depends only on the scene: numbers are printed with fixed precision and clip paths are
/// numbered in document order.
pub fn render_svg(scene: &Scene) -> Result<String, RenderError> {
    if !(scene.width.is_finite() && scene.height.is_finite())
        || scene.width <= 0.0
        || scene.height <= 0.0
    {
        return Err(RenderError::EmptyCanvas {
            width: scene.width,
            height: scene.height,
        });
    }

    let mut svg = String::new();
    let width = scene.width;
    let height = scene.height;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&scene.background)
    ));

    let mut writer = SvgWriter {
        out: svg,
        next_clip: 0,
    };
    for element in &scene.children {
        writer.element(element)?;
    }

    let mut svg = writer.out;
    svg.push_str("</svg>");
    Ok(svg)
}

struct SvgWriter {
    out: String,
    next_clip: usize,
}

impl SvgWriter {
    fn element(&mut self, element: &Element) -> Result<(), RenderError> {
        match element {
            Element::Rect(rect) => self.rect(rect),
            Element::Circle(circle) => self.circle(circle),
            Element::Text(text) => self.text(text),
            Element::Image(image) => self.image(image),
            Element::Group(group) => self.group(group),
        }
    }

    fn rect(&mut self, rect: &Rect) -> Result<(), RenderError> {
        ensure_finite("rect", &[rect.x, rect.y, rect.width, rect.height, rect.radius])?;
        self.out.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"{}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            rect.radius,
            rect.radius,
            escape_xml(&rect.fill)
        ));
        Ok(())
    }

    fn circle(&mut self, circle: &Circle) -> Result<(), RenderError> {
        ensure_finite("circle", &[circle.cx, circle.cy, circle.r, circle.stroke_width])?;
        let fill = circle.fill.as_deref().unwrap_or("none");
        self.out.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"",
            circle.cx,
            circle.cy,
            circle.r,
            escape_xml(fill)
        ));
        if let Some(stroke) = &circle.stroke {
            self.out.push_str(&format!(
                " stroke=\"{}\" stroke-width=\"{:.2}\"",
                escape_xml(stroke),
                circle.stroke_width
            ));
        }
        self.out.push_str("/>");
        Ok(())
    }

    fn text(&mut self, text: &Text) -> Result<(), RenderError> {
        ensure_finite("text", &[text.x, text.y, text.font_size, text.line_height])?;
        let x = text.x;
        self.out.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"{}\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"{}\" fill=\"{}\">",
            text.y,
            text.anchor.as_str(),
            escape_xml(&text.font_family),
            text.font_size,
            text.font_weight,
            escape_xml(&text.fill)
        ));
        let dy = text.font_size * text.line_height;
        for (idx, line) in text.lines.iter().enumerate() {
            if idx == 0 {
                self.out
                    .push_str(&format!("<tspan x=\"{x:.2}\" dy=\"0\">{}", escape_xml(line)));
            } else {
                self.out.push_str(&format!(
                    "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}",
                    escape_xml(line)
                ));
            }
            self.out.push_str("</tspan>");
        }
        self.out.push_str("</text>");
        Ok(())
    }

    fn image(&mut self, image: &Image) -> Result<(), RenderError> {
        ensure_finite("image", &[image.x, image.y, image.width, image.height])?;
        let mut clip_attr = String::new();
        if image.rounded {
            let id = format!("clip-{}", self.next_clip);
            self.next_clip += 1;
            let r = image.width.min(image.height) / 2.0;
            self.out.push_str(&format!(
                "<clipPath id=\"{id}\"><circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"/></clipPath>",
                image.x + image.width / 2.0,
                image.y + image.height / 2.0,
                r
            ));
            clip_attr = format!(" clip-path=\"url(#{id})\"");
        }
        let href = escape_xml(&image.href);
        self.out.push_str(&format!(
            "<image x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" href=\"{href}\" xlink:href=\"{href}\" preserveAspectRatio=\"xMidYMid slice\"{clip_attr}/>",
            image.x, image.y, image.width, image.height
        ));
        Ok(())
    }

    fn group(&mut self, group: &Group) -> Result<(), RenderError> {
        ensure_finite("group", &[group.opacity])?;
        if (group.opacity - 1.0).abs() < f32::EPSILON {
            self.out.push_str("<g>");
        } else {
            self.out
                .push_str(&format!("<g opacity=\"{:.2}\">", group.opacity.clamp(0.0, 1.0)));
        }
        for child in &group.children {
            self.element(child)?;
        }
        self.out.push_str("</g>");
        Ok(())
    }
}

fn ensure_finite(element: &'static str, values: &[f32]) -> Result<(), RenderError> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(RenderError::InvalidGeometry { element })
    }
}

/// Escapes markup characters. Characters XML 1.0 does not allow become U+FFFD.
pub(crate) fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            ch if is_xml_char(ch) => out.push(ch),
            _ => out.push(char::REPLACEMENT_CHARACTER),
        }
    }
    out
}

fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// SVG to PNG conversion with a font database loaded once.
#[derive(Clone)]
pub struct Rasterizer {
    #[cfg(feature = "png")]
    fontdb: Arc<usvg::fontdb::Database>,
    width: f32,
    height: f32,
    font_family: String,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("font_family", &self.font_family)
            .finish_non_exhaustive()
    }
}

impl Rasterizer {
    /// Loads system fonts. Call once at startup and share the result.
    pub fn new(render_cfg: &RenderConfig) -> Self {
        #[cfg(feature = "png")]
        let fontdb = {
            let mut db = usvg::fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded system fonts for rasterization");
            Arc::new(db)
        };
        Self {
            #[cfg(feature = "png")]
            fontdb,
            width: render_cfg.width,
            height: render_cfg.height,
            font_family: render_cfg.font_family.clone(),
        }
    }

    #[cfg(feature = "png")]
    pub fn rasterize(&self, svg: &str) -> Result<Vec<u8>, RasterError> {
        let mut opt = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..usvg::Options::default()
        };
        opt.font_family = self.font_family.clone();
        if let Some(size) = usvg::Size::from_wh(self.width, self.height) {
            opt.default_size = size;
        }

        let tree = usvg::Tree::from_str(svg, &opt)?;
        let size = tree.size().to_int_size();
        let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height()).ok_or(
            RasterError::Allocation {
                width: size.width(),
                height: size.height(),
            },
        )?;

        let mut pixmap_mut = pixmap.as_mut();
        resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
        pixmap
            .encode_png()
            .map_err(|err| RasterError::Encode(err.to_string()))
    }

    #[cfg(not(feature = "png"))]
    pub fn rasterize(&self, _svg: &str) -> Result<Vec<u8>, RasterError> {
        Err(RasterError::Unsupported)
    }
}
