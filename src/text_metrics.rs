use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in px using the first installed face of `font_family`.
///
/// Returns `None` when no face can be resolved or the text has non-ASCII characters the cached
/// advance table does not cover; callers fall back to width factors.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<AdvanceTable>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.cache.contains_key(&key) {
            let table = self.load_table(font_family);
            self.cache.insert(key.clone(), table);
        }
        self.cache.get(&key)?.as_ref()?.measure(text, font_size)
    }

    fn load_table(&mut self, font_family: &str) -> Option<AdvanceTable> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                "monospace" | "ui-monospace" => Family::Monospace,
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                Face::parse(data, index).ok().map(|face| AdvanceTable::from_face(&face))
            })
            .flatten()
    }
}

/// Horizontal advances for printable ASCII, in font units.
struct AdvanceTable {
    units_per_em: u16,
    advances: [u16; 128],
}

impl AdvanceTable {
    fn from_face(face: &Face<'_>) -> Self {
        let mut advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Self {
            units_per_em: face.units_per_em().max(1),
            advances,
        }
    }

    fn measure(&self, text: &str, font_size: f32) -> Option<f32> {
        if !text.is_ascii() {
            return None;
        }
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let width = text
            .bytes()
            .filter(|byte| *byte != b'\n')
            .map(|byte| match self.advances[byte as usize] {
                0 => fallback,
                advance => advance as f32 * scale,
            })
            .sum::<f32>();
        Some(width.max(0.0))
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
