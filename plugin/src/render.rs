use crate::config::PluginConfig;
use crate::error::RenderError;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_text_mut;
use std::io::Cursor;
use std::path::Path;

// Key face rendering configuration
pub const FACE_SIZE: u32 = 72; // Logical key size expected by the host
const RENDER_SCALE: u32 = 2; // Render at 2x for anti-aliasing
const RENDER_SIZE: u32 = FACE_SIZE * RENDER_SCALE; // 144px

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);
const FOREGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Draws display values onto key-sized bitmaps
pub struct FaceRenderer {
    font: FontArc,
    font_size: f32,
}

impl FaceRenderer {
    /// Load the configured font, or the embedded sans-serif face when none is set
    pub fn from_config(config: &PluginConfig) -> Result<Self, RenderError> {
        let font = load_font(config.font_path.as_deref())?;
        Ok(Self::new(font, config.font_size))
    }

    pub fn new(font: FontArc, font_size: f32) -> Self {
        Self { font, font_size }
    }

    /// Render `text` as a single centered line on a 72×72 face.
    ///
    /// Text wider than the face is compressed horizontally until it fits.
    pub fn render(&self, text: &str) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(RENDER_SIZE, RENDER_SIZE, BACKGROUND);

        if !text.is_empty() {
            let size = self.font_size * RENDER_SCALE as f32;
            let mut scale = PxScale::from(size);

            let (mut text_width, text_height) = measure_text_bounds(text, &self.font, scale);
            if text_width > RENDER_SIZE as f32 {
                scale.x = size * RENDER_SIZE as f32 / text_width;
                text_width = measure_text_bounds(text, &self.font, scale).0;
            }

            let (x, y) = calculate_centered_position(text_width, text_height, RENDER_SIZE);
            draw_text_mut(&mut img, FOREGROUND, x, y, scale, &self.font, text);
        }

        imageops::resize(&img, FACE_SIZE, FACE_SIZE, imageops::FilterType::Lanczos3)
    }

    /// Render and encode as the `data:` URI the host's `setImage` expects
    pub fn render_data_uri(&self, text: &str) -> Result<String, RenderError> {
        encode_data_uri(&self.render(text))
    }
}

fn load_font(path: Option<&Path>) -> Result<FontArc, RenderError> {
    match path {
        Some(path) => {
            let data = std::fs::read(path).map_err(|source| RenderError::FontRead {
                path: path.display().to_string(),
                source,
            })?;
            FontArc::try_from_vec(data).map_err(|e| RenderError::InvalidFont(e.to_string()))
        }
        None => FontArc::try_from_slice(epaint_default_fonts::UBUNTU_LIGHT)
            .map_err(|e| RenderError::InvalidFont(e.to_string())),
    }
}

/// Measure text dimensions using ab_glyph metrics
/// Returns (width, height)
fn measure_text_bounds(text: &str, font: &FontArc, scale: PxScale) -> (f32, f32) {
    let scaled_font = font.as_scaled(scale);

    let width = text
        .chars()
        .map(|ch| scaled_font.h_advance(font.glyph_id(ch)))
        .sum::<f32>();
    let height = scaled_font.ascent() - scaled_font.descent();

    (width, height)
}

fn calculate_centered_position(text_width: f32, text_height: f32, canvas_size: u32) -> (i32, i32) {
    let canvas_f = canvas_size as f32;

    let x = ((canvas_f - text_width) / 2.0) as i32;
    let y = ((canvas_f - text_height) / 2.0) as i32;

    (x, y)
}

/// Encode a bitmap as a base64 PNG `data:` URI
pub fn encode_data_uri(img: &RgbaImage) -> Result<String, RenderError> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, let_assert};
    use rstest::rstest;

    fn renderer() -> FaceRenderer {
        let_assert!(Ok(renderer) = FaceRenderer::from_config(&PluginConfig::default()));
        renderer
    }

    fn lit_pixels(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p[0] > 128).count()
    }

    #[rstest]
    #[case("")]
    #[case("?")]
    #[case("21.5")]
    #[case("404")]
    #[case("a considerably longer value than fits on one key")]
    fn test_face_is_always_key_sized(#[case] text: &str) {
        let img = renderer().render(text);
        assert!(img.dimensions() == (FACE_SIZE, FACE_SIZE));
    }

    #[test]
    fn test_empty_text_is_plain_background() {
        let img = renderer().render("");
        assert!(img.pixels().all(|p| p[0] < 8 && p[1] < 8 && p[2] < 8));
    }

    #[test]
    fn test_text_is_drawn_near_center() {
        let img = renderer().render("88");

        assert!(lit_pixels(&img) > 0);
        // Corners stay background
        assert!(img.get_pixel(0, 0)[0] < 8);
        assert!(img.get_pixel(FACE_SIZE - 1, FACE_SIZE - 1)[0] < 8);

        let lit_in_middle_band = (20..52)
            .flat_map(|y| (0..FACE_SIZE).map(move |x| (x, y)))
            .filter(|&(x, y)| img.get_pixel(x, y)[0] > 128)
            .count();
        assert!(lit_in_middle_band == lit_pixels(&img));
    }

    #[test]
    fn test_long_text_is_compressed_to_fit() {
        let img = renderer().render("WWWWWWWWWWWWWWWWWWWW");

        let lit_columns: Vec<u32> = (0..FACE_SIZE)
            .filter(|&x| (0..FACE_SIZE).any(|y| img.get_pixel(x, y)[0] > 128))
            .collect();
        let_assert!(Some(first) = lit_columns.first());
        let_assert!(Some(last) = lit_columns.last());
        // Both ends of the string stay on the face
        assert!(*first < 8);
        assert!(*last > FACE_SIZE - 8);
    }

    #[test]
    fn test_data_uri_decodes_to_png_face() {
        let_assert!(Ok(uri) = renderer().render_data_uri("42"));
        let_assert!(Some(encoded) = uri.strip_prefix("data:image/png;base64,"));
        let_assert!(Ok(png) = STANDARD.decode(encoded));
        let_assert!(Ok(decoded) = image::load_from_memory_with_format(&png, ImageFormat::Png));

        assert!(decoded.width() == FACE_SIZE);
        assert!(decoded.height() == FACE_SIZE);
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let config = PluginConfig {
            font_path: Some("/nonexistent/font.ttf".into()),
            ..Default::default()
        };
        let_assert!(Err(RenderError::FontRead { .. }) = FaceRenderer::from_config(&config));
    }
}
