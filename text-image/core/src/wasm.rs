//! WebAssembly bindings for the browser page.

use wasm_bindgen::prelude::*;

use crate::geometry::Geometry;
use crate::{Config, Rendering, Session};

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct TextImage {
    session: Session,
    config: Config,
    last: Option<Rendering>,
}

#[wasm_bindgen]
impl TextImage {
    #[wasm_bindgen(constructor)]
    pub fn new() -> TextImage {
        TextImage {
            session: Session::new(),
            config: Config::default(),
            last: None,
        }
    }

    /// Decodes a file, paste or drop payload. A failure keeps the old image.
    #[wasm_bindgen]
    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        self.session.load(bytes).map_err(js_error)?;
        self.last = None;
        Ok(())
    }

    /// Replaces the settings with a JSON object; missing keys take defaults.
    #[wasm_bindgen]
    pub fn set_config(&mut self, json: &str) -> Result<(), JsValue> {
        self.config = serde_json::from_str(json).map_err(js_error)?;
        Ok(())
    }

    /// Current settings, including any size reverted by a declined render.
    #[wasm_bindgen]
    pub fn config(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.config).map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn set_lock_aspect(&mut self, lock: bool) {
        self.session.set_lock_aspect(&mut self.config, lock);
    }

    /// Grid `[width, height]` the current settings resolve to; empty while
    /// no image is loaded.
    #[wasm_bindgen]
    pub fn grid_size(&self) -> Vec<u32> {
        self.session
            .image()
            .map(|image| {
                let geometry = self.config.geometry_for(image);
                vec![geometry.width, geometry.height]
            })
            .unwrap_or_default()
    }

    /// Runs the pipeline. `confirm_large` answers the large-output prompt;
    /// the host asks the user beforehand using [`TextImage::grid_size`].
    #[wasm_bindgen]
    pub fn render(&mut self, confirm_large: bool) -> Result<String, JsValue> {
        let mut confirm = |_: &Geometry| confirm_large;
        let rendering = self
            .session
            .regenerate(&mut self.config, &mut confirm)
            .map_err(js_error)?;
        let text = rendering.text.clone();
        self.last = Some(rendering);
        Ok(text)
    }

    #[wasm_bindgen]
    pub fn size_label(&self) -> Option<String> {
        self.last.as_ref().map(|r| r.geometry.size_label())
    }

    /// Outline size `[width, height]` for the preview frame.
    #[wasm_bindgen]
    pub fn control_size(&self) -> Vec<u32> {
        self.last
            .as_ref()
            .map(|r| vec![r.geometry.control_width, r.geometry.control_height])
            .unwrap_or_default()
    }

    /// RGBA bytes of the thresholded preview, row-major.
    #[wasm_bindgen]
    pub fn preview_rgba(&self) -> Vec<u8> {
        self.last
            .as_ref()
            .map(|r| r.preview.as_raw().clone())
            .unwrap_or_default()
    }
}

impl Default for TextImage {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot conversion without session state.
#[wasm_bindgen]
pub fn convert_image(bytes: &[u8], config_json: &str) -> Result<String, JsValue> {
    let config: Config = serde_json::from_str(config_json).map_err(js_error)?;
    crate::image_to_text(bytes, &config).map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;
    use image::{Rgba, RgbaImage};

    #[test]
    fn renders_through_the_binding() {
        let png = png_bytes(&RgbaImage::from_pixel(6, 3, Rgba([0, 0, 0, 255])));
        let mut binding = TextImage::new();
        assert!(binding.grid_size().is_empty());

        binding.load_image(&png).unwrap();
        binding
            .set_config(r#"{"shape": "square", "mode": "quoted"}"#)
            .unwrap();
        assert_eq!(binding.grid_size(), vec![6, 3]);

        let text = binding.render(false).unwrap();
        assert!(text.starts_with("'[{"));
        assert_eq!(binding.size_label().as_deref(), Some("6×3"));
        assert_eq!(binding.control_size(), vec![6, 3]);
        assert_eq!(binding.preview_rgba().len(), 6 * 3 * 4);
    }
}
