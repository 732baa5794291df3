use common::{ClientConfig, ZoomPoint};
use wasm_bindgen::prelude::*;

pub mod edit_service;
pub mod recorder;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
}

fn load_client_config(config: JsValue) -> ClientConfig {
    if config.is_undefined() || config.is_null() {
        return ClientConfig::default();
    }
    serde_wasm_bindgen::from_value(config).unwrap_or_else(|e| {
        log::warn!("Failed to load client config: {}. Using defaults.", e);
        ClientConfig::default()
    })
}

/// Entry point called by the hosting page once the DOM is ready.
///
/// `config` is an optional object shaped like `ClientConfig`.
#[wasm_bindgen]
pub fn init_screen_recorder(config: JsValue) -> Result<(), JsValue> {
    let client_config = load_client_config(config);

    let level = client_config
        .logging
        .level_filter()
        .to_level()
        .unwrap_or(log::Level::Info);
    wasm_logger::init(wasm_logger::Config::new(level));

    log::info!("Edit service: {}", client_config.edit.endpoint);

    let state = recorder::state::shared();
    state
        .borrow_mut()
        .configure(client_config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    state
        .borrow()
        .edit_client()
        .progress()
        .set_listener(Box::new(recorder::ui::update_edit_ui));

    recorder::init_recorder_panel();
    log::info!("WASM client initialized");
    Ok(())
}

/// Start a capture from script; rejects with the capture error
#[wasm_bindgen]
pub async fn start_screen_recording() -> Result<(), JsValue> {
    recorder::state::start_recording()
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    recorder::ui::update_recording_ui(true);
    Ok(())
}

#[wasm_bindgen]
pub fn stop_screen_recording() -> Result<(), JsValue> {
    recorder::state::stop_recording().map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Zoom keyframes sent along with the next edit request, as a JSON array
#[wasm_bindgen]
pub fn set_zoom_points(json: &str) -> Result<(), JsValue> {
    let points: Vec<ZoomPoint> =
        serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let (valid, invalid): (Vec<_>, Vec<_>) = points.into_iter().partition(ZoomPoint::is_valid);
    if !invalid.is_empty() {
        log::warn!("Ignoring {} invalid zoom points", invalid.len());
    }
    recorder::state::shared().borrow_mut().zoom_points = valid;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_points_json_shape() {
        let points: Vec<ZoomPoint> = serde_json::from_str(
            r#"[{"startTime":0.5,"endTime":2.0,"startZoom":1.0,"endZoom":1.8,"x":100,"y":200}]"#,
        )
        .unwrap();
        assert_eq!(points.len(), 1);
        assert!(points[0].is_valid());
        assert_eq!(points[0].x, 100.0);
    }
}
