use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use common::{Bitrate, FrameRate, RecordingSummary, Resolution};

use crate::recorder::state::{self, shared};
use crate::recorder::utils::{document, element_by_id};

const EDIT_LABEL: &str = "Edit video";
const EDITING_LABEL: &str = "Editing...";

/// Wire the settings panel and recording controls to the recorder state
pub fn init_recorder_panel() {
    let document = match document() {
        Some(d) => d,
        None => return,
    };

    setup_audio_toggle(&document);
    setup_fps_select(&document);
    setup_resolution_select(&document);
    setup_bitrate_input(&document);
    setup_recording_buttons(&document);
    setup_edit_button(&document);
    setup_page_teardown();

    update_recording_ui(false);
    update_edit_ui(false);
    set_display("edited-section", false, "block");

    log::info!("[Recorder] Panel initialized");
}

fn on_event(target: &web_sys::EventTarget, event: &str, handler: impl FnMut(web_sys::Event) + 'static) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
    let result = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref());
    let label = target
        .dyn_ref::<web_sys::Element>()
        .map(|element| format!("#{}", element.id()))
        .unwrap_or_else(|| "window".to_string());
    if listener_attached(&label, event, result) {
        closure.forget();
    }
}

/// Logs a control that could not be wired; returns whether it was
fn listener_attached<E: std::fmt::Debug>(target: &str, event: &str, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("[Recorder] Could not listen for {} on {}: {:?}", event, target, e);
            false
        }
    }
}

/// Release the capture when the page is hidden for good or put in the back/forward cache
fn setup_page_teardown() {
    if let Some(window) = web_sys::window() {
        on_event(&window, "pagehide", |_event| state::teardown());
    }
}

fn setup_audio_toggle(document: &web_sys::Document) {
    if let Some(checkbox) = document.get_element_by_id("audio-toggle") {
        if let Ok(input) = checkbox.clone().dyn_into::<web_sys::HtmlInputElement>() {
            // Sync state with whatever the browser restored into the form
            shared().borrow_mut().config.audio_enabled = input.checked();
        }

        on_event(&checkbox, "change", |event| {
            if let Some(input) = event_target::<web_sys::HtmlInputElement>(&event) {
                let enabled = input.checked();
                shared().borrow_mut().config.audio_enabled = enabled;
                log::debug!("[Recorder] Audio {}", if enabled { "enabled" } else { "disabled" });
            }
        });
    }
}

fn setup_fps_select(document: &web_sys::Document) {
    if let Some(select) = document.get_element_by_id("fps") {
        if let Ok(select_elem) = select.clone().dyn_into::<web_sys::HtmlSelectElement>() {
            if let Ok(frame_rate) = select_elem.value().parse::<FrameRate>() {
                shared().borrow_mut().config.frame_rate = frame_rate;
            }
        }

        on_event(&select, "change", |event| {
            if let Some(select_elem) = event_target::<web_sys::HtmlSelectElement>(&event) {
                match select_elem.value().parse::<FrameRate>() {
                    Ok(frame_rate) => shared().borrow_mut().config.frame_rate = frame_rate,
                    Err(e) => log::warn!("[Recorder] {}", e),
                }
            }
        });
    }
}

fn setup_resolution_select(document: &web_sys::Document) {
    if let Some(select) = document.get_element_by_id("resolution") {
        if let Ok(select_elem) = select.clone().dyn_into::<web_sys::HtmlSelectElement>() {
            if let Ok(resolution) = select_elem.value().parse::<Resolution>() {
                shared().borrow_mut().config.resolution = resolution;
            }
        }

        on_event(&select, "change", |event| {
            if let Some(select_elem) = event_target::<web_sys::HtmlSelectElement>(&event) {
                match select_elem.value().parse::<Resolution>() {
                    Ok(resolution) => shared().borrow_mut().config.resolution = resolution,
                    Err(e) => log::warn!("[Recorder] {}", e),
                }
            }
        });
    }
}

fn setup_bitrate_input(document: &web_sys::Document) {
    if let Some(field) = document.get_element_by_id("bitrate") {
        if let Ok(input) = field.clone().dyn_into::<web_sys::HtmlInputElement>() {
            input.set_min(&Bitrate::MIN_KBPS.to_string());
            input.set_max(&Bitrate::MAX_KBPS.to_string());
            input.set_step(&Bitrate::STEP_KBPS.to_string());
            match Bitrate::parse_kbps(&input.value()) {
                Ok(bitrate) => shared().borrow_mut().config.bitrate = bitrate,
                Err(_) => input.set_value(&shared().borrow().config.bitrate.kbps().to_string()),
            }
        }

        on_event(&field, "change", |event| {
            if let Some(input) = event_target::<web_sys::HtmlInputElement>(&event) {
                match Bitrate::parse_kbps(&input.value()) {
                    Ok(bitrate) => shared().borrow_mut().config.bitrate = bitrate,
                    Err(e) => {
                        log::warn!("[Recorder] {}", e);
                        // put the last accepted value back
                        input.set_value(&shared().borrow().config.bitrate.kbps().to_string());
                    }
                }
            }
        });
    }
}

fn setup_recording_buttons(document: &web_sys::Document) {
    if let Some(button) = document.get_element_by_id("start-recording") {
        on_event(&button, "click", |_event| {
            wasm_bindgen_futures::spawn_local(async {
                set_button_disabled("start-recording", true);
                match state::start_recording().await {
                    Ok(()) => {
                        log::info!("[Recorder] Started successfully");
                        update_recording_ui(true);
                    }
                    Err(e) => {
                        log::error!("[Recorder] Start failed: {}", e);
                        update_recording_ui(shared().borrow().is_recording());
                    }
                }
            });
        });
    }

    if let Some(button) = document.get_element_by_id("stop-recording") {
        on_event(&button, "click", |_event| {
            if let Err(e) = state::stop_recording() {
                log::error!("[Recorder] Stop failed: {}", e);
            }
        });
    }
}

fn setup_edit_button(document: &web_sys::Document) {
    if let Some(button) = document.get_element_by_id("edit-video") {
        on_event(&button, "click", |_event| {
            wasm_bindgen_futures::spawn_local(state::edit_recording());
        });
    }
}

fn event_target<T: JsCast>(event: &web_sys::Event) -> Option<T> {
    event.target()?.dyn_into::<T>().ok()
}

fn set_button_disabled(id: &str, disabled: bool) {
    if let Some(button) = element_by_id::<web_sys::HtmlButtonElement>(id) {
        button.set_disabled(disabled);
    }
}

fn set_display(id: &str, visible: bool, display: &str) {
    if let Some(element) = element_by_id::<web_sys::HtmlElement>(id) {
        let value = if visible { display } else { "none" };
        element.style().set_property("display", value).ok();
    }
}

/// Settings are frozen while a capture runs
pub fn update_recording_ui(recording: bool) {
    set_button_disabled("start-recording", recording);
    set_button_disabled("stop-recording", !recording);

    for id in ["audio-toggle", "bitrate"] {
        if let Some(input) = element_by_id::<web_sys::HtmlInputElement>(id) {
            input.set_disabled(recording);
        }
    }
    for id in ["fps", "resolution"] {
        if let Some(select) = element_by_id::<web_sys::HtmlSelectElement>(id) {
            select.set_disabled(recording);
        }
    }

    if let Some(status_badge) = element_by_id::<web_sys::Element>("recording-status") {
        if recording {
            status_badge.set_text_content(Some("Recording"));
            status_badge.set_class_name("status-badge recording");
        } else {
            status_badge.set_text_content(Some("Ready"));
            status_badge.set_class_name("status-badge ready");
        }
    }
}

/// Edit button is disabled and relabelled while a submission is in flight
pub fn update_edit_ui(editing: bool) {
    if let Some(button) = element_by_id::<web_sys::HtmlButtonElement>("edit-video") {
        button.set_disabled(editing);
        button.set_text_content(Some(if editing { EDITING_LABEL } else { EDIT_LABEL }));
    }
}

pub fn show_recording(url: &str, summary: &RecordingSummary) {
    if let Some(video) = element_by_id::<web_sys::HtmlVideoElement>("screen-recording") {
        video.set_src(url);
    }
    if let Some(el) = element_by_id::<web_sys::Element>("recording-summary") {
        el.set_text_content(Some(&summary.display_line()));
    }
}

/// Take down the playback of a recording that is no longer published
pub fn clear_recording() {
    if let Some(video) = element_by_id::<web_sys::HtmlVideoElement>("screen-recording") {
        video.remove_attribute("src").ok();
        video.load();
    }
    if let Some(el) = element_by_id::<web_sys::Element>("recording-summary") {
        el.set_text_content(None);
    }
}

pub fn show_edited(url: &str) {
    if let Some(video) = element_by_id::<web_sys::HtmlVideoElement>("edited-video") {
        video.set_src(url);
    }
    set_display("edited-section", true, "block");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_listener_is_reported() {
        assert!(listener_attached::<String>("#fps", "change", Ok(())));
        assert!(!listener_attached("#fps", "change", Err("InvalidStateError".to_string())));
    }
}
