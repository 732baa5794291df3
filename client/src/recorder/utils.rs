use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, Document, Url};

pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

pub fn current_timestamp_utc() -> String {
    String::from(js_sys::Date::new_0().to_iso_string())
}

pub fn document() -> Option<Document> {
    web_sys::window().and_then(|w| w.document())
}

pub fn element_by_id<T: JsCast>(id: &str) -> Option<T> {
    document()?.get_element_by_id(id)?.dyn_into::<T>().ok()
}

/// Best-effort string for a rejected promise or thrown value
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

pub fn blob_from_bytes(bytes: &[u8], mime_type: &str) -> Result<Blob, JsValue> {
    let array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);
    let bag = BlobPropertyBag::new();
    bag.set_type(mime_type);
    Blob::new_with_u8_array_sequence_and_options(&parts, &bag)
}

pub fn concat_blobs(blobs: &[Blob], mime_type: &str) -> Result<Blob, JsValue> {
    let parts = js_sys::Array::new();
    for blob in blobs {
        parts.push(blob);
    }
    let bag = BlobPropertyBag::new();
    bag.set_type(mime_type);
    Blob::new_with_blob_sequence_and_options(&parts, &bag)
}

pub async fn blob_bytes(blob: &Blob) -> Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(blob.array_buffer()).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Playback reference for bytes; revoke it once superseded
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn for_blob(blob: &Blob) -> Result<Self, JsValue> {
        Ok(Self(Url::create_object_url_with_blob(blob)?))
    }

    pub fn for_bytes(bytes: &[u8], mime_type: &str) -> Result<Self, JsValue> {
        Self::for_blob(&blob_from_bytes(bytes, mime_type)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        let _ = Url::revoke_object_url(&self.0);
    }
}
