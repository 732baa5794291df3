use common::edit::ZOOM_POINTS_FIELD;
use common::{EditRequest, EditResponse, EditTransport, TransportError};
use gloo_timers::callback::Timeout;
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, FormData, Request, RequestInit, RequestMode, Response};

use crate::recorder::utils::{blob_from_bytes, js_error_message};

/// `fetch` + `FormData` upload to the edit service
#[derive(Default)]
pub struct FetchTransport;

impl FetchTransport {
    fn build_form(request: &EditRequest) -> Result<FormData, JsValue> {
        let form = FormData::new()?;
        let blob = blob_from_bytes(request.video.bytes(), &request.content_type)?;
        form.append_with_blob_and_filename(&request.field_name, &blob, &request.file_name)?;
        if let Some(zoom_points) = request.zoom_points_json() {
            form.append_with_str(ZOOM_POINTS_FIELD, &zoom_points)?;
        }
        Ok(form)
    }

    async fn read_response(resp: Response) -> Result<EditResponse, JsValue> {
        let status = resp.status();
        let content_type = resp.headers().get("Content-Type")?;
        let buffer = JsFuture::from(resp.array_buffer()?).await?;
        Ok(EditResponse {
            status,
            content_type,
            body: js_sys::Uint8Array::new(&buffer).to_vec(),
        })
    }
}

impl EditTransport for FetchTransport {
    async fn send(&self, request: &EditRequest) -> Result<EditResponse, TransportError> {
        let window = web_sys::window().ok_or_else(|| TransportError::Network("No window".to_string()))?;
        let to_network = |e: JsValue| TransportError::Network(js_error_message(&e));

        let form = Self::build_form(request).map_err(to_network)?;
        let abort = AbortController::new().map_err(to_network)?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&form);
        opts.set_signal(Some(&abort.signal()));

        let http_request =
            Request::new_with_str_and_init(&request.endpoint, &opts).map_err(to_network)?;

        // Dropping the timer cancels it, so it only fires while the fetch is pending
        let timed_out = Rc::new(Cell::new(false));
        let _deadline = request.timeout_millis().map(|millis| {
            let timed_out = timed_out.clone();
            let abort = abort.clone();
            Timeout::new(millis, move || {
                timed_out.set(true);
                abort.abort();
            })
        });

        let outcome = async {
            let resp_value = JsFuture::from(window.fetch_with_request(&http_request)).await?;
            let resp: Response = resp_value.dyn_into()?;
            Self::read_response(resp).await
        }
        .await;

        match outcome {
            Ok(response) => {
                log::debug!("Edit service answered {}", response.status);
                Ok(response)
            }
            Err(_) if timed_out.get() => Err(TransportError::TimedOut(
                request.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            )),
            Err(e) => Err(to_network(e)),
        }
    }
}
