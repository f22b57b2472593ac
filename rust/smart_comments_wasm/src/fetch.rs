//! `window.fetch` transport for the comment store.

use async_trait::async_trait;
use smart_comments_core::{Method, StoreError, StoreRequest, StoreResponse, Transport};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response, UrlSearchParams};

use crate::with_query;

fn transport_error(e: JsValue) -> StoreError { StoreError::Transport(format!("{e:?}")) }

/// Sends GET parameters in the query string and POST parameters as a
/// form-encoded body.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn send(&self, request: StoreRequest) -> Result<StoreResponse, StoreError> {
        let window = web_sys::window().ok_or_else(|| StoreError::Transport("no window".into()))?;

        let params = UrlSearchParams::new().map_err(transport_error)?;
        for (key, value) in &request.params {
            params.append(key, value);
        }

        let init = RequestInit::new();
        init.set_method(request.method.as_str());
        let url = match request.method {
            Method::Get => with_query(&request.url, &String::from(params.to_string())),
            Method::Post => {
                init.set_body(&params);
                request.url.clone()
            }
        };

        let req = Request::new_with_str_and_init(&url, &init).map_err(transport_error)?;
        req.headers().set("Accept", "application/json").map_err(transport_error)?;

        let value = JsFuture::from(window.fetch_with_request(&req)).await.map_err(transport_error)?;
        let response: Response = value.dyn_into().map_err(transport_error)?;
        let text = JsFuture::from(response.text().map_err(transport_error)?).await.map_err(transport_error)?;

        Ok(StoreResponse { status: response.status(), body: text.as_string().unwrap_or_default() })
    }
}
