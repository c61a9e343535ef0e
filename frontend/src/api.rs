use todo_shared::{
    CreateTodoRequest, Todo, TodoResponse, UpdateTodoRequest, TODO_API_PATH,
};
use uuid::Uuid;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, Request, RequestInit, Response};

use crate::error::ClientError;

pub async fn list_todos() -> Result<Vec<Todo>, ClientError> {
    let text = send("GET", TODO_API_PATH, None).await?;
    parse(&text)
}

pub async fn create_todo(request: &CreateTodoRequest) -> Result<Todo, ClientError> {
    let body = encode(request)?;
    let text = send("POST", TODO_API_PATH, Some(body)).await?;
    parse::<TodoResponse>(&text).map(|response| response.todo)
}

pub async fn update_todo(id: Uuid, request: &UpdateTodoRequest) -> Result<Todo, ClientError> {
    let body = encode(request)?;
    let url = format!("{TODO_API_PATH}/{id}");
    let text = send("PUT", &url, Some(body)).await?;
    parse::<TodoResponse>(&text).map(|response| response.todo)
}

pub async fn delete_todo(id: Uuid) -> Result<(), ClientError> {
    let url = format!("{TODO_API_PATH}/{id}");
    send("DELETE", &url, None).await?;
    Ok(())
}

/// Resolves after `millis` on the browser's timer.
pub async fn delay(millis: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
        }
    });
    let _ = JsFuture::from(promise).await;
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value)
        .map_err(|err| ClientError::Network(format!("failed to serialize request: {err}")))
}

fn parse<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, ClientError> {
    serde_json::from_str(text).map_err(|err| ClientError::Network(format!("failed to parse JSON: {err}")))
}

/// Issues one request and returns the body of a 2xx response.
async fn send(method: &str, url: &str, body: Option<String>) -> Result<String, ClientError> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = &body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|_| ClientError::Network("failed to create request".into()))?;
    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| ClientError::Network("failed to set header".into()))?;
    }

    let window = window().ok_or_else(|| ClientError::Network("no window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|_| ClientError::Network("failed to send request".into()))?
        .dyn_into()
        .map_err(|_| ClientError::Network("unexpected fetch result".into()))?;

    let text_promise = response
        .text()
        .map_err(|_| ClientError::Network("failed to read response".into()))?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|_| ClientError::Network("failed to read response".into()))?
        .as_string()
        .unwrap_or_default();

    if !response.ok() {
        let err = ClientError::from_response(response.status(), &text);
        web_sys::console::warn_1(&format!("{method} {url} failed: {err}").into());
        return Err(err);
    }
    Ok(text)
}
