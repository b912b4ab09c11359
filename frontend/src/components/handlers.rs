use super::super::{FileData, Model, Msg};
use super::utils::extract_image_files;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_net::http::Request;
use shared::{ErrorResponse, RecipeResponse};
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

/// The selected file is pinned while its upload is in flight.
pub fn selection_locked(model: &Model) -> bool {
    model.loading
}

pub fn handle_file_selected(model: &mut Model, file: GlooFile) -> bool {
    if selection_locked(model) {
        log::warn!("Ignoring {} while an upload is in progress", file.name());
        return false;
    }
    let preview_url = ObjectUrl::from(file.clone());
    model.file = Some(FileData { file, preview_url });
    model.response = None;
    model.error = None;
    true
}

pub fn handle_clear_file(model: &mut Model) -> bool {
    if selection_locked(model) {
        return false;
    }
    model.file = None;
    model.response = None;
    model.error = None;
    true
}

pub fn handle_upload(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.loading {
        return false;
    }
    let Some(file) = model.file.as_ref().map(|fd| fd.file.clone()) else {
        ctx.link()
            .send_message(Msg::SetError(Some("Please select an image first.".into())));
        return false;
    };

    model.loading = true;
    model.error = None;
    model.response = None;
    send_recipe_request(ctx, file);
    true
}

pub fn handle_recipes_loaded(model: &mut Model, response: RecipeResponse) -> bool {
    model.response = Some(response);
    model.loading = false;
    true
}

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(file_list) = event.data_transfer().and_then(|dt| dt.files()) {
        select_first_image(ctx, extract_image_files(&file_list));
    }
    true
}

pub fn handle_paste(ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(file_list) = event.clipboard_data().and_then(|dt| dt.files()) {
        let files = extract_image_files(&file_list);
        if !files.is_empty() {
            event.prevent_default();
            select_first_image(ctx, files);
            return true;
        }
    }
    false
}

fn select_first_image(ctx: &Context<Model>, files: Vec<GlooFile>) {
    match files.into_iter().next() {
        Some(file) => ctx.link().send_message(Msg::FileSelected(file)),
        None => ctx
            .link()
            .send_message(Msg::SetError(Some("No valid image file found.".into()))),
    }
}

pub fn send_recipe_request(ctx: &Context<Model>, file: GlooFile) {
    let link = ctx.link().clone();
    spawn_local(async move {
        let msg = match post_image(&file).await {
            Ok(response) => Msg::RecipesLoaded(response),
            Err(message) => {
                log::error!("Recipe request failed: {}", message);
                Msg::SetError(Some(message))
            }
        };
        link.send_message(msg);
    });
}

async fn post_image(file: &GlooFile) -> Result<RecipeResponse, String> {
    let form_data =
        web_sys::FormData::new().map_err(|_| "Failed to create form data".to_string())?;
    form_data
        .append_with_blob_and_filename("file", file.as_ref(), &file.name())
        .map_err(|_| "Failed to attach file".to_string())?;

    let response = Request::post("/generate-recipes/")
        .body(form_data)
        .map_err(|e| format!("Failed to build request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    if response.ok() {
        return response
            .json::<RecipeResponse>()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e));
    }

    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(error) => Err(error.detail),
        Err(_) => Err(format!("Server error: {}", status)),
    }
}
