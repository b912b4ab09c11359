use super::super::{Model, Msg};
use super::utils::{debounce, extract_image_files};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="upload-section">
            { render_file_input_area(model, ctx) }
            { render_preview(model, ctx) }
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let files = input
            .files()
            .as_ref()
            .map(extract_image_files)
            .unwrap_or_default();
        input.set_value("");

        match files.into_iter().next() {
            Some(file) => Msg::FileSelected(file),
            None => Msg::SetError(Some("No valid image file selected.".into())),
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        let input = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("file-input"))
            .and_then(|el| el.dyn_into::<web_sys::HtmlElement>().ok());
        if let Some(input) = input {
            input.click();
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept="image/*"
                style="display: none;"
                disabled={model.loading}
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Drag & drop a photo here, paste, or click"}</p>
                    <p class="file-types">{"Supported formats: JPG, PNG, WEBP, GIF"}</p>
                </div>
            </div>
        </>
    }
}

fn render_preview(model: &Model, ctx: &Context<Model>) -> Html {
    let Some(file_data) = &model.file else {
        return html! {};
    };
    let link = ctx.link().clone();

    html! {
        <div id="preview-container">
            <img id="actual-image-preview"
                src={file_data.preview_url.to_string()}
                alt={file_data.file.name()} />
            <div class="button-container">
                <button
                    id="clear-btn"
                    class="analyze-btn"
                    style="background-color: var(--clear-color);"
                    disabled={model.loading}
                    onclick={link.callback(|_| Msg::ClearFile)}
                >
                    <i class="fa-solid fa-trash"></i>{" Clear"}
                </button>
                <button
                    id="upload-button"
                    class="analyze-btn"
                    disabled={model.loading}
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Upload)
                    })}
                >
                    { render_upload_button_content(model, &file_data.file.name()) }
                </button>
            </div>
        </div>
    }
}

fn render_upload_button_content(model: &Model, filename: &str) -> Html {
    if model.loading {
        return html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Finding recipes..."}</> };
    }

    let display_name = if filename.chars().count() > 20 {
        format!("{}...", filename.chars().take(17).collect::<String>())
    } else {
        filename.to_string()
    };
    html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Get recipes for \"{}\"", display_name) }</> }
}
