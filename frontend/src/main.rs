mod components;

use components::handlers;
use components::header::render_header;
use components::results::render_results;
use components::upload_section::render_upload_section;
use components::utils::render_error_message;
use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::RecipeResponse;
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

pub struct FileData {
    pub file: GlooFile,
    pub preview_url: ObjectUrl,
}

pub enum Msg {
    FileSelected(GlooFile),
    ClearFile,
    Upload,
    RecipesLoaded(RecipeResponse),
    SetError(Option<String>),
    SetDragging(bool),
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

pub struct Model {
    pub file: Option<FileData>,
    pub response: Option<RecipeResponse>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_dragging: bool,
    _paste_listener: Option<EventListener>,
}

impl Model {
    fn idle() -> Self {
        Self {
            file: None,
            response: None,
            loading: false,
            error: None,
            is_dragging: false,
            _paste_listener: None,
        }
    }
}

impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let paste_listener = web_sys::window().map(|window| {
            let link = ctx.link().clone();
            EventListener::new(&window, "paste", move |event| {
                if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                    link.send_message(Msg::HandlePaste(clipboard_event.clone()));
                }
            })
        });

        Self {
            _paste_listener: paste_listener,
            ..Self::idle()
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FileSelected(file) => handlers::handle_file_selected(self, file),
            Msg::ClearFile => handlers::handle_clear_file(self),
            Msg::Upload => handlers::handle_upload(self, ctx),
            Msg::RecipesLoaded(response) => handlers::handle_recipes_loaded(self, response),
            Msg::SetError(error) => {
                self.error = error;
                self.loading = false;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }

                <main class="main-content">
                { render_upload_section(self, ctx) }
                { render_error_message(self) }
                { render_results(self) }
                </main>

                <footer class="app-footer">
                    <p>{"Recipe Generator | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
