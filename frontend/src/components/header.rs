use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-utensils"></i> {" Recipe Generator"}</h1>
            <p class="subtitle">{"Upload a photo of your ingredients and get recipes for them"}</p>
        </header>
    }
}
