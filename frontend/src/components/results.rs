use super::super::Model;
use shared::Recipe;
use yew::prelude::*;

pub fn render_results(model: &Model) -> Html {
    let Some(response) = &model.response else {
        return html! {};
    };

    html! {
        <div class="results-container">
            <div class="result-header">
                <h2><i class="fa-solid fa-carrot"></i>{" Detected ingredients"}</h2>
                {
                    if response.ingredients.is_empty() {
                        html! { <p class="no-results-message">{"No ingredients recognized in this photo."}</p> }
                    } else {
                        html! {
                            <ul class="ingredient-tags">
                                { for response.ingredients.iter().map(|name| html! { <li>{ name }</li> }) }
                            </ul>
                        }
                    }
                }
            </div>
            <div class="detailed-results">
                <h3>{"Recipes"}</h3>
                {
                    if response.recipes.is_empty() {
                        html! { <p class="no-results-message">{"No recipes found."}</p> }
                    } else {
                        html! { <>{ for response.recipes.iter().map(render_recipe) }</> }
                    }
                }
            </div>
        </div>
    }
}

fn render_recipe(recipe: &Recipe) -> Html {
    html! {
        <article class="recipe-card">
            <h4>{ &recipe.title }</h4>
            {
                if recipe.image.is_empty() {
                    html! {}
                } else {
                    html! { <img class="recipe-image" src={recipe.image.clone()} alt={recipe.title.clone()} /> }
                }
            }
            <h5>{"Ingredients"}</h5>
            <ul>
                { for recipe.ingredients.iter().map(|i| html! { <li>{ i }</li> }) }
            </ul>
            <h5>{"Steps"}</h5>
            <ol>
                { for recipe.steps.iter().map(|s| html! { <li>{ s }</li> }) }
            </ol>
        </article>
    }
}
