use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::FileList;
use yew::prelude::*;

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || {
            inner_callback();
        }));
    })
}

pub fn extract_image_files(file_list: &FileList) -> Vec<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .filter(|file| file.type_().starts_with("image/"))
        .map(GlooFile::from)
        .collect()
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}
