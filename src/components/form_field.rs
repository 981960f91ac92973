//! Labelled input with its validation message

use leptos::prelude::*;

#[component]
pub fn FormField(
    #[prop(into)] label: String,
    /// Input type attribute
    #[prop(into, default = "text".to_string())]
    kind: String,
    #[prop(into)] value: Signal<String>,
    #[prop(into)] on_input: Callback<String>,
    #[prop(into)] error: Signal<Option<String>>,
) -> impl IntoView {
    view! {
        <label class="form-field">
            <span class="form-label">{label}</span>
            <input
                type=kind
                class=move || if error.get().is_some() { "input invalid" } else { "input" }
                prop:value=move || value.get()
                on:input=move |ev| on_input.run(event_target_value(&ev))
            />
            {move || error.get().map(|message| view! { <span class="field-error">{message}</span> })}
        </label>
    }
}
