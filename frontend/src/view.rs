use sauron::{
    html::{attributes::*, *},
    prelude::*,
};
use todo_shared::Todo;

use crate::state::{Model, Msg};

pub fn view(model: &Model) -> Node<Msg> {
    div(
        [class("min-h-screen bg-ctp-base text-ctp-text")],
        [
            view_header(model),
            div(
                [class("max-w-2xl mx-auto px-6 py-8 space-y-6")],
                [view_error(model), view_input(model), view_list(model)],
            ),
        ],
    )
}

fn view_header(model: &Model) -> Node<Msg> {
    header([class("bg-ctp-mantle shadow-lg border-b border-ctp-surface0")], [
        div([class("max-w-2xl mx-auto px-6 py-4 flex items-center justify-between")], [
            h1([class("text-2xl font-bold text-ctp-text")], [text("Todos")]),
            if model.is_loading() {
                span([class("animate-spin text-ctp-blue")], [text("◐")])
            } else {
                span([class("text-sm text-ctp-subtext0")], [
                    text(&format!("{} total", model.todos().len()))
                ])
            },
        ]),
    ])
}

fn view_error(model: &Model) -> Node<Msg> {
    match model.error_message() {
        Some(message) => div(
            [class("px-4 py-3 rounded-md bg-ctp-red/20 text-ctp-red border border-ctp-red font-medium")],
            [text(message)],
        ),
        None => span([], []),
    }
}

fn view_input(model: &Model) -> Node<Msg> {
    let editing = model.is_editing();
    div([class("p-6 bg-ctp-surface1 rounded-lg border border-ctp-surface2 space-y-3")], [
        input([
            r#type("text"),
            placeholder(if editing { "Edit todo" } else { "Add a todo or type to search" }),
            value(model.draft_text().to_string()),
            on_input(|event| Msg::SetDraft(event.value())),
            on_keydown(|event| Msg::KeyPressed(event.key())),
            class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue focus:border-transparent"),
        ], []),
        div([class("flex gap-2")], [
            button([
                on_click(|_| Msg::Submit),
                class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md transition-colors duration-200"),
                disabled(model.draft_text().trim().is_empty()),
            ], [text(if editing { "Save" } else { "Add" })]),
            if editing {
                button([
                    on_click(|_| Msg::CancelEdit),
                    class("bg-ctp-overlay0 hover:bg-ctp-overlay1 text-ctp-text font-medium px-4 py-2 rounded-md transition-colors duration-200"),
                ], [text("Cancel")])
            } else {
                span([], [])
            },
        ]),
    ])
}

fn view_list(model: &Model) -> Node<Msg> {
    let visible: Vec<&Todo> = model.visible_todos().collect();
    if visible.is_empty() {
        let message = if model.todos().is_empty() {
            "Nothing to do yet."
        } else {
            "No todos match your search."
        };
        return div([class("text-center py-12 text-ctp-subtext0")], [text(message)]);
    }

    ul(
        [class("space-y-3")],
        visible
            .into_iter()
            .map(|todo| view_todo(model, todo))
            .collect::<Vec<_>>(),
    )
}

fn view_todo(model: &Model, todo: &Todo) -> Node<Msg> {
    let todo_id = todo.id;
    let is_editing = model.editing_id() == Some(todo_id);
    let show_actions = model.hovered_id() == Some(todo_id) || is_editing;

    li(
        [
            key(todo_id.to_string()),
            on_mouseenter(move |_| Msg::HoverStart(todo_id)),
            on_mouseleave(move |_| Msg::HoverEnd(todo_id)),
            class(&format!(
                "flex items-center gap-4 border rounded-xl p-4 bg-ctp-surface0 transition-all duration-200 {}",
                if is_editing {
                    "border-ctp-blue"
                } else if todo.completed {
                    "border-ctp-green bg-ctp-green/10"
                } else {
                    "border-ctp-surface1"
                }
            )),
        ],
        [
            input([
                r#type("checkbox"),
                checked(todo.completed),
                on_click(move |_| Msg::ToggleTodo(todo_id)),
                class("w-5 h-5 accent-ctp-green cursor-pointer"),
            ], []),
            span([class(&format!(
                "flex-1 min-w-0 break-words {}",
                if todo.completed { "line-through text-ctp-overlay1" } else { "text-ctp-text" }
            ))], [text(&todo.text)]),
            div([class(if show_actions { "flex gap-2" } else { "flex gap-2 invisible" })], [
                button([
                    on_click(move |_| Msg::StartEdit(todo_id)),
                    class("w-8 h-8 rounded-lg bg-ctp-blue/20 text-ctp-blue hover:bg-ctp-blue/30 transition-colors duration-200"),
                    r#type("button"),
                ], [text("✏️")]),
                button([
                    on_click(move |_| Msg::DeleteTodo(todo_id)),
                    class("w-8 h-8 rounded-lg bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30 transition-colors duration-200"),
                    r#type("button"),
                ], [text("🗑️")]),
            ]),
        ],
    )
}
