use sauron::prelude::*;
use todo_shared::TODO_EVENTS_PATH;
use web_sys::console;

mod api;
pub mod error;
pub mod state;
mod subscription;
mod view;

use state::{Effect, Model, Msg};
use subscription::ChangeSubscription;

/// Browser shell around [`Model`]: runs its effects and owns the change
/// subscription, which closes when the app is dropped.
#[derive(Default)]
pub struct App {
    model: Model,
    changes: Option<ChangeSubscription>,
}

impl Application for App {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        match ChangeSubscription::open(TODO_EVENTS_PATH) {
            Ok(subscription) => self.changes = Some(subscription),
            Err(err) => console::warn_1(&format!("live updates disabled: {err}").into()),
        }
        let effects = self.model.update(Msg::Mounted);
        self.run(effects)
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        if let Msg::ChangeStreamClosed = msg {
            console::log_1(&"change stream closed".into());
        }
        let effects = self.model.update(msg);
        self.run(effects)
    }

    fn view(&self) -> Node<Msg> {
        view::view(&self.model)
    }
}

impl App {
    fn run(&self, effects: Vec<Effect>) -> Cmd<Msg> {
        Cmd::batch(
            effects
                .into_iter()
                .map(|effect| self.command(effect))
                .collect::<Vec<_>>(),
        )
    }

    fn command(&self, effect: Effect) -> Cmd<Msg> {
        match effect {
            Effect::FetchTodos => Cmd::new(async { Msg::TodosLoaded(api::list_todos().await) }),
            Effect::Create(request) => {
                Cmd::new(async move { Msg::Created(api::create_todo(&request).await) })
            }
            Effect::Update { id, request, intent } => Cmd::new(async move {
                Msg::Updated(intent, api::update_todo(id, &request).await)
            }),
            Effect::Delete(id) => {
                Cmd::new(async move { Msg::Deleted(id, api::delete_todo(id).await) })
            }
            Effect::DismissErrorAfter { ticket, millis } => Cmd::new(async move {
                api::delay(millis).await;
                Msg::DismissError(ticket)
            }),
            Effect::AwaitChange => match &self.changes {
                Some(changes) => {
                    let next = changes.next_change();
                    Cmd::new(async move {
                        if next.await {
                            Msg::RemoteChange
                        } else {
                            Msg::ChangeStreamClosed
                        }
                    })
                }
                None => Cmd::none(),
            },
        }
    }
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(App::default());
}
