//! Level editor: a 3D viewport for placing mesh entities, with an orbit
//! camera and `.level` documents.

mod app;
mod assets;
mod config;
mod input;
mod render;
mod runtime;
mod scene;

fn main() {
    app::run();
}
