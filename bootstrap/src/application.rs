use axum::Router;

use crate::component::Component;
use crate::context::AppContext;

/// Marker for an application the bootstrap can run.
///
/// Implemented by a unit struct. It declares the application's name and
/// lists, explicitly, the components and routes the bootstrap wires up.
pub trait Application: Send + Sync + 'static {
    const NAME: &'static str;

    /// Components started in order after the built-in ones, stopped in reverse.
    fn components(_ctx: &AppContext) -> Vec<Box<dyn Component>> {
        Vec::new()
    }

    /// Application routes, merged with the bootstrap's probe and metrics routes.
    fn routes() -> Router<AppContext> {
        Router::new()
    }
}
