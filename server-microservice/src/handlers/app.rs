use axum::{extract::State, routing, Router};
use bootstrap::AppContext;

pub fn add_routes(router: Router<AppContext>) -> Router<AppContext> {
    router.route("/", routing::get(index))
}

pub async fn index(State(ctx): State<AppContext>) -> String {
    ctx.name().to_owned()
}
