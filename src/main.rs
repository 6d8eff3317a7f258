//! Example service: one HTTP route, started and stopped by the app.
//!
//! ```text
//! $ HTTP_PORT=8000 cargo run
//! $ curl localhost:8000/ping
//! "pong"
//! ```

use ipa::http::StatusCode;
use ipa::{App, Context, HandlerResult};

async fn ping(ctx: Context) -> HandlerResult {
    ctx.log().info("pong");
    Ok(ctx.json(StatusCode::OK, &"pong"))
}

#[tokio::main]
async fn main() {
    let mut app = App::new();
    app.get("/ping", ping);
    app.run().await;
}
