use moviereview::{app, state::IdentityState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    app::init_tracing("moviereview=debug,identity_provider=debug,tower_http=info");

    let state = IdentityState::init().await?;
    let app = app::build_identity_app(state);
    app::serve(app, 5001).await
}
