use moviereview::{app, state::CatalogState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    app::init_tracing("moviereview=debug,catalog=debug,tower_http=info");

    let state = CatalogState::init().await?;
    tracing::info!(identity_url = %state.config.identity_url, "using identity provider");
    let app = app::build_catalog_app(state);
    app::serve(app, 8080).await
}
