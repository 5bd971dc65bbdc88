use facetally_api::setup;
use facetally_core::Config;

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, detector, routes)
    let (state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server; returns once shutdown has been signalled and drained
    setup::server::start_server(&config, router, state).await?;

    Ok(())
}
