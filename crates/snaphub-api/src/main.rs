use snaphub_core::Config;

// mimalloc keeps fragmentation low under musl inside containers
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router, tasks) = snaphub_api::setup::initialize_app(config.clone()).await?;

    let served = snaphub_api::setup::server::start_server(&config, router).await;
    tasks.shutdown().await;
    served?;

    Ok(())
}
