mod clock;
mod drivers;
mod host;
mod page;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
