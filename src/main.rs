use product_catalog::{logging, Catalog, CatalogConfig, CatalogResult, SortOrder};
use std::process::ExitCode;

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "catalog failed to start");
            ExitCode::FAILURE
        }
    }
}

/// Open the catalog and log what it holds
fn run() -> CatalogResult<()> {
    let config = CatalogConfig::discover()?;
    let catalog = Catalog::open(&config)?;

    let products = catalog.products(SortOrder::default())?;
    tracing::info!(
        count = products.len(),
        data_dir = %config.data_dir.display(),
        "🎨 product catalog initialized"
    );

    if products.is_empty() {
        tracing::info!("No Products Available");
    }

    for product in &products {
        let stored = catalog.images().image_paths(product.id).len();
        tracing::info!(
            id = %product.id,
            name = product.display_name(),
            price = %format!("{:.2}", product.price),
            provider = product.provider.as_deref().unwrap_or(""),
            images = stored,
            has_image = product.has_image,
            "product"
        );
    }

    Ok(())
}
