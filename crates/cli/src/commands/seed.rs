//! Seed the product catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Enamel Mug
//!     description: 12oz, dishwasher safe
//!     price: "14.00"
//!     imageUrl: https://cdn.example.com/mug.png
//!   - name: Sticker Pack
//!     price: 4.5
//! ```
//!
//! The whole file is parsed and validated before anything is inserted.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use cornerstore_storefront::db::{self, ProductRepository};
use cornerstore_storefront::models::NewProduct;
use cornerstore_storefront::models::product::ProductSeed;
use cornerstore_storefront::services::catalog::CatalogService;

use super::{CommandError, database_url};

#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<ProductSeed>,
}

/// Parse and validate a seed file.
fn parse_products(content: &str) -> Result<Vec<NewProduct>, CommandError> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let products: Vec<NewProduct> = file.products.into_iter().map(NewProduct::from).collect();

    let blank: Vec<usize> = products
        .iter()
        .enumerate()
        .filter(|(_, p)| p.name.trim().is_empty())
        .map(|(i, _)| i + 1)
        .collect();
    if !blank.is_empty() {
        for index in &blank {
            error!("  - product #{index}: name must not be empty");
        }
        return Err(CommandError::Seed(format!(
            "{} validation errors found",
            blank.len()
        )));
    }

    Ok(products)
}

/// Seed products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a product is
/// invalid, or database operations fail.
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let products = parse_products(&content)?;
    info!(products = products.len(), "Parsed and validated seed file");

    if dry_run {
        info!("Dry run, nothing inserted");
        return Ok(());
    }

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let repository = ProductRepository::new(pool);
    let catalog = CatalogService::new(&repository);

    let mut inserted = 0_usize;
    for product in products {
        let name = product.name.clone();
        match catalog.create_validated(product).await {
            Ok(created) => {
                info!(id = %created.id, name = %created.name, "inserted");
                inserted += 1;
            }
            Err(e) => error!(name = %name, error = %e, "failed to insert"),
        }
    }

    info!("Seeding complete! Products inserted: {inserted}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_numbers_and_strings() {
        let products = parse_products(
            r#"
products:
  - name: Enamel Mug
    description: 12oz
    price: "14.00"
    imageUrl: https://cdn.example.com/mug.png
  - name: Sticker Pack
    price: 4.5
"#,
        )
        .unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price.to_string(), "14.00");
        assert_eq!(
            products[0].image_url.as_deref(),
            Some("https://cdn.example.com/mug.png")
        );
        assert_eq!(products[1].price.to_string(), "4.50");
        assert_eq!(products[1].description, None);
    }

    #[test]
    fn test_rejects_negative_price() {
        let result = parse_products("products:\n  - name: Bad\n    price: -1\n");
        assert!(matches!(result, Err(CommandError::Yaml(_))));
    }

    #[test]
    fn test_rejects_blank_name() {
        let result = parse_products("products:\n  - name: \"  \"\n    price: 1\n");
        assert!(matches!(result, Err(CommandError::Seed(_))));
    }
}
