use pricecat_core::{
    content_hash, CatalogError, CatalogResult, CatalogStore, ContentHash, NewProduct, Normalizer,
    ProductRecord,
};

/// Fields of one supplier row that identify or describe a product. `articul`
/// is the canonical (primary, normalized) articul.
#[derive(Debug, Clone, Copy)]
pub struct ProductInput<'a> {
    pub articul: &'a str,
    pub supplier_id: i64,
    pub brand_id: i64,
    pub name: &'a str,
    pub partnum: &'a str,
    pub quantity: i32,
}

/// Return the id of the product identified by `(brand, articul, name)`,
/// inserting it if unseen.
///
/// The name takes part in the identity case-folded and whitespace-collapsed,
/// so `"Filter  Oil"` and `"filter oil"` are one product. An existing product
/// is returned unchanged. A lost insert race adopts the winner's id.
///
/// # Errors
///
/// Returns [`CatalogError::HashCollision`] if the hash already belongs to a
/// product with a different identity, or propagates store errors.
pub async fn get_or_create<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
    input: &ProductInput<'_>,
) -> CatalogResult<i64> {
    let name_key = normalizer.name_key(input.name);
    let hash = content_hash(input.brand_id, input.articul, &name_key);

    if let Some(existing) = store.find_product_by_hash(&hash).await? {
        return verify_identity(&existing, input, &name_key, normalizer);
    }

    let product = NewProduct {
        hash,
        supplier_id: input.supplier_id,
        brand_id: input.brand_id,
        articul: input.articul.to_string(),
        name: normalizer.name(input.name),
        partnum: input.partnum.trim().to_string(),
        quantity: input.quantity,
    };

    match store.insert_product(&product).await {
        Ok(id) => {
            tracing::debug!(product_id = id, hash = %product.hash, "created product");
            Ok(id)
        }
        Err(e) if e.is_duplicate() => {
            let winner = find_required(store, &product.hash).await?;
            verify_identity(&winner, input, &name_key, normalizer)
        }
        Err(e) => Err(e),
    }
}

async fn find_required<S: CatalogStore>(store: &S, hash: &ContentHash) -> CatalogResult<ProductRecord> {
    store
        .find_product_by_hash(hash)
        .await?
        .ok_or_else(|| CatalogError::not_found("product", hash.as_str()))
}

fn verify_identity(
    existing: &ProductRecord,
    input: &ProductInput<'_>,
    name_key: &str,
    normalizer: &Normalizer,
) -> CatalogResult<i64> {
    if existing.brand_id == input.brand_id
        && existing.articul == input.articul
        && normalizer.name_key(&existing.name) == name_key
    {
        Ok(existing.id)
    } else {
        Err(CatalogError::HashCollision {
            hash: existing.hash.to_string(),
            existing_id: existing.id,
        })
    }
}
