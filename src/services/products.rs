use crate::{
    entities::{product, Product, ProductModel},
    errors::ServiceError,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const DEFAULT_PER_PAGE: u64 = 5;
const MAX_PER_PAGE: u64 = 100;

/// Public, read-only product catalog.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Paginated listing of published products with optional name search and
    /// category filter.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ProductListQuery,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        let page = query.page.unwrap_or(1);

        let mut find = Product::find()
            .filter(product::Column::IsPublished.eq(true))
            .order_by_desc(product::Column::CreatedAt);

        if let Some(needle) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            find = find.filter(product::Column::Name.contains(needle));
        }
        if let Some(category_id) = query.category_id {
            find = find.filter(product::Column::CategoryId.eq(category_id));
        }

        let paginator = find.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((data, total))
    }

    /// Product detail by id.
    pub async fn get(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }
}

/// Query parameters for the catalog listing
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}
