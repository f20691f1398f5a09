use crate::{
    auth::UserContext,
    entities::{
        cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Product,
    },
    errors::{FieldErrors, ServiceError},
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Shopping cart service: cart lifecycle plus the item add/merge/update/remove
/// operations. Ownership rules follow the HTTP surface: admins may read any
/// cart, only the owner may change or delete one.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new cart owned by the acting user.
    #[instrument(skip(self, input), fields(user_id = %user.user_id))]
    pub async fn create_cart(
        &self,
        user: &UserContext,
        input: CreateCartInput,
    ) -> Result<CartModel, ServiceError> {
        let cart_id = Uuid::new_v4();
        let now = Utc::now();

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            user_id: Set(user.user_id),
            cart_name: Set(input.cart_name),
            schedule: Set(input.schedule),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!("Created cart: {}", cart_id);
        Ok(cart)
    }

    /// Lists carts with their product lines. Admins see every cart, other
    /// users only their own.
    pub async fn list_carts(&self, user: &UserContext) -> Result<Vec<CartWithProducts>, ServiceError> {
        let mut query = Cart::find().order_by_desc(cart::Column::CreatedAt);
        if !user.is_admin() {
            query = query.filter(cart::Column::UserId.eq(user.user_id));
        }
        let carts = query.all(&*self.db).await?;

        let mut result = Vec::with_capacity(carts.len());
        for cart in carts {
            let products = self.cart_product_lines(cart.id).await?;
            result.push(CartWithProducts { cart, products });
        }
        Ok(result)
    }

    /// Retrieves one cart with its product lines. Admins may read any cart;
    /// other users only their own.
    pub async fn get_cart(
        &self,
        user: &UserContext,
        cart_id: Uuid,
    ) -> Result<CartWithProducts, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        if !user.is_admin() && cart.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "This cart belongs to another user".to_string(),
            ));
        }

        let products = self.cart_product_lines(cart.id).await?;
        Ok(CartWithProducts { cart, products })
    }

    /// Updates a cart's name and/or schedule. Owner only.
    #[instrument(skip(self, input), fields(user_id = %user.user_id))]
    pub async fn update_cart(
        &self,
        user: &UserContext,
        cart_id: Uuid,
        input: UpdateCartInput,
    ) -> Result<CartModel, ServiceError> {
        let cart = self.owned_cart(user, cart_id).await?;

        let mut active: cart::ActiveModel = cart.into();
        if let Some(name) = input.cart_name {
            active.cart_name = Set(name);
        }
        if let Some(schedule) = input.schedule {
            active.schedule = Set(schedule);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CartUpdated(updated.id))
            .await;
        Ok(updated)
    }

    /// Hard-deletes a cart; its items go with it via the cascading foreign
    /// key. Owner only.
    #[instrument(skip(self), fields(user_id = %user.user_id))]
    pub async fn delete_cart(&self, user: &UserContext, cart_id: Uuid) -> Result<(), ServiceError> {
        self.owned_cart(user, cart_id).await?;

        Cart::delete_by_id(cart_id).exec(&*self.db).await?;
        self.event_sender
            .send_or_log(Event::CartDeleted(cart_id))
            .await;

        info!("Deleted cart: {}", cart_id);
        Ok(())
    }

    /// Adds a product to a cart. A line already holding the product is merged
    /// by incrementing its quantity instead of creating a second row.
    #[instrument(skip(self, input))]
    pub async fn add_item(&self, input: AddCartItemInput) -> Result<AddItemOutcome, ServiceError> {
        let mut errors = FieldErrors::new();
        if Cart::find_by_id(input.cart_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            errors.insert("cart_id".into(), "The selected cart does not exist".into());
        }
        if Product::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            errors.insert(
                "product_id".into(),
                "The selected product does not exist".into(),
            );
        }
        let qty = input.qty.unwrap_or(1);
        if qty < 1 {
            errors.insert("qty".into(), "The quantity must be at least 1".into());
        }
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(input.cart_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&*self.db)
            .await?;

        let outcome = if let Some(item) = existing {
            let current_qty = item.qty;
            let mut active: cart_item::ActiveModel = item.into();
            active.qty = Set(current_qty + qty);
            active.updated_at = Set(Utc::now());
            AddItemOutcome {
                item: active.update(&*self.db).await?,
                merged: true,
            }
        } else {
            let now = Utc::now();
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(input.cart_id),
                product_id: Set(input.product_id),
                qty: Set(qty),
                created_at: Set(now),
                updated_at: Set(now),
            };
            AddItemOutcome {
                item: item.insert(&*self.db).await?,
                merged: false,
            }
        };

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: input.cart_id,
                product_id: input.product_id,
            })
            .await;

        Ok(outcome)
    }

    /// Updates a cart item's quantity.
    pub async fn update_item(
        &self,
        item_id: Uuid,
        qty: i32,
    ) -> Result<CartItemModel, ServiceError> {
        if qty < 1 {
            return Err(ServiceError::invalid_field(
                "qty",
                "The quantity must be at least 1",
            ));
        }

        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let mut active: cart_item::ActiveModel = item.into();
        active.qty = Set(qty);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Removes a single item from its cart.
    pub async fn remove_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let cart_id = item.cart_id;
        CartItem::delete_by_id(item_id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved { cart_id, item_id })
            .await;
        Ok(())
    }

    async fn owned_cart(&self, user: &UserContext, cart_id: Uuid) -> Result<CartModel, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;

        if cart.user_id != user.user_id {
            return Err(ServiceError::Forbidden(
                "This cart belongs to another user".to_string(),
            ));
        }
        Ok(cart)
    }

    async fn cart_product_lines(&self, cart_id: Uuid) -> Result<Vec<CartProductLine>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                product.map(|product| CartProductLine {
                    cart_item_id: item.id,
                    product_id: product.id,
                    name: product.name,
                    description: product.description,
                    price: product.price,
                    stock: product.stock,
                    qty: item.qty,
                })
            })
            .collect())
    }
}

/// Input for creating a cart
#[derive(Debug, Deserialize)]
pub struct CreateCartInput {
    pub cart_name: String,
    pub schedule: DateTime<Utc>,
}

/// Input for updating a cart
#[derive(Debug, Deserialize)]
pub struct UpdateCartInput {
    pub cart_name: Option<String>,
    pub schedule: Option<DateTime<Utc>>,
}

/// Input for adding a product to a cart
#[derive(Debug, Deserialize)]
pub struct AddCartItemInput {
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub qty: Option<i32>,
}

/// Result of an add: the affected row and whether an existing line was merged
#[derive(Debug, Serialize)]
pub struct AddItemOutcome {
    pub item: CartItemModel,
    pub merged: bool,
}

/// A cart joined with the product detail of each of its lines
#[derive(Debug, Serialize)]
pub struct CartWithProducts {
    #[serde(flatten)]
    pub cart: CartModel,
    pub products: Vec<CartProductLine>,
}

#[derive(Debug, Serialize)]
pub struct CartProductLine {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub qty: i32,
}
